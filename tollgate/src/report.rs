//! Diagnostic report of configured guards.
//!
//! Nothing here takes part in an access decision. The report lists which
//! handlers carry which guard so operators can review the setup at
//! startup. Entries come from explicit [`GuardRegistration`]s, usually
//! the ones generated by `#[derive(GuardedRouter)]`.
//!
//! ```
//! use tollgate::{Facet, GuardConfig, GuardRegistration, GuardReport, ReportConfig};
//!
//! let mut report = GuardReport::new(Facet::Role, ReportConfig::default())?;
//! report.register(GuardRegistration::new(
//!     "app::UserAction",
//!     "delete(u32)",
//!     Some(GuardConfig::roles(["ADMIN", "OWNER"]).any_of()),
//! ));
//!
//! assert_eq!(
//!     report.rows(),
//!     vec![
//!         "app::UserAction\tdelete(u32)\tADMIN\ttrue",
//!         "app::UserAction\tdelete(u32)\tOWNER\ttrue",
//!     ]
//! );
//! # Ok::<(), tollgate::ConfigError>(())
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::facet::Facet;
use crate::guard::GuardConfig;

const SEP: &str = "\t";

/// One handler known to the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRegistration {
    /// Full path of the declaring type, e.g. `app::routes::UserAction`
    pub type_name: String,
    /// `name(Type1, Type2)`
    pub signature: String,
    pub guard: Option<GuardConfig>,
}

impl GuardRegistration {
    pub fn new(
        type_name: impl Into<String>,
        signature: impl Into<String>,
        guard: Option<GuardConfig>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            signature: signature.into(),
            guard,
        }
    }
}

/// Which registrations to include.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Module path prefix; empty includes everything, a trailing `::` is ignored
    pub target_namespace: String,
    /// Regex the whole type path must match
    pub target_pattern: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            target_namespace: String::new(),
            target_pattern: "^.*Action$".to_string(),
        }
    }
}

/// Tab-separated listing of guard settings for one facet.
#[derive(Debug)]
pub struct GuardReport {
    facet: Facet,
    namespace: String,
    pattern: Regex,
    entries: Vec<GuardRegistration>,
}

impl GuardReport {
    /// Fails when `config.target_pattern` is not a valid regex.
    pub fn new(facet: Facet, config: ReportConfig) -> Result<Self, ConfigError> {
        // Whole-path match, not a substring search
        let pattern = Regex::new(&format!("^(?:{})$", config.target_pattern))?;
        Ok(Self {
            facet,
            namespace: config
                .target_namespace
                .trim_end_matches("::")
                .to_string(),
            pattern,
            entries: Vec::new(),
        })
    }

    pub fn register(&mut self, registration: GuardRegistration) -> &mut Self {
        self.entries.push(registration);
        self
    }

    pub fn register_all(
        &mut self,
        registrations: impl IntoIterator<Item = GuardRegistration>,
    ) -> &mut Self {
        self.entries.extend(registrations);
        self
    }

    fn is_target(&self, type_name: &str) -> bool {
        let in_namespace = self.namespace.is_empty()
            || type_name == self.namespace
            || type_name
                .strip_prefix(self.namespace.as_str())
                .is_some_and(|rest| rest.starts_with("::"));
        in_namespace && self.pattern.is_match(type_name)
    }

    /// Sorted report rows, one per required token.
    pub fn rows(&self) -> Vec<String> {
        let mut rows = Vec::new();
        for entry in self.entries.iter().filter(|e| self.is_target(&e.type_name)) {
            match &entry.guard {
                Some(guard) if guard.facet == self.facet => {
                    for token in &guard.tokens {
                        rows.push(
                            [
                                entry.type_name.as_str(),
                                entry.signature.as_str(),
                                token.as_str(),
                                if guard.any_of { "true" } else { "false" },
                            ]
                            .join(SEP),
                        );
                    }
                }
                _ => rows.push([entry.type_name.as_str(), entry.signature.as_str(), "", ""].join(SEP)),
            }
        }
        rows.sort();
        rows
    }

    pub fn title(&self) -> String {
        let label = self.facet.label();
        let mut chars = label.chars();
        let capitalized: String = chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect())
            .unwrap_or_default();
        format!("Check{} Guard Settings", capitalized)
    }

    pub fn header(&self) -> String {
        ["type", "signature", self.facet.label(), "anyOf"].join(SEP)
    }

    /// Title, header and rows, newline separated.
    pub fn render(&self) -> String {
        let mut lines = vec![self.title(), self.header()];
        lines.extend(self.rows());
        lines.join("\n")
    }

    /// Emit the report at debug level. Returns whether it was emitted.
    pub fn log(&self) -> bool {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return false;
        }
        tracing::debug!("{}", self.render());
        true
    }
}
