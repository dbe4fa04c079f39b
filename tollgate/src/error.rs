//! Error types for access-control evaluation.
//!
//! Three classes are kept apart:
//!
//! - [`ConfigError`]: a component is missing or misconfigured (fatal)
//! - [`Forbidden`]: the expected denial outcome
//! - [`ResolveError`]: the backing store could not answer
//!
//! [`AccessError`] is the union surfaced to the request pipeline.

use thiserror::Error;

use crate::facet::Facet;

/// Result type for guarded operations.
pub type AccessResult<T> = Result<T, AccessError>;

/// Configuration errors, raised at construction or startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No granted-token resolver configured for the {facet} evaluator")]
    MissingResolver { facet: Facet },

    #[error("The component of \"{facet}Evaluator\" is not configured")]
    MissingEvaluator { facet: Facet },

    #[error("No permission factory configured for the permission check stage")]
    MissingFactory,

    #[error("No service availability configured for the availability check stage")]
    MissingAvailability,

    #[error("Guard for {facet} requires at least one token")]
    EmptyTokens { facet: Facet },

    #[error("Request ids cannot be guarded per handler; use PermissionCheckStage for the permission facet")]
    PermissionGuard,

    #[error("Guard facet {expected} does not match evaluator facet {actual}")]
    FacetMismatch { expected: Facet, actual: Facet },

    #[error("Invalid report target pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// Errors raised by a resolver or permission factory.
///
/// A resolver that cannot determine grants returns one of these instead of
/// an empty set, so "no grants" stays distinguishable from "store failed".
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to read grant store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse grant store: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Grant store unavailable: {0}")]
    Unavailable(String),
}

/// Denial carrying diagnostic detail for operators.
///
/// The message includes the user id and the tokens involved, so it is meant
/// for logs, not for end users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forbidden {
    pub facet: Facet,
    pub user_id: Option<String>,
    /// Required tokens in configured order, or the single request id
    pub tokens: Vec<String>,
}

impl Forbidden {
    pub fn new(facet: Facet, user_id: Option<&str>, tokens: Vec<String>) -> Self {
        Self {
            facet,
            user_id: user_id.map(str::to_string),
            tokens,
        }
    }
}

impl std::fmt::Display for Forbidden {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let user = self.user_id.as_deref().unwrap_or("");
        match self.facet {
            Facet::Permission => write!(
                f,
                "permission denied. userId = [{}], requestId = [{}]",
                user,
                self.tokens.join(", ")
            ),
            facet => write!(
                f,
                "User has no {}. userId=[{}], {}=[{}]",
                facet.label(),
                user,
                facet.plural(),
                self.tokens.join(", ")
            ),
        }
    }
}

impl std::error::Error for Forbidden {}

/// Top-level error for a guarded request.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Evaluation said no (expected, user-facing as "forbidden")
    #[error(transparent)]
    Forbidden(#[from] Forbidden),

    /// The requested service is closed
    #[error("service unavailable. requestId=[{}]", .request_id.as_deref().unwrap_or(""))]
    ServiceUnavailable { request_id: Option<String> },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Resolver failure, propagated untranslated
    #[error(transparent)]
    Resolver(#[from] ResolveError),
}

impl AccessError {
    /// HTTP-style status for the enclosing framework to render.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::Forbidden(_) => 403,
            AccessError::ServiceUnavailable { .. } => 503,
            AccessError::Configuration(_) | AccessError::Resolver(_) => 500,
        }
    }

    /// Whether this is an access denial rather than a failure.
    pub fn is_denial(&self) -> bool {
        matches!(self, AccessError::Forbidden(_))
    }

    /// Message safe to show end users; detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            AccessError::Forbidden(_) => "Forbidden",
            AccessError::ServiceUnavailable { .. } => "Service Unavailable",
            AccessError::Configuration(_) | AccessError::Resolver(_) => "Internal Server Error",
        }
    }
}
