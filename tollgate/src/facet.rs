//! Access-control facets.

use serde::{Deserialize, Serialize};

/// One of the parallel access-control dimensions.
///
/// Each facet has its own resolver but the same combination semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    /// Fine-grained authority names
    Authority,
    /// Role names
    Role,
    /// Logical request (operation) ids
    Permission,
}

impl Facet {
    /// Singular label used in messages and report headers.
    pub fn label(&self) -> &'static str {
        match self {
            Facet::Authority => "authority",
            Facet::Role => "role",
            Facet::Permission => "permission",
        }
    }

    /// Label for a list of tokens of this facet.
    pub fn plural(&self) -> &'static str {
        match self {
            Facet::Authority => "authorities",
            Facet::Role => "roles",
            Facet::Permission => "requestIds",
        }
    }
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
