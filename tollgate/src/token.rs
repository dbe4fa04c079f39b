//! Granted token sets.
//!
//! A token is an opaque string naming one unit of access control: an
//! authority, a role, or a request id. Equality is exact string equality.

use std::collections::btree_set;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The set of tokens a resolver reports for one user.
///
/// Always a proper set: building it from an iterator with repeated tokens
/// collapses them. A user without grants is represented by an empty set,
/// never by an absent value.
///
/// # Example
///
/// ```
/// use tollgate::GrantedTokens;
///
/// let granted: GrantedTokens = ["FOO", "BAR", "FOO"].into_iter().collect();
/// assert_eq!(granted.len(), 2);
/// assert!(granted.contains("FOO"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrantedTokens(BTreeSet<String>);

impl GrantedTokens {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `token` is granted.
    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no token is granted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate tokens in lexicographic order.
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }

    /// Consume into the underlying sorted set.
    pub fn into_sorted_set(self) -> BTreeSet<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for GrantedTokens {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeSet<String>> for GrantedTokens {
    fn from(set: BTreeSet<String>) -> Self {
        Self(set)
    }
}

impl IntoIterator for GrantedTokens {
    type Item = String;
    type IntoIter = btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a GrantedTokens {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
