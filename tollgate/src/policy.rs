//! Combination policy for required token sets.

use serde::{Deserialize, Serialize};

use crate::token::GrantedTokens;

/// How a required token list is combined against a granted set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationPolicy {
    /// Every required token must be granted (default)
    #[default]
    AllOf,
    /// At least one required token must be granted
    AnyOf,
}

impl CombinationPolicy {
    /// Map the boolean `any_of` flag used by guard configuration.
    pub fn from_any_of(any_of: bool) -> Self {
        if any_of {
            CombinationPolicy::AnyOf
        } else {
            CombinationPolicy::AllOf
        }
    }

    /// Whether this is [`CombinationPolicy::AnyOf`].
    pub fn is_any_of(&self) -> bool {
        matches!(self, CombinationPolicy::AnyOf)
    }

    /// Apply the policy.
    ///
    /// An empty `required` list satisfies `AllOf` and never satisfies `AnyOf`.
    pub fn is_satisfied<S: AsRef<str>>(&self, required: &[S], granted: &GrantedTokens) -> bool {
        match self {
            CombinationPolicy::AllOf => required.iter().all(|t| granted.contains(t.as_ref())),
            CombinationPolicy::AnyOf => required.iter().any(|t| granted.contains(t.as_ref())),
        }
    }
}

impl std::fmt::Display for CombinationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CombinationPolicy::AllOf => write!(f, "all_of"),
            CombinationPolicy::AnyOf => write!(f, "any_of"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn granted(tokens: &[&str]) -> GrantedTokens {
        tokens.iter().copied().collect()
    }

    #[test]
    fn test_default_is_all_of() {
        assert_eq!(CombinationPolicy::default(), CombinationPolicy::AllOf);
        assert_eq!(CombinationPolicy::from_any_of(false), CombinationPolicy::AllOf);
        assert_eq!(CombinationPolicy::from_any_of(true), CombinationPolicy::AnyOf);
        assert!(!CombinationPolicy::AllOf.is_any_of());
        assert!(CombinationPolicy::AnyOf.is_any_of());
    }

    #[test]
    fn test_all_of() {
        let g = granted(&["FOO", "BAR", "FIZZ", "BUZZ"]);
        assert!(CombinationPolicy::AllOf.is_satisfied(&["FOO", "BAR"], &g));

        let g = granted(&["BAR", "FIZZ"]);
        assert!(!CombinationPolicy::AllOf.is_satisfied(&["FOO", "BAR"], &g));
    }

    #[test]
    fn test_any_of() {
        let g = granted(&["FIZZ", "BAR", "BUZZ"]);
        assert!(CombinationPolicy::AnyOf.is_satisfied(&["FOO", "BAR"], &g));

        let g = granted(&["FIZZ", "BUZZ"]);
        assert!(!CombinationPolicy::AnyOf.is_satisfied(&["FOO", "BAR"], &g));
    }

    #[test]
    fn test_empty_required() {
        let none: [&str; 0] = [];
        let g = granted(&["FOO"]);
        assert!(CombinationPolicy::AllOf.is_satisfied(&none, &g));
        assert!(!CombinationPolicy::AnyOf.is_satisfied(&none, &g));
        assert!(CombinationPolicy::AllOf.is_satisfied(&none, &GrantedTokens::new()));
        assert!(!CombinationPolicy::AnyOf.is_satisfied(&none, &GrantedTokens::new()));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&CombinationPolicy::AnyOf).unwrap();
        assert_eq!(json, r#""any_of""#);
        let parsed: CombinationPolicy = serde_json::from_str(r#""all_of""#).unwrap();
        assert_eq!(parsed, CombinationPolicy::AllOf);
    }

    proptest! {
        #[test]
        fn test_all_of_is_subset(
            required in prop::collection::vec("[A-E]", 0..6),
            held in prop::collection::btree_set("[A-E]", 0..6),
        ) {
            let g = GrantedTokens::from(held.clone());
            let req: BTreeSet<String> = required.iter().cloned().collect();
            prop_assert_eq!(
                CombinationPolicy::AllOf.is_satisfied(&required, &g),
                req.is_subset(&held)
            );
        }

        #[test]
        fn test_any_of_is_intersection(
            required in prop::collection::vec("[A-E]", 0..6),
            held in prop::collection::btree_set("[A-E]", 0..6),
        ) {
            let g = GrantedTokens::from(held.clone());
            let req: BTreeSet<String> = required.iter().cloned().collect();
            prop_assert_eq!(
                CombinationPolicy::AnyOf.is_satisfied(&required, &g),
                req.intersection(&held).next().is_some()
            );
        }
    }
}
