//! Token evaluators.
//!
//! An evaluator resolves a user's granted tokens and applies a
//! [`CombinationPolicy`] to a required list. It holds no state of its own;
//! any caching belongs to the resolver.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::{ConfigError, ResolveError};
use crate::facet::Facet;
use crate::policy::CombinationPolicy;
use crate::resolver::GrantedTokenResolver;

/// Decides whether a user holds a required token list.
///
/// Implement this to replace the set-based decision entirely (for example
/// to delegate to a remote policy service). Most applications use
/// [`BasicEvaluator`] with their own [`GrantedTokenResolver`].
pub trait TokenEvaluator: Send + Sync {
    /// Facet this evaluator answers for.
    fn facet(&self) -> Facet;

    /// True iff at least one of `required` is granted.
    fn evaluate_any_of(
        &self,
        user_id: Option<&str>,
        required: &[String],
        ctx: &RequestContext,
    ) -> Result<bool, ResolveError>;

    /// True iff every one of `required` is granted.
    fn evaluate_all_of(
        &self,
        user_id: Option<&str>,
        required: &[String],
        ctx: &RequestContext,
    ) -> Result<bool, ResolveError>;

    /// Dispatch on `policy`.
    fn evaluate(
        &self,
        user_id: Option<&str>,
        required: &[String],
        policy: CombinationPolicy,
        ctx: &RequestContext,
    ) -> Result<bool, ResolveError> {
        match policy {
            CombinationPolicy::AllOf => self.evaluate_all_of(user_id, required, ctx),
            CombinationPolicy::AnyOf => self.evaluate_any_of(user_id, required, ctx),
        }
    }
}

/// Set-comparison evaluator over a [`GrantedTokenResolver`].
///
/// # Example
///
/// ```
/// use tollgate::{BasicEvaluator, MemoryGrantStore, RequestContext, TokenEvaluator};
///
/// let store = MemoryGrantStore::with_grants([("user01", vec!["FOO", "BAR"])]);
/// let evaluator = BasicEvaluator::role(store);
/// let ctx = RequestContext::new();
///
/// let required = vec!["FOO".to_string(), "BAZ".to_string()];
/// assert!(!evaluator.evaluate_all_of(Some("user01"), &required, &ctx).unwrap());
/// assert!(evaluator.evaluate_any_of(Some("user01"), &required, &ctx).unwrap());
/// ```
#[derive(Clone)]
pub struct BasicEvaluator {
    facet: Facet,
    resolver: Arc<dyn GrantedTokenResolver>,
}

impl BasicEvaluator {
    pub fn new(facet: Facet, resolver: impl GrantedTokenResolver + 'static) -> Self {
        Self {
            facet,
            resolver: Arc::new(resolver),
        }
    }

    /// Evaluator for the authority facet.
    pub fn authority(resolver: impl GrantedTokenResolver + 'static) -> Self {
        Self::new(Facet::Authority, resolver)
    }

    /// Evaluator for the role facet.
    pub fn role(resolver: impl GrantedTokenResolver + 'static) -> Self {
        Self::new(Facet::Role, resolver)
    }

    /// Builder for wiring from optional configuration.
    pub fn builder(facet: Facet) -> BasicEvaluatorBuilder {
        BasicEvaluatorBuilder {
            facet,
            resolver: None,
        }
    }

    fn decide(
        &self,
        user_id: Option<&str>,
        required: &[String],
        policy: CombinationPolicy,
        ctx: &RequestContext,
    ) -> Result<bool, ResolveError> {
        let granted = self.resolver.resolve(user_id, ctx)?;
        let allowed = policy.is_satisfied(required, &granted);
        tracing::debug!(
            facet = %self.facet,
            user_id = user_id.unwrap_or(""),
            required = ?required,
            policy = %policy,
            allowed,
            "evaluated"
        );
        Ok(allowed)
    }
}

impl TokenEvaluator for BasicEvaluator {
    fn facet(&self) -> Facet {
        self.facet
    }

    fn evaluate_any_of(
        &self,
        user_id: Option<&str>,
        required: &[String],
        ctx: &RequestContext,
    ) -> Result<bool, ResolveError> {
        self.decide(user_id, required, CombinationPolicy::AnyOf, ctx)
    }

    fn evaluate_all_of(
        &self,
        user_id: Option<&str>,
        required: &[String],
        ctx: &RequestContext,
    ) -> Result<bool, ResolveError> {
        self.decide(user_id, required, CombinationPolicy::AllOf, ctx)
    }
}

impl std::fmt::Debug for BasicEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicEvaluator")
            .field("facet", &self.facet)
            .finish_non_exhaustive()
    }
}

/// Builder for [`BasicEvaluator`].
pub struct BasicEvaluatorBuilder {
    facet: Facet,
    resolver: Option<Arc<dyn GrantedTokenResolver>>,
}

impl BasicEvaluatorBuilder {
    /// Set the resolver
    pub fn resolver(mut self, resolver: impl GrantedTokenResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Set a shared resolver
    pub fn shared_resolver(mut self, resolver: Arc<dyn GrantedTokenResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Build the evaluator. Fails when no resolver was given.
    pub fn build(self) -> Result<BasicEvaluator, ConfigError> {
        let resolver = self
            .resolver
            .ok_or(ConfigError::MissingResolver { facet: self.facet })?;
        Ok(BasicEvaluator {
            facet: self.facet,
            resolver,
        })
    }
}
