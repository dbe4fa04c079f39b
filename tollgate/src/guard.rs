//! Authority and role guards.
//!
//! A [`Guard`] is built once at startup from a [`GuardConfig`] and an
//! evaluator, then attached to a handler either by wrapping it
//! ([`Guard::wrap`]) or by adding it as a [`Pipeline`](crate::Pipeline)
//! stage. Per invocation it reads the user id from the
//! [`RequestContext`], evaluates, and either calls through or denies.
//!
//! ```
//! use std::sync::Arc;
//! use tollgate::{
//!     AccessError, BasicEvaluator, Guard, GuardConfig, MemoryGrantStore, RequestContext,
//! };
//!
//! let store = MemoryGrantStore::with_grants([("user01", vec!["ADMIN"])]);
//! let guard = Guard::new(GuardConfig::roles(["ADMIN"]), Arc::new(BasicEvaluator::role(store)))?;
//!
//! let delete_user = guard.wrap(|id: u32, _ctx: &mut RequestContext| {
//!     Ok::<_, AccessError>(format!("deleted {id}"))
//! });
//!
//! let mut ctx = RequestContext::new().with_user_id("user01");
//! assert_eq!(delete_user(7, &mut ctx)?, "deleted 7");
//!
//! let mut ctx = RequestContext::new().with_user_id("user02");
//! assert!(delete_user(7, &mut ctx).unwrap_err().is_denial());
//! # Ok::<(), AccessError>(())
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::{AccessError, ConfigError, Forbidden};
use crate::evaluator::TokenEvaluator;
use crate::facet::Facet;
use crate::pipeline::{Middleware, Next};
use crate::policy::CombinationPolicy;

/// Static configuration of one guard point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    pub facet: Facet,
    /// Required tokens; order only matters for messages
    pub tokens: Vec<String>,
    /// `true` for any-of, `false` (default) for all-of
    #[serde(default)]
    pub any_of: bool,
}

impl GuardConfig {
    pub fn new<T: Into<String>>(facet: Facet, tokens: impl IntoIterator<Item = T>) -> Self {
        Self {
            facet,
            tokens: tokens.into_iter().map(Into::into).collect(),
            any_of: false,
        }
    }

    /// All-of role guard.
    pub fn roles<T: Into<String>>(tokens: impl IntoIterator<Item = T>) -> Self {
        Self::new(Facet::Role, tokens)
    }

    /// All-of authority guard.
    pub fn authorities<T: Into<String>>(tokens: impl IntoIterator<Item = T>) -> Self {
        Self::new(Facet::Authority, tokens)
    }

    /// Switch to any-of.
    pub fn any_of(mut self) -> Self {
        self.any_of = true;
        self
    }

    pub fn policy(&self) -> CombinationPolicy {
        CombinationPolicy::from_any_of(self.any_of)
    }
}

/// A configured check in front of a handler.
#[derive(Clone)]
pub struct Guard {
    config: GuardConfig,
    evaluator: Arc<dyn TokenEvaluator>,
}

impl Guard {
    /// Bind `config` to `evaluator`.
    ///
    /// Fails for an empty token list, for the permission facet (which is
    /// checked per request by [`PermissionCheckStage`](crate::PermissionCheckStage)),
    /// and when the evaluator answers for a different facet.
    pub fn new(config: GuardConfig, evaluator: Arc<dyn TokenEvaluator>) -> Result<Self, ConfigError> {
        if config.tokens.is_empty() {
            return Err(ConfigError::EmptyTokens {
                facet: config.facet,
            });
        }
        if config.facet == Facet::Permission {
            return Err(ConfigError::PermissionGuard);
        }
        if evaluator.facet() != config.facet {
            return Err(ConfigError::FacetMismatch {
                expected: config.facet,
                actual: evaluator.facet(),
            });
        }
        Ok(Self { config, evaluator })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Evaluate for the current request.
    pub fn check(&self, ctx: &RequestContext) -> Result<(), AccessError> {
        let user_id = ctx.user_id();
        let authorized = self.evaluator.evaluate(
            user_id,
            &self.config.tokens,
            self.config.policy(),
            ctx,
        )?;

        if authorized {
            Ok(())
        } else {
            let denial = Forbidden::new(self.config.facet, user_id, self.config.tokens.clone());
            tracing::debug!(facet = %self.config.facet, "{}", denial);
            Err(denial.into())
        }
    }

    /// Wrap `handler` so it only runs when the check passes.
    ///
    /// The handler's own result is returned unchanged; denials and
    /// resolver failures are converted into `E`.
    pub fn wrap<I, O, E, H>(self, handler: H) -> impl Fn(I, &mut RequestContext) -> Result<O, E>
    where
        H: Fn(I, &mut RequestContext) -> Result<O, E>,
        E: From<AccessError>,
    {
        move |input, ctx| {
            self.check(ctx)?;
            handler(input, ctx)
        }
    }
}

impl<I, O, E> Middleware<I, O, E> for Guard
where
    E: From<AccessError>,
{
    fn handle(&self, input: I, ctx: &mut RequestContext, next: Next<'_, I, O, E>) -> Result<O, E> {
        self.check(ctx)?;
        next.run(input, ctx)
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guard")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The authority and role evaluators of an application, wired at startup.
///
/// Looking up a facet that was never configured is a [`ConfigError`], not a
/// denial. Call [`validate`](Self::validate) with the facets a route table
/// uses to surface that at startup instead of on the first request.
#[derive(Clone, Default)]
pub struct Evaluators {
    authority: Option<Arc<dyn TokenEvaluator>>,
    role: Option<Arc<dyn TokenEvaluator>>,
}

impl Evaluators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authority evaluator
    pub fn authority(mut self, evaluator: impl TokenEvaluator + 'static) -> Self {
        self.authority = Some(Arc::new(evaluator));
        self
    }

    /// Set the role evaluator
    pub fn role(mut self, evaluator: impl TokenEvaluator + 'static) -> Self {
        self.role = Some(Arc::new(evaluator));
        self
    }

    /// Evaluator for `facet`.
    pub fn get(&self, facet: Facet) -> Result<Arc<dyn TokenEvaluator>, ConfigError> {
        let evaluator = match facet {
            Facet::Authority => self.authority.as_ref(),
            Facet::Role => self.role.as_ref(),
            Facet::Permission => None,
        };
        evaluator
            .cloned()
            .ok_or(ConfigError::MissingEvaluator { facet })
    }

    /// Build a guard from `config` using the matching evaluator.
    pub fn guard(&self, config: GuardConfig) -> Result<Guard, ConfigError> {
        let evaluator = self.get(config.facet)?;
        Guard::new(config, evaluator)
    }

    /// Check that every facet in `facets` has an evaluator.
    pub fn validate(&self, facets: impl IntoIterator<Item = Facet>) -> Result<(), ConfigError> {
        for facet in facets {
            self.get(facet)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Evaluators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluators")
            .field("authority", &self.authority.is_some())
            .field("role", &self.role.is_some())
            .finish()
    }
}
