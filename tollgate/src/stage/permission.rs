//! Request-id permission check.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::{AccessError, ConfigError, Forbidden};
use crate::facet::Facet;
use crate::permission::PermissionFactory;
use crate::pipeline::{Middleware, Next};

/// Settings for [`PermissionCheckStage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionCheckConfig {
    /// Request ids that bypass the check (e.g. login, error pages)
    pub ignore_request_ids: BTreeSet<String>,
    /// Check the internal (forwarded) request id instead of the external one
    pub uses_internal_request_id: bool,
}

/// Denies requests whose request id the user is not permitted to run.
///
/// On success the user's [`PermissionRecord`](crate::PermissionRecord) is
/// published into the context, where later stages and the handler can
/// read it with [`RequestContext::permission`].
///
/// # Example
///
/// ```
/// use tollgate::{
///     MemoryGrantStore, PermissionCheckStage, RequestContext, ResolverPermissionFactory,
/// };
///
/// let grants = MemoryGrantStore::with_grants([("user01", vec!["R10001"])]);
/// let stage = PermissionCheckStage::builder()
///     .factory(ResolverPermissionFactory::new(grants))
///     .ignore_request_ids(["LOGIN"])
///     .build()
///     .unwrap();
///
/// let mut ctx = RequestContext::new()
///     .with_user_id("user01")
///     .with_request_id("R10001");
/// stage.check(&mut ctx).unwrap();
/// assert!(ctx.permission().unwrap().permit("R10001"));
/// ```
pub struct PermissionCheckStage {
    factory: Arc<dyn PermissionFactory>,
    config: PermissionCheckConfig,
}

impl PermissionCheckStage {
    pub fn builder() -> PermissionCheckStageBuilder {
        PermissionCheckStageBuilder::default()
    }

    pub fn config(&self) -> &PermissionCheckConfig {
        &self.config
    }

    /// Run the check for the current request.
    pub fn check(&self, ctx: &mut RequestContext) -> Result<(), AccessError> {
        let request_id = ctx
            .request_id(self.config.uses_internal_request_id)
            .map(str::to_string);

        if let Some(id) = request_id.as_deref() {
            if self.config.ignore_request_ids.contains(id) {
                tracing::trace!(request_id = id, "permission check skipped");
                return Ok(());
            }
        }

        let user_id = ctx.user_id().map(str::to_string);
        let permission = self.factory.permission(user_id.as_deref(), ctx)?;

        if permission.permit(request_id.as_deref()) {
            ctx.set_permission(Arc::new(permission));
            Ok(())
        } else {
            let denial = Forbidden::new(
                Facet::Permission,
                user_id.as_deref(),
                request_id.into_iter().collect(),
            );
            tracing::info!("{}", denial);
            Err(denial.into())
        }
    }
}

impl<I, O, E> Middleware<I, O, E> for PermissionCheckStage
where
    E: From<AccessError>,
{
    fn handle(&self, input: I, ctx: &mut RequestContext, next: Next<'_, I, O, E>) -> Result<O, E> {
        self.check(ctx)?;
        next.run(input, ctx)
    }
}

impl std::fmt::Debug for PermissionCheckStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionCheckStage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PermissionCheckStage`]
#[derive(Default)]
pub struct PermissionCheckStageBuilder {
    factory: Option<Arc<dyn PermissionFactory>>,
    config: PermissionCheckConfig,
}

impl PermissionCheckStageBuilder {
    /// Set the permission factory (required)
    pub fn factory(mut self, factory: impl PermissionFactory + 'static) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PermissionCheckConfig) -> Self {
        self.config = config;
        self
    }

    /// Add request ids that skip the check
    pub fn ignore_request_ids<T: Into<String>>(mut self, ids: impl IntoIterator<Item = T>) -> Self {
        self.config
            .ignore_request_ids
            .extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn uses_internal_request_id(mut self, internal: bool) -> Self {
        self.config.uses_internal_request_id = internal;
        self
    }

    pub fn build(self) -> Result<PermissionCheckStage, ConfigError> {
        let factory = self.factory.ok_or(ConfigError::MissingFactory)?;
        Ok(PermissionCheckStage {
            factory,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use crate::permission::{PermissionRecord, ResolverPermissionFactory};
    use crate::pipeline::Pipeline;
    use crate::resolver::MemoryGrantStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stage_for(grants: &[&str]) -> PermissionCheckStageBuilder {
        let store = MemoryGrantStore::with_grants([("user01", grants.to_vec())]);
        PermissionCheckStage::builder().factory(ResolverPermissionFactory::new(store))
    }

    #[test]
    fn test_permitted_request_publishes_record() {
        let stage = stage_for(&["aaa"]).build().unwrap();
        let mut ctx = RequestContext::new()
            .with_user_id("user01")
            .with_request_id("aaa");

        stage.check(&mut ctx).unwrap();

        let record = ctx.permission().expect("record published");
        assert!(record.permit("aaa"));
        assert!(!record.permit("aab"));
    }

    #[test]
    fn test_denied_request_does_not_publish() {
        let stage = stage_for(&["aaa"]).build().unwrap();
        let mut ctx = RequestContext::new()
            .with_user_id("user01")
            .with_request_id("aab");

        match stage.check(&mut ctx) {
            Err(AccessError::Forbidden(denial)) => {
                assert_eq!(
                    denial.to_string(),
                    "permission denied. userId = [user01], requestId = [aab]"
                );
            }
            other => panic!("Expected Forbidden, got {:?}", other),
        }
        assert!(ctx.permission().is_none());
    }

    #[test]
    fn test_ignored_request_skips_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let stage = PermissionCheckStage::builder()
            .factory(move |_: Option<&str>, _: &RequestContext| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ResolveError>(PermissionRecord::unset())
            })
            .ignore_request_ids(["aaa"])
            .build()
            .unwrap();

        let mut ctx = RequestContext::new()
            .with_user_id("user01")
            .with_request_id("aaa");

        stage.check(&mut ctx).unwrap();
        assert!(ctx.permission().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_internal_request_id() {
        let stage = stage_for(&["INTERNAL"])
            .uses_internal_request_id(true)
            .build()
            .unwrap();

        let mut ctx = RequestContext::new()
            .with_user_id("user01")
            .with_request_id("EXTERNAL")
            .with_internal_request_id("INTERNAL");
        assert!(stage.check(&mut ctx).is_ok());

        let external = stage_for(&["INTERNAL"]).build().unwrap();
        let mut ctx = RequestContext::new()
            .with_user_id("user01")
            .with_request_id("EXTERNAL")
            .with_internal_request_id("INTERNAL");
        assert!(external.check(&mut ctx).unwrap_err().is_denial());
    }

    #[test]
    fn test_missing_request_id_is_denied() {
        let stage = stage_for(&["aaa"]).build().unwrap();
        let mut ctx = RequestContext::new().with_user_id("user01");

        let err = stage.check(&mut ctx).unwrap_err();
        assert!(err.is_denial());
        assert_eq!(
            err.to_string(),
            "permission denied. userId = [user01], requestId = []"
        );
    }

    #[test]
    fn test_factory_failure_propagates() {
        let stage = PermissionCheckStage::builder()
            .factory(|_: Option<&str>, _: &RequestContext| {
                Err::<PermissionRecord, _>(ResolveError::Unavailable("db down".into()))
            })
            .build()
            .unwrap();
        let mut ctx = RequestContext::new().with_request_id("aaa");

        assert!(matches!(
            stage.check(&mut ctx),
            Err(AccessError::Resolver(ResolveError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_missing_factory() {
        assert!(matches!(
            PermissionCheckStage::builder().build(),
            Err(ConfigError::MissingFactory)
        ));
    }

    #[test]
    fn test_later_stage_sees_same_record() {
        let stage = stage_for(&["aaa"]).build().unwrap();
        let pipeline = Pipeline::new(|_: (), ctx: &mut RequestContext| {
            Ok::<_, AccessError>(ctx.permission())
        })
        .stage(stage)
        .stage_fn(|input, ctx, next| {
            let seen = ctx.permission().expect("published before this stage");
            let out = next.run(input, ctx)?;
            let at_end = out.clone().expect("still published");
            assert!(Arc::ptr_eq(&seen, &at_end));
            Ok(out)
        });

        let mut ctx = RequestContext::new()
            .with_user_id("user01")
            .with_request_id("aaa");
        let record = pipeline.handle((), &mut ctx).unwrap().unwrap();
        assert!(Arc::ptr_eq(&record, &ctx.permission().unwrap()));
    }

    #[test]
    fn test_config_from_json() {
        let config: PermissionCheckConfig = serde_json::from_str(
            r#"{"ignore_request_ids":["LOGIN","ERROR"],"uses_internal_request_id":true}"#,
        )
        .unwrap();
        assert!(config.ignore_request_ids.contains("LOGIN"));
        assert!(config.uses_internal_request_id);

        let defaults: PermissionCheckConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, PermissionCheckConfig::default());
    }
}
