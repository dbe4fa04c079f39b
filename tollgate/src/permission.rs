//! Request-id permissions.
//!
//! A [`PermissionRecord`] is an immutable snapshot of the request ids one
//! user may execute. Records are produced by a [`PermissionFactory`] and,
//! after a successful check, published into the [`RequestContext`].

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::context::RequestContext;
use crate::error::ResolveError;
use crate::resolver::GrantedTokenResolver;

/// Sorted set of request ids granted to a user.
///
/// # Example
///
/// ```
/// use tollgate::PermissionRecord;
///
/// let record: PermissionRecord = ["R10001", "R10002"].into_iter().collect();
/// assert!(record.permit("R10001"));
/// assert!(!record.permit("R10003"));
/// assert!(!record.permit(None::<&str>));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionRecord {
    request_ids: Option<BTreeSet<String>>,
}

impl PermissionRecord {
    pub fn new(request_ids: BTreeSet<String>) -> Self {
        Self {
            request_ids: Some(request_ids),
        }
    }

    /// A record whose grant set could not be populated. Permits nothing.
    pub fn unset() -> Self {
        Self { request_ids: None }
    }

    /// Whether `request_id` is granted.
    ///
    /// Accepts `&str` or `Option<&str>`; an absent id or an unset record
    /// yields `false`.
    pub fn permit<'a>(&self, request_id: impl Into<Option<&'a str>>) -> bool {
        match (&self.request_ids, request_id.into()) {
            (Some(ids), Some(id)) => ids.contains(id),
            _ => false,
        }
    }

    /// Granted request ids in lexicographic order.
    pub fn request_ids(&self) -> Option<&BTreeSet<String>> {
        self.request_ids.as_ref()
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionRecord {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Builds the [`PermissionRecord`] for a user.
pub trait PermissionFactory: Send + Sync {
    fn permission(
        &self,
        user_id: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<PermissionRecord, ResolveError>;
}

impl<F> PermissionFactory for F
where
    F: Fn(Option<&str>, &RequestContext) -> Result<PermissionRecord, ResolveError> + Send + Sync,
{
    fn permission(
        &self,
        user_id: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<PermissionRecord, ResolveError> {
        self(user_id, ctx)
    }
}

/// Factory backed by a permission-facet [`GrantedTokenResolver`].
pub struct ResolverPermissionFactory {
    resolver: Arc<dyn GrantedTokenResolver>,
}

impl ResolverPermissionFactory {
    pub fn new(resolver: impl GrantedTokenResolver + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    pub fn from_arc(resolver: Arc<dyn GrantedTokenResolver>) -> Self {
        Self { resolver }
    }
}

impl PermissionFactory for ResolverPermissionFactory {
    fn permission(
        &self,
        user_id: Option<&str>,
        ctx: &RequestContext,
    ) -> Result<PermissionRecord, ResolveError> {
        let granted = self.resolver.resolve(user_id, ctx)?;
        Ok(PermissionRecord::new(granted.into_sorted_set()))
    }
}

impl std::fmt::Debug for ResolverPermissionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverPermissionFactory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MemoryGrantStore;

    #[test]
    fn test_permit_member() {
        let record = PermissionRecord::from_iter(["aaa"]);
        assert!(record.permit("aaa"));
        assert!(!record.permit("aab"));
    }

    #[test]
    fn test_permit_absent_request_id() {
        let record = PermissionRecord::from_iter(["aaa"]);
        assert!(!record.permit(None::<&str>));
    }

    #[test]
    fn test_unset_record_permits_nothing() {
        let record = PermissionRecord::unset();
        assert!(!record.permit("aaa"));
        assert!(!record.permit(None::<&str>));
        assert!(record.request_ids().is_none());
    }

    #[test]
    fn test_request_ids_sorted() {
        let record = PermissionRecord::from_iter(["c", "a", "b"]);
        let ids: Vec<_> = record.request_ids().unwrap().iter().cloned().collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_resolver_factory() {
        let store = MemoryGrantStore::new();
        store.grant("user01", "R001");
        store.grant("user01", "R002");
        let factory = ResolverPermissionFactory::new(store);

        let ctx = RequestContext::new();
        let record = factory.permission(Some("user01"), &ctx).unwrap();
        assert!(record.permit("R001"));
        assert!(record.permit("R002"));

        let anonymous = factory.permission(None, &ctx).unwrap();
        assert!(!anonymous.permit("R001"));
    }

    #[test]
    fn test_factory_from_shared_resolver() {
        let store = Arc::new(MemoryGrantStore::with_grants([("user01", vec!["R001"])]));
        let factory = ResolverPermissionFactory::from_arc(store.clone());
        let ctx = RequestContext::new();

        assert!(!factory.permission(Some("user01"), &ctx).unwrap().permit("R002"));
        store.grant("user01", "R002");
        assert!(factory.permission(Some("user01"), &ctx).unwrap().permit("R002"));
    }

    #[test]
    fn test_closure_factory() {
        let factory = |user: Option<&str>, _: &RequestContext| {
            Ok::<_, ResolveError>(match user {
                Some("admin") => PermissionRecord::from_iter(["R001"]),
                _ => PermissionRecord::unset(),
            })
        };
        let ctx = RequestContext::new();
        assert!(factory.permission(Some("admin"), &ctx).unwrap().permit("R001"));
        assert!(!factory.permission(Some("guest"), &ctx).unwrap().permit("R001"));
    }
}
