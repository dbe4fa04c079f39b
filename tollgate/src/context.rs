//! Per-request context.
//!
//! A [`RequestContext`] is created when a request enters the pipeline and
//! dropped (or [`cleared`](RequestContext::clear)) when it leaves. It is
//! passed explicitly through every stage; nothing here is global.

use std::sync::Arc;

use crate::permission::PermissionRecord;

/// Values the access-control layer reads from, and publishes into, the
/// current request.
///
/// # Example
///
/// ```
/// use tollgate::RequestContext;
///
/// let ctx = RequestContext::new()
///     .with_user_id("user01")
///     .with_request_id("R10001")
///     .with_internal_request_id("R10001_confirm");
///
/// assert_eq!(ctx.user_id(), Some("user01"));
/// assert_eq!(ctx.request_id(false), Some("R10001"));
/// assert_eq!(ctx.request_id(true), Some("R10001_confirm"));
/// assert!(ctx.permission().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    user_id: Option<String>,
    request_id: Option<String>,
    internal_request_id: Option<String>,
    permission: Option<Arc<PermissionRecord>>,
}

impl RequestContext {
    /// Create an empty context (anonymous user, no request id).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_internal_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.internal_request_id = Some(request_id.into());
        self
    }

    /// Authenticated user for this request, `None` when anonymous.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Logical operation id: the internal variant (after forwarding) or the
    /// external one the request arrived with.
    pub fn request_id(&self, internal: bool) -> Option<&str> {
        if internal {
            self.internal_request_id.as_deref()
        } else {
            self.request_id.as_deref()
        }
    }

    /// Replace the internal request id, e.g. when a request is forwarded.
    pub fn set_internal_request_id(&mut self, request_id: impl Into<String>) {
        self.internal_request_id = Some(request_id.into());
    }

    /// Publish the permission record for later stages. Overwrites any
    /// previously published record.
    pub fn set_permission(&mut self, permission: Arc<PermissionRecord>) {
        self.permission = Some(permission);
    }

    /// Record published by the permission check stage, if any.
    pub fn permission(&self) -> Option<Arc<PermissionRecord>> {
        self.permission.clone()
    }

    /// End-of-request teardown.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
