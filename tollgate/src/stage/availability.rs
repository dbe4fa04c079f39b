//! Service availability check.
//!
//! Lets operators close individual request ids (maintenance windows,
//! incident response) without redeploying.

use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::context::RequestContext;
use crate::error::{AccessError, ConfigError};
use crate::pipeline::{Middleware, Next};

/// Answers whether a request id is currently served.
pub trait ServiceAvailability: Send + Sync {
    fn is_available(&self, request_id: Option<&str>) -> bool;
}

impl<F> ServiceAvailability for F
where
    F: Fn(Option<&str>) -> bool + Send + Sync,
{
    fn is_available(&self, request_id: Option<&str>) -> bool {
        self(request_id)
    }
}

/// Availability backed by a mutable set of closed request ids.
#[derive(Debug, Default)]
pub struct ClosedRequestIds {
    closed: RwLock<BTreeSet<String>>,
}

impl ClosedRequestIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self, request_id: impl Into<String>) {
        self.closed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id.into());
    }

    /// Reopen a request id. Returns whether it was closed.
    pub fn open(&self, request_id: &str) -> bool {
        self.closed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(request_id)
    }

    pub fn is_closed(&self, request_id: &str) -> bool {
        self.closed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(request_id)
    }
}

impl<S: Into<String>> FromIterator<S> for ClosedRequestIds {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self {
            closed: RwLock::new(iter.into_iter().map(Into::into).collect()),
        }
    }
}

impl ServiceAvailability for ClosedRequestIds {
    fn is_available(&self, request_id: Option<&str>) -> bool {
        request_id.map_or(true, |id| !self.is_closed(id))
    }
}

/// Rejects requests for request ids that are not currently available.
pub struct ServiceAvailabilityStage {
    availability: Arc<dyn ServiceAvailability>,
    uses_internal_request_id: bool,
}

impl ServiceAvailabilityStage {
    pub fn builder() -> ServiceAvailabilityStageBuilder {
        ServiceAvailabilityStageBuilder::default()
    }

    pub fn check(&self, ctx: &RequestContext) -> Result<(), AccessError> {
        let request_id = ctx.request_id(self.uses_internal_request_id);
        if self.availability.is_available(request_id) {
            return Ok(());
        }
        let err = AccessError::ServiceUnavailable {
            request_id: request_id.map(str::to_string),
        };
        tracing::trace!("{}", err);
        Err(err)
    }
}

impl<I, O, E> Middleware<I, O, E> for ServiceAvailabilityStage
where
    E: From<AccessError>,
{
    fn handle(&self, input: I, ctx: &mut RequestContext, next: Next<'_, I, O, E>) -> Result<O, E> {
        self.check(ctx)?;
        next.run(input, ctx)
    }
}

impl std::fmt::Debug for ServiceAvailabilityStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAvailabilityStage")
            .field("uses_internal_request_id", &self.uses_internal_request_id)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ServiceAvailabilityStageBuilder {
    availability: Option<Arc<dyn ServiceAvailability>>,
    uses_internal_request_id: bool,
}

impl ServiceAvailabilityStageBuilder {
    pub fn availability(mut self, availability: impl ServiceAvailability + 'static) -> Self {
        self.availability = Some(Arc::new(availability));
        self
    }

    /// Use an availability source the application keeps a handle to
    pub fn shared_availability(mut self, availability: Arc<dyn ServiceAvailability>) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn uses_internal_request_id(mut self, internal: bool) -> Self {
        self.uses_internal_request_id = internal;
        self
    }

    pub fn build(self) -> Result<ServiceAvailabilityStage, ConfigError> {
        Ok(ServiceAvailabilityStage {
            availability: self.availability.ok_or(ConfigError::MissingAvailability)?,
            uses_internal_request_id: self.uses_internal_request_id,
        })
    }
}
