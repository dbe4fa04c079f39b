//! # tollgate: role, authority and request-id access control
//!
//! A small access-control layer for request handlers.
//!
//! ## Core Principles
//!
//! - **Pluggable grants**: applications supply a [`GrantedTokenResolver`] per facet
//! - **Decide once, at the edge**: a [`Guard`] denies before the handler runs
//! - **Explicit request state**: a [`RequestContext`] is passed down the chain,
//!   there is no thread-local lookup
//! - **Typed failures**: denials, misconfiguration and store failures are
//!   separate [`AccessError`] variants
//!
//! ## Quick Start
//!
//! ```rust
//! use tollgate::{
//!     AccessResult, BasicEvaluator, Evaluators, GuardedRouter, MemoryGrantStore,
//!     RequestContext, State,
//! };
//!
//! pub struct AppState {
//!     pub greeting: String,
//! }
//!
//! #[derive(GuardedRouter)]
//! #[tollgate(state = AppState)]
//! enum UserAction {
//!     #[tollgate(handler = handlers::show)]
//!     Show(u64),
//!
//!     #[tollgate(handler = handlers::delete, roles = ["ADMIN"])]
//!     Delete(u64),
//! }
//!
//! mod handlers {
//!     use super::*;
//!
//!     pub fn show(state: State<AppState>, _ctx: &mut RequestContext, id: u64) -> AccessResult<String> {
//!         Ok(format!("{} {}", state.get().greeting, id))
//!     }
//!
//!     pub fn delete(_state: State<AppState>, _ctx: &mut RequestContext, id: u64) -> AccessResult<String> {
//!         Ok(format!("deleted {}", id))
//!     }
//! }
//!
//! fn main() {
//!     let roles = MemoryGrantStore::with_grants([("alice", vec!["ADMIN"])]);
//!     let evaluators = Evaluators::new().role(BasicEvaluator::role(roles));
//!     evaluators.validate(UserAction::required_facets()).unwrap();
//!
//!     let state = State::new(AppState { greeting: "user".to_string() });
//!
//!     let mut ctx = RequestContext::new().with_user_id("bob");
//!     let response = UserAction::Delete(7).execute(state.clone(), &mut ctx, &evaluators);
//!     assert_eq!(response.status, 403);
//!
//!     let mut ctx = RequestContext::new().with_user_id("alice");
//!     let response = UserAction::Delete(7).execute(state, &mut ctx, &evaluators);
//!     assert_eq!(response.status, 200);
//!     assert_eq!(response.output.to_string(), "deleted 7");
//! }
//! ```

use std::sync::Arc;

use serde::Serialize;

// Re-export the derive macro
pub use tollgate_macros::GuardedRouter;

pub mod check;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod facet;
pub mod guard;
pub mod permission;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod stage;
pub mod token;
pub mod tracing_support;

pub use config::{AccessConfig, AvailabilityConfig};
pub use context::RequestContext;
pub use error::{AccessError, AccessResult, ConfigError, Forbidden, ResolveError};
pub use evaluator::{BasicEvaluator, BasicEvaluatorBuilder, TokenEvaluator};
pub use facet::Facet;
pub use guard::{Evaluators, Guard, GuardConfig};
pub use permission::{PermissionFactory, PermissionRecord, ResolverPermissionFactory};
pub use pipeline::{Middleware, Next, Pipeline};
pub use policy::CombinationPolicy;
pub use report::{GuardRegistration, GuardReport, ReportConfig};
pub use resolver::{FileGrantStore, GrantedTokenResolver, MemoryGrantStore};
pub use stage::{
    ClosedRequestIds, PermissionCheckConfig, PermissionCheckStage, ServiceAvailability,
    ServiceAvailabilityStage,
};
pub use token::GrantedTokens;
pub use tracing_support::{
    init_subscriber, init_subscriber_with_config, TracingConfig, TracingFormat,
};

// ============================================================================
// Core Types
// ============================================================================

/// Shared application state wrapper.
///
/// Handlers receive this by value; cloning only bumps a reference count.
///
/// # Example
///
/// ```
/// use tollgate::State;
///
/// struct AppState {
///     realm: String,
/// }
///
/// let state = State::new(AppState {
///     realm: "production".to_string(),
/// });
///
/// assert_eq!(state.get().realm, "production");
/// ```
pub struct State<T>(Arc<T>);

impl<T> State<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

// Manual impl: `T` itself need not be Clone
impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Response produced by a routed handler.
#[derive(Debug)]
pub struct Response {
    /// HTTP-style status (200 ok, 403 forbidden, 503 unavailable, 500 internal).
    pub status: u16,

    pub output: Output,
}

impl Response {
    /// Successful response with text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            status: 200,
            output: Output::Text(content.into()),
        }
    }

    /// Successful response without a body.
    pub fn silent() -> Self {
        Self {
            status: 200,
            output: Output::Silent,
        }
    }

    /// Successful response with a serialized JSON body.
    ///
    /// A value that fails to serialize yields a 500 response.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self {
                status: 200,
                output: Output::Json(body),
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response body");
                Self::error(500, "Internal Server Error")
            }
        }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            output: Output::Text(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body of a [`Response`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Silent,

    Text(String),

    /// Serialized JSON (for machine-readable responses).
    Json(String),
}

impl Output {
    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Silent)
    }
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Silent => Ok(()),
            Output::Text(s) | Output::Json(s) => write!(f, "{}", s),
        }
    }
}

/// Wrapper rendering its value as a JSON body.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

// ============================================================================
// Response Conversion Trait
// ============================================================================

/// Conversion of handler return values into responses.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::silent()
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        Response::json(&self.0)
    }
}

/// Only the generic public message is rendered; the diagnostic detail
/// (user id, tokens) is logged where the error was raised.
impl IntoResponse for AccessError {
    fn into_response(self) -> Response {
        if !self.is_denial() {
            tracing::error!(error = %self, "request failed");
        }
        Response::error(self.status_code(), self.public_message())
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
