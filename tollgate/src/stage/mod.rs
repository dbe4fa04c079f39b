//! Request-level pipeline stages.
//!
//! Unlike a [`Guard`](crate::Guard), which protects one handler, these run
//! once per inbound request and gate it by its logical request id.

pub mod availability;
pub mod permission;

pub use availability::{
    ClosedRequestIds, ServiceAvailability, ServiceAvailabilityStage,
    ServiceAvailabilityStageBuilder,
};
pub use permission::{PermissionCheckConfig, PermissionCheckStage, PermissionCheckStageBuilder};
