//! Startup configuration.
//!
//! ```
//! use tollgate::AccessConfig;
//!
//! let config = AccessConfig::from_json_str(r#"{
//!     "permission_check": { "ignore_request_ids": ["LOGIN"] },
//!     "availability": { "closed_request_ids": ["R20001"] },
//!     "report": { "target_namespace": "app" }
//! }"#)?;
//!
//! assert!(config.permission_check.ignore_request_ids.contains("LOGIN"));
//! assert_eq!(config.report.target_pattern, "^.*Action$");
//! # Ok::<(), tollgate::ConfigError>(())
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::permission::PermissionFactory;
use crate::report::ReportConfig;
use crate::stage::{
    ClosedRequestIds, PermissionCheckConfig, PermissionCheckStage, ServiceAvailabilityStage,
};
use crate::tracing_support::TracingConfig;

/// Settings for [`ServiceAvailabilityStage`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Request ids closed at startup
    pub closed_request_ids: BTreeSet<String>,
    pub uses_internal_request_id: bool,
}

/// All configuration of the access layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    pub tracing: TracingConfig,
    pub permission_check: PermissionCheckConfig,
    pub availability: AvailabilityConfig,
    pub report: ReportConfig,
}

impl AccessConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!(path = %path.display(), "access configuration loaded");
        Ok(config)
    }

    /// Permission check stage using these settings.
    pub fn permission_check_stage(
        &self,
        factory: impl PermissionFactory + 'static,
    ) -> Result<PermissionCheckStage, ConfigError> {
        PermissionCheckStage::builder()
            .factory(factory)
            .config(self.permission_check.clone())
            .build()
    }

    /// Availability stage closing the configured request ids.
    pub fn availability_stage(&self) -> Result<ServiceAvailabilityStage, ConfigError> {
        let closed: ClosedRequestIds = self.availability.closed_request_ids.iter().cloned().collect();
        ServiceAvailabilityStage::builder()
            .availability(closed)
            .uses_internal_request_id(self.availability.uses_internal_request_id)
            .build()
    }
}
