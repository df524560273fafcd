//! Workload status values.
//!
//! [`ValidationStatus`] is what the configuration check concludes;
//! [`UnitStatus`] is what gets handed to `status-set`.

use strum::{AsRefStr, Display, EnumString};

use crate::context::{ConfigError, DriverStanza};

pub const READY_MESSAGE: &str = "Unit is ready";
pub const INSTALLING_MESSAGE: &str = "Installing packages";
pub const SHARING_MESSAGE: &str = "Sharing configs with Cinder";

/// Outcome of validating the current configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationStatus {
    Ready,
    Blocked(String),
}

impl ValidationStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl From<&Result<DriverStanza, ConfigError>> for ValidationStatus {
    fn from(result: &Result<DriverStanza, ConfigError>) -> Self {
        match result {
            Ok(_) => Self::Ready,
            Err(err) => Self::Blocked(err.to_string()),
        }
    }
}

/// Workload state names understood by `status-set`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum WorkloadState {
    Maintenance,
    Active,
    Blocked,
}

/// A workload state plus its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitStatus {
    pub state: WorkloadState,
    pub message: String,
}

impl UnitStatus {
    pub fn maintenance(message: impl Into<String>) -> Self {
        Self {
            state: WorkloadState::Maintenance,
            message: message.into(),
        }
    }

    pub fn active(message: impl Into<String>) -> Self {
        Self {
            state: WorkloadState::Active,
            message: message.into(),
        }
    }

    pub fn blocked(message: impl Into<String>) -> Self {
        Self {
            state: WorkloadState::Blocked,
            message: message.into(),
        }
    }

    pub fn ready() -> Self {
        Self::active(READY_MESSAGE)
    }
}

impl From<&ValidationStatus> for UnitStatus {
    fn from(status: &ValidationStatus) -> Self {
        match status {
            ValidationStatus::Ready => Self::ready(),
            ValidationStatus::Blocked(reason) => Self::blocked(reason.clone()),
        }
    }
}
