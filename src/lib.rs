//! cinder-three-par
//!
//! Juju subordinate charm that turns its configuration into the HPE 3PAR
//! backend section of `/etc/cinder/cinder.conf` and hands it to the principal
//! cinder charm over the `storage-backend` relation.

pub mod charm;
pub mod cli;
pub mod context;
pub mod driver;
pub mod error;
pub mod hook_tools;
pub mod options;
pub mod process;
pub mod sanity;
pub mod settings;
pub mod status;

// Re-export main types for convenience
pub use charm::{Hook, ThreeParCharm};
pub use context::{build, ConfigError, DriverStanza, SubordinateConfiguration};
pub use driver::DriverType;
pub use error::CharmError;
pub use hook_tools::{HookTools, JujuHookTools, MemoryHookTools};
pub use options::{OptionSet, OptionValue};
pub use settings::RuntimeSettings;
pub use status::{UnitStatus, ValidationStatus, WorkloadState};
