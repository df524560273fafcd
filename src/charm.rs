//! Hook handlers for the HPE 3PAR subordinate.
//!
//! Every hook re-reads configuration and re-derives status from scratch, so
//! a `blocked` status clears as soon as the operator fixes the options.
//!
//! ```text
//! install                          -> apt-get, active
//! config-changed / upgrade-charm   -> validate, publish to all relations
//! storage-backend-relation-*       -> publish to the triggering relation
//! ```

use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, info, warn, Level};

use crate::context::{self, DriverStanza, SubordinateConfiguration};
use crate::error::{CharmError, Result};
use crate::hook_tools::HookTools;
use crate::options::OptionSet;
use crate::status::{UnitStatus, INSTALLING_MESSAGE, SHARING_MESSAGE};

/// Endpoint the principal cinder charm is related on
pub const STORAGE_BACKEND: &str = "storage-backend";

/// Relation key holding the backend name
pub const BACKEND_NAME_KEY: &str = "backend_name";

/// Relation key holding the JSON stanza document
pub const SUBORDINATE_CONFIGURATION_KEY: &str = "subordinate_configuration";

/// Packages the driver needs on the cinder-volume host.
///
/// `sysfsutils` provides `systool`, which os-brick uses to read FC HBA details.
pub const PACKAGES: &[&str] = &["python3-3parclient", "sysfsutils"];

/// Hooks this charm handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Display, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Hook {
    Install,
    ConfigChanged,
    UpgradeCharm,
    StorageBackendRelationJoined,
    StorageBackendRelationChanged,
}

impl Hook {
    /// Parse a hook name; unknown hooks yield `None`
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// The charm, bound to one application name and one agent connection
pub struct ThreeParCharm<H: HookTools> {
    tools: H,
    service: String,
}

impl<H: HookTools> ThreeParCharm<H> {
    pub fn new(tools: H, service: impl Into<String>) -> Self {
        Self {
            tools,
            service: service.into(),
        }
    }

    pub fn tools(&self) -> &H {
        &self.tools
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Run the handler for `hook`.
    ///
    /// `relation_id` is the triggering relation for relation hooks.
    pub fn dispatch(&self, hook: Hook, relation_id: Option<&str>) -> Result<()> {
        info!("Running {} hook for {}", hook, self.service);
        match hook {
            Hook::Install => self.on_install(),
            Hook::ConfigChanged | Hook::UpgradeCharm => self.on_config_changed(),
            Hook::StorageBackendRelationJoined | Hook::StorageBackendRelationChanged => {
                let relation_id = relation_id.ok_or_else(|| {
                    CharmError::environment(format!("{} hook run without a relation id", hook))
                })?;
                self.on_storage_backend(relation_id)
            }
        }
    }

    pub fn on_install(&self) -> Result<()> {
        self.tools.status_set(&UnitStatus::maintenance(INSTALLING_MESSAGE))?;
        self.tools.apt_install(PACKAGES)?;
        self.tools.status_set(&UnitStatus::ready())
    }

    /// Validate the configuration and share it on every storage-backend relation
    pub fn on_config_changed(&self) -> Result<()> {
        let options = self.tools.config()?;
        let Some(stanza) = self.build_or_block(&options)? else {
            return Ok(());
        };
        self.tools.status_set(&UnitStatus::maintenance(SHARING_MESSAGE))?;

        let relation_ids = self.tools.relation_ids(STORAGE_BACKEND)?;
        if relation_ids.is_empty() {
            info!("No '{}' relation detected, skipping", STORAGE_BACKEND);
        }

        let backend_name = context::backend_name(&options, &self.service);
        let document = SubordinateConfiguration::new(self.service.clone(), stanza).to_json()?;
        for relation_id in relation_ids {
            if self.tools.relation_units(&relation_id)?.is_empty() {
                debug!("{} has no remote units yet", relation_id);
                continue;
            }
            self.publish(&relation_id, &backend_name, &document)?;
        }

        self.tools.status_set(&UnitStatus::ready())
    }

    /// Share the configuration on the relation that just joined or changed
    pub fn on_storage_backend(&self, relation_id: &str) -> Result<()> {
        let options = self.tools.config()?;
        let backend_name = context::backend_name(&options, &self.service);
        self.tools
            .relation_set(relation_id, &[(BACKEND_NAME_KEY, backend_name.as_str())])?;

        let Some(stanza) = self.build_or_block(&options)? else {
            return Ok(());
        };
        let document = SubordinateConfiguration::new(self.service.clone(), stanza).to_json()?;
        self.publish(relation_id, &backend_name, &document)?;
        self.tools.status_set(&UnitStatus::ready())
    }

    /// Build the stanza, or set `blocked` and return `None`
    fn build_or_block(&self, options: &OptionSet) -> Result<Option<DriverStanza>> {
        match context::build(options, &self.service) {
            Ok(stanza) => Ok(Some(stanza)),
            Err(err) => {
                let message = err.to_string();
                warn!("Configuration blocked: {}", message);
                self.tools.log(Level::WARN, &message)?;
                self.tools.status_set(&UnitStatus::blocked(message))?;
                Ok(None)
            }
        }
    }

    fn publish(&self, relation_id: &str, backend_name: &str, document: &str) -> Result<()> {
        info!("Setting relation data for {}", relation_id);
        self.tools.log(
            Level::INFO,
            &format!("Setting relation data for {}", relation_id),
        )?;
        self.tools.relation_set(
            relation_id,
            &[
                (BACKEND_NAME_KEY, backend_name),
                (SUBORDINATE_CONFIGURATION_KEY, document),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_hook_names() {
        assert_eq!(Hook::from_name("install"), Some(Hook::Install));
        assert_eq!(Hook::from_name("config-changed"), Some(Hook::ConfigChanged));
        assert_eq!(
            Hook::from_name("storage-backend-relation-joined"),
            Some(Hook::StorageBackendRelationJoined)
        );
        assert_eq!(Hook::from_name("update-status"), None);
        assert_eq!(Hook::StorageBackendRelationChanged.to_string(), "storage-backend-relation-changed");
    }

    #[test]
    fn test_hook_names_round_trip() {
        for hook in Hook::iter() {
            assert_eq!(Hook::from_name(hook.as_ref()), Some(hook));
        }
    }
}
