//! The `cinder.conf` backend stanza.
//!
//! [`build`] turns the charm's option snapshot into the ordered list of
//! `key = value` lines cinder writes into the backend's section, and
//! [`SubordinateConfiguration`] wraps that list in the document the
//! principal charm expects on the `storage-backend` relation.
//!
//! # Rules
//!
//! - Keys are emitted in option order with `-` replaced by `_`.
//! - Negative snapshot retention/expiration means "leave unset" and the
//!   option is dropped.
//! - An empty `volume-backend-name` falls back to the service name.
//! - `volume_driver` is always the last entry and appears exactly once.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::driver::{DriverType, REQUIRED_OPTIONS};
use crate::options::{keys, OptionSet, OptionValue};
use crate::status::ValidationStatus;

/// Principal application the stanza is addressed to
pub const PRINCIPAL: &str = "cinder";

/// Configuration file the stanza lands in
pub const CINDER_CONF: &str = "/etc/cinder/cinder.conf";

/// Stanza key carrying the driver class
pub const VOLUME_DRIVER_KEY: &str = "volume_driver";

/// Stanza key carrying the backend name
pub const VOLUME_BACKEND_NAME_KEY: &str = "volume_backend_name";

/// Options whose negative values mean "do not configure"
const SNAPSHOT_POLICY_OPTIONS: &[&str] = &[keys::SNAPSHOT_RETENTION, keys::SNAPSHOT_EXPIRATION];

/// Operator-correctable configuration problems
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Names of the mandatory options that are not set, sorted
    #[error("Missing options: {}", .0.join(","))]
    MissingOptions(Vec<String>),

    /// `driver-type` is not one of the supported drivers
    #[error("Invalid config (driver-type): {0}")]
    InvalidDriverType(String),
}

/// Ordered `(key, value)` lines for one `cinder.conf` section
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DriverStanza {
    entries: Vec<(String, OptionValue)>,
}

impl DriverStanza {
    fn push(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn entries(&self) -> &[(String, OptionValue)] {
        &self.entries
    }

    pub fn volume_driver(&self) -> Option<&str> {
        self.get(VOLUME_DRIVER_KEY).and_then(OptionValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Drop snapshot retention/expiration when they hold a negative number.
pub fn prune_snapshot_policy(options: &mut OptionSet) {
    for name in SNAPSHOT_POLICY_OPTIONS {
        let negative = options
            .get(name)
            .and_then(OptionValue::as_f64)
            .is_some_and(|value| value < 0.0);
        if negative {
            debug!("Leaving {} unset (negative value)", name);
            options.remove(name);
        }
    }
}

/// Check mandatory options and resolve the driver type.
///
/// The fixed option set (and `driver-type` itself) is checked before the
/// driver type is parsed; the iSCSI-only requirement is checked last.
pub fn validate_options(options: &OptionSet) -> Result<DriverType, ConfigError> {
    let mut missing: Vec<String> = REQUIRED_OPTIONS
        .iter()
        .chain(std::iter::once(&keys::DRIVER_TYPE))
        .filter(|name| !options.contains(name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        missing.sort();
        return Err(ConfigError::MissingOptions(missing));
    }

    let raw = options
        .get(keys::DRIVER_TYPE)
        .map(ToString::to_string)
        .unwrap_or_default();
    let driver_type: DriverType = raw
        .parse()
        .map_err(|_| ConfigError::InvalidDriverType(raw.clone()))?;

    let missing: Vec<String> = driver_type
        .required_options()
        .into_iter()
        .filter(|name| !options.get(name).is_some_and(OptionValue::is_truthy))
        .filter(|name| !REQUIRED_OPTIONS.contains(name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::MissingOptions(missing));
    }

    Ok(driver_type)
}

/// `cinder.conf` key for an option name
fn stanza_key(name: &str) -> String {
    name.replace('-', "_")
}

/// Backend name cinder groups this driver's volumes under.
///
/// The first option that lands on `volume_backend_name` decides; an empty
/// value falls back to the service name.
pub fn backend_name(options: &OptionSet, service: &str) -> String {
    options
        .iter()
        .find(|(name, _)| stanza_key(name) == VOLUME_BACKEND_NAME_KEY)
        .map(|(_, value)| value)
        .filter(|value| value.is_truthy())
        .map(ToString::to_string)
        .unwrap_or_else(|| service.to_string())
}

/// Build the driver stanza for `service` from an option snapshot.
///
/// `options` is not modified; pruning happens on a private copy.
pub fn build(options: &OptionSet, service: &str) -> Result<DriverStanza, ConfigError> {
    let mut working = options.clone();
    prune_snapshot_policy(&mut working);
    let driver_type = validate_options(&working)?;

    let mut stanza = DriverStanza::default();
    let mut has_backend_name = false;
    for (name, value) in working.iter() {
        let key = stanza_key(name);
        if key == VOLUME_DRIVER_KEY {
            debug!("Ignoring option {}; the driver class follows driver-type", name);
            continue;
        }
        if key == VOLUME_BACKEND_NAME_KEY {
            if has_backend_name {
                debug!("Ignoring option {}; the backend name is already set", name);
                continue;
            }
            has_backend_name = true;
            if !value.is_truthy() {
                stanza.push(key, service);
                continue;
            }
        }
        stanza.push(key, value.clone());
    }
    if !has_backend_name {
        stanza.push(VOLUME_BACKEND_NAME_KEY, service);
    }
    stanza.push(VOLUME_DRIVER_KEY, driver_type.volume_driver());

    debug!(
        "Built {} stanza for {} with {} entries",
        driver_type,
        service,
        stanza.len()
    );
    Ok(stanza)
}

/// Validation only, for status reporting
pub fn validate(options: &OptionSet, service: &str) -> ValidationStatus {
    ValidationStatus::from(&build(options, service))
}

/// Relation payload: `cinder -> cinder.conf -> sections -> service -> stanza`
#[derive(Debug, Clone, PartialEq)]
pub struct SubordinateConfiguration {
    service: String,
    stanza: DriverStanza,
}

impl SubordinateConfiguration {
    pub fn new(service: impl Into<String>, stanza: DriverStanza) -> Self {
        Self {
            service: service.into(),
            stanza,
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        let mut sections = Map::new();
        sections.insert(self.service.clone(), serde_json::to_value(&self.stanza)?);

        let mut file = Map::new();
        file.insert("sections".to_string(), Value::Object(sections));

        let mut files = Map::new();
        files.insert(CINDER_CONF.to_string(), Value::Object(file));

        let mut root = Map::new();
        root.insert(PRINCIPAL.to_string(), Value::Object(files));
        Ok(Value::Object(root))
    }

    /// Compact JSON as stored in `subordinate_configuration`
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_value()?)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_value()?)
    }
}
