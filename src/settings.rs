//! Process settings taken from the hook environment.
//!
//! Charm options come from the agent via `config-get`; these are the knobs of
//! the executable itself: which hook is running, on whose behalf, and whether
//! state-changing tools should really run.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{CharmError, Result};

pub const DISPATCH_PATH_VAR: &str = "JUJU_DISPATCH_PATH";
pub const UNIT_NAME_VAR: &str = "JUJU_UNIT_NAME";
pub const RELATION_ID_VAR: &str = "JUJU_RELATION_ID";
/// Log mutating hook tool calls instead of running them
pub const DRY_RUN_VAR: &str = "CINDER_THREE_PAR_DRY_RUN";
/// Skip the root check before `install` (development only)
pub const SKIP_ROOT_CHECK_VAR: &str = "CINDER_THREE_PAR_SKIP_ROOT_CHECK";
/// Log filter, falls back to `RUST_LOG`
pub const LOG_VAR: &str = "CINDER_THREE_PAR_LOG";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub dispatch_path: Option<String>,
    pub unit_name: Option<String>,
    pub relation_id: Option<String>,
    pub dry_run: bool,
    pub skip_root_check: bool,
}

impl RuntimeSettings {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build settings from an explicit variable list
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let non_empty = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        Self {
            dispatch_path: non_empty(DISPATCH_PATH_VAR),
            unit_name: non_empty(UNIT_NAME_VAR),
            relation_id: non_empty(RELATION_ID_VAR),
            dry_run: vars.get(DRY_RUN_VAR).is_some_and(|v| is_enabled(v)),
            skip_root_check: vars.get(SKIP_ROOT_CHECK_VAR).is_some_and(|v| is_enabled(v)),
        }
    }

    /// Application name, i.e. the unit name without its `/N` suffix
    pub fn service_name(&self) -> Result<String> {
        let unit = self
            .unit_name
            .as_deref()
            .ok_or_else(|| CharmError::environment(format!("{} is not set", UNIT_NAME_VAR)))?;
        match unit.split_once('/') {
            Some((app, _)) if !app.is_empty() => Ok(app.to_string()),
            _ => Err(CharmError::config(format!("malformed unit name {:?}", unit))),
        }
    }

    /// Name of the hook being run.
    ///
    /// `JUJU_DISPATCH_PATH` wins; otherwise the name we were invoked under
    /// (`hooks/install` symlinks) is used.
    pub fn hook_name(&self, argv0: Option<&str>) -> Option<String> {
        self.dispatch_path
            .as_deref()
            .or(argv0)
            .and_then(|path| Path::new(path).file_name())
            .and_then(|name| name.to_str())
            .map(str::to_string)
    }
}

fn is_enabled(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars() {
        let settings = RuntimeSettings::from_vars([
            (DISPATCH_PATH_VAR, "hooks/config-changed"),
            (UNIT_NAME_VAR, "cinder-three-par/0"),
            (RELATION_ID_VAR, ""),
            (DRY_RUN_VAR, "true"),
        ]);
        assert_eq!(settings.dispatch_path.as_deref(), Some("hooks/config-changed"));
        assert_eq!(settings.relation_id, None);
        assert!(settings.dry_run);
        assert!(!settings.skip_root_check);
    }

    #[test]
    fn test_service_name() {
        let settings = RuntimeSettings::from_vars([(UNIT_NAME_VAR, "cinder-three-par/3")]);
        assert_eq!(settings.service_name().unwrap(), "cinder-three-par");

        let settings = RuntimeSettings::default();
        assert!(matches!(settings.service_name(), Err(CharmError::Environment(_))));

        let settings = RuntimeSettings::from_vars([(UNIT_NAME_VAR, "no-slash")]);
        assert!(matches!(settings.service_name(), Err(CharmError::Config(_))));
    }

    #[test]
    fn test_hook_name_resolution() {
        let settings = RuntimeSettings::from_vars([(DISPATCH_PATH_VAR, "hooks/upgrade-charm")]);
        assert_eq!(
            settings.hook_name(Some("./dispatch")).as_deref(),
            Some("upgrade-charm")
        );

        let settings = RuntimeSettings::default();
        assert_eq!(
            settings.hook_name(Some("/var/lib/juju/agents/unit-x-0/charm/hooks/install")).as_deref(),
            Some("install")
        );
        assert_eq!(settings.hook_name(None), None);
    }

    #[test]
    fn test_is_enabled() {
        assert!(is_enabled("1"));
        assert!(is_enabled("TRUE"));
        assert!(!is_enabled("0"));
        assert!(!is_enabled(""));
    }
}
