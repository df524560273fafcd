//! Access to the Juju agent from inside a hook.
//!
//! [`HookTools`] is the seam between charm logic and the agent. The
//! production implementation, [`JujuHookTools`], shells out to the hook tools
//! the agent puts on `PATH`; [`MemoryHookTools`] keeps everything in memory
//! for tests and offline runs.
//!
//! # Contract
//!
//! - `config()` returns the full option snapshot, defaults included.
//! - `relation_set()` writes this unit's side of one relation.
//! - Mutating calls are the only ones affected by dry-run mode.

use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::{info, Level};

use crate::error::{CharmError, Result};
use crate::options::OptionSet;
use crate::process::run_tool;
use crate::status::UnitStatus;

pub trait HookTools {
    /// Current charm configuration (`config-get`)
    fn config(&self) -> Result<OptionSet>;

    /// Relation ids established on `endpoint` (`relation-ids`)
    fn relation_ids(&self, endpoint: &str) -> Result<Vec<String>>;

    /// Remote units on a relation (`relation-list`)
    fn relation_units(&self, relation_id: &str) -> Result<Vec<String>>;

    /// Write this unit's relation settings (`relation-set`)
    fn relation_set(&self, relation_id: &str, settings: &[(&str, &str)]) -> Result<()>;

    /// Set the workload status (`status-set`)
    fn status_set(&self, status: &UnitStatus) -> Result<()>;

    /// Send a line to the model's debug log (`juju-log`)
    fn log(&self, level: Level, message: &str) -> Result<()>;

    /// Install distribution packages
    fn apt_install(&self, packages: &[&str]) -> Result<()>;
}

/// Hook tools backed by the executables the Juju agent provides
#[derive(Debug, Clone, Default)]
pub struct JujuHookTools {
    dry_run: bool,
}

impl JujuHookTools {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Run a tool and return stdout, failing on non-zero exit
    fn query(&self, tool: &str, args: &[&str]) -> Result<String> {
        Ok(run_tool(tool, args, &[])?.ensure_success(tool)?.stdout)
    }

    /// Run a state-changing tool, or just log it in dry-run mode
    fn mutate(&self, tool: &str, args: &[&str], env: &[(&str, &str)]) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] would run: {} {}", tool, args.join(" "));
            return Ok(());
        }
        run_tool(tool, args, env)?.ensure_success(tool)?;
        Ok(())
    }

    fn query_list(&self, tool: &str, args: &[&str]) -> Result<Vec<String>> {
        let stdout = self.query(tool, args)?;
        if stdout.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&stdout)?)
    }
}

impl HookTools for JujuHookTools {
    fn config(&self) -> Result<OptionSet> {
        let stdout = self.query("config-get", &["--format=json", "--all"])?;
        Ok(OptionSet::from_json_str(&stdout)?)
    }

    fn relation_ids(&self, endpoint: &str) -> Result<Vec<String>> {
        self.query_list("relation-ids", &[endpoint, "--format=json"])
    }

    fn relation_units(&self, relation_id: &str) -> Result<Vec<String>> {
        self.query_list("relation-list", &["-r", relation_id, "--format=json"])
    }

    fn relation_set(&self, relation_id: &str, settings: &[(&str, &str)]) -> Result<()> {
        let pairs: Vec<String> = settings
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect();
        let mut args = vec!["-r", relation_id];
        args.extend(pairs.iter().map(String::as_str));
        self.mutate("relation-set", &args, &[])
    }

    fn status_set(&self, status: &UnitStatus) -> Result<()> {
        self.mutate("status-set", &[status.state.as_ref(), &status.message], &[])
    }

    fn log(&self, level: Level, message: &str) -> Result<()> {
        self.mutate("juju-log", &["-l", level.as_str(), message], &[])
    }

    fn apt_install(&self, packages: &[&str]) -> Result<()> {
        let args = apt_install_args(packages);
        self.mutate("apt-get", &args, &[("DEBIAN_FRONTEND", "noninteractive")])
    }
}

/// `apt-get` arguments for a non-interactive install of `packages`
fn apt_install_args<'a>(packages: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec!["install", "-y"];
    args.extend_from_slice(packages);
    args
}

/// Everything a [`MemoryHookTools`] has recorded
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub config: OptionSet,
    /// Relation id to remote unit names, per endpoint
    pub relations: BTreeMap<String, Vec<(String, Vec<String>)>>,
    /// This unit's settings per relation id
    pub relation_data: BTreeMap<String, BTreeMap<String, String>>,
    pub statuses: Vec<UnitStatus>,
    pub logs: Vec<(Level, String)>,
    pub installed: Vec<String>,
    pub fail_install: bool,
}

/// In-memory agent used by tests and offline rendering
#[derive(Debug, Default)]
pub struct MemoryHookTools {
    state: RefCell<MemoryState>,
}

impl MemoryHookTools {
    pub fn new(config: OptionSet) -> Self {
        Self {
            state: RefCell::new(MemoryState {
                config,
                ..Default::default()
            }),
        }
    }

    pub fn set_config(&self, config: OptionSet) {
        self.state.borrow_mut().config = config;
    }

    /// Register relation `relation_id` on `endpoint` with the given remote units
    pub fn add_relation(&self, endpoint: &str, relation_id: &str, units: &[&str]) {
        self.state
            .borrow_mut()
            .relations
            .entry(endpoint.to_string())
            .or_default()
            .push((
                relation_id.to_string(),
                units.iter().map(|u| u.to_string()).collect(),
            ));
    }

    pub fn fail_install(&self) {
        self.state.borrow_mut().fail_install = true;
    }

    pub fn relation_data(&self, relation_id: &str) -> BTreeMap<String, String> {
        self.state
            .borrow()
            .relation_data
            .get(relation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn statuses(&self) -> Vec<UnitStatus> {
        self.state.borrow().statuses.clone()
    }

    pub fn last_status(&self) -> Option<UnitStatus> {
        self.state.borrow().statuses.last().cloned()
    }

    pub fn installed(&self) -> Vec<String> {
        self.state.borrow().installed.clone()
    }

    pub fn logs(&self) -> Vec<(Level, String)> {
        self.state.borrow().logs.clone()
    }
}

impl HookTools for MemoryHookTools {
    fn config(&self) -> Result<OptionSet> {
        Ok(self.state.borrow().config.clone())
    }

    fn relation_ids(&self, endpoint: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .borrow()
            .relations
            .get(endpoint)
            .map(|relations| relations.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default())
    }

    fn relation_units(&self, relation_id: &str) -> Result<Vec<String>> {
        self.state
            .borrow()
            .relations
            .values()
            .flatten()
            .find(|(id, _)| id == relation_id)
            .map(|(_, units)| units.clone())
            .ok_or_else(|| {
                CharmError::hook_tool(
                    "relation-list",
                    format!("invalid relation id {:?}", relation_id),
                )
            })
    }

    fn relation_set(&self, relation_id: &str, settings: &[(&str, &str)]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let data = state.relation_data.entry(relation_id.to_string()).or_default();
        for (key, value) in settings {
            data.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn status_set(&self, status: &UnitStatus) -> Result<()> {
        self.state.borrow_mut().statuses.push(status.clone());
        Ok(())
    }

    fn log(&self, level: Level, message: &str) -> Result<()> {
        self.state.borrow_mut().logs.push((level, message.to_string()));
        Ok(())
    }

    fn apt_install(&self, packages: &[&str]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_install {
            return Err(CharmError::hook_tool(
                "apt-get",
                "exit code 100: E: Unable to locate package",
            ));
        }
        state.installed.extend(packages.iter().map(|p| p.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_skips_mutating_tools() {
        // None of these tools exist in a test environment; dry-run must not spawn them
        let tools = JujuHookTools::new(true);
        assert!(tools.status_set(&UnitStatus::ready()).is_ok());
        assert!(tools.relation_set("storage-backend:1", &[("backend_name", "x")]).is_ok());
        assert!(tools.apt_install(&["sysfsutils"]).is_ok());
        assert!(tools.log(Level::INFO, "hello").is_ok());
    }

    #[test]
    fn test_apt_install_args() {
        assert_eq!(
            apt_install_args(&["python3-3parclient", "sysfsutils"]),
            vec!["install", "-y", "python3-3parclient", "sysfsutils"]
        );
    }

    #[test]
    fn test_memory_relations() {
        let tools = MemoryHookTools::default();
        tools.add_relation("storage-backend", "storage-backend:0", &["cinder/0"]);
        assert_eq!(tools.relation_ids("storage-backend").unwrap(), vec!["storage-backend:0"]);
        assert_eq!(tools.relation_units("storage-backend:0").unwrap(), vec!["cinder/0"]);
        assert!(tools.relation_ids("juju-info").unwrap().is_empty());
        assert!(tools.relation_units("storage-backend:9").is_err());
    }

    #[test]
    fn test_memory_relation_set_merges() {
        let tools = MemoryHookTools::default();
        tools.relation_set("r:0", &[("a", "1")]).unwrap();
        tools.relation_set("r:0", &[("b", "2"), ("a", "3")]).unwrap();
        let data = tools.relation_data("r:0");
        assert_eq!(data.get("a").map(String::as_str), Some("3"));
        assert_eq!(data.get("b").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_memory_install_failure() {
        let tools = MemoryHookTools::default();
        tools.fail_install();
        assert!(tools.apt_install(&["sysfsutils"]).is_err());
        assert!(tools.installed().is_empty());
    }
}
