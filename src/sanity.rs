//! Pre-flight sanity checks for the hook environment
//!
//! Before a hook touches the agent we verify:
//! - The Juju hook tools it needs are on `PATH`
//! - `install` runs with root privileges (EUID 0), since it calls apt-get
//!
//! A failed check is returned as an error so the hook exits non-zero and
//! the agent reports it.

use std::process::Command;
use tracing::{debug, info, warn};

use crate::charm::Hook;
use crate::error::{CharmError, Result};
use crate::process::CommandProcessGroup;
use crate::settings::RuntimeSettings;

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    pub missing_tools: Vec<String>,
    pub is_root: bool,
    pub needs_root: bool,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_tools.is_empty() && (self.is_root || !self.needs_root)
    }

    /// One-line summary of what failed
    pub fn describe(&self) -> String {
        let mut problems = Vec::new();
        if self.needs_root && !self.is_root {
            problems.push("root privileges required".to_string());
        }
        if !self.missing_tools.is_empty() {
            problems.push(format!("missing tools: {}", self.missing_tools.join(", ")));
        }
        problems.join("; ")
    }
}

/// Hook tools every hook relies on
const REQUIRED_TOOLS: &[&str] = &[
    "config-get",
    "status-set",
    "juju-log",
    "relation-ids",
    "relation-list",
    "relation-set",
];

/// Tools only `install` needs
const INSTALL_TOOLS: &[&str] = &["apt-get"];

/// Check if a binary is available in PATH
fn binary_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .in_new_process_group()
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Check if running as root (EUID 0)
fn is_running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Tools needed by `hook`
pub fn required_tools(hook: Hook) -> Vec<&'static str> {
    let mut tools = REQUIRED_TOOLS.to_vec();
    if hook == Hook::Install {
        tools.extend_from_slice(INSTALL_TOOLS);
    }
    tools
}

/// Perform all sanity checks for `hook` and return the result
pub fn verify_environment(hook: Hook) -> SanityCheckResult {
    let missing_tools = required_tools(hook)
        .into_iter()
        .filter(|tool| !binary_exists(tool))
        .map(str::to_string)
        .collect();

    SanityCheckResult {
        missing_tools,
        is_root: is_running_as_root(),
        needs_root: hook == Hook::Install,
    }
}

/// Verify the environment, honouring dry-run and the root-check override
pub fn run_preflight_checks(hook: Hook, settings: &RuntimeSettings) -> Result<()> {
    debug!("Running pre-flight checks for {}", hook);

    if settings.dry_run {
        debug!("Dry-run: skipping pre-flight checks");
        return Ok(());
    }

    let mut result = verify_environment(hook);
    if settings.skip_root_check && result.needs_root {
        warn!("Root check skipped by request");
        result.needs_root = false;
    }

    if !result.is_ok() {
        return Err(CharmError::environment(format!(
            "pre-flight check failed for {}: {}",
            hook,
            result.describe()
        )));
    }

    info!("Pre-flight checks passed for {}", hook);
    Ok(())
}
