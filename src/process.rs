//! Child process execution for hook tools.
//!
//! Every external command (hook tools, `apt-get`, `which`) is spawned in its
//! own process group with a parent-death signal, so nothing keeps running
//! after the agent kills a hook that overran its timeout.

use nix::libc;
use nix::unistd::Pid;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::error::{CharmError, Result};

/// Extension trait for Command to spawn in a new process group
pub trait CommandProcessGroup {
    /// Configure the command to run in its own process group
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(std::io::Error::other)?;

                // Die with the hook process
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}

/// Output from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Standard output from the tool.
    pub stdout: String,
    /// Standard error from the tool.
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    /// Whether the tool exited successfully (exit code 0).
    pub success: bool,
}

impl ToolOutput {
    /// Turn a non-zero exit into a [`CharmError::HookTool`]
    pub fn ensure_success(self, tool: &str) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            let code = self.exit_code.unwrap_or(-1);
            Err(CharmError::hook_tool(
                tool,
                format!("exit code {}: {}", code, self.stderr.trim()),
            ))
        }
    }
}

/// Run `program` with `args` and extra environment, capturing output.
///
/// A spawn failure is an error; a non-zero exit is reported through
/// [`ToolOutput::success`].
pub fn run_tool(program: &str, args: &[&str], env: &[(&str, &str)]) -> Result<ToolOutput> {
    debug!("run_tool: {} args={:?} env={:?}", program, args, env);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .in_new_process_group();
    for (key, value) in env {
        cmd.env(key, value);
    }

    let output = cmd
        .output()
        .map_err(|e| CharmError::hook_tool(program, format!("failed to spawn: {}", e)))?;

    let exit_code = output.status.code();
    let success = output.status.success();
    if !success {
        info!("{} failed with exit code {}", program, exit_code.unwrap_or(-1));
    }

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code,
        success,
    })
}
