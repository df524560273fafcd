use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HPE 3PAR backend subordinate for Cinder
///
/// Run without a subcommand from a Juju hook: the hook name is taken from
/// JUJU_DISPATCH_PATH or from the name the binary was invoked under.
#[derive(Parser)]
#[command(name = "cinder-three-par")]
#[command(about = "Juju subordinate charm configuring the HPE 3PAR driver for Cinder")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: log state-changing hook tool calls instead of running them.
    ///
    /// Read-only tools (config-get, relation-ids, relation-list) still run.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a named hook
    Hook {
        /// Hook name (e.g., config-changed)
        name: String,
    },
    /// Print the cinder.conf relation document for an option file
    Render {
        /// JSON file in `config-get --format=json` form
        #[arg(short, long)]
        options: PathBuf,
        /// Service (application) name used as section and fallback backend name
        #[arg(short, long, default_value = "cinder-three-par")]
        service: String,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Check an option file and report the resulting status
    Validate {
        /// JSON file in `config-get --format=json` form
        #[arg(short, long)]
        options: PathBuf,
        /// Service (application) name
        #[arg(short, long, default_value = "cinder-three-par")]
        service: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
