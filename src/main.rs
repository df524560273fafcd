//! cinder-three-par - hook entry point
//!
//! Juju runs `dispatch`, which execs this binary. Offline subcommands render
//! or validate an option file without an agent.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cinder_three_par::charm::{Hook, ThreeParCharm};
use cinder_three_par::cli::{Cli, Commands};
use cinder_three_par::context::{self, SubordinateConfiguration};
use cinder_three_par::hook_tools::JujuHookTools;
use cinder_three_par::options::OptionSet;
use cinder_three_par::sanity;
use cinder_three_par::settings::{RuntimeSettings, LOG_VAR};
use cinder_three_par::status::{UnitStatus, ValidationStatus};

/// Initialize logging to stderr, which the agent forwards to debug-log
fn init_logger() {
    let filter = std::env::var(LOG_VAR)
        .ok()
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse_args();
    let mut settings = RuntimeSettings::from_env();
    settings.dry_run |= cli.dry_run;
    debug!("Runtime settings: {:?}", settings);

    match cli.command {
        Some(Commands::Render {
            options,
            service,
            pretty,
        }) => render(&options, &service, pretty),
        Some(Commands::Validate { options, service }) => validate(&options, &service),
        Some(Commands::Hook { name }) => run_hook(&name, &settings),
        None => {
            let argv0 = std::env::args().next();
            let name = settings
                .hook_name(argv0.as_deref())
                .context("Cannot tell which hook to run; set JUJU_DISPATCH_PATH")?;
            run_hook(&name, &settings)
        }
    }
}

/// Run one hook against the live agent
fn run_hook(name: &str, settings: &RuntimeSettings) -> Result<()> {
    let Some(hook) = Hook::from_name(name) else {
        info!("Ignoring unhandled hook {}", name);
        return Ok(());
    };

    sanity::run_preflight_checks(hook, settings)?;

    let service = settings.service_name()?;
    let charm = ThreeParCharm::new(JujuHookTools::new(settings.dry_run), service);
    charm
        .dispatch(hook, settings.relation_id.as_deref())
        .with_context(|| format!("{} hook failed", hook))?;

    info!("{} hook completed", hook);
    Ok(())
}

/// Print the relation document an option file would produce
fn render(path: &Path, service: &str, pretty: bool) -> Result<()> {
    let options = OptionSet::load_from_file(path)?;
    let stanza = context::build(&options, service)?;
    let document = SubordinateConfiguration::new(service, stanza);
    let json = if pretty {
        document.to_json_pretty()?
    } else {
        document.to_json()?
    };
    println!("{}", json);
    Ok(())
}

/// Report the status an option file would put the unit in
fn validate(path: &Path, service: &str) -> Result<()> {
    let options = OptionSet::load_from_file(path)?;
    let validation = context::validate(&options, service);
    let status = UnitStatus::from(&validation);
    println!("{}: {}", status.state, status.message);
    match validation {
        ValidationStatus::Ready => info!("Configuration in {:?} is valid", path),
        ValidationStatus::Blocked(reason) => {
            error!("Configuration in {:?} is blocked: {}", path, reason);
            std::process::exit(1);
        }
    }
    Ok(())
}
