//! Serve command implementation

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;

use crate::components::{Daemon, DaemonConfiguration, Reporter, ReportingConfiguration};
use crate::config::ConfigOptions;
use crate::lifecycle::{Descriptor, Mode, Orchestrator};

/// Namespace of the environment overrides read by `serve` (`STRATUM_SERVE_...`).
const NAMESPACE: &str = "serve";

/// Configuration of the `serve` command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServeConfiguration {
    pub reporting: ReportingConfiguration,
    pub daemon: DaemonConfiguration,
}

crate::record!(ServeConfiguration { reporting, daemon });

#[derive(Args)]
pub struct ServeArgs {
    /// Configuration file or HTTP(S) URL
    #[arg(short = 'c', long, value_name = "SOURCE")]
    pub config: Option<String>,

    /// Check configuration, but do not start
    #[arg(short = 'C', long)]
    pub check: bool,

    /// Dump configuration before starting
    #[arg(short = 'D', long)]
    pub dump: bool,
}

pub fn run(args: ServeArgs, verbose: bool) -> Result<()> {
    let options = ConfigOptions { path: args.config, dump: args.dump };
    let mut config = ServeConfiguration::default();
    {
        let mut stdout = std::io::stdout().lock();
        options.parse(&mut stdout, NAMESPACE, &mut config)?;
        stdout.flush()?;
    }

    if verbose {
        config.reporting.level = "debug".to_string();
    }
    let mode = if args.check { Mode::Check } else { Mode::Run };
    daemon_start(config, mode)
}

/// Construct every component in dependency order, then run until terminated.
fn daemon_start(config: ServeConfiguration, mode: Mode) -> Result<()> {
    let mut lifecycle = Orchestrator::new(mode);

    let ServeConfiguration { reporting, daemon: daemon_config } = config;
    lifecycle.add(Descriptor::new("reporter").start(Reporter::start), || Reporter::new(reporting))?;
    let daemon = lifecycle.add(
        Descriptor::new("daemon").start(Daemon::start).stop(Daemon::stop),
        || Daemon::new(daemon_config).context("invalid daemon configuration"),
    )?;

    if mode == Mode::Check {
        return Ok(());
    }

    tracing::info!("stratum {} has started", env!("CARGO_PKG_VERSION"));
    lifecycle.run(daemon.terminated());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::dump;

    #[test]
    fn default_configuration_dumps_normalized_keys() {
        let rendered = dump(&ServeConfiguration::default()).expect("dump");
        let value: serde_yaml::Value = serde_yaml::from_str(&rendered).expect("yaml");
        assert_eq!(value["reporting"]["level"], serde_yaml::Value::String("info".to_string()));
        assert_eq!(value["reporting"]["format"], serde_yaml::Value::String("text".to_string()));
        assert_eq!(value["daemon"]["pidfile"], serde_yaml::Value::Null);
    }

    #[test]
    fn check_mode_validates_components() {
        let mut config = ServeConfiguration::default();
        config.reporting.level = "stratum=loud".to_string();
        let err = daemon_start(config, Mode::Check).expect_err("invalid level");
        assert!(format!("{err:#}").contains("unable to initialize reporter component"), "{err:#}");
    }

    #[test]
    fn check_mode_succeeds_with_defaults() {
        daemon_start(ServeConfiguration::default(), Mode::Check).expect("check");
    }
}
