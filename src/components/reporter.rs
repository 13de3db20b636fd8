//! Logging reporter

use anyhow::{Context, Result};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Text => f.write_str("text"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

crate::text_scalar!(LogFormat);

/// Configuration of the reporter.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportingConfiguration {
    /// Filter directives used when RUST_LOG is not set (`info`, `stratum=debug,warn`, ...)
    pub level: String,
    pub format: LogFormat,
}

impl Default for ReportingConfiguration {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Text }
    }
}

crate::record!(ReportingConfiguration { level, format });

/// Installs the global `tracing` subscriber when started.
#[derive(Debug)]
pub struct Reporter {
    config: ReportingConfiguration,
}

impl Reporter {
    /// Validate the configured filter directives.
    pub fn new(config: ReportingConfiguration) -> Result<Self> {
        EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid log level '{}'", config.level))?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReportingConfiguration {
        &self.config
    }

    fn filter(&self) -> EnvFilter {
        // RUST_LOG in the environment always takes precedence.
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    /// Install the subscriber. A subscriber installed earlier is kept.
    pub fn start(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.filter());
        let installed = match self.config.format {
            LogFormat::Text => {
                registry.with(tracing_fmt::layer().with_writer(std::io::stderr)).try_init()
            }
            LogFormat::Json => {
                registry.with(tracing_fmt::layer().json().with_writer(std::io::stderr)).try_init()
            }
        };
        if installed.is_err() {
            tracing::debug!("A global subscriber is already installed, keeping it");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Schema;

    #[test]
    fn rejects_invalid_level() {
        let config = ReportingConfiguration { level: "stratum=loud".to_string(), ..Default::default() };
        let err = Reporter::new(config).expect_err("invalid level");
        assert!(err.to_string().contains("stratum=loud"));
    }

    #[test]
    fn accepts_directives() {
        let config = ReportingConfiguration { level: "stratum=debug,warn".to_string(), ..Default::default() };
        assert!(Reporter::new(config).is_ok());
    }

    #[test]
    fn decodes_format_through_parser() {
        let mut config = ReportingConfiguration::default();
        let doc: serde_yaml::Value = serde_yaml::from_str("format: JSON").expect("yaml");
        config.decode(&doc, "reporting").expect("decode");
        assert_eq!(config.format, LogFormat::Json);

        let doc: serde_yaml::Value = serde_yaml::from_str("format: xml").expect("yaml");
        let err = config.decode(&doc, "reporting").expect_err("bad format");
        assert!(err.to_string().contains("reporting.format"), "{err}");
    }
}
