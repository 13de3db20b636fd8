//! Daemon component: termination signal and PID file

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};

/// Configuration of the daemon component.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaemonConfiguration {
    /// Write the process ID here while running.
    pub pid_file: Option<PathBuf>,
}

crate::record!(DaemonConfiguration { pid_file });

/// Turns SIGINT/SIGTERM into a termination notification.
pub struct Daemon {
    config: DaemonConfiguration,
    sender: Sender<()>,
    terminated: Receiver<()>,
}

impl Daemon {
    pub fn new(config: DaemonConfiguration) -> Result<Self> {
        if let Some(parent) = config.pid_file.as_ref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                anyhow::bail!("PID file directory does not exist: {}", parent.display());
            }
        }
        let (sender, terminated) = mpsc::channel();
        Ok(Self { config, sender, terminated })
    }

    /// Notification fired once termination is requested.
    pub fn terminated(&self) -> &Receiver<()> {
        &self.terminated
    }

    /// Ask for termination, as a signal would.
    pub fn terminate(&self) {
        let _ = self.sender.send(());
    }

    pub fn start(&self) -> Result<()> {
        let sender = self.sender.clone();
        ctrlc::set_handler(move || {
            let _ = sender.send(());
        })
        .context("Failed to install signal handler")?;

        if let Some(pid_file) = &self.config.pid_file {
            fs::write(pid_file, format!("{}\n", std::process::id()))
                .with_context(|| format!("Failed writing PID file: {}", pid_file.display()))?;
            tracing::debug!("Wrote PID file {}", pid_file.display());
        }
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        if let Some(pid_file) = &self.config.pid_file {
            fs::remove_file(pid_file)
                .with_context(|| format!("Failed removing PID file: {}", pid_file.display()))?;
        }
        Ok(())
    }
}
