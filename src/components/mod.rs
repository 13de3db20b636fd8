//! Components wired by the `serve` command

pub mod daemon;
pub mod reporter;

pub use daemon::{Daemon, DaemonConfiguration};
pub use reporter::{LogFormat, Reporter, ReportingConfiguration};
