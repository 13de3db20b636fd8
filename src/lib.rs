//! stratum: layered configuration and ordered component lifecycle
//!
//! Resolves a typed configuration from defaults, a YAML document (local file
//! or HTTP URL) and `STRATUM_*` environment overrides, then constructs, starts
//! and stops service components in a fixed order.

pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod lifecycle;

pub use error::{ConfigError, ErrorKind, LifecycleError};
