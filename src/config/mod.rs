//! Layered configuration resolution
//!
//! Resolves a typed configuration from built-in defaults, a document (local
//! file or HTTP URL) and environment overrides, in that order of precedence
//! (Env > Document > Defaults).

pub mod dump;
pub mod env;
pub mod loader;
pub mod options;
pub mod schema;

pub use dump::dump;
pub use env::{apply_env_overrides, env_overrides, process_vars, EnvOverride};
pub use loader::load_document;
pub use options::{ConfigOptions, ENV_PREFIX};
pub use schema::{normalize_key, Entry, Field, Record, Schema};

/// An untyped nested document: mappings, sequences and scalars.
pub type RawDocument = serde_yaml::Value;
