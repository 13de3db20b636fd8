//! Configuration dumping

use crate::config::Schema;
use crate::error::ConfigError;

/// Render a resolved configuration as YAML, for display only.
pub fn dump<T: Schema + ?Sized>(config: &T) -> Result<String, ConfigError> {
    serde_yaml::to_string(&config.encode()).map_err(ConfigError::Dump)
}
