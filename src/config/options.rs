//! Resolution of the full override chain

use crate::config::{apply_env_overrides, dump, load_document, process_vars, Schema};
use crate::error::ConfigError;
use std::io::Write;

/// Prefix of every environment override variable.
pub const ENV_PREFIX: &str = "STRATUM";

/// Where the configuration comes from and whether to print it once resolved.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Local path or HTTP(S) URL of the configuration document.
    pub path: Option<String>,
    /// Write the resolved configuration to the output before returning.
    pub dump: bool,
}

impl ConfigOptions {
    /// Resolve `config` against the document and the process environment.
    ///
    /// `config` must hold the defaults. Overrides are read from
    /// `STRATUM_<NAMESPACE>_...` variables, sorted by name.
    pub fn parse<T, W>(&self, out: &mut W, namespace: &str, config: &mut T) -> Result<(), ConfigError>
    where
        T: Schema + ?Sized,
        W: Write + ?Sized,
    {
        self.parse_with_env(out, namespace, config, process_vars())
    }

    /// Same as [`ConfigOptions::parse`], with an explicit, already ordered list
    /// of variables.
    pub fn parse_with_env<T, W, I, K, V>(
        &self,
        out: &mut W,
        namespace: &str,
        config: &mut T,
        vars: I,
    ) -> Result<(), ConfigError>
    where
        T: Schema + ?Sized,
        W: Write + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let document = load_document(self.path.as_deref())?;
        config.decode(&document, "")?;

        let applied = apply_env_overrides(&mut *config, vars, ENV_PREFIX, namespace)?;
        tracing::debug!("Resolved configuration with {} environment override(s)", applied);

        if self.dump {
            let rendered = dump(&*config)?;
            writeln!(out, "---\n{rendered}")?;
        }
        Ok(())
    }
}
