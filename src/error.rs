//! Error types for configuration resolution and component lifecycle

use thiserror::Error;

/// Flat classification of every error the crate can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceUnreachable,
    MalformedDocument,
    UnknownKey,
    TypeCoercion,
    Dump,
    Construction,
    Start,
    Stop,
}

/// Errors raised while resolving a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration from {location}")]
    SourceUnreachable {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unable to parse configuration document from {location}")]
    MalformedDocument {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("unknown configuration key '{path}'")]
    UnknownKey { path: String },

    #[error("invalid value for '{path}': {reason}")]
    TypeCoercion { path: String, reason: String },

    #[error("unable to parse override {variable:?}")]
    Override {
        variable: String,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("unable to dump configuration")]
    Dump(#[source] serde_yaml::Error),

    #[error("unable to write configuration dump")]
    Output(#[from] std::io::Error),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::SourceUnreachable { .. } => ErrorKind::SourceUnreachable,
            ConfigError::MalformedDocument { .. } => ErrorKind::MalformedDocument,
            ConfigError::UnknownKey { .. } => ErrorKind::UnknownKey,
            ConfigError::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            ConfigError::Override { source, .. } => source.kind(),
            ConfigError::Dump(_) | ConfigError::Output(_) => ErrorKind::Dump,
        }
    }

    pub(crate) fn coercion(path: &str, reason: impl Into<String>) -> Self {
        ConfigError::TypeCoercion { path: display_path(path), reason: reason.into() }
    }

    pub(crate) fn unknown(path: &str) -> Self {
        ConfigError::UnknownKey { path: display_path(path) }
    }
}

/// Errors raised while constructing, starting or stopping components.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("unable to initialize {component} component")]
    Construction {
        component: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("unable to start {component} component")]
    Start {
        component: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("unable to stop {component} component")]
    Stop {
        component: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Construction { .. } => ErrorKind::Construction,
            LifecycleError::Start { .. } => ErrorKind::Start,
            LifecycleError::Stop { .. } => ErrorKind::Stop,
        }
    }

    pub fn component(&self) -> &'static str {
        match self {
            LifecycleError::Construction { component, .. }
            | LifecycleError::Start { component, .. }
            | LifecycleError::Stop { component, .. } => component,
        }
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}
