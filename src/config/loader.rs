//! Configuration document loading

use crate::config::RawDocument;
use crate::error::ConfigError;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// Load the raw document named by `source`.
///
/// - `None` or blank → empty mapping
/// - `http://` / `https://` URL → blocking GET, body parsed as YAML whatever
///   the announced content type
/// - anything else → local file, parsed as TOML for `.toml` files, YAML otherwise
pub fn load_document(source: Option<&str>) -> Result<RawDocument, ConfigError> {
    let Some(source) = source.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Value::Mapping(Mapping::new()));
    };

    if is_remote(source) {
        let body = fetch_remote(source)?;
        return parse_yaml(&body, source);
    }

    let path = Path::new(source);
    let content = fs::read_to_string(path).map_err(|e| ConfigError::SourceUnreachable {
        location: source.to_string(),
        source: Box::new(e),
    })?;
    tracing::debug!("Read configuration file {} ({} bytes)", path.display(), content.len());

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "toml" => parse_toml(&content, source),
        _ => parse_yaml(&content, source),
    }
}

fn is_remote(source: &str) -> bool {
    match source.split_once("://") {
        Some((scheme, _)) => {
            let scheme = scheme.to_ascii_lowercase();
            scheme == "http" || scheme == "https"
        }
        None => false,
    }
}

fn fetch_remote(url: &str) -> Result<String, ConfigError> {
    let unreachable = |e: reqwest::Error| ConfigError::SourceUnreachable {
        location: url.to_string(),
        source: Box::new(e),
    };

    tracing::debug!("Fetching configuration from {}", url);
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("stratum/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(unreachable)?;
    let response = client.get(url).send().map_err(unreachable)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ConfigError::SourceUnreachable {
            location: url.to_string(),
            source: format!("server answered with status {status}").into(),
        });
    }

    let body = response.text().map_err(unreachable)?;
    tracing::debug!("Fetched configuration from {} ({} bytes)", url, body.len());
    Ok(body)
}

fn parse_yaml(content: &str, location: &str) -> Result<RawDocument, ConfigError> {
    let raw: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::MalformedDocument {
        location: location.to_string(),
        source: Box::new(e),
    })?;
    top_level(raw, location)
}

fn parse_toml(content: &str, location: &str) -> Result<RawDocument, ConfigError> {
    let malformed = |source: Box<dyn std::error::Error + Send + Sync>| {
        ConfigError::MalformedDocument { location: location.to_string(), source }
    };
    let raw: toml::Value = toml::from_str(content).map_err(|e| malformed(Box::new(e)))?;
    let converted = serde_yaml::to_value(raw).map_err(|e| malformed(Box::new(e)))?;
    top_level(converted, location)
}

/// An empty document parses as null; anything but a mapping is rejected.
fn top_level(raw: Value, location: &str) -> Result<RawDocument, ConfigError> {
    match raw {
        Value::Null => Ok(Value::Mapping(Mapping::new())),
        Value::Mapping(_) => Ok(raw),
        _ => Err(ConfigError::MalformedDocument {
            location: location.to_string(),
            source: "top level of the document is not a mapping".into(),
        }),
    }
}
