//! Environment variable overrides
//!
//! `STRATUM_SERVE_MODULE2_ELEMENTS_0_NAME=first` becomes the single-path
//! document `{module2: {elements: {"0": {name: first}}}}`, decoded on top of
//! the configuration. Numeric segments address sequence elements.

use crate::config::{RawDocument, Schema};
use crate::error::ConfigError;
use serde_yaml::{Mapping, Value};

const SEPARATOR: char = '_';

/// One matching environment entry, turned into a document.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvOverride {
    pub variable: String,
    pub document: RawDocument,
}

/// Collect the process environment, sorted by variable name.
///
/// The host enumerates variables in no particular order; sorting makes the
/// order in which overlapping overrides apply reproducible.
pub fn process_vars() -> Vec<(String, String)> {
    let mut vars: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    vars
}

/// Build one override document per entry named `PREFIX_NAMESPACE_<SEGMENT>...`.
///
/// Entries are kept in input order. Entries with another prefix or namespace,
/// without any segment after the namespace, or with an empty segment
/// (`STRATUM_SERVE_`, `STRATUM_SERVE_A__B`) are skipped.
pub fn env_overrides<I, K, V>(vars: I, prefix: &str, namespace: &str) -> Vec<EnvOverride>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            let name = name.as_ref();
            let document = override_document(name, value.as_ref(), prefix, namespace)?;
            Some(EnvOverride { variable: name.to_string(), document })
        })
        .collect()
}

fn override_document(name: &str, value: &str, prefix: &str, namespace: &str) -> Option<RawDocument> {
    let segments: Vec<&str> = name.split(SEPARATOR).collect();
    if segments.len() < 3 {
        return None;
    }
    if !segments[0].eq_ignore_ascii_case(prefix) || !segments[1].eq_ignore_ascii_case(namespace) {
        return None;
    }
    if segments[2..].iter().any(|segment| segment.is_empty()) {
        tracing::debug!("Ignoring malformed configuration override {}", name);
        return None;
    }

    let mut document = Value::String(value.to_string());
    for segment in segments[2..].iter().rev() {
        let mut mapping = Mapping::new();
        mapping.insert(Value::String(segment.to_lowercase()), document);
        document = Value::Mapping(mapping);
    }
    Some(document)
}

/// Decode every matching entry of `vars` onto `config`, in input order.
///
/// Returns the number of overrides applied.
pub fn apply_env_overrides<T, I, K, V>(
    config: &mut T,
    vars: I,
    prefix: &str,
    namespace: &str,
) -> Result<usize, ConfigError>
where
    T: Schema + ?Sized,
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let overrides = env_overrides(vars, prefix, namespace);
    for entry in &overrides {
        config.decode(&entry.document, "").map_err(|e| ConfigError::Override {
            variable: entry.variable.clone(),
            source: Box::new(e),
        })?;
        tracing::debug!("Applied configuration override from {}", entry.variable);
    }
    Ok(overrides.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    #[derive(Debug, Default, PartialEq)]
    struct Element {
        name: String,
        gauge: i64,
    }
    crate::record!(Element { name, gauge });

    #[derive(Debug, Default, PartialEq)]
    struct Module {
        interval_value: Duration,
        elements: Vec<Element>,
    }
    crate::record!(Module { interval_value, elements });

    #[derive(Debug, Default, PartialEq)]
    struct Root {
        module: Module,
    }
    crate::record!(Root { module });

    #[test]
    fn builds_nested_single_path_document() {
        let overrides =
            env_overrides([("STRATUM_DUMMY_MODULE2_ELEMENTS_0_NAME", "first")], "STRATUM", "dummy");
        assert_eq!(overrides.len(), 1);
        let expected: Value =
            serde_yaml::from_str("module2:\n  elements:\n    \"0\":\n      name: first\n").expect("yaml");
        assert_eq!(overrides[0].document, expected);
        assert_eq!(overrides[0].variable, "STRATUM_DUMMY_MODULE2_ELEMENTS_0_NAME");
    }

    #[test]
    fn skips_foreign_and_short_entries() {
        let vars = [
            ("PATH", "/usr/bin"),
            ("STRATUM_DUMMY", "too short"),
            ("STRATUM_OTHER_MODULE_KEY", "other namespace"),
            ("NOTSTRATUM_DUMMY_MODULE_KEY", "other prefix"),
            ("STRATUM_DUMMY_MODULE_KEY", "kept"),
        ];
        let overrides = env_overrides(vars, "STRATUM", "dummy");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].variable, "STRATUM_DUMMY_MODULE_KEY");
    }

    #[test]
    fn skips_entries_with_empty_segments() {
        let vars = [
            ("STRATUM_DUMMY_", "trailing"),
            ("STRATUM_DUMMY_MODULE__KEY", "doubled"),
            ("STRATUM_DUMMY_MODULE_KEY_", "trailing"),
            ("STRATUM_DUMMY_MODULE_KEY", "kept"),
        ];
        let overrides = env_overrides(vars, "STRATUM", "dummy");
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides[0].variable, "STRATUM_DUMMY_MODULE_KEY");

        let mut root = Root::default();
        let applied = apply_env_overrides(&mut root, [("STRATUM_DUMMY_MODULE_", "x")], "STRATUM", "DUMMY")
            .expect("malformed entry ignored");
        assert_eq!(applied, 0);
    }

    #[test]
    fn huge_element_index_is_a_coercion_error() {
        for variable in [
            "STRATUM_DUMMY_MODULE_ELEMENTS_18446744073709551615_NAME",
            "STRATUM_DUMMY_MODULE_ELEMENTS_99999999999_NAME",
        ] {
            let mut root = Root::default();
            let err = apply_env_overrides(&mut root, [(variable, "x")], "STRATUM", "DUMMY")
                .expect_err("index out of range");
            assert_eq!(err.kind(), ErrorKind::TypeCoercion);
            assert!(err.to_string().contains(variable), "{err}");
            assert!(root.module.elements.is_empty());
        }
    }

    #[test]
    fn applies_indexed_overrides_onto_config() {
        let mut root = Root::default();
        let vars = vec![
            ("STRATUM_DUMMY_MODULE_INTERVALVALUE".to_string(), "10m".to_string()),
            ("STRATUM_DUMMY_MODULE_ELEMENTS_1_NAME".to_string(), "second".to_string()),
            ("STRATUM_DUMMY_MODULE_ELEMENTS_0_GAUGE".to_string(), "18".to_string()),
        ];
        let applied = apply_env_overrides(&mut root, vars, "STRATUM", "DUMMY").expect("apply");
        assert_eq!(applied, 3);
        assert_eq!(root.module.interval_value, Duration::from_secs(600));
        assert_eq!(
            root.module.elements,
            vec![
                Element { name: String::new(), gauge: 18 },
                Element { name: "second".to_string(), gauge: 0 },
            ]
        );
    }

    #[test]
    fn later_entries_win() {
        let mut root = Root::default();
        let vars = [
            ("STRATUM_DUMMY_MODULE_INTERVALVALUE", "10m"),
            ("STRATUM_DUMMY_MODULE_INTERVAL-VALUE", "30s"),
        ];
        apply_env_overrides(&mut root, vars, "STRATUM", "DUMMY").expect("apply");
        assert_eq!(root.module.interval_value, Duration::from_secs(30));
    }

    #[test]
    fn failing_override_names_the_variable() {
        let mut root = Root::default();
        let vars = [("STRATUM_DUMMY_MODULE_UNKNOWN", "1")];
        let err = apply_env_overrides(&mut root, vars, "STRATUM", "DUMMY").expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::UnknownKey);
        assert!(err.to_string().contains("STRATUM_DUMMY_MODULE_UNKNOWN"), "{err}");
    }

    #[test]
    fn process_vars_are_sorted() {
        let vars = process_vars();
        assert!(vars.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
