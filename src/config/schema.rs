//! Typed decoding of raw documents onto configuration values
//!
//! Every configuration type implements [`Schema`]: it knows how to merge a
//! [`RawDocument`] onto its current value and how to render itself back. Leaf
//! types carry the coercion rules; records declare an explicit field table with
//! the [`record!`](crate::record) macro.

use crate::config::RawDocument;
use crate::error::ConfigError;
use serde_yaml::{Mapping, Number, Value};
use std::time::Duration;

/// A configuration value that can be decoded from, and encoded to, a raw document.
pub trait Schema {
    /// Merge `value` onto `self`. `path` is the dotted location of `self`,
    /// used in error messages. Parts of `self` that `value` does not mention
    /// keep their current content.
    fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError>;

    /// Build a value from `value` alone, for slots that hold nothing yet
    /// (an unset `Option`).
    fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError>
    where
        Self: Sized;

    /// Render the current value with normalized keys.
    fn encode(&self) -> RawDocument;
}

/// Decode `value` on top of the default value of `T`.
#[doc(hidden)]
pub fn seeded<T: Schema + Default>(value: &RawDocument, path: &str) -> Result<T, ConfigError> {
    let mut fresh = T::default();
    fresh.decode(value, path)?;
    Ok(fresh)
}

/// A mutable view of one record field, handed to the decoder.
pub enum Field<'a> {
    Value(&'a mut dyn Schema),
    /// Fields of an inline record are matched as if declared on the parent.
    Inline(&'a mut dyn Record),
}

/// A shared view of one record field, handed to the encoder.
pub enum Entry<'a> {
    Value(&'a dyn Schema),
    Inline(&'a dyn Record),
}

/// Explicit field table of a configuration record.
///
/// Implemented through [`record!`](crate::record); names are the Rust field
/// identifiers and get normalized before matching.
pub trait Record {
    fn fields(&mut self) -> Vec<(&'static str, Field<'_>)>;
    fn entries(&self) -> Vec<(&'static str, Entry<'_>)>;
}

/// Normalize a document key or field name: lower-case, without `-` and `_`.
pub fn normalize_key(key: &str) -> String {
    key.chars().filter(|c| *c != '-' && *c != '_').flat_map(char::to_lowercase).collect()
}

pub(crate) fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn flatten_fields<'a>(
    fields: Vec<(&'static str, Field<'a>)>,
    out: &mut Vec<(String, &'a mut dyn Schema)>,
) {
    for (name, field) in fields {
        match field {
            Field::Value(value) => out.push((normalize_key(name), value)),
            Field::Inline(record) => flatten_fields(record.fields(), out),
        }
    }
}

fn flatten_entries(entries: Vec<(&'static str, Entry<'_>)>, out: &mut Mapping) {
    for (name, entry) in entries {
        match entry {
            Entry::Value(value) => {
                out.insert(Value::String(normalize_key(name)), value.encode());
            }
            Entry::Inline(record) => flatten_entries(record.entries(), out),
        }
    }
}

fn key_text(key: &Value, path: &str) -> Result<String, ConfigError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(ConfigError::coercion(path, format!("unsupported key {other:?}"))),
    }
}

/// Decode a mapping onto a record through its field table.
pub fn decode_record<R: Record + ?Sized>(
    record: &mut R,
    value: &RawDocument,
    path: &str,
) -> Result<(), ConfigError> {
    let mapping = match value {
        Value::Null => return Ok(()),
        Value::Mapping(mapping) => mapping,
        other => {
            return Err(ConfigError::coercion(
                path,
                format!("expected a mapping, got {}", type_name(other)),
            ))
        }
    };

    let mut table = Vec::new();
    flatten_fields(record.fields(), &mut table);

    for (key, item) in mapping {
        let key = key_text(key, path)?;
        let wanted = normalize_key(&key);
        let item_path = join_path(path, &key);
        match table.iter_mut().find(|(name, _)| *name == wanted) {
            Some((_, field)) => field.decode(item, &item_path)?,
            None => return Err(ConfigError::unknown(&item_path)),
        }
    }
    Ok(())
}

/// Encode a record into a mapping, merging inline fields into it.
pub fn encode_record<R: Record + ?Sized>(record: &R) -> RawDocument {
    let mut mapping = Mapping::new();
    flatten_entries(record.entries(), &mut mapping);
    Value::Mapping(mapping)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some("0".to_string()),
        _ => None,
    }
}

impl Schema for String {
    fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError> {
        if value.is_null() {
            return Ok(());
        }
        *self = scalar_text(value).ok_or_else(|| {
            ConfigError::coercion(path, format!("expected a string, got {}", type_name(value)))
        })?;
        Ok(())
    }

    fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError> {
        seeded(value, path)
    }

    fn encode(&self) -> RawDocument {
        Value::String(self.clone())
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "f" | "false" => Some(false),
        "1" | "t" | "true" => Some(true),
        _ => None,
    }
}

impl Schema for bool {
    fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError> {
        let parsed = match value {
            Value::Null => return Ok(()),
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => parse_bool(s),
            _ => None,
        };
        *self = parsed.ok_or_else(|| {
            ConfigError::coercion(path, format!("cannot read {value:?} as a boolean"))
        })?;
        Ok(())
    }

    fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError> {
        seeded(value, path)
    }

    fn encode(&self) -> RawDocument {
        Value::Bool(*self)
    }
}

/// Read any weakly-typed scalar as a signed or unsigned 128-bit integer.
fn integer_of(value: &Value, path: &str) -> Result<i128, ConfigError> {
    let bad = || ConfigError::coercion(path, format!("cannot read {value:?} as an integer"));
    match value {
        Value::Bool(b) => Ok(i128::from(*b)),
        Value::Number(n) => number_to_integer(n).ok_or_else(bad),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s.trim().parse::<i128>().map_err(|_| bad()),
        _ => Err(bad()),
    }
}

fn number_to_integer(n: &Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(i128::from(u));
    }
    let f = n.as_f64()?;
    (f.fract() == 0.0 && f.is_finite()).then_some(f as i128)
}

macro_rules! integer_schema {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Schema for $ty {
                fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError> {
                    if value.is_null() {
                        return Ok(());
                    }
                    let wide = integer_of(value, path)?;
                    *self = <$ty>::try_from(wide).map_err(|_| {
                        ConfigError::coercion(
                            path,
                            format!("{wide} is out of range for {}", stringify!($ty)),
                        )
                    })?;
                    Ok(())
                }

                fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError> {
                    seeded(value, path)
                }

                fn encode(&self) -> RawDocument {
                    Value::Number(Number::from(*self))
                }
            }
        )*
    };
}

integer_schema!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Schema for f64 {
    fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError> {
        let bad = || ConfigError::coercion(path, format!("cannot read {value:?} as a number"));
        *self = match value {
            Value::Null => return Ok(()),
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => n.as_f64().ok_or_else(bad)?,
            Value::String(s) if s.trim().is_empty() => 0.0,
            Value::String(s) => s.trim().parse().map_err(|_| bad())?,
            _ => return Err(bad()),
        };
        Ok(())
    }

    fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError> {
        seeded(value, path)
    }

    fn encode(&self) -> RawDocument {
        Value::Number(Number::from(*self))
    }
}

impl Schema for Duration {
    fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError> {
        *self = match value {
            Value::Null => return Ok(()),
            Value::String(s) => humantime::parse_duration(s.trim())
                .map_err(|e| ConfigError::coercion(path, format!("invalid duration {s:?}: {e}")))?,
            Value::Number(n) => {
                let secs = n
                    .as_u64()
                    .ok_or_else(|| ConfigError::coercion(path, format!("invalid duration {n}")))?;
                Duration::from_secs(secs)
            }
            other => {
                return Err(ConfigError::coercion(
                    path,
                    format!("expected a duration, got {}", type_name(other)),
                ))
            }
        };
        Ok(())
    }

    fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError> {
        seeded(value, path)
    }

    fn encode(&self) -> RawDocument {
        Value::String(humantime::format_duration(*self).to_string())
    }
}

impl<T: Schema> Schema for Option<T> {
    fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        match self {
            Some(current) => current.decode(value, path),
            None => {
                *self = Some(T::from_document(value, path)?);
                Ok(())
            }
        }
    }

    fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_document(value, path).map(Some)
    }

    fn encode(&self) -> RawDocument {
        self.as_ref().map_or(Value::Null, Schema::encode)
    }
}

/// How far past the end of a sequence an indexed override may reach.
const MAX_SEQUENCE_GROWTH: usize = 1024;

fn element_at<'a, T: Default>(
    items: &'a mut Vec<T>,
    index: usize,
    path: &str,
) -> Result<&'a mut T, ConfigError> {
    if items.len() <= index {
        let len = index
            .checked_add(1)
            .filter(|_| index - items.len() <= MAX_SEQUENCE_GROWTH)
            .ok_or_else(|| ConfigError::coercion(path, "sequence index out of range"))?;
        items.resize_with(len, T::default);
    }
    Ok(&mut items[index])
}

fn sequence_index(key: &str, path: &str) -> Result<usize, ConfigError> {
    let key = key.trim();
    match key.parse() {
        Ok(index) => Ok(index),
        Err(_) if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) => {
            Err(ConfigError::coercion(path, "sequence index out of range"))
        }
        Err(_) => Err(ConfigError::unknown(path)),
    }
}

impl<T: Schema + Default> Schema for Vec<T> {
    fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError> {
        match value {
            Value::Null => Ok(()),
            Value::Sequence(items) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = join_path(path, &index.to_string());
                    element_at(self, index, &item_path)?.decode(item, &item_path)?;
                }
                Ok(())
            }
            // Indexed overrides: {"1": {name: x}} addresses the second element.
            Value::Mapping(mapping) => {
                for (key, item) in mapping {
                    let key = key_text(key, path)?;
                    let item_path = join_path(path, &key);
                    let index = sequence_index(&key, &item_path)?;
                    element_at(self, index, &item_path)?.decode(item, &item_path)?;
                }
                Ok(())
            }
            Value::String(s) => {
                let mut items = Vec::new();
                for (index, part) in s.split(',').map(str::trim).filter(|p| !p.is_empty()).enumerate()
                {
                    let mut item = T::default();
                    item.decode(&Value::String(part.to_string()), &join_path(path, &index.to_string()))?;
                    items.push(item);
                }
                *self = items;
                Ok(())
            }
            other => {
                let mut item = T::default();
                item.decode(other, &join_path(path, "0"))?;
                *self = vec![item];
                Ok(())
            }
        }
    }

    fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError> {
        seeded(value, path)
    }

    fn encode(&self) -> RawDocument {
        Value::Sequence(self.iter().map(Schema::encode).collect())
    }
}

/// Implement [`Schema`] for scalar types parsed from their textual form.
///
/// The type needs `FromStr` (with a displayable error) and `Display`, but no
/// `Default`; it is decoded from strings (numbers and booleans are read through their text) and
/// encoded back as a string.
///
/// ```ignore
/// stratum::text_scalar!(LogFormat);
/// ```
#[macro_export]
macro_rules! text_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::config::Schema for $ty {
                fn decode(
                    &mut self,
                    value: &$crate::config::RawDocument,
                    path: &str,
                ) -> ::std::result::Result<(), $crate::error::ConfigError> {
                    $crate::config::schema::decode_text(self, value, path)
                }

                fn from_document(
                    value: &$crate::config::RawDocument,
                    path: &str,
                ) -> ::std::result::Result<Self, $crate::error::ConfigError> {
                    $crate::config::schema::parse_text(value, path)
                }

                fn encode(&self) -> $crate::config::RawDocument {
                    $crate::config::RawDocument::String(self.to_string())
                }
            }
        )*
    };
}

#[doc(hidden)]
pub fn parse_text<T>(value: &RawDocument, path: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let text = scalar_text(value).ok_or_else(|| {
        ConfigError::coercion(path, format!("expected a string, got {}", type_name(value)))
    })?;
    text.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::coercion(path, format!("invalid value {text:?}: {e}")))
}

#[doc(hidden)]
pub fn decode_text<T>(target: &mut T, value: &RawDocument, path: &str) -> Result<(), ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if value.is_null() {
        return Ok(());
    }
    *target = parse_text(value, path)?;
    Ok(())
}

text_scalar!(std::net::SocketAddr, std::net::IpAddr);

impl Schema for std::path::PathBuf {
    fn decode(&mut self, value: &RawDocument, path: &str) -> Result<(), ConfigError> {
        decode_text(self, value, path)
    }

    fn from_document(value: &RawDocument, path: &str) -> Result<Self, ConfigError> {
        seeded(value, path)
    }

    fn encode(&self) -> RawDocument {
        Value::String(self.display().to_string())
    }
}

/// Declare the field table of a configuration record.
///
/// Plain fields are matched under their own (normalized) name. Fields listed
/// after `inline` must be records themselves; their fields are matched at the
/// parent's level. The record type must implement `Default`.
///
/// ```ignore
/// stratum::record!(ModuleConfiguration { details, elements } inline { more_details });
/// ```
#[macro_export]
macro_rules! record {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        $crate::record!($ty { $($field),* } inline {});
    };
    ($ty:ty { $($field:ident),* $(,)? } inline { $($inline:ident),* $(,)? }) => {
        impl $crate::config::Record for $ty {
            fn fields(&mut self) -> ::std::vec::Vec<(&'static str, $crate::config::Field<'_>)> {
                ::std::vec![
                    $((stringify!($field), $crate::config::Field::Value(&mut self.$field)),)*
                    $((stringify!($inline), $crate::config::Field::Inline(&mut self.$inline)),)*
                ]
            }

            fn entries(&self) -> ::std::vec::Vec<(&'static str, $crate::config::Entry<'_>)> {
                ::std::vec![
                    $((stringify!($field), $crate::config::Entry::Value(&self.$field)),)*
                    $((stringify!($inline), $crate::config::Entry::Inline(&self.$inline)),)*
                ]
            }
        }

        impl $crate::config::Schema for $ty {
            fn decode(
                &mut self,
                value: &$crate::config::RawDocument,
                path: &str,
            ) -> ::std::result::Result<(), $crate::error::ConfigError> {
                $crate::config::schema::decode_record(self, value, path)
            }

            fn from_document(
                value: &$crate::config::RawDocument,
                path: &str,
            ) -> ::std::result::Result<Self, $crate::error::ConfigError> {
                $crate::config::schema::seeded(value, path)
            }

            fn encode(&self) -> $crate::config::RawDocument {
                $crate::config::schema::encode_record(self)
            }
        }
    };
}
