//! String-to-value parsing for ids and filter values.
//!
//! Path segments and query parameters arrive as strings. [`TypeParser`]
//! converts them into typed JSON values according to the [`ValueType`] of the
//! field they address, so that repositories receive `7` rather than `"7"` for
//! an integer id.

use crate::error::{JsonApiError, JsonApiResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Value type of an id or attribute, derived from the declared Rust type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Text.
    String,
    /// Signed integer.
    Integer,
    /// Unsigned integer.
    Unsigned,
    /// Floating point number.
    Float,
    /// Boolean.
    Boolean,
    /// UUID, kept in its canonical string form.
    Uuid,
    /// Any JSON value; strings are kept as strings.
    Any,
    /// A type with a parser registered by name.
    Custom(String),
}

impl ValueType {
    /// Maps a declared Rust type name to a value type.
    ///
    /// ```
    /// use meridian_core::ValueType;
    ///
    /// assert_eq!(ValueType::from_type_name("u64"), ValueType::Unsigned);
    /// assert_eq!(ValueType::from_type_name("uuid::Uuid"), ValueType::Uuid);
    /// assert_eq!(ValueType::from_type_name("Vec<String>"), ValueType::Any);
    /// ```
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        let simple = name.rsplit("::").next().unwrap_or(name).trim();
        match simple {
            "String" | "str" | "&str" | "char" => Self::String,
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" => Self::Integer,
            "u8" | "u16" | "u32" | "u64" | "u128" | "usize" => Self::Unsigned,
            "f32" | "f64" => Self::Float,
            "bool" => Self::Boolean,
            "Uuid" => Self::Uuid,
            _ => Self::Any,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Unsigned => f.write_str("unsigned integer"),
            Self::Float => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Uuid => f.write_str("uuid"),
            Self::Any => f.write_str("value"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

type CustomParser = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;

/// Parses strings into JSON values of a given [`ValueType`].
///
/// # Example
///
/// ```
/// use meridian_core::{TypeParser, ValueType};
/// use serde_json::json;
///
/// let parser = TypeParser::new()
///     .with_parser("Color", |s| matches!(s, "red" | "green").then(|| json!(s.to_uppercase())));
///
/// assert_eq!(parser.parse("42", &ValueType::Unsigned).unwrap(), json!(42));
/// assert_eq!(parser.parse("red", &ValueType::Custom("Color".into())).unwrap(), json!("RED"));
/// assert!(parser.parse("-1", &ValueType::Unsigned).is_err());
/// ```
#[derive(Clone, Default)]
pub struct TypeParser {
    custom: HashMap<String, CustomParser>,
}

impl TypeParser {
    /// Creates a parser for the built-in value types.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a parser for `ValueType::Custom(name)`.
    #[must_use]
    pub fn with_parser<F>(mut self, name: impl Into<String>, parser: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        self.custom.insert(name.into(), Arc::new(parser));
        self
    }

    /// Returns `true` if a custom parser is registered under `name`.
    #[must_use]
    pub fn has_parser(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Parses `raw` as `value_type`.
    ///
    /// Failures are reported as [`JsonApiError::IdParse`]; callers parsing
    /// non-id values re-map them as needed.
    pub fn parse(&self, raw: &str, value_type: &ValueType) -> JsonApiResult<Value> {
        let parsed = match value_type {
            ValueType::String | ValueType::Any => Some(Value::String(raw.to_string())),
            ValueType::Integer => raw.parse::<i64>().ok().map(Value::from),
            ValueType::Unsigned => raw.parse::<u64>().ok().map(Value::from),
            ValueType::Float => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ValueType::Boolean => raw.parse::<bool>().ok().map(Value::Bool),
            ValueType::Uuid => uuid::Uuid::parse_str(raw)
                .ok()
                .map(|u| Value::String(u.to_string())),
            ValueType::Custom(name) => self.custom.get(name).and_then(|parser| parser(raw)),
        };
        parsed.ok_or_else(|| JsonApiError::id_parse(raw, value_type.to_string()))
    }
}

impl fmt::Debug for TypeParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeParser")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}
