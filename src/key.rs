//! Key values, scalar key types, and coercion of raw input into them.

use std::fmt;

use serde::ser::{Serialize, SerializeSeq as _, Serializer};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

/// Scalar types a key part may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// `true` or `false`.
    Bool,
    /// Signed 64-bit integer.
    Int,
    /// UTF-8 string.
    Str,
    /// RFC 4122 UUID.
    Uuid,
}

impl ScalarType {
    /// Coerce a raw value into a key of this type.
    ///
    /// Integers and booleans are also accepted in their string form, since
    /// that is how they arrive from path and query parameters.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch when the value cannot be coerced.
    pub fn coerce(self, value: &Value) -> Result<Key, String> {
        return match (self, value) {
            (Self::Bool, Value::Bool(b)) => Ok(Key::Bool(*b)),
            (Self::Bool, Value::String(s)) => match s.as_str() {
                "true" => Ok(Key::Bool(true)),
                "false" => Ok(Key::Bool(false)),
                _ => Err(format!("`{s}` is not a valid bool")),
            },
            (Self::Int, Value::Number(n)) => n
                .as_i64()
                .map(Key::Int)
                .ok_or_else(|| format!("{n} is not a valid int")),
            (Self::Int, Value::String(s)) => s
                .parse::<i64>()
                .map(Key::Int)
                .map_err(|e| format!("`{s}` is not a valid int: {e}")),
            (Self::Str, Value::String(s)) => Ok(Key::Str(s.clone())),
            (Self::Uuid, Value::String(s)) => Uuid::parse_str(s)
                .map(Key::Uuid)
                .map_err(|e| format!("`{s}` is not a valid uuid: {e}")),
            (ty, other) => Err(format!("expected {}, got {}", ty.name(), describe(other))),
        };
    }

    /// Lowercase name used in key shapes and diagnostics.
    pub const fn name(self) -> &'static str {
        return match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Str => "str",
            Self::Uuid => "uuid",
        };
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.name());
    }
}

/// The internal identifier of a target instance.
///
/// A key is a scalar, a hyperlink to another target (when a key part is a
/// reference), a tuple of those for composite keys, or unit for targets
/// without key fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Boolean key part.
    Bool(bool),
    /// Hyperlink to another target used as a key part.
    Href {
        /// Key of the referred target.
        key: Box<Key>,
        /// URL of the referred target.
        url: Url,
    },
    /// Integer key part.
    Int(i64),
    /// String key part.
    Str(String),
    /// Composite key, one slot per key part.
    Tuple(Vec<Key>),
    /// Key of a target without key fields.
    Unit,
    /// UUID key part.
    Uuid(Uuid),
}

impl Key {
    /// Build a hyperlink key part.
    pub fn href(key: Self, url: Url) -> Self {
        return Self::Href {
            key: Box::new(key),
            url,
        };
    }

    /// Render a scalar key as a URL parameter value. `None` for non-scalars.
    pub fn to_param(&self) -> Option<String> {
        return match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Str(s) => Some(s.clone()),
            Self::Uuid(u) => Some(u.to_string()),
            Self::Href { .. } | Self::Tuple(_) | Self::Unit => None,
        };
    }

    /// Render as a JSON value. Hyperlinks render as their URL.
    pub fn to_value(&self) -> Value {
        return match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Href { url, .. } => Value::String(url.to_string()),
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::String(s.clone()),
            Self::Tuple(parts) => Value::Array(parts.iter().map(Self::to_value).collect()),
            Self::Unit => Value::Null,
            Self::Uuid(u) => Value::String(u.to_string()),
        };
    }

    /// The inner key of a hyperlink key part, or the key itself otherwise.
    pub fn unwrap_href(&self) -> &Self {
        return match self {
            Self::Href { key, .. } => key,
            other => other,
        };
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Href { url, .. } => write!(f, "{url}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Tuple(parts) => {
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            },
            Self::Unit => f.write_str("()"),
            Self::Uuid(u) => write!(f, "{u}"),
        };
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return match self {
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Href { url, .. } => serializer.serialize_str(url.as_str()),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Str(s) => serializer.serialize_str(s),
            Self::Tuple(parts) => {
                let mut seq = serializer.serialize_seq(Some(parts.len()))?;
                for part in parts {
                    seq.serialize_element(part)?;
                }
                seq.end()
            },
            Self::Unit => serializer.serialize_unit(),
            Self::Uuid(u) => serializer.collect_str(u),
        };
    }
}

impl From<bool> for Key {
    fn from(value: bool) -> Self {
        return Self::Bool(value);
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        return Self::Int(value);
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        return Self::Str(value.to_string());
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        return Self::Str(value);
    }
}

impl From<Uuid> for Key {
    fn from(value: Uuid) -> Self {
        return Self::Uuid(value);
    }
}

/// Coerce a raw value into an absolute HTTP(S) URL.
///
/// # Errors
///
/// Returns a description of the problem when the value is not a string,
/// does not parse, is not `http`/`https`, or has no host.
pub fn parse_http_url(value: &Value) -> Result<Url, String> {
    let Value::String(raw) = value else {
        return Err(format!("expected url string, got {}", describe(value)));
    };
    let url = Url::parse(raw).map_err(|e| format!("`{raw}`: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("`{raw}`: scheme `{}` is not http or https", url.scheme()));
    }
    if !url.has_host() {
        return Err(format!("`{raw}`: url has no host"));
    }
    return Ok(url);
}

/// Short description of a JSON value's type for error messages.
pub(crate) const fn describe(value: &Value) -> &'static str {
    return match value {
        Value::Array(_) => "array",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Number(_) => "number",
        Value::Object(_) => "object",
        Value::String(_) => "string",
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn int_accepts_numbers_and_integer_strings() {
        assert_eq!(ScalarType::Int.coerce(&json!(7)).unwrap(), Key::Int(7));
        assert_eq!(ScalarType::Int.coerce(&json!("7")).unwrap(), Key::Int(7));
        assert!(ScalarType::Int.coerce(&json!("seven")).is_err());
        assert!(ScalarType::Int.coerce(&json!(7.5)).is_err());
    }

    #[test]
    fn str_does_not_accept_numbers() {
        assert!(ScalarType::Str.coerce(&json!(7)).is_err());
        assert_eq!(ScalarType::Str.coerce(&json!("x")).unwrap(), Key::from("x"));
    }

    #[test]
    fn uuid_parses_hyphenated_strings() {
        let id = Uuid::from_u128(42);
        assert_eq!(
            ScalarType::Uuid.coerce(&json!(id.to_string())).unwrap(),
            Key::Uuid(id)
        );
        assert!(ScalarType::Uuid.coerce(&json!("1000")).is_err());
    }

    #[test]
    fn href_key_serializes_as_url() {
        let url = Url::parse("http://x/books/3").unwrap();
        let key = Key::Tuple(vec![Key::href(Key::Int(3), url), Key::Int(10)]);
        assert_eq!(serde_json::to_value(&key).unwrap(), json!(["http://x/books/3", 10]));
        assert_eq!(key.to_value(), json!(["http://x/books/3", 10]));
    }

    #[test]
    fn http_url_requires_scheme_and_host() {
        assert!(parse_http_url(&json!("http://x/books/7")).is_ok());
        assert!(parse_http_url(&json!("ftp://x/books/7")).is_err());
        assert!(parse_http_url(&json!("/books/7")).is_err());
        assert!(parse_http_url(&json!(7)).is_err());
    }
}
