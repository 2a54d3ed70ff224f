//! Typed hyperlinks and the validation algorithm that builds them.
//!
//! A hyperlink to `T` pairs a key of `T` with the URL of the same instance.
//! It can be built from another hyperlink, an instance of `T`, a raw key or
//! a raw URL. The candidates are tried in that order and the first one that
//! fits wins, so a value that is both a valid key and a valid URL is always
//! read as a key.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::context;
use crate::error::{Error, Result};
use crate::key::{self, Key};
use crate::resolver::Resolver;
use crate::target::{Referrable, Target};

/// Hyperlink to an instance of `T`: its key and its URL.
pub struct Href<T> {
    /// Key of the referred instance.
    key: Key,
    /// Marker for the target type. `fn() -> T` keeps `Href<T>` `Send + Sync`.
    target: PhantomData<fn() -> T>,
    /// URL of the referred instance.
    url: Url,
}

impl<T> Href<T> {
    /// Hyperlink to the instance identified by a trusted key.
    ///
    /// # Errors
    ///
    /// Propagates whatever `T::key_to_url` raises.
    pub fn from_key(key: Key, resolver: &dyn Resolver) -> Result<Self>
    where
        T: Referrable,
    {
        let url = T::key_to_url(&key, resolver)?;
        return Ok(Self::from_parts(key, url));
    }

    /// Pair a key with its URL without any conversion.
    ///
    /// Meant for resolvers and stores that already hold both halves.
    pub const fn from_parts(key: Key, url: Url) -> Self {
        return Self {
            key,
            target: PhantomData,
            url,
        };
    }

    /// Hyperlink to the instance at `url`.
    ///
    /// # Errors
    ///
    /// Propagates whatever `T::url_to_key` raises.
    pub fn from_url(url: Url, resolver: &dyn Resolver) -> Result<Self>
    where
        T: Referrable,
    {
        let key = T::url_to_key(&url, resolver)?;
        return Ok(Self::from_parts(key, url));
    }

    /// Coerce a raw value as key, then as URL.
    ///
    /// # Errors
    ///
    /// See [`resolve_value`].
    fn from_value(value: &Value, resolver: &dyn Resolver) -> Result<Self>
    where
        T: Referrable,
    {
        let target = T::target()?;
        let (key, url) = resolve_value(value, &target, resolver)?;
        return Ok(Self::from_parts(key, url));
    }

    /// Key of the referred instance, for use as a key part elsewhere.
    pub fn into_key(self) -> Key {
        return Key::href(self.key, self.url);
    }

    /// Split into key and URL.
    pub fn into_parts(self) -> (Key, Url) {
        return (self.key, self.url);
    }

    /// Key of the referred instance.
    pub const fn key(&self) -> &Key {
        return &self.key;
    }

    /// URL of the referred instance.
    pub const fn url(&self) -> &Url {
        return &self.url;
    }

    /// Build a hyperlink using the resolver of the current scope.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoResolver` outside a resolver scope unless the input
    /// is already a hyperlink, otherwise as [`Href::validate_with`].
    pub fn validate(input: impl Into<Input<T>>) -> Result<Self>
    where
        T: Referrable,
    {
        let input = input.into();
        if let Input::Href(href) = input {
            tracing::trace!(target_type = T::NAME, "href input is already an href");
            return Ok(href);
        }
        let resolver = context::current()?;
        return Self::validate_with(input, resolver.as_ref());
    }

    /// Build a hyperlink from any accepted input.
    ///
    /// # Errors
    ///
    /// Returns `Error::CannotConvert` when the input is neither a key nor a
    /// URL of `T`, and propagates resolver and declaration errors.
    pub fn validate_with(input: impl Into<Input<T>>, resolver: &dyn Resolver) -> Result<Self>
    where
        T: Referrable,
    {
        return match input.into() {
            Input::Href(href) => {
                tracing::trace!(target_type = T::NAME, "href input is already an href");
                Ok(href)
            },
            Input::Instance(instance) => {
                tracing::trace!(target_type = T::NAME, "href input is an instance");
                let key = instance.get_key()?;
                Self::from_key(key, resolver)
            },
            Input::Key(key) => Self::from_value(&key.to_value(), resolver),
            Input::Value(value) => Self::from_value(&value, resolver),
        };
    }
}

/// Resolve a raw value into the key and URL of an instance of `target`.
///
/// The value is first coerced to the target's key shape; only if that fails
/// as input is it read as a URL. Conversion errors after a successful
/// coercion propagate, they never cause the next reading to be tried.
///
/// # Errors
///
/// Returns `Error::CannotConvert` when neither reading applies, or any
/// error from the target's key/URL conversions.
pub(crate) fn resolve_value(value: &Value, target: &Target, resolver: &dyn Resolver) -> Result<(Key, Url)> {
    match target.parse_key(value, resolver) {
        Ok(key) => {
            tracing::trace!(target_type = target.name(), %key, "href input parsed as key");
            let url = target.key_to_url(&key, resolver)?;
            return Ok((key, url));
        },
        Err(e) if e.is_input() => {
            tracing::trace!(target_type = target.name(), error = %e, "href input is not a key");
        },
        Err(e) => return Err(e),
    }

    match key::parse_http_url(value) {
        Ok(url) => {
            tracing::trace!(target_type = target.name(), %url, "href input parsed as url");
            let key = target.url_to_key(&url, resolver)?;
            return Ok((key, url));
        },
        Err(reason) => {
            tracing::trace!(target_type = target.name(), %reason, "href input is not a url");
        },
    }

    return Err(Error::CannotConvert {
        target: target.name().to_string(),
        value: value.to_string(),
    });
}

impl<T> Clone for Href<T> {
    fn clone(&self) -> Self {
        return Self::from_parts(self.key.clone(), self.url.clone());
    }
}

impl<T> fmt::Debug for Href<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "Href(key={}, url={})", self.key, self.url);
    }
}

impl<T> fmt::Display for Href<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.url.as_str());
    }
}

impl<T> PartialEq for Href<T> {
    fn eq(&self, other: &Self) -> bool {
        return self.key == other.key && self.url == other.url;
    }
}

impl<T> Eq for Href<T> {}

impl<T> Hash for Href<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.url.hash(state);
    }
}

impl<T> Serialize for Href<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        return serializer.serialize_str(self.url.as_str());
    }
}

impl<'de, T: Referrable> Deserialize<'de> for Href<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        return Self::validate(value).map_err(D::Error::custom);
    }
}

// ── Inputs ────────────────────────────────────────────────────────────

/// Everything a hyperlink to `T` can be built from.
pub enum Input<T> {
    /// An existing hyperlink, returned unchanged.
    Href(Href<T>),
    /// An instance of the target; its key is read directly.
    Instance(T),
    /// A structured key; coerced like a raw value in its serialized form.
    Key(Key),
    /// A raw value: a key in JSON form or a URL string.
    Value(Value),
}

impl<T> From<Href<T>> for Input<T> {
    fn from(href: Href<T>) -> Self {
        return Self::Href(href);
    }
}

impl<T> From<Key> for Input<T> {
    fn from(key: Key) -> Self {
        return Self::Key(key);
    }
}

impl<T> From<Value> for Input<T> {
    fn from(value: Value) -> Self {
        return Self::Value(value);
    }
}

impl<T> From<&str> for Input<T> {
    fn from(value: &str) -> Self {
        return Self::Value(Value::String(value.to_string()));
    }
}

impl<T> From<String> for Input<T> {
    fn from(value: String) -> Self {
        return Self::Value(Value::String(value));
    }
}

impl<T> From<i64> for Input<T> {
    fn from(value: i64) -> Self {
        return Self::Value(Value::from(value));
    }
}

impl<T> From<Uuid> for Input<T> {
    fn from(value: Uuid) -> Self {
        return Self::Value(Value::String(value.to_string()));
    }
}
