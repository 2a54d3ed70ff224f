//! Conversion between structured keys and flat name → value parameter maps.
//!
//! Parameter maps are what a routing layer works with: path and query
//! parameters of a URL. A key part that is a hyperlink to another target is
//! expanded into that target's own key parts, namespaced as
//! `{outer}_{inner}`. A hyperlink that stands for a default `id` field is
//! passed as its URL.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::key::Key;
use crate::resolver::Resolver;
use crate::spec::{KeySpec, PartShape};
use crate::target::Target;

/// Flat parameter map, ordered by name.
pub type Params = BTreeMap<String, Value>;

/// Join a parameter name onto a prefix.
pub(crate) fn param_name(prefix: &str, name: &str) -> String {
    return format!("{prefix}{name}");
}

/// Flatten a key of `target` into named parameters.
///
/// # Errors
///
/// Returns `Error::InvalidKey` if the key does not have the shape of the
/// target's key spec.
pub fn flatten(key: &Key, target: &Target) -> Result<Params> {
    let mut params = Params::new();
    flatten_into(key, target, "", &mut params)?;
    return Ok(params);
}

/// Recursive step of [`flatten`].
///
/// # Errors
///
/// Returns `Error::InvalidKey` on a shape mismatch at any level.
fn flatten_into(key: &Key, target: &Target, prefix: &str, params: &mut Params) -> Result<()> {
    let spec = target.key_spec();
    let slots: Vec<&Key> = match (spec.len(), key) {
        (0, Key::Unit) => return Ok(()),
        (1, single) => vec![single],
        (n, Key::Tuple(items)) if n > 1 && items.len() == n => items.iter().collect(),
        (n, other) => {
            return Err(Error::InvalidKey {
                errors: vec![format!("key {other} does not have {n} parts")],
                target: target.name().to_string(),
            });
        },
    };

    for (part, slot) in spec.parts().iter().zip(slots) {
        let name = param_name(prefix, part.name());
        match (part.shape(), slot) {
            (PartShape::Link(_), Key::Href { url, .. }) => {
                params.insert(name, Value::String(url.to_string()));
            },
            (PartShape::Link(referred), other) => {
                return Err(Error::InvalidKey {
                    errors: vec![format!("{name}: {other} is not a hyperlink to `{}`", referred.name())],
                    target: target.name().to_string(),
                });
            },
            (PartShape::Reference(nested), _) => {
                flatten_into(slot.unwrap_href(), nested, &format!("{name}_"), params)?;
            },
            (PartShape::Scalar(_), _) => {
                params.insert(name, slot.unwrap_href().to_value());
            },
        }
    }
    return Ok(());
}

/// Assemble a key of `target` from named parameters.
///
/// Values are coerced once, after the whole raw key is assembled, so
/// string parameters taken from a URL are parsed into the declared key
/// types and reference parts are resolved through `resolver`.
///
/// # Errors
///
/// Returns `Error::MissingParams` naming every absent parameter,
/// `Error::InvalidKey` if the assembled values do not coerce, or any
/// error from resolving reference parts.
pub fn unflatten(params: &Params, target: &Target, resolver: &dyn Resolver) -> Result<Key> {
    let mut missing = Vec::new();
    let raw = collect_raw(params, target.key_spec(), "", &mut missing);
    if !missing.is_empty() {
        return Err(Error::MissingParams {
            names: missing,
            target: target.name().to_string(),
        });
    }
    return target.parse_key(&raw, resolver);
}

/// Build the raw (uncoerced) key value for `spec`, recording absent names.
fn collect_raw(params: &Params, spec: &KeySpec, prefix: &str, missing: &mut Vec<String>) -> Value {
    let mut values = Vec::with_capacity(spec.len());
    for part in spec.parts() {
        let name = param_name(prefix, part.name());
        let value = match part.nested() {
            Some(nested) => collect_raw(params, nested.key_spec(), &format!("{name}_"), missing),
            None => params.get(&name).cloned().unwrap_or_else(|| {
                missing.push(name);
                return Value::Null;
            }),
        };
        values.push(value);
    }

    return match values.len() {
        0 => Value::Null,
        1 => values.pop().unwrap_or(Value::Null),
        _ => Value::Array(values),
    };
}
