//! `proptest` strategies for hyperlinks, built from a target's key shape.
//!
//! Scalar parts draw from the full range of their type, composite keys
//! combine their parts, and hyperlink parts draw keys of the referred target
//! and pair each with its URL. Keys the resolver refuses to convert are
//! skipped rather than reported.

use std::any::TypeId;
use std::sync::Arc;

use proptest::prelude::{Just, Strategy as _, any};
use proptest::strategy::BoxedStrategy;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::href::Href;
use crate::key::{Key, ScalarType};
use crate::resolver::Resolver;
use crate::spec::PartShape;
use crate::target::{Referrable, Target};

/// Strategy producing hyperlinks to `T` converted through `resolver`.
///
/// # Errors
///
/// Returns the declaration error of `T` or of a target its key refers to,
/// or `Error::UnboundedKey` when a key links back to a target it belongs to.
pub fn href_strategy<T: Referrable>(resolver: Arc<dyn Resolver>) -> Result<BoxedStrategy<Href<T>>> {
    let target = T::target()?;
    let keys = key_strategy(&target, &resolver)?;
    return Ok(keys
        .prop_filter_map("resolver rejected the key", move |key| {
            return Href::from_key(key, resolver.as_ref()).ok();
        })
        .boxed());
}

/// Strategy producing keys of `target`.
///
/// # Errors
///
/// See [`href_strategy`].
pub fn key_strategy(target: &Target, resolver: &Arc<dyn Resolver>) -> Result<BoxedStrategy<Key>> {
    let mut visiting = Vec::new();
    return target_keys(target, resolver, &mut visiting);
}

/// Hyperlink key parts to `target`: its keys paired with their URLs.
///
/// # Errors
///
/// See [`href_strategy`].
fn linked_keys(
    target: &Arc<Target>,
    resolver: &Arc<dyn Resolver>,
    visiting: &mut Vec<TypeId>,
) -> Result<BoxedStrategy<Key>> {
    let keys = target_keys(target, resolver, visiting)?;
    let target = Arc::clone(target);
    let resolver = Arc::clone(resolver);
    return Ok(keys
        .prop_filter_map("resolver rejected the referred key", move |key| {
            let url = target.key_to_url(&key, resolver.as_ref()).ok()?;
            return Some(Key::href(key, url));
        })
        .boxed());
}

/// Values of one scalar key type.
fn scalar_keys(ty: ScalarType) -> BoxedStrategy<Key> {
    return match ty {
        ScalarType::Bool => any::<bool>().prop_map(Key::Bool).boxed(),
        ScalarType::Int => any::<i64>().prop_map(Key::Int).boxed(),
        ScalarType::Str => any::<String>().prop_map(Key::Str).boxed(),
        ScalarType::Uuid => any::<u128>()
            .prop_map(|n| return Key::Uuid(Uuid::from_u128(n)))
            .boxed(),
    };
}

/// Keys of `target`; `visiting` holds the targets whose keys enclose it.
///
/// # Errors
///
/// See [`href_strategy`].
fn target_keys(target: &Target, resolver: &Arc<dyn Resolver>, visiting: &mut Vec<TypeId>) -> Result<BoxedStrategy<Key>> {
    if visiting.contains(&target.type_id()) {
        return Err(Error::UnboundedKey {
            target: target.name().to_string(),
        });
    }
    visiting.push(target.type_id());

    let mut parts = Vec::with_capacity(target.key_spec().len());
    for part in target.key_spec().parts() {
        let keys = match part.shape() {
            PartShape::Link(referred) => linked_keys(&referred.register()?, resolver, visiting)?,
            PartShape::Reference(nested) => linked_keys(nested, resolver, visiting)?,
            PartShape::Scalar(ty) => scalar_keys(*ty),
        };
        parts.push(keys);
    }
    visiting.pop();

    if parts.len() == 1
        && let Some(single) = parts.pop()
    {
        return Ok(single);
    }
    if parts.is_empty() {
        return Ok(Just(Key::Unit).boxed());
    }
    return Ok(parts.prop_map(Key::Tuple).boxed());
}
