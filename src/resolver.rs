//! The resolver protocol: key ↔ URL conversion for any target type.

use std::sync::Arc;

use url::Url;

use crate::error::Result;
use crate::key::Key;
use crate::target::Target;

/// Strategy translating between keys and URLs.
///
/// One resolver serves every target type of a program; the target is passed
/// on each call. Both conversions must be deterministic for a given routing
/// table, and `url_to_key` must return `Error::UnresolvableUrl` (never
/// panic) for URLs that do not belong to the target.
pub trait Resolver: Send + Sync {
    /// URL of the instance of `target` identified by `key`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the target cannot be routed, or an
    /// input error if the key does not fit the target's endpoint.
    fn key_to_url(&self, key: &Key, target: &Target) -> Result<Url>;

    /// Key of the instance of `target` at `url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnresolvableUrl` if the URL does not match the
    /// target's endpoint, or the errors of coercing the extracted parameters.
    fn url_to_key(&self, url: &Url, target: &Target) -> Result<Key>;
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn key_to_url(&self, key: &Key, target: &Target) -> Result<Url> {
        return (**self).key_to_url(key, target);
    }

    fn url_to_key(&self, url: &Url, target: &Target) -> Result<Key> {
        return (**self).url_to_key(url, target);
    }
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn key_to_url(&self, key: &Key, target: &Target) -> Result<Url> {
        return (**self).key_to_url(key, target);
    }

    fn url_to_key(&self, url: &Url, target: &Target) -> Result<Key> {
        return (**self).url_to_key(url, target);
    }
}
