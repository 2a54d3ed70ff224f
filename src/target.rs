//! Target types: the `Referrable` trait and its type-erased descriptor.
//!
//! Each target type is registered once. Registration builds its key spec
//! and caches a [`Target`] descriptor for the rest of the program, shared
//! by every hyperlink to that type.

use std::any::TypeId;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use url::Url;

use crate::error::Result;
use crate::key::Key;
use crate::resolver::Resolver;
use crate::spec::{Declaration, KeySpec};

/// Converts a key of a target into its URL.
pub type KeyToUrl = fn(&Key, &dyn Resolver) -> Result<Url>;

/// Converts a URL of a target into its key.
pub type UrlToKey = fn(&Url, &dyn Resolver) -> Result<Key>;

/// A type that can be the target of a hyperlink.
///
/// Implementors declare their fields and expose field values by name; the
/// key getter and the key/URL conversions are derived. Override
/// `key_to_url` / `url_to_key` to bypass the resolver for a particular type.
pub trait Referrable: Sized + 'static {
    /// Name used in diagnostics and by resolvers.
    const NAME: &'static str;

    /// Declare fields, key markers and the routing endpoint.
    fn declare() -> Declaration;

    /// Value of a declared field. Hyperlink fields return [`Key::Href`].
    fn field(&self, name: &str) -> Option<Key>;

    /// Key of this instance.
    ///
    /// # Errors
    ///
    /// Returns declaration errors, or `Error::MissingField` if a key field
    /// has no value.
    fn get_key(&self) -> Result<Key> {
        let target = Self::target()?;
        return target.key_spec().extract(Self::NAME, |name| return self.field(name));
    }

    /// URL of the instance identified by `key`.
    ///
    /// # Errors
    ///
    /// Returns whatever the resolver raises.
    fn key_to_url(key: &Key, resolver: &dyn Resolver) -> Result<Url> {
        let target = Self::target()?;
        return resolver.key_to_url(key, &target);
    }

    /// Registered descriptor of this type.
    ///
    /// # Errors
    ///
    /// Returns the declaration error if the type's key declaration is invalid.
    fn target() -> Result<Arc<Target>> {
        return register::<Self>();
    }

    /// Key of the instance at `url`.
    ///
    /// # Errors
    ///
    /// Returns whatever the resolver raises.
    fn url_to_key(url: &Url, resolver: &dyn Resolver) -> Result<Key> {
        let target = Self::target()?;
        return resolver.url_to_key(url, &target);
    }
}

/// Type-erased descriptor of a registered target type.
pub struct Target {
    /// Routing endpoint serving the target's representation.
    details_view: Option<String>,
    /// Key parts.
    key_spec: KeySpec,
    /// The type's key → URL conversion.
    key_to_url: KeyToUrl,
    /// Diagnostic name.
    name: &'static str,
    /// Identity of the Rust type.
    type_id: TypeId,
    /// The type's URL → key conversion.
    url_to_key: UrlToKey,
}

impl Target {
    /// Routing endpoint, if configured.
    pub fn details_view(&self) -> Option<&str> {
        return self.details_view.as_deref();
    }

    /// Key parts.
    pub const fn key_spec(&self) -> &KeySpec {
        return &self.key_spec;
    }

    /// Convert a key to a URL through the type's conversion.
    ///
    /// # Errors
    ///
    /// Returns whatever the conversion raises.
    pub fn key_to_url(&self, key: &Key, resolver: &dyn Resolver) -> Result<Url> {
        return (self.key_to_url)(key, resolver);
    }

    /// Diagnostic name.
    pub const fn name(&self) -> &'static str {
        return self.name;
    }

    /// Coerce a raw value into a key of this target.
    ///
    /// # Errors
    ///
    /// See [`KeySpec::parse_key`].
    pub fn parse_key(&self, value: &Value, resolver: &dyn Resolver) -> Result<Key> {
        return self.key_spec.parse_key(self.name, value, resolver);
    }

    /// Identity of the Rust type.
    pub const fn type_id(&self) -> TypeId {
        return self.type_id;
    }

    /// Convert a URL to a key through the type's conversion.
    ///
    /// # Errors
    ///
    /// Returns whatever the conversion raises.
    pub fn url_to_key(&self, url: &Url, resolver: &dyn Resolver) -> Result<Key> {
        return (self.url_to_key)(url, resolver);
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Target")
            .field("name", &self.name)
            .field("details_view", &self.details_view)
            .field("key", &self.key_spec.shape().to_string())
            .finish_non_exhaustive();
    }
}

/// Lazy handle to a target type, used in field declarations.
///
/// Resolving the handle registers the type, so a declaration can name a
/// type that has not been registered yet.
#[derive(Clone, Copy)]
pub struct TargetRef {
    /// Diagnostic name of the referred type.
    name: &'static str,
    /// Registers the referred type.
    register: fn() -> Result<Arc<Target>>,
    /// Identity of the referred type.
    type_id: TypeId,
}

impl TargetRef {
    /// Diagnostic name of the referred type.
    pub const fn name(&self) -> &'static str {
        return self.name;
    }

    /// Handle to `T`.
    pub fn of<T: Referrable>() -> Self {
        return Self {
            name: T::NAME,
            register: register::<T>,
            type_id: TypeId::of::<T>(),
        };
    }

    /// Register the referred type and return its descriptor.
    ///
    /// # Errors
    ///
    /// Returns the referred type's declaration error.
    pub fn register(&self) -> Result<Arc<Target>> {
        return (self.register)();
    }

    /// Identity of the referred type.
    pub const fn type_id(&self) -> TypeId {
        return self.type_id;
    }
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "TargetRef({})", self.name);
    }
}

// ── Registry ──────────────────────────────────────────────────────────

/// Registered targets. Written once per type, read on every conversion.
static TARGETS: RwLock<BTreeMap<TypeId, Arc<Target>>> = RwLock::new(BTreeMap::new());

thread_local! {
    /// Types whose registration is in progress on this thread.
    static REGISTERING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

/// Pops a type off the in-progress stack, even if building panics.
struct RegisteringGuard {
    /// Type being registered.
    type_id: TypeId,
}

impl RegisteringGuard {
    /// Mark `type_id` as being registered.
    fn push(type_id: TypeId) -> Self {
        REGISTERING.with_borrow_mut(|stack| stack.push(type_id));
        return Self { type_id };
    }
}

impl Drop for RegisteringGuard {
    fn drop(&mut self) {
        REGISTERING.with_borrow_mut(|stack| {
            if let Some(pos) = stack.iter().rposition(|id| return *id == self.type_id) {
                stack.remove(pos);
            }
        });
    }
}

/// Whether `type_id` is being registered further up this thread's stack.
pub(crate) fn is_registering(type_id: TypeId) -> bool {
    return REGISTERING.with_borrow(|stack| return stack.contains(&type_id));
}

/// Register `T` (if not already registered) and return its descriptor.
///
/// Call at startup to surface declaration errors before serving requests;
/// otherwise registration happens on first use.
///
/// # Errors
///
/// Returns the declaration error if `T`'s key declaration is invalid.
pub fn register<T: Referrable>() -> Result<Arc<Target>> {
    let type_id = TypeId::of::<T>();
    if let Some(target) = TARGETS.read().get(&type_id) {
        return Ok(Arc::clone(target));
    }

    let built = {
        let _guard = RegisteringGuard::push(type_id);
        build::<T>(type_id)
    };
    let target = built.inspect_err(|e| {
        tracing::warn!(target_type = T::NAME, error = %e, "href target declaration rejected");
    })?;

    let mut targets = TARGETS.write();
    let entry = targets.entry(type_id).or_insert_with(|| return Arc::new(target));
    tracing::debug!(
        target_type = T::NAME,
        key = %entry.key_spec().shape(),
        details_view = ?entry.details_view(),
        "registered href target"
    );
    return Ok(Arc::clone(entry));
}

/// Build the descriptor of `T` from its declaration.
///
/// # Errors
///
/// See [`KeySpec::build`].
fn build<T: Referrable>(type_id: TypeId) -> Result<Target> {
    let declaration = T::declare();
    let key_spec = KeySpec::build(T::NAME, &declaration)?;
    return Ok(Target {
        details_view: declaration.into_details_view(),
        key_spec,
        key_to_url: T::key_to_url,
        name: T::NAME,
        type_id,
        url_to_key: T::url_to_key,
    });
}
