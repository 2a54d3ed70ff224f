//! Field declarations and the key specification derived from them.
//!
//! A target type declares its fields once through a [`Declaration`]. Fields
//! tagged with a [`PrimaryKey`] marker become the parts of its [`KeySpec`],
//! in declaration order. A key part whose type is a hyperlink to another
//! target borrows that target's key spec, so composite keys can be built
//! from other keys. Only one level of such indirection is allowed.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::href;
use crate::key::{self, Key, ScalarType, describe};
use crate::params;
use crate::resolver::Resolver;
use crate::target::{self, Target, TargetRef};

/// Field used as the key when no field carries a primary key marker.
pub const DEFAULT_KEY_FIELD: &str = "id";

// ── Declarations ──────────────────────────────────────────────────────

/// Declared type of a field.
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// Hyperlink to another target type.
    Href(TargetRef),
    /// Any type that cannot be part of a key (floats, lists, nested records).
    Opaque,
    /// Scalar key type.
    Scalar(ScalarType),
}

impl FieldType {
    /// Boolean field.
    pub const BOOL: Self = Self::Scalar(ScalarType::Bool);
    /// Integer field.
    pub const INT: Self = Self::Scalar(ScalarType::Int);
    /// String field.
    pub const STR: Self = Self::Scalar(ScalarType::Str);
    /// UUID field.
    pub const UUID: Self = Self::Scalar(ScalarType::Uuid);

    /// Hyperlink to `T`.
    pub fn href<T: target::Referrable>() -> Self {
        return Self::Href(TargetRef::of::<T>());
    }
}

/// Marker tagging a field as a primary key part.
///
/// `name` overrides the externally visible part name (used for URL
/// parameters). `type_` overrides the part's type; it is required when the
/// field is a hyperlink to a target that is still being declared, most
/// commonly the declaring type itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryKey {
    /// Override for the key part name.
    name: Option<&'static str>,
    /// Override for the key part type.
    type_: Option<FieldType>,
}

impl PrimaryKey {
    /// Expose the key part under a different name.
    #[must_use]
    pub const fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        return self;
    }

    /// Marker without overrides.
    pub const fn new() -> Self {
        return Self {
            name: None,
            type_: None,
        };
    }

    /// Give the key part an explicit type.
    #[must_use]
    pub const fn type_(mut self, type_: FieldType) -> Self {
        self.type_ = Some(type_);
        return self;
    }
}

/// A declared field of a target type.
#[derive(Debug, Clone)]
pub struct Field {
    /// Primary key markers attached to the field.
    markers: Vec<PrimaryKey>,
    /// Field name, as passed to [`Referrable::field`](crate::Referrable::field).
    name: &'static str,
    /// Declared type.
    ty: FieldType,
}

impl Field {
    /// Attach a primary key marker.
    #[must_use]
    pub fn marker(mut self, marker: PrimaryKey) -> Self {
        self.markers.push(marker);
        return self;
    }

    /// Field name.
    pub const fn name(&self) -> &'static str {
        return self.name;
    }

    /// Untagged field.
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        return Self {
            markers: Vec::new(),
            name,
            ty,
        };
    }

    /// Tag the field as a primary key part without overrides.
    #[must_use]
    pub fn primary_key(self) -> Self {
        return self.marker(PrimaryKey::new());
    }
}

/// Everything a target type declares about itself.
#[derive(Debug, Clone, Default)]
pub struct Declaration {
    /// Name of the routing endpoint serving the target's representation.
    details_view: Option<String>,
    /// Fields in declaration order.
    fields: Vec<Field>,
}

impl Declaration {
    /// Set the routing endpoint name.
    #[must_use]
    pub fn details_view(mut self, endpoint: &str) -> Self {
        self.details_view = Some(endpoint.to_string());
        return self;
    }

    /// Append a field.
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        return self;
    }

    /// Declared fields.
    pub fn fields(&self) -> &[Field] {
        return &self.fields;
    }

    /// Take the endpoint name out of the declaration.
    pub(crate) fn into_details_view(self) -> Option<String> {
        return self.details_view;
    }

    /// Empty declaration.
    pub fn new() -> Self {
        return Self::default();
    }
}

// ── Key specification ─────────────────────────────────────────────────

/// Shape of a single key part.
#[derive(Debug, Clone)]
pub enum PartShape {
    /// Hyperlink carried by its URL alone; the referred key is not flattened.
    Link(TargetRef),
    /// Hyperlink to another target; its key spec drives flattening.
    Reference(Arc<Target>),
    /// Scalar value.
    Scalar(ScalarType),
}

/// One part of a key.
#[derive(Debug, Clone)]
pub struct KeyPart {
    /// Source field name.
    field: &'static str,
    /// Externally visible part name.
    name: &'static str,
    /// Scalar type or referred target.
    shape: PartShape,
    /// Whether the field's hyperlink is replaced by its inner key on extraction.
    unwrap: bool,
}

impl KeyPart {
    /// Coerce one slot of a raw key value.
    ///
    /// The outer error is fatal (configuration or context); the inner one
    /// describes why the slot was rejected as input.
    fn coerce(&self, slot: &Value, resolver: &dyn Resolver) -> Result<Result<Key, String>> {
        return match &self.shape {
            PartShape::Link(referred) => {
                let url = match key::parse_http_url(slot) {
                    Ok(url) => url,
                    Err(reason) => return Ok(Err(reason)),
                };
                let linked = referred.register()?;
                match linked.url_to_key(&url, resolver) {
                    Ok(key) => Ok(Ok(Key::href(key, url))),
                    Err(e) if e.is_input() => Ok(Err(e.to_string())),
                    Err(e) => Err(e),
                }
            },
            PartShape::Scalar(ty) => Ok(ty.coerce(slot)),
            PartShape::Reference(target) => match href::resolve_value(slot, target, resolver) {
                Ok((key, url)) => Ok(Ok(Key::href(key, url))),
                Err(e) if e.is_input() => Ok(Err(e.to_string())),
                Err(e) => Err(e),
            },
        };
    }

    /// Source field name.
    pub const fn field(&self) -> &'static str {
        return self.field;
    }

    /// Shape of the part as seen in the key.
    fn key_shape(&self) -> KeyShape {
        return match &self.shape {
            PartShape::Link(referred) => KeyShape::Reference(referred.name()),
            PartShape::Reference(target) => KeyShape::Reference(target.name()),
            PartShape::Scalar(ty) => KeyShape::Scalar(*ty),
        };
    }

    /// Externally visible part name.
    pub const fn name(&self) -> &'static str {
        return self.name;
    }

    /// Target whose key spec this part delegates to, if it is a reference.
    pub const fn nested(&self) -> Option<&Arc<Target>> {
        return match &self.shape {
            PartShape::Reference(target) => Some(target),
            PartShape::Link(_) | PartShape::Scalar(_) => None,
        };
    }

    /// Scalar type or referred target.
    pub const fn shape(&self) -> &PartShape {
        return &self.shape;
    }

    /// Whether the field's hyperlink is replaced by its inner key on extraction.
    pub const fn unwraps(&self) -> bool {
        return self.unwrap;
    }
}

/// Shape of a whole key, for diagnostics and listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyShape {
    /// Hyperlink to the named target.
    Reference(&'static str),
    /// Single scalar.
    Scalar(ScalarType),
    /// Named parts in key order.
    Tuple(Vec<(&'static str, KeyShape)>),
    /// No key fields.
    Unit,
}

impl fmt::Display for KeyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::Reference(target) => write!(f, "Href<{target}>"),
            Self::Scalar(ty) => write!(f, "{ty}"),
            Self::Tuple(parts) => {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|(name, shape)| return format!("{name}: {shape}"))
                    .collect();
                write!(f, "({})", rendered.join(", "))
            },
            Self::Unit => f.write_str("()"),
        };
    }
}

/// Ordered key parts of a target type. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct KeySpec {
    /// Parts in declaration order.
    parts: Vec<KeyPart>,
}

impl KeySpec {
    /// Assemble per-part keys into the key shape.
    fn assemble(&self, mut keys: Vec<Key>) -> Key {
        if self.parts.len() == 1
            && let Some(single) = keys.pop()
        {
            return single;
        }
        if keys.is_empty() {
            return Key::Unit;
        }
        return Key::Tuple(keys);
    }

    /// Derive the key spec from a declaration.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateKeyMarker` for a field with several markers,
    /// `Error::ForwardReference` for a reference to a target still being
    /// declared without an override type, `Error::DeepIndirection` when a
    /// referred target itself has a reference part,
    /// `Error::UnsupportedKeyType` for an opaque key field, or
    /// `Error::ParameterCollision` when flattened names clash.
    pub fn build(target: &str, declaration: &Declaration) -> Result<Self> {
        let mut candidates: Vec<(&Field, &PrimaryKey)> = Vec::new();
        for field in declaration.fields() {
            match field.markers.as_slice() {
                [] => {},
                [marker] => candidates.push((field, marker)),
                _ => {
                    return Err(Error::DuplicateKeyMarker {
                        field: field.name.to_string(),
                        target: target.to_string(),
                    });
                },
            }
        }

        let parts = if candidates.is_empty()
            && let Some(field) = declaration.fields().iter().find(|f| return f.name == DEFAULT_KEY_FIELD)
        {
            vec![implicit_part(target, field)?]
        } else {
            candidates
                .into_iter()
                .map(|(field, marker)| return build_part(target, field, marker))
                .collect::<Result<Vec<_>>>()?
        };
        let spec = Self { parts };

        let mut seen = BTreeSet::new();
        for name in spec.param_names() {
            if !seen.insert(name.clone()) {
                return Err(Error::ParameterCollision {
                    name,
                    target: target.to_string(),
                });
            }
        }

        return Ok(spec);
    }

    /// Extract the key of an instance, reading fields through `field`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingField` if the instance does not provide a key field.
    pub fn extract(&self, target: &str, field: impl Fn(&str) -> Option<Key>) -> Result<Key> {
        let mut keys = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let value = field(part.field).ok_or_else(|| Error::MissingField {
                field: part.field.to_string(),
                target: target.to_string(),
            })?;
            if part.unwrap {
                keys.push(value.unwrap_href().clone());
            } else {
                keys.push(value);
            }
        }
        return Ok(self.assemble(keys));
    }

    /// Whether the key is unit.
    pub const fn is_empty(&self) -> bool {
        return self.parts.is_empty();
    }

    /// Number of key parts.
    pub const fn len(&self) -> usize {
        return self.parts.len();
    }

    /// Flattened parameter names, in key order.
    pub fn param_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_param_names(self, "", &mut names);
        return names;
    }

    /// Coerce a raw value into a key of this shape.
    ///
    /// Reference parts are resolved against their own target, so they accept
    /// that target's key or URL. Every rejected part is reported at once.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` listing every structural problem, or any
    /// configuration/context error raised while resolving reference parts.
    pub fn parse_key(&self, target: &str, value: &Value, resolver: &dyn Resolver) -> Result<Key> {
        let invalid = |reason: String| {
            return Error::InvalidKey {
                errors: vec![reason],
                target: target.to_string(),
            };
        };

        let slots: Vec<&Value> = match (self.parts.len(), value) {
            (0, Value::Null) => return Ok(Key::Unit),
            (0, Value::Array(items)) if items.is_empty() => return Ok(Key::Unit),
            (0, other) => return Err(invalid(format!("expected empty key, got {}", describe(other)))),
            (1, single) => vec![single],
            (n, Value::Array(items)) if items.len() == n => items.iter().collect(),
            (n, Value::Array(items)) => {
                return Err(invalid(format!("expected {n} key parts, got {}", items.len())));
            },
            (n, other) => {
                return Err(invalid(format!("expected array of {n} key parts, got {}", describe(other))));
            },
        };

        let mut keys = Vec::with_capacity(slots.len());
        let mut errors = Vec::new();
        for (part, slot) in self.parts.iter().zip(slots) {
            match part.coerce(slot, resolver)? {
                Ok(key) => keys.push(key),
                Err(reason) => errors.push(format!("{}: {reason}", part.name)),
            }
        }

        if !errors.is_empty() {
            return Err(Error::InvalidKey {
                errors,
                target: target.to_string(),
            });
        }
        return Ok(self.assemble(keys));
    }

    /// Key parts in order.
    pub fn parts(&self) -> &[KeyPart] {
        return &self.parts;
    }

    /// Shape of keys conforming to this spec.
    pub fn shape(&self) -> KeyShape {
        return match self.parts.as_slice() {
            [] => KeyShape::Unit,
            [part] => part.key_shape(),
            parts => KeyShape::Tuple(
                parts
                    .iter()
                    .map(|part| return (part.name, part.key_shape()))
                    .collect(),
            ),
        };
    }
}

/// Build one key part from a marked field.
///
/// # Errors
///
/// See [`KeySpec::build`].
fn build_part(target: &str, field: &Field, marker: &PrimaryKey) -> Result<KeyPart> {
    let name = marker.name.unwrap_or(field.name);
    let overridden = marker.type_;
    let ty = overridden.unwrap_or(field.ty);

    let shape = match ty {
        FieldType::Scalar(scalar) => PartShape::Scalar(scalar),
        FieldType::Href(referred) => {
            if target::is_registering(referred.type_id()) {
                return Err(Error::ForwardReference {
                    field: field.name.to_string(),
                    referred: referred.name().to_string(),
                    target: target.to_string(),
                });
            }
            let nested = referred.register()?;
            if nested.key_spec().parts().iter().any(|p| return p.nested().is_some()) {
                return Err(Error::DeepIndirection {
                    part: name.to_string(),
                    referred: nested.name().to_string(),
                    target: target.to_string(),
                });
            }
            PartShape::Reference(nested)
        },
        FieldType::Opaque => {
            return Err(Error::UnsupportedKeyType {
                field: field.name.to_string(),
                target: target.to_string(),
            });
        },
    };

    return Ok(KeyPart {
        field: field.name,
        name,
        shape,
        unwrap: overridden.is_some(),
    });
}

/// Build the key part of the default key field, taken as declared.
///
/// A hyperlink-typed default key is kept as a link: its target is neither
/// registered here nor expanded into its own key parts.
///
/// # Errors
///
/// Returns `Error::UnsupportedKeyType` for an opaque field.
fn implicit_part(target: &str, field: &Field) -> Result<KeyPart> {
    let shape = match field.ty {
        FieldType::Href(referred) => PartShape::Link(referred),
        FieldType::Opaque => {
            return Err(Error::UnsupportedKeyType {
                field: field.name.to_string(),
                target: target.to_string(),
            });
        },
        FieldType::Scalar(scalar) => PartShape::Scalar(scalar),
    };
    return Ok(KeyPart {
        field: field.name,
        name: field.name,
        shape,
        unwrap: false,
    });
}

/// Append the flattened parameter names of `spec` under `prefix`.
fn collect_param_names(spec: &KeySpec, prefix: &str, names: &mut Vec<String>) {
    for part in spec.parts() {
        let name = params::param_name(prefix, part.name);
        match part.nested() {
            Some(nested) => collect_param_names(nested.key_spec(), &format!("{name}_"), names),
            None => names.push(name),
        }
    }
}
