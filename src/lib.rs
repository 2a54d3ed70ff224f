//! Typed hyperlinks between models.
//!
//! A field of type [`Href<T>`] refers to an instance of another model `T`.
//! It holds both the instance's internal key and its external URL, and can
//! be built from either, from an instance, or from another hyperlink.
//! Keys are declared once per model with a [`Declaration`]; conversion
//! between keys and URLs goes through a [`Resolver`], normally a
//! [`RouterResolver`] over the application's routing table.

pub mod config;
pub mod context;
pub mod error;
pub mod href;
pub mod key;
pub mod params;
pub mod resolver;
pub mod routing;
pub mod spec;
#[cfg(feature = "proptest")]
pub mod strategy;
pub mod target;

pub use crate::config::Config;
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::href::{Href, Input};
pub use crate::key::{Key, ScalarType};
pub use crate::params::{Params, flatten, unflatten};
pub use crate::resolver::Resolver;
pub use crate::routing::{RouteNode, Router, RouterResolver};
pub use crate::spec::{Declaration, Field, FieldType, KeyShape, KeySpec, PrimaryKey};
pub use crate::target::{Referrable, Target, TargetRef, register};
