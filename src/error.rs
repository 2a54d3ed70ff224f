//! Crate-level error types for hyperlink declaration, conversion and routing.
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Broad classification of an [`Error`].
///
/// Input errors are caused by the value being converted and are safe to
/// report back to an API client. The other kinds point at the program:
/// a bad type declaration, a misconfigured routing table, or a conversion
/// attempted outside any resolver scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Routing table, endpoint or config file is wrong or incomplete.
    Configuration,
    /// No resolver is installed in the ambient context.
    Context,
    /// A target type's key declaration is invalid.
    Declaration,
    /// The value being converted is not a valid key or URL.
    Input,
}

/// All errors carry the target, field or endpoint they are about, so that a
/// diagnostic can be produced without a debugger.
#[allow(clippy::error_impl_error, reason = "the crate's single public error type")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value matched none of the shapes a hyperlink can be built from.
    #[error("could not convert {value} to href to `{target}`")]
    CannotConvert {
        /// Target type the value was converted for.
        target: String,
        /// JSON rendering of the rejected value.
        value: String,
    },

    /// Expected config file does not exist on disk.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// A key part refers to a target whose own key contains a reference.
    #[error("key part `{part}` of `{target}` refers to `{referred}`, whose key already contains a reference; deep indirection is not supported")]
    DeepIndirection {
        /// Name of the offending key part.
        part: String,
        /// Target referred to by the key part.
        referred: String,
        /// Target being declared.
        target: String,
    },

    /// A field carries more than one primary key marker.
    #[error("field `{field}` of `{target}` has more than one primary key marker")]
    DuplicateKeyMarker {
        /// Field with duplicate markers.
        field: String,
        /// Target being declared.
        target: String,
    },

    /// A key part refers to a target that is not declared yet and no override type was given.
    #[error("key part `{field}` of `{target}` is a forward reference to `{referred}`; give the primary key an explicit type")]
    ForwardReference {
        /// Field holding the forward reference.
        field: String,
        /// Target that is still being declared.
        referred: String,
        /// Target being declared.
        target: String,
    },

    /// A value does not have the shape or types of the target's key.
    #[error("invalid key for `{target}`: {}", errors.join("; "))]
    InvalidKey {
        /// Every structural problem found in the value.
        errors: Vec<String>,
        /// Target whose key was parsed.
        target: String,
    },

    /// A route path template cannot be compiled.
    #[error("invalid route `{path}`: {reason}")]
    InvalidRoute {
        /// The path template as written.
        path: String,
        /// Why the template was rejected.
        reason: String,
    },

    /// A value is not an absolute HTTP(S) URL.
    #[error("invalid url {value}: {reason}")]
    InvalidUrl {
        /// Why the value was rejected.
        reason: String,
        /// JSON rendering of the rejected value.
        value: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A resolver was requested from a config without `base_url`.
    #[error("config has no base_url; absolute URLs cannot be built")]
    MissingBaseUrl,

    /// The target has no routing endpoint configured.
    #[error("`{target}` has no details view configured")]
    MissingEndpoint {
        /// Target without an endpoint.
        target: String,
    },

    /// An instance did not provide a field its key is built from.
    #[error("instance of `{target}` has no value for key field `{field}`")]
    MissingField {
        /// Field that was asked for.
        field: String,
        /// Target whose key was extracted.
        target: String,
    },

    /// Parameters needed to assemble a key are absent.
    #[error("missing parameters for `{target}`: {}", names.join(", "))]
    MissingParams {
        /// Every missing parameter name, in key order.
        names: Vec<String>,
        /// Target whose key was assembled.
        target: String,
    },

    /// The key does not provide a parameter the endpoint path needs.
    #[error("endpoint `{endpoint}` needs path parameter `{param}` which the key does not provide")]
    MissingPathParam {
        /// Endpoint whose path has the parameter.
        endpoint: String,
        /// Parameter name.
        param: String,
    },

    /// A conversion was attempted with no resolver in scope.
    #[error("no href resolver in scope")]
    NoResolver,

    /// Two key parts flatten to the same parameter name.
    #[error("key of `{target}` flattens to parameter `{name}` more than once")]
    ParameterCollision {
        /// Colliding parameter name.
        name: String,
        /// Target being declared.
        target: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A generated key would have to contain a hyperlink to a target whose
    /// key is being generated.
    #[error("key of `{target}` links back to itself and cannot be generated")]
    UnboundedKey {
        /// Target whose key links back.
        target: String,
    },

    /// No route in the routing table has the endpoint name.
    #[error("unknown endpoint: `{endpoint}`")]
    UnknownEndpoint {
        /// Endpoint name that was not found.
        endpoint: String,
    },

    /// No target with the name is known to the caller.
    #[error("unknown target: `{name}`")]
    UnknownTarget {
        /// Target name that was not found.
        name: String,
    },

    /// The URL does not match the target's endpoint.
    #[error("could not resolve {url} into key of `{target}`")]
    UnresolvableUrl {
        /// Target whose key was wanted.
        target: String,
        /// The URL that failed to match.
        url: String,
    },

    /// A key part is declared with a type that cannot be part of a key.
    #[error("field `{field}` of `{target}` cannot be a key part")]
    UnsupportedKeyType {
        /// Field with the unsupported type.
        field: String,
        /// Target being declared.
        target: String,
    },
}

impl Error {
    /// Whether the error was caused by the converted value rather than the program.
    pub const fn is_input(&self) -> bool {
        return matches!(self.kind(), ErrorKind::Input);
    }

    /// Classify the error.
    pub const fn kind(&self) -> ErrorKind {
        return match self {
            Self::CannotConvert { .. }
            | Self::InvalidKey { .. }
            | Self::InvalidUrl { .. }
            | Self::MissingParams { .. }
            | Self::UnresolvableUrl { .. } => ErrorKind::Input,
            Self::DeepIndirection { .. }
            | Self::DuplicateKeyMarker { .. }
            | Self::ForwardReference { .. }
            | Self::ParameterCollision { .. }
            | Self::UnboundedKey { .. }
            | Self::UnsupportedKeyType { .. } => ErrorKind::Declaration,
            Self::NoResolver => ErrorKind::Context,
            Self::ConfigNotFound { .. }
            | Self::InvalidRoute { .. }
            | Self::Io(_)
            | Self::MissingBaseUrl
            | Self::MissingEndpoint { .. }
            | Self::MissingField { .. }
            | Self::MissingPathParam { .. }
            | Self::TomlDe(_)
            | Self::UnknownEndpoint { .. }
            | Self::UnknownTarget { .. } => ErrorKind::Configuration,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn missing_resolver_is_distinct_from_bad_input() {
        assert_eq!(Error::NoResolver.kind(), ErrorKind::Context);
        let bad = Error::CannotConvert {
            target: "Book".to_string(),
            value: "{}".to_string(),
        };
        assert!(bad.is_input());
        assert!(!Error::NoResolver.is_input());
    }

    #[test]
    fn missing_params_lists_every_name() {
        let err = Error::MissingParams {
            names: vec!["book_id".to_string(), "page_number".to_string()],
            target: "Page".to_string(),
        };
        assert_eq!(err.to_string(), "missing parameters for `Page`: book_id, page_number");
    }
}
