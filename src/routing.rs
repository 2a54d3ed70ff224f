//! Routing table and the resolver built on it.
//!
//! Routes map endpoint names to path templates such as `/books/{id}`.
//! Mounts group routes under a shared path prefix, which may itself carry
//! parameters (`/heroes/{hero_id}`). Endpoints inside a named mount are
//! addressed as `mount:route`; unnamed mounts add no name component.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::key::{self, Key};
use crate::params::{self, Params};
use crate::resolver::Resolver;
use crate::target::Target;

/// Characters escaped when a parameter value is written into a path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

// ── Path templates ────────────────────────────────────────────────────

/// A piece of a path template.
#[derive(Debug, Clone)]
enum Piece {
    /// Text matched and rendered as is.
    Literal(String),
    /// Named parameter matching one or more non-`/` characters.
    Param(String),
}

/// Compiled path template.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    /// Parameter names in template order.
    params: Vec<String>,
    /// Anchored pattern; unanchored at the end for mount prefixes.
    pattern: Regex,
    /// Literal and parameter pieces in order.
    pieces: Vec<Piece>,
    /// Whether the template is a mount prefix.
    prefix: bool,
    /// The template as written.
    source: String,
}

impl PathTemplate {
    /// The template as written.
    pub fn as_str(&self) -> &str {
        return &self.source;
    }

    /// Match the start (prefix templates) or the whole of `path`.
    ///
    /// Returns the decoded parameter values and the unmatched remainder.
    fn match_path<'p>(&self, path: &'p str) -> Option<(Vec<(String, String)>, &'p str)> {
        let caps = self.pattern.captures(path)?;
        let rest = path.get(caps.get(0)?.end()..)?;
        if self.prefix && !(rest.is_empty() || rest.starts_with('/')) {
            return None;
        }

        let mut values = Vec::with_capacity(self.params.len());
        for name in &self.params {
            let raw = caps.name(name)?.as_str();
            let decoded = percent_decode_str(raw).decode_utf8().ok()?;
            values.push((name.clone(), decoded.into_owned()));
        }
        return Some((values, rest));
    }

    /// Parameter names in template order.
    pub fn params(&self) -> &[String] {
        return &self.params;
    }

    /// Compile a template. `prefix` templates match the start of a path.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoute` for a relative path, an invalid or
    /// repeated parameter name, or an unbalanced brace.
    pub fn parse(path: &str, prefix: bool) -> Result<Self> {
        let invalid = |reason: String| {
            return Error::InvalidRoute {
                path: path.to_string(),
                reason,
            };
        };
        if !path.is_empty() && !path.starts_with('/') {
            return Err(invalid("path must start with `/`".to_string()));
        }

        let placeholder = Regex::new(r"\{([^{}]*)\}").map_err(|e| return invalid(e.to_string()))?;
        let mut pieces = Vec::new();
        let mut params: Vec<String> = Vec::new();
        let mut last = 0;
        for caps in placeholder.captures_iter(path) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_literal(&mut pieces, path.get(last..whole.start()).unwrap_or_default(), path)?;
            let name = name.as_str();
            if !is_identifier(name) {
                return Err(invalid(format!("`{name}` is not a valid parameter name")));
            }
            if params.iter().any(|p| return p == name) {
                return Err(invalid(format!("parameter `{name}` appears more than once")));
            }
            params.push(name.to_string());
            pieces.push(Piece::Param(name.to_string()));
            last = whole.end();
        }
        push_literal(&mut pieces, path.get(last..).unwrap_or_default(), path)?;

        let mut pattern = String::from("^");
        for piece in &pieces {
            match piece {
                Piece::Literal(text) => pattern.push_str(&regex::escape(text)),
                Piece::Param(name) => pattern.push_str(&format!("(?P<{name}>[^/]+)")),
            }
        }
        if !prefix {
            pattern.push('$');
        }
        let pattern = Regex::new(&pattern).map_err(|e| return invalid(e.to_string()))?;

        return Ok(Self {
            params,
            pattern,
            pieces,
            prefix,
            source: path.to_string(),
        });
    }

    /// Render the template, percent-encoding parameter values.
    ///
    /// URL parsers collapse empty, `.` and `..` segments, so such values
    /// cannot be carried in a path at all.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingPathParam` if `params` lacks a template parameter,
    /// or `Error::InvalidKey` if a value is not a representable segment.
    fn render(&self, params: &Params, endpoint: &str, target: &str) -> Result<String> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Param(name) => {
                    let value = params.get(name).ok_or_else(|| Error::MissingPathParam {
                        endpoint: endpoint.to_string(),
                        param: name.clone(),
                    })?;
                    let text = param_text(value);
                    if matches!(text.as_str(), "" | "." | "..") {
                        return Err(Error::InvalidKey {
                            errors: vec![format!("path parameter `{name}` cannot be {text:?}")],
                            target: target.to_string(),
                        });
                    }
                    out.extend(utf8_percent_encode(&text, SEGMENT));
                },
            }
        }
        return Ok(out);
    }
}

/// Append a literal piece, rejecting stray braces.
///
/// # Errors
///
/// Returns `Error::InvalidRoute` if the text contains `{` or `}`.
fn push_literal(pieces: &mut Vec<Piece>, text: &str, path: &str) -> Result<()> {
    if text.contains(['{', '}']) {
        return Err(Error::InvalidRoute {
            path: path.to_string(),
            reason: "unbalanced brace".to_string(),
        });
    }
    if !text.is_empty() {
        pieces.push(Piece::Literal(text.to_string()));
    }
    return Ok(());
}

/// Whether `name` is usable as a parameter (and regex group) name.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    return chars
        .next()
        .is_some_and(|c| return c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| return c.is_ascii_alphanumeric() || c == '_');
}

/// Text of a parameter value as it appears in a URL.
fn param_text(value: &Value) -> String {
    return match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
}

// ── Routing table ─────────────────────────────────────────────────────

/// A route or a mount in a routing table.
#[derive(Debug, Clone)]
pub enum RouteNode {
    /// Routes sharing a path prefix.
    Mount {
        /// Nested routes and mounts.
        children: Vec<RouteNode>,
        /// Name prefixed to the children's endpoint names, if any.
        name: Option<String>,
        /// Path prefix.
        template: PathTemplate,
    },
    /// A named endpoint.
    Route {
        /// Endpoint name.
        name: String,
        /// Full path below the enclosing mounts.
        template: PathTemplate,
    },
}

impl RouteNode {
    /// An unnamed mount: children keep their own names.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoute` if the path template is invalid.
    pub fn anonymous_mount(path: &str, children: Vec<Self>) -> Result<Self> {
        return Ok(Self::Mount {
            children,
            name: None,
            template: PathTemplate::parse(path, true)?,
        });
    }

    /// A named mount: children are addressed as `name:child`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoute` if the path template is invalid.
    pub fn mount(name: &str, path: &str, children: Vec<Self>) -> Result<Self> {
        return Ok(Self::Mount {
            children,
            name: Some(name.to_string()),
            template: PathTemplate::parse(path, true)?,
        });
    }

    /// A named endpoint at `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoute` if the path template is invalid.
    pub fn route(name: &str, path: &str) -> Result<Self> {
        return Ok(Self::Route {
            name: name.to_string(),
            template: PathTemplate::parse(path, false)?,
        });
    }
}

/// Immutable routing table with a memo of resolved endpoint chains.
#[derive(Debug, Default)]
pub struct Router {
    /// Resolved chains by endpoint name.
    chains: RwLock<HashMap<String, Arc<RouteChain>>>,
    /// Top-level routes and mounts.
    routes: Vec<RouteNode>,
}

impl Router {
    /// Mount chain and leaf route of `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownEndpoint` if no route has the name.
    pub fn chain(&self, endpoint: &str) -> Result<Arc<RouteChain>> {
        if let Some(chain) = self.chains.read().get(endpoint) {
            return Ok(Arc::clone(chain));
        }

        let mut mounts = Vec::new();
        let leaf = find_route(&self.routes, endpoint, &mut mounts).ok_or_else(|| Error::UnknownEndpoint {
            endpoint: endpoint.to_string(),
        })?;
        let chain = RouteChain::new(endpoint, mounts.into_iter().cloned().collect(), leaf.clone());
        tracing::debug!(endpoint, path = %chain.path(), params = ?chain.param_names(), "resolved route chain");

        let mut chains = self.chains.write();
        let entry = chains.entry(endpoint.to_string()).or_insert_with(|| return Arc::new(chain));
        return Ok(Arc::clone(entry));
    }

    /// Every addressable endpoint name, in table order.
    pub fn endpoints(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_endpoints(&self.routes, "", &mut names);
        return names;
    }

    /// Routing table over `routes`.
    pub fn new(routes: Vec<RouteNode>) -> Self {
        return Self {
            chains: RwLock::new(HashMap::new()),
            routes,
        };
    }
}

/// Depth-first search for `endpoint`, recording the mounts on the way.
fn find_route<'a>(nodes: &'a [RouteNode], endpoint: &str, mounts: &mut Vec<&'a PathTemplate>) -> Option<&'a PathTemplate> {
    for node in nodes {
        match node {
            RouteNode::Route { name, template } => {
                if name == endpoint {
                    return Some(template);
                }
            },
            RouteNode::Mount {
                children,
                name,
                template,
            } => {
                let inner = match name {
                    Some(name) => match endpoint.strip_prefix(name.as_str()).and_then(|r| return r.strip_prefix(':')) {
                        Some(inner) => inner,
                        None => continue,
                    },
                    None => endpoint,
                };
                mounts.push(template);
                if let Some(leaf) = find_route(children, inner, mounts) {
                    return Some(leaf);
                }
                mounts.pop();
            },
        }
    }
    return None;
}

/// Append the endpoint names under `nodes` with the given name prefix.
fn collect_endpoints(nodes: &[RouteNode], prefix: &str, names: &mut Vec<String>) {
    for node in nodes {
        match node {
            RouteNode::Route { name, .. } => names.push(format!("{prefix}{name}")),
            RouteNode::Mount { children, name, .. } => match name {
                Some(name) => collect_endpoints(children, &format!("{prefix}{name}:"), names),
                None => collect_endpoints(children, prefix, names),
            },
        }
    }
}

/// Mounts and leaf route serving one endpoint.
#[derive(Debug, Clone)]
pub struct RouteChain {
    /// Endpoint name.
    endpoint: String,
    /// Leaf route template.
    leaf: PathTemplate,
    /// Mount prefixes, outermost first.
    mounts: Vec<PathTemplate>,
    /// Union of the path parameters of every template in the chain.
    param_names: Vec<String>,
}

impl RouteChain {
    /// Absolute URL of the endpoint below `base`.
    ///
    /// Parameters that are not path parameters become the query string.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingPathParam` if a path parameter is absent, or
    /// `Error::InvalidKey` (naming `target`) if a path parameter is empty,
    /// `.` or `..`.
    pub fn build_url(&self, base: &Url, params: &Params, target: &str) -> Result<Url> {
        let mut path = base.path().trim_end_matches('/').to_string();
        for template in self.templates() {
            path.push_str(&template.render(params, &self.endpoint, target)?);
        }

        let mut url = base.clone();
        url.set_path(&path);
        url.set_query(None);
        url.set_fragment(None);

        let query: Vec<(&String, String)> = params
            .iter()
            .filter(|(name, _)| return !self.param_names.contains(name))
            .map(|(name, value)| return (name, param_text(value)))
            .collect();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        return Ok(url);
    }

    /// Endpoint name.
    pub fn endpoint(&self) -> &str {
        return &self.endpoint;
    }

    /// Path parameters of `path` (relative to the base URL), peeling one
    /// mount prefix at a time. `None` if any template does not match.
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let mut params = Params::new();
        let mut rest = path;
        for mount in &self.mounts {
            let (values, remainder) = mount.match_path(rest)?;
            params.extend(values.into_iter().map(|(k, v)| return (k, Value::String(v))));
            rest = remainder;
        }
        let (values, _) = self.leaf.match_path(rest)?;
        params.extend(values.into_iter().map(|(k, v)| return (k, Value::String(v))));
        return Some(params);
    }

    /// Assemble a chain and compute its path parameters.
    fn new(endpoint: &str, mounts: Vec<PathTemplate>, leaf: PathTemplate) -> Self {
        let mut param_names: Vec<String> = Vec::new();
        for template in mounts.iter().chain(std::iter::once(&leaf)) {
            for name in template.params() {
                if !param_names.contains(name) {
                    param_names.push(name.clone());
                }
            }
        }
        return Self {
            endpoint: endpoint.to_string(),
            leaf,
            mounts,
            param_names,
        };
    }

    /// Path parameter names of the whole chain.
    pub fn param_names(&self) -> &[String] {
        return &self.param_names;
    }

    /// Full path template, mounts included.
    pub fn path(&self) -> String {
        return self.templates().map(PathTemplate::as_str).collect();
    }

    /// Templates from the outermost mount to the leaf.
    fn templates(&self) -> impl Iterator<Item = &PathTemplate> {
        return self.mounts.iter().chain(std::iter::once(&self.leaf));
    }
}

// ── Resolver ──────────────────────────────────────────────────────────

/// Resolver converting keys to absolute URLs through a routing table.
///
/// The router (with its memo) is shared; a request-bound resolver for a
/// different base URL is derived with [`RouterResolver::with_base_url`].
#[derive(Debug, Clone)]
pub struct RouterResolver {
    /// Origin and path prefix of every URL.
    base_url: Url,
    /// Routing table.
    router: Arc<Router>,
}

impl RouterResolver {
    /// Base URL.
    pub const fn base_url(&self) -> &Url {
        return &self.base_url;
    }

    /// Route chain serving `target`.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingEndpoint` if the target has no details view,
    /// or `Error::UnknownEndpoint` if the router does not know it.
    fn chain_for(&self, target: &Target) -> Result<Arc<RouteChain>> {
        let endpoint = target.details_view().ok_or_else(|| Error::MissingEndpoint {
            target: target.name().to_string(),
        })?;
        return self.router.chain(endpoint);
    }

    /// Resolver producing URLs below `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` unless `base_url` is an absolute HTTP(S) URL.
    pub fn new(router: Arc<Router>, base_url: &str) -> Result<Self> {
        let value = Value::String(base_url.to_string());
        let base_url = key::parse_http_url(&value).map_err(|reason| return Error::InvalidUrl {
            reason,
            value: value.to_string(),
        })?;
        return Ok(Self { base_url, router });
    }

    /// Routing table.
    pub fn router(&self) -> &Router {
        return &self.router;
    }

    /// Resolver sharing this one's router, with another base URL.
    ///
    /// # Errors
    ///
    /// See [`RouterResolver::new`].
    pub fn with_base_url(&self, base_url: &str) -> Result<Self> {
        return Self::new(Arc::clone(&self.router), base_url);
    }
}

impl Resolver for RouterResolver {
    fn key_to_url(&self, key: &Key, target: &Target) -> Result<Url> {
        let chain = self.chain_for(target)?;
        let params = params::flatten(key, target)?;
        let url = chain.build_url(&self.base_url, &params, target.name())?;
        tracing::debug!(target_type = target.name(), %key, %url, "key to url");
        return Ok(url);
    }

    fn url_to_key(&self, url: &Url, target: &Target) -> Result<Key> {
        let unresolvable = || {
            return Error::UnresolvableUrl {
                target: target.name().to_string(),
                url: url.to_string(),
            };
        };
        let chain = self.chain_for(target)?;

        if url.origin() != self.base_url.origin() {
            return Err(unresolvable());
        }
        let base_path = self.base_url.path().trim_end_matches('/');
        let path = url.path().strip_prefix(base_path).ok_or_else(unresolvable)?;
        let path_params = chain.match_path(path).ok_or_else(unresolvable)?;

        let mut params: Params = url
            .query_pairs()
            .map(|(k, v)| return (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        params.extend(path_params);

        let key = params::unflatten(&params, target, self)?;
        tracing::debug!(target_type = target.name(), %url, %key, "url to key");
        return Ok(key);
    }
}

/// Key parameters of `target` that `chain` carries in the query string.
pub fn query_params(chain: &RouteChain, target: &Target) -> Vec<String> {
    return target
        .key_spec()
        .param_names()
        .into_iter()
        .filter(|name| return !chain.param_names().contains(name))
        .collect();
}
