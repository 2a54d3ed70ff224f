use std::path::Path;
use std::sync::Arc;

use crate::error::Error;
use crate::routing::{RouteNode, Router, RouterResolver};

/// Name of the config file looked up in a project root.
pub const CONFIG_FILE: &str = "hrefs.toml";

/// Routing configuration loaded from `hrefs.toml`.
/// The base URL is optional so that a config can describe routes only;
/// building a resolver needs it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin and path prefix of generated URLs.
    base_url: Option<String>,
    /// Top-level routes and mounts.
    routes: Vec<RouteEntry>,
}

/// Raw TOML structure for `hrefs.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct HrefsTomlConfig {
    /// `base_url = "..."`.
    #[serde(default)]
    base_url: Option<String>,
    /// `[[routes]]` tables.
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

/// One `[[routes]]` entry. An entry with nested `routes` is a mount.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    /// Endpoint name (routes) or name prefix (mounts, optional).
    #[serde(default)]
    pub name: Option<String>,
    /// Path template.
    pub path: String,
    /// Children, if the entry is a mount.
    #[serde(default)]
    pub routes: Option<Vec<RouteEntry>>,
}

impl Config {
    /// Configured base URL, if any.
    pub fn base_url(&self) -> Option<&str> {
        return self.base_url.as_deref();
    }

    /// Load config from an explicit file path.
    /// Unlike a missing optional setting, a missing file is an error: there
    /// is no sensible default routing table.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file does not exist,
    /// `Error::Io` if reading fails otherwise, or `Error::TomlDe` if the
    /// TOML is malformed.
    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound {
                    path: path.to_path_buf(),
                });
            },
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Load config from `hrefs.toml` in the given root directory.
    ///
    /// # Errors
    ///
    /// See [`Config::from_path`].
    pub fn load(root: &Path) -> Result<Self, Error> {
        return Self::from_path(&root.join(CONFIG_FILE));
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: HrefsTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            base_url: raw.base_url,
            routes: raw.routes,
        });
    }

    /// Build a resolver over the routing table and the base URL.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingBaseUrl` without a base URL, `Error::InvalidUrl`
    /// for a malformed one, or the errors of [`Config::router`].
    pub fn resolver(&self) -> Result<RouterResolver, Error> {
        let base_url = self.base_url.as_deref().ok_or(Error::MissingBaseUrl)?;
        return RouterResolver::new(Arc::new(self.router()?), base_url);
    }

    /// Build the routing table.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoute` for a bad path template or a route
    /// without a name.
    pub fn router(&self) -> Result<Router, Error> {
        let nodes = build_nodes(&self.routes)?;
        return Ok(Router::new(nodes));
    }

    /// Top-level route entries.
    pub fn routes(&self) -> &[RouteEntry] {
        return &self.routes;
    }
}

/// Convert config entries into routing nodes, recursively.
fn build_nodes(entries: &[RouteEntry]) -> Result<Vec<RouteNode>, Error> {
    let mut nodes = Vec::with_capacity(entries.len());
    for entry in entries {
        let node = match (&entry.routes, &entry.name) {
            (Some(children), Some(name)) => RouteNode::mount(name, &entry.path, build_nodes(children)?)?,
            (Some(children), None) => RouteNode::anonymous_mount(&entry.path, build_nodes(children)?)?,
            (None, Some(name)) => RouteNode::route(name, &entry.path)?,
            (None, None) => {
                return Err(Error::InvalidRoute {
                    path: entry.path.clone(),
                    reason: "route has no name".to_string(),
                });
            },
        };
        nodes.push(node);
    }
    return Ok(nodes);
}
