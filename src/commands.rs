//! CLI commands for hrefs: resolve, routes, targets.

use std::path::Path;

use hrefs::routing;
use hrefs::{Config, Error};
use serde_json::Value;

use crate::catalog;

/// Parse a command-line value: JSON if it parses, otherwise a plain string.
fn parse_value(raw: &str) -> Value {
    return serde_json::from_str(raw).unwrap_or_else(|_| return Value::String(raw.to_string()));
}

/// Build a hyperlink to a catalog target from a key or URL and print both halves.
///
/// # Errors
///
/// Returns config errors, `Error::UnknownTarget` for a name not in the
/// catalog, or the conversion error of the value.
pub fn cmd_resolve(config_path: &Path, target: &str, raw: &str) -> Result<(), Error> {
    let config = Config::from_path(config_path)?;
    let resolver = config.resolver()?;
    let entry = catalog::find(target).ok_or_else(|| Error::UnknownTarget {
        name: target.to_string(),
    })?;

    let (key, url) = (entry.resolve)(parse_value(raw), &resolver)?;
    println!("key: {}", key.to_value());
    println!("url: {url}");
    return Ok(());
}

/// List every endpoint of the routing table with its full path and parameters.
///
/// # Errors
///
/// Returns config errors or `Error::InvalidRoute`.
pub fn cmd_routes(config_path: &Path) -> Result<(), Error> {
    let config = Config::from_path(config_path)?;
    let router = config.router()?;
    for endpoint in router.endpoints() {
        let chain = router.chain(&endpoint)?;
        println!("{endpoint}  {}  [{}]", chain.path(), chain.param_names().join(", "));
    }
    return Ok(());
}

/// List catalog targets with their endpoint, key shape and parameters.
///
/// Parameters that the endpoint's path does not carry are marked as query
/// parameters; endpoints missing from the routing table are reported inline.
///
/// # Errors
///
/// Returns config errors or the declaration error of a catalog target.
pub fn cmd_targets(config_path: &Path) -> Result<(), Error> {
    let config = Config::from_path(config_path)?;
    let router = config.router()?;
    for entry in catalog::ENTRIES {
        let target = (entry.target)()?;
        let spec = target.key_spec();
        let endpoint = target.details_view().unwrap_or("-");
        let route = match router.chain(endpoint) {
            Ok(chain) => {
                let query = routing::query_params(&chain, &target);
                if query.is_empty() {
                    chain.path()
                } else {
                    format!("{}?{}", chain.path(), query.join("&"))
                }
            },
            Err(e) => format!("({e})"),
        };
        println!(
            "{}  {endpoint}  {}  [{}]  {route}",
            entry.name,
            spec.shape(),
            spec.param_names().join(", ")
        );
    }
    return Ok(());
}
