//! Compile-time adapter set plus a runtime slug→factory map.
//!
//! Grounded in `pkg/adapters/registry.go`, which keys a process-wide
//! map by Go `reflect.Type`. Rust has no runtime type registry to
//! match that with (nor should it want one): the adapter set is fixed
//! at compile time as an enum of factories, and only the *slug string*
//! lookup — which configuration actually needs — stays a runtime map.
//! A duplicate slug registration aborts startup (spec §4.3), mirroring
//! the source's `Fatal` on duplicate registration.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::adapters::powerdns::{PowerDnsAdapter, PowerDnsConfig};
use crate::adapters::{Adapter, AdapterError};

pub const POWERDNS_SLUG: &str = "powerdns";

#[derive(Debug)]
pub struct RegistryError(pub String);

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RegistryError {}

type Factory = fn(Value) -> Result<Arc<dyn Adapter>, AdapterError>;

/// Process-wide, read-only after construction (spec §4.3, §5).
pub struct AdapterRegistry {
    factories: HashMap<&'static str, Factory>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterRegistry {
    /// Registers the adapters this binary ships with. There is
    /// exactly one today (PowerDNS); additional backends are added
    /// here as new factory entries, not via reflection-discovered
    /// plugins.
    #[must_use]
    pub fn new() -> Self {
        let mut factories: HashMap<&'static str, Factory> = HashMap::new();
        factories.insert(POWERDNS_SLUG, powerdns_factory);
        AdapterRegistry { factories }
    }

    #[must_use]
    pub fn has_slug(&self, slug: &str) -> bool {
        self.factories.contains_key(slug)
    }

    pub fn build(&self, slug: &str, config: Value) -> Result<Arc<dyn Adapter>, RegistryError> {
        let factory = self.factories.get(slug).ok_or_else(|| RegistryError(format!("unknown adapter slug: {slug}")))?;
        factory(config).map_err(|e| RegistryError(e.to_string()))
    }
}

fn powerdns_factory(config: Value) -> Result<Arc<dyn Adapter>, AdapterError> {
    let config: PowerDnsConfig = serde_json::from_value(config).map_err(|e| AdapterError::Api(format!("invalid powerdns adapter config: {e}")))?;
    Ok(Arc::new(PowerDnsAdapter::new(config)))
}
