//! Zone descriptors and the zone registry.
//!
//! Grounded in `pkg/dns/zone.go`: `NewZone` canonicalizes the FQDN and
//! rejects an empty result; `KeyIsAuthorized` is a linear scan over the
//! permitted-key list (kept flat rather than hashed, matching the
//! source — zone cardinality is small); `AlgorithmIsPermitted` always
//! returns true today, a gap the source itself flags with a FIXME and
//! which this crate carries forward unchanged (spec §4.2: "currently
//! accepts all recognized algorithms").

use std::collections::HashMap;
use std::fmt;

use hickory_proto::rr::Name;

#[derive(Debug)]
pub struct InvalidZone(pub String);

impl fmt::Display for InvalidZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid zone: {}", self.0)
    }
}

impl std::error::Error for InvalidZone {}

/// A zone descriptor (spec §3): canonical FQDN, the handler (adapter
/// instance slug/name) it's bound to, permitted TSIG key names, and
/// whether authentication is disabled for it.
#[derive(Debug, Clone)]
pub struct Zone {
    fqdn: Name,
    pub handler: String,
    permitted_keys: Vec<String>,
    unsecure: bool,
}

impl Zone {
    pub fn new(fqdn: &str, handler: String, permitted_keys: Vec<String>, unsecure: bool) -> Result<Self, InvalidZone> {
        let fqdn = Name::from_ascii(fqdn).map_err(|e| InvalidZone(format!("{fqdn}: {e}")))?;
        if fqdn.is_root() && fqdn.num_labels() == 0 {
            return Err(InvalidZone("zone fqdn must be non-empty".to_string()));
        }
        if unsecure && !permitted_keys.is_empty() {
            return Err(InvalidZone(format!("{fqdn}: unsecure zone must not list permitted keys")));
        }
        if !unsecure && permitted_keys.is_empty() {
            return Err(InvalidZone(format!("{fqdn}: secured zone must have at least one permitted key")));
        }
        Ok(Zone { fqdn, handler, permitted_keys, unsecure })
    }

    #[must_use]
    pub fn fqdn(&self) -> &Name {
        &self.fqdn
    }

    #[must_use]
    pub fn key_is_authorized(&self, name: &str) -> bool {
        self.permitted_keys.iter().any(|k| k == name)
    }

    /// Currently accepts any recognized algorithm (spec §4.2); kept as
    /// a method rather than a constant `true` so that future per-zone
    /// algorithm restriction is a local change.
    #[must_use]
    pub fn algorithm_is_permitted(&self, _algorithm: &str) -> bool {
        true
    }

    #[must_use]
    pub fn authentication_disabled(&self) -> bool {
        self.unsecure
    }
}

/// Process-lifetime map from canonical FQDN to zone descriptor.
/// Populated once at startup, read-only afterward (spec §5).
#[derive(Debug, Default)]
pub struct ZoneRegistry {
    zones: HashMap<Name, Zone>,
}

impl ZoneRegistry {
    #[must_use]
    pub fn new() -> Self {
        ZoneRegistry { zones: HashMap::new() }
    }

    pub fn insert(&mut self, zone: Zone) {
        self.zones.insert(zone.fqdn.clone(), zone);
    }

    #[must_use]
    pub fn lookup(&self, name: &Name) -> Option<&Zone> {
        self.zones.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }
}
