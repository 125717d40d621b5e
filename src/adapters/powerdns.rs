//! PowerDNS Authoritative HTTP API v1 adapter (spec §4.4, §6).
//!
//! Grounded in `pkg/adapters/powerdns/{adapter,convert,transaction,types}.go`.
//! `reqwest` plays the role of Go's `net/http` client, pulled in as
//! enrichment from the retrieval pack's own HTTP-client-carrying crates
//! since the teacher has no HTTP dependency of its own.

pub mod client;
pub mod convert;
pub mod transaction;

use async_trait::async_trait;
use serde::Deserialize;

use hickory_proto::rr::Name;

use crate::adapters::powerdns::client::PowerDnsClient;
use crate::adapters::powerdns::transaction::PowerDnsTransaction;
use crate::adapters::{Adapter, AdapterError, AdapterTransaction};

#[derive(Debug, Clone, Deserialize)]
pub struct PowerDnsConfig {
    /// Base URL of the PowerDNS API, e.g. `http://127.0.0.1:8081`.
    pub url: String,
    /// Virtual-host / server identifier, usually `localhost`.
    #[serde(default = "default_server_id")]
    pub server_id: String,
    /// `X-API-Key` header value.
    pub api_key: String,
}

fn default_server_id() -> String {
    "localhost".to_string()
}

pub struct PowerDnsAdapter {
    name: String,
    client: PowerDnsClient,
}

impl PowerDnsAdapter {
    #[must_use]
    pub fn new(config: PowerDnsConfig) -> Self {
        PowerDnsAdapter { name: "powerdns".to_string(), client: PowerDnsClient::new(config) }
    }
}

#[async_trait]
impl Adapter for PowerDnsAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn new_transaction(&self, zone_fqdn: &Name) -> Result<Box<dyn AdapterTransaction>, AdapterError> {
        Ok(Box::new(PowerDnsTransaction::new(self.client.clone(), zone_fqdn.clone())))
    }
}
