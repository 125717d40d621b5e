//! Thin REST client over the PowerDNS Authoritative API v1.
//!
//! Grounded in `pkg/adapters/powerdns/adapter.go`'s use of the
//! generated PowerDNS OpenAPI client; here a hand-written `reqwest`
//! client plays that role directly rather than pulling in a generated
//! SDK, since the surface this crate needs (get zone, patch rrsets) is
//! small.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::adapters::AdapterError;
use crate::adapters::powerdns::PowerDnsConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PdnsRecord {
    pub content: String,
    #[serde(default)]
    pub disabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PdnsRRset {
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    pub ttl: u32,
    pub records: Vec<PdnsRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changetype: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PdnsZone {
    #[serde(default)]
    pub rrsets: Vec<PdnsRRset>,
}

#[derive(Debug, Serialize)]
struct PatchBody {
    rrsets: Vec<PdnsRRset>,
}

#[derive(Debug, Deserialize)]
struct PdnsErrorBody {
    error: String,
}

/// Cloneable client handle; `reqwest::Client` is itself an `Arc`-backed
/// connection pool, so cloning is cheap and safe to hand to every
/// per-request transaction (spec §5: adapter I/O must not block
/// unrelated requests).
#[derive(Clone)]
pub struct PowerDnsClient {
    http: Client,
    base_url: String,
    server_id: String,
    api_key: String,
}

impl PowerDnsClient {
    #[must_use]
    pub fn new(config: PowerDnsConfig) -> Self {
        PowerDnsClient {
            http: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            server_id: config.server_id,
            api_key: config.api_key,
        }
    }

    fn zone_url(&self, zone_fqdn: &str) -> String {
        format!("{}/api/v1/servers/{}/zones/{}", self.base_url, self.server_id, zone_fqdn)
    }

    pub async fn get_zone(&self, zone_fqdn: &str) -> Result<PdnsZone, AdapterError> {
        let resp = self
            .http
            .get(self.zone_url(zone_fqdn))
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;
        Self::check_status(&resp.status(), "GET zone")?;
        resp.json().await.map_err(|e| AdapterError::Http(e.to_string()))
    }

    pub async fn patch_rrsets(&self, zone_fqdn: &str, rrsets: Vec<PdnsRRset>) -> Result<(), AdapterError> {
        let body = PatchBody { rrsets };
        let resp = self
            .http
            .patch(self.zone_url(zone_fqdn))
            .header("X-API-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = resp
            .json::<PdnsErrorBody>()
            .await
            .map(|b| b.error)
            .unwrap_or_else(|_| status.to_string());
        Err(AdapterError::Api(detail))
    }

    fn check_status(status: &StatusCode, what: &str) -> Result<(), AdapterError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(AdapterError::Api(format!("{what} returned {status}")))
        }
    }
}
