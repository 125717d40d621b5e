//! PowerDNS-backed `AdapterTransaction` (spec §4.4).
//!
//! Grounded in `pkg/adapters/powerdns/transaction.go`. PowerDNS's REST
//! API has no multi-operation transaction (spec §9, open question):
//! `commit`/`rollback` are best-effort no-ops here, matching the
//! source's own "`!!! NOT IMPLEMENTED !!!`" stance rather than layering
//! a write-ahead journal this crate has no requirement to build.
//! `GetAll`/`GetSet`/`AddSet`/`ChangeSet`/`DeleteSet` apply directly
//! against the backend as they're called.

use std::collections::HashMap;

use async_trait::async_trait;

use hickory_proto::rr::{Name, RecordType};

use crate::adapters::powerdns::client::{PdnsRRset, PdnsRecord, PowerDnsClient};
use crate::adapters::powerdns::convert::{content_of, pdns_to_type, rdata_of, type_to_pdns};
use crate::adapters::{AdapterError, AdapterTransaction};
use crate::dns::RRset;

pub struct PowerDnsTransaction {
    client: PowerDnsClient,
    zone_fqdn: Name,
    poisoned: bool,
}

impl PowerDnsTransaction {
    #[must_use]
    pub fn new(client: PowerDnsClient, zone_fqdn: Name) -> Self {
        PowerDnsTransaction { client, zone_fqdn, poisoned: false }
    }

    fn check_not_poisoned(&self) -> Result<(), AdapterError> {
        if self.poisoned {
            return Err(AdapterError::Api("transaction is poisoned; only rollback is legal".to_string()));
        }
        Ok(())
    }

    fn zone_fqdn_str(&self) -> String {
        self.zone_fqdn.to_string()
    }

    fn names_match(candidate: &str, name: &Name) -> bool {
        Name::from_ascii(candidate).map(|n| &n == name).unwrap_or(false)
    }
}

#[async_trait]
impl AdapterTransaction for PowerDnsTransaction {
    async fn get_all(&mut self, name: &Name) -> Result<HashMap<RecordType, RRset>, AdapterError> {
        self.check_not_poisoned()?;
        let zone = self.client.get_zone(&self.zone_fqdn_str()).await.inspect_err(|_| self.poisoned = true)?;
        let mut out: HashMap<RecordType, RRset> = HashMap::new();
        for rrset in zone.rrsets.into_iter().filter(|r| Self::names_match(&r.name, name)) {
            let rtype = match pdns_to_type(&rrset.rtype) {
                Ok(t) => t,
                // An unrecognized type on a matched name is a backend
                // quirk we log and skip, not an error (spec §4.4:
                // "partial results from such filtering are logged but
                // not an error").
                Err(_) => {
                    log::warn!("skipping unsupported record type {} on {}", rrset.rtype, rrset.name);
                    continue;
                }
            };
            let members = rrset
                .records
                .iter()
                .map(|r| rdata_of(rtype, &r.content))
                .collect::<Result<Vec<_>, _>>()?;
            out.insert(rtype, RRset::new(name.clone(), hickory_proto::rr::DNSClass::IN, rtype, rrset.ttl, members));
        }
        Ok(out)
    }

    async fn get_set(&mut self, name: &Name, rtype: RecordType) -> Result<RRset, AdapterError> {
        let all = self.get_all(name).await?;
        Ok(all.into_iter().find(|(t, _)| *t == rtype).map(|(_, s)| s).unwrap_or_else(|| {
            RRset::new(name.clone(), hickory_proto::rr::DNSClass::IN, rtype, 0, Vec::new())
        }))
    }

    async fn add_set(&mut self, rrset: &RRset) -> Result<(), AdapterError> {
        self.change_set(rrset).await
    }

    async fn change_set(&mut self, rrset: &RRset) -> Result<(), AdapterError> {
        self.check_not_poisoned()?;
        let rtype_str = type_to_pdns(rrset.rtype)?;
        let records = rrset
            .members
            .iter()
            .map(|rdata| content_of(rdata).map(|content| PdnsRecord { content, disabled: false }))
            .collect::<Result<Vec<_>, _>>()?;
        let pdns_rrset = PdnsRRset {
            name: rrset.name.to_string(),
            rtype: rtype_str,
            ttl: rrset.ttl,
            records,
            changetype: Some("REPLACE".to_string()),
        };
        self.client.patch_rrsets(&self.zone_fqdn_str(), vec![pdns_rrset]).await.inspect_err(|_| self.poisoned = true)
    }

    async fn delete_set(&mut self, name: &Name, rtype: RecordType) -> Result<(), AdapterError> {
        self.check_not_poisoned()?;
        let rtype_str = type_to_pdns(rtype)?;
        let pdns_rrset = PdnsRRset {
            name: name.to_string(),
            rtype: rtype_str,
            ttl: 0,
            records: Vec::new(),
            changetype: Some("DELETE".to_string()),
        };
        // DELETE of an already-absent set is idempotent (spec §4.4);
        // PowerDNS itself returns success for a no-op DELETE changetype.
        self.client.patch_rrsets(&self.zone_fqdn_str(), vec![pdns_rrset]).await.inspect_err(|_| self.poisoned = true)
    }

    async fn commit(&mut self) -> Result<(), AdapterError> {
        self.check_not_poisoned()
    }

    async fn rollback(&mut self) -> Result<(), AdapterError> {
        // Best-effort: mutations already applied directly against the
        // backend cannot be undone without a journal this adapter
        // doesn't keep (spec §9, open question resolved in DESIGN.md).
        Ok(())
    }
}
