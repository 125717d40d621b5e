//! The update task: authorization → transaction → prerequisites →
//! §3.4.2 update algorithm → commit (spec §4.8).
//!
//! Grounded in `pkg/dns/update/task.go`'s `Task.Execute()` and its
//! `doUpdate`/`doAddToRRset`/`doDeleteRRset`/`doDeleteFromRRset`
//! helpers, which implement the RFC 2136 §3.4.2 pseudocode almost
//! verbatim. Dispatch by update-RR class replaces the source's
//! sequential `switch` with one `match` per RR, which is the idiomatic
//! shape for a closed three-way branch.

use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};

use crate::adapters::{Adapter, AdapterTransaction};
use crate::dns::rr::rdata_equal;
use crate::dns::RRset;
use crate::update::authorization::AuthorizationError;
use crate::update::prerequisites::{evaluate_all, Prerequisite};
use crate::update::{Authorization, UpdateError};

/// One RR from the update (authority) section, before §3.4.2
/// dispatch. `rdata` is `None` for the rdlength=0 delete forms (spec
/// §4.7 prescan: class=ANY or class=NONE with zero rdata).
#[derive(Debug, Clone)]
pub struct UpdateRR {
    pub name: Name,
    pub class: DNSClass,
    pub rtype: RecordType,
    pub ttl: u32,
    pub rdata: Option<RData>,
}

pub struct Task {
    pub authorization: Authorization,
    pub prerequisites: Vec<Prerequisite>,
    pub zone_class: DNSClass,
    pub updates: Vec<UpdateRR>,
}

impl Task {
    #[must_use]
    pub fn new(authorization: Authorization, prerequisites: Vec<Prerequisite>, zone_class: DNSClass, updates: Vec<UpdateRR>) -> Self {
        Task { authorization, prerequisites, zone_class, updates }
    }

    pub async fn execute(&self, adapter: &dyn Adapter) -> Result<(), UpdateError> {
        self.authorization.evaluate().map_err(|e| match e {
            AuthorizationError::UnauthorizedKey | AuthorizationError::ForbiddenAlgorithm | AuthorizationError::AuthenticationRequired => {
                UpdateError::new(ResponseCode::Refused, e.to_string())
            }
        })?;

        let zone_fqdn = self.authorization.zone().fqdn().clone();
        let mut transaction = adapter
            .new_transaction(&zone_fqdn)
            .await
            .map_err(|e| UpdateError::servfail(format!("opening transaction: {e}")))?;

        if let Err(e) = evaluate_all(&self.prerequisites, transaction.as_mut()).await {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        for rr in &self.updates {
            let result = match rr.class {
                c if c == self.zone_class => do_add_to_rrset(&zone_fqdn, rr, transaction.as_mut()).await,
                DNSClass::ANY => do_delete_rrset(&zone_fqdn, rr, transaction.as_mut()).await,
                DNSClass::NONE => do_delete_from_rrset(rr, transaction.as_mut()).await,
                other => Err(UpdateError::servfail(format!("unexpected update class {other} reached task execution"))),
            };
            if let Err(e) = result {
                let _ = transaction.rollback().await;
                return Err(e);
            }
        }

        transaction.commit().await.map_err(|e| UpdateError::servfail(format!("commit failed: {e}")))
    }
}

/// RFC 2136 §3.4.2.2 "add to an RRset": class == ZCLASS.
async fn do_add_to_rrset(zone_fqdn: &Name, rr: &UpdateRR, transaction: &mut dyn AdapterTransaction) -> Result<(), UpdateError> {
    let zone_sets = transaction.get_all(&rr.name).await?;

    if rr.rtype == RecordType::CNAME {
        if zone_sets.keys().any(|t| *t != RecordType::CNAME) {
            return Ok(()); // conflicts with existing non-CNAME data: silent skip
        }
    } else if zone_sets.contains_key(&RecordType::CNAME) {
        return Ok(()); // a CNAME already covers this name: silent skip
    }

    if rr.rtype == RecordType::SOA {
        return do_add_soa(zone_fqdn, rr, &zone_sets, transaction).await;
    }

    let rdata = rr.rdata.clone().ok_or_else(|| UpdateError::servfail("add-to-rrset update RR carries no rdata"))?;
    let mut existing = zone_sets.get(&rr.rtype).cloned().unwrap_or_else(|| RRset::new(rr.name.clone(), DNSClass::IN, rr.rtype, rr.ttl, Vec::new()));

    for member in &mut existing.members {
        if rr.rtype == RecordType::CNAME || rdata_equal(&rr.name, rr.rtype, &rdata, &existing.name, existing.rtype, member) {
            *member = rdata;
            existing.ttl = rr.ttl;
            transaction.change_set(&existing).await?;
            return Ok(());
        }
    }

    existing.members.push(rdata);
    existing.ttl = rr.ttl;
    if existing.len() > 1 {
        transaction.change_set(&existing).await?;
    } else {
        transaction.add_set(&existing).await?;
    }
    Ok(())
}

/// RFC 1982 serial-number "greater than" predicate: `s2` is considered
/// to have happened after `s1` modulo 2^32, as RFC 2136 §3.4.2.2
/// requires when deciding whether an incoming SOA update supersedes
/// the zone's current one (spec §9, open question — resolved here
/// rather than left unimplemented, since the algorithm is small and
/// well-specified).
fn serial_is_greater(s1: u32, s2: u32) -> bool {
    let diff = s2.wrapping_sub(s1) as i32;
    diff > 0
}

async fn do_add_soa(
    _zone_fqdn: &Name,
    rr: &UpdateRR,
    zone_sets: &std::collections::HashMap<RecordType, RRset>,
    transaction: &mut dyn AdapterTransaction,
) -> Result<(), UpdateError> {
    let rdata = rr.rdata.clone().ok_or_else(|| UpdateError::servfail("SOA update RR carries no rdata"))?;
    let new_serial = match &rdata {
        RData::SOA(soa) => soa.serial(),
        _ => return Err(UpdateError::servfail("SOA update RR rdata is not an SOA record")),
    };

    let existing_serial = zone_sets.get(&RecordType::SOA).and_then(|set| set.members.first()).and_then(|rdata| match rdata {
        RData::SOA(soa) => Some(soa.serial()),
        _ => None,
    });

    if let Some(existing_serial) = existing_serial {
        if existing_serial == new_serial || !serial_is_greater(existing_serial, new_serial) {
            // Existing serial is greater-or-equal: RFC 1982 says ignore
            // the update.
            return Ok(());
        }
    }

    let mut set = RRset::new(rr.name.clone(), DNSClass::IN, RecordType::SOA, rr.ttl, vec![rdata]);
    set.ttl = rr.ttl;
    transaction.change_set(&set).await?;
    Ok(())
}

/// RFC 2136 §3.4.2.3 "delete an RRset": class == ANY.
async fn do_delete_rrset(zone_fqdn: &Name, rr: &UpdateRR, transaction: &mut dyn AdapterTransaction) -> Result<(), UpdateError> {
    if rr.rtype == RecordType::ANY {
        let zone_sets = transaction.get_all(&rr.name).await?;
        let is_apex = &rr.name == zone_fqdn;
        for rtype in zone_sets.keys() {
            if is_apex && (*rtype == RecordType::SOA || *rtype == RecordType::NS) {
                continue; // apex guard (spec §4.8, testable property)
            }
            transaction.delete_set(&rr.name, *rtype).await?;
        }
        return Ok(());
    }

    if &rr.name == zone_fqdn && (rr.rtype == RecordType::SOA || rr.rtype == RecordType::NS) {
        return Ok(()); // silent skip: can't strip the apex SOA/NS via a single-type delete
    }

    transaction.delete_set(&rr.name, rr.rtype).await?;
    Ok(())
}

/// RFC 2136 §3.4.2.4 "delete an RR from an RRset": class == NONE.
async fn do_delete_from_rrset(rr: &UpdateRR, transaction: &mut dyn AdapterTransaction) -> Result<(), UpdateError> {
    if rr.rtype == RecordType::SOA {
        return Ok(());
    }

    if rr.rtype == RecordType::NS {
        let set = transaction.get_set(&rr.name, RecordType::NS).await?;
        if set.len() <= 1 {
            return Ok(()); // preserve at least one apex NS
        }
    }

    let rdata = rr.rdata.clone().ok_or_else(|| UpdateError::servfail("delete-from-rrset update RR carries no rdata"))?;
    let mut set = transaction.get_set(&rr.name, rr.rtype).await?;
    let before = set.len();
    set.members.retain(|member| !rdata_equal(&rr.name, rr.rtype, &rdata, &set.name, set.rtype, member));

    if set.len() == before {
        return Ok(()); // nothing matched: no-op
    }
    if set.is_empty() {
        transaction.delete_set(&rr.name, rr.rtype).await?;
    } else {
        transaction.change_set(&set).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::AdapterError;
    use async_trait::async_trait;
    use hickory_proto::rr::rdata::{A, NS, SOA, TXT};
    use std::collections::HashMap as StdHashMap;
    use std::net::Ipv4Addr;
    use std::str::FromStr;
    use std::sync::{Arc, Mutex};

    /// A single mutation the mock transaction recorded, for assertions
    /// like "scenario 1 expects exactly one `AddSet` call" (spec §8).
    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        AddSet(RRset),
        ChangeSet(RRset),
        DeleteSet(Name, RecordType),
    }

    #[derive(Default)]
    struct MockState {
        zone: StdHashMap<(Name, RecordType), RRset>,
        calls: Vec<Call>,
    }

    #[derive(Clone, Default)]
    struct MockTransaction {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransaction {
        fn with_rrset(rrset: RRset) -> Self {
            let mock = MockTransaction::default();
            mock.state.lock().unwrap().zone.insert((rrset.name.clone(), rrset.rtype), rrset);
            mock
        }

        fn calls(&self) -> Vec<Call> {
            self.state.lock().unwrap().calls.clone()
        }
    }

    #[async_trait]
    impl AdapterTransaction for MockTransaction {
        async fn get_all(&mut self, name: &Name) -> Result<StdHashMap<RecordType, RRset>, AdapterError> {
            let state = self.state.lock().unwrap();
            Ok(state.zone.iter().filter(|((n, _), _)| n == name).map(|((_, t), s)| (*t, s.clone())).collect())
        }

        async fn get_set(&mut self, name: &Name, rtype: RecordType) -> Result<RRset, AdapterError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .zone
                .get(&(name.clone(), rtype))
                .cloned()
                .unwrap_or_else(|| RRset::new(name.clone(), DNSClass::IN, rtype, 0, Vec::new())))
        }

        async fn add_set(&mut self, rrset: &RRset) -> Result<(), AdapterError> {
            let mut state = self.state.lock().unwrap();
            state.zone.insert((rrset.name.clone(), rrset.rtype), rrset.clone());
            state.calls.push(Call::AddSet(rrset.clone()));
            Ok(())
        }

        async fn change_set(&mut self, rrset: &RRset) -> Result<(), AdapterError> {
            let mut state = self.state.lock().unwrap();
            state.zone.insert((rrset.name.clone(), rrset.rtype), rrset.clone());
            state.calls.push(Call::ChangeSet(rrset.clone()));
            Ok(())
        }

        async fn delete_set(&mut self, name: &Name, rtype: RecordType) -> Result<(), AdapterError> {
            let mut state = self.state.lock().unwrap();
            state.zone.remove(&(name.clone(), rtype));
            state.calls.push(Call::DeleteSet(name.clone(), rtype));
            Ok(())
        }

        async fn commit(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn rollback(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    fn name(s: &str) -> Name {
        Name::from_str(s).unwrap()
    }

    fn a_rr(owner: &str, ttl: u32, addr: Ipv4Addr) -> UpdateRR {
        UpdateRR { name: name(owner), class: DNSClass::IN, rtype: RecordType::A, ttl, rdata: Some(RData::A(A(addr))) }
    }

    // Scenario 1 (spec §8): add a new A record with no existing data at
    // that owner results in exactly one `AddSet` with a single member.
    #[tokio::test]
    async fn add_new_a_record_calls_add_set() {
        let mock = MockTransaction::default();
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let rr = a_rr("host.example.test.", 300, Ipv4Addr::new(192, 0, 2, 10));

        do_add_to_rrset(&name("example.test."), &rr, tx.as_mut()).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![Call::AddSet(RRset::new(name("host.example.test."), DNSClass::IN, RecordType::A, 300, vec![RData::A(A(Ipv4Addr::new(192, 0, 2, 10)))]))]
        );
    }

    // Scenario 2: replacing an existing rdata-equal A record calls
    // `ChangeSet` with the new TTL, not `AddSet`.
    #[tokio::test]
    async fn replace_rdata_equal_a_record_calls_change_set() {
        let existing = RRset::new(name("host.example.test."), DNSClass::IN, RecordType::A, 60, vec![RData::A(A(Ipv4Addr::new(192, 0, 2, 10)))]);
        let mock = MockTransaction::with_rrset(existing);
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let rr = a_rr("host.example.test.", 300, Ipv4Addr::new(192, 0, 2, 10));

        do_add_to_rrset(&name("example.test."), &rr, tx.as_mut()).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            Call::ChangeSet(set) => {
                assert_eq!(set.ttl, 300);
                assert_eq!(set.members, vec![RData::A(A(Ipv4Addr::new(192, 0, 2, 10)))]);
            }
            other => panic!("expected ChangeSet, got {other:?}"),
        }
    }

    // Scenario 3: adding a CNAME atop an existing non-CNAME RRset is a
    // silent no-op (RFC-sanctioned skip).
    #[tokio::test]
    async fn cname_atop_existing_a_is_noop() {
        let existing = RRset::new(name("www.example.test."), DNSClass::IN, RecordType::A, 300, vec![RData::A(A(Ipv4Addr::new(192, 0, 2, 1)))]);
        let mock = MockTransaction::with_rrset(existing);
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let rr = UpdateRR {
            name: name("www.example.test."),
            class: DNSClass::IN,
            rtype: RecordType::CNAME,
            ttl: 300,
            rdata: Some(RData::CNAME(hickory_proto::rr::rdata::CNAME(name("target.example.test.")))),
        };

        do_add_to_rrset(&name("example.test."), &rr, tx.as_mut()).await.unwrap();

        assert!(mock.calls().is_empty());
    }

    // Boundary case: adding a non-CNAME when a CNAME already exists at
    // that owner is also a no-op.
    #[tokio::test]
    async fn non_cname_atop_existing_cname_is_noop() {
        let existing = RRset::new(
            name("alias.example.test."),
            DNSClass::IN,
            RecordType::CNAME,
            300,
            vec![RData::CNAME(hickory_proto::rr::rdata::CNAME(name("target.example.test.")))],
        );
        let mock = MockTransaction::with_rrset(existing);
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let rr = a_rr("alias.example.test.", 300, Ipv4Addr::new(192, 0, 2, 2));

        do_add_to_rrset(&name("example.test."), &rr, tx.as_mut()).await.unwrap();

        assert!(mock.calls().is_empty());
    }

    // Scenario 4: class=ANY type=ANY delete on a non-apex name deletes
    // every type present there.
    #[tokio::test]
    async fn delete_all_types_for_non_apex_name() {
        let mock = MockTransaction::default();
        {
            let mut state = mock.state.lock().unwrap();
            state.zone.insert(
                (name("host.example.test."), RecordType::A),
                RRset::new(name("host.example.test."), DNSClass::IN, RecordType::A, 300, vec![RData::A(A(Ipv4Addr::new(192, 0, 2, 1)))]),
            );
            state.zone.insert(
                (name("host.example.test."), RecordType::TXT),
                RRset::new(name("host.example.test."), DNSClass::IN, RecordType::TXT, 300, vec![RData::TXT(TXT::new(vec!["hi".to_string()]))]),
            );
        }
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let rr = UpdateRR { name: name("host.example.test."), class: DNSClass::ANY, rtype: RecordType::ANY, ttl: 0, rdata: None };

        do_delete_rrset(&name("example.test."), &rr, tx.as_mut()).await.unwrap();

        let deleted: Vec<RecordType> = mock
            .calls()
            .into_iter()
            .map(|c| match c {
                Call::DeleteSet(_, t) => t,
                other => panic!("expected DeleteSet, got {other:?}"),
            })
            .collect();
        assert_eq!(deleted.len(), 2);
        assert!(deleted.contains(&RecordType::A));
        assert!(deleted.contains(&RecordType::TXT));
    }

    // Scenario 5 / apex guard: class=ANY type=ANY delete on the zone
    // apex leaves SOA and NS intact.
    #[tokio::test]
    async fn apex_guard_preserves_soa_and_ns() {
        let apex = name("example.test.");
        let mock = MockTransaction::default();
        {
            let mut state = mock.state.lock().unwrap();
            state.zone.insert(
                (apex.clone(), RecordType::SOA),
                RRset::new(apex.clone(), DNSClass::IN, RecordType::SOA, 3600, vec![RData::SOA(SOA::new(name("ns1.example.test."), name("hostmaster.example.test."), 1, 3600, 900, 1209600, 300))]),
            );
            state.zone.insert(
                (apex.clone(), RecordType::NS),
                RRset::new(apex.clone(), DNSClass::IN, RecordType::NS, 3600, vec![RData::NS(NS(name("ns1.example.test.")))]),
            );
            state.zone.insert(
                (apex.clone(), RecordType::TXT),
                RRset::new(apex.clone(), DNSClass::IN, RecordType::TXT, 300, vec![RData::TXT(TXT::new(vec!["hi".to_string()]))]),
            );
        }
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let rr = UpdateRR { name: apex.clone(), class: DNSClass::ANY, rtype: RecordType::ANY, ttl: 0, rdata: None };

        do_delete_rrset(&apex, &rr, tx.as_mut()).await.unwrap();

        let deleted: Vec<RecordType> = mock
            .calls()
            .into_iter()
            .map(|c| match c {
                Call::DeleteSet(_, t) => t,
                other => panic!("expected DeleteSet, got {other:?}"),
            })
            .collect();
        assert_eq!(deleted, vec![RecordType::TXT]);
        assert!(mock.state.lock().unwrap().zone.contains_key(&(apex.clone(), RecordType::SOA)));
        assert!(mock.state.lock().unwrap().zone.contains_key(&(apex, RecordType::NS)));
    }

    // Boundary case: deleting the last remaining apex NS via class=NONE
    // is a no-op (at least one NS must survive).
    #[tokio::test]
    async fn delete_last_ns_at_apex_is_noop() {
        let apex = name("example.test.");
        let ns_rr = RData::NS(NS(name("ns1.example.test.")));
        let mock = MockTransaction::with_rrset(RRset::new(apex.clone(), DNSClass::IN, RecordType::NS, 3600, vec![ns_rr.clone()]));
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let rr = UpdateRR { name: apex.clone(), class: DNSClass::NONE, rtype: RecordType::NS, ttl: 0, rdata: Some(ns_rr) };

        do_delete_from_rrset(&rr, tx.as_mut()).await.unwrap();

        assert!(mock.calls().is_empty());
        assert!(mock.state.lock().unwrap().zone.contains_key(&(apex, RecordType::NS)));
    }

    // Idempotence of delete-set (spec §8): deleting a set twice has the
    // same observable effect as deleting it once.
    #[tokio::test]
    async fn delete_set_is_idempotent() {
        let mock = MockTransaction::default();
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        tx.delete_set(&name("gone.example.test."), RecordType::A).await.unwrap();
        tx.delete_set(&name("gone.example.test."), RecordType::A).await.unwrap();
        assert_eq!(mock.calls().len(), 2);
        assert!(!mock.state.lock().unwrap().zone.contains_key(&(name("gone.example.test."), RecordType::A)));
    }

    // RFC 1982 SOA serial comparison (spec §9, open question resolved):
    // a lower or equal incoming serial is ignored.
    #[tokio::test]
    async fn soa_update_with_lower_serial_is_ignored() {
        let apex = name("example.test.");
        let existing_soa = RData::SOA(SOA::new(name("ns1.example.test."), name("hostmaster.example.test."), 100, 3600, 900, 1209600, 300));
        let mock = MockTransaction::with_rrset(RRset::new(apex.clone(), DNSClass::IN, RecordType::SOA, 3600, vec![existing_soa]));
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let lower_soa = RData::SOA(SOA::new(name("ns1.example.test."), name("hostmaster.example.test."), 50, 3600, 900, 1209600, 300));
        let rr = UpdateRR { name: apex, class: DNSClass::IN, rtype: RecordType::SOA, ttl: 3600, rdata: Some(lower_soa) };

        do_add_to_rrset(&name("example.test."), &rr, tx.as_mut()).await.unwrap();

        assert!(mock.calls().is_empty());
    }

    // A strictly greater incoming serial replaces the SOA set.
    #[tokio::test]
    async fn soa_update_with_higher_serial_replaces() {
        let apex = name("example.test.");
        let existing_soa = RData::SOA(SOA::new(name("ns1.example.test."), name("hostmaster.example.test."), 100, 3600, 900, 1209600, 300));
        let mock = MockTransaction::with_rrset(RRset::new(apex.clone(), DNSClass::IN, RecordType::SOA, 3600, vec![existing_soa]));
        let mut tx: Box<dyn AdapterTransaction> = Box::new(mock.clone());
        let higher_soa = RData::SOA(SOA::new(name("ns1.example.test."), name("hostmaster.example.test."), 200, 3600, 900, 1209600, 300));
        let rr = UpdateRR { name: apex, class: DNSClass::IN, rtype: RecordType::SOA, ttl: 3600, rdata: Some(higher_soa) };

        do_add_to_rrset(&name("example.test."), &rr, tx.as_mut()).await.unwrap();

        assert_eq!(mock.calls().len(), 1);
        assert!(matches!(&mock.calls()[0], Call::ChangeSet(_)));
    }
}
