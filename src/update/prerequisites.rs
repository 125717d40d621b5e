//! Prerequisite accumulator and evaluator (RFC 2136 §3.2, spec §4.6).
//!
//! Grounded in `pkg/dns/update/prerequisites.go` — whose `Evaluate()`
//! is, in the source, a literal stub (`return nil`, with a `FIXME`
//! comment). This crate implements the evaluation the source never
//! finished, following the rules spec §4.6 spells out directly rather
//! than translating an unimplemented function.

use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{Name, RData, RecordType};

use crate::adapters::AdapterTransaction;
use crate::dns::rr::rdata_equal;
use crate::dns::RRset;
use crate::update::UpdateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrerequisiteKind {
    NameExists,
    NameAbsent,
    NameTypeExists,
    NameTypeAbsent,
    RrsetEquality,
}

#[derive(Debug, Clone)]
pub struct Prerequisite {
    pub kind: PrerequisiteKind,
    pub name: Name,
    /// Set for `NameTypeExists`/`NameTypeAbsent`; ignored otherwise.
    pub rtype: Option<RecordType>,
    /// Set for `RrsetEquality`: the full accumulated reference set for
    /// one (name, type) group, each as `(name, type, rdata)`.
    pub rrset_members: Vec<(Name, RecordType, RData)>,
    pub fail_rcode: ResponseCode,
}

impl Prerequisite {
    #[must_use]
    pub fn name_exists(name: Name) -> Self {
        Prerequisite { kind: PrerequisiteKind::NameExists, name, rtype: None, rrset_members: Vec::new(), fail_rcode: ResponseCode::NXDomain }
    }

    #[must_use]
    pub fn name_absent(name: Name) -> Self {
        Prerequisite { kind: PrerequisiteKind::NameAbsent, name, rtype: None, rrset_members: Vec::new(), fail_rcode: ResponseCode::YXDomain }
    }

    #[must_use]
    pub fn name_type_exists(name: Name, rtype: RecordType) -> Self {
        Prerequisite {
            kind: PrerequisiteKind::NameTypeExists,
            name,
            rtype: Some(rtype),
            rrset_members: Vec::new(),
            fail_rcode: ResponseCode::NXRRSet,
        }
    }

    #[must_use]
    pub fn name_type_absent(name: Name, rtype: RecordType) -> Self {
        Prerequisite {
            kind: PrerequisiteKind::NameTypeAbsent,
            name,
            rtype: Some(rtype),
            rrset_members: Vec::new(),
            fail_rcode: ResponseCode::YXRRSet,
        }
    }

    #[must_use]
    pub fn rrset_equality(members: Vec<(Name, RecordType, RData)>) -> Self {
        // `name`/`rtype` are unused by evaluation for this kind; a
        // placeholder keeps the struct shape uniform. The real grouping
        // key lives inside `rrset_members`.
        let name = members.first().map_or_else(|| Name::root(), |(n, _, _)| n.clone());
        Prerequisite {
            kind: PrerequisiteKind::RrsetEquality,
            name,
            rtype: None,
            rrset_members: members,
            fail_rcode: ResponseCode::NXRRSet,
        }
    }
}

fn rrset_set_equal(existing: &RRset, expected: &[(Name, RecordType, RData)]) -> bool {
    if existing.len() != expected.len() {
        return false;
    }
    expected.iter().all(|(ename, etype, erdata)| {
        existing.members.iter().any(|m| rdata_equal(ename, *etype, erdata, &existing.name, existing.rtype, m) && *etype == existing.rtype)
    })
}

/// Evaluates one accumulated prerequisite against an open transaction,
/// per the rules in spec §4.6.
pub async fn evaluate_one(prerequisite: &Prerequisite, transaction: &mut dyn AdapterTransaction) -> Result<(), UpdateError> {
    match prerequisite.kind {
        PrerequisiteKind::NameExists => {
            let all = transaction.get_all(&prerequisite.name).await?;
            if all.is_empty() {
                return Err(UpdateError::new(prerequisite.fail_rcode, format!("name does not exist: {}", prerequisite.name)));
            }
        }
        PrerequisiteKind::NameAbsent => {
            let all = transaction.get_all(&prerequisite.name).await?;
            if !all.is_empty() {
                return Err(UpdateError::new(prerequisite.fail_rcode, format!("name exists: {}", prerequisite.name)));
            }
        }
        PrerequisiteKind::NameTypeExists => {
            let rtype = prerequisite.rtype.expect("NameTypeExists always carries a type");
            let set = transaction.get_set(&prerequisite.name, rtype).await?;
            if set.is_empty() {
                return Err(UpdateError::new(prerequisite.fail_rcode, format!("no {rtype} rrset at {}", prerequisite.name)));
            }
        }
        PrerequisiteKind::NameTypeAbsent => {
            let rtype = prerequisite.rtype.expect("NameTypeAbsent always carries a type");
            let set = transaction.get_set(&prerequisite.name, rtype).await?;
            if !set.is_empty() {
                return Err(UpdateError::new(prerequisite.fail_rcode, format!("{rtype} rrset exists at {}", prerequisite.name)));
            }
        }
        PrerequisiteKind::RrsetEquality => {
            if prerequisite.rrset_members.is_empty() {
                return Ok(());
            }
            // Group the accumulated members by (name, type) and require
            // each group to be set-equal to the zone's current RRset.
            let mut groups: Vec<(Name, RecordType, Vec<(Name, RecordType, RData)>)> = Vec::new();
            for (name, rtype, rdata) in &prerequisite.rrset_members {
                if let Some(group) = groups.iter_mut().find(|(n, t, _)| n == name && t == rtype) {
                    group.2.push((name.clone(), *rtype, rdata.clone()));
                } else {
                    groups.push((name.clone(), *rtype, vec![(name.clone(), *rtype, rdata.clone())]));
                }
            }
            for (name, rtype, expected) in groups {
                let existing = transaction.get_set(&name, rtype).await?;
                if !rrset_set_equal(&existing, &expected) {
                    return Err(UpdateError::new(prerequisite.fail_rcode, format!("rrset mismatch for {rtype} at {name}")));
                }
            }
        }
    }
    Ok(())
}

pub async fn evaluate_all(prerequisites: &[Prerequisite], transaction: &mut dyn AdapterTransaction) -> Result<(), UpdateError> {
    for prerequisite in prerequisites {
        evaluate_one(prerequisite, transaction).await?;
    }
    Ok(())
}
