//! Resource record sets and the rdata-equality predicate.
//!
//! Grounded in `pkg/dns/update/utils.go`'s `EqualRdata`: the source
//! packs both records through `miekg/dns`'s RFC 3597 "unknown RR"
//! representation and compares the opaque rdata bytes, sidestepping a
//! per-type comparison function. The same trick works with
//! `hickory-proto`: encode each `RData` with a canonical-name encoder
//! and compare the resulting byte strings.

use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinEncodable, BinEncoder};

/// A non-empty ordered sequence of RRs sharing name, class, and type
/// (spec §3). TTL lives on the set, not per-member, since within one
/// RRset all members share it on the wire; callers that need the
/// `Vec<ResourceRecord>` view construct it from `members`.
#[derive(Debug, Clone, PartialEq)]
pub struct RRset {
    pub name: Name,
    pub class: DNSClass,
    pub rtype: RecordType,
    pub ttl: u32,
    pub members: Vec<RData>,
}

impl RRset {
    #[must_use]
    pub fn new(name: Name, class: DNSClass, rtype: RecordType, ttl: u32, members: Vec<RData>) -> Self {
        RRset { name, class, rtype, ttl, members }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }
}

/// Packs an `RData` into its canonical wire bytes, independent of
/// surrounding record framing (name/class/ttl). This is the "generic
/// representation" spec §4.8 calls the authoritative tie-breaker for
/// rdata equality.
fn pack_rdata(rdata: &RData) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut encoder = BinEncoder::new(&mut buf);
    encoder.set_canonical_names(true);
    // Encoding failures here would mean a malformed in-memory RData,
    // which cannot arise from data parsed off the wire or accepted by
    // the text-type adapter codecs; an empty encoding simply compares
    // unequal to any valid one.
    let _ = rdata.emit(&mut encoder);
    buf
}

/// True when `a` and `b` are the same resource record for RFC 2136
/// §3.4.2 purposes: same owner name, same type, identical rdata bytes.
/// TTL is deliberately excluded (spec §3, §4.8).
#[must_use]
pub fn rdata_equal(a_name: &Name, a_type: RecordType, a_rdata: &RData, b_name: &Name, b_type: RecordType, b_rdata: &RData) -> bool {
    a_name == b_name && a_type == b_type && pack_rdata(a_rdata) == pack_rdata(b_rdata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::A;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    #[test]
    fn rdata_equal_ignores_ttl_by_construction() {
        let name = Name::from_str("host.example.test.").unwrap();
        let a1 = RData::A(A(Ipv4Addr::new(192, 0, 2, 10)));
        let a2 = RData::A(A(Ipv4Addr::new(192, 0, 2, 10)));
        assert!(rdata_equal(&name, RecordType::A, &a1, &name, RecordType::A, &a2));
    }

    #[test]
    fn rdata_equal_detects_differing_rdata() {
        let name = Name::from_str("host.example.test.").unwrap();
        let a1 = RData::A(A(Ipv4Addr::new(192, 0, 2, 10)));
        let a2 = RData::A(A(Ipv4Addr::new(192, 0, 2, 11)));
        assert!(!rdata_equal(&name, RecordType::A, &a1, &name, RecordType::A, &a2));
    }
}
