//! DNS data model: resource records, RRsets, zones, and TSIG.
//!
//! Wire types (`Name`, `RData`, `Record`, `RecordType`, `DNSClass`) are
//! reused directly from `hickory-proto` rather than hand-rolled, per
//! spec §2 ("wire codec: external dependency"). Everything in this
//! module is the typed layer built on top of that codec.

pub mod rr;
pub mod tsig;
pub mod tsig_wire;
pub mod zone;

pub use rr::{rdata_equal, RRset};
pub use zone::{Zone, ZoneRegistry};
