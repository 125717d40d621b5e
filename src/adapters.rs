//! Backend adapter capability boundary and registry (spec §4.3, §4.4).
//!
//! Grounded in `pkg/adapters/common/interface.go`'s `IAdapter` /
//! `IAdapterTransaction` Go interfaces, and `pkg/adapters/registry.go`'s
//! reflection-based slug registry — re-architected per the REDESIGN
//! FLAG in spec §9 as a compile-time trait pair plus a small runtime
//! slug→factory map, rather than reflection over registered types.

pub mod powerdns;
pub mod registry;

use async_trait::async_trait;
use std::collections::HashMap;

use hickory_proto::rr::{Name, RecordType};
use thiserror::Error;

use crate::dns::RRset;

/// Per-adapter error taxonomy (spec §7): everything here collapses to
/// `SERVFAIL` at the update-task boundary (`UpdateError`'s `From` impl),
/// including `UnsupportedType`, which spec §4.4 treats as a refusal of
/// the record rather than a protocol-level rejection.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("backend transport error: {0}")]
    Http(String),
    #[error("backend api error: {0}")]
    Api(String),
    #[error("unsupported record type: {0}")]
    UnsupportedType(RecordType),
    #[error("rdata encoding error: {0}")]
    Rdata(String),
    #[error("{0} not implemented by this backend")]
    NotImplemented(&'static str),
}

/// A scoped handle to one zone's record sets, owned by exactly one
/// update task (spec §3). Implementations must canonicalize names and
/// refuse types they cannot represent with `UnsupportedType`.
#[async_trait]
pub trait AdapterTransaction: Send {
    async fn get_all(&mut self, name: &Name) -> Result<HashMap<RecordType, RRset>, AdapterError>;
    async fn get_set(&mut self, name: &Name, rtype: RecordType) -> Result<RRset, AdapterError>;
    async fn add_set(&mut self, rrset: &RRset) -> Result<(), AdapterError>;
    async fn change_set(&mut self, rrset: &RRset) -> Result<(), AdapterError>;
    async fn delete_set(&mut self, name: &Name, rtype: RecordType) -> Result<(), AdapterError>;
    async fn commit(&mut self) -> Result<(), AdapterError>;
    async fn rollback(&mut self) -> Result<(), AdapterError>;
}

/// A configured backend instance (spec §4.3): `name()` for logging and
/// `new_transaction` to scope work to one zone.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;
    async fn new_transaction(&self, zone_fqdn: &Name) -> Result<Box<dyn AdapterTransaction>, AdapterError>;
}
