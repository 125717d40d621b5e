//! RFC 2136 update-section processing: authorization, prerequisites,
//! and the §3.4.2 update algorithm (spec §4.5–§4.8).

pub mod authorization;
pub mod prerequisites;
pub mod task;

use hickory_proto::op::ResponseCode;
use std::fmt;

pub use authorization::Authorization;
pub use prerequisites::{Prerequisite, PrerequisiteKind};
pub use task::Task;

/// A domain error carrying the RCODE the request handler should reply
/// with (spec §7: "the update task returns a domain error carrying the
/// intended rcode").
#[derive(Debug)]
pub struct UpdateError {
    pub rcode: ResponseCode,
    pub message: String,
}

impl UpdateError {
    #[must_use]
    pub fn new(rcode: ResponseCode, message: impl Into<String>) -> Self {
        UpdateError { rcode, message: message.into() }
    }

    #[must_use]
    pub fn servfail(message: impl Into<String>) -> Self {
        UpdateError::new(ResponseCode::ServFail, message)
    }
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.rcode)
    }
}

impl std::error::Error for UpdateError {}

impl From<crate::adapters::AdapterError> for UpdateError {
    fn from(e: crate::adapters::AdapterError) -> Self {
        // Adapter errors that reach here are, by construction,
        // unclassified backend failures: they collapse to SERVFAIL
        // (spec §4.4, §7), including `UnsupportedType`, which is a
        // refusal of the record rather than a protocol-level rejection.
        UpdateError::servfail(e.to_string())
    }
}
