//! Per-request authorization decision (spec §3, §4.5).
//!
//! Grounded in `pkg/dns/update/authorization.go`. The source's
//! `VerifiedIssuer()` panics if the verified latch is read without
//! having been set, and `markVerified` (called from the handler) has
//! no guard against being invoked twice; this crate replaces both
//! panics with typed errors; a second call is a handler bug rather
//! than a DNS-input-driven condition, but an error can't reach here
//! through attacker input and costs nothing to make explicit.

use std::fmt;

use crate::dns::Zone;

#[derive(Debug)]
pub struct AlreadyVerified;

impl fmt::Display for AlreadyVerified {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "authorization was already marked verified")
    }
}

impl std::error::Error for AlreadyVerified {}

#[derive(Debug)]
pub enum AuthorizationError {
    UnauthorizedKey,
    ForbiddenAlgorithm,
    AuthenticationRequired,
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthorizationError::UnauthorizedKey => write!(f, "tsig key not authorized for this zone"),
            AuthorizationError::ForbiddenAlgorithm => write!(f, "tsig algorithm not permitted for this zone"),
            AuthorizationError::AuthenticationRequired => write!(f, "zone requires authentication but none was presented"),
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Transient per-request authorization state (spec §3).
pub struct Authorization {
    zone: Zone,
    verified_key: Option<(String, String)>,
    verified: bool,
}

impl Authorization {
    #[must_use]
    pub fn new(zone: Zone) -> Self {
        Authorization { zone, verified_key: None, verified: false }
    }

    #[must_use]
    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    /// May be called at most once per request (spec §3 invariant).
    pub fn mark_verified(&mut self, key_name: String, algorithm: String) -> Result<(), AlreadyVerified> {
        if self.verified {
            return Err(AlreadyVerified);
        }
        self.verified_key = Some((key_name, algorithm));
        self.verified = true;
        Ok(())
    }

    pub fn evaluate(&self) -> Result<(), AuthorizationError> {
        if self.verified {
            let (key_name, algorithm) = self.verified_key.as_ref().expect("verified implies verified_key is set");
            if !self.zone.key_is_authorized(key_name) {
                return Err(AuthorizationError::UnauthorizedKey);
            }
            if !self.zone.algorithm_is_permitted(algorithm) {
                return Err(AuthorizationError::ForbiddenAlgorithm);
            }
            Ok(())
        } else if self.zone.authentication_disabled() {
            Ok(())
        } else {
            Err(AuthorizationError::AuthenticationRequired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secured_zone() -> Zone {
        Zone::new("example.test.", "h1".to_string(), vec!["k1".to_string()], false).unwrap()
    }

    fn unsecure_zone() -> Zone {
        Zone::new("example.test.", "h1".to_string(), vec![], true).unwrap()
    }

    #[test]
    fn verified_authorized_key_passes() {
        let mut auth = Authorization::new(secured_zone());
        auth.mark_verified("k1".to_string(), "hmac-sha256.".to_string()).unwrap();
        assert!(auth.evaluate().is_ok());
    }

    #[test]
    fn verified_unauthorized_key_fails() {
        let mut auth = Authorization::new(secured_zone());
        auth.mark_verified("other".to_string(), "hmac-sha256.".to_string()).unwrap();
        assert!(matches!(auth.evaluate(), Err(AuthorizationError::UnauthorizedKey)));
    }

    #[test]
    fn unverified_secured_zone_requires_auth() {
        let auth = Authorization::new(secured_zone());
        assert!(matches!(auth.evaluate(), Err(AuthorizationError::AuthenticationRequired)));
    }

    #[test]
    fn unverified_unsecure_zone_passes() {
        let auth = Authorization::new(unsecure_zone());
        assert!(auth.evaluate().is_ok());
    }

    #[test]
    fn mark_verified_twice_errors() {
        let mut auth = Authorization::new(secured_zone());
        auth.mark_verified("k1".to_string(), "hmac-sha256.".to_string()).unwrap();
        assert!(auth.mark_verified("k1".to_string(), "hmac-sha256.".to_string()).is_err());
    }
}
