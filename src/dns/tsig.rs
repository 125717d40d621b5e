//! TSIG keyring and signature provider (spec §4.1).
//!
//! Grounded in `pkg/dns/tsig/{keyring,hmac,provider}.go`. The MAC is
//! `HMAC(key, msg_bytes)` over exactly the bytes the caller supplies —
//! no RFC 8945 §4.3.3 TSIG-variable inclusion beyond that, mirroring
//! `provider.go`'s `generate()` (`tsigHmac.Sum(msg, key)`) verbatim.
//! The `hmac`/`sha2` pairing itself is the same crate pairing this
//! codebase already used for its own (client-side) TSIG signing; only
//! the MAC input and the algorithm set (adding SHA1) change.

use std::collections::HashMap;
use std::fmt;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    HmacSha1,
    HmacSha224,
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

#[derive(Debug)]
pub struct UnknownAlgorithm(pub String);

impl fmt::Display for UnknownAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unsupported tsig algorithm: {}", self.0)
    }
}

impl std::error::Error for UnknownAlgorithm {}

impl Algorithm {
    /// Canonical dotted algorithm name as carried on the wire and in
    /// configuration (spec §6: "canonical dotted names, e.g.
    /// `hmac-sha256.`"). Comparison lower-cases and strips a trailing
    /// dot first, matching canonicalization elsewhere (spec §9).
    pub fn from_name(name: &str) -> Result<Algorithm, UnknownAlgorithm> {
        let canon = name.trim_end_matches('.').to_ascii_lowercase();
        match canon.as_str() {
            "hmac-sha1" => Ok(Algorithm::HmacSha1),
            "hmac-sha224" => Ok(Algorithm::HmacSha224),
            "hmac-sha256" => Ok(Algorithm::HmacSha256),
            "hmac-sha384" => Ok(Algorithm::HmacSha384),
            "hmac-sha512" => Ok(Algorithm::HmacSha512),
            _ => Err(UnknownAlgorithm(name.to_string())),
        }
    }

    #[must_use]
    pub fn canonical_name(self) -> &'static str {
        match self {
            Algorithm::HmacSha1 => "hmac-sha1.",
            Algorithm::HmacSha224 => "hmac-sha224.",
            Algorithm::HmacSha256 => "hmac-sha256.",
            Algorithm::HmacSha384 => "hmac-sha384.",
            Algorithm::HmacSha512 => "hmac-sha512.",
        }
    }

    fn sum(self, key: &[u8], msg: &[u8]) -> Result<Vec<u8>, hmac::digest::InvalidLength> {
        Ok(match self {
            Algorithm::HmacSha1 => {
                let mut mac = Hmac::<Sha1>::new_from_slice(key)?;
                mac.update(msg);
                mac.finalize().into_bytes().to_vec()
            }
            Algorithm::HmacSha224 => {
                let mut mac = Hmac::<Sha224>::new_from_slice(key)?;
                mac.update(msg);
                mac.finalize().into_bytes().to_vec()
            }
            Algorithm::HmacSha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(key)?;
                mac.update(msg);
                mac.finalize().into_bytes().to_vec()
            }
            Algorithm::HmacSha384 => {
                let mut mac = Hmac::<Sha384>::new_from_slice(key)?;
                mac.update(msg);
                mac.finalize().into_bytes().to_vec()
            }
            Algorithm::HmacSha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(key)?;
                mac.update(msg);
                mac.finalize().into_bytes().to_vec()
            }
        })
    }
}

/// A named opaque symmetric secret (spec §3).
#[derive(Debug, Clone)]
pub struct Key {
    name: String,
    algorithm: Algorithm,
    secret: Vec<u8>,
}

impl Key {
    #[must_use]
    pub fn new(name: String, algorithm: Algorithm, secret: Vec<u8>) -> Self {
        Key { name, algorithm, secret }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

#[derive(Debug)]
pub struct DuplicateKey(pub String);

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "duplicate tsig key name: {}", self.0)
    }
}

impl std::error::Error for DuplicateKey {}

/// Process-lifetime name → secret mapping (spec §3). Populated once at
/// startup, read-only afterward.
#[derive(Debug, Default)]
pub struct Keyring {
    keys: HashMap<String, Key>,
}

impl Keyring {
    #[must_use]
    pub fn new() -> Self {
        Keyring { keys: HashMap::new() }
    }

    pub fn add(&mut self, key: Key) -> Result<(), DuplicateKey> {
        if self.keys.contains_key(&key.name) {
            return Err(DuplicateKey(key.name));
        }
        self.keys.insert(key.name.clone(), key);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Key> {
        self.keys.get(name)
    }
}

#[derive(Debug)]
pub enum TsigError {
    UnknownKey(String),
    UnsupportedAlgorithm(String),
    SignatureMismatch,
    InvalidMacEncoding(hex::FromHexError),
    InvalidKeyLength(hmac::digest::InvalidLength),
}

impl fmt::Display for TsigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TsigError::UnknownKey(name) => write!(f, "unknown tsig key: {name}"),
            TsigError::UnsupportedAlgorithm(alg) => write!(f, "unsupported tsig algorithm: {alg}"),
            TsigError::SignatureMismatch => write!(f, "tsig signature mismatch"),
            TsigError::InvalidMacEncoding(e) => write!(f, "invalid tsig mac encoding: {e}"),
            TsigError::InvalidKeyLength(e) => write!(f, "invalid tsig key length: {e}"),
        }
    }
}

impl std::error::Error for TsigError {}

/// Computes `HMAC(key, msg_bytes)` for `key_name`, returning the raw
/// MAC bytes. Fails with `UnknownKey` if the name is not in the
/// keyring, or `UnsupportedAlgorithm` if the record's algorithm name
/// doesn't match one of the five supported algorithms.
pub fn generate(keyring: &Keyring, key_name: &str, algorithm_name: &str, msg_bytes: &[u8]) -> Result<Vec<u8>, TsigError> {
    let key = keyring.get(key_name).ok_or_else(|| TsigError::UnknownKey(key_name.to_string()))?;
    let algorithm = Algorithm::from_name(algorithm_name).map_err(|e| TsigError::UnsupportedAlgorithm(e.0))?;
    algorithm.sum(&key.secret, msg_bytes).map_err(TsigError::InvalidKeyLength)
}

/// Recomputes the expected MAC and compares it in constant time
/// against `mac_hex`, a hex-encoded MAC as carried in the TSIG
/// record's MAC field (spec §6).
pub fn verify(keyring: &Keyring, key_name: &str, algorithm_name: &str, msg_bytes: &[u8], mac_hex: &str) -> Result<(), TsigError> {
    let expected = generate(keyring, key_name, algorithm_name, msg_bytes)?;
    let received = hex::decode(mac_hex).map_err(TsigError::InvalidMacEncoding)?;
    if expected.len() != received.len() || expected.ct_eq(&received).unwrap_u8() != 1 {
        return Err(TsigError::SignatureMismatch);
    }
    Ok(())
}
