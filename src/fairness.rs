//! Fairness Hash Engine
//!
//! ```text
//! score = SHA-256(entry_hash ‖ salt)
//! ```
//!
//! Entry hashes are public the moment a post lands on the chain; the salt is
//! revealed only after entries close. Anyone holding both can recompute every
//! score. Invalid entries are scored too so their exclusion can be audited.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::entry::{Candidate, RaffleEntry};
use crate::error::{RaffleError, RaffleResult};
use crate::types::Hash;

/// Run-wide salt. Never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    pub fn new(bytes: Vec<u8>) -> RaffleResult<Self> {
        if bytes.is_empty() {
            return Err(RaffleError::Configuration("salt must not be empty".into()));
        }
        Ok(Self(bytes))
    }

    /// Decode operator input; surrounding whitespace and a `0x` prefix are accepted
    pub fn from_hex(s: &str) -> RaffleResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)
            .map_err(|e| RaffleError::Configuration(format!("salt must be hex: {e}")))?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", self.to_hex())
    }
}

/// Score one content identity under a salt
pub fn fairness_score(identity: &Hash, salt: &Salt) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(identity);
    hasher.update(salt.as_bytes());
    hasher.finalize().into()
}

/// Recompute a published score
pub fn verify_score(identity: &Hash, salt: &Salt, score: &Hash) -> bool {
    fairness_score(identity, salt) == *score
}

/// Score every candidate regardless of validity
pub fn score<'a>(candidates: Vec<Candidate<'a>>, salt: &'a Salt) -> Vec<RaffleEntry<'a>> {
    candidates
        .into_iter()
        .map(|c| RaffleEntry {
            post: c.post,
            validity: c.validity,
            score: fairness_score(&c.post.entry_hash, salt),
            salt,
        })
        .collect()
}
