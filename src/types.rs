use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};

use crate::error::{RaffleError, RaffleResult};

pub type Hash = [u8; 32];

/// All-zero key: an entry block with this `prevkeymr` is the first of its chain
pub const ZERO_HASH: Hash = [0u8; 32];

/// Participant id of the record that defines the chain (not a submission)
pub const CHAIN_DEFINITION_USER_ID: u64 = 0;

/// Factom chain identifier (32 bytes, hex on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainId(pub Hash);

impl ChainId {
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ChainId {
    type Err = RaffleError;

    fn from_str(s: &str) -> RaffleResult<Self> {
        parse_hash(s.trim())
            .map(ChainId)
            .map_err(|reason| RaffleError::Configuration(format!("chain id {s:?}: {reason}")))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Decode a 64-char hex string into a 32-byte hash
pub fn parse_hash(s: &str) -> Result<Hash, String> {
    let bytes = hex::decode(s).map_err(|e| e.to_string())?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| format!("expected 32 bytes, got {}", bytes.len()))
}

/// One entry as the ledger holds it. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    /// Content-addressed identity assigned by the ledger (Factom entry hash)
    pub identity: Hash,
    /// Position in chain write order, 0 = oldest
    pub sequence: u64,
    /// Raw entry content
    pub payload: Vec<u8>,
}

/// A forum post decoded from one ledger record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub user_id: u64,
    /// Digest of the message body (SHA-512 on the forum side)
    pub message_digest: Vec<u8>,
    /// Digest of the thread title
    pub title_digest: Vec<u8>,
    /// Post time, seconds since epoch (UTC)
    pub post_date: i64,
    /// Time the post was written to the chain
    pub entry_date: i64,
    pub thread_id: u64,
    pub node_id: u64,
    pub edit_count: u32,
    pub post_link: String,
    /// Identity of the originating ledger record
    pub entry_hash: Hash,
    /// Sequence position of the originating ledger record
    pub sequence: u64,
}

impl PostRecord {
    pub fn is_chain_definition(&self) -> bool {
        self.user_id == CHAIN_DEFINITION_USER_ID
    }
}

pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Format epoch seconds for reports; out-of-range values print raw
pub fn format_timestamp(secs: i64) -> String {
    match Utc.timestamp_opt(secs, 0).single() {
        Some(t) => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => secs.to_string(),
    }
}
