//! Raffle error taxonomy
//!
//! Only conditions that abort a run live here. Per-entry outcomes such as a
//! duplicate post or a repeat entry are values of [`crate::entry::Validity`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RaffleError {
    /// Missing or malformed salt, chain id or host
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Ledger fetch failed
    #[error("ledger retrieval failed: {0}")]
    Retrieval(String),

    /// factomd answered with a JSON-RPC error object
    #[error("factomd rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Recomputed entry hash differs from the one the ledger listed
    #[error("entry #{sequence}: ledger lists {listed} but content hashes to {computed}")]
    IdentityMismatch {
        sequence: u64,
        listed: String,
        computed: String,
    },

    /// Record payload does not match the post schema
    #[error("entry #{sequence}: payload does not decode: {reason}")]
    Decode { sequence: u64, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RaffleError {
    /// Configuration failures are reported with usage guidance
    pub fn is_configuration(&self) -> bool {
        matches!(self, RaffleError::Configuration(_))
    }

    /// Failures raised while talking to the ledger
    pub fn is_retrieval(&self) -> bool {
        matches!(
            self,
            RaffleError::Retrieval(_)
                | RaffleError::Rpc { .. }
                | RaffleError::IdentityMismatch { .. }
        )
    }
}

impl From<reqwest::Error> for RaffleError {
    fn from(e: reqwest::Error) -> Self {
        RaffleError::Retrieval(e.to_string())
    }
}

pub type RaffleResult<T> = Result<T, RaffleError>;
