//! Duplicate & Repeat Detector
//!
//! Single pass over candidates in ledger order with per-participant state:
//! the set of content keys already seen and the number of accepted entries.
//!
//! For each candidate:
//! 1. content key already seen for this participant → `DuplicateContent`
//! 2. participant already has an accepted entry → `AlreadyEntered { ordinal }`
//! 3. otherwise → `Valid`, accepted count becomes 1
//!
//! Rule 1 always wins over rule 2.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use tracing::warn;

use crate::entry::{Candidate, Validity};
use crate::error::RaffleError;
use crate::types::PostRecord;

/// What makes two posts by the same participant "the same content"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKey {
    /// Message digest only
    #[default]
    Content,
    /// Message digest and title digest must both match
    ContentAndTitle,
}

impl DuplicateKey {
    fn key_of(&self, post: &PostRecord) -> Vec<u8> {
        match self {
            DuplicateKey::Content => post.message_digest.clone(),
            DuplicateKey::ContentAndTitle => {
                let capacity = 4 + post.message_digest.len() + post.title_digest.len();
                let mut key = Vec::with_capacity(capacity);
                key.extend_from_slice(&(post.message_digest.len() as u32).to_be_bytes());
                key.extend_from_slice(&post.message_digest);
                key.extend_from_slice(&post.title_digest);
                key
            }
        }
    }
}

impl FromStr for DuplicateKey {
    type Err = RaffleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "content" => Ok(DuplicateKey::Content),
            "content-and-title" => Ok(DuplicateKey::ContentAndTitle),
            _ => Err(RaffleError::Configuration(format!(
                "unknown duplicate key {s:?}, use: content, content-and-title"
            ))),
        }
    }
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateKey::Content => f.write_str("content"),
            DuplicateKey::ContentAndTitle => f.write_str("content-and-title"),
        }
    }
}

/// Per-participant detector state for one run
#[derive(Debug, Default)]
pub struct DetectorState {
    policy: DuplicateKey,
    seen: HashMap<u64, HashSet<Vec<u8>>>,
    accepted: HashMap<u64, u32>,
}

impl DetectorState {
    pub fn new(policy: DuplicateKey) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    /// Judge the next post. Posts must arrive in ledger order.
    pub fn judge(&mut self, post: &PostRecord) -> Validity {
        let key = self.policy.key_of(post);
        let seen = self.seen.entry(post.user_id).or_default();
        if !seen.insert(key) {
            return Validity::DuplicateContent;
        }
        let ordinal = seen.len() as u32;

        let accepted = self.accepted.entry(post.user_id).or_insert(0);
        if *accepted >= 1 {
            return Validity::AlreadyEntered { ordinal };
        }
        *accepted = 1;
        Validity::Valid
    }

    pub fn accepted_count(&self, user_id: u64) -> u32 {
        self.accepted.get(&user_id).copied().unwrap_or(0)
    }

    /// Distinct content keys seen for a participant
    pub fn distinct_posts(&self, user_id: u64) -> usize {
        self.seen.get(&user_id).map_or(0, HashSet::len)
    }
}

/// Fold the detector over all candidates
pub fn detect(candidates: Vec<Candidate<'_>>, policy: DuplicateKey) -> Vec<Candidate<'_>> {
    candidates
        .into_iter()
        .scan(DetectorState::new(policy), |state, mut candidate| {
            candidate.validity = state.judge(candidate.post);
            if !candidate.validity.is_valid() {
                warn!(
                    "entry #{} by user {} invalid: {:?}",
                    candidate.post.sequence, candidate.post.user_id, candidate.validity
                );
            }
            Some(candidate)
        })
        .collect()
}
