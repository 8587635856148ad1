//! Result Assembler
//!
//! Runs the pipeline once over a fully resolved, ordered post list and hands
//! the ordered entries, with run metadata, to the reporting side:
//!
//! ```text
//! posts ─► eligibility::filter ─► detector::detect ─► fairness::score ─► RaffleRun
//! ```
//!
//! Entries keep ledger order. Ranking by score is left to whoever picks the
//! winner.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::detector::{self, DuplicateKey};
use crate::eligibility;
use crate::entry::RaffleEntry;
use crate::error::{RaffleError, RaffleResult};
use crate::fairness::{self, Salt};
use crate::types::{ChainId, PostRecord};

/// What an auditor needs besides the entries themselves
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub chain_id: ChainId,
    pub salt: Salt,
    pub run_at: DateTime<Utc>,
    pub duplicate_key: DuplicateKey,
}

/// Ordered, judged and scored entries of one run
#[derive(Debug)]
pub struct RaffleRun<'a> {
    pub meta: &'a RunMetadata,
    pub entries: Vec<RaffleEntry<'a>>,
}

/// A broken run invariant found by [`RaffleRun::audit`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditFinding {
    #[error("entry #{sequence}: score does not match SHA-256(entry_hash ‖ salt)")]
    ScoreMismatch { sequence: u64 },
    #[error("entry #{sequence}: scored with a salt other than the run's")]
    ForeignSalt { sequence: u64 },
    #[error("entry #{sequence}: chain definition record present in output")]
    ChainDefinition { sequence: u64 },
    #[error("entry #{sequence}: out of ledger order")]
    OutOfOrder { sequence: u64 },
    #[error("user {user_id}: first entry #{sequence} is not the accepted one")]
    FirstEntryRejected { user_id: u64, sequence: u64 },
    #[error("user {user_id}: {count} accepted entries")]
    MultipleAccepted { user_id: u64, count: usize },
}

/// Reject post lists that are not in strictly increasing ledger order
pub fn ensure_ledger_order(posts: &[PostRecord]) -> RaffleResult<()> {
    for pair in posts.windows(2) {
        if pair[1].sequence <= pair[0].sequence {
            return Err(RaffleError::Retrieval(format!(
                "records out of ledger order: #{} follows #{}",
                pair[1].sequence, pair[0].sequence
            )));
        }
    }
    Ok(())
}

/// Filter, judge and score posts. Posts must already be in ledger order.
pub fn run_pipeline<'a>(
    posts: &'a [PostRecord],
    salt: &'a Salt,
    duplicate_key: DuplicateKey,
) -> Vec<RaffleEntry<'a>> {
    let candidates = eligibility::filter(posts);
    let judged = detector::detect(candidates, duplicate_key);
    fairness::score(judged, salt)
}

impl<'a> RaffleRun<'a> {
    pub fn assemble(meta: &'a RunMetadata, posts: &'a [PostRecord]) -> RaffleResult<Self> {
        ensure_ledger_order(posts)?;
        let entries = run_pipeline(posts, &meta.salt, meta.duplicate_key);

        let run = Self { meta, entries };
        info!(
            "assembled {} entries from {} records ({} valid, {} invalid)",
            run.entries.len(),
            posts.len(),
            run.valid_count(),
            run.entries.len() - run.valid_count()
        );
        Ok(run)
    }

    pub fn valid_entries(&self) -> impl Iterator<Item = &RaffleEntry<'a>> {
        self.entries.iter().filter(|e| e.is_valid())
    }

    pub fn valid_count(&self) -> usize {
        self.valid_entries().count()
    }

    pub fn participant_count(&self) -> usize {
        let mut users: Vec<u64> = self.entries.iter().map(|e| e.user_id()).collect();
        users.sort_unstable();
        users.dedup();
        users.len()
    }

    /// Recheck every score and the ordering and acceptance rules.
    /// An empty result means the run is sound.
    pub fn audit(&self) -> Vec<AuditFinding> {
        let mut findings = Vec::new();
        let mut last_sequence: Option<u64> = None;
        let mut first_seen: HashMap<u64, &RaffleEntry<'a>> = HashMap::new();
        let mut accepted: HashMap<u64, usize> = HashMap::new();

        for entry in &self.entries {
            let sequence = entry.sequence();

            if entry.salt != &self.meta.salt {
                findings.push(AuditFinding::ForeignSalt { sequence });
            }
            if !fairness::verify_score(&entry.post.entry_hash, &self.meta.salt, &entry.score) {
                findings.push(AuditFinding::ScoreMismatch { sequence });
            }
            if entry.post.is_chain_definition() {
                findings.push(AuditFinding::ChainDefinition { sequence });
            }
            if last_sequence.is_some_and(|last| sequence <= last) {
                findings.push(AuditFinding::OutOfOrder { sequence });
            }
            last_sequence = Some(sequence);

            first_seen.entry(entry.user_id()).or_insert(entry);
            if entry.is_valid() {
                *accepted.entry(entry.user_id()).or_insert(0) += 1;
            }
        }

        for (user_id, first) in &first_seen {
            if !first.is_valid() {
                findings.push(AuditFinding::FirstEntryRejected {
                    user_id: *user_id,
                    sequence: first.sequence(),
                });
            }
        }
        for (user_id, count) in accepted {
            if count > 1 {
                findings.push(AuditFinding::MultipleAccepted { user_id, count });
            }
        }

        findings
    }
}
