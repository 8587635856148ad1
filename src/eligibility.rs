//! Eligibility Filter
//!
//! The record that defines the chain carries the reserved participant id and
//! is dropped here without a trace: it never reaches the detector and never
//! appears in any output.

use tracing::debug;

use crate::entry::Candidate;
use crate::types::PostRecord;

/// Admit a post as a candidate, or drop it silently
pub fn admit(post: &PostRecord) -> Option<Candidate<'_>> {
    if post.is_chain_definition() {
        debug!("dropping chain definition record #{}", post.sequence);
        return None;
    }
    Some(Candidate::new(post))
}

/// Admit every eligible post, keeping ledger order
pub fn filter(posts: &[PostRecord]) -> Vec<Candidate<'_>> {
    posts.iter().filter_map(admit).collect()
}
