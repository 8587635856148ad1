//! Raffle entry lifecycle
//!
//! ```text
//! Created ──► Valid | Invalid(reason) ──► Scored
//! ```
//!
//! [`Candidate`] is an admitted post awaiting judgement; [`RaffleEntry`] is
//! the terminal, scored form. Both borrow the parsed [`PostRecord`].

use crate::fairness::Salt;
use crate::types::{Hash, PostRecord};

/// Outcome of duplicate and repeat detection for one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Validity {
    /// The participant's first accepted entry
    Valid,
    /// Exact resubmission of content this participant already posted
    DuplicateContent,
    /// A further distinct post; `ordinal` is its position among the
    /// participant's distinct posts (2 = second post)
    AlreadyEntered { ordinal: u32 },
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

/// An eligible post, validity not yet final
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub post: &'a PostRecord,
    pub validity: Validity,
}

impl<'a> Candidate<'a> {
    pub fn new(post: &'a PostRecord) -> Self {
        Self {
            post,
            validity: Validity::Valid,
        }
    }
}

/// A judged and scored entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaffleEntry<'a> {
    pub post: &'a PostRecord,
    pub validity: Validity,
    /// SHA-256(entry_hash ‖ salt)
    pub score: Hash,
    pub salt: &'a Salt,
}

impl RaffleEntry<'_> {
    pub fn user_id(&self) -> u64 {
        self.post.user_id
    }

    pub fn sequence(&self) -> u64 {
        self.post.sequence
    }

    pub fn is_valid(&self) -> bool {
        self.validity.is_valid()
    }
}
