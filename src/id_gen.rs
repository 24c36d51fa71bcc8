use crate::error::{AuPairError, Result};
use crate::markers::{PhraseId, RefWord};

/// Gap left between the last original id and the first synthetic one.
pub(crate) const SYNTHETIC_ID_MARGIN: u64 = 10;

/// Monotonic generator for merged-phrase ids.
///
/// Ids are never reused: a freed synthetic phrase keeps its id retired so
/// parse references can't alias. Every id must still fit in a parse
/// reference after the `+1` offset.
#[derive(Debug)]
pub(crate) struct SyntheticIdGen {
    next: u64,
    limit: u64,
}

impl SyntheticIdGen {
    /// Creates a generator for a dictionary with `original_count` phrases.
    pub(crate) fn new(original_count: usize) -> Self {
        Self::with_limit(
            original_count,
            (RefWord::MAX as u64).saturating_sub(SYNTHETIC_ID_MARGIN),
        )
    }

    pub(crate) fn with_limit(original_count: usize, limit: u64) -> Self {
        Self {
            next: original_count as u64 + SYNTHETIC_ID_MARGIN,
            limit,
        }
    }

    /// Gets a new id, or fails once the reference width is exhausted.
    pub(crate) fn get(&mut self) -> Result<PhraseId> {
        if self.next > self.limit {
            return Err(AuPairError::IdSpaceExhausted { next: self.next });
        }
        let id = self.next;
        self.next += 1;
        Ok(id)
    }

    /// Number of ids handed out so far.
    pub(crate) fn issued(&self, original_count: usize) -> u64 {
        self.next - original_count as u64 - SYNTHETIC_ID_MARGIN
    }
}
