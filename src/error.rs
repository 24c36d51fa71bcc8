//! Error types for the dictionary-merging engine

use crate::markers::PhraseId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, compressing or writing a parse
#[derive(Debug, Error)]
pub enum AuPairError {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required input file does not exist
    #[error("Missing input file: {}", path.display())]
    MissingInput { path: PathBuf },

    /// The dictionary file is malformed
    #[error("Corrupt dictionary: {0}")]
    CorruptDictionary(String),

    /// The parse file is malformed or references unknown phrases
    #[error("Corrupt parse: {0}")]
    CorruptParse(String),

    /// Lookup of a phrase that was removed or never existed
    #[error("Phrase {0} not found in dictionary")]
    PhraseNotFound(PhraseId),

    /// No more merged-phrase ids fit in the reference width
    #[error("Synthetic id space exhausted at id {next}")]
    IdSpaceExhausted { next: u64 },

    /// A phrase occurs more often than a reference word can count
    #[error("Occurrence count of rank {rank} overflows the reference width")]
    OccurrenceOverflow { rank: u64 },

    /// Window length must be at least one byte
    #[error("Invalid window length: {0}")]
    InvalidWindow(usize),

    /// Operation called in the wrong lifecycle state
    #[error("Cannot {op} while engine is {state}")]
    InvalidState {
        op: &'static str,
        state: &'static str,
    },
}

impl AuPairError {
    /// Check if this error aborts the run.
    ///
    /// Every variant except a phrase lookup miss is fatal. Lookup misses
    /// at finalize time are skipped by the caller.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AuPairError::PhraseNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, AuPairError>;
