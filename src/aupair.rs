//! AuPair: greedy dictionary merging over a prefix-free parse.
//!
//! A prefix-free parse splits a text into phrases that overlap by a fixed
//! window. The window shared by two adjacent phrases is a *trigger string*.
//! Removing a trigger string merges every pair of phrases it bridges into a
//! single phrase, dropping one parse reference per occurrence at the price of
//! (possibly) longer dictionary entries. AuPair greedily removes the trigger
//! strings whose removal saves the most bytes.
//!
//! # Example
//!
//! ```
//! use aupair_rs::{AuPair, AuPairConfig, RemovedTriggers};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = AuPairConfig::new(dir.path().join("sample"), 3).unwrap();
//!
//! let phrases = vec![
//!     b"\x02CAAA".to_vec(),
//!     b"AAAGGG".to_vec(),
//!     b"GGGAAA".to_vec(),
//!     b"AAA\x02\x02\x02".to_vec(),
//! ];
//! // Text: $CAAA GGG AAA GGG AAA $$$, cut at every AAA and GGG
//! let mut au_pair = AuPair::from_parts(config, phrases, vec![1, 2, 3, 2, 3, 4]).unwrap();
//!
//! let mut removed = RemovedTriggers::new();
//! au_pair.compress(&mut removed, 0).unwrap();
//! au_pair.close().unwrap();
//!
//! assert!(removed.contains(&b"GGG"[..]));
//! ```

use crate::config::AuPairConfig;
use crate::dictionary::Dictionary;
use crate::error::{AuPairError, Result};
use crate::id_gen::SyntheticIdGen;
use crate::io;
use crate::markers::{head, tail, PhraseId, RefWord, REF_BYTES};
use crate::parse::{Parse, ParsePos};
use crate::pq::IndexMaxPq;
use crate::trigger::{TriggerId, TriggerTable};
use ahash::AHashMap as HashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

/// Trigger strings removed so far, kept in lexicographic order.
pub type RemovedTriggers = BTreeSet<Vec<u8>>;

/// Lifecycle of an [`AuPair`] engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initialized,
    SimplePassDone,
    Compressing,
    Closed,
}

impl EngineState {
    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Initialized => "initialized",
            EngineState::SimplePassDone => "past the simple pass",
            EngineState::Compressing => "compressing",
            EngineState::Closed => "closed",
        }
    }
}

/// The dictionary-merging engine.
///
/// Owns the dictionary, the parse, the trigger-string table and the
/// priority queue for the whole run. Nothing is shared.
pub struct AuPair {
    pub(crate) config: AuPairConfig,
    pub(crate) dictionary: Dictionary,
    pub(crate) parse: Parse,
    pub(crate) triggers: TriggerTable,
    pub(crate) queue: IndexMaxPq,
    pub(crate) ids: SyntheticIdGen,
    pub(crate) state: EngineState,
    bytes_written: u64,
}

impl AuPair {
    /// Creates an engine that will read its inputs on [`init`](Self::init).
    pub fn new(config: AuPairConfig) -> Self {
        Self {
            config,
            dictionary: Dictionary::default(),
            parse: Parse::default(),
            triggers: TriggerTable::default(),
            queue: IndexMaxPq::new(0),
            ids: SyntheticIdGen::new(0),
            state: EngineState::Uninitialized,
            bytes_written: 0,
        }
    }

    /// Creates an initialized engine from in-memory phrases and references.
    ///
    /// `references` use the on-disk convention: phrase id + 1.
    pub fn from_parts(
        config: AuPairConfig,
        phrases: Vec<Vec<u8>>,
        references: Vec<RefWord>,
    ) -> Result<Self> {
        let parse = Parse::from_references(references)?;
        let mut au_pair = Self::new(config);
        au_pair.load(phrases, parse)?;
        Ok(au_pair)
    }

    /// Reads `<prefix>.dict` and `<prefix>.parse` and builds every table.
    pub fn init(&mut self) -> Result<()> {
        self.expect_state("init", &[EngineState::Uninitialized])?;

        let dict_path = self.config.dict_path();
        info!(path = %dict_path.display(), "Reading dictionary");
        let phrases = io::read_dictionary(&dict_path)?;

        let parse_path = self.config.parse_path();
        info!(path = %parse_path.display(), "Reading parse");
        let parse = io::read_parse(&parse_path)?;

        self.load(phrases, parse)
    }

    fn load(&mut self, phrases: Vec<Vec<u8>>, parse: Parse) -> Result<()> {
        let w = self.config.window_length;
        if let Some((i, p)) = phrases.iter().enumerate().find(|(_, p)| p.len() < w) {
            return Err(AuPairError::CorruptDictionary(format!(
                "phrase {} has {} bytes, shorter than the window ({})",
                i,
                p.len(),
                w
            )));
        }
        let count = phrases.len() as u64;
        if let Some(bad) = parse.references().find(|&r| u64::from(r) > count) {
            return Err(AuPairError::CorruptParse(format!(
                "reference {} beyond a dictionary of {} phrases",
                bad, count
            )));
        }

        self.ids = SyntheticIdGen::new(phrases.len());
        self.dictionary = Dictionary::new(phrases);
        self.parse = parse;
        info!(
            phrases = self.dictionary.original_len(),
            parse_length = self.parse.len(),
            "Loaded dictionary and parse"
        );

        self.build_tables()?;
        self.state = EngineState::Initialized;
        Ok(())
    }

    /// Records every boundary window and loads the initial costs.
    fn build_tables(&mut self) -> Result<()> {
        info!("Initializing data structures to compute costs");
        let w = self.config.window_length;
        let table = {
            let dictionary = &self.dictionary;
            let parse = &self.parse;
            let phrase = |pos| phrase_of(dictionary, parse, pos);

            let mut sorted: BTreeMap<&[u8], Vec<ParsePos>> = BTreeMap::new();
            // The outer windows never bridge two phrases, but costs still look them up
            if let Some(first) = parse.begin() {
                sorted.entry(head(phrase(first)?, w)).or_default();
            }
            for pos in parse.positions() {
                let entry = sorted.entry(tail(phrase(pos)?, w)).or_default();
                if parse.next(pos).is_some() {
                    entry.push(pos);
                }
            }
            TriggerTable::from_sorted(sorted)
        };
        self.triggers = table;

        info!(
            trigger_strings = self.triggers.len(),
            "Initializing priority queue"
        );
        self.queue = IndexMaxPq::new(self.triggers.interned());
        for id in 0..self.triggers.interned() as TriggerId {
            let cost = self.cost_of_removing(id)?;
            self.queue.push(id, cost);
        }
        Ok(())
    }

    /// Fails unless the engine is in one of `allowed`.
    pub(crate) fn expect_state(&self, op: &'static str, allowed: &[EngineState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(AuPairError::InvalidState {
                op,
                state: self.state.name(),
            })
        }
    }

    /// Phrase id at a live parse position.
    pub(crate) fn position_phrase(&self, pos: ParsePos) -> Result<PhraseId> {
        self.parse.phrase_at(pos).ok_or_else(removed_position)
    }

    pub(crate) fn phrase_len(&self, id: PhraseId) -> Result<i64> {
        Ok(self.dictionary.get(id)?.len() as i64)
    }

    /// Runs the whole pipeline: init (if needed), simple pass, compress, close.
    ///
    /// Returns the total number of bytes removed.
    pub fn run(&mut self, removed: &mut RemovedTriggers) -> Result<u64> {
        if self.state == EngineState::Uninitialized {
            self.init()?;
        }
        let mut bytes_removed = 0;
        if self.config.simple_pass && self.state == EngineState::Initialized {
            bytes_removed += self.remove_simple(removed)?;
        }
        bytes_removed += self.compress(removed, self.config.threshold)?;
        self.close()?;
        Ok(bytes_removed)
    }

    /// Sorts surviving phrases, ranks them and translates the parse.
    ///
    /// Does not mutate the engine. References to phrases that no longer
    /// exist are dropped and counted in [`Finalized::dropped`].
    pub fn finalize(&self) -> Result<Finalized<'_>> {
        let mut sorted: Vec<(&[u8], PhraseId)> =
            self.dictionary.iter().map(|(id, p)| (p, id)).collect();
        sorted.sort_unstable();

        let mut rank_of: HashMap<PhraseId, RefWord> = HashMap::with_capacity(sorted.len());
        for (i, &(_, id)) in sorted.iter().enumerate() {
            let rank = RefWord::try_from(i + 1)
                .map_err(|_| AuPairError::IdSpaceExhausted { next: i as u64 + 1 })?;
            rank_of.insert(id, rank);
        }

        let mut parse = Vec::with_capacity(self.parse.len());
        let mut occurrences: Vec<RefWord> = vec![0; sorted.len()];
        let mut dropped = 0;
        for pos in self.parse.positions() {
            let id = self.position_phrase(pos)?;
            match rank_of.get(&id) {
                Some(&rank) => {
                    parse.push(rank);
                    count_occurrence(&mut occurrences[rank as usize - 1], rank)?;
                }
                None => {
                    debug!(phrase = id, "Phrase not in the dictionary after compressing");
                    dropped += 1;
                }
            }
        }

        Ok(Finalized {
            phrases: sorted.into_iter().map(|(p, _)| p).collect(),
            parse,
            occurrences,
            dropped,
        })
    }

    /// Writes `.ndict`, `.nparse` and `.nocc` (plus `.ndicz` if configured).
    ///
    /// Idempotent: once closed, further calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            EngineState::Closed => return Ok(()),
            EngineState::Uninitialized => {
                return Err(AuPairError::InvalidState {
                    op: "close",
                    state: self.state.name(),
                })
            }
            _ => {}
        }

        let written = {
            let finalized = self.finalize()?;
            let w = self.config.window_length;

            info!(phrases = finalized.phrases.len(), "Writing dictionary to disk");
            let mut written =
                io::write_dictionary(&self.config.ndict_path(), finalized.phrases.iter().copied())?;
            if self.config.compress_dictionary {
                info!("Writing compressed dictionary to disk");
                written += io::write_compressed_dictionary(
                    &self.config.ndicz_path(),
                    &self.config.ndicz_len_path(),
                    finalized.phrases.iter().copied(),
                    w,
                )?;
            }

            info!(parse_length = finalized.parse.len(), "Writing parse to disk");
            written += io::write_words(&self.config.nparse_path(), &finalized.parse)?;
            written += io::write_words(&self.config.nocc_path(), &finalized.occurrences)?;

            if finalized.dropped > 0 {
                warn!(
                    dropped = finalized.dropped,
                    "Parse references to removed phrases were dropped"
                );
            }
            written
        };

        self.bytes_written += written;
        self.state = EngineState::Closed;
        info!(bytes_written = self.bytes_written, "AuPair closed");
        Ok(())
    }

    /// Writes removed trigger strings in dictionary layout.
    pub fn write_removed_triggers(&mut self, path: &Path, removed: &RemovedTriggers) -> Result<()> {
        info!(count = removed.len(), path = %path.display(), "Writing removed trigger strings");
        self.bytes_written += io::write_dictionary(path, removed.iter().map(|ts| ts.as_slice()))?;
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &AuPairConfig {
        &self.config
    }

    pub fn window_length(&self) -> usize {
        self.config.window_length
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn parse(&self) -> &Parse {
        &self.parse
    }

    pub fn triggers(&self) -> &TriggerTable {
        &self.triggers
    }

    /// Total bytes this engine has written to disk.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Current cost of removing a trigger string, `None` if unknown.
    pub fn cost(&self, ts: &[u8]) -> Option<i64> {
        let id = self.triggers.id_of(ts)?;
        self.queue.get_key(id)
    }

    /// Returns size statistics for the current state.
    pub fn stats(&self) -> AuPairStats {
        AuPairStats {
            original_phrases: self.dictionary.original_len(),
            synthetic_phrases: self.ids.issued(self.dictionary.original_len()) as usize,
            alive_phrases: self.dictionary.len(),
            dictionary_bytes: self.dictionary.total_bytes(),
            parse_length: self.parse.physical_len(),
            live_parse_length: self.parse.len(),
            trigger_strings: self.triggers.len(),
            bytes_written: self.bytes_written,
        }
    }
}

fn phrase_of<'a>(dictionary: &'a Dictionary, parse: &Parse, pos: ParsePos) -> Result<&'a [u8]> {
    let id = parse.phrase_at(pos).ok_or_else(removed_position)?;
    dictionary.get(id)
}

/// Counts one more occurrence of `rank`, failing once the count no longer
/// fits in a reference word.
fn count_occurrence(count: &mut RefWord, rank: RefWord) -> Result<()> {
    *count = count
        .checked_add(1)
        .ok_or(AuPairError::OccurrenceOverflow {
            rank: u64::from(rank),
        })?;
    Ok(())
}

fn removed_position() -> AuPairError {
    AuPairError::CorruptParse("removed parse position dereferenced".to_string())
}

/// Output of [`AuPair::finalize`].
#[derive(Debug)]
pub struct Finalized<'a> {
    /// Surviving phrases in canonical order; rank `r` is `phrases[r - 1]`
    pub phrases: Vec<&'a [u8]>,
    /// Live parse translated to ranks
    pub parse: Vec<RefWord>,
    /// Occurrences of each rank in `parse`
    pub occurrences: Vec<RefWord>,
    /// References skipped because their phrase was removed
    pub dropped: usize,
}

/// Statistics about the dictionary and parse.
#[derive(Debug, Clone, Copy)]
pub struct AuPairStats {
    /// Phrases read from the input dictionary
    pub original_phrases: usize,
    /// Merged phrases created so far
    pub synthetic_phrases: usize,
    /// Phrases currently in the dictionary
    pub alive_phrases: usize,
    /// Bytes of all alive phrases
    pub dictionary_bytes: usize,
    /// Positions read from the input parse
    pub parse_length: usize,
    /// Positions not removed
    pub live_parse_length: usize,
    /// Trigger strings still in the table
    pub trigger_strings: usize,
    /// Bytes written to disk
    pub bytes_written: u64,
}

impl AuPairStats {
    /// Dictionary bytes plus parse bytes.
    pub fn footprint(&self) -> usize {
        self.dictionary_bytes + self.live_parse_length * REF_BYTES
    }
}
