use crate::aupair::AuPair;
use crate::error::Result;
use crate::markers::{head, is_marker, tail, PhraseId, REF_BYTES};
use crate::parse::ParsePos;
use crate::trigger::TriggerId;
use ahash::AHashSet as HashSet;

/// One adjacent phrase pair bridged by a trigger string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Occurrence {
    /// Position holding the first phrase
    pub pos: ParsePos,
    /// Position holding the second phrase
    pub second_pos: ParsePos,
    pub first: PhraseId,
    pub second: PhraseId,
}

/// Validated occurrences of a trigger string.
#[derive(Debug, Default)]
pub(crate) struct OccurrenceScan {
    /// Pairs that would be merged
    pub occurrences: Vec<Occurrence>,
    /// Recorded positions not tombstoned, trailing ones included
    pub live: usize,
}

impl AuPair {
    /// Collects the live occurrences of a trigger string without mutating anything.
    ///
    /// Returns `None` if the trigger string must not be removed: it is a
    /// document marker, its entry was erased, or any occurrence fails
    /// validation. A single bad occurrence disqualifies the whole string.
    pub(crate) fn scan_occurrences(&self, id: TriggerId) -> Result<Option<OccurrenceScan>> {
        let w = self.config.window_length;
        let ts = self.triggers.string(id);
        if is_marker(ts) {
            return Ok(None);
        }
        let Some(positions) = self.triggers.positions(id) else {
            return Ok(None);
        };

        let mut scan = OccurrenceScan {
            occurrences: Vec::with_capacity(positions.len()),
            live: 0,
        };
        for &pos in positions {
            let Some(first) = self.parse.phrase_at(pos) else {
                continue;
            };
            scan.live += 1;

            // The last phrase of the parse has nothing to merge with
            let Some(second_pos) = self.parse.next(pos) else {
                continue;
            };
            let second = self.position_phrase(second_pos)?;

            let first_phrase = self.dictionary.get(first)?;
            let second_phrase = self.dictionary.get(second)?;
            if tail(first_phrase, w) != head(second_phrase, w) {
                return Ok(None);
            }

            let first_head = head(first_phrase, w);
            let second_tail = tail(second_phrase, w);
            if is_marker(first_head) || is_marker(second_tail) {
                return Ok(None);
            }
            if first_head == ts || second_tail == ts {
                return Ok(None);
            }

            scan.occurrences.push(Occurrence {
                pos,
                second_pos,
                first,
                second,
            });
        }
        Ok(Some(scan))
    }

    /// Bytes saved by merging every occurrence of a trigger string at once.
    ///
    /// Positive means savings. Returns 0 for trigger strings that must not
    /// be removed. Tombstoned positions are dropped from the entry only when
    /// the string passes validation.
    pub fn cost_of_removing(&mut self, id: TriggerId) -> Result<i64> {
        let Some(scan) = self.scan_occurrences(id)? else {
            return Ok(0);
        };
        self.triggers.compact(id, &self.parse);

        let w = self.config.window_length as i64;
        let mut pairs = HashSet::new();
        let mut firsts = HashSet::new();
        let mut seconds = HashSet::new();
        for occ in &scan.occurrences {
            pairs.insert((occ.first, occ.second));
            firsts.insert(occ.first);
            seconds.insert(occ.second);
        }

        let mut from_dictionary = 0i64;
        for &(first, second) in &pairs {
            from_dictionary += self.phrase_len(first)? + self.phrase_len(second)? - w;
        }
        for &first in &firsts {
            from_dictionary -= self.phrase_len(first)?;
        }
        for &second in &seconds {
            from_dictionary -= self.phrase_len(second)?;
        }
        let from_parse = -(scan.live as i64) * REF_BYTES as i64;

        Ok(-(from_dictionary + from_parse))
    }
}
