//! Mutable parse: an ordered sequence of phrase references with tombstones.
//!
//! Each position lives in a [`SlotMap`] node linked to its live neighbours.
//! Removing a position unlinks and frees its slot, so its generational key
//! reports as removed from then on while every other key stays valid.
//! Nothing is inserted after loading, so freed slots are never reused.

use crate::error::{AuPairError, Result};
use crate::markers::{PhraseId, RefWord, REF_BYTES};
use slotmap::{new_key_type, SlotMap};

/// Most positions a parse can hold; slot indices are 32-bit.
pub const MAX_POSITIONS: usize = u32::MAX as usize - 1;

new_key_type! {
    /// Stable handle to a parse position.
    pub struct ParsePos;
}

/// A node in the doubly-linked list of parse positions.
#[derive(Debug)]
pub(crate) struct ParseNode {
    /// Phrase id + 1
    pub reference: RefWord,
    pub prev: Option<ParsePos>,
    pub next: Option<ParsePos>,
}

/// Ordered sequence of phrase references supporting O(1) removal.
#[derive(Debug, Default)]
pub struct Parse {
    nodes: SlotMap<ParsePos, ParseNode>,
    head: Option<ParsePos>,
    tail: Option<ParsePos>,
    physical_len: usize,
}

impl Parse {
    /// Builds a parse from references in file order.
    ///
    /// A zero reference is rejected: zero is reserved for deleted entries.
    pub fn from_references<I: IntoIterator<Item = RefWord>>(references: I) -> Result<Self> {
        let mut parse = Parse::default();
        for reference in references {
            parse.push(reference)?;
        }
        Ok(parse)
    }

    /// Builds a parse from a little-endian byte image of the parse file.
    pub fn from_le_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % REF_BYTES != 0 {
            return Err(AuPairError::CorruptParse(format!(
                "length {} is not a multiple of {}",
                bytes.len(),
                REF_BYTES
            )));
        }
        let count = bytes.len() / REF_BYTES;
        check_capacity(count)?;
        let mut parse = Parse::default();
        parse.nodes.reserve(count);
        for chunk in bytes.chunks_exact(REF_BYTES) {
            let mut word = [0u8; REF_BYTES];
            word.copy_from_slice(chunk);
            parse.push(RefWord::from_le_bytes(word))?;
        }
        Ok(parse)
    }

    fn push(&mut self, reference: RefWord) -> Result<()> {
        if reference == 0 {
            return Err(AuPairError::CorruptParse(format!(
                "zero reference at position {}",
                self.physical_len
            )));
        }
        check_capacity(self.physical_len + 1)?;
        let prev = self.tail;
        let key = self.nodes.insert(ParseNode {
            reference,
            prev,
            next: None,
        });
        match prev {
            Some(p) => self.nodes[p].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        self.physical_len += 1;
        Ok(())
    }

    /// Raw reference stored at a live position.
    pub fn at(&self, pos: ParsePos) -> Option<RefWord> {
        self.nodes.get(pos).map(|n| n.reference)
    }

    /// Mutable access to the raw reference at a live position.
    pub fn at_mut(&mut self, pos: ParsePos) -> Option<&mut RefWord> {
        self.nodes.get_mut(pos).map(|n| &mut n.reference)
    }

    /// Phrase id referenced at a live position.
    pub fn phrase_at(&self, pos: ParsePos) -> Option<PhraseId> {
        self.at(pos).map(|r| u64::from(r) - 1)
    }

    /// Points a live position at another phrase.
    pub fn set_phrase(&mut self, pos: ParsePos, id: PhraseId) -> Result<()> {
        let reference = id
            .checked_add(1)
            .and_then(|r| RefWord::try_from(r).ok())
            .ok_or(AuPairError::IdSpaceExhausted { next: id })?;
        let slot = self.at_mut(pos).ok_or_else(|| {
            AuPairError::CorruptParse("write to a removed parse position".to_string())
        })?;
        *slot = reference;
        Ok(())
    }

    /// First live position, `None` if every position was removed.
    pub fn begin(&self) -> Option<ParsePos> {
        self.head
    }

    /// Last live position.
    pub fn last(&self) -> Option<ParsePos> {
        self.tail
    }

    /// Next live position after `pos`, `None` at the end or if `pos` is removed.
    #[inline]
    pub fn next(&self, pos: ParsePos) -> Option<ParsePos> {
        self.nodes.get(pos).and_then(|n| n.next)
    }

    /// Previous live position before `pos`, `None` at the start or if `pos` is removed.
    #[inline]
    pub fn prev(&self, pos: ParsePos) -> Option<ParsePos> {
        self.nodes.get(pos).and_then(|n| n.prev)
    }

    #[inline]
    pub fn is_removed(&self, pos: ParsePos) -> bool {
        !self.nodes.contains_key(pos)
    }

    /// Tombstones a position, linking its neighbours together.
    ///
    /// Returns false if the position was already removed.
    pub fn remove(&mut self, pos: ParsePos) -> bool {
        let Some(node) = self.nodes.remove(pos) else {
            return false;
        };
        match node.prev {
            Some(p) => self.nodes[p].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.nodes[n].prev = node.prev,
            None => self.tail = node.prev,
        }
        true
    }

    /// Number of live positions.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of positions read from the input, removed ones included.
    pub fn physical_len(&self) -> usize {
        self.physical_len
    }

    /// Iterates over live positions in order.
    pub fn positions(&self) -> Positions<'_> {
        Positions {
            parse: self,
            current: self.head,
        }
    }

    /// Iterates over live references in order.
    pub fn references(&self) -> impl Iterator<Item = RefWord> + '_ {
        self.positions().map(move |pos| self.nodes[pos].reference)
    }
}

fn check_capacity(positions: usize) -> Result<()> {
    if positions > MAX_POSITIONS {
        return Err(AuPairError::CorruptParse(format!(
            "{} positions exceed the limit of {}",
            positions, MAX_POSITIONS
        )));
    }
    Ok(())
}

/// Iterator over the live positions of a [`Parse`].
pub struct Positions<'a> {
    parse: &'a Parse,
    current: Option<ParsePos>,
}

impl Iterator for Positions<'_> {
    type Item = ParsePos;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.current?;
        self.current = self.parse.next(pos);
        Some(pos)
    }
}
