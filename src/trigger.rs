//! Trigger-string table: boundary windows and the parse positions they bridge.

use crate::parse::{Parse, ParsePos};
use ahash::AHashMap as HashMap;
use std::collections::BTreeMap;

/// Stable integer id of a trigger string, also its priority queue index.
pub type TriggerId = u32;

/// Maps every trigger string to the positions where it is a phrase boundary.
///
/// Strings are interned once, in lexicographic order, so ids are
/// deterministic and both lookup directions are O(1). An entry's position
/// list holds the *first* position of each adjacent pair; entries are
/// erased once their trigger string is eliminated, but the interned id
/// stays valid.
#[derive(Debug, Default)]
pub struct TriggerTable {
    /// id -> string
    strings: Vec<Box<[u8]>>,
    /// string -> id
    ids: HashMap<Box<[u8]>, TriggerId>,
    /// id -> positions, `None` once erased
    entries: Vec<Option<Vec<ParsePos>>>,
    live: usize,
}

impl TriggerTable {
    /// Builds the table from ordered `(trigger string, positions)` entries.
    pub(crate) fn from_sorted(sorted: BTreeMap<&[u8], Vec<ParsePos>>) -> Self {
        let mut table = TriggerTable::default();
        for (id, (ts, positions)) in sorted.into_iter().enumerate() {
            let ts: Box<[u8]> = ts.into();
            table.ids.insert(ts.clone(), id as TriggerId);
            table.strings.push(ts);
            table.entries.push(Some(positions));
        }
        table.live = table.entries.len();
        table
    }

    /// Number of interned trigger strings, erased ones included.
    pub fn interned(&self) -> usize {
        self.strings.len()
    }

    /// Number of entries not yet erased.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn id_of(&self, ts: &[u8]) -> Option<TriggerId> {
        self.ids.get(ts).copied()
    }

    /// String of an interned id.
    pub fn string(&self, id: TriggerId) -> &[u8] {
        &self.strings[id as usize]
    }

    pub fn contains(&self, id: TriggerId) -> bool {
        self.entries
            .get(id as usize)
            .is_some_and(|e| e.is_some())
    }

    /// Recorded positions, tombstoned ones included.
    pub fn positions(&self, id: TriggerId) -> Option<&[ParsePos]> {
        self.entries.get(id as usize)?.as_deref()
    }

    /// Records a new occurrence. Ignored if the entry was erased.
    pub fn push_position(&mut self, id: TriggerId, pos: ParsePos) {
        if let Some(Some(positions)) = self.entries.get_mut(id as usize) {
            positions.push(pos);
        }
    }

    /// Drops tombstoned positions from an entry, keeping order.
    pub fn compact(&mut self, id: TriggerId, parse: &Parse) {
        if let Some(Some(positions)) = self.entries.get_mut(id as usize) {
            positions.retain(|&pos| !parse.is_removed(pos));
        }
    }

    /// Erases an entry. The id stays interned.
    pub fn erase(&mut self, id: TriggerId) {
        if let Some(entry) = self.entries.get_mut(id as usize) {
            if entry.take().is_some() {
                self.live -= 1;
            }
        }
    }

    /// Ids of entries not yet erased, in id order.
    pub fn ids(&self) -> impl Iterator<Item = TriggerId> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_some())
            .map(|(id, _)| id as TriggerId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_over(parse: &Parse) -> TriggerTable {
        let pos: Vec<ParsePos> = parse.positions().collect();
        let mut sorted: BTreeMap<&[u8], Vec<ParsePos>> = BTreeMap::new();
        sorted.insert(&b"TTT"[..], vec![pos[2]]);
        sorted.insert(&b"GGG"[..], vec![pos[0], pos[1]]);
        sorted.insert(&b"AAA"[..], Vec::new());
        TriggerTable::from_sorted(sorted)
    }

    #[test]
    fn test_ids_follow_lexicographic_order() {
        let parse = Parse::from_references(vec![1, 2, 3, 4]).unwrap();
        let table = table_over(&parse);

        assert_eq!(table.id_of(b"AAA"), Some(0));
        assert_eq!(table.id_of(b"GGG"), Some(1));
        assert_eq!(table.id_of(b"TTT"), Some(2));
        assert_eq!(table.id_of(b"CCC"), None);
        assert_eq!(table.string(1), b"GGG");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_compact_and_erase() {
        let mut parse = Parse::from_references(vec![1, 2, 3, 4]).unwrap();
        let mut table = table_over(&parse);
        let pos: Vec<ParsePos> = parse.positions().collect();

        parse.remove(pos[0]);
        table.compact(1, &parse);
        assert_eq!(table.positions(1), Some(&[pos[1]][..]));

        table.erase(1);
        table.erase(1);
        assert!(!table.contains(1));
        assert_eq!(table.positions(1), None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.interned(), 3);
        assert_eq!(table.ids().collect::<Vec<_>>(), vec![0, 2]);

        // Erased entries ignore new occurrences
        table.push_position(1, pos[3]);
        assert_eq!(table.positions(1), None);

        table.push_position(0, pos[3]);
        assert_eq!(table.positions(0), Some(&[pos[3]][..]));
    }
}
