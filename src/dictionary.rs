//! Phrase dictionary with a dense original table and a sparse synthetic store.

use crate::error::{AuPairError, Result};
use crate::markers::PhraseId;
use ahash::AHashMap as HashMap;

/// Dictionary of phrases addressed by [`PhraseId`].
///
/// Ids below the original table's size resolve in the table; every other id
/// resolves in the synthetic store, which only grows through merges. Removed
/// original entries are cleared in place so the table never relocates.
#[derive(Debug, Default)]
pub struct Dictionary {
    original: Vec<Option<Box<[u8]>>>,
    synthetic: HashMap<PhraseId, Box<[u8]>>,
}

impl Dictionary {
    /// Creates a dictionary from the phrases of an input file, in id order.
    pub fn new(phrases: Vec<Vec<u8>>) -> Self {
        Self {
            original: phrases
                .into_iter()
                .map(|p| Some(p.into_boxed_slice()))
                .collect(),
            synthetic: HashMap::default(),
        }
    }

    /// Number of phrases in the original table, alive or not.
    pub fn original_len(&self) -> usize {
        self.original.len()
    }

    /// Number of phrases currently in the synthetic store.
    pub fn synthetic_len(&self) -> usize {
        self.synthetic.len()
    }

    fn original_index(&self, id: PhraseId) -> Option<usize> {
        usize::try_from(id).ok().filter(|&i| i < self.original.len())
    }

    /// Looks up a phrase, failing if it was removed or never existed.
    pub fn get(&self, id: PhraseId) -> Result<&[u8]> {
        let phrase = match self.original_index(id) {
            Some(i) => self.original[i].as_deref(),
            None => self.synthetic.get(&id).map(|p| &**p),
        };
        phrase.ok_or(AuPairError::PhraseNotFound(id))
    }

    pub fn contains(&self, id: PhraseId) -> bool {
        self.get(id).is_ok()
    }

    /// Logically deletes a phrase. Removing a missing phrase is a no-op.
    pub fn remove(&mut self, id: PhraseId) {
        match self.original_index(id) {
            Some(i) => self.original[i] = None,
            None => {
                self.synthetic.remove(&id);
            }
        }
    }

    /// Inserts a merged phrase under an id outside the original range.
    pub fn insert_synthetic(&mut self, id: PhraseId, content: Vec<u8>) {
        debug_assert!(
            self.original_index(id).is_none(),
            "Synthetic id must not collide with the original table"
        );
        self.synthetic.insert(id, content.into_boxed_slice());
    }

    /// Iterates over every alive phrase in both stores.
    ///
    /// Original phrases come first in id order; synthetic order is unspecified.
    pub fn iter(&self) -> impl Iterator<Item = (PhraseId, &[u8])> {
        let original = self
            .original
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_deref().map(|p| (i as PhraseId, p)));
        let synthetic = self.synthetic.iter().map(|(&id, p)| (id, &**p));
        original.chain(synthetic)
    }

    /// Number of alive phrases.
    pub fn len(&self) -> usize {
        self.original.iter().filter(|p| p.is_some()).count() + self.synthetic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total bytes of all alive phrases.
    pub fn total_bytes(&self) -> usize {
        self.iter().map(|(_, p)| p.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dictionary {
        Dictionary::new(vec![b"AAAGG".to_vec(), b"GGCCC".to_vec(), b"CCCAT".to_vec()])
    }

    #[test]
    fn test_get_dispatch() {
        let mut dict = sample();
        dict.insert_synthetic(13, b"AAAGGCCC".to_vec());

        assert_eq!(dict.get(0).unwrap(), b"AAAGG");
        assert_eq!(dict.get(2).unwrap(), b"CCCAT");
        assert_eq!(dict.get(13).unwrap(), b"AAAGGCCC");
        assert!(matches!(dict.get(3), Err(AuPairError::PhraseNotFound(3))));
        assert!(matches!(dict.get(99), Err(AuPairError::PhraseNotFound(99))));
    }

    #[test]
    fn test_remove_original_keeps_ids_stable() {
        let mut dict = sample();
        dict.remove(1);

        assert!(!dict.contains(1));
        assert_eq!(dict.get(2).unwrap(), b"CCCAT");
        assert_eq!(dict.original_len(), 3);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_remove_synthetic() {
        let mut dict = sample();
        dict.insert_synthetic(20, b"XYZXYZ".to_vec());
        assert_eq!(dict.synthetic_len(), 1);

        dict.remove(20);
        assert!(!dict.contains(20));
        assert_eq!(dict.synthetic_len(), 0);

        // Removing twice is harmless
        dict.remove(20);
        dict.remove(0);
        dict.remove(0);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_iter_and_bytes() {
        let mut dict = sample();
        dict.insert_synthetic(30, b"GGCCCAT".to_vec());
        dict.remove(0);

        let mut ids: Vec<PhraseId> = dict.iter().map(|(id, _)| id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 30]);
        assert_eq!(dict.total_bytes(), 5 + 5 + 7);
    }
}
