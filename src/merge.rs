use crate::aupair::{AuPair, EngineState, RemovedTriggers};
use crate::cost::Occurrence;
use crate::error::Result;
use crate::markers::{head, is_marker, tail, PhraseId};
use crate::trigger::TriggerId;
use ahash::AHashMap as HashMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Distinct `(neighbour phrase, merged phrase)` pairs seen next to a trigger string.
type NeighbourPairs = BTreeMap<TriggerId, BTreeSet<(PhraseId, PhraseId)>>;

impl AuPair {
    /// Removes trigger strings that always bridge the same two phrases.
    ///
    /// Bookkeeping only: the parse and dictionary are left untouched, the
    /// removed strings get cost 0 and lose their table entry. Returns
    /// `window_length` bytes per occurrence of every removed string.
    pub fn remove_simple(&mut self, removed: &mut RemovedTriggers) -> Result<u64> {
        self.expect_state("remove_simple", &[EngineState::Initialized])?;
        let w = self.config.window_length as u64;

        let mut bytes_removed = 0u64;
        let mut simple = 0usize;
        for id in self.triggers.ids() {
            let ts = self.triggers.string(id);
            if removed.contains(ts) {
                continue;
            }
            let Some(scan) = self.scan_occurrences(id)? else {
                continue;
            };

            let mut elements = BTreeSet::new();
            for occ in &scan.occurrences {
                elements.insert(occ.first);
                elements.insert(occ.second);
                if elements.len() > 2 {
                    break;
                }
            }
            if elements.len() != 2 {
                continue;
            }

            bytes_removed += w * scan.occurrences.len() as u64;
            simple += 1;
            debug!(
                ts = %String::from_utf8_lossy(ts),
                occurrences = scan.occurrences.len(),
                bytes_removed,
                "Removed simple trigger string"
            );
            removed.insert(ts.to_vec());
        }

        for ts in removed.iter() {
            if let Some(id) = self.triggers.id_of(ts) {
                self.queue.push(id, 0);
                self.triggers.erase(id);
            }
        }

        self.state = EngineState::SimplePassDone;
        info!(
            removed = simple,
            trigger_strings = self.triggers.len(),
            bytes_removed,
            "Simple pass done"
        );
        Ok(bytes_removed)
    }

    /// Greedily removes the most profitable trigger string until no cost
    /// exceeds `threshold`.
    ///
    /// A threshold of 0 or less selects `window_length - 1`. Returns the sum
    /// of the costs of every removed trigger string.
    pub fn compress(&mut self, removed: &mut RemovedTriggers, threshold: i64) -> Result<u64> {
        self.expect_state(
            "compress",
            &[
                EngineState::Initialized,
                EngineState::SimplePassDone,
                EngineState::Compressing,
            ],
        )?;
        self.state = EngineState::Compressing;

        info!(trigger_strings = self.triggers.len(), "Start compressing");
        if self.triggers.len() <= 1 {
            return Ok(0);
        }
        let threshold = if threshold <= 0 {
            self.config.window_length as i64 - 1
        } else {
            threshold
        };
        info!(threshold, "Compression threshold");

        let mut consumed = BTreeSet::new();
        let mut bytes_removed = 0u64;
        while let Some((_, cost)) = self.remove_best(removed, threshold, &mut consumed)? {
            bytes_removed += cost as u64;
        }

        for id in consumed {
            self.dictionary.remove(id);
        }
        info!(
            bytes_removed,
            removed = removed.len(),
            phrases = self.dictionary.len(),
            "Compression done"
        );
        Ok(bytes_removed)
    }

    /// Removes the trigger string with the highest cost above `threshold`.
    ///
    /// Stale queue entries met on the way are zeroed. Returns the removed id
    /// and its cost, or `None` once no cost exceeds `threshold`.
    pub(crate) fn remove_best(
        &mut self,
        removed: &mut RemovedTriggers,
        threshold: i64,
        consumed: &mut BTreeSet<PhraseId>,
    ) -> Result<Option<(TriggerId, i64)>> {
        while let Some((cost, id)) = self.queue.get_max() {
            if cost <= threshold {
                break;
            }

            let ts = self.triggers.string(id).to_vec();
            if !self.triggers.contains(id) || removed.contains(&ts) || is_marker(&ts) {
                self.queue.push(id, 0);
                continue;
            }
            // Costs are cached, so the occurrences are checked again before merging
            let Some(scan) = self.scan_occurrences(id)? else {
                self.queue.push(id, 0);
                continue;
            };

            info!(
                ts = %String::from_utf8_lossy(&ts),
                cost,
                removed = removed.len() + 1,
                trigger_strings = self.triggers.len(),
                "Removing trigger string"
            );
            removed.insert(ts);

            self.merge_occurrences(&scan.occurrences, consumed)?;

            self.queue.push(id, 0);
            self.triggers.erase(id);
            return Ok(Some((id, cost)));
        }
        Ok(None)
    }

    /// Merges every validated occurrence and adjusts the costs of the
    /// neighbouring trigger strings.
    ///
    /// Merged phrases are shared by all occurrences of the same pair. The
    /// phrases they replace are collected in `consumed`.
    fn merge_occurrences(
        &mut self,
        occurrences: &[Occurrence],
        consumed: &mut BTreeSet<PhraseId>,
    ) -> Result<()> {
        let w = self.config.window_length;
        let mut merged_pairs: HashMap<(PhraseId, PhraseId), PhraseId> = HashMap::new();
        let mut before: NeighbourPairs = BTreeMap::new();
        let mut after: NeighbourPairs = BTreeMap::new();
        let mut deltas: BTreeMap<TriggerId, i64> = BTreeMap::new();

        for occ in occurrences {
            let first_phrase = self.dictionary.get(occ.first)?;
            let second_phrase = self.dictionary.get(occ.second)?;
            let first_len = first_phrase.len() as i64;
            let second_len = second_phrase.len() as i64;
            let merged_len = first_len + second_len - w as i64;
            let before_ts = self.triggers.id_of(head(first_phrase, w));
            let after_ts = self.triggers.id_of(tail(second_phrase, w));

            let merged = match merged_pairs.get(&(occ.first, occ.second)) {
                Some(&merged) => merged,
                None => {
                    let mut content = Vec::with_capacity(merged_len as usize);
                    content.extend_from_slice(first_phrase);
                    content.extend_from_slice(&second_phrase[w..]);

                    let merged = self.ids.get()?;
                    self.dictionary.insert_synthetic(merged, content);
                    merged_pairs.insert((occ.first, occ.second), merged);
                    consumed.insert(occ.first);
                    consumed.insert(occ.second);
                    merged
                }
            };

            // The merged phrase ends where the second one did
            if let Some(after_ts) = after_ts {
                self.triggers.push_position(after_ts, occ.pos);
            }

            if let (Some(ts), Some(prev)) = (before_ts, self.parse.prev(occ.pos)) {
                let neighbour = self.position_phrase(prev)?;
                if before.entry(ts).or_default().insert((neighbour, merged)) {
                    *deltas.entry(ts).or_default() -= merged_len - first_len;
                }
            }
            if let (Some(ts), Some(next)) = (after_ts, self.parse.next(occ.second_pos)) {
                let neighbour = self.position_phrase(next)?;
                if after.entry(ts).or_default().insert((neighbour, merged)) {
                    *deltas.entry(ts).or_default() -= merged_len - second_len;
                }
            }

            self.parse.set_phrase(occ.pos, merged)?;
            self.parse.remove(occ.second_pos);
        }

        for side in [&before, &after] {
            for (&ts, pairs) in side {
                let mut seen = BTreeSet::new();
                for &(neighbour, merged) in pairs {
                    if seen.insert(merged) {
                        *deltas.entry(ts).or_default() +=
                            self.phrase_len(merged)? - self.phrase_len(neighbour)?;
                    }
                }
            }
        }

        for (ts, delta) in deltas {
            // Retired trigger strings stay at 0
            match self.queue.get_key(ts) {
                Some(old) if old != 0 => self.queue.push(ts, old + delta),
                _ => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::AuPairError;
    use crate::markers::{RefWord, DOLLAR_PRIME, REF_BYTES};
    use crate::{AuPair, AuPairConfig, EngineState, RemovedTriggers};

    const R: i64 = REF_BYTES as i64;

    fn engine(w: usize, phrases: &[&[u8]], refs: Vec<RefWord>) -> (tempfile::TempDir, AuPair) {
        let dir = tempfile::tempdir().unwrap();
        let config = AuPairConfig::new(dir.path().join("t"), w).unwrap();
        let phrases = phrases.iter().map(|p| p.to_vec()).collect();
        let au_pair = AuPair::from_parts(config, phrases, refs).unwrap();
        (dir, au_pair)
    }

    /// Text spelled by the live parse of an engine.
    fn spell(au_pair: &AuPair) -> Vec<u8> {
        let w = au_pair.window_length();
        let mut text = Vec::new();
        for (i, pos) in au_pair.parse().positions().enumerate() {
            let id = au_pair.parse().phrase_at(pos).unwrap();
            let phrase = au_pair.dictionary().get(id).unwrap();
            text.extend_from_slice(if i == 0 { phrase } else { &phrase[w..] });
        }
        text
    }

    // $CAAA GGG AAA GGG AAA $$$
    fn repeated_pair() -> (tempfile::TempDir, AuPair) {
        let phrases: &[&[u8]] = &[b"\x02CAAA", b"AAAGGG", b"GGGAAA", b"AAA\x02\x02\x02"];
        engine(3, phrases, vec![1, 2, 3, 2, 3, 4])
    }

    // $CAAA GGG CTTT AAA GGG CTTT ACCC $$$
    fn chained_pairs() -> (tempfile::TempDir, AuPair) {
        let phrases: &[&[u8]] = &[
            b"\x02CAAA",
            b"AAAGGG",
            b"GGGCTTT",
            b"TTTAAA",
            b"TTTACCC",
            b"CCC\x02\x02\x02",
        ];
        engine(3, phrases, vec![1, 2, 3, 4, 2, 3, 5, 6])
    }

    #[test]
    fn test_simple_pass_removes_single_bridge() {
        let phrases: &[&[u8]] = &[
            b"\x02CAAA",
            b"AAAGGG",
            b"GGGTTT",
            b"TTTAAA",
            b"TTT\x02\x02\x02",
        ];
        let (_dir, mut au_pair) = engine(3, phrases, vec![1, 2, 3, 4, 2, 3, 5]);
        let text = spell(&au_pair);

        let mut removed = RemovedTriggers::new();
        let bytes = au_pair.remove_simple(&mut removed).unwrap();

        // GGG bridges AAAGGG and GGGTTT twice
        assert_eq!(bytes, 3 * 2);
        assert_eq!(removed.into_iter().collect::<Vec<_>>(), vec![b"GGG".to_vec()]);
        assert_eq!(au_pair.cost(b"GGG"), Some(0));
        let ggg = au_pair.triggers().id_of(b"GGG").unwrap();
        assert!(!au_pair.triggers().contains(ggg));
        assert_eq!(au_pair.state(), EngineState::SimplePassDone);

        // Nothing merged
        assert_eq!(spell(&au_pair), text);
        assert_eq!(au_pair.parse().len(), 7);
    }

    #[test]
    fn test_simple_pass_skips_ambiguous_bridge() {
        // GGG bridges AAAGGG with both GGGCCC and GGGTTT
        let phrases: &[&[u8]] = &[
            b"\x02CAAA",
            b"AAAGGG",
            b"GGGCCC",
            b"CCCAAA",
            b"GGGTTT",
            b"TTT\x02\x02\x02",
        ];
        let (_dir, mut au_pair) = engine(3, phrases, vec![1, 2, 3, 4, 2, 5, 6]);

        let mut removed = RemovedTriggers::new();
        au_pair.remove_simple(&mut removed).unwrap();
        assert!(!removed.contains(&b"GGG"[..]));
        assert_eq!(au_pair.cost(b"GGG"), Some(2 * R));
    }

    #[test]
    fn test_simple_pass_runs_once() {
        let (_dir, mut au_pair) = repeated_pair();
        let mut removed = RemovedTriggers::new();
        au_pair.remove_simple(&mut removed).unwrap();
        assert!(matches!(
            au_pair.remove_simple(&mut removed),
            Err(AuPairError::InvalidState { op: "remove_simple", .. })
        ));
        // GGG was simple, compress has nothing left above the threshold
        assert_eq!(au_pair.compress(&mut removed, 0).unwrap(), 0);
    }

    #[test]
    fn test_compress_merges_every_occurrence() {
        let (_dir, mut au_pair) = repeated_pair();
        let text = spell(&au_pair);
        let before = au_pair.stats().footprint();

        let mut removed = RemovedTriggers::new();
        let bytes = au_pair.compress(&mut removed, 0).unwrap();

        assert_eq!(bytes as i64, 3 + 2 * R);
        assert_eq!(removed.into_iter().collect::<Vec<_>>(), vec![b"GGG".to_vec()]);
        assert_eq!(au_pair.state(), EngineState::Compressing);

        // Both occurrences share one merged phrase, the consumed ones are gone
        let stats = au_pair.stats();
        assert_eq!(stats.synthetic_phrases, 1);
        assert_eq!(stats.alive_phrases, 3);
        assert!(!au_pair.dictionary().contains(1));
        assert!(!au_pair.dictionary().contains(2));
        assert_eq!(au_pair.parse().len(), 4);
        assert_eq!(spell(&au_pair), text);

        // 23 + 6 references down to 20 + 4 references
        assert_eq!(before as i64, 23 + 6 * R);
        assert_eq!(stats.footprint() as i64, 20 + 4 * R);
        assert_eq!(before - stats.footprint(), bytes as usize);
    }

    #[test]
    fn test_threshold_stops_compression() {
        let (_dir, mut au_pair) = repeated_pair();
        let mut removed = RemovedTriggers::new();
        assert_eq!(au_pair.compress(&mut removed, 3 + 2 * R).unwrap(), 0);
        assert!(removed.is_empty());
        assert_eq!(au_pair.parse().len(), 6);
    }

    #[test]
    fn test_neighbour_costs_updated() {
        let (_dir, mut au_pair) = chained_pairs();
        assert_eq!(au_pair.cost(b"GGG"), Some(3 + 2 * R));
        assert_eq!(au_pair.cost(b"TTT"), Some(2 * R - 1));

        let mut removed = RemovedTriggers::new();
        au_pair.compress(&mut removed, 2 * R - 1).unwrap();
        assert_eq!(removed.len(), 1);

        // TTT lost 3 per distinct neighbour, regained 10 - 6 once for the merged phrase
        assert_eq!(au_pair.cost(b"TTT"), Some(2 * R - 3));
        // AAA was retired from the start and stays retired
        assert_eq!(au_pair.cost(b"AAA"), Some(0));
    }

    #[test]
    fn test_cascading_merges_keep_the_text() {
        let (_dir, mut au_pair) = chained_pairs();
        let text = spell(&au_pair);

        let mut removed = RemovedTriggers::new();
        au_pair.compress(&mut removed, 0).unwrap();

        assert!(removed.contains(&b"GGG"[..]));
        assert!(removed.contains(&b"TTT"[..]));
        assert_eq!(spell(&au_pair), text);
        assert_eq!(au_pair.finalize().unwrap().dropped, 0);
    }

    #[test]
    fn test_marker_trigger_never_selected() {
        let phrases: &[&[u8]] = &[b"ACGT\x05\x05", b"\x05\x05TTAC"];
        let (_dir, mut au_pair) = engine(2, phrases, vec![1, 2, 1, 2]);
        let marker = [DOLLAR_PRIME, DOLLAR_PRIME];
        let id = au_pair.triggers().id_of(&marker).unwrap();

        // Even with a huge cached cost
        au_pair.queue.push(id, 1000);
        let mut removed = RemovedTriggers::new();
        assert_eq!(au_pair.compress(&mut removed, 0).unwrap(), 0);
        assert!(removed.is_empty());
        assert_eq!(au_pair.cost(&marker), Some(0));
        assert_eq!(au_pair.parse().len(), 4);
    }

    #[test]
    fn test_stale_cost_revalidated() {
        let (_dir, mut au_pair) = repeated_pair();
        let id = au_pair.triggers().id_of(b"AAA").unwrap();

        // AAA follows a phrase starting with a marker
        au_pair.queue.push(id, 1000);
        let mut removed = RemovedTriggers::new();
        au_pair.compress(&mut removed, 0).unwrap();
        assert!(!removed.contains(&b"AAA"[..]));
        assert!(removed.contains(&b"GGG"[..]));
    }

    #[test]
    fn test_compress_single_entry_table() {
        // Only the seeded head and tail window, which coincide
        let (_dir, mut au_pair) = engine(2, &[b"ACAC"], vec![1]);
        assert_eq!(au_pair.triggers().len(), 1);
        let mut removed = RemovedTriggers::new();
        assert_eq!(au_pair.compress(&mut removed, 0).unwrap(), 0);
    }

    #[test]
    fn test_compress_after_close() {
        let (_dir, mut au_pair) = repeated_pair();
        au_pair.close().unwrap();
        let mut removed = RemovedTriggers::new();
        assert!(matches!(
            au_pair.compress(&mut removed, 0),
            Err(AuPairError::InvalidState { op: "compress", .. })
        ));
    }

    #[test]
    fn test_run_writes_outputs() {
        let (_dir, mut au_pair) = chained_pairs();
        let text = spell(&au_pair);

        let mut removed = RemovedTriggers::new();
        let bytes = au_pair.run(&mut removed).unwrap();
        assert!(bytes > 0);
        assert_eq!(au_pair.state(), EngineState::Closed);

        let config = au_pair.config();
        let phrases = crate::io::read_dictionary(&config.ndict_path()).unwrap();
        let parse = crate::io::read_parse(&config.nparse_path()).unwrap();
        let mut rebuilt = Vec::new();
        for (i, r) in parse.references().enumerate() {
            let phrase = &phrases[r as usize - 1];
            rebuilt.extend_from_slice(if i == 0 { &phrase[..] } else { &phrase[3..] });
        }
        assert_eq!(rebuilt, text);
    }
}
