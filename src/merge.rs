use std::collections::{HashMap, hash_map::Entry};

use crate::model::{CueId, RawCue, Timeline};

/// A cue dropped during dedup and the earlier cue it duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Duplicate {
    pub kept: CueId,
    pub dropped: CueId,
}

impl Timeline {
    /// Appends one fragment's cues in arrival order and returns their ids.
    pub fn append(&mut self, cues: Vec<RawCue>) -> Vec<CueId> {
        cues.into_iter().map(|raw| self.accept(raw)).collect()
    }

    /// Stable sort by start, then drop every cue whose `(start label, text)`
    /// was already seen. First occurrence wins.
    pub fn sort_and_dedup(&mut self) -> Vec<Duplicate> {
        self.sort_by_start();

        let mut seen: HashMap<(String, String), CueId> = HashMap::new();
        let mut duplicates = Vec::new();

        self.cues.retain(|cue| match seen.entry((cue.start_label(), cue.text.clone())) {
            Entry::Occupied(kept) => {
                duplicates.push(Duplicate {
                    kept: *kept.get(),
                    dropped: cue.id(),
                });
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(cue.id());
                true
            }
        });

        if !duplicates.is_empty() {
            tracing::debug!(dropped = duplicates.len(), "removed duplicate cues");
        }
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::formats::fragment::parse_fragment;
    use proptest::prelude::*;

    #[test]
    fn overlapping_windows_yield_one_cue() {
        let first = "WEBVTT\n\n00:00:27.000 --> 00:00:28.000\nbefore\n\n00:00:28.000 --> 00:00:29.000\nhello\n";
        let second = "WEBVTT\n\n00:00:28.000 --> 00:00:29.000\nhello\n\n00:00:40.000 --> 00:00:41.000\nafter\n";

        let mut t = Timeline::new();
        t.append(parse_fragment(first).cues);
        let second_ids = t.append(parse_fragment(second).cues);
        let dups = t.sort_and_dedup();

        let texts: Vec<&str> = t.cues().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["before", "hello", "after"]);
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].dropped, second_ids[0]);
        assert_eq!(dups[0].kept, t.cues()[1].id());
    }

    #[test]
    fn same_range_different_text_survives() {
        let mut t = Timeline::new();
        t.append(vec![RawCue::new(28.0, 29.0, "hello")]);
        t.append(vec![RawCue::new(28.0, 29.0, "hallo")]);
        assert!(t.sort_and_dedup().is_empty());
        assert_eq!(t.len(), 2);
        assert_eq!(t.cues()[0].text, "hello");
    }

    #[test]
    fn equal_starts_keep_arrival_order() {
        let mut t = Timeline::new();
        t.append(vec![RawCue::new(5.0, 6.0, "b"), RawCue::new(1.0, 2.0, "a")]);
        t.append(vec![RawCue::new(5.0, 7.0, "c")]);
        t.sort_and_dedup();
        let texts: Vec<&str> = t.cues().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut t = Timeline::new();
        t.append(vec![RawCue::new(1.0, 2.0, "x"), RawCue::new(1.0, 2.5, "x")]);
        assert_eq!(t.sort_and_dedup().len(), 1);
        assert!(t.sort_and_dedup().is_empty());
        assert_eq!(t.cues()[0].end, 2.0);
    }

    proptest! {
        #[test]
        fn merge_orders_and_dedups(
            raw in prop::collection::vec((0u32..600, 1u32..50, 0usize..4), 0..60)
        ) {
            let words = ["hello", "world", "[Music]", "ok"];
            let mut t = Timeline::new();
            for chunk in raw.chunks(7) {
                t.append(
                    chunk
                        .iter()
                        .map(|(s, d, w)| {
                            let start = *s as f64 / 10.0;
                            RawCue::new(start, start + *d as f64 / 10.0, words[*w])
                        })
                        .collect(),
                );
            }
            t.sort_and_dedup();

            for pair in t.cues().windows(2) {
                prop_assert!(pair[0].start <= pair[1].start);
            }
            let mut keys = HashSet::new();
            for cue in t.cues() {
                prop_assert!(keys.insert((cue.start_label(), cue.text.clone())));
            }
        }
    }
}
