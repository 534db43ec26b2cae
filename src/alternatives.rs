use std::collections::HashMap;

use crate::model::{CueId, Timeline};

/// Alternative phrasings per cue, keyed by cue id so that timing edits
/// never orphan an entry.
#[derive(Debug, Clone, Default)]
pub struct AlternativesStore {
    by_cue: HashMap<CueId, Vec<String>>,
}

impl AlternativesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `options` for `id`, replacing any previous set. Blank and
    /// repeated options are dropped; order is preserved.
    pub fn insert(&mut self, id: CueId, options: Vec<String>) {
        let mut set: Vec<String> = Vec::with_capacity(options.len());
        for opt in options {
            let opt = opt.trim();
            if !opt.is_empty() && !set.iter().any(|s| s == opt) {
                set.push(opt.to_string());
            }
        }
        if set.is_empty() {
            return;
        }
        if !(3..=4).contains(&set.len()) {
            tracing::debug!(%id, options = set.len(), "unusual alternative count");
        }
        self.by_cue.insert(id, set);
    }

    pub fn get(&self, id: CueId) -> Option<&[String]> {
        self.by_cue.get(&id).map(Vec::as_slice)
    }

    /// Resolves current labels through the live timeline. Same-range cues
    /// resolve to the first in timeline order; [`AlternativesStore::get`]
    /// reaches any cue by id.
    pub fn lookup(&self, timeline: &Timeline, start_label: &str, end_label: &str) -> Option<&[String]> {
        let cue = timeline.find_by_labels(start_label, end_label)?;
        self.get(cue.id())
    }

    pub fn remove(&mut self, id: CueId) -> Option<Vec<String>> {
        self.by_cue.remove(&id)
    }

    /// Moves the entry of `from` onto `to`. A missing `from` leaves `to` as is.
    pub fn rebind(&mut self, from: CueId, to: CueId) {
        if let Some(options) = self.by_cue.remove(&from) {
            self.by_cue.insert(to, options);
        }
    }

    pub fn len(&self) -> usize {
        self.by_cue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_cue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CueId, &[String])> {
        self.by_cue.iter().map(|(id, v)| (*id, v.as_slice()))
    }
}
