use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::{
    alternatives::AlternativesStore,
    formats::time::{format_timestamp, try_parse_timestamp},
};

/// Stable identity of a cue, assigned once when the timeline accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CueId(u64);

impl fmt::Display for CueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A cue as produced by a parser, before the timeline has given it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl RawCue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// One timed subtitle entry. Offsets are absolute seconds on the media
/// timeline; multi-line text is joined with `\n`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    id: CueId,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Cue {
    pub fn id(&self) -> CueId {
        self.id
    }

    pub fn start_label(&self) -> String {
        format_timestamp(self.start)
    }

    pub fn end_label(&self) -> String {
        format_timestamp(self.end)
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("no cue with id {0}")]
    UnknownCue(CueId),
    #[error("cue text must not be empty")]
    EmptyText,
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] crate::formats::time::TimeCodeError),
    #[error("end time must be after start time")]
    InvertedRange,
    #[error("cue {0} has no alternatives")]
    NoAlternatives(CueId),
    #[error("cue {id} has no alternative #{choice}")]
    NoSuchAlternative { id: CueId, choice: usize },
}

/// Ordered sequence of cues owned by one generation run.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub(crate) cues: Vec<Cue>,
    next_id: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn end_seconds(&self) -> f64 {
        self.cues.iter().map(|c| c.end).fold(0.0, f64::max)
    }

    pub fn cue(&self, id: CueId) -> Option<&Cue> {
        self.cues.iter().find(|c| c.id == id)
    }

    /// Finds a live cue by its current `HH:MM:SS.mmm` labels. When several
    /// cues share the pair, the first in timeline order is returned; use
    /// [`Timeline::cue`] with an id to reach the others.
    pub fn find_by_labels(&self, start_label: &str, end_label: &str) -> Option<&Cue> {
        self.cues
            .iter()
            .find(|c| c.start_label() == start_label && c.end_label() == end_label)
    }

    pub(crate) fn accept(&mut self, raw: RawCue) -> CueId {
        let id = CueId(self.next_id);
        self.next_id += 1;
        self.cues.push(Cue {
            id,
            start: raw.start,
            end: raw.end,
            text: raw.text,
        });
        id
    }

    fn cue_mut(&mut self, id: CueId) -> Result<&mut Cue, EditError> {
        self.cues
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(EditError::UnknownCue(id))
    }

    /// Replaces a cue's text. Timing is left untouched.
    pub fn edit_text(&mut self, id: CueId, text: &str) -> Result<(), EditError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EditError::EmptyText);
        }
        self.cue_mut(id)?.text = text.to_string();
        Ok(())
    }

    /// Replaces timing and text from user-entered labels, then restores
    /// start ordering.
    pub fn edit_cue(
        &mut self,
        id: CueId,
        start_label: &str,
        end_label: &str,
        text: &str,
    ) -> Result<(), EditError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EditError::EmptyText);
        }
        let start = try_parse_timestamp(start_label)?;
        let end = try_parse_timestamp(end_label)?;
        if start >= end {
            return Err(EditError::InvertedRange);
        }

        let cue = self.cue_mut(id)?;
        cue.start = start;
        cue.end = end;
        cue.text = text.to_string();

        self.sort_by_start();
        tracing::debug!(%id, start, end, "cue edited");
        Ok(())
    }

    /// Rewrites a cue's text with its `choice`-th stored alternative.
    pub fn apply_alternative(
        &mut self,
        store: &AlternativesStore,
        id: CueId,
        choice: usize,
    ) -> Result<(), EditError> {
        let options = store.get(id).ok_or(EditError::NoAlternatives(id))?;
        let text = options
            .get(choice)
            .ok_or(EditError::NoSuchAlternative { id, choice })?
            .clone();
        self.cue_mut(id)?.text = text;
        Ok(())
    }

    pub(crate) fn sort_by_start(&mut self) {
        self.cues.sort_by(|a, b| a.start.total_cmp(&b.start));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeline(cues: &[(f64, f64, &str)]) -> Timeline {
        let mut t = Timeline::new();
        for (s, e, text) in cues {
            t.accept(RawCue::new(*s, *e, *text));
        }
        t
    }

    #[test]
    fn ids_are_unique_and_stable() {
        let t = timeline(&[(0.0, 1.0, "a"), (1.0, 2.0, "b")]);
        assert_ne!(t.cues()[0].id(), t.cues()[1].id());
    }

    #[test]
    fn labels_follow_numeric_offsets() {
        let mut t = timeline(&[(1.0, 2.0, "a")]);
        let id = t.cues()[0].id();
        t.edit_cue(id, "00:00:03.000", "00:00:04.250", "a").unwrap();
        let cue = t.cue(id).unwrap();
        assert_eq!(cue.start_label(), "00:00:03.000");
        assert_eq!(cue.end_label(), "00:00:04.250");
    }

    #[test]
    fn edit_cue_resorts_timeline() {
        let mut t = timeline(&[(0.0, 1.0, "first"), (2.0, 3.0, "second")]);
        let first = t.cues()[0].id();
        t.edit_cue(first, "00:00:05.000", "00:00:06.000", "moved").unwrap();
        assert_eq!(t.cues()[0].text, "second");
        assert_eq!(t.cues()[1].id(), first);
    }

    #[test]
    fn edit_cue_rejects_bad_input() {
        let mut t = timeline(&[(0.0, 1.0, "a")]);
        let id = t.cues()[0].id();
        assert_eq!(
            t.edit_cue(id, "00:00:02.000", "00:00:01.000", "a"),
            Err(EditError::InvertedRange)
        );
        assert_eq!(
            t.edit_cue(id, "00:00:00.000", "00:00:01.000", "   "),
            Err(EditError::EmptyText)
        );
        assert!(matches!(
            t.edit_cue(id, "nope", "00:00:01.000", "a"),
            Err(EditError::Timestamp(_))
        ));
        assert_eq!(t.cue(id).unwrap().text, "a");
        assert_eq!(t.cue(id).unwrap().start, 0.0);
    }

    #[test]
    fn edit_text_keeps_timing() {
        let mut t = timeline(&[(0.5, 1.5, "a")]);
        let id = t.cues()[0].id();
        t.edit_text(id, " new words ").unwrap();
        let cue = t.cue(id).unwrap();
        assert_eq!(cue.text, "new words");
        assert_eq!((cue.start, cue.end), (0.5, 1.5));
    }

    #[test]
    fn apply_alternative_rewrites_text_only() {
        let mut t = timeline(&[(0.5, 1.5, "hello there")]);
        let id = t.cues()[0].id();
        let mut store = AlternativesStore::new();
        store.insert(id, vec!["hi there".into(), "hello, there".into()]);

        t.apply_alternative(&store, id, 1).unwrap();
        assert_eq!(t.cue(id).unwrap().text, "hello, there");
        assert_eq!(t.cue(id).unwrap().end, 1.5);

        assert_eq!(
            t.apply_alternative(&store, id, 7),
            Err(EditError::NoSuchAlternative { id, choice: 7 })
        );
    }

    #[test]
    fn alternatives_survive_timing_edit() {
        let mut t = timeline(&[(0.5, 1.5, "hello")]);
        let id = t.cues()[0].id();
        let mut store = AlternativesStore::new();
        store.insert(id, vec!["hi".into(), "hey".into(), "howdy".into()]);

        t.edit_cue(id, "00:00:02.000", "00:00:03.000", "hello").unwrap();
        assert_eq!(store.lookup(&t, "00:00:02.000", "00:00:03.000").unwrap().len(), 3);
        assert!(store.lookup(&t, "00:00:00.500", "00:00:01.500").is_none());
    }

    #[test]
    fn lines_split_on_line_breaks() {
        let t = timeline(&[(0.0, 1.0, "one\ntwo")]);
        assert_eq!(t.cues()[0].lines().collect::<Vec<_>>(), vec!["one", "two"]);
    }
}
