use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Cue, CueId, Timeline};

/// Gaps shorter than this are coalesced.
pub const GAP_THRESHOLD_SECS: f64 = 0.15;
/// Coalescing stops once the joined text would reach this many characters.
pub const MAX_MERGED_CHARS: usize = 80;

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*?\]").expect("static annotation pattern"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitySettings {
    pub max_chars_per_line: usize,
    /// Characters per second.
    pub reading_speed: u32,
    pub min_duration_ms: u64,
    pub max_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("reading_speed must be greater than zero")]
    ZeroReadingSpeed,
    #[error("max_duration_ms must be greater than zero")]
    ZeroMaxDuration,
    #[error("min_duration_ms ({min}) exceeds max_duration_ms ({max})")]
    MinAboveMax { min: u64, max: u64 },
}

impl QualitySettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.reading_speed == 0 {
            return Err(SettingsError::ZeroReadingSpeed);
        }
        if self.max_duration_ms == 0 {
            return Err(SettingsError::ZeroMaxDuration);
        }
        if self.min_duration_ms > self.max_duration_ms {
            return Err(SettingsError::MinAboveMax {
                min: self.min_duration_ms,
                max: self.max_duration_ms,
            });
        }
        Ok(())
    }

    fn min_duration_for(&self, text: &str) -> f64 {
        let reading = visible_length(text) as f64 / self.reading_speed as f64;
        reading.max(self.min_duration_ms as f64 / 1000.0)
    }

    fn max_duration(&self) -> f64 {
        self.max_duration_ms as f64 / 1000.0
    }
}

/// Character count of spoken text, with `[bracketed]` annotations removed.
pub fn visible_length(text: &str) -> usize {
    ANNOTATION.replace_all(text, "").chars().count()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintReport {
    pub extended: usize,
    pub clamped: usize,
    /// `(kept, absorbed)` pairs in merge order.
    pub merges: Vec<(CueId, CueId)>,
}

/// Duration normalization followed by gap coalescing, each exactly once.
pub fn apply_quality_constraints(timeline: &mut Timeline, settings: &QualitySettings) -> ConstraintReport {
    let span = tracing::info_span!("apply_quality_constraints", cues = timeline.len());
    let _g = span.enter();

    let mut report = normalize_durations(timeline, settings);
    report.merges = merge_tiny_gaps(timeline);

    tracing::info!(
        extended = report.extended,
        clamped = report.clamped,
        merged = report.merges.len(),
        remaining = timeline.len(),
        "quality constraints applied"
    );
    report
}

/// Extends short cues to their reading-speed floor and caps long ones.
/// Never moves a start time.
pub fn normalize_durations(timeline: &mut Timeline, settings: &QualitySettings) -> ConstraintReport {
    let mut report = ConstraintReport::default();
    let max = settings.max_duration();

    for cue in &mut timeline.cues {
        let min = settings.min_duration_for(&cue.text);
        if cue.duration() < min {
            cue.end = cue.start + min;
            report.extended += 1;
        }
        if cue.duration() > max {
            cue.end = cue.start + max;
            report.clamped += 1;
        }
    }

    report
}

/// Folds each cue into its predecessor while the gap between them is under
/// [`GAP_THRESHOLD_SECS`] and the joined text stays under
/// [`MAX_MERGED_CHARS`]. A merged cue keeps absorbing followers.
pub fn merge_tiny_gaps(timeline: &mut Timeline) -> Vec<(CueId, CueId)> {
    let cues = std::mem::take(&mut timeline.cues);
    let mut merged: Vec<Cue> = Vec::with_capacity(cues.len());
    let mut merges = Vec::new();

    for next in cues {
        if let Some(current) = merged.last_mut() {
            let gap = next.start - current.end;
            let joined_len = current.text.chars().count() + 1 + next.text.chars().count();
            if gap < GAP_THRESHOLD_SECS && joined_len < MAX_MERGED_CHARS {
                current.text.push(' ');
                current.text.push_str(&next.text);
                current.end = next.end;
                merges.push((current.id(), next.id()));
                continue;
            }
        }
        merged.push(next);
    }

    timeline.cues = merged;
    merges
}
