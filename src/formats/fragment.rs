//! Parser for one transcription fragment: WebVTT-style cues, optionally
//! followed by an alternatives JSON line and a one-sentence window summary.

use serde::Deserialize;
use thiserror::Error;

use crate::{
    formats::time::{TimeCodeError, parse_time_range_arrow},
    model::RawCue,
};

pub const ALTERNATIVES_MARKER: &str = "---ALTERNATIVES---";
pub const SUMMARY_MARKER: &str = "---CHUNK_SUMMARY---";

const SUMMARY_MAX_CHARS: usize = 100;

/// Why part of a fragment was not accepted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("unparsable time range: {0}")]
    MalformedTimestamp(#[from] TimeCodeError),
    #[error("cue has no text")]
    EmptyText,
    #[error("cue starts before zero ({0}s)")]
    NegativeStart(f64),
    #[error("cue end {end}s is not after start {start}s")]
    InvertedRange { start: f64, end: f64 },
    #[error("alternatives payload ignored: {0}")]
    MalformedAlternatives(String),
    #[error("alternatives for {start} --> {end} match no cue in this fragment")]
    UnmatchedAlternative { start: String, end: String },
}

/// A skip reason with the 1-based line it was detected on (0 when the
/// reason concerns the whole alternatives payload).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub line: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AlternativeEntry {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AlternativesPayload {
    alternatives: Vec<AlternativeEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFragment {
    pub cues: Vec<RawCue>,
    pub alternatives: Vec<AlternativeEntry>,
    pub summary: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Splits a raw fragment response into its sections and parses each.
/// Never fails: anything malformed ends up in `diagnostics`.
pub fn parse_fragment(raw: &str) -> ParsedFragment {
    let (head, summary) = match raw.split_once(SUMMARY_MARKER) {
        Some((head, tail)) => (head, parse_summary(tail)),
        None => (raw, None),
    };

    let (vtt, alternatives_raw) = match head.split_once(ALTERNATIVES_MARKER) {
        Some((vtt, tail)) => (vtt, Some(tail)),
        None => (head, None),
    };

    let (cues, mut diagnostics) = parse_cues(vtt);

    let alternatives = match alternatives_raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(json) => match parse_alternatives(json) {
            Ok(entries) => entries,
            Err(reason) => {
                tracing::debug!(%reason, "ignoring alternatives payload");
                diagnostics.push(Diagnostic { line: 0, reason });
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    ParsedFragment {
        cues,
        alternatives,
        summary,
        diagnostics,
    }
}

/// Scans timed-text markup for `start --> end` lines and the text lines that
/// follow them. Everything before the first range line (header, notes) is
/// skipped.
pub fn parse_cues(vtt: &str) -> (Vec<RawCue>, Vec<Diagnostic>) {
    let lines: Vec<&str> = vtt.lines().collect();
    let mut cues = Vec::new();
    let mut diagnostics = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !lines[i].contains("-->") {
            i += 1;
            continue;
        }

        let range_line_no = i + 1;
        let range = parse_time_range_arrow(lines[i]);
        i += 1;

        let mut text_lines: Vec<&str> = Vec::new();
        while i < lines.len() {
            let line = lines[i].trim();
            if line.is_empty() || line.contains("-->") {
                break;
            }
            if is_cue_index(line) && lines.get(i + 1).is_some_and(|next| next.contains("-->")) {
                break;
            }
            if !line.starts_with("```") {
                text_lines.push(line);
            }
            i += 1;
        }

        match validate(range, &text_lines) {
            Ok((start, end)) => cues.push(RawCue::new(start, end, text_lines.join("\n"))),
            Err(reason) => {
                tracing::warn!(line = range_line_no, %reason, "skipping cue");
                diagnostics.push(Diagnostic {
                    line: range_line_no,
                    reason,
                });
            }
        }
    }

    (cues, diagnostics)
}

fn validate(
    range: Result<(f64, f64), TimeCodeError>,
    text_lines: &[&str],
) -> Result<(f64, f64), SkipReason> {
    let (start, end) = range?;
    if text_lines.is_empty() {
        return Err(SkipReason::EmptyText);
    }
    if !start.is_finite() || start < 0.0 {
        return Err(SkipReason::NegativeStart(start));
    }
    if !end.is_finite() || end <= start {
        return Err(SkipReason::InvertedRange { start, end });
    }
    Ok((start, end))
}

fn is_cue_index(line: &str) -> bool {
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

fn parse_alternatives(json: &str) -> Result<Vec<AlternativeEntry>, SkipReason> {
    let json = json.lines().find(|l| !l.trim().is_empty()).unwrap_or(json).trim();
    let payload: AlternativesPayload = serde_json::from_str(json)
        .map_err(|e| SkipReason::MalformedAlternatives(e.to_string()))?;
    Ok(payload.alternatives)
}

fn parse_summary(tail: &str) -> Option<String> {
    let summary = tail.trim();
    if summary.is_empty() {
        return None;
    }
    if summary.chars().count() > SUMMARY_MAX_CHARS {
        let mut cut: String = summary.chars().take(SUMMARY_MAX_CHARS).collect();
        cut.push_str("...");
        return Some(cut);
    }
    Some(summary.to_string())
}
