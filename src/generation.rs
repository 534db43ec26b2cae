use std::{thread, time::Duration};

use serde::Serialize;

use crate::{
    alternatives::AlternativesStore,
    client::{MediaPayload, TranscriptionClient},
    formats::{
        fragment::{Diagnostic, SkipReason, parse_fragment},
        time::{format_timestamp, try_parse_timestamp},
    },
    model::{CueId, Timeline},
    quality::{ConstraintReport, QualitySettings, apply_quality_constraints},
    segment::{SegmentError, Segmenter, Window},
};

/// Raw response for one window.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub window: Window,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    pub window: usize,
    pub start: String,
    pub end: String,
    pub duration: f64,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FoldOutcome {
    pub accepted: usize,
    pub duplicates: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// State of one generation run: the timeline and its side tables.
#[derive(Debug, Default)]
pub struct Generation {
    pub timeline: Timeline,
    pub alternatives: AlternativesStore,
    pub summaries: Vec<WindowSummary>,
    pub failed_windows: Vec<usize>,
    /// Skip reasons tagged with the window that produced them.
    pub diagnostics: Vec<(usize, Diagnostic)>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses one fragment and folds it into the timeline, binding its
    /// alternatives to the ids of the cues it contributed.
    pub fn fold_fragment(&mut self, fragment: &Fragment) -> FoldOutcome {
        let span = tracing::info_span!(
            "fragment",
            index = fragment.window.index,
            offset_seconds = fragment.window.offset_seconds
        );
        let _g = span.enter();

        let parsed = parse_fragment(&fragment.text);
        let mut diagnostics = parsed.diagnostics;

        let labels: Vec<(String, String)> = parsed
            .cues
            .iter()
            .map(|c| (format_timestamp(c.start), format_timestamp(c.end)))
            .collect();
        let ids = self.timeline.append(parsed.cues);

        // Cues sharing a label pair take entries for that pair in order.
        let mut bound = vec![false; labels.len()];
        for entry in parsed.alternatives {
            let key = (normalize_label(&entry.start), normalize_label(&entry.end));
            match (0..labels.len()).find(|&i| !bound[i] && labels[i] == key) {
                Some(pos) => {
                    bound[pos] = true;
                    self.alternatives.insert(ids[pos], entry.options);
                }
                None => diagnostics.push(Diagnostic {
                    line: 0,
                    reason: SkipReason::UnmatchedAlternative {
                        start: entry.start,
                        end: entry.end,
                    },
                }),
            }
        }

        let duplicates = self.timeline.sort_and_dedup();
        for dup in &duplicates {
            self.alternatives.rebind(dup.dropped, dup.kept);
        }

        if let Some(summary) = parsed.summary {
            self.summaries.push(WindowSummary {
                window: fragment.window.index,
                start: format_timestamp(fragment.window.start_time),
                end: format_timestamp(fragment.window.end_time()),
                duration: fragment.window.duration,
                summary,
            });
        }

        tracing::info!(
            accepted = ids.len(),
            duplicates = duplicates.len(),
            skipped = diagnostics.len(),
            total = self.timeline.len(),
            "folded fragment"
        );

        FoldOutcome {
            accepted: ids.len(),
            duplicates: duplicates.len(),
            diagnostics,
        }
    }

    /// Records a window whose fragment could not be retrieved.
    pub fn skip_window(&mut self, index: usize) {
        self.failed_windows.push(index);
    }

    /// Applies quality constraints once. Alternatives of merged cues are
    /// dropped since neither set describes the joined text.
    pub fn finalize(&mut self, settings: &QualitySettings) -> ConstraintReport {
        let report = apply_quality_constraints(&mut self.timeline, settings);
        for (kept, absorbed) in &report.merges {
            self.alternatives.remove(*kept);
            self.alternatives.remove(*absorbed);
        }
        report
    }

    /// Alternatives keyed by the current labels of their cues, in timeline order.
    pub fn labelled_alternatives(&self) -> Vec<(CueId, String, String, &[String])> {
        self.timeline
            .cues()
            .iter()
            .filter_map(|c| {
                self.alternatives
                    .get(c.id())
                    .map(|opts| (c.id(), c.start_label(), c.end_label(), opts))
            })
            .collect()
    }
}

fn normalize_label(label: &str) -> String {
    match try_parse_timestamp(label) {
        Ok(seconds) => format_timestamp(seconds),
        Err(_) => label.trim().to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct Schedule {
    pub request_delay: Duration,
}

/// Runs one generation: one client call per window, strictly in window
/// order, with a pause between requests. A failed window contributes no
/// cues; the run always completes.
pub fn run_generation<S, C>(
    segmenter: &S,
    client: &mut C,
    media: &MediaPayload,
    settings: &QualitySettings,
    schedule: &Schedule,
) -> Result<(Generation, ConstraintReport), SegmentError>
where
    S: Segmenter,
    C: TranscriptionClient,
{
    let span = tracing::info_span!("generation", duration = media.duration);
    let _g = span.enter();

    let windows = segmenter.windows(media.duration)?;
    tracing::info!(windows = windows.len(), "starting generation");

    let mut generation = Generation::new();
    let count = windows.len();
    let mut accepted = 0;
    let mut duplicates = 0;

    for (i, window) in windows.into_iter().enumerate() {
        match client.transcribe(&window, media) {
            Ok(text) => {
                let index = window.index;
                let outcome = generation.fold_fragment(&Fragment { window, text });
                accepted += outcome.accepted;
                duplicates += outcome.duplicates;
                generation
                    .diagnostics
                    .extend(outcome.diagnostics.into_iter().map(|d| (index, d)));
            }
            Err(err) => {
                tracing::warn!(index = window.index, %err, "window failed; continuing");
                generation.skip_window(window.index);
            }
        }

        if i + 1 < count && !schedule.request_delay.is_zero() {
            thread::sleep(schedule.request_delay);
        }
    }

    tracing::info!(
        accepted,
        duplicates,
        failed_windows = generation.failed_windows.len(),
        "all windows processed"
    );

    let report = generation.finalize(settings);

    if generation.timeline.is_empty() {
        tracing::warn!("generation produced no cues");
    }

    Ok((generation, report))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        client::ClientError,
        formats::fragment::ALTERNATIVES_MARKER,
        segment::FixedWindowSegmenter,
    };

    struct CannedClient {
        responses: HashMap<usize, String>,
        calls: Vec<usize>,
    }

    impl TranscriptionClient for CannedClient {
        fn transcribe(&mut self, window: &Window, _media: &MediaPayload) -> Result<String, ClientError> {
            self.calls.push(window.index);
            self.responses
                .get(&window.index)
                .cloned()
                .ok_or_else(|| ClientError::Missing {
                    index: window.index,
                    path: format!("canned-{}", window.index).into(),
                })
        }
    }

    fn settings() -> QualitySettings {
        QualitySettings {
            max_chars_per_line: 42,
            reading_speed: 20,
            min_duration_ms: 1000,
            max_duration_ms: 7000,
        }
    }

    fn window(index: usize, start: f64) -> Window {
        Window {
            index,
            start_time: start,
            duration: 30.0,
            offset_seconds: start,
        }
    }

    fn fragment(index: usize, start: f64, text: &str) -> Fragment {
        Fragment {
            window: window(index, start),
            text: text.to_string(),
        }
    }

    #[test]
    fn alternatives_bind_to_cue_ids() {
        let text = format!(
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHello\n{ALTERNATIVES_MARKER}\n{}",
            r#"{"alternatives":[{"start":"00:00:01.000","end":"00:00:02.000","options":["Hi","Hey","Hello there"]},{"start":"00:00:09.000","end":"00:00:10.000","options":["x"]}]}"#
        );
        let mut g = Generation::new();
        let outcome = g.fold_fragment(&fragment(0, 0.0, &text));

        assert_eq!(outcome.accepted, 1);
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic {
                line: 0,
                reason: SkipReason::UnmatchedAlternative {
                    start: "00:00:09.000".into(),
                    end: "00:00:10.000".into(),
                },
            }]
        );
        let id = g.timeline.cues()[0].id();
        assert_eq!(g.alternatives.get(id).unwrap().len(), 3);
    }

    #[test]
    fn same_range_cues_take_alternatives_in_order() {
        let text = format!(
            "00:00:01.000 --> 00:00:02.000\nhello\n\n00:00:01.000 --> 00:00:02.000\nhallo\n{ALTERNATIVES_MARKER}\n{}",
            r#"{"alternatives":[{"start":"00:00:01.000","end":"00:00:02.000","options":["hi","hey","yo"]},{"start":"00:00:01.000","end":"00:00:02.000","options":["ha","hu","ho"]},{"start":"00:00:01.000","end":"00:00:02.000","options":["extra"]}]}"#
        );
        let mut g = Generation::new();
        let outcome = g.fold_fragment(&fragment(0, 0.0, &text));

        let cues = g.timeline.cues();
        assert_eq!(cues[0].text, "hello");
        assert_eq!(g.alternatives.get(cues[0].id()).unwrap(), ["hi", "hey", "yo"]);
        assert_eq!(cues[1].text, "hallo");
        assert_eq!(g.alternatives.get(cues[1].id()).unwrap(), ["ha", "hu", "ho"]);
        assert!(matches!(
            outcome.diagnostics[0].reason,
            SkipReason::UnmatchedAlternative { .. }
        ));
    }

    #[test]
    fn short_form_alternative_labels_still_match() {
        let text = format!(
            "00:01.000 --> 00:02.000\nHello\n{ALTERNATIVES_MARKER}\n{}",
            r#"{"alternatives":[{"start":"00:01.000","end":"00:02.000","options":["Hi","Hey","Yo"]}]}"#
        );
        let mut g = Generation::new();
        g.fold_fragment(&fragment(0, 0.0, &text));
        assert_eq!(g.alternatives.len(), 1);
    }

    #[test]
    fn duplicate_hands_alternatives_to_survivor() {
        let cue = "00:00:28.000 --> 00:00:29.000\nhello\n";
        let alts = r#"{"alternatives":[{"start":"00:00:28.000","end":"00:00:29.000","options":["hi","hey","yo"]}]}"#;

        let mut g = Generation::new();
        g.fold_fragment(&fragment(0, 0.0, cue));
        let outcome = g.fold_fragment(&fragment(1, 28.0, &format!("{cue}{ALTERNATIVES_MARKER}\n{alts}")));

        assert_eq!(outcome.duplicates, 1);
        assert_eq!(g.timeline.len(), 1);
        let id = g.timeline.cues()[0].id();
        assert_eq!(g.alternatives.get(id).unwrap(), ["hi", "hey", "yo"]);
    }

    #[test]
    fn summary_is_recorded_with_window_labels() {
        let mut g = Generation::new();
        g.fold_fragment(&fragment(
            1,
            28.0,
            "00:00:30.000 --> 00:00:31.000\nhey\n---CHUNK_SUMMARY---\nA greeting.",
        ));
        assert_eq!(
            g.summaries,
            vec![WindowSummary {
                window: 1,
                start: "00:00:28.000".into(),
                end: "00:00:58.000".into(),
                duration: 30.0,
                summary: "A greeting.".into(),
            }]
        );
    }

    #[test]
    fn merged_cues_lose_alternatives() {
        let text = format!(
            "00:00:01.000 --> 00:00:02.000\none\n\n00:00:02.050 --> 00:00:03.000\ntwo\n{ALTERNATIVES_MARKER}\n{}",
            r#"{"alternatives":[{"start":"00:00:01.000","end":"00:00:02.000","options":["a","b","c"]},{"start":"00:00:02.050","end":"00:00:03.000","options":["d","e","f"]}]}"#
        );
        let mut g = Generation::new();
        g.fold_fragment(&fragment(0, 0.0, &text));
        assert_eq!(g.alternatives.len(), 2);

        let report = g.finalize(&settings());
        assert_eq!(report.merges.len(), 1);
        assert!(g.alternatives.is_empty());
        assert!(g.labelled_alternatives().is_empty());
    }

    #[test]
    fn run_skips_failed_windows_and_sorts() {
        let seg = FixedWindowSegmenter::new(30.0, 2.0).unwrap();
        let mut client = CannedClient {
            responses: HashMap::from([
                (2, "WEBVTT\n\n00:00:57.000 --> 00:00:59.000\nlate words\n".to_string()),
                (0, "WEBVTT\n\n00:00:03.000 --> 00:00:05.000\nearly words\n".to_string()),
            ]),
            calls: Vec::new(),
        };
        let media = MediaPayload {
            source: None,
            duration: 60.0,
        };
        let schedule = Schedule {
            request_delay: Duration::ZERO,
        };

        let (g, _) = run_generation(&seg, &mut client, &media, &settings(), &schedule).unwrap();

        assert_eq!(client.calls, vec![0, 1, 2]);
        assert_eq!(g.failed_windows, vec![1]);
        assert!(g.diagnostics.is_empty());
        let texts: Vec<&str> = g.timeline.cues().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["early words", "late words"]);
    }

    #[test]
    fn zero_usable_fragments_give_empty_timeline() {
        let seg = FixedWindowSegmenter::new(30.0, 2.0).unwrap();
        let mut client = CannedClient {
            responses: HashMap::new(),
            calls: Vec::new(),
        };
        let media = MediaPayload {
            source: None,
            duration: 45.0,
        };
        let schedule = Schedule {
            request_delay: Duration::ZERO,
        };
        let (g, report) = run_generation(&seg, &mut client, &media, &settings(), &schedule).unwrap();
        assert!(g.timeline.is_empty());
        assert_eq!(g.failed_windows, vec![0, 1]);
        assert_eq!(report, ConstraintReport::default());
    }
}
