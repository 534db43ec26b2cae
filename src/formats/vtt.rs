use crate::{
    formats::{ExportOptions, cue_text_for_export},
    model::Timeline,
};

pub const HEADER: &str = "WEBVTT";

/// Numbered WebVTT blocks after the `WEBVTT` header. An empty timeline
/// yields the header and one blank line.
pub fn write_vtt(t: &Timeline, opts: ExportOptions) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\n\n");

    for (i, cue) in t.cues().iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');

        out.push_str(&format!("{} --> {}\n", cue.start_label(), cue.end_label()));

        for line in cue_text_for_export(cue.lines(), opts) {
            out.push_str(&line);
            out.push('\n');
        }

        out.push('\n');
    }

    out
}
