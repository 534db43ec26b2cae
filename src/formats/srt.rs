use crate::{
    formats::{ExportOptions, cue_text_for_export, time::to_srt_label},
    model::Timeline,
};

/// SubRip blocks: same layout as WebVTT minus the header, with a comma before
/// the milliseconds.
pub fn write_srt(t: &Timeline, opts: ExportOptions) -> String {
    let mut out = String::new();

    for (i, cue) in t.cues().iter().enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');

        out.push_str(&format!(
            "{} --> {}\n",
            to_srt_label(&cue.start_label()),
            to_srt_label(&cue.end_label())
        ));

        for line in cue_text_for_export(cue.lines(), opts) {
            out.push_str(&line);
            out.push('\n');
        }

        out.push('\n');
    }

    out
}
