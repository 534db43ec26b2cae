pub mod fragment;
pub mod json;
pub mod srt;
pub mod time;
pub mod vtt;

use textwrap::wrap;

/// Export options shared by both wire forms.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    /// Wrap each cue line to this many columns.
    pub wrap_width: Option<usize>,
    /// Collapse runs of whitespace inside a line to one space.
    pub normalize_whitespace: bool,
}

/// Cue text as written to a file: lines trimmed, blank lines removed (a
/// blank line would end the cue), optionally collapsed and wrapped.
pub(crate) fn cue_text_for_export<'a>(
    lines: impl Iterator<Item = &'a str>,
    opts: ExportOptions,
) -> Vec<String> {
    let mut out = Vec::new();
    for line in lines {
        let line = if opts.normalize_whitespace {
            normalize_ws(line)
        } else {
            line.trim().to_string()
        };
        if line.is_empty() {
            continue;
        }
        match opts.wrap_width {
            Some(width) if width > 0 => {
                out.extend(wrap(&line, width).into_iter().map(|l| l.into_owned()));
            }
            _ => out.push(line),
        }
    }
    out
}

fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}
