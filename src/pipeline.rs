use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    cli::{AssembleCmd, Format, OutputArgs, RefineCmd, WindowsCmd},
    client::{DirectoryClient, MediaPayload},
    config::Config,
    formats::{self, ExportOptions},
    generation::{Generation, run_generation},
    model::{RawCue, Timeline},
    quality::apply_quality_constraints,
    segment::Segmenter,
};

pub fn run_assemble(cmd: AssembleCmd, cfg: &Config) -> Result<()> {
    let span = tracing::info_span!("assemble", fragments = %cmd.fragments.display(), to = ?cmd.out.to);
    let _g = span.enter();

    if !cmd.fragments.is_dir() {
        return Err(anyhow!(
            "fragment directory does not exist: {}",
            cmd.fragments.display()
        ));
    }

    let segmenter = cfg.schedule.segmenter()?;
    let mut client = DirectoryClient::new(&cmd.fragments);
    let media = MediaPayload {
        source: cmd.media.clone(),
        duration: cmd.duration,
    };
    if let Some(source) = &media.source {
        tracing::info!(media = %source.display(), "media source");
    }

    let (generation, report) = run_generation(
        &segmenter,
        &mut client,
        &media,
        &cfg.quality,
        &cfg.schedule.schedule(),
    )
    .context("failed to segment media")?;

    log_diagnostics(&generation);
    tracing::info!(
        extended = report.extended,
        clamped = report.clamped,
        merged = report.merges.len(),
        "constraints summary"
    );
    log_timeline_summary(&generation.timeline, cfg);

    if generation.timeline.is_empty() {
        tracing::warn!("no usable fragments; output will contain no cues");
    }

    if let Some(path) = &cmd.sidecar {
        let json = formats::json::write_sidecar(&generation)?;
        write_output(path, &json, cmd.out.overwrite)?;
        tracing::info!(path = %path.display(), "wrote sidecar");
    }

    let rendered = render_any(&generation.timeline, cmd.out.to, cfg);
    let default_stem = cmd
        .fragments
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("subtitles")
        .to_string();
    let default_dir = cmd.fragments.parent().unwrap_or_else(|| Path::new("."));
    emit(&cmd.out, &rendered, &default_dir.join(default_stem))
}

pub fn run_refine(cmd: RefineCmd, cfg: &Config) -> Result<()> {
    let span = tracing::info_span!("refine", input = cmd.input.as_str(), to = ?cmd.out.to);
    let _g = span.enter();

    if cmd.input == "-" && cmd.out.output.is_none() && !cmd.out.stdout {
        return Err(anyhow!(
            "output path required when input is stdin and --stdout is not set"
        ));
    }

    let input_format = cmd
        .from
        .unwrap_or_else(|| infer_format_from_path_or_dash(&cmd.input));
    tracing::info!(?input_format, "input format selected");

    let raw = read_input_to_string(&cmd.input)?;
    tracing::info!(bytes = raw.len(), "read input");

    let cues = parse_srt_or_vtt_via_aspasia(&raw, input_format)
        .with_context(|| format!("failed parsing input as {:?}", input_format))?;

    let mut timeline = Timeline::new();
    timeline.append(cues);
    timeline.sort_and_dedup();
    apply_quality_constraints(&mut timeline, &cfg.quality);

    log_timeline_summary(&timeline, cfg);

    let rendered = render_any(&timeline, cmd.out.to, cfg);

    let p = Path::new(&cmd.input);
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("bad input filename"))?;
    let parent = p.parent().unwrap_or_else(|| Path::new("."));
    emit(&cmd.out, &rendered, &parent.join(format!("{stem}.refined")))
}

pub fn run_windows(cmd: WindowsCmd, cfg: &Config) -> Result<()> {
    let segmenter = cfg.schedule.segmenter()?;
    let windows = segmenter.windows(cmd.duration)?;
    for w in &windows {
        println!("{:03}\t{}", w.index, w.label());
    }
    tracing::info!(windows = windows.len(), "listed windows");
    Ok(())
}

fn infer_format_from_path_or_dash(input: &str) -> Format {
    if input == "-" {
        return Format::Vtt;
    }
    let p = Path::new(input);
    match p
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
        .as_str()
    {
        "srt" => Format::Srt,
        _ => Format::Vtt,
    }
}

fn read_input_to_string(input: &str) -> Result<String> {
    if input == "-" {
        use std::io::Read;
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        fs::read_to_string(input).with_context(|| format!("failed reading input: {input}"))
    }
}

fn parse_srt_or_vtt_via_aspasia(raw: &str, fmt: Format) -> Result<Vec<RawCue>> {
    if fmt == Format::Vtt {
        if let Ok(vtt) = raw.parse::<aspasia::WebVttSubtitle>() {
            tracing::info!("parsed as VTT via aspasia");
            return Ok(plain_to_cues(&aspasia::PlainSubtitle::from(&vtt)));
        }

        if let Ok(srt) = raw.parse::<aspasia::SubRipSubtitle>() {
            tracing::info!("parsed as SRT via aspasia (fallback)");
            return Ok(plain_to_cues(&aspasia::PlainSubtitle::from(&srt)));
        }
    } else {
        if let Ok(srt) = raw.parse::<aspasia::SubRipSubtitle>() {
            tracing::info!("parsed as SRT via aspasia");
            return Ok(plain_to_cues(&aspasia::PlainSubtitle::from(&srt)));
        }

        if let Ok(vtt) = raw.parse::<aspasia::WebVttSubtitle>() {
            tracing::info!("parsed as VTT via aspasia (fallback)");
            return Ok(plain_to_cues(&aspasia::PlainSubtitle::from(&vtt)));
        }
    }

    Err(anyhow!("failed to parse as SRT or VTT"))
}

fn plain_to_cues(plain: &aspasia::PlainSubtitle) -> Vec<RawCue> {
    let mut dropped = 0usize;
    let cues: Vec<RawCue> = plain
        .events()
        .iter()
        .filter_map(|e| {
            let start = moment_to_seconds(&e.start);
            let end = moment_to_seconds(&e.end);
            let text = e.text.trim();
            if text.is_empty() || start < 0.0 || end <= start {
                dropped += 1;
                return None;
            }
            Some(RawCue::new(start, end, text))
        })
        .collect();

    if dropped > 0 {
        tracing::warn!(dropped, "skipped empty or inverted events");
    }
    cues
}

fn moment_to_seconds(m: &aspasia::Moment) -> f64 {
    let ms = ((m.hours() * 60 + m.minutes()) * 60 + m.seconds()) * 1000 + m.ms();
    ms as f64 / 1000.0
}

fn export_options(fmt: Format, cfg: &Config) -> ExportOptions {
    let f = match fmt {
        Format::Vtt => &cfg.formats.vtt,
        Format::Srt => &cfg.formats.srt,
    };
    ExportOptions {
        wrap_width: f.wrap_lines.then_some(cfg.quality.max_chars_per_line),
        normalize_whitespace: f.normalize_whitespace,
    }
}

fn render_any(t: &Timeline, fmt: Format, cfg: &Config) -> String {
    let opts = export_options(fmt, cfg);
    match fmt {
        Format::Vtt => formats::vtt::write_vtt(t, opts),
        Format::Srt => formats::srt::write_srt(t, opts),
    }
}

fn log_diagnostics(g: &Generation) {
    for (window, d) in &g.diagnostics {
        tracing::debug!(window, line = d.line, reason = %d.reason, "fragment diagnostic");
    }
    if !g.diagnostics.is_empty() || !g.failed_windows.is_empty() {
        tracing::warn!(
            skipped = g.diagnostics.len(),
            failed_windows = ?g.failed_windows,
            "some input was dropped"
        );
    }
}

fn log_timeline_summary(t: &Timeline, cfg: &Config) {
    tracing::info!(cues = t.len(), end_seconds = t.end_seconds(), "timeline summary");

    if tracing::enabled!(tracing::Level::DEBUG) {
        let n = cfg.logging.debug_cue_samples.min(t.len());
        for (i, c) in t.cues().iter().take(n).enumerate() {
            tracing::debug!(
                idx = i,
                id = %c.id(),
                start = c.start_label().as_str(),
                end = c.end_label().as_str(),
                chars = c.text.chars().count(),
                "cue sample"
            );
        }
    }
}

/// Writes to stdout, the explicit output path, or `<stem>.<ext>`.
fn emit(out: &OutputArgs, rendered: &str, default_stem: &Path) -> Result<()> {
    if out.stdout {
        print!("{rendered}");
        tracing::info!(mode = "stdout", "wrote output");
        return Ok(());
    }

    let path = derive_output_path(out, default_stem);
    write_output(&path, rendered, out.overwrite)?;
    tracing::info!(path = %path.display(), "wrote output file");
    Ok(())
}

fn derive_output_path(out: &OutputArgs, default_stem: &Path) -> PathBuf {
    match &out.output {
        Some(o) => o.clone(),
        None => {
            let mut name = default_stem.as_os_str().to_owned();
            name.push(".");
            name.push(out.to.extension());
            PathBuf::from(name)
        }
    }
}

fn write_output(path: &Path, data: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        return Err(anyhow!(
            "refusing to overwrite existing file (pass --overwrite): {}",
            path.display()
        ));
    }
    fs::write(path, data).with_context(|| format!("failed writing {}", path.display()))?;
    Ok(())
}
