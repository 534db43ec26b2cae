use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::formats::time::parse_timestamp;

#[derive(Debug, Parser)]
#[command(name = "subweave")]
#[command(about = "Assemble overlapping transcription fragments into one subtitle timeline.")]
pub struct Args {
    /// Path to config TOML (defaults to ./config.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fold per-window fragment responses into one subtitle file
    Assemble(AssembleCmd),
    /// Apply quality constraints to an existing SRT or VTT file
    Refine(RefineCmd),
    /// Print the transcription windows for a media duration
    Windows(WindowsCmd),
    /// Print the effective default config as TOML and exit
    PrintDefaultConfig,
}

#[derive(Debug, ClapArgs)]
pub struct OutputArgs {
    /// Target format
    #[arg(long, value_enum, default_value_t = Format::Vtt)]
    pub to: Format,

    /// Output file path (optional)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Allow overwriting output file
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Debug, Parser)]
pub struct AssembleCmd {
    /// Directory holding window-NNN.txt fragment responses
    pub fragments: PathBuf,

    /// Total media duration, in seconds or as HH:MM:SS.mmm
    #[arg(long, value_parser = parse_duration)]
    pub duration: f64,

    /// Source media file, recorded for diagnostics only
    #[arg(long)]
    pub media: Option<PathBuf>,

    /// Write alternatives and window summaries as JSON to this path
    #[arg(long)]
    pub sidecar: Option<PathBuf>,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Debug, Parser)]
pub struct RefineCmd {
    /// Input SRT/VTT file, or '-' for stdin
    pub input: String,

    /// Force input format (otherwise inferred from extension)
    #[arg(long, value_enum)]
    pub from: Option<Format>,

    #[command(flatten)]
    pub out: OutputArgs,
}

#[derive(Debug, Parser)]
pub struct WindowsCmd {
    /// Total media duration, in seconds or as HH:MM:SS.mmm
    #[arg(long, value_parser = parse_duration)]
    pub duration: f64,
}

/// Plain seconds, or a time code. An unreadable time code becomes zero and is
/// rejected later by the segmenter.
fn parse_duration(s: &str) -> Result<f64, String> {
    if s.contains(':') {
        return Ok(parse_timestamp(s));
    }
    s.trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid duration '{s}': {e}"))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Format {
    Srt,
    Vtt,
}

impl Format {
    pub fn extension(self) -> &'static str {
        match self {
            Format::Srt => "srt",
            Format::Vtt => "vtt",
        }
    }
}
