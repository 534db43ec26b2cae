use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

use crate::{
    generation::Schedule, quality::QualitySettings, segment::FixedWindowSegmenter,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: Logging,
    pub quality: QualitySettings,
    pub schedule: ScheduleCfg,
    pub formats: Formats,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: Logging::default(),
            quality: QualitySettings {
                max_chars_per_line: 42,
                reading_speed: 20,
                min_duration_ms: 1_000,
                max_duration_ms: 7_000,
            },
            schedule: ScheduleCfg::default(),
            formats: Formats::default(),
        }
    }
}

impl Config {
    pub fn load(path_opt: Option<&Path>) -> Result<Self> {
        let default_path = Path::new("config.toml");
        let path = if let Some(p) = path_opt {
            Some(p)
        } else if default_path.exists() {
            Some(default_path)
        } else {
            None
        };

        let mut cfg = Config::default();

        if let Some(path) = path {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading config file: {}", path.display()))?;
            let parsed: Config = toml::from_str(&raw)
                .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
            cfg = parsed;
        }

        cfg.quality
            .validate()
            .context("invalid [quality] settings")?;

        Ok(cfg)
    }

    pub fn to_toml_pretty(&self) -> Result<String> {
        let s = toml::to_string_pretty(self).context("failed serializing config as TOML")?;
        Ok(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub format: String,
    pub debug_cue_samples: usize,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            debug_cue_samples: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleCfg {
    pub window_secs: f64,
    pub overlap_secs: f64,
    pub request_delay_ms: u64,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        Self {
            window_secs: 30.0,
            overlap_secs: 2.0,
            request_delay_ms: 200,
        }
    }
}

impl ScheduleCfg {
    pub fn segmenter(&self) -> Result<FixedWindowSegmenter> {
        FixedWindowSegmenter::new(self.window_secs, self.overlap_secs)
            .context("invalid [schedule] window geometry")
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            request_delay: Duration::from_millis(self.request_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Formats {
    pub vtt: FormatCfg,
    pub srt: FormatCfg,
}

/// Export tweaks for one wire form. Both are off by default so that an
/// exported file parses back to the same cues.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatCfg {
    /// Wrap cue lines at `quality.max_chars_per_line`.
    pub wrap_lines: bool,
    pub normalize_whitespace: bool,
}

pub fn init_tracing(logging: &Logging, cli_override_level: Option<&str>) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = cli_override_level.unwrap_or(logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let is_json = logging.format.to_lowercase() == "json";

    if is_json {
        fmt()
            .with_env_filter(filter)
            .event_format(fmt::format().json())
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .pretty()
            .init();
    }

    tracing::info!(
        level = level,
        format = logging.format.as_str(),
        "logging initialized"
    );

    Ok(())
}
