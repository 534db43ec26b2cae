use anyhow::Result;
use serde::Serialize;

use crate::generation::{Generation, WindowSummary};

#[derive(Debug, Clone, Serialize)]
pub struct Sidecar<'a> {
    pub schema: &'static str,
    pub version: u32,
    pub alternatives: Vec<SidecarAlternative<'a>>,
    pub summaries: &'a [WindowSummary],
    pub failed_windows: &'a [usize],
}

/// Same shape as the alternatives entries a fragment carries, keyed by the
/// cue's current labels.
#[derive(Debug, Clone, Serialize)]
pub struct SidecarAlternative<'a> {
    pub start: String,
    pub end: String,
    pub options: &'a [String],
}

pub fn write_sidecar(g: &Generation) -> Result<String> {
    let sidecar = Sidecar {
        schema: "subweave.sidecar",
        version: 1,
        alternatives: g
            .labelled_alternatives()
            .into_iter()
            .map(|(_, start, end, options)| SidecarAlternative {
                start,
                end,
                options,
            })
            .collect(),
        summaries: &g.summaries,
        failed_windows: &g.failed_windows,
    };
    Ok(serde_json::to_string_pretty(&sidecar)?)
}
