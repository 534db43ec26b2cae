use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeCodeError {
    #[error("unrecognized timestamp: '{0}'")]
    SegmentCount(String),
    #[error("bad {field} in timestamp '{raw}'")]
    Component { field: &'static str, raw: String },
    #[error("timestamp '{0}' is out of range")]
    OutOfRange(String),
    #[error("missing '-->' in time range: '{0}'")]
    MissingArrow(String),
}

/// Formats seconds as `HH:MM:SS.mmm`. Sub-millisecond precision is truncated.
pub fn format_timestamp(seconds: f64) -> String {
    let ms = seconds_to_ms(seconds);

    let total_seconds = ms / 1000;
    let milli = ms % 1000;

    let sec = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let min = total_minutes % 60;
    let hour = total_minutes / 60;

    format!("{hour:02}:{min:02}:{sec:02}.{milli:03}")
}

/// Rewrites an already formatted `HH:MM:SS.mmm` label into SubRip form.
pub fn to_srt_label(label: &str) -> String {
    label.replacen('.', ",", 1)
}

/// Whole milliseconds in `seconds`, truncated. The small bias absorbs binary
/// representation error so that e.g. `10.1` stays `10100` and not `10099`.
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0 + 1e-6).floor() as u64
}

/// Lenient parse: any malformed input yields `0.0`.
pub fn parse_timestamp(s: &str) -> f64 {
    match try_parse_timestamp(s) {
        Ok(v) => v,
        Err(err) => {
            tracing::debug!(%err, "timestamp fell back to zero");
            0.0
        }
    }
}

/// Parses `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds.
pub fn try_parse_timestamp(s: &str) -> Result<f64, TimeCodeError> {
    let t = s.trim();

    let (hms, frac) = if let Some((a, b)) = t.split_once('.') {
        (a, Some(b))
    } else if let Some((a, b)) = t.split_once(',') {
        (a, Some(b))
    } else {
        (t, None)
    };

    let parts: Vec<&str> = hms.split(':').collect();
    let (h, m, sec) = match parts.as_slice() {
        [h, m, s] => (
            component(h, "hours", t)?,
            component(m, "minutes", t)?,
            component(s, "seconds", t)?,
        ),
        [m, s] => (0, component(m, "minutes", t)?, component(s, "seconds", t)?),
        _ => return Err(TimeCodeError::SegmentCount(t.to_string())),
    };

    let whole = h
        .checked_mul(3600)
        .and_then(|v| v.checked_add(m.checked_mul(60)?))
        .and_then(|v| v.checked_add(sec))
        .and_then(|v| v.checked_mul(1000))
        .ok_or_else(|| TimeCodeError::OutOfRange(t.to_string()))?;
    let mut milli = 0u64;

    if let Some(frac) = frac {
        let frac = frac.trim();
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TimeCodeError::Component {
                field: "milliseconds",
                raw: t.to_string(),
            });
        }
        let mut frac_s: String = frac.chars().take(3).collect();
        while frac_s.len() < 3 {
            frac_s.push('0');
        }
        milli = frac_s.parse().map_err(|_| TimeCodeError::Component {
            field: "milliseconds",
            raw: t.to_string(),
        })?;
    }

    let total = whole
        .checked_add(milli)
        .ok_or_else(|| TimeCodeError::OutOfRange(t.to_string()))?;
    Ok(total as f64 / 1000.0)
}

fn component(part: &str, field: &'static str, raw: &str) -> Result<u64, TimeCodeError> {
    part.trim().parse().map_err(|_| TimeCodeError::Component {
        field,
        raw: raw.to_string(),
    })
}

/// Splits `a --> b [settings]` and parses both sides. Cue settings after the
/// end timestamp are ignored.
pub fn parse_time_range_arrow(line: &str) -> Result<(f64, f64), TimeCodeError> {
    let (a, b) = line
        .split_once("-->")
        .ok_or_else(|| TimeCodeError::MissingArrow(line.to_string()))?;
    let end = b.split_whitespace().next().unwrap_or("");
    let start = try_parse_timestamp(a)?;
    let end = try_parse_timestamp(end)?;
    Ok((start, end))
}
