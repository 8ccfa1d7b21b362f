//! Media duration lookup via `ffprobe`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::command::ToolCommand;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Ask `ffprobe` for the container duration of `file`, in seconds.
///
/// Returns `Ok(None)` when ffprobe ran but reported no usable duration.
pub async fn probe_duration(ffprobe: &Path, file: &Path) -> sb_core::Result<Option<f64>> {
    let output = ToolCommand::new(ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(file.to_string_lossy())
        .timeout(PROBE_TIMEOUT)
        .execute()
        .await?;

    parse_duration(&output.stdout)
}

/// Extract `format.duration` from ffprobe JSON output.
pub fn parse_duration(json: &str) -> sb_core::Result<Option<f64>> {
    let parsed: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| sb_core::Error::tool("ffprobe", format!("JSON parse error: {e}")))?;

    let duration = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0);

    Ok(duration)
}
