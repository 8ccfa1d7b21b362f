//! HLS transcoding with ffmpeg.
//!
//! Each source file becomes `<base>.m3u8` plus `<base>_000.ts`,
//! `<base>_001.ts`, ... in its output directory. A batch keeps going when a
//! single file fails and reports every failure at the end.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::command::ToolCommand;
use crate::tools::{Tool, ToolRegistry};

/// Encoder settings passed to ffmpeg for every file.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeProfile {
    pub video_profile: String,
    pub crf: u32,
    pub gop: u32,
    pub sc_threshold: u32,
    pub segment_secs: u32,
    pub playlist_type: String,
    pub timeout: Option<Duration>,
}

impl TranscodeProfile {
    pub fn from_config(config: &sb_core::config::TranscodeConfig) -> Self {
        Self {
            video_profile: config.video_profile.clone(),
            crf: config.crf,
            gop: config.gop,
            sc_threshold: config.sc_threshold,
            segment_secs: config.segment_secs,
            playlist_type: config.playlist_type.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Full ffmpeg argument list for one file.
    pub fn ffmpeg_args(&self, input: &Path, output_dir: &Path, base_name: &str) -> Vec<String> {
        let segment_pattern = output_dir.join(format!("{base_name}_%03d.ts"));
        let playlist = output_dir.join(format!("{base_name}.m3u8"));

        let mut args = vec!["-nostdin".to_string(), "-y".to_string()];
        let mut push = |flag: &str, value: String| {
            args.push(flag.to_string());
            args.push(value);
        };
        push("-i", input.to_string_lossy().into_owned());
        push("-c:v", "libx264".into());
        push("-profile:v", self.video_profile.clone());
        push("-crf", self.crf.to_string());
        push("-g", self.gop.to_string());
        push("-sc_threshold", self.sc_threshold.to_string());
        push("-c:a", "aac".into());
        push("-f", "hls".into());
        push("-hls_time", self.segment_secs.to_string());
        push("-hls_playlist_type", self.playlist_type.clone());
        push(
            "-hls_segment_filename",
            segment_pattern.to_string_lossy().into_owned(),
        );
        args.push(playlist.to_string_lossy().into_owned());
        args
    }
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self::from_config(&sb_core::config::TranscodeConfig::default())
    }
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Relative paths that transcoded cleanly.
    pub succeeded: Vec<String>,
    /// Relative paths that failed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Transcode a single file into `output_dir`.
pub async fn transcode_file(
    ffmpeg: &Path,
    profile: &TranscodeProfile,
    input: &Path,
    output_dir: &Path,
    base_name: &str,
) -> sb_core::Result<()> {
    let mut cmd = ToolCommand::new(ffmpeg);
    cmd.args(profile.ffmpeg_args(input, output_dir, base_name));
    if let Some(limit) = profile.timeout {
        cmd.timeout(limit);
    }

    cmd.execute()
        .await
        .map_err(|e| sb_core::Error::transcode(input.display(), e.to_string()))?;
    Ok(())
}

/// Transcode every path in `sources` (relative to `input_root`), mirroring the
/// directory layout under `output_root`.
///
/// Fails up front only if ffmpeg is unavailable; per-file problems, including
/// failing to create an output directory, are collected in the report.
pub async fn transcode_batch(
    tools: &ToolRegistry,
    profile: &TranscodeProfile,
    input_root: &Path,
    sources: &[String],
    output_root: &Path,
) -> sb_core::Result<BatchReport> {
    let ffmpeg = tools.require(Tool::Ffmpeg)?;
    let mut report = BatchReport::default();

    for (i, source) in sources.iter().enumerate() {
        tracing::info!("[{}/{}] Transcoding {source}", i + 1, sources.len());

        match transcode_one(ffmpeg, profile, input_root, source, output_root).await {
            Ok(()) => report.succeeded.push(source.clone()),
            Err(e) => {
                tracing::warn!("Transcode failed for {source}: {e}");
                report.failed.push((source.clone(), e.to_string()));
            }
        }
    }

    tracing::info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Transcode batch finished"
    );
    Ok(report)
}

async fn transcode_one(
    ffmpeg: &Path,
    profile: &TranscodeProfile,
    input_root: &Path,
    source: &str,
    output_root: &Path,
) -> sb_core::Result<()> {
    let input = sb_core::paths::safe_join(input_root, source)?;
    let mirrored = sb_core::paths::safe_join(output_root, source)?;

    let base_name = mirrored
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| sb_core::Error::InvalidInput(format!("no file name in {source}")))?;
    let output_dir: PathBuf = mirrored
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| output_root.to_path_buf());

    tokio::fs::create_dir_all(&output_dir).await.map_err(|e| {
        sb_core::Error::transcode(
            source,
            format!("failed to create {}: {e}", output_dir.display()),
        )
    })?;

    transcode_file(ffmpeg, profile, &input, &output_dir, &base_name).await
}
