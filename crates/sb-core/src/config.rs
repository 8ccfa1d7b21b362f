//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! server, catalog, auth, cache, tool and transcode sections. Every section
//! defaults sensibly so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{SortKey, SortOrder};
use crate::error::Result;
use crate::Error;

/// Locations searched, in order, when no explicit config path is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "./streambox.toml",
    "~/.config/streambox/config.toml",
    "/etc/streambox/config.toml",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub tools: ToolsConfig,
    pub transcode: TranscodeConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Load configuration from a file. Unlike [`Config::load_or_default`],
    /// a missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Load from `custom` if given, otherwise from the first existing default
    /// location, otherwise return defaults.
    pub fn load_or_default(custom: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom {
            return Self::load(path);
        }

        for path_str in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path_str);
            let path = Path::new(expanded.as_ref());
            if path.exists() {
                tracing::debug!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.server.shutdown_grace_secs == 0 {
            warnings.push(
                "server.shutdown_grace_secs is 0; open connections are dropped immediately on shutdown"
                    .into(),
            );
        }

        if let Some(ref root) = self.catalog.root {
            if !root.is_dir() {
                warnings.push(format!(
                    "catalog.root {} is not a directory",
                    root.display()
                ));
            }
        }

        if self.cache.cleanup_interval_secs == 0 {
            warnings.push("cache.cleanup_interval_secs is 0; the sweeper will run every second".into());
        }

        if self.cache.playlist_ttl_secs == 0 {
            warnings.push("cache.playlist_ttl_secs is 0; playlists are never cached".into());
        }

        if self.transcode.crf > 51 {
            warnings.push(format!(
                "transcode.crf {} is outside the x264 range 0-51",
                self.transcode.crf
            ));
        }

        if self.transcode.segment_secs == 0 {
            warnings.push("transcode.segment_secs must be at least 1".into());
        }

        let profiles = ["baseline", "main", "high"];
        if !profiles.contains(&self.transcode.video_profile.as_str()) {
            warnings.push(format!(
                "transcode.video_profile '{}' is not a recognized profile (valid: {})",
                self.transcode.video_profile,
                profiles.join(", ")
            ));
        }

        for (name, path) in [
            ("ffmpeg_path", &self.tools.ffmpeg_path),
            ("ffprobe_path", &self.tools.ffprobe_path),
        ] {
            if let Some(p) = path {
                if !p.exists() {
                    warnings.push(format!("tools.{name} {} does not exist", p.display()));
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Host advertised in playlist URLs. Discovered from the outbound
    /// interface when unset.
    pub public_host: Option<String>,
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8069,
            public_host: None,
            shutdown_grace_secs: 5,
        }
    }
}

/// What to scan and how to order it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub root: Option<PathBuf>,
    pub recursive: bool,
    pub sort: SortKey,
    pub order: SortOrder,
    pub probe_durations: bool,
}

/// Basic-auth settings. The credentials themselves live in a separate file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub credentials_path: Option<PathBuf>,
}

/// Playlist cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub playlist_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            playlist_ttl_secs: 30,
            cleanup_interval_secs: 60,
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}

/// HLS transcode profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeConfig {
    pub video_profile: String,
    pub crf: u32,
    /// Keyframe interval in frames.
    pub gop: u32,
    pub sc_threshold: u32,
    pub segment_secs: u32,
    pub playlist_type: String,
    /// Per-file ffmpeg timeout. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            video_profile: "main".into(),
            crf: 23,
            gop: 60,
            sc_threshold: 0,
            segment_secs: 6,
            playlist_type: "vod".into(),
            timeout_secs: None,
        }
    }
}
