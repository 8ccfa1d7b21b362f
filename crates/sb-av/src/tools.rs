//! External tool discovery.
//!
//! The [`ToolRegistry`] resolves `ffmpeg` and `ffprobe` once at startup, either
//! from explicit config paths or from `PATH`, and hands out their locations.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::command::ToolCommand;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Tools streambox knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::Ffmpeg, Tool::Ffprobe];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Availability report for one tool, as printed by `streambox check-tools`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub tool: Tool,
    pub available: bool,
    /// First line of `-version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Resolved tool locations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<Tool, PathBuf>,
}

impl ToolRegistry {
    /// Resolve every known tool.
    ///
    /// A configured path is used when it exists; otherwise (or if it is
    /// missing) the tool is looked up on `PATH`. Tools that cannot be found
    /// are left out.
    pub fn discover(config: &sb_core::config::ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for tool in Tool::ALL {
            let configured = match tool {
                Tool::Ffmpeg => config.ffmpeg_path.as_deref(),
                Tool::Ffprobe => config.ffprobe_path.as_deref(),
            };

            let resolved = match configured {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        "Configured {tool} path {} does not exist; searching PATH",
                        p.display()
                    );
                    which::which(tool.name()).ok()
                }
                None => which::which(tool.name()).ok(),
            };

            match resolved {
                Some(path) => {
                    tracing::debug!("Found {tool} at {}", path.display());
                    tools.insert(tool, path);
                }
                None => tracing::debug!("{tool} not found"),
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit paths without touching `PATH`.
    pub fn with_paths(paths: impl IntoIterator<Item = (Tool, PathBuf)>) -> Self {
        Self {
            tools: paths.into_iter().collect(),
        }
    }

    /// Path to `tool`, or [`sb_core::Error::Tool`] if it was not found.
    pub fn require(&self, tool: Tool) -> sb_core::Result<&Path> {
        self.tools.get(&tool).map(PathBuf::as_path).ok_or_else(|| {
            sb_core::Error::tool(
                tool.name(),
                format!("{tool} not found; is it installed and in PATH?"),
            )
        })
    }

    pub fn is_available(&self, tool: Tool) -> bool {
        self.tools.contains_key(&tool)
    }

    /// Report availability and version of every known tool.
    pub async fn check_all(&self) -> Vec<ToolInfo> {
        let mut infos = Vec::with_capacity(Tool::ALL.len());
        for tool in Tool::ALL {
            let info = match self.tools.get(&tool) {
                Some(path) => ToolInfo {
                    tool,
                    available: true,
                    version: detect_version(path).await,
                    path: Some(path.clone()),
                },
                None => ToolInfo {
                    tool,
                    available: false,
                    version: None,
                    path: None,
                },
            };
            infos.push(info);
        }
        infos
    }
}

/// First line of `<tool> -version`.
async fn detect_version(path: &Path) -> Option<String> {
    let output = ToolCommand::new(path)
        .arg("-version")
        .timeout(VERSION_TIMEOUT)
        .execute()
        .await
        .ok()?;

    output.stdout.lines().next().map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_core::config::ToolsConfig;

    #[test]
    fn discover_with_default_config() {
        // Nothing is guaranteed to be installed, but discovery must not panic.
        let registry = ToolRegistry::discover(&ToolsConfig::default());
        let _ = registry.is_available(Tool::Ffmpeg);
    }

    #[test]
    fn missing_configured_path_falls_back() {
        let cfg = ToolsConfig {
            ffmpeg_path: Some(PathBuf::from("/nonexistent/bin/ffmpeg")),
            ffprobe_path: None,
        };
        let registry = ToolRegistry::discover(&cfg);
        if let Ok(path) = registry.require(Tool::Ffmpeg) {
            assert_ne!(path, Path::new("/nonexistent/bin/ffmpeg"));
        }
    }

    #[test]
    fn configured_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("my-ffprobe");
        std::fs::write(&fake, b"").unwrap();

        let cfg = ToolsConfig {
            ffmpeg_path: None,
            ffprobe_path: Some(fake.clone()),
        };
        let registry = ToolRegistry::discover(&cfg);
        assert_eq!(registry.require(Tool::Ffprobe).unwrap(), fake.as_path());
    }

    #[test]
    fn require_missing_tool_returns_error() {
        let registry = ToolRegistry::with_paths([]);
        let err = registry.require(Tool::Ffmpeg).unwrap_err();
        assert!(matches!(err, sb_core::Error::Tool { ref tool, .. } if tool == "ffmpeg"));
    }

    #[tokio::test]
    async fn check_all_lists_every_tool() {
        let registry = ToolRegistry::with_paths([]);
        let infos = registry.check_all().await;
        let tools: Vec<Tool> = infos.iter().map(|i| i.tool).collect();
        assert_eq!(tools, vec![Tool::Ffmpeg, Tool::Ffprobe]);
        assert!(infos.iter().all(|i| !i.available));
    }

    #[test]
    fn tool_info_serializes_lowercase_name() {
        let info = ToolInfo {
            tool: Tool::Ffprobe,
            available: false,
            version: None,
            path: None,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["tool"], "ffprobe");
    }
}
