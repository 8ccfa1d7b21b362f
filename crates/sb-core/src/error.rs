//! Unified error type for streambox.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in streambox.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request data or arguments failed validation.
    #[error("{0}")]
    InvalidInput(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "video", "segment").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller did not present valid credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A directory walk failed. Scans are fail-fast, so no partial catalog
    /// accompanies this error.
    #[error("Scan failed at {path}: {message}")]
    Scan {
        /// The path the walker was visiting.
        path: String,
        /// Human-readable error description.
        message: String,
    },

    /// A long-running operation was cancelled (superseded scan, shutdown).
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Transcoding a single file failed.
    #[error("Transcode failed for {file}: {message}")]
    Transcode {
        /// The source file.
        file: String,
        /// Human-readable error description.
        message: String,
    },

    /// An external tool (ffmpeg, ffprobe) could not be run or exited non-zero.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Configuration or credentials could not be read or parsed.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Unauthorized(_) => 401,
            Error::Scan { .. } => 500,
            Error::Cancelled(_) => 409,
            Error::Transcode { .. } => 502,
            Error::Tool { .. } => 502,
            Error::Config(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound { .. } => "not_found",
            Error::Unauthorized(_) => "unauthorized",
            Error::Scan { .. } => "scan_failure",
            Error::Cancelled(_) => "cancelled",
            Error::Transcode { .. } => "transcode_failure",
            Error::Tool { .. } => "tool_error",
            Error::Config(_) => "config_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Scan`].
    pub fn scan(path: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::Scan {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Transcode`].
    pub fn transcode(file: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::Transcode {
            file: file.to_string(),
            message: message.into(),
        }
    }

    /// Map an I/O error on `path` to [`Error::NotFound`] when the file is
    /// missing, and to [`Error::Io`] otherwise.
    pub fn from_io(entity: &str, path: impl fmt::Display, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::not_found(entity, path)
        } else {
            Error::Io { source: err }
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
