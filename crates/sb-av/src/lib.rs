//! # sb-av
//!
//! External audio/video tooling for streambox.
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- locate ffmpeg and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async process runner with
//!   optional timeout.
//! - **Probing** ([`probe`]) -- container duration via ffprobe.
//! - **Transcoding** ([`transcode`]) -- HLS segment sets via ffmpeg, one file
//!   or a whole batch.

pub mod command;
pub mod probe;
pub mod tools;
pub mod transcode;

pub use command::{ToolCommand, ToolOutput};
pub use probe::probe_duration;
pub use tools::{Tool, ToolInfo, ToolRegistry};
pub use transcode::{transcode_batch, transcode_file, BatchReport, TranscodeProfile};
