use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "streambox")]
#[command(author, version, about = "Serve a directory of videos as an M3U playlist over HTTP")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a directory and serve its videos
    Serve {
        /// Directory to serve (overrides catalog.root)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Host advertised in playlist URLs (defaults to the outbound IP)
        #[arg(long)]
        public_host: Option<String>,

        /// Require the stored basic-auth credentials
        #[arg(long)]
        auth: bool,

        /// Sort key: name, size, duration or none
        #[arg(long)]
        sort: Option<String>,

        /// Sort order: desc or asc
        #[arg(long)]
        order: Option<String>,

        /// Probe durations with ffprobe while scanning
        #[arg(long)]
        probe: bool,
    },

    /// Scan a directory and print the catalog
    Scan {
        /// Directory to scan
        #[arg(short, long, required = true)]
        dir: PathBuf,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Sort key: name, size, duration or none
        #[arg(long)]
        sort: Option<String>,

        /// Sort order: desc or asc
        #[arg(long)]
        order: Option<String>,

        /// Probe durations with ffprobe
        #[arg(long)]
        probe: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Transcode every video under a directory into HLS segment sets
    Transcode {
        /// Source directory (scanned recursively)
        #[arg(short, long, required = true)]
        dir: PathBuf,

        /// Output directory; the source tree is mirrored beneath it
        #[arg(short, long, required = true)]
        output: PathBuf,
    },

    /// Store basic-auth credentials for `serve --auth`
    BasicAuth {
        #[arg(long)]
        username: String,

        #[arg(long)]
        password: String,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
