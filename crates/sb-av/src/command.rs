//! Async runner for external tool invocations.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;

/// How many trailing stderr lines are kept in error messages. ffmpeg prints a
/// banner and progress lines before the actual failure reason.
const STDERR_TAIL_LINES: usize = 8;

/// Output captured from a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Builder for a single external process run.
///
/// The child is killed if the returned future is dropped or the timeout
/// fires, so a cancelled request never leaves an orphaned ffmpeg behind.
///
/// # Example
///
/// ```no_run
/// use sb_av::ToolCommand;
/// use std::time::Duration;
///
/// # async fn example() -> sb_core::Result<()> {
/// let output = ToolCommand::new("ffprobe")
///     .args(["-v", "quiet", "-print_format", "json", "-show_format"])
///     .arg("/media/clip.mp4")
///     .timeout(Duration::from_secs(30))
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Limit the run time. Without a timeout the command may run forever.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = Some(d);
        self
    }

    /// Arguments collected so far.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Short program name used in error messages and logs.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// Run the command and capture its output.
    ///
    /// Spawn failures, non-zero exits and timeouts are all reported as
    /// [`sb_core::Error::Tool`]; a non-zero exit includes the tail of stderr.
    pub async fn execute(&self) -> sb_core::Result<ToolOutput> {
        let tool = self.program_name();
        tracing::debug!(tool = %tool, args = ?self.args, "Running external tool");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| sb_core::Error::tool(&tool, format!("failed to spawn: {e}")))?;

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| sb_core::Error::tool(&tool, format!("timed out after {limit:?}")))?,
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|e| {
            sb_core::Error::tool(&tool, format!("I/O error waiting for process: {e}"))
        })?;

        let result = ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.status.success() {
            return Err(sb_core::Error::tool(
                tool,
                format!(
                    "exited with {}: {}",
                    result.status,
                    stderr_tail(&result.stderr, STDERR_TAIL_LINES)
                ),
            ));
        }

        Ok(result)
    }
}

/// Last `n` non-empty lines of `stderr`, joined with `" | "`.
fn stderr_tail(stderr: &str, n: usize) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join(" | ")
}
