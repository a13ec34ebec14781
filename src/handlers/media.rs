//! Limpieza de contenedores de audio y video delegada en ffmpeg.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{HandlerKind, ScrubHandler, Scrubbed};
use crate::config::DEFAULT_TOOL_TIMEOUT_SECS;
use crate::error::HandlerError;
use crate::result::ErrorCategory;

const DEFAULT_TOOL: &str = "ffmpeg";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const MEDIA_EXTENSIONS: &[&str] = &[
    // video
    "mp4", "mov", "mkv", "avi", "m4v", "webm", "mpg", "mpeg",
    // audio
    "mp3", "wav", "flac", "m4a", "aac", "ogg", "opus",
];

#[derive(Clone, Debug)]
pub struct MediaHandler {
    tool: PathBuf,
    timeout: Duration,
}

impl Default for MediaHandler {
    fn default() -> Self {
        Self::new(None, Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS))
    }
}

impl MediaHandler {
    /// `tool` sustituye al `ffmpeg` del `PATH`; `timeout` acota cada ejecución.
    pub fn new(tool: Option<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool: tool.unwrap_or_else(|| PathBuf::from(DEFAULT_TOOL)),
            timeout,
        }
    }

    fn tool_name(&self) -> String {
        self.tool
            .file_name()
            .unwrap_or(self.tool.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    fn resolve_tool(&self) -> Result<PathBuf, HandlerError> {
        which::which(&self.tool).map_err(|error| HandlerError::MissingDependency {
            tool: self.tool_name(),
            detail: format!("{} ({error})", self.tool.display()),
        })
    }

    fn spawn(&self, program: &Path, input: &Path, staging: &Path) -> Result<Child, HandlerError> {
        Command::new(program)
            .args(["-y", "-hide_banner", "-loglevel", "error", "-i"])
            .arg(input)
            .args(["-map_metadata", "-1", "-map_chapters", "-1", "-c", "copy"])
            .arg(staging)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| match error.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    HandlerError::MissingDependency {
                        tool: self.tool_name(),
                        detail: format!("failed to start {}: {error}", program.display()),
                    }
                }
                _ => HandlerError::io(program, error),
            })
    }

    /// Espera a que termine el proceso o lo mata al vencer el plazo.
    fn wait_bounded(&self, child: &mut Child) -> Result<(ExitStatus, String), HandlerError> {
        let mut stderr = child.stderr.take();
        let collector = thread::spawn(move || {
            let mut output = String::new();
            if let Some(stream) = stderr.as_mut() {
                let _ = stream.read_to_string(&mut output);
            }
            output
        });

        // Un plazo que no cabe en `Instant` equivale a esperar sin límite.
        let deadline = Instant::now().checked_add(self.timeout);
        let status = loop {
            let polled = child
                .try_wait()
                .map_err(|error| HandlerError::Processing(format!("failed to wait for tool: {error}")))?;

            match polled {
                Some(status) => break status,
                None if deadline.is_some_and(|deadline| Instant::now() >= deadline) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!(tool = %self.tool.display(), timeout = ?self.timeout, "external tool killed");
                    return Err(HandlerError::Timeout {
                        tool: self.tool_name(),
                        after: self.timeout,
                    });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let stderr = collector.join().unwrap_or_default();
        Ok((status, stderr))
    }
}

impl ScrubHandler for MediaHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::AudioVideo
    }

    fn extensions(&self) -> &[&'static str] {
        MEDIA_EXTENSIONS
    }

    fn removed_summary(&self) -> &'static str {
        "Container metadata stripped via ffmpeg"
    }

    fn scrub(&self, input: &Path, staging: &Path) -> Result<Scrubbed, HandlerError> {
        let program = self.resolve_tool()?;
        debug!(tool = %program.display(), input = %input.display(), "running external tool");

        let mut child = self.spawn(&program, input, staging)?;
        let (status, stderr) = self.wait_bounded(&mut child)?;

        if !status.success() {
            return Err(classify_failure(&self.tool_name(), stderr.trim()));
        }

        Ok(Scrubbed::new(self.removed_summary()))
    }
}

/// Traduce la salida de error de ffmpeg a una categoría y una sugerencia.
fn classify_failure(tool: &str, stderr: &str) -> HandlerError {
    let (category, fix_hint) = if stderr.contains("No such file") || stderr.contains("does not exist")
    {
        (
            ErrorCategory::InputError,
            "Verify input file exists and path is correct",
        )
    } else if stderr.contains("Permission denied") {
        (
            ErrorCategory::PermissionError,
            "Check file permissions or run with appropriate privileges",
        )
    } else if stderr.contains("Invalid data") || stderr.contains("moov atom not found") {
        (
            ErrorCategory::InputError,
            "File may be corrupted or not a valid media file",
        )
    } else if stderr.contains("Codec") || stderr.contains("not supported") {
        (
            ErrorCategory::ProcessingError,
            "This media format may not be fully supported by ffmpeg",
        )
    } else {
        (
            ErrorCategory::ProcessingError,
            "Check ffmpeg output for details",
        )
    };

    let message = if stderr.is_empty() {
        format!("{tool} failed to scrub metadata")
    } else {
        stderr.to_string()
    };

    HandlerError::categorized(category, message, fix_hint)
}
