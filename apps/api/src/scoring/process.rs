//! Runs the external scoring scripts.
//!
//! Each invocation is a fresh child (`<interpreter> <script> <args..>`).
//! stdout and stderr are drained concurrently until EOF before the exit
//! status is inspected. Only the last non-blank output line carries the
//! structured result; everything before it is diagnostics.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Max characters of output quoted in error messages.
const ERROR_TAIL_CHARS: usize = 800;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to start {script}: {source}")]
    Spawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running {script}: {source}")]
    Io {
        script: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{script} exited with status {code:?}: {tail}")]
    NonZeroExit {
        script: String,
        code: Option<i32>,
        tail: String,
    },

    #[error("{script} produced no output")]
    EmptyOutput { script: String },
}

/// Captured output of a finished script.
#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    /// The structured result: the last non-blank stdout line, or the last
    /// non-blank stderr line when stdout is blank.
    pub fn result_line(&self) -> Option<&str> {
        last_non_blank_line(&self.stdout).or_else(|| last_non_blank_line(&self.stderr))
    }

    /// stdout followed by stderr, for logs and error messages.
    pub fn merged(&self) -> String {
        match (self.stdout.trim().is_empty(), self.stderr.trim().is_empty()) {
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr.trim_end()),
            (false, true) => self.stdout.trim_end().to_string(),
            (true, _) => self.stderr.trim_end().to_string(),
        }
    }
}

pub fn last_non_blank_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|line| !line.is_empty())
}

/// Launches scripts through one interpreter.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    interpreter: PathBuf,
}

impl ScriptRunner {
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// Runs `script` with `args`, optionally feeding `stdin`, and returns its
    /// output. A non-zero exit status is an error.
    ///
    /// The child is killed if the returned future is dropped (e.g. on timeout).
    pub async fn run<A>(
        &self,
        script: &Path,
        args: &[A],
        stdin: Option<&[u8]>,
    ) -> Result<ScriptOutput, ScriptError>
    where
        A: AsRef<OsStr>,
    {
        let script_name = script.display().to_string();
        debug!(
            "Running {} {} ({} args)",
            self.interpreter.display(),
            script_name,
            args.len()
        );

        let mut child = Command::new(&self.interpreter)
            .arg(script)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ScriptError::Spawn {
                script: script_name.clone(),
                source,
            })?;

        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(mut pipe), Some(input)) = (pipe, stdin) {
                pipe.write_all(input).await?;
                pipe.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        // Feed stdin while draining both output pipes so neither side blocks.
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|source| ScriptError::Io {
            script: script_name.clone(),
            source,
        })?;

        let captured = ScriptOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !output.status.success() {
            return Err(ScriptError::NonZeroExit {
                script: script_name,
                code: output.status.code(),
                tail: tail(&captured.merged(), ERROR_TAIL_CHARS),
            });
        }

        if let Err(e) = fed {
            warn!("{script_name} exited before reading all of its input: {e}");
        }

        if captured.result_line().is_none() {
            return Err(ScriptError::EmptyOutput {
                script: script_name,
            });
        }

        debug!(
            "{script_name} finished: stdout={}B stderr={}B",
            output.stdout.len(),
            output.stderr.len()
        );
        Ok(captured)
    }
}

/// Last `max` characters of `text`.
fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    let skipped: String = text.chars().skip(count - max).collect();
    format!("...{skipped}")
}
