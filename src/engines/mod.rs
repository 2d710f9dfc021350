//! Speech synthesis engines.
//!
//! The speech model is never run in-process: each engine drives an external
//! command-line tool and lets it write the WAV file.
//!
//! # Available Engines
//!
//! - [`coqui`] - Coqui TTS, with the model held resident by `tts-server`
//! - [`espeak`] - espeak-ng formant synthesis (small, offline, always available)

pub mod coqui;
mod coqui_server;
pub mod espeak;

use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{0}' not found. Install it or point the engine at the binary with --binary.")]
    BinaryNotFound(PathBuf),
    #[error("{binary} exited with code {code:?}: {stderr}")]
    CommandFailed {
        binary: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("No models reported by the engine")]
    NoModels,
    #[error("Engine did not write an audio file at {0}")]
    MissingOutput(PathBuf),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Model server answered {status}: {body}")]
    ServerFailed { status: u16, body: String },
    #[error("{binary} did not become ready within {secs}s")]
    ServerTimeout { binary: String, secs: u64 },
}

/// Run an external tool to completion and return its stdout.
///
/// `stdin`, when given, is written newline-terminated; line-oriented tools
/// under-process an unterminated final line.
pub(crate) fn run_tool<I, S>(
    binary: &Path,
    args: I,
    stdin: Option<&str>,
) -> Result<String, EngineError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(binary);
    command.args(args);
    run_command(command, stdin)
}

/// [`run_tool`] for a command whose arguments and environment are already set.
pub(crate) fn run_command(mut command: Command, stdin: Option<&str>) -> Result<String, EngineError> {
    let binary = PathBuf::from(command.get_program());
    command
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    log::debug!("Running {command:?}");

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            EngineError::BinaryNotFound(binary.clone())
        } else {
            EngineError::Io(e)
        }
    })?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(newline_terminated(input).as_bytes())?;
    }

    let output = child.wait_with_output()?;

    if !output.status.success() {
        return Err(EngineError::CommandFailed {
            binary: binary.display().to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn newline_terminated(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

/// Check that an engine actually produced the file it was asked for.
pub(crate) fn ensure_written(path: &Path) -> Result<(), EngineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(EngineError::MissingOutput(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::{newline_terminated, run_tool, EngineError};
    use std::path::Path;

    #[test]
    fn appends_trailing_newline_for_stdin() {
        assert_eq!(newline_terminated("America"), "America\n");
    }

    #[test]
    fn keeps_single_trailing_newline_for_stdin() {
        assert_eq!(newline_terminated("America\n"), "America\n");
    }

    #[test]
    fn missing_binary_is_reported_by_name() {
        let err = run_tool(
            Path::new("definitely-not-a-real-tts-binary"),
            ["--version"],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::BinaryNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_carries_stderr() {
        let err = run_tool(Path::new("sh"), ["-c", "echo boom >&2; exit 3"], None).unwrap_err();
        match err {
            EngineError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn stdin_is_forwarded() {
        let out = run_tool(Path::new("cat"), std::iter::empty::<&str>(), Some("hello")).unwrap();
        assert_eq!(out, "hello\n");
    }
}
