//! A Coqui `tts-server` process that keeps one model loaded between requests.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, ChildStderr, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use reqwest::blocking::Client;

use super::EngineError;
use crate::VoiceSelection;

/// Covers a first-run model download as well as the load itself.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(900);
const POLL_INTERVAL: Duration = Duration::from_millis(500);
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(600);
const STDERR_TAIL_LINES: usize = 20;

/// HTTP side of a running model server.
#[derive(Debug, Clone)]
pub(crate) struct TtsApi {
    base_url: String,
    client: Client,
}

impl TtsApi {
    pub(crate) fn new(base_url: impl Into<String>) -> Result<Self, EngineError> {
        let client = Client::builder().timeout(SYNTHESIS_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    /// True once the server answers its index page.
    fn is_ready(&self) -> bool {
        self.client
            .get(&self.base_url)
            .timeout(POLL_INTERVAL * 4)
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    /// Synthesize `text` and return the WAV bytes the server produced.
    pub(crate) fn synthesize(&self, text: &str, voice: &VoiceSelection) -> Result<Vec<u8>, EngineError> {
        let mut query = vec![("text", text)];
        if let Some(speaker) = &voice.speaker {
            query.push(("speaker_id", speaker.as_str()));
        }
        if let Some(language) = &voice.language {
            query.push(("language_id", language.as_str()));
        }

        let response = self
            .client
            .get(format!("{}/api/tts", self.base_url))
            .query(&query)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EngineError::ServerFailed {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// The child process plus its API. Dropping it stops the server.
#[derive(Debug)]
pub(crate) struct CoquiServer {
    binary: String,
    child: Child,
    api: TtsApi,
    stderr_tail: Arc<Mutex<VecDeque<String>>>,
    stderr_reader: Option<JoinHandle<()>>,
}

impl CoquiServer {
    /// Launch `command` (a `tts-server` invocation) for `model` and block until
    /// it serves requests.
    pub(crate) fn start(mut command: Command, model: &str) -> Result<Self, EngineError> {
        let port = free_port()?;
        let binary = command.get_program().to_string_lossy().into_owned();
        let api = TtsApi::new(format!("http://localhost:{port}"))?;

        command
            .args(["--model_name", model, "--port", &port.to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        log::info!("Starting {binary} for {model} on port {port}");

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EngineError::BinaryNotFound(PathBuf::from(&binary))
            } else {
                EngineError::Io(e)
            }
        })?;

        let stderr_tail = Arc::new(Mutex::new(VecDeque::new()));
        let stderr_reader = child.stderr.take().map(|stderr| {
            let tail = Arc::clone(&stderr_tail);
            thread::spawn(move || forward_stderr(stderr, &tail))
        });

        let mut server = Self {
            binary,
            child,
            api,
            stderr_tail,
            stderr_reader,
        };
        server.wait_until_ready()?;
        Ok(server)
    }

    fn wait_until_ready(&mut self) -> Result<(), EngineError> {
        let started = Instant::now();
        loop {
            if let Some(status) = self.child.try_wait()? {
                if let Some(reader) = self.stderr_reader.take() {
                    // The pipe closes with the process, so this returns.
                    let _ = reader.join();
                }
                return Err(EngineError::CommandFailed {
                    binary: self.binary.clone(),
                    code: status.code(),
                    stderr: self.stderr_tail(),
                });
            }
            if self.api.is_ready() {
                log::info!(
                    "{} ready after {:.1}s",
                    self.binary,
                    started.elapsed().as_secs_f64()
                );
                return Ok(());
            }
            if started.elapsed() >= STARTUP_TIMEOUT {
                return Err(EngineError::ServerTimeout {
                    binary: self.binary.clone(),
                    secs: STARTUP_TIMEOUT.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// True when the process has died since it became ready.
    pub(crate) fn has_exited(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(Some(_)))
    }

    pub(crate) fn synthesize(&self, text: &str, voice: &VoiceSelection) -> Result<Vec<u8>, EngineError> {
        self.api.synthesize(text, voice)
    }

    fn stderr_tail(&self) -> String {
        self.stderr_tail
            .lock()
            .map(|tail| tail.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default()
    }
}

impl Drop for CoquiServer {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            log::info!("Stopping {}", self.binary);
            if let Err(e) = self.child.kill() {
                log::warn!("Failed to stop {}: {e}", self.binary);
            }
        }
        let _ = self.child.wait();
    }
}

/// Relay the server's log to ours and keep its last lines for error reports.
fn forward_stderr(stderr: ChildStderr, tail: &Mutex<VecDeque<String>>) {
    for line in BufReader::new(stderr).lines().map_while(Result::ok) {
        log::debug!(target: "tts_server", "{line}");
        if let Ok(mut tail) = tail.lock() {
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }
}

fn free_port() -> Result<u16, EngineError> {
    Ok(TcpListener::bind(("127.0.0.1", 0))?.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::{CoquiServer, TtsApi};
    use crate::{EngineError, VoiceSelection};
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::process::Command;
    use std::thread::{self, JoinHandle};

    /// Answer one HTTP request with `response` and hand back its request line.
    fn serve_once(response: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut header = String::new();
            while reader.read_line(&mut header).unwrap() > 2 {
                header.clear();
            }
            reader.get_mut().write_all(response.as_bytes()).unwrap();
            request_line
        });
        (url, handle)
    }

    #[test]
    fn sends_text_and_voice_as_query_and_returns_audio() {
        let (url, handle) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: audio/wav\r\nContent-Length: 4\r\nConnection: close\r\n\r\nRIFF",
        );
        let api = TtsApi::new(url).unwrap();

        let audio = api
            .synthesize("Hola mundo", &VoiceSelection::new("Sofia Hellen", "es"))
            .unwrap();
        assert_eq!(audio, b"RIFF");

        let request_line = handle.join().unwrap();
        assert!(request_line.starts_with("GET /api/tts?"));
        assert!(request_line.contains("text=Hola+mundo"));
        assert!(request_line.contains("speaker_id=Sofia+Hellen"));
        assert!(request_line.contains("language_id=es"));
    }

    #[test]
    fn single_speaker_requests_omit_voice_parameters() {
        let (url, handle) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let api = TtsApi::new(url).unwrap();
        api.synthesize("Hi", &VoiceSelection::default()).unwrap();

        let request_line = handle.join().unwrap();
        assert!(!request_line.contains("speaker_id"));
        assert!(!request_line.contains("language_id"));
    }

    #[test]
    fn server_errors_carry_status_and_body() {
        let (url, handle) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\nConnection: close\r\n\r\nboom\n",
        );
        let api = TtsApi::new(url).unwrap();

        let err = api.synthesize("Hi", &VoiceSelection::default()).unwrap_err();
        handle.join().unwrap();
        match err {
            EngineError::ServerFailed { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_server_binary_is_reported_by_name() {
        let err = CoquiServer::start(Command::new("definitely-not-a-real-tts-server"), "m").unwrap_err();
        assert!(matches!(err, EngineError::BinaryNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn server_that_exits_during_startup_reports_its_exit() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo 'model not found' >&2; exit 4", "tts-server"]);

        let err = CoquiServer::start(command, "tts_models/none").unwrap_err();
        match err {
            EngineError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(4));
                assert_eq!(stderr, "model not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
