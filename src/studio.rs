//! Interactive orchestration: the two studio actions and their shared session.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::catalog::VoiceCatalog;
use crate::synthesis::{self, SynthesisRequest, SynthesisResult};
use crate::waveform::{self, WaveformOptions};
use crate::SynthesisEngine;

/// File name of the interactive flow's audio.
pub const SPEECH_FILE: &str = "generated_speech.wav";
/// File name of the interactive flow's waveform plot.
pub const WAVEFORM_FILE: &str = "waveform.png";

pub const EMPTY_TEXT_PROMPT: &str = "Please enter some text to generate speech.";
pub const SPEECH_SUCCESS: &str = "Speech generation successful!";
pub const NO_AUDIO_FOR_WAVEFORM: &str = "No valid audio file found to generate waveform.";
pub const WAVEFORM_SUCCESS: &str = "Waveform generated successfully!";

/// What the last successful synthesis left behind for the waveform action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    last_audio: Option<PathBuf>,
    last_text: String,
}

impl Session {
    pub fn last_audio(&self) -> Option<&Path> {
        self.last_audio.as_deref()
    }

    pub fn last_text(&self) -> &str {
        &self.last_text
    }

    /// Overwrite both references with the newest synthesis.
    pub fn record(&mut self, audio: &Path, text: &str) {
        self.last_audio = Some(audio.to_path_buf());
        self.last_text = text.to_string();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StudioState {
    Idle,
    AwaitingText,
    Synthesizing,
    Ready,
    Rendering,
    WaveformReady,
}

/// Result of the "Generate Speech" action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeechOutcome {
    pub audio_path: Option<PathBuf>,
    pub info: String,
    pub status: String,
    pub waveform_enabled: bool,
    #[serde(skip)]
    pub result: Option<SynthesisResult>,
}

/// Result of the "Generate Waveform" action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaveformOutcome {
    pub image_path: Option<PathBuf>,
    pub status: String,
}

/// The interactive studio: one engine, one catalog, one session.
///
/// Actions run one at a time; callers that share a studio across threads
/// serialise access themselves.
pub struct Studio {
    engine: Box<dyn SynthesisEngine>,
    catalog: VoiceCatalog,
    output_dir: PathBuf,
    waveform_options: WaveformOptions,
    session: Session,
    state: StudioState,
}

impl Studio {
    /// Create a studio whose catalog is discovered from `engine`.
    pub fn new(mut engine: Box<dyn SynthesisEngine>, output_dir: &Path) -> Self {
        let catalog = VoiceCatalog::discover(engine.as_mut());
        Self::with_catalog(engine, catalog, output_dir)
    }

    pub fn with_catalog(
        engine: Box<dyn SynthesisEngine>,
        catalog: VoiceCatalog,
        output_dir: &Path,
    ) -> Self {
        Self {
            engine,
            catalog,
            output_dir: output_dir.to_path_buf(),
            waveform_options: WaveformOptions::default(),
            session: Session::default(),
            state: StudioState::Idle,
        }
    }

    pub fn with_waveform_options(mut self, options: WaveformOptions) -> Self {
        self.waveform_options = options;
        self
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> StudioState {
        self.state
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn speech_path(&self) -> PathBuf {
        self.output_dir.join(SPEECH_FILE)
    }

    pub fn waveform_path(&self) -> PathBuf {
        self.output_dir.join(WAVEFORM_FILE)
    }

    /// The "Generate Speech" action.
    ///
    /// Never fails: empty text yields the prompt, engine or I/O failures are
    /// reported in `status`.
    pub fn generate_speech(&mut self, text: &str, speaker: &str, language: &str) -> SpeechOutcome {
        if text.is_empty() {
            if self.state == StudioState::Idle {
                self.state = StudioState::AwaitingText;
            }
            return SpeechOutcome {
                audio_path: None,
                info: EMPTY_TEXT_PROMPT.to_string(),
                status: String::new(),
                waveform_enabled: false,
                result: None,
            };
        }

        let previous = self.state;
        self.state = StudioState::Synthesizing;
        let request = SynthesisRequest::new(text, speaker, language);
        let path = self.speech_path();

        match synthesis::synthesize(self.engine.as_mut(), &self.catalog, &request, &path) {
            Ok(result) => {
                self.session.record(&result.audio_path, text);
                self.state = StudioState::Ready;
                SpeechOutcome {
                    audio_path: Some(result.audio_path.clone()),
                    info: result.summary(),
                    status: SPEECH_SUCCESS.to_string(),
                    waveform_enabled: true,
                    result: Some(result),
                }
            }
            Err(e) => {
                log::error!("Speech generation failed: {e}");
                self.state = previous;
                SpeechOutcome {
                    audio_path: None,
                    info: String::new(),
                    status: format!("Speech generation failed: {e}"),
                    waveform_enabled: self.session.last_audio().is_some(),
                    result: None,
                }
            }
        }
    }

    /// The "Generate Waveform" action, plotting the session's last audio.
    pub fn generate_waveform(&mut self) -> WaveformOutcome {
        let previous = self.state;
        self.state = StudioState::Rendering;
        let path = self.waveform_path();

        match waveform::render_waveform(&self.session, &path, &self.waveform_options) {
            Ok(Some(artifact)) => {
                self.state = StudioState::WaveformReady;
                WaveformOutcome {
                    image_path: Some(artifact.image_path),
                    status: WAVEFORM_SUCCESS.to_string(),
                }
            }
            Ok(None) => {
                self.state = previous;
                WaveformOutcome {
                    image_path: None,
                    status: NO_AUDIO_FOR_WAVEFORM.to_string(),
                }
            }
            Err(e) => {
                log::error!("Waveform generation failed: {e}");
                self.state = previous;
                WaveformOutcome {
                    image_path: None,
                    status: format!("Waveform generation failed: {e}"),
                }
            }
        }
    }
}
