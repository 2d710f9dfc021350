//! Coqui TTS engine.
//!
//! The model is loaded once into a `tts-server` process that lives as long as
//! the engine; each synthesis is one HTTP request to it. Model, speaker and
//! language listings go through the `tts` command-line tool.
//!
//! # System Requirements
//!
//! Coqui's `tts` and `tts-server` commands must be installed (`pip install TTS`)
//! and on PATH, or passed explicitly with [`CoquiEngine::with_binary`] and
//! [`CoquiEngine::with_server_binary`]. Models are downloaded by Coqui itself
//! on first use.
//!
//! Some models (XTTS among them) ask for agreement to the Coqui Public Model
//! License before their first download. Neither tool gets a terminal here, so
//! either export `COQUI_TOS_AGREED=1` or enable
//! [`CoquiEngine::accept_license`], which sets it for every Coqui process.
//!
//! # Model Names
//!
//! Models use Coqui's `type/language/dataset/model` naming, e.g.
//! `tts_models/multilingual/multi-dataset/xtts_v2`. Only `tts_models/*`
//! entries can synthesize; vocoder models are skipped by [`list_models`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tts_studio::{SynthesisEngine, VoiceSelection, engines::coqui::CoquiEngine};
//!
//! let mut engine = CoquiEngine::with_first_model()?;
//! engine.prepare()?; // loads the model, once
//! let voice = VoiceSelection::new("Daisy Studious", "en");
//! engine.synthesize_to_file("Hello, world!", &voice, Path::new("out.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;

use super::coqui_server::CoquiServer;
use super::{ensure_written, run_command, EngineError};
use crate::{SynthesisEngine, VoiceSelection};

/// Default name of the Coqui command-line tool.
pub const DEFAULT_BINARY: &str = "tts";
/// Default name of Coqui's model server.
pub const DEFAULT_SERVER_BINARY: &str = "tts-server";
/// Environment variable Coqui reads as agreement to its model license.
pub const LICENSE_ENV: &str = "COQUI_TOS_AGREED";

/// Coqui text-to-speech engine bound to one model.
#[derive(Debug)]
pub struct CoquiEngine {
    binary: PathBuf,
    server_binary: PathBuf,
    model: String,
    accept_license: bool,
    speakers: Option<Vec<String>>,
    languages: Option<Vec<String>>,
    server: Option<CoquiServer>,
}

impl CoquiEngine {
    /// Create an engine for `model` using `tts` from PATH.
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_binary(PathBuf::from(DEFAULT_BINARY), model)
    }

    /// Create an engine for `model` with an explicit `tts` binary.
    pub fn with_binary(binary: PathBuf, model: impl Into<String>) -> Self {
        Self {
            binary,
            server_binary: PathBuf::from(DEFAULT_SERVER_BINARY),
            model: model.into(),
            accept_license: false,
            speakers: None,
            languages: None,
            server: None,
        }
    }

    /// Use an explicit `tts-server` binary.
    pub fn with_server_binary(mut self, server_binary: PathBuf) -> Self {
        self.server_binary = server_binary;
        self
    }

    /// Agree to the Coqui model license on the user's behalf.
    pub fn accept_license(mut self, accept: bool) -> Self {
        self.accept_license = accept;
        self
    }

    /// Create an engine for the first model Coqui lists.
    pub fn with_first_model() -> Result<Self, EngineError> {
        let binary = PathBuf::from(DEFAULT_BINARY);
        let model = first_model(&binary)?;
        Ok(Self::with_binary(binary, model))
    }

    /// The model this engine synthesizes with.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn query_ids(&self, flag: &str) -> Result<Vec<String>, EngineError> {
        let mut command = coqui_command(&self.binary, self.accept_license);
        command.args(["--model_name", self.model.as_str(), flag]);
        let output = run_command(command, None)?;
        Ok(parse_id_listing(&output))
    }

    /// The running model server, started (or restarted after a crash) on demand.
    fn server(&mut self) -> Result<&CoquiServer, EngineError> {
        if let Some(server) = self.server.as_mut() {
            if server.has_exited() {
                log::warn!("Coqui server for {} exited; restarting", self.model);
                self.server = None;
            }
        }
        let server = match self.server.take() {
            Some(server) => server,
            None => CoquiServer::start(
                coqui_command(&self.server_binary, self.accept_license),
                &self.model,
            )?,
        };
        Ok(self.server.insert(server))
    }
}

/// A Coqui tool invocation with the license agreement applied when accepted.
fn coqui_command(binary: &Path, accept_license: bool) -> Command {
    let mut command = Command::new(binary);
    if accept_license {
        command.env(LICENSE_ENV, "1");
    }
    command
}

/// List every synthesis model the `tts` tool knows about, in listing order.
pub fn list_models(binary: &Path) -> Result<Vec<String>, EngineError> {
    let mut command = coqui_command(binary, false);
    command.arg("--list_models");
    let output = run_command(command, None)?;
    Ok(parse_model_listing(&output))
}

/// The first synthesis model the `tts` tool lists.
pub fn first_model(binary: &Path) -> Result<String, EngineError> {
    let model = list_models(binary)?
        .into_iter()
        .next()
        .ok_or(EngineError::NoModels)?;
    log::info!("Using first available Coqui model: {model}");
    Ok(model)
}

impl SynthesisEngine for CoquiEngine {
    fn name(&self) -> &str {
        &self.model
    }

    fn speakers(&mut self) -> Result<Vec<String>, EngineError> {
        if let Some(speakers) = &self.speakers {
            return Ok(speakers.clone());
        }
        let speakers = self.query_ids("--list_speaker_idxs")?;
        log::info!("Model {} reports {} speaker(s)", self.model, speakers.len());
        self.speakers = Some(speakers.clone());
        Ok(speakers)
    }

    fn languages(&mut self) -> Result<Vec<String>, EngineError> {
        if let Some(languages) = &self.languages {
            return Ok(languages.clone());
        }
        let languages = self.query_ids("--list_language_idxs")?;
        log::info!("Model {} reports {} language(s)", self.model, languages.len());
        self.languages = Some(languages.clone());
        Ok(languages)
    }

    fn prepare(&mut self) -> Result<(), EngineError> {
        self.server().map(|_| ())
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        voice: &VoiceSelection,
        wav_path: &Path,
    ) -> Result<(), EngineError> {
        let audio = self.server()?.synthesize(text, voice)?;
        std::fs::write(wav_path, audio)?;
        ensure_written(wav_path)
    }
}

/// Extract `tts_models/...` names from `tts --list_models` output.
///
/// Lines look like ` 1: tts_models/en/ljspeech/vits [already downloaded]`.
fn parse_model_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let rest = match line.split_once(':') {
                Some((index, rest)) if index.trim().chars().all(|c| c.is_ascii_digit()) => rest,
                _ => line,
            };
            rest.split_whitespace()
                .next()
                .filter(|name| name.starts_with("tts_models/"))
                .map(str::to_string)
        })
        .collect()
}

/// Extract identifiers from a printed Python dict or list.
///
/// Coqui prints speaker and language ids either as a dict (`{'p225': 0}`) or
/// a list / `dict_keys([...])`. Dict keys win when present so numeric or
/// string values are not mistaken for ids.
fn parse_id_listing(output: &str) -> Vec<String> {
    static DICT_KEY: OnceLock<Regex> = OnceLock::new();
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let dict_key = DICT_KEY.get_or_init(|| {
        Regex::new(r#"(?:'([^']*)'|"([^"]*)")\s*:"#).expect("dict key pattern is valid")
    });
    let quoted = QUOTED
        .get_or_init(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).expect("quoted pattern is valid"));

    let pattern = if dict_key.is_match(output) {
        dict_key
    } else {
        quoted
    };

    let mut ids: Vec<String> = Vec::new();
    for caps in pattern.captures_iter(output) {
        let id = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();
        if !id.is_empty() && !ids.iter().any(|known| known == id) {
            ids.push(id.to_string());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::{coqui_command, parse_id_listing, parse_model_listing, CoquiEngine, LICENSE_ENV};
    use crate::{EngineError, SynthesisEngine, VoiceSelection};
    use std::ffi::OsStr;
    use std::path::{Path, PathBuf};

    #[test]
    fn parses_numbered_model_listing_and_skips_vocoders() {
        let output = "\
 Name format: type/language/dataset/model
 1: tts_models/multilingual/multi-dataset/xtts_v2 [already downloaded]
 2: tts_models/en/ljspeech/vits
 Name format: type/language/dataset/model
 1: vocoder_models/universal/libri-tts/wavegrad
";
        assert_eq!(
            parse_model_listing(output),
            vec![
                "tts_models/multilingual/multi-dataset/xtts_v2".to_string(),
                "tts_models/en/ljspeech/vits".to_string(),
            ]
        );
    }

    #[test]
    fn parses_dict_keys_without_values() {
        let output = " > Available speaker ids: (Set --speaker_idx flag to one of these values)\n\
                      {'Daisy Studious': 0, \"Damien O'Black\": 1}\n";
        assert_eq!(
            parse_id_listing(output),
            vec!["Daisy Studious".to_string(), "Damien O'Black".to_string()]
        );
    }

    #[test]
    fn parses_list_style_languages() {
        let output = " > Available language ids:\n['en', 'es', 'fr', 'en']\n";
        assert_eq!(
            parse_id_listing(output),
            vec!["en".to_string(), "es".to_string(), "fr".to_string()]
        );
    }

    #[test]
    fn empty_listing_yields_no_ids() {
        assert!(parse_id_listing(" > Model is single speaker\n").is_empty());
    }

    #[test]
    fn license_agreement_is_opt_in() {
        let env_of = |command: &std::process::Command| {
            command
                .get_envs()
                .find(|(key, _)| *key == OsStr::new(LICENSE_ENV))
                .and_then(|(_, value)| value)
                .map(|value| value.to_os_string())
        };
        assert_eq!(env_of(&coqui_command(Path::new("tts"), false)), None);
        assert_eq!(
            env_of(&coqui_command(Path::new("tts"), true)),
            Some("1".into())
        );
    }

    #[test]
    fn missing_server_fails_before_writing_audio() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("speech.wav");
        let mut engine = CoquiEngine::new("tts_models/en/ljspeech/vits")
            .with_server_binary(PathBuf::from("definitely-not-a-real-tts-server"));

        assert!(matches!(engine.prepare(), Err(EngineError::BinaryNotFound(_))));
        let err = engine
            .synthesize_to_file("Hi", &VoiceSelection::default(), &out)
            .unwrap_err();
        assert!(matches!(err, EngineError::BinaryNotFound(_)));
        assert!(!out.exists());
    }
}
