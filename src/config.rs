//! Studio configuration, read from an optional JSON file.
//!
//! ```json
//! {
//!   "output_dir": "output",
//!   "engine": {
//!     "kind": "coqui",
//!     "binary": "tts",
//!     "server_binary": "tts-server",
//!     "model": "tts_models/en/ljspeech/vits",
//!     "accept_license": false
//!   },
//!   "server": { "host": "127.0.0.1", "port": 7860 },
//!   "waveform": { "width": 800, "height": 400 }
//! }
//! ```
//!
//! Every field is optional; missing ones take the defaults shown above
//! (except `model`, which defaults to the first model the engine lists).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engines::coqui::{self, CoquiEngine};
use crate::engines::espeak::{self, EspeakEngine};
use crate::waveform::{WaveformOptions, WaveformOptionsBuilder};
use crate::{StudioError, SynthesisEngine};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub output_dir: PathBuf,
    pub engine: EngineConfig,
    pub server: ServerConfig,
    pub waveform: WaveformConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            engine: EngineConfig::default(),
            server: ServerConfig::default(),
            waveform: WaveformConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    Coqui {
        #[serde(default = "default_coqui_binary")]
        binary: PathBuf,
        #[serde(default = "default_coqui_server_binary")]
        server_binary: PathBuf,
        #[serde(default)]
        model: Option<String>,
        /// Sets `COQUI_TOS_AGREED` for the Coqui processes.
        #[serde(default)]
        accept_license: bool,
    },
    Espeak {
        #[serde(default = "default_espeak_binary")]
        binary: PathBuf,
        #[serde(default)]
        data_path: Option<PathBuf>,
    },
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::Coqui {
            binary: default_coqui_binary(),
            server_binary: default_coqui_server_binary(),
            model: None,
            accept_license: false,
        }
    }
}

fn default_coqui_binary() -> PathBuf {
    PathBuf::from(coqui::DEFAULT_BINARY)
}

fn default_coqui_server_binary() -> PathBuf {
    PathBuf::from(coqui::DEFAULT_SERVER_BINARY)
}

fn default_espeak_binary() -> PathBuf {
    PathBuf::from(espeak::DEFAULT_BINARY)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WaveformConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
        }
    }
}

impl StudioConfig {
    /// Load the config at `path`, or the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, StudioError> {
        if !path.exists() {
            log::info!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, StudioError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Instantiate the configured engine.
    ///
    /// A Coqui engine without a model asks `tts` for its first model, which
    /// needs the binary to be installed. The model itself is loaded later, by
    /// [`SynthesisEngine::prepare`].
    pub fn build_engine(&self) -> Result<Box<dyn SynthesisEngine>, StudioError> {
        let engine: Box<dyn SynthesisEngine> = match &self.engine {
            EngineConfig::Coqui {
                binary,
                server_binary,
                model,
                accept_license,
            } => {
                let model = match model {
                    Some(model) => model.clone(),
                    None => coqui::first_model(binary)?,
                };
                Box::new(
                    CoquiEngine::with_binary(binary.clone(), model)
                        .with_server_binary(server_binary.clone())
                        .accept_license(*accept_license),
                )
            }
            EngineConfig::Espeak { binary, data_path } => Box::new(EspeakEngine::with_espeak(
                Some(binary.clone()),
                data_path.clone(),
            )),
        };
        log::info!("Using engine {}", engine.name());
        Ok(engine)
    }

    pub fn waveform_options(&self) -> Result<WaveformOptions, StudioError> {
        Ok(WaveformOptionsBuilder::default()
            .width(self.waveform.width)
            .height(self.waveform.height)
            .build()?)
    }
}
