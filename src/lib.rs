//! # tts-studio
//!
//! A small studio around external text-to-speech engines: synthesize text to a
//! WAV file, report simple metrics about the result, and plot the waveform.
//!
//! ## Features
//!
//! - **Pluggable engines**: the Coqui `tts` command-line tool or `espeak-ng`,
//!   both behind the [`SynthesisEngine`] trait
//! - **Voice catalog**: speakers and languages discovered from the engine
//! - **Waveform plots**: dark-theme PNG rendering of the last synthesized clip
//! - **Web UI** (feature `server`): a single page to drive the studio
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::path::Path;
//! use tts_studio::engines::coqui::CoquiEngine;
//! use tts_studio::studio::Studio;
//!
//! let engine = CoquiEngine::with_first_model()?;
//! let mut studio = Studio::new(Box::new(engine), Path::new("output"));
//!
//! let outcome = studio.generate_speech("Hello, world!", "Daisy Studious", "US English");
//! println!("{}", outcome.info);
//! let waveform = studio.generate_waveform();
//! println!("{}", waveform.status);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod catalog;
pub mod config;
pub mod engines;
pub mod error;
#[cfg(feature = "server")]
pub mod server;
pub mod script;
pub mod studio;
pub mod synthesis;
pub mod waveform;

use std::path::Path;

pub use engines::EngineError;
pub use error::StudioError;

/// Decoded audio read back from (or written to) a WAV file.
///
/// Samples are interleaved and kept in their stored scale: integer PCM keeps
/// its integer magnitude, float PCM is passed through.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Interleaved samples
    pub samples: Vec<f32>,
    /// Sample rate of the audio in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
}

impl AudioClip {
    /// Create a mono clip.
    #[cfg(test)]
    pub(crate) fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// Read a WAV file of any PCM layout hound understands.
    pub fn read_wav(path: &Path) -> Result<Self, StudioError> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32))
                .collect::<Result<Vec<_>, _>>()?,
        };

        log::debug!(
            "Read {} samples ({} channel(s) @ {}Hz) from {}",
            samples.len(),
            spec.channels,
            spec.sample_rate,
            path.display()
        );

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels.max(1),
        })
    }

    /// Write the audio to a 32-bit float WAV file.
    #[cfg(test)]
    pub(crate) fn write_wav(&self, path: &Path) -> Result<(), StudioError> {
        let spec = hound::WavSpec {
            channels: self.channels.max(1),
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Samples of a single channel, de-interleaved.
    pub fn channel(&self, index: usize) -> Vec<f32> {
        let stride = self.channels.max(1) as usize;
        self.samples
            .iter()
            .skip(index)
            .step_by(stride)
            .copied()
            .collect()
    }
}

/// The speaker and language handed to an engine for one request.
///
/// `None` lets the engine use its own default, which is what single-speaker
/// or monolingual models expect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceSelection {
    pub speaker: Option<String>,
    pub language: Option<String>,
}

impl VoiceSelection {
    pub fn new(speaker: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            speaker: Some(speaker.into()),
            language: Some(language.into()),
        }
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// The engine is an external collaborator: it owns the model, the voices and
/// the signal processing. The studio only asks it what it can do and where to
/// write the audio.
pub trait SynthesisEngine: Send {
    /// Short human-readable name of the engine and model.
    fn name(&self) -> &str;

    /// Speaker identifiers the loaded model accepts. Empty for single-speaker models.
    fn speakers(&mut self) -> Result<Vec<String>, EngineError>;

    /// Language codes the loaded model accepts. Empty for monolingual models.
    fn languages(&mut self) -> Result<Vec<String>, EngineError>;

    /// Load the model so later requests only pay for synthesis.
    ///
    /// Idempotent. Engines without a resident model keep the default no-op.
    fn prepare(&mut self) -> Result<(), EngineError> {
        Ok(())
    }

    /// Synthesize `text` into a WAV file at `wav_path`, overwriting it.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        voice: &VoiceSelection,
        wav_path: &Path,
    ) -> Result<(), EngineError>;
}

impl<E: SynthesisEngine + ?Sized> SynthesisEngine for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn speakers(&mut self) -> Result<Vec<String>, EngineError> {
        (**self).speakers()
    }

    fn languages(&mut self) -> Result<Vec<String>, EngineError> {
        (**self).languages()
    }

    fn prepare(&mut self) -> Result<(), EngineError> {
        (**self).prepare()
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        voice: &VoiceSelection,
        wav_path: &Path,
    ) -> Result<(), EngineError> {
        (**self).synthesize_to_file(text, voice, wav_path)
    }
}
