use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::catalog::VoiceCatalog;
use crate::{AudioClip, StudioError, SynthesisEngine, VoiceSelection};

/// One "Generate Speech" request, as labels the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker: String,
    /// Localization label, e.g. `"US English"`.
    pub language: String,
}

impl SynthesisRequest {
    pub fn new(
        text: impl Into<String>,
        speaker: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            speaker: speaker.into(),
            language: language.into(),
        }
    }
}

/// What a successful synthesis produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisResult {
    pub audio_path: PathBuf,
    pub word_count: usize,
    pub speaker: String,
    /// Localization label as requested.
    pub language: String,
    pub speech_length_secs: f64,
    pub generation_secs: f64,
}

impl SynthesisResult {
    /// The multi-line summary shown in the studio's info box.
    pub fn summary(&self) -> String {
        format!(
            "Word Count: {}\nVoice: {}\nLocalization: {}\nLength of Speech: {} seconds\nGeneration Duration: {} seconds",
            self.word_count,
            self.speaker,
            self.language,
            self.speech_length_secs,
            self.generation_secs
        )
    }
}

/// Number of whitespace-separated tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Synthesize `request` into `output_path` and measure the result.
///
/// The engine loads its model first, untimed; only the synthesis call itself
/// is measured. The written file is read back to compute the speech length,
/// so the figure reflects what is on disk.
pub fn synthesize(
    engine: &mut dyn SynthesisEngine,
    catalog: &VoiceCatalog,
    request: &SynthesisRequest,
    output_path: &Path,
) -> Result<SynthesisResult, StudioError> {
    if request.text.is_empty() {
        return Err(StudioError::EmptyText);
    }

    let speaker = catalog.speaker(&request.speaker)?;
    let code = catalog.language_code(&request.language)?;
    let voice = VoiceSelection::new(speaker, code);

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    engine.prepare()?;
    let start = Instant::now();
    engine.synthesize_to_file(&request.text, &voice, output_path)?;
    let generation_secs = round2(start.elapsed().as_secs_f64());

    let clip = AudioClip::read_wav(output_path)?;
    let speech_length_secs = round2(clip.duration_secs());

    log::info!(
        "Synthesized {:.2}s of speech in {:.2}s with {} ({speaker}, {code}) to {}",
        speech_length_secs,
        generation_secs,
        engine.name(),
        output_path.display()
    );

    Ok(SynthesisResult {
        audio_path: output_path.to_path_buf(),
        word_count: word_count(&request.text),
        speaker: request.speaker.clone(),
        language: request.language.clone(),
        speech_length_secs,
        generation_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whitespace_separated_tokens() {
        assert_eq!(word_count("First, solve the problem."), 4);
        assert_eq!(word_count("  spaced \t out\nwords  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(2.005_1), 2.01);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn summary_lists_every_metric() {
        let result = SynthesisResult {
            audio_path: PathBuf::from("output/generated_speech.wav"),
            word_count: 4,
            speaker: "Sofia Hellen".to_string(),
            language: "Spanish (LatAm)".to_string(),
            speech_length_secs: 1.5,
            generation_secs: 0.42,
        };
        assert_eq!(
            result.summary(),
            "Word Count: 4\nVoice: Sofia Hellen\nLocalization: Spanish (LatAm)\n\
             Length of Speech: 1.5 seconds\nGeneration Duration: 0.42 seconds"
        );
    }

    /// Takes a long time to load, then synthesizes instantly.
    struct SlowLoader {
        loads: usize,
    }

    impl SynthesisEngine for SlowLoader {
        fn name(&self) -> &str {
            "slow-loader"
        }

        fn speakers(&mut self) -> Result<Vec<String>, crate::EngineError> {
            Ok(Vec::new())
        }

        fn languages(&mut self) -> Result<Vec<String>, crate::EngineError> {
            Ok(Vec::new())
        }

        fn prepare(&mut self) -> Result<(), crate::EngineError> {
            if self.loads == 0 {
                std::thread::sleep(std::time::Duration::from_millis(400));
            }
            self.loads += 1;
            Ok(())
        }

        fn synthesize_to_file(
            &mut self,
            _text: &str,
            _voice: &VoiceSelection,
            wav_path: &Path,
        ) -> Result<(), crate::EngineError> {
            AudioClip::mono(vec![0.0; 800], 8000)
                .write_wav(wav_path)
                .map_err(|e| crate::EngineError::Io(std::io::Error::other(e.to_string())))
        }
    }

    #[test]
    fn model_loading_is_not_counted_as_generation() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = SlowLoader { loads: 0 };
        let catalog = VoiceCatalog::default();
        let request = SynthesisRequest::new("Hello there", "Daisy Studious", "US English");

        let result = synthesize(&mut engine, &catalog, &request, &dir.path().join("a.wav")).unwrap();
        assert!(result.generation_secs < 0.3, "took {}", result.generation_secs);
        assert_eq!(result.speech_length_secs, 0.1);
        assert_eq!(engine.loads, 1);
    }
}
