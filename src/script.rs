//! The batch flow: one fixed sentence, the engine's first voice, one file.

use std::path::{Path, PathBuf};

use crate::{StudioError, SynthesisEngine, VoiceSelection};

pub const SCRIPT_TEXT: &str = "First, solve the problem. Then, write the code.";
/// File name of the batch flow's audio.
pub const SCRIPT_FILE: &str = "output.wav";
pub const SCRIPT_DONE: &str = "TTS complete! Check the output folder for the audio file.";

/// The engine's first speaker and first language, when it reports any.
pub fn default_voice(engine: &mut dyn SynthesisEngine) -> Result<VoiceSelection, StudioError> {
    Ok(VoiceSelection {
        speaker: engine.speakers()?.into_iter().next(),
        language: engine.languages()?.into_iter().next(),
    })
}

/// Synthesize [`SCRIPT_TEXT`] into `output_dir/output.wav`.
///
/// Every failure is returned to the caller; nothing is retried.
pub fn run(engine: &mut dyn SynthesisEngine, output_dir: &Path) -> Result<PathBuf, StudioError> {
    std::fs::create_dir_all(output_dir)?;
    let voice = default_voice(engine)?;
    log::info!(
        "Batch synthesis with {} (speaker: {}, language: {})",
        engine.name(),
        voice.speaker.as_deref().unwrap_or("default"),
        voice.language.as_deref().unwrap_or("default")
    );

    let path = output_dir.join(SCRIPT_FILE);
    engine.synthesize_to_file(SCRIPT_TEXT, &voice, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioClip, EngineError};

    struct Recorder {
        speakers: Vec<String>,
        seen: Option<(String, VoiceSelection)>,
    }

    impl SynthesisEngine for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn speakers(&mut self) -> Result<Vec<String>, EngineError> {
            Ok(self.speakers.clone())
        }

        fn languages(&mut self) -> Result<Vec<String>, EngineError> {
            Ok(vec!["en".to_string(), "es".to_string()])
        }

        fn synthesize_to_file(
            &mut self,
            text: &str,
            voice: &VoiceSelection,
            wav_path: &Path,
        ) -> Result<(), EngineError> {
            self.seen = Some((text.to_string(), voice.clone()));
            AudioClip::mono(vec![0.0; 160], 16000)
                .write_wav(wav_path)
                .map_err(|e| EngineError::Io(std::io::Error::other(e.to_string())))
        }
    }

    #[test]
    fn uses_first_speaker_and_language() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("output");
        let mut engine = Recorder {
            speakers: vec!["p225".to_string(), "p226".to_string()],
            seen: None,
        };

        let path = run(&mut engine, &out).unwrap();
        assert_eq!(path, out.join(SCRIPT_FILE));
        assert!(path.is_file());

        let (text, voice) = engine.seen.unwrap();
        assert_eq!(text, SCRIPT_TEXT);
        assert_eq!(voice, VoiceSelection::new("p225", "en"));
    }

    #[test]
    fn single_speaker_models_get_no_speaker() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = Recorder {
            speakers: Vec::new(),
            seen: None,
        };
        run(&mut engine, dir.path()).unwrap();
        assert_eq!(engine.seen.unwrap().1.speaker, None);
    }
}
