//! espeak-ng engine.
//!
//! A formant synthesizer with no model download. Voices are espeak-ng
//! *variants* (`m1`, `f2`, `Alex`, ...) layered on a language voice, so a
//! [`VoiceSelection`] of speaker `f2` and language `es` is passed to
//! espeak-ng as `-v es+f2`.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>

use std::path::{Path, PathBuf};

use super::{ensure_written, run_tool, EngineError};
use crate::{SynthesisEngine, VoiceSelection};

/// Default name of the espeak-ng binary.
pub const DEFAULT_BINARY: &str = "espeak-ng";

/// Language used when a request does not name one.
const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Clone)]
pub struct EspeakEngine {
    binary: PathBuf,
    data_path: Option<PathBuf>,
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl EspeakEngine {
    /// Create an engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from(DEFAULT_BINARY),
            data_path: None,
        }
    }

    /// Create an engine with explicit espeak-ng binary and data paths.
    ///
    /// Either path can be `None` to fall back to the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self {
            binary: bin_path.unwrap_or_else(|| PathBuf::from(DEFAULT_BINARY)),
            data_path,
        }
    }

    fn base_args(&self) -> Vec<String> {
        match &self.data_path {
            Some(path) => vec![format!("--path={}", path.display())],
            None => Vec::new(),
        }
    }
}

impl SynthesisEngine for EspeakEngine {
    fn name(&self) -> &str {
        "espeak-ng"
    }

    fn speakers(&mut self) -> Result<Vec<String>, EngineError> {
        let mut args = self.base_args();
        args.push("--voices=variant".to_string());
        let output = run_tool(&self.binary, args, None)?;
        Ok(parse_variants(&output))
    }

    fn languages(&mut self) -> Result<Vec<String>, EngineError> {
        let mut args = self.base_args();
        args.push("--voices".to_string());
        let output = run_tool(&self.binary, args, None)?;
        Ok(parse_languages(&output))
    }

    fn synthesize_to_file(
        &mut self,
        text: &str,
        voice: &VoiceSelection,
        wav_path: &Path,
    ) -> Result<(), EngineError> {
        let mut args = self.base_args();
        args.extend([
            "-q".to_string(),
            "-w".to_string(),
            wav_path.display().to_string(),
            "-v".to_string(),
            voice_arg(voice),
            "--stdin".to_string(),
        ]);
        run_tool(&self.binary, args, Some(text))?;
        ensure_written(wav_path)
    }
}

fn voice_arg(voice: &VoiceSelection) -> String {
    let language = voice.language.as_deref().unwrap_or(FALLBACK_LANGUAGE);
    match &voice.speaker {
        Some(variant) => format!("{language}+{variant}"),
        None => language.to_string(),
    }
}

/// Second column of `espeak-ng --voices`, skipping the header row.
fn parse_languages(output: &str) -> Vec<String> {
    let mut languages: Vec<String> = Vec::new();
    for line in output.lines().skip(1) {
        if let Some(code) = line.split_whitespace().nth(1) {
            if !languages.iter().any(|known| known == code) {
                languages.push(code.to_string());
            }
        }
    }
    languages
}

/// Variant ids from the `File` column (`!v/<id>`) of `espeak-ng --voices=variant`.
fn parse_variants(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            line.split_whitespace()
                .find_map(|column| column.strip_prefix("!v/"))
                .map(str::to_string)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{parse_languages, parse_variants, voice_arg, EspeakEngine};
    use crate::{SynthesisEngine, VoiceSelection};
    use std::process::Command;

    const VOICES: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-us           --/M      English_(America)  gmw/en-US            (en 2)
 5  es-419          --/M      Spanish_(Latin_America) roa/es-419      (es-mx 6)
";

    const VARIANTS: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  variant         --/M      Alex               !v/Alex
 5  variant         --/F      f2                 !v/f2
";

    #[test]
    fn parses_language_codes() {
        assert_eq!(parse_languages(VOICES), vec!["af", "en-us", "es-419"]);
    }

    #[test]
    fn parses_variant_ids() {
        assert_eq!(parse_variants(VARIANTS), vec!["Alex", "f2"]);
    }

    #[test]
    fn voice_arg_joins_language_and_variant() {
        assert_eq!(voice_arg(&VoiceSelection::new("f2", "es")), "es+f2");
        assert_eq!(voice_arg(&VoiceSelection::default()), "en");
    }

    #[test]
    fn synthesizes_a_wav_when_espeak_is_installed() {
        // Skip when espeak-ng is unavailable in the execution environment.
        if Command::new("espeak-ng").arg("--version").output().is_err() {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("espeak.wav");
        let mut engine = EspeakEngine::new();
        let voice = VoiceSelection {
            speaker: None,
            language: Some("en".to_string()),
        };
        engine
            .synthesize_to_file("Hello there.", &voice, &path)
            .expect("espeak should succeed");

        let clip = crate::AudioClip::read_wav(&path).unwrap();
        assert!(clip.frames() > 0);
        assert!(clip.sample_rate > 0);
    }
}
