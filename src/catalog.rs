//! Speakers and localizations offered to the user.
//!
//! The defaults are the six studio voices and two localizations the UI has
//! always shown. [`VoiceCatalog::discover`] replaces them with what the
//! engine actually supports whenever the engine can tell us.

use serde::Serialize;

use crate::{StudioError, SynthesisEngine};

/// Voices shown when the engine does not report its own speakers.
pub const DEFAULT_SPEAKERS: [&str; 6] = [
    "Daisy Studious",
    "Sofia Hellen",
    "Asya Anara",
    "Eugenio Mataracı",
    "Viktor Menelaos",
    "Damien Black",
];

/// A language choice: the label the user sees and the code the engine gets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Localization {
    pub label: String,
    pub code: String,
}

impl Localization {
    pub fn new(label: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            code: code.into(),
        }
    }
}

/// Label / code pairs shown when the engine does not report its languages.
pub const DEFAULT_LOCALIZATIONS: [(&str, &str); 2] =
    [("US English", "en"), ("Spanish (LatAm)", "es")];

/// Map a default localization label to its two-letter code.
pub fn language_code(label: &str) -> Option<&'static str> {
    DEFAULT_LOCALIZATIONS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, code)| *code)
}

fn default_localizations() -> Vec<Localization> {
    DEFAULT_LOCALIZATIONS
        .iter()
        .map(|(label, code)| Localization::new(*label, *code))
        .collect()
}

/// True when an engine language code covers `code` (`en` matches `en` and `en-us`).
fn supports(engine_codes: &[String], code: &str) -> bool {
    engine_codes.iter().any(|engine_code| {
        engine_code == code
            || engine_code
                .strip_prefix(code)
                .is_some_and(|rest| rest.starts_with('-'))
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceCatalog {
    speakers: Vec<String>,
    localizations: Vec<Localization>,
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self {
            speakers: DEFAULT_SPEAKERS.iter().map(|s| s.to_string()).collect(),
            localizations: default_localizations(),
        }
    }
}

impl VoiceCatalog {
    /// Build a catalog from explicit lists.
    pub fn new(speakers: Vec<String>, localizations: Vec<Localization>) -> Self {
        Self {
            speakers,
            localizations,
        }
    }

    /// Ask the engine for its real speakers and languages.
    ///
    /// Falls back to the defaults for whatever the engine cannot report.
    pub fn discover(engine: &mut dyn SynthesisEngine) -> Self {
        let defaults = Self::default();

        let speakers = match engine.speakers() {
            Ok(speakers) if !speakers.is_empty() => speakers,
            Ok(_) => defaults.speakers,
            Err(e) => {
                log::warn!("Could not list speakers of {}: {e}; using defaults", engine.name());
                defaults.speakers
            }
        };

        let localizations = match engine.languages() {
            Ok(codes) if !codes.is_empty() => Self::localizations_for(&codes),
            Ok(_) => defaults.localizations,
            Err(e) => {
                log::warn!("Could not list languages of {}: {e}; using defaults", engine.name());
                defaults.localizations
            }
        };

        Self {
            speakers,
            localizations,
        }
    }

    fn localizations_for(codes: &[String]) -> Vec<Localization> {
        let matching: Vec<Localization> = default_localizations()
            .into_iter()
            .filter(|l| supports(codes, &l.code))
            .collect();
        if !matching.is_empty() {
            return matching;
        }
        codes
            .iter()
            .map(|code| Localization::new(code.clone(), code.clone()))
            .collect()
    }

    pub fn speakers(&self) -> &[String] {
        &self.speakers
    }

    pub fn localizations(&self) -> &[Localization] {
        &self.localizations
    }

    pub fn default_speaker(&self) -> Option<&str> {
        self.speakers.first().map(String::as_str)
    }

    pub fn default_localization(&self) -> Option<&Localization> {
        self.localizations.first()
    }

    /// Check a speaker name against the catalog.
    pub fn speaker(&self, name: &str) -> Result<&str, StudioError> {
        self.speakers
            .iter()
            .find(|s| s.as_str() == name)
            .map(String::as_str)
            .ok_or_else(|| StudioError::UnknownSpeaker(name.to_string()))
    }

    /// Resolve a localization label to its engine code.
    pub fn language_code(&self, label: &str) -> Result<&str, StudioError> {
        self.localizations
            .iter()
            .find(|l| l.label == label)
            .map(|l| l.code.as_str())
            .ok_or_else(|| StudioError::UnknownLanguage(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EngineError, VoiceSelection};
    use std::path::Path;

    struct Reporting {
        speakers: Result<Vec<String>, ()>,
        languages: Vec<String>,
    }

    impl SynthesisEngine for Reporting {
        fn name(&self) -> &str {
            "reporting"
        }

        fn speakers(&mut self) -> Result<Vec<String>, EngineError> {
            self.speakers
                .clone()
                .map_err(|_| EngineError::BinaryNotFound("tts".into()))
        }

        fn languages(&mut self) -> Result<Vec<String>, EngineError> {
            Ok(self.languages.clone())
        }

        fn synthesize_to_file(
            &mut self,
            _text: &str,
            _voice: &VoiceSelection,
            _wav_path: &Path,
        ) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn label_mapping_is_exact() {
        assert_eq!(language_code("US English"), Some("en"));
        assert_eq!(language_code("Spanish (LatAm)"), Some("es"));
        assert_eq!(language_code("us english"), None);

        let catalog = VoiceCatalog::default();
        assert_eq!(catalog.language_code("US English").unwrap(), "en");
        assert_eq!(catalog.language_code("Spanish (LatAm)").unwrap(), "es");
        assert!(matches!(
            catalog.language_code("French"),
            Err(StudioError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn default_catalog_offers_six_voices() {
        let catalog = VoiceCatalog::default();
        assert_eq!(catalog.speakers().len(), 6);
        assert_eq!(catalog.default_speaker(), Some("Daisy Studious"));
        assert!(catalog.speaker("Damien Black").is_ok());
        assert!(catalog.speaker("Nobody").is_err());
    }

    #[test]
    fn discovery_prefers_engine_speakers_and_filters_languages() {
        let mut engine = Reporting {
            speakers: Ok(strings(&["p225", "p226"])),
            languages: strings(&["en-us", "fr"]),
        };
        let catalog = VoiceCatalog::discover(&mut engine);
        assert_eq!(catalog.speakers(), strings(&["p225", "p226"]).as_slice());
        assert_eq!(
            catalog.localizations(),
            &[Localization::new("US English", "en")]
        );
    }

    #[test]
    fn discovery_exposes_raw_codes_when_no_default_matches() {
        let mut engine = Reporting {
            speakers: Err(()),
            languages: strings(&["de", "fr"]),
        };
        let catalog = VoiceCatalog::discover(&mut engine);
        assert_eq!(catalog.speakers().len(), DEFAULT_SPEAKERS.len());
        assert_eq!(catalog.language_code("de").unwrap(), "de");
        assert_eq!(catalog.localizations().len(), 2);
    }

    #[test]
    fn prefix_match_requires_a_dash() {
        assert!(supports(&strings(&["es-419"]), "es"));
        assert!(!supports(&strings(&["est"]), "es"));
    }
}
