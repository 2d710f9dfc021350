use crate::engines::EngineError;
use crate::waveform::WaveformOptionsBuilderError;

#[derive(thiserror::Error, Debug)]
pub enum StudioError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Font error: {0}")]
    Font(#[from] ab_glyph::InvalidFont),
    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
    #[error("Invalid waveform options: {0}")]
    WaveformOptions(#[from] WaveformOptionsBuilderError),
    #[error("Unknown speaker '{0}'. Pick one of the catalog's speakers.")]
    UnknownSpeaker(String),
    #[error("Unknown language '{0}'. Pick one of the catalog's localizations.")]
    UnknownLanguage(String),
    #[error("Text is empty")]
    EmptyText,
}
