//! Error types for the Sauti speech pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not decode audio payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Speech service returned no audio")]
    EmptyResult,

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No generated audio available")]
    NoAudio,

    #[error("A speech generation request is already in progress")]
    Busy,

    #[error("Generation was superseded by a newer request")]
    Superseded,

    #[error("Audio encoding error: {0}")]
    AudioError(String),

    #[error("Malformed WAV data: {0}")]
    WavFormat(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Speech service responded with status {status}: {message}")]
    ServiceError { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<hound::Error> for Error {
    fn from(e: hound::Error) -> Self {
        Error::AudioError(e.to_string())
    }
}
