//! Configuration types for the Sauti studio

use serde::{Deserialize, Serialize};

use crate::speech::{Emotion, Voice};

/// Audio and request-shaping settings for a speech session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Sample rate of the PCM returned by the speech service
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Maximum text length in characters
    #[serde(default = "default_char_limit")]
    pub char_limit: usize,

    /// File name offered for WAV downloads
    #[serde(default = "default_download_filename")]
    pub download_filename: String,

    #[serde(default)]
    pub default_voice: Voice,

    #[serde(default)]
    pub default_emotion: Emotion,

    /// Play the audio as soon as a generation completes
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,

    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            char_limit: default_char_limit(),
            download_filename: default_download_filename(),
            default_voice: Voice::default(),
            default_emotion: Emotion::default(),
            autoplay: default_autoplay(),
            gemini: GeminiConfig::default(),
        }
    }
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_char_limit() -> usize {
    120_000
}

fn default_download_filename() -> String {
    "generated_speech.wav".to_string()
}

fn default_autoplay() -> bool {
    true
}

/// Hosted speech service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GeminiConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

/// Where playback is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioOutput {
    /// System default output device
    #[default]
    Device,
    /// Headless in-memory sink
    Memory,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub audio_output: AudioOutput,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_cors_enabled(),
            cors_origins: vec!["*".to_string()],
            audio_output: AudioOutput::default(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_enabled() -> bool {
    true
}
