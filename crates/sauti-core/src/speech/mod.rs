//! Speech generation requests and the remote generator contract

mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub use gemini::GeminiSpeechClient;

/// Prebuilt voices offered by the speech service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Kore,
    Puck,
    Charon,
    Fenrir,
    Zephyr,
}

impl Voice {
    pub fn all() -> &'static [Voice] {
        &[
            Voice::Kore,
            Voice::Puck,
            Voice::Charon,
            Voice::Fenrir,
            Voice::Zephyr,
        ]
    }

    /// Voice name as the speech service expects it
    pub fn id(&self) -> &'static str {
        match self {
            Voice::Kore => "Kore",
            Voice::Puck => "Puck",
            Voice::Charon => "Charon",
            Voice::Fenrir => "Fenrir",
            Voice::Zephyr => "Zephyr",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Voice::Kore => "Kore (Female)",
            Voice::Puck => "Puck (Male)",
            Voice::Charon => "Charon (Male)",
            Voice::Fenrir => "Fenrir (Male)",
            Voice::Zephyr => "Zephyr (Female)",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Voice {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Voice::all()
            .iter()
            .copied()
            .find(|voice| voice.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("unknown voice: {}", s)))
    }
}

/// Emotional tone applied by prefixing the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Default,
    Cheerfully,
    Sadly,
    Angrily,
    Calmly,
    Whisper,
}

impl Emotion {
    pub fn all() -> &'static [Emotion] {
        &[
            Emotion::Default,
            Emotion::Cheerfully,
            Emotion::Sadly,
            Emotion::Angrily,
            Emotion::Calmly,
            Emotion::Whisper,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Emotion::Default => "default",
            Emotion::Cheerfully => "cheerfully",
            Emotion::Sadly => "sadly",
            Emotion::Angrily => "angrily",
            Emotion::Calmly => "calmly",
            Emotion::Whisper => "whisper",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Emotion::Default => "Default",
            Emotion::Cheerfully => "Cheerful",
            Emotion::Sadly => "Sad",
            Emotion::Angrily => "Angry",
            Emotion::Calmly => "Calm",
            Emotion::Whisper => "Whisper",
        }
    }

    /// Prefix `text` with the spoken-style instruction for this tone
    pub fn style(&self, text: &str) -> String {
        match self {
            Emotion::Default => text.to_string(),
            Emotion::Whisper => format!("Whisper: {}", text),
            other => format!("Say {}: {}", other.id(), text),
        }
    }
}

impl FromStr for Emotion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Emotion::all()
            .iter()
            .copied()
            .find(|emotion| emotion.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidInput(format!("unknown emotion: {}", s)))
    }
}

/// One text-to-speech request as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Voice,
    #[serde(default)]
    pub emotion: Emotion,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: Voice::default(),
            emotion: Emotion::default(),
        }
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = emotion;
        self
    }

    /// Reject blank text and text over `char_limit` characters
    pub fn validate(&self, char_limit: usize) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::InvalidInput(
                "Please enter some text to generate speech.".to_string(),
            ));
        }
        let chars = self.text.chars().count();
        if chars > char_limit {
            return Err(Error::InvalidInput(format!(
                "Text exceeds the character limit of {} ({} characters).",
                char_limit, chars
            )));
        }
        Ok(())
    }

    /// Prompt sent to the speech service
    pub fn prompt(&self) -> String {
        self.emotion.style(&self.text)
    }
}

/// Remote text-to-speech call.
///
/// Returns base64-encoded 16-bit PCM, or `None` when the service answered
/// without audio. Calls are not cancellable once issued.
#[async_trait]
pub trait SpeechGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, voice: Voice) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_styling() {
        let request = SpeechRequest::new("Hello there");
        assert_eq!(request.prompt(), "Hello there");
        assert_eq!(
            request.clone().with_emotion(Emotion::Cheerfully).prompt(),
            "Say cheerfully: Hello there"
        );
        assert_eq!(
            request.with_emotion(Emotion::Whisper).prompt(),
            "Whisper: Hello there"
        );
    }

    #[test]
    fn test_validation() {
        assert!(SpeechRequest::new("   \n").validate(100).is_err());
        assert!(SpeechRequest::new("abc").validate(3).is_ok());
        assert!(SpeechRequest::new("abcd").validate(3).is_err());
        // Limit counts characters, not bytes
        assert!(SpeechRequest::new("नमस्ते").validate(6).is_ok());
    }

    #[test]
    fn test_voice_parsing() {
        assert_eq!("charon".parse::<Voice>().unwrap(), Voice::Charon);
        assert_eq!(" Zephyr ".parse::<Voice>().unwrap(), Voice::Zephyr);
        assert!("alloy".parse::<Voice>().is_err());
        assert_eq!(Voice::Puck.to_string(), "Puck");
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let request: SpeechRequest = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(request.voice, Voice::Kore);
        assert_eq!(request.emotion, Emotion::Default);

        let request: SpeechRequest =
            serde_json::from_str(r#"{"text": "hi", "voice": "fenrir", "emotion": "sadly"}"#)
                .unwrap();
        assert_eq!(request.voice, Voice::Fenrir);
        assert_eq!(request.prompt(), "Say sadly: hi");
    }
}
