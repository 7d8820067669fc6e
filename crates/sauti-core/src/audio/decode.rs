//! Base64 decoding of speech service payloads

use base64::Engine;
use tracing::debug;

use super::pcm::RawAudioBytes;
use crate::error::Result;

/// Decode a standard-alphabet base64 string into raw PCM bytes.
///
/// Surrounding ASCII whitespace is ignored; anything else that is not valid
/// base64 fails with [`Error::Decode`](crate::Error::Decode) and no bytes are
/// returned.
pub fn decode_base64(encoded: &str) -> Result<RawAudioBytes> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    debug!("Decoded {} base64 chars into {} bytes", encoded.len(), bytes.len());
    Ok(RawAudioBytes::from(bytes))
}
