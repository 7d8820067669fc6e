//! Canonical 44-byte header WAV container for 16-bit mono PCM
//!
//! The header is written field by field so the payload is copied verbatim,
//! including an odd trailing byte if the PCM has one.

use tracing::debug;

use crate::error::{Error, Result};

/// Size of the canonical RIFF/WAVE header
pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT: u16 = 1;
/// Speech PCM and its WAV container are always mono
pub const NUM_CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;
const FMT_CHUNK_LEN: u32 = 16;

/// Largest payload whose RIFF chunk size still fits in 32 bits
pub const MAX_DATA_LEN: usize = (u32::MAX - 36) as usize;

/// Parsed WAV header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub chunk_size: u32,
    pub audio_format: u16,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Header describing `data_size` bytes of mono 16-bit PCM
    pub fn pcm_mono(sample_rate: u32, data_size: u32) -> Self {
        let block_align = NUM_CHANNELS * (BITS_PER_SAMPLE / 8);
        Self {
            chunk_size: 36u32.saturating_add(data_size),
            audio_format: PCM_FORMAT,
            num_channels: NUM_CHANNELS,
            sample_rate,
            byte_rate: sample_rate.wrapping_mul(block_align as u32),
            block_align,
            bits_per_sample: BITS_PER_SAMPLE,
            data_size,
        }
    }

    /// Serialize into the 44-byte little-endian layout
    pub fn to_bytes(&self) -> [u8; WAV_HEADER_LEN] {
        let mut header = [0u8; WAV_HEADER_LEN];
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.chunk_size.to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
        header[20..22].copy_from_slice(&self.audio_format.to_le_bytes());
        header[22..24].copy_from_slice(&self.num_channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_size.to_le_bytes());
        header
    }

    /// Read a canonical header back from the start of a WAV file
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(Error::WavFormat(format!(
                "expected at least {} bytes, got {}",
                WAV_HEADER_LEN,
                bytes.len()
            )));
        }

        expect_tag(bytes, 0, b"RIFF")?;
        expect_tag(bytes, 8, b"WAVE")?;
        expect_tag(bytes, 12, b"fmt ")?;
        if read_u32(bytes, 16) != FMT_CHUNK_LEN {
            return Err(Error::WavFormat("fmt chunk is not 16 bytes".to_string()));
        }
        expect_tag(bytes, 36, b"data")?;

        Ok(Self {
            chunk_size: read_u32(bytes, 4),
            audio_format: read_u16(bytes, 20),
            num_channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            byte_rate: read_u32(bytes, 28),
            block_align: read_u16(bytes, 32),
            bits_per_sample: read_u16(bytes, 34),
            data_size: read_u32(bytes, 40),
        })
    }
}

fn expect_tag(bytes: &[u8], offset: usize, tag: &[u8; 4]) -> Result<()> {
    if &bytes[offset..offset + 4] == tag {
        Ok(())
    } else {
        Err(Error::WavFormat(format!(
            "missing {:?} tag at offset {}",
            String::from_utf8_lossy(tag),
            offset
        )))
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// A complete WAV file: header followed by the raw PCM payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavFile {
    bytes: Vec<u8>,
}

impl WavFile {
    pub const CONTENT_TYPE: &'static str = "audio/wav";

    /// Wrap mono 16-bit PCM bytes in a WAV container.
    ///
    /// Deterministic; an empty payload yields a 44-byte file. Payloads over
    /// [`MAX_DATA_LEN`] cannot be described by a RIFF header and are rejected.
    pub fn encode(pcm: &[u8], sample_rate: u32) -> Result<Self> {
        let header = WavHeader::pcm_mono(sample_rate, data_size(pcm.len())?);

        let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(pcm);

        debug!(
            "Encoded {} PCM bytes at {} Hz into {}-byte WAV",
            pcm.len(),
            sample_rate,
            bytes.len()
        );
        Ok(Self { bytes })
    }

    pub fn header(&self) -> Result<WavHeader> {
        WavHeader::parse(&self.bytes)
    }

    /// The PCM payload after the header
    pub fn data(&self) -> &[u8] {
        &self.bytes[WAV_HEADER_LEN..]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

fn data_size(len: usize) -> Result<u32> {
    if len > MAX_DATA_LEN {
        return Err(Error::WavFormat(format!(
            "{} bytes of PCM exceed the {} byte WAV limit",
            len, MAX_DATA_LEN
        )));
    }
    Ok(len as u32)
}

impl AsRef<[u8]> for WavFile {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
