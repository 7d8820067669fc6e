//! Speech generation, playback and download endpoints

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine;
use sauti_core::{
    AudioEncoder, AudioFormat, AudioInfo, AudioSink, Emotion, GenerationTicket, PlaybackParams,
    PlaybackState, SpeechRequest, SpeechSession, Voice, WavFile,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

/// Speech generation request
#[derive(Debug, Deserialize)]
pub struct GenerateSpeechRequest {
    pub text: String,
    #[serde(default)]
    pub voice: Option<Voice>,
    #[serde(default)]
    pub emotion: Option<Emotion>,
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub pitch: Option<f32>,
}

/// Speech generation response
#[derive(Debug, Serialize)]
pub struct GenerateSpeechResponse {
    pub request_id: String,
    pub audio: AudioInfo,
    pub audio_base64: String,
    pub format: &'static str,
    pub playback: PlaybackState,
}

/// Replay request; omitted fields fall back to neutral playback
#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub pitch: Option<f32>,
}

/// Query for rendered exports
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub speed: Option<f32>,
    #[serde(default)]
    pub pitch: Option<f32>,
    #[serde(default)]
    pub format: AudioFormat,
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<CatalogEntry>,
    pub emotions: Vec<CatalogEntry>,
    pub default_voice: &'static str,
    pub default_emotion: &'static str,
    pub char_limit: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionStateResponse {
    pub playback: PlaybackState,
    pub generating: bool,
    pub params: PlaybackParams,
    pub audio: Option<AudioInfo>,
}

fn playback_params(speed: Option<f32>, pitch: Option<f32>) -> Result<PlaybackParams, ApiError> {
    let defaults = PlaybackParams::default();
    Ok(PlaybackParams::new(
        speed.unwrap_or(defaults.speed),
        pitch.unwrap_or(defaults.pitch),
    )?)
}

/// List voices, tones and limits
pub async fn voices<S: AudioSink + 'static>(
    State(state): State<AppState<S>>,
) -> Json<VoicesResponse> {
    let session = state.session.lock().await;
    let config = session.config();

    Json(VoicesResponse {
        voices: Voice::all()
            .iter()
            .map(|v| CatalogEntry {
                id: v.id(),
                label: v.label(),
            })
            .collect(),
        emotions: Emotion::all()
            .iter()
            .map(|e| CatalogEntry {
                id: e.id(),
                label: e.label(),
            })
            .collect(),
        default_voice: config.default_voice.id(),
        default_emotion: config.default_emotion.id(),
        char_limit: config.char_limit,
    })
}

/// Generate speech, cache it, and autoplay it
pub async fn generate<S: AudioSink + 'static>(
    State(state): State<AppState<S>>,
    Json(req): Json<GenerateSpeechRequest>,
) -> Result<Json<GenerateSpeechResponse>, ApiError> {
    let params = playback_params(req.speed, req.pitch)?;

    let ticket = {
        let mut session = state.session.lock().await;
        let config = session.config();
        let request = SpeechRequest::new(req.text)
            .with_voice(req.voice.unwrap_or(config.default_voice))
            .with_emotion(req.emotion.unwrap_or(config.default_emotion));
        session.begin_generation(&request)?
    };
    let request_id = ticket.request_id.to_string();

    // The remote call runs detached so a dropped client cannot strand the
    // generation slot
    let session = state.session.clone();
    let generator = state.generator.clone();
    let handle = tokio::spawn(async move {
        let result = generator.generate(&ticket.prompt, ticket.voice).await;
        // Autoplay may resample the whole clip
        tokio::task::spawn_blocking(move || {
            let mut session = session.blocking_lock();
            finish_generation(&mut session, ticket, result, params)
        })
        .await
    });

    let outcome = handle.await??;
    let (audio, audio_base64, playback) = outcome?;
    info!("Generation {} served", request_id);

    Ok(Json(GenerateSpeechResponse {
        request_id,
        audio,
        audio_base64,
        format: "pcm_s16le",
        playback,
    }))
}

fn finish_generation<S: AudioSink>(
    session: &mut SpeechSession<S>,
    ticket: GenerationTicket,
    result: sauti_core::Result<Option<String>>,
    params: PlaybackParams,
) -> sauti_core::Result<(AudioInfo, String, PlaybackState)> {
    let info = match result {
        Ok(audio) => session.complete_generation(ticket, audio, params)?,
        Err(e) => {
            session.abort_generation(ticket);
            return Err(e);
        }
    };
    let audio_base64 = session
        .raw_audio()
        .map(|raw| base64::engine::general_purpose::STANDARD.encode(raw))
        .unwrap_or_default();
    Ok((info, audio_base64, session.playback_state()))
}

/// Drop cached audio and orphan any outstanding generation
pub async fn discard<S: AudioSink + 'static>(
    State(state): State<AppState<S>>,
) -> Json<SessionStateResponse> {
    let mut session = state.session.lock().await;
    session.discard();
    Json(snapshot(&mut session))
}

/// Replay the cached audio with new transforms; a missing body replays
/// at neutral speed and pitch
pub async fn play<S: AudioSink + 'static>(
    State(state): State<AppState<S>>,
    req: Option<Json<PlayRequest>>,
) -> Result<Json<SessionStateResponse>, ApiError> {
    let (speed, pitch) = req
        .map(|Json(req)| (req.speed, req.pitch))
        .unwrap_or_default();
    let params = playback_params(speed, pitch)?;
    let session = state.session.clone();

    // Device sinks resample the clip when a source is created
    let view = tokio::task::spawn_blocking(move || {
        let mut session = session.blocking_lock();
        session.replay(params)?;
        Ok::<_, sauti_core::Error>(snapshot(&mut session))
    })
    .await??;
    Ok(Json(view))
}

pub async fn stop<S: AudioSink + 'static>(
    State(state): State<AppState<S>>,
) -> Json<SessionStateResponse> {
    let mut session = state.session.lock().await;
    session.stop();
    Json(snapshot(&mut session))
}

pub async fn session_state<S: AudioSink + 'static>(
    State(state): State<AppState<S>>,
) -> Json<SessionStateResponse> {
    let mut session = state.session.lock().await;
    Json(snapshot(&mut session))
}

fn snapshot<S: AudioSink>(session: &mut SpeechSession<S>) -> SessionStateResponse {
    SessionStateResponse {
        playback: session.playback_state(),
        generating: session.is_generating(),
        params: session.playback_params(),
        audio: session.audio_info(),
    }
}

/// Cached audio as a WAV attachment
pub async fn download<S: AudioSink + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
    let session = state.session.lock().await;
    let wav = session.download()?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        session.config().download_filename
    );

    Ok((
        [
            (header::CONTENT_TYPE, WavFile::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        wav.into_bytes(),
    )
        .into_response())
}

/// Cached audio with speed and pitch baked in
pub async fn export<S: AudioSink + 'static>(
    State(state): State<AppState<S>>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let params = playback_params(query.speed, query.pitch)?;
    let format = query.format;
    let session = state.session.clone();

    let (bytes, filename) = tokio::task::spawn_blocking(move || {
        let session = session.blocking_lock();
        let rendered = session.render(params, query.sample_rate)?;
        let bytes = AudioEncoder::for_buffer(&rendered).encode(&rendered, format)?;
        let filename = export_filename(&session.config().download_filename, format);
        Ok::<_, sauti_core::Error>((bytes, filename))
    })
    .await??;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                AudioEncoder::content_type(format).to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

fn export_filename(download_filename: &str, format: AudioFormat) -> String {
    let stem = download_filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(download_filename);
    format!("{}_adjusted.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename("generated_speech.wav", AudioFormat::Wav),
            "generated_speech_adjusted.wav"
        );
        assert_eq!(export_filename("take", AudioFormat::F32), "take_adjusted.f32");
    }

    #[test]
    fn test_missing_params_are_neutral() {
        let params = playback_params(None, None).unwrap();
        assert!(params.is_identity());
        assert!(playback_params(Some(0.1), None).is_err());
    }
}
