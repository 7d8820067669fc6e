//! Sauti Server - local HTTP studio for hosted speech generation

use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod error;
mod settings;
mod state;

use sauti_core::{
    AudioOutput, AudioSink, GeminiSpeechClient, MemorySink, SpeechGenerator, SpeechSession,
};
use settings::Settings;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sauti_server=debug,sauti_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Sauti speech studio");

    // Load configuration
    let (settings, path) = Settings::load()?;
    match &path {
        Some(path) => info!("Configuration file: {:?}", path),
        None => info!("No configuration file, using defaults"),
    }

    let generator: Arc<dyn SpeechGenerator> =
        Arc::new(GeminiSpeechClient::from_env(&settings.studio.gemini)?);
    info!("Speech model: {}", settings.studio.gemini.model);

    match settings.server.audio_output {
        AudioOutput::Memory => {
            info!("Audio output: in-memory (no device playback)");
            serve(settings, MemorySink::new(), generator).await
        }
        AudioOutput::Device => serve_on_device(settings, generator).await,
    }
}

#[cfg(feature = "device")]
async fn serve_on_device(
    settings: Settings,
    generator: Arc<dyn SpeechGenerator>,
) -> anyhow::Result<()> {
    let sink = sauti_core::DeviceSink::open()?;
    info!(
        "Audio output: default device at {} Hz, {} channel(s)",
        sink.native_rate(),
        sink.native_channels()
    );
    serve(settings, sink, generator).await
}

#[cfg(not(feature = "device"))]
async fn serve_on_device(
    _settings: Settings,
    _generator: Arc<dyn SpeechGenerator>,
) -> anyhow::Result<()> {
    anyhow::bail!(
        "built without device playback; set server.audio_output = \"memory\" \
         or rebuild with the `device` feature"
    )
}

async fn serve<S>(
    settings: Settings,
    sink: S,
    generator: Arc<dyn SpeechGenerator>,
) -> anyhow::Result<()>
where
    S: AudioSink + 'static,
{
    let session = SpeechSession::new(settings.studio, sink);
    let state = AppState::new(session, generator);

    // Build router
    let app = api::create_router(state.clone(), &settings.server);

    // Start server
    let addr = settings.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    if let Err(e) = state.session.lock().await.shutdown() {
        warn!("Failed to release audio output: {}", e);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
