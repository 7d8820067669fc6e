//! HTTP API for the speech studio

pub mod speech;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Json, Router,
};
use sauti_core::{AudioSink, ServerConfig};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::state::AppState;

/// Build the router with every studio endpoint
pub fn create_router<S>(state: AppState<S>, server: &ServerConfig) -> Router
where
    S: AudioSink + 'static,
{
    let router = Router::new()
        .route("/health", get(health))
        .route("/v1/voices", get(speech::voices::<S>))
        .route(
            "/v1/speech",
            post(speech::generate::<S>).delete(speech::discard::<S>),
        )
        .route("/v1/speech/play", post(speech::play::<S>))
        .route("/v1/speech/stop", post(speech::stop::<S>))
        .route("/v1/speech/state", get(speech::session_state::<S>))
        .route("/v1/speech/download", get(speech::download::<S>))
        .route("/v1/speech/export", get(speech::export::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if server.cors_enabled {
        router.layer(cors_layer(&server.cors_origins))
    } else {
        router
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
