//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "code": self.status.as_u16()
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<sauti_core::Error> for ApiError {
    fn from(err: sauti_core::Error) -> Self {
        use sauti_core::Error;

        match &err {
            Error::InvalidInput(_) | Error::InvalidParameter(_) => {
                ApiError::bad_request(err.to_string())
            }
            Error::NoAudio => ApiError::new(StatusCode::NOT_FOUND, err.to_string()),
            Error::Busy | Error::Superseded => ApiError::new(StatusCode::CONFLICT, err.to_string()),
            Error::Decode(_) => {
                warn!("Speech payload could not be decoded: {}", err);
                ApiError::new(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    format!("Could not process audio: {}", err),
                )
            }
            Error::EmptyResult | Error::HttpError(_) | Error::ServiceError { .. } => {
                warn!("Speech generation failed: {}", err);
                ApiError::new(
                    StatusCode::BAD_GATEWAY,
                    format!("Failed to generate audio: {}", err),
                )
            }
            Error::Playback(_) => ApiError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            _ => ApiError::internal(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::internal(format!("Background task failed: {}", err))
    }
}
