use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Failures surfaced to gateway clients.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("city not found")]
    CityNotFound,

    /// An expected block was absent from an upstream payload.
    #[error("{0} not found in response")]
    DataNotFound(&'static str),

    #[error("location lookup failed: {0}")]
    LocationLookup(String),

    #[error("failed to reach upstream: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned {status}: {message}")]
    UpstreamStatus { status: u16, message: String },
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::CityNotFound | GatewayError::LocationLookup(_) => StatusCode::BAD_REQUEST,
            GatewayError::DataNotFound(_)
            | GatewayError::Transport(_)
            | GatewayError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        warn!(%status, error = %self, "request failed");
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
