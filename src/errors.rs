use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Domain error taxonomy. Shaping functions raise typed failures; the
/// handlers turn them into HTTP responses via `IntoResponse`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The provider returned no price history for the symbol.
    #[error("No data available for symbol: {0}")]
    DataUnavailable(String),

    /// The symbol has no listed option expiries.
    #[error("No options available for {0}")]
    NoOptionsAvailable(String),

    /// Fewer than 2 price points in the requested window.
    #[error("Insufficient data for volatility calculation")]
    InsufficientHistory,

    /// A query parameter failed range validation.
    #[error("{0}")]
    BadRequest(String),

    #[error("config error: {0}")]
    Config(String),

    /// Any other upstream failure: network, non-2xx status, malformed payload.
    #[error("{0}")]
    Provider(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Provider(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Provider(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::DataUnavailable(_)
            | ApiError::NoOptionsAvailable(_)
            | ApiError::InsufficientHistory => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Config(msg) | ApiError::Provider(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal server error: {msg}"),
            ),
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
