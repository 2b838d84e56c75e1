//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use webthing_domain::error::WebThingError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`WebThingError`] and malformed requests to an HTTP response with
/// the appropriate status code.
#[derive(Debug)]
pub enum ApiError {
    Thing(WebThingError),
    /// The request body does not have the expected shape.
    BadRequest(String),
}

impl From<WebThingError> for ApiError {
    fn from(err: WebThingError) -> Self {
        Self::Thing(err)
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Thing(WebThingError::Validation(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            Self::Thing(WebThingError::NotFound(err)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Thing(WebThingError::Transition(err)) => (StatusCode::CONFLICT, err.to_string()),
            Self::Thing(WebThingError::Forward(err)) => {
                tracing::error!(error = %err, "device refused the write");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
