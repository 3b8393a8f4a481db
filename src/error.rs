use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::data_models::ErrorResponse;

/// Everything that can go wrong while relaying a single request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The caller sent no URL or one that does not parse.
    #[error("{0}")]
    InvalidRequest(&'static str),

    #[error("HTTP error! status: {0}")]
    UpstreamError(reqwest::StatusCode),

    #[error("upstream did not respond in time")]
    UpstreamTimeout,

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("feed parse error: {0}")]
    ParseFailure(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            RelayError::InvalidRequest(_) => "InvalidRequest",
            RelayError::UpstreamError(_) => "UpstreamError",
            RelayError::UpstreamTimeout => "UpstreamTimeout",
            RelayError::NetworkFailure(_) => "NetworkFailure",
            RelayError::ParseFailure(_) => "ParseFailure",
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RelayError::UpstreamTimeout
        } else if let Some(status) = err.status() {
            RelayError::UpstreamError(status)
        } else {
            RelayError::NetworkFailure(format!("{:#}", err))
        }
    }
}

/// A [`RelayError`] bound to the endpoint it happened in, ready to be rendered.
#[derive(Debug)]
pub struct ApiError {
    context: &'static str,
    source: RelayError,
}

impl ApiError {
    pub const FEED_CONTEXT: &'static str = "failed to fetch RSS feed";
    pub const IMAGE_CONTEXT: &'static str = "failed to fetch image";

    pub fn feed(source: RelayError) -> ApiError {
        ApiError {
            context: Self::FEED_CONTEXT,
            source,
        }
    }

    pub fn image(source: RelayError) -> ApiError {
        ApiError {
            context: Self::IMAGE_CONTEXT,
            source,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.source.status_code();
        log::error!(
            "{}: [{}] {}",
            self.context,
            self.source.category(),
            self.source
        );

        let body = match &self.source {
            RelayError::InvalidRequest(msg) => ErrorResponse {
                error: msg.to_string(),
                message: None,
            },
            other => ErrorResponse {
                error: self.context.to_string(),
                message: Some(other.to_string()),
            },
        };

        (status, Json(body)).into_response()
    }
}
