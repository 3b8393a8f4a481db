use axum::{
    Json,
    body::Body,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use futures::TryStreamExt;
use reqwest::Url;
use std::sync::Arc;

use crate::data_models::{FeedResult, HealthResponse};
use crate::error::{ApiError, RelayError};
use crate::fetcher::{Fetcher, ImageResponse};

use super::models::UrlQuery;

pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

/// Client-facing messages for the two ways a `url` parameter can be rejected.
struct UrlMessages {
    missing: &'static str,
    invalid: &'static str,
}

const FEED_URL_MESSAGES: UrlMessages = UrlMessages {
    missing: "missing url parameter",
    invalid: "invalid URL format",
};

const IMAGE_URL_MESSAGES: UrlMessages = UrlMessages {
    missing: "missing image url parameter",
    invalid: "invalid image URL format",
};

/// Returns the parsed URL alongside the string the client sent.
fn validate_url<'a>(
    raw: Option<&'a str>,
    messages: &UrlMessages,
) -> Result<(Url, &'a str), RelayError> {
    let raw = raw
        .filter(|u| !u.is_empty())
        .ok_or(RelayError::InvalidRequest(messages.missing))?;
    let url = Url::parse(raw).map_err(|_| RelayError::InvalidRequest(messages.invalid))?;
    Ok((url, raw))
}

pub async fn rss_handler(
    State(fetcher): State<Arc<Fetcher>>,
    Query(query): Query<UrlQuery>,
) -> Result<Json<FeedResult>, ApiError> {
    let (url, source) =
        validate_url(query.url.as_deref(), &FEED_URL_MESSAGES).map_err(ApiError::feed)?;

    let feed = fetcher
        .fetch_feed(&url, source)
        .await
        .map_err(ApiError::feed)?;

    Ok(Json(feed))
}

pub async fn image_proxy_handler(
    State(fetcher): State<Arc<Fetcher>>,
    Query(query): Query<UrlQuery>,
) -> Result<Response, ApiError> {
    let (url, _) =
        validate_url(query.url.as_deref(), &IMAGE_URL_MESSAGES).map_err(ApiError::image)?;

    let ImageResponse {
        content_type,
        response,
    } = fetcher.fetch_image(&url).await.map_err(ApiError::image)?;

    // Headers are already on the wire once bytes flow, so a broken upstream
    // can only be logged here. Dropping the body cancels the upstream read.
    let stream = response
        .bytes_stream()
        .inspect_err(move |e| log::error!("image stream from {url} failed: {:#}", e));

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static(IMAGE_CACHE_CONTROL),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET"),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type"),
        ),
    ];

    Ok((headers, Body::from_stream(stream)).into_response())
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}
