use reqwest::header::{CONTENT_TYPE, HeaderValue, REFERER};
use reqwest::{Client, Response, Url};
use std::time::Duration;

use crate::config::{Config, USER_AGENT};
use crate::data_models::FeedResult;
use crate::error::RelayError;
use crate::feed;

pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Upstream response for an image, headers checked, body not yet read.
pub struct ImageResponse {
    pub content_type: HeaderValue,
    pub response: Response,
}

/// Shared outbound client; one upstream GET per relayed request.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    upstream_timeout: Duration,
}

impl Fetcher {
    /// The client carries no overall deadline: feed requests set one per
    /// request, image requests only bound the wait for response headers.
    pub fn new(config: &Config) -> Result<Fetcher, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.upstream_timeout)
            .build()?;
        Ok(Fetcher {
            client,
            upstream_timeout: config.upstream_timeout,
        })
    }

    /// Fetch a feed and reshape it into the client JSON model.
    ///
    /// `source` is the URL exactly as the client sent it; item ids and the
    /// `source` field are built from it.
    pub async fn fetch_feed(&self, url: &Url, source: &str) -> Result<FeedResult, RelayError> {
        log::debug!("fetching feed {url}");
        let res = self
            .client
            .get(url.clone())
            .header("Referrer-Policy", "no-referrer")
            .timeout(self.upstream_timeout)
            .send()
            .await?;
        let res = check_status(res)?;
        let body = res.text().await?;

        let parsed = feed::parse_feed(&body)?;
        let cached_at = chrono::Utc::now().timestamp_millis();
        let result = feed::build_feed(parsed, source, cached_at);
        log::info!("fetched feed {url} with {} items", result.items.len());
        Ok(result)
    }

    /// Start an image download; the caller streams the body.
    ///
    /// Only the wait for the response headers is time-bounded. The body is
    /// forwarded for as long as the upstream keeps sending it.
    pub async fn fetch_image(&self, url: &Url) -> Result<ImageResponse, RelayError> {
        log::debug!("fetching image {url}");
        let request = self
            .client
            .get(url.clone())
            .header(REFERER, url.origin().ascii_serialization())
            .send();
        let res = tokio::time::timeout(self.upstream_timeout, request)
            .await
            .map_err(|_| RelayError::UpstreamTimeout)??;
        let response = check_status(res)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_IMAGE_CONTENT_TYPE));

        Ok(ImageResponse {
            content_type,
            response,
        })
    }
}

fn check_status(res: Response) -> Result<Response, RelayError> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        Err(RelayError::UpstreamError(status))
    }
}
