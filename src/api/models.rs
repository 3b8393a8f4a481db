use serde::Deserialize;

/// `?url=` query shared by both relay endpoints.
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}
