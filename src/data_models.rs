use serde::{Deserialize, Serialize};

pub const UNTITLED: &str = "untitled";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FeedResult {
    pub title: String,
    pub items: Vec<FeedItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    /// `<source>-<index>`, unique only within one response.
    pub id: String,
    pub title: String,
    /// Raw description markup, already unescaped.
    pub content: String,
    pub pub_date: String,
    pub link: String,
    pub source: String,
    pub image_url: Option<String>,
    /// Epoch milliseconds at extraction time.
    pub cached_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
