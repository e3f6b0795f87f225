use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 新闻标题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    pub source: String,
    pub url: String,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
}
