use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Longest item name the content store accepts for a derived id.
pub const MAX_ID_LEN: usize = 50;

/// Normalized article used by the pipeline (provider-agnostic).
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub content: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        let title = title.into();
        Self {
            id: derive_id(&title),
            title,
            author: author.into(),
            description: description.into(),
            content: content.into(),
            url: url.into(),
            published_at,
        }
    }

    /// Text handed to classifiers: the body, falling back to the description
    /// and then the title when the body is empty.
    pub fn classification_text(&self) -> &str {
        [&self.content, &self.description, &self.title]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Derive a stable item name from a title.
/// Keeps ASCII letters, digits and whitespace, then caps at `MAX_ID_LEN` chars.
/// "Fed raises rates, again!" -> "Fed raises rates again"
pub fn derive_id(title: &str) -> String {
    let id: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .take(MAX_ID_LEN)
        .collect();
    if id.trim().is_empty() {
        "article".to_string()
    } else {
        id
    }
}

/// newsapi.org v2 response envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiResponse {
    pub status: String,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub articles: Vec<NewsApiArticle>,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsApiArticle {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub published_at: String,
}
