use super::types::*;
use super::ArticleSource;
use crate::config::FeedConfig;
use crate::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use std::time::Duration;

pub struct NewsApi {
    client: Client,
    api_key: String,
    base_url: String,
    country: String,
    page_size: u32,
}

impl NewsApi {
    pub fn new(api_key: String, config: &FeedConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country: config.country.clone(),
            page_size: config.page_size,
        })
    }
}

/// Parse the feed's `publishedAt`. newsapi.org sends `2024-03-01T12:30:00Z`;
/// some sources include fractional seconds or an offset, so RFC 3339 is
/// accepted too.
pub fn parse_published_at(raw: &str) -> Result<DateTime<Utc>, FetchError> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ") {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FetchError::Parse(format!("invalid publishedAt {:?}: {}", raw, e)))
}

/// Normalize a decoded response. Entries without a body are skipped; any
/// other malformed entry fails the whole batch.
pub fn normalize(response: NewsApiResponse) -> Result<Vec<Article>, FetchError> {
    if response.status != "ok" {
        return Err(FetchError::Parse(format!(
            "feed status {:?} ({}): {}",
            response.status,
            response.code.unwrap_or_default(),
            response.message.unwrap_or_default(),
        )));
    }

    let mut articles = Vec::with_capacity(response.articles.len());
    for entry in response.articles {
        let content = entry.content.unwrap_or_default();
        if content.trim().is_empty() {
            continue;
        }
        let published_at = parse_published_at(&entry.published_at)?;
        articles.push(Article::new(
            entry.title.unwrap_or_default(),
            entry.author.unwrap_or_default(),
            entry.description.unwrap_or_default(),
            content,
            entry.url.unwrap_or_default(),
            published_at,
        ));
    }
    Ok(articles)
}

#[async_trait]
impl ArticleSource for NewsApi {
    async fn fetch(&self) -> Result<Vec<Article>, FetchError> {
        let url = format!("{}/v2/top-headlines", self.base_url);
        let page_size = self.page_size.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[("country", self.country.as_str()), ("pageSize", page_size.as_str())])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status: status.as_u16(), body });
        }

        let body = resp.text().await?;
        let parsed: NewsApiResponse = serde_json::from_str(&body)?;
        let articles = normalize(parsed)?;
        tracing::info!(count = articles.len(), country = %self.country, "fetched articles");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> NewsApiResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_published_at_feed_format() {
        let dt = parse_published_at("2024-03-01T12:30:05Z").unwrap();
        assert_eq!(dt.format("%Y%m%dT%H%M%S").to_string(), "20240301T123005");
    }

    #[test]
    fn test_parse_published_at_with_offset() {
        let dt = parse_published_at("2024-03-01T14:30:05+02:00").unwrap();
        assert_eq!(dt.format("%Y%m%dT%H%M%S").to_string(), "20240301T123005");
    }

    #[test]
    fn test_parse_published_at_rejects_garbage() {
        assert!(matches!(parse_published_at("yesterday"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_normalize_skips_entries_without_content() {
        let resp = response(
            r#"{"status":"ok","totalResults":2,"articles":[
                {"title":"Has body","author":"A","description":"d","content":"text","url":"https://x/1","publishedAt":"2024-03-01T12:00:00Z"},
                {"title":"No body","author":null,"description":null,"content":null,"url":"https://x/2","publishedAt":"2024-03-01T12:00:00Z"}
            ]}"#,
        );
        let articles = normalize(resp).unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].id, "Has body");
        assert_eq!(articles[0].author, "A");
    }

    #[test]
    fn test_normalize_bad_timestamp_fails_whole_batch() {
        let resp = response(
            r#"{"status":"ok","articles":[
                {"title":"Good","content":"text","publishedAt":"2024-03-01T12:00:00Z"},
                {"title":"Bad","content":"text","publishedAt":"not a date"}
            ]}"#,
        );
        assert!(normalize(resp).is_err());
    }

    #[test]
    fn test_normalize_error_status() {
        let resp = response(r#"{"status":"error","code":"apiKeyInvalid","message":"Your API key is invalid."}"#);
        let err = normalize(resp).unwrap_err();
        assert!(err.to_string().contains("apiKeyInvalid"));
    }
}
