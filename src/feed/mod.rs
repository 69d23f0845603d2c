pub mod news_api;
pub mod types;

use crate::error::FetchError;
use async_trait::async_trait;
use types::Article;

/// A batch source of normalized articles. All-or-nothing per call.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Article>, FetchError>;
}
