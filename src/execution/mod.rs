pub mod publisher;
pub mod record;
pub mod xm_cloud;

pub use publisher::{PublishOrchestrator, PublishOutcome, PublishStatus, RunReport};
pub use record::{ItemTemplate, PublishRecord};

use crate::error::PublishError;
use async_trait::async_trait;

/// What the content store returned for a created item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishAck {
    /// Remote item id; absent when nothing was sent (dry run).
    pub remote_ref: Option<String>,
}

/// Performs one create call per record.
#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn publish(&self, record: &PublishRecord) -> Result<PublishAck, PublishError>;
}
