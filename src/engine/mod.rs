pub mod authenticity;
pub mod category;
pub mod enrich;
pub mod inference;
pub mod sentiment;
pub mod types;

pub use enrich::EnrichmentOrchestrator;
pub use types::{Classification, ClassificationResult, EnrichedArticle, Stage};

use crate::error::ClassificationError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A scoring capability: rule-based, remote or model-backed, the
/// orchestrator only sees text in and a label out.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError>;
}

/// The classifiers configured for a run, keyed by the stage they fill.
pub type Classifiers = BTreeMap<Stage, Arc<dyn Classifier>>;
