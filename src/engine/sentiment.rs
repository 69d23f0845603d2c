use super::inference::{InferenceClient, LabelScore};
use super::{Classification, Classifier};
use crate::error::ClassificationError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct SentimentClassifier {
    client: Arc<InferenceClient>,
    model: String,
}

impl SentimentClassifier {
    pub fn new(client: Arc<InferenceClient>, model: impl Into<String>) -> Self {
        Self { client, model: model.into() }
    }
}

/// Highest-scoring label, lowercased ("POSITIVE" -> "positive").
pub fn top_label(scores: &[LabelScore]) -> Result<Classification, ClassificationError> {
    let best = scores
        .iter()
        .filter(|ls| ls.score.is_finite())
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| ClassificationError::Malformed("no sentiment labels".into()))?;
    Classification::new(best.label.to_lowercase(), best.score)
}

#[async_trait]
impl Classifier for SentimentClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        if text.trim().is_empty() {
            return Err(ClassificationError::Malformed("empty input text".into()));
        }
        let results = self.client.text_classification(&self.model, &[text]).await?;
        let first = results
            .first()
            .ok_or_else(|| ClassificationError::Malformed("empty sentiment output".into()))?;
        top_label(first)
    }
}
