use super::inference::{InferenceClient, ZeroShotOutput};
use super::{Classification, Classifier};
use crate::error::ClassificationError;
use async_trait::async_trait;
use std::sync::Arc;

/// Zero-shot topic classification over a fixed set of candidate labels.
pub struct CategoryClassifier {
    client: Arc<InferenceClient>,
    model: String,
    candidates: Vec<String>,
}

impl CategoryClassifier {
    pub fn new(client: Arc<InferenceClient>, model: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            client,
            model: model.into(),
            candidates,
        }
    }
}

/// Pick the best-scoring label. The model must answer with one of the
/// candidates it was given.
pub fn best_candidate(out: &ZeroShotOutput, candidates: &[String]) -> Result<Classification, ClassificationError> {
    if out.labels.len() != out.scores.len() {
        return Err(ClassificationError::Malformed(format!(
            "{} labels but {} scores",
            out.labels.len(),
            out.scores.len()
        )));
    }
    let (label, score) = out
        .labels
        .iter()
        .zip(out.scores.iter().copied())
        .filter(|(_, s)| s.is_finite())
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .ok_or_else(|| ClassificationError::Malformed("no category scores".into()))?;

    let canonical = candidates
        .iter()
        .find(|c| c.eq_ignore_ascii_case(label))
        .ok_or_else(|| ClassificationError::Malformed(format!("unexpected category {:?}", label)))?;
    Classification::new(canonical.clone(), score)
}

#[async_trait]
impl Classifier for CategoryClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        if self.candidates.is_empty() {
            return Err(ClassificationError::Capability("no candidate categories configured".into()));
        }
        if text.trim().is_empty() {
            return Err(ClassificationError::Malformed("empty input text".into()));
        }
        let out = self.client.zero_shot(&self.model, text, &self.candidates).await?;
        best_candidate(&out, &self.candidates)
    }
}
