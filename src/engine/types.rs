use crate::error::ClassificationError;
use crate::feed::types::Article;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Authenticity,
    Sentiment,
    Category,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Authenticity, Stage::Sentiment, Stage::Category];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Authenticity => "authenticity",
            Stage::Sentiment => "sentiment",
            Stage::Category => "category",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label with its confidence. `score` is always finite and within [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, score: f64) -> Result<Self, ClassificationError> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(ClassificationError::Malformed("empty label".into()));
        }
        if !score.is_finite() || !(0.0..=1.0).contains(&score) {
            return Err(ClassificationError::Malformed(format!(
                "score {} for {:?} outside [0, 1]",
                score, label
            )));
        }
        Ok(Self { label, score })
    }
}

/// Outcome of one (article, stage) attempt. A failed stage carries only its
/// error, never a placeholder label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub stage: Stage,
    pub outcome: Result<Classification, ClassificationError>,
}

impl ClassificationResult {
    pub fn classification(&self) -> Option<&Classification> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ClassificationError> {
        self.outcome.as_ref().err()
    }
}

/// An article plus one result per configured stage.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedArticle {
    pub article: Article,
    pub results: BTreeMap<Stage, ClassificationResult>,
}

impl EnrichedArticle {
    pub fn id(&self) -> &str {
        &self.article.id
    }

    /// The successful classification for `stage`, if that stage ran and succeeded.
    pub fn classification(&self, stage: Stage) -> Option<&Classification> {
        self.results.get(&stage).and_then(ClassificationResult::classification)
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        self.results
            .values()
            .filter(|r| r.outcome.is_err())
            .map(|r| r.stage)
            .collect()
    }

    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.results.values().all(|r| r.outcome.is_err())
    }
}
