use super::inference::{InferenceClient, LabelScore};
use super::{Classification, Classifier};
use crate::error::ClassificationError;
use async_trait::async_trait;
use std::sync::Arc;

pub const REAL: &str = "real";
pub const FAKE: &str = "fake";

/// Real/fake detection over a text-classification model that emits
/// `LABEL_1` (real) and `LABEL_0` (fake).
pub struct AuthenticityClassifier {
    client: Arc<InferenceClient>,
    model: String,
    chunk_chars: usize,
}

impl AuthenticityClassifier {
    pub fn new(client: Arc<InferenceClient>, model: impl Into<String>, chunk_chars: usize) -> Self {
        Self {
            client,
            model: model.into(),
            chunk_chars: chunk_chars.max(1),
        }
    }
}

/// Split `text` into pieces of at most `chunk_chars` characters, cutting on
/// char boundaries.
pub fn split_chunks(text: &str, chunk_chars: usize) -> Vec<&str> {
    let chunk_chars = chunk_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(chunk_chars)
            .map_or(rest.len(), |(i, _)| i);
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

fn is_real(label: &str) -> bool {
    label == "LABEL_1" || label.eq_ignore_ascii_case(REAL)
}

fn is_fake(label: &str) -> bool {
    label == "LABEL_0" || label.eq_ignore_ascii_case(FAKE)
}

/// Average each verdict's score over all chunks and keep the higher one.
/// Equal averages resolve to `real`.
pub fn decide(chunks: &[Vec<LabelScore>]) -> Result<Classification, ClassificationError> {
    if chunks.is_empty() {
        return Err(ClassificationError::Malformed("no chunk results".into()));
    }

    let mut real = 0.0;
    let mut fake = 0.0;
    let mut recognized = false;
    for chunk in chunks {
        for ls in chunk {
            if is_real(&ls.label) {
                real += ls.score;
                recognized = true;
            } else if is_fake(&ls.label) {
                fake += ls.score;
                recognized = true;
            }
        }
    }
    if !recognized {
        return Err(ClassificationError::Malformed(
            "no real/fake labels in model output".into(),
        ));
    }

    let n = chunks.len() as f64;
    let (real, fake) = (real / n, fake / n);
    if real >= fake {
        Classification::new(REAL, real)
    } else {
        Classification::new(FAKE, fake)
    }
}

#[async_trait]
impl Classifier for AuthenticityClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
        let chunks = split_chunks(text, self.chunk_chars);
        if chunks.is_empty() {
            return Err(ClassificationError::Malformed("empty input text".into()));
        }
        let results = self.client.text_classification(&self.model, &chunks).await?;
        if results.len() != chunks.len() {
            return Err(ClassificationError::Malformed(format!(
                "sent {} chunks, got {} results",
                chunks.len(),
                results.len()
            )));
        }
        decide(&results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ls(label: &str, score: f64) -> LabelScore {
        LabelScore { label: label.into(), score }
    }

    #[test]
    fn test_split_chunks_respects_char_boundaries() {
        let chunks = split_chunks("ééééé", 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_split_chunks_empty_text() {
        assert!(split_chunks("", 512).is_empty());
    }

    #[test]
    fn test_decide_averages_over_chunks() {
        let chunks = vec![
            vec![ls("LABEL_1", 0.9), ls("LABEL_0", 0.1)],
            vec![ls("LABEL_1", 0.3), ls("LABEL_0", 0.7)],
        ];
        let c = decide(&chunks).unwrap();
        assert_eq!(c.label, REAL);
        assert!((c.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_decide_top_label_only_output() {
        // Models that return only the top label per chunk
        let chunks = vec![vec![ls("LABEL_0", 0.8)], vec![ls("LABEL_0", 0.6)]];
        let c = decide(&chunks).unwrap();
        assert_eq!(c.label, FAKE);
        assert!((c.score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_decide_tie_favors_real() {
        let chunks = vec![vec![ls("LABEL_1", 0.5), ls("LABEL_0", 0.5)]];
        assert_eq!(decide(&chunks).unwrap().label, REAL);
    }

    #[test]
    fn test_decide_unknown_labels_are_malformed() {
        let chunks = vec![vec![ls("POSITIVE", 0.9)]];
        assert!(matches!(decide(&chunks), Err(ClassificationError::Malformed(_))));
    }
}
