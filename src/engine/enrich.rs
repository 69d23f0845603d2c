use super::{Classification, ClassificationResult, Classifier, Classifiers, EnrichedArticle, Stage};
use crate::error::ClassificationError;
use crate::feed::types::Article;
use futures_util::future::{self, join_all};
use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Input prefix used for a stage that has no explicit cap.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 512;

/// Runs every configured classifier over every article with at most
/// `worker_width` articles in flight. Never drops an article: failures are
/// recorded per stage.
pub struct EnrichmentOrchestrator {
    worker_width: usize,
    timeout: Duration,
    max_input_chars: BTreeMap<Stage, usize>,
    categories: Vec<String>,
}

impl EnrichmentOrchestrator {
    pub fn new(
        worker_width: usize,
        timeout: Duration,
        max_input_chars: BTreeMap<Stage, usize>,
        categories: Vec<String>,
    ) -> Self {
        Self {
            worker_width: worker_width.max(1),
            timeout,
            max_input_chars,
            categories,
        }
    }

    /// Enrich `articles`, returning one `EnrichedArticle` per input in input order.
    pub async fn enrich(&self, articles: Vec<Article>, classifiers: &Classifiers) -> Vec<EnrichedArticle> {
        let total = articles.len();
        let mut slots: Vec<Option<EnrichedArticle>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        stream::iter(articles.into_iter().enumerate())
            .map(|(idx, article)| async move { (idx, self.enrich_one(article, classifiers).await) })
            .buffer_unordered(self.worker_width)
            .for_each(|(idx, enriched)| {
                slots[idx] = Some(enriched);
                future::ready(())
            })
            .await;

        let enriched: Vec<EnrichedArticle> = slots.into_iter().flatten().collect();
        let stage_failures: usize = enriched.iter().map(|e| e.failed_stages().len()).sum();
        tracing::info!(
            articles = enriched.len(),
            stages = classifiers.len(),
            stage_failures,
            "enrichment complete"
        );
        enriched
    }

    async fn enrich_one(&self, article: Article, classifiers: &Classifiers) -> EnrichedArticle {
        let text = article.classification_text();
        let stages = classifiers.iter().map(|(&stage, classifier)| {
            let input = truncate_chars(text, self.max_chars(stage));
            async move {
                let outcome = self.run_stage(stage, classifier.as_ref(), input).await;
                ClassificationResult { stage, outcome }
            }
        });
        let results = join_all(stages).await;

        for r in &results {
            if let Err(e) = &r.outcome {
                tracing::warn!(article_id = %article.id, stage = %r.stage, error = %e, "classification failed");
            }
        }

        EnrichedArticle {
            results: results.into_iter().map(|r| (r.stage, r)).collect(),
            article,
        }
    }

    /// One isolated classifier call. Any failure, panics and timeouts
    /// included, becomes this stage's error.
    async fn run_stage(
        &self,
        stage: Stage,
        classifier: &dyn Classifier,
        input: &str,
    ) -> Result<Classification, ClassificationError> {
        let call = AssertUnwindSafe(classifier.classify(input)).catch_unwind();
        match tokio::time::timeout(self.timeout, call).await {
            Err(_) => Err(ClassificationError::Timeout(self.timeout.as_millis() as u64)),
            Ok(Err(panic)) => Err(ClassificationError::Capability(format!(
                "classifier panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Ok(Ok(result)) => result.and_then(|c| self.validate(stage, c)),
        }
    }

    /// Re-check what a classifier returned: scores stay in range, and the
    /// category stage answers with one of the configured labels.
    fn validate(&self, stage: Stage, c: Classification) -> Result<Classification, ClassificationError> {
        let c = Classification::new(c.label, c.score)?;
        if stage != Stage::Category || self.categories.is_empty() {
            return Ok(c);
        }
        match self.categories.iter().find(|cat| cat.eq_ignore_ascii_case(&c.label)) {
            Some(cat) => Ok(Classification { label: cat.clone(), score: c.score }),
            None => Err(ClassificationError::Malformed(format!(
                "category {:?} is not a configured label",
                c.label
            ))),
        }
    }

    fn max_chars(&self, stage: Stage) -> usize {
        self.max_input_chars
            .get(&stage)
            .copied()
            .unwrap_or(DEFAULT_MAX_INPUT_CHARS)
    }
}

/// Longest prefix of `text` with at most `max` chars.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    struct Fixed(&'static str, f64);

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _text: &str) -> Result<Classification, ClassificationError> {
            Classification::new(self.0, self.1)
        }
    }

    struct Failing;

    #[async_trait]
    impl Classifier for Failing {
        async fn classify(&self, _text: &str) -> Result<Classification, ClassificationError> {
            Err(ClassificationError::Capability("model offline".into()))
        }
    }

    struct Panicking;

    #[async_trait]
    impl Classifier for Panicking {
        async fn classify(&self, _text: &str) -> Result<Classification, ClassificationError> {
            panic!("tokenizer exploded")
        }
    }

    struct Slow;

    #[async_trait]
    impl Classifier for Slow {
        async fn classify(&self, _text: &str) -> Result<Classification, ClassificationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Classification::new("late", 0.5)
        }
    }

    /// Records the text it was asked to classify.
    struct Recording(Mutex<Vec<String>>);

    #[async_trait]
    impl Classifier for Recording {
        async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
            self.0.lock().unwrap().push(text.to_string());
            Classification::new("neutral", 0.5)
        }
    }

    fn article(title: &str, content: &str) -> Article {
        Article::new(title, "author", "description", content, "https://example.com", Utc::now())
    }

    fn orchestrator() -> EnrichmentOrchestrator {
        EnrichmentOrchestrator::new(
            2,
            Duration::from_millis(200),
            BTreeMap::from([(Stage::Sentiment, 4)]),
            vec!["Politics".into(), "Sports".into()],
        )
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("hi", 0), "");
    }

    #[tokio::test]
    async fn test_stage_failure_keeps_other_stages() {
        let classifiers: Classifiers = BTreeMap::from([
            (Stage::Authenticity, Arc::new(Fixed("real", 0.9)) as Arc<dyn Classifier>),
            (Stage::Sentiment, Arc::new(Failing) as Arc<dyn Classifier>),
            (Stage::Category, Arc::new(Fixed("Sports", 0.7)) as Arc<dyn Classifier>),
        ]);
        let out = orchestrator().enrich(vec![article("A", "body")], &classifiers).await;

        assert_eq!(out.len(), 1);
        let e = &out[0];
        assert_eq!(e.classification(Stage::Authenticity).unwrap().label, "real");
        assert_eq!(e.classification(Stage::Category).unwrap().label, "Sports");
        assert!(e.classification(Stage::Sentiment).is_none());
        assert_eq!(e.failed_stages(), vec![Stage::Sentiment]);
    }

    #[tokio::test]
    async fn test_panic_and_timeout_are_recorded() {
        let classifiers: Classifiers = BTreeMap::from([
            (Stage::Authenticity, Arc::new(Panicking) as Arc<dyn Classifier>),
            (Stage::Sentiment, Arc::new(Slow) as Arc<dyn Classifier>),
        ]);
        let out = orchestrator().enrich(vec![article("A", "body")], &classifiers).await;

        let auth = out[0].results[&Stage::Authenticity].error().unwrap();
        assert!(auth.to_string().contains("tokenizer exploded"));
        assert_eq!(
            out[0].results[&Stage::Sentiment].error(),
            Some(&ClassificationError::Timeout(200))
        );
        assert!(out[0].all_failed());
    }

    #[tokio::test]
    async fn test_all_stages_failed_article_is_kept() {
        let classifiers: Classifiers = BTreeMap::from([
            (Stage::Authenticity, Arc::new(Failing) as Arc<dyn Classifier>),
            (Stage::Sentiment, Arc::new(Failing) as Arc<dyn Classifier>),
            (Stage::Category, Arc::new(Failing) as Arc<dyn Classifier>),
        ]);
        let articles = vec![article("A", "x"), article("B", "y")];
        let out = orchestrator().enrich(articles, &classifiers).await;
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(EnrichedArticle::all_failed));
    }

    #[tokio::test]
    async fn test_out_of_range_score_and_unknown_category_rejected() {
        struct Unchecked(&'static str, f64);

        #[async_trait]
        impl Classifier for Unchecked {
            async fn classify(&self, _text: &str) -> Result<Classification, ClassificationError> {
                Ok(Classification { label: self.0.into(), score: self.1 })
            }
        }

        let classifiers: Classifiers = BTreeMap::from([
            (Stage::Authenticity, Arc::new(Unchecked("real", 1.5)) as Arc<dyn Classifier>),
            (Stage::Category, Arc::new(Unchecked("Weather", 0.9)) as Arc<dyn Classifier>),
        ]);
        let out = orchestrator().enrich(vec![article("A", "body")], &classifiers).await;
        assert!(matches!(
            out[0].results[&Stage::Authenticity].error(),
            Some(ClassificationError::Malformed(_))
        ));
        assert!(matches!(
            out[0].results[&Stage::Category].error(),
            Some(ClassificationError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_input_truncated_per_stage() {
        let sentiment = Arc::new(Recording(Mutex::new(Vec::new())));
        let category = Arc::new(Recording(Mutex::new(Vec::new())));
        let classifiers: Classifiers = BTreeMap::from([
            (Stage::Sentiment, sentiment.clone() as Arc<dyn Classifier>),
            (Stage::Category, category.clone() as Arc<dyn Classifier>),
        ]);
        let orch = EnrichmentOrchestrator::new(1, Duration::from_secs(1), BTreeMap::from([(Stage::Sentiment, 4)]), vec![]);
        orch.enrich(vec![article("A", "abcdefgh")], &classifiers).await;

        assert_eq!(sentiment.0.lock().unwrap().as_slice(), ["abcd"]);
        // No explicit cap -> default prefix, which covers this short body
        assert_eq!(category.0.lock().unwrap().as_slice(), ["abcdefgh"]);
    }

    #[tokio::test]
    async fn test_output_order_matches_input() {
        struct DelayByTitle;

        #[async_trait]
        impl Classifier for DelayByTitle {
            async fn classify(&self, text: &str) -> Result<Classification, ClassificationError> {
                let ms = text.parse::<u64>().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Classification::new("neutral", 0.5)
            }
        }

        let classifiers: Classifiers =
            BTreeMap::from([(Stage::Sentiment, Arc::new(DelayByTitle) as Arc<dyn Classifier>)]);
        let articles = vec![article("first", "60"), article("second", "1"), article("third", "30")];
        let orch = EnrichmentOrchestrator::new(3, Duration::from_secs(1), BTreeMap::new(), vec![]);
        let out = orch.enrich(articles, &classifiers).await;
        let ids: Vec<&str> = out.iter().map(EnrichedArticle::id).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }
}
