//! In-flight counters on classifiers and sinks never exceed the configured widths.

use async_trait::async_trait;
use chrono::Utc;
use news_enrich::engine::Classification;
use news_enrich::execution::{ItemTemplate, PublishAck, PublishRecord};
use news_enrich::{
    Article, ArticleSource, ClassificationError, Classifier, Classifiers, FetchError, PipelineConfig,
    PipelineRunner, PublishError, PublishSink, Stage,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Tracks current and peak concurrent calls.
#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

struct ManyArticles(usize);

#[async_trait]
impl ArticleSource for ManyArticles {
    async fn fetch(&self) -> Result<Vec<Article>, FetchError> {
        Ok((0..self.0)
            .map(|i| Article::new(format!("Story {}", i), "", "", "body", "", Utc::now()))
            .collect())
    }
}

/// Counts concurrent calls for one stage.
struct GaugedClassifier {
    stage: Arc<Gauge>,
}

#[async_trait]
impl Classifier for GaugedClassifier {
    async fn classify(&self, _text: &str) -> Result<Classification, ClassificationError> {
        self.stage.enter();
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.stage.exit();
        Classification::new("neutral", 0.5)
    }
}

struct GaugedSink(Arc<Gauge>);

#[async_trait]
impl PublishSink for GaugedSink {
    async fn publish(&self, _record: &PublishRecord) -> Result<PublishAck, PublishError> {
        self.0.enter();
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.0.exit();
        Ok(PublishAck::default())
    }
}

fn template() -> ItemTemplate {
    ItemTemplate {
        template_id: "{T}".into(),
        parent_id: "{P}".into(),
        language: "en".into(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_enrichment_and_publish_widths_respected() {
    let stage_gauges: Vec<Arc<Gauge>> = (0..3).map(|_| Arc::new(Gauge::default())).collect();
    let classifiers: Classifiers = Stage::ALL
        .iter()
        .zip(&stage_gauges)
        .map(|(&stage, gauge)| {
            (stage, Arc::new(GaugedClassifier { stage: gauge.clone() }) as Arc<dyn Classifier>)
        })
        .collect();
    let sink_gauge = Arc::new(Gauge::default());

    let config = PipelineConfig {
        worker_width: 3,
        publish_concurrency: 2,
        ..PipelineConfig::default()
    };
    let runner = PipelineRunner::new(config, template());

    let report = runner
        .run(&ManyArticles(20), &classifiers, &GaugedSink(sink_gauge.clone()))
        .await
        .unwrap();

    assert_eq!(report.total(), 20);
    assert_eq!(report.published, 20);
    for gauge in &stage_gauges {
        // Each stage runs once per article in flight, so its width is the worker width
        assert!(gauge.peak() <= 3, "stage peak {} exceeded worker width", gauge.peak());
        assert!(gauge.peak() > 1, "stage never ran articles concurrently");
        assert_eq!(gauge.total(), 20);
    }
    assert!(sink_gauge.peak() <= 2, "sink peak {} exceeded concurrency", sink_gauge.peak());
    assert!(sink_gauge.peak() > 1, "sink never ran publishes concurrently");
    assert_eq!(sink_gauge.total(), 20);
}

#[tokio::test]
async fn test_width_one_is_sequential() {
    let gauge = Arc::new(Gauge::default());
    let classifiers: Classifiers = BTreeMap::from([(
        Stage::Sentiment,
        Arc::new(GaugedClassifier { stage: gauge.clone() }) as Arc<dyn Classifier>,
    )]);
    let sink_gauge = Arc::new(Gauge::default());
    let config = PipelineConfig {
        worker_width: 1,
        publish_concurrency: 1,
        ..PipelineConfig::default()
    };

    let report = PipelineRunner::new(config, template())
        .run(&ManyArticles(5), &classifiers, &GaugedSink(sink_gauge.clone()))
        .await
        .unwrap();

    assert_eq!(report.total(), 5);
    assert_eq!(gauge.peak(), 1);
    assert_eq!(sink_gauge.peak(), 1);
}
