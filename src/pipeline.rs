use crate::engine::enrich::DEFAULT_MAX_INPUT_CHARS;
use crate::engine::{Classifiers, EnrichedArticle, EnrichmentOrchestrator, Stage};
use crate::error::{FetchError, PipelineError};
use crate::execution::{ItemTemplate, PublishOrchestrator, PublishSink, RunReport};
use crate::feed::ArticleSource;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::watch;

/// Everything the runner decides on behalf of both phases.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub worker_width: usize,
    pub publish_concurrency: usize,
    pub classifier_timeout_ms: u64,
    pub max_input_chars: BTreeMap<Stage, usize>,
    pub categories: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_width: 5,
            publish_concurrency: 4,
            classifier_timeout_ms: 30_000,
            max_input_chars: Stage::ALL
                .iter()
                .map(|&s| (s, DEFAULT_MAX_INPUT_CHARS))
                .collect(),
            categories: Vec::new(),
        }
    }
}

/// Fetch, enrich every article, then publish. Publishing only ever sees
/// fully enriched articles.
pub struct PipelineRunner {
    config: PipelineConfig,
    enricher: EnrichmentOrchestrator,
    publisher: PublishOrchestrator,
}

impl PipelineRunner {
    pub fn new(config: PipelineConfig, template: ItemTemplate) -> Self {
        let enricher = EnrichmentOrchestrator::new(
            config.worker_width,
            Duration::from_millis(config.classifier_timeout_ms),
            config.max_input_chars.clone(),
            config.categories.clone(),
        );
        Self {
            config,
            enricher,
            publisher: PublishOrchestrator::new(template),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(
        &self,
        source: &dyn ArticleSource,
        classifiers: &Classifiers,
        sink: &dyn PublishSink,
    ) -> Result<RunReport, FetchError> {
        let enriched = self.enrich(source, classifiers).await?;
        if enriched.is_empty() {
            return Ok(RunReport::empty());
        }
        Ok(self.publish(&enriched, sink).await)
    }

    /// Like `run`, but stops when `cancel` flips to true. Cancellation while
    /// fetching or enriching abandons the in-flight work. The flag is checked
    /// again once enrichment is done; after that, publishing runs to the end.
    pub async fn run_until_cancelled(
        &self,
        source: &dyn ArticleSource,
        classifiers: &Classifiers,
        sink: &dyn PublishSink,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<RunReport, PipelineError> {
        let enriched = tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                tracing::warn!("run cancelled during enrichment");
                return Err(PipelineError::Cancelled { enriched: 0 });
            }
            result = self.enrich(source, classifiers) => result?,
        };
        if enriched.is_empty() {
            return Ok(RunReport::empty());
        }

        if *cancel.borrow() {
            tracing::warn!(enriched = enriched.len(), "run cancelled before publish");
            return Err(PipelineError::Cancelled { enriched: enriched.len() });
        }
        Ok(self.publish(&enriched, sink).await)
    }

    /// Fetch and enrich. Zero articles short-circuits without touching any
    /// classifier.
    pub async fn enrich(
        &self,
        source: &dyn ArticleSource,
        classifiers: &Classifiers,
    ) -> Result<Vec<EnrichedArticle>, FetchError> {
        let articles = source.fetch().await?;
        if articles.is_empty() {
            tracing::info!("feed returned no articles, nothing to do");
            return Ok(Vec::new());
        }
        tracing::info!(
            articles = articles.len(),
            worker_width = self.config.worker_width,
            "enriching"
        );
        Ok(self.enricher.enrich(articles, classifiers).await)
    }

    /// Publish already-enriched articles. Also the entry point for re-running
    /// the failed subset of an earlier report.
    pub async fn publish(&self, enriched: &[EnrichedArticle], sink: &dyn PublishSink) -> RunReport {
        self.publisher
            .publish(enriched, sink, self.config.publish_concurrency)
            .await
    }
}

/// Resolves once the flag is set. A dropped sender never cancels.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    let sender_dropped = rx.wait_for(|c| *c).await.is_err();
    if sender_dropped {
        std::future::pending::<()>().await;
    }
}
