use super::{ItemTemplate, PublishRecord, PublishSink};
use crate::engine::EnrichedArticle;
use crate::error::PublishError;
use futures_util::future;
use futures_util::stream::{self, StreamExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Published,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishOutcome {
    /// Position of the article in the batch handed to `publish`. Ids can
    /// collide, so this is the key for selecting articles again.
    pub index: usize,
    pub article_id: String,
    pub status: PublishStatus,
    pub error: Option<PublishError>,
    pub remote_ref: Option<String>,
}

impl PublishOutcome {
    fn from_result(
        index: usize,
        article_id: String,
        result: Result<super::PublishAck, PublishError>,
    ) -> Self {
        match result {
            Ok(ack) => Self {
                index,
                article_id,
                status: PublishStatus::Published,
                error: None,
                remote_ref: ack.remote_ref,
            },
            Err(e) => Self {
                index,
                article_id,
                status: PublishStatus::Failed,
                error: Some(e),
                remote_ref: None,
            },
        }
    }
}

/// Outcomes in input article order, plus counts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub outcomes: Vec<PublishOutcome>,
    pub published: usize,
    pub failed: usize,
}

impl RunReport {
    pub fn new(outcomes: Vec<PublishOutcome>) -> Self {
        let published = outcomes
            .iter()
            .filter(|o| o.status == PublishStatus::Published)
            .count();
        let failed = outcomes.len() - published;
        Self { outcomes, published, failed }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// The articles whose publish failed, picked by position from the batch
    /// this report was produced for. Feed the result back into `publish` to
    /// retry only those.
    pub fn failed_subset(&self, enriched: &[EnrichedArticle]) -> Vec<EnrichedArticle> {
        self.outcomes
            .iter()
            .filter(|o| o.status == PublishStatus::Failed)
            .filter_map(|o| enriched.get(o.index).cloned())
            .collect()
    }

    /// Process exit code for a CLI wrapper: 0 only when nothing failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 { 0 } else { 1 }
    }
}

/// Bounded fan-out of publish calls. One call per article; a failure is
/// recorded and never stops the rest of the batch.
pub struct PublishOrchestrator {
    template: ItemTemplate,
}

impl PublishOrchestrator {
    pub fn new(template: ItemTemplate) -> Self {
        Self { template }
    }

    pub async fn publish(
        &self,
        enriched: &[EnrichedArticle],
        sink: &dyn PublishSink,
        concurrency: usize,
    ) -> RunReport {
        let mut slots: Vec<Option<PublishOutcome>> = Vec::with_capacity(enriched.len());
        slots.resize_with(enriched.len(), || None);

        stream::iter(enriched.iter().enumerate())
            .map(|(idx, article)| async move {
                let record = PublishRecord::from_enriched(article, &self.template);
                let result = sink.publish(&record).await;
                match &result {
                    Ok(ack) => tracing::info!(
                        article_id = %article.id(),
                        remote_ref = ack.remote_ref.as_deref().unwrap_or("-"),
                        "published"
                    ),
                    Err(e) => tracing::warn!(article_id = %article.id(), error = %e, "publish failed"),
                }
                (idx, PublishOutcome::from_result(idx, article.id().to_string(), result))
            })
            .buffer_unordered(concurrency.max(1))
            .for_each(|(idx, outcome)| {
                slots[idx] = Some(outcome);
                future::ready(())
            })
            .await;

        let report = RunReport::new(slots.into_iter().flatten().collect());
        tracing::info!(
            total = report.total(),
            published = report.published,
            failed = report.failed,
            "publish complete"
        );
        report
    }
}
