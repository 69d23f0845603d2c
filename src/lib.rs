pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod feed;
pub mod pipeline;

pub use engine::{Classifier, Classifiers, EnrichedArticle, Stage};
pub use error::{ClassificationError, FetchError, PipelineError, PublishError};
pub use execution::{PublishOutcome, PublishSink, PublishStatus, RunReport};
pub use feed::{types::Article, ArticleSource};
pub use pipeline::{PipelineConfig, PipelineRunner};
