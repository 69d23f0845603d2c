use thiserror::Error;

/// Fatal: the feed could not be read, so there is nothing to enrich.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("feed request failed: {0}")]
    Transport(String),

    #[error("feed returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse feed: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Recoverable: recorded against one (article, stage) pair.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassificationError {
    #[error("classifier timed out after {0}ms")]
    Timeout(u64),

    #[error("classifier request failed: {0}")]
    Transport(String),

    #[error("classifier returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed classifier output: {0}")]
    Malformed(String),

    #[error("classifier unavailable: {0}")]
    Capability(String),
}

impl From<reqwest::Error> for ClassificationError {
    fn from(err: reqwest::Error) -> Self {
        ClassificationError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClassificationError {
    fn from(err: serde_json::Error) -> Self {
        ClassificationError::Malformed(err.to_string())
    }
}

/// Recoverable: recorded against one article's publish call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PublishError {
    #[error("publish request failed: {0}")]
    Network(String),

    #[error("publish returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed publish response: {0}")]
    Malformed(String),

    #[error("publish rejected: {0}")]
    Rejected(String),
}

impl PublishError {
    pub fn http_status(&self) -> Option<u16> {
        match self {
            PublishError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => PublishError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None => PublishError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        PublishError::Malformed(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("run cancelled before publishing ({enriched} articles enriched, none published)")]
    Cancelled { enriched: usize },
}
