use crate::config::ClassifierConfig;
use crate::error::ClassificationError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for a hosted model inference API (`POST {base}/models/{model}`).
/// Shared by the three stage classifiers.
pub struct InferenceClient {
    client: Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// Text-classification output is nested per input (`[[{..}, {..}]]`) when a
/// batch is sent, but some deployments flatten single inputs (`[{..}]`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TextClassificationOutput {
    Batched(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

impl TextClassificationOutput {
    pub fn into_batches(self) -> Vec<Vec<LabelScore>> {
        match self {
            TextClassificationOutput::Batched(b) => b,
            TextClassificationOutput::Flat(f) => vec![f],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ZeroShotOutput {
    #[serde(default)]
    pub sequence: String,
    pub labels: Vec<String>,
    pub scores: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct InferenceRequest<I, P> {
    inputs: I,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<P>,
    options: InferenceOptions,
}

#[derive(Debug, Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Debug, Serialize)]
pub struct ZeroShotParameters<'a> {
    pub candidate_labels: &'a [String],
}

#[derive(Debug, Deserialize)]
struct InferenceErrorBody {
    error: String,
}

impl InferenceClient {
    pub fn new(token: String, config: &ClassifierConfig) -> Result<Self, ClassificationError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_max_idle_per_host(8)
            .build()?;
        Ok(Self {
            client,
            token,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn text_classification(
        &self,
        model: &str,
        inputs: &[&str],
    ) -> Result<Vec<Vec<LabelScore>>, ClassificationError> {
        let out: TextClassificationOutput = self.post(model, inputs, None::<()>).await?;
        Ok(out.into_batches())
    }

    pub async fn zero_shot(
        &self,
        model: &str,
        input: &str,
        candidate_labels: &[String],
    ) -> Result<ZeroShotOutput, ClassificationError> {
        self.post(model, input, Some(ZeroShotParameters { candidate_labels })).await
    }

    async fn post<I, P, T>(&self, model: &str, inputs: I, parameters: Option<P>) -> Result<T, ClassificationError>
    where
        I: Serialize,
        P: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}/models/{}", self.base_url, model);
        let body = InferenceRequest {
            inputs,
            parameters,
            options: InferenceOptions { wait_for_model: true },
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(status_error(status.as_u16(), &text));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// A model that is loading or not served is a capability problem; anything
/// else is reported with its status.
fn status_error(status: u16, body: &str) -> ClassificationError {
    let message = serde_json::from_str::<InferenceErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.to_string());
    match status {
        404 | 503 => ClassificationError::Capability(message),
        _ => ClassificationError::Status { status, body: message },
    }
}
