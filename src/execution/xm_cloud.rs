use super::{PublishAck, PublishRecord, PublishSink};
use crate::config::PublishConfig;
use crate::error::PublishError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CREATE_ITEM_MUTATION: &str = r#"
mutation($input: CreateItemInput!) {
    createItem(input: $input) {
        item {
            itemId
            name
            path
        }
    }
}
"#;

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'static str,
    pub variables: CreateItemVariables<'a>,
}

#[derive(Debug, Serialize)]
pub struct CreateItemVariables<'a> {
    pub input: &'a PublishRecord,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<CreateItemData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemData {
    pub create_item: Option<CreateItemPayload>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemPayload {
    pub item: Option<CreatedItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedItem {
    pub item_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

/// Creates items through the content store's authoring GraphQL API.
pub struct XmCloudSink {
    client: Client,
    endpoint: String,
    api_key: String,
    dry_run: bool,
}

impl XmCloudSink {
    pub fn new(api_key: String, config: &PublishConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_max_idle_per_host(config.concurrency)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            dry_run: config.dry_run,
        })
    }

    pub fn request_body(record: &PublishRecord) -> GraphQlRequest<'_> {
        GraphQlRequest {
            query: CREATE_ITEM_MUTATION,
            variables: CreateItemVariables { input: record },
        }
    }
}

/// Turn a 2xx GraphQL body into an ack. Mutation failures arrive in
/// `errors` with a 200 status.
pub fn parse_response(body: &str) -> Result<PublishAck, PublishError> {
    let parsed: GraphQlResponse = serde_json::from_str(body)?;
    if !parsed.errors.is_empty() {
        let messages: Vec<&str> = parsed.errors.iter().map(|e| e.message.as_str()).collect();
        return Err(PublishError::Rejected(messages.join("; ")));
    }
    let item = parsed
        .data
        .and_then(|d| d.create_item)
        .and_then(|c| c.item)
        .ok_or_else(|| PublishError::Malformed("response has no createItem.item".into()))?;
    Ok(PublishAck {
        remote_ref: Some(item.item_id),
    })
}

#[async_trait]
impl PublishSink for XmCloudSink {
    async fn publish(&self, record: &PublishRecord) -> Result<PublishAck, PublishError> {
        if self.dry_run {
            tracing::info!(
                name = %record.name,
                fields = record.fields.len(),
                "DRY RUN: would create item"
            );
            return Ok(PublishAck::default());
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&Self::request_body(record))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(PublishError::Status { status: status.as_u16(), body });
        }
        parse_response(&body)
    }
}
