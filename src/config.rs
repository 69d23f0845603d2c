use crate::engine::Stage;
use crate::pipeline::PipelineConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

const ENV_FILE: &str = ".env";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    pub classifier: ClassifierConfig,
    pub publish: PublishConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub base_url: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_country() -> String { "us".to_string() }
fn default_page_size() -> u32 { 20 }
fn default_request_timeout() -> u64 { 10_000 }

#[derive(Debug, Deserialize, Clone)]
pub struct EnrichmentConfig {
    #[serde(default = "default_worker_width")]
    pub worker_width: usize,
    #[serde(default = "default_classifier_timeout")]
    pub classifier_timeout_ms: u64,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub max_input_chars: MaxInputChars,
}

fn default_worker_width() -> usize { 5 }
fn default_classifier_timeout() -> u64 { 30_000 }

fn default_categories() -> Vec<String> {
    ["Politics", "Technology", "Sports", "Health", "Entertainment", "Finance"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            worker_width: default_worker_width(),
            classifier_timeout_ms: default_classifier_timeout(),
            categories: default_categories(),
            max_input_chars: MaxInputChars::default(),
        }
    }
}

/// Per-stage cap on the text prefix a classifier sees.
#[derive(Debug, Deserialize, Clone)]
pub struct MaxInputChars {
    #[serde(default = "default_authenticity_chars")]
    pub authenticity: usize,
    #[serde(default = "default_short_chars")]
    pub sentiment: usize,
    #[serde(default = "default_short_chars")]
    pub category: usize,
}

fn default_authenticity_chars() -> usize { 4096 }
fn default_short_chars() -> usize { 512 }

impl Default for MaxInputChars {
    fn default() -> Self {
        Self {
            authenticity: default_authenticity_chars(),
            sentiment: default_short_chars(),
            category: default_short_chars(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub authenticity_model: String,
    pub sentiment_model: String,
    pub category_model: String,
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_chunk_chars() -> usize { 512 }

#[derive(Debug, Deserialize, Clone)]
pub struct PublishConfig {
    pub endpoint: String,
    pub template_id: String,
    pub parent_id: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_publish_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub dry_run: bool,
}

fn default_language() -> String { "en".to_string() }
fn default_publish_concurrency() -> usize { 4 }

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.enrichment.worker_width == 0 {
            anyhow::bail!("enrichment.worker_width must be > 0");
        }
        if self.enrichment.classifier_timeout_ms == 0 {
            anyhow::bail!("enrichment.classifier_timeout_ms must be > 0");
        }
        if self.publish.concurrency == 0 {
            anyhow::bail!("publish.concurrency must be > 0");
        }
        if self.enrichment.categories.is_empty() {
            anyhow::bail!("enrichment.categories cannot be empty");
        }
        if self.classifier.chunk_chars == 0 {
            anyhow::bail!("classifier.chunk_chars must be > 0");
        }
        Ok(())
    }

    /// The slice of configuration the pipeline runner owns.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let chars = &self.enrichment.max_input_chars;
        let max_input_chars = BTreeMap::from([
            (Stage::Authenticity, chars.authenticity),
            (Stage::Sentiment, chars.sentiment),
            (Stage::Category, chars.category),
        ]);
        PipelineConfig {
            worker_width: self.enrichment.worker_width,
            publish_concurrency: self.publish.concurrency,
            classifier_timeout_ms: self.enrichment.classifier_timeout_ms,
            max_input_chars,
            categories: self.enrichment.categories.clone(),
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        // Strip BOM if present (common on Windows-created files)
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim().trim_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    pub fn news_api_key() -> Result<String> {
        secret("NEWS_API_KEY", "News API key (newsapi.org)")
    }

    pub fn inference_token() -> Result<String> {
        secret("HF_API_TOKEN", "Inference API token")
    }

    /// Not needed in dry-run mode, where nothing is sent.
    pub fn publish_api_key() -> Result<String> {
        secret("XM_CLOUD_API_KEY", "Content store API key")
    }
}

/// Secrets come from environment variables, or are prompted at startup.
/// Prompted values are saved to .env for future runs.
fn secret(var: &str, label: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Ok(sanitize_key(&value)),
        _ => {
            let value = prompt(label)?;
            save_env_var(var, &value);
            Ok(value)
        }
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let value = input.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", label);
    }
    Ok(value)
}

/// Strip carriage returns, BOM, and other invisible chars from a key value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

/// Append a KEY=VALUE line to .env and set it in the current process.
fn save_env_var(key: &str, value: &str) {
    std::env::set_var(key, value);
    let path = Path::new(ENV_FILE);
    let mut contents = std::fs::read_to_string(path).unwrap_or_default();
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&format!("{}={}\n", key, value));
    let _ = std::fs::write(path, contents);
}
