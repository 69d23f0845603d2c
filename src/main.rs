use anyhow::{Context, Result};
use news_enrich::config::Config;
use news_enrich::engine::authenticity::AuthenticityClassifier;
use news_enrich::engine::category::CategoryClassifier;
use news_enrich::engine::inference::InferenceClient;
use news_enrich::engine::sentiment::SentimentClassifier;
use news_enrich::engine::{Classifier, Classifiers, Stage};
use news_enrich::execution::xm_cloud::XmCloudSink;
use news_enrich::execution::{ItemTemplate, PublishStatus, RunReport};
use news_enrich::feed::news_api::NewsApi;
use news_enrich::pipeline::PipelineRunner;
use news_enrich::PipelineError;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

struct Args {
    config_path: PathBuf,
    dry_run: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config_path: PathBuf::from("config.toml"),
        dry_run: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--dry-run" => args.dry_run = true,
            "--config" => {
                let path = it.next().context("--config needs a path")?;
                args.config_path = PathBuf::from(path);
            }
            other => anyhow::bail!("unknown argument: {}", other),
        }
    }
    Ok(args)
}

fn print_report(report: &RunReport) {
    println!();
    for outcome in &report.outcomes {
        match outcome.status {
            PublishStatus::Published => println!(
                "  OK    {} ({})",
                outcome.article_id,
                outcome.remote_ref.as_deref().unwrap_or("dry run")
            ),
            PublishStatus::Failed => println!(
                "  FAIL  {}: {}",
                outcome.article_id,
                outcome.error.as_ref().map(ToString::to_string).unwrap_or_default()
            ),
        }
    }
    println!();
    println!(
        "  {} articles: {} published, {} failed",
        report.total(),
        report.published,
        report.failed
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create("news-enrich.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("news_enrich=info")),
        )
        .with_writer(log_file)
        .init();

    let args = parse_args()?;
    let mut config = Config::load(&args.config_path)?;
    if args.dry_run {
        config.publish.dry_run = true;
    }

    // Load saved keys from .env (real env vars take precedence)
    Config::load_env_file();

    println!();
    println!("  News Enrich v{}", env!("CARGO_PKG_VERSION"));
    println!("  ==================");
    if config.publish.dry_run {
        println!("  ** DRY RUN ** (records are logged, not created)");
    }
    println!();

    let news_api_key = Config::news_api_key()?;
    let inference_token = Config::inference_token()?;
    let publish_key = if config.publish.dry_run {
        String::new()
    } else {
        Config::publish_api_key()?
    };

    let pipeline_config = config.pipeline_config();

    let source = NewsApi::new(news_api_key, &config.feed)?;
    let inference = Arc::new(InferenceClient::new(inference_token, &config.classifier)?);
    let classifiers: Classifiers = [
        (
            Stage::Authenticity,
            Arc::new(AuthenticityClassifier::new(
                inference.clone(),
                &config.classifier.authenticity_model,
                config.classifier.chunk_chars,
            )) as Arc<dyn Classifier>,
        ),
        (
            Stage::Sentiment,
            Arc::new(SentimentClassifier::new(inference.clone(), &config.classifier.sentiment_model))
                as Arc<dyn Classifier>,
        ),
        (
            Stage::Category,
            Arc::new(CategoryClassifier::new(
                inference,
                &config.classifier.category_model,
                pipeline_config.categories.clone(),
            )) as Arc<dyn Classifier>,
        ),
    ]
    .into_iter()
    .collect();
    let sink = XmCloudSink::new(publish_key, &config.publish)?;

    let template = ItemTemplate {
        template_id: config.publish.template_id.clone(),
        parent_id: config.publish.parent_id.clone(),
        language: config.publish.language.clone(),
    };
    let runner = PipelineRunner::new(pipeline_config, template);

    // Ctrl-C before publishing starts abandons the run; after that it is ignored.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel_tx.send(true);
        }
    });

    let report = match runner
        .run_until_cancelled(&source, &classifiers, &sink, cancel_rx)
        .await
    {
        Ok(report) => report,
        Err(PipelineError::Cancelled { enriched }) => {
            println!("  Cancelled before publishing ({} articles enriched).", enriched);
            std::process::exit(130);
        }
        Err(e) => return Err(e).context("pipeline run failed"),
    };

    if report.is_empty() {
        println!("  No articles found.");
    } else {
        print_report(&report);
    }
    std::process::exit(report.exit_code());
}
