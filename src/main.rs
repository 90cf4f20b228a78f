//! paper-sift entrypoint: scores a JSON paper listing and prints the digest as JSON.

use std::path::PathBuf;

use mimalloc::MiMalloc;

use sift::config::Config;
use sift::paper::{filter_by_categories, load_papers, resolve_topic};
use sift::pipeline::Pipeline;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let interest = config.interest_query()?;
    let provider = config.resolved_provider()?;
    let papers_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config.papers_path.clone());

    tracing::info!(
        provider = %provider,
        model = %config.decoding.model_name,
        batch_size = config.limits.batch_size,
        threshold = config.limits.threshold,
        papers = %papers_path.display(),
        "paper-sift starting"
    );

    if let Some(topic) = &config.topic {
        let code = resolve_topic(topic)?;
        tracing::info!(topic = %topic, code, "Scoring topic");
    }

    let papers = load_papers(&papers_path).await?;
    let loaded = papers.len();
    let papers = filter_by_categories(papers, &config.categories);
    if papers.len() != loaded {
        tracing::info!(
            loaded,
            kept = papers.len(),
            categories = ?config.categories,
            "Applied category filter"
        );
    }

    let pipeline = Pipeline::new(config.completion_client()?, config.pipeline_options())?;
    let run = pipeline.run(&interest, papers).await?;

    if let Some(warning) = run.warning() {
        tracing::warn!("{}", warning);
    }

    println!("{}", serde_json::to_string_pretty(&run)?);
    Ok(())
}
