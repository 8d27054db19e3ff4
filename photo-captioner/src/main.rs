use anyhow::Context;
use clap::Parser;
use photo_captioner::{
    BenchmarkRunner, CaptionPipeline, CaptionerConfig, Cli, EnrichmentLoop, EnrichmentSettings,
    OllamaClient, PgAssetStore, RunMode, ThumbnailFetcher, TokioSleeper,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; flags and the real environment still apply.
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = CaptionerConfig::from_cli(Cli::parse()).context("invalid configuration")?;
    if config.api_key.is_empty() {
        warn!("No photo store API key configured; thumbnail downloads will likely be rejected");
    }

    info!("Connecting to database: {}", config.redacted_database_url());
    let store = PgAssetStore::connect(&config.database_url).await.map_err(|e| {
        error!("Failed to connect to database. Check DB_HOST/DB_USER/DB_PASS or DATABASE_URL");
        e
    })?;
    let store = Arc::new(store);

    let thumbnails = Arc::new(ThumbnailFetcher::new(&config.store_base_url, &config.api_key)?);
    let model = Arc::new(OllamaClient::new(&config.ollama_url)?);
    let pipeline = CaptionPipeline::new(thumbnails, model);

    let outcome = match config.mode {
        RunMode::Benchmark => {
            let runner = BenchmarkRunner::new(
                store.clone(),
                pipeline,
                config.benchmark_models.clone(),
            );
            runner.run().await.map(|_| ())
        }
        RunMode::Normal | RunMode::Watch => {
            let mut enrichment = EnrichmentLoop::new(
                store.clone(),
                pipeline,
                Arc::new(TokioSleeper),
                EnrichmentSettings::from(&config),
            );
            enrichment.run().await.map(|_| ())
        }
    };

    store.close().await;
    outcome.context("run aborted")?;
    Ok(())
}
