use anyhow::Context;
use personalization_engine::{
    jobs::{DigestBatchJob, DigestSink, LoggingDigestSink, RedisDigestSink},
    services::storage::{InMemoryCatalog, RedisInteractionLedger, RedisProfileStore},
    Config, PersonalizationEngine,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load config")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.service.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    info!(
        service = %config.service.service_name,
        cutoff_policy = ?config.digest.cutoff_policy,
        "Starting digest run"
    );

    let redis_client = redis::Client::open(config.storage.redis_url.clone())
        .context("Failed to create Redis client")?;

    let catalog = InMemoryCatalog::load_json(&config.storage.catalog_path)
        .with_context(|| format!("Failed to load catalog from {}", config.storage.catalog_path))?;
    info!(items = catalog.len(), "Catalog snapshot loaded");

    let engine = Arc::new(PersonalizationEngine::new(
        Arc::new(RedisProfileStore::new(redis_client.clone())),
        Arc::new(catalog),
        Arc::new(RedisInteractionLedger::new(redis_client.clone())),
        &config,
    ));

    let sink: Arc<dyn DigestSink> = if config.digest.dry_run {
        Arc::new(LoggingDigestSink)
    } else {
        Arc::new(RedisDigestSink::new(
            redis_client,
            config.digest.digest_ttl_secs,
        ))
    };

    let job = DigestBatchJob::new(config.digest.clone(), engine, sink);
    let stats = job.run().await?;

    info!(
        processed = stats.users_processed,
        succeeded = stats.users_succeeded,
        failed = stats.users_failed,
        "Digest job completed"
    );

    Ok(())
}
