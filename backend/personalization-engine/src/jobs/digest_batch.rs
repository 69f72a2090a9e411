// ============================================
// Digest Batch Job
// ============================================
//
// Periodically builds each user's strict top-N selection and hands it to a
// sink (Redis for the mail/notification workers, or the log for dry runs).
//
// Workflow:
// 1. List registered users
// 2. Process them in batches, sleeping between batches
// 3. For each user, run get_top_articles with the digest defaults
// 4. Deliver the selection to the sink
//
// A failure for one user is logged and counted; the pass continues.

use crate::config::DigestConfig;
use crate::engine::PersonalizationEngine;
use crate::error::Result;
use crate::models::{CatalogItem, Rankable};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Serialized digest handed to downstream consumers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestEntry {
    pub user_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<DigestItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestItem {
    pub id: Uuid,
    pub title: String,
    pub published_at: DateTime<Utc>,
}

impl DigestEntry {
    pub fn new(user_id: Uuid, items: &[CatalogItem]) -> Self {
        Self {
            user_id,
            generated_at: Utc::now(),
            items: items
                .iter()
                .map(|item| DigestItem {
                    id: item.id(),
                    title: item.title().to_string(),
                    published_at: item.published_at(),
                })
                .collect(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DigestSink: Send + Sync {
    async fn deliver(&self, entry: &DigestEntry) -> Result<()>;
}

/// Stores `digest:{user_id}` as JSON with a TTL
pub struct RedisDigestSink {
    redis: redis::Client,
    ttl_secs: u64,
}

impl RedisDigestSink {
    pub fn new(redis: redis::Client, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    fn digest_key(user_id: Uuid) -> String {
        format!("digest:{}", user_id)
    }
}

#[async_trait]
impl DigestSink for RedisDigestSink {
    async fn deliver(&self, entry: &DigestEntry) -> Result<()> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(entry)?;

        let _: () = conn
            .set_ex(Self::digest_key(entry.user_id), payload, self.ttl_secs)
            .await?;
        Ok(())
    }
}

/// Logs digests instead of storing them
pub struct LoggingDigestSink;

#[async_trait]
impl DigestSink for LoggingDigestSink {
    async fn deliver(&self, entry: &DigestEntry) -> Result<()> {
        let ids: Vec<String> = entry.items.iter().map(|i| i.id.to_string()).collect();
        info!(
            user_id = %entry.user_id,
            count = entry.items.len(),
            items = ?ids,
            "Digest generated"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchJobStats {
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub users_processed: u32,
    pub users_succeeded: u32,
    pub users_failed: u32,
    /// Users whose digest came back empty
    pub empty_digests: u32,
    pub total_duration_ms: u64,
}

pub struct DigestBatchJob {
    config: DigestConfig,
    engine: Arc<PersonalizationEngine>,
    sink: Arc<dyn DigestSink>,
}

impl DigestBatchJob {
    pub fn new(
        config: DigestConfig,
        engine: Arc<PersonalizationEngine>,
        sink: Arc<dyn DigestSink>,
    ) -> Self {
        Self {
            config,
            engine,
            sink,
        }
    }

    /// Run one pass, or loop forever when `run_once` is false
    pub async fn run(&self) -> Result<BatchJobStats> {
        loop {
            let stats = self.run_single_pass().await?;

            info!(
                processed = stats.users_processed,
                succeeded = stats.users_succeeded,
                failed = stats.users_failed,
                empty = stats.empty_digests,
                duration_ms = stats.total_duration_ms,
                "Digest batch pass completed"
            );

            if self.config.run_once {
                return Ok(stats);
            }

            info!(
                interval_secs = self.config.interval_secs,
                "Sleeping until next pass"
            );
            sleep(Duration::from_secs(self.config.interval_secs)).await;
        }
    }

    pub async fn run_single_pass(&self) -> Result<BatchJobStats> {
        let start_time = Instant::now();
        let mut stats = BatchJobStats {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let users = self.engine.list_users().await?;
        info!(
            user_count = users.len(),
            batch_size = self.config.batch_size,
            "Starting digest batch pass"
        );

        for (batch_idx, batch) in users.chunks(self.config.batch_size.max(1)).enumerate() {
            info!(
                batch = batch_idx + 1,
                users = batch.len(),
                "Processing user batch"
            );

            for user_id in batch {
                stats.users_processed += 1;

                match self.build_and_deliver(*user_id).await {
                    Ok(0) => {
                        stats.users_succeeded += 1;
                        stats.empty_digests += 1;
                    }
                    Ok(_) => stats.users_succeeded += 1,
                    Err(e) if e.is_not_found() => {
                        // removed between list_users and now
                        stats.users_failed += 1;
                        warn!(user_id = %user_id, error = %e, "User vanished during digest pass");
                    }
                    Err(e) => {
                        stats.users_failed += 1;
                        error!(user_id = %user_id, error = %e, "Failed to build digest");
                    }
                }
            }

            if self.config.batch_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }

        stats.completed_at = Some(Utc::now());
        stats.total_duration_ms = start_time.elapsed().as_millis() as u64;

        Ok(stats)
    }

    async fn build_and_deliver(&self, user_id: Uuid) -> Result<usize> {
        let items = self.engine.get_top_articles(user_id, None, None).await?;
        let entry = DigestEntry::new(user_id, &items);
        self.sink.deliver(&entry).await?;
        Ok(entry.items.len())
    }
}
