//! Ranking Module
//!
//! Two retrieval paths over the classified catalog:
//! - **Personalized feed**: similarity-ordered candidate pool, sampled through
//!   the explore/exploit tiers. Excludes anything the user already interacted with.
//! - **Strict top-N**: deterministic similarity ranking inside a recency window,
//!   used for daily digests. Ignores read history.
//!
//! Cold-start users (no category vector) get recency ordering on both paths.
//! The caller's deadline bounds the whole fetch phase of a request.

pub mod strict;

pub use strict::{digest_cutoff, select_top_n};

use crate::config::{CutoffPolicy, FeedConfig};
use crate::error::{EngineError, Result};
use crate::models::{CatalogItem, UserProfile};
use crate::services::exploration::TieredSampler;
use crate::services::storage::{CandidateOrder, CandidateQuery, CatalogSource, InteractionLedger};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

pub struct Ranker {
    catalog: Arc<dyn CatalogSource>,
    ledger: Arc<dyn InteractionLedger>,
    sampler: TieredSampler,
    pool_limit: usize,
}

impl Ranker {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        ledger: Arc<dyn InteractionLedger>,
        config: &FeedConfig,
    ) -> Self {
        Self {
            catalog,
            ledger,
            sampler: TieredSampler::new(config),
            pool_limit: config.pool_limit,
        }
    }

    /// Personalized feed for `profile`: up to `limit` items, may be shorter
    /// when the candidate pool runs out.
    pub async fn personalized_feed(
        &self,
        profile: &UserProfile,
        limit: usize,
        skip: usize,
        deadline: Duration,
    ) -> Result<Vec<CatalogItem>> {
        let mut rng = StdRng::from_entropy();
        self.personalized_feed_with_rng(profile, limit, skip, deadline, &mut rng)
            .await
    }

    /// `personalized_feed` drawing tiers from the given generator
    pub async fn personalized_feed_with_rng<R: Rng + ?Sized>(
        &self,
        profile: &UserProfile,
        limit: usize,
        skip: usize,
        deadline: Duration,
        rng: &mut R,
    ) -> Result<Vec<CatalogItem>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let Some(vector) = profile.category_vector else {
            let items = within(
                deadline,
                self.fetch_unseen(profile.user_id, CandidateOrder::Recency, skip, limit),
            )
            .await?;

            info!(
                user_id = %profile.user_id,
                returned = items.len(),
                "Cold-start feed served by recency"
            );
            return Ok(items);
        };

        let pool = within(
            deadline,
            self.fetch_unseen(
                profile.user_id,
                CandidateOrder::SimilarityTo(vector),
                skip,
                self.pool_limit.max(limit),
            ),
        )
        .await?;

        let feed = self.sampler.sample(&pool, limit, rng);

        info!(
            user_id = %profile.user_id,
            pool_size = pool.len(),
            returned = feed.len(),
            "Personalized feed served"
        );
        Ok(feed)
    }

    /// Strict top-N inside the digest window. Same catalog snapshot and profile
    /// always give the same ordering.
    pub async fn top_articles(
        &self,
        profile: &UserProfile,
        limit: usize,
        window_hours: i64,
        policy: CutoffPolicy,
        deadline: Duration,
    ) -> Result<Vec<CatalogItem>> {
        let cold_start_limit = profile.is_cold_start().then_some(limit);
        let (cutoff, window) = within(
            deadline,
            self.fetch_window(policy, window_hours, cold_start_limit),
        )
        .await?;

        let selected = match &profile.category_vector {
            Some(vector) => select_top_n(window, vector, limit),
            None => window,
        };

        debug!(
            user_id = %profile.user_id,
            cutoff = %cutoff,
            policy = ?policy,
            selected = selected.len(),
            "Strict top-N selection completed"
        );
        Ok(selected)
    }

    /// Exclusion set plus candidate query, in that order
    async fn fetch_unseen(
        &self,
        user_id: Uuid,
        order: CandidateOrder,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<CatalogItem>> {
        let seen = self.ledger.interacted_items(user_id).await?;
        let query = CandidateQuery::new(order)
            .excluding(seen)
            .skip(skip)
            .limit(limit);
        self.catalog.query_candidates(&query).await
    }

    /// Items published since the digest cutoff, newest first
    async fn fetch_window(
        &self,
        policy: CutoffPolicy,
        window_hours: i64,
        limit: Option<usize>,
    ) -> Result<(DateTime<Utc>, Vec<CatalogItem>)> {
        let latest = match policy {
            CutoffPolicy::WallClock => None,
            CutoffPolicy::LatestPublished => self.catalog.latest_published_at().await?,
        };
        let cutoff = digest_cutoff(policy, window_hours, Utc::now(), latest)?;

        let mut query = CandidateQuery::new(CandidateOrder::Recency).published_since(cutoff);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let items = self.catalog.query_candidates(&query).await?;
        Ok((cutoff, items))
    }
}

/// Bound a collaborator call by `deadline`; no retry on expiry
async fn within<T, F>(deadline: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| EngineError::Timeout(deadline))?
}
