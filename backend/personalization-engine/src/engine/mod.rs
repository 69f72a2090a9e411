// ============================================
// Personalization Engine
// ============================================
//
// Facade exposed to the API layer:
// - initialize_profile   onboarding, once per user
// - record_feedback      every like / dislike / click
// - get_personalized_feed
// - get_top_articles     strict selection for digests
//
// Profile writes are read-modify-write. They are serialized per user inside
// this process by an async mutex, and across processes by the store's
// version check; a `Conflict` re-runs the whole cycle up to
// `max_conflict_retries` times before it is returned to the caller.
// When the interaction cannot be recorded after the profile write, the
// profile is put back to its pre-feedback vectors.

use crate::config::{Config, CutoffPolicy};
use crate::error::{EngineError, Result};
use crate::models::{
    CatalogItem, Category, Demographics, FeedbackAction, InteractionRecord, MetadataStaticMask,
    Rankable, UserProfile,
};
use crate::services::profile_builder::{FeedbackLearner, VectorInitializer};
use crate::services::ranking::Ranker;
use crate::services::storage::{CatalogSource, InteractionLedger, ProfileStore};
use chrono::Utc;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct PersonalizationEngine {
    profiles: Arc<dyn ProfileStore>,
    catalog: Arc<dyn CatalogSource>,
    ledger: Arc<dyn InteractionLedger>,
    initializer: VectorInitializer,
    learner: FeedbackLearner,
    ranker: Ranker,
    user_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    max_conflict_retries: u32,
    fetch_timeout: Duration,
    digest_limit: usize,
    digest_window_hours: i64,
    cutoff_policy: CutoffPolicy,
}

impl PersonalizationEngine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        catalog: Arc<dyn CatalogSource>,
        ledger: Arc<dyn InteractionLedger>,
        config: &Config,
    ) -> Self {
        Self {
            ranker: Ranker::new(catalog.clone(), ledger.clone(), &config.feed),
            profiles,
            catalog,
            ledger,
            initializer: VectorInitializer::new(&config.profile),
            learner: FeedbackLearner::new(&config.profile),
            user_locks: DashMap::new(),
            max_conflict_retries: config.profile.max_conflict_retries,
            fetch_timeout: Duration::from_millis(config.feed.fetch_timeout_ms),
            digest_limit: config.digest.default_limit,
            digest_window_hours: config.digest.window_hours,
            cutoff_policy: config.digest.cutoff_policy,
        }
    }

    /// Register a user so later calls stop failing with `UserNotFound`
    pub async fn register_user(&self, user_id: Uuid) -> Result<UserProfile> {
        self.profiles.create(user_id).await
    }

    /// Build and persist the cold-start vector for a registered user
    pub async fn initialize_profile(
        &self,
        user_id: Uuid,
        demographics: &Demographics,
        declared: &[Category],
    ) -> Result<UserProfile> {
        let profile = self
            .retry_on_conflict(user_id, move || {
                self.try_initialize_profile(user_id, demographics, declared)
            })
            .await?;

        info!(
            user_id = %user_id,
            declared = declared.len(),
            version = profile.version,
            "User profile initialized"
        );
        Ok(profile)
    }

    async fn try_initialize_profile(
        &self,
        user_id: Uuid,
        demographics: &Demographics,
        declared: &[Category],
    ) -> Result<UserProfile> {
        let mut profile = self.load_profile(user_id).await?;
        let (vector, metadata) = self.initializer.build(demographics, declared);

        profile.category_vector = Some(vector);
        profile.metadata = metadata;
        self.profiles.put(&profile).await
    }

    /// Mark metadata dimensions that feedback must not move
    pub async fn set_metadata_static_mask(
        &self,
        user_id: Uuid,
        mask: MetadataStaticMask,
    ) -> Result<UserProfile> {
        self.retry_on_conflict(user_id, move || async move {
            let mut profile = self.load_profile(user_id).await?;
            profile.metadata_static = mask;
            self.profiles.put(&profile).await
        })
        .await
    }

    /// Record an interaction and learn from it.
    ///
    /// Repeating the stored state is a no-op. Items without a category vector
    /// (and users without one) are recorded without touching the profile.
    pub async fn record_feedback(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        action: FeedbackAction,
    ) -> Result<InteractionRecord> {
        self.retry_on_conflict(user_id, move || {
            self.try_record_feedback(user_id, item_id, action)
        })
        .await
    }

    async fn try_record_feedback(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        action: FeedbackAction,
    ) -> Result<InteractionRecord> {
        let profile = self.load_profile(user_id).await?;

        if let Some(existing) = self.ledger.get(user_id, item_id).await? {
            if existing.state == action.as_state() {
                debug!(
                    user_id = %user_id,
                    item_id = %item_id,
                    action = ?action,
                    "Feedback unchanged, skipping"
                );
                return Ok(existing);
            }
        }

        let item = self
            .catalog
            .get(item_id)
            .await?
            .ok_or(EngineError::ItemNotFound(item_id))?;

        let written = match (profile.category_vector.as_ref(), item.category_vector()) {
            (Some(user_vector), Some(article_vector)) => {
                let learned = self.learner.apply(
                    user_vector,
                    &profile.metadata,
                    &profile.metadata_static,
                    article_vector,
                    item.metadata(),
                    action,
                );

                let mut updated = profile.clone();
                updated.category_vector = Some(learned.category_vector);
                updated.metadata = learned.metadata;
                Some(self.profiles.put(&updated).await?)
            }
            (None, _) => {
                warn!(
                    user_id = %user_id,
                    "User has no interest vector yet, recording feedback only"
                );
                None
            }
            (_, None) => {
                warn!(
                    item_id = %item_id,
                    "Item has no category vector, recording feedback only"
                );
                None
            }
        };

        let upserted = self
            .ledger
            .upsert(InteractionRecord {
                user_id,
                item_id,
                state: action.as_state(),
                timestamp: Utc::now(),
            })
            .await;

        let record = match upserted {
            Ok(record) => record,
            Err(e) => {
                if let Some(written) = written {
                    self.roll_back_profile(&profile, &written).await;
                }
                return Err(e);
            }
        };

        info!(
            user_id = %user_id,
            item_id = %item_id,
            action = ?action,
            "Feedback recorded"
        );
        Ok(record)
    }

    /// Put the pre-feedback vectors back after the interaction could not be
    /// recorded. The profile lock is held, so `written` is the current version.
    async fn roll_back_profile(&self, original: &UserProfile, written: &UserProfile) {
        let mut restored = original.clone();
        restored.version = written.version;

        match self.profiles.put(&restored).await {
            Ok(profile) => warn!(
                user_id = %original.user_id,
                version = profile.version,
                "Interaction not recorded, profile update rolled back"
            ),
            Err(e) => error!(
                user_id = %original.user_id,
                error = %e,
                "Failed to roll back profile after interaction write failure"
            ),
        }
    }

    pub async fn get_personalized_feed(
        &self,
        user_id: Uuid,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<CatalogItem>> {
        self.get_personalized_feed_within(user_id, limit, skip, self.fetch_timeout)
            .await
    }

    /// Same as `get_personalized_feed` with a caller-supplied deadline for
    /// the candidate fetch
    pub async fn get_personalized_feed_within(
        &self,
        user_id: Uuid,
        limit: usize,
        skip: usize,
        deadline: Duration,
    ) -> Result<Vec<CatalogItem>> {
        let profile = self.load_profile(user_id).await?;
        self.ranker
            .personalized_feed(&profile, limit, skip, deadline)
            .await
    }

    /// Strict top-N; `None` falls back to the configured digest defaults
    pub async fn get_top_articles(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
        window_hours: Option<i64>,
    ) -> Result<Vec<CatalogItem>> {
        self.get_top_articles_within(user_id, limit, window_hours, self.fetch_timeout)
            .await
    }

    pub async fn get_top_articles_within(
        &self,
        user_id: Uuid,
        limit: Option<usize>,
        window_hours: Option<i64>,
        deadline: Duration,
    ) -> Result<Vec<CatalogItem>> {
        let window_hours = window_hours.unwrap_or(self.digest_window_hours);
        if window_hours <= 0 {
            return Err(EngineError::InvalidInput(format!(
                "window_hours must be positive, got {}",
                window_hours
            )));
        }

        let profile = self.load_profile(user_id).await?;
        self.ranker
            .top_articles(
                &profile,
                limit.unwrap_or(self.digest_limit),
                window_hours,
                self.cutoff_policy,
                deadline,
            )
            .await
    }

    pub async fn list_users(&self) -> Result<Vec<Uuid>> {
        self.profiles.list_users().await
    }

    async fn load_profile(&self, user_id: Uuid) -> Result<UserProfile> {
        self.profiles
            .get(user_id)
            .await?
            .ok_or(EngineError::UserNotFound(user_id))
    }

    fn user_lock(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `op` while holding the user's lock, re-running it on version conflicts
    async fn retry_on_conflict<T, F, Fut>(&self, user_id: Uuid, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            match op().await {
                Err(e) if e.is_conflict() && attempt < self.max_conflict_retries => {
                    attempt += 1;
                    warn!(
                        user_id = %user_id,
                        attempt = attempt,
                        error = %e,
                        "Profile write conflict, retrying"
                    );
                }
                other => return other,
            }
        }
    }
}
