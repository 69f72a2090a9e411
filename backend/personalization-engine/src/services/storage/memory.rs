// ============================================
// In-Memory Stores
// ============================================
//
// DashMap-backed implementations of the storage traits. Profile writes are
// compare-and-swap under the shard lock, so concurrent writers observe the
// same `Conflict` semantics as the Redis store.

use super::{apply_query, CandidateQuery, CatalogSource, InteractionLedger, ProfileStore};
use crate::error::{EngineError, Result};
use crate::models::{CatalogItem, InteractionRecord, Rankable, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<Uuid, UserProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn create(&self, user_id: Uuid) -> Result<UserProfile> {
        let entry = self
            .profiles
            .entry(user_id)
            .or_insert_with(|| UserProfile::cold_start(user_id));
        Ok(entry.value().clone())
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        Ok(self.profiles.get(&user_id).map(|p| p.value().clone()))
    }

    async fn put(&self, profile: &UserProfile) -> Result<UserProfile> {
        let mut stored = self
            .profiles
            .get_mut(&profile.user_id)
            .ok_or(EngineError::UserNotFound(profile.user_id))?;

        if stored.version != profile.version {
            return Err(EngineError::Conflict {
                user_id: profile.user_id,
                expected: profile.version,
            });
        }

        let mut next = profile.clone();
        next.version = profile.version + 1;
        next.updated_at = Utc::now();
        *stored = next.clone();
        Ok(next)
    }

    async fn list_users(&self) -> Result<Vec<Uuid>> {
        let mut users: Vec<Uuid> = self.profiles.iter().map(|e| *e.key()).collect();
        users.sort();
        Ok(users)
    }
}

#[derive(Default)]
pub struct InMemoryCatalog {
    items: DashMap<Uuid, CatalogItem>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let catalog = Self::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    pub fn insert(&self, item: CatalogItem) {
        self.items.insert(item.id(), item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Load a catalog snapshot: a JSON array of `raw` / `synthesized` items.
    /// A missing file yields an empty catalog.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Catalog snapshot not found: {}", path.display());
            return Ok(Self::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let items: Vec<CatalogItem> = serde_json::from_reader(reader)?;
        let catalog = Self::from_items(items);

        info!(
            path = %path.display(),
            item_count = catalog.len(),
            "Loaded catalog snapshot"
        );
        Ok(catalog)
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn get(&self, item_id: Uuid) -> Result<Option<CatalogItem>> {
        Ok(self.items.get(&item_id).map(|i| i.value().clone()))
    }

    async fn query_candidates(&self, query: &CandidateQuery) -> Result<Vec<CatalogItem>> {
        let items: Vec<CatalogItem> = self.items.iter().map(|e| e.value().clone()).collect();
        Ok(apply_query(items, query))
    }

    async fn latest_published_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.items.iter().map(|e| e.value().published_at()).max())
    }
}

#[derive(Default)]
pub struct InMemoryInteractionLedger {
    records: DashMap<Uuid, HashMap<Uuid, InteractionRecord>>,
}

impl InMemoryInteractionLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InteractionLedger for InMemoryInteractionLedger {
    async fn get(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<InteractionRecord>> {
        Ok(self
            .records
            .get(&user_id)
            .and_then(|records| records.get(&item_id).cloned()))
    }

    async fn upsert(&self, record: InteractionRecord) -> Result<InteractionRecord> {
        self.records
            .entry(record.user_id)
            .or_default()
            .insert(record.item_id, record.clone());
        Ok(record)
    }

    async fn interacted_items(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        Ok(self
            .records
            .get(&user_id)
            .map(|records| records.keys().copied().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryVector, FeedbackState, RawArticle};
    use crate::services::storage::CandidateOrder;
    use chrono::Duration;

    fn article(published_at: DateTime<Utc>, vector: Option<CategoryVector>) -> CatalogItem {
        CatalogItem::Raw(RawArticle {
            id: Uuid::new_v4(),
            title: "t".to_string(),
            publisher: None,
            source_url: None,
            published_at,
            category_vector: vector,
            metadata: None,
        })
    }

    #[tokio::test]
    async fn test_profile_put_is_compare_and_swap() {
        let store = InMemoryProfileStore::new();
        let user_id = Uuid::new_v4();
        let profile = store.create(user_id).await.unwrap();
        assert_eq!(profile.version, 0);

        let written = store.put(&profile).await.unwrap();
        assert_eq!(written.version, 1);

        // stale write with the old version
        let err = store.put(&profile).await.unwrap_err();
        assert!(err.is_conflict());

        let unknown = UserProfile::cold_start(Uuid::new_v4());
        assert!(matches!(
            store.put(&unknown).await,
            Err(EngineError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = InMemoryProfileStore::new();
        let user_id = Uuid::new_v4();
        let first = store.create(user_id).await.unwrap();
        store.put(&first).await.unwrap();

        let again = store.create(user_id).await.unwrap();
        assert_eq!(again.version, 1);
        assert_eq!(store.list_users().await.unwrap(), vec![user_id]);
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity_then_unclassified() {
        let now = Utc::now();
        let sports = {
            let mut v = [0.1; 10];
            v[7] = 3.0;
            CategoryVector(v)
        };
        let politics = {
            let mut v = [0.1; 10];
            v[0] = 3.0;
            CategoryVector(v)
        };

        let close = article(now - Duration::hours(5), Some(sports));
        let far = article(now, Some(politics));
        let unclassified = article(now, None);
        let catalog = InMemoryCatalog::from_items(vec![
            unclassified.clone(),
            far.clone(),
            close.clone(),
        ]);

        let query = CandidateQuery::new(CandidateOrder::SimilarityTo(sports));
        let ordered = catalog.query_candidates(&query).await.unwrap();
        let ids: Vec<Uuid> = ordered.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec![close.id(), far.id(), unclassified.id()]);
    }

    #[tokio::test]
    async fn test_query_exclude_since_skip_limit() {
        let now = Utc::now();
        let items: Vec<CatalogItem> = (0..6)
            .map(|h| article(now - Duration::hours(h), None))
            .collect();
        let catalog = InMemoryCatalog::from_items(items.clone());

        let query = CandidateQuery::new(CandidateOrder::Recency)
            .excluding([items[0].id()].into_iter().collect())
            .published_since(now - Duration::hours(4))
            .skip(1)
            .limit(2);
        let result = catalog.query_candidates(&query).await.unwrap();

        let ids: Vec<Uuid> = result.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec![items[2].id(), items[3].id()]);
        assert_eq!(
            catalog.latest_published_at().await.unwrap(),
            Some(items[0].published_at())
        );
    }

    #[tokio::test]
    async fn test_ledger_upsert_replaces_record() {
        let ledger = InMemoryInteractionLedger::new();
        let user_id = Uuid::new_v4();
        let item_id = Uuid::new_v4();

        for state in [FeedbackState::Clicked, FeedbackState::Liked] {
            ledger
                .upsert(InteractionRecord {
                    user_id,
                    item_id,
                    state,
                    timestamp: Utc::now(),
                })
                .await
                .unwrap();
        }

        let record = ledger.get(user_id, item_id).await.unwrap().unwrap();
        assert_eq!(record.state, FeedbackState::Liked);
        assert_eq!(ledger.interacted_items(user_id).await.unwrap().len(), 1);
        assert!(ledger
            .interacted_items(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_snapshot_is_empty_catalog() {
        let catalog = InMemoryCatalog::load_json("/nonexistent/catalog.json").unwrap();
        assert!(catalog.is_empty());
    }
}
