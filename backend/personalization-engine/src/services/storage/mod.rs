// ============================================
// Storage Collaborators
// ============================================
//
// The engine reads and writes through three traits:
// - ProfileStore       one profile per user, compare-and-swap on `version`
// - CatalogSource      classified articles, candidate queries
// - InteractionLedger  one record per (user, item)
//
// Implementations:
// - memory:      DashMap-backed, used by tests and for catalog snapshots
// - redis_store: Redis-backed profiles and interactions

pub mod memory;
pub mod redis_store;

pub use memory::{InMemoryCatalog, InMemoryInteractionLedger, InMemoryProfileStore};
pub use redis_store::{RedisInteractionLedger, RedisProfileStore};

use crate::error::Result;
use crate::models::{CatalogItem, CategoryVector, InteractionRecord, Rankable, UserProfile};
use crate::utils::cosine_similarity;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Register a user with an empty (cold-start) profile; returns the
    /// existing profile if the user is already known
    async fn create(&self, user_id: Uuid) -> Result<UserProfile>;

    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>>;

    /// Write `profile` if the stored version still equals `profile.version`.
    /// Returns the stored profile with its version bumped.
    /// Fails with `Conflict` on a version mismatch and `UserNotFound` for unknown users.
    async fn put(&self, profile: &UserProfile) -> Result<UserProfile>;

    async fn list_users(&self) -> Result<Vec<Uuid>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn get(&self, item_id: Uuid) -> Result<Option<CatalogItem>>;

    async fn query_candidates(&self, query: &CandidateQuery) -> Result<Vec<CatalogItem>>;

    /// Most recent `published_at` across the catalog
    async fn latest_published_at(&self) -> Result<Option<DateTime<Utc>>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionLedger: Send + Sync {
    async fn get(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<InteractionRecord>>;

    /// Insert or replace the record for `(record.user_id, record.item_id)`
    async fn upsert(&self, record: InteractionRecord) -> Result<InteractionRecord>;

    /// Every item the user has a record for
    async fn interacted_items(&self, user_id: Uuid) -> Result<HashSet<Uuid>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateOrder {
    /// Newest first
    Recency,
    /// Closest (cosine) to the given vector first; unclassified items last
    SimilarityTo(CategoryVector),
}

#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub exclude: HashSet<Uuid>,
    pub order: CandidateOrder,
    pub published_since: Option<DateTime<Utc>>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl CandidateQuery {
    pub fn new(order: CandidateOrder) -> Self {
        Self {
            exclude: HashSet::new(),
            order,
            published_since: None,
            skip: 0,
            limit: None,
        }
    }

    pub fn excluding(mut self, exclude: HashSet<Uuid>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn published_since(mut self, cutoff: DateTime<Utc>) -> Self {
        self.published_since = Some(cutoff);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, item: &CatalogItem) -> bool {
        if self.exclude.contains(&item.id()) {
            return false;
        }
        match self.published_since {
            Some(cutoff) => item.published_at() >= cutoff,
            None => true,
        }
    }
}

/// Newer first, id as the final tie-breaker
pub fn recency_cmp<T: Rankable>(a: &T, b: &T) -> Ordering {
    b.published_at()
        .cmp(&a.published_at())
        .then_with(|| a.id().cmp(&b.id()))
}

/// Higher cosine similarity to `target` first, then newer, then id.
/// Items without a category vector sort after every classified item.
pub fn similarity_cmp<T: Rankable>(target: &CategoryVector, a: &T, b: &T) -> Ordering {
    let score = |item: &T| {
        item.category_vector()
            .map(|v| cosine_similarity(target.values(), v.values()))
    };

    match (score(a), score(b)) {
        (Some(sa), Some(sb)) => sb.total_cmp(&sa).then_with(|| recency_cmp(a, b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => recency_cmp(a, b),
    }
}

/// Order, skip and cut a candidate list according to `query`
pub fn apply_query(mut items: Vec<CatalogItem>, query: &CandidateQuery) -> Vec<CatalogItem> {
    items.retain(|item| query.matches(item));

    match &query.order {
        CandidateOrder::Recency => items.sort_by(recency_cmp),
        CandidateOrder::SimilarityTo(target) => items.sort_by(|a, b| similarity_cmp(target, a, b)),
    }

    let limit = query.limit.unwrap_or(usize::MAX);
    items.into_iter().skip(query.skip).take(limit).collect()
}
