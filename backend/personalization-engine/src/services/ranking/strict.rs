use crate::config::CutoffPolicy;
use crate::error::{EngineError, Result};
use crate::models::{CatalogItem, CategoryVector};
use crate::services::storage::similarity_cmp;
use chrono::{DateTime, Duration, Utc};

/// Start of the digest window.
///
/// `WallClock` counts back from `now`; `LatestPublished` counts back from the
/// newest catalog item (falling back to `now` for an empty catalog).
/// Windows reaching outside the representable time range are `InvalidInput`.
pub fn digest_cutoff(
    policy: CutoffPolicy,
    window_hours: i64,
    now: DateTime<Utc>,
    latest_published: Option<DateTime<Utc>>,
) -> Result<DateTime<Utc>> {
    let anchor = match policy {
        CutoffPolicy::WallClock => now,
        CutoffPolicy::LatestPublished => latest_published.unwrap_or(now),
    };

    Duration::try_hours(window_hours)
        .and_then(|window| anchor.checked_sub_signed(window))
        .ok_or_else(|| {
            EngineError::InvalidInput(format!("window_hours {} is out of range", window_hours))
        })
}

/// Sort by descending cosine similarity to `vector` (newer first on ties)
/// and keep the first `limit`
pub fn select_top_n(
    mut items: Vec<CatalogItem>,
    vector: &CategoryVector,
    limit: usize,
) -> Vec<CatalogItem> {
    items.sort_by(|a, b| similarity_cmp(vector, a, b));
    items.truncate(limit);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rankable, SynthesizedArticle};
    use uuid::Uuid;

    fn synthesized(vector: [f64; 10], hours_ago: i64, now: DateTime<Utc>) -> CatalogItem {
        CatalogItem::Synthesized(SynthesizedArticle {
            id: Uuid::new_v4(),
            title: "digest candidate".to_string(),
            generated_at: now - Duration::hours(hours_ago),
            source_ids: Vec::new(),
            category_vector: Some(CategoryVector(vector)),
            metadata: None,
        })
    }

    #[test]
    fn test_cutoff_policies() {
        let now = Utc::now();
        let latest = now - Duration::days(3);

        assert_eq!(
            digest_cutoff(CutoffPolicy::WallClock, 24, now, Some(latest)).unwrap(),
            now - Duration::hours(24)
        );
        assert_eq!(
            digest_cutoff(CutoffPolicy::LatestPublished, 24, now, Some(latest)).unwrap(),
            latest - Duration::hours(24)
        );
        assert_eq!(
            digest_cutoff(CutoffPolicy::LatestPublished, 24, now, None).unwrap(),
            now - Duration::hours(24)
        );
    }

    #[test]
    fn test_out_of_range_window_is_invalid_input() {
        let now = Utc::now();

        for hours in [i64::MAX / 2, 3_000_000_000, i64::MAX] {
            let err = digest_cutoff(CutoffPolicy::WallClock, hours, now, None).unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)));
        }

        // representable but far back still works
        assert!(digest_cutoff(CutoffPolicy::WallClock, 24 * 365 * 100, now, None).is_ok());
    }

    #[test]
    fn test_ties_broken_by_recency() {
        let now = Utc::now();
        let older = synthesized([1.0; 10], 5, now);
        let newer = synthesized([1.0; 10], 1, now);
        let user = CategoryVector::uniform(0.5);

        let top = select_top_n(vec![older.clone(), newer.clone()], &user, 2);
        assert_eq!(top[0].id(), newer.id());
        assert_eq!(top[1].id(), older.id());
    }

    #[test]
    fn test_selection_is_deterministic() {
        let now = Utc::now();
        let mut user = [0.3; 10];
        user[2] = 2.3;
        let user = CategoryVector(user);

        let items: Vec<CatalogItem> = (0..20)
            .map(|i| {
                let mut v = [0.2; 10];
                v[i % 10] = 1.0 + i as f64 / 10.0;
                synthesized(v, (i % 4) as i64, now)
            })
            .collect();

        let first: Vec<Uuid> = select_top_n(items.clone(), &user, 15)
            .iter()
            .map(|i| i.id())
            .collect();
        let mut reversed = items;
        reversed.reverse();
        let second: Vec<Uuid> = select_top_n(reversed, &user, 15)
            .iter()
            .map(|i| i.id())
            .collect();

        assert_eq!(first.len(), 15);
        assert_eq!(first, second);
    }
}
