// ============================================
// Tiered Sampler
// ============================================
//
// Tiers are immutable slices of the pool; draws are tracked in a per-tier
// "taken" set instead of removing items from shared lists.
//
// Tier resolution when the drawn tier is empty:
//   best -> mid, rest
//   mid  -> best, rest
//   rest -> mid, best

use crate::config::FeedConfig;
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Best,
    Mid,
    Rest,
}

impl Tier {
    fn slot(self) -> usize {
        match self {
            Tier::Best => 0,
            Tier::Mid => 1,
            Tier::Rest => 2,
        }
    }

    fn fallbacks(self) -> [Tier; 2] {
        match self {
            Tier::Best => [Tier::Mid, Tier::Rest],
            Tier::Mid => [Tier::Best, Tier::Rest],
            Tier::Rest => [Tier::Mid, Tier::Best],
        }
    }
}

/// One tier: a fixed index range of the pool plus the positions already drawn
struct TierState {
    start: usize,
    taken: Vec<bool>,
    remaining: usize,
}

impl TierState {
    fn new(start: usize, end: usize) -> Self {
        let len = end.saturating_sub(start);
        Self {
            start,
            taken: vec![false; len],
            remaining: len,
        }
    }

    fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Uniformly pick one undrawn position, returning its pool index
    fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }

        let nth = rng.gen_range(0..self.remaining);
        let offset = self
            .taken
            .iter()
            .enumerate()
            .filter(|(_, taken)| !**taken)
            .nth(nth)
            .map(|(offset, _)| offset)?;

        self.taken[offset] = true;
        self.remaining -= 1;
        Some(self.start + offset)
    }
}

pub struct TieredSampler {
    best_size: usize,
    mid_size: usize,
    best_threshold: f64,
    mid_threshold: f64,
}

impl Default for TieredSampler {
    fn default() -> Self {
        Self::new(&FeedConfig::default())
    }
}

impl TieredSampler {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            best_size: config.best_tier_size,
            mid_size: config.mid_tier_size,
            best_threshold: config.best_threshold,
            mid_threshold: config.mid_threshold,
        }
    }

    /// Tier targeted by a uniform draw in [0, 1)
    pub fn target_tier(&self, draw: f64) -> Tier {
        if draw < self.best_threshold {
            Tier::Best
        } else if draw < self.mid_threshold {
            Tier::Mid
        } else {
            Tier::Rest
        }
    }

    /// Pick up to `limit` distinct pool positions. `pool_len` items are
    /// assumed ordered by descending relevance.
    pub fn sample_indices<R: Rng + ?Sized>(
        &self,
        pool_len: usize,
        limit: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        let best_end = self.best_size.min(pool_len);
        let mid_end = (best_end + self.mid_size).min(pool_len);
        let mut tiers = [
            TierState::new(0, best_end),
            TierState::new(best_end, mid_end),
            TierState::new(mid_end, pool_len),
        ];

        let mut picked = Vec::with_capacity(limit.min(pool_len));
        let mut per_tier = [0usize; 3];

        while picked.len() < limit {
            let available = [!tiers[0].is_empty(), !tiers[1].is_empty(), !tiers[2].is_empty()];
            let target = self.target_tier(rng.gen::<f64>());
            let Some(tier) = resolve_tier(target, available) else {
                break;
            };

            match tiers[tier.slot()].draw(rng) {
                Some(index) => {
                    per_tier[tier.slot()] += 1;
                    picked.push(index);
                }
                None => break,
            }
        }

        debug!(
            pool_len = pool_len,
            selected = picked.len(),
            best = per_tier[0],
            mid = per_tier[1],
            rest = per_tier[2],
            "Tiered sampling completed"
        );

        picked
    }

    /// Convenience wrapper returning the sampled items in draw order
    pub fn sample<T: Clone, R: Rng + ?Sized>(&self, pool: &[T], limit: usize, rng: &mut R) -> Vec<T> {
        self.sample_indices(pool.len(), limit, rng)
            .into_iter()
            .map(|index| pool[index].clone())
            .collect()
    }
}

/// Resolve a target tier to a non-empty one; `None` once every tier is drained
fn resolve_tier(target: Tier, available: [bool; 3]) -> Option<Tier> {
    if available[target.slot()] {
        return Some(target);
    }
    target
        .fallbacks()
        .into_iter()
        .find(|tier| available[tier.slot()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_target_tier_thresholds() {
        let sampler = TieredSampler::default();
        assert_eq!(sampler.target_tier(0.0), Tier::Best);
        assert_eq!(sampler.target_tier(0.69), Tier::Best);
        assert_eq!(sampler.target_tier(0.70), Tier::Mid);
        assert_eq!(sampler.target_tier(0.89), Tier::Mid);
        assert_eq!(sampler.target_tier(0.90), Tier::Rest);
        assert_eq!(sampler.target_tier(0.999), Tier::Rest);
    }

    #[test]
    fn test_fallback_order() {
        assert_eq!(resolve_tier(Tier::Best, [false, true, true]), Some(Tier::Mid));
        assert_eq!(resolve_tier(Tier::Best, [false, false, true]), Some(Tier::Rest));
        assert_eq!(resolve_tier(Tier::Mid, [true, false, true]), Some(Tier::Best));
        assert_eq!(resolve_tier(Tier::Rest, [true, true, false]), Some(Tier::Mid));
        assert_eq!(resolve_tier(Tier::Rest, [true, false, false]), Some(Tier::Best));
        assert_eq!(resolve_tier(Tier::Mid, [false, false, false]), None);
    }

    #[test]
    fn test_tier_frequencies_over_10k_draws() {
        let sampler = TieredSampler::default();
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 3];

        // 30 equally populated positions: 10 per tier
        for _ in 0..10_000 {
            let first = sampler.sample_indices(30, 1, &mut rng)[0];
            counts[first / 10] += 1;
        }

        let freq: Vec<f64> = counts.iter().map(|c| *c as f64 / 10_000.0).collect();
        assert!((freq[0] - 0.70).abs() < 0.03, "best freq {}", freq[0]);
        assert!((freq[1] - 0.20).abs() < 0.03, "mid freq {}", freq[1]);
        assert!((freq[2] - 0.10).abs() < 0.03, "rest freq {}", freq[2]);
    }

    #[test]
    fn test_sampling_without_replacement() {
        let sampler = TieredSampler::default();
        let mut rng = StdRng::seed_from_u64(7);

        let picked = sampler.sample_indices(50, 50, &mut rng);
        assert_eq!(picked.len(), 50);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 50);
    }

    #[test]
    fn test_short_pool_is_exhausted_early() {
        let sampler = TieredSampler::default();
        let mut rng = StdRng::seed_from_u64(1);

        let pool = vec!["a", "b", "c"];
        let picked = sampler.sample(&pool, 10, &mut rng);
        assert_eq!(picked.len(), 3);

        let empty: Vec<&str> = Vec::new();
        assert!(sampler.sample(&empty, 10, &mut rng).is_empty());
    }

    #[test]
    fn test_limit_respected() {
        let sampler = TieredSampler::default();
        let mut rng = StdRng::seed_from_u64(99);
        assert_eq!(sampler.sample_indices(50, 5, &mut rng).len(), 5);
        assert!(sampler.sample_indices(50, 0, &mut rng).is_empty());
    }
}
