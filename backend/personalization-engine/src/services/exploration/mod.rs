// ============================================
// Exploration Module
// ============================================
//
// Explore/exploit balance for the personalized feed.
//
// The similarity-ordered candidate pool is cut into three tiers by rank:
//   best = pool[0..10), mid = pool[10..20), rest = pool[20..]
// and each feed slot is filled from a tier chosen at random
// (70% best, 20% mid, 10% rest), without replacement.

pub mod tiered_sampler;

pub use tiered_sampler::{Tier, TieredSampler};
