// ============================================
// Profile Builder
// ============================================
//
// Owns the math that creates and evolves a user's interest profile:
// 1. VectorInitializer - cold-start vector from demographics + declared topics
// 2. FeedbackLearner   - median-ratio update on every like/dislike/click
//
// Both operate on plain values; reading and writing profiles is the
// engine's job (see `crate::engine`).

pub mod demographics;
pub mod feedback_learner;
pub mod initializer;

pub use demographics::demographic_nudge;
pub use feedback_learner::{FeedbackLearner, LearnedProfile};
pub use initializer::VectorInitializer;
