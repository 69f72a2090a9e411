pub mod exploration;
pub mod profile_builder;
pub mod ranking;
pub mod storage;

pub use exploration::TieredSampler;
pub use profile_builder::{FeedbackLearner, VectorInitializer};
pub use ranking::Ranker;
pub use storage::{CatalogSource, InteractionLedger, ProfileStore};
