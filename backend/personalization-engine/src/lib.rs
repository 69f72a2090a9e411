pub mod config;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use engine::PersonalizationEngine;
pub use error::{EngineError, Result};
pub use services::{FeedbackLearner, Ranker, TieredSampler, VectorInitializer};
