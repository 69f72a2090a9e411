use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub profile: ProfileConfig,
    pub feed: FeedConfig,
    pub digest: DigestConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub service_name: String,
    /// Emit JSON log lines instead of the human-readable format
    pub log_json: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_name: "personalization-engine".to_string(),
            log_json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub redis_url: String,
    /// JSON snapshot of the classified catalog
    pub catalog_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            catalog_path: "catalog.json".to_string(),
        }
    }
}

/// Onboarding and feedback-learning parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub target_sum: f64,
    pub base_interest: f64,
    pub preference_boost: f64,
    pub base_learning_rate: f64,
    /// Fraction of the base learning rate applied to clicks
    pub click_rate_scale: f64,
    /// Extra read-modify-write attempts after a version conflict
    pub max_conflict_retries: u32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            target_sum: 5.0,
            base_interest: 0.5,
            preference_boost: 0.25,
            base_learning_rate: 0.016,
            click_rate_scale: 0.25,
            max_conflict_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Candidates fetched per request before tiering
    pub pool_limit: usize,
    pub best_tier_size: usize,
    pub mid_tier_size: usize,
    /// Draws below this go to the best tier
    pub best_threshold: f64,
    /// Draws below this (and above `best_threshold`) go to the mid tier
    pub mid_threshold: f64,
    pub fetch_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            pool_limit: 50,
            best_tier_size: 10,
            mid_tier_size: 10,
            best_threshold: 0.70,
            mid_threshold: 0.90,
            fetch_timeout_ms: 2000,
        }
    }
}

/// Reference point for the digest window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffPolicy {
    /// `now - window_hours`
    WallClock,
    /// `latest published_at in the catalog - window_hours`, for offline runs on stale data
    LatestPublished,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DigestConfig {
    pub default_limit: usize,
    pub window_hours: i64,
    pub cutoff_policy: CutoffPolicy,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub run_once: bool,
    pub interval_secs: u64,
    pub digest_ttl_secs: u64,
    /// Log digests instead of writing them to Redis
    pub dry_run: bool,
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            default_limit: 15,
            window_hours: 24,
            cutoff_policy: CutoffPolicy::WallClock,
            batch_size: 100,
            batch_delay_ms: 200,
            run_once: true,
            interval_secs: 86400,
            digest_ttl_secs: 172800, // 48 hours
            dry_run: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Config {
            service: envy::prefixed("ENGINE_SERVICE_").from_env()?,
            storage: envy::prefixed("ENGINE_STORAGE_").from_env()?,
            profile: envy::prefixed("ENGINE_PROFILE_").from_env()?,
            feed: envy::prefixed("ENGINE_FEED_").from_env()?,
            digest: envy::prefixed("ENGINE_DIGEST_").from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let feed = &self.feed;
        if feed.pool_limit == 0 {
            return Err(ConfigError::Invalid("feed pool_limit must be positive".into()));
        }
        if !(0.0..=1.0).contains(&feed.best_threshold)
            || !(0.0..=1.0).contains(&feed.mid_threshold)
            || feed.best_threshold > feed.mid_threshold
        {
            return Err(ConfigError::Invalid(format!(
                "tier thresholds must satisfy 0 <= best ({}) <= mid ({}) <= 1",
                feed.best_threshold, feed.mid_threshold
            )));
        }
        if self.profile.target_sum <= 0.0 {
            return Err(ConfigError::Invalid("profile target_sum must be positive".into()));
        }
        if self.profile.base_learning_rate < 0.0 || self.profile.click_rate_scale < 0.0 {
            return Err(ConfigError::Invalid("learning rates must be non-negative".into()));
        }
        if self.digest.window_hours <= 0 {
            return Err(ConfigError::Invalid("digest window_hours must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.feed.pool_limit, 50);
        assert_eq!(config.digest.default_limit, 15);
        assert!((config.profile.base_learning_rate - 0.016).abs() < f64::EPSILON);
    }

    #[test]
    fn test_section_from_env_vars() {
        let vars = vec![
            ("T_FEED_POOL_LIMIT".to_string(), "80".to_string()),
            ("T_FEED_BEST_THRESHOLD".to_string(), "0.6".to_string()),
        ];
        let feed: FeedConfig = envy::prefixed("T_FEED_").from_iter(vars).unwrap();
        assert_eq!(feed.pool_limit, 80);
        assert!((feed.best_threshold - 0.6).abs() < f64::EPSILON);
        // untouched fields keep their defaults
        assert_eq!(feed.mid_tier_size, 10);
    }

    #[test]
    fn test_cutoff_policy_from_env_vars() {
        let vars = vec![(
            "T_DIGEST_CUTOFF_POLICY".to_string(),
            "latest_published".to_string(),
        )];
        let digest: DigestConfig = envy::prefixed("T_DIGEST_").from_iter(vars).unwrap();
        assert_eq!(digest.cutoff_policy, CutoffPolicy::LatestPublished);
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let mut config = Config::default();
        config.feed.best_threshold = 0.95;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
