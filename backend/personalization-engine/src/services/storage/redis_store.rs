// ============================================
// Redis Stores
// ============================================
//
// Key layout:
//   profile:{user_id}        HASH  version -> u64, body -> profile JSON
//   profile:users            SET   registered user ids
//   interactions:{user_id}   HASH  item_id -> interaction JSON
//
// Profile writes go through a Lua compare-and-swap on the `version` field so
// two engine instances cannot interleave a read-modify-write for the same user.

use super::{InteractionLedger, ProfileStore};
use crate::error::{EngineError, Result};
use crate::models::{InteractionRecord, UserProfile};
use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

const USERS_KEY: &str = "profile:users";

const CREATE_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return redis.call('HGET', KEYS[1], 'body')
end
redis.call('HSET', KEYS[1], 'version', '0', 'body', ARGV[1])
redis.call('SADD', KEYS[2], ARGV[2])
return ARGV[1]
"#;

const COMPARE_AND_SWAP_SCRIPT: &str = r#"
local current = redis.call('HGET', KEYS[1], 'version')
if not current then
  return -1
end
if current ~= ARGV[1] then
  return 0
end
redis.call('HSET', KEYS[1], 'version', ARGV[2], 'body', ARGV[3])
return 1
"#;

pub struct RedisProfileStore {
    redis: redis::Client,
    create_script: redis::Script,
    cas_script: redis::Script,
}

impl RedisProfileStore {
    pub fn new(redis: redis::Client) -> Self {
        Self {
            redis,
            create_script: redis::Script::new(CREATE_SCRIPT),
            cas_script: redis::Script::new(COMPARE_AND_SWAP_SCRIPT),
        }
    }

    fn profile_key(user_id: Uuid) -> String {
        format!("profile:{}", user_id)
    }
}

#[async_trait]
impl ProfileStore for RedisProfileStore {
    async fn create(&self, user_id: Uuid) -> Result<UserProfile> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let body = serde_json::to_string(&UserProfile::cold_start(user_id))?;

        let stored: String = self
            .create_script
            .key(Self::profile_key(user_id))
            .key(USERS_KEY)
            .arg(body)
            .arg(user_id.to_string())
            .invoke_async(&mut conn)
            .await?;

        Ok(serde_json::from_str(&stored)?)
    }

    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let body: Option<String> = conn.hget(Self::profile_key(user_id), "body").await?;

        body.map(|json| serde_json::from_str(&json).map_err(EngineError::from))
            .transpose()
    }

    async fn put(&self, profile: &UserProfile) -> Result<UserProfile> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let mut next = profile.clone();
        next.version = profile.version + 1;
        next.updated_at = Utc::now();
        let body = serde_json::to_string(&next)?;

        let outcome: i64 = self
            .cas_script
            .key(Self::profile_key(profile.user_id))
            .arg(profile.version)
            .arg(next.version)
            .arg(body)
            .invoke_async(&mut conn)
            .await?;

        match outcome {
            1 => {
                debug!(user_id = %profile.user_id, version = next.version, "Profile written");
                Ok(next)
            }
            0 => Err(EngineError::Conflict {
                user_id: profile.user_id,
                expected: profile.version,
            }),
            _ => Err(EngineError::UserNotFound(profile.user_id)),
        }
    }

    async fn list_users(&self) -> Result<Vec<Uuid>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let members: Vec<String> = conn.smembers(USERS_KEY).await?;

        let mut users: Vec<Uuid> = members
            .iter()
            .filter_map(|raw| match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(member = %raw, error = %e, "Skipping malformed user id");
                    None
                }
            })
            .collect();
        users.sort();
        Ok(users)
    }
}

pub struct RedisInteractionLedger {
    redis: redis::Client,
}

impl RedisInteractionLedger {
    pub fn new(redis: redis::Client) -> Self {
        Self { redis }
    }

    fn ledger_key(user_id: Uuid) -> String {
        format!("interactions:{}", user_id)
    }
}

#[async_trait]
impl InteractionLedger for RedisInteractionLedger {
    async fn get(&self, user_id: Uuid, item_id: Uuid) -> Result<Option<InteractionRecord>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let json: Option<String> = conn
            .hget(Self::ledger_key(user_id), item_id.to_string())
            .await?;

        json.map(|j| serde_json::from_str(&j).map_err(EngineError::from))
            .transpose()
    }

    async fn upsert(&self, record: InteractionRecord) -> Result<InteractionRecord> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let json = serde_json::to_string(&record)?;

        let _: () = conn
            .hset(
                Self::ledger_key(record.user_id),
                record.item_id.to_string(),
                json,
            )
            .await?;
        Ok(record)
    }

    async fn interacted_items(&self, user_id: Uuid) -> Result<HashSet<Uuid>> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = conn.hkeys(Self::ledger_key(user_id)).await?;

        Ok(keys
            .iter()
            .filter_map(|raw| match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        field = %raw,
                        error = %e,
                        "Skipping malformed interaction key"
                    );
                    None
                }
            })
            .collect())
    }
}
