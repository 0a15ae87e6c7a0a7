use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use shared::{IdentityError, Result, SavedIdentity, TopicId};
use tracing::{debug, error};

use super::{last_name_key, state_key, LocalStore};

#[derive(Clone)]
pub struct RedisStore {
    redis: MultiplexedConnection,
}

impl RedisStore {
    pub fn new(redis: MultiplexedConnection) -> Self {
        Self { redis }
    }

    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let redis = client.get_multiplexed_async_connection().await.map_err(|e| {
            error!("Failed to connect to Redis at {}: {}", redis_url, e);
            IdentityError::Redis(e.to_string())
        })?;

        tracing::info!("Connected to Redis identity store at {}", redis_url);
        Ok(Self::new(redis))
    }
}

#[async_trait]
impl LocalStore for RedisStore {
    async fn get_state(&self, topic_id: &TopicId) -> Result<Option<SavedIdentity>> {
        let mut conn = self.redis.clone();

        let raw: Option<String> = conn
            .get(state_key(topic_id))
            .await
            .map_err(|e: RedisError| {
                error!("Failed to get identity state for topic {}: {}", topic_id, e);
                IdentityError::Redis(e.to_string())
            })?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set_state(&self, topic_id: &TopicId, state: &SavedIdentity) -> Result<()> {
        let mut conn = self.redis.clone();
        let json = serde_json::to_string(state)?;

        conn.set::<_, _, ()>(state_key(topic_id), json)
            .await
            .map_err(|e: RedisError| {
                error!("Failed to set identity state for topic {}: {}", topic_id, e);
                IdentityError::Redis(e.to_string())
            })?;

        debug!("Stored identity state for topic {}", topic_id);
        Ok(())
    }

    async fn get_last_name(&self, topic_id: &TopicId) -> Result<Option<String>> {
        let mut conn = self.redis.clone();

        let name: Option<String> = conn
            .get(last_name_key(topic_id))
            .await
            .map_err(|e: RedisError| {
                error!("Failed to get last name for topic {}: {}", topic_id, e);
                IdentityError::Redis(e.to_string())
            })?;

        Ok(name)
    }

    async fn set_last_name(&self, topic_id: &TopicId, name: &str) -> Result<()> {
        let mut conn = self.redis.clone();

        conn.set::<_, _, ()>(last_name_key(topic_id), name)
            .await
            .map_err(|e: RedisError| {
                error!("Failed to set last name for topic {}: {}", topic_id, e);
                IdentityError::Redis(e.to_string())
            })?;

        debug!("Stored last name for topic {}", topic_id);
        Ok(())
    }
}
