pub mod file_store;
pub mod memory_store;
pub mod redis_store;

use std::sync::Arc;

use async_trait::async_trait;
use shared::{Result, SavedIdentity, StoreBackend, StoreConfig, TopicId};

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

const STATE_KEY_PREFIX: &str = "anonymous-mode-state";
const LAST_NAME_KEY_PREFIX: &str = "last-anonymous-name";

pub fn state_key(topic_id: &TopicId) -> String {
    format!("{}:{}", STATE_KEY_PREFIX, topic_id)
}

pub fn last_name_key(topic_id: &TopicId) -> String {
    format!("{}:{}", LAST_NAME_KEY_PREFIX, topic_id)
}

/// Client-side record of what the user last chose in each topic.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get_state(&self, topic_id: &TopicId) -> Result<Option<SavedIdentity>>;

    async fn set_state(&self, topic_id: &TopicId, state: &SavedIdentity) -> Result<()>;

    async fn get_last_name(&self, topic_id: &TopicId) -> Result<Option<String>>;

    async fn set_last_name(&self, topic_id: &TopicId, name: &str) -> Result<()>;
}

pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn LocalStore>> {
    let store: Arc<dyn LocalStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::new(&config.file_path)),
        StoreBackend::Redis => Arc::new(RedisStore::connect(&config.redis_url).await?),
    };

    tracing::info!(backend = ?config.backend, "Local identity store ready");

    Ok(store)
}
