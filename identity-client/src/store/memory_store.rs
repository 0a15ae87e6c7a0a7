use std::collections::HashMap;

use async_trait::async_trait;
use shared::{Result, SavedIdentity, TopicId};
use tokio::sync::RwLock;

use super::LocalStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    states: RwLock<HashMap<TopicId, SavedIdentity>>,
    last_names: RwLock<HashMap<TopicId, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get_state(&self, topic_id: &TopicId) -> Result<Option<SavedIdentity>> {
        Ok(self.states.read().await.get(topic_id).cloned())
    }

    async fn set_state(&self, topic_id: &TopicId, state: &SavedIdentity) -> Result<()> {
        self.states
            .write()
            .await
            .insert(topic_id.clone(), state.clone());
        Ok(())
    }

    async fn get_last_name(&self, topic_id: &TopicId) -> Result<Option<String>> {
        Ok(self.last_names.read().await.get(topic_id).cloned())
    }

    async fn set_last_name(&self, topic_id: &TopicId, name: &str) -> Result<()> {
        self.last_names
            .write()
            .await
            .insert(topic_id.clone(), name.to_string());
        Ok(())
    }
}
