use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use shared::{Result, SavedIdentity, TopicId};
use tokio::sync::Mutex;

use super::{last_name_key, state_key, LocalStore};

type Document = BTreeMap<String, Value>;

/// JSON document on disk holding every cache key, loaded on first access.
pub struct FileStore {
    path: PathBuf,
    document: Mutex<Option<Document>>,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            document: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<Document> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Document::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_document(&self, document: &Document) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.path.with_extension("tmp");

        tokio::fs::write(&tmp_path, &bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(path = %self.path.display(), keys = document.len(), "Identity cache flushed");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut guard = self.document.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_document().await?);
        }

        Ok(guard.as_ref().and_then(|document| document.get(key).cloned()))
    }

    async fn set(&self, key: String, value: Value) -> Result<()> {
        let mut guard = self.document.lock().await;

        // Work on a copy so a failed flush leaves memory matching the disk.
        let mut document = match guard.as_ref() {
            Some(document) => document.clone(),
            None => self.read_document().await?,
        };
        document.insert(key, value);

        self.write_document(&document).await?;
        *guard = Some(document);
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn get_state(&self, topic_id: &TopicId) -> Result<Option<SavedIdentity>> {
        match self.get(&state_key(topic_id)).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_state(&self, topic_id: &TopicId, state: &SavedIdentity) -> Result<()> {
        self.set(state_key(topic_id), serde_json::to_value(state)?).await
    }

    async fn get_last_name(&self, topic_id: &TopicId) -> Result<Option<String>> {
        match self.get(&last_name_key(topic_id)).await? {
            Some(Value::String(name)) => Ok(Some(name)),
            Some(other) => {
                tracing::warn!(topic_id = %topic_id, value = %other, "Ignoring malformed last name entry");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_last_name(&self, topic_id: &TopicId, name: &str) -> Result<()> {
        self.set(last_name_key(topic_id), Value::String(name.to_string()))
            .await
    }
}
