use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use shared::{AnonymousIdentityState, IdentityError, Result, TopicId};
use tokio::sync::{watch, Mutex};

use super::resolver::AnonymousIdentityResolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Applied(AnonymousIdentityState),
    /// A later `open` was issued before this one finished.
    Superseded,
    Closed,
}

/// Working state of one open identity dialog for a topic.
///
/// Loads are tagged with a generation so that only the most recently
/// issued one is applied, whatever order the responses arrive in.
pub struct IdentitySession {
    resolver: Arc<AnonymousIdentityResolver>,
    topic_id: TopicId,
    generation: AtomicU64,
    draft: RwLock<AnonymousIdentityState>,
    /// Serializes the check-then-apply step of `open`.
    apply_lock: Mutex<()>,
    closed: watch::Sender<bool>,
}

impl IdentitySession {
    pub fn new(resolver: Arc<AnonymousIdentityResolver>, topic_id: TopicId) -> Self {
        let (closed, _) = watch::channel(false);

        Self {
            resolver,
            topic_id,
            generation: AtomicU64::new(0),
            draft: RwLock::new(AnonymousIdentityState::default()),
            apply_lock: Mutex::new(()),
            closed,
        }
    }

    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub async fn open(&self, hint: &AnonymousIdentityState) -> LoadStatus {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut closed = self.closed.subscribe();

        if self.is_closed() {
            return LoadStatus::Closed;
        }

        let resolution = tokio::select! {
            resolution = self.resolver.resolve(&self.topic_id, hint) => resolution,
            _ = wait_closed(&mut closed) => {
                tracing::debug!(topic_id = %self.topic_id, generation, "Load abandoned, session closed");
                return LoadStatus::Closed;
            }
        };

        // Stale and abandoned loads must not touch the cache either.
        let _applying = self.apply_lock.lock().await;

        if self.is_closed() {
            return LoadStatus::Closed;
        }

        let latest = self.generation.load(Ordering::SeqCst);
        if latest != generation {
            tracing::debug!(
                topic_id = %self.topic_id,
                generation,
                latest,
                "Discarding stale identity load"
            );
            return LoadStatus::Superseded;
        }

        self.resolver.write_back(&self.topic_id, &resolution).await;
        self.replace_draft(resolution.state.clone());
        LoadStatus::Applied(resolution.state)
    }

    pub fn draft(&self) -> AnonymousIdentityState {
        self.draft
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_anonymous(&self, is_anonymous: bool) {
        self.draft
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .is_anonymous = is_anonymous;
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.draft.write().unwrap_or_else(PoisonError::into_inner).name = Some(name.into());
    }

    /// Save the draft. On success the draft takes the server's answer.
    pub async fn commit(&self) -> Result<AnonymousIdentityState> {
        if self.is_closed() {
            return Err(IdentityError::Internal(format!(
                "Identity session for topic {} is closed",
                self.topic_id
            )));
        }

        let draft = self.draft();
        let state = self.resolver.save(&self.topic_id, &draft).await?;

        if !self.is_closed() {
            self.replace_draft(state.clone());
        }

        Ok(state)
    }

    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    fn replace_draft(&self, state: AnonymousIdentityState) {
        *self.draft.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

impl Drop for IdentitySession {
    fn drop(&mut self) {
        self.closed.send_replace(true);
    }
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    loop {
        let is_closed = *closed.borrow_and_update();
        if is_closed || closed.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::IdentityApi;
    use crate::notify::MemoryNotifier;
    use crate::store::{LocalStore, MemoryStore};
    use async_trait::async_trait;
    use shared::AnonymousName;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    /// Each fetch waits for the test to release it with a name.
    #[derive(Default)]
    struct GatedApi {
        gates: Mutex<Vec<oneshot::Receiver<String>>>,
    }

    impl GatedApi {
        fn gate(&self) -> oneshot::Sender<String> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push(rx);
            tx
        }
    }

    #[async_trait]
    impl IdentityApi for GatedApi {
        async fn fetch_identity(&self, _topic_id: &TopicId) -> Result<Option<String>> {
            let gate = self.gates.lock().unwrap().remove(0);
            gate.await
                .map(Some)
                .map_err(|_| IdentityError::Network("gate dropped".to_string()))
        }

        async fn assign_identity(
            &self,
            _topic_id: &TopicId,
            name: &AnonymousName,
        ) -> Result<Option<String>> {
            Ok(Some(name.as_str().to_string()))
        }

        async fn remove_identity(&self, _topic_id: &TopicId) -> Result<()> {
            Ok(())
        }
    }

    fn session(api: Arc<dyn IdentityApi>, store: Arc<MemoryStore>) -> Arc<IdentitySession> {
        let resolver = AnonymousIdentityResolver::new(api, store, Arc::new(MemoryNotifier::new()));
        Arc::new(IdentitySession::new(
            Arc::new(resolver),
            TopicId::new("t1").unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_latest_issued_load_wins() {
        let api = Arc::new(GatedApi::default());
        let first_gate = api.gate();
        let second_gate = api.gate();
        let store = Arc::new(MemoryStore::new());
        let session = session(api.clone(), store.clone());

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.open(&AnonymousIdentityState::public()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = tokio::spawn({
            let session = session.clone();
            async move { session.open(&AnonymousIdentityState::public()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        second_gate.send("Newer".to_string()).unwrap();
        let second = second.await.unwrap();
        first_gate.send("Older".to_string()).unwrap();
        let first = first.await.unwrap();

        assert_eq!(
            second,
            LoadStatus::Applied(AnonymousIdentityState::new(false, Some("Newer".to_string())))
        );
        assert_eq!(first, LoadStatus::Superseded);
        assert_eq!(session.draft().name.as_deref(), Some("Newer"));

        let saved = store.get_state(session.topic_id()).await.unwrap().unwrap();
        assert_eq!(saved.name.as_deref(), Some("Newer"));
        assert_eq!(
            store.get_last_name(session.topic_id()).await.unwrap().as_deref(),
            Some("Newer")
        );
    }

    #[tokio::test]
    async fn test_superseded_load_leaves_cache_alone() {
        let api = Arc::new(GatedApi::default());
        let first_gate = api.gate();
        let second_gate = api.gate();
        let store = Arc::new(MemoryStore::new());
        let session = session(api.clone(), store.clone());

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.open(&AnonymousIdentityState::public()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = tokio::spawn({
            let session = session.clone();
            async move { session.open(&AnonymousIdentityState::public()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The stale response lands first and must not be cached.
        first_gate.send("Older".to_string()).unwrap();
        assert_eq!(first.await.unwrap(), LoadStatus::Superseded);
        assert_eq!(store.get_state(session.topic_id()).await.unwrap(), None);
        assert_eq!(store.get_last_name(session.topic_id()).await.unwrap(), None);

        second_gate.send("Newer".to_string()).unwrap();
        assert!(matches!(second.await.unwrap(), LoadStatus::Applied(_)));
        assert_eq!(
            store.get_last_name(session.topic_id()).await.unwrap().as_deref(),
            Some("Newer")
        );
    }

    #[tokio::test]
    async fn test_close_abandons_in_flight_load() {
        let api = Arc::new(GatedApi::default());
        let gate = api.gate();
        let store = Arc::new(MemoryStore::new());
        let session = session(api.clone(), store.clone());

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.open(&AnonymousIdentityState::public()).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        session.close();

        assert_eq!(pending.await.unwrap(), LoadStatus::Closed);
        assert!(gate.send("Late".to_string()).is_err());
        assert_eq!(session.draft(), AnonymousIdentityState::default());
        assert_eq!(store.get_state(session.topic_id()).await.unwrap(), None);
        assert_eq!(store.get_last_name(session.topic_id()).await.unwrap(), None);
        assert!(session.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_toggle_then_commit() {
        let api = Arc::new(GatedApi::default());
        let store = Arc::new(MemoryStore::new());
        let session = session(api, store.clone());

        session.set_anonymous(true);
        session.set_name("  Raven7 ");
        let state = session.commit().await.unwrap();

        assert_eq!(state, AnonymousIdentityState::anonymous("Raven7"));
        assert_eq!(session.draft(), state);

        let saved = store.get_state(session.topic_id()).await.unwrap().unwrap();
        assert!(saved.is_anonymous);
        assert_eq!(saved.name.as_deref(), Some("Raven7"));
        assert!(saved.updated_at.is_some());
    }
}
