use std::sync::Arc;

use shared::{
    record_counter, AnonymousIdentityState, AnonymousName, DeletePolicy, Result,
    SavedIdentity, TopicId,
};

use crate::api::IdentityApi;
use crate::domain::{reconcile, Resolution, ServerLookup};
use crate::notify::{Notice, Notifier};
use crate::store::LocalStore;

pub struct AnonymousIdentityResolver {
    api: Arc<dyn IdentityApi>,
    store: Arc<dyn LocalStore>,
    notifier: Arc<dyn Notifier>,
    delete_policy: DeletePolicy,
}

impl AnonymousIdentityResolver {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        store: Arc<dyn LocalStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            api,
            store,
            notifier,
            delete_policy: DeletePolicy::default(),
        }
    }

    pub fn with_delete_policy(mut self, delete_policy: DeletePolicy) -> Self {
        self.delete_policy = delete_policy;
        self
    }

    /// Reconcile server, cache and `hint` into the state to display, and
    /// mirror a server-provided name into the cache.
    ///
    /// Never fails: every error degrades to a best-effort local answer.
    pub async fn load(
        &self,
        topic_id: &TopicId,
        hint: &AnonymousIdentityState,
    ) -> AnonymousIdentityState {
        let resolution = self.resolve(topic_id, hint).await;
        self.write_back(topic_id, &resolution).await;
        resolution.state
    }

    /// Like [`load`](Self::load) but leaves the cache alone; pair with
    /// [`write_back`](Self::write_back) once the result is known to be current.
    pub async fn resolve(&self, topic_id: &TopicId, hint: &AnonymousIdentityState) -> Resolution {
        let saved = self.read_saved(topic_id).await;
        let last_name = self.read_last_name(topic_id).await;

        let lookup = ServerLookup::from_result(self.api.fetch_identity(topic_id).await);
        if let ServerLookup::Failed(reason) = &lookup {
            tracing::warn!(
                topic_id = %topic_id,
                error = %reason,
                "Identity lookup failed, using local fallback"
            );
            record_counter("identity_load_fallback_total", 1);
        }

        let resolution = reconcile(&lookup, &saved, last_name.as_deref(), hint);

        record_counter("identity_load_total", 1);
        tracing::debug!(
            topic_id = %topic_id,
            source = ?resolution.source,
            is_anonymous = resolution.state.is_anonymous,
            "Anonymous identity resolved"
        );

        resolution
    }

    pub async fn write_back(&self, topic_id: &TopicId, resolution: &Resolution) {
        if resolution.write_back {
            self.persist(topic_id, &resolution.state, true).await;
        }
    }

    /// Push the user's choice to the server, then mirror it locally.
    pub async fn save(
        &self,
        topic_id: &TopicId,
        desired: &AnonymousIdentityState,
    ) -> Result<AnonymousIdentityState> {
        if desired.is_anonymous {
            let name = AnonymousName::new(desired.name.as_deref().unwrap_or_default())?;
            self.enable(topic_id, name).await
        } else {
            self.disable(topic_id, desired).await
        }
    }

    async fn enable(&self, topic_id: &TopicId, name: AnonymousName) -> Result<AnonymousIdentityState> {
        let server_name = match self.api.assign_identity(topic_id, &name).await {
            Ok(server_name) => server_name,
            Err(e) => {
                tracing::warn!(topic_id = %topic_id, error = %e, "Failed to save anonymous identity");
                record_counter("identity_save_failure_total", 1);
                self.notifier
                    .notify(Notice::error(format!("Failed to save anonymous identity: {}", e)));
                return Err(e);
            }
        };

        let final_name = server_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| name.into_inner());

        let state = AnonymousIdentityState::anonymous(final_name.clone());
        self.persist(topic_id, &state, true).await;

        record_counter("identity_save_success_total", 1);
        tracing::info!(
            topic_id = %topic_id,
            anonymous_name = %final_name,
            "Anonymous identity saved"
        );
        self.notifier
            .notify(Notice::success(format!("Posting anonymously as {}", final_name)));

        Ok(state)
    }

    async fn disable(
        &self,
        topic_id: &TopicId,
        desired: &AnonymousIdentityState,
    ) -> Result<AnonymousIdentityState> {
        match self.api.remove_identity(topic_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::debug!(topic_id = %topic_id, "No anonymous identity to delete");
            }
            Err(e) if self.delete_policy == DeletePolicy::TolerateAll => {
                tracing::warn!(
                    topic_id = %topic_id,
                    error = %e,
                    "Ignoring failed anonymous identity deletion"
                );
                record_counter("identity_delete_swallowed_total", 1);
            }
            Err(e) => {
                tracing::warn!(topic_id = %topic_id, error = %e, "Failed to delete anonymous identity");
                record_counter("identity_save_failure_total", 1);
                self.notifier
                    .notify(Notice::error(format!("Failed to disable anonymous mode: {}", e)));
                return Err(e);
            }
        }

        let retained = self
            .read_saved(topic_id)
            .await
            .non_empty_name()
            .map(str::to_string)
            .or_else(|| desired.trimmed_name().map(str::to_string));

        let state = AnonymousIdentityState::new(false, retained);
        self.persist(topic_id, &state, false).await;

        record_counter("identity_save_success_total", 1);
        tracing::info!(topic_id = %topic_id, "Anonymous mode disabled");
        self.notifier.notify(Notice::success("Anonymous mode disabled"));

        Ok(state)
    }

    async fn read_saved(&self, topic_id: &TopicId) -> SavedIdentity {
        match self.store.get_state(topic_id).await {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(topic_id = %topic_id, error = %e, "Unreadable cached identity state");
                SavedIdentity::default()
            }
        }
    }

    async fn read_last_name(&self, topic_id: &TopicId) -> Option<String> {
        match self.store.get_last_name(topic_id).await {
            Ok(name) => name.filter(|n| !n.trim().is_empty()),
            Err(e) => {
                tracing::warn!(topic_id = %topic_id, error = %e, "Unreadable cached last name");
                None
            }
        }
    }

    /// Cache writes are best effort; the server already holds the truth.
    async fn persist(&self, topic_id: &TopicId, state: &AnonymousIdentityState, with_last_name: bool) {
        let saved = SavedIdentity::new(state.is_anonymous, state.name.clone());
        if let Err(e) = self.store.set_state(topic_id, &saved).await {
            tracing::warn!(topic_id = %topic_id, error = %e, "Failed to cache identity state");
        }

        if !with_last_name {
            return;
        }

        if let Some(name) = state.trimmed_name() {
            if let Err(e) = self.store.set_last_name(topic_id, name).await {
                tracing::warn!(topic_id = %topic_id, error = %e, "Failed to cache last name");
            }
        }
    }
}
