use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use shared::{record_timing, AnonymousName, ApiConfig, IdentityError, Result, TopicId};
use uuid::Uuid;

use super::dto::{AssignIdentityRequest, IdentityEnvelope};

/// Server of record for per-topic pseudonyms.
///
/// A 404 from any endpoint surfaces as [`IdentityError::NotFound`] so callers
/// can tell "no identity" apart from a transport failure.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// `Ok(None)` when the server answered but holds no pseudonym.
    async fn fetch_identity(&self, topic_id: &TopicId) -> Result<Option<String>>;

    /// Returns the name the server settled on, which may differ from `name`.
    async fn assign_identity(&self, topic_id: &TopicId, name: &AnonymousName)
        -> Result<Option<String>>;

    async fn remove_identity(&self, topic_id: &TopicId) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpIdentityApi {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpIdentityApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| IdentityError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| IdentityError::Config(format!("Invalid API base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(IdentityError::Config(format!(
                "API base URL cannot carry a path: {}",
                base_url
            )));
        }

        tracing::info!(
            base_url = %config.base_url,
            timeout_ms = config.timeout_ms,
            authenticated = config.auth_token.is_some(),
            "Identity API client ready"
        );

        Ok(Self {
            client,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    fn topic_url(&self, topic_id: &TopicId) -> Result<Url> {
        self.endpoint(&["api", "topics", topic_id.as_str(), "anonymous-identity"])
    }

    fn user_url(&self, topic_id: &TopicId) -> Result<Url> {
        self.endpoint(&["api", "users", "anonymous-identity", topic_id.as_str()])
    }

    /// Appends `segments` to the base path, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| IdentityError::Internal(format!("Unusable base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header("x-request-id", Uuid::new_v4().to_string());

        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, topic_id: &TopicId) -> Result<IdentityEnvelope> {
        let started = Instant::now();
        let response = builder.send().await;
        record_timing("identity_api_request_seconds", started.elapsed().as_secs_f64());

        let response = response.map_err(|e| {
            tracing::warn!(topic_id = %topic_id, error = %e, "Identity API request failed");
            IdentityError::from(e)
        })?;

        let status = response.status();
        let body = response.bytes().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(IdentityError::NotFound(topic_id.to_string()));
        }

        if !status.is_success() {
            let message = serde_json::from_slice::<IdentityEnvelope>(&body)
                .ok()
                .and_then(|envelope| envelope.error_message())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unexpected status")
                        .to_string()
                });

            tracing::warn!(
                topic_id = %topic_id,
                status = status.as_u16(),
                message = %message,
                "Identity API returned an error status"
            );

            return Err(IdentityError::Http {
                status: status.as_u16(),
                message,
            });
        }

        if body.is_empty() {
            return Ok(IdentityEnvelope::ok());
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn fetch_identity(&self, topic_id: &TopicId) -> Result<Option<String>> {
        let url = self.topic_url(topic_id)?;
        let envelope = self.send(self.request(Method::GET, url), topic_id).await?;

        tracing::debug!(
            topic_id = %topic_id,
            success = envelope.success,
            has_name = envelope.anonymous_name().is_some(),
            "Fetched anonymous identity"
        );

        Ok(envelope.anonymous_name().map(str::to_string))
    }

    async fn assign_identity(
        &self,
        topic_id: &TopicId,
        name: &AnonymousName,
    ) -> Result<Option<String>> {
        let url = self.topic_url(topic_id)?;
        let builder = self
            .request(Method::PUT, url)
            .json(&AssignIdentityRequest::new(name.as_str()));

        let envelope = self.send(builder, topic_id).await?;

        if !envelope.success {
            return Err(IdentityError::Api(envelope.error_message().unwrap_or_else(|| {
                "Failed to update anonymous identity".to_string()
            })));
        }

        Ok(envelope.anonymous_name().map(str::to_string))
    }

    async fn remove_identity(&self, topic_id: &TopicId) -> Result<()> {
        let url = self.user_url(topic_id)?;
        let envelope = self.send(self.request(Method::DELETE, url), topic_id).await?;

        if !envelope.success {
            return Err(IdentityError::Api(envelope.error_message().unwrap_or_else(|| {
                "Failed to delete anonymous identity".to_string()
            })));
        }

        Ok(())
    }
}
