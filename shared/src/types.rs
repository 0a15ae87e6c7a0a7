use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{IdentityError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(String);

impl TopicId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();

        if trimmed.is_empty() {
            return Err(IdentityError::Validation(
                "Topic id must not be empty".to_string(),
            ));
        }

        if trimmed.contains('/') || trimmed == "." || trimmed == ".." {
            return Err(IdentityError::Validation(format!(
                "Invalid topic id: {}",
                trimmed
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A pseudonym that is safe to send to the server: trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnonymousName(String);

impl AnonymousName {
    pub fn new(name: &str) -> Result<Self> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(IdentityError::Validation(
                "Anonymous name is required when anonymous mode is enabled".to_string(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for AnonymousName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the user sees (or asks for) in one topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousIdentityState {
    pub is_anonymous: bool,
    pub name: Option<String>,
}

impl AnonymousIdentityState {
    pub fn new(is_anonymous: bool, name: Option<String>) -> Self {
        Self { is_anonymous, name }
    }

    pub fn anonymous(name: impl Into<String>) -> Self {
        Self {
            is_anonymous: true,
            name: Some(name.into()),
        }
    }

    pub fn public() -> Self {
        Self::default()
    }

    /// Name with whitespace trimmed, `None` when blank.
    pub fn trimmed_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Cache entry stored under `anonymous-mode-state:{topic}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedIdentity {
    pub is_anonymous: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SavedIdentity {
    pub fn new(is_anonymous: bool, name: Option<String>) -> Self {
        Self {
            is_anonymous,
            name,
            updated_at: Some(Utc::now()),
        }
    }

    pub fn non_empty_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

impl From<&SavedIdentity> for AnonymousIdentityState {
    fn from(saved: &SavedIdentity) -> Self {
        Self {
            is_anonymous: saved.is_anonymous,
            name: saved.name.clone(),
        }
    }
}
