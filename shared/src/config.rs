use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::{IdentityError, Result};

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub timeout_ms: u64,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: env::var("IDENTITY_API_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            auth_token: env::var("IDENTITY_API_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            timeout_ms: env::var("IDENTITY_API_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|e| IdentityError::Config(format!("Invalid IDENTITY_API_TIMEOUT_MS: {}", e)))?,
        })
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "file" => Ok(StoreBackend::File),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(IdentityError::Config(format!(
                "Unknown store backend: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub file_path: PathBuf,
    pub redis_url: String,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            backend: env::var("IDENTITY_STORE")
                .unwrap_or_else(|_| "file".to_string())
                .parse()?,
            file_path: env::var("IDENTITY_STORE_PATH")
                .unwrap_or_else(|_| ".topicsflow/identity-cache.json".to_string())
                .into(),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        })
    }
}

/// How a failed DELETE is treated when the user turns anonymous mode off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Every failure counts as success; the local cache is updated anyway.
    #[default]
    TolerateAll,
    /// Only "nothing to delete" (404) counts as success.
    TolerateNotFound,
}

impl FromStr for DeletePolicy {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tolerate-all" => Ok(DeletePolicy::TolerateAll),
            "tolerate-not-found" => Ok(DeletePolicy::TolerateNotFound),
            other => Err(IdentityError::Config(format!(
                "Unknown delete policy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub delete_policy: DeletePolicy,
}

impl ResolverConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            delete_policy: env::var("IDENTITY_DELETE_POLICY")
                .unwrap_or_else(|_| "tolerate-all".to_string())
                .parse()?,
        })
    }
}
