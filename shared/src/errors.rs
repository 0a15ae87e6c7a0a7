use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Identity not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Identity API rejected request: {0}")]
    Api(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Redis error: {0}")]
    Redis(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IdentityError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            IdentityError::NotFound(_) | IdentityError::Http { status: 404, .. }
        )
    }

    /// Errors a user can fix by editing the form rather than retrying.
    pub fn is_validation(&self) -> bool {
        matches!(self, IdentityError::Validation(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            IdentityError::NotFound(_) => Some(404),
            IdentityError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) if status == reqwest::StatusCode::NOT_FOUND => {
                IdentityError::NotFound(err.to_string())
            }
            Some(status) => IdentityError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => IdentityError::Serialization(err.to_string()),
            None => IdentityError::Network(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for IdentityError {
    fn from(err: redis::RedisError) -> Self {
        IdentityError::Redis(err.to_string())
    }
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for IdentityError {
    fn from(err: std::io::Error) -> Self {
        IdentityError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
