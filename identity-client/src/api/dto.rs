use serde::{Deserialize, Serialize};

/// Response envelope shared by every identity endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<IdentityData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityData {
    #[serde(default)]
    pub anonymous_name: Option<String>,
}

impl IdentityEnvelope {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(IdentityData {
                anonymous_name: Some(name.into()),
            }),
            ..Self::default()
        }
    }

    pub fn failure(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors: Some(errors),
            ..Self::default()
        }
    }

    /// The server's pseudonym, only when the call succeeded and the name is non-blank.
    pub fn anonymous_name(&self) -> Option<&str> {
        if !self.success {
            return None;
        }

        self.data
            .as_ref()
            .and_then(|data| data.anonymous_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    pub fn error_message(&self) -> Option<String> {
        if let Some(errors) = self.errors.as_ref().filter(|errors| !errors.is_empty()) {
            return Some(errors.join("; "));
        }

        self.error
            .clone()
            .or_else(|| self.message.clone())
            .filter(|message| !message.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignIdentityRequest<'a> {
    pub new_name: &'a str,
    pub custom_anonymous_name: &'a str,
}

impl<'a> AssignIdentityRequest<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            new_name: name,
            custom_anonymous_name: name,
        }
    }
}
