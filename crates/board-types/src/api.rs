use serde::{Deserialize, Serialize};

/// Username used when a client posts without one.
pub const ANONYMOUS: &str = "anonymous";

// -- Messages --

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub body: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl CreateMessageRequest {
    /// Username to store: the given one, or `anonymous` when missing or blank.
    pub fn username_or_anonymous(&self) -> &str {
        match self.username.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => ANONYMOUS,
        }
    }
}

/// `username` is optional so the board UI can edit only the body.
#[derive(Debug, Deserialize)]
pub struct UpdateMessageRequest {
    pub body: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl UpdateMessageRequest {
    /// New username, trimmed. `None` when missing or blank keeps the stored one.
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

// -- Envelope --

/// Every API response is `{ "result": ..., "error": ... }` with exactly one side set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub result: Option<T>,
    pub error: Option<ErrorBody>,
}

impl<T> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            result: None,
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(ErrorBody {
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
