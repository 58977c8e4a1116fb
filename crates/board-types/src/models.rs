use serde::{Deserialize, Serialize};

/// A persisted board message. `id` is assigned by the store and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub body: String,
    pub username: String,
}

/// A message that has not been stored yet: insert payloads and bot replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub body: String,
    pub username: String,
}

impl NewMessage {
    pub fn new(body: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            username: username.into(),
        }
    }

    pub fn with_id(self, id: i64) -> Message {
        Message {
            id,
            body: self.body,
            username: self.username,
        }
    }
}
