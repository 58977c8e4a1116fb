use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Message;

/// Who authored a broadcast message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Origin {
    /// Posted by a client through the HTTP API
    User,

    /// Posted by the named bot as a reply
    Bot { name: String },
}

/// A newly stored message travelling from the store to the bots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardEvent {
    pub message: Message,
    pub origin: Origin,
    pub published_at: DateTime<Utc>,
}

impl BoardEvent {
    pub fn from_user(message: Message) -> Self {
        Self {
            message,
            origin: Origin::User,
            published_at: Utc::now(),
        }
    }

    pub fn from_bot(message: Message, name: impl Into<String>) -> Self {
        Self {
            message,
            origin: Origin::Bot { name: name.into() },
            published_at: Utc::now(),
        }
    }

    /// Bot-authored events never trigger bots; this breaks reply loops.
    pub fn is_from_bot(&self) -> bool {
        matches!(self.origin, Origin::Bot { .. })
    }
}
