//! Outbound delivery interface, shared between the job handlers and the
//! channel adapters.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Platform-native identifier of the recipient (a Telegram chat ID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recipient(pub i64);

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Recipient {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A file sent alongside the message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Delivery channel for reminder messages.
///
/// Implementations return [`CarebotError::Delivery`](crate::error::CarebotError::Delivery)
/// on network or API failure.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        recipient: Recipient,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> Result<()>;
}
