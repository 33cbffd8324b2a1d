use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::InputFile;
use tracing::{debug, info};

use carebot_core::{Attachment, Notifier, Recipient};

use crate::error::TelegramError;
use crate::send::{plan_delivery, Outgoing};

/// Pause between consecutive calls of one delivery, to stay clear of rate limits.
const CALL_GAP: Duration = Duration::from_millis(100);

/// [`Notifier`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
}

impl TelegramNotifier {
    pub fn new(token: &str) -> Result<Self, TelegramError> {
        if token.trim().is_empty() {
            return Err(TelegramError::NoToken);
        }
        Ok(Self {
            bot: Bot::new(token),
        })
    }

    async fn deliver(
        &self,
        chat_id: ChatId,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> Result<(), TelegramError> {
        let calls = plan_delivery(text, attachment.is_some());
        let total = calls.len();
        for (i, call) in calls.into_iter().enumerate() {
            match (call, attachment) {
                (Outgoing::Document { caption }, Some(file)) => {
                    let input = InputFile::memory(file.bytes.clone()).file_name(file.file_name.clone());
                    let request = self.bot.send_document(chat_id, input);
                    match caption {
                        Some(caption) => request.caption(caption).await?,
                        None => request.await?,
                    };
                    debug!(chat_id = chat_id.0, file = %file.file_name, "telegram: document sent");
                }
                (Outgoing::Document { .. }, None) => {}
                (Outgoing::Text(chunk), _) => {
                    self.bot.send_message(chat_id, chunk).await?;
                }
            }
            if i + 1 < total {
                tokio::time::sleep(CALL_GAP).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(
        &self,
        recipient: Recipient,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> carebot_core::Result<()> {
        self.deliver(ChatId(recipient.0), text, attachment).await?;
        info!(
            chat_id = recipient.0,
            chars = text.chars().count(),
            attachment = attachment.map(|a| a.file_name.as_str()),
            "telegram: message delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carebot_core::CarebotError;

    #[test]
    fn empty_token_is_rejected() {
        assert!(matches!(
            TelegramNotifier::new("  "),
            Err(TelegramError::NoToken)
        ));
    }

    #[test]
    fn missing_token_maps_to_config_error() {
        let err: CarebotError = TelegramError::NoToken.into();
        assert!(matches!(err, CarebotError::Config(_)));
    }
}
