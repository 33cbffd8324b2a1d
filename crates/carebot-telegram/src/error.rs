use carebot_core::CarebotError;

/// Errors produced by the Telegram notifier.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("teloxide error: {0}")]
    Teloxide(#[from] teloxide::RequestError),

    #[error("no bot token configured")]
    NoToken,
}

impl From<TelegramError> for CarebotError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::NoToken => CarebotError::Config(e.to_string()),
            other => CarebotError::Delivery(other.to_string()),
        }
    }
}
