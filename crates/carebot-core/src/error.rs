use thiserror::Error;

#[derive(Debug, Error)]
pub enum CarebotError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The budget spreadsheet is missing, unreadable or malformed.
    #[error("Budget data unavailable: {0}")]
    DataUnavailable(String),

    /// The care-plan document could not be produced.
    #[error("Render failed: {0}")]
    Render(String),

    /// The messaging API rejected the message or could not be reached.
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CarebotError {
    /// Short error code attached to log events.
    pub fn code(&self) -> &'static str {
        match self {
            CarebotError::Config(_) => "CONFIG_ERROR",
            CarebotError::DataUnavailable(_) => "DATA_UNAVAILABLE",
            CarebotError::Render(_) => "RENDER_ERROR",
            CarebotError::Delivery(_) => "DELIVERY_ERROR",
            CarebotError::Serialization(_) => "SERIALIZATION_ERROR",
            CarebotError::Io(_) => "IO_ERROR",
            CarebotError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CarebotError>;
