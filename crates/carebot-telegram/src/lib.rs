pub mod error;
pub mod notifier;
pub mod send;

pub use error::TelegramError;
pub use notifier::TelegramNotifier;
