//! `carebot-core`: configuration, errors and the capability traits shared by
//! the scheduler, the job handlers and the channel adapters.

pub mod budget;
pub mod config;
pub mod error;
pub mod notifier;

pub use budget::{BudgetItem, BudgetRecord, BudgetSource, DocumentGenerator};
pub use config::CarebotConfig;
pub use error::{CarebotError, Result};
pub use notifier::{Attachment, Notifier, Recipient};
