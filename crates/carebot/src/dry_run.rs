use async_trait::async_trait;
use tracing::info;

use carebot_core::{Attachment, Notifier, Recipient, Result};

/// Prints messages to stdout instead of sending them.
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(
        &self,
        recipient: Recipient,
        text: &str,
        attachment: Option<&Attachment>,
    ) -> Result<()> {
        info!(chat_id = recipient.0, "dry run: message not sent");
        println!("--- to {recipient} ---");
        if let Some(file) = attachment {
            println!("[attachment: {} ({} bytes)]", file.file_name, file.bytes.len());
        }
        println!("{text}");
        Ok(())
    }
}
