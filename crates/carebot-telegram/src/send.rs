//! Message splitting for the Telegram Bot API.
//!
//! Telegram's message limit is 4096 characters. We use 4090 for safety.
//! Document captions are limited to 1024 characters.

/// Maximum characters per Telegram message (limit is 4096; we use 4090 for safety).
pub const CHUNK_MAX: usize = 4090;

/// Maximum characters in a document caption.
pub const CAPTION_MAX: usize = 1024;

/// One Bot API call in a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// `sendDocument` with the attachment, optionally captioned.
    Document { caption: Option<String> },
    /// `sendMessage`.
    Text(String),
}

/// Plan the calls needed to deliver `text` (and an attachment, if any).
///
/// Text that fits a caption rides on the document; longer text follows the
/// document as ordinary messages.
pub fn plan_delivery(text: &str, with_attachment: bool) -> Vec<Outgoing> {
    let text = text.trim();
    if !with_attachment {
        if text.is_empty() {
            return Vec::new();
        }
        return split_chunks(text).into_iter().map(Outgoing::Text).collect();
    }

    if text.chars().count() <= CAPTION_MAX {
        let caption = (!text.is_empty()).then(|| text.to_string());
        return vec![Outgoing::Document { caption }];
    }
    let mut calls = vec![Outgoing::Document { caption: None }];
    calls.extend(split_chunks(text).into_iter().map(Outgoing::Text));
    calls
}

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters, on line
/// boundaries where possible.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.chars().count() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        let cost = if current.is_empty() { line_len } else { 1 + line_len };

        if !current.is_empty() && current_len + cost > CHUNK_MAX {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > CHUNK_MAX {
            // A single line too long for any chunk: split it on its own.
            chunks.extend(force_split(line));
            continue;
        }
        if !current.is_empty() {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Split an over-long line on whitespace, or hard at the limit.
fn force_split(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut remaining = line;
    while remaining.chars().count() > CHUNK_MAX {
        // Byte offset of the character just past the limit.
        let limit = remaining
            .char_indices()
            .nth(CHUNK_MAX)
            .map(|(i, _)| i)
            .unwrap_or(remaining.len());
        let split_at = remaining[..limit]
            .rfind(' ')
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        out.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }
    if !remaining.is_empty() {
        out.push(remaining.to_string());
    }
    out
}
