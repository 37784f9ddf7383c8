use tracing::{info, warn};

use crate::types::{ContentRecord, MIN_SUMMARIZABLE_CHARS, SourceMetadata};

/// Trim free-form input and reject anything too short to summarize.
pub fn normalize(text: &str) -> Option<ContentRecord> {
    let text = text.trim();
    if text.is_empty() {
        warn!("empty text provided");
        return None;
    }

    let char_count = text.chars().count();
    if char_count < MIN_SUMMARIZABLE_CHARS {
        warn!(chars = char_count, min = MIN_SUMMARIZABLE_CHARS, "text too short");
        return None;
    }

    let word_count = text.split_whitespace().count();
    info!(chars = char_count, words = word_count, "text input normalized");
    Some(ContentRecord::new(
        text.to_string(),
        SourceMetadata::FreeText {
            word_count,
            char_count,
        },
    ))
}
