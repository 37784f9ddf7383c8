//! Structured, language-targeted summaries from a generative backend.

use std::{borrow::Cow, sync::Arc};

use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::{
    error::Result,
    provider::{CompletionBackend, CompletionRequest},
    types::SummaryResult,
};

/// Hard context budget, applied before every submission.
pub const MAX_INPUT_CHARS: usize = 12_000;
pub const TRUNCATION_MARKER: &str = "...";
pub const TEMPERATURE: f32 = 0.7;
pub const MAX_OUTPUT_TOKENS: u32 = 1500;
pub const DEFAULT_LANGUAGE: &str = "English";

static SYSTEM_PROMPT: &str =
    "You are an expert at analyzing and summarizing content. Provide clear, actionable summaries.";

pub struct Summarizer {
    backend: Arc<dyn CompletionBackend>,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Summarize `text` in `target_language`. Backend failures propagate;
    /// unparseable output degrades to a raw-text summary.
    pub async fn summarize(
        &self,
        text: &str,
        content_id: &str,
        target_language: &str,
        content_kind: &str,
    ) -> Result<SummaryResult> {
        let content = truncate(text);
        if matches!(content, Cow::Owned(_)) {
            warn!(content_id, max_chars = MAX_INPUT_CHARS, "content truncated");
        }

        let request = build_request(&content, target_language, content_kind);
        let raw = self.backend.complete(&request).await.inspect_err(|err| {
            error!(content_id, error = %err, "summarization backend failed");
        })?;

        let mut summary = parse_summary(&raw, content_id);
        summary.language = target_language.to_string();
        info!(
            content_id,
            language = target_language,
            topics = summary.key_topics.len(),
            "summary generated"
        );
        Ok(summary)
    }
}

/// Cut to [`MAX_INPUT_CHARS`] characters plus marker; shorter input is untouched.
pub fn truncate(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_INPUT_CHARS) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER).into(),
        None => text.into(),
    }
}

fn is_default_language(language: &str) -> bool {
    language.eq_ignore_ascii_case(DEFAULT_LANGUAGE)
}

pub fn build_request(
    content: &str,
    target_language: &str,
    content_kind: &str,
) -> CompletionRequest {
    let mut system = SYSTEM_PROMPT.to_string();
    let mut language_instruction = String::new();
    if !is_default_language(target_language) {
        system.push_str(&format!(" Respond ONLY in {target_language}."));
        language_instruction = format!(
            "\n\nIMPORTANT: Provide the ENTIRE response in {lang}. All sections must be in {lang}.",
            lang = target_language
        );
    }

    let user = format!(
        r#"Analyze the following {content_kind} content and provide a structured summary:

Content:
{content}

Please provide:
1. Executive Summary (2-3 sentences)
2. Key Topics (bullet points)
3. Main Takeaways (3-5 points)
4. Action Items (if any){language_instruction}

Format the response as a single JSON object with keys: executive_summary (string), key_topics (array of strings), main_takeaways (array of strings), action_items (array of strings)"#
    );

    CompletionRequest {
        system,
        user,
        temperature: TEMPERATURE,
        max_tokens: MAX_OUTPUT_TOKENS,
    }
}

/// Any JSON object is accepted. Missing, null or mistyped fields read as empty;
/// `language` is never read from the answer.
fn parse_summary(raw: &str, content_id: &str) -> SummaryResult {
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => fields,
        Ok(_) => {
            warn!(content_id, "backend answer is not a JSON object, degrading");
            return SummaryResult::degraded(raw);
        }
        Err(err) => {
            warn!(content_id, error = %err, "backend answer is not JSON, degrading");
            return SummaryResult::degraded(raw);
        }
    };

    SummaryResult {
        executive_summary: text_field(&value, "executive_summary"),
        key_topics: list_field(&value, "key_topics"),
        main_takeaways: list_field(&value, "main_takeaways"),
        action_items: list_field(&value, "action_items"),
        language: String::new(),
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(text)) => text.clone(),
        _ => String::new(),
    }
}

fn list_field(fields: &Map<String, Value>, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(item)) if !item.is_empty() => vec![item.clone()],
        _ => Vec::new(),
    }
}
