use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of characters a payload needs before it is worth summarizing.
pub const MIN_SUMMARIZABLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Caption,
    Article,
    Document,
    FreeText,
}

impl SourceKind {
    /// Content kind label handed to the summarizer prompt.
    pub fn content_kind(&self) -> &'static str {
        match self {
            SourceKind::Caption => "video",
            SourceKind::Article => "article",
            SourceKind::Document => "pdf",
            SourceKind::FreeText => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub start_offset_seconds: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrackMetadata {
    pub total_duration_seconds: f64,
    pub segment_count: usize,
}

/// Per-source details that travel alongside the canonical text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_kind", rename_all = "snake_case")]
pub enum SourceMetadata {
    Caption {
        video_id: String,
        language_code: String,
        translated: bool,
        track: CaptionTrackMetadata,
        segments: Vec<CaptionSegment>,
    },
    Article {
        url: String,
        title: String,
        author: String,
    },
    Document {
        filename: String,
        pages: usize,
    },
    FreeText {
        word_count: usize,
        char_count: usize,
    },
}

/// Canonical text payload produced by exactly one acquisition path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    text: String,
    metadata: SourceMetadata,
}

impl ContentRecord {
    pub(crate) fn new(text: String, metadata: SourceMetadata) -> Self {
        Self { text, metadata }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    pub fn source_kind(&self) -> SourceKind {
        match self.metadata {
            SourceMetadata::Caption { .. } => SourceKind::Caption,
            SourceMetadata::Article { .. } => SourceKind::Article,
            SourceMetadata::Document { .. } => SourceKind::Document,
            SourceMetadata::FreeText { .. } => SourceKind::FreeText,
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_summarizable(&self) -> bool {
        self.char_count() >= MIN_SUMMARIZABLE_CHARS
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryResult {
    #[serde(default)]
    pub executive_summary: String,
    #[serde(default)]
    pub key_topics: Vec<String>,
    #[serde(default)]
    pub main_takeaways: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub language: String,
}

impl SummaryResult {
    /// Shape-preserving result for backend output that isn't the expected JSON.
    pub fn degraded(raw: &str) -> Self {
        Self {
            executive_summary: raw.to_string(),
            ..Self::default()
        }
    }
}

/// One finished request: what was read and what the model made of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub content: ContentRecord,
    pub summary: SummaryResult,
}

impl SummaryRecord {
    pub fn language(&self) -> &str {
        &self.summary.language
    }
}
