//! Content acquisition and AI summaries.
//!
//! Four sources (video captions, web articles, PDF documents, free text) are
//! reduced to one [`ContentRecord`] shape and summarized by an OpenAI-compatible
//! backend into a [`SummaryResult`] in the caller's language. [`Recap`] wires
//! the pieces together.

pub mod article;
pub mod captions;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod markup;
pub mod pipeline;
pub mod provider;
pub mod source;
pub mod store;
pub mod summarize;
pub mod text;
pub mod types;

pub use config::Settings;
pub use error::{RecapError, Result};
pub use format::{format_summary_readable, format_timestamp};
pub use pipeline::{Recap, SummaryRequest};
pub use provider::{Provider, ProviderConfig};
pub use source::{VideoId, identify};
pub use store::{FileSummaryStore, SummaryStore, default_store_dir};
pub use types::{
    CaptionSegment, CaptionTrackMetadata, ContentRecord, SourceKind, SourceMetadata,
    SummaryRecord, SummaryResult,
};
