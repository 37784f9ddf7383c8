//! Request flows: acquire content, summarize it, optionally persist the result.
//!
//! Every collaborator is handed in at construction, so tests can swap any of
//! them for an in-memory double.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    article::{ArticleExtractor, HttpPageFetcher, PageFetcher},
    captions::{CaptionProvider, CaptionResolver, YoutubeCaptions},
    config::Settings,
    document::{DocumentExtractor, DocumentParser, PdfParser},
    error::{RecapError, Result},
    provider::{ChatCompletionsBackend, CompletionBackend},
    source::{VideoId, identify},
    store::{FileSummaryStore, SummaryStore},
    summarize::{DEFAULT_LANGUAGE, Summarizer},
    text,
    types::{ContentRecord, SourceKind, SummaryRecord},
};

pub const ANONYMOUS_OWNER: &str = "anonymous";

/// Who is asking and which language the summary should be in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    pub language: String,
    pub owner_id: String,
}

impl Default for SummaryRequest {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            owner_id: ANONYMOUS_OWNER.to_string(),
        }
    }
}

impl SummaryRequest {
    /// Blank values fall back to the defaults.
    pub fn new(language: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let language = language.into();
        let owner_id = owner_id.into();
        let defaults = Self::default();
        Self {
            language: if language.trim().is_empty() {
                defaults.language
            } else {
                language.trim().to_string()
            },
            owner_id: if owner_id.trim().is_empty() {
                defaults.owner_id
            } else {
                owner_id.trim().to_string()
            },
        }
    }
}

pub struct Recap {
    captions: CaptionResolver,
    articles: ArticleExtractor,
    documents: Arc<DocumentExtractor>,
    summarizer: Summarizer,
    store: Option<Arc<dyn SummaryStore>>,
}

impl Recap {
    pub fn new(
        captions: Arc<dyn CaptionProvider>,
        pages: Arc<dyn PageFetcher>,
        documents: Arc<dyn DocumentParser>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        Self {
            captions: CaptionResolver::new(captions),
            articles: ArticleExtractor::new(pages),
            documents: Arc::new(DocumentExtractor::new(documents)),
            summarizer: Summarizer::new(backend),
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SummaryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Production wiring: YouTube captions, HTTP pages, lopdf, the configured
    /// provider and a file store. Fails when the provider's API key is missing.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backend = ChatCompletionsBackend::new(
            reqwest::Client::new(),
            settings.provider.clone(),
            settings.model.clone(),
        )?;
        info!(
            provider = backend.provider().name(),
            model = backend.model(),
            "summarization backend ready"
        );

        let pages = HttpPageFetcher::new(settings.fetch_timeout, &settings.user_agent)?;
        let store = FileSummaryStore::new(settings.store_dir_or_default());
        info!(path = %store.root().display(), "using summary store");

        Ok(Self::new(
            Arc::new(YoutubeCaptions::new(reqwest::Client::new())),
            Arc::new(pages),
            Arc::new(PdfParser),
            Arc::new(backend),
        )
        .with_store(Arc::new(store)))
    }

    pub async fn summarize_video(
        &self,
        url: &str,
        request: &SummaryRequest,
    ) -> Result<SummaryRecord> {
        let video_id =
            identify(url).ok_or_else(|| RecapError::invalid_input("invalid video URL"))?;
        info!(video_id = %video_id, owner = %request.owner_id, "video summary requested");

        if let Some(cached) = self.lookup(video_id.as_str(), request).await {
            info!(video_id = %video_id, "returning stored summary");
            return Ok(cached);
        }

        let content = self.resolve_captions(&video_id).await?;
        self.finish(video_id.to_string(), video_id.as_str(), content, request).await
    }

    pub async fn summarize_article(
        &self,
        url: &str,
        request: &SummaryRequest,
    ) -> Result<SummaryRecord> {
        let url = url.trim();
        if url.is_empty() {
            return Err(RecapError::invalid_input("article URL is empty"));
        }

        let content = self
            .articles
            .extract(url)
            .await
            .ok_or_else(|| RecapError::not_found("could not extract article content"))?;
        self.finish(url.to_string(), url, content, request).await
    }

    pub async fn summarize_text(
        &self,
        input: &str,
        request: &SummaryRequest,
    ) -> Result<SummaryRecord> {
        let content =
            text::normalize(input).ok_or_else(|| RecapError::invalid_input("text is too short"))?;
        let content_id = format!("text_{}", request.owner_id);
        self.finish(Uuid::new_v4().to_string(), &content_id, content, request).await
    }

    pub async fn summarize_document(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        request: &SummaryRequest,
    ) -> Result<SummaryRecord> {
        if bytes.is_empty() {
            return Err(RecapError::invalid_input("document is empty"));
        }

        let extractor = Arc::clone(&self.documents);
        let name = filename.to_string();
        let content = tokio::task::spawn_blocking(move || extractor.extract(&bytes, &name))
            .await?
            .ok_or_else(|| RecapError::not_found("could not extract text from document"))?;
        self.finish(filename.to_string(), filename, content, request).await
    }

    pub async fn summarize_document_base64(
        &self,
        payload: &str,
        filename: &str,
        request: &SummaryRequest,
    ) -> Result<SummaryRecord> {
        let bytes = STANDARD.decode(payload.trim()).map_err(|e| {
            RecapError::invalid_input(format!("document payload is not base64: {e}"))
        })?;
        self.summarize_document(bytes, filename, request).await
    }

    /// Resolve captions without summarizing them.
    pub async fn preview_captions(&self, url: &str) -> Result<ContentRecord> {
        let video_id =
            identify(url).ok_or_else(|| RecapError::invalid_input("invalid video URL"))?;
        self.resolve_captions(&video_id).await
    }

    /// Newest first. Empty when there is no store or it cannot be read.
    pub async fn history(&self, owner_id: &str, limit: usize) -> Vec<SummaryRecord> {
        let Some(store) = &self.store else {
            return Vec::new();
        };
        match store.list_by_owner(owner_id, limit).await {
            Ok(records) => records,
            Err(e) => {
                warn!(owner = owner_id, error = %e, "could not read summary history");
                Vec::new()
            }
        }
    }

    async fn resolve_captions(&self, video_id: &VideoId) -> Result<ContentRecord> {
        self.captions
            .fetch_track(video_id)
            .await
            .ok_or_else(|| RecapError::not_found("could not fetch captions"))
    }

    async fn lookup(&self, id: &str, request: &SummaryRequest) -> Option<SummaryRecord> {
        let store = self.store.as_ref()?;
        match store.get(id, &request.owner_id).await {
            Ok(Some(record))
                if record.content.source_kind() == SourceKind::Caption
                    && record.language().eq_ignore_ascii_case(&request.language) =>
            {
                Some(record)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(id, error = %e, "summary lookup failed, continuing without it");
                None
            }
        }
    }

    async fn finish(
        &self,
        id: String,
        content_id: &str,
        content: ContentRecord,
        request: &SummaryRequest,
    ) -> Result<SummaryRecord> {
        if !content.is_summarizable() {
            return Err(RecapError::not_found(format!(
                "only {} characters of content found",
                content.char_count()
            )));
        }

        let summary = self
            .summarizer
            .summarize(
                content.text(),
                content_id,
                &request.language,
                content.source_kind().content_kind(),
            )
            .await?;

        let record = SummaryRecord {
            id,
            owner_id: request.owner_id.clone(),
            created_at: Utc::now(),
            content,
            summary,
        };
        self.save(&record).await;
        Ok(record)
    }

    async fn save(&self, record: &SummaryRecord) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.put(record).await {
            warn!(id = %record.id, error = %e, "could not store summary");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_request_fields_fall_back_to_defaults() {
        let request = SummaryRequest::new(" ", "");
        assert_eq!(request, SummaryRequest::default());
        assert_eq!(request.language, "English");
        assert_eq!(request.owner_id, "anonymous");

        let request = SummaryRequest::new(" French ", "alice");
        assert_eq!(request.language, "French");
        assert_eq!(request.owner_id, "alice");
    }
}
