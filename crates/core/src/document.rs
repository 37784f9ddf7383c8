//! Page-by-page text extraction for PDF uploads.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::types::{ContentRecord, SourceMetadata};

/// Below this, the document is treated as having no readable text (scans, images).
const MIN_DOCUMENT_CHARS: usize = 50;
const PAGE_SEPARATOR: &str = "\n\n";

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document could not be parsed: {reason}")]
    Unreadable { reason: String },

    #[error("page {page} has no extractable text: {reason}")]
    Page { page: usize, reason: String },
}

pub trait PagedDocument {
    fn page_count(&self) -> usize;

    /// Text of the zero-based page `index`.
    fn page_text(&self, index: usize) -> Result<String, DocumentError>;
}

pub trait DocumentParser: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn PagedDocument>, DocumentError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfParser;

struct PdfDocument {
    doc: lopdf::Document,
    page_numbers: Vec<u32>,
}

impl DocumentParser for PdfParser {
    fn parse(&self, bytes: &[u8]) -> Result<Box<dyn PagedDocument>, DocumentError> {
        let doc = lopdf::Document::load_mem(bytes).map_err(|e| DocumentError::Unreadable {
            reason: e.to_string(),
        })?;
        let page_numbers = doc.get_pages().keys().copied().collect();
        Ok(Box::new(PdfDocument { doc, page_numbers }))
    }
}

impl PagedDocument for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_numbers.len()
    }

    fn page_text(&self, index: usize) -> Result<String, DocumentError> {
        let page = *self
            .page_numbers
            .get(index)
            .ok_or_else(|| DocumentError::Page {
                page: index + 1,
                reason: "no such page".to_string(),
            })?;
        self.doc
            .extract_text(&[page])
            .map_err(|e| DocumentError::Page {
                page: index + 1,
                reason: e.to_string(),
            })
    }
}

pub struct DocumentExtractor {
    parser: Arc<dyn DocumentParser>,
}

impl DocumentExtractor {
    pub fn new(parser: Arc<dyn DocumentParser>) -> Self {
        Self { parser }
    }

    /// Extract and join readable pages. CPU bound; async callers should use the blocking pool.
    pub fn extract(&self, bytes: &[u8], filename: &str) -> Option<ContentRecord> {
        info!(filename, bytes = bytes.len(), "extracting document text");
        let doc = match self.parser.parse(bytes) {
            Ok(doc) => doc,
            Err(err) => {
                error!(filename, error = %err, "document rejected");
                return None;
            }
        };

        let pages = doc.page_count();
        if pages == 0 {
            error!(filename, "document has no pages");
            return None;
        }

        let mut texts = Vec::with_capacity(pages);
        for index in 0..pages {
            match doc.page_text(index) {
                Ok(text) if !text.trim().is_empty() => texts.push(text),
                Ok(_) => {}
                Err(err) => warn!(filename, error = %err, "skipping page"),
            }
        }

        let text = texts.join(PAGE_SEPARATOR);
        let chars = text.chars().count();
        if chars < MIN_DOCUMENT_CHARS {
            error!(filename, chars, "document has too little readable text");
            return None;
        }

        info!(filename, chars, pages, "document text extracted");
        Some(ContentRecord::new(
            text,
            SourceMetadata::Document {
                filename: filename.to_string(),
                pages,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeDocument {
        pages: Vec<Result<String, String>>,
    }

    impl PagedDocument for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text(&self, index: usize) -> Result<String, DocumentError> {
            self.pages[index].clone().map_err(|reason| DocumentError::Page {
                page: index + 1,
                reason,
            })
        }
    }

    struct FakeParser(Vec<Result<String, String>>);

    impl DocumentParser for FakeParser {
        fn parse(&self, _bytes: &[u8]) -> Result<Box<dyn PagedDocument>, DocumentError> {
            Ok(Box::new(FakeDocument {
                pages: self.0.clone(),
            }))
        }
    }

    fn extractor(pages: Vec<Result<String, String>>) -> DocumentExtractor {
        DocumentExtractor::new(Arc::new(FakeParser(pages)))
    }

    const PAGE: &str = "Quarterly revenue grew across every region we operate in.";

    #[test]
    fn failing_page_is_skipped() {
        let record = extractor(vec![
            Ok(PAGE.to_string()),
            Err("broken content stream".to_string()),
            Ok(format!("{PAGE} Again.")),
        ])
        .extract(b"%PDF", "report.pdf")
        .unwrap();

        assert_eq!(record.text(), format!("{PAGE}\n\n{PAGE} Again."));
        match record.metadata() {
            SourceMetadata::Document { filename, pages } => {
                assert_eq!(filename, "report.pdf");
                assert_eq!(*pages, 3);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn zero_pages_is_rejected() {
        let empty = extractor(Vec::new());
        assert!(empty.extract(b"%PDF", "empty.pdf").is_none());
    }

    #[test]
    fn too_little_text_is_rejected() {
        let pages = vec![Ok("Scanned page 1".to_string()), Ok("   ".to_string())];
        assert!(extractor(pages).extract(b"%PDF", "scan.pdf").is_none());
    }

    #[test]
    fn garbage_bytes_are_rejected_by_the_pdf_parser() {
        let extractor = DocumentExtractor::new(Arc::new(PdfParser));
        assert!(extractor.extract(b"definitely not a pdf", "x.pdf").is_none());
    }
}
