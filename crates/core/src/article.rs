//! Main-content extraction for arbitrary web articles.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::{
    error::Result,
    markup::{HtmlTree, MarkupTree},
    types::{ContentRecord, SourceMetadata},
};

/// Some servers reject default client identities.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const PAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Lines at or below this length are treated as navigation/UI noise.
const MIN_LINE_CHARS: usize = 20;
/// Extracted text at or below this length counts as a failed extraction.
const MIN_ARTICLE_CHARS: usize = 100;
const CHROME_TAGS: [&str; 5] = ["script", "style", "nav", "footer", "header"];
const SEMANTIC_TAGS: [&str; 2] = ["article", "main"];
const CONTENT_ATTRIBUTES: [(&str, &str); 5] = [
    ("class", "content"),
    ("class", "post"),
    ("class", "article"),
    ("id", "content"),
    ("id", "main"),
];
const UNTITLED: &str = "Untitled";
const UNKNOWN_AUTHOR: &str = "Unknown";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("server answered {status} for {url}")]
    Status { status: u16, url: String },
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<String, FetchError>;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn get(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

pub struct ArticleExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl ArticleExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch `url` and isolate its main text, or `None` when nothing usable comes back.
    pub async fn extract(&self, url: &str) -> Option<ContentRecord> {
        info!(url, "fetching article");
        let html = match self.fetcher.get(url).await {
            Ok(html) => html,
            Err(err) => {
                error!(url, error = %err, "article fetch failed");
                return None;
            }
        };
        extract_from_html(&html, url)
    }
}

type Strategy<T> = (
    &'static str,
    for<'a> fn(&'a T) -> Option<<T as MarkupTree>::Node<'a>>,
);

/// First strategy to return a node wins.
fn strategies<T: MarkupTree + 'static>() -> [Strategy<T>; 4] {
    [
        ("semantic container", semantic_container::<T>),
        ("content attribute", content_attribute_container::<T>),
        ("paragraph density", densest_paragraph_container::<T>),
        ("document body", document_body::<T>),
    ]
}

fn semantic_container<T: MarkupTree>(tree: &T) -> Option<T::Node<'_>> {
    SEMANTIC_TAGS.iter().find_map(|tag| tree.first_by_tag(tag))
}

fn content_attribute_container<T: MarkupTree>(tree: &T) -> Option<T::Node<'_>> {
    CONTENT_ATTRIBUTES.iter().find_map(|(attr, needle)| {
        tree.first_by_attr("div", attr, &|value: &str| {
            value.to_lowercase().contains(*needle)
        })
    })
}

/// The div with the most nested paragraphs; ties keep the earliest.
fn densest_paragraph_container<T: MarkupTree>(tree: &T) -> Option<T::Node<'_>> {
    let mut best = None;
    let mut best_count = 0;
    for div in tree.all_by_tag("div") {
        let count = tree.count_descendants(div, "p");
        if count > best_count {
            best_count = count;
            best = Some(div);
        }
    }
    best
}

fn document_body<T: MarkupTree>(tree: &T) -> Option<T::Node<'_>> {
    tree.first_by_tag("body")
}

/// Pure extraction step, split from the fetch so it can run on any markup.
pub fn extract_from_html(html: &str, url: &str) -> Option<ContentRecord> {
    let mut tree = HtmlTree::parse(html);
    tree.remove_elements(&CHROME_TAGS);

    let title = tree
        .title()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string());

    let text = main_text(&tree)?;
    let chars = text.chars().count();
    if chars <= MIN_ARTICLE_CHARS {
        warn!(url, chars, "extracted article text too short");
        return None;
    }

    info!(url, title = %title, chars, "article extracted");
    Some(ContentRecord::new(
        text,
        SourceMetadata::Article {
            url: url.to_string(),
            title,
            author: UNKNOWN_AUTHOR.to_string(),
        },
    ))
}

fn main_text<T: MarkupTree + 'static>(tree: &T) -> Option<String> {
    let (label, node) = strategies::<T>()
        .into_iter()
        .find_map(|(label, strategy)| strategy(tree).map(|node| (label, node)))?;
    debug!(strategy = label, "main content container chosen");

    let raw = tree.text(node);
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .collect();
    Some(lines.join("\n\n"))
}
