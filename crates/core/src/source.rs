use std::fmt;

use serde::{Deserialize, Serialize};

const VIDEO_ID_LEN: usize = 11;

/// Canonical 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

type Matcher = fn(&str) -> Option<&str>;

/// Tried in order; the first matcher that yields an id wins.
const MATCHERS: [Matcher; 4] = [watch_url, short_link, embed_url, watch_query];

/// Parse a video reference (watch URL, short link or embed URL) into its id.
pub fn identify(reference: &str) -> Option<VideoId> {
    MATCHERS
        .iter()
        .find_map(|matcher| matcher(reference))
        .map(|id| VideoId(id.to_string()))
}

fn watch_url(reference: &str) -> Option<&str> {
    id_after(reference, "youtube.com/watch?v=")
}

fn short_link(reference: &str) -> Option<&str> {
    id_after(reference, "youtu.be/")
}

fn embed_url(reference: &str) -> Option<&str> {
    id_after(reference, "youtube.com/embed/")
}

/// `v` appearing anywhere in the watch query, e.g. `watch?feature=share&v=...`.
fn watch_query(reference: &str) -> Option<&str> {
    let marker = "youtube.com/watch?";
    let start = reference.find(marker)? + marker.len();
    let query = reference[start..].split('#').next().unwrap_or_default();
    query
        .split('&')
        .filter_map(|pair| pair.strip_prefix("v="))
        .find_map(leading_id)
}

fn id_after<'a>(reference: &'a str, prefix: &str) -> Option<&'a str> {
    reference
        .match_indices(prefix)
        .find_map(|(idx, _)| leading_id(&reference[idx + prefix.len()..]))
}

fn leading_id(candidate: &str) -> Option<&str> {
    let id = candidate.get(..VIDEO_ID_LEN)?;
    id.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        .then_some(id)
}
