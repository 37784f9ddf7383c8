//! Optional persistence of finished summaries, keyed by content id and owner.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::{error::Result, types::SummaryRecord};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn get(&self, id: &str, owner_id: &str) -> Result<Option<SummaryRecord>>;

    /// Insert or replace the record for `(record.id, record.owner_id)`.
    async fn put(&self, record: &SummaryRecord) -> Result<()>;

    /// Newest first.
    async fn list_by_owner(&self, owner_id: &str, limit: usize) -> Result<Vec<SummaryRecord>>;
}

/// Default location for the file store.
pub fn default_store_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("recap")
        .join("summaries")
}

fn digest(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// One JSON file per record under `<root>/<sha256(owner)>/<sha256(id)>.json`.
pub struct FileSummaryStore {
    root: PathBuf,
}

impl FileSummaryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owner_dir(&self, owner_id: &str) -> PathBuf {
        self.root.join(digest(owner_id))
    }

    fn record_path(&self, id: &str, owner_id: &str) -> PathBuf {
        self.owner_dir(owner_id).join(format!("{}.json", digest(id)))
    }
}

#[async_trait]
impl SummaryStore for FileSummaryStore {
    async fn get(&self, id: &str, owner_id: &str) -> Result<Option<SummaryRecord>> {
        let path = self.record_path(id, owner_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn put(&self, record: &SummaryRecord) -> Result<()> {
        let dir = self.owner_dir(&record.owner_id);
        fs::create_dir_all(&dir).await?;

        let path = self.record_path(&record.id, &record.owner_id);
        let tmp = path.with_extension("json.tmp");
        let pretty_json = serde_json::to_string_pretty(record)?;
        fs::write(&tmp, &pretty_json).await?;
        fs::rename(&tmp, &path).await?;
        debug!(id = %record.id, path = %path.display(), "summary stored");
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str, limit: usize) -> Result<Vec<SummaryRecord>> {
        let dir = self.owner_dir(owner_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable record");
                    continue;
                }
            };
            match serde_json::from_str::<SummaryRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable record"),
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::{text::normalize, types::SummaryResult};

    const TEXT: &str = "Plenty of words to get past the minimum length. ";

    fn record(id: &str, owner: &str, minutes_ago: i64) -> SummaryRecord {
        SummaryRecord {
            id: id.to_string(),
            owner_id: owner.to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            content: normalize(&TEXT.repeat(2)).unwrap(),
            summary: SummaryResult {
                executive_summary: format!("summary of {id}"),
                language: "English".to_string(),
                ..SummaryResult::default()
            },
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips_per_owner() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path());
        let rec = record("https://youtu.be/x", "alice", 0);

        store.put(&rec).await.unwrap();

        assert_eq!(store.get("https://youtu.be/x", "alice").await.unwrap(), Some(rec));
        assert_eq!(store.get("https://youtu.be/x", "bob").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_replaces_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path());
        store.put(&record("a", "alice", 5)).await.unwrap();
        let mut newer = record("a", "alice", 0);
        newer.summary.executive_summary = "updated".to_string();
        store.put(&newer).await.unwrap();

        let listed = store.list_by_owner("alice", 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].summary.executive_summary, "updated");
    }

    #[tokio::test]
    async fn history_is_newest_first_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path());
        for (id, age) in [("old", 30), ("new", 1), ("mid", 10)] {
            store.put(&record(id, "alice", age)).await.unwrap();
        }
        store.put(&record("other", "bob", 0)).await.unwrap();

        let ids: Vec<_> = store
            .list_by_owner("alice", 2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["new", "mid"]);
    }

    #[tokio::test]
    async fn unreadable_entries_are_skipped_in_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path());
        store.put(&record("good", "alice", 0)).await.unwrap();

        let owner_dir = dir.path().join(digest("alice"));
        std::fs::create_dir(owner_dir.join("not-a-file.json")).unwrap();
        std::fs::write(owner_dir.join("garbage.json"), "{ not json").unwrap();

        let ids: Vec<_> = store
            .list_by_owner("alice", 20)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["good"]);
    }

    #[tokio::test]
    async fn unknown_owner_has_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSummaryStore::new(dir.path().join("missing"));
        assert!(store.list_by_owner("nobody", 20).await.unwrap().is_empty());
    }
}
