//! Journal entry persistence.
//!
//! A journal directory holds one JSON record per entry under `entries/` and
//! the attached photo under `photos/`, both named after the entry's unique id.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{ExportError, ExportResult};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub unique_id: String,
    /// Wall-clock creation time in `time_zone`.
    pub creation_date: NaiveDateTime,
    #[serde(default)]
    pub starred: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub time_zone: String,
    #[serde(default)]
    pub text: String,
    /// Photo bytes. Not part of the record; `list` leaves it empty.
    #[serde(skip)]
    pub photo: Option<Vec<u8>>,
}

impl JournalEntry {
    /// Day key (`YYYYMMDD`) of the creation date.
    pub fn day_key(&self) -> String {
        self.creation_date.format("%Y%m%d").to_string()
    }
}

/// Entries must carry every listed tag.
#[derive(Clone, Debug, Default)]
pub struct EntryFilter {
    pub tags: BTreeSet<String>,
}

impl EntryFilter {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            tags: BTreeSet::from([tag.into()]),
        }
    }

    pub fn matches(&self, entry: &JournalEntry) -> bool {
        self.tags.is_subset(&entry.tags)
    }
}

#[async_trait]
pub trait JournalStore: Send + Sync {
    async fn list(&self, filter: &EntryFilter) -> ExportResult<Vec<JournalEntry>>;

    /// Write the entry and its photo. Either both land or neither does.
    async fn save(&self, entry: &JournalEntry) -> ExportResult<()>;
}

#[derive(Clone, Debug)]
pub struct DirectoryJournalStore {
    root: PathBuf,
}

impl DirectoryJournalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entry_path(&self, unique_id: &str) -> PathBuf {
        self.root.join("entries").join(format!("{unique_id}.json"))
    }

    pub fn photo_path(&self, unique_id: &str) -> PathBuf {
        self.root.join("photos").join(format!("{unique_id}.jpg"))
    }
}

fn list_blocking(root: &Path, filter: &EntryFilter) -> ExportResult<Vec<JournalEntry>> {
    let dir = root.join("entries");
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for item in std::fs::read_dir(&dir)? {
        let path = item?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let parsed = std::fs::read(&path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                serde_json::from_slice::<JournalEntry>(&bytes).map_err(|e| e.to_string())
            });
        match parsed {
            Ok(entry) if filter.matches(&entry) => entries.push(entry),
            Ok(_) => {}
            Err(e) => tracing::warn!("skipping malformed journal entry {:?}: {}", path, e),
        }
    }
    Ok(entries)
}

fn save_blocking(entry_path: &Path, photo_path: &Path, entry: &JournalEntry) -> ExportResult<()> {
    let staged_entry = stage(entry_path, serde_json::to_string_pretty(entry)?.as_bytes())?;
    let staged_photo = match &entry.photo {
        Some(bytes) => Some(stage(photo_path, bytes)?),
        None => None,
    };

    // The entry record is the commit point, so the photo goes first.
    if let Some(photo) = staged_photo {
        photo
            .persist(photo_path)
            .map_err(|e| ExportError::PersistFailed(e.error.to_string()))?;
    }
    staged_entry
        .persist(entry_path)
        .map_err(|e| ExportError::PersistFailed(e.error.to_string()))?;
    Ok(())
}

/// Write `bytes` to a synced temp file next to `target`. Dropping it unpersisted deletes it.
fn stage(target: &Path, bytes: &[u8]) -> ExportResult<NamedTempFile> {
    let parent = target
        .parent()
        .ok_or_else(|| ExportError::PersistFailed(format!("{target:?} has no parent")))?;
    std::fs::create_dir_all(parent)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    Ok(temp)
}

#[async_trait]
impl JournalStore for DirectoryJournalStore {
    async fn list(&self, filter: &EntryFilter) -> ExportResult<Vec<JournalEntry>> {
        let root = self.root.clone();
        let filter = filter.clone();
        tokio::task::spawn_blocking(move || list_blocking(&root, &filter))
            .await
            .map_err(|e| ExportError::PersistFailed(e.to_string()))?
    }

    async fn save(&self, entry: &JournalEntry) -> ExportResult<()> {
        let entry_path = self.entry_path(&entry.unique_id);
        let photo_path = self.photo_path(&entry.unique_id);
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || save_blocking(&entry_path, &photo_path, &entry))
            .await
            .map_err(|e| ExportError::PersistFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(id: &str, day: u32, tag: &str) -> JournalEntry {
        JournalEntry {
            unique_id: id.into(),
            creation_date: NaiveDate::from_ymd_opt(2014, 3, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            starred: false,
            tags: BTreeSet::from([tag.to_string()]),
            time_zone: "Europe/Berlin".into(),
            text: format!("day {day}"),
            photo: Some(vec![0xff, 0xd8, day as u8]),
        }
    }

    #[tokio::test]
    async fn save_then_list_by_tag() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryJournalStore::new(dir.path());
        store.save(&entry("A", 5, "moves-import")).await.unwrap();
        store.save(&entry("B", 6, "holiday")).await.unwrap();

        let listed = store
            .list(&EntryFilter::tagged("moves-import"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].unique_id, "A");
        assert_eq!(listed[0].day_key(), "20140305");
        assert!(listed[0].photo.is_none());

        let photo = std::fs::read(store.photo_path("A")).unwrap();
        assert_eq!(photo, vec![0xff, 0xd8, 5]);
    }

    #[tokio::test]
    async fn save_overwrites_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryJournalStore::new(dir.path());
        store.save(&entry("A", 5, "t")).await.unwrap();
        let mut updated = entry("A", 5, "t");
        updated.text = "rewritten".into();
        store.save(&updated).await.unwrap();

        let listed = store.list(&EntryFilter::tagged("t")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].text, "rewritten");
    }

    #[tokio::test]
    async fn list_skips_malformed_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryJournalStore::new(dir.path());
        store.save(&entry("A", 5, "t")).await.unwrap();
        std::fs::write(dir.path().join("entries").join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.path().join("entries").join("notes.txt"), "ignored").unwrap();

        let listed = store.list(&EntryFilter::tagged("t")).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn list_skips_entries_that_are_not_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryJournalStore::new(dir.path());
        store.save(&entry("A", 5, "t")).await.unwrap();
        std::fs::write(
            dir.path().join("entries").join("garbled.json"),
            [0xff, 0xfe, 0x00, 0x7b],
        )
        .unwrap();
        // a directory with a .json name cannot be read as a file
        std::fs::create_dir(dir.path().join("entries").join("folder.json")).unwrap();

        let listed = store.list(&EntryFilter::tagged("t")).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].unique_id, "A");
    }

    #[tokio::test]
    async fn list_on_empty_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryJournalStore::new(dir.path());
        assert!(store.list(&EntryFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_save_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // a file where the photos directory should be makes staging the photo fail
        std::fs::write(dir.path().join("photos"), "not a directory").unwrap();
        let store = DirectoryJournalStore::new(dir.path());

        let err = store.save(&entry("A", 5, "t")).await.unwrap_err();
        assert!(matches!(err, ExportError::PersistFailed(_)));
        assert!(!store.entry_path("A").exists());
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("entries"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }
}
