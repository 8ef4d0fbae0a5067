//! Journal export: one entry per day with a markdown report and a map photo.
//!
//! Entries written by this exporter carry a tag. On first use the exporter
//! loads every tagged entry once and indexes it by day, so re-running an
//! export over the same days does not create duplicates.

pub mod store;
pub mod text;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveTime;
use moves_client::{Day, utils::parse_day_key};
use tokio::sync::OnceCell;

use crate::error::{ExportError, ExportResult};
use crate::exporters::map::MapExporter;
use crate::plugin::{BaseConfig, Exporter, ExporterHelp, PluginConfig};
use store::{DirectoryJournalStore, EntryFilter, JournalEntry, JournalStore};

pub const AUTO_DIRECTORY: &str = "auto";

/// Journal locations probed under the home directory when `directory = auto`, in order.
pub const JOURNAL_CANDIDATES: [&str; 2] = [
    "Library/Mobile Documents/5U8NS4GX82~com~dayoneapp~dayone/Documents/Journal_dayone/",
    "Dropbox/Applications/Day One/Journal.dayone/",
];

/// Options handed through to the composed map exporter.
const MAP_FORWARDED: [&str; 3] = ["baseUrl", "apiKey", "maxPoints"];

const HELP_OPTIONS: &[(&str, &str)] = &[
    (
        "directory",
        "Journal directory, or auto to look in iCloud and Dropbox (default: auto)",
    ),
    ("overwrite", "Replace entries already imported (default: false)"),
    ("tag", "Tag marking imported entries (default: moves-import)"),
    ("timezone", "Time zone of new entries (default: Europe/Berlin)"),
    ("baseUrl", "Static map service URL"),
    ("apiKey", "Static maps API key (optional)"),
    ("maxPoints", "Maximum number of path points (default: 30)"),
];

fn defaults() -> PluginConfig {
    PluginConfig::from_pairs([
        ("directory", serde_json::json!(AUTO_DIRECTORY)),
        ("overwrite", serde_json::json!(false)),
        ("tag", serde_json::json!("moves-import")),
        ("timezone", serde_json::json!("Europe/Berlin")),
    ])
}

fn map_options(journal: &PluginConfig) -> PluginConfig {
    let target = std::env::temp_dir().join(format!(
        "ellie-{}-%date%.jpg",
        uuid::Uuid::new_v4().simple()
    ));
    let mut options = PluginConfig::from_pairs([
        ("outputFile", serde_json::json!(target.to_string_lossy())),
        ("size", serde_json::json!("800x450")),
        ("format", serde_json::json!("jpg")),
        ("addPlaces", serde_json::json!(true)),
    ]);
    for key in MAP_FORWARDED {
        if let Some(value) = journal.get(key) {
            options.insert(key, value.clone());
        }
    }
    options
}

/// Store handle plus the day-key index of previously imported entries.
struct JournalState {
    store: Arc<dyn JournalStore>,
    index: HashMap<String, JournalEntry>,
}

pub struct JournalExporter {
    base: BaseConfig,
    map: MapExporter,
    home: Option<PathBuf>,
    store_override: Option<Arc<dyn JournalStore>>,
    state: OnceCell<JournalState>,
}

impl Default for JournalExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JournalExporter {
    pub fn new() -> Self {
        let base = BaseConfig::new(defaults());
        let map = MapExporter::with_options(&map_options(base.options()));
        Self {
            base,
            map,
            home: None,
            store_override: None,
            state: OnceCell::new(),
        }
    }

    /// Probe `directory = auto` candidates under `home` instead of the user's home.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
            ..Self::new()
        }
    }

    /// Use `store` instead of resolving a journal directory.
    pub fn with_store(store: Arc<dyn JournalStore>) -> Self {
        Self {
            store_override: Some(store),
            ..Self::new()
        }
    }

    fn tag(&self) -> String {
        self.base
            .options()
            .str("tag")
            .unwrap_or_else(|| "moves-import".into())
    }

    /// Resolve the journal directory. An explicit directory must exist; `auto`
    /// takes the first existing candidate under the home directory.
    pub fn resolve_directory(&self) -> ExportResult<PathBuf> {
        let configured = self
            .base
            .options()
            .str("directory")
            .unwrap_or_else(|| AUTO_DIRECTORY.into());

        if configured != AUTO_DIRECTORY {
            let path = PathBuf::from(&configured);
            return if path.is_dir() {
                Ok(path)
            } else {
                Err(ExportError::DirectoryNotFound(configured))
            };
        }

        let home = self
            .home
            .clone()
            .or_else(dirs::home_dir)
            .ok_or_else(|| ExportError::DirectoryNotFound("home directory unknown".into()))?;
        JOURNAL_CANDIDATES
            .iter()
            .map(|rel| home.join(rel))
            .find(|candidate| candidate.is_dir())
            .ok_or_else(|| {
                ExportError::DirectoryNotFound(format!(
                    "no journal found in {:?} or {:?}",
                    home.join(JOURNAL_CANDIDATES[0]),
                    home.join(JOURNAL_CANDIDATES[1])
                ))
            })
    }

    /// Load the index on first use. Concurrent callers wait for the same load;
    /// a failed load is retried by the next caller.
    async fn state(&self) -> ExportResult<&JournalState> {
        self.state
            .get_or_try_init(|| async {
                let store: Arc<dyn JournalStore> = match &self.store_override {
                    Some(store) => Arc::clone(store),
                    None => Arc::new(DirectoryJournalStore::new(self.resolve_directory()?)),
                };
                let index: HashMap<String, JournalEntry> = store
                    .list(&EntryFilter::tagged(self.tag()))
                    .await?
                    .into_iter()
                    .map(|entry| (entry.day_key(), entry))
                    .collect();
                tracing::debug!(entries = index.len(), "loaded journal index");
                Ok::<JournalState, ExportError>(JournalState { store, index })
            })
            .await
    }

    fn new_entry(&self, date: &str) -> ExportResult<JournalEntry> {
        let day = parse_day_key(date)
            .ok_or_else(|| ExportError::PersistFailed(format!("invalid day key {date:?}")))?;
        let options = self.base.options();
        Ok(JournalEntry {
            unique_id: format!(
                "MOVES_{}",
                uuid::Uuid::new_v4().simple().to_string().to_uppercase()
            ),
            creation_date: day.and_time(NaiveTime::MIN),
            starred: false,
            tags: [self.tag()].into(),
            time_zone: options
                .str("timezone")
                .unwrap_or_else(|| "Europe/Berlin".into()),
            text: String::new(),
            photo: None,
        })
    }
}

#[async_trait]
impl Exporter for JournalExporter {
    fn help(&self) -> ExporterHelp {
        ExporterHelp {
            name: "DayOneExport",
            description: "Exports to Day One journal entries",
            options: HELP_OPTIONS,
        }
    }

    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn configure(&mut self, options: &PluginConfig) {
        self.base.configure(options);
        self.map.configure(&map_options(self.base.options()));
        self.state = OnceCell::new();
    }

    async fn export_day(&self, day: &Day) -> ExportResult<String> {
        if day.segments.is_none() {
            return Err(ExportError::NoSegments(day.date.clone()));
        }

        let state = self.state().await?;
        let overwrite = self.base.options().bool("overwrite").unwrap_or(false);
        let mut entry = match state.index.get(&day.date) {
            Some(_) if !overwrite => return Err(ExportError::DuplicateEntry(day.date.clone())),
            Some(existing) => existing.clone(),
            None => self.new_entry(&day.date)?,
        };
        entry.text = text::render_day(day);

        self.map.export_day(day).await?;
        let image = self.map.filename_for(&day.date)?;
        let photo = tokio::fs::read(&image).await;
        let saved = match photo {
            Ok(bytes) => {
                entry.photo = Some(bytes);
                state.store.save(&entry).await
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = tokio::fs::remove_file(&image).await {
            tracing::debug!("could not remove map image {:?}: {}", image, e);
        }
        saved?;

        tracing::info!(date = %day.date, id = %entry.unique_id, "journal entry written");
        Ok(day.date.clone())
    }
}
