//! Export a daily movement storyline as maps, journal entries and text files.
//!
//! The orchestrator resolves a date range and an exporter from layered
//! parameters, then fetches and exports every day concurrently through a
//! [`moves_client::MovesClient`].

pub mod config;
pub mod downsample;
pub mod error;
pub mod exporters;
pub mod orchestrator;
pub mod plugin;
mod test_utils;

pub use config::AppConfig;
pub use error::{ExportError, ExportResult};
pub use exporters::ExporterKind;
pub use orchestrator::{DateRange, DayOutcome, ExportPlan, ExportReport, Orchestrator};
pub use plugin::{BaseConfig, Exporter, ExporterHelp, PluginConfig};
