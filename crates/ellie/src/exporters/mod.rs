//! The closed set of exporters selectable with `output`.

pub mod journal;
pub mod map;
pub mod plain;

use crate::plugin::{Exporter, PluginConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExporterKind {
    GoogleMap,
    DayOne,
    Plaintext,
    Json,
    Location,
}

impl ExporterKind {
    pub const ALL: [ExporterKind; 5] = [
        ExporterKind::GoogleMap,
        ExporterKind::DayOne,
        ExporterKind::Plaintext,
        ExporterKind::Json,
        ExporterKind::Location,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExporterKind::GoogleMap => "GoogleMapExport",
            ExporterKind::DayOne => "DayOneExport",
            ExporterKind::Plaintext => "PlaintextExport",
            ExporterKind::Json => "JsonExport",
            ExporterKind::Location => "LocationExport",
        }
    }

    /// Look up an exporter by name. Case-insensitive; the `Export` suffix is optional.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| {
            let full = kind.name().to_ascii_lowercase();
            wanted == full || Some(wanted.as_str()) == full.strip_suffix("export")
        })
    }

    /// A fresh exporter with `options` merged over its defaults.
    pub fn build(self, options: &PluginConfig) -> Box<dyn Exporter> {
        let mut exporter: Box<dyn Exporter> = match self {
            ExporterKind::GoogleMap => Box::new(map::MapExporter::new()),
            ExporterKind::DayOne => Box::new(journal::JournalExporter::new()),
            ExporterKind::Plaintext => Box::new(plain::PlaintextExporter::default()),
            ExporterKind::Json => Box::new(plain::JsonExporter::default()),
            ExporterKind::Location => Box::new(plain::LocationExporter::default()),
        };
        exporter.configure(options);
        exporter
    }
}
