//! Static map rendering of a day's path and places.

use std::path::Path;

use async_trait::async_trait;
use futures_util::StreamExt;
use moves_client::{Coordinate, Day, Segment};
use tokio::io::AsyncWriteExt;

use crate::downsample::{DEFAULT_MAX_POINTS, downsample};
use crate::error::{ExportError, ExportResult};
use crate::plugin::{BaseConfig, Exporter, ExporterHelp, PluginConfig};

pub const DEFAULT_RENDER_URL: &str = "https://maps.googleapis.com/maps/api/staticmap";

const PATH_STYLE: &str = "color:0x0000ff|weight:5";
const MARKER_STYLE: &str = "color:blue|size:normal";

const HELP_OPTIONS: &[(&str, &str)] = &[
    (
        "outputFile",
        "File name format for output files, placeholders: %date%",
    ),
    ("dateFormat", "Date format to use"),
    ("size", "Size of the map (default: 800x600)"),
    ("scale", "Map scale factor, 1 or 2 (default: 1)"),
    ("format", "Image format, png or jpg (default: png)"),
    ("zoomFactor", "Map zoom factor (default: 13)"),
    ("addPlaces", "Add places as markers (default: false)"),
    ("maxPoints", "Maximum number of path points (default: 30)"),
    ("apiKey", "Static maps API key (optional)"),
];

fn defaults() -> PluginConfig {
    PluginConfig::from_pairs([
        ("outputFile", serde_json::json!("%date%.png")),
        ("dateFormat", serde_json::json!("YYYYMMDD")),
        ("size", serde_json::json!("800x600")),
        ("scale", serde_json::json!(1)),
        ("format", serde_json::json!("png")),
        ("zoomFactor", serde_json::json!(13)),
        ("addPlaces", serde_json::json!(false)),
        ("maxPoints", serde_json::json!(DEFAULT_MAX_POINTS)),
        ("baseUrl", serde_json::json!(DEFAULT_RENDER_URL)),
    ])
}

/// Round to 4 decimals, halves towards positive infinity.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0 + 0.5).floor() / 10_000.0
}

fn rounded(c: &Coordinate) -> Coordinate {
    Coordinate::new(round4(c.lat), round4(c.lon))
}

/// Path points and place markers of a day, in segment order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapFeatures {
    pub path: Vec<Coordinate>,
    pub places: Vec<Coordinate>,
}

impl MapFeatures {
    pub fn collect(segments: &[Segment]) -> Self {
        let mut features = MapFeatures::default();
        for segment in segments {
            match segment {
                Segment::Place(p) => features.places.push(rounded(&p.place.location)),
                Segment::Move(m) => features.path.extend(
                    m.activities
                        .iter()
                        .flat_map(|a| a.track_points.iter())
                        .map(rounded),
                ),
                Segment::Other => {}
            }
        }
        features
    }
}

fn join_coordinates(style: &str, coords: &[Coordinate]) -> String {
    let mut out = style.to_string();
    for c in coords {
        out.push('|');
        out.push_str(&format!("{},{}", c.lat, c.lon));
    }
    out
}

/// Renders a day through a static map service and streams the image to disk.
pub struct MapExporter {
    base: BaseConfig,
    client: reqwest::Client,
}

impl Default for MapExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MapExporter {
    pub fn new() -> Self {
        Self {
            base: BaseConfig::new(defaults()),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_options(options: &PluginConfig) -> Self {
        let mut exporter = Self::new();
        exporter.configure(options);
        exporter
    }

    /// Query parameters for the renderer. The path is downsampled to `maxPoints`.
    pub fn query_pairs(&self, features: &MapFeatures) -> Vec<(&'static str, String)> {
        let options = self.base.options();
        let max_points = options
            .u64("maxPoints")
            .map_or(DEFAULT_MAX_POINTS, |n| n as usize);

        let mut pairs = vec![
            ("maptype", "roadmap".to_string()),
            ("size", options.str("size").unwrap_or_else(|| "800x600".into())),
            ("scale", options.str("scale").unwrap_or_else(|| "1".into())),
            ("format", options.str("format").unwrap_or_else(|| "png".into())),
        ];

        let sampled = downsample(&features.path, max_points);
        if !sampled.is_empty() {
            pairs.push(("path", join_coordinates(PATH_STYLE, &sampled)));
        }
        if options.bool("addPlaces").unwrap_or(false) && !features.places.is_empty() {
            pairs.push(("markers", join_coordinates(MARKER_STYLE, &features.places)));
        }
        if let Some(key) = options.str("apiKey").filter(|k| !k.is_empty()) {
            pairs.push(("key", key));
        }
        pairs
    }

    /// Fetch the rendered image and write it to `target`. The file is synced
    /// before this returns and removed again if the transfer fails midway.
    async fn render_to(&self, features: &MapFeatures, target: &Path) -> ExportResult<()> {
        let base_url = self
            .base
            .options()
            .str("baseUrl")
            .unwrap_or_else(|| DEFAULT_RENDER_URL.into());
        let pairs = self.query_pairs(features);

        let resp = self.client.get(&base_url).query(&pairs).send().await?;
        tracing::debug!(url = %resp.url(), "requested static map");
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body_snippet: String = body.chars().take(256).collect();
            return Err(ExportError::FetchFailed(format!(
                "map renderer returned {}: {}",
                status.as_u16(),
                body_snippet
            )));
        }

        let mut stream = resp.bytes_stream();
        let mut file = tokio::fs::File::create(target).await?;
        let written: ExportResult<()> = async {
            while let Some(chunk) = stream.next().await {
                let bytes = chunk?;
                file.write_all(&bytes).await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok::<(), ExportError>(())
        }
        .await;

        if written.is_err() {
            drop(file);
            let _ = tokio::fs::remove_file(target).await;
        }
        written
    }
}

#[async_trait]
impl Exporter for MapExporter {
    fn help(&self) -> ExporterHelp {
        ExporterHelp {
            name: "GoogleMapExport",
            description: "Exports as a static google map",
            options: HELP_OPTIONS,
        }
    }

    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn configure(&mut self, options: &PluginConfig) {
        self.base.configure(options);
    }

    async fn export_day(&self, day: &Day) -> ExportResult<String> {
        let segments = day
            .segments
            .as_deref()
            .ok_or_else(|| ExportError::NoSegments(day.date.clone()))?;

        let features = MapFeatures::collect(segments);
        tracing::debug!(
            date = %day.date,
            points = features.path.len(),
            places = features.places.len(),
            "collected map features"
        );

        let target = self.filename_for(&day.date)?;
        self.render_to(&features, &target).await?;
        Ok(day.date.clone())
    }
}
