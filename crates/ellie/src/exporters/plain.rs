//! One-file-per-day text exporters: activity log, raw JSON and visited places.

use async_trait::async_trait;
use moves_client::{Day, Segment};

use crate::error::{ExportError, ExportResult};
use crate::plugin::{BaseConfig, Exporter, ExporterHelp, FILE_OPTIONS_HELP, PluginConfig};

fn file_defaults(output_file: &str) -> PluginConfig {
    PluginConfig::from_pairs([("outputFile", output_file), ("dateFormat", "YYYYMMDD")])
}

fn segments(day: &Day) -> ExportResult<&[Segment]> {
    day.segments
        .as_deref()
        .ok_or_else(|| ExportError::NoSegments(day.date.clone()))
}

fn minutes(segment: &Segment) -> i64 {
    match (segment.start(), segment.end()) {
        (Some(start), Some(end)) => (end - start).num_minutes(),
        _ => 0,
    }
}

async fn write_day(base: &BaseConfig, date: &str, contents: String) -> ExportResult<String> {
    let target = base.filename_for(date)?;
    tokio::fs::write(&target, contents).await?;
    tracing::debug!(date, path = ?target, "wrote day file");
    Ok(date.to_string())
}

/// Places with their dwell time and every activity with duration and distance.
pub fn render_log(day: &Day, segments: &[Segment]) -> String {
    let mut text = format!("Moves log for day: {}\n", day.date);
    for segment in segments {
        match segment {
            Segment::Place(p) => text.push_str(&format!(
                "## {} {} min\n",
                p.place.name.as_deref().unwrap_or("Unnamed place"),
                minutes(segment)
            )),
            Segment::Move(m) => {
                for a in &m.activities {
                    text.push_str(&format!(
                        "-> {} {} secs {} meters\n",
                        a.activity.code(),
                        a.duration,
                        a.distance
                    ));
                }
            }
            Segment::Other => {}
        }
    }
    text
}

/// `name start end N min`, one line per place.
pub fn render_locations(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Place(p) => Some(format!(
                "{} {} {} {} min\n",
                p.place.name.as_deref().unwrap_or("Unnamed place"),
                p.start_time,
                p.end_time,
                minutes(segment)
            )),
            _ => None,
        })
        .collect()
}

pub struct PlaintextExporter {
    base: BaseConfig,
}

impl Default for PlaintextExporter {
    fn default() -> Self {
        Self {
            base: BaseConfig::new(file_defaults("%date%.txt")),
        }
    }
}

#[async_trait]
impl Exporter for PlaintextExporter {
    fn help(&self) -> ExporterHelp {
        ExporterHelp {
            name: "PlaintextExport",
            description: "Exports as plaintext",
            options: FILE_OPTIONS_HELP,
        }
    }

    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn configure(&mut self, options: &PluginConfig) {
        self.base.configure(options);
    }

    async fn export_day(&self, day: &Day) -> ExportResult<String> {
        let text = render_log(day, segments(day)?);
        write_day(&self.base, &day.date, text).await
    }
}

pub struct JsonExporter {
    base: BaseConfig,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self {
            base: BaseConfig::new(file_defaults("%date%.json")),
        }
    }
}

#[async_trait]
impl Exporter for JsonExporter {
    fn help(&self) -> ExporterHelp {
        ExporterHelp {
            name: "JsonExport",
            description: "Export as raw JSON",
            options: FILE_OPTIONS_HELP,
        }
    }

    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn configure(&mut self, options: &PluginConfig) {
        self.base.configure(options);
    }

    /// Writes the day as received, so a day without segments is still dumped.
    /// Days built in memory have no payload and are serialized from the model.
    async fn export_day(&self, day: &Day) -> ExportResult<String> {
        let json = match &day.raw {
            Some(payload) => serde_json::to_string(payload)?,
            None => serde_json::to_string(day)?,
        };
        write_day(&self.base, &day.date, json).await
    }
}

pub struct LocationExporter {
    base: BaseConfig,
}

impl Default for LocationExporter {
    fn default() -> Self {
        Self {
            base: BaseConfig::new(file_defaults("%date%.txt")),
        }
    }
}

#[async_trait]
impl Exporter for LocationExporter {
    fn help(&self) -> ExporterHelp {
        ExporterHelp {
            name: "LocationExport",
            description: "Exports only locations as plaintext",
            options: FILE_OPTIONS_HELP,
        }
    }

    fn base(&self) -> &BaseConfig {
        &self.base
    }

    fn configure(&mut self, options: &PluginConfig) {
        self.base.configure(options);
    }

    async fn export_day(&self, day: &Day) -> ExportResult<String> {
        let text = render_locations(segments(day)?);
        write_day(&self.base, &day.date, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{activity, day, move_segment, timed_activity, timed_place};
    use moves_client::{ActivityKind, PlaceKind};

    fn sample() -> Day {
        day(
            "20140305",
            vec![
                timed_place(
                    "20140305T000000+0100",
                    "20140305T081500+0100",
                    "Home",
                    PlaceKind::Other,
                ),
                move_segment(vec![timed_activity(
                    ActivityKind::Wlk,
                    "20140305T081500+0100",
                    "20140305T083000+0100",
                    1200.0,
                )]),
                timed_place(
                    "20140305T083000+0100",
                    "20140305T170000+0100",
                    "Office",
                    PlaceKind::Other,
                ),
            ],
        )
    }

    fn configured<E: Exporter>(mut exporter: E, dir: &std::path::Path, template: &str) -> E {
        let output = dir.join(template);
        exporter.configure(&PluginConfig::from_pairs([(
            "outputFile",
            output.to_string_lossy().to_string(),
        )]));
        exporter
    }

    #[test]
    fn log_lists_places_and_activities() {
        let d = sample();
        let text = render_log(&d, d.segments.as_deref().unwrap());
        assert_eq!(
            text,
            "Moves log for day: 20140305\n\
             ## Home 495 min\n\
             -> wlk 1800 secs 1200 meters\n\
             ## Office 510 min\n"
        );
    }

    #[test]
    fn locations_skip_moves() {
        let d = sample();
        let text = render_locations(d.segments.as_deref().unwrap());
        assert_eq!(
            text,
            "Home 20140305T000000+0100 20140305T081500+0100 495 min\n\
             Office 20140305T083000+0100 20140305T170000+0100 510 min\n"
        );
    }

    #[tokio::test]
    async fn plaintext_writes_templated_file() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = configured(PlaintextExporter::default(), dir.path(), "log-%date%.txt");
        let id = exporter.export_day(&sample()).await.unwrap();
        assert_eq!(id, "20140305");
        let written = std::fs::read_to_string(dir.path().join("log-20140305.txt")).unwrap();
        assert!(written.starts_with("Moves log for day: 20140305\n"));
    }

    #[tokio::test]
    async fn json_dump_parses_back_to_the_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = configured(JsonExporter::default(), dir.path(), "%date%.json");
        let d = day(
            "20140305",
            vec![move_segment(vec![activity(
                ActivityKind::Cyc,
                4000.0,
                &[(52.5, 13.4)],
            )])],
        );
        exporter.export_day(&d).await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("20140305.json")).unwrap();
        let back: Day = serde_json::from_str(&written).unwrap();
        assert_eq!(back, d);
    }

    #[tokio::test]
    async fn json_dump_keeps_the_received_payload() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = configured(JsonExporter::default(), dir.path(), "%date%.json");
        let payload = serde_json::json!({
            "date": "20140305",
            "caloriesIdle": 1785,
            "lastUpdate": "20140306T070000Z",
            "summary": [{"activity": "walking", "group": "walking", "distance": 1200}],
            "segments": [{
                "type": "place",
                "startTime": "20140305T000000+0100",
                "endTime": "20140305T081500+0100",
                "lastUpdate": "20140305T090000Z",
                "place": {"id": 7, "name": "Home", "type": "home", "location": {"lat": 52.5, "lon": 13.4}}
            }]
        });
        let d = Day::from_payload(payload.clone()).unwrap();
        exporter.export_day(&d).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("20140305.json")).unwrap();
        let back: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(back, payload);
        assert_eq!(back["segments"][0]["place"]["type"], "home");
    }

    #[tokio::test]
    async fn missing_segments_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let empty = Day {
            date: "20140305".into(),
            segments: None,
            raw: None,
        };
        let plaintext = configured(PlaintextExporter::default(), dir.path(), "%date%.txt");
        let locations = configured(LocationExporter::default(), dir.path(), "%date%.txt");
        for exporter in [&plaintext as &dyn Exporter, &locations] {
            let err = exporter.export_day(&empty).await.unwrap_err();
            assert_eq!(err.to_string(), "day 20140305 seems to have no segments");
        }
        assert!(!dir.path().join("20140305.txt").exists());
    }

    #[tokio::test]
    async fn unwritable_target_is_a_persist_failure() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = configured(
            LocationExporter::default(),
            dir.path(),
            "missing/dir/%date%.txt",
        );
        let err = exporter.export_day(&sample()).await.unwrap_err();
        assert!(matches!(err, ExportError::PersistFailed(_)));
    }
}
