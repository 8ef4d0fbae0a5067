//! `MovesClient` trait, the daily storyline model and a reqwest-based client.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod config;
pub mod http_client;
pub mod utils;

#[derive(Debug, Error)]
pub enum MovesError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
}

impl MovesError {
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => MovesError::Auth(body),
            404 => MovesError::NotFound(body),
            _ => MovesError::Status { status, body },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub user_id: u64,
    /// First day with recorded data, `YYYYMMDD`.
    pub first_date: String,
    pub time_zone: Option<String>,
}

/// One calendar day of the storyline.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Day {
    /// Day key, `YYYYMMDD`.
    pub date: String,
    #[serde(default)]
    pub segments: Option<Vec<Segment>>,
    /// The payload this day was decoded from, fields the model drops included.
    #[serde(skip)]
    pub raw: Option<serde_json::Value>,
}

impl Day {
    /// Decode a storyline day and keep the payload alongside the typed view.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut day = Day::deserialize(&payload)?;
        day.raw = Some(payload);
        Ok(day)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Place(PlaceSegment),
    Move(MoveSegment),
    /// Segment kinds no exporter cares about (`off`, ...).
    #[serde(other)]
    Other,
}

impl Segment {
    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Segment::Place(p) => utils::parse_moves_time(&p.start_time),
            Segment::Move(m) => utils::parse_moves_time(&m.start_time),
            Segment::Other => None,
        }
    }

    pub fn end(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Segment::Place(p) => utils::parse_moves_time(&p.end_time),
            Segment::Move(m) => utils::parse_moves_time(&m.end_time),
            Segment::Other => None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaceSegment {
    pub start_time: String,
    pub end_time: String,
    pub place: Place,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: PlaceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foursquare_id: Option<String>,
    pub location: Coordinate,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    Foursquare,
    Unknown,
    /// `home`, `work`, `school`, `user` and anything newer.
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MoveSegment {
    pub start_time: String,
    pub end_time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub activities: Vec<Activity>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub activity: ActivityKind,
    pub start_time: String,
    pub end_time: String,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    /// Meters.
    #[serde(default)]
    pub distance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub track_points: Vec<Coordinate>,
}

impl Activity {
    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        utils::parse_moves_time(&self.start_time)
    }

    pub fn end(&self) -> Option<DateTime<FixedOffset>> {
        utils::parse_moves_time(&self.end_time)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Trp,
    Wlk,
    Run,
    Cyc,
    #[serde(other)]
    Unknown,
}

impl ActivityKind {
    /// The movement types the summary always lists, in display order.
    pub const KNOWN: [ActivityKind; 4] = [
        ActivityKind::Trp,
        ActivityKind::Wlk,
        ActivityKind::Run,
        ActivityKind::Cyc,
    ];

    /// The API's activity code. Unrecognized codes read back as `unknown`.
    pub fn code(self) -> &'static str {
        match self {
            ActivityKind::Trp => "trp",
            ActivityKind::Wlk => "wlk",
            ActivityKind::Run => "run",
            ActivityKind::Cyc => "cyc",
            ActivityKind::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ActivityKind::Trp => "Transport",
            ActivityKind::Wlk => "Walk",
            ActivityKind::Run => "Run",
            ActivityKind::Cyc => "Cycle",
            ActivityKind::Unknown => "Unknown movement",
        }
    }
}

/// A GPS sample or a place location, in decimal degrees.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Coordinate {
    #[serde(deserialize_with = "deserialize_degrees")]
    pub lat: f64,
    #[serde(deserialize_with = "deserialize_degrees")]
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Track points are sent as numbers by the API but as strings by some exports.
fn deserialize_degrees<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("coordinate out of range: {n}"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| D::Error::custom(format!("invalid coordinate {s:?}: {e}"))),
        other => Err(D::Error::custom(format!(
            "expected number or string, got {other}"
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    pub track_points: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self { track_points: true }
    }
}

#[async_trait]
pub trait MovesClient: Send + Sync + 'static {
    async fn get_profile(&self) -> Result<Profile, MovesError>;

    /// Fetch the storyline for a single day key (`YYYYMMDD`).
    async fn fetch_day(&self, date: &str, options: FetchOptions) -> Result<Day, MovesError>;
}
