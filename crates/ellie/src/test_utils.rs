//! Fixture builders and mock `MovesClient` / `JournalStore` implementations used by unit tests.
#![cfg(test)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use moves_client::{
    Activity, ActivityKind, Coordinate, Day, FetchOptions, MoveSegment, MovesClient, MovesError,
    Place, PlaceKind, PlaceSegment, Profile, Segment,
};

use crate::error::ExportResult;
use crate::exporters::journal::store::{EntryFilter, JournalEntry, JournalStore};

pub fn day(date: &str, segments: Vec<Segment>) -> Day {
    Day {
        date: date.to_string(),
        segments: Some(segments),
        raw: None,
    }
}

pub fn place_segment(
    name: &str,
    kind: PlaceKind,
    foursquare_id: Option<&str>,
    (lat, lon): (f64, f64),
) -> Segment {
    Segment::Place(PlaceSegment {
        start_time: "20140305T000000+0100".into(),
        end_time: "20140305T080000+0100".into(),
        place: Place {
            name: Some(name.to_string()),
            kind,
            foursquare_id: foursquare_id.map(str::to_string),
            location: Coordinate::new(lat, lon),
        },
    })
}

pub fn timed_place(start: &str, end: &str, name: &str, kind: PlaceKind) -> Segment {
    let mut segment = place_segment(name, kind, None, (52.52, 13.405));
    if let Segment::Place(p) = &mut segment {
        p.start_time = start.to_string();
        p.end_time = end.to_string();
    }
    segment
}

/// A move segment spanning its first to its last activity.
pub fn move_segment(activities: Vec<Activity>) -> Segment {
    let start_time = activities
        .first()
        .map_or_else(|| "20140305T080000+0100".to_string(), |a| a.start_time.clone());
    let end_time = activities
        .last()
        .map_or_else(|| "20140305T083000+0100".to_string(), |a| a.end_time.clone());
    Segment::Move(MoveSegment {
        start_time,
        end_time,
        activities,
    })
}

pub fn activity(kind: ActivityKind, distance: f64, points: &[(f64, f64)]) -> Activity {
    Activity {
        activity: kind,
        start_time: "20140305T080000+0100".into(),
        end_time: "20140305T083000+0100".into(),
        duration: 1800.0,
        distance,
        track_points: points
            .iter()
            .map(|&(lat, lon)| Coordinate::new(lat, lon))
            .collect(),
    }
}

pub fn timed_activity(kind: ActivityKind, start: &str, end: &str, distance: f64) -> Activity {
    Activity {
        start_time: start.to_string(),
        end_time: end.to_string(),
        ..activity(kind, distance, &[])
    }
}

/// Serves canned days by key. Unknown keys answer `NotFound`.
#[derive(Default)]
pub struct MockMovesClient {
    pub days: HashMap<String, Day>,
    pub failing: HashMap<String, u16>,
    pub calls: Mutex<Vec<(String, FetchOptions)>>,
}

impl MockMovesClient {
    pub fn with_days(days: impl IntoIterator<Item = Day>) -> Self {
        Self {
            days: days.into_iter().map(|d| (d.date.clone(), d)).collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, date: &str, status: u16) -> Self {
        self.failing.insert(date.to_string(), status);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        let mut dates: Vec<String> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(d, _)| d.clone())
            .collect();
        dates.sort();
        dates
    }
}

#[async_trait]
impl MovesClient for MockMovesClient {
    async fn get_profile(&self) -> Result<Profile, MovesError> {
        Ok(Profile {
            user_id: 23138311640030064,
            first_date: "20121212".into(),
            time_zone: Some("Europe/Berlin".into()),
        })
    }

    async fn fetch_day(&self, date: &str, options: FetchOptions) -> Result<Day, MovesError> {
        self.calls.lock().unwrap().push((date.to_string(), options));
        if let Some(status) = self.failing.get(date) {
            return Err(MovesError::from_status(*status, "mock failure"));
        }
        self.days
            .get(date)
            .cloned()
            .ok_or_else(|| MovesError::NotFound(date.to_string()))
    }
}

/// In-memory journal store that records every save.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub existing: Vec<JournalEntry>,
    pub saved: Arc<Mutex<Vec<JournalEntry>>>,
    pub list_calls: Arc<Mutex<usize>>,
}

impl RecordingStore {
    pub fn with_entries(existing: Vec<JournalEntry>) -> Self {
        Self {
            existing,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<JournalEntry> {
        self.saved.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

#[async_trait]
impl JournalStore for RecordingStore {
    async fn list(&self, filter: &EntryFilter) -> ExportResult<Vec<JournalEntry>> {
        *self.list_calls.lock().unwrap() += 1;
        Ok(self
            .existing
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn save(&self, entry: &JournalEntry) -> ExportResult<()> {
        self.saved.lock().unwrap().push(entry.clone());
        Ok(())
    }
}
