//! Markdown day report used for journal entries and plaintext logs.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use moves_client::{ActivityKind, Day, Place, PlaceKind, Segment};

pub const HEADER: &str = "# Daily Moves.app log\n";

/// Consecutive movements collapsed into a single report line.
#[derive(Default)]
struct MovementRun {
    start: Option<DateTime<FixedOffset>>,
    end: Option<DateTime<FixedOffset>>,
    kinds: Vec<ActivityKind>,
}

impl MovementRun {
    fn flush_into(&mut self, text: &mut String) {
        if self.kinds.is_empty() {
            return;
        }
        let labels: Vec<&str> = self.kinds.iter().map(|k| k.label()).collect();
        text.push_str(&format!(
            "* {}: {}\n",
            time_span(self.start, self.end),
            labels.join(", ")
        ));
        *self = MovementRun::default();
    }
}

/// Render the day report. Pure: the same day always yields the same text.
///
/// Moves between two places are grouped into one line listing every
/// activity's type in order. The report ends with a per-type distance summary.
pub fn render_day(day: &Day) -> String {
    let mut text = String::from(HEADER);
    let mut totals: BTreeMap<ActivityKind, f64> =
        ActivityKind::KNOWN.iter().map(|k| (*k, 0.0)).collect();
    let mut run = MovementRun::default();

    for segment in day.segments.as_deref().unwrap_or_default() {
        match segment {
            Segment::Place(p) => {
                run.flush_into(&mut text);
                text.push_str(&format!(
                    "* {}: {}\n",
                    time_span(segment.start(), segment.end()),
                    place_label(&p.place)
                ));
            }
            Segment::Move(m) => {
                for activity in &m.activities {
                    if run.kinds.is_empty() {
                        run.start = activity.start();
                    }
                    run.end = activity.end();
                    run.kinds.push(activity.activity);
                    *totals.entry(activity.activity).or_insert(0.0) += activity.distance;
                }
            }
            Segment::Other => {}
        }
    }
    run.flush_into(&mut text);

    let summary: Vec<String> = totals
        .iter()
        .filter(|(kind, meters)| ActivityKind::KNOWN.contains(*kind) || **meters > 0.0)
        .map(|(kind, meters)| format!("{} {}", nice_distance(*meters), kind.label()))
        .collect();
    text.push_str("\n## Summary\n* ");
    text.push_str(&summary.join(", "));
    text
}

fn place_label(place: &Place) -> String {
    match (place.kind, place.foursquare_id.as_deref()) {
        (PlaceKind::Foursquare, Some(id)) => format!(
            "[{}](https://foursquare.com/v/{})",
            place.name.as_deref().unwrap_or("Foursquare venue"),
            id
        ),
        (PlaceKind::Unknown, _) => format!(
            "[Unknown place](https://maps.google.de/?q={},{})",
            place.location.lat, place.location.lon
        ),
        _ => place.name.clone().unwrap_or_else(|| "Unnamed place".into()),
    }
}

fn time_span(start: Option<DateTime<FixedOffset>>, end: Option<DateTime<FixedOffset>>) -> String {
    format!("{} \u{2014} {}", clock(start), clock(end))
}

/// `HH:MM` in the timestamp's own offset.
fn clock(t: Option<DateTime<FixedOffset>>) -> String {
    t.map_or_else(|| "??:??".to_string(), |t| t.format("%H:%M").to_string())
}

/// Whole meters up to 1000, rounded kilometers above.
pub fn nice_distance(meters: f64) -> String {
    let meters = meters.trunc() as i64;
    if meters > 1000 {
        return format!("{}km", (meters as f64 / 1000.0).round() as i64);
    }
    format!("{meters}m")
}
