//! Date range and exporter resolution, and the per-day fetch/export fan-out.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate};
use moves_client::{MovesClient, utils};
use tokio::task::JoinSet;

use crate::error::{ExportError, ExportResult};
use crate::exporters::ExporterKind;
use crate::plugin::{Exporter, PluginConfig};

/// Days `start` (exclusive) through `end` (inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Default)]
struct PartialRange {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

fn day_param(params: &PluginConfig, key: &str) -> ExportResult<Option<NaiveDate>> {
    match params.str(key) {
        None => Ok(None),
        Some(raw) => utils::parse_day_key(&raw)
            .map(Some)
            .ok_or_else(|| ExportError::RangeUnresolved(format!("{key} {raw:?} is not YYYYMMDD"))),
    }
}

fn shifted(today: NaiveDate, back: u64) -> ExportResult<NaiveDate> {
    today
        .checked_sub_days(Days::new(back))
        .ok_or_else(|| ExportError::RangeUnresolved(format!("{back} days before {today}")))
}

/// Previous calendar month: the day before its first, through its last day.
fn last_month(today: NaiveDate) -> ExportResult<(NaiveDate, NaiveDate)> {
    let out_of_range = || ExportError::RangeUnresolved(format!("no month before {today}"));
    let last = today
        .with_day(1)
        .and_then(|first| first.pred_opt())
        .ok_or_else(out_of_range)?;
    let before_first = last
        .with_day(1)
        .and_then(|first| first.pred_opt())
        .ok_or_else(out_of_range)?;
    Ok((before_first, last))
}

impl PartialRange {
    /// Apply one parameter source. Later selectors override earlier ones.
    fn apply(&mut self, params: &PluginConfig, today: NaiveDate) -> ExportResult<()> {
        if let Some(start) = day_param(params, "dayStart")? {
            self.start = Some(start);
        }
        if let Some(end) = day_param(params, "dayEnd")? {
            self.end = Some(end);
        }
        if let Some(days) = params.u64("days").filter(|n| *n > 0) {
            self.start = Some(shifted(today, days)?);
            self.end = Some(today);
        }
        if params.bool("yesterday").unwrap_or(false) {
            self.start = Some(shifted(today, 2)?);
            self.end = Some(shifted(today, 1)?);
        }
        if params.bool("lastMonth").unwrap_or(false) {
            let (start, end) = last_month(today)?;
            self.start = Some(start);
            self.end = Some(end);
        }
        Ok(())
    }
}

impl DateRange {
    /// Resolve from parameter sources in increasing precedence.
    pub fn resolve(sources: &[&PluginConfig], today: NaiveDate) -> ExportResult<DateRange> {
        let mut partial = PartialRange::default();
        for params in sources {
            partial.apply(params, today)?;
        }
        match (partial.start, partial.end) {
            (Some(start), Some(end)) => Ok(DateRange { start, end }),
            _ => Err(ExportError::RangeUnresolved(
                "set dayStart and dayEnd, days, yesterday or lastMonth".into(),
            )),
        }
    }

    /// Whole days between the bounds, zero for an inverted range.
    pub fn days(&self) -> u64 {
        (self.end - self.start).num_days().max(0) as u64
    }

    /// Day keys to export, `start + 1` through `end`.
    pub fn day_keys(&self) -> impl Iterator<Item = String> + '_ {
        (1..=self.days())
            .filter_map(move |i| self.start.checked_add_days(Days::new(i)))
            .map(utils::day_key)
    }
}

/// Everything a run needs, resolved from the persisted defaults and run-time parameters.
#[derive(Clone, Debug)]
pub struct ExportPlan {
    pub range: DateRange,
    pub kind: ExporterKind,
    pub options: PluginConfig,
}

impl ExportPlan {
    /// Fails with `RangeUnresolved` when either the range or the exporter is
    /// missing. An unknown `output` name clears an earlier selection.
    pub fn resolve(
        defaults: &PluginConfig,
        runtime: &PluginConfig,
        today: NaiveDate,
    ) -> ExportResult<ExportPlan> {
        let mut kind = None;
        for params in [defaults, runtime] {
            if let Some(name) = params.str("output") {
                kind = ExporterKind::from_name(&name);
                if kind.is_none() {
                    tracing::warn!("unknown exporter {:?}", name);
                }
            }
        }
        let kind = kind.ok_or_else(|| {
            ExportError::RangeUnresolved("no export plugin selected, use --output".into())
        })?;
        let range = DateRange::resolve(&[defaults, runtime], today)?;
        Ok(ExportPlan {
            range,
            kind,
            options: defaults.merged(runtime),
        })
    }

    pub fn build_exporter(&self) -> Box<dyn Exporter> {
        self.kind.build(&self.options)
    }
}

/// How one day ended.
#[derive(Debug)]
pub struct DayOutcome {
    pub date: String,
    pub result: ExportResult<String>,
}

/// Outcomes in completion order.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub outcomes: Vec<DayOutcome>,
}

impl ExportReport {
    pub fn exported(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(String::as_str))
    }

    pub fn failures(&self) -> impl Iterator<Item = &DayOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }
}

pub struct Orchestrator {
    client: Arc<dyn MovesClient>,
    exporter: Arc<dyn Exporter>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn MovesClient>, exporter: Arc<dyn Exporter>) -> Self {
        Self { client, exporter }
    }

    /// Fetch and export every day of `range` concurrently. A failing day is
    /// recorded and the others carry on.
    pub async fn run(&self, range: &DateRange) -> ExportReport {
        let fetch_options = self.exporter.fetch_options();
        tracing::info!(
            exporter = self.exporter.help().name,
            days = range.days(),
            track_points = fetch_options.track_points,
            "starting export"
        );

        let mut tasks = JoinSet::new();
        for date in range.day_keys() {
            let client = Arc::clone(&self.client);
            let exporter = Arc::clone(&self.exporter);
            tasks.spawn(async move {
                let result = match client.fetch_day(&date, fetch_options).await {
                    Ok(day) => exporter.export_day(&day).await,
                    Err(e) => Err(ExportError::from(e)),
                };
                DayOutcome { date, result }
            });
        }

        let mut report = ExportReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    match &outcome.result {
                        Ok(id) => tracing::info!(date = %outcome.date, "exported {}", id),
                        Err(e) => tracing::warn!(date = %outcome.date, "export failed: {}", e),
                    }
                    report.outcomes.push(outcome);
                }
                Err(e) => tracing::error!("export task aborted: {}", e),
            }
        }
        report
    }
}
