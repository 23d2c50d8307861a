use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use route_control_lib::{config::DriverConfig, trip::{Trip, TripStatus}};
use tokio::sync::broadcast;

use crate::{DayClosed, TrackerError, database::db::StateStore};

pub const CSV_HEADER: &str = "id,date,driver,vehicle,start time,end time,destination,notes,start odometer,end odometer,distance,fuel used,cost,comments";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportScope {
    AllTrips,
    SingleDay(NaiveDate),
    DateRange { from: NaiveDate, to: NaiveDate },
}

impl ExportScope {
    fn includes(&self, day: NaiveDate) -> bool {
        match *self {
            ExportScope::AllTrips => true,
            ExportScope::SingleDay(single) => day == single,
            ExportScope::DateRange { from, to } => day >= from && day <= to,
        }
    }

    fn file_label(&self) -> String {
        match *self {
            ExportScope::AllTrips => "all".to_string(),
            ExportScope::SingleDay(day) => format!("day_{day}"),
            ExportScope::DateRange { from, to } => format!("{from}_to_{to}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: String,
    pub row_count: usize,
}

/// A scope matching zero trips is a reportable outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Report(CsvExport),
    Empty,
}

/// Renders the completed-trip log to CSV. Row order follows the log and the
/// stored figures are emitted as-is; nothing is recomputed here, so the cost
/// snapshot survives later configuration changes.
pub fn export(
    trips: &[Trip],
    config: &DriverConfig,
    scope: ExportScope,
    generated_at: DateTime<Utc>,
) -> ExportOutcome {
    let rows: Vec<String> = trips.iter()
        .filter(|trip| trip.status == TripStatus::Completed && scope.includes(trip.day_key))
        .map(|trip| render_row(trip, config))
        .collect();

    if rows.is_empty() {
        return ExportOutcome::Empty;
    }

    let mut content = String::from(CSV_HEADER);
    content.push('\n');
    for row in &rows {
        content.push_str(row);
        content.push('\n');
    }

    ExportOutcome::Report(CsvExport {
        file_name: format!(
            "trip_report_{}_{}.csv",
            scope.file_label(),
            generated_at.format("%Y%m%d%H%M%S")
        ),
        row_count: rows.len(),
        content,
    })
}

fn render_row(trip: &Trip, config: &DriverConfig) -> String {
    let columns = [
        trip.id.to_string(),
        trip.day_key.to_string(),
        quote(&config.driver),
        quote(&config.vehicle),
        trip.started_at.to_rfc3339(),
        trip.ended_at.map(|ended_at| ended_at.to_rfc3339()).unwrap_or_default(),
        quote(&trip.destination),
        quote(&trip.notes),
        format_figure(Some(trip.start_odometer)),
        format_figure(trip.end_odometer),
        format_figure(trip.distance),
        format_figure(trip.fuel_used),
        format_figure(trip.cost),
        quote(trip.comments.as_deref().unwrap_or("")),
    ];
    columns.join(",")
}

fn format_figure(value: Option<f64>) -> String {
    value.map(|value| format!("{value:.2}")).unwrap_or_default()
}

/// Flattens line breaks to spaces, doubles embedded quotes, wraps in quotes.
fn quote(text: &str) -> String {
    let flattened = text.replace("\r\n", " ").replace(['\n', '\r'], " ");
    format!("\"{}\"", flattened.replace('"', "\"\""))
}

/// Listens for day-closed events and writes a single-day export for each.
/// Fire and forget: a failed report is logged and never affects the close.
pub(crate) async fn listen(store: StateStore, mut rx: broadcast::Receiver<DayClosed>, export_dir: PathBuf) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Err(err) = write_day_report(&store, &event, &export_dir).await {
                    tracing::error!("End-of-day report for {} failed: {:?}", event.day_key, err);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Report listener lagged, {skipped} day-closed events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn write_day_report(
    store: &StateStore,
    event: &DayClosed,
    export_dir: &Path,
) -> Result<Option<PathBuf>, TrackerError> {
    let trips = store.load_trip_log().await?;
    let config = store.load_config().await?;

    match export(&trips, &config, ExportScope::SingleDay(event.day_key), event.closed_at) {
        ExportOutcome::Report(report) => {
            tokio::fs::create_dir_all(export_dir).await
                .map_err(|_| TrackerError::Store(format!("Failed to create export directory: {:?}", export_dir)))?;

            let path = export_dir.join(&report.file_name);
            tokio::fs::write(&path, &report.content).await
                .map_err(|_| TrackerError::Store(format!("Failed to write report: {:?}", path)))?;

            tracing::info!("End-of-day report written to {:?}", path);
            Ok(Some(path))
        }
        ExportOutcome::Empty => {
            tracing::info!("No completed trips on {}, skipping end-of-day report", event.day_key);
            Ok(None)
        }
    }
}
