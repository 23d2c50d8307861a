use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use route_control_lib::{config::DriverConfig, trip::Trip, workday::WorkdaySession};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
    DATA_DIR, EXPORT_DIR, TrackerError,
    database::db::StateStore,
    report::{self, ExportOutcome, ExportScope},
    session_manager::SessionManager,
    trip_manager::{TripManager, TripStart},
};

/// Broadcast after a workday closes; the report listener turns it into a
/// best-effort end-of-day export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayClosed {
    pub day_key: NaiveDate,
    pub closed_at: DateTime<Utc>,
}

/// Outcome of a close request. A trip still in progress is advisory: the
/// day stays open until the caller confirms cancelling it.
#[derive(Debug, Clone, PartialEq)]
pub enum DayClose {
    Closed(WorkdaySession),
    TripInProgress(Trip),
}

#[derive(Clone)]
pub struct DataManager {
    pub(crate) store: StateStore,
    pub(crate) session_manager: SessionManager,
    pub(crate) trip_manager: TripManager,
    day_closed_tx: broadcast::Sender<DayClosed>,
}

/// The public interface for all route control data management.
impl DataManager {
    pub async fn start() -> Result<Self, TrackerError> {
        // Create data dir if it doesn't exist
        let root: PathBuf = project_root::get_project_root()
            .map_err(|_| TrackerError::Store("Failed to locate project root".to_string()))?;
        let data_dir = root.join(DATA_DIR);
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)
                .map_err(|_| TrackerError::Store(format!("Failed to create data directory: {:?}", data_dir)))?;
        }

        let store = StateStore::connect().await?;
        Ok(Self::assemble(store, root.join(EXPORT_DIR)))
    }

    /// In-memory store with reports under the given directory. For tests
    /// and throwaway embeddings.
    pub async fn start_in_memory(export_dir: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let store = StateStore::connect_in_memory().await?;
        Ok(Self::assemble(store, export_dir.into()))
    }

    fn assemble(store: StateStore, export_dir: PathBuf) -> Self {
        let (day_closed_tx, day_closed_rx) = broadcast::channel(16);
        tokio::spawn(report::listen(store.clone(), day_closed_rx, export_dir));

        DataManager {
            session_manager: SessionManager::new(store.clone()),
            trip_manager: TripManager::new(store.clone()),
            store,
            day_closed_tx,
        }
    }

    pub fn subscribe_day_closed(&self) -> broadcast::Receiver<DayClosed> {
        self.day_closed_tx.subscribe()
    }

    pub async fn config(&self) -> Result<DriverConfig, TrackerError> {
        self.store.load_config().await
    }

    pub async fn update_config(&self, config: DriverConfig) -> Result<DriverConfig, TrackerError> {
        if !config.fuel_economy.is_finite() || config.fuel_economy <= 0.0 {
            return Err(TrackerError::Validation("Fuel economy must be greater than 0".to_string()));
        }
        if !config.fuel_price.is_finite() || config.fuel_price < 0.0 {
            return Err(TrackerError::Validation("Fuel price must be at least 0".to_string()));
        }

        self.store.save_config(&config).await?;
        Ok(config)
    }

    pub async fn current_session(&self) -> Result<WorkdaySession, TrackerError> {
        self.session_manager.current().await
    }

    pub async fn open_day(&self, start_odometer: f64) -> Result<WorkdaySession, TrackerError> {
        self.session_manager.open_day(start_odometer).await
    }

    /// The composed close. A trip left in progress is surfaced for
    /// confirmation first; once confirmed it is cancelled, the day closes,
    /// and the close is announced for end-of-day reporting.
    pub async fn close_day(&self, cancel_active_trip: bool) -> Result<DayClose, TrackerError> {
        let session = self.session_manager.current().await?;
        if !session.is_open() {
            return Err(TrackerError::InvalidState("The workday is already closed".to_string()));
        }
        let day_key = session.day_key();

        if let Some(active) = self.trip_manager.active_trip().await? {
            if !cancel_active_trip {
                return Ok(DayClose::TripInProgress(active));
            }
            tracing::warn!("Closing the day with a trip in progress, cancelling it");
            self.trip_manager.cancel_active_trip().await?;
        }

        let session = self.session_manager.close_day().await?;

        if let (Some(day_key), Some(closed_at)) = (day_key, session.closed_at) {
            // Nobody listening is fine.
            let _ = self.day_closed_tx.send(DayClosed { day_key, closed_at });
        }

        Ok(DayClose::Closed(session))
    }

    pub async fn reopen_day(&self) -> Result<WorkdaySession, TrackerError> {
        self.session_manager.reopen_day().await
    }

    pub async fn is_day_stale(&self, reference: NaiveDate) -> Result<bool, TrackerError> {
        self.session_manager.is_stale(reference).await
    }

    pub async fn active_trip(&self) -> Result<Option<Trip>, TrackerError> {
        self.trip_manager.active_trip().await
    }

    pub async fn completed_trips(&self) -> Result<Vec<Trip>, TrackerError> {
        self.trip_manager.completed_trips().await
    }

    pub async fn suggested_start_odometer(&self) -> Result<f64, TrackerError> {
        self.trip_manager.suggested_start_odometer().await
    }

    pub async fn start_trip(
        &self,
        destination: &str,
        notes: &str,
        start_odometer: f64,
        confirm_low_odometer: bool,
    ) -> Result<TripStart, TrackerError> {
        self.trip_manager.start_trip(destination, notes, start_odometer, confirm_low_odometer).await
    }

    pub async fn finish_trip(&self, end_odometer: f64, comments: &str) -> Result<Trip, TrackerError> {
        self.trip_manager.finish_trip(end_odometer, comments).await
    }

    pub async fn cancel_active_trip(&self) -> Result<(), TrackerError> {
        self.trip_manager.cancel_active_trip().await
    }

    pub async fn recover_ghost_trip(&self) -> Result<(), TrackerError> {
        self.trip_manager.recover_ghost_trip().await
    }

    pub async fn delete_trip(&self, id: Uuid) -> Result<(), TrackerError> {
        self.trip_manager.delete_trip(id).await
    }

    pub async fn export_trips(&self, scope: ExportScope) -> Result<ExportOutcome, TrackerError> {
        let trips = self.store.load_trip_log().await?;
        let config = self.store.load_config().await?;
        Ok(report::export(&trips, &config, scope, Utc::now()))
    }

    /// Factory reset: clears every stored key. Configuration falls back to
    /// defaults, the log empties, session and active trip disappear.
    pub async fn reset_all(&self) -> Result<(), TrackerError> {
        self.store.clear().await?;
        tracing::warn!("All stored data cleared");
        Ok(())
    }
}
