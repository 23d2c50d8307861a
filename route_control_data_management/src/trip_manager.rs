use chrono::Utc;
use route_control_lib::trip::Trip;
use uuid::Uuid;

use crate::{TrackerError, database::db::StateStore};

/// Outcome of a start request. A low odometer is advisory, not an error:
/// nothing is created until the caller confirms and retries.
#[derive(Debug, Clone, PartialEq)]
pub enum TripStart {
    Started(Trip),
    LowOdometer { entered: f64, suggested: f64 },
}

/// Owns the active-trip reference and the completed-trip log.
#[derive(Clone)]
pub struct TripManager {
    store: StateStore,
}

impl TripManager {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    pub async fn active_trip(&self) -> Result<Option<Trip>, TrackerError> {
        self.store.load_active_trip().await
    }

    pub async fn completed_trips(&self) -> Result<Vec<Trip>, TrackerError> {
        self.store.load_trip_log().await
    }

    /// End odometer of the most recently completed trip, else the open
    /// session's start odometer.
    pub async fn suggested_start_odometer(&self) -> Result<f64, TrackerError> {
        let log = self.store.load_trip_log().await?;
        if let Some(end_odometer) = log.first().and_then(|trip| trip.end_odometer) {
            return Ok(end_odometer);
        }
        Ok(self.store.load_session().await?.start_odometer.unwrap_or(0.0))
    }

    pub async fn start_trip(
        &self,
        destination: &str,
        notes: &str,
        start_odometer: f64,
        confirm_low_odometer: bool,
    ) -> Result<TripStart, TrackerError> {
        if self.store.load_active_trip().await?.is_some() {
            return Err(TrackerError::InvalidState("A trip is already in progress".to_string()));
        }
        if destination.trim().is_empty() {
            return Err(TrackerError::Validation("Destination must not be empty".to_string()));
        }
        if !start_odometer.is_finite() || start_odometer < 0.0 {
            return Err(TrackerError::Validation("Start odometer must be a number of at least 0".to_string()));
        }

        let suggested = self.suggested_start_odometer().await?;
        if start_odometer < suggested && !confirm_low_odometer {
            // A vehicle swap can legitimately restart from a lower reading.
            return Ok(TripStart::LowOdometer { entered: start_odometer, suggested });
        }

        let started_at = Utc::now();
        let day_key = self.store.load_session().await?
            .day_key()
            .unwrap_or_else(|| started_at.date_naive());

        let trip = Trip::start(day_key, destination.to_string(), notes.to_string(), start_odometer, started_at);
        self.store.save_active_trip(Some(&trip)).await?;

        tracing::info!("Trip to {destination} started at odometer {start_odometer}");
        Ok(TripStart::Started(trip))
    }

    pub async fn finish_trip(&self, end_odometer: f64, comments: &str) -> Result<Trip, TrackerError> {
        let Some(active) = self.store.load_active_trip().await? else {
            return Err(TrackerError::InvalidState("No trip is in progress".to_string()));
        };

        if !end_odometer.is_finite() || end_odometer <= active.start_odometer {
            return Err(TrackerError::Validation("Final odometer must exceed the initial reading".to_string()));
        }

        let config = self.store.load_config().await?;
        let trip = active.complete(end_odometer, comments, &config, Utc::now());

        let mut log = self.store.load_trip_log().await?;
        log.insert(0, trip.clone());
        self.store.save_trip_log(&log).await?;
        self.store.save_active_trip(None).await?;

        tracing::info!("Trip to {} completed after {} km", trip.destination, trip.distance.unwrap_or(0.0));
        Ok(trip)
    }

    pub async fn cancel_active_trip(&self) -> Result<(), TrackerError> {
        if self.store.load_active_trip().await?.is_none() {
            return Err(TrackerError::InvalidState("No trip is in progress".to_string()));
        }

        self.store.save_active_trip(None).await?;
        tracing::info!("Active trip cancelled");
        Ok(())
    }

    /// Clears whatever active-trip record is stored, if any. Unlike
    /// cancelling, recovery is idempotent: repeated force-unstick requests
    /// after an abnormal restart must all succeed.
    pub async fn recover_ghost_trip(&self) -> Result<(), TrackerError> {
        if self.store.load_active_trip().await?.is_some() {
            tracing::warn!("Recovering ghost trip left in the store");
            self.store.save_active_trip(None).await?;
        }
        Ok(())
    }

    /// Removes a completed trip from the log. Unknown ids are a no-op.
    pub async fn delete_trip(&self, id: Uuid) -> Result<(), TrackerError> {
        let mut log = self.store.load_trip_log().await?;
        let before = log.len();
        log.retain(|trip| trip.id != id);

        if log.len() != before {
            self.store.save_trip_log(&log).await?;
            tracing::info!("Deleted trip {id}");
        }
        Ok(())
    }
}
