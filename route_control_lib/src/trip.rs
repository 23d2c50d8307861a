use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DriverConfig;

/// Stored in place of blank completion comments.
pub const DEFAULT_COMMENTS: &str = "no incidents";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TripStatus {
    InProgress,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub day_key: NaiveDate,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub start_odometer: f64,
    pub end_odometer: Option<f64>,
    pub destination: String,
    pub notes: String,
    pub status: TripStatus,
    pub distance: Option<f64>,
    pub fuel_used: Option<f64>,
    pub cost: Option<f64>,
    pub comments: Option<String>,
}

impl Trip {
    pub fn start(
        day_key: NaiveDate,
        destination: String,
        notes: String,
        start_odometer: f64,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            day_key,
            started_at,
            ended_at: None,
            start_odometer,
            end_odometer: None,
            destination,
            notes,
            status: TripStatus::InProgress,
            distance: None,
            fuel_used: None,
            cost: None,
            comments: None,
        }
    }

    /// Completes the trip, snapshotting distance, fuel and cost with the
    /// configuration in effect right now. The figures are never recomputed
    /// afterwards, even if the configuration changes.
    pub fn complete(
        mut self,
        end_odometer: f64,
        comments: &str,
        config: &DriverConfig,
        ended_at: DateTime<Utc>,
    ) -> Self {
        let metrics = TripMetrics::compute(self.start_odometer, end_odometer, config);
        self.ended_at = Some(ended_at);
        self.end_odometer = Some(end_odometer);
        self.status = TripStatus::Completed;
        self.distance = Some(metrics.distance);
        self.fuel_used = Some(metrics.fuel_used);
        self.cost = Some(metrics.cost);
        self.comments = Some(if comments.trim().is_empty() {
            DEFAULT_COMMENTS.to_string()
        } else {
            comments.to_string()
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripMetrics {
    pub distance: f64,
    pub fuel_used: f64,
    pub cost: f64,
}

impl TripMetrics {
    pub fn compute(start_odometer: f64, end_odometer: f64, config: &DriverConfig) -> Self {
        let distance = end_odometer - start_odometer;
        // avoid division by zero
        let economy = if config.fuel_economy > 0.0 {
            config.fuel_economy
        } else {
            1.0
        };
        let fuel_used = distance / economy;
        let cost = fuel_used * config.fuel_price;

        TripMetrics {
            distance: round2(distance),
            fuel_used: round2(fuel_used),
            cost: round2(cost),
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
