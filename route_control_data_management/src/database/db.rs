use std::path::PathBuf;

use const_format::concatcp;
use route_control_lib::{config::DriverConfig, trip::Trip, workday::WorkdaySession};
use sqlx::{Executor, Pool, Sqlite, SqlitePool, query, query_as, sqlite::{SqliteConnectOptions, SqlitePoolOptions}};

use crate::{DATABASE_PATH, TrackerError};

use super::constants::*;

/// Key/value store backing every owned record. One row per key, values are
/// JSON documents, last write per key wins.
#[derive(Clone)]
pub struct StateStore {
    pool: Pool<Sqlite>,
}

impl StateStore {
    pub async fn connect() -> Result<Self, TrackerError> {
        let root: PathBuf = project_root::get_project_root()
            .map_err(|_| TrackerError::Store("Failed to locate project root".to_string()))?;
        let options = SqliteConnectOptions::new()
            .filename(root.join(DATABASE_PATH))
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await
            .map_err(|_| TrackerError::Store("Failed to connect to database".to_string()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// A fresh in-memory database. Pinned to a single connection, as every
    /// pooled sqlite connection would otherwise see its own empty memory.
    pub async fn connect_in_memory() -> Result<Self, TrackerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:").await
            .map_err(|_| TrackerError::Store("Failed to open in-memory database".to_string()))?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    async fn init(&self) -> Result<(), TrackerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", STATE_TABLE_NAME, "(",
                ENTRY_KEY,   " TEXT PRIMARY KEY,",
                ENTRY_VALUE, " TEXT NOT NULL)")).await
            .map_err(|_| TrackerError::Store("Failed to initialize state table".to_string()))
            .map(|_| ())
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, TrackerError> {
        query_as::<_, (String,)>(concatcp!("SELECT ", ENTRY_VALUE, " FROM ", STATE_TABLE_NAME, " WHERE ", ENTRY_KEY, " = ?1"))
            .bind(key)
            .fetch_optional(&self.pool).await
            .map_err(|_| TrackerError::Store(format!("Failed to read key {key}")))
            .map(|row| row.map(|row| row.0))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), TrackerError> {
        query(concatcp!("INSERT OR REPLACE INTO ", STATE_TABLE_NAME, "(", ENTRY_KEY, ", ", ENTRY_VALUE, ") VALUES (?1, ?2)"))
            .bind(key)
            .bind(value)
            .execute(&self.pool).await
            .map_err(|_| TrackerError::Store(format!("Failed to write key {key}")))
            .map(|_| ())
    }

    pub async fn remove(&self, key: &str) -> Result<(), TrackerError> {
        query(concatcp!("DELETE FROM ", STATE_TABLE_NAME, " WHERE ", ENTRY_KEY, " = ?1"))
            .bind(key)
            .execute(&self.pool).await
            .map_err(|_| TrackerError::Store(format!("Failed to remove key {key}")))
            .map(|_| ())
    }

    pub async fn clear(&self) -> Result<(), TrackerError> {
        query(concatcp!("DELETE FROM ", STATE_TABLE_NAME))
            .execute(&self.pool).await
            .map_err(|_| TrackerError::Store("Failed to clear the store".to_string()))
            .map(|_| ())
    }

    pub async fn load_config(&self) -> Result<DriverConfig, TrackerError> {
        match self.get(CONFIG_KEY).await? {
            Some(value) => serde_json::from_str(&value)
                .map_err(|_| TrackerError::Store("Malformed configuration entry".to_string())),
            None => Ok(DriverConfig::default()),
        }
    }

    pub async fn save_config(&self, config: &DriverConfig) -> Result<(), TrackerError> {
        let value = serde_json::to_string(config)
            .map_err(|_| TrackerError::Store("Failed to serialize configuration".to_string()))?;
        self.set(CONFIG_KEY, &value).await
    }

    pub async fn load_session(&self) -> Result<WorkdaySession, TrackerError> {
        match self.get(WORKDAY_SESSION_KEY).await? {
            Some(value) => serde_json::from_str(&value)
                .map_err(|_| TrackerError::Store("Malformed workday session entry".to_string())),
            None => Ok(WorkdaySession::closed()),
        }
    }

    pub async fn save_session(&self, session: &WorkdaySession) -> Result<(), TrackerError> {
        let value = serde_json::to_string(session)
            .map_err(|_| TrackerError::Store("Failed to serialize workday session".to_string()))?;
        self.set(WORKDAY_SESSION_KEY, &value).await
    }

    /// Absent or malformed entries read as "no active trip", so a bad record
    /// never blocks startup. The explicit recovery path deals with the rest.
    pub async fn load_active_trip(&self) -> Result<Option<Trip>, TrackerError> {
        Ok(self.get(ACTIVE_TRIP_KEY).await?
            .and_then(|value| serde_json::from_str(&value).ok()))
    }

    pub async fn save_active_trip(&self, trip: Option<&Trip>) -> Result<(), TrackerError> {
        match trip {
            Some(trip) => {
                let value = serde_json::to_string(trip)
                    .map_err(|_| TrackerError::Store("Failed to serialize active trip".to_string()))?;
                self.set(ACTIVE_TRIP_KEY, &value).await
            }
            None => self.remove(ACTIVE_TRIP_KEY).await,
        }
    }

    pub async fn load_trip_log(&self) -> Result<Vec<Trip>, TrackerError> {
        match self.get(TRIP_LOG_KEY).await? {
            Some(value) => serde_json::from_str(&value)
                .map_err(|_| TrackerError::Store("Malformed trip log entry".to_string())),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save_trip_log(&self, trips: &[Trip]) -> Result<(), TrackerError> {
        let value = serde_json::to_string(trips)
            .map_err(|_| TrackerError::Store("Failed to serialize trip log".to_string()))?;
        self.set(TRIP_LOG_KEY, &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use route_control_lib::workday::SessionStatus;

    #[tokio::test]
    async fn raw_get_set_roundtrip() {
        let store = StateStore::connect_in_memory().await.unwrap();

        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_removes_every_key() {
        let store = StateStore::connect_in_memory().await.unwrap();
        store.set("a", "1").await.unwrap();
        store.set("b", "2").await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.get("b").await.unwrap(), None);
        assert_eq!(store.load_config().await.unwrap(), DriverConfig::default());
    }

    #[tokio::test]
    async fn config_defaults_when_absent() {
        let store = StateStore::connect_in_memory().await.unwrap();
        assert_eq!(store.load_config().await.unwrap(), DriverConfig::default());
    }

    #[tokio::test]
    async fn stored_records_reload_field_for_field() {
        let store = StateStore::connect_in_memory().await.unwrap();

        let config = DriverConfig {
            driver: "M. Duarte".to_string(),
            vehicle: "Nissan Versa 2020".to_string(),
            fuel_economy: 11.0,
            fuel_price: 27.5,
        };
        store.save_config(&config).await.unwrap();

        let opened_at = Utc.with_ymd_and_hms(2026, 3, 14, 6, 0, 0).unwrap();
        let session = WorkdaySession {
            status: SessionStatus::Open,
            opened_at: Some(opened_at),
            start_odometer: Some(500.0),
            closed_at: None,
            last_open: None,
        };
        store.save_session(&session).await.unwrap();

        let trip = Trip::start(
            opened_at.date_naive(),
            "Centro".to_string(),
            "deliveries".to_string(),
            500.0,
            opened_at,
        );
        store.save_active_trip(Some(&trip)).await.unwrap();

        let completed = trip.clone().complete(550.0, "", &config, opened_at);
        store.save_trip_log(&[completed.clone()]).await.unwrap();

        assert_eq!(store.load_config().await.unwrap(), config);
        assert_eq!(store.load_session().await.unwrap(), session);
        assert_eq!(store.load_active_trip().await.unwrap(), Some(trip));
        assert_eq!(store.load_trip_log().await.unwrap(), vec![completed]);
    }

    #[tokio::test]
    async fn malformed_active_trip_reads_as_none() {
        let store = StateStore::connect_in_memory().await.unwrap();
        store.set(ACTIVE_TRIP_KEY, "{not json").await.unwrap();
        assert_eq!(store.load_active_trip().await.unwrap(), None);

        store.remove(ACTIVE_TRIP_KEY).await.unwrap();
        assert_eq!(store.load_active_trip().await.unwrap(), None);
    }
}
