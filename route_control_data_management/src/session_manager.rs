use chrono::{NaiveDate, Utc};
use route_control_lib::workday::{OpenRecord, SessionStatus, WorkdaySession};

use crate::{TrackerError, database::db::StateStore};

/// Owns the workday record: the only writer of its store key.
#[derive(Clone)]
pub struct SessionManager {
    store: StateStore,
}

impl SessionManager {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }

    pub async fn current(&self) -> Result<WorkdaySession, TrackerError> {
        self.store.load_session().await
    }

    pub async fn open_day(&self, start_odometer: f64) -> Result<WorkdaySession, TrackerError> {
        if !start_odometer.is_finite() || start_odometer < 0.0 {
            return Err(TrackerError::Validation("Start odometer must be a number of at least 0".to_string()));
        }

        let mut session = self.store.load_session().await?;
        if session.is_open() {
            return Err(TrackerError::InvalidState("The workday is already open".to_string()));
        }

        let opened_at = Utc::now();
        session.status = SessionStatus::Open;
        session.opened_at = Some(opened_at);
        session.start_odometer = Some(start_odometer);
        session.closed_at = None;
        session.last_open = Some(OpenRecord { opened_at, start_odometer });
        self.store.save_session(&session).await?;

        tracing::info!("Workday opened at odometer {start_odometer}");
        Ok(session)
    }

    pub async fn close_day(&self) -> Result<WorkdaySession, TrackerError> {
        let mut session = self.store.load_session().await?;
        if !session.is_open() {
            return Err(TrackerError::InvalidState("The workday is already closed".to_string()));
        }

        session.status = SessionStatus::Closed;
        session.closed_at = Some(Utc::now());
        session.opened_at = None;
        session.start_odometer = None;
        self.store.save_session(&session).await?;

        tracing::info!("Workday closed");
        Ok(session)
    }

    /// Puts a closed day back into the open state it had before the close.
    /// Records stored before the snapshot existed reopen from scratch.
    pub async fn reopen_day(&self) -> Result<WorkdaySession, TrackerError> {
        let mut session = self.store.load_session().await?;
        if session.is_open() {
            return Err(TrackerError::InvalidState("The workday is already open".to_string()));
        }
        if session.closed_at.is_none() {
            return Err(TrackerError::InvalidState("No closed workday to reopen".to_string()));
        }

        let restored = session.last_open.unwrap_or(OpenRecord {
            opened_at: Utc::now(),
            start_odometer: 0.0,
        });
        session.status = SessionStatus::Open;
        session.opened_at = Some(restored.opened_at);
        session.start_odometer = Some(restored.start_odometer);
        session.closed_at = None;
        session.last_open = Some(restored);
        self.store.save_session(&session).await?;

        tracing::info!("Workday reopened");
        Ok(session)
    }

    pub async fn is_stale(&self, reference: NaiveDate) -> Result<bool, TrackerError> {
        Ok(self.store.load_session().await?.is_stale(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn manager() -> SessionManager {
        SessionManager::new(StateStore::connect_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn open_day_is_not_stale_today() {
        let manager = manager().await;
        let session = manager.open_day(500.0).await.unwrap();

        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.start_odometer, Some(500.0));
        assert!(session.opened_at.is_some());
        assert!(!manager.is_stale(Utc::now().date_naive()).await.unwrap());
    }

    #[tokio::test]
    async fn open_day_rejects_bad_odometer() {
        let manager = manager().await;

        let err = manager.open_day(-1.0).await.unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));

        let err = manager.open_day(f64::NAN).await.unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));

        assert_eq!(manager.current().await.unwrap(), WorkdaySession::closed());
    }

    #[tokio::test]
    async fn open_day_twice_fails_and_leaves_state_alone() {
        let manager = manager().await;
        let opened = manager.open_day(500.0).await.unwrap();

        let err = manager.open_day(600.0).await.unwrap_err();
        assert!(matches!(err, TrackerError::InvalidState(_)));
        assert_eq!(manager.current().await.unwrap(), opened);
    }

    #[tokio::test]
    async fn close_day_clears_the_open_state() {
        let manager = manager().await;
        manager.open_day(500.0).await.unwrap();

        let session = manager.close_day().await.unwrap();
        assert_eq!(session.status, SessionStatus::Closed);
        assert_eq!(session.opened_at, None);
        assert_eq!(session.start_odometer, None);
        assert!(session.closed_at.is_some());
    }

    #[tokio::test]
    async fn close_day_while_closed_fails() {
        let manager = manager().await;
        let err = manager.close_day().await.unwrap_err();
        assert!(matches!(err, TrackerError::InvalidState(_)));
    }

    #[tokio::test]
    async fn reopen_day_restores_the_prior_open_state() {
        let manager = manager().await;
        let opened = manager.open_day(1000.0).await.unwrap();
        manager.close_day().await.unwrap();

        let reopened = manager.reopen_day().await.unwrap();
        assert_eq!(reopened.status, SessionStatus::Open);
        assert_eq!(reopened.opened_at, opened.opened_at);
        assert_eq!(reopened.start_odometer, Some(1000.0));
        assert_eq!(reopened.closed_at, None);
    }

    #[tokio::test]
    async fn reopen_day_needs_a_prior_close() {
        let manager = manager().await;
        let err = manager.reopen_day().await.unwrap_err();
        assert!(matches!(err, TrackerError::InvalidState(_)));
    }

    #[tokio::test]
    async fn session_survives_a_second_manager_on_the_same_store() {
        let store = StateStore::connect_in_memory().await.unwrap();
        let first = SessionManager::new(store.clone());
        let opened = first.open_day(750.5).await.unwrap();

        let second = SessionManager::new(store);
        assert_eq!(second.current().await.unwrap(), opened);
    }
}
