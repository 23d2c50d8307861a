use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Closed,
    Open,
}

/// Snapshot of the most recent open state, kept across a close so a
/// reopened day gets its original start back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenRecord {
    pub opened_at: DateTime<Utc>,
    pub start_odometer: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkdaySession {
    pub status: SessionStatus,
    pub opened_at: Option<DateTime<Utc>>,
    pub start_odometer: Option<f64>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_open: Option<OpenRecord>,
}

impl Default for WorkdaySession {
    fn default() -> Self {
        Self::closed()
    }
}

impl WorkdaySession {
    pub fn closed() -> Self {
        Self {
            status: SessionStatus::Closed,
            opened_at: None,
            start_odometer: None,
            closed_at: None,
            last_open: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Calendar day this session belongs to, while it is open.
    pub fn day_key(&self) -> Option<NaiveDate> {
        self.opened_at.map(|opened_at| opened_at.date_naive())
    }

    /// An open session left over from an earlier calendar day. Pure query,
    /// the caller decides whether to surface a pending-closure alert.
    pub fn is_stale(&self, reference: NaiveDate) -> bool {
        match (self.status, self.opened_at) {
            (SessionStatus::Open, Some(opened_at)) => opened_at.date_naive() != reference,
            _ => false,
        }
    }
}
