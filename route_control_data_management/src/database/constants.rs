#![allow(dead_code)]

pub const STATE_TABLE_NAME: &str = "StateEntries";
pub const ENTRY_KEY: &str = "entry_key";
pub const ENTRY_VALUE: &str = "entry_value";

// Store keys, one per owned record.
pub const CONFIG_KEY: &str = "config";
pub const WORKDAY_SESSION_KEY: &str = "workday_session";
pub const ACTIVE_TRIP_KEY: &str = "active_trip";
pub const TRIP_LOG_KEY: &str = "trip_log";
