use const_format::concatcp;

pub mod database;
pub mod report;
mod data_manager;
mod session_manager;
mod trip_manager;

pub use data_manager::*;
pub use session_manager::SessionManager;
pub use trip_manager::{TripManager, TripStart};

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "route_control.db");
pub const EXPORT_DIR: &str = concatcp!(DATA_DIR, "exports");

#[derive(Debug)]
pub enum TrackerError {
    Validation(String),
    InvalidState(String),
    Store(String),
}
