use std::path::PathBuf;

use const_format::concatcp;

pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod gpx_util;
pub mod location_source;
pub mod permission;
pub mod session;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{GpxError, LocationSourceError, StoreError, TripError};
pub use session::{SessionStatus, TripSession, TripStarted};

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "trips.db");

/// Default database location, relative to the project root when one can be found.
pub fn default_database_path() -> PathBuf {
    match project_root::get_project_root() {
        Ok(root) => root.join(DATABASE_PATH),
        Err(_) => PathBuf::from(DATABASE_PATH),
    }
}
