use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "sqlx")]
use sqlx::{prelude::*, sqlite::SqliteRow};

use crate::location_sample::LocationSample;
#[cfg(feature = "sqlx")]
use crate::location_sample::decode_samples;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    InProgress,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(TripStatus::InProgress),
            "completed" => Ok(TripStatus::Completed),
            other => Err(format!("Unknown trip status: {other}")),
        }
    }
}

/// The persisted record of one trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub trip_id: i64,
    pub profile_id: String,
    pub purpose: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: TripStatus,
    pub distance_km: f64,
    pub distance_miles: f64,
    pub duration_minutes: f64,
    pub locations: Vec<LocationSample>,
}

#[cfg(feature = "sqlx")]
impl FromRow<'_, SqliteRow> for Trip {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let status: String = row.try_get(5)?;
        let status = TripStatus::from_str(&status).map_err(|err| sqlx::Error::ColumnDecode {
            index: "5".into(),
            source: err.into(),
        })?;

        let locations: Vec<u8> = row.try_get(9)?;
        let locations = decode_samples(&locations).map_err(|err| sqlx::Error::ColumnDecode {
            index: "9".into(),
            source: err.into(),
        })?;

        Ok(Self {
            trip_id: row.try_get(0)?,
            profile_id: row.try_get(1)?,
            purpose: row.try_get(2)?,
            start_time: row.try_get(3)?,
            end_time: row.try_get(4)?,
            status,
            distance_km: row.try_get(6)?,
            distance_miles: row.try_get(7)?,
            duration_minutes: row.try_get(8)?,
            locations,
        })
    }
}

impl Trip {
    /// A freshly started trip: in progress, nothing travelled yet.
    pub fn new(trip_id: i64, profile_id: String, purpose: String, start_time: DateTime<Utc>) -> Self {
        Self {
            trip_id,
            profile_id,
            purpose,
            start_time,
            end_time: None,
            status: TripStatus::InProgress,
            distance_km: 0.0,
            distance_miles: 0.0,
            duration_minutes: 0.0,
            locations: Vec::new(),
        }
    }
}
