use async_trait::async_trait;
use chrono::{DateTime, Utc};
use trip_tracker_lib::{location_sample::LocationSample, trip::{Trip, TripStatus}};

use crate::error::StoreError;

/// What is known about a trip when it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct TripDraft {
    pub profile_id: String,
    pub purpose: String,
    pub start_time: DateTime<Utc>,
}

/// Final values written when a trip ends.
#[derive(Debug, Clone, PartialEq)]
pub struct TripCompletion {
    pub end_time: DateTime<Utc>,
    pub distance_km: f64,
    pub distance_miles: f64,
    pub duration_minutes: f64,
    pub locations: Vec<LocationSample>,
}

impl TripCompletion {
    pub fn into_trip(self, trip_id: i64, draft: TripDraft) -> Trip {
        Trip {
            trip_id,
            profile_id: draft.profile_id,
            purpose: draft.purpose,
            start_time: draft.start_time,
            end_time: Some(self.end_time),
            status: TripStatus::Completed,
            distance_km: self.distance_km,
            distance_miles: self.distance_miles,
            duration_minutes: self.duration_minutes,
            locations: self.locations,
        }
    }
}

/// Durable home of trip records. Every call may fail.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Stores a new in-progress trip with zero distance and returns its id.
    async fn create(&self, draft: &TripDraft) -> Result<i64, StoreError>;

    /// Marks an in-progress trip completed with its final values.
    async fn update(&self, trip_id: i64, completion: &TripCompletion) -> Result<(), StoreError>;

    async fn read(&self, trip_id: i64) -> Result<Trip, StoreError>;
}
