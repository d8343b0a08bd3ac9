pub const TRIPS_TABLE_NAME: &str = "Trips";
pub const TRIP_ID: &str = "trip_id";
pub const PROFILE_ID: &str = "profile_id";
pub const PURPOSE: &str = "purpose";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const STATUS: &str = "status";
pub const DISTANCE_KM: &str = "distance_km";
pub const DISTANCE_MILES: &str = "distance_miles";
pub const DURATION_MINUTES: &str = "duration_minutes";
pub const LOCATIONS: &str = "locations";

pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_COMPLETED: &str = "completed";
