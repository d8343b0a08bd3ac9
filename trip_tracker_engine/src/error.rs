use trip_tracker_lib::trip::Trip;

/// Everything `TripSession` can refuse or fail with. None of these are fatal,
/// the session is always left in a usable state.
#[derive(Debug, thiserror::Error)]
pub enum TripError {
    #[error("Foreground location permission was denied")]
    PermissionDenied,

    #[error("A trip is already in progress")]
    AlreadyTracking,

    #[error("No trip is in progress")]
    NotTracking,

    /// `unsaved` holds the completed trip when the failure happened while
    /// finishing it, so the caller can retry the write.
    #[error("Trip persistence failed: {source}")]
    PersistenceFailure {
        #[source]
        source: StoreError,
        unsaved: Option<Box<Trip>>,
    },

    /// `trip_id` names the record that was already created and is left
    /// `in_progress`, so the caller can reconcile it.
    #[error("Location source failed: {source}")]
    LocationSourceFailure {
        #[source]
        source: LocationSourceError,
        trip_id: Option<i64>,
    },
}

impl TripError {
    pub(crate) fn persistence(source: StoreError) -> Self {
        TripError::PersistenceFailure { source, unsaved: None }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Trip {0} not found")]
    NotFound(i64),

    #[error("Failed to encode trip data: {0}")]
    Encoding(String),

    #[error("Trip store did not respond in time")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationSourceError {
    #[error("Location source unavailable: {0}")]
    Unavailable(String),

    #[error("Subscription rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GpxError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid GPX: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("Invalid GPX timestamp: {0}")]
    Time(String),

    #[error("GPX file contains no track points")]
    Empty,
}
