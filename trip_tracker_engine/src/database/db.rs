use std::{path::Path, str::FromStr};

use async_trait::async_trait;
use const_format::concatcp;
use sqlx::{
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Pool, Sqlite, SqlitePool,
};
use trip_tracker_lib::{location_sample::encode_samples, trip::Trip};

use crate::{
    error::StoreError,
    store::{TripCompletion, TripDraft, TripStore},
};

use super::constants::*;

const SELECT_TRIP: &str = concatcp!("SELECT ",
    TRIP_ID, ", ", PROFILE_ID, ", ", PURPOSE, ", ", START_TIME, ", ", END_TIME, ", ",
    STATUS, ", ", DISTANCE_KM, ", ", DISTANCE_MILES, ", ", DURATION_MINUTES, ", ", LOCATIONS,
    " FROM ", TRIPS_TABLE_NAME);

/// `TripStore` backed by a SQLite database.
#[derive(Clone)]
pub struct SqliteTripStore {
    pool: Pool<Sqlite>,
}

impl SqliteTripStore {
    pub async fn connect(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await
            .map_err(|_| StoreError::Database(format!("Failed to connect to database at {:?}", path)))?;

        let store = Self {
            pool
        };
        store.init().await?;

        tracing::info!("Connected to trip database at {:?}", path);
        Ok(store)
    }

    /// A private database that lives as long as the store. The pool is pinned
    /// to a single connection, since every in-memory connection is its own database.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|_| StoreError::Database("Invalid in-memory database options".to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options).await
            .map_err(|_| StoreError::Database("Failed to open in-memory database".to_string()))?;

        let store = Self {
            pool
        };
        store.init().await?;
        Ok(store)
    }

    pub async fn init(&self) -> Result<(), StoreError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", TRIPS_TABLE_NAME, "(",
                TRIP_ID,          " INTEGER PRIMARY KEY AUTOINCREMENT,",
                PROFILE_ID,       " TEXT NOT NULL,",
                PURPOSE,          " TEXT NOT NULL,",
                START_TIME,       " TIMESTAMP NOT NULL,",
                END_TIME,         " TIMESTAMP,",
                STATUS,           " TEXT NOT NULL,",
                DISTANCE_KM,      " REAL NOT NULL,",
                DISTANCE_MILES,   " REAL NOT NULL,",
                DURATION_MINUTES, " REAL NOT NULL,",
                LOCATIONS,        " BLOB NOT NULL
            )")).await
            .map_err(|_| StoreError::Database("Failed to create trips table".to_string()))
            .map(|_| ())
    }

    pub async fn insert_trip(&self, draft: &TripDraft) -> Result<i64, StoreError> {
        let trip_id = query_as::<_, (i64,)>(concatcp!("
            INSERT INTO ", TRIPS_TABLE_NAME, "(",
            PROFILE_ID, ", ", PURPOSE, ", ", START_TIME, ", ", END_TIME, ", ", STATUS, ", ",
            DISTANCE_KM, ", ", DISTANCE_MILES, ", ", DURATION_MINUTES, ", ", LOCATIONS, ")
            VALUES (?1, ?2, ?3, NULL, '", STATUS_IN_PROGRESS, "', 0.0, 0.0, 0.0, ?4) RETURNING ", TRIP_ID))
                .bind(&draft.profile_id)
                .bind(&draft.purpose)
                .bind(draft.start_time)
                .bind(Vec::<u8>::new())
                .fetch_one(&self.pool).await
                .map_err(|_| StoreError::Database("Failed to insert trip".to_string()))
                .map(|row| row.0)?;

        tracing::debug!(trip_id, "Inserted trip");
        Ok(trip_id)
    }

    /// Only trips still in progress can be completed, so a trip is completed at most once.
    pub async fn complete_trip(&self, trip_id: i64, completion: &TripCompletion) -> Result<(), StoreError> {
        let locations = encode_samples(&completion.locations)
            .map_err(|err| StoreError::Encoding(err.to_string()))?;

        let result = query(concatcp!("UPDATE ", TRIPS_TABLE_NAME, " SET ",
            END_TIME, " = ?1, ",
            STATUS, " = '", STATUS_COMPLETED, "', ",
            DISTANCE_KM, " = ?2, ",
            DISTANCE_MILES, " = ?3, ",
            DURATION_MINUTES, " = ?4, ",
            LOCATIONS, " = ?5
            WHERE ", TRIP_ID, " = ?6 AND ", STATUS, " = '", STATUS_IN_PROGRESS, "'"))
                .bind(completion.end_time)
                .bind(completion.distance_km)
                .bind(completion.distance_miles)
                .bind(completion.duration_minutes)
                .bind(locations)
                .bind(trip_id)
                .execute(&self.pool).await
                .map_err(|_| StoreError::Database("Failed to complete trip".to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(trip_id));
        }
        Ok(())
    }

    pub async fn get_trip(&self, trip_id: i64) -> Result<Trip, StoreError> {
        query_as::<_, Trip>(concatcp!(SELECT_TRIP, " WHERE ", TRIP_ID, " = ?1"))
            .bind(trip_id)
            .fetch_optional(&self.pool).await
            .map_err(|_| StoreError::Database("Failed to get trip".to_string()))?
            .ok_or(StoreError::NotFound(trip_id))
    }

    pub async fn get_trips(&self, profile_id: Option<&str>) -> Result<Vec<Trip>, StoreError> {
        let trips = match profile_id {
            Some(profile_id) => query_as::<_, Trip>(concatcp!(SELECT_TRIP, " WHERE ", PROFILE_ID, " = ?1 ORDER BY ", START_TIME))
                .bind(profile_id)
                .fetch_all(&self.pool).await,
            None => query_as::<_, Trip>(concatcp!(SELECT_TRIP, " ORDER BY ", START_TIME))
                .fetch_all(&self.pool).await,
        };

        trips.map_err(|_| StoreError::Database("Failed to get trips".to_string()))
    }
}

#[async_trait]
impl TripStore for SqliteTripStore {
    async fn create(&self, draft: &TripDraft) -> Result<i64, StoreError> {
        self.insert_trip(draft).await
    }

    async fn update(&self, trip_id: i64, completion: &TripCompletion) -> Result<(), StoreError> {
        self.complete_trip(trip_id, completion).await
    }

    async fn read(&self, trip_id: i64) -> Result<Trip, StoreError> {
        self.get_trip(trip_id).await
    }
}
