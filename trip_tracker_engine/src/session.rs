use std::{
    mem,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
};

use chrono::{DateTime, Utc};
use trip_tracker_lib::{distance::DistanceAccumulator, location_sample::LocationSample, trip::Trip};

use crate::{
    clock::{Clock, SystemClock},
    config::EngineConfig,
    error::{StoreError, TripError},
    location_source::{LocationSource, SampleSink, Subscription},
    permission::{request_access, LocationAccess, PermissionGate},
    store::{TripCompletion, TripDraft, TripStore},
};

pub const BACKGROUND_DENIED_WARNING: &str =
    "Background location permission was denied. Tracking may pause while the app is not in the foreground.";

/// Returned by a successful `start_trip`.
#[derive(Debug, Clone, PartialEq)]
pub struct TripStarted {
    pub trip_id: i64,
    pub warning: Option<String>,
}

/// Snapshot returned by `get_status`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    NotTracking,
    Tracking {
        trip_id: i64,
        elapsed_minutes: f64,
        distance_km: f64,
        distance_miles: f64,
        sample_count: usize,
    },
}

struct ActiveTrip {
    /// Distinguishes this trip's sink from sinks handed out for earlier trips.
    epoch: u64,
    trip_id: i64,
    draft: TripDraft,
    accumulator: DistanceAccumulator,
    /// None only in the short window between entering Tracking and the
    /// location source answering the subscribe call.
    subscription: Option<Subscription>,
}

enum SessionState {
    Idle,
    /// A `start_trip` call owns the session while it talks to the store.
    Starting,
    Tracking(ActiveTrip),
}

struct Shared {
    state: Mutex<SessionState>,
    next_epoch: AtomicU64,
    max_accuracy_m: Option<f64>,
}

impl Shared {
    // The state is a plain enum that is only ever swapped whole, so a panic
    // elsewhere cannot leave it half written.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_epoch(&self) -> u64 {
        self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn accept(&self, active: &mut ActiveTrip, sample: LocationSample) {
        if let (Some(limit), Some(accuracy)) = (self.max_accuracy_m, sample.accuracy) {
            if accuracy > limit {
                tracing::debug!("Dropping sample with accuracy {accuracy} m (limit {limit} m)");
                return;
            }
        }

        active.accumulator.push(sample);
        tracing::trace!(
            trip_id = active.trip_id,
            samples = active.accumulator.sample_count(),
            distance_km = active.accumulator.total_km(),
            "Sample recorded"
        );
    }

    fn deliver(&self, epoch: u64, sample: LocationSample) {
        let mut state = self.lock();
        match &mut *state {
            SessionState::Tracking(active) if active.epoch == epoch => self.accept(active, sample),
            _ => tracing::debug!("Discarding sample delivered outside its trip"),
        }
    }
}

/// Puts the session back to Idle if a `start_trip` call bails out, or is
/// dropped, before it reaches Tracking.
struct StartReservation<'a> {
    shared: &'a Shared,
    committed: bool,
}

impl Drop for StartReservation<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut state = self.shared.lock();
        if matches!(*state, SessionState::Starting) {
            *state = SessionState::Idle;
        }
    }
}

/// Tracks a single trip at a time: collects location samples while tracking
/// and writes the finished trip to the store.
///
/// All state transitions go through one mutex, which is never held across an
/// await or a call into the location source.
pub struct TripSession<G, L, S> {
    shared: Arc<Shared>,
    gate: G,
    source: L,
    store: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl<G, L, S> TripSession<G, L, S>
where
    G: PermissionGate,
    L: LocationSource,
    S: TripStore,
{
    pub fn new(gate: G, source: L, store: S, config: EngineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState::Idle),
                next_epoch: AtomicU64::new(0),
                max_accuracy_m: config.max_accuracy_m,
            }),
            gate,
            source,
            store,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn start_trip(&self, profile_id: &str, purpose: &str) -> Result<TripStarted, TripError> {
        {
            let mut state = self.shared.lock();
            if !matches!(*state, SessionState::Idle) {
                tracing::warn!("Refusing to start a trip while another is in progress");
                return Err(TripError::AlreadyTracking);
            }
            *state = SessionState::Starting;
        }
        let mut reservation = StartReservation {
            shared: &self.shared,
            committed: false,
        };

        let warning = match request_access(&self.gate).await {
            LocationAccess::Denied => {
                tracing::warn!("Foreground location permission denied");
                return Err(TripError::PermissionDenied);
            }
            LocationAccess::ForegroundOnly => {
                tracing::warn!("Background location permission denied, continuing in foreground only");
                Some(BACKGROUND_DENIED_WARNING.to_string())
            }
            LocationAccess::Full => None,
        };

        let draft = TripDraft {
            profile_id: profile_id.to_string(),
            purpose: purpose.to_string(),
            start_time: self.clock.now(),
        };
        let trip_id = self.store.create(&draft).await.map_err(|err| {
            tracing::error!("Failed to create trip record: {err}");
            TripError::persistence(err)
        })?;

        let epoch = self.shared.next_epoch();
        {
            let mut state = self.shared.lock();
            *state = SessionState::Tracking(ActiveTrip {
                epoch,
                trip_id,
                draft,
                accumulator: DistanceAccumulator::new(),
                subscription: None,
            });
            reservation.committed = true;
        }

        let subscription = match self.source.subscribe(&self.config.location, self.sink(epoch)) {
            Ok(handle) => Subscription::new(handle),
            Err(err) => {
                tracing::error!(trip_id, "Failed to subscribe to location updates: {err}");
                let mut state = self.shared.lock();
                if matches!(&*state, SessionState::Tracking(active) if active.epoch == epoch) {
                    *state = SessionState::Idle;
                }
                return Err(TripError::LocationSourceFailure {
                    source: err,
                    trip_id: Some(trip_id),
                });
            }
        };

        // The trip may have been ended while subscribing. Then nobody else
        // will ever release this subscription, so do it here.
        let stale = {
            let mut state = self.shared.lock();
            match &mut *state {
                SessionState::Tracking(active) if active.epoch == epoch => {
                    active.subscription = Some(subscription);
                    None
                }
                _ => Some(subscription),
            }
        };
        if let Some(mut subscription) = stale {
            tracing::warn!(trip_id, "Trip ended before its subscription was installed");
            subscription.release();
        }

        tracing::info!(trip_id, profile_id, purpose, "Trip started");
        Ok(TripStarted { trip_id, warning })
    }

    /// Records a sample for the trip in progress. Samples arriving while no
    /// trip is tracking are dropped.
    pub fn on_location(&self, sample: LocationSample) {
        let mut state = self.shared.lock();
        match &mut *state {
            SessionState::Tracking(active) => self.shared.accept(active, sample),
            _ => tracing::debug!("Discarding sample while not tracking"),
        }
    }

    pub async fn end_trip(&self) -> Result<Trip, TripError> {
        let active = {
            let mut state = self.shared.lock();
            match mem::replace(&mut *state, SessionState::Idle) {
                SessionState::Tracking(active) => active,
                other => {
                    *state = other;
                    return Err(TripError::NotTracking);
                }
            }
        };

        let ActiveTrip {
            trip_id,
            draft,
            accumulator,
            subscription,
            ..
        } = active;

        // Released before touching the store so a failed write can't leak it
        if let Some(mut subscription) = subscription {
            subscription.release();
        }

        let end_time = self.clock.now();
        let completion = TripCompletion {
            end_time,
            distance_km: accumulator.total_km(),
            distance_miles: accumulator.total_miles(),
            duration_minutes: minutes_between(draft.start_time, end_time),
            locations: accumulator.into_samples(),
        };

        tracing::info!(
            trip_id,
            distance_km = completion.distance_km,
            duration_minutes = completion.duration_minutes,
            samples = completion.locations.len(),
            "Trip ended"
        );

        match self.persist_completion(trip_id, &completion).await {
            Ok(trip) => Ok(trip),
            Err(source) => {
                tracing::error!(trip_id, "Failed to persist completed trip: {source}");
                Err(TripError::PersistenceFailure {
                    source,
                    unsaved: Some(Box::new(completion.into_trip(trip_id, draft))),
                })
            }
        }
    }

    pub fn get_status(&self) -> SessionStatus {
        let state = self.shared.lock();
        match &*state {
            SessionState::Tracking(active) => SessionStatus::Tracking {
                trip_id: active.trip_id,
                elapsed_minutes: minutes_between(active.draft.start_time, self.clock.now()),
                distance_km: active.accumulator.total_km(),
                distance_miles: active.accumulator.total_miles(),
                sample_count: active.accumulator.sample_count(),
            },
            _ => SessionStatus::NotTracking,
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(*self.shared.lock(), SessionState::Tracking(_))
    }

    async fn persist_completion(&self, trip_id: i64, completion: &TripCompletion) -> Result<Trip, StoreError> {
        let persist = async {
            self.store.update(trip_id, completion).await?;
            self.store.read(trip_id).await
        };

        match self.config.persistence_timeout {
            Some(limit) => tokio::time::timeout(limit, persist).await.unwrap_or(Err(StoreError::Timeout)),
            None => persist.await,
        }
    }

    fn sink(&self, epoch: u64) -> SampleSink {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        SampleSink::new(move |sample| {
            if let Some(shared) = shared.upgrade() {
                shared.deliver(epoch, sample);
            }
        })
    }
}

fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds().max(0);
    millis as f64 / 60_000.0
}
