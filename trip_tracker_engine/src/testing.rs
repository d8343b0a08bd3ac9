//! Recording stand-ins for the platform and the store.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use trip_tracker_lib::{location_sample::LocationSample, trip::Trip};

use crate::{
    clock::Clock,
    config::LocationConfig,
    error::{LocationSourceError, StoreError},
    location_source::{LocationSource, SampleSink, SubscriptionHandle},
    store::{TripCompletion, TripDraft, TripStore},
};

pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
struct SourceInner {
    sinks: Vec<SampleSink>,
    configs: Vec<LocationConfig>,
    reject: bool,
}

/// Keeps every sink it was handed so tests can play the platform.
#[derive(Clone, Default)]
pub struct MockLocationSource {
    inner: Arc<Mutex<SourceInner>>,
    unsubscribes: Arc<AtomicUsize>,
}

impl MockLocationSource {
    pub fn rejecting() -> Self {
        let source = Self::default();
        source.inner.lock().unwrap().reject = true;
        source
    }

    /// Delivers through the most recent subscription's sink.
    pub fn emit(&self, sample: LocationSample) {
        let sink = self.inner.lock().unwrap().sinks.last().cloned().expect("nothing subscribed");
        sink.deliver(sample);
    }

    /// Delivers through the sink of the n-th subscription ever made.
    pub fn emit_via(&self, subscription: usize, sample: LocationSample) {
        let sink = self.inner.lock().unwrap().sinks[subscription].clone();
        sink.deliver(sample);
    }

    pub fn subscribe_count(&self) -> usize {
        self.inner.lock().unwrap().sinks.len()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<LocationConfig> {
        self.inner.lock().unwrap().configs.last().cloned()
    }
}

struct MockHandle {
    unsubscribes: Arc<AtomicUsize>,
    done: bool,
}

impl SubscriptionHandle for MockHandle {
    fn unsubscribe(&mut self) {
        if !self.done {
            self.done = true;
            self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl LocationSource for MockLocationSource {
    fn subscribe(&self, config: &LocationConfig, sink: SampleSink) -> Result<Box<dyn SubscriptionHandle>, LocationSourceError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.reject {
            return Err(LocationSourceError::Rejected("mock rejects".into()));
        }
        inner.sinks.push(sink);
        inner.configs.push(config.clone());
        Ok(Box::new(MockHandle {
            unsubscribes: self.unsubscribes.clone(),
            done: false,
        }))
    }
}

#[derive(Default)]
struct StoreInner {
    trips: HashMap<i64, Trip>,
    next_id: i64,
    calls: usize,
    fail_create: bool,
    fail_update: bool,
    fail_read: bool,
}

#[derive(Clone, Default)]
pub struct MockTripStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl MockTripStore {
    pub fn fail_create(&self) {
        self.inner.lock().unwrap().fail_create = true;
    }

    pub fn fail_update(&self) {
        self.inner.lock().unwrap().fail_update = true;
    }

    pub fn fail_read(&self) {
        self.inner.lock().unwrap().fail_read = true;
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().calls
    }

    pub fn trip(&self, trip_id: i64) -> Option<Trip> {
        self.inner.lock().unwrap().trips.get(&trip_id).cloned()
    }
}

#[async_trait]
impl TripStore for MockTripStore {
    async fn create(&self, draft: &TripDraft) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls += 1;
        if inner.fail_create {
            return Err(StoreError::Database("create rejected".into()));
        }
        inner.next_id += 1;
        let trip_id = inner.next_id;
        inner.trips.insert(trip_id, Trip::new(trip_id, draft.profile_id.clone(), draft.purpose.clone(), draft.start_time));
        Ok(trip_id)
    }

    async fn update(&self, trip_id: i64, completion: &TripCompletion) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls += 1;
        if inner.fail_update {
            return Err(StoreError::Database("update rejected".into()));
        }
        let trip = inner.trips.get(&trip_id).cloned().ok_or(StoreError::NotFound(trip_id))?;
        let draft = TripDraft {
            profile_id: trip.profile_id,
            purpose: trip.purpose,
            start_time: trip.start_time,
        };
        inner.trips.insert(trip_id, completion.clone().into_trip(trip_id, draft));
        Ok(())
    }

    async fn read(&self, trip_id: i64) -> Result<Trip, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls += 1;
        if inner.fail_read {
            return Err(StoreError::Database("read rejected".into()));
        }
        inner.trips.get(&trip_id).cloned().ok_or(StoreError::NotFound(trip_id))
    }
}
