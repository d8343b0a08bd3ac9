use std::{fmt, sync::Arc};

use trip_tracker_lib::location_sample::LocationSample;

use crate::{config::LocationConfig, error::LocationSourceError};

/// The callback a location source delivers samples to.
///
/// Cheap to clone, and safe to call from whatever thread the platform
/// delivers fixes on.
#[derive(Clone)]
pub struct SampleSink {
    callback: Arc<dyn Fn(LocationSample) + Send + Sync>,
}

impl SampleSink {
    pub fn new(callback: impl Fn(LocationSample) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    pub fn deliver(&self, sample: LocationSample) {
        (self.callback)(sample)
    }
}

impl fmt::Debug for SampleSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleSink {{ }}")
    }
}

/// Platform side of an active subscription.
pub trait SubscriptionHandle: Send {
    /// Stops delivery. Calling it more than once must be harmless.
    fn unsubscribe(&mut self);
}

/// Something that, once subscribed, keeps delivering samples to the sink until
/// the returned handle is unsubscribed.
pub trait LocationSource: Send + Sync {
    fn subscribe(&self, config: &LocationConfig, sink: SampleSink) -> Result<Box<dyn SubscriptionHandle>, LocationSourceError>;
}

/// Exclusive owner of one subscription. Unsubscribes exactly once, either on
/// `release` or when dropped.
pub struct Subscription {
    handle: Option<Box<dyn SubscriptionHandle>>,
}

impl Subscription {
    pub fn new(handle: Box<dyn SubscriptionHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.unsubscribe();
            tracing::debug!("Location subscription released");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscription {{ active: {} }}", self.is_active())
    }
}
