use std::time::Duration;

/// How hard the location source should work for a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccuracyTier {
    Lowest,
    Low,
    #[default]
    Balanced,
    High,
    Highest,
}

pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MIN_DISTANCE_M: f64 = 10.0;

/// Handed to the location source when subscribing.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationConfig {
    pub accuracy: AccuracyTier,
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            accuracy: AccuracyTier::default(),
            min_interval: DEFAULT_MIN_INTERVAL,
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub location: LocationConfig,
    /// Samples reporting a larger accuracy radius (meters) than this are dropped.
    /// Off by default; samples without an accuracy are always kept.
    pub max_accuracy_m: Option<f64>,
    /// Upper bound on the final write and read back in `end_trip`.
    pub persistence_timeout: Option<Duration>,
}

impl EngineConfig {
    pub fn with_location(mut self, location: LocationConfig) -> Self {
        self.location = location;
        self
    }

    pub fn with_max_accuracy(mut self, max_accuracy_m: f64) -> Self {
        self.max_accuracy_m = Some(max_accuracy_m);
        self
    }

    pub fn with_persistence_timeout(mut self, timeout: Duration) -> Self {
        self.persistence_timeout = Some(timeout);
        self
    }
}
