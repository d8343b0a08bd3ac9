use crate::{geo_math, location_sample::LocationSample};

/// Append-only sample list with a running distance total.
///
/// Segments are only ever measured between temporally adjacent samples, in the
/// order they were pushed. `push` is the only mutator, so the running sum is
/// always equal to summing the segments from scratch.
#[derive(Debug, Clone, Default)]
pub struct DistanceAccumulator {
    samples: Vec<LocationSample>,
    total_km: f64,
}

impl DistanceAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: LocationSample) {
        if let Some(previous) = self.samples.last() {
            self.total_km += geo_math::distance_km(previous.coordinate(), sample.coordinate());
        }
        self.samples.push(sample);
    }

    pub fn total_km(&self) -> f64 {
        self.total_km
    }

    pub fn total_miles(&self) -> f64 {
        geo_math::km_to_miles(self.total_km)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn into_samples(self) -> Vec<LocationSample> {
        self.samples
    }
}
