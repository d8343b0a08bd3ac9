pub mod geo_math;
pub mod distance;
pub mod location_sample;
pub mod trip;
