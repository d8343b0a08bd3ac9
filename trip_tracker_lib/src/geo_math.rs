use crate::location_sample::Coordinate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const MILES_PER_KM: f64 = 0.621371;

/// Great-circle distance in kilometers using the haversine formula.
///
/// Coordinates are not range checked. Out of range input still produces a
/// number, it just does not mean anything physical.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair outside [0, 1], which would make sqrt(1 - h) NaN
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn km_to_miles(km: f64) -> f64 {
    km * MILES_PER_KM
}
