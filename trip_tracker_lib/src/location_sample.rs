use chrono::{DateTime, Utc};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

// geo_types points are (x, y) = (longitude, latitude)
impl From<Point> for Coordinate {
    fn from(point: Point) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinate> for Point {
    fn from(coordinate: Coordinate) -> Self {
        Point::new(coordinate.longitude, coordinate.latitude)
    }
}

/// One GPS fix as delivered by a location source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above sea level
    pub altitude: Option<f64>,
    /// Radius of the reported uncertainty, in meters
    pub accuracy: Option<f64>,
    /// Meters per second
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            speed: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn position(&self) -> Point {
        self.coordinate().into()
    }
}

/// Encodes a sample list as the blob stored alongside a trip.
pub fn encode_samples(samples: &[LocationSample]) -> Result<Vec<u8>, &'static str> {
    bincode::serialize(samples).map_err(|_| "Failed to serialize location samples")
}

pub fn decode_samples(bytes: &[u8]) -> Result<Vec<LocationSample>, &'static str> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    bincode::deserialize(bytes).map_err(|_| "Failed to deserialize location samples")
}
