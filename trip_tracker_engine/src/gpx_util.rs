use std::{fs::File, io::{BufReader, BufWriter}, path::Path, sync::Arc, time::{Duration, SystemTime}};

use chrono::{DateTime, Utc};
use gpx::{GpxVersion, Time, Track, TrackSegment, Waypoint};
use time::OffsetDateTime;
use tokio::{sync::Notify, task::JoinHandle};
use trip_tracker_lib::{geo_math, location_sample::LocationSample, trip::Trip};

use crate::{
    config::LocationConfig,
    error::{GpxError, LocationSourceError},
    location_source::{LocationSource, SampleSink, SubscriptionHandle},
};

pub struct GpxTrack {
    pub title: String,
    pub samples: Vec<LocationSample>,
}

pub fn read_gpx(path: &Path) -> Result<GpxTrack, GpxError> {
    let file = File::open(path)?;
    let gpx = gpx::read(BufReader::new(file))?;

    let title = gpx.metadata
        .and_then(|meta| meta.name)
        .unwrap_or_else(|| "Unnamed".to_string());

    let mut samples = Vec::new();
    for track in gpx.tracks {
        for segment in track.segments {
            for point in segment.points {
                let Some(time) = point.time else {
                    tracing::warn!("Skipping GPX point without a timestamp");
                    continue;
                };

                let position = point.point();
                let mut sample = LocationSample::new(position.y(), position.x(), parse_time(time)?);
                sample.altitude = point.elevation;
                sample.speed = point.speed;
                samples.push(sample);
            }
        }
    }

    if samples.is_empty() {
        return Err(GpxError::Empty);
    }

    Ok(GpxTrack { title, samples })
}

fn parse_time(time: Time) -> Result<DateTime<Utc>, GpxError> {
    let text = time.format().map_err(|err| GpxError::Time(err.to_string()))?;
    DateTime::parse_from_rfc3339(&text)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|err| GpxError::Time(err.to_string()))
}

fn to_gpx_time(time: DateTime<Utc>) -> Time {
    let time: SystemTime = time.into();
    let time: OffsetDateTime = time.into();
    Time::from(time)
}

/// Writes a trip's samples as a single-segment GPX 1.1 track.
pub fn export_gpx(trip: &Trip, path: &Path) -> Result<(), GpxError> {
    let mut gpx = gpx::Gpx::default();
    gpx.version = GpxVersion::Gpx11;
    gpx.metadata = Some(gpx::Metadata {
        name: Some(format!("{} ({})", trip.purpose, trip.trip_id)),
        time: Some(to_gpx_time(trip.start_time)),
        ..Default::default()
    });

    let mut segment = TrackSegment::new();
    for sample in &trip.locations {
        let mut waypoint = Waypoint::new(sample.position());
        waypoint.time = Some(to_gpx_time(sample.timestamp));
        waypoint.elevation = sample.altitude;
        waypoint.speed = sample.speed;
        segment.points.push(waypoint);
    }

    let mut track = Track::new();
    track.segments.push(segment);
    gpx.tracks.push(track);

    let file = File::create(path)?;
    gpx::write(&gpx, BufWriter::new(file))?;
    Ok(())
}

/// Mimics a platform location provider: a sample is only reported once both
/// the minimum interval has passed and the minimum distance has been covered
/// since the last reported sample.
pub fn throttle(samples: &[LocationSample], config: &LocationConfig) -> Vec<LocationSample> {
    let min_interval = chrono::Duration::from_std(config.min_interval).unwrap_or(chrono::Duration::MAX);
    let mut reported: Vec<LocationSample> = Vec::new();

    for sample in samples {
        let keep = match reported.last() {
            None => true,
            Some(last) => {
                let moved_m = geo_math::distance_km(last.coordinate(), sample.coordinate()) * 1000.0;
                sample.timestamp - last.timestamp >= min_interval && moved_m >= config.min_distance_m
            }
        };
        if keep {
            reported.push(sample.clone());
        }
    }

    reported
}

/// Location source that plays back a recorded GPX track.
///
/// Samples are paced by their recorded timestamps divided by `speedup`. A
/// speedup of zero or less delivers everything as fast as possible.
#[derive(Clone)]
pub struct GpxReplaySource {
    samples: Arc<Vec<LocationSample>>,
    speedup: f64,
    finished: Arc<Notify>,
}

impl GpxReplaySource {
    pub fn new(samples: Vec<LocationSample>, speedup: f64) -> Self {
        Self {
            samples: Arc::new(samples),
            speedup,
            finished: Arc::new(Notify::new()),
        }
    }

    pub fn from_file(path: &Path, speedup: f64) -> Result<Self, GpxError> {
        let track = read_gpx(path)?;
        tracing::info!("Loaded {} points from GPX track {:?}", track.samples.len(), track.title);
        Ok(Self::new(track.samples, speedup))
    }

    /// Resolves once a subscription has delivered its last sample.
    pub async fn finished(&self) {
        self.finished.notified().await
    }
}

/// How long to wait before replaying a sample recorded `gap` after the
/// previous one. None when there is nothing sensible to wait for.
fn replay_pause(gap: chrono::Duration, speedup: f64) -> Option<Duration> {
    if speedup <= 0.0 {
        return None;
    }
    let gap = gap.to_std().ok()?;
    Duration::try_from_secs_f64(gap.as_secs_f64() / speedup).ok()
}

struct ReplayHandle {
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle for ReplayHandle {
    fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl LocationSource for GpxReplaySource {
    fn subscribe(&self, config: &LocationConfig, sink: SampleSink) -> Result<Box<dyn SubscriptionHandle>, LocationSourceError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| LocationSourceError::Unavailable("GPX replay needs a tokio runtime".to_string()))?;

        let samples = throttle(&self.samples, config);
        tracing::debug!(
            accuracy = ?config.accuracy,
            "Replaying {} of {} GPX points",
            samples.len(),
            self.samples.len()
        );

        let speedup = self.speedup;
        let finished = self.finished.clone();
        let task = runtime.spawn(async move {
            let mut previous: Option<DateTime<Utc>> = None;
            for sample in samples {
                match previous.and_then(|previous| replay_pause(sample.timestamp - previous, speedup)) {
                    Some(pause) => tokio::time::sleep(pause).await,
                    None => tokio::task::yield_now().await,
                }
                previous = Some(sample.timestamp);
                sink.deliver(sample);
            }
            finished.notify_one();
        });

        Ok(Box::new(ReplayHandle { task: Some(task) }))
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, sync::Mutex};

    use chrono::Duration as ChronoDuration;

    use super::*;

    const TRACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="trip_tracker tests" xmlns="http://www.topografix.com/GPX/1/1">
  <metadata><name>Morning loop</name></metadata>
  <trk>
    <trkseg>
      <trkpt lat="55.6761" lon="12.5683"><ele>14</ele><time>2024-05-01T08:00:00Z</time></trkpt>
      <trkpt lat="55.6771" lon="12.5700"><time>2024-05-01T08:00:10Z</time></trkpt>
      <trkpt lat="55.6790" lon="12.5731"><time>2024-05-01T08:00:20Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>
"#;

    fn write_track(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn sample_at(latitude: f64, second: i64) -> LocationSample {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        LocationSample::new(latitude, 9.0, start + ChronoDuration::seconds(second))
    }

    #[test]
    fn reads_points_in_order() {
        let file = write_track(TRACK);
        let track = read_gpx(file.path()).unwrap();

        assert_eq!(track.title, "Morning loop");
        assert_eq!(track.samples.len(), 3);
        assert_eq!(track.samples[0].latitude, 55.6761);
        assert_eq!(track.samples[0].longitude, 12.5683);
        assert_eq!(track.samples[0].altitude, Some(14.0));
        assert_eq!(track.samples[2].timestamp, DateTime::parse_from_rfc3339("2024-05-01T08:00:20Z").unwrap());
    }

    #[test]
    fn track_without_points_is_rejected() {
        let file = write_track(r#"<?xml version="1.0"?><gpx version="1.1" creator="t" xmlns="http://www.topografix.com/GPX/1/1"></gpx>"#);
        assert!(matches!(read_gpx(file.path()), Err(GpxError::Empty)));
    }

    #[test]
    fn export_reads_back() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let mut trip = Trip::new(3, "alice".into(), "Survey".into(), start);
        trip.locations = vec![
            LocationSample::new(55.0, 9.0, start).with_altitude(12.0),
            LocationSample::new(55.001, 9.001, start + ChronoDuration::seconds(30)),
        ];

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trip.gpx");
        export_gpx(&trip, &path).unwrap();

        let track = read_gpx(&path).unwrap();
        assert_eq!(track.title, "Survey (3)");
        assert_eq!(track.samples.len(), 2);
        assert_eq!(track.samples[1].timestamp, trip.locations[1].timestamp);
        assert_eq!(track.samples[0].altitude, Some(12.0));
    }

    #[test]
    fn throttle_needs_both_time_and_distance() {
        let config = LocationConfig::default();
        let samples = vec![
            sample_at(55.0, 0),
            // 1 s later, 111 m away: too soon
            sample_at(55.001, 1),
            // 10 s later, but barely moved
            sample_at(55.00001, 10),
            // 10 s later and 222 m away
            sample_at(55.002, 20),
        ];

        let reported = throttle(&samples, &config);
        assert_eq!(reported.len(), 2);
        assert_eq!(reported[1].latitude, 55.002);
    }

    #[test]
    fn zero_limits_report_everything() {
        let config = LocationConfig {
            min_interval: Duration::ZERO,
            min_distance_m: 0.0,
            ..LocationConfig::default()
        };
        let samples = vec![sample_at(55.0, 0), sample_at(55.0, 0), sample_at(55.1, 0)];
        assert_eq!(throttle(&samples, &config).len(), 3);
    }

    #[tokio::test]
    async fn replay_delivers_every_point_then_finishes() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink_target = delivered.clone();
        let sink = SampleSink::new(move |sample| sink_target.lock().unwrap().push(sample));

        let samples = vec![sample_at(55.0, 0), sample_at(55.01, 10), sample_at(55.02, 20)];
        let source = GpxReplaySource::new(samples, 0.0);
        let config = LocationConfig {
            min_interval: Duration::ZERO,
            min_distance_m: 0.0,
            ..LocationConfig::default()
        };

        let mut handle = source.subscribe(&config, sink).unwrap();
        tokio::time::timeout(Duration::from_secs(5), source.finished()).await.unwrap();
        handle.unsubscribe();
        handle.unsubscribe();

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 3);
        assert_eq!(delivered[2].latitude, 55.02);
    }

    #[test]
    fn pause_scales_with_speedup() {
        assert_eq!(replay_pause(ChronoDuration::seconds(10), 2.0), Some(Duration::from_secs(5)));
        assert_eq!(replay_pause(ChronoDuration::seconds(10), 0.0), None);
        assert_eq!(replay_pause(ChronoDuration::seconds(-10), 1.0), None);
        // Too long to represent
        assert_eq!(replay_pause(ChronoDuration::seconds(10), 1e-300), None);
    }

    #[tokio::test]
    async fn replay_with_tiny_speedup_still_finishes() {
        let delivered = Arc::new(Mutex::new(0));
        let sink_target = delivered.clone();
        let sink = SampleSink::new(move |_| *sink_target.lock().unwrap() += 1);

        let samples = vec![sample_at(55.0, 0), sample_at(55.01, 10)];
        let source = GpxReplaySource::new(samples, 1e-300);
        let config = LocationConfig {
            min_interval: Duration::ZERO,
            min_distance_m: 0.0,
            ..LocationConfig::default()
        };

        let _handle = source.subscribe(&config, sink).unwrap();
        tokio::time::timeout(Duration::from_secs(5), source.finished()).await.unwrap();
        assert_eq!(*delivered.lock().unwrap(), 2);
    }

    #[test]
    fn replay_without_runtime_is_unavailable() {
        let source = GpxReplaySource::new(vec![sample_at(55.0, 0)], 0.0);
        let result = source.subscribe(&LocationConfig::default(), SampleSink::new(|_| {}));
        assert!(matches!(result, Err(LocationSourceError::Unavailable(_))));
    }
}
