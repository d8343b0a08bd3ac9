use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trip_tracker_engine::{
    config::{EngineConfig, LocationConfig},
    database::db::SqliteTripStore,
    default_database_path,
    gpx_util::{export_gpx, GpxReplaySource},
    permission::StaticPermissionGate,
    TripSession,
};
use trip_tracker_lib::trip::Trip;

#[derive(Parser)]
#[command(name = "trip_cli")]
#[command(about = "A CLI to record and inspect trips", long_about = None)]
struct Cli {
    /// SQLite database file. Defaults to data/trips.db in the project root
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a trip by replaying a GPX track through the tracking engine
    Replay {
        gpx_file: PathBuf,
        #[arg(long, default_value = "default")]
        profile: String,
        #[arg(long, default_value = "Replay")]
        purpose: String,
        /// Playback speed relative to the recording. 0 replays as fast as possible
        #[arg(long, default_value_t = 0.0)]
        speedup: f64,
        /// Act as if background location access was refused
        #[arg(long)]
        deny_background: bool,
        /// Drop samples reporting a worse accuracy than this many meters
        #[arg(long)]
        max_accuracy: Option<f64>,
        #[arg(long, default_value_t = 5)]
        min_interval_secs: u64,
        #[arg(long, default_value_t = 10.0)]
        min_distance_m: f64,
        /// Give up on saving the finished trip after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// List trips, optionally for a single profile
    List {
        #[arg(long)]
        profile: Option<String>,
    },
    /// Print a single trip
    Show { trip_id: i64 },
    /// Write the recorded samples of a trip to a GPX file
    ExportGpx { trip_id: i64, output: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace,trip_tracker_engine=trace", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let database = cli.database.unwrap_or_else(default_database_path);
    if let Some(dir) = database.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let store = SqliteTripStore::connect(&database).await?;

    match cli.command {
        Commands::Replay {
            gpx_file,
            profile,
            purpose,
            speedup,
            deny_background,
            max_accuracy,
            min_interval_secs,
            min_distance_m,
            timeout_secs,
        } => {
            let source = GpxReplaySource::from_file(&gpx_file, speedup)?;
            let gate = if deny_background {
                StaticPermissionGate::foreground_only()
            } else {
                StaticPermissionGate::granted()
            };

            let mut config = EngineConfig::default().with_location(LocationConfig {
                min_interval: Duration::from_secs(min_interval_secs),
                min_distance_m,
                ..LocationConfig::default()
            });
            if let Some(max_accuracy) = max_accuracy {
                config = config.with_max_accuracy(max_accuracy);
            }
            if let Some(timeout_secs) = timeout_secs {
                config = config.with_persistence_timeout(Duration::from_secs(timeout_secs));
            }

            let session = TripSession::new(gate, source.clone(), store, config);
            let started = session.start_trip(&profile, &purpose).await?;
            if let Some(warning) = &started.warning {
                tracing::warn!("{warning}");
            }
            tracing::info!("Recording trip {}", started.trip_id);

            tokio::select! {
                _ = source.finished() => tracing::info!("Replay finished"),
                _ = tokio::signal::ctrl_c() => tracing::warn!("Interrupted, ending trip early"),
            }

            let trip = session.end_trip().await?;
            print_trip(&trip);
        },
        Commands::List { profile } => {
            for trip in store.get_trips(profile.as_deref()).await? {
                print_trip(&trip);
            }
        },
        Commands::Show { trip_id } => {
            let trip = store.get_trip(trip_id).await?;
            print_trip(&trip);
            for sample in &trip.locations {
                println!("  {}\t{:.6}\t{:.6}", sample.timestamp.format("%d/%m/%Y %H:%M:%S"), sample.latitude, sample.longitude);
            }
        },
        Commands::ExportGpx { trip_id, output } => {
            let trip = store.get_trip(trip_id).await?;
            export_gpx(&trip, &output)?;
            println!("Wrote {} points to {:?}", trip.locations.len(), output);
        },
    }

    Ok(())
}

fn print_trip(trip: &Trip) {
    println!(
        "{}\t{}\t{}\t{}\t{:.2} km\t{:.2} mi\t{:.1} min\t{}",
        trip.trip_id,
        trip.status,
        trip.start_time.format("%d/%m/%Y %H:%M (UTC)"),
        trip.profile_id,
        trip.distance_km,
        trip.distance_miles,
        trip.duration_minutes,
        trip.purpose,
    )
}
