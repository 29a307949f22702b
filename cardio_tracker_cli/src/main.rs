use std::{fs::OpenOptions, path::{Path, PathBuf}};

use anyhow::{bail, Context};
use cardio_tracker_data_management::{gpx_util, DataManager, HistoryRecorder, LocalHistory};
use cardio_tracker_lib::{geodesy::haversine_distance, units, FixDecision};
use clap::{Parser, Subcommand};
use configuration::Configuration;
use session_tracker::{FixOutcome, ReplayLocationSource, SessionTracker};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod configuration;

#[derive(Parser)]
#[command(name = "cardio")]
#[command(about = "Track cardio sessions from recorded GPS data", long_about = None)]
struct Cli {
    /// key = value configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded GPX file as a live session and record the result
    Replay {
        gpx_file: PathBuf,
        /// Write the accepted route to this GPX file
        #[arg(long)]
        export: Option<PathBuf>,
        /// Do not add the session to the history
        #[arg(long)]
        no_record: bool,
    },
    /// List recorded sessions, newest first
    History {
        #[arg(long)]
        json: bool,
        /// Show only the session with this id
        #[arg(long, conflicts_with = "delete")]
        show: Option<i64>,
        /// Remove the session with this id from the history
        #[arg(long)]
        delete: Option<i64>,
    },
    /// Great-circle distance between two points, in degrees
    #[command(allow_negative_numbers = true)]
    Distance {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
    },
}

#[derive(Default)]
struct FixTally {
    accepted: usize,
    low_accuracy: usize,
    jitter: usize,
    malformed: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Configuration::load(path)?,
        None => Configuration::default(),
    };

    init_logging(&config.log_dir)?;
    for key in &config.unknown_keys {
        tracing::warn!("Unknown config key: {}", key);
    }

    match cli.command {
        Commands::Replay { gpx_file, export, no_record } => {
            replay(&config, &gpx_file, export.as_deref(), no_record).await?;
        },
        Commands::History { json, show, delete } => {
            history(&config, json, show, delete).await?;
        },
        Commands::Distance { lat1, lon1, lat2, lon2 } => {
            let meters = haversine_distance((lat1, lon1), (lat2, lon2));
            println!("{:.1} m ({})", meters, units::format_distance(meters));
        },
    }

    Ok(())
}

fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir).with_context(|| format!("Failed to create log directory {log_dir:?}"))?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("tracker.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=info,session_tracker=info,cardio_tracker_data_management=info", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    Ok(())
}

async fn open_data_manager(config: &Configuration) -> anyhow::Result<DataManager> {
    let data_manager = match &config.data_dir {
        Some(dir) => DataManager::start(dir).await?,
        None => DataManager::start_in_project().await?,
    };
    Ok(data_manager)
}

async fn history(config: &Configuration, json: bool, show: Option<i64>, delete: Option<i64>) -> anyhow::Result<()> {
    let data_manager = open_data_manager(config).await?;

    if let Some(id) = delete {
        if !data_manager.forget_session(id).await? {
            bail!("No session with id {id}");
        }
        tracing::info!("Removed session {}", id);
        println!("Session {id} removed");
        return Ok(());
    }

    if let Some(id) = show {
        let session = data_manager.get_session(id).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&session)?);
        } else {
            println!("Id: {id}\n{}", session.describe());
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&data_manager.get_sessions().await?)?);
        return Ok(());
    }

    let entries = data_manager.get_session_entries().await?;
    if entries.is_empty() {
        println!("No sessions recorded yet");
    }
    for (id, session) in entries {
        println!("Id: {id}\n{}\n", session.describe());
    }

    Ok(())
}

async fn replay(config: &Configuration, gpx_file: &Path, export: Option<&Path>, no_record: bool) -> anyhow::Result<()> {
    let fixes = gpx_util::read_gpx(gpx_file)?;
    if fixes.is_empty() {
        bail!("{gpx_file:?} has no timestamped points to replay");
    }
    let source = ReplayLocationSource::new(fixes);
    tracing::info!("Replaying {} fixes from {:?}", source.len(), gpx_file);
    let clock = source.clock();
    let (history_tx, history_rx) = mpsc::unbounded_channel();

    let recorder = if no_record {
        HistoryRecorder::spawn(LocalHistory::new(), history_rx)
    } else {
        HistoryRecorder::spawn(open_data_manager(config).await?, history_rx)
    };

    let mut tracker = SessionTracker::new(source, history_tx)
        .with_clock(clock)
        .with_filter(config.filter);

    tracker.start().await?;

    let mut tally = FixTally::default();
    while let Some(outcome) = tracker.next_fix().await {
        match outcome {
            FixOutcome::Processed(FixDecision::Accepted { .. }) => tally.accepted += 1,
            FixOutcome::Processed(FixDecision::LowAccuracy { .. }) => tally.low_accuracy += 1,
            FixOutcome::Processed(FixDecision::Jitter { .. }) => tally.jitter += 1,
            FixOutcome::Malformed(_) => tally.malformed += 1,
            FixOutcome::Ignored => {},
        }
    }

    let metrics = tracker.metrics();
    println!(
        "Accepted {} fixes, dropped {} inaccurate, {} jitter, {} malformed",
        tally.accepted, tally.low_accuracy, tally.jitter, tally.malformed
    );
    println!("Speed: {}  Elevation: {}", metrics.display_speed(), metrics.display_elevation());

    if let Some(path) = export {
        let name = gpx_file.file_stem().and_then(|stem| stem.to_str()).unwrap_or("Cardio session");
        gpx_util::write_gpx(tracker.route().fixes(), name, path)?;
        tracing::info!("Exported route to {:?}", path);
    }

    let summary = tracker.finish()?;

    // Dropping the tracker closes the history sink so the recorder can finish.
    drop(tracker);
    let recorded = recorder.await.context("History recorder panicked")?;
    if recorded == 0 {
        bail!("Session could not be recorded");
    }

    println!("{}", summary.describe());
    if no_record {
        println!("(not saved)");
    } else {
        println!("Workout saved to history!");
    }

    Ok(())
}
