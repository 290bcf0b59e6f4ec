//! DriveScore - Driving Smoothness Scoring Engine
//!
//! Runs one simulated session for the configured duration and prints the
//! resulting score record as JSON.

use anyhow::Context;
use drivescore::recording::{ScoreRecord, SessionSummary};
use drivescore::session::{SessionDriver, SessionSources, SessionUpdate};
use drivescore::storage::load_config;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Minimum spacing between logged snapshots.
const SNAPSHOT_LOG_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting drivescore v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config().context("failed to load configuration")?;
    config
        .engine
        .validate()
        .context("invalid engine configuration")?;
    config
        .simulation
        .validate()
        .context("invalid simulation configuration")?;
    tracing::info!("Using data directory {}", config.data_dir.display());

    let sources = SessionSources::simulated(&config.simulation);
    let (driver, handle, updates) = SessionDriver::new(&config.engine, sources);

    let consumer = std::thread::spawn(move || {
        let mut last_logged: Option<Instant> = None;
        let mut record: Option<ScoreRecord> = None;

        for update in updates.iter() {
            match update {
                SessionUpdate::Started => tracing::info!("Session running"),
                SessionUpdate::Snapshot(snapshot) => {
                    let due = last_logged
                        .map(|at| at.elapsed() >= SNAPSHOT_LOG_INTERVAL)
                        .unwrap_or(true);
                    if due {
                        tracing::info!(
                            "t={:.1}s avg_acc={:.3} speed={:.1} top={:.1} score={:.1}",
                            snapshot.elapsed_time,
                            snapshot.average_acceleration,
                            snapshot.current_speed,
                            snapshot.top_speed,
                            snapshot.score
                        );
                        last_logged = Some(Instant::now());
                    }
                }
                SessionUpdate::Warning(e) => tracing::warn!("{}", e),
                SessionUpdate::Error(e) => tracing::error!("{}", e),
                SessionUpdate::Stopped(final_record) => record = Some(final_record),
            }
        }

        record
    });

    let session = tokio::spawn(driver.run());

    handle.start();
    tokio::time::sleep(Duration::from_secs(config.simulation.duration_secs)).await;
    handle.stop();
    handle.shutdown();

    let controller = session.await.context("session driver task failed")?;
    let record = consumer
        .join()
        .map_err(|_| anyhow::anyhow!("update consumer thread panicked"))?
        .unwrap_or_else(|| controller.record());

    if let Some(summary) = SessionSummary::from_diagnostics(controller.diagnostics(), record) {
        tracing::info!(
            "Session {} finished: {} samples, {} speed readings",
            summary.session_id,
            summary.applied_samples,
            summary.speed_readings
        );
    }

    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}
