//! Background maintenance owned by the server.
//!
//! Two periodic tasks:
//! - rate limiter sweep every 30 minutes
//! - key-rotation reminder every 24 hours, warning when the loaded config
//!   file is older than 90 days
//!
//! Both stop when [`Maintenance::shutdown`] is called.

use n8n_gateway_security::RateLimiter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const ROTATION_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
pub const KEY_ROTATION_DAYS: u64 = 90;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

pub struct Maintenance {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Maintenance {
    /// Spawn the background tasks on the current tokio runtime.
    pub fn start(limiter: Arc<RateLimiter>, config_path: Option<PathBuf>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tasks = vec![tokio::spawn(sweep_loop(limiter, shutdown_rx.clone()))];
        match config_path {
            Some(path) => tasks.push(tokio::spawn(rotation_loop(path, shutdown_rx))),
            None => debug!("No config file loaded; key rotation reminder disabled"),
        }
        Self { shutdown_tx, tasks }
    }

    /// Stop every task and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!("Maintenance task ended abnormally: {}", err);
            }
        }
        debug!("Maintenance stopped");
    }
}

async fn sweep_loop(limiter: Arc<RateLimiter>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(SWEEP_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                limiter.sweep();
            }
            _ = shutdown.changed() => break,
        }
    }
}

async fn rotation_loop(path: PathBuf, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = interval(ROTATION_CHECK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => check_key_rotation(&path, SystemTime::now()),
            _ = shutdown.changed() => break,
        }
    }
}

fn check_key_rotation(path: &Path, now: SystemTime) {
    match config_age_days(path, now) {
        Ok(age) if needs_rotation(age) => warn!(
            path = %path.display(),
            age_days = age,
            "Configuration is older than {} days; rotate the n8n API keys and re-encrypt",
            KEY_ROTATION_DAYS
        ),
        Ok(age) => info!(age_days = age, "Configuration age checked"),
        Err(err) => debug!(path = %path.display(), "Could not read config age: {}", err),
    }
}

/// Whole days since `path` was last modified.
pub fn config_age_days(path: &Path, now: SystemTime) -> std::io::Result<u64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let age = now.duration_since(modified).unwrap_or_default();
    Ok(age.as_secs() / SECS_PER_DAY)
}

pub fn needs_rotation(age_days: u64) -> bool {
    age_days > KEY_ROTATION_DAYS
}
