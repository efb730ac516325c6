use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::RankingSummary;
use crate::ranking::{RankingEngine, RankingError};

/// Next Sunday 00:00 UTC strictly after `now`.
pub fn next_weekly_run(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let days_until_sunday = (7 - now.weekday().num_days_from_sunday()) % 7;
    let candidate = midnight + Duration::days(i64::from(days_until_sunday));

    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

struct ScheduledJob {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Drives the weekly ranking cycle and the on-demand trigger. Both paths
/// share one engine, so they are serialised by the engine's run guard.
pub struct RankingScheduler {
    engine: Arc<RankingEngine>,
    job: Mutex<Option<ScheduledJob>>,
}

impl RankingScheduler {
    pub fn new(engine: Arc<RankingEngine>) -> Self {
        Self {
            engine,
            job: Mutex::new(None),
        }
    }

    /// Spawns the weekly timer. Returns false if it is already running.
    pub fn start(&self) -> bool {
        let mut job = self.job.lock().unwrap_or_else(PoisonError::into_inner);
        if job.is_some() {
            tracing::info!("Background jobs already initialized");
            return false;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_schedule(
            Arc::clone(&self.engine),
            shutdown_rx,
            next_weekly_run,
        ));
        *job = Some(ScheduledJob { shutdown, handle });

        tracing::info!(
            "Background jobs initialized. Ranking recalculation scheduled for Sundays at 00:00 UTC"
        );
        true
    }

    /// Stops the weekly timer, waiting for an in-flight cycle to finish.
    pub async fn stop(&self) {
        let job = self
            .job
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(job) = job else {
            return;
        };

        let _ = job.shutdown.send(true);
        if let Err(error) = job.handle.await {
            tracing::warn!("Ranking scheduler task ended abnormally: {}", error);
        }
        tracing::info!("Background jobs stopped");
    }

    pub fn is_running(&self) -> bool {
        self.job
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Runs one cycle on its own task. Dropping the returned future detaches
    /// the caller; the cycle still runs to completion and logs its outcome.
    pub async fn trigger_now(&self) -> Result<RankingSummary, RankingError> {
        tracing::info!("Manual ranking recalculation triggered");
        let engine = Arc::clone(&self.engine);
        let cycle = tokio::spawn(async move {
            let result = engine.recalculate_all().await;
            match &result {
                Ok(summary) => tracing::info!(
                    users = summary.users_ranked,
                    "Manual ranking recalculation completed successfully"
                ),
                Err(error) => {
                    tracing::error!("Error during manual ranking recalculation: {}", error)
                }
            }
            result
        });

        cycle.await?
    }
}

type NextRun = fn(DateTime<Utc>) -> DateTime<Utc>;

async fn run_schedule(
    engine: Arc<RankingEngine>,
    mut shutdown: watch::Receiver<bool>,
    next_run_after: NextRun,
) {
    loop {
        let now = Utc::now();
        let next_run = next_run_after(now);
        let wait = (next_run - now).to_std().unwrap_or_default();
        tracing::debug!(next_run = %next_run, "Waiting for next scheduled ranking recalculation");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        tracing::info!("Starting scheduled ranking recalculation...");
        match engine.recalculate_all().await {
            Ok(summary) => tracing::info!(
                users = summary.users_ranked,
                publications = summary.publications_scored,
                "Ranking recalculation completed successfully"
            ),
            Err(RankingError::AlreadyRunning) => {
                tracing::warn!("Skipping scheduled ranking recalculation, a run is in progress")
            }
            Err(error) => tracing::error!("Error during ranking recalculation: {}", error),
        }
    }
}
