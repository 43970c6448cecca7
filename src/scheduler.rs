//! # Notification Scheduler
//!
//! Background task that periodically runs the notification sweep across all
//! tenants. Each tick sleeps the configured interval plus a random jitter
//! fraction so multiple instances do not sweep in lockstep; the unique
//! guard on notifications keeps concurrent sweeps idempotent.

use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, histogram};
use rand::Rng;
use sea_orm::DatabaseConnection;
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::notifier;

/// Background notification scheduler service.
pub struct NotificationScheduler {
    config: Arc<AppConfig>,
    db: Arc<DatabaseConnection>,
}

impl NotificationScheduler {
    /// Create a new scheduler instance.
    pub fn new(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Self {
        Self { config, db }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            tick_interval_seconds = self.config.scheduler.tick_interval_seconds,
            "Starting notification scheduler"
        );

        loop {
            let tick_interval = self.jittered_interval();
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Notification scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    match notifier::run_sweep(&self.db, Utc::now()).await {
                        Ok(stats) => {
                            counter!("notification_scheduler_ticks_total").increment(1);
                            info!(
                                created = stats.notifications_created,
                                skipped = stats.notifications_skipped_existing,
                                tenants = stats.tenants_processed,
                                "Scheduler tick completed"
                            );
                        }
                        Err(err) => {
                            counter!("notification_scheduler_tick_errors_total").increment(1);
                            error!(error = ?err, "Scheduler tick failed");
                        }
                    }
                    let elapsed = tick_started.elapsed();
                    histogram!("notification_scheduler_tick_duration_ms")
                        .record(elapsed.as_secs_f64() * 1_000.0);
                }
            }
        }

        info!("Notification scheduler stopped");
    }

    /// Tick interval with up to `jitter_pct` of random extra delay.
    fn jittered_interval(&self) -> TokioDuration {
        let base = self.config.scheduler.tick_interval_seconds as f64;
        let jitter_span = base * self.config.scheduler.jitter_pct.clamp(0.0, 1.0);
        let jitter = if jitter_span > 0.0 {
            rand::thread_rng().gen_range(0.0..jitter_span)
        } else {
            0.0
        };
        TokioDuration::from_secs_f64(base + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;

    fn scheduler_with(tick: u64, jitter: f64) -> NotificationScheduler {
        let config = AppConfig {
            scheduler: SchedulerConfig {
                tick_interval_seconds: tick,
                jitter_pct: jitter,
            },
            ..Default::default()
        };
        NotificationScheduler {
            config: Arc::new(config),
            db: Arc::new(DatabaseConnection::Disconnected),
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let scheduler = scheduler_with(100, 0.2);
        for _ in 0..50 {
            let interval = scheduler.jittered_interval();
            assert!(interval >= TokioDuration::from_secs(100));
            assert!(interval <= TokioDuration::from_secs(120));
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        let scheduler = scheduler_with(60, 0.0);
        assert_eq!(scheduler.jittered_interval(), TokioDuration::from_secs(60));
    }
}
