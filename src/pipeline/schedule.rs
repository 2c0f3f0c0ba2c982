//! Fixed-interval trigger for discovery cycles.

use std::future::Future;
use std::time::Duration;

use chrono::{Datelike, Local, Weekday};
use tokio::time::MissedTickBehavior;

use crate::models::ScheduleConfig;
use crate::pipeline::Orchestrator;

/// Runs a cycle every `interval`, never two at once.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    weekdays_only: bool,
}

impl Scheduler {
    pub fn new(interval: Duration, weekdays_only: bool) -> Self {
        Self {
            interval,
            weekdays_only,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(Duration::from_secs(config.interval_secs), config.weekdays_only)
    }

    /// Whether a tick falling on `weekday` should start a cycle.
    pub fn should_run(&self, weekday: Weekday) -> bool {
        !self.weekdays_only || !matches!(weekday, Weekday::Sat | Weekday::Sun)
    }

    /// Tick until `shutdown` resolves. The first tick fires immediately.
    ///
    /// Each cycle is awaited inside the tick, so a slow cycle delays the next
    /// tick rather than overlapping it; shutdown is observed between cycles.
    pub async fn run_until<F>(&self, orchestrator: &Orchestrator, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "Scheduler running every {}s{}",
            self.interval.as_secs(),
            if self.weekdays_only { " on weekdays" } else { "" }
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, scheduler stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let today = Local::now().weekday();
                    if self.should_run(today) {
                        orchestrator.run_cycle().await;
                    } else {
                        log::debug!("Skipping tick on {today}");
                    }
                }
            }
        }
    }
}
