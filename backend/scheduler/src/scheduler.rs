use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use idlewatch_core::{Component, IdleWatchError, Message};
use idlewatch_ledger::ActivityLedger;

use crate::scanner::InactivityScanner;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Time between scan cycles.
    pub interval: Duration,
    /// Delay before the first cycle after startup.
    pub initial_delay: Duration,
    /// Scan log entries older than this are pruned after each cycle.
    pub scan_log_retention: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(86_400),
            initial_delay: Duration::from_secs(10),
            scan_log_retention: Some(Duration::from_secs(90 * 86_400)),
        }
    }
}

/// The Scheduler component applies inbound events to the ledger and drives periodic scans.
///
/// Events are applied inline as they arrive. Scan cycles run on their own task so a
/// long cycle never holds up event ingestion; a tick that fires while the previous
/// cycle is still running is skipped.
pub struct Scheduler {
    ledger: Arc<dyn ActivityLedger>,
    scanner: Arc<InactivityScanner>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(
        ledger: Arc<dyn ActivityLedger>,
        scanner: Arc<InactivityScanner>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            ledger,
            scanner,
            config,
        }
    }

    /// Apply one inbound event to the ledger.
    pub async fn apply(&self, msg: &Message) -> Result<(), IdleWatchError> {
        match msg {
            Message::Activity(event) => {
                if event.should_record() {
                    self.ledger
                        .record_activity(event.channel_id, event.member_id, event.timestamp)
                        .await?;
                }
            }
            Message::Join(event) => {
                if event.is_join() {
                    let inserted = self
                        .ledger
                        .record_join(event.channel_id, event.member_id, event.timestamp)
                        .await?;
                    debug!(
                        channel_id = %event.channel_id,
                        member_id = %event.member_id,
                        inserted,
                        "Join recorded"
                    );
                } else {
                    debug!(
                        channel_id = %event.channel_id,
                        from = %event.previous_status,
                        to = %event.new_status,
                        "Ignoring membership transition"
                    );
                }
            }
        }
        Ok(())
    }

    fn spawn_cycle(&self, running: &mut Option<JoinHandle<()>>, reason: &str) {
        if running.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!(reason, "Previous scan cycle still running, skipping");
            return;
        }
        let scanner = self.scanner.clone();
        let retention = self.config.scan_log_retention;
        let reason = reason.to_string();
        *running = Some(tokio::spawn(async move {
            info!(reason = %reason, "Scan cycle triggered");
            match scanner.scan_all().await {
                Ok(outcomes) => {
                    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
                    let warned: u32 = outcomes
                        .iter()
                        .filter_map(|o| o.result.as_ref().ok())
                        .map(|r| r.warned)
                        .sum();
                    info!(
                        channels = outcomes.len(),
                        failed,
                        warned,
                        "Scan cycle finished"
                    );
                }
                Err(e) => error!(error = %e, "Scan cycle could not list channels"),
            }
            if let Some(retention) = retention {
                match scanner.prune_scan_log(retention).await {
                    Ok(0) => {}
                    Ok(pruned) => debug!(pruned, "Pruned old scan log entries"),
                    Err(e) => warn!(error = %e, "Failed to prune scan log"),
                }
            }
        }));
    }
}

#[async_trait]
impl Component for Scheduler {
    fn name(&self) -> &str {
        "scheduler"
    }

    async fn start(&self, mut rx: mpsc::Receiver<Message>) -> Result<()> {
        info!(
            interval_secs = self.config.interval.as_secs(),
            initial_delay_secs = self.config.initial_delay.as_secs(),
            "Scheduler started"
        );

        let mut ticker = time::interval_at(
            Instant::now() + self.config.initial_delay,
            self.config.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut running: Option<JoinHandle<()>> = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.spawn_cycle(&mut running, "scheduled");
                }
                msg = rx.recv() => {
                    match msg {
                        Some(event) => {
                            if let Err(e) = self.apply(&event).await {
                                error!(kind = event.kind(), error = %e, "Failed to apply inbound event");
                            }
                        }
                        None => {
                            info!("Scheduler channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        if let Some(handle) = running {
            if let Err(e) = handle.await {
                error!(error = %e, "Scan cycle task panicked");
            }
        }
        Ok(())
    }
}
