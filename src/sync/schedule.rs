// file: src/sync/schedule.rs
// description: inter-pass scheduling policy and cooperative shutdown signal
// reference: https://docs.rs/tokio/latest/tokio/sync/watch

use crate::config::ScheduleConfig;
use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulePolicy {
    pub interval: Duration,
    pub jitter: Duration,
    /// `None` runs until shutdown.
    pub max_cycles: Option<u64>,
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self::hourly()
    }
}

impl SchedulePolicy {
    pub fn hourly() -> Self {
        Self {
            interval: Duration::from_secs(3600),
            jitter: Duration::ZERO,
            max_cycles: None,
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self {
            interval: config.interval(),
            jitter: config.jitter(),
            max_cycles: config.max_cycles,
        }
    }

    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    pub fn is_final_cycle(&self, completed: u64) -> bool {
        self.max_cycles.is_some_and(|max| completed >= max)
    }

    /// Interval plus a uniformly drawn jitter in `[0, jitter]` at millisecond resolution.
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.interval;
        }

        let offset = rand::thread_rng().gen_range(0..=jitter_ms);
        self.interval + Duration::from_millis(offset)
    }
}

/// Sender half of the shutdown signal.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver half, checked between files and raced against the inter-pass sleep.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    /// A signal that never fires.
    pub fn never() -> Self {
        shutdown_channel().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // sender dropped without triggering
                std::future::pending::<()>().await;
            }
        }
    }

    /// Sleeps for `duration`. Returns `false` if shutdown fired first.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.triggered() => false,
        }
    }
}
