//! Recurring voice accrual.
//!
//! Once per interval the scheduler checks the accrual window and, when
//! inside it, credits `rate_per_tick` points to every member currently in
//! voice, group by group.
//!
//! A tick that does not fire is lost for good: missed intervals are
//! skipped, never replayed.
//!
//! ## Usage
//!
//! ```ignore
//! let scheduler = AccrualScheduler::new(shared, &config.accrual);
//! let handle = scheduler.start();
//! // ...
//! handle.stop().await;
//! ```

use chrono::NaiveDateTime;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::clock::AccrualWindow;
use crate::config::AccrualConfig;
use crate::household::{Household, SharedHousehold};
use crate::ids::{GroupId, MemberId};

/// Points credited to one group during one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupAccrual {
    pub group: GroupId,
    pub awarded: Vec<MemberId>,
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccrualReport {
    pub at: NaiveDateTime,
    pub in_window: bool,
    pub rate_per_tick: u64,
    pub groups: Vec<GroupAccrual>,
}

impl AccrualReport {
    /// Number of member awards made by this tick.
    pub fn awards(&self) -> usize {
        self.groups.iter().map(|g| g.awarded.len()).sum()
    }
}

/// Credit one tick worth of points to everyone present, if `now` is in the window.
pub fn accrue(household: &mut Household, window: AccrualWindow, rate_per_tick: u64) -> AccrualReport {
    let at = household.now();
    let in_window = window.contains(at);
    let mut report = AccrualReport {
        at,
        in_window,
        rate_per_tick,
        groups: Vec::new(),
    };
    if !in_window {
        debug!(%at, "outside accrual window");
        return report;
    }

    for group in household.presence_groups() {
        let present = household.present_members(group);
        if present.is_empty() {
            continue;
        }
        let mut awarded = Vec::with_capacity(present.len());
        for member in present {
            let before = household.get_score(group, member);
            let total = household.add_points(group, member, rate_per_tick);
            if total == before {
                warn!(%group, %member, total, "accrual had no effect, score saturated");
                continue;
            }
            awarded.push(member);
        }
        debug!(%group, members = awarded.len(), "group accrued");
        report.groups.push(GroupAccrual { group, awarded });
    }
    report
}

pub struct AccrualScheduler {
    household: SharedHousehold,
    window: AccrualWindow,
    rate_per_tick: u64,
    interval: Duration,
}

impl AccrualScheduler {
    pub fn new(household: SharedHousehold, config: &AccrualConfig) -> Self {
        Self {
            household,
            window: config.window(),
            rate_per_tick: config.rate_per_tick,
            interval: config.interval(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single tick now.
    pub fn tick(&self) -> AccrualReport {
        let report = self
            .household
            .with(|h| accrue(h, self.window, self.rate_per_tick));
        if report.in_window {
            info!(
                groups = report.groups.len(),
                awards = report.awards(),
                rate = report.rate_per_tick,
                "accrual tick"
            );
        }
        report
    }

    /// Spawn the recurring tick on the current tokio runtime.
    pub fn start(self) -> AccrualHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // Consume the immediate first tick so accrual starts one interval in.
            interval.tick().await;
            info!(interval_secs = self.interval.as_secs(), "accrual scheduler started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("accrual scheduler stopped");
        });
        AccrualHandle { shutdown_tx, task }
    }
}

/// Owner handle for a running scheduler.
pub struct AccrualHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AccrualHandle {
    /// Signal shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "accrual scheduler task ended abnormally");
        }
    }
}
