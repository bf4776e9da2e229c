//! Wall-clock oracle: day keys and the nightly accrual window.
//!
//! Everything here works on the local wall-clock time of the running
//! process. There is no per-group timezone.
//!
//! ## Window wrap-around
//!
//! ```text
//! start=21, end=2   ->  hour >= 21 || hour < 2
//! start=8,  end=12  ->  8 <= hour && hour < 12
//! ```

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Source of "now" for the store and the scheduler.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Day key for the current local date.
    fn today(&self) -> DayKey {
        DayKey::from_datetime(self.now())
    }
}

/// Process wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Hand-driven clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Partition key for task entries. Rolls over at local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(NaiveDate);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_datetime(instant: NaiveDateTime) -> Self {
        Self(instant.date())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Nightly span of local hours during which voice presence earns points.
///
/// `start_hour` is inclusive, `end_hour` exclusive. When `end_hour` is
/// not after `start_hour` the window crosses midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for AccrualWindow {
    fn default() -> Self {
        Self {
            start_hour: 21,
            end_hour: 2,
        }
    }
}

impl AccrualWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    pub fn wraps_midnight(&self) -> bool {
        self.end_hour <= self.start_hour
    }

    /// Whether an hour of day (0..24) is inside the window.
    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.wraps_midnight() {
            hour >= self.start_hour || hour < self.end_hour
        } else {
            hour >= self.start_hour && hour < self.end_hour
        }
    }

    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.contains_hour(instant.hour())
    }
}
