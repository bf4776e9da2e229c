//! # Chorebot Core Library
//!
//! This library provides the state-tracking and accrual engine behind the
//! Chorebot household chore service. Members register one chore per day,
//! mark it done for points, and earn extra points for every minute spent in
//! a voice channel during the nightly accrual window.
//!
//! The chat-platform front end is a thin layer over this crate: it parses
//! nothing, stores nothing and decides nothing on its own.
//!
//! ## Architecture
//!
//! - **Clock**: day keys and the nightly accrual window, driven by an
//!   injectable wall clock
//! - **Ledgers**: per-day task entries and cumulative scores, partitioned by group
//! - **Presence**: who is currently in voice, per group
//! - **Accrual**: a recurring tick that turns presence into points
//! - **Commands**: prefix command parsing, execution and reply rendering
//!
//! ## Key Components
//!
//! - [`Household`]: owned store holding every ledger
//! - [`SharedHousehold`]: lock-guarded handle used by concurrent callers
//! - [`AccrualScheduler`]: start/stop recurring accrual
//! - [`Config`]: TOML configuration

pub mod accrual;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod household;
pub mod ids;
pub mod presence;
pub mod scores;
pub mod tasks;

pub use accrual::{AccrualHandle, AccrualReport, AccrualScheduler, GroupAccrual};
pub use clock::{AccrualWindow, Clock, DayKey, ManualClock, SystemClock};
pub use commands::{execute, Command, Reply};
pub use config::{AccrualConfig, CommandsConfig, Config, TasksConfig};
pub use error::{ConfigError, LedgerError};
pub use household::{Household, SharedHousehold};
pub use ids::{GroupId, MemberId};
pub use presence::{PresenceChange, PresenceTracker};
pub use scores::ScoreLedger;
pub use tasks::{MarkDone, TaskCatalog, TaskEntry, TaskLedger};
