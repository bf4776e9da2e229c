//! Owned store bundling every ledger with its clock and task catalog.
//!
//! Nothing in the core reaches for ambient global state: callers build a
//! [`Household`], hand it to whoever needs it, and tests get a fresh one
//! each time. Concurrent callers go through [`SharedHousehold`], which
//! serialises every operation behind one lock.

use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::clock::{Clock, DayKey};
use crate::error::LedgerError;
use crate::ids::{GroupId, MemberId};
use crate::presence::{PresenceChange, PresenceTracker};
use crate::scores::ScoreLedger;
use crate::tasks::{MarkDone, TaskCatalog, TaskEntry, TaskLedger};

pub struct Household {
    catalog: TaskCatalog,
    clock: Arc<dyn Clock>,
    tasks: TaskLedger,
    scores: ScoreLedger,
    presence: PresenceTracker,
}

impl Household {
    pub fn new(catalog: TaskCatalog, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            clock,
            tasks: TaskLedger::new(),
            scores: ScoreLedger::new(),
            presence: PresenceTracker::new(),
        }
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> DayKey {
        self.clock.today()
    }

    // ── Task ledger ──────────────────────────────────────────────────

    pub fn register_task(
        &mut self,
        group: GroupId,
        member: MemberId,
        task_type: &str,
        detail: Option<&str>,
    ) -> Result<TaskEntry, LedgerError> {
        let today = self.today();
        self.tasks
            .register(&self.catalog, group, member, today, task_type, detail)
    }

    /// Complete today's task and credit its points at most once.
    pub fn mark_done(&mut self, group: GroupId, member: MemberId) -> Result<MarkDone, LedgerError> {
        let today = self.today();
        let done = self.tasks.mark_done(group, member, today)?;
        if let Some(points) = done.points_granted {
            let total = self.scores.add_points(group, member, u64::from(points));
            info!(%group, %member, task_type = %done.task_type, points, total, "task points awarded");
        }
        Ok(done)
    }

    pub fn get_task(&self, group: GroupId, member: MemberId) -> Result<&TaskEntry, LedgerError> {
        self.tasks.get(group, member, self.today())
    }

    pub fn list_today(&self, group: GroupId) -> Vec<(MemberId, TaskEntry)> {
        self.tasks.list(group, self.today())
    }

    // ── Score ledger ─────────────────────────────────────────────────

    pub fn add_points(&mut self, group: GroupId, member: MemberId, amount: u64) -> u64 {
        self.scores.add_points(group, member, amount)
    }

    pub fn get_score(&self, group: GroupId, member: MemberId) -> u64 {
        self.scores.get_score(group, member)
    }

    pub fn top_scores(&self, group: GroupId, limit: usize) -> Vec<(MemberId, u64)> {
        self.scores.top_scores(group, limit)
    }

    // ── Voice presence ───────────────────────────────────────────────

    pub fn on_presence_change(
        &mut self,
        group: GroupId,
        member: MemberId,
        had_channel: bool,
        has_channel: bool,
        channel_changed: bool,
    ) -> PresenceChange {
        self.presence
            .on_presence_change(group, member, had_channel, has_channel, channel_changed)
    }

    pub fn on_uncached_change(
        &mut self,
        group: GroupId,
        member: MemberId,
        has_channel: bool,
    ) -> PresenceChange {
        self.presence.on_uncached_change(group, member, has_channel)
    }

    pub fn reconcile_presence(
        &mut self,
        group: GroupId,
        in_voice: &BTreeSet<MemberId>,
    ) -> Vec<(MemberId, PresenceChange)> {
        self.presence.reconcile(group, in_voice)
    }

    pub fn is_present(&self, group: GroupId, member: MemberId) -> bool {
        self.presence.is_present(group, member)
    }

    pub fn present_members(&self, group: GroupId) -> BTreeSet<MemberId> {
        self.presence.present_members(group)
    }

    /// Groups known to the presence tracker.
    pub fn presence_groups(&self) -> Vec<GroupId> {
        self.presence.groups()
    }
}

/// Cloneable, lock-guarded handle to a [`Household`].
///
/// The lock is only ever held for the duration of the closure passed to
/// [`SharedHousehold::with`]; never hold it across an `.await`.
#[derive(Clone)]
pub struct SharedHousehold {
    inner: Arc<Mutex<Household>>,
}

impl SharedHousehold {
    pub fn new(household: Household) -> Self {
        Self {
            inner: Arc::new(Mutex::new(household)),
        }
    }

    /// Run `f` with exclusive access to the household.
    pub fn with<R>(&self, f: impl FnOnce(&mut Household) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::NaiveDate;

    const G: GroupId = GroupId(1);
    const M: MemberId = MemberId(42);

    fn household_at(hour: u32) -> (Household, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
        ));
        let household = Household::new(TaskCatalog::default(), clock.clone());
        (household, clock)
    }

    #[test]
    fn mark_done_credits_score_once() {
        let (mut household, _) = household_at(10);
        household.register_task(G, M, "black_usb", None).unwrap();

        let done = household.mark_done(G, M).unwrap();
        assert_eq!(done.points_granted, Some(10));
        assert_eq!(household.get_score(G, M), 10);

        assert_eq!(household.mark_done(G, M), Err(LedgerError::AlreadyDone));
        assert_eq!(household.get_score(G, M), 10);
    }

    #[test]
    fn reregistering_does_not_retract_points() {
        let (mut household, _) = household_at(10);
        household.register_task(G, M, "black_usb", None).unwrap();
        household.mark_done(G, M).unwrap();

        let entry = household.register_task(G, M, "black_usb", None).unwrap();
        assert!(!entry.is_completed());
        assert!(!entry.points_awarded());
        assert_eq!(household.get_score(G, M), 10);

        household.mark_done(G, M).unwrap();
        assert_eq!(household.get_score(G, M), 20);
    }

    #[test]
    fn task_disappears_after_midnight() {
        let (mut household, clock) = household_at(23);
        household.register_task(G, M, "cloth", None).unwrap();
        assert!(household.get_task(G, M).is_ok());

        clock.advance(chrono::Duration::hours(1));
        assert_eq!(household.get_task(G, M), Err(LedgerError::NoTaskToday));
        assert_eq!(household.mark_done(G, M), Err(LedgerError::NoTaskToday));
        assert!(household.list_today(G).is_empty());
    }

    #[test]
    fn shared_handle_serialises_access() {
        let (household, _) = household_at(10);
        let shared = SharedHousehold::new(household);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        shared.with(|h| h.add_points(G, MemberId(i % 2), 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total = shared.with(|h| h.get_score(G, MemberId(0)) + h.get_score(G, MemberId(1)));
        assert_eq!(total, 800);
    }
}
