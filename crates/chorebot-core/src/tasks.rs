//! Per-day task ledger.
//!
//! Each member holds at most one task per group per day. Entries are
//! partitioned by [`DayKey`], so a new day simply addresses a fresh, empty
//! partition; nothing is ever reset by a background job.
//!
//! ## Entry lifecycle
//!
//! ```text
//! registered (completed=false, awarded=false)
//!     -> done (completed=true, awarded=points>0)
//! re-register at any point -> registered
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::clock::DayKey;
use crate::error::LedgerError;
use crate::ids::{GroupId, MemberId};

/// Closed table of known task types and the points each one grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, u32>", into = "IndexMap<String, u32>")]
pub struct TaskCatalog {
    points: IndexMap<String, u32>,
}

impl From<IndexMap<String, u32>> for TaskCatalog {
    fn from(points: IndexMap<String, u32>) -> Self {
        Self::new(points)
    }
}

impl From<TaskCatalog> for IndexMap<String, u32> {
    fn from(catalog: TaskCatalog) -> Self {
        catalog.points
    }
}

impl Default for TaskCatalog {
    fn default() -> Self {
        let mut points = IndexMap::new();
        points.insert("black_usb".to_string(), 10);
        points.insert("cloth".to_string(), 15);
        Self { points }
    }
}

impl TaskCatalog {
    /// Build a catalog; type names are kept as declared.
    ///
    /// Names that collide case-insensitively or contain whitespace are kept
    /// too, so that [`Config::validate`](crate::Config::validate) can report
    /// them instead of one silently shadowing another.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let points = entries
            .into_iter()
            .map(|(name, pts)| (name.as_ref().to_string(), pts))
            .collect();
        Self { points }
    }

    /// Point value for a task type, matched case-insensitively.
    pub fn points_for(&self, task_type: &str) -> Option<u32> {
        let wanted = task_type.to_lowercase();
        self.points
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(_, pts)| *pts)
    }

    /// Known types in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.points.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn names(&self) -> Vec<String> {
        self.points.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One member's task for one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    description: String,
    task_type: String,
    points: u32,
    completed: bool,
    points_awarded: bool,
}

impl TaskEntry {
    fn new(task_type: String, points: u32, detail: Option<&str>) -> Self {
        let description = match detail.map(str::trim).filter(|d| !d.is_empty()) {
            Some(detail) => format!("{task_type} - {detail}"),
            None => task_type.clone(),
        };
        Self {
            description,
            task_type,
            points,
            completed: false,
            points_awarded: false,
        }
    }

    /// Label shown to members: the type, optionally followed by user detail.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Points this task is worth when completed.
    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn points_awarded(&self) -> bool {
        self.points_awarded
    }

    /// Flip to completed; returns the points to credit, at most once.
    fn complete(&mut self) -> Option<u32> {
        self.completed = true;
        if !self.points_awarded && self.points > 0 {
            self.points_awarded = true;
            Some(self.points)
        } else {
            None
        }
    }
}

/// Outcome of a successful mark-done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDone {
    pub task_type: String,
    /// Points credited by this call, if any.
    pub points_granted: Option<u32>,
}

type DayPartition = IndexMap<MemberId, TaskEntry>;

/// Task entries keyed by group, then day, then member.
#[derive(Debug, Default)]
pub struct TaskLedger {
    groups: HashMap<GroupId, BTreeMap<DayKey, DayPartition>>,
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or overwrite) a member's task for `day`.
    ///
    /// Any earlier entry for the same member and day is replaced, including
    /// its completion state. Partitions for days before `day` are dropped.
    pub fn register(
        &mut self,
        catalog: &TaskCatalog,
        group: GroupId,
        member: MemberId,
        day: DayKey,
        task_type: &str,
        detail: Option<&str>,
    ) -> Result<TaskEntry, LedgerError> {
        let task_type = task_type.to_lowercase();
        let points = catalog
            .points_for(&task_type)
            .ok_or_else(|| LedgerError::UnknownTaskType {
                task_type: task_type.clone(),
                known: catalog.names(),
            })?;

        let days = self.groups.entry(group).or_default();
        let stale = days.range(..day).count();
        if stale > 0 {
            days.retain(|key, _| *key >= day);
            debug!(%group, stale, "dropped stale task partitions");
        }

        let entry = TaskEntry::new(task_type, points, detail);
        days.entry(day).or_default().insert(member, entry.clone());
        debug!(%group, %member, %day, task_type = entry.task_type(), "task registered");
        Ok(entry)
    }

    /// Mark a member's task for `day` as done.
    pub fn mark_done(
        &mut self,
        group: GroupId,
        member: MemberId,
        day: DayKey,
    ) -> Result<MarkDone, LedgerError> {
        let entry = self
            .groups
            .get_mut(&group)
            .and_then(|days| days.get_mut(&day))
            .and_then(|partition| partition.get_mut(&member))
            .ok_or(LedgerError::NoTaskToday)?;

        if entry.completed {
            return Err(LedgerError::AlreadyDone);
        }

        let points_granted = entry.complete();
        debug!(%group, %member, %day, ?points_granted, "task marked done");
        Ok(MarkDone {
            task_type: entry.task_type.clone(),
            points_granted,
        })
    }

    pub fn get(&self, group: GroupId, member: MemberId, day: DayKey) -> Result<&TaskEntry, LedgerError> {
        self.partition(group, day)
            .and_then(|partition| partition.get(&member))
            .ok_or(LedgerError::NoTaskToday)
    }

    /// All entries for `day` in first-registration order.
    pub fn list(&self, group: GroupId, day: DayKey) -> Vec<(MemberId, TaskEntry)> {
        self.partition(group, day)
            .map(|partition| {
                partition
                    .iter()
                    .map(|(member, entry)| (*member, entry.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn partition(&self, group: GroupId, day: DayKey) -> Option<&DayPartition> {
        self.groups.get(&group).and_then(|days| days.get(&day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const G: GroupId = GroupId(1);
    const ALICE: MemberId = MemberId(10);
    const BOB: MemberId = MemberId(20);

    fn day(d: u32) -> DayKey {
        DayKey::from_date(NaiveDate::from_ymd_opt(2024, 5, d).unwrap())
    }

    #[test]
    fn register_rejects_unknown_type() {
        let mut ledger = TaskLedger::new();
        let err = ledger
            .register(&TaskCatalog::default(), G, ALICE, day(1), "dishes", None)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::UnknownTaskType {
                task_type: "dishes".into(),
                known: vec!["black_usb".into(), "cloth".into()],
            }
        );
        assert_eq!(ledger.get(G, ALICE, day(1)), Err(LedgerError::NoTaskToday));
    }

    #[test]
    fn register_normalizes_type_and_builds_description() {
        let mut ledger = TaskLedger::new();
        let entry = ledger
            .register(&TaskCatalog::default(), G, ALICE, day(1), "Cloth", Some("fold shirts"))
            .unwrap();
        assert_eq!(entry.task_type(), "cloth");
        assert_eq!(entry.description(), "cloth - fold shirts");
        assert_eq!(entry.points(), 15);
        assert!(!entry.is_completed());
        assert!(!entry.points_awarded());
    }

    #[test]
    fn blank_detail_is_ignored() {
        let mut ledger = TaskLedger::new();
        let entry = ledger
            .register(&TaskCatalog::default(), G, ALICE, day(1), "black_usb", Some("   "))
            .unwrap();
        assert_eq!(entry.description(), "black_usb");
    }

    #[test]
    fn mark_done_awards_once() {
        let mut ledger = TaskLedger::new();
        ledger
            .register(&TaskCatalog::default(), G, ALICE, day(1), "black_usb", None)
            .unwrap();

        let first = ledger.mark_done(G, ALICE, day(1)).unwrap();
        assert_eq!(first.points_granted, Some(10));

        let second = ledger.mark_done(G, ALICE, day(1));
        assert_eq!(second, Err(LedgerError::AlreadyDone));

        let entry = ledger.get(G, ALICE, day(1)).unwrap();
        assert!(entry.is_completed());
        assert!(entry.points_awarded());
    }

    #[test]
    fn mixed_case_catalog_names_match_lower_case_commands() {
        let catalog = TaskCatalog::new([("Dishes", 5)]);
        assert_eq!(catalog.points_for("dishes"), Some(5));
        assert_eq!(catalog.names(), vec!["Dishes".to_string()]);

        let mut ledger = TaskLedger::new();
        let entry = ledger.register(&catalog, G, ALICE, day(1), "DISHES", None).unwrap();
        assert_eq!(entry.task_type(), "dishes");
        assert_eq!(entry.points(), 5);
    }

    #[test]
    fn zero_point_task_completes_without_award() {
        let catalog = TaskCatalog::new([("sweep", 0)]);
        let mut ledger = TaskLedger::new();
        ledger.register(&catalog, G, ALICE, day(1), "sweep", None).unwrap();

        let done = ledger.mark_done(G, ALICE, day(1)).unwrap();
        assert_eq!(done.points_granted, None);
        let entry = ledger.get(G, ALICE, day(1)).unwrap();
        assert!(entry.is_completed());
        assert!(!entry.points_awarded());
    }

    #[test]
    fn mark_done_without_task_fails() {
        let mut ledger = TaskLedger::new();
        assert_eq!(ledger.mark_done(G, ALICE, day(1)), Err(LedgerError::NoTaskToday));
    }

    #[test]
    fn reregister_resets_progress() {
        let mut ledger = TaskLedger::new();
        let catalog = TaskCatalog::default();
        ledger.register(&catalog, G, ALICE, day(1), "black_usb", None).unwrap();
        ledger.mark_done(G, ALICE, day(1)).unwrap();

        let entry = ledger.register(&catalog, G, ALICE, day(1), "cloth", None).unwrap();
        assert!(!entry.is_completed());
        assert!(!entry.points_awarded());

        let again = ledger.mark_done(G, ALICE, day(1)).unwrap();
        assert_eq!(again.points_granted, Some(15));
    }

    #[test]
    fn new_day_starts_empty() {
        let mut ledger = TaskLedger::new();
        let catalog = TaskCatalog::default();
        ledger.register(&catalog, G, ALICE, day(1), "cloth", None).unwrap();

        assert!(ledger.list(G, day(2)).is_empty());
        assert_eq!(ledger.get(G, ALICE, day(2)), Err(LedgerError::NoTaskToday));
    }

    #[test]
    fn writing_a_new_day_drops_older_partitions() {
        let mut ledger = TaskLedger::new();
        let catalog = TaskCatalog::default();
        ledger.register(&catalog, G, ALICE, day(1), "cloth", None).unwrap();
        ledger.register(&catalog, G, BOB, day(2), "cloth", None).unwrap();

        assert!(ledger.list(G, day(1)).is_empty());
        assert_eq!(ledger.list(G, day(2)).len(), 1);
    }

    #[test]
    fn list_keeps_first_registration_order() {
        let mut ledger = TaskLedger::new();
        let catalog = TaskCatalog::default();
        ledger.register(&catalog, G, BOB, day(1), "cloth", None).unwrap();
        ledger.register(&catalog, G, ALICE, day(1), "cloth", None).unwrap();
        ledger.register(&catalog, G, BOB, day(1), "black_usb", None).unwrap();

        let members: Vec<_> = ledger.list(G, day(1)).into_iter().map(|(m, _)| m).collect();
        assert_eq!(members, vec![BOB, ALICE]);
    }

    #[test]
    fn groups_are_isolated() {
        let mut ledger = TaskLedger::new();
        let catalog = TaskCatalog::default();
        ledger.register(&catalog, G, ALICE, day(1), "cloth", None).unwrap();

        assert_eq!(ledger.get(GroupId(2), ALICE, day(1)), Err(LedgerError::NoTaskToday));
        assert!(ledger.list(GroupId(2), day(1)).is_empty());
    }
}
