//! Voice presence tracker.
//!
//! Tracks, per group, which members currently occupy a voice channel.
//! Which channel they are in does not matter.
//!
//! ## State Transitions
//!
//! ```text
//! Absent --joined--> Present --left--> Absent
//! Present --moved--> Present
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::ids::{GroupId, MemberId};

/// A presence-change event, classified from the before/after channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceChange {
    Joined,
    Left,
    Moved,
    /// Old and new state are identical (mute, deafen, stream toggles).
    Unchanged,
}

impl PresenceChange {
    /// Classify a transition from raw flags.
    ///
    /// `channel_changed` only matters when a channel is held both before
    /// and after.
    pub fn classify(had_channel: bool, has_channel: bool, channel_changed: bool) -> Self {
        match (had_channel, has_channel) {
            (false, true) => PresenceChange::Joined,
            (true, false) => PresenceChange::Left,
            (true, true) if channel_changed => PresenceChange::Moved,
            _ => PresenceChange::Unchanged,
        }
    }
}

#[derive(Debug, Default)]
pub struct PresenceTracker {
    groups: HashMap<GroupId, BTreeSet<MemberId>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one presence-change event and return how it was classified.
    pub fn on_presence_change(
        &mut self,
        group: GroupId,
        member: MemberId,
        had_channel: bool,
        has_channel: bool,
        channel_changed: bool,
    ) -> PresenceChange {
        let change = PresenceChange::classify(had_channel, has_channel, channel_changed);
        match change {
            PresenceChange::Joined => {
                self.groups.entry(group).or_default().insert(member);
            }
            PresenceChange::Left => {
                if let Some(present) = self.groups.get_mut(&group) {
                    present.remove(&member);
                }
            }
            PresenceChange::Moved | PresenceChange::Unchanged => {}
        }
        debug!(%group, %member, ?change, "presence change");
        change
    }

    /// Apply an event whose previous state is unknown.
    ///
    /// The tracker's own view stands in for the missing state, so a member
    /// already present who now has no channel is recorded as having left.
    pub fn on_uncached_change(
        &mut self,
        group: GroupId,
        member: MemberId,
        has_channel: bool,
    ) -> PresenceChange {
        let had_channel = self.is_present(group, member);
        self.on_presence_change(group, member, had_channel, has_channel, had_channel != has_channel)
    }

    /// Replace a group's presence with a full snapshot of who is in voice.
    ///
    /// Members missing from `in_voice` leave, new ones join. Returns the
    /// changes applied, leaves first.
    pub fn reconcile(
        &mut self,
        group: GroupId,
        in_voice: &BTreeSet<MemberId>,
    ) -> Vec<(MemberId, PresenceChange)> {
        let present = self.present_members(group);
        let mut changes = Vec::new();
        for &member in present.difference(in_voice) {
            changes.push((member, self.on_presence_change(group, member, true, false, true)));
        }
        for &member in in_voice.difference(&present) {
            changes.push((member, self.on_presence_change(group, member, false, true, true)));
        }
        changes
    }

    pub fn is_present(&self, group: GroupId, member: MemberId) -> bool {
        self.groups
            .get(&group)
            .is_some_and(|present| present.contains(&member))
    }

    pub fn present_members(&self, group: GroupId) -> BTreeSet<MemberId> {
        self.groups.get(&group).cloned().unwrap_or_default()
    }

    /// Every group that has ever seen a presence event.
    pub fn groups(&self) -> Vec<GroupId> {
        let mut groups: Vec<GroupId> = self.groups.keys().copied().collect();
        groups.sort();
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: GroupId = GroupId(1);
    const M: MemberId = MemberId(7);

    fn join(t: &mut PresenceTracker) {
        t.on_presence_change(G, M, false, true, true);
    }

    fn leave(t: &mut PresenceTracker) {
        t.on_presence_change(G, M, true, false, true);
    }

    fn hop(t: &mut PresenceTracker) {
        t.on_presence_change(G, M, true, true, true);
    }

    #[test]
    fn classify_covers_all_flag_combinations() {
        assert_eq!(PresenceChange::classify(false, true, true), PresenceChange::Joined);
        assert_eq!(PresenceChange::classify(true, false, true), PresenceChange::Left);
        assert_eq!(PresenceChange::classify(true, true, true), PresenceChange::Moved);
        assert_eq!(PresenceChange::classify(true, true, false), PresenceChange::Unchanged);
        assert_eq!(PresenceChange::classify(false, false, false), PresenceChange::Unchanged);
        assert_eq!(PresenceChange::classify(false, false, true), PresenceChange::Unchanged);
    }

    #[test]
    fn initially_absent() {
        let tracker = PresenceTracker::new();
        assert!(!tracker.is_present(G, M));
        assert!(tracker.present_members(G).is_empty());
    }

    #[test]
    fn join_alone_is_present() {
        let mut tracker = PresenceTracker::new();
        join(&mut tracker);
        assert!(tracker.is_present(G, M));
    }

    #[test]
    fn join_then_leave_is_absent() {
        let mut tracker = PresenceTracker::new();
        join(&mut tracker);
        leave(&mut tracker);
        assert!(!tracker.is_present(G, M));
    }

    #[test]
    fn join_move_leave_is_absent() {
        let mut tracker = PresenceTracker::new();
        join(&mut tracker);
        hop(&mut tracker);
        assert!(tracker.is_present(G, M));
        leave(&mut tracker);
        assert!(!tracker.is_present(G, M));
    }

    #[test]
    fn leave_without_join_is_harmless() {
        let mut tracker = PresenceTracker::new();
        leave(&mut tracker);
        assert!(!tracker.is_present(G, M));
    }

    #[test]
    fn unchanged_event_is_noop() {
        let mut tracker = PresenceTracker::new();
        join(&mut tracker);
        let change = tracker.on_presence_change(G, M, true, true, false);
        assert_eq!(change, PresenceChange::Unchanged);
        assert!(tracker.is_present(G, M));
    }

    #[test]
    fn uncached_leave_removes_present_member() {
        let mut tracker = PresenceTracker::new();
        join(&mut tracker);
        assert_eq!(tracker.on_uncached_change(G, M, false), PresenceChange::Left);
        assert!(!tracker.is_present(G, M));
    }

    #[test]
    fn uncached_events_follow_tracked_state() {
        let mut tracker = PresenceTracker::new();
        assert_eq!(tracker.on_uncached_change(G, M, false), PresenceChange::Unchanged);
        assert_eq!(tracker.on_uncached_change(G, M, true), PresenceChange::Joined);
        assert_eq!(tracker.on_uncached_change(G, M, true), PresenceChange::Unchanged);
        assert!(tracker.is_present(G, M));
    }

    #[test]
    fn reconcile_drops_members_missing_from_snapshot() {
        let mut tracker = PresenceTracker::new();
        let stayed = MemberId(1);
        let gone = MemberId(2);
        let arrived = MemberId(3);
        tracker.on_presence_change(G, stayed, false, true, true);
        tracker.on_presence_change(G, gone, false, true, true);

        let snapshot: BTreeSet<MemberId> = [stayed, arrived].into_iter().collect();
        let changes = tracker.reconcile(G, &snapshot);

        assert_eq!(
            changes,
            vec![(gone, PresenceChange::Left), (arrived, PresenceChange::Joined)]
        );
        assert_eq!(tracker.present_members(G), snapshot);
    }

    #[test]
    fn reconcile_with_empty_snapshot_clears_group_only() {
        let mut tracker = PresenceTracker::new();
        join(&mut tracker);
        tracker.on_presence_change(GroupId(2), M, false, true, true);

        tracker.reconcile(G, &BTreeSet::new());
        assert!(!tracker.is_present(G, M));
        assert!(tracker.is_present(GroupId(2), M));
    }

    #[test]
    fn presence_is_per_group() {
        let mut tracker = PresenceTracker::new();
        join(&mut tracker);
        assert!(!tracker.is_present(GroupId(2), M));
        assert_eq!(tracker.groups(), vec![G]);
    }
}
