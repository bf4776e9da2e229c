//! Cumulative score ledger.
//!
//! The only authoritative point accumulator. Totals only ever grow; there
//! is no operation that sets, lowers or removes a score.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::ids::{GroupId, MemberId};

#[derive(Debug, Default)]
pub struct ScoreLedger {
    groups: HashMap<GroupId, BTreeMap<MemberId, u64>>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to a member's total and return the new total.
    ///
    /// The entry is created at zero on first award. Saturates instead of
    /// wrapping.
    pub fn add_points(&mut self, group: GroupId, member: MemberId, amount: u64) -> u64 {
        let total = self
            .groups
            .entry(group)
            .or_default()
            .entry(member)
            .or_insert(0);
        *total = total.saturating_add(amount);
        debug!(%group, %member, amount, total = *total, "points added");
        *total
    }

    /// Current total, zero when the member never scored.
    pub fn get_score(&self, group: GroupId, member: MemberId) -> u64 {
        self.groups
            .get(&group)
            .and_then(|scores| scores.get(&member))
            .copied()
            .unwrap_or(0)
    }

    /// Highest totals first, at most `limit` entries.
    ///
    /// Equal totals are ordered by member id ascending.
    pub fn top_scores(&self, group: GroupId, limit: usize) -> Vec<(MemberId, u64)> {
        let Some(scores) = self.groups.get(&group) else {
            return Vec::new();
        };
        // BTreeMap iterates by member id; the stable sort keeps that order on ties.
        let mut entries: Vec<(MemberId, u64)> = scores.iter().map(|(m, s)| (*m, *s)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(limit);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const G: GroupId = GroupId(1);

    #[test]
    fn unknown_member_scores_zero() {
        let ledger = ScoreLedger::new();
        assert_eq!(ledger.get_score(G, MemberId(1)), 0);
    }

    #[test]
    fn add_points_accumulates() {
        let mut ledger = ScoreLedger::new();
        assert_eq!(ledger.add_points(G, MemberId(1), 10), 10);
        assert_eq!(ledger.add_points(G, MemberId(1), 5), 15);
        assert_eq!(ledger.get_score(G, MemberId(1)), 15);
    }

    #[test]
    fn zero_award_creates_entry() {
        let mut ledger = ScoreLedger::new();
        ledger.add_points(G, MemberId(1), 0);
        assert_eq!(ledger.top_scores(G, 10), vec![(MemberId(1), 0)]);
    }

    #[test]
    fn top_scores_sorted_descending() {
        let mut ledger = ScoreLedger::new();
        let (a, b, c) = (MemberId(1), MemberId(2), MemberId(3));
        ledger.add_points(G, a, 15);
        ledger.add_points(G, b, 25);
        ledger.add_points(G, c, 5);
        assert_eq!(ledger.top_scores(G, 10), vec![(b, 25), (a, 15), (c, 5)]);
    }

    #[test]
    fn top_scores_breaks_ties_by_member_id() {
        let mut ledger = ScoreLedger::new();
        ledger.add_points(G, MemberId(30), 7);
        ledger.add_points(G, MemberId(10), 7);
        ledger.add_points(G, MemberId(20), 9);
        assert_eq!(
            ledger.top_scores(G, 10),
            vec![(MemberId(20), 9), (MemberId(10), 7), (MemberId(30), 7)]
        );
    }

    #[test]
    fn top_scores_respects_limit() {
        let mut ledger = ScoreLedger::new();
        for id in 0..15 {
            ledger.add_points(G, MemberId(id), id);
        }
        let top = ledger.top_scores(G, 10);
        assert_eq!(top.len(), 10);
        assert_eq!(top[0], (MemberId(14), 14));
    }

    #[test]
    fn groups_do_not_share_scores() {
        let mut ledger = ScoreLedger::new();
        ledger.add_points(G, MemberId(1), 10);
        assert_eq!(ledger.get_score(GroupId(2), MemberId(1)), 0);
        assert!(ledger.top_scores(GroupId(2), 10).is_empty());
    }

    proptest! {
        #[test]
        fn top_scores_never_increases_down_the_list(awards in proptest::collection::vec((0u64..20, 0u64..100), 0..50)) {
            let mut ledger = ScoreLedger::new();
            for (member, amount) in &awards {
                ledger.add_points(G, MemberId(*member), *amount);
            }
            let top = ledger.top_scores(G, 100);
            for pair in top.windows(2) {
                prop_assert!(pair[0].1 >= pair[1].1);
                if pair[0].1 == pair[1].1 {
                    prop_assert!(pair[0].0 < pair[1].0);
                }
            }
        }
    }
}
