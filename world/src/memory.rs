//! Short-term spatial memory biasing entities away from recently visited cells.

use std::collections::{HashSet, VecDeque};

use starcell_core::{CellCoord, Escalation};

/// Stall count at which the oldest half of the lane is dropped.
const HALVE_AT: u32 = 2;
/// Stall count at which the lane is emptied.
const CLEAR_AT: u32 = 4;
/// Stall count at which one step ignores the lane entirely.
const IGNORE_AT: u32 = 6;

/// Bounded recency buffer of visited cells plus stall bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct EntityMemory {
    lane: VecDeque<CellCoord>,
    capacity: usize,
    stuck_counter: u32,
    target_stuck_counter: u32,
    last_target: Option<CellCoord>,
}

impl EntityMemory {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lane: VecDeque::with_capacity(capacity),
            capacity,
            stuck_counter: 0,
            target_stuck_counter: 0,
            last_target: None,
        }
    }

    /// Appends a visited cell, skipping consecutive duplicates and evicting the oldest entries.
    pub(crate) fn record_visit(&mut self, cell: CellCoord) {
        if self.lane.back() == Some(&cell) {
            return;
        }
        self.lane.push_back(cell);
        while self.lane.len() > self.capacity {
            let _ = self.lane.pop_front();
        }
    }

    /// The last `window` entries as a set.
    pub(crate) fn recent(&self, window: usize) -> HashSet<CellCoord> {
        let skip = self.lane.len().saturating_sub(window);
        self.lane.iter().skip(skip).copied().collect()
    }

    pub(crate) fn lane(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.lane.iter().copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.lane.len()
    }

    pub(crate) fn clear(&mut self) {
        self.lane.clear();
    }

    /// Drops the oldest half of the lane.
    pub(crate) fn halve(&mut self) {
        let drop = self.lane.len() / 2;
        let _ = self.lane.drain(..drop);
    }

    /// Replaces the lane with a single entry.
    pub(crate) fn reset_to(&mut self, cell: CellCoord) {
        self.lane.clear();
        self.lane.push_back(cell);
    }

    pub(crate) const fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) const fn stuck_counter(&self) -> u32 {
        self.stuck_counter
    }

    pub(crate) const fn target_stuck_counter(&self) -> u32 {
        self.target_stuck_counter
    }

    pub(crate) fn note_progress(&mut self) {
        self.stuck_counter = 0;
    }

    /// Bumps the stuck counter without applying any release.
    pub(crate) fn note_failure(&mut self) -> u32 {
        self.stuck_counter = self.stuck_counter.saturating_add(1);
        self.stuck_counter
    }

    /// Records a stall and applies the matching release tier.
    ///
    /// [`Escalation::IgnoreMemory`] leaves the lane untouched: the caller owns
    /// the memory-free retry and must call [`EntityMemory::finish_forced`]
    /// whatever its outcome.
    pub(crate) fn note_stall(&mut self) -> Escalation {
        let count = self.note_failure();
        if count >= IGNORE_AT {
            Escalation::IgnoreMemory
        } else if count >= CLEAR_AT {
            self.clear();
            Escalation::ClearMemory
        } else if count >= HALVE_AT {
            self.halve();
            Escalation::HalveMemory
        } else {
            Escalation::Hold
        }
    }

    pub(crate) fn finish_forced(&mut self) {
        self.stuck_counter = 0;
    }

    /// Detects oscillation: when `cell` occurs at least `threshold` times in
    /// the last `window` entries the lane collapses to that cell alone.
    pub(crate) fn detect_loop(&mut self, cell: CellCoord, window: usize, threshold: usize) -> bool {
        if self.lane.len() < window {
            return false;
        }
        let skip = self.lane.len() - window;
        let repeats = self.lane.iter().skip(skip).filter(|entry| **entry == cell).count();
        if repeats < threshold {
            return false;
        }
        self.reset_to(cell);
        true
    }

    /// Counts consecutive calls sharing the same goal and returns the count.
    pub(crate) fn track_target(&mut self, goal: CellCoord) -> u32 {
        if self.last_target == Some(goal) {
            self.target_stuck_counter = self.target_stuck_counter.saturating_add(1);
        } else {
            self.last_target = Some(goal);
            self.target_stuck_counter = 0;
        }
        self.target_stuck_counter
    }

    pub(crate) fn forget_target(&mut self) {
        self.last_target = None;
        self.target_stuck_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::EntityMemory;
    use starcell_core::{CellCoord, Escalation};

    fn cell(x: u32, y: u32) -> CellCoord {
        CellCoord::new(x, y)
    }

    #[test]
    fn lane_is_bounded_and_evicts_oldest() {
        let mut memory = EntityMemory::with_capacity(3);
        for x in 0..5 {
            memory.record_visit(cell(x, 0));
        }
        assert_eq!(memory.len(), 3);
        assert_eq!(
            memory.lane().collect::<Vec<_>>(),
            vec![cell(2, 0), cell(3, 0), cell(4, 0)]
        );
    }

    #[test]
    fn consecutive_duplicates_are_skipped() {
        let mut memory = EntityMemory::with_capacity(5);
        memory.record_visit(cell(1, 1));
        memory.record_visit(cell(1, 1));
        memory.record_visit(cell(2, 1));
        memory.record_visit(cell(1, 1));
        assert_eq!(
            memory.lane().collect::<Vec<_>>(),
            vec![cell(1, 1), cell(2, 1), cell(1, 1)]
        );
    }

    #[test]
    fn recent_window_only_covers_latest_entries() {
        let mut memory = EntityMemory::with_capacity(10);
        for x in 0..8 {
            memory.record_visit(cell(x, 0));
        }
        let recent = memory.recent(6);
        assert_eq!(recent.len(), 6);
        assert!(!recent.contains(&cell(1, 0)));
        assert!(recent.contains(&cell(2, 0)));
        assert!(recent.contains(&cell(7, 0)));
    }

    #[test]
    fn escalation_releases_memory_in_tiers() {
        let mut memory = EntityMemory::with_capacity(10);
        for x in 0..8 {
            memory.record_visit(cell(x, 0));
        }

        assert_eq!(memory.note_stall(), Escalation::Hold);
        assert_eq!(memory.len(), 8);
        assert_eq!(memory.note_stall(), Escalation::HalveMemory);
        assert_eq!(memory.len(), 4);
        assert_eq!(memory.lane().next(), Some(cell(4, 0)));
        assert_eq!(memory.note_stall(), Escalation::HalveMemory);
        assert_eq!(memory.len(), 2);
        assert_eq!(memory.note_stall(), Escalation::ClearMemory);
        assert_eq!(memory.len(), 0);
        assert_eq!(memory.note_stall(), Escalation::ClearMemory);
        assert_eq!(memory.note_stall(), Escalation::IgnoreMemory);
        assert_eq!(memory.stuck_counter(), 6);

        memory.finish_forced();
        assert_eq!(memory.stuck_counter(), 0);
    }

    #[test]
    fn loops_collapse_memory_to_current_cell() {
        let mut memory = EntityMemory::with_capacity(10);
        let a = cell(3, 3);
        let b = cell(4, 3);
        for _ in 0..3 {
            memory.record_visit(a);
            memory.record_visit(b);
        }
        assert!(!memory.detect_loop(cell(9, 9), 6, 3));
        assert!(memory.detect_loop(a, 6, 3));
        assert_eq!(memory.lane().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn target_tracking_counts_repeats() {
        let mut memory = EntityMemory::with_capacity(4);
        assert_eq!(memory.track_target(cell(1, 1)), 0);
        assert_eq!(memory.track_target(cell(1, 1)), 1);
        assert_eq!(memory.track_target(cell(1, 1)), 2);
        assert_eq!(memory.track_target(cell(2, 1)), 0);
        memory.forget_target();
        assert_eq!(memory.target_stuck_counter(), 0);
        assert_eq!(memory.track_target(cell(2, 1)), 0);
    }
}
