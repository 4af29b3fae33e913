//! Per-tick destination claims.

use std::collections::HashSet;

use starcell_core::{CellCoord, Region};

/// Cells claimed as step destinations during the current tick.
///
/// The table clears itself the first time it is touched in a new tick, so the
/// number of callers reaching it before or after the tick boundary does not
/// matter. Claims never carry over into the next tick.
#[derive(Debug, Default)]
pub(crate) struct CellReservationTable {
    cleared_at: Option<u64>,
    claimed: HashSet<(Region, CellCoord)>,
}

impl CellReservationTable {
    fn refresh(&mut self, tick: u64) {
        if self.cleared_at != Some(tick) {
            self.claimed.clear();
            self.cleared_at = Some(tick);
        }
    }

    pub(crate) fn is_claimed(&mut self, tick: u64, region: Region, cell: CellCoord) -> bool {
        self.refresh(tick);
        self.claimed.contains(&(region, cell))
    }

    /// Claims a destination; returns `false` when another mover already holds it.
    pub(crate) fn claim(&mut self, tick: u64, region: Region, cell: CellCoord) -> bool {
        self.refresh(tick);
        self.claimed.insert((region, cell))
    }

    /// Read-only check that treats a stale table as empty.
    pub(crate) fn peek(&self, tick: u64, region: Region, cell: CellCoord) -> bool {
        self.cleared_at == Some(tick) && self.claimed.contains(&(region, cell))
    }
}

#[cfg(test)]
mod tests {
    use super::CellReservationTable;
    use starcell_core::{CellCoord, Region, ZoneKey};

    #[test]
    fn claims_are_exclusive_within_a_tick() {
        let mut table = CellReservationTable::default();
        let region = Region::Zone(ZoneKey::new(0, 0));
        let cell = CellCoord::new(4, 4);
        assert!(table.claim(3, region, cell));
        assert!(!table.claim(3, region, cell));
        assert!(table.is_claimed(3, region, cell));
        assert!(!table.is_claimed(3, Region::Zone(ZoneKey::new(1, 0)), cell));
    }

    #[test]
    fn claims_expire_at_the_next_tick() {
        let mut table = CellReservationTable::default();
        let region = Region::Zone(ZoneKey::new(0, 0));
        let cell = CellCoord::new(4, 4);
        assert!(table.claim(3, region, cell));
        assert!(table.peek(3, region, cell));
        assert!(!table.peek(4, region, cell));
        assert!(!table.is_claimed(4, region, cell));
        assert!(table.claim(4, region, cell));
    }
}
