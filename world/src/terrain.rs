//! Terrain rules consulted by movement and transitions.

use starcell_core::{CellKind, SubscreenKind};

/// Answers solidity, enterability and flight questions for terrain cells.
pub trait TerrainQuery {
    /// Reports whether grounded movers are blocked by the cell.
    fn is_solid(&self, cell: CellKind) -> bool;

    /// Reports which interior, if any, the cell leads into.
    fn interior(&self, cell: CellKind) -> Option<SubscreenKind>;

    /// Reports whether the cell blocks flying movers too.
    fn blocks_flight(&self, cell: CellKind) -> bool;

    /// Reports whether the cell leads into an interior.
    fn is_enterable(&self, cell: CellKind) -> bool {
        self.interior(cell).is_some()
    }

    /// Reports whether a mover with the given flight capability may stand on the cell.
    fn is_passable(&self, cell: CellKind, flying: bool) -> bool {
        if !self.is_solid(cell) {
            return true;
        }
        flying && !self.blocks_flight(cell)
    }
}

/// Terrain rules of the standard cell palette.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardTerrain;

impl TerrainQuery for StandardTerrain {
    fn is_solid(&self, cell: CellKind) -> bool {
        matches!(
            cell,
            CellKind::DeepWater
                | CellKind::Tree
                | CellKind::Stone
                | CellKind::Wall
                | CellKind::House
                | CellKind::Forge
                | CellKind::Cave
                | CellKind::Mineshaft
                | CellKind::CaveWall
                | CellKind::Chest
        )
    }

    fn interior(&self, cell: CellKind) -> Option<SubscreenKind> {
        match cell {
            CellKind::House => Some(SubscreenKind::House),
            CellKind::Cave | CellKind::Mineshaft => Some(SubscreenKind::Cave),
            _ => None,
        }
    }

    fn blocks_flight(&self, cell: CellKind) -> bool {
        matches!(
            cell,
            CellKind::Wall | CellKind::CaveWall | CellKind::DeepWater
        )
    }
}
