//! Zone and interior grids plus the interior registry.

use std::collections::BTreeMap;

use starcell_core::{
    CellCoord, CellKind, Exits, SubscreenKey, SubscreenKind, ZoneDimensions, ZoneKey,
};

/// Dense terrain grid shared by zones and interiors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    dimensions: ZoneDimensions,
    cells: Vec<CellKind>,
}

impl Grid {
    /// Creates a grid filled with a single cell kind.
    #[must_use]
    pub fn filled(dimensions: ZoneDimensions, kind: CellKind) -> Self {
        Self {
            dimensions,
            cells: vec![kind; dimensions.area()],
        }
    }

    /// Dimensions of the grid.
    #[must_use]
    pub const fn dimensions(&self) -> ZoneDimensions {
        self.dimensions
    }

    /// Cell kind at the coordinate, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<CellKind> {
        self.index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// Overwrites the cell kind at the coordinate; ignored outside the grid.
    pub fn set(&mut self, cell: CellCoord, kind: CellKind) {
        if let Some(index) = self.index(cell) {
            if let Some(slot) = self.cells.get_mut(index) {
                *slot = kind;
            }
        }
    }

    /// Overwrites every border cell.
    pub fn outline(&mut self, kind: CellKind) {
        let width = self.dimensions.width();
        let height = self.dimensions.height();
        for x in 0..width {
            self.set(CellCoord::new(x, 0), kind);
            self.set(CellCoord::new(x, height - 1), kind);
        }
        for y in 0..height {
            self.set(CellCoord::new(0, y), kind);
            self.set(CellCoord::new(width - 1, y), kind);
        }
    }

    /// Iterator over every coordinate paired with its kind, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, CellKind)> + '_ {
        let width = self.dimensions.width().max(1);
        self.cells.iter().enumerate().filter_map(move |(index, kind)| {
            let index = u32::try_from(index).ok()?;
            Some((CellCoord::new(index % width, index / width), *kind))
        })
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.dimensions.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.y()).ok()?;
        let column = usize::try_from(cell.x()).ok()?;
        let width = usize::try_from(self.dimensions.width()).ok()?;
        Some(row * width + column)
    }
}

/// Generated overworld zone.
#[derive(Clone, Debug)]
pub struct Zone {
    pub(crate) grid: Grid,
    pub(crate) exits: Exits,
    pub(crate) floor: CellKind,
}

impl Zone {
    /// Terrain grid of the zone.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Corridor flags of the zone.
    #[must_use]
    pub const fn exits(&self) -> Exits {
        self.exits
    }

    /// Cell kind used to carve corridors.
    #[must_use]
    pub const fn floor(&self) -> CellKind {
        self.floor
    }
}

/// Generated interior: a house or a single cave level.
#[derive(Clone, Debug)]
pub struct Subscreen {
    pub(crate) kind: SubscreenKind,
    pub(crate) parent_zone: ZoneKey,
    pub(crate) parent_cell: CellCoord,
    pub(crate) depth: u32,
    pub(crate) grid: Grid,
    pub(crate) doorway: CellCoord,
}

impl Subscreen {
    /// Kind of interior.
    #[must_use]
    pub const fn kind(&self) -> SubscreenKind {
        self.kind
    }

    /// Overworld zone the interior hangs off.
    #[must_use]
    pub const fn parent_zone(&self) -> ZoneKey {
        self.parent_zone
    }

    /// Overworld cell holding the entrance.
    #[must_use]
    pub const fn parent_cell(&self) -> CellCoord {
        self.parent_cell
    }

    /// Depth below the surface; houses are always depth one.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    /// Terrain grid of the interior.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Entrance and exit cell.
    #[must_use]
    pub const fn doorway(&self) -> CellCoord {
        self.doorway
    }
}

/// Registry of every generated interior.
///
/// Houses are distinct per building cell. Caves are one system per zone, so
/// every cave mouth in a zone leads to the same level one.
#[derive(Debug, Default)]
pub(crate) struct SubscreenRegistry {
    interiors: BTreeMap<SubscreenKey, Subscreen>,
    houses: BTreeMap<(ZoneKey, CellCoord), SubscreenKey>,
    caves: BTreeMap<(ZoneKey, u32), SubscreenKey>,
    next_key: u32,
}

impl SubscreenRegistry {
    pub(crate) fn get(&self, key: SubscreenKey) -> Option<&Subscreen> {
        self.interiors.get(&key)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&SubscreenKey, &Subscreen)> {
        self.interiors.iter()
    }

    pub(crate) fn lookup(
        &self,
        kind: SubscreenKind,
        zone: ZoneKey,
        cell: CellCoord,
        depth: u32,
    ) -> Option<SubscreenKey> {
        match kind {
            SubscreenKind::House => self.houses.get(&(zone, cell)).copied(),
            SubscreenKind::Cave => self.caves.get(&(zone, depth)).copied(),
        }
    }

    pub(crate) fn insert(&mut self, subscreen: Subscreen) -> SubscreenKey {
        let key = SubscreenKey::new(self.next_key);
        self.next_key = self.next_key.saturating_add(1);
        match subscreen.kind {
            SubscreenKind::House => {
                let _ = self
                    .houses
                    .insert((subscreen.parent_zone, subscreen.parent_cell), key);
            }
            SubscreenKind::Cave => {
                let _ = self
                    .caves
                    .insert((subscreen.parent_zone, subscreen.depth), key);
            }
        }
        let _ = self.interiors.insert(key, subscreen);
        key
    }
}
