//! Zone and interior generation collaborators.
//!
//! The world asks a [`ZoneSource`] for terrain the first time a zone or an
//! interior is referenced. Sources only propose terrain and exits; the world
//! reconciles exits with existing neighbours and carves or seals corridors.

use std::collections::BTreeMap;

use rand::{seq::SliceRandom, Rng, RngCore};
use starcell_core::{
    CellCoord, CellKind, Edge, Exits, SubscreenKind, ZoneDimensions, ZoneKey,
};
use thiserror::Error;

use crate::zone::Grid;

/// Terrain and exit proposal for a freshly referenced zone.
#[derive(Clone, Debug)]
pub struct ZoneBlueprint {
    /// Proposed terrain.
    pub grid: Grid,
    /// Proposed corridor flags; existing neighbours take precedence.
    pub exits: Exits,
    /// Walkable cell kind used when a corridor has to be carved.
    pub floor: CellKind,
}

/// Parameters of an interior the world needs generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscreenRequest {
    /// Kind of interior.
    pub kind: SubscreenKind,
    /// Overworld zone hosting the entrance.
    pub parent_zone: ZoneKey,
    /// Overworld cell holding the entrance.
    pub parent_cell: CellCoord,
    /// Depth below the surface, starting at one.
    pub depth: u32,
}

/// Supplies terrain for zones and interiors on first reference.
pub trait ZoneSource {
    /// Proposes terrain and exits for a zone.
    fn generate_zone(
        &mut self,
        zone: ZoneKey,
        dimensions: ZoneDimensions,
        rng: &mut dyn RngCore,
    ) -> ZoneBlueprint;

    /// Produces the terrain of an interior. The doorway at
    /// [`ZoneDimensions::interior_doorway`] must be walkable, and cave levels
    /// deeper than one must place stairs up on it.
    fn generate_subscreen(
        &mut self,
        request: &SubscreenRequest,
        dimensions: ZoneDimensions,
        rng: &mut dyn RngCore,
    ) -> Grid;
}

/// Rows kept clear of scattered obstacles in front of each corridor.
const APPROACH_DEPTH: u32 = 3;

#[derive(Clone, Copy, Debug)]
struct Biome {
    floor: CellKind,
    scatter: &'static [(CellKind, f64)],
}

const BIOMES: [Biome; 4] = [
    Biome {
        floor: CellKind::Grass,
        scatter: &[
            (CellKind::Tree, 0.08),
            (CellKind::Flower, 0.04),
            (CellKind::Stone, 0.02),
        ],
    },
    Biome {
        floor: CellKind::Grass,
        scatter: &[(CellKind::Tree, 0.22), (CellKind::Dirt, 0.05)],
    },
    Biome {
        floor: CellKind::Sand,
        scatter: &[(CellKind::Stone, 0.05), (CellKind::Dirt, 0.05)],
    },
    Biome {
        floor: CellKind::Grass,
        scatter: &[
            (CellKind::Water, 0.10),
            (CellKind::DeepWater, 0.03),
            (CellKind::Tree, 0.04),
        ],
    },
];

/// Random biomes, walled borders and occasional houses or caves.
#[derive(Clone, Copy, Debug)]
pub struct ProceduralSource {
    structure_chance: f64,
    stairs_down_chance: f64,
}

impl ProceduralSource {
    /// Creates a source with the standard structure and stairs odds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            structure_chance: 0.3,
            stairs_down_chance: 0.7,
        }
    }

    fn roll_exits(rng: &mut dyn RngCore) -> Exits {
        let mut edges = Edge::ALL;
        edges.shuffle(rng);
        let mut exits = Exits::none();
        let open = if rng.gen_bool(0.5) { 3 } else { 2 };
        for edge in edges.into_iter().take(open) {
            exits.set(edge, true);
        }
        exits
    }

    fn place_structure(grid: &mut Grid, floor: CellKind, rng: &mut dyn RngCore) {
        let dimensions = grid.dimensions();
        let kind = if rng.gen_bool(0.5) {
            CellKind::House
        } else {
            CellKind::Cave
        };
        for _ in 0..16 {
            let cell = CellCoord::new(
                rng.gen_range(2..dimensions.width() - 2),
                rng.gen_range(2..dimensions.height() - 2),
            );
            if in_approach_lane(dimensions, cell) {
                continue;
            }
            grid.set(cell, kind);
            // The doorstep below the structure stays walkable.
            grid.set(CellCoord::new(cell.x(), cell.y() + 1), floor);
            return;
        }
    }
}

impl Default for ProceduralSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ZoneSource for ProceduralSource {
    fn generate_zone(
        &mut self,
        zone: ZoneKey,
        dimensions: ZoneDimensions,
        rng: &mut dyn RngCore,
    ) -> ZoneBlueprint {
        let biome = BIOMES
            .choose(rng)
            .copied()
            .unwrap_or(BIOMES[0]);
        let mut grid = Grid::filled(dimensions, biome.floor);
        for y in 1..dimensions.height() - 1 {
            for x in 1..dimensions.width() - 1 {
                let cell = CellCoord::new(x, y);
                if in_approach_lane(dimensions, cell) {
                    continue;
                }
                for (kind, chance) in biome.scatter {
                    if rng.gen_bool(*chance) {
                        grid.set(cell, *kind);
                        break;
                    }
                }
            }
        }
        grid.outline(CellKind::Wall);
        if rng.gen_bool(self.structure_chance) {
            Self::place_structure(&mut grid, biome.floor, rng);
        }
        tracing::trace!(x = zone.x(), y = zone.y(), floor = ?biome.floor, "zone terrain rolled");
        ZoneBlueprint {
            grid,
            exits: Self::roll_exits(rng),
            floor: biome.floor,
        }
    }

    fn generate_subscreen(
        &mut self,
        request: &SubscreenRequest,
        dimensions: ZoneDimensions,
        rng: &mut dyn RngCore,
    ) -> Grid {
        let doorway = dimensions.interior_doorway();
        match request.kind {
            SubscreenKind::House => {
                let mut grid = house_shell(dimensions);
                for x in 2..dimensions.width() - 2 {
                    if rng.gen_bool(0.1) {
                        grid.set(CellCoord::new(x, 1), CellKind::Chest);
                    }
                }
                grid
            }
            SubscreenKind::Cave => {
                let mut grid = Grid::filled(dimensions, CellKind::CaveFloor);
                grid.outline(CellKind::CaveWall);
                for y in 1..dimensions.height() - 1 {
                    for x in 1..dimensions.width() - 1 {
                        let cell = CellCoord::new(x, y);
                        if cell.chebyshev_distance(doorway) > 1 && rng.gen_bool(0.08) {
                            grid.set(cell, CellKind::Stone);
                        }
                    }
                }
                if rng.gen_bool(self.stairs_down_chance) {
                    let stairs = CellCoord::new(
                        rng.gen_range(2..dimensions.width() - 2),
                        rng.gen_range(2..dimensions.height() / 2),
                    );
                    grid.set(stairs, CellKind::StairsDown);
                }
                if request.depth > 1 {
                    grid.set(doorway, CellKind::StairsUp);
                }
                grid
            }
        }
    }
}

/// Flat walled pastures with optional hand-drawn zones, for scripted runs.
#[derive(Clone, Debug)]
pub struct OpenFieldSource {
    exits: Exits,
    layouts: BTreeMap<ZoneKey, ZoneLayout>,
}

impl OpenFieldSource {
    /// Creates a source whose zones propose the provided exits.
    #[must_use]
    pub fn new(exits: Exits) -> Self {
        Self {
            exits,
            layouts: BTreeMap::new(),
        }
    }

    /// Uses a hand-drawn layout for one zone.
    #[must_use]
    pub fn with_layout(mut self, zone: ZoneKey, layout: ZoneLayout) -> Self {
        let _ = self.layouts.insert(zone, layout);
        self
    }
}

impl ZoneSource for OpenFieldSource {
    fn generate_zone(
        &mut self,
        zone: ZoneKey,
        dimensions: ZoneDimensions,
        _rng: &mut dyn RngCore,
    ) -> ZoneBlueprint {
        let grid = match self.layouts.get(&zone) {
            Some(layout) if layout.dimensions == dimensions => layout.grid.clone(),
            Some(_) => {
                tracing::warn!(
                    x = zone.x(),
                    y = zone.y(),
                    "layout dimensions differ from the world's; using open field"
                );
                open_field(dimensions)
            }
            None => open_field(dimensions),
        };
        ZoneBlueprint {
            grid,
            exits: self.exits,
            floor: CellKind::Grass,
        }
    }

    fn generate_subscreen(
        &mut self,
        request: &SubscreenRequest,
        dimensions: ZoneDimensions,
        _rng: &mut dyn RngCore,
    ) -> Grid {
        match request.kind {
            SubscreenKind::House => house_shell(dimensions),
            SubscreenKind::Cave => {
                let mut grid = Grid::filled(dimensions, CellKind::CaveFloor);
                grid.outline(CellKind::CaveWall);
                grid.set(
                    CellCoord::new(dimensions.width() / 2, 2),
                    CellKind::StairsDown,
                );
                if request.depth > 1 {
                    grid.set(dimensions.interior_doorway(), CellKind::StairsUp);
                }
                grid
            }
        }
    }
}

/// Hand-drawn zone terrain parsed from ASCII rows.
///
/// | Glyph | Cell |
/// |---|---|
/// | `.` | grass |
/// | `,` | dirt |
/// | `:` | sand |
/// | `w` | water |
/// | `~` | deep water |
/// | `T` | tree |
/// | `S` | stone |
/// | `#` | wall |
/// | `H` | house |
/// | `C` | cave |
/// | `M` | mineshaft |
/// | `F` | forge |
/// | `=` | wood floor |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneLayout {
    dimensions: ZoneDimensions,
    grid: Grid,
}

impl ZoneLayout {
    /// Parses a layout; blank lines and surrounding whitespace are ignored.
    pub fn parse(text: &str) -> Result<Self, LayoutError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = rows.first() else {
            return Err(LayoutError::Empty);
        };
        let width = first.chars().count();
        let width_u32 = u32::try_from(width).map_err(|_| LayoutError::TooLarge)?;
        let height_u32 = u32::try_from(rows.len()).map_err(|_| LayoutError::TooLarge)?;
        let dimensions = ZoneDimensions::new(width_u32, height_u32);
        let mut grid = Grid::filled(dimensions, CellKind::Grass);
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(LayoutError::RaggedRow {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let kind = glyph_kind(glyph).ok_or(LayoutError::UnknownGlyph {
                    glyph,
                    row: y,
                    column: x,
                })?;
                let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                    return Err(LayoutError::TooLarge);
                };
                grid.set(CellCoord::new(x, y), kind);
            }
        }
        Ok(Self { dimensions, grid })
    }

    /// Dimensions described by the layout.
    #[must_use]
    pub const fn dimensions(&self) -> ZoneDimensions {
        self.dimensions
    }
}

/// Errors reported while parsing a [`ZoneLayout`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// The text contained no rows.
    #[error("layout contains no rows")]
    Empty,
    /// A row's length differs from the first row's.
    #[error("row {row} has {found} cells but {expected} were expected")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A glyph has no cell kind.
    #[error("unknown glyph {glyph:?} at row {row}, column {column}")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        column: usize,
    },
    /// The layout does not fit the coordinate range.
    #[error("layout exceeds the supported grid size")]
    TooLarge,
}

fn glyph_kind(glyph: char) -> Option<CellKind> {
    let kind = match glyph {
        '.' => CellKind::Grass,
        ',' => CellKind::Dirt,
        ':' => CellKind::Sand,
        'w' => CellKind::Water,
        '~' => CellKind::DeepWater,
        'T' => CellKind::Tree,
        'S' => CellKind::Stone,
        '#' => CellKind::Wall,
        'H' => CellKind::House,
        'C' => CellKind::Cave,
        'M' => CellKind::Mineshaft,
        'F' => CellKind::Forge,
        '=' => CellKind::FloorWood,
        _ => return None,
    };
    Some(kind)
}

fn open_field(dimensions: ZoneDimensions) -> Grid {
    let mut grid = Grid::filled(dimensions, CellKind::Grass);
    grid.outline(CellKind::Wall);
    grid
}

fn house_shell(dimensions: ZoneDimensions) -> Grid {
    let mut grid = Grid::filled(dimensions, CellKind::FloorWood);
    grid.outline(CellKind::Wall);
    let doorway = dimensions.interior_doorway();
    let bottom = dimensions.height() - 1;
    for x in doorway.x().saturating_sub(1)..=doorway.x() + 1 {
        grid.set(CellCoord::new(x, bottom), CellKind::FloorWood);
    }
    grid
}

fn in_approach_lane(dimensions: ZoneDimensions, cell: CellCoord) -> bool {
    Edge::ALL.into_iter().any(|edge| {
        dimensions.in_corridor_band(edge, cell)
            && dimensions.distance_to_edge(cell, edge) <= APPROACH_DEPTH
    })
}
