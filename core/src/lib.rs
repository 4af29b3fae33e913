#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Starcell movement engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems consume event streams,
//! query immutable snapshots such as [`EntityView`], and respond exclusively
//! with new command batches.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when a simulation boots.
pub const WELCOME_BANNER: &str = "Starcell simulation online.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Advances the simulation clock by a single tick, giving doubled
    /// entities in quiet zones their chance to split.
    Tick,
    /// Requests that a new entity be created at the provided location.
    SpawnEntity {
        /// Description of the entity to create.
        spawn: EntitySpawn,
    },
    /// Removes an entity from the registry, its memory and the membership index.
    DespawnEntity {
        /// Identifier of the entity to remove.
        entity: EntityId,
    },
    /// Requests a single goal-free step for the entity.
    Wander {
        /// Identifier of the wandering entity.
        entity: EntityId,
    },
    /// Requests a single prioritized step toward a cell in the entity's region.
    MoveToward {
        /// Identifier of the moving entity.
        entity: EntityId,
        /// Cell the entity is steering toward.
        goal: CellCoord,
    },
    /// Requests a single greedy, rate-limited step toward a cell.
    Seek {
        /// Identifier of the seeking entity.
        entity: EntityId,
        /// Cell the entity is steering toward.
        goal: CellCoord,
    },
    /// Drives the entity toward a zone exit corridor and attempts the crossing.
    SeekZoneExit {
        /// Identifier of the travelling entity.
        entity: EntityId,
        /// Edge assigned by the behavior layer, if any; the nearest edge otherwise.
        preferred: Option<Edge>,
    },
    /// Attempts a crossing through whichever open corridor the entity stands in.
    EnterViaEntrance {
        /// Identifier of the travelling entity.
        entity: EntityId,
    },
    /// Attempts to enter an adjacent house or cave.
    EnterSubscreen {
        /// Identifier of the entering entity.
        entity: EntityId,
    },
    /// Returns the entity from its interior to the parent zone.
    ExitSubscreen {
        /// Identifier of the leaving entity.
        entity: EntityId,
    },
    /// Moves the entity one cell toward its interior's exit, leaving once there.
    StepTowardSubscreenExit {
        /// Identifier of the leaving entity.
        entity: EntityId,
    },
    /// Moves the entity one cave level deeper when it stands on stairs down.
    DescendCave {
        /// Identifier of the descending entity.
        entity: EntityId,
    },
    /// Moves the entity one cave level up when it stands on stairs up.
    AscendCave {
        /// Identifier of the ascending entity.
        entity: EntityId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Tick index that became current.
        tick: u64,
    },
    /// Announces that a zone was generated on first reference.
    ZoneGenerated {
        /// Key of the generated zone.
        zone: ZoneKey,
        /// Exit flags after reconciliation with existing neighbours.
        exits: Exits,
    },
    /// Confirms that an entity was created.
    EntitySpawned {
        /// Identifier assigned to the new entity.
        entity: EntityId,
        /// Region the entity was registered in.
        region: Region,
        /// Cell the entity occupies after spawning.
        cell: CellCoord,
    },
    /// Confirms that an entity was removed.
    EntityDespawned {
        /// Identifier of the removed entity.
        entity: EntityId,
    },
    /// Confirms that an entity stepped to an adjacent cell.
    EntityMoved {
        /// Identifier of the moving entity.
        entity: EntityId,
        /// Region both cells belong to.
        region: Region,
        /// Cell occupied before the step.
        from: CellCoord,
        /// Cell occupied after the step.
        to: CellCoord,
        /// Direction of travel.
        direction: Direction,
    },
    /// Reports that no candidate step was viable for an entity this call.
    EntityStalled {
        /// Identifier of the stalled entity.
        entity: EntityId,
        /// Consecutive failed-move count after this stall.
        stuck_counter: u32,
        /// Recovery tier applied in response to the stall.
        release: Escalation,
    },
    /// Reports that an entity gave up on a goal it could not reach.
    GoalAbandoned {
        /// Identifier of the entity that abandoned the goal.
        entity: EntityId,
        /// Goal cell that was abandoned.
        goal: CellCoord,
    },
    /// Confirms that an entity crossed into an adjacent zone.
    ZoneCrossed {
        /// Identifier of the travelling entity.
        entity: EntityId,
        /// Zone the entity left.
        from: ZoneKey,
        /// Zone the entity entered.
        to: ZoneKey,
        /// Edge of the departed zone the entity crossed.
        edge: Edge,
        /// Landing cell inside the destination zone.
        cell: CellCoord,
    },
    /// Reports that an explicitly requested crossing was refused.
    ZoneCrossingRejected {
        /// Identifier of the entity whose crossing failed.
        entity: EntityId,
        /// Reason the crossing was refused.
        reason: CrossingRejection,
    },
    /// Announces that a crossing entity was absorbed by a zone resident.
    EntitiesMerged {
        /// Entity that ceased to exist.
        absorbed: EntityId,
        /// Entity that absorbed it.
        survivor: EntityId,
        /// Zone the merge happened in.
        zone: ZoneKey,
    },
    /// Announces that a doubled entity split back into two.
    EntitySplit {
        /// Entity that reverted to a single.
        entity: EntityId,
        /// Entity created next to it.
        offspring: EntityId,
        /// Zone the split happened in.
        zone: ZoneKey,
        /// Cell the offspring was placed on.
        cell: CellCoord,
    },
    /// Confirms that an entity entered an interior.
    SubscreenEntered {
        /// Identifier of the entering entity.
        entity: EntityId,
        /// Interior the entity now occupies.
        subscreen: SubscreenKey,
        /// Kind of interior entered.
        kind: SubscreenKind,
    },
    /// Confirms that an entity returned from an interior to its parent zone.
    SubscreenExited {
        /// Identifier of the leaving entity.
        entity: EntityId,
        /// Interior the entity left.
        subscreen: SubscreenKey,
        /// Zone the entity returned to.
        zone: ZoneKey,
        /// Cell the entity occupies in the parent zone.
        cell: CellCoord,
    },
    /// Confirms that an entity moved between cave levels.
    CaveLevelChanged {
        /// Identifier of the moving entity.
        entity: EntityId,
        /// Level the entity left.
        from: SubscreenKey,
        /// Level the entity entered.
        to: SubscreenKey,
        /// Depth of the entered level.
        depth: u32,
    },
    /// Publishes the movement statistics gathered for the latest tick.
    AnalyticsUpdated {
        /// Snapshot of the statistics.
        report: StatsReport,
    },
}

/// Unique identifier assigned to an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Position of a zone on the unbounded overworld lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneKey {
    x: i32,
    y: i32,
}

impl ZoneKey {
    /// Creates a zone key from lattice coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Horizontal lattice coordinate; grows eastward.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Vertical lattice coordinate; grows southward.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Key of the zone sharing the provided edge with this one.
    #[must_use]
    pub const fn neighbor(self, edge: Edge) -> Self {
        match edge {
            Edge::Top => Self::new(self.x, self.y - 1),
            Edge::Bottom => Self::new(self.x, self.y + 1),
            Edge::Left => Self::new(self.x - 1, self.y),
            Edge::Right => Self::new(self.x + 1, self.y),
        }
    }
}

/// Identifier assigned to a generated interior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscreenKey(u32);

impl SubscreenKey {
    /// Creates a new interior identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Grid an entity can be registered in: an overworld zone or an interior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    /// Overworld zone.
    Zone(ZoneKey),
    /// House interior or cave level.
    Subscreen(SubscreenKey),
}

/// Location of a single grid cell, local to its region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Chebyshev (king-move) distance between two cell coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Applies a single cardinal step, reporting the edge crossed when the
    /// destination falls outside a grid of the provided dimensions.
    #[must_use]
    pub fn step(self, direction: Direction, dimensions: ZoneDimensions) -> Step {
        let (x, y) = (i64::from(self.x), i64::from(self.y));
        let (dx, dy) = direction.delta();
        let (nx, ny) = (x + i64::from(dx), y + i64::from(dy));
        if ny < 0 {
            return Step::Beyond(Edge::Top);
        }
        if ny >= i64::from(dimensions.height()) {
            return Step::Beyond(Edge::Bottom);
        }
        if nx < 0 {
            return Step::Beyond(Edge::Left);
        }
        if nx >= i64::from(dimensions.width()) {
            return Step::Beyond(Edge::Right);
        }
        match (u32::try_from(nx), u32::try_from(ny)) {
            (Ok(nx), Ok(ny)) => Step::Within(CellCoord::new(nx, ny)),
            _ => Step::Beyond(direction.edge()),
        }
    }
}

/// Outcome of applying a cardinal step to a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The destination lies inside the grid.
    Within(CellCoord),
    /// The step leaves the grid through the named edge.
    Beyond(Edge),
}

/// Cardinal movement directions available to entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    Up,
    /// Movement toward increasing row indices.
    Down,
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// All directions in the fixed up, down, left, right order.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Column and row offsets of a single step.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Reports whether the direction moves along the column axis.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Direction::Left | Direction::Right)
    }

    /// The two directions orthogonal to this one.
    #[must_use]
    pub const fn perpendicular(self) -> [Direction; 2] {
        if self.is_horizontal() {
            [Direction::Down, Direction::Up]
        } else {
            [Direction::Right, Direction::Left]
        }
    }

    /// Edge a step in this direction leaves a grid through.
    #[must_use]
    pub const fn edge(self) -> Edge {
        match self {
            Direction::Up => Edge::Top,
            Direction::Down => Edge::Bottom,
            Direction::Left => Edge::Left,
            Direction::Right => Edge::Right,
        }
    }

    /// Direction of a single cardinal step between two cells, if they are
    /// exactly one step apart.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        if from.manhattan_distance(to) != 1 {
            return None;
        }
        if to.x() > from.x() {
            Some(Direction::Right)
        } else if to.x() < from.x() {
            Some(Direction::Left)
        } else if to.y() > from.y() {
            Some(Direction::Down)
        } else {
            Some(Direction::Up)
        }
    }
}

/// Edges of a zone grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Edge {
    /// Row zero.
    Top,
    /// Last row.
    Bottom,
    /// Column zero.
    Left,
    /// Last column.
    Right,
}

impl Edge {
    /// All edges in top, bottom, left, right order.
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Bottom, Edge::Left, Edge::Right];

    /// Edge on the adjacent zone that touches this one.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Edge::Top => Edge::Bottom,
            Edge::Bottom => Edge::Top,
            Edge::Left => Edge::Right,
            Edge::Right => Edge::Left,
        }
    }

    /// Facing assigned to an entity that just crossed through this edge.
    #[must_use]
    pub const fn travel_direction(self) -> Direction {
        match self {
            Edge::Top => Direction::Up,
            Edge::Bottom => Direction::Down,
            Edge::Left => Direction::Left,
            Edge::Right => Direction::Right,
        }
    }
}

/// Open/closed state of the four edge corridors of a zone.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exits {
    /// Corridor on row zero.
    pub top: bool,
    /// Corridor on the last row.
    pub bottom: bool,
    /// Corridor on column zero.
    pub left: bool,
    /// Corridor on the last column.
    pub right: bool,
}

impl Exits {
    /// Exit set with every corridor open.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            top: true,
            bottom: true,
            left: true,
            right: true,
        }
    }

    /// Exit set with every corridor sealed.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            top: false,
            bottom: false,
            left: false,
            right: false,
        }
    }

    /// Reports whether the corridor on the provided edge is open.
    #[must_use]
    pub const fn is_open(&self, edge: Edge) -> bool {
        match edge {
            Edge::Top => self.top,
            Edge::Bottom => self.bottom,
            Edge::Left => self.left,
            Edge::Right => self.right,
        }
    }

    /// Opens or seals the corridor on the provided edge.
    pub fn set(&mut self, edge: Edge, open: bool) {
        match edge {
            Edge::Top => self.top = open,
            Edge::Bottom => self.bottom = open,
            Edge::Left => self.left = open,
            Edge::Right => self.right = open,
        }
    }

    /// Number of open corridors.
    #[must_use]
    pub fn count(&self) -> usize {
        Edge::ALL.iter().filter(|edge| self.is_open(**edge)).count()
    }

    /// Iterator over the open edges in top, bottom, left, right order.
    pub fn open_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        Edge::ALL.into_iter().filter(|edge| self.is_open(*edge))
    }
}

/// Dimensions shared by every zone and interior grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneDimensions {
    width: u32,
    height: u32,
}

impl ZoneDimensions {
    /// Creates a new dimension descriptor.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of columns.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    #[must_use]
    pub const fn area(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x() < self.width && cell.y() < self.height
    }

    /// Inclusive range of coordinates spanned by the corridor on the axis
    /// parallel to the provided edge.
    ///
    /// Corridors are two cells wide and end at the edge midpoint, so a
    /// 24-column zone carries its top and bottom corridors on columns 11 and 12.
    #[must_use]
    pub const fn corridor_band(&self, edge: Edge) -> (u32, u32) {
        let center = match edge {
            Edge::Top | Edge::Bottom => self.width / 2,
            Edge::Left | Edge::Right => self.height / 2,
        };
        (center.saturating_sub(1), center)
    }

    /// Reports whether the cell's coordinate parallel to the edge lies inside
    /// the edge's corridor band.
    #[must_use]
    pub const fn in_corridor_band(&self, edge: Edge, cell: CellCoord) -> bool {
        let (low, high) = self.corridor_band(edge);
        let along = match edge {
            Edge::Top | Edge::Bottom => cell.x(),
            Edge::Left | Edge::Right => cell.y(),
        };
        along >= low && along <= high
    }

    /// The two border cells forming the corridor on the provided edge.
    #[must_use]
    pub const fn corridor_cells(&self, edge: Edge) -> [CellCoord; 2] {
        let (low, high) = self.corridor_band(edge);
        match edge {
            Edge::Top => [CellCoord::new(low, 0), CellCoord::new(high, 0)],
            Edge::Bottom => [
                CellCoord::new(low, self.height - 1),
                CellCoord::new(high, self.height - 1),
            ],
            Edge::Left => [CellCoord::new(0, low), CellCoord::new(0, high)],
            Edge::Right => [
                CellCoord::new(self.width - 1, low),
                CellCoord::new(self.width - 1, high),
            ],
        }
    }

    /// Border cell at the midpoint of the provided edge.
    #[must_use]
    pub const fn edge_midpoint(&self, edge: Edge) -> CellCoord {
        match edge {
            Edge::Top => CellCoord::new(self.width / 2, 0),
            Edge::Bottom => CellCoord::new(self.width / 2, self.height - 1),
            Edge::Left => CellCoord::new(0, self.height / 2),
            Edge::Right => CellCoord::new(self.width - 1, self.height / 2),
        }
    }

    /// Number of rows or columns separating the cell from the provided edge.
    #[must_use]
    pub const fn distance_to_edge(&self, cell: CellCoord, edge: Edge) -> u32 {
        match edge {
            Edge::Top => cell.y(),
            Edge::Bottom => self.height.saturating_sub(1 + cell.y()),
            Edge::Left => cell.x(),
            Edge::Right => self.width.saturating_sub(1 + cell.x()),
        }
    }

    /// Landing cell in the neighbouring zone for an entity leaving through
    /// `edge` from `cell`: the coordinate along the edge is preserved and the
    /// entity is placed one cell inside the opposite edge.
    #[must_use]
    pub const fn mirrored_entry(&self, edge: Edge, cell: CellCoord) -> CellCoord {
        match edge {
            Edge::Top => CellCoord::new(cell.x(), self.height.saturating_sub(2)),
            Edge::Bottom => CellCoord::new(cell.x(), 1),
            Edge::Left => CellCoord::new(self.width.saturating_sub(2), cell.y()),
            Edge::Right => CellCoord::new(1, cell.y()),
        }
    }

    /// Entrance and exit cell of an interior: bottom center, one row above the wall.
    #[must_use]
    pub const fn interior_doorway(&self) -> CellCoord {
        CellCoord::new(self.width / 2, self.height.saturating_sub(2))
    }
}

impl Default for ZoneDimensions {
    fn default() -> Self {
        Self::new(24, 18)
    }
}

/// Terrain cell identifiers stored in zone and interior grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CellKind {
    /// Open grassland.
    Grass,
    /// Bare earth.
    Dirt,
    /// Beach or desert sand.
    Sand,
    /// Shallow, wadeable water.
    Water,
    /// Deep water that blocks walkers and fliers.
    DeepWater,
    /// Decorative flower patch.
    Flower,
    /// Tree trunk.
    Tree,
    /// Boulder or rock outcrop.
    Stone,
    /// Constructed wall.
    Wall,
    /// House facade; enterable.
    House,
    /// Smithing forge.
    Forge,
    /// Cave mouth; enterable.
    Cave,
    /// Mine shaft; enterable as a cave.
    Mineshaft,
    /// Cave rock wall.
    CaveWall,
    /// Cave floor.
    CaveFloor,
    /// Wooden interior floor.
    FloorWood,
    /// Wooden planking.
    Wood,
    /// Storage chest.
    Chest,
    /// Stairs leading one cave level deeper.
    StairsDown,
    /// Stairs leading one cave level up.
    StairsUp,
}

/// Kind of interior reachable through an enterable cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubscreenKind {
    /// Building interior, distinct per building cell.
    House,
    /// Cave level, shared by every cave mouth of a zone.
    Cave,
}

/// Entity archetypes recognised by the movement rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Archetype {
    /// Crop tender.
    Farmer,
    /// Travelling merchant.
    Trader,
    /// Woodcutter.
    Lumberjack,
    /// Digger; may enter caves.
    Miner,
    /// Settlement guard.
    Guard,
    /// Faction fighter.
    Warrior,
    /// Smith.
    Blacksmith,
    /// Pack predator.
    Wolf,
    /// Cave dweller.
    Goblin,
    /// Small flier.
    Bat,
    /// Grazing animal.
    Deer,
}

impl Archetype {
    /// Reports whether the archetype is a humanoid with a long memory lane.
    #[must_use]
    pub const fn is_humanoid(self) -> bool {
        matches!(
            self,
            Archetype::Farmer
                | Archetype::Trader
                | Archetype::Lumberjack
                | Archetype::Miner
                | Archetype::Guard
                | Archetype::Warrior
                | Archetype::Blacksmith
                | Archetype::Goblin
        )
    }

    /// Reports whether non-hostile members of the archetype may enter houses.
    #[must_use]
    pub const fn enters_houses(self) -> bool {
        matches!(
            self,
            Archetype::Farmer
                | Archetype::Trader
                | Archetype::Lumberjack
                | Archetype::Miner
                | Archetype::Guard
                | Archetype::Warrior
                | Archetype::Blacksmith
        )
    }

    /// Default memory lane capacity for the archetype.
    #[must_use]
    pub const fn memory_capacity(self) -> usize {
        if self.is_humanoid() {
            25
        } else {
            10
        }
    }
}

/// Description of an entity requested by the spawn collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpawn {
    /// Archetype of the new entity.
    pub archetype: Archetype,
    /// Zone the entity is placed in.
    pub zone: ZoneKey,
    /// Cell the entity is placed on.
    pub cell: CellCoord,
    /// Whether the entity moves over most solid terrain.
    pub flying: bool,
    /// Whether the entity is hostile.
    pub hostile: bool,
    /// Starting level, used by merges.
    pub level: u32,
    /// Memory lane capacity; the archetype default when `None`.
    pub memory_capacity: Option<usize>,
}

impl EntitySpawn {
    /// Creates a grounded, peaceful, level one spawn request.
    #[must_use]
    pub const fn new(archetype: Archetype, zone: ZoneKey, cell: CellCoord) -> Self {
        Self {
            archetype,
            zone,
            cell,
            flying: false,
            hostile: false,
            level: 1,
            memory_capacity: None,
        }
    }

    /// Marks the request as a flying mover.
    #[must_use]
    pub const fn flying(mut self) -> Self {
        self.flying = true;
        self
    }

    /// Marks the request as hostile.
    #[must_use]
    pub const fn hostile(mut self) -> Self {
        self.hostile = true;
        self
    }

    /// Overrides the default memory lane capacity.
    #[must_use]
    pub const fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = Some(capacity);
        self
    }
}

/// Recovery tier applied when an entity finds no viable step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Escalation {
    /// Nothing released; the entity waits.
    Hold,
    /// The oldest half of the memory lane was dropped.
    HalveMemory,
    /// The memory lane was emptied.
    ClearMemory,
    /// One step was attempted while ignoring memory.
    IgnoreMemory,
}

/// Reasons an explicitly requested zone crossing may be refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum CrossingRejection {
    /// The entity is inside an interior.
    #[error("entity is inside an interior")]
    NotOnOverworld,
    /// The entity does not stand in an open corridor within one cell of an edge.
    #[error("entity is not standing in an open exit corridor")]
    NotAtExit,
    /// The entity changed zones or interiors too recently.
    #[error("zone change cooldown has not elapsed")]
    Cooldown,
    /// The landing cell in the destination zone is solid.
    #[error("landing cell in the destination zone is solid")]
    SolidEntry,
    /// The landing cell was already claimed this tick.
    #[error("landing cell was claimed by another mover this tick")]
    Reserved,
    /// Another entity stands on the landing cell.
    #[error("landing cell is occupied")]
    Occupied,
    /// The destination zone is full and no merge partner exists.
    #[error("destination zone is at its population cap")]
    PopulationCap,
}

/// Kinds of links recorded in the zone graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConnectionKind {
    /// Overworld cell leading into an interior.
    StructureEntrance,
    /// Cave level leading to the level above it.
    StructureExit,
    /// Corridor between adjacent zones.
    ZoneExit,
}

/// Directed half of a symmetric zone graph edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Connection {
    /// Region the link starts in.
    pub from: Region,
    /// Region the link leads to.
    pub to: Region,
    /// Kind of link.
    pub kind: ConnectionKind,
    /// Cell the link is anchored at.
    pub cell: CellCoord,
}

/// Immutable representation of a single entity's state used for queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Unique identifier assigned to the entity.
    pub id: EntityId,
    /// Archetype of the entity.
    pub archetype: Archetype,
    /// Region the entity is registered in.
    pub region: Region,
    /// Overworld zone containing the entity or its interior.
    pub zone: ZoneKey,
    /// Cell occupied inside the region.
    pub cell: CellCoord,
    /// Direction of the last step.
    pub facing: Direction,
    /// Set for exactly one tick after a successful step.
    pub is_moving: bool,
    /// Whether the entity flies.
    pub flying: bool,
    /// Whether the entity is hostile.
    pub hostile: bool,
    /// Current level.
    pub level: u32,
    /// Whether the entity absorbed another through a merge.
    pub doubled: bool,
    /// Recently visited cells, oldest first.
    pub memory_lane: Vec<CellCoord>,
    /// Consecutive failed-move count.
    pub stuck_counter: u32,
    /// Consecutive calls with an unchanged goal.
    pub target_stuck_counter: u32,
    /// Tick of the last zone change, if any.
    pub last_zone_change_tick: Option<u64>,
    /// Tick of the last interior transition, if any.
    pub last_subscreen_change_tick: Option<u64>,
    /// Cave depth while inside a cave level.
    pub cave_depth: Option<u32>,
}

/// Read-only snapshot describing all live entities.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    snapshots: Vec<EntitySnapshot>,
}

impl EntityView {
    /// Creates a new entity view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EntitySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.snapshots.iter()
    }

    /// Looks up a single entity's snapshot.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.snapshots
            .binary_search_by_key(&id, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EntitySnapshot> {
        self.snapshots
    }
}

/// Counters describing movement activity over some span of ticks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementCounters {
    /// Successful single-cell steps.
    pub steps: u64,
    /// Calls that found no viable step.
    pub stalls: u64,
    /// Stalls that released memory or forced a step.
    pub escalations: u64,
    /// Completed zone crossings.
    pub zone_crossings: u64,
    /// Explicit crossings that were refused.
    pub rejected_crossings: u64,
    /// Entities absorbed by population-cap merges.
    pub merges: u64,
    /// Doubled entities that split in quiet zones.
    pub splits: u64,
    /// Interior entries.
    pub subscreen_entries: u64,
    /// Interior exits.
    pub subscreen_exits: u64,
    /// Cave level changes.
    pub cave_level_changes: u64,
    /// Abandoned goals.
    pub abandoned_goals: u64,
}

/// Movement statistics published by the analytics system.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatsReport {
    /// Tick the report describes.
    pub tick: u64,
    /// Activity observed during the tick.
    pub latest: MovementCounters,
    /// Activity accumulated since the first tick.
    pub totals: MovementCounters,
    /// Number of live entities at the end of the tick.
    pub live_entities: u64,
}
