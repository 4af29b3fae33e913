#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Starcell movement engine.
//!
//! The world owns every zone, interior and entity. It is mutated only through
//! [`apply`], which executes one [`Command`] and appends the resulting
//! [`Event`] values, and read through the [`query`] module.

mod config;
mod crossing;
mod entity;
mod generation;
mod graph;
mod index;
mod interior;
mod memory;
mod planner;
mod reservation;
mod split;
mod terrain;
mod zone;

use std::{collections::BTreeMap, fmt};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use starcell_core::{
    CellCoord, CellKind, Command, ConnectionKind, Edge, EntityId, Event, Region, SubscreenKey,
    SubscreenKind, ZoneDimensions, ZoneKey, WELCOME_BANNER,
};

pub use config::{ConfigError, WorldConfig};
pub use generation::{
    LayoutError, OpenFieldSource, ProceduralSource, SubscreenRequest, ZoneBlueprint, ZoneLayout,
    ZoneSource,
};
pub use terrain::{StandardTerrain, TerrainQuery};
pub use zone::{Grid, Subscreen, Zone};

use entity::Entity;
use graph::ZoneGraph;
use index::EntityIndex;
use reservation::CellReservationTable;
use zone::SubscreenRegistry;

/// Represents the authoritative Starcell world state.
pub struct World {
    banner: &'static str,
    config: WorldConfig,
    tick: u64,
    rng: ChaCha8Rng,
    terrain: Box<dyn TerrainQuery>,
    source: Box<dyn ZoneSource>,
    zones: BTreeMap<ZoneKey, Zone>,
    subscreens: SubscreenRegistry,
    entities: BTreeMap<EntityId, Entity>,
    index: EntityIndex,
    graph: ZoneGraph,
    reservations: CellReservationTable,
    next_entity_id: u32,
}

impl World {
    /// Creates a world with the default configuration, standard terrain and
    /// procedural generation.
    #[must_use]
    pub fn new() -> Self {
        Self::assemble(
            WorldConfig::default(),
            Box::new(StandardTerrain),
            Box::new(ProceduralSource::new()),
        )
    }

    /// Starts building a world with custom collaborators.
    #[must_use]
    pub fn builder() -> WorldBuilder {
        WorldBuilder::default()
    }

    fn assemble(
        config: WorldConfig,
        terrain: Box<dyn TerrainQuery>,
        source: Box<dyn ZoneSource>,
    ) -> Self {
        Self {
            banner: WELCOME_BANNER,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            tick: 0,
            terrain,
            source,
            zones: BTreeMap::new(),
            subscreens: SubscreenRegistry::default(),
            entities: BTreeMap::new(),
            index: EntityIndex::default(),
            graph: ZoneGraph::default(),
            reservations: CellReservationTable::default(),
            next_entity_id: 0,
        }
    }

    pub(crate) const fn dimensions(&self) -> ZoneDimensions {
        self.config.dimensions()
    }

    pub(crate) fn grid(&self, region: Region) -> Option<&Grid> {
        match region {
            Region::Zone(key) => self.zones.get(&key).map(|zone| &zone.grid),
            Region::Subscreen(key) => self.subscreens.get(key).map(|interior| &interior.grid),
        }
    }

    /// Reports whether an entity other than `id` stands on the cell.
    pub(crate) fn occupied_by_other(&self, region: Region, cell: CellCoord, id: EntityId) -> bool {
        self.index.members(region).iter().any(|member| {
            *member != id
                && self
                    .entities
                    .get(member)
                    .is_some_and(|entity| entity.cell == cell)
        })
    }

    /// Generates the zone on first reference, reconciling its exits with
    /// existing neighbours.
    pub(crate) fn ensure_zone(&mut self, key: ZoneKey, out_events: &mut Vec<Event>) {
        if self.zones.contains_key(&key) {
            return;
        }
        let dimensions = self.dimensions();
        let blueprint = self.source.generate_zone(key, dimensions, &mut self.rng);
        let mut exits = blueprint.exits;
        let mut grid = blueprint.grid;
        for edge in Edge::ALL {
            if let Some(neighbor) = self.zones.get(&key.neighbor(edge)) {
                exits.set(edge, neighbor.exits.is_open(edge.opposite()));
            }
            let fill = if exits.is_open(edge) {
                blueprint.floor
            } else {
                CellKind::Wall
            };
            for cell in dimensions.corridor_cells(edge) {
                grid.set(cell, fill);
            }
        }
        for edge in exits.open_edges() {
            let neighbor = key.neighbor(edge);
            if self.zones.contains_key(&neighbor) {
                self.graph.connect(
                    Region::Zone(key),
                    Region::Zone(neighbor),
                    ConnectionKind::ZoneExit,
                    dimensions.edge_midpoint(edge),
                );
            }
        }
        let _ = self.zones.insert(
            key,
            Zone {
                grid,
                exits,
                floor: blueprint.floor,
            },
        );
        tracing::debug!(x = key.x(), y = key.y(), open = exits.count(), "zone generated");
        out_events.push(Event::ZoneGenerated { zone: key, exits });
    }

    /// Returns the interior for the entrance, generating it on first use.
    pub(crate) fn ensure_subscreen(
        &mut self,
        kind: SubscreenKind,
        parent_zone: ZoneKey,
        parent_cell: CellCoord,
        depth: u32,
    ) -> SubscreenKey {
        if let Some(key) = self.subscreens.lookup(kind, parent_zone, parent_cell, depth) {
            return key;
        }
        let dimensions = self.dimensions();
        let request = SubscreenRequest {
            kind,
            parent_zone,
            parent_cell,
            depth,
        };
        let grid = self
            .source
            .generate_subscreen(&request, dimensions, &mut self.rng);
        let key = self.subscreens.insert(Subscreen {
            kind,
            parent_zone,
            parent_cell,
            depth,
            grid,
            doorway: dimensions.interior_doorway(),
        });
        tracing::debug!(subscreen = key.get(), ?kind, depth, "interior generated");
        key
    }

    fn spawn(&mut self, spawn: starcell_core::EntitySpawn, out_events: &mut Vec<Event>) {
        self.ensure_zone(spawn.zone, out_events);
        let region = Region::Zone(spawn.zone);
        let id = EntityId::new(self.next_entity_id);
        let walkable = self
            .grid(region)
            .and_then(|grid| grid.get(spawn.cell))
            .is_some_and(|kind| self.terrain.is_passable(kind, spawn.flying));
        if !walkable {
            tracing::warn!(
                cell = ?spawn.cell,
                zone = ?spawn.zone,
                "spawn rejected: cell not walkable"
            );
            return;
        }
        if self.occupied_by_other(region, spawn.cell, id) {
            tracing::warn!(cell = ?spawn.cell, zone = ?spawn.zone, "spawn rejected: cell occupied");
            return;
        }
        self.next_entity_id = self.next_entity_id.saturating_add(1);
        let _ = self.entities.insert(id, Entity::from_spawn(id, &spawn));
        self.index.register(id, region);
        out_events.push(Event::EntitySpawned {
            entity: id,
            region,
            cell: spawn.cell,
        });
    }

    fn despawn(&mut self, id: EntityId, out_events: &mut Vec<Event>) {
        if self.entities.remove(&id).is_none() {
            return;
        }
        let _ = self.index.deregister(id);
        out_events.push(Event::EntityDespawned { entity: id });
    }

    fn cave_depth(&self, region: Region) -> Option<u32> {
        let Region::Subscreen(key) = region else {
            return None;
        };
        self.subscreens
            .get(key)
            .filter(|interior| interior.kind == SubscreenKind::Cave)
            .map(|interior| interior.depth)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("tick", &self.tick)
            .field("config", &self.config)
            .field("zones", &self.zones.len())
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}

/// Assembles a [`World`] from a configuration and its collaborators.
pub struct WorldBuilder {
    config: WorldConfig,
    terrain: Box<dyn TerrainQuery>,
    source: Box<dyn ZoneSource>,
}

impl Default for WorldBuilder {
    fn default() -> Self {
        Self {
            config: WorldConfig::default(),
            terrain: Box::new(StandardTerrain),
            source: Box::new(ProceduralSource::new()),
        }
    }
}

impl fmt::Debug for WorldBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorldBuilder {
    /// Replaces the configuration.
    #[must_use]
    pub fn config(mut self, config: WorldConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the terrain rules.
    #[must_use]
    pub fn terrain(mut self, terrain: impl TerrainQuery + 'static) -> Self {
        self.terrain = Box::new(terrain);
        self
    }

    /// Replaces the zone and interior generator.
    #[must_use]
    pub fn source(mut self, source: impl ZoneSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Validates the configuration and creates the world.
    pub fn build(self) -> Result<World, ConfigError> {
        self.config.validate()?;
        Ok(World::assemble(self.config, self.terrain, self.source))
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick => {
            world.tick = world.tick.saturating_add(1);
            for entity in world.entities.values_mut() {
                entity.is_moving = false;
            }
            out_events.push(Event::TimeAdvanced { tick: world.tick });
            split::split_doubled(world, out_events);
        }
        Command::SpawnEntity { spawn } => world.spawn(spawn, out_events),
        Command::DespawnEntity { entity } => world.despawn(entity, out_events),
        Command::Wander { entity } => planner::wander(world, entity, out_events),
        Command::MoveToward { entity, goal } => {
            let _ = planner::move_toward(world, entity, goal, out_events);
        }
        Command::Seek { entity, goal } => planner::seek(world, entity, goal, out_events),
        Command::SeekZoneExit { entity, preferred } => {
            crossing::seek_zone_exit(world, entity, preferred, out_events);
        }
        Command::EnterViaEntrance { entity } => {
            let _ = crossing::enter_via_entrance(world, entity, out_events);
        }
        Command::EnterSubscreen { entity } => {
            let _ = interior::try_enter(world, entity, out_events);
        }
        Command::ExitSubscreen { entity } => {
            let _ = interior::exit(world, entity, out_events);
        }
        Command::StepTowardSubscreenExit { entity } => {
            interior::step_toward_exit(world, entity, out_events);
        }
        Command::DescendCave { entity } => {
            let _ = interior::descend(world, entity, out_events);
        }
        Command::AscendCave { entity } => {
            let _ = interior::ascend(world, entity, out_events);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{Subscreen, World, WorldConfig, Zone};
    use starcell_core::{
        CellCoord, CellKind, Connection, EntityId, EntitySnapshot, EntityView, Exits, Region,
        SubscreenKey, ZoneDimensions, ZoneKey,
    };

    /// Retrieves the welcome banner that adapters may display.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Current tick index.
    #[must_use]
    pub fn tick(world: &World) -> u64 {
        world.tick
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Grid dimensions shared by every zone and interior.
    #[must_use]
    pub fn dimensions(world: &World) -> ZoneDimensions {
        world.dimensions()
    }

    /// Captures a read-only view of every live entity, sorted by identifier.
    #[must_use]
    pub fn entity_view(world: &World) -> EntityView {
        let snapshots = world
            .entities
            .values()
            .map(|entity| entity.snapshot(world.cave_depth(entity.region)))
            .collect();
        EntityView::from_snapshots(snapshots)
    }

    /// Snapshot of a single entity.
    #[must_use]
    pub fn entity(world: &World, id: EntityId) -> Option<EntitySnapshot> {
        world
            .entities
            .get(&id)
            .map(|entity| entity.snapshot(world.cave_depth(entity.region)))
    }

    /// Entities registered in the region, in arrival order.
    #[must_use]
    pub fn members(world: &World, region: Region) -> &[EntityId] {
        world.index.members(region)
    }

    /// Every region whose membership list names the entity.
    #[must_use]
    pub fn regions_containing(world: &World, id: EntityId) -> Vec<Region> {
        world.index.regions_listing(id)
    }

    /// Corridor flags of a generated zone.
    #[must_use]
    pub fn zone_exits(world: &World, key: ZoneKey) -> Option<Exits> {
        world.zones.get(&key).map(Zone::exits)
    }

    /// Generated zone, if it exists.
    #[must_use]
    pub fn zone(world: &World, key: ZoneKey) -> Option<&Zone> {
        world.zones.get(&key)
    }

    /// Every generated zone in key order.
    pub fn zones(world: &World) -> impl Iterator<Item = (ZoneKey, &Zone)> {
        world.zones.iter().map(|(key, zone)| (*key, zone))
    }

    /// Generated interior, if it exists.
    #[must_use]
    pub fn subscreen(world: &World, key: SubscreenKey) -> Option<&Subscreen> {
        world.subscreens.get(key)
    }

    /// Every generated interior in key order.
    pub fn subscreens(world: &World) -> impl Iterator<Item = (SubscreenKey, &Subscreen)> {
        world
            .subscreens
            .iter()
            .map(|(key, interior)| (*key, interior))
    }

    /// Terrain at a cell of a generated region.
    #[must_use]
    pub fn cell_kind(world: &World, region: Region, cell: CellCoord) -> Option<CellKind> {
        world.grid(region).and_then(|grid| grid.get(cell))
    }

    /// Links from the region to its neighbours and interiors.
    #[must_use]
    pub fn connections(world: &World, region: Region) -> Vec<Connection> {
        world.graph.connections(region)
    }

    /// Reports whether the cell was claimed as a destination during the current tick.
    #[must_use]
    pub fn is_claimed(world: &World, region: Region, cell: CellCoord) -> bool {
        world.reservations.peek(world.tick, region, cell)
    }
}
