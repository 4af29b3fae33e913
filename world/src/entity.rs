//! Live entity records.

use starcell_core::{
    Archetype, CellCoord, Direction, EntityId, EntitySnapshot, EntitySpawn, Region, ZoneKey,
};

use crate::memory::EntityMemory;

#[derive(Clone, Debug)]
pub(crate) struct Entity {
    pub(crate) id: EntityId,
    pub(crate) archetype: Archetype,
    pub(crate) region: Region,
    /// Overworld zone, kept while the entity is inside one of its interiors.
    pub(crate) zone: ZoneKey,
    pub(crate) cell: CellCoord,
    pub(crate) facing: Direction,
    pub(crate) is_moving: bool,
    pub(crate) flying: bool,
    pub(crate) hostile: bool,
    pub(crate) level: u32,
    pub(crate) doubled: bool,
    pub(crate) memory: EntityMemory,
    pub(crate) last_zone_change_tick: Option<u64>,
    pub(crate) last_subscreen_change_tick: Option<u64>,
    pub(crate) last_seek_tick: Option<u64>,
    /// Overworld cell the entity stood on before going inside.
    pub(crate) overworld_cell: Option<CellCoord>,
}

impl Entity {
    pub(crate) fn from_spawn(id: EntityId, spawn: &EntitySpawn) -> Self {
        let capacity = spawn
            .memory_capacity
            .unwrap_or_else(|| spawn.archetype.memory_capacity());
        Self {
            id,
            archetype: spawn.archetype,
            region: Region::Zone(spawn.zone),
            zone: spawn.zone,
            cell: spawn.cell,
            facing: Direction::Down,
            is_moving: false,
            flying: spawn.flying,
            hostile: spawn.hostile,
            level: spawn.level.max(1),
            doubled: false,
            memory: EntityMemory::with_capacity(capacity),
            last_zone_change_tick: None,
            last_subscreen_change_tick: None,
            last_seek_tick: None,
            overworld_cell: None,
        }
    }

    /// Reports whether at least `cooldown` ticks passed since `stamp`.
    pub(crate) fn cooled_down(stamp: Option<u64>, tick: u64, cooldown: u64) -> bool {
        stamp.map_or(true, |at| tick.saturating_sub(at) >= cooldown)
    }

    /// Reports whether any region transition already happened this tick.
    pub(crate) fn transitioned_at(&self, tick: u64) -> bool {
        self.last_zone_change_tick == Some(tick) || self.last_subscreen_change_tick == Some(tick)
    }

    pub(crate) fn can_merge_with(&self, other: &Entity) -> bool {
        self.id != other.id
            && self.archetype == other.archetype
            && self.level.abs_diff(other.level) <= 1
    }

    /// Folds another entity into this one.
    pub(crate) fn absorb(&mut self, other: &Entity) {
        self.level = self.level.max(other.level).saturating_add(1);
        self.doubled = true;
    }

    pub(crate) fn snapshot(&self, cave_depth: Option<u32>) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            archetype: self.archetype,
            region: self.region,
            zone: self.zone,
            cell: self.cell,
            facing: self.facing,
            is_moving: self.is_moving,
            flying: self.flying,
            hostile: self.hostile,
            level: self.level,
            doubled: self.doubled,
            memory_lane: self.memory.lane().collect(),
            stuck_counter: self.memory.stuck_counter(),
            target_stuck_counter: self.memory.target_stuck_counter(),
            last_zone_change_tick: self.last_zone_change_tick,
            last_subscreen_change_tick: self.last_subscreen_change_tick,
            cave_depth,
        }
    }
}
