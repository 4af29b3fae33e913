//! Houses and cave levels: entering, leaving and changing depth.

use rand::Rng;
use starcell_core::{
    CellCoord, CellKind, ConnectionKind, Direction, EntityId, Event, Region, SubscreenKey,
    SubscreenKind, ZoneKey,
};

use crate::{
    entity::Entity,
    planner::{self, Filter, Mover, Verdict},
    World,
};

/// Radius of the square searched for a free cell around the entrance on exit.
const EXIT_SEARCH_RADIUS: i64 = 2;

/// Checks the shared transition guards: one transition per tick and the cooldown.
fn may_transition(world: &World, entity: &Entity) -> bool {
    let tick = world.tick;
    !entity.transitioned_at(tick)
        && Entity::cooled_down(
            entity.last_subscreen_change_tick,
            tick,
            world.config.zone_change_cooldown,
        )
}

fn admits(entity: &Entity, kind: SubscreenKind) -> bool {
    match kind {
        SubscreenKind::House => entity.archetype.enters_houses() && !entity.hostile,
        SubscreenKind::Cave => {
            entity.archetype == starcell_core::Archetype::Miner || entity.hostile
        }
    }
}

/// Enters a house or cave on or next to the entity, subject to archetype
/// rules, the cooldown and the per-call entry chance.
pub(crate) fn try_enter(world: &mut World, id: EntityId, out: &mut Vec<Event>) -> bool {
    let Some(entity) = world.entities.get(&id) else {
        return false;
    };
    let Region::Zone(zone) = entity.region else {
        return false;
    };
    if !may_transition(world, entity) {
        return false;
    }
    let Some(grid) = world.zones.get(&zone).map(|current| &current.grid) else {
        return false;
    };

    let origin = entity.cell;
    let mut entrance = None;
    'search: for dx in -1i64..=1 {
        for dy in -1i64..=1 {
            let Some(cell) = offset(origin, dx, dy) else {
                continue;
            };
            let Some(kind) = grid.get(cell).and_then(|kind| world.terrain.interior(kind)) else {
                continue;
            };
            if admits(entity, kind) {
                entrance = Some((cell, kind));
                break 'search;
            }
        }
    }
    let Some((cell, kind)) = entrance else {
        return false;
    };
    let chance = world.config.subscreen_entry_chance;
    if !world.rng.gen_bool(chance) {
        return false;
    }
    enter(world, id, zone, cell, kind, out)
}

fn enter(
    world: &mut World,
    id: EntityId,
    zone: ZoneKey,
    entrance: CellCoord,
    kind: SubscreenKind,
    out: &mut Vec<Event>,
) -> bool {
    let tick = world.tick;
    let key = world.ensure_subscreen(kind, zone, entrance, 1);
    world.graph.connect(
        Region::Zone(zone),
        Region::Subscreen(key),
        ConnectionKind::StructureEntrance,
        entrance,
    );
    let Some(doorway) = world.subscreens.get(key).map(|interior| interior.doorway) else {
        return false;
    };
    let region = Region::Subscreen(key);
    if world.reservations.is_claimed(tick, region, doorway)
        || world.occupied_by_other(region, doorway, id)
    {
        return false;
    }
    if !world.index.relocate(id, region) {
        return false;
    }
    if let Some(entity) = world.entities.get_mut(&id) {
        entity.overworld_cell = Some(entity.cell);
        entity.region = region;
        entity.cell = doorway;
        entity.facing = Direction::Up;
        entity.is_moving = true;
        entity.memory.clear();
        entity.last_subscreen_change_tick = Some(tick);
    }
    let _ = world.reservations.claim(tick, region, doorway);
    tracing::debug!(entity = id.get(), subscreen = key.get(), ?kind, "entered interior");
    out.push(Event::SubscreenEntered {
        entity: id,
        subscreen: key,
        kind,
    });
    true
}

/// Returns the entity to its parent zone next to the entrance.
pub(crate) fn exit(world: &mut World, id: EntityId, out: &mut Vec<Event>) -> bool {
    let tick = world.tick;
    let Some(entity) = world.entities.get(&id) else {
        return false;
    };
    let Region::Subscreen(key) = entity.region else {
        return false;
    };
    if !may_transition(world, entity) {
        return false;
    }
    let Some(interior) = world.subscreens.get(key) else {
        return false;
    };
    let zone = interior.parent_zone;
    let anchor = interior.parent_cell;
    let fallback = entity.overworld_cell.unwrap_or(anchor);
    let flying = entity.flying;
    let region = Region::Zone(zone);

    let free = |cell: CellCoord| {
        !world.reservations.peek(tick, region, cell) && !world.occupied_by_other(region, cell, id)
    };
    let mut landing = None;
    'search: for dy in -EXIT_SEARCH_RADIUS..=EXIT_SEARCH_RADIUS {
        for dx in -EXIT_SEARCH_RADIUS..=EXIT_SEARCH_RADIUS {
            let Some(cell) = offset(anchor, dx, dy) else {
                continue;
            };
            let walkable = world
                .zones
                .get(&zone)
                .and_then(|parent| parent.grid.get(cell))
                .is_some_and(|kind| world.terrain.is_passable(kind, flying));
            if walkable && free(cell) {
                landing = Some(cell);
                break 'search;
            }
        }
    }
    // With no free cell near the entrance the entity stays inside.
    let Some(cell) = landing.or_else(|| free(fallback).then_some(fallback)) else {
        tracing::trace!(entity = id.get(), subscreen = key.get(), "no free cell to exit onto");
        return false;
    };

    if !world.index.relocate(id, region) {
        return false;
    }
    if let Some(entity) = world.entities.get_mut(&id) {
        entity.region = region;
        entity.zone = zone;
        entity.cell = cell;
        entity.facing = Direction::Down;
        entity.is_moving = true;
        entity.overworld_cell = None;
        entity.memory.clear();
        entity.last_subscreen_change_tick = Some(tick);
    }
    let _ = world.reservations.claim(tick, region, cell);
    tracing::debug!(entity = id.get(), subscreen = key.get(), "left interior");
    out.push(Event::SubscreenExited {
        entity: id,
        subscreen: key,
        zone,
        cell,
    });
    true
}

/// Moves one cell toward the doorway, vertical first, and leaves once there.
pub(crate) fn step_toward_exit(world: &mut World, id: EntityId, out: &mut Vec<Event>) {
    let Some(mover) = Mover::capture(world, id) else {
        return;
    };
    let Region::Subscreen(key) = mover.region else {
        return;
    };
    let Some(doorway) = world.subscreens.get(key).map(|interior| interior.doorway) else {
        return;
    };
    let cell = mover.cell;
    if cell.x().abs_diff(doorway.x()) <= 1 && cell.y() + 1 >= doorway.y() {
        let _ = exit(world, id, out);
        return;
    }

    let mut candidates = Vec::with_capacity(2);
    if doorway.y() > cell.y() {
        candidates.push(Direction::Down);
    }
    if doorway.x() > cell.x() {
        candidates.push(Direction::Right);
    } else if doorway.x() < cell.x() {
        candidates.push(Direction::Left);
    }

    let filter = Filter {
        recent: None,
        goal: Some(doorway),
        occupancy: true,
    };
    for direction in candidates {
        if let Verdict::Open(to) = planner::evaluate(world, &mover, direction, &filter) {
            let _ = planner::commit_step(world, id, to, direction, out);
            return;
        }
    }
    if let Some(entity) = world.entities.get_mut(&id) {
        let stuck_counter = entity.memory.note_failure();
        out.push(Event::EntityStalled {
            entity: id,
            stuck_counter,
            release: starcell_core::Escalation::Hold,
        });
    }
}

/// Takes the stairs down to the next cave level.
pub(crate) fn descend(world: &mut World, id: EntityId, out: &mut Vec<Event>) -> bool {
    let Some((key, zone, entrance, depth)) = cave_level_on(world, id, CellKind::StairsDown) else {
        return false;
    };
    let deeper = world.ensure_subscreen(SubscreenKind::Cave, zone, entrance, depth + 1);
    if let Some(doorway) = world.subscreens.get(deeper).map(|level| level.doorway) {
        world.graph.connect(
            Region::Subscreen(deeper),
            Region::Subscreen(key),
            ConnectionKind::StructureExit,
            doorway,
        );
    }
    change_level(world, id, key, deeper, depth + 1, out)
}

/// Takes the stairs up; from the first level this leaves the cave.
pub(crate) fn ascend(world: &mut World, id: EntityId, out: &mut Vec<Event>) -> bool {
    let Some(depth) = world
        .entities
        .get(&id)
        .and_then(|entity| match entity.region {
            Region::Subscreen(key) => world.subscreens.get(key),
            Region::Zone(_) => None,
        })
        .filter(|level| level.kind == SubscreenKind::Cave)
        .map(|level| level.depth)
    else {
        return false;
    };
    if depth <= 1 {
        return exit(world, id, out);
    }
    let Some((key, zone, entrance, depth)) = cave_level_on(world, id, CellKind::StairsUp) else {
        return false;
    };
    let upper = world.ensure_subscreen(SubscreenKind::Cave, zone, entrance, depth - 1);
    change_level(world, id, key, upper, depth - 1, out)
}

/// Cave level the entity stands in, provided it stands on `stairs` and may transition.
fn cave_level_on(
    world: &World,
    id: EntityId,
    stairs: CellKind,
) -> Option<(SubscreenKey, ZoneKey, CellCoord, u32)> {
    let entity = world.entities.get(&id)?;
    let Region::Subscreen(key) = entity.region else {
        return None;
    };
    let level = world.subscreens.get(key)?;
    if level.kind != SubscreenKind::Cave || level.grid.get(entity.cell) != Some(stairs) {
        return None;
    }
    if !may_transition(world, entity) {
        return None;
    }
    Some((key, level.parent_zone, level.parent_cell, level.depth))
}

fn change_level(
    world: &mut World,
    id: EntityId,
    from: SubscreenKey,
    to: SubscreenKey,
    depth: u32,
    out: &mut Vec<Event>,
) -> bool {
    let tick = world.tick;
    let Some(doorway) = world.subscreens.get(to).map(|level| level.doorway) else {
        return false;
    };
    let region = Region::Subscreen(to);
    if world.reservations.is_claimed(tick, region, doorway)
        || world.occupied_by_other(region, doorway, id)
        || !world.index.relocate(id, region)
    {
        return false;
    }
    if let Some(entity) = world.entities.get_mut(&id) {
        entity.region = region;
        entity.cell = doorway;
        entity.facing = Direction::Up;
        entity.is_moving = true;
        entity.memory.clear();
        entity.last_subscreen_change_tick = Some(tick);
    }
    let _ = world.reservations.claim(tick, region, doorway);
    tracing::debug!(entity = id.get(), depth, "changed cave level");
    out.push(Event::CaveLevelChanged {
        entity: id,
        from,
        to,
        depth,
    });
    true
}

fn offset(cell: CellCoord, dx: i64, dy: i64) -> Option<CellCoord> {
    let x = u32::try_from(i64::from(cell.x()) + dx).ok()?;
    let y = u32::try_from(i64::from(cell.y()) + dy).ok()?;
    Some(CellCoord::new(x, y))
}
