//! Zone-to-zone crossings through edge corridors.
//!
//! Three triggers share one completion path. Implicit crossings happen when a
//! planner candidate leaves the grid; they are silent on refusal because they
//! are routine. Entrance crossings and exit seeking are explicit requests and
//! report refusals as [`Event::ZoneCrossingRejected`].

use starcell_core::{
    CellCoord, CrossingRejection, Edge, EntityId, Event, Region, ZoneDimensions, ZoneKey,
};

use crate::{
    entity::Entity,
    planner::{self, StepOutcome},
    World,
};

/// Crossing attempted mid-step when a candidate falls beyond `edge`.
pub(crate) fn try_seamless_cross(
    world: &mut World,
    id: EntityId,
    edge: Edge,
    out: &mut Vec<Event>,
) -> bool {
    let tick = world.tick;
    let dimensions = world.dimensions();
    let cooldown = world.config.seamless_cross_cooldown;
    let Some(entity) = world.entities.get(&id) else {
        return false;
    };
    let Region::Zone(zone) = entity.region else {
        return false;
    };
    if !Entity::cooled_down(entity.last_zone_change_tick, tick, cooldown) {
        return false;
    }
    let open = world
        .zones
        .get(&zone)
        .is_some_and(|current| current.exits.is_open(edge));
    if !open || !dimensions.in_corridor_band(edge, entity.cell) {
        return false;
    }
    let landing = dimensions.mirrored_entry(edge, entity.cell);
    match complete(world, id, zone, edge, landing, out) {
        Ok(()) => true,
        Err(reason) => {
            tracing::trace!(entity = id.get(), ?edge, %reason, "seamless crossing refused");
            false
        }
    }
}

/// Crossing through whichever open corridor the entity stands in, within one
/// cell of its edge.
pub(crate) fn enter_via_entrance(world: &mut World, id: EntityId, out: &mut Vec<Event>) -> bool {
    match entrance_crossing(world, id, out) {
        Ok(()) => true,
        Err(reason) => {
            if world.entities.contains_key(&id) {
                out.push(Event::ZoneCrossingRejected { entity: id, reason });
            }
            false
        }
    }
}

fn entrance_crossing(
    world: &mut World,
    id: EntityId,
    out: &mut Vec<Event>,
) -> Result<(), CrossingRejection> {
    let tick = world.tick;
    let dimensions = world.dimensions();
    let cooldown = world.config.zone_change_cooldown;
    let entity = world
        .entities
        .get(&id)
        .ok_or(CrossingRejection::NotOnOverworld)?;
    let Region::Zone(zone) = entity.region else {
        return Err(CrossingRejection::NotOnOverworld);
    };
    let exits = world
        .zones
        .get(&zone)
        .map(|current| current.exits)
        .ok_or(CrossingRejection::NotAtExit)?;
    let cell = entity.cell;
    let edge = Edge::ALL
        .into_iter()
        .find(|edge| {
            exits.is_open(*edge)
                && dimensions.in_corridor_band(*edge, cell)
                && dimensions.distance_to_edge(cell, *edge) <= 1
        })
        .ok_or(CrossingRejection::NotAtExit)?;
    if !Entity::cooled_down(entity.last_zone_change_tick, tick, cooldown) {
        return Err(CrossingRejection::Cooldown);
    }
    let landing = dimensions.mirrored_entry(edge, cell);
    complete(world, id, zone, edge, landing, out)
}

/// Heads for an exit corridor with several steps this call and crosses once
/// the corridor is within reach.
pub(crate) fn seek_zone_exit(
    world: &mut World,
    id: EntityId,
    preferred: Option<Edge>,
    out: &mut Vec<Event>,
) {
    let dimensions = world.dimensions();
    let urgency = world.config.exit_urgency;
    let Some(entity) = world.entities.get(&id) else {
        return;
    };
    let Region::Zone(zone) = entity.region else {
        out.push(Event::ZoneCrossingRejected {
            entity: id,
            reason: CrossingRejection::NotOnOverworld,
        });
        return;
    };
    let Some(exits) = world.zones.get(&zone).map(|current| current.exits) else {
        return;
    };
    let Some(edge) = preferred
        .filter(|edge| exits.is_open(*edge))
        .or_else(|| nearest_open_edge(dimensions, exits.open_edges(), entity.cell))
    else {
        return;
    };
    let target = dimensions.edge_midpoint(edge);

    for _ in 0..urgency {
        let outcome = planner::move_toward(world, id, target, out);
        if outcome == StepOutcome::Crossed {
            return;
        }
        let Some(entity) = world.entities.get(&id) else {
            return;
        };
        if entity.region != Region::Zone(zone) {
            return;
        }
        if entity.cell.manhattan_distance(target) <= 1 {
            let _ = enter_via_entrance(world, id, out);
            return;
        }
        if outcome != StepOutcome::Moved {
            return;
        }
    }
}

fn nearest_open_edge(
    dimensions: ZoneDimensions,
    open: impl Iterator<Item = Edge>,
    cell: CellCoord,
) -> Option<Edge> {
    open.min_by_key(|edge| dimensions.edge_midpoint(*edge).manhattan_distance(cell))
}

/// Shared completion: generation, landing checks, population cap, then the
/// atomic re-registration.
fn complete(
    world: &mut World,
    id: EntityId,
    from: ZoneKey,
    edge: Edge,
    landing: CellCoord,
    out: &mut Vec<Event>,
) -> Result<(), CrossingRejection> {
    let tick = world.tick;
    let transitioned = world
        .entities
        .get(&id)
        .map_or(true, |entity| entity.transitioned_at(tick));
    if transitioned {
        return Err(CrossingRejection::Cooldown);
    }

    let to = from.neighbor(edge);
    world.ensure_zone(to, out);
    let kind = world
        .zones
        .get(&to)
        .and_then(|zone| zone.grid.get(landing))
        .ok_or(CrossingRejection::SolidEntry)?;
    if world.terrain.is_solid(kind) {
        return Err(CrossingRejection::SolidEntry);
    }
    let region = Region::Zone(to);
    if world.reservations.is_claimed(tick, region, landing) {
        return Err(CrossingRejection::Reserved);
    }
    if world.occupied_by_other(region, landing, id) {
        return Err(CrossingRejection::Occupied);
    }
    if world.index.population(region) > world.config.population_cap {
        return merge_into(world, id, to, out);
    }

    if !world.index.relocate(id, region) {
        return Err(CrossingRejection::NotOnOverworld);
    }
    if let Some(entity) = world.entities.get_mut(&id) {
        entity.region = region;
        entity.zone = to;
        entity.cell = landing;
        entity.facing = edge.travel_direction();
        entity.is_moving = true;
        entity.memory.clear();
        entity.last_zone_change_tick = Some(tick);
    }
    let _ = world.reservations.claim(tick, region, landing);
    tracing::debug!(
        entity = id.get(),
        from = ?from,
        to = ?to,
        ?edge,
        "entity crossed zones"
    );
    out.push(Event::ZoneCrossed {
        entity: id,
        from,
        to,
        edge,
        cell: landing,
    });
    Ok(())
}

/// Folds the arriving entity into a compatible resident of a full zone.
fn merge_into(
    world: &mut World,
    id: EntityId,
    zone: ZoneKey,
    out: &mut Vec<Event>,
) -> Result<(), CrossingRejection> {
    let arriving = world
        .entities
        .get(&id)
        .cloned()
        .ok_or(CrossingRejection::PopulationCap)?;
    let survivor = world
        .index
        .members(Region::Zone(zone))
        .iter()
        .copied()
        .find(|member| {
            world
                .entities
                .get(member)
                .is_some_and(|resident| resident.can_merge_with(&arriving))
        })
        .ok_or(CrossingRejection::PopulationCap)?;

    if let Some(resident) = world.entities.get_mut(&survivor) {
        resident.absorb(&arriving);
    }
    let _ = world.entities.remove(&id);
    let _ = world.index.deregister(id);
    tracing::debug!(
        absorbed = id.get(),
        survivor = survivor.get(),
        "merged arrival into a crowded zone"
    );
    out.push(Event::EntitiesMerged {
        absorbed: id,
        survivor,
        zone,
    });
    Ok(())
}
