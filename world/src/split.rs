//! Doubled entities separating again once their zone has quietened down.

use rand::{seq::SliceRandom, Rng};
use starcell_core::{CellCoord, EntityId, EntitySpawn, Event, Region};

use crate::{entity::Entity, World};

/// Gives every doubled overworld entity one chance to split this tick.
pub(crate) fn split_doubled(world: &mut World, out: &mut Vec<Event>) {
    let doubled: Vec<EntityId> = world
        .entities
        .values()
        .filter(|entity| entity.doubled && matches!(entity.region, Region::Zone(_)))
        .map(|entity| entity.id)
        .collect();
    for id in doubled {
        let _ = try_split(world, id, out);
    }
}

fn try_split(world: &mut World, id: EntityId, out: &mut Vec<Event>) -> bool {
    let tick = world.tick;
    let dimensions = world.dimensions();
    let Some(entity) = world.entities.get(&id) else {
        return false;
    };
    let Region::Zone(zone) = entity.region else {
        return false;
    };
    let region = entity.region;
    if world.index.population(region) > world.config.split_population {
        return false;
    }
    let chance = world.config.split_chance;
    if !world.rng.gen_bool(chance) {
        return false;
    }

    let Some(entity) = world.entities.get(&id) else {
        return false;
    };
    let spawn = EntitySpawn {
        archetype: entity.archetype,
        zone,
        cell: entity.cell,
        flying: entity.flying,
        hostile: entity.hostile,
        level: entity.level.saturating_sub(1).max(1),
        memory_capacity: Some(entity.memory.capacity()),
    };
    let mut diagonals = [(-1i64, -1i64), (-1, 1), (1, -1), (1, 1)];
    diagonals.shuffle(&mut world.rng);
    let (max_x, max_y) = (
        i64::from(dimensions.width()) - 2,
        i64::from(dimensions.height()) - 2,
    );
    let landing = diagonals.into_iter().find_map(|(dx, dy)| {
        let x = (i64::from(spawn.cell.x()) + dx).clamp(1, max_x);
        let y = (i64::from(spawn.cell.y()) + dy).clamp(1, max_y);
        let cell = CellCoord::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        let walkable = world
            .grid(region)
            .and_then(|grid| grid.get(cell))
            .is_some_and(|kind| world.terrain.is_passable(kind, spawn.flying));
        let free = cell != spawn.cell
            && !world.reservations.peek(tick, region, cell)
            && !world.occupied_by_other(region, cell, id);
        (walkable && free).then_some(cell)
    });
    let Some(cell) = landing else {
        tracing::trace!(entity = id.get(), "no free cell to split onto");
        return false;
    };

    if let Some(entity) = world.entities.get_mut(&id) {
        entity.doubled = false;
    }
    let offspring = EntityId::new(world.next_entity_id);
    world.next_entity_id = world.next_entity_id.saturating_add(1);
    let _ = world.entities.insert(
        offspring,
        Entity::from_spawn(offspring, &EntitySpawn { cell, ..spawn }),
    );
    world.index.register(offspring, region);
    let _ = world.reservations.claim(tick, region, cell);
    tracing::debug!(
        entity = id.get(),
        offspring = offspring.get(),
        "doubled entity split in a quiet zone"
    );
    out.push(Event::EntitySplit {
        entity: id,
        offspring,
        zone,
        cell,
    });
    true
}
