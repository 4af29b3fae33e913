use starcell_core::{
    Archetype, CellCoord, Command, Edge, EntityId, EntitySpawn, Event, Exits, Region, ZoneKey,
};
use starcell_system_movement::{Goal, Movement};
use starcell_world::{self as world, query, OpenFieldSource, World, WorldConfig, ZoneLayout};

const HOME: ZoneKey = ZoneKey::new(0, 0);

fn open_world() -> World {
    World::builder()
        .config(WorldConfig::default().with_seed(5))
        .source(OpenFieldSource::new(Exits::all()))
        .build()
        .expect("valid world")
}

fn spawn(world: &mut World, archetype: Archetype, cell: CellCoord) -> EntityId {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::SpawnEntity {
            spawn: EntitySpawn::new(archetype, HOME, cell),
        },
        &mut events,
    );
    events
        .into_iter()
        .find_map(|event| match event {
            Event::EntitySpawned { entity, .. } => Some(entity),
            _ => None,
        })
        .expect("entity spawned")
}

/// Runs one tick: the clock, then every command the system proposes.
fn pump(world: &mut World, movement: &mut Movement, pending: &mut Vec<Event>) -> Vec<Event> {
    world::apply(world, Command::Tick, pending);
    let view = query::entity_view(world);
    let mut commands = Vec::new();
    movement.handle(pending, &view, &mut commands);
    pending.clear();
    for command in commands {
        world::apply(world, command, pending);
    }
    pending.clone()
}

#[test]
fn exit_goals_carry_entities_into_the_next_zone() {
    let mut world = open_world();
    let entity = spawn(&mut world, Archetype::Guard, CellCoord::new(1, 1));
    let mut movement = Movement::new();
    let _ = movement.assign(entity, Goal::ZoneExit(Some(Edge::Top)));

    let mut pending = Vec::new();
    let mut crossed = false;
    for _ in 0..20 {
        let events = pump(&mut world, &mut movement, &mut pending);
        if events
            .iter()
            .any(|event| matches!(event, Event::ZoneCrossed { entity: id, .. } if *id == entity))
        {
            crossed = true;
            break;
        }
    }
    assert!(crossed);
    assert_eq!(
        query::regions_containing(&world, entity),
        vec![Region::Zone(ZoneKey::new(0, -1))]
    );

    let _ = pump(&mut world, &mut movement, &mut pending);
    assert_eq!(movement.goal(entity), None);
}

#[test]
fn corridor_cell_goals_walk_through_the_corridor() {
    let mut world = open_world();
    let entity = spawn(&mut world, Archetype::Farmer, CellCoord::new(1, 1));
    let mut movement = Movement::new();
    let _ = movement.assign(entity, Goal::Cell(CellCoord::new(12, 0)));

    let mut pending = Vec::new();
    for _ in 0..30 {
        let _ = pump(&mut world, &mut movement, &mut pending);
        if movement.goal(entity).is_none() {
            break;
        }
    }
    let snapshot = query::entity(&world, entity).expect("entity is alive");
    assert_eq!(snapshot.zone, ZoneKey::new(0, -1));
    assert_eq!(snapshot.cell, CellCoord::new(12, 16));
}

#[test]
fn pursuers_close_in_on_their_quarry() {
    let quarry_cell = CellCoord::new(14, 8);
    let rows: Vec<String> = (0..18u32)
        .map(|y| {
            (0..24u32)
                .map(|x| {
                    let cell = CellCoord::new(x, y);
                    if x == 0 || y == 0 || x == 23 || y == 17 {
                        '#'
                    } else if cell != quarry_cell && cell.manhattan_distance(quarry_cell) == 1 {
                        'S'
                    } else {
                        '.'
                    }
                })
                .collect()
        })
        .collect();
    let layout = ZoneLayout::parse(&rows.join("\n")).expect("valid layout");
    let mut world = World::builder()
        .source(OpenFieldSource::new(Exits::none()).with_layout(HOME, layout))
        .build()
        .expect("valid world");
    let hunter = spawn(&mut world, Archetype::Wolf, CellCoord::new(2, 8));
    let quarry = spawn(&mut world, Archetype::Deer, quarry_cell);
    let mut movement = Movement::new();
    let _ = movement.assign(hunter, Goal::Pursue(quarry));

    let mut pending = Vec::new();
    for _ in 0..8 {
        let _ = pump(&mut world, &mut movement, &mut pending);
    }
    let view = query::entity_view(&world);
    assert_eq!(view.get(quarry).map(|s| s.cell), Some(quarry_cell));
    let hunter_cell = view.get(hunter).expect("hunter is alive").cell;
    assert_eq!(hunter_cell, CellCoord::new(10, 8));
    assert_eq!(movement.goal(hunter), Some(Goal::Pursue(quarry)));
}

#[test]
fn idle_entities_wander_every_tick() {
    let mut world = open_world();
    let entities: Vec<EntityId> = (0..4)
        .map(|i| spawn(&mut world, Archetype::Deer, CellCoord::new(4 + i * 3, 8)))
        .collect();
    let mut movement = Movement::new();
    let mut pending = Vec::new();
    let events = pump(&mut world, &mut movement, &mut pending);
    for entity in entities {
        assert!(events.iter().any(|event| matches!(
            event,
            Event::EntityMoved { entity: id, .. } | Event::EntityStalled { entity: id, .. }
                if *id == entity
        )));
    }
}

#[test]
fn entering_a_house_is_the_only_change_that_tick() {
    let rows: Vec<String> = (0..18u32)
        .map(|y| {
            (0..24u32)
                .map(|x| {
                    if (x, y) == (5, 5) {
                        'H'
                    } else if x == 0 || y == 0 || x == 23 || y == 17 {
                        '#'
                    } else {
                        '.'
                    }
                })
                .collect()
        })
        .collect();
    let layout = ZoneLayout::parse(&rows.join("\n")).expect("valid layout");
    let config = WorldConfig {
        subscreen_entry_chance: 1.0,
        ..WorldConfig::default()
    };
    let mut world = World::builder()
        .config(config)
        .source(OpenFieldSource::new(Exits::none()).with_layout(HOME, layout))
        .build()
        .expect("valid world");
    let farmer = spawn(&mut world, Archetype::Farmer, CellCoord::new(5, 6));
    let mut movement = Movement::new().with_interior_visits(true);

    let mut pending = Vec::new();
    let events = pump(&mut world, &mut movement, &mut pending);
    let changes: Vec<&Event> = events
        .iter()
        .filter(|event| match event {
            Event::SubscreenEntered { entity, .. }
            | Event::EntityMoved { entity, .. }
            | Event::EntityStalled { entity, .. } => *entity == farmer,
            _ => false,
        })
        .collect();
    assert!(
        matches!(changes.as_slice(), [Event::SubscreenEntered { .. }]),
        "{changes:?}"
    );
    let snapshot = query::entity(&world, farmer).expect("farmer is alive");
    assert!(matches!(snapshot.region, Region::Subscreen(_)));
    assert_eq!(snapshot.cell, CellCoord::new(12, 16));
}
