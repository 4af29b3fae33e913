use starcell_core::{
    Archetype, CellCoord, CellKind, Command, ConnectionKind, EntityId, EntitySpawn, Event, Exits,
    Region, SubscreenKey, SubscreenKind, ZoneKey,
};
use starcell_world::{self as world, query, OpenFieldSource, World, WorldConfig, ZoneLayout};

const HOME: ZoneKey = ZoneKey::new(0, 0);
const HOUSE: CellCoord = CellCoord::new(5, 5);
const CAVE: CellCoord = CellCoord::new(18, 5);
const DOORWAY: CellCoord = CellCoord::new(12, 16);

fn village() -> World {
    let rows: Vec<String> = (0..18u32)
        .map(|y| {
            (0..24u32)
                .map(|x| {
                    if CellCoord::new(x, y) == HOUSE {
                        'H'
                    } else if CellCoord::new(x, y) == CAVE {
                        'C'
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
        zone_change_cooldown: 2,
        subscreen_entry_chance: 1.0,
        ..WorldConfig::default()
    };
    World::builder()
        .config(config)
        .source(OpenFieldSource::new(Exits::none()).with_layout(HOME, layout))
        .build()
        .expect("valid world")
}

fn run(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    events
}

fn spawn(world: &mut World, spawn: EntitySpawn) -> EntityId {
    run(world, Command::SpawnEntity { spawn })
        .into_iter()
        .find_map(|event| match event {
            Event::EntitySpawned { entity, .. } => Some(entity),
            _ => None,
        })
        .expect("entity spawned")
}

fn entered(events: &[Event]) -> Option<(SubscreenKey, SubscreenKind)> {
    events.iter().find_map(|event| match event {
        Event::SubscreenEntered {
            subscreen, kind, ..
        } => Some((*subscreen, *kind)),
        _ => None,
    })
}

fn idle(world: &mut World, ticks: usize) {
    for _ in 0..ticks {
        let _ = run(world, Command::Tick);
    }
}

fn walk_to(world: &mut World, entity: EntityId, goal: CellCoord) {
    for _ in 0..40 {
        if query::entity(world, entity).map(|s| s.cell) == Some(goal) {
            return;
        }
        let _ = run(world, Command::Tick);
        let _ = run(world, Command::MoveToward { entity, goal });
    }
    panic!("entity never reached {goal:?}");
}

#[test]
fn villagers_enter_and_leave_houses() {
    let mut world = village();
    let farmer = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Farmer, HOME, CellCoord::new(5, 6)),
    );

    let events = run(&mut world, Command::EnterSubscreen { entity: farmer });
    let (house, kind) = entered(&events).expect("farmer went inside");
    assert_eq!(kind, SubscreenKind::House);
    let snapshot = query::entity(&world, farmer).expect("farmer is alive");
    assert_eq!(snapshot.region, Region::Subscreen(house));
    assert_eq!(snapshot.zone, HOME);
    assert_eq!(snapshot.cell, DOORWAY);
    assert_eq!(snapshot.cave_depth, None);
    assert_eq!(
        query::regions_containing(&world, farmer),
        vec![Region::Subscreen(house)]
    );
    let interior = query::subscreen(&world, house).expect("house generated");
    assert_eq!(interior.parent_zone(), HOME);
    assert_eq!(interior.parent_cell(), HOUSE);
    assert!(query::connections(&world, Region::Zone(HOME))
        .iter()
        .any(|link| link.kind == ConnectionKind::StructureEntrance
            && link.to == Region::Subscreen(house)
            && link.cell == HOUSE));

    assert!(run(&mut world, Command::ExitSubscreen { entity: farmer }).is_empty());
    idle(&mut world, 2);
    let events = run(&mut world, Command::ExitSubscreen { entity: farmer });
    let [Event::SubscreenExited {
        subscreen,
        zone,
        cell,
        ..
    }] = events.as_slice()
    else {
        panic!("expected an exit, got {events:?}");
    };
    assert_eq!((*subscreen, *zone), (house, HOME));
    assert!(cell.chebyshev_distance(HOUSE) <= 2);
    assert_eq!(
        query::cell_kind(&world, Region::Zone(HOME), *cell),
        Some(CellKind::Grass)
    );
    assert_eq!(
        query::regions_containing(&world, farmer),
        vec![Region::Zone(HOME)]
    );
}

#[test]
fn exit_waits_while_every_landing_cell_is_taken() {
    let rows: Vec<String> = (0..18u32)
        .map(|y| {
            (0..24u32)
                .map(|x| {
                    let cell = CellCoord::new(x, y);
                    if cell == HOUSE {
                        'H'
                    } else if cell == CellCoord::new(5, 6) {
                        '.'
                    } else if cell.chebyshev_distance(HOUSE) <= 2
                        || x == 0
                        || y == 0
                        || x == 23
                        || y == 17
                    {
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
        zone_change_cooldown: 2,
        subscreen_entry_chance: 1.0,
        ..WorldConfig::default()
    };
    let mut world = World::builder()
        .config(config)
        .source(OpenFieldSource::new(Exits::none()).with_layout(HOME, layout))
        .build()
        .expect("valid world");
    let farmer = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Farmer, HOME, CellCoord::new(5, 6)),
    );
    let (house, _) = entered(&run(&mut world, Command::EnterSubscreen { entity: farmer }))
        .expect("farmer went inside");
    let deer = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Deer, HOME, CellCoord::new(5, 6)),
    );
    idle(&mut world, 3);

    assert!(run(&mut world, Command::ExitSubscreen { entity: farmer }).is_empty());
    let snapshot = query::entity(&world, farmer).expect("farmer is alive");
    assert_eq!(snapshot.region, Region::Subscreen(house));
    assert_eq!(
        query::entity(&world, deer).map(|s| s.cell),
        Some(CellCoord::new(5, 6))
    );

    let _ = run(&mut world, Command::DespawnEntity { entity: deer });
    let events = run(&mut world, Command::ExitSubscreen { entity: farmer });
    assert!(matches!(
        events.as_slice(),
        [Event::SubscreenExited { cell, .. }] if *cell == CellCoord::new(5, 6)
    ));
}

#[test]
fn entering_ends_the_tick_for_that_entity() {
    let mut world = village();
    let farmer = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Farmer, HOME, CellCoord::new(5, 6)),
    );
    let _ = entered(&run(&mut world, Command::EnterSubscreen { entity: farmer }))
        .expect("farmer went inside");

    assert!(run(&mut world, Command::Wander { entity: farmer }).is_empty());
    assert!(run(
        &mut world,
        Command::MoveToward {
            entity: farmer,
            goal: CellCoord::new(12, 10),
        }
    )
    .is_empty());
    assert!(run(&mut world, Command::StepTowardSubscreenExit { entity: farmer }).is_empty());
    assert_eq!(query::entity(&world, farmer).map(|s| s.cell), Some(DOORWAY));

    idle(&mut world, 1);
    let events = run(&mut world, Command::Wander { entity: farmer });
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::EntityMoved { .. } | Event::EntityStalled { .. })));
}

#[test]
fn houses_are_persistent_per_building() {
    let mut world = village();
    let first = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Trader, HOME, CellCoord::new(4, 6)),
    );
    let second = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Blacksmith, HOME, CellCoord::new(6, 4)),
    );
    let (one, _) = entered(&run(&mut world, Command::EnterSubscreen { entity: first }))
        .expect("first went inside");
    idle(&mut world, 1);
    let _ = run(
        &mut world,
        Command::MoveToward {
            entity: first,
            goal: CellCoord::new(12, 10),
        },
    );
    let (two, _) = entered(&run(&mut world, Command::EnterSubscreen { entity: second }))
        .expect("second went inside");
    assert_eq!(one, two);
    assert_eq!(query::subscreens(&world).count(), 1);
}

#[test]
fn entry_rules_follow_archetype_and_temper() {
    let mut world = village();
    let wolf = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Wolf, HOME, CellCoord::new(5, 6)),
    );
    assert!(run(&mut world, Command::EnterSubscreen { entity: wolf }).is_empty());

    let raider = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Warrior, HOME, CellCoord::new(4, 5)).hostile(),
    );
    assert!(run(&mut world, Command::EnterSubscreen { entity: raider }).is_empty());

    let farmer = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Farmer, HOME, CellCoord::new(18, 6)),
    );
    assert!(run(&mut world, Command::EnterSubscreen { entity: farmer }).is_empty());

    let goblin = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Goblin, HOME, CellCoord::new(17, 6)).hostile(),
    );
    let events = run(&mut world, Command::EnterSubscreen { entity: goblin });
    assert_eq!(entered(&events).map(|(_, kind)| kind), Some(SubscreenKind::Cave));
}

#[test]
fn entry_chance_zero_never_enters() {
    let config = WorldConfig {
        subscreen_entry_chance: 0.0,
        ..WorldConfig::default()
    };
    let layout_rows: Vec<String> = (0..18u32)
        .map(|y| {
            (0..24u32)
                .map(|x| if CellCoord::new(x, y) == HOUSE { 'H' } else { '.' })
                .collect()
        })
        .collect();
    let layout = ZoneLayout::parse(&layout_rows.join("\n")).expect("valid layout");
    let mut world = World::builder()
        .config(config)
        .source(OpenFieldSource::new(Exits::none()).with_layout(HOME, layout))
        .build()
        .expect("valid world");
    let farmer = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Farmer, HOME, CellCoord::new(5, 6)),
    );
    for _ in 0..50 {
        let _ = run(&mut world, Command::Tick);
        assert!(run(&mut world, Command::EnterSubscreen { entity: farmer }).is_empty());
    }
}

#[test]
fn stepping_toward_the_doorway_leaves_the_house() {
    let mut world = village();
    let farmer = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Farmer, HOME, CellCoord::new(5, 6)),
    );
    let _ = entered(&run(&mut world, Command::EnterSubscreen { entity: farmer }))
        .expect("farmer went inside");
    walk_to(&mut world, farmer, CellCoord::new(12, 12));

    let mut left = false;
    for _ in 0..8 {
        let _ = run(&mut world, Command::Tick);
        let events = run(&mut world, Command::StepTowardSubscreenExit { entity: farmer });
        if events
            .iter()
            .any(|event| matches!(event, Event::SubscreenExited { .. }))
        {
            left = true;
            break;
        }
    }
    assert!(left);
    assert_eq!(
        query::entity(&world, farmer).map(|s| s.region),
        Some(Region::Zone(HOME))
    );
}

#[test]
fn miners_descend_and_climb_cave_levels() {
    let mut world = village();
    let miner = spawn(
        &mut world,
        EntitySpawn::new(Archetype::Miner, HOME, CellCoord::new(18, 6)),
    );
    let (level_one, kind) = entered(&run(&mut world, Command::EnterSubscreen { entity: miner }))
        .expect("miner went underground");
    assert_eq!(kind, SubscreenKind::Cave);
    assert_eq!(query::entity(&world, miner).and_then(|s| s.cave_depth), Some(1));

    assert!(run(&mut world, Command::DescendCave { entity: miner }).is_empty());
    let stairs = CellCoord::new(12, 2);
    assert_eq!(
        query::cell_kind(&world, Region::Subscreen(level_one), stairs),
        Some(CellKind::StairsDown)
    );
    walk_to(&mut world, miner, stairs);

    let events = run(&mut world, Command::DescendCave { entity: miner });
    let [Event::CaveLevelChanged {
        from, to, depth, ..
    }] = events.as_slice()
    else {
        panic!("expected a level change, got {events:?}");
    };
    assert_eq!((*from, *depth), (level_one, 2));
    let level_two = *to;
    let snapshot = query::entity(&world, miner).expect("miner is alive");
    assert_eq!(snapshot.region, Region::Subscreen(level_two));
    assert_eq!(snapshot.cell, DOORWAY);
    assert_eq!(snapshot.cave_depth, Some(2));
    assert_eq!(
        query::cell_kind(&world, Region::Subscreen(level_two), DOORWAY),
        Some(CellKind::StairsUp)
    );
    assert!(query::connections(&world, Region::Subscreen(level_two))
        .iter()
        .any(|link| link.kind == ConnectionKind::StructureExit
            && link.to == Region::Subscreen(level_one)));

    assert!(run(&mut world, Command::AscendCave { entity: miner }).is_empty());
    idle(&mut world, 2);
    let events = run(&mut world, Command::AscendCave { entity: miner });
    assert!(matches!(
        events.as_slice(),
        [Event::CaveLevelChanged { to, depth: 1, .. }] if *to == level_one
    ));

    idle(&mut world, 2);
    let events = run(&mut world, Command::AscendCave { entity: miner });
    assert!(matches!(
        events.as_slice(),
        [Event::SubscreenExited { zone, .. }] if *zone == HOME
    ));
    let snapshot = query::entity(&world, miner).expect("miner is alive");
    assert_eq!(snapshot.region, Region::Zone(HOME));
    assert_eq!(snapshot.cave_depth, None);
    assert_eq!(query::subscreens(&world).count(), 2);
}
