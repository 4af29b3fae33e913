#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Starcell simulation.

mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use starcell_core::{
    Archetype, CellCoord, Command, EntitySpawn, Event, Exits, StatsReport, ZoneKey,
};
use starcell_system_analytics::Analytics;
use starcell_system_movement::{Goal, Movement};
use starcell_world::{self as world, query, OpenFieldSource, ProceduralSource, World};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::scenario::Scenario;

const SPAWN_SALT: u64 = 0x5eed_5a17;

const ARCHETYPES: [Archetype; 11] = [
    Archetype::Farmer,
    Archetype::Trader,
    Archetype::Lumberjack,
    Archetype::Miner,
    Archetype::Guard,
    Archetype::Warrior,
    Archetype::Blacksmith,
    Archetype::Wolf,
    Archetype::Goblin,
    Archetype::Bat,
    Archetype::Deer,
];

/// Headless simulation of entities wandering a tile world of zones and interiors.
#[derive(Parser, Debug)]
#[command(name = "starcell", version)]
struct Cli {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
    /// Overrides the seed of the world configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of entities spawned in the home zone.
    #[arg(long, default_value_t = 12)]
    entities: usize,
    /// TOML scenario with `[world]` and `[population]` tables.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Zone generator.
    #[arg(long, value_enum, default_value_t = TerrainMode::Procedural)]
    terrain: TerrainMode,
    /// Lets idle entities enter houses and caves.
    #[arg(long)]
    visit_interiors: bool,
    /// Ticks between progress log lines.
    #[arg(long, default_value_t = 100)]
    report_every: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TerrainMode {
    /// Random biomes with houses, caves and walled borders.
    Procedural,
    /// Grass fields with every edge open.
    Open,
}

/// Entry point for the Starcell command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut scenario = match &cli.config {
        Some(path) => Scenario::load(path)?,
        None => Scenario::default(),
    };
    if let Some(seed) = cli.seed {
        scenario.world.seed = seed;
    }

    let builder = World::builder().config(scenario.world.clone());
    let builder = match cli.terrain {
        TerrainMode::Procedural => builder.source(ProceduralSource::new()),
        TerrainMode::Open => builder.source(OpenFieldSource::new(Exits::all())),
    };
    let mut world = builder.build().context("invalid world configuration")?;
    println!("{}", query::welcome_banner(&world));

    let mut movement = Movement::new().with_interior_visits(cli.visit_interiors);
    let spawned = populate(&mut world, &mut movement, &scenario, cli.entities);
    info!(spawned, requested = cli.entities, "population ready");

    let report = run(&mut world, &mut movement, cli.ticks, cli.report_every);
    match report {
        Some(report) => print_summary(&world, &report),
        None => println!("no ticks simulated"),
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Spawns up to `count` entities on random cells of the home zone.
fn populate(
    world: &mut World,
    movement: &mut Movement,
    scenario: &Scenario,
    count: usize,
) -> usize {
    let mut rng = ChaCha8Rng::seed_from_u64(scenario.world.seed ^ SPAWN_SALT);
    let dimensions = query::dimensions(world);
    let home = ZoneKey::new(0, 0);
    let mut spawned = 0;

    for attempt in 0..count.saturating_mul(4) {
        if spawned == count {
            break;
        }
        let archetype = ARCHETYPES[attempt % ARCHETYPES.len()];
        let cell = CellCoord::new(
            rng.gen_range(1..dimensions.width() - 1),
            rng.gen_range(1..dimensions.height() - 1),
        );
        let mut spawn = EntitySpawn::new(archetype, home, cell);
        if matches!(archetype, Archetype::Wolf | Archetype::Goblin) {
            spawn = spawn.hostile();
        }
        if archetype == Archetype::Bat {
            spawn = spawn.flying();
        }

        let mut events = Vec::new();
        world::apply(world, Command::SpawnEntity { spawn }, &mut events);
        for event in events {
            if let Event::EntitySpawned { entity, .. } = event {
                spawned += 1;
                if rng.gen_bool(scenario.population.travellers) {
                    let _ = movement.assign(entity, Goal::ZoneExit(None));
                }
            }
        }
    }

    if spawned < count {
        warn!(spawned, count, "home zone had too few free cells");
    }
    spawned
}

/// Drives the tick loop and returns the last published report.
fn run(
    world: &mut World,
    movement: &mut Movement,
    ticks: u64,
    report_every: u64,
) -> Option<StatsReport> {
    let mut analytics = Analytics::new();
    let mut previous = Vec::new();

    for _ in 0..ticks {
        let mut tick_events = Vec::new();
        world::apply(world, Command::Tick, &mut tick_events);

        let mut input = std::mem::take(&mut previous);
        input.extend(tick_events.iter().cloned());
        let mut commands = Vec::new();
        movement.handle(&input, &query::entity_view(world), &mut commands);
        for command in commands {
            world::apply(world, command, &mut tick_events);
        }

        let mut published = Vec::new();
        analytics.handle(&tick_events, &query::entity_view(world), &mut published);
        for event in &published {
            if let Event::AnalyticsUpdated { report } = event {
                if report_every > 0 && report.tick % report_every == 0 {
                    info!(
                        tick = report.tick,
                        steps = report.totals.steps,
                        stalls = report.totals.stalls,
                        crossings = report.totals.zone_crossings,
                        live = report.live_entities,
                        "progress"
                    );
                }
            }
        }
        previous = tick_events;
    }

    analytics.last_report().cloned()
}

fn print_summary(world: &World, report: &StatsReport) {
    let totals = &report.totals;
    println!("ticks simulated:    {}", report.tick);
    println!("live entities:      {}", report.live_entities);
    println!("zones generated:    {}", query::zones(world).count());
    println!("interiors:          {}", query::subscreens(world).count());
    println!("steps:              {}", totals.steps);
    println!(
        "stalls:             {} ({} escalated)",
        totals.stalls, totals.escalations
    );
    println!(
        "zone crossings:     {} ({} refused)",
        totals.zone_crossings, totals.rejected_crossings
    );
    println!("merges:             {}", totals.merges);
    println!("splits:             {}", totals.splits);
    println!(
        "interior visits:    {} in, {} out",
        totals.subscreen_entries, totals.subscreen_exits
    );
    println!("cave level changes: {}", totals.cave_level_changes);
    println!("abandoned goals:    {}", totals.abandoned_goals);
}
