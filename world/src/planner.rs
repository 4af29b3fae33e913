//! Direction selection and single-step execution.
//!
//! Every entry point moves an entity by at most one cell per call (a zone
//! crossing counts as that cell). Candidates are filtered by bounds, terrain,
//! the memory lane, the per-tick reservation table and live occupancy; when
//! nothing survives, the stall escalates through the memory release tiers.

use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use starcell_core::{
    CellCoord, Direction, Edge, EntityId, Escalation, Event, Region, Step, ZoneDimensions,
};

use crate::{crossing, entity::Entity, World};

/// Stall count at which a greedy seek forces a random memory-free step.
const SEEK_FORCE_AT: u32 = 5;

/// Result of a single planner call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StepOutcome {
    /// The entity stepped within its region.
    Moved,
    /// The entity left its zone through a corridor, or was merged while doing so.
    Crossed,
    /// No candidate was viable.
    Stalled,
    /// Nothing to do: unknown entity, goal already reached or rate limited.
    Idle,
}

/// Immutable facts about the mover captured before candidates are evaluated.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Mover {
    pub(crate) id: EntityId,
    pub(crate) region: Region,
    pub(crate) cell: CellCoord,
    pub(crate) flying: bool,
}

impl Mover {
    pub(crate) fn capture(world: &World, id: EntityId) -> Option<Self> {
        let entity = world.entities.get(&id)?;
        // An entity that changed region this tick waits for the next one.
        if entity.transitioned_at(world.tick) {
            return None;
        }
        // Unknown regions make every planner call a no-op.
        let _ = world.grid(entity.region)?;
        Some(Self {
            id,
            region: entity.region,
            cell: entity.cell,
            flying: entity.flying,
        })
    }
}

/// Rules a candidate destination must satisfy.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Filter<'a> {
    /// Recently visited cells to avoid; `None` ignores memory.
    pub(crate) recent: Option<&'a HashSet<CellCoord>>,
    /// Goal cell, exempt from the memory check.
    pub(crate) goal: Option<CellCoord>,
    /// Whether other movers may block the destination.
    pub(crate) occupancy: bool,
}

impl<'a> Filter<'a> {
    pub(crate) const fn strict(recent: &'a HashSet<CellCoord>, goal: Option<CellCoord>) -> Self {
        Self {
            recent: Some(recent),
            goal,
            occupancy: true,
        }
    }

    pub(crate) const fn ignoring_memory(self) -> Self {
        Self {
            recent: None,
            goal: self.goal,
            occupancy: self.occupancy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Open(CellCoord),
    Boundary(Edge),
    Blocked,
}

/// Checks a single candidate step against terrain, memory, reservations and occupancy.
pub(crate) fn evaluate(
    world: &mut World,
    mover: &Mover,
    direction: Direction,
    filter: &Filter<'_>,
) -> Verdict {
    let to = match mover.cell.step(direction, world.dimensions()) {
        Step::Within(cell) => cell,
        Step::Beyond(edge) => return Verdict::Boundary(edge),
    };
    let Some(kind) = world.grid(mover.region).and_then(|grid| grid.get(to)) else {
        return Verdict::Blocked;
    };
    if !world.terrain.is_passable(kind, mover.flying) {
        return Verdict::Blocked;
    }
    if let Some(recent) = filter.recent {
        if recent.contains(&to) && filter.goal != Some(to) {
            return Verdict::Blocked;
        }
    }
    let tick = world.tick;
    if world.reservations.is_claimed(tick, mover.region, to) {
        return Verdict::Blocked;
    }
    if filter.occupancy && world.occupied_by_other(mover.region, to, mover.id) {
        return Verdict::Blocked;
    }
    Verdict::Open(to)
}

/// Applies a validated step: memory, position, facing and the reservation claim.
///
/// A destination that is not exactly one cardinal step away is refused and
/// counted as a stall instead.
pub(crate) fn commit_step(
    world: &mut World,
    id: EntityId,
    to: CellCoord,
    direction: Direction,
    out: &mut Vec<Event>,
) -> bool {
    let tick = world.tick;
    let Some(entity) = world.entities.get_mut(&id) else {
        return false;
    };
    let from = entity.cell;
    if Direction::between(from, to) != Some(direction) {
        let stuck_counter = entity.memory.note_failure();
        tracing::warn!(
            entity = id.get(),
            ?from,
            ?to,
            ?direction,
            "refused step that is not a single cardinal move"
        );
        out.push(Event::EntityStalled {
            entity: id,
            stuck_counter,
            release: Escalation::Hold,
        });
        return false;
    }

    entity.memory.record_visit(from);
    entity.memory.note_progress();
    entity.cell = to;
    entity.facing = direction;
    entity.is_moving = true;
    let region = entity.region;
    let _ = world.reservations.claim(tick, region, to);
    out.push(Event::EntityMoved {
        entity: id,
        region,
        from,
        to,
        direction,
    });
    true
}

/// Tries candidates in order; returns `None` when every one is blocked.
fn try_candidates(
    world: &mut World,
    mover: &Mover,
    candidates: &[Direction],
    filter: &Filter<'_>,
    out: &mut Vec<Event>,
) -> Option<StepOutcome> {
    for direction in candidates {
        match evaluate(world, mover, *direction, filter) {
            Verdict::Open(to) => {
                return Some(if commit_step(world, mover.id, to, *direction, out) {
                    StepOutcome::Moved
                } else {
                    StepOutcome::Stalled
                });
            }
            Verdict::Boundary(edge) => {
                if matches!(mover.region, Region::Zone(_))
                    && crossing::try_seamless_cross(world, mover.id, edge, out)
                {
                    return Some(StepOutcome::Crossed);
                }
            }
            Verdict::Blocked => {}
        }
    }
    None
}

/// Records a stall and applies the release tier, including the memory-free retry.
fn escalate(
    world: &mut World,
    mover: &Mover,
    candidates: &[Direction],
    filter: &Filter<'_>,
    clear_on_failure: bool,
    out: &mut Vec<Event>,
) -> StepOutcome {
    let Some(entity) = world.entities.get_mut(&mover.id) else {
        return StepOutcome::Idle;
    };
    let release = entity.memory.note_stall();
    let stuck_counter = entity.memory.stuck_counter();
    tracing::trace!(entity = mover.id.get(), stuck_counter, ?release, "no viable step");
    out.push(Event::EntityStalled {
        entity: mover.id,
        stuck_counter,
        release,
    });
    if release != Escalation::IgnoreMemory {
        return StepOutcome::Stalled;
    }

    let forced = filter.ignoring_memory();
    let outcome = try_candidates(world, mover, candidates, &forced, out);
    if let Some(entity) = world.entities.get_mut(&mover.id) {
        entity.memory.finish_forced();
        if outcome.is_none() && clear_on_failure {
            entity.memory.clear();
        }
    }
    outcome.unwrap_or(StepOutcome::Stalled)
}

fn recent_cells(world: &World, id: EntityId) -> HashSet<CellCoord> {
    let window = world.config.memory_window;
    world
        .entities
        .get(&id)
        .map(|entity| entity.memory.recent(window))
        .unwrap_or_default()
}

/// Takes one goal-free step in a shuffled direction.
///
/// Occupancy is ignored while the mover shares its cell with another entity
/// so stacked entities can separate.
pub(crate) fn wander(world: &mut World, id: EntityId, out: &mut Vec<Event>) {
    let Some(mover) = Mover::capture(world, id) else {
        return;
    };
    let recent = recent_cells(world, id);
    let overlapping = world.occupied_by_other(mover.region, mover.cell, id);
    let mut directions = Direction::ALL;
    directions.shuffle(&mut world.rng);

    let filter = Filter {
        recent: Some(&recent),
        goal: None,
        occupancy: !overlapping,
    };
    if try_candidates(world, &mover, &directions, &filter, out).is_none() {
        let _ = escalate(world, &mover, &directions, &filter, false, out);
    }
}

/// Builds the prioritized candidate list for a goal-directed step.
///
/// Order: primary axis (ties favour the x-axis), secondary axis, the two
/// perpendicular directions in random order, then backward. Duplicates keep
/// their first position.
pub(crate) fn toward_candidates<R>(from: CellCoord, goal: CellCoord, rng: &mut R) -> Vec<Direction>
where
    R: Rng + ?Sized,
{
    let dx = i64::from(goal.x()) - i64::from(from.x());
    let dy = i64::from(goal.y()) - i64::from(from.y());
    let horizontal = if dx > 0 { Direction::Right } else { Direction::Left };
    let vertical = if dy > 0 { Direction::Down } else { Direction::Up };
    let (primary, secondary) = if dx.abs() >= dy.abs() {
        (horizontal, (dy != 0).then_some(vertical))
    } else {
        (vertical, (dx != 0).then_some(horizontal))
    };
    let mut perpendicular = primary.perpendicular();
    if rng.gen_bool(0.5) {
        perpendicular.swap(0, 1);
    }

    let mut ordered = Vec::with_capacity(4);
    let sequence = std::iter::once(primary)
        .chain(secondary)
        .chain(perpendicular)
        .chain(std::iter::once(primary.opposite()));
    for direction in sequence {
        if !ordered.contains(&direction) {
            ordered.push(direction);
        }
    }
    ordered
}

/// Takes one prioritized step toward `goal`, routing around obstacles.
///
/// An entity already standing on a goal that is the border cell of an open
/// corridor walks straight through it.
pub(crate) fn move_toward(
    world: &mut World,
    id: EntityId,
    goal: CellCoord,
    out: &mut Vec<Event>,
) -> StepOutcome {
    let Some(mover) = Mover::capture(world, id) else {
        return StepOutcome::Idle;
    };
    if mover.cell == goal {
        return pass_through_corridor(world, &mover, out);
    }
    let candidates = toward_candidates(mover.cell, goal, &mut world.rng);
    let recent = recent_cells(world, id);
    let filter = Filter::strict(&recent, Some(goal));
    match try_candidates(world, &mover, &candidates, &filter, out) {
        Some(outcome) => outcome,
        None => escalate(world, &mover, &candidates, &filter, true, out),
    }
}

fn pass_through_corridor(world: &mut World, mover: &Mover, out: &mut Vec<Event>) -> StepOutcome {
    let Region::Zone(_) = mover.region else {
        return StepOutcome::Idle;
    };
    let dimensions = world.dimensions();
    let Some(edge) = border_edge(dimensions, mover.cell) else {
        return StepOutcome::Idle;
    };
    if crossing::try_seamless_cross(world, mover.id, edge, out) {
        StepOutcome::Crossed
    } else {
        StepOutcome::Idle
    }
}

/// Edge whose corridor border cell the coordinate is, if any.
pub(crate) fn border_edge(dimensions: ZoneDimensions, cell: CellCoord) -> Option<Edge> {
    Edge::ALL.into_iter().find(|edge| {
        dimensions.distance_to_edge(cell, *edge) == 0 && dimensions.in_corridor_band(*edge, cell)
    })
}

/// Takes one greedy, rate-limited step toward `goal`.
///
/// Goals that stay unchanged for too many calls are abandoned and remembered
/// as cells to avoid; corridor goals only reset the memory lane.
pub(crate) fn seek(world: &mut World, id: EntityId, goal: CellCoord, out: &mut Vec<Event>) {
    let tick = world.tick;
    let dimensions = world.dimensions();
    let window = world.config.memory_window;
    let loop_threshold = world.config.loop_threshold;
    let threshold = world.config.target_stuck_threshold;
    let interval = world.config.seek_interval;
    if Mover::capture(world, id).is_none() {
        return;
    }
    let Some(entity) = world.entities.get_mut(&id) else {
        return;
    };

    if entity.memory.track_target(goal) >= threshold {
        entity.memory.forget_target();
        if border_edge(dimensions, goal).is_some() {
            entity.memory.clear();
            return;
        }
        entity.memory.record_visit(goal);
        tracing::debug!(entity = id.get(), ?goal, "abandoned unreachable goal");
        out.push(Event::GoalAbandoned { entity: id, goal });
        return;
    }
    if !Entity::cooled_down(entity.last_seek_tick, tick, interval) {
        return;
    }

    let current = entity.cell;
    entity.memory.record_visit(current);
    if entity.memory.detect_loop(current, window, loop_threshold) {
        tracing::trace!(entity = id.get(), cell = ?current, "movement loop collapsed");
    }
    let recent = entity.memory.recent(window);

    let Some(mover) = Mover::capture(world, id) else {
        return;
    };
    let filter = Filter::strict(&recent, None);
    let mut best: Option<(Direction, CellCoord, u32)> = None;
    for direction in Direction::ALL {
        if let Verdict::Open(to) = evaluate(world, &mover, direction, &filter) {
            let distance = to.manhattan_distance(goal);
            if best.map_or(true, |(_, _, closest)| distance < closest) {
                best = Some((direction, to, distance));
            }
        }
    }

    match best {
        Some((direction, to, _)) => {
            if commit_step(world, id, to, direction, out) {
                if let Some(entity) = world.entities.get_mut(&id) {
                    entity.last_seek_tick = Some(tick);
                }
            }
        }
        None => seek_stalled(world, &mover, out),
    }
}

fn seek_stalled(world: &mut World, mover: &Mover, out: &mut Vec<Event>) {
    let Some(entity) = world.entities.get_mut(&mover.id) else {
        return;
    };
    let stuck_counter = entity.memory.note_failure();
    if stuck_counter < SEEK_FORCE_AT {
        let release = if entity.memory.len() > 1 {
            entity.memory.halve();
            Escalation::HalveMemory
        } else {
            Escalation::Hold
        };
        out.push(Event::EntityStalled {
            entity: mover.id,
            stuck_counter,
            release,
        });
        return;
    }

    out.push(Event::EntityStalled {
        entity: mover.id,
        stuck_counter,
        release: Escalation::IgnoreMemory,
    });
    let mut directions = Direction::ALL;
    directions.shuffle(&mut world.rng);
    let recent = HashSet::new();
    let forced = Filter::strict(&recent, None).ignoring_memory();
    for direction in directions {
        if let Verdict::Open(to) = evaluate(world, mover, direction, &forced) {
            if commit_step(world, mover.id, to, direction, out) {
                if let Some(entity) = world.entities.get_mut(&mover.id) {
                    entity.memory.reset_to(to);
                }
                return;
            }
        }
    }
    if let Some(entity) = world.entities.get_mut(&mover.id) {
        entity.memory.reset_to(mover.cell);
        entity.memory.finish_forced();
    }
}
