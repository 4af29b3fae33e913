#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that turns assigned goals into per-tick
//! movement commands.
//!
//! Goal resolution belongs to the behavior layer: it decides what each entity
//! chases and hands the result to [`Movement::assign`]. Every tick the system
//! emits at most one primary movement command per entity, in registry order,
//! so the world's reservation table gives earlier entities priority.

use std::collections::BTreeMap;

use starcell_core::{CellCoord, Command, Edge, EntityId, EntitySnapshot, EntityView, Event, Region};

/// Target an entity is currently steering toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Goal {
    /// Walk to a cell with prioritized, obstacle-aware steps.
    Cell(CellCoord),
    /// Walk to a cell with greedy, rate-limited steps.
    Seek(CellCoord),
    /// Follow another entity while it shares the region.
    Pursue(EntityId),
    /// Leave the zone, through the provided edge when it is open.
    ZoneExit(Option<Edge>),
    /// Walk out of the current interior.
    LeaveInterior,
}

/// Pure system that reacts to world events and emits movement commands.
#[derive(Debug, Default)]
pub struct Movement {
    goals: BTreeMap<EntityId, Goal>,
    visit_interiors: bool,
}

impl Movement {
    /// Creates a movement system whose idle entities wander but never go inside.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets idle entities enter adjacent houses and caves, and walk back out.
    #[must_use]
    pub fn with_interior_visits(mut self, visit: bool) -> Self {
        self.visit_interiors = visit;
        self
    }

    /// Assigns a goal, returning the one it replaces.
    pub fn assign(&mut self, entity: EntityId, goal: Goal) -> Option<Goal> {
        self.goals.insert(entity, goal)
    }

    /// Drops the entity's goal so it wanders again.
    pub fn clear(&mut self, entity: EntityId) -> Option<Goal> {
        self.goals.remove(&entity)
    }

    /// Goal currently assigned to the entity.
    #[must_use]
    pub fn goal(&self, entity: EntityId) -> Option<Goal> {
        self.goals.get(&entity).copied()
    }

    /// Consumes world events and the entity view to emit movement commands.
    pub fn handle(&mut self, events: &[Event], entity_view: &EntityView, out: &mut Vec<Command>) {
        let mut tick_started = false;
        for event in events {
            match event {
                Event::TimeAdvanced { .. } => tick_started = true,
                Event::EntityDespawned { entity } => {
                    let _ = self.goals.remove(entity);
                }
                Event::EntitiesMerged { absorbed, .. } => {
                    let _ = self.goals.remove(absorbed);
                }
                Event::GoalAbandoned { entity, goal } => {
                    if matches!(
                        self.goals.get(entity),
                        Some(Goal::Cell(cell) | Goal::Seek(cell)) if cell == goal
                    ) {
                        let _ = self.goals.remove(entity);
                    }
                }
                Event::ZoneCrossed { entity, .. } => {
                    if matches!(self.goals.get(entity), Some(Goal::ZoneExit(_))) {
                        let _ = self.goals.remove(entity);
                    }
                }
                Event::SubscreenExited { entity, .. } => {
                    if self.goals.get(entity) == Some(&Goal::LeaveInterior) {
                        let _ = self.goals.remove(entity);
                    }
                }
                _ => {}
            }
        }

        if !tick_started {
            return;
        }

        for snapshot in entity_view.iter() {
            self.emit(snapshot, entity_view, out);
        }
    }

    fn emit(
        &mut self,
        snapshot: &EntitySnapshot,
        entity_view: &EntityView,
        out: &mut Vec<Command>,
    ) {
        let entity = snapshot.id;
        let inside = matches!(snapshot.region, Region::Subscreen(_));
        let Some(goal) = self.goals.get(&entity).copied() else {
            self.idle(snapshot, out);
            return;
        };

        match goal {
            Goal::Cell(cell) => {
                out.push(Command::MoveToward { entity, goal: cell });
                // The final call lets corridor goals walk through.
                if snapshot.cell == cell {
                    let _ = self.goals.remove(&entity);
                }
            }
            Goal::Seek(cell) => {
                if snapshot.cell == cell {
                    let _ = self.goals.remove(&entity);
                    self.idle(snapshot, out);
                } else {
                    out.push(Command::Seek { entity, goal: cell });
                }
            }
            Goal::Pursue(target) => match entity_view.get(target) {
                Some(quarry) if quarry.region == snapshot.region => {
                    out.push(Command::MoveToward {
                        entity,
                        goal: quarry.cell,
                    });
                }
                Some(_) => out.push(Command::Wander { entity }),
                None => {
                    let _ = self.goals.remove(&entity);
                    self.idle(snapshot, out);
                }
            },
            Goal::ZoneExit(preferred) => {
                if inside {
                    out.push(Command::StepTowardSubscreenExit { entity });
                } else {
                    out.push(Command::SeekZoneExit { entity, preferred });
                }
            }
            Goal::LeaveInterior => {
                if inside {
                    out.push(Command::StepTowardSubscreenExit { entity });
                } else {
                    let _ = self.goals.remove(&entity);
                    self.idle(snapshot, out);
                }
            }
        }
    }

    fn idle(&self, snapshot: &EntitySnapshot, out: &mut Vec<Command>) {
        let entity = snapshot.id;
        match snapshot.region {
            Region::Subscreen(_) if self.visit_interiors => {
                out.push(Command::StepTowardSubscreenExit { entity });
            }
            Region::Zone(_) if self.visit_interiors => {
                out.push(Command::EnterSubscreen { entity });
                out.push(Command::Wander { entity });
            }
            _ => out.push(Command::Wander { entity }),
        }
    }
}
