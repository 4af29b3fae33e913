use starcell_core::{Escalation, Event, MovementCounters};

/// Folds one world event into the counters, returning whether it was counted.
pub(crate) fn record(counters: &mut MovementCounters, event: &Event) -> bool {
    match event {
        Event::EntityMoved { .. } => counters.steps += 1,
        Event::EntityStalled { release, .. } => {
            counters.stalls += 1;
            if *release != Escalation::Hold {
                counters.escalations += 1;
            }
        }
        Event::ZoneCrossed { .. } => counters.zone_crossings += 1,
        Event::ZoneCrossingRejected { .. } => counters.rejected_crossings += 1,
        Event::EntitiesMerged { .. } => counters.merges += 1,
        Event::EntitySplit { .. } => counters.splits += 1,
        Event::SubscreenEntered { .. } => counters.subscreen_entries += 1,
        Event::SubscreenExited { .. } => counters.subscreen_exits += 1,
        Event::CaveLevelChanged { .. } => counters.cave_level_changes += 1,
        Event::GoalAbandoned { .. } => counters.abandoned_goals += 1,
        _ => return false,
    }
    true
}

/// Adds every counter of `latest` onto `totals`.
pub(crate) fn accumulate(totals: &mut MovementCounters, latest: &MovementCounters) {
    totals.steps += latest.steps;
    totals.stalls += latest.stalls;
    totals.escalations += latest.escalations;
    totals.zone_crossings += latest.zone_crossings;
    totals.rejected_crossings += latest.rejected_crossings;
    totals.merges += latest.merges;
    totals.splits += latest.splits;
    totals.subscreen_entries += latest.subscreen_entries;
    totals.subscreen_exits += latest.subscreen_exits;
    totals.cave_level_changes += latest.cave_level_changes;
    totals.abandoned_goals += latest.abandoned_goals;
}

#[cfg(test)]
mod tests {
    use super::{accumulate, record};
    use starcell_core::{EntityId, Escalation, Event, MovementCounters};

    #[test]
    fn stalls_count_escalations_separately() {
        let entity = EntityId::new(0);
        let mut counters = MovementCounters::default();
        for release in [Escalation::Hold, Escalation::HalveMemory, Escalation::IgnoreMemory] {
            assert!(record(
                &mut counters,
                &Event::EntityStalled {
                    entity,
                    stuck_counter: 1,
                    release,
                }
            ));
        }
        assert_eq!(counters.stalls, 3);
        assert_eq!(counters.escalations, 2);
    }

    #[test]
    fn bookkeeping_events_are_ignored() {
        let mut counters = MovementCounters::default();
        assert!(!record(&mut counters, &Event::TimeAdvanced { tick: 4 }));
        assert!(!record(
            &mut counters,
            &Event::EntityDespawned {
                entity: EntityId::new(2)
            }
        ));
        assert_eq!(counters, MovementCounters::default());
    }

    #[test]
    fn accumulate_adds_fieldwise() {
        let latest = MovementCounters {
            steps: 3,
            merges: 1,
            splits: 1,
            abandoned_goals: 2,
            ..MovementCounters::default()
        };
        let mut totals = MovementCounters {
            steps: 10,
            ..MovementCounters::default()
        };
        accumulate(&mut totals, &latest);
        accumulate(&mut totals, &latest);
        assert_eq!(totals.steps, 16);
        assert_eq!(totals.merges, 2);
        assert_eq!(totals.splits, 2);
        assert_eq!(totals.abandoned_goals, 4);
        assert_eq!(totals.stalls, 0);
    }
}
