#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic analytics system that summarises movement activity per tick.

mod metrics;

use starcell_core::{EntityView, Event, MovementCounters, StatsReport};

/// Pure analytics system that folds world events into movement statistics.
#[derive(Debug, Default)]
pub struct Analytics {
    last_report: Option<StatsReport>,
    latest: MovementCounters,
    totals: MovementCounters,
}

impl Analytics {
    /// Creates a new analytics system with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last analytics report published by the system, if any.
    #[must_use]
    pub fn last_report(&self) -> Option<&StatsReport> {
        self.last_report.as_ref()
    }

    /// Counters accumulated since the first published report.
    #[must_use]
    pub fn totals(&self) -> MovementCounters {
        self.totals
    }

    /// Consumes world events and publishes a report once per observed tick.
    ///
    /// Events seen before the tick's `Event::TimeAdvanced` are carried into the
    /// next report, so callers may feed a tick's events in several batches.
    pub fn handle(&mut self, events: &[Event], entity_view: &EntityView, out: &mut Vec<Event>) {
        let mut tick = None;

        for event in events {
            if let Event::TimeAdvanced { tick: current } = event {
                tick = Some(*current);
                continue;
            }
            let _ = metrics::record(&mut self.latest, event);
        }

        let Some(tick) = tick else {
            return;
        };

        let latest = std::mem::take(&mut self.latest);
        metrics::accumulate(&mut self.totals, &latest);
        let report = StatsReport {
            tick,
            latest,
            totals: self.totals,
            live_entities: u64::try_from(entity_view.len()).unwrap_or(u64::MAX),
        };
        self.last_report = Some(report.clone());
        out.push(Event::AnalyticsUpdated { report });
    }
}

#[cfg(test)]
mod tests {
    use super::Analytics;
    use starcell_core::{EntityId, EntityView, Event};

    #[test]
    fn stays_quiet_until_a_tick_is_observed() {
        let mut analytics = Analytics::new();
        let mut out = Vec::new();
        analytics.handle(
            &[Event::EntityDespawned {
                entity: EntityId::new(1),
            }],
            &EntityView::default(),
            &mut out,
        );
        assert!(out.is_empty());
        assert!(analytics.last_report().is_none());
    }
}
