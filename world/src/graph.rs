//! Symmetric connectivity between zones and interiors.

use std::collections::{BTreeMap, BTreeSet};

use starcell_core::{CellCoord, Connection, ConnectionKind, Region};

/// Adjacency records between regions, always stored in both directions.
#[derive(Debug, Default)]
pub(crate) struct ZoneGraph {
    edges: BTreeMap<Region, BTreeSet<Connection>>,
}

impl ZoneGraph {
    /// Records a link and its reverse; re-inserting an existing link is a no-op.
    pub(crate) fn connect(&mut self, a: Region, b: Region, kind: ConnectionKind, cell: CellCoord) {
        let _ = self.edges.entry(a).or_default().insert(Connection {
            from: a,
            to: b,
            kind,
            cell,
        });
        let _ = self.edges.entry(b).or_default().insert(Connection {
            from: b,
            to: a,
            kind,
            cell,
        });
    }

    pub(crate) fn connections(&self, region: Region) -> Vec<Connection> {
        self.edges
            .get(&region)
            .map(|links| links.iter().copied().collect())
            .unwrap_or_default()
    }
}
