//! Region membership index.

use std::collections::BTreeMap;

use starcell_core::{EntityId, Region};

/// Maps every region to the entities registered in it.
///
/// The reverse map keeps each entity in exactly one region; relocation
/// rewrites both sides in one call so no caller can observe an entity in
/// zero or two regions.
#[derive(Debug, Default)]
pub(crate) struct EntityIndex {
    members: BTreeMap<Region, Vec<EntityId>>,
    placement: BTreeMap<EntityId, Region>,
}

impl EntityIndex {
    pub(crate) fn register(&mut self, entity: EntityId, region: Region) {
        let _ = self.deregister(entity);
        self.members.entry(region).or_default().push(entity);
        let _ = self.placement.insert(entity, region);
    }

    pub(crate) fn deregister(&mut self, entity: EntityId) -> Option<Region> {
        let region = self.placement.remove(&entity)?;
        if let Some(list) = self.members.get_mut(&region) {
            list.retain(|member| *member != entity);
            if list.is_empty() {
                let _ = self.members.remove(&region);
            }
        }
        Some(region)
    }

    /// Moves a registered entity to another region; unknown entities are ignored.
    pub(crate) fn relocate(&mut self, entity: EntityId, to: Region) -> bool {
        if !self.placement.contains_key(&entity) {
            return false;
        }
        self.register(entity, to);
        true
    }

    pub(crate) fn members(&self, region: Region) -> &[EntityId] {
        self.members.get(&region).map_or(&[], Vec::as_slice)
    }

    pub(crate) fn population(&self, region: Region) -> usize {
        self.members(region).len()
    }

    /// Every region whose member list mentions the entity.
    pub(crate) fn regions_listing(&self, entity: EntityId) -> Vec<Region> {
        self.members
            .iter()
            .filter(|(_, list)| list.contains(&entity))
            .map(|(region, _)| *region)
            .collect()
    }
}
