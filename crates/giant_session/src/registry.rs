//! Promotion registry.
//!
//! The authority keeps one [`PromotionRecord`] per promoted creature, keyed by
//! its [`GiantId`]. Replicas keep a [`ReplicaView`]: the last id list the
//! authority pushed plus whatever local bookkeeping they attached to each id.
//!
//! Neither side holds engine handles. Records remember an [`EntityKey`] and
//! are pruned against the engine's live set, never torn down by the engine.

use std::collections::{BTreeMap, HashMap, HashSet};

use giant_core::{Classification, CoreError, EntityKey, GiantId, IdAllocator};
use tracing::debug;

/// Authority-side state of one promoted creature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromotionRecord {
    /// The creature's identifier.
    pub id: GiantId,
    /// The creature this record belongs to.
    pub key: EntityKey,
    /// Classification at promotion time.
    pub classification: Classification,
    /// Cleared when the reward is inherited by a transform child.
    pub should_drop_reward: bool,
    /// The creature's vanilla name slot, remembered for renaming.
    pub vanilla_slot: i32,
    /// Presentation has been applied (balance was resolved at least once).
    pub balance_applied: bool,
}

/// All promoted creatures on the authority.
#[derive(Debug, Default)]
pub struct PromotionRegistry {
    allocator: IdAllocator,
    records: BTreeMap<GiantId, PromotionRecord>,
    by_key: HashMap<EntityKey, GiantId>,
}

impl PromotionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Promotes `key`, allocating a fresh id.
    ///
    /// If the creature already holds a record, that record is returned and
    /// nothing changes.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdentifiersExhausted`] if no id is free.
    pub fn promote(
        &mut self,
        key: EntityKey,
        classification: Classification,
        vanilla_slot: i32,
    ) -> Result<&PromotionRecord, CoreError> {
        let id = match self.by_key.get(&key) {
            Some(&id) => id,
            None => {
                let id = self.allocator.allocate()?;
                self.by_key.insert(key, id);
                self.records.insert(
                    id,
                    PromotionRecord {
                        id,
                        key,
                        classification,
                        should_drop_reward: true,
                        vanilla_slot,
                        balance_applied: false,
                    },
                );
                debug!(id = %id, key = %key, "record created");
                id
            }
        };
        Ok(&self.records[&id])
    }

    /// The record of `key`, if promoted.
    #[must_use]
    pub fn get(&self, key: EntityKey) -> Option<&PromotionRecord> {
        self.by_key.get(&key).and_then(|id| self.records.get(id))
    }

    /// Mutable access to the record of `key`.
    pub fn get_mut(&mut self, key: EntityKey) -> Option<&mut PromotionRecord> {
        let id = self.by_key.get(&key)?;
        self.records.get_mut(id)
    }

    /// Whether `key` is promoted.
    #[must_use]
    pub fn contains(&self, key: EntityKey) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Removes the record of `key` and frees its id.
    pub fn remove(&mut self, key: EntityKey) -> Option<PromotionRecord> {
        let id = self.by_key.remove(&key)?;
        self.allocator.release(id);
        self.records.remove(&id)
    }

    /// Drops every record whose creature is not in `live`.
    ///
    /// Returns the dropped records.
    pub fn prune(&mut self, live: &HashSet<EntityKey>) -> Vec<PromotionRecord> {
        let stale: Vec<EntityKey> = self
            .records
            .values()
            .map(|r| r.key)
            .filter(|key| !live.contains(key))
            .collect();
        stale.into_iter().filter_map(|key| self.remove(key)).collect()
    }

    /// Records in ascending id order.
    pub fn records(&self) -> impl Iterator<Item = &PromotionRecord> {
        self.records.values()
    }

    /// Promoted ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<GiantId> {
        self.records.keys().copied().collect()
    }

    /// Number of promoted creatures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing is promoted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Replica-side bookkeeping attached to one pushed id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaRecord {
    /// The local creature presentation was applied to.
    pub key: Option<EntityKey>,
    /// Its vanilla name slot, captured before it was renamed.
    pub vanilla_slot: i32,
}

/// The replica's mirror of the authority's promoted-id list.
#[derive(Debug, Default)]
pub struct ReplicaView {
    ids: Vec<GiantId>,
    records: BTreeMap<GiantId, ReplicaRecord>,
}

impl ReplicaView {
    /// Create an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopts a freshly pushed id list, dropping bookkeeping for ids that are
    /// no longer present. Returns the dropped bookkeeping.
    pub fn reconcile(&mut self, ids: Vec<GiantId>) -> Vec<(GiantId, ReplicaRecord)> {
        let keep: HashSet<GiantId> = ids.iter().copied().collect();
        let stale: Vec<GiantId> = self
            .records
            .keys()
            .copied()
            .filter(|id| !keep.contains(id))
            .collect();
        self.ids = ids;
        stale
            .into_iter()
            .filter_map(|id| self.records.remove(&id).map(|record| (id, record)))
            .collect()
    }

    /// The pushed ids in name-table order.
    #[must_use]
    pub fn ids(&self) -> &[GiantId] {
        &self.ids
    }

    /// Whether `id` is in the current list.
    #[must_use]
    pub fn contains(&self, id: GiantId) -> bool {
        self.ids.contains(&id)
    }

    /// Bookkeeping for `id`, if any was attached.
    #[must_use]
    pub fn record(&self, id: GiantId) -> Option<&ReplicaRecord> {
        self.records.get(&id)
    }

    /// Bookkeeping for `id`, created on first access.
    pub fn record_mut(&mut self, id: GiantId) -> &mut ReplicaRecord {
        self.records.entry(id).or_insert_with(|| ReplicaRecord {
            key: None,
            vanilla_slot: crate::names::NO_SLOT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class() -> Classification {
        Classification::from("CharClass_Skag")
    }

    fn id(raw: u16) -> GiantId {
        GiantId::new(raw).unwrap()
    }

    #[test]
    fn test_promote_allocates_sequential_ids() {
        let mut registry = PromotionRegistry::new();
        let a = registry.promote(EntityKey(10), class(), 0).unwrap().id;
        let b = registry.promote(EntityKey(11), class(), 1).unwrap().id;
        assert_eq!(a, id(1));
        assert_eq!(b, id(2));
        assert!(registry.get(EntityKey(10)).unwrap().should_drop_reward);
    }

    #[test]
    fn test_promote_twice_keeps_record() {
        let mut registry = PromotionRegistry::new();
        registry.promote(EntityKey(10), class(), 0).unwrap();
        registry.get_mut(EntityKey(10)).unwrap().should_drop_reward = false;
        let again = registry.promote(EntityKey(10), class(), 5).unwrap();
        assert_eq!(again.id, id(1));
        assert_eq!(again.vanilla_slot, 0);
        assert!(!again.should_drop_reward);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_frees_id_for_reuse() {
        let mut registry = PromotionRegistry::new();
        for k in 1..=3 {
            registry.promote(EntityKey(k), class(), 0).unwrap();
        }
        let removed = registry.remove(EntityKey(3)).unwrap();
        assert_eq!(removed.id, id(3));
        assert!(!registry.contains(EntityKey(3)));
        let reused = registry.promote(EntityKey(4), class(), 0).unwrap().id;
        assert_eq!(reused, id(3));
    }

    #[test]
    fn test_prune_drops_vanished() {
        let mut registry = PromotionRegistry::new();
        registry.promote(EntityKey(1), class(), 0).unwrap();
        registry.promote(EntityKey(2), class(), 0).unwrap();
        let live: HashSet<EntityKey> = [EntityKey(2)].into_iter().collect();
        let dropped = registry.prune(&live);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].key, EntityKey(1));
        assert_eq!(registry.ids(), vec![id(2)]);
    }

    #[test]
    fn test_records_in_id_order() {
        let mut registry = PromotionRegistry::new();
        registry.promote(EntityKey(30), class(), 0).unwrap();
        registry.promote(EntityKey(20), class(), 0).unwrap();
        registry.remove(EntityKey(30));
        registry.promote(EntityKey(10), class(), 0).unwrap();
        let keys: Vec<EntityKey> = registry.records().map(|r| r.key).collect();
        assert_eq!(keys, vec![EntityKey(10), EntityKey(20)]);
    }

    #[test]
    fn test_reconcile_drops_missing_ids() {
        let mut view = ReplicaView::new();
        view.reconcile(vec![id(1), id(2)]);
        view.record_mut(id(1)).key = Some(EntityKey(5));
        view.record_mut(id(2)).key = Some(EntityKey(6));

        let dropped = view.reconcile(vec![id(2)]);
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].0, id(1));
        assert_eq!(dropped[0].1.key, Some(EntityKey(5)));
        assert!(view.record(id(1)).is_none());
        assert_eq!(view.record(id(2)).unwrap().key, Some(EntityKey(6)));
        assert_eq!(view.ids(), [id(2)]);
    }
}
