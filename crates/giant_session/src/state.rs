//! Per-map session state.
//!
//! One [`CoreState`] exists per loaded map and role. A map transition or a
//! role change drops it wholesale and builds a new one, which is the only
//! cancellation the pending tasks ever need.

use std::collections::BTreeMap;

use giant_core::{EntityKey, GiantId};

use crate::binding::{LevelKey, Role};
use crate::names::NameTableManager;
use crate::registry::{PromotionRegistry, ReplicaView};
use crate::scheduler::TaskScheduler;

/// Everything the session tracks for the current map.
#[derive(Debug)]
pub struct CoreState {
    /// The map this state belongs to.
    pub level: LevelKey,
    /// The role this state was built for.
    pub role: Role,
    /// Vanilla prefix and installed name table.
    pub names: NameTableManager,
    /// Authority: promoted creatures.
    pub registry: PromotionRegistry,
    /// Replica: the authority's last pushed id list.
    pub replica: ReplicaView,
    /// Deferred work for the next tick.
    pub scheduler: TaskScheduler,
    /// Authority: the id list replicas last received, if any.
    pub pushed_ids: Option<Vec<GiantId>>,
    /// Authority: creatures that won their roll while no id was free, with
    /// their vanilla slot. Retried on every refresh.
    pub pending_promotions: BTreeMap<EntityKey, i32>,
}

impl CoreState {
    /// Fresh state for `level` in `role`.
    #[must_use]
    pub fn new(level: LevelKey, role: Role) -> Self {
        Self {
            level,
            role,
            names: NameTableManager::new(),
            registry: PromotionRegistry::new(),
            replica: ReplicaView::new(),
            scheduler: TaskScheduler::new(),
            pushed_ids: None,
            pending_promotions: BTreeMap::new(),
        }
    }

    /// Whether this state is still valid for `level` in `role`.
    #[must_use]
    pub fn matches(&self, level: LevelKey, role: Role) -> bool {
        self.level == level && self.role == role
    }
}
