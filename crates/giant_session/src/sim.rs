//! An in-memory [`EngineBinding`].
//!
//! Used by the tests and by the demo host. Each creature carries its giant id
//! packed into its `tag` field next to the engine's own grade value, the way
//! a host without a side channel would replicate it.

use std::collections::{BTreeMap, HashSet};

use giant_core::{Classification, EntityKey, GiantId, packing};
use glam::Vec3;

use crate::binding::{
    CreatureInfo, EngineBinding, LevelKey, NameSource, Presentation, RewardPool, Role, SessionInfo,
};
use crate::names::{BaseName, NO_SLOT, VanillaNames, resolve_base_name};

/// One simulated creature.
#[derive(Debug, Clone, PartialEq)]
pub struct SimCreature {
    /// Archetype key.
    pub classification: Classification,
    /// Champion flag from the creature's balance data.
    pub champion: bool,
    /// Whether the engine has applied the creature's balance.
    pub balance_resolved: bool,
    /// Index into the map's display-name list, or `-1`.
    pub name_slot: i32,
    /// Naming inputs other than the slot.
    pub naming: NameSource,
    /// Grade in the low half, giant id in the high half.
    pub tag: i32,
    /// Mesh scale.
    pub scale: Vec3,
    /// Movement speed multiplier.
    pub speed: f32,
    /// Product of every stat multiplier applied so far.
    pub stat_multiplier: f32,
}

impl SimCreature {
    /// A grade-0 creature with unresolved balance and no name slot.
    #[must_use]
    pub fn new(classification: impl Into<Classification>) -> Self {
        Self {
            classification: classification.into(),
            champion: false,
            balance_resolved: false,
            name_slot: NO_SLOT,
            naming: NameSource::default(),
            tag: packing::pack_vanilla(0),
            scale: Vec3::ONE,
            speed: 1.0,
            stat_multiplier: 1.0,
        }
    }

    /// Sets the vanilla name slot.
    #[must_use]
    pub fn with_slot(mut self, slot: i32) -> Self {
        self.name_slot = slot;
        self
    }

    /// Sets the engine grade, clearing any giant id.
    #[must_use]
    pub fn with_grade(mut self, grade: i16) -> Self {
        self.tag = packing::pack_vanilla(grade);
        self
    }

    /// Sets the name the balance data provides.
    #[must_use]
    pub fn named(mut self, balance_name: &str) -> Self {
        self.naming.balance_name = Some(balance_name.to_string());
        self
    }

    /// Marks the creature as a champion.
    #[must_use]
    pub fn champion(mut self) -> Self {
        self.champion = true;
        self
    }

    /// Marks the balance as already applied.
    #[must_use]
    pub fn resolved(mut self) -> Self {
        self.balance_resolved = true;
        self
    }

    /// The engine's own grade value.
    #[must_use]
    pub fn grade(&self) -> i16 {
        packing::unpack(self.tag).0
    }
}

/// A whole simulated map.
#[derive(Debug)]
pub struct SimEngine {
    session: SessionInfo,
    vanilla: Vec<String>,
    name_list: Vec<String>,
    creatures: BTreeMap<EntityKey, SimCreature>,
    next_key: u64,
    rewards: Vec<(EntityKey, RewardPool)>,
}

impl SimEngine {
    /// An engine with no map loaded.
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            session: SessionInfo {
                level: None,
                role,
                player_ready: false,
            },
            vanilla: Vec::new(),
            name_list: Vec::new(),
            creatures: BTreeMap::new(),
            next_key: 1,
            rewards: Vec::new(),
        }
    }

    /// Loads a map, discarding every creature of the previous one.
    pub fn load_level(&mut self, level: LevelKey, vanilla: Vec<String>) {
        self.session.level = Some(level);
        self.name_list.clone_from(&vanilla);
        self.vanilla = vanilla;
        self.creatures.clear();
        self.rewards.clear();
    }

    /// Unloads the current map.
    pub fn unload_level(&mut self) {
        self.session.level = None;
        self.creatures.clear();
    }

    /// Sets whether the local player has finished loading.
    pub fn set_player_ready(&mut self, ready: bool) {
        self.session.player_ready = ready;
    }

    /// Adds a creature under a fresh key.
    pub fn spawn(&mut self, creature: SimCreature) -> EntityKey {
        let key = EntityKey(self.next_key);
        self.next_key += 1;
        self.creatures.insert(key, creature);
        key
    }

    /// Adds or replaces a creature under a known key.
    pub fn insert(&mut self, key: EntityKey, creature: SimCreature) {
        self.next_key = self.next_key.max(key.0 + 1);
        self.creatures.insert(key, creature);
    }

    /// Drops every creature whose key is not in `keep`. Returns the dropped keys.
    pub fn retain_keys(&mut self, keep: &HashSet<EntityKey>) -> Vec<EntityKey> {
        let gone: Vec<EntityKey> = self
            .creatures
            .keys()
            .copied()
            .filter(|key| !keep.contains(key))
            .collect();
        for key in &gone {
            self.creatures.remove(key);
        }
        gone
    }

    /// Marks a creature's balance as applied.
    pub fn resolve_balance(&mut self, key: EntityKey) -> bool {
        match self.creatures.get_mut(&key) {
            Some(c) => {
                c.balance_resolved = true;
                true
            }
            None => false,
        }
    }

    /// Puts a creature into a named transformation.
    pub fn transform(&mut self, key: EntityKey, name: &str) -> bool {
        match self.creatures.get_mut(&key) {
            Some(c) => {
                c.naming.transformed = true;
                c.naming.transformed_name = Some(name.to_string());
                true
            }
            None => false,
        }
    }

    /// Bumps a creature's grade. The giant id in the same field survives.
    pub fn level_up(&mut self, key: EntityKey) -> bool {
        match self.creatures.get_mut(&key) {
            Some(c) => {
                packing::with_vanilla(&mut c.tag, |grade| *grade = grade.saturating_add(1));
                true
            }
            None => false,
        }
    }

    /// Removes a creature.
    pub fn kill(&mut self, key: EntityKey) -> Option<SimCreature> {
        self.creatures.remove(&key)
    }

    /// Full state of one creature.
    #[must_use]
    pub fn creature_state(&self, key: EntityKey) -> Option<&SimCreature> {
        self.creatures.get(&key)
    }

    /// The engine grade of one creature.
    #[must_use]
    pub fn grade(&self, key: EntityKey) -> Option<i16> {
        self.creatures.get(&key).map(SimCreature::grade)
    }

    /// The display-name list as last written.
    #[must_use]
    pub fn name_list(&self) -> &[String] {
        &self.name_list
    }

    /// Every reward drop requested so far.
    #[must_use]
    pub fn rewards(&self) -> &[(EntityKey, RewardPool)] {
        &self.rewards
    }

    /// What the creature's nameplate shows.
    #[must_use]
    pub fn displayed_name(&self, key: EntityKey) -> Option<String> {
        let creature = self.creatures.get(&key)?;
        let list = VanillaNames::new(self.name_list.clone());
        match resolve_base_name(&list, creature.name_slot, &creature.naming)? {
            BaseName::Own(name) | BaseName::Parent(name) => Some(name),
        }
    }
}

impl EngineBinding for SimEngine {
    fn session(&self) -> SessionInfo {
        self.session
    }

    fn vanilla_names(&self) -> Vec<String> {
        self.vanilla.clone()
    }

    fn live_creatures(&self) -> impl Iterator<Item = EntityKey> + '_ {
        self.creatures.keys().copied()
    }

    fn creature(&self, key: EntityKey) -> Option<CreatureInfo> {
        let c = self.creatures.get(&key)?;
        Some(CreatureInfo {
            classification: c.classification.clone(),
            champion: c.champion,
            balance_resolved: c.balance_resolved,
            name_slot: c.name_slot,
            naming: c.naming.clone(),
        })
    }

    fn giant_id(&self, key: EntityKey) -> Option<GiantId> {
        self.creatures.get(&key).and_then(|c| packing::unpack(c.tag).1)
    }

    fn set_giant_id(&mut self, key: EntityKey, id: Option<GiantId>) {
        if let Some(c) = self.creatures.get_mut(&key) {
            c.tag = packing::repack(c.grade(), id);
        }
    }

    fn set_name_slot(&mut self, key: EntityKey, slot: i32) {
        if let Some(c) = self.creatures.get_mut(&key) {
            c.name_slot = slot;
        }
    }

    fn apply_presentation(&mut self, key: EntityKey, presentation: &Presentation) {
        if let Some(c) = self.creatures.get_mut(&key) {
            c.scale = presentation.scale;
            c.speed = presentation.speed_multiplier;
        }
    }

    fn apply_stat_multiplier(&mut self, key: EntityKey, factor: f32) {
        if let Some(c) = self.creatures.get_mut(&key) {
            c.stat_multiplier *= factor;
        }
    }

    fn write_name_list(&mut self, names: &[String]) {
        self.name_list = names.to_vec();
    }

    fn drop_reward(&mut self, key: EntityKey, pool: RewardPool) {
        self.rewards.push((key, pool));
    }
}
