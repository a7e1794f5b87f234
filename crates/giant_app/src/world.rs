//! A small simulated map for the demo host.
//!
//! The authority runs a [`SimWorld`] that spawns, resolves, levels, transforms
//! and kills creatures at random, reporting each step as [`WorldEvent`]s. It
//! also publishes a [`WorldMirror`] so replicas can see the same creatures,
//! giant tag included, the way an engine's own replication would.

use std::collections::{HashMap, HashSet};

use giant_core::EntityKey;
use giant_session::{EngineBinding, LevelKey, SimCreature, SimEngine};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Vanilla name list of the demo map.
pub const MAP_NAMES: &[&str] = &["Skag", "Bullymong", "Rakk", "Varkid Pod", "Bandit"];

/// The demo map's level key.
pub const MAP_LEVEL: LevelKey = LevelKey(1);

const MAX_POPULATION: usize = 24;
const BALANCE_DELAY: u64 = 2;

struct Species {
    class: &'static str,
    name: &'static str,
    slot: i32,
    champion: bool,
    transforms_into: Option<usize>,
}

const ROSTER: &[Species] = &[
    Species {
        class: "CharClass_Skag",
        name: "Skag",
        slot: 0,
        champion: false,
        transforms_into: None,
    },
    Species {
        class: "CharClass_PrimalBeast",
        name: "Bullymong",
        slot: 1,
        champion: false,
        transforms_into: None,
    },
    Species {
        class: "CharClass_Rakk",
        name: "Rakk",
        slot: 2,
        champion: false,
        transforms_into: None,
    },
    Species {
        class: "CharClass_BugMorph",
        name: "Varkid Pod",
        slot: 3,
        champion: false,
        transforms_into: Some(4),
    },
    Species {
        class: "CharClass_BugMorph_Adult",
        name: "Adult Varkid",
        slot: -1,
        champion: true,
        transforms_into: None,
    },
    Species {
        class: "CharClass_Nomad",
        name: "Bandit",
        slot: 4,
        champion: false,
        transforms_into: None,
    },
];

/// Something the session must hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    /// Spawned, or its balance was applied.
    Ready(EntityKey),
    /// `parent` transformed and left `child` in its place.
    ChildSpawned { parent: EntityKey, child: EntityKey },
    /// Died. The body is removed in the same step.
    Died(EntityKey),
    /// Gained a grade.
    LevelUp(EntityKey),
    /// Entered a named transformation.
    Transformed(EntityKey),
}

/// Engine-level state of one creature as replicas see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirroredCreature {
    /// Key shared by every peer.
    pub key: EntityKey,
    /// Archetype key.
    pub classification: String,
    /// Champion flag from balance data.
    pub champion: bool,
    /// Whether balance has been applied.
    pub balance_resolved: bool,
    /// Name from balance data, once known.
    pub balance_name: Option<String>,
    /// The species' slot in the vanilla name list.
    pub vanilla_slot: i32,
    /// The packed replicated field.
    pub tag: i32,
}

/// Every live creature on the authority, published once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMirror {
    /// Raw level key of the map.
    pub level: u64,
    /// Every live creature.
    pub creatures: Vec<MirroredCreature>,
}

fn map_names() -> Vec<String> {
    MAP_NAMES.iter().map(|n| (*n).to_string()).collect()
}

/// The authority's simulated map.
#[derive(Debug)]
pub struct SimWorld {
    engine: SimEngine,
    rng: StdRng,
    tick: u64,
    species: HashMap<EntityKey, usize>,
    resolve_at: Vec<(EntityKey, u64)>,
}

impl SimWorld {
    /// Load the demo map.
    #[must_use]
    pub fn new(rng: StdRng) -> Self {
        let mut engine = SimEngine::new(giant_session::Role::Authority);
        engine.load_level(MAP_LEVEL, map_names());
        engine.set_player_ready(true);
        Self {
            engine,
            rng,
            tick: 0,
            species: HashMap::new(),
            resolve_at: Vec::new(),
        }
    }

    /// The simulated engine.
    pub fn engine(&self) -> &SimEngine {
        &self.engine
    }

    /// Mutable access to the simulated engine.
    pub fn engine_mut(&mut self) -> &mut SimEngine {
        &mut self.engine
    }

    fn spawn(&mut self, index: usize, events: &mut Vec<WorldEvent>) -> EntityKey {
        let species = &ROSTER[index];
        let mut creature = SimCreature::new(species.class)
            .with_slot(species.slot)
            .named(species.name);
        creature.champion = species.champion;
        let key = self.engine.spawn(creature);
        self.species.insert(key, index);
        self.resolve_at.push((key, self.tick + BALANCE_DELAY));
        events.push(WorldEvent::Ready(key));
        key
    }

    /// Advance the map by one tick.
    pub fn step(&mut self) -> Vec<WorldEvent> {
        self.tick += 1;
        let mut events = Vec::new();

        let tick = self.tick;
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.resolve_at.drain(..).partition(|&(_, at)| at <= tick);
        self.resolve_at = waiting;
        for (key, _) in due {
            if self.engine.resolve_balance(key) {
                events.push(WorldEvent::Ready(key));
            }
        }

        let live: Vec<EntityKey> = self.engine.live_creatures().collect();
        for key in live {
            if self.rng.gen_ratio(1, 40) {
                let transforms_into = self
                    .species
                    .get(&key)
                    .and_then(|&i| ROSTER[i].transforms_into);
                if let Some(child_species) = transforms_into {
                    self.engine.transform(key, ROSTER[child_species].name);
                    events.push(WorldEvent::Transformed(key));
                    let child = self.spawn(child_species, &mut events);
                    events.push(WorldEvent::ChildSpawned { parent: key, child });
                }
                self.engine.kill(key);
                self.species.remove(&key);
                events.push(WorldEvent::Died(key));
            } else if self.rng.gen_ratio(1, 60) {
                self.engine.level_up(key);
                events.push(WorldEvent::LevelUp(key));
            }
        }

        if self.species.len() < MAX_POPULATION && self.rng.gen_ratio(1, 3) {
            let index = self.rng.gen_range(0..ROSTER.len());
            let key = self.spawn(index, &mut events);
            debug!(key = %key, class = ROSTER[index].class, "creature spawned");
        }

        events
    }

    /// The replicated view of every live creature.
    #[must_use]
    pub fn mirror(&self) -> WorldMirror {
        let creatures = self
            .engine
            .live_creatures()
            .filter_map(|key| {
                let creature = self.engine.creature_state(key)?;
                let vanilla_slot = self.species.get(&key).map_or(-1, |&i| ROSTER[i].slot);
                Some(MirroredCreature {
                    key,
                    classification: creature.classification.to_string(),
                    champion: creature.champion,
                    balance_resolved: creature.balance_resolved,
                    balance_name: creature.naming.balance_name.clone(),
                    vanilla_slot,
                    tag: creature.tag,
                })
            })
            .collect();
        WorldMirror {
            level: MAP_LEVEL.0,
            creatures,
        }
    }
}

/// A replica's copy of the authority's map.
#[derive(Debug)]
pub struct ReplicaWorld {
    engine: SimEngine,
}

impl ReplicaWorld {
    /// An empty replica engine whose player is ready.
    #[must_use]
    pub fn new() -> Self {
        let mut engine = SimEngine::new(giant_session::Role::Replica);
        engine.set_player_ready(true);
        Self { engine }
    }

    /// The replica's engine.
    pub fn engine(&self) -> &SimEngine {
        &self.engine
    }

    /// Mutable access to the replica's engine.
    pub fn engine_mut(&mut self) -> &mut SimEngine {
        &mut self.engine
    }

    /// Applies one mirror from the authority, keeping every replica-local
    /// change (name slot, scale) on creatures that already exist.
    pub fn apply(&mut self, mirror: WorldMirror) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        if self.engine.session().level != Some(LevelKey(mirror.level)) {
            self.engine.load_level(LevelKey(mirror.level), map_names());
        }

        let keep: HashSet<EntityKey> = mirror.creatures.iter().map(|c| c.key).collect();
        self.engine.retain_keys(&keep);

        for remote in mirror.creatures {
            let key = remote.key;
            match self.engine.creature_state(key).cloned() {
                Some(mut local) => {
                    let changed = local.balance_resolved != remote.balance_resolved
                        || local.tag != remote.tag;
                    local.balance_resolved = remote.balance_resolved;
                    local.tag = remote.tag;
                    local.naming.balance_name = remote.balance_name;
                    self.engine.insert(key, local);
                    if changed {
                        events.push(WorldEvent::Ready(key));
                    }
                }
                None => {
                    let mut creature = SimCreature::new(remote.classification.as_str())
                        .with_slot(remote.vanilla_slot);
                    creature.champion = remote.champion;
                    creature.balance_resolved = remote.balance_resolved;
                    creature.naming.balance_name = remote.balance_name;
                    creature.tag = remote.tag;
                    self.engine.insert(key, creature);
                    events.push(WorldEvent::Ready(key));
                }
            }
        }
        events
    }
}

impl Default for ReplicaWorld {
    fn default() -> Self {
        Self::new()
    }
}
