//! The seam between the session core and the host engine.
//!
//! The engine owns every creature. The core only ever addresses one through an
//! [`EntityKey`] and re-reads whatever it needs through [`EngineBinding`] at
//! the moment it needs it, so a creature that vanished simply yields `None`.

use giant_core::{Classification, EntityKey, GiantId};
use glam::Vec3;

/// Identifies the current map instance. Only compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LevelKey(pub u64);

/// Network role of this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Holds ground truth and rolls promotions.
    Authority,
    /// Mirrors the authority for presentation only.
    Replica,
}

/// What the engine currently reports about the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    /// The loaded map, or `None` while no map is loaded.
    pub level: Option<LevelKey>,
    /// This process's role.
    pub role: Role,
    /// Whether the game session and local player identity are visible yet.
    pub player_ready: bool,
}

/// A creature owned by a player, displayed through a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mastery {
    /// The owning player's display name.
    pub owner_name: String,
    /// Template where `%s` is the owner and `%n` the creature name.
    pub template: String,
}

/// The engine's inputs to display-name resolution, in precedence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameSource {
    /// The creature shows its parent's name instead of its own.
    pub defers_to_parent: bool,
    /// The parent's current displayed name, if there is a parent.
    pub parent_name: Option<String>,
    /// The creature is mid-transformation.
    pub transformed: bool,
    /// Name for the current transformation, if any.
    pub transformed_name: Option<String>,
    /// Display name from the balance definition.
    pub balance_name: Option<String>,
    /// Default display name of the classification.
    pub class_default_name: Option<String>,
    /// Owning player, if the creature is mastered.
    pub mastery: Option<Mastery>,
}

/// Snapshot of one creature's attributes the core consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatureInfo {
    /// Archetype key.
    pub classification: Classification,
    /// Champion flag from the balance template.
    pub champion: bool,
    /// Whether the engine has applied the creature's balance definition.
    pub balance_resolved: bool,
    /// Current display-name-list slot (`-1` for none).
    pub name_slot: i32,
    /// Inputs to name resolution.
    pub naming: NameSource,
}

/// Visual effects applied to a promoted creature on every peer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Presentation {
    /// Mesh scale.
    pub scale: Vec3,
    /// Movement speed multiplier.
    pub speed_multiplier: f32,
}

/// Reward pools the loot collaborator knows how to spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardPool {
    /// The legendary-weighted giant pool.
    Giant,
}

/// Everything the core reads from, and asks of, the host engine.
pub trait EngineBinding {
    /// Current map, role and readiness.
    fn session(&self) -> SessionInfo;

    /// The map's own display-name list.
    fn vanilla_names(&self) -> Vec<String>;

    /// Every currently live promotable creature, in engine order.
    fn live_creatures(&self) -> impl Iterator<Item = EntityKey> + '_;

    /// Reads a creature, or `None` if it no longer exists.
    fn creature(&self, key: EntityKey) -> Option<CreatureInfo>;

    /// The giant id carried by a creature, if any.
    fn giant_id(&self, key: EntityKey) -> Option<GiantId>;

    /// Attaches (or clears) a creature's giant id.
    fn set_giant_id(&mut self, key: EntityKey, id: Option<GiantId>);

    /// Points a creature at a slot of the active name list.
    fn set_name_slot(&mut self, key: EntityKey, slot: i32);

    /// Applies scale and speed effects.
    fn apply_presentation(&mut self, key: EntityKey, presentation: &Presentation);

    /// Multiplies health, shield and experience starting values. Authority only.
    fn apply_stat_multiplier(&mut self, key: EntityKey, factor: f32);

    /// Replaces the map's active display-name list.
    fn write_name_list(&mut self, names: &[String]);

    /// Spawns a reward from `pool` where the creature stands.
    fn drop_reward(&mut self, key: EntityKey, pool: RewardPool);
}
