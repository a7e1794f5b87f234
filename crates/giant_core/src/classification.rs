//! Creature classifications and the static lookup tables keyed by them.
//!
//! The tables below are plain data and are revised far more often than any
//! logic that consults them. Keep them sorted and keep logic out of them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Archetype key of a creature (the engine's AI class name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Classification(String);

impl Classification {
    /// Create a classification from its key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Classification {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classifications that never roll for promotion.
pub const NEVER_ROLL: &[&str] = &[
    "CharClass_Bloodwing",
    "CharClass_BunkerBoss",
    "CharClass_DragonHeart_Raid",
    "CharClass_GoliathBossProxy",
    "CharacterClass_Orchid_BossWorm",
];

/// Classifications whose promotion passes to the child they transform into.
pub const BEQUEATH_TO_CHILD: &[&str] = &[
    "CharClass_Anemone_BugMorph_Basic",
    "CharClass_BugMoprhUltimate",
    "CharClass_BugMorph",
    "CharClass_BugMorph_Adult",
    "CharClass_Bugmorph_Badass",
    "CharClass_Bugmorph_SuperBadass",
    "CharClass_InfectedPodTendril",
    "CharClass_Nast_BugMorphTreasure",
    "CharClass_Nast_BugMorph_BadassBloodhound",
    "CharClass_Nasturtium_BugMorph_Acid",
    "CharClass_Nasturtium_BugMorph_Badass",
    "CharClass_Nasturtium_BugMorph_Bloodhound",
    "CharClass_Nasturtium_BugMorph_Fire_Holiday",
    "CharClass_Nasturtium_BugMorph_Miami",
    "CharClass_Nasturtium_BugMorph_Rasta",
    "CharClass_Nasturtium_BugMorph_Shock",
    "CharClass_Nasturtium_BugMorph_Tropical",
    "CharClass_Pumpkinhead",
    "CharClass_Skeleton_Fire",
    "CharClass_Skeleton_King",
];

/// Classifications that never drop a reward on death.
pub const NEVER_DROP_REWARD: &[&str] = &[
    "CharClass_Assassin_Hologram",
    "CharClass_Aster_Roland_Turret",
    "CharClass_DeathTrap",
    "CharClass_RakkVolcanic",
    "CharClass_RolandDeployableTurret",
    "CharClass_Scorpio",
    // Kings drop through their head creature.
    "CharClass_Skeleton_King",
    "CharClass_TargetDummy",
    "CharClass_TargetDummyBot",
    "CharClass_TargetDummy_Shield",
    "CharClass_TargetDummy_Target",
];

/// Explicit badass flags that override the creature's champion flag.
pub const BADASS_OVERRIDES: &[(&str, bool)] = &[
    ("CharClass_Anemone_Cassius", true),
    ("CharClass_Anemone_Hector", true),
    ("CharClass_Anemone_Infected_Golem_Badass", true),
    ("CharClass_Anemone_Lt_Angvar", true),
    ("CharClass_Anemone_Lt_Bolson", true),
    ("CharClass_Anemone_Lt_Hoffman", true),
    ("CharClass_Anemone_Lt_Tetra", true),
    ("CharClass_Anemone_UranusBOT", true),
    ("CharClass_Aster_GenericNPC", false),
    ("CharClass_BlingLoader", true),
    ("CharClass_Boll", true),
    ("CharClass_BugMorph_Bee_Badass", true),
    ("CharClass_CommunityMember", false),
    ("CharClass_Dragon", true),
    ("CharClass_FlyntSon", true),
    ("CharClass_GateGuard", false),
    ("CharClass_Golem_SwordInStone", true),
    ("CharClass_Iris_BikeRiderMarauderBadass", true),
    ("CharClass_Iris_MotorMamaBike", true),
    ("CharClass_Iris_Raid_PyroPete", true),
    ("CharClass_Juggernaut", true),
    ("CharClass_Orchid_Deserter_Cook", true),
    ("CharClass_Orchid_Deserter_Deckhand", true),
    ("CharClass_Orchid_LittleSis", true),
    ("CharClass_Orchid_RaidShaman", true),
    ("CharClass_RakkBadass", true),
    ("CharClass_Sage_AcquiredTaste_Creature", true),
    ("CharClass_Sage_Ep3_Creature", true),
    ("CharClass_Sage_Raid_Beast", true),
    ("CharClass_Sage_Raid_BeastMaster", true),
    ("CharClass_Sage_Rhino", true),
    ("CharClass_Sage_RhinoBasass", true),
    ("CharClass_Sage_ScaylionQueen", true),
    ("CharClass_SarcasticSlab", true),
    ("CharClass_Skeleton_Immortal", false),
    ("CharClass_SpiderTank_Baricade", false),
    ("CharClass_Spiderpants", true),
    ("CharClass_Tentacle_Slappy", false),
    ("CharClass_Thresher_Raid", true),
    ("CharClass_TundraPatrol", true),
    ("CharacterClass_Anemone_SandWormBoss_1", true),
    ("CharacterClass_Anemone_SandWormQueen", true),
    ("CharacterClass_Orchid_SandWormQueen", true),
];

/// The classification lookup tables consulted by selection, bequeathal and
/// reward handling.
///
/// [`ClassificationTables::default`] loads the built-in tables; tests and
/// hosts may build their own with [`ClassificationTables::from_lists`].
#[derive(Debug, Clone)]
pub struct ClassificationTables {
    never_roll: HashSet<String>,
    bequeath: HashSet<String>,
    never_drop: HashSet<String>,
    badass_overrides: HashMap<String, bool>,
}

impl ClassificationTables {
    /// Build tables from explicit lists.
    #[must_use]
    pub fn from_lists(
        never_roll: &[&str],
        bequeath: &[&str],
        never_drop: &[&str],
        badass_overrides: &[(&str, bool)],
    ) -> Self {
        Self {
            never_roll: key_set(never_roll),
            bequeath: key_set(bequeath),
            never_drop: key_set(never_drop),
            badass_overrides: badass_overrides
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        }
    }

    /// Tables with no entries at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_lists(&[], &[], &[], &[])
    }

    /// Returns `true` if this classification must never be promoted by a roll.
    #[must_use]
    pub fn never_rolls(&self, class: &Classification) -> bool {
        self.never_roll.contains(class.as_str())
    }

    /// Returns `true` if this classification hands its promotion to the
    /// child it transforms into.
    #[must_use]
    pub fn bequeaths(&self, class: &Classification) -> bool {
        self.bequeath.contains(class.as_str())
    }

    /// Returns `true` if this classification never drops a reward.
    #[must_use]
    pub fn never_drops_reward(&self, class: &Classification) -> bool {
        self.never_drop.contains(class.as_str())
    }

    /// Resolves whether a creature counts as a badass.
    ///
    /// The override table wins; otherwise the engine's champion flag is used.
    #[must_use]
    pub fn is_badass(&self, class: &Classification, champion: bool) -> bool {
        self.badass_overrides
            .get(class.as_str())
            .copied()
            .unwrap_or(champion)
    }
}

fn key_set(keys: &[&str]) -> HashSet<String> {
    keys.iter().map(|k| (*k).to_string()).collect()
}

impl Default for ClassificationTables {
    fn default() -> Self {
        Self::from_lists(NEVER_ROLL, BEQUEATH_TO_CHILD, NEVER_DROP_REWARD, BADASS_OVERRIDES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_lookup() {
        let tables = ClassificationTables::default();
        assert!(tables.never_rolls(&"CharClass_Bloodwing".into()));
        assert!(tables.bequeaths(&"CharClass_BugMorph".into()));
        assert!(tables.never_drops_reward(&"CharClass_Scorpio".into()));
        assert!(!tables.never_rolls(&"CharClass_Skag".into()));
    }

    #[test]
    fn test_badass_override_wins_over_champion() {
        let tables = ClassificationTables::default();
        assert!(!tables.is_badass(&"CharClass_GateGuard".into(), true));
        assert!(tables.is_badass(&"CharClass_Juggernaut".into(), false));
    }

    #[test]
    fn test_badass_falls_back_to_champion() {
        let tables = ClassificationTables::default();
        let skag = Classification::from("CharClass_Skag");
        assert!(tables.is_badass(&skag, true));
        assert!(!tables.is_badass(&skag, false));
    }

    #[test]
    fn test_skeleton_king_bequeaths_without_reward() {
        let tables = ClassificationTables::default();
        let king = Classification::from("CharClass_Skeleton_King");
        assert!(tables.bequeaths(&king));
        assert!(tables.never_drops_reward(&king));
    }

    #[test]
    fn test_override_table_has_no_duplicates() {
        let keys: HashSet<&str> = BADASS_OVERRIDES.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys.len(), BADASS_OVERRIDES.len());
    }
}
