//! Authority-side handlers: rolling, promotion, bequeathal, death rewards and
//! the name-table refresh that feeds replicas.

use std::collections::HashSet;

use giant_core::{EntityKey, GiantId, selection};
use giant_net::{
    Outgoing, PushPromotedIds, PushVanillaSnapshot, Recipient, ReplicaId, SessionMessage,
};
use tracing::{debug, info, warn};

use crate::binding::{CreatureInfo, EngineBinding, RewardPool};
use crate::config::GIANT_STAT_MULTIPLIER;
use crate::names::{self, Refresh, giant_name};
use crate::scheduler::{TaskKind, TaskStatus};
use crate::session::GiantSession;

impl GiantSession {
    /// Establishes the vanilla prefix for a freshly loaded map and pushes it
    /// to replicas before anything can be promoted.
    pub(crate) fn start_authority<E: EngineBinding>(&mut self, engine: &mut E) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.names.establish(engine.vanilla_names());
        engine.write_name_list(state.names.table().names());
        if let Some(names) = state.names.take_unpushed_vanilla() {
            info!(vanilla = names.len(), "pushing vanilla snapshot");
            self.outbox.push(Outgoing {
                to: Recipient::AllReplicas,
                message: SessionMessage::PushVanillaSnapshot(PushVanillaSnapshot::from_names(
                    names,
                )),
            });
        }
    }

    /// Rolls an unpromoted creature, or refreshes a promoted one.
    pub(crate) fn authority_creature_ready<E: EngineBinding>(
        &mut self,
        engine: &mut E,
        key: EntityKey,
    ) {
        let Some(info) = engine.creature(key) else {
            return;
        };
        let presentation = self.tunables.presentation();
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let Some(vanilla) = state.names.vanilla() else {
            return;
        };
        let first_promoted = vanilla.first_promoted_slot();
        let slot = vanilla.sanitize_slot(info.name_slot);

        if let Some(record) = state.registry.get_mut(key) {
            if (0..first_promoted).contains(&info.name_slot) {
                record.vanilla_slot = info.name_slot;
            }
            if info.balance_resolved && !record.balance_applied {
                record.balance_applied = true;
                engine.apply_presentation(key, &presentation);
                debug!(id = %record.id, key = %key, "giant presentation applied");
            }
            state.scheduler.schedule(TaskKind::RefreshNames);
            return;
        }
        if state.pending_promotions.contains_key(&key) {
            return;
        }

        if slot != info.name_slot {
            engine.set_name_slot(key, slot);
        }

        let badass = self.tables.is_badass(&info.classification, info.champion);
        let force = self.tunables.cheat_mode;
        if selection::decide(&self.tables, &info.classification, badass, force, &mut self.rng) {
            self.promote(engine, key, &info, slot);
        }
    }

    /// Promotes `key`. Returns the new id, or `None` if the creature was
    /// already promoted or no id was free.
    ///
    /// A creature that finds no free id is parked and retried on the next
    /// refresh.
    pub(crate) fn promote<E: EngineBinding>(
        &mut self,
        engine: &mut E,
        key: EntityKey,
        info: &CreatureInfo,
        vanilla_slot: i32,
    ) -> Option<GiantId> {
        let presentation = self.tunables.presentation();
        let state = self.state.as_mut()?;
        if state.registry.contains(key) {
            state.pending_promotions.remove(&key);
            return None;
        }

        let classification = info.classification.clone();
        let id = match state.registry.promote(key, classification, vanilla_slot) {
            Ok(record) => record.id,
            Err(e) => {
                if state.pending_promotions.insert(key, vanilla_slot).is_none() {
                    warn!(key = %key, error = %e, "creature not promoted this cycle");
                }
                state.scheduler.schedule(TaskKind::RefreshNames);
                return None;
            }
        };
        state.pending_promotions.remove(&key);

        engine.set_giant_id(key, Some(id));
        engine.apply_stat_multiplier(key, GIANT_STAT_MULTIPLIER);
        if info.balance_resolved {
            engine.apply_presentation(key, &presentation);
            if let Some(record) = state.registry.get_mut(key) {
                record.balance_applied = true;
            }
        }
        state.scheduler.schedule(TaskKind::RefreshNames);

        info!(id = %id, key = %key, class = %info.classification, "creature promoted");
        Some(id)
    }

    /// Retries every parked promotion whose creature is still live.
    fn retry_pending_promotions<E: EngineBinding>(
        &mut self,
        engine: &mut E,
        live: &HashSet<EntityKey>,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.pending_promotions.retain(|key, _| live.contains(key));
        let pending: Vec<(EntityKey, i32)> =
            state.pending_promotions.iter().map(|(&key, &slot)| (key, slot)).collect();
        for (key, vanilla_slot) in pending {
            if let Some(info) = engine.creature(key) {
                self.promote(engine, key, &info, vanilla_slot);
            }
        }
    }

    /// Hands a transforming giant's promotion to its child.
    pub(crate) fn authority_child_spawned<E: EngineBinding>(
        &mut self,
        engine: &mut E,
        parent: EntityKey,
        child: EntityKey,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let Some(record) = state.registry.get_mut(parent) else {
            return;
        };
        if !self.tables.bequeaths(&record.classification) {
            return;
        }
        record.should_drop_reward = false;
        let parent_id = record.id;

        let Some(info) = engine.creature(child) else {
            return;
        };
        let slot = state
            .names
            .vanilla()
            .map_or(names::NO_SLOT, |v| v.sanitize_slot(info.name_slot));

        if let Some(child_id) = self.promote(engine, child, &info, slot) {
            info!(parent = %parent_id, child = %child_id, "promotion bequeathed");
        }
    }

    /// Removes a dead giant and requests its reward.
    ///
    /// The engine reports deaths before it destroys the creature, so the id
    /// is cleared from the body before it goes back to the allocator.
    pub(crate) fn authority_died<E: EngineBinding>(&mut self, engine: &mut E, key: EntityKey) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.pending_promotions.remove(&key);
        let Some(record) = state.registry.remove(key) else {
            return;
        };
        engine.set_giant_id(key, None);
        engine.set_name_slot(key, record.vanilla_slot);

        let reward =
            record.should_drop_reward && !self.tables.never_drops_reward(&record.classification);
        if reward {
            engine.drop_reward(key, RewardPool::Giant);
        }
        info!(id = %record.id, key = %key, reward, "giant died");
        state.scheduler.schedule(TaskKind::RefreshNames);
    }

    /// Rebuilds the name table from the registry and pushes whatever changed.
    ///
    /// Continues while any giant could not be named yet.
    pub(crate) fn refresh_names<E: EngineBinding>(&mut self, engine: &mut E) -> TaskStatus {
        let presentation = self.tunables.presentation();
        let live: HashSet<EntityKey> = engine.live_creatures().collect();
        {
            let Some(state) = self.state.as_mut() else {
                return TaskStatus::Done;
            };
            for record in state.registry.prune(&live) {
                engine.set_giant_id(record.key, None);
                debug!(id = %record.id, key = %record.key, "giant vanished, record dropped");
            }
        }
        self.retry_pending_promotions(engine, &live);

        let prefix = self.tunables.name_prefix.as_str();
        let Some(state) = self.state.as_mut() else {
            return TaskStatus::Done;
        };
        let Some(vanilla) = state.names.vanilla().cloned() else {
            return TaskStatus::Done;
        };

        let unapplied: Vec<EntityKey> = state
            .registry
            .records()
            .filter(|r| !r.balance_applied)
            .map(|r| r.key)
            .collect();
        for key in unapplied {
            if engine.creature(key).is_some_and(|c| c.balance_resolved) {
                engine.apply_presentation(key, &presentation);
                if let Some(record) = state.registry.get_mut(key) {
                    record.balance_applied = true;
                }
            }
        }

        let entries: Vec<(GiantId, EntityKey, i32)> = state
            .registry
            .records()
            .map(|r| (r.id, r.key, r.vanilla_slot))
            .collect();
        let Refresh {
            table,
            placed,
            skipped,
        } = names::refresh(&vanilla, entries, |&(_, key, slot)| {
            let info = engine.creature(key)?;
            giant_name(&vanilla, &info, slot, prefix)
        });

        if state.names.install(table) {
            engine.write_name_list(state.names.table().names());
        }
        for &((_, key, _), slot) in &placed {
            engine.set_name_slot(key, slot);
        }

        if let Some(names) = state.names.take_unpushed_vanilla() {
            self.outbox.push(Outgoing {
                to: Recipient::AllReplicas,
                message: SessionMessage::PushVanillaSnapshot(PushVanillaSnapshot::from_names(
                    names,
                )),
            });
        }

        let ids: Vec<GiantId> = placed.iter().map(|&((id, _, _), _)| id).collect();
        if state.pushed_ids.as_ref() != Some(&ids) {
            info!(count = ids.len(), "pushing promoted ids");
            self.outbox.push(Outgoing {
                to: Recipient::AllReplicas,
                message: SessionMessage::PushPromotedIds(PushPromotedIds { ids: ids.clone() }),
            });
            state.pushed_ids = Some(ids);
        }

        if skipped.is_empty() && state.pending_promotions.is_empty() {
            TaskStatus::Done
        } else {
            debug!(
                awaiting_balance = skipped.len(),
                awaiting_id = state.pending_promotions.len(),
                "refresh continues"
            );
            TaskStatus::Continue
        }
    }

    /// Answers a replica's request with the vanilla snapshot, then the id list.
    pub(crate) fn answer_request(&mut self, replica: ReplicaId) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let names = state
            .names
            .vanilla()
            .map(|v| v.names().to_vec())
            .unwrap_or_default();
        let ids = state.pushed_ids.clone().unwrap_or_default();

        info!(replica = %replica, ids = ids.len(), "answering state request");
        self.outbox.push(Outgoing {
            to: Recipient::Replica(replica.clone()),
            message: SessionMessage::PushVanillaSnapshot(PushVanillaSnapshot::from_names(
                names,
            )),
        });
        self.outbox.push(Outgoing {
            to: Recipient::Replica(replica),
            message: SessionMessage::PushPromotedIds(PushPromotedIds { ids }),
        });
    }
}

#[cfg(test)]
mod tests {
    use giant_core::{Classification, ClassificationTables};

    use crate::binding::{LevelKey, Role};
    use crate::config::Tunables;
    use crate::sim::{SimCreature, SimEngine};

    use super::*;

    fn cheat() -> Tunables {
        Tunables {
            cheat_mode: true,
            ..Tunables::default()
        }
    }

    fn authority() -> SimEngine {
        let mut engine = SimEngine::new(Role::Authority);
        engine.load_level(LevelKey(1), vec!["Skag".to_string(), "Rat".to_string()]);
        engine
    }

    #[test]
    fn test_map_load_pushes_vanilla_snapshot() {
        let mut engine = authority();
        let mut session = GiantSession::with_seed(Tunables::default(), 1);
        session.tick(&mut engine);
        let out = session.drain_outbox();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, Recipient::AllReplicas);
        assert_eq!(
            out[0].message,
            SessionMessage::PushVanillaSnapshot(PushVanillaSnapshot::from_names(vec![
                "Skag".to_string(),
                "Rat".to_string()
            ]))
        );
    }

    #[test]
    fn test_cheat_promotes_with_stats() {
        let mut engine = authority();
        let mut session = GiantSession::with_seed(cheat(), 1);
        let key = engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
        session.on_creature_ready(&mut engine, key);

        let record = session.record(key).unwrap();
        assert!(record.should_drop_reward);
        assert!(record.balance_applied);
        assert_eq!(engine.giant_id(key), GiantId::new(1));
        let creature = engine.creature_state(key).unwrap();
        assert!((creature.stat_multiplier - GIANT_STAT_MULTIPLIER).abs() < f32::EPSILON);
    }

    #[test]
    fn test_never_roll_class_needs_force() {
        let mut engine = authority();
        let tables = ClassificationTables::from_lists(&["CharClass_Bloodwing"], &[], &[], &[]);
        let mut session = GiantSession::with_seed(Tunables::default(), 7).with_tables(tables);
        for _ in 0..300 {
            let key = engine.spawn(SimCreature::new("CharClass_Bloodwing").resolved());
            session.on_creature_ready(&mut engine, key);
        }
        assert!(session.promoted_ids().is_empty());
    }

    #[test]
    fn test_sanitizes_promoted_slot_on_ordinary_creature() {
        let mut engine = authority();
        let tables = ClassificationTables::from_lists(&["CharClass_Rat"], &[], &[], &[]);
        let mut session = GiantSession::with_seed(Tunables::default(), 3).with_tables(tables);
        let key = engine.spawn(SimCreature::new("CharClass_Rat").with_slot(2).resolved());
        session.on_creature_ready(&mut engine, key);
        assert_eq!(engine.creature_state(key).unwrap().name_slot, names::NO_SLOT);
    }

    #[test]
    fn test_bequeath_moves_reward_to_child() {
        let mut engine = authority();
        let tables = ClassificationTables::from_lists(&[], &["CharClass_BugMorph"], &[], &[]);
        let mut session = GiantSession::with_seed(cheat(), 1).with_tables(tables);
        let parent = engine.spawn(SimCreature::new("CharClass_BugMorph").resolved());
        session.on_creature_ready(&mut engine, parent);

        session.run_command("giantscheat").unwrap();
        let child = engine.spawn(SimCreature::new("CharClass_BugMorph_Adult").resolved());
        session.on_child_spawned(&mut engine, parent, child);

        assert!(!session.record(parent).unwrap().should_drop_reward);
        assert!(session.record(child).unwrap().should_drop_reward);

        engine.kill(parent);
        session.on_died(&mut engine, parent);
        assert!(engine.rewards().is_empty());
        engine.kill(child);
        session.on_died(&mut engine, child);
        assert_eq!(engine.rewards(), [(child, RewardPool::Giant)]);
    }

    #[test]
    fn test_non_bequeathing_parent_keeps_reward() {
        let mut engine = authority();
        let mut session =
            GiantSession::with_seed(cheat(), 1).with_tables(ClassificationTables::empty());
        let parent = engine.spawn(SimCreature::new("CharClass_Skag").resolved());
        session.on_creature_ready(&mut engine, parent);
        session.run_command("giantscheat").unwrap();
        let child = engine.spawn(SimCreature::new("CharClass_Skag").resolved());
        session.on_child_spawned(&mut engine, parent, child);
        assert!(session.record(parent).unwrap().should_drop_reward);
        assert!(session.record(child).is_none());
    }

    #[test]
    fn test_never_drop_class_has_no_reward() {
        let mut engine = authority();
        let tables = ClassificationTables::from_lists(&[], &[], &["CharClass_DeathTrap"], &[]);
        let mut session = GiantSession::with_seed(cheat(), 1).with_tables(tables);
        let class = Classification::from("CharClass_DeathTrap");
        let key = engine.spawn(SimCreature::new(class).resolved());
        session.on_creature_ready(&mut engine, key);
        engine.kill(key);
        session.on_died(&mut engine, key);
        assert!(engine.rewards().is_empty());
        assert!(session.record(key).is_none());
    }

    #[test]
    fn test_refresh_waits_for_balance() {
        let mut engine = authority();
        let mut session = GiantSession::with_seed(cheat(), 1);
        let key = engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0));
        session.on_creature_ready(&mut engine, key);
        session.tick(&mut engine);
        assert_eq!(engine.name_list(), ["Skag", "Rat"]);
        assert!(session.state().unwrap().scheduler.is_scheduled(TaskKind::RefreshNames));

        engine.resolve_balance(key);
        session.tick(&mut engine);
        assert_eq!(engine.name_list(), ["Skag", "Rat", "Giant Skag"]);
        assert_eq!(engine.creature_state(key).unwrap().name_slot, 2);
        assert!(engine.creature_state(key).unwrap().scale.x > 1.0);
    }

    #[test]
    fn test_vanished_giant_pruned_without_reward() {
        let mut engine = authority();
        let mut session = GiantSession::with_seed(cheat(), 1);
        let key = engine.spawn(SimCreature::new("CharClass_Skag").resolved());
        session.on_creature_ready(&mut engine, key);
        engine.kill(key);
        session.tick(&mut engine);
        assert!(session.promoted_ids().is_empty());
        assert!(engine.rewards().is_empty());
    }

    #[test]
    fn test_death_clears_id_before_body_is_removed() {
        let mut engine = authority();
        let mut session = GiantSession::with_seed(cheat(), 1);
        let dying = engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
        session.on_creature_ready(&mut engine, dying);
        session.tick(&mut engine);
        assert_eq!(engine.creature_state(dying).unwrap().name_slot, 2);

        // The engine reports the death while the body is still around.
        session.on_died(&mut engine, dying);
        assert_eq!(engine.giant_id(dying), None);
        assert_eq!(engine.creature_state(dying).unwrap().name_slot, 0);
        assert_eq!(engine.rewards(), [(dying, RewardPool::Giant)]);

        let next = engine.spawn(SimCreature::new("CharClass_Rat").with_slot(1).resolved());
        session.on_creature_ready(&mut engine, next);
        assert_eq!(engine.giant_id(next), GiantId::new(1));
        let holders: Vec<EntityKey> = engine
            .live_creatures()
            .filter(|&key| engine.giant_id(key) == GiantId::new(1))
            .collect();
        assert_eq!(holders, vec![next]);

        session.on_died(&mut engine, dying);
        assert_eq!(engine.rewards().len(), 1);
    }

    #[test]
    fn test_exhausted_roll_is_retried_after_id_frees() {
        let mut engine = authority();
        let mut session = GiantSession::with_seed(cheat(), 1);
        let mut giants = Vec::new();
        for _ in 0..u16::MAX {
            let key = engine.spawn(SimCreature::new("CharClass_Skag"));
            session.on_creature_ready(&mut engine, key);
            giants.push(key);
        }
        assert_eq!(session.promoted_ids().len(), usize::from(u16::MAX));

        let late = engine.spawn(SimCreature::new("CharClass_Rat"));
        session.on_creature_ready(&mut engine, late);
        assert!(session.record(late).is_none());
        assert!(session.state().unwrap().pending_promotions.contains_key(&late));

        session.tick(&mut engine);
        assert!(session.record(late).is_none());
        assert!(session.state().unwrap().scheduler.is_scheduled(TaskKind::RefreshNames));

        engine.kill(giants[41]);
        session.on_died(&mut engine, giants[41]);
        session.tick(&mut engine);

        assert_eq!(engine.giant_id(late), GiantId::new(42));
        assert!(session.record(late).is_some());
        assert!(session.state().unwrap().pending_promotions.is_empty());
    }

    #[test]
    fn test_parked_creature_that_vanishes_is_forgotten() {
        let mut engine = authority();
        let mut session = GiantSession::with_seed(cheat(), 1);
        for _ in 0..u16::MAX {
            let key = engine.spawn(SimCreature::new("CharClass_Skag"));
            session.on_creature_ready(&mut engine, key);
        }
        let late = engine.spawn(SimCreature::new("CharClass_Rat"));
        session.on_creature_ready(&mut engine, late);
        engine.kill(late);
        session.tick(&mut engine);
        assert!(session.state().unwrap().pending_promotions.is_empty());
    }

    #[test]
    fn test_level_up_rerolls_unpromoted() {
        let mut engine = authority();
        let mut session = GiantSession::with_seed(Tunables::default(), 1)
            .with_tables(ClassificationTables::from_lists(&["CharClass_Skag"], &[], &[], &[]));
        let key = engine.spawn(SimCreature::new("CharClass_Skag").resolved());
        session.on_creature_ready(&mut engine, key);
        assert!(session.record(key).is_none());

        session.run_command("giantscheat").unwrap();
        engine.level_up(key);
        session.on_level_up(&mut engine, key);
        assert!(session.record(key).is_some());
        assert_eq!(engine.grade(key), Some(1));
    }
}
