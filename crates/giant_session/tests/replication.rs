//! Authority and replica sessions talking through the wire codec.

use giant_core::{ClassificationTables, EntityKey, GiantId};
use giant_net::{
    PushPromotedIds, PushVanillaSnapshot, Recipient, SessionMessage, decode_message, encode,
};
use giant_session::{
    EngineBinding, GiantSession, LevelKey, RewardPool, Role, SimCreature, SimEngine, Tunables,
};

fn vanilla() -> Vec<String> {
    vec!["Skag".to_string(), "Rat".to_string()]
}

fn cheat() -> Tunables {
    Tunables {
        cheat_mode: true,
        ..Tunables::default()
    }
}

fn id(raw: u16) -> GiantId {
    GiantId::new(raw).unwrap()
}

/// Moves every queued message from `from` to `to` through the codec.
fn deliver(from: &mut GiantSession, to: &mut GiantSession, to_engine: &mut SimEngine) -> usize {
    let role = to_engine.session().role;
    let mut delivered = 0;
    for outgoing in from.drain_outbox() {
        let addressed = match (&outgoing.to, role) {
            (Recipient::Authority, Role::Authority) => true,
            (Recipient::AllReplicas, Role::Replica) => true,
            (Recipient::Replica(replica), Role::Replica) => replica == to.replica_id(),
            _ => false,
        };
        if !addressed {
            continue;
        }
        let bytes = encode(&outgoing.message).unwrap();
        let message = decode_message(&bytes).unwrap();
        to.handle_message(to_engine, message);
        delivered += 1;
    }
    delivered
}

/// Copies an authority creature, packed giant id included, to the replica.
fn mirror(authority: &SimEngine, replica: &mut SimEngine, key: EntityKey, vanilla_slot: i32) {
    let mut creature = authority.creature_state(key).unwrap().clone();
    creature.name_slot = vanilla_slot;
    creature.scale = glam::Vec3::ONE;
    creature.speed = 1.0;
    replica.insert(key, creature);
}

fn authority_engine() -> SimEngine {
    let mut engine = SimEngine::new(Role::Authority);
    engine.load_level(LevelKey(1), vanilla());
    engine
}

fn replica_engine() -> SimEngine {
    let mut engine = SimEngine::new(Role::Replica);
    engine.load_level(LevelKey(100), vec!["Local".to_string()]);
    engine.set_player_ready(true);
    engine
}

#[test]
fn test_single_giant_gets_first_promoted_slot() {
    let mut engine = authority_engine();
    let mut session = GiantSession::with_seed(cheat(), 1);

    let key = engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
    session.on_creature_ready(&mut engine, key);
    session.tick(&mut engine);

    assert_eq!(engine.name_list(), ["Skag", "Rat", "Giant Skag"]);
    assert_eq!(engine.creature_state(key).unwrap().name_slot, 2);
    assert_eq!(engine.displayed_name(key).as_deref(), Some("Giant Skag"));
}

#[test]
fn test_replica_waits_for_balance_then_names() {
    let mut engine = replica_engine();
    let mut session = GiantSession::with_seed(Tunables::default(), 1);

    session.handle_message(
        &mut engine,
        SessionMessage::PushVanillaSnapshot(PushVanillaSnapshot {
            length: 2,
            names: vanilla(),
        }),
    );
    let key = engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0));
    engine.set_giant_id(key, Some(id(7)));
    session.handle_message(
        &mut engine,
        SessionMessage::PushPromotedIds(PushPromotedIds { ids: vec![id(7)] }),
    );

    session.tick(&mut engine);
    assert_eq!(engine.name_list(), ["Skag", "Rat"]);
    let creature = engine.creature_state(key).unwrap();
    assert_eq!(creature.name_slot, 0);
    assert_eq!(creature.scale, glam::Vec3::ONE);

    engine.resolve_balance(key);
    session.tick(&mut engine);
    assert_eq!(engine.name_list(), ["Skag", "Rat", "Giant Skag"]);
    let creature = engine.creature_state(key).unwrap();
    assert_eq!(creature.name_slot, 2);
    assert!(creature.scale.x > 1.0);
}

#[test]
fn test_death_clears_replica_record() {
    let mut auth_engine = authority_engine();
    let mut authority = GiantSession::with_seed(cheat(), 1);
    let mut rep_engine = replica_engine();
    let mut replica = GiantSession::with_seed(Tunables::default(), 2);

    // The replica joins and asks for state.
    replica.tick(&mut rep_engine);
    authority.tick(&mut auth_engine);
    authority.drain_outbox();
    assert_eq!(deliver(&mut replica, &mut authority, &mut auth_engine), 1);
    assert_eq!(deliver(&mut authority, &mut replica, &mut rep_engine), 2);

    let a = auth_engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
    authority.on_creature_ready(&mut auth_engine, a);
    authority.tick(&mut auth_engine);
    assert_eq!(authority.promoted_ids(), vec![id(1)]);

    mirror(&auth_engine, &mut rep_engine, a, 0);
    replica.on_creature_ready(&mut rep_engine, a);
    deliver(&mut authority, &mut replica, &mut rep_engine);
    replica.tick(&mut rep_engine);
    assert_eq!(replica.replica_ids(), vec![id(1)]);
    assert_eq!(rep_engine.name_list(), ["Skag", "Rat", "Giant Skag"]);

    auth_engine.kill(a);
    authority.on_died(&mut auth_engine, a);
    authority.tick(&mut auth_engine);
    assert!(authority.promoted_ids().is_empty());
    assert_eq!(auth_engine.rewards().len(), 1);

    rep_engine.kill(a);
    deliver(&mut authority, &mut replica, &mut rep_engine);
    replica.tick(&mut rep_engine);
    assert!(replica.replica_ids().is_empty());
    assert!(replica.state().unwrap().replica.record(id(1)).is_none());
    assert_eq!(rep_engine.name_list(), ["Skag", "Rat"]);

    // A leftover creature still tagged with id 1 is not a giant any more.
    let stale = rep_engine.spawn(SimCreature::new("CharClass_Skag").resolved());
    rep_engine.set_giant_id(stale, Some(id(1)));
    replica.on_creature_ready(&mut rep_engine, stale);
    replica.tick(&mut rep_engine);
    assert_eq!(rep_engine.creature_state(stale).unwrap().scale, glam::Vec3::ONE);
    assert_eq!(rep_engine.name_list(), ["Skag", "Rat"]);
}

#[test]
fn test_late_joiner_gets_current_giants() {
    let mut auth_engine = authority_engine();
    let mut authority = GiantSession::with_seed(cheat(), 1);
    let first = auth_engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
    let second = auth_engine.spawn(SimCreature::new("CharClass_Rat").with_slot(1).resolved());
    authority.on_creature_ready(&mut auth_engine, first);
    authority.on_creature_ready(&mut auth_engine, second);
    authority.tick(&mut auth_engine);
    authority.drain_outbox();

    let mut rep_engine = replica_engine();
    let mut replica = GiantSession::with_seed(Tunables::default(), 2);
    mirror(&auth_engine, &mut rep_engine, second, 1);
    mirror(&auth_engine, &mut rep_engine, first, 0);

    replica.tick(&mut rep_engine);
    deliver(&mut replica, &mut authority, &mut auth_engine);
    deliver(&mut authority, &mut replica, &mut rep_engine);
    replica.tick(&mut rep_engine);

    assert_eq!(auth_engine.name_list(), rep_engine.name_list());
    assert_eq!(
        rep_engine.name_list(),
        ["Skag", "Rat", "Giant Skag", "Giant Rat"]
    );
    assert_eq!(rep_engine.creature_state(first).unwrap().name_slot, 2);
    assert_eq!(rep_engine.creature_state(second).unwrap().name_slot, 3);
}

#[test]
fn test_burst_of_promotions_pushes_once() {
    let mut engine = authority_engine();
    let mut session = GiantSession::with_seed(cheat(), 1);
    session.tick(&mut engine);
    session.drain_outbox();

    for _ in 0..3 {
        let key = engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
        session.on_creature_ready(&mut engine, key);
    }
    session.tick(&mut engine);
    let out = session.drain_outbox();
    assert_eq!(out.len(), 1);
    assert_eq!(
        out[0].message,
        SessionMessage::PushPromotedIds(PushPromotedIds {
            ids: vec![id(1), id(2), id(3)]
        })
    );

    session.tick(&mut engine);
    assert!(session.drain_outbox().is_empty());
}

#[test]
fn test_refresh_is_stable_across_ticks() {
    let mut engine = authority_engine();
    let mut session = GiantSession::with_seed(cheat(), 1);
    let key = engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
    session.on_creature_ready(&mut engine, key);
    session.tick(&mut engine);
    let before = engine.name_list().to_vec();

    session.on_transformed(&mut engine, key);
    session.tick(&mut engine);
    assert_eq!(engine.name_list(), before.as_slice());
    assert_eq!(engine.creature_state(key).unwrap().name_slot, 2);
}

#[test]
fn test_bequeathal_ignores_roll() {
    let mut engine = authority_engine();
    let tables = ClassificationTables::from_lists(
        &["CharClass_Larva"],
        &["CharClass_Pod"],
        &[],
        &[],
    );
    let mut session = GiantSession::with_seed(cheat(), 1).with_tables(tables);
    let parent = engine.spawn(SimCreature::new("CharClass_Pod").named("Pod").resolved());
    session.on_creature_ready(&mut engine, parent);
    session.run_command("giantscheat").unwrap();

    let child = engine.spawn(SimCreature::new("CharClass_Larva").named("Larva").resolved());
    session.on_child_spawned(&mut engine, parent, child);

    assert!(session.record(child).is_some());
    assert!(!session.record(parent).unwrap().should_drop_reward);
}

#[test]
fn test_bequeathed_child_reward_and_id_after_death() {
    let mut auth_engine = authority_engine();
    let tables = ClassificationTables::from_lists(
        &["CharClass_Larva"],
        &["CharClass_Pod"],
        &[],
        &[],
    );
    let mut authority = GiantSession::with_seed(cheat(), 1).with_tables(tables);
    let mut rep_engine = replica_engine();
    let mut replica = GiantSession::with_seed(Tunables::default(), 2);

    replica.tick(&mut rep_engine);
    authority.tick(&mut auth_engine);
    authority.drain_outbox();
    deliver(&mut replica, &mut authority, &mut auth_engine);
    deliver(&mut authority, &mut replica, &mut rep_engine);

    let parent = auth_engine.spawn(SimCreature::new("CharClass_Pod").with_slot(0).resolved());
    authority.on_creature_ready(&mut auth_engine, parent);
    authority.run_command("giantscheat").unwrap();
    assert!(!authority.tunables().cheat_mode);

    // The larva never rolls; only the pod's promotion can make it a giant.
    let child = auth_engine.spawn(SimCreature::new("CharClass_Larva").with_slot(1).resolved());
    authority.on_child_spawned(&mut auth_engine, parent, child);
    authority.on_died(&mut auth_engine, parent);
    auth_engine.kill(parent);
    authority.tick(&mut auth_engine);
    assert_eq!(authority.promoted_ids(), vec![id(2)]);
    assert!(auth_engine.rewards().is_empty());
    assert_eq!(auth_engine.name_list(), ["Skag", "Rat", "Giant Rat"]);

    mirror(&auth_engine, &mut rep_engine, child, 1);
    replica.on_creature_ready(&mut rep_engine, child);
    deliver(&mut authority, &mut replica, &mut rep_engine);
    replica.tick(&mut rep_engine);
    assert_eq!(rep_engine.name_list(), ["Skag", "Rat", "Giant Rat"]);
    assert_eq!(rep_engine.creature_state(child).unwrap().name_slot, 2);

    // Death is reported while the body is still in the world, twice.
    authority.on_died(&mut auth_engine, child);
    authority.on_died(&mut auth_engine, child);
    assert_eq!(auth_engine.rewards(), [(child, RewardPool::Giant)]);
    assert_eq!(auth_engine.giant_id(child), None);
    authority.tick(&mut auth_engine);

    mirror(&auth_engine, &mut rep_engine, child, 1);
    replica.on_creature_ready(&mut rep_engine, child);
    deliver(&mut authority, &mut replica, &mut rep_engine);
    replica.tick(&mut rep_engine);
    assert!(replica.replica_ids().is_empty());
    assert_eq!(rep_engine.name_list(), ["Skag", "Rat"]);
    assert_eq!(rep_engine.creature_state(child).unwrap().name_slot, 1);

    // A new giant takes the smallest free id; the body carries none.
    authority.run_command("giantscheat").unwrap();
    let next = auth_engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
    authority.on_creature_ready(&mut auth_engine, next);
    let holders: Vec<EntityKey> = auth_engine
        .live_creatures()
        .filter(|&key| auth_engine.giant_id(key) == Some(id(1)))
        .collect();
    assert_eq!(holders, vec![next]);
}

#[test]
fn test_freed_id_is_reused() {
    let mut engine = authority_engine();
    let mut session = GiantSession::with_seed(cheat(), 1);
    let keys: Vec<EntityKey> = (0..3)
        .map(|_| engine.spawn(SimCreature::new("CharClass_Skag").resolved()))
        .collect();
    for &key in &keys {
        session.on_creature_ready(&mut engine, key);
    }
    assert_eq!(engine.giant_id(keys[2]), Some(id(3)));

    engine.kill(keys[2]);
    session.on_died(&mut engine, keys[2]);
    let next = engine.spawn(SimCreature::new("CharClass_Skag").resolved());
    session.on_creature_ready(&mut engine, next);
    assert_eq!(engine.giant_id(next), Some(id(3)));
}

#[test]
fn test_map_transition_resets_state() {
    let mut engine = authority_engine();
    let mut session = GiantSession::with_seed(cheat(), 1);
    let key = engine.spawn(SimCreature::new("CharClass_Skag").with_slot(0).resolved());
    session.on_creature_ready(&mut engine, key);
    session.tick(&mut engine);
    session.drain_outbox();

    engine.load_level(LevelKey(2), vec!["Bandit".to_string()]);
    session.tick(&mut engine);
    assert!(session.promoted_ids().is_empty());
    assert_eq!(engine.name_list(), ["Bandit"]);
    let out = session.drain_outbox();
    assert_eq!(
        out[0].message,
        SessionMessage::PushVanillaSnapshot(PushVanillaSnapshot::from_names(vec![
            "Bandit".to_string()
        ]))
    );

    let fresh = engine.spawn(SimCreature::new("CharClass_Skag").resolved());
    session.on_creature_ready(&mut engine, fresh);
    assert_eq!(engine.giant_id(fresh), Some(id(1)));
}

#[test]
fn test_bad_commands_keep_tunables() {
    let mut session = GiantSession::with_seed(Tunables::default(), 1);
    assert!(session.run_command("giantsscale big").is_err());
    assert!(session.run_command("giantsprefix").is_err());
    assert_eq!(session.tunables(), &Tunables::default());
    assert!(session.run_command("noclip").unwrap().is_none());
}
