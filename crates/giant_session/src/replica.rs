//! Replica-side handlers.
//!
//! A replica never rolls and never learns names over the wire. It keeps the
//! authority's vanilla snapshot and id list and rebuilds its own name table
//! from whatever creatures are locally visible, one position per id, so that
//! slot `vanilla_len + n` means the same giant on every peer.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use giant_core::{EntityKey, GiantId};
use giant_net::{Outgoing, Recipient, RequestCurrentState, SessionMessage};
use tracing::{debug, info};

use crate::binding::EngineBinding;
use crate::names::{NameTable, giant_name};
use crate::scheduler::{TaskKind, TaskStatus};
use crate::session::GiantSession;

impl GiantSession {
    /// Waits until the session is visible, then asks the authority for the
    /// current state.
    pub(crate) fn bootstrap<E: EngineBinding>(&mut self, engine: &mut E) -> TaskStatus {
        if !engine.session().player_ready {
            return TaskStatus::Continue;
        }
        info!(replica = %self.replica_id, "requesting current state");
        self.outbox.push(Outgoing {
            to: Recipient::Authority,
            message: SessionMessage::RequestCurrentState(RequestCurrentState {
                replica: self.replica_id.clone(),
            }),
        });
        TaskStatus::Done
    }

    /// Stores the authority's vanilla names verbatim.
    pub(crate) fn receive_snapshot<E: EngineBinding>(
        &mut self,
        engine: &mut E,
        names: Vec<String>,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        info!(vanilla = names.len(), "vanilla snapshot received");
        state.names.replace_vanilla(names);
        engine.write_name_list(state.names.table().names());
        state.scheduler.schedule(TaskKind::ApplyReplica);
    }

    /// Adopts a full id list from the authority.
    pub(crate) fn receive_ids<E: EngineBinding>(&mut self, engine: &mut E, ids: Vec<GiantId>) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        debug!(count = ids.len(), "promoted ids received");
        for (id, record) in state.replica.reconcile(ids) {
            debug!(id = %id, "giant no longer reported");
            if let Some(key) = record.key
                && engine.creature(key).is_some()
            {
                engine.set_name_slot(key, record.vanilla_slot);
            }
        }
        state.scheduler.schedule(TaskKind::ApplyReplica);
    }

    /// A creature appeared or changed on a replica. Known giants get a local
    /// rename; any other creature has its slot kept inside the vanilla prefix.
    pub(crate) fn replica_creature_changed<E: EngineBinding>(
        &mut self,
        engine: &mut E,
        key: EntityKey,
    ) {
        let Some(info) = engine.creature(key) else {
            return;
        };
        let Some(state) = self.state.as_mut() else {
            return;
        };

        if let Some(id) = engine.giant_id(key)
            && state.replica.contains(id)
        {
            state.scheduler.schedule(TaskKind::ApplyReplica);
            return;
        }

        if let Some(vanilla) = state.names.vanilla() {
            let slot = vanilla.sanitize_slot(info.name_slot);
            if slot != info.name_slot {
                engine.set_name_slot(key, slot);
            }
        }
    }

    /// Rebuilds the local name table from the id list.
    ///
    /// Continues while the snapshot is missing or a visible giant's balance is
    /// not resolved yet.
    pub(crate) fn apply_replica<E: EngineBinding>(&mut self, engine: &mut E) -> TaskStatus {
        let presentation = self.tunables.presentation();
        let prefix = self.tunables.name_prefix.as_str();
        let Some(state) = self.state.as_mut() else {
            return TaskStatus::Done;
        };
        let Some(vanilla) = state.names.vanilla().cloned() else {
            return TaskStatus::Continue;
        };

        // An id can briefly sit on two bodies until the authority's clear
        // replicates. The creature already bound to the id wins, then the
        // first one seen.
        let live: Vec<EntityKey> = engine.live_creatures().collect();
        let mut visible: HashMap<GiantId, EntityKey> = HashMap::new();
        for key in live {
            let Some(id) = engine.giant_id(key) else {
                continue;
            };
            if !state.replica.contains(id) {
                continue;
            }
            let bound = state.replica.record(id).and_then(|r| r.key);
            match visible.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(key);
                }
                Entry::Occupied(mut slot) => {
                    if bound == Some(key) {
                        slot.insert(key);
                    }
                }
            }
        }

        let ids = state.replica.ids().to_vec();
        let mut entries = Vec::with_capacity(ids.len());
        let mut pending = false;

        for (position, id) in ids.into_iter().enumerate() {
            let Some(&key) = visible.get(&id) else {
                entries.push(None);
                continue;
            };
            let Some(info) = engine.creature(key) else {
                entries.push(None);
                continue;
            };

            let record = state.replica.record_mut(id);
            if record.key != Some(key) {
                if !info.balance_resolved {
                    pending = true;
                    entries.push(None);
                    continue;
                }
                record.key = Some(key);
                record.vanilla_slot = vanilla.sanitize_slot(info.name_slot);
                engine.apply_presentation(key, &presentation);
                debug!(id = %id, key = %key, "giant presentation applied");
            }

            match giant_name(&vanilla, &info, record.vanilla_slot, prefix) {
                Some(name) => {
                    let slot = vanilla.promoted_slot(position);
                    if info.name_slot != slot {
                        engine.set_name_slot(key, slot);
                    }
                    entries.push(Some(name));
                }
                None => {
                    pending = true;
                    entries.push(None);
                }
            }
        }

        if state.names.install(NameTable::positional(&vanilla, entries)) {
            engine.write_name_list(state.names.table().names());
            debug!(giants = state.names.table().promoted_len(), "replica name table rebuilt");
        }

        if pending {
            TaskStatus::Continue
        } else {
            TaskStatus::Done
        }
    }
}
