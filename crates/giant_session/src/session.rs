//! The session driver.
//!
//! [`GiantSession`] is the single owner of all mutable core state. The host
//! feeds it engine events and protocol messages, calls [`GiantSession::tick`]
//! once per frame, and drains [`GiantSession::drain_outbox`] onto its
//! transport. The session itself never performs I/O.
//!
//! Role-specific handlers live in `authority.rs` and `replica.rs`.

use giant_core::{ClassificationTables, EntityKey, GiantId};
use giant_net::{Outgoing, ReplicaId, SessionMessage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info};

use crate::binding::{EngineBinding, Role};
use crate::config::Tunables;
use crate::console::{CommandError, ConsoleCommand};
use crate::names::NameTable;
use crate::registry::PromotionRecord;
use crate::scheduler::{TaskKind, TaskStatus};
use crate::state::CoreState;

/// One process's view of the giant session.
#[derive(Debug)]
pub struct GiantSession {
    pub(crate) tunables: Tunables,
    pub(crate) tables: ClassificationTables,
    pub(crate) replica_id: ReplicaId,
    pub(crate) rng: StdRng,
    pub(crate) state: Option<CoreState>,
    pub(crate) outbox: Vec<Outgoing>,
}

impl GiantSession {
    /// Create a session seeded from OS entropy.
    #[must_use]
    pub fn new(tunables: Tunables) -> Self {
        Self::with_rng(tunables, StdRng::from_entropy())
    }

    /// Create a session with a deterministic roll sequence.
    #[must_use]
    pub fn with_seed(tunables: Tunables, seed: u64) -> Self {
        Self::with_rng(tunables, StdRng::seed_from_u64(seed))
    }

    fn with_rng(tunables: Tunables, rng: StdRng) -> Self {
        Self {
            tunables,
            tables: ClassificationTables::default(),
            replica_id: ReplicaId::generate(),
            rng,
            state: None,
            outbox: Vec::new(),
        }
    }

    /// Replace the classification tables.
    #[must_use]
    pub fn with_tables(mut self, tables: ClassificationTables) -> Self {
        self.tables = tables;
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    /// Current tunables.
    #[must_use]
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// This process's replica id, sent with state requests.
    #[must_use]
    pub fn replica_id(&self) -> &ReplicaId {
        &self.replica_id
    }

    /// The state for the current map, if one is loaded.
    #[must_use]
    pub fn state(&self) -> Option<&CoreState> {
        self.state.as_ref()
    }

    /// The installed name table, if a map is loaded.
    #[must_use]
    pub fn name_table(&self) -> Option<&NameTable> {
        self.state.as_ref().map(|s| s.names.table())
    }

    /// Authority: the record of `key`, if promoted.
    #[must_use]
    pub fn record(&self, key: EntityKey) -> Option<&PromotionRecord> {
        self.state.as_ref()?.registry.get(key)
    }

    /// Authority: promoted ids in ascending order.
    #[must_use]
    pub fn promoted_ids(&self) -> Vec<GiantId> {
        self.state
            .as_ref()
            .map(|s| s.registry.ids())
            .unwrap_or_default()
    }

    /// Replica: the last id list received from the authority.
    #[must_use]
    pub fn replica_ids(&self) -> Vec<GiantId> {
        self.state
            .as_ref()
            .map(|s| s.replica.ids().to_vec())
            .unwrap_or_default()
    }

    /// Takes every queued outgoing message.
    pub fn drain_outbox(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbox)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Rebuilds the state if the map or role changed. Returns the active role,
    /// or `None` while no map is loaded.
    pub(crate) fn sync_level<E: EngineBinding>(&mut self, engine: &mut E) -> Option<Role> {
        let session = engine.session();
        let Some(level) = session.level else {
            if self.state.take().is_some() {
                info!("map unloaded, giant state dropped");
            }
            return None;
        };

        if let Some(state) = &self.state
            && state.matches(level, session.role)
        {
            return Some(session.role);
        }

        info!(level = level.0, role = ?session.role, "map transition, giant state rebuilt");
        self.state = Some(CoreState::new(level, session.role));
        match session.role {
            Role::Authority => self.start_authority(engine),
            Role::Replica => self.schedule(TaskKind::Bootstrap),
        }
        Some(session.role)
    }

    /// Schedules `task` on the current state, if any.
    pub(crate) fn schedule(&mut self, task: TaskKind) {
        if let Some(state) = self.state.as_mut()
            && state.scheduler.schedule(task)
        {
            debug!(task = ?task, "task scheduled");
        }
    }

    /// Runs every task due this tick. Tasks that are not finished are
    /// scheduled again for the next tick.
    pub fn tick<E: EngineBinding>(&mut self, engine: &mut E) {
        if self.sync_level(engine).is_none() {
            return;
        }
        let due = match self.state.as_mut() {
            Some(state) => state.scheduler.take_due(),
            None => return,
        };

        for task in due {
            let status = match task {
                TaskKind::Bootstrap => self.bootstrap(engine),
                TaskKind::RefreshNames => self.refresh_names(engine),
                TaskKind::ApplyReplica => self.apply_replica(engine),
            };
            if status == TaskStatus::Continue {
                self.schedule(task);
            }
        }
    }

    // ── Engine events ───────────────────────────────────────────────────────

    /// A creature spawned, or the engine (re)applied its balance.
    pub fn on_creature_ready<E: EngineBinding>(&mut self, engine: &mut E, key: EntityKey) {
        match self.sync_level(engine) {
            Some(Role::Authority) => self.authority_creature_ready(engine, key),
            Some(Role::Replica) => self.replica_creature_changed(engine, key),
            None => {}
        }
    }

    /// `parent` produced `child` by transforming in place.
    pub fn on_child_spawned<E: EngineBinding>(
        &mut self,
        engine: &mut E,
        parent: EntityKey,
        child: EntityKey,
    ) {
        match self.sync_level(engine) {
            Some(Role::Authority) => self.authority_child_spawned(engine, parent, child),
            Some(Role::Replica) => self.replica_creature_changed(engine, child),
            None => {}
        }
    }

    /// A creature died.
    pub fn on_died<E: EngineBinding>(&mut self, engine: &mut E, key: EntityKey) {
        if self.sync_level(engine) == Some(Role::Authority) {
            self.authority_died(engine, key);
        }
    }

    /// A creature changed transformation state.
    pub fn on_transformed<E: EngineBinding>(&mut self, engine: &mut E, key: EntityKey) {
        match self.sync_level(engine) {
            Some(Role::Authority) => {
                if self.record(key).is_some() {
                    self.schedule(TaskKind::RefreshNames);
                }
            }
            Some(Role::Replica) => self.replica_creature_changed(engine, key),
            None => {}
        }
    }

    /// A creature levelled up. Unpromoted creatures get another roll on the
    /// authority.
    pub fn on_level_up<E: EngineBinding>(&mut self, engine: &mut E, key: EntityKey) {
        match self.sync_level(engine) {
            Some(Role::Authority) => self.authority_creature_ready(engine, key),
            Some(Role::Replica) => self.replica_creature_changed(engine, key),
            None => {}
        }
    }

    // ── Protocol ────────────────────────────────────────────────────────────

    /// Handles one protocol message addressed to this process.
    pub fn handle_message<E: EngineBinding>(&mut self, engine: &mut E, message: SessionMessage) {
        let role = self.sync_level(engine);
        match (role, message) {
            (Some(Role::Authority), SessionMessage::RequestCurrentState(request)) => {
                self.answer_request(request.replica);
            }
            (Some(Role::Replica), SessionMessage::PushVanillaSnapshot(snapshot)) => {
                self.receive_snapshot(engine, snapshot.names);
            }
            (Some(Role::Replica), SessionMessage::PushPromotedIds(push)) => {
                self.receive_ids(engine, push.ids);
            }
            (role, message) => {
                debug!(role = ?role, msg_type = message.msg_type(), "message ignored");
            }
        }
    }

    // ── Console ─────────────────────────────────────────────────────────────

    /// Runs one debug console line.
    ///
    /// Returns `Ok(None)` for lines that are not giant commands. A rejected
    /// command is logged and leaves the tunables untouched.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] if the command's argument is malformed.
    pub fn run_command(&mut self, line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
        let command = match ConsoleCommand::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(None),
            Err(e) => {
                error!(line, error = %e, "debug command rejected");
                return Err(e);
            }
        };

        command.apply(&mut self.tunables);
        if matches!(command, ConsoleCommand::SetPrefix(_)) {
            match self.state.as_ref().map(|s| s.role) {
                Some(Role::Authority) => self.schedule(TaskKind::RefreshNames),
                Some(Role::Replica) => self.schedule(TaskKind::ApplyReplica),
                None => {}
            }
        }
        Ok(Some(command))
    }
}
