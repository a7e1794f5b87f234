//! Host tick loop.
//!
//! Each tick the host:
//!
//! 1. Advances its simulated map (authority) and forwards the resulting
//!    engine events to the session.
//! 2. Ticks the session so deferred work runs.
//! 3. Publishes whatever the session queued, plus the world mirror
//!    (authority only).
//!
//! Between ticks, incoming session messages, world mirrors and console lines
//! are handled as they arrive.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use giant_net::{NatsConnection, decode, decode_message, subjects};
use giant_session::{GiantSession, Role, SimEngine};
use tokio::io::AsyncBufReadExt;
use tracing::{debug, info, warn};

use crate::world::{ReplicaWorld, SimWorld, WorldEvent, WorldMirror};

/// Configuration for the host tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
    /// Where console changes to the tunables are saved.
    pub tunables_path: Option<PathBuf>,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 30.0,
            max_ticks: 0,
            tunables_path: None,
        }
    }
}

/// The simulated engine this process hosts.
#[derive(Debug)]
pub enum Peer {
    /// Runs the map and decides promotions.
    Authority(SimWorld),
    /// Mirrors the authority's map.
    Replica(ReplicaWorld),
}

impl Peer {
    fn role(&self) -> Role {
        match self {
            Self::Authority(_) => Role::Authority,
            Self::Replica(_) => Role::Replica,
        }
    }

    fn engine_mut(&mut self) -> &mut SimEngine {
        match self {
            Self::Authority(world) => world.engine_mut(),
            Self::Replica(world) => world.engine_mut(),
        }
    }
}

/// The host's tick loop state.
#[derive(Debug)]
pub struct TickLoop {
    tick_id: u64,
    config: TickConfig,
    session: GiantSession,
    peer: Peer,
}

/// Forwards engine events to the session.
fn dispatch(session: &mut GiantSession, engine: &mut SimEngine, events: Vec<WorldEvent>) {
    for event in events {
        match event {
            WorldEvent::Ready(key) => session.on_creature_ready(engine, key),
            WorldEvent::ChildSpawned { parent, child } => {
                session.on_child_spawned(engine, parent, child);
            }
            WorldEvent::Died(key) => session.on_died(engine, key),
            WorldEvent::LevelUp(key) => session.on_level_up(engine, key),
            WorldEvent::Transformed(key) => session.on_transformed(engine, key),
        }
    }
}

impl TickLoop {
    /// Create a tick loop for `peer`.
    #[must_use]
    pub fn new(config: TickConfig, session: GiantSession, peer: Peer) -> Self {
        Self {
            tick_id: 0,
            config,
            session,
            peer,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &GiantSession {
        &self.session
    }

    /// Run one tick locally. Returns the mirror to publish, if this is the
    /// authority.
    pub fn tick(&mut self) -> Option<WorldMirror> {
        self.tick_id += 1;
        match &mut self.peer {
            Peer::Authority(world) => {
                let events = world.step();
                debug!(tick_id = self.tick_id, events = events.len(), "tick start");
                dispatch(&mut self.session, world.engine_mut(), events);
                self.session.tick(world.engine_mut());
                Some(world.mirror())
            }
            Peer::Replica(world) => {
                self.session.tick(world.engine_mut());
                None
            }
        }
    }

    /// Handle one payload received on `subject`.
    pub fn receive(&mut self, subject: &str, payload: &[u8]) {
        if subject == subjects::SIM_WORLD {
            let Peer::Replica(world) = &mut self.peer else {
                return;
            };
            match decode::<WorldMirror>(payload) {
                Ok(mirror) => {
                    let events = world.apply(mirror);
                    dispatch(&mut self.session, world.engine_mut(), events);
                }
                Err(e) => warn!(subject, error = %e, "bad world mirror dropped"),
            }
            return;
        }

        match decode_message(payload) {
            Ok(message) => self.session.handle_message(self.peer.engine_mut(), message),
            Err(e) => warn!(subject, error = %e, "bad session message dropped"),
        }
    }

    /// Run one console line against the session, saving the tunables if it
    /// changed them.
    pub fn command(&mut self, line: &str) {
        let Ok(Some(_)) = self.session.run_command(line) else {
            return;
        };
        if let Some(path) = &self.config.tunables_path
            && let Err(e) = self.session.tunables().save(path)
        {
            warn!(path = %path.display(), error = %e, "tunables not saved");
        }
    }

    async fn flush(&mut self, conn: &NatsConnection) -> Result<()> {
        for outgoing in self.session.drain_outbox() {
            conn.send(&outgoing).await?;
        }
        Ok(())
    }

    /// Run the tick loop over NATS until `max_ticks` or Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick rate is not a usable positive number, or
    /// if subscribing or publishing fails.
    pub async fn run_async(&mut self, conn: &NatsConnection) -> Result<()> {
        let role = self.peer.role();
        let replica_id = self.session.replica_id().clone();

        let subscriptions = match role {
            Role::Authority => vec![conn.subscribe(subjects::SESSION_REQUEST).await?],
            Role::Replica => vec![
                conn.subscribe(subjects::SESSION_PUSH).await?,
                conn.subscribe(&subjects::session_push_to(&replica_id)).await?,
                conn.subscribe(subjects::SIM_WORLD).await?,
            ],
        };
        let mut inbox = futures::stream::select_all(subscriptions);

        let mut console = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        let mut console_open = true;

        let period = Duration::try_from_secs_f64(1.0 / self.config.tick_rate)?;
        anyhow::ensure!(!period.is_zero(), "tick rate {} is too high", self.config.tick_rate);
        let mut interval = tokio::time::interval(period);

        info!(
            role = ?role,
            replica = %replica_id,
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(mirror) = self.tick() {
                        conn.publish(subjects::SIM_WORLD, &mirror).await?;
                    }
                    self.flush(conn).await?;
                    if self.config.max_ticks > 0 && self.tick_id >= self.config.max_ticks {
                        info!(ticks = self.tick_id, "tick loop complete");
                        break;
                    }
                }
                Some(message) = inbox.next() => {
                    self.receive(message.subject.as_str(), &message.payload);
                    self.flush(conn).await?;
                }
                line = console.next_line(), if console_open => {
                    match line {
                        Ok(Some(line)) => self.command(&line),
                        Ok(None) | Err(_) => console_open = false,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!(ticks = self.tick_id, "interrupted");
                    break;
                }
            }
        }

        Ok(())
    }
}
