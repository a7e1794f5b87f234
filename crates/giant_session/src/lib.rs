//! # giant_session
//!
//! The per-map giant session: who is promoted, what every giant is called,
//! and how replicas are kept in step with the authority.
//!
//! This crate provides:
//!
//! - [`binding`]: the [`EngineBinding`] trait the host engine implements.
//! - [`names`]: vanilla prefix, name resolution and table rebuilding.
//! - [`registry`]: authority promotion records and the replica id view.
//! - [`scheduler`]: coalescing next-tick tasks.
//! - [`session`]: [`GiantSession`], the driver the host ticks.
//! - [`config`] and [`console`]: tunables and the debug commands that edit them.
//! - [`sim`]: an in-memory engine for tests and the demo host.

mod authority;
pub mod binding;
pub mod config;
pub mod console;
pub mod names;
pub mod registry;
mod replica;
pub mod scheduler;
pub mod session;
pub mod sim;
pub mod state;

pub use binding::{
    CreatureInfo, EngineBinding, LevelKey, Mastery, NameSource, Presentation, RewardPool, Role,
    SessionInfo,
};
pub use config::{ConfigError, Tunables};
pub use console::{CommandError, ConsoleCommand};
pub use names::{NameTable, NameTableManager, VanillaNames};
pub use registry::{PromotionRecord, PromotionRegistry, ReplicaView};
pub use scheduler::{TaskKind, TaskScheduler, TaskStatus};
pub use session::GiantSession;
pub use sim::{SimCreature, SimEngine};
pub use state::CoreState;
