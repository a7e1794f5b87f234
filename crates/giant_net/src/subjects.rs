//! NATS subject hierarchy.
//!
//! All subjects are prefixed with `giants.` to namespace within a shared NATS
//! cluster.

use crate::messages::{Recipient, ReplicaId};

/// Replicas ask for current state. Replica → Authority.
pub const SESSION_REQUEST: &str = "giants.session.request";

/// Pushes to every replica. Authority → Replicas.
pub const SESSION_PUSH: &str = "giants.session.push";

/// Engine-level creature mirroring used by the demo host only.
pub const SIM_WORLD: &str = "giants.sim.world";

/// Build the subject for pushes addressed to one replica.
///
/// `giants.session.push.<replica>`
#[must_use]
pub fn session_push_to(replica: &ReplicaId) -> String {
    format!("giants.session.push.{replica}")
}

/// Resolve the subject an outgoing message is published on.
#[must_use]
pub fn for_recipient(to: &Recipient) -> String {
    match to {
        Recipient::Authority => SESSION_REQUEST.to_string(),
        Recipient::AllReplicas => SESSION_PUSH.to_string(),
        Recipient::Replica(replica) => session_push_to(replica),
    }
}
