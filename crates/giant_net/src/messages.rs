//! Session messages exchanged between the authority and its replicas.
//!
//! There are exactly three logical messages. No display names ever cross the
//! wire: replicas rebuild them from the vanilla snapshot and the id list.

use giant_core::GiantId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one connected replica (one spectating viewer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReplicaId(pub String);

impl ReplicaId {
    /// Generate a fresh random replica id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where an outgoing message should be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// The single authority.
    Authority,
    /// Every connected replica.
    AllReplicas,
    /// One specific replica.
    Replica(ReplicaId),
}

// ── Replica → authority ─────────────────────────────────────────────────────

/// A replica asks for the full current state once its session is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCurrentState {
    /// The requesting replica, so the answer can go to it alone.
    pub replica: ReplicaId,
}

// ── Authority → replicas ────────────────────────────────────────────────────

/// The vanilla prefix of the name table for the current map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushVanillaSnapshot {
    /// Number of vanilla names (must equal `names.len()`).
    pub length: u32,
    /// The vanilla names, in slot order.
    pub names: Vec<String>,
}

impl PushVanillaSnapshot {
    /// Build a snapshot whose length matches its contents.
    #[must_use]
    pub fn from_names(names: Vec<String>) -> Self {
        Self {
            length: u32::try_from(names.len()).unwrap_or(u32::MAX),
            names,
        }
    }
}

/// The complete, ordered list of promoted creature ids.
///
/// Always the whole list, never a delta, so a replica that missed messages
/// resynchronises on the next push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPromotedIds {
    /// Promoted ids in name-table order.
    pub ids: Vec<GiantId>,
}

/// Any session message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionMessage {
    /// See [`RequestCurrentState`].
    RequestCurrentState(RequestCurrentState),
    /// See [`PushVanillaSnapshot`].
    PushVanillaSnapshot(PushVanillaSnapshot),
    /// See [`PushPromotedIds`].
    PushPromotedIds(PushPromotedIds),
}

impl SessionMessage {
    /// Short name of the message type, for logs.
    #[must_use]
    pub fn msg_type(&self) -> &'static str {
        match self {
            Self::RequestCurrentState(_) => "request_current_state",
            Self::PushVanillaSnapshot(_) => "push_vanilla_snapshot",
            Self::PushPromotedIds(_) => "push_promoted_ids",
        }
    }
}

/// A message paired with its destination, as queued by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    /// Who should receive the message.
    pub to: Recipient,
    /// The message itself.
    pub message: SessionMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_names_sets_length() {
        let snapshot = PushVanillaSnapshot::from_names(vec!["Skag".into(), "Rat".into()]);
        assert_eq!(snapshot.length, 2);
    }

    #[test]
    fn test_replica_ids_are_unique() {
        assert_ne!(ReplicaId::generate(), ReplicaId::generate());
    }

    #[test]
    fn test_request_roundtrip() {
        let msg = SessionMessage::RequestCurrentState(RequestCurrentState {
            replica: ReplicaId("viewer-1".to_string()),
        });
        let bytes = rmp_serde::to_vec(&msg).unwrap();
        let restored: SessionMessage = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored, msg);
        assert_eq!(restored.msg_type(), "request_current_state");
    }
}
