//! # giant_net
//!
//! Wire layer for the giant replication session.
//!
//! This crate provides:
//!
//! - [`messages`]: the three session messages and their routing types.
//! - [`codec`]: MessagePack serialisation/deserialisation helpers.
//! - [`subjects`]: NATS subject constants and builders.
//! - [`connection`]: NATS connection management.
//! - [`error`]: Network-layer error types.

pub mod codec;
pub mod connection;
pub mod error;
pub mod messages;
pub mod subjects;

pub use codec::{decode, decode_message, encode};
pub use connection::NatsConnection;
pub use error::NetError;
pub use messages::{
    Outgoing, PushPromotedIds, PushVanillaSnapshot, Recipient, ReplicaId, RequestCurrentState,
    SessionMessage,
};
