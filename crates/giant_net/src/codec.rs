//! MessagePack codec helpers.
//!
//! Thin wrappers around `rmp-serde`. Every session payload is MessagePack.

use serde::{Deserialize, Serialize};

use crate::error::NetError;
use crate::messages::SessionMessage;

/// Encode a value to MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, NetError> {
    rmp_serde::to_vec(value).map_err(NetError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, NetError> {
    rmp_serde::from_slice(bytes).map_err(NetError::Decode)
}

/// Decode a session message and check its internal consistency.
///
/// # Errors
///
/// Returns [`NetError::Decode`] on malformed bytes, or
/// [`NetError::SnapshotLength`] if a vanilla snapshot's length field does not
/// match its contents.
pub fn decode_message(bytes: &[u8]) -> Result<SessionMessage, NetError> {
    let message: SessionMessage = decode(bytes)?;
    if let SessionMessage::PushVanillaSnapshot(snapshot) = &message
        && snapshot.length as usize != snapshot.names.len()
    {
        return Err(NetError::SnapshotLength {
            declared: snapshot.length,
            actual: snapshot.names.len(),
        });
    }
    Ok(message)
}
