//! Network-layer error types.

/// Errors that can occur while encoding, decoding or moving session messages.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a message to MessagePack.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a message from MessagePack.
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// NATS subscription error.
    #[error("NATS subscribe error: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),

    /// NATS publish error.
    #[error("NATS publish error: {0}")]
    Publish(#[from] async_nats::PublishError),

    /// NATS connection error.
    #[error("NATS connection error: {0}")]
    Connect(#[from] async_nats::ConnectError),

    /// A vanilla snapshot whose declared length disagrees with its contents.
    #[error("vanilla snapshot declares {declared} names but carries {actual}")]
    SnapshotLength {
        /// Length announced by the sender.
        declared: u32,
        /// Number of names actually present.
        actual: usize,
    },
}
