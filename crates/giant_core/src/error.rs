//! Core error types.

/// Errors raised by identifier handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Every identifier in `1..=65535` is held by a live creature.
    #[error("giant identifier space exhausted ({in_use} in use)")]
    IdentifiersExhausted {
        /// Number of identifiers held when allocation failed.
        in_use: usize,
    },

    /// Zero was supplied where a giant identifier was expected.
    #[error("giant identifier must be non-zero")]
    ZeroIdentifier,
}
