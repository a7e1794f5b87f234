//! Entity keys, giant identifiers and identifier allocation.
//!
//! An [`EntityKey`] is an opaque handle derived from an engine-owned creature.
//! The core never holds the creature itself, only this key, so a creature that
//! disappears without notice simply stops showing up in the engine's live set.
//!
//! A [`GiantId`] is the small integer that names a promoted creature on both
//! the authority and every replica. Identifiers are handed out from 1 upwards and
//! reused as soon as their owner is gone.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Opaque key for an engine-owned creature.
///
/// Unique while the creature is alive. Not meaningful across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey(pub u64);

impl EntityKey {
    /// Create a key from a raw engine handle.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw handle.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityKey({:#x})", self.0)
    }
}

/// Identifier of a promoted creature, shared between authority and replicas.
///
/// Always in `1..=65535`; zero is reserved for "no identifier".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct GiantId(u16);

impl GiantId {
    /// The smallest identifier ever handed out.
    pub const MIN: GiantId = GiantId(1);

    /// The largest identifier ever handed out.
    pub const MAX: GiantId = GiantId(u16::MAX);

    /// Create an identifier from a raw value. Returns `None` for zero.
    #[must_use]
    pub const fn new(raw: u16) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for GiantId {
    type Error = CoreError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(CoreError::ZeroIdentifier)
    }
}

impl From<GiantId> for u16 {
    fn from(id: GiantId) -> Self {
        id.0
    }
}

impl std::fmt::Display for GiantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the smallest identifier not present in `in_use`.
///
/// # Errors
///
/// Returns [`CoreError::IdentifiersExhausted`] when every identifier in
/// `1..=65535` is taken.
pub fn allocate_from(in_use: &BTreeSet<GiantId>) -> Result<GiantId, CoreError> {
    first_free(in_use, GiantId::MIN)
}

/// The smallest identifier not in `in_use`, assuming none below `floor` is free.
fn first_free(in_use: &BTreeSet<GiantId>, floor: GiantId) -> Result<GiantId, CoreError> {
    // The set is ordered, so the first gap in the sequence is the answer.
    let mut candidate = u32::from(floor.get());
    for id in in_use.range(floor..) {
        let raw = u32::from(id.get());
        if raw > candidate {
            break;
        }
        candidate = raw + 1;
    }

    u16::try_from(candidate)
        .ok()
        .and_then(GiantId::new)
        .ok_or(CoreError::IdentifiersExhausted {
            in_use: in_use.len(),
        })
}

/// Tracks identifiers held by live promoted creatures.
///
/// This allocator is owned by the authority's promotion registry and is torn
/// down with it on every map transition.
#[derive(Debug, Default)]
pub struct IdAllocator {
    in_use: BTreeSet<GiantId>,
    /// Every identifier below this one is held.
    floor: Option<GiantId>,
}

impl IdAllocator {
    /// Creates an allocator with no identifiers in use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the smallest free identifier and marks it in use.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdentifiersExhausted`] if no identifier is free.
    pub fn allocate(&mut self) -> Result<GiantId, CoreError> {
        let id = first_free(&self.in_use, self.floor.unwrap_or(GiantId::MIN))?;
        self.in_use.insert(id);
        self.floor = Some(id);
        Ok(id)
    }

    /// Returns an identifier to the pool. Returns `false` if it was not in use.
    pub fn release(&mut self, id: GiantId) -> bool {
        if !self.in_use.remove(&id) {
            return false;
        }
        self.floor = self.floor.map(|floor| floor.min(id));
        true
    }

    /// Returns `true` if the identifier is currently held.
    #[must_use]
    pub fn is_in_use(&self, id: GiantId) -> bool {
        self.in_use.contains(&id)
    }

    /// Returns the set of identifiers currently held.
    #[must_use]
    pub fn in_use(&self) -> &BTreeSet<GiantId> {
        &self.in_use
    }

    /// Returns the number of identifiers currently held.
    #[must_use]
    pub fn count(&self) -> usize {
        self.in_use.len()
    }
}
