//! Packing a giant identifier into a borrowed replicated `i32` field.
//!
//! Some hosts offer no side channel for per-creature data, so the identifier
//! rides in a numeric field the engine already replicates. The low 16 bits
//! hold the engine's own value offset by `32768`, the high 16 bits hold the
//! identifier (zero meaning "none"). Unpacking always yields exactly the
//! value the engine stored, whatever the identifier.
//!
//! Engine code that reads the field expects the plain value, so any call into
//! it must be bracketed with [`with_vanilla`].

use crate::entity::GiantId;

const VANILLA_OFFSET: i32 = 1 << 15;
const ID_SHIFT: u32 = 16;
const LOW_MASK: u32 = 0xFFFF;

/// Packs an engine value and an identifier into one field.
#[must_use]
pub fn pack(vanilla: i16, id: GiantId) -> i32 {
    repack(vanilla, Some(id))
}

/// Packs an engine value with no identifier attached.
#[must_use]
pub fn pack_vanilla(vanilla: i16) -> i32 {
    repack(vanilla, None)
}

/// Packs an engine value with an optional identifier.
#[must_use]
pub fn repack(vanilla: i16, id: Option<GiantId>) -> i32 {
    let low = (i32::from(vanilla) + VANILLA_OFFSET) as u32 & LOW_MASK;
    let high = u32::from(id.map_or(0, GiantId::get)) << ID_SHIFT;
    (high | low) as i32
}

/// Splits a packed field into the engine value and the identifier, if any.
#[must_use]
pub fn unpack(packed: i32) -> (i16, Option<GiantId>) {
    let bits = packed as u32;
    let vanilla = ((bits & LOW_MASK) as i32 - VANILLA_OFFSET) as i16;
    let id = GiantId::new((bits >> ID_SHIFT) as u16);
    (vanilla, id)
}

/// Runs `f` against the unpacked engine value, then re-packs it with the same
/// identifier.
pub fn with_vanilla<R>(field: &mut i32, f: impl FnOnce(&mut i16) -> R) -> R {
    let (mut vanilla, id) = unpack(*field);
    let out = f(&mut vanilla);
    *field = repack(vanilla, id);
    out
}
