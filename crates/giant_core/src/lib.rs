//! # giant_core
//!
//! Leaf types for the giant creature engine: who a creature is, which number
//! names it once promoted, and whether it gets promoted at all.
//!
//! This crate provides:
//!
//! - [`EntityKey`]: opaque key for an engine-owned creature.
//! - [`GiantId`] and [`IdAllocator`]: smallest-free identifier allocation.
//! - [`packing`]: carrying a [`GiantId`] inside a borrowed `i32` field.
//! - [`ClassificationTables`]: static never-roll, bequeath, never-drop and
//!   badass override tables.
//! - [`selection`]: the authority's promotion roll.

pub mod classification;
pub mod entity;
pub mod error;
pub mod packing;
pub mod selection;

pub use classification::{Classification, ClassificationTables};
pub use entity::{EntityKey, GiantId, IdAllocator, allocate_from};
pub use error::CoreError;
