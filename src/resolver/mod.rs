//! Resolver module - per-pass object identity and type id mapping.
//!
//! - [`ReferenceResolver`] - deduplicates shared instances and terminates cycles
//! - [`ClassResolver`] - maps type descriptions to on-wire type ids

mod class;
mod reference;

pub use class::{ClassResolver, TypeEntry, TypeKind};
pub use reference::{ref_flags, RefRead, ReferenceResolver};
