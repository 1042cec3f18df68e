//! Codecs that turn [`Value`] graphs into wire payloads and back.
//!
//! - [`AnySerializer`] - schema-less, every value carries its type id
//! - [`StructSerializer`] - compiled from an object [`TypeDescription`](crate::types::TypeDescription)
//!   via [`compile`]
//! - [`FieldCodec`] - per-field building block shared by both
//!
//! All codecs implement [`Serializer`] and run against a [`WriteContext`] or
//! [`ReadContext`] that carries the buffer and the per-call resolvers.

mod any;
mod compiler;
mod context;
mod field;
mod structs;

pub use any::AnySerializer;
pub use compiler::{compile, definitions};
pub use context::{ReadContext, WriteContext, MAX_READ_DEPTH};
pub use field::FieldCodec;
pub use structs::StructSerializer;

use crate::error::Result;
use crate::value::Value;

/// A compiled codec for one type.
pub trait Serializer {
    /// Bytes to pre-reserve before writing. A hint, not a limit.
    fn fixed_size(&self) -> usize;

    /// Write `value`, reference flag included.
    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()>;

    /// Read one value, reference flag included.
    fn read(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Value>;
}
