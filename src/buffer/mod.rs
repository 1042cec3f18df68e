//! Buffer module - cursor-addressed byte buffers for the wire format.
//!
//! - [`BinaryWriter`] - growable writer over `bytes::BytesMut` with a copying
//!   [`dump`](BinaryWriter::dump) and a zero-copy
//!   [`dump_and_own`](BinaryWriter::dump_and_own)
//! - [`VolatileBytes`] - the aliasing view returned by `dump_and_own`
//! - [`BinaryReader`] - bounds-checked cursor over a borrowed slice
//!
//! All multi-byte integers are Little Endian.
//!
//! # Example
//!
//! ```
//! use xlang_wire::buffer::{BinaryReader, BinaryWriter};
//!
//! let mut writer = BinaryWriter::new();
//! writer.reset().unwrap();
//! writer.u8(7);
//! writer.var_uint32(300);
//! let bytes = writer.dump();
//!
//! let mut reader = BinaryReader::new(&bytes);
//! assert_eq!(reader.u8().unwrap(), 7);
//! assert_eq!(reader.var_uint32().unwrap(), 300);
//! ```

mod reader;
mod writer;

pub use reader::BinaryReader;
pub use writer::{BinaryWriter, OwnershipToken, VolatileBytes};

/// String payload encoded as Latin-1 (one byte per char).
pub const STRING_LATIN1: u32 = 0;

/// String payload encoded as UTF-8.
pub const STRING_UTF8: u32 = 1;
