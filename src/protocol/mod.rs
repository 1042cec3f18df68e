//! Protocol module - frame header and bitmap flags.
//!
//! Every frame starts with a bitmap byte. Non-null frames continue with a
//! language tag and two reserved 4-byte fields for a native-object section,
//! followed by the codec payload.

mod header;

pub use header::{
    flags, read_header, write_header, FrameHeader, Language, HEADER_SIZE, NATIVE_OFFSET_POSITION,
};
