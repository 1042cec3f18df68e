//! Frame header encoding and validation.
//!
//! Implements the 10-byte frame header:
//! ```text
//! ┌────────┬──────────┬───────────────────┬──────────────────┬─────────┐
//! │ Bitmap │ Language │ Native obj offset │ Native obj count │ Payload │
//! │ 1 byte │ 1 byte   │ 4 bytes uint32 LE │ 4 bytes uint32 LE│ ...     │
//! └────────┴──────────┴───────────────────┴──────────────────┴─────────┘
//! ```
//!
//! A null value is encoded as the bitmap byte alone.

use crate::buffer::{BinaryReader, BinaryWriter};
use crate::error::{ProtocolViolation, Result};

/// Header size in bytes for non-null frames.
pub const HEADER_SIZE: usize = 10;

/// Offset of the native-object section offset field.
pub const NATIVE_OFFSET_POSITION: usize = 2;

/// Bitmap flag constants.
pub mod flags {
    /// Value is the null sentinel; nothing follows the bitmap.
    pub const IS_NULL: u8 = 0b0000_0001;
    /// Multi-byte integers are Little Endian.
    pub const IS_LITTLE_ENDIAN: u8 = 0b0000_0010;
    /// Payload is decodable by other runtimes.
    pub const IS_CROSS_LANGUAGE: u8 = 0b0000_0100;
    /// Payload has out-of-band buffers attached.
    pub const IS_OUT_OF_BAND: u8 = 0b0000_1000;

    /// Bitmap written for every non-null frame: 0x06
    pub const DEFAULT: u8 = IS_LITTLE_ENDIAN | IS_CROSS_LANGUAGE;
    /// Bitmap written for a null frame: 0x07
    pub const NULL: u8 = DEFAULT | IS_NULL;

    /// Check if a specific flag is set.
    #[inline]
    pub fn has_flag(bitmap: u8, flag: u8) -> bool {
        bitmap & flag != 0
    }
}

/// Runtime that produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Xlang,
    Java,
    Python,
    Cpp,
    Go,
    Javascript,
    Rust,
    /// Tag not known to this runtime. Kept as-is; never rejected.
    Other(u8),
}

impl Language {
    pub fn as_u8(self) -> u8 {
        match self {
            Language::Xlang => 0,
            Language::Java => 1,
            Language::Python => 2,
            Language::Cpp => 3,
            Language::Go => 4,
            Language::Javascript => 5,
            Language::Rust => 6,
            Language::Other(tag) => tag,
        }
    }
}

impl From<u8> for Language {
    fn from(tag: u8) -> Self {
        match tag {
            0 => Language::Xlang,
            1 => Language::Java,
            2 => Language::Python,
            3 => Language::Cpp,
            4 => Language::Go,
            5 => Language::Javascript,
            6 => Language::Rust,
            other => Language::Other(other),
        }
    }
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Bitmap byte (see [`flags`]).
    pub bitmap: u8,
    /// Source runtime.
    pub language: Language,
    /// Position of the native-object section (end of payload).
    pub native_offset: u32,
    /// Number of native objects (always 0 from this engine).
    pub native_count: u32,
}

impl FrameHeader {
    #[inline]
    pub fn is_null(&self) -> bool {
        flags::has_flag(self.bitmap, flags::IS_NULL)
    }

    #[inline]
    pub fn is_little_endian(&self) -> bool {
        flags::has_flag(self.bitmap, flags::IS_LITTLE_ENDIAN)
    }

    #[inline]
    pub fn is_cross_language(&self) -> bool {
        flags::has_flag(self.bitmap, flags::IS_CROSS_LANGUAGE)
    }

    #[inline]
    pub fn is_out_of_band(&self) -> bool {
        flags::has_flag(self.bitmap, flags::IS_OUT_OF_BAND)
    }
}

/// Write the frame header.
///
/// Returns the position of the native-offset placeholder to patch once the
/// payload is written, or `None` for a null frame (bitmap only).
pub fn write_header(writer: &mut BinaryWriter, is_null: bool, language: Language) -> Option<usize> {
    if is_null {
        writer.u8(flags::NULL);
        return None;
    }
    writer.u8(flags::DEFAULT);
    writer.u8(language.as_u8());
    let placeholder = writer.cursor();
    writer.skip(4);
    // Native objects are never populated
    writer.u32(0);
    Some(placeholder)
}

/// Read and validate the frame header.
///
/// Returns `Ok(None)` for a null frame without consuming more than the
/// bitmap. Validation failures are reported before the payload is touched.
///
/// # Errors
///
/// - [`ProtocolViolation::BigEndian`] if the little-endian flag is clear
/// - [`ProtocolViolation::NotCrossLanguage`] if the cross-language flag is clear
/// - [`ProtocolViolation::OutOfBand`] if the out-of-band flag is set
pub fn read_header(reader: &mut BinaryReader<'_>) -> Result<Option<FrameHeader>> {
    let bitmap = reader.u8()?;
    if flags::has_flag(bitmap, flags::IS_NULL) {
        return Ok(None);
    }
    if !flags::has_flag(bitmap, flags::IS_LITTLE_ENDIAN) {
        return Err(ProtocolViolation::BigEndian.into());
    }
    if !flags::has_flag(bitmap, flags::IS_CROSS_LANGUAGE) {
        return Err(ProtocolViolation::NotCrossLanguage.into());
    }
    let language = Language::from(reader.u8()?);
    if flags::has_flag(bitmap, flags::IS_OUT_OF_BAND) {
        return Err(ProtocolViolation::OutOfBand.into());
    }
    let native_offset = reader.u32()?;
    let native_count = reader.u32()?;
    Ok(Some(FrameHeader {
        bitmap,
        language,
        native_offset,
        native_count,
    }))
}
