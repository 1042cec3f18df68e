//! Bounds-checked reader over a borrowed byte slice.

use super::STRING_UTF8;
use crate::error::{Result, WireError};

/// Cursor over an input slice.
///
/// Every read checks the remaining length and fails with
/// [`WireError::BufferUnderflow`] instead of panicking.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> BinaryReader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    /// Rewind over new input.
    pub fn reset(&mut self, buf: &'a [u8]) {
        self.buf = buf;
        self.cursor = 0;
    }

    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    /// Take the next `n` bytes and advance.
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(WireError::BufferUnderflow {
                needed: n,
                remaining,
            });
        }
        let start = self.cursor;
        self.cursor += n;
        Ok(&self.buf[start..start + n])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Advance the cursor without reading.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    #[inline]
    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    #[inline]
    pub fn i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    #[inline]
    pub fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    #[inline]
    pub fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    #[inline]
    pub fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    #[inline]
    pub fn f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    #[inline]
    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    /// Read an unsigned LEB128 varint (at most 5 bytes).
    pub fn var_uint32(&mut self) -> Result<u32> {
        let mut result: u32 = 0;
        for i in 0..5 {
            let byte = self.u8()?;
            result |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(WireError::codec("var_uint32 longer than 5 bytes"))
    }

    /// Borrow the next `n` bytes.
    #[inline]
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    /// Read a string written by [`BinaryWriter::string`](super::BinaryWriter::string).
    ///
    /// With `slice_ascii`, Latin-1 payloads that are pure ASCII are validated
    /// and copied straight from the input slice.
    pub fn string(&mut self, slice_ascii: bool) -> Result<String> {
        let header = self.var_uint32()?;
        let len = (header >> 1) as usize;
        let raw = self.take(len)?;
        if header & 1 == STRING_UTF8 {
            return String::from_utf8(raw.to_vec())
                .map_err(|e| WireError::codec(format!("invalid UTF-8 string: {e}")));
        }
        if slice_ascii && raw.is_ascii() {
            // ASCII is valid UTF-8
            return std::str::from_utf8(raw)
                .map(str::to_owned)
                .map_err(|e| WireError::codec(e.to_string()));
        }
        Ok(raw.iter().map(|&b| b as char).collect())
    }
}
