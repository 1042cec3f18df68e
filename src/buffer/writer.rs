//! Growable writer with an explicit ownership model for zero-copy output.
//!
//! The writer is reused across calls. Two ways to extract output:
//!
//! - [`BinaryWriter::dump`] copies the written bytes; the writer can be
//!   reset immediately.
//! - [`BinaryWriter::dump_and_own`] hands out a [`VolatileBytes`] that shares
//!   the writer's allocation. Until the view is released, [`BinaryWriter::reset`]
//!   fails with [`WireError::OwnershipViolation`].
//!
//! ```text
//! reset ─► write... ─► dump_and_own ─► [view outstanding] ─► release ─► reset
//!                                           │
//!                                           └─► reset ═► OwnershipViolation
//! ```

use std::cell::Cell;
use std::ops::Deref;
use std::rc::Rc;

use bytes::{BufMut, Bytes, BytesMut};

use super::{STRING_LATIN1, STRING_UTF8};
use crate::error::{Result, WireError};

/// Default initial capacity (4KB).
pub const DEFAULT_CAPACITY: usize = 4 * 1024;

/// Pending-release marker shared between a writer and its outstanding view.
///
/// `true` while the view is alive.
#[derive(Debug, Clone, Default)]
pub struct OwnershipToken(Rc<Cell<bool>>);

impl OwnershipToken {
    fn acquire() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    /// Whether the view bound to this token has not been released yet.
    #[inline]
    pub fn is_outstanding(&self) -> bool {
        self.0.get()
    }

    fn clear(&self) {
        self.0.set(false);
    }
}

/// Zero-copy view over the bytes of one volatile write.
///
/// Shares the allocation of the [`BinaryWriter`] that produced it. Call
/// [`release`](VolatileBytes::release) (or drop the view) before the writer
/// is used again.
#[derive(Debug)]
pub struct VolatileBytes {
    bytes: Bytes,
    token: OwnershipToken,
}

impl VolatileBytes {
    /// Borrow the view as `Bytes` (cheap clone, still aliasing).
    #[inline]
    pub fn as_bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Release the view and unlock the writer.
    pub fn release(self) {
        drop(self);
    }
}

impl Deref for VolatileBytes {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl AsRef<[u8]> for VolatileBytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for VolatileBytes {
    fn drop(&mut self) {
        self.token.clear();
    }
}

/// Cursor-addressed growable byte writer.
pub struct BinaryWriter {
    buf: BytesMut,
    /// Token of the last volatile view, if any.
    pending: Option<OwnershipToken>,
}

impl BinaryWriter {
    /// Create a writer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a writer with a custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            pending: None,
        }
    }

    /// Prepare the writer for a new frame.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::OwnershipViolation`] if a [`VolatileBytes`] from a
    /// previous [`dump_and_own`](Self::dump_and_own) is still alive.
    pub fn reset(&mut self) -> Result<()> {
        if self.has_outstanding_view() {
            return Err(WireError::OwnershipViolation);
        }
        self.pending = None;
        self.buf.clear();
        Ok(())
    }

    /// Whether a volatile view is still outstanding.
    #[inline]
    pub fn has_outstanding_view(&self) -> bool {
        self.pending
            .as_ref()
            .map_or(false, OwnershipToken::is_outstanding)
    }

    /// Current write position (also the logical length).
    #[inline]
    pub fn cursor(&self) -> usize {
        self.buf.len()
    }

    /// Grow capacity by at least `additional` bytes without advancing the cursor.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.buf.reserve(additional);
    }

    /// Advance the cursor by `n` zero bytes, leaving a gap to patch later.
    #[inline]
    pub fn skip(&mut self, n: usize) {
        self.buf.put_bytes(0, n);
    }

    /// Patch a previously written/skipped 4-byte field in place.
    ///
    /// # Panics
    ///
    /// Panics if `position + 4` is past the cursor.
    pub fn set_u32_position(&mut self, position: usize, value: u32) {
        debug_assert!(position + 4 <= self.buf.len());
        self.buf[position..position + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    pub fn u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn i8(&mut self, v: i8) {
        self.buf.put_i8(v);
    }

    #[inline]
    pub fn u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    #[inline]
    pub fn i16(&mut self, v: i16) {
        self.buf.put_i16_le(v);
    }

    #[inline]
    pub fn u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn i32(&mut self, v: i32) {
        self.buf.put_i32_le(v);
    }

    #[inline]
    pub fn u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    #[inline]
    pub fn i64(&mut self, v: i64) {
        self.buf.put_i64_le(v);
    }

    #[inline]
    pub fn f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    #[inline]
    pub fn f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    /// Write an unsigned LEB128 varint (1-5 bytes).
    pub fn var_uint32(&mut self, mut v: u32) {
        while v >= 0x80 {
            self.buf.put_u8((v as u8 & 0x7F) | 0x80);
            v >>= 7;
        }
        self.buf.put_u8(v as u8);
    }

    /// Write raw bytes.
    #[inline]
    pub fn bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Write a string with its length/encoding header.
    ///
    /// Strings whose chars all fit in one byte are written as Latin-1.
    pub fn string(&mut self, s: &str) {
        if s.chars().all(|c| (c as u32) <= 0xFF) {
            let len = s.chars().count() as u32;
            self.var_uint32((len << 1) | STRING_LATIN1);
            if s.is_ascii() {
                self.bytes(s.as_bytes());
            } else {
                for c in s.chars() {
                    self.buf.put_u8(c as u8);
                }
            }
        } else {
            self.var_uint32(((s.len() as u32) << 1) | STRING_UTF8);
            self.bytes(s.as_bytes());
        }
    }

    /// Bytes written since the last reset.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Copy the written bytes out. The writer is immediately reusable.
    pub fn dump(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }

    /// Hand out the written bytes without copying.
    ///
    /// The returned view shares this writer's allocation and locks the writer
    /// until it is released.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::OwnershipViolation`] if another view is outstanding.
    pub fn dump_and_own(&mut self) -> Result<VolatileBytes> {
        if self.has_outstanding_view() {
            return Err(WireError::OwnershipViolation);
        }
        let token = OwnershipToken::acquire();
        self.pending = Some(token.clone());
        // split() keeps the unused tail of the allocation in `buf`; once the
        // view is dropped, the next reserve can reclaim the whole buffer.
        let bytes = self.buf.split().freeze();
        Ok(VolatileBytes { bytes, token })
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_layout() {
        let mut writer = BinaryWriter::new();
        writer.u16(0x0102);
        writer.u32(0x03040506);
        writer.i64(-1);
        assert_eq!(&writer.as_slice()[..6], &[0x02, 0x01, 0x06, 0x05, 0x04, 0x03]);
        assert_eq!(&writer.as_slice()[6..], &[0xFF; 8]);
    }

    #[test]
    fn test_var_uint32_encoding() {
        let mut writer = BinaryWriter::new();
        writer.var_uint32(0);
        writer.var_uint32(127);
        writer.var_uint32(128);
        writer.var_uint32(u32::MAX);
        assert_eq!(
            writer.as_slice(),
            &[0x00, 0x7F, 0x80, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]
        );
    }

    #[test]
    fn test_skip_and_patch() {
        let mut writer = BinaryWriter::new();
        writer.u8(1);
        let pos = writer.cursor();
        writer.skip(4);
        writer.u8(2);
        writer.set_u32_position(pos, 0xAABBCCDD);
        assert_eq!(writer.as_slice(), &[1, 0xDD, 0xCC, 0xBB, 0xAA, 2]);
    }

    #[test]
    fn test_reserve_does_not_advance_cursor() {
        let mut writer = BinaryWriter::with_capacity(0);
        writer.reserve(1024);
        assert_eq!(writer.cursor(), 0);
        assert!(writer.buf.capacity() >= 1024);
    }

    #[test]
    fn test_string_latin1_and_utf8() {
        let mut writer = BinaryWriter::new();
        writer.string("hi");
        assert_eq!(writer.as_slice(), &[2 << 1, b'h', b'i']);

        writer.reset().unwrap();
        writer.string("é");
        assert_eq!(writer.as_slice(), &[1 << 1, 0xE9]);

        writer.reset().unwrap();
        writer.string("€");
        assert_eq!(writer.as_slice(), &[(3 << 1) | 1, 0xE2, 0x82, 0xAC]);
    }

    #[test]
    fn test_dump_is_independent_copy() {
        let mut writer = BinaryWriter::new();
        writer.reset().unwrap();
        writer.bytes(b"first");
        let first = writer.dump();

        writer.reset().unwrap();
        writer.bytes(b"second");

        assert_eq!(&first[..], b"first");
        assert_eq!(writer.as_slice(), b"second");
    }

    #[test]
    fn test_dump_and_own_aliases_allocation() {
        let mut writer = BinaryWriter::new();
        writer.reset().unwrap();
        writer.bytes(b"volatile");
        let view = writer.dump_and_own().unwrap();

        assert_eq!(&view[..], b"volatile");
        // The writer keeps the tail of the same allocation.
        assert_eq!(
            view.as_ptr() as usize + view.len(),
            writer.buf.as_ptr() as usize
        );
    }

    #[test]
    fn test_reset_fails_while_view_outstanding() {
        let mut writer = BinaryWriter::new();
        writer.reset().unwrap();
        writer.u8(1);
        let view = writer.dump_and_own().unwrap();

        assert!(writer.has_outstanding_view());
        assert!(matches!(writer.reset(), Err(WireError::OwnershipViolation)));
        assert!(matches!(
            writer.dump_and_own(),
            Err(WireError::OwnershipViolation)
        ));

        view.release();
        assert!(!writer.has_outstanding_view());
        assert!(writer.reset().is_ok());
    }

    #[test]
    fn test_dropping_view_releases() {
        let mut writer = BinaryWriter::new();
        writer.reset().unwrap();
        writer.u8(1);
        {
            let _view = writer.dump_and_own().unwrap();
        }
        assert!(writer.reset().is_ok());
    }

    #[test]
    fn test_view_survives_writer_reuse() {
        let mut writer = BinaryWriter::new();
        writer.reset().unwrap();
        writer.bytes(b"abc");
        let view = writer.dump_and_own().unwrap();
        let kept = view.as_bytes().clone();
        view.release();

        writer.reset().unwrap();
        writer.bytes(b"xyz");
        assert_eq!(&kept[..], b"abc");
    }
}
