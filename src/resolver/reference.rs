//! Reference tracking for one serialize or deserialize pass.
//!
//! Every value on the wire starts with a one-byte flag:
//!
//! | Flag             | Value | Followed by                  |
//! |------------------|-------|------------------------------|
//! | `NULL`           | -3    | nothing                      |
//! | `REF`            | -2    | var_uint32 reference id      |
//! | `NOT_NULL_VALUE` | -1    | payload (not tracked)        |
//! | `REF_VALUE`      | 0     | payload, assigned next id    |
//!
//! The write side keys instances by `Rc` pointer. The read side keeps an
//! index-addressed table: a slot is reserved as soon as `REF_VALUE` is read
//! and filled with the (still empty) container before its children are
//! decoded, so a back-reference to an ancestor resolves to the same instance.

use std::collections::HashMap;

use crate::buffer::{BinaryReader, BinaryWriter};
use crate::error::{Result, WireError};
use crate::value::Value;

/// Reference flag constants.
pub mod ref_flags {
    pub const NULL: i8 = -3;
    pub const REF: i8 = -2;
    pub const NOT_NULL_VALUE: i8 = -1;
    pub const REF_VALUE: i8 = 0;
}

/// Outcome of reading a reference flag.
#[derive(Debug)]
pub enum RefRead {
    /// Null sentinel.
    Null,
    /// Back-reference to an instance decoded earlier in this pass.
    Ref(Value),
    /// Payload follows. `slot` is set when the value must be recorded.
    Value { slot: Option<u32> },
}

/// Per-call identity table. Nothing survives [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    enabled: bool,
    /// Write side: instance identity → assigned id.
    written: HashMap<usize, u32>,
    /// Read side: id → instance, `None` while reserved.
    read: Vec<Option<Value>>,
}

impl ReferenceResolver {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drop all per-call state.
    pub fn reset(&mut self) {
        self.written.clear();
        self.read.clear();
    }

    /// Write the flag for `value`.
    ///
    /// Returns `true` if the caller must write the full payload, `false` if
    /// the flag (and back-reference id) already encodes the value.
    pub fn write_ref_or_null(&mut self, writer: &mut BinaryWriter, value: &Value) -> bool {
        if value.is_null() {
            writer.i8(ref_flags::NULL);
            return false;
        }
        let identity = match value.identity() {
            Some(identity) if self.enabled => identity,
            _ => {
                writer.i8(ref_flags::NOT_NULL_VALUE);
                return true;
            }
        };
        if let Some(&id) = self.written.get(&identity) {
            writer.i8(ref_flags::REF);
            writer.var_uint32(id);
            return false;
        }
        let id = self.written.len() as u32;
        self.written.insert(identity, id);
        writer.i8(ref_flags::REF_VALUE);
        true
    }

    /// Read a flag and resolve back-references.
    ///
    /// `REF_VALUE` is honoured even when tracking is disabled locally, so
    /// payloads from a tracking peer still decode.
    pub fn read_ref_or_null(&mut self, reader: &mut BinaryReader<'_>) -> Result<RefRead> {
        match reader.i8()? {
            ref_flags::NULL => Ok(RefRead::Null),
            ref_flags::REF => {
                let id = reader.var_uint32()?;
                Ok(RefRead::Ref(self.get(id)?))
            }
            ref_flags::NOT_NULL_VALUE => Ok(RefRead::Value { slot: None }),
            ref_flags::REF_VALUE => Ok(RefRead::Value {
                slot: Some(self.reserve()),
            }),
            other => Err(WireError::codec(format!("invalid reference flag {other}"))),
        }
    }

    /// Reserve the next id on the read side.
    pub fn reserve(&mut self) -> u32 {
        self.read.push(None);
        (self.read.len() - 1) as u32
    }

    /// Record the instance for a reserved slot. No-op for `None`.
    pub fn fill(&mut self, slot: Option<u32>, value: &Value) {
        if let Some(entry) = slot.and_then(|id| self.read.get_mut(id as usize)) {
            *entry = Some(value.clone());
        }
    }

    /// Instance recorded under `id`.
    pub fn get(&self, id: u32) -> Result<Value> {
        self.read
            .get(id as usize)
            .and_then(Option::clone)
            .ok_or(WireError::InvalidReference(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_flag() {
        let mut refs = ReferenceResolver::new(true);
        let mut writer = BinaryWriter::new();
        assert!(!refs.write_ref_or_null(&mut writer, &Value::Null));
        assert_eq!(writer.as_slice(), &[ref_flags::NULL as u8]);
    }

    #[test]
    fn test_scalars_are_never_tracked() {
        let mut refs = ReferenceResolver::new(true);
        let mut writer = BinaryWriter::new();
        assert!(refs.write_ref_or_null(&mut writer, &Value::Int32(1)));
        assert!(refs.write_ref_or_null(&mut writer, &Value::from("s")));
        assert_eq!(
            writer.as_slice(),
            &[ref_flags::NOT_NULL_VALUE as u8, ref_flags::NOT_NULL_VALUE as u8]
        );
    }

    #[test]
    fn test_shared_instance_written_once() {
        let mut refs = ReferenceResolver::new(true);
        let mut writer = BinaryWriter::new();
        let a = Value::array(vec![]);
        let b = Value::array(vec![]);

        assert!(refs.write_ref_or_null(&mut writer, &a));
        assert!(refs.write_ref_or_null(&mut writer, &b));
        assert!(!refs.write_ref_or_null(&mut writer, &a.clone()));
        assert!(!refs.write_ref_or_null(&mut writer, &b));

        assert_eq!(
            writer.as_slice(),
            &[0, 0, ref_flags::REF as u8, 0, ref_flags::REF as u8, 1]
        );
    }

    #[test]
    fn test_disabled_writes_everything() {
        let mut refs = ReferenceResolver::new(false);
        let mut writer = BinaryWriter::new();
        let a = Value::array(vec![]);
        assert!(refs.write_ref_or_null(&mut writer, &a));
        assert!(refs.write_ref_or_null(&mut writer, &a));
        assert_eq!(
            writer.as_slice(),
            &[ref_flags::NOT_NULL_VALUE as u8, ref_flags::NOT_NULL_VALUE as u8]
        );
    }

    #[test]
    fn test_reset_forgets_identities() {
        let mut refs = ReferenceResolver::new(true);
        let mut writer = BinaryWriter::new();
        let a = Value::array(vec![]);
        assert!(refs.write_ref_or_null(&mut writer, &a));
        refs.reset();
        assert!(refs.write_ref_or_null(&mut writer, &a));
    }

    #[test]
    fn test_read_resolves_reserved_slot() {
        let mut refs = ReferenceResolver::new(true);
        let bytes = [0u8, ref_flags::REF as u8, 0];
        let mut reader = BinaryReader::new(&bytes);

        let RefRead::Value { slot } = refs.read_ref_or_null(&mut reader).unwrap() else {
            panic!("expected payload");
        };
        assert_eq!(slot, Some(0));
        let shell = Value::array(vec![]);
        refs.fill(slot, &shell);

        match refs.read_ref_or_null(&mut reader).unwrap() {
            RefRead::Ref(v) => assert!(v.same_instance(&shell)),
            other => panic!("expected back-reference, got {other:?}"),
        }
    }

    #[test]
    fn test_unfilled_or_unknown_reference() {
        let mut refs = ReferenceResolver::new(true);
        refs.reserve();
        assert!(matches!(refs.get(0), Err(WireError::InvalidReference(0))));
        assert!(matches!(refs.get(7), Err(WireError::InvalidReference(7))));
    }

    #[test]
    fn test_invalid_flag() {
        let mut refs = ReferenceResolver::new(true);
        let bytes = [5u8];
        let mut reader = BinaryReader::new(&bytes);
        assert!(matches!(
            refs.read_ref_or_null(&mut reader),
            Err(WireError::Codec(_))
        ));
    }
}
