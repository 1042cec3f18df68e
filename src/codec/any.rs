//! Fallback codec for values without a known schema.
//!
//! Writes `flag, var_uint32 type id, payload`. Dispatch is a closed match over
//! the value kind:
//!
//! - null → flag only
//! - scalar / string / binary → built-in id + payload
//! - array / map → built-in id + elements, each written as any
//! - object with a registered tag → registered id + struct fields
//! - any other object → `NamedObject` id + tag + `(name, any)` pairs

use std::cell::RefCell;
use std::rc::Rc;

use super::field::FieldCodec;
use super::{ReadContext, Serializer, WriteContext};
use crate::error::{Result, WireError};
use crate::resolver::RefRead;
use crate::types::TypeId;
use crate::value::{Object, ObjectRef, Value};

/// Schema-less serializer; the default codec of the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySerializer;

impl Serializer for AnySerializer {
    fn fixed_size(&self) -> usize {
        // flag + type id + small payload
        11
    }

    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        write_any(ctx, value)
    }

    fn read(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Value> {
        read_any(ctx)
    }
}

fn builtin_id(value: &Value) -> Option<TypeId> {
    let id = match value {
        Value::Null | Value::Object(_) => return None,
        Value::Bool(_) => TypeId::Bool,
        Value::Int8(_) => TypeId::Int8,
        Value::Int16(_) => TypeId::Int16,
        Value::Int32(_) => TypeId::Int32,
        Value::Int64(_) => TypeId::Int64,
        Value::Float32(_) => TypeId::Float32,
        Value::Float64(_) => TypeId::Float64,
        Value::String(_) => TypeId::String,
        Value::Binary(_) => TypeId::Binary,
        Value::Array(_) => TypeId::Array,
        Value::Map(_) => TypeId::Map,
    };
    Some(id)
}

pub(crate) fn write_any(ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
    if !ctx.refs.write_ref_or_null(ctx.writer, value) {
        return Ok(());
    }
    if let Value::Object(object) = value {
        let registered = ctx.classes.find_codec(&object.borrow().tag);
        return match registered {
            Some(codec) => {
                ctx.writer.var_uint32(codec.type_id());
                codec.write_body(ctx, object)
            }
            None => write_named_object(ctx, object),
        };
    }
    let codec = builtin_id(value)
        .and_then(|id| FieldCodec::for_builtin(id).map(|codec| (id, codec)));
    match codec {
        Some((id, codec)) => {
            ctx.writer.var_uint32(id.as_u32());
            codec.write_payload(ctx, value)
        }
        None => Err(WireError::codec(format!(
            "no any-encoding for {}",
            value.kind()
        ))),
    }
}

fn write_named_object(ctx: &mut WriteContext<'_>, object: &ObjectRef) -> Result<()> {
    let object = object.borrow();
    ctx.writer.var_uint32(TypeId::NamedObject.as_u32());
    ctx.classes.write_tag(ctx.writer, &object.tag);
    ctx.writer.var_uint32(object.fields.len() as u32);
    for (name, value) in &object.fields {
        ctx.writer.string(name);
        write_any(ctx, value)?;
    }
    Ok(())
}

pub(crate) fn read_any(ctx: &mut ReadContext<'_, '_>) -> Result<Value> {
    let slot = match ctx.refs.read_ref_or_null(ctx.reader)? {
        RefRead::Null => return Ok(Value::Null),
        RefRead::Ref(value) => return Ok(value),
        RefRead::Value { slot } => slot,
    };
    let type_id = ctx.reader.var_uint32()?;
    match TypeId::from_u32(type_id) {
        Some(TypeId::NamedObject) => read_named_object(ctx, slot),
        Some(id) => match FieldCodec::for_builtin(id) {
            Some(codec) => codec.read_payload(ctx, slot),
            None => Err(WireError::UnknownTypeId(type_id)),
        },
        None => {
            let codec = ctx
                .classes
                .entry(type_id)?
                .codec()
                .cloned()
                .ok_or(WireError::UnknownTypeId(type_id))?;
            codec.read_body(ctx, slot)
        }
    }
}

fn read_named_object(ctx: &mut ReadContext<'_, '_>, slot: Option<u32>) -> Result<Value> {
    ctx.enter()?;
    let tag = ctx.classes.read_tag(ctx.reader)?;
    let count = ctx.reader.var_uint32()?;
    let object = Rc::new(RefCell::new(Object::new(tag)));
    let shell = Value::Object(object.clone());
    ctx.refs.fill(slot, &shell);
    for _ in 0..count {
        let name = ctx.read_string()?;
        let value = read_any(ctx)?;
        object.borrow_mut().fields.insert(name, value);
    }
    ctx.leave();
    Ok(shell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{BinaryReader, BinaryWriter};
    use crate::config::Config;
    use crate::resolver::{ClassResolver, ReferenceResolver};
    use bytes::Bytes;

    fn round_trip(value: &Value) -> (Bytes, Value) {
        let config = Config::default().with_ref_tracking(true);
        let mut classes = ClassResolver::new();
        let mut refs = ReferenceResolver::new(true);

        let mut writer = BinaryWriter::new();
        let mut ctx = WriteContext::new(&mut writer, &mut refs, &mut classes, &config);
        AnySerializer.write(&mut ctx, value).unwrap();
        let bytes = writer.dump();

        refs.reset();
        classes.reset();
        let mut reader = BinaryReader::new(&bytes);
        let mut ctx = ReadContext::new(&mut reader, &mut refs, &mut classes, &config);
        let decoded = AnySerializer.read(&mut ctx).unwrap();
        (bytes, decoded)
    }

    #[test]
    fn test_scalar_carries_type_id() {
        let (bytes, decoded) = round_trip(&Value::Int16(-2));
        assert_eq!(&bytes[..], &[0xFF, TypeId::Int16.as_u32() as u8, 0xFE, 0xFF]);
        assert_eq!(decoded, Value::Int16(-2));
    }

    #[test]
    fn test_every_builtin_kind() {
        let value = Value::array(vec![
            Value::Null,
            Value::Bool(true),
            Value::Int8(-1),
            Value::Int32(7),
            Value::Int64(i64::MAX),
            Value::Float32(0.5),
            Value::Float64(3.25),
            Value::from("text"),
            Value::Binary(Bytes::from_static(b"\xFF")),
            Value::map(vec![(Value::from("k"), Value::Int32(1))]),
        ]);
        let (_, decoded) = round_trip(&value);
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_unregistered_object_uses_tag() {
        let value = Value::array(vec![
            Value::object("example.a", [("x", Value::Int32(1))]),
            Value::object("example.a", [("x", Value::Int32(2))]),
        ]);
        let (bytes, decoded) = round_trip(&value);
        assert_eq!(decoded, value);
        // Tag bytes appear once, second occurrence is an index
        let needle = b"example.a";
        let hits = bytes.windows(needle.len()).filter(|w| w == needle).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_unknown_registered_id() {
        let config = Config::default();
        let mut classes = ClassResolver::new();
        let mut refs = ReferenceResolver::new(false);
        let bytes = [0xFFu8, 100];
        let mut reader = BinaryReader::new(&bytes);
        let mut ctx = ReadContext::new(&mut reader, &mut refs, &mut classes, &config);
        assert!(matches!(
            read_any(&mut ctx),
            Err(WireError::UnknownTypeId(100))
        ));
    }
}
