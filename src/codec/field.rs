//! Compiled per-field codecs.
//!
//! A [`FieldCodec`] is the compiled form of a [`TypeDescription`] used as a
//! field type. Typed fields write `flag + payload`; `Any` and `Object`
//! fields also carry the type id after the flag.

use std::cell::RefCell;
use std::rc::Rc;

use bytes::Bytes;

use super::any;
use super::{ReadContext, Serializer, WriteContext};
use crate::error::{Result, WireError};
use crate::resolver::RefRead;
use crate::types::{TypeDescription, TypeId};
use crate::value::Value;

/// Codec for one field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCodec {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Binary,
    Any,
    Array(Box<FieldCodec>),
    Map(Box<FieldCodec>, Box<FieldCodec>),
    /// Registered object type, resolved by tag when used.
    Object(String),
}

impl FieldCodec {
    pub fn compile(description: &TypeDescription) -> Self {
        match description {
            TypeDescription::Bool => FieldCodec::Bool,
            TypeDescription::Int8 => FieldCodec::Int8,
            TypeDescription::Int16 => FieldCodec::Int16,
            TypeDescription::Int32 => FieldCodec::Int32,
            TypeDescription::Int64 => FieldCodec::Int64,
            TypeDescription::Float32 => FieldCodec::Float32,
            TypeDescription::Float64 => FieldCodec::Float64,
            TypeDescription::String => FieldCodec::String,
            TypeDescription::Binary => FieldCodec::Binary,
            TypeDescription::Any => FieldCodec::Any,
            TypeDescription::Array { item } => FieldCodec::Array(Box::new(Self::compile(item))),
            TypeDescription::Map { key, value } => {
                FieldCodec::Map(Box::new(Self::compile(key)), Box::new(Self::compile(value)))
            }
            TypeDescription::Object { tag, .. } => FieldCodec::Object(tag.clone()),
        }
    }

    /// Codec used by the any-serializer for a built-in type id.
    pub(crate) fn for_builtin(id: TypeId) -> Option<Self> {
        let codec = match id {
            TypeId::Bool => FieldCodec::Bool,
            TypeId::Int8 => FieldCodec::Int8,
            TypeId::Int16 => FieldCodec::Int16,
            TypeId::Int32 => FieldCodec::Int32,
            TypeId::Int64 => FieldCodec::Int64,
            TypeId::Float32 => FieldCodec::Float32,
            TypeId::Float64 => FieldCodec::Float64,
            TypeId::String => FieldCodec::String,
            TypeId::Binary => FieldCodec::Binary,
            TypeId::Array => FieldCodec::Array(Box::new(FieldCodec::Any)),
            TypeId::Map => FieldCodec::Map(Box::new(FieldCodec::Any), Box::new(FieldCodec::Any)),
            TypeId::NamedObject => return None,
        };
        Some(codec)
    }

    /// Bytes to reserve for this field: flag plus the minimal payload.
    pub fn fixed_size(&self) -> usize {
        let payload = match self {
            FieldCodec::Bool | FieldCodec::Int8 => 1,
            FieldCodec::Int16 => 2,
            FieldCodec::Int32 | FieldCodec::Float32 => 4,
            FieldCodec::Int64 | FieldCodec::Float64 => 8,
            // length or type id header
            FieldCodec::String
            | FieldCodec::Binary
            | FieldCodec::Any
            | FieldCodec::Array(_)
            | FieldCodec::Map(..)
            | FieldCodec::Object(_) => 1,
        };
        1 + payload
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldCodec::Bool => "bool",
            FieldCodec::Int8 => "int8",
            FieldCodec::Int16 => "int16",
            FieldCodec::Int32 => "int32",
            FieldCodec::Int64 => "int64",
            FieldCodec::Float32 => "float32",
            FieldCodec::Float64 => "float64",
            FieldCodec::String => "string",
            FieldCodec::Binary => "binary",
            FieldCodec::Any => "any",
            FieldCodec::Array(_) => "array",
            FieldCodec::Map(..) => "map",
            FieldCodec::Object(_) => "object",
        }
    }

    /// Write a value of this field type, flag included.
    pub fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        match self {
            FieldCodec::Any => any::write_any(ctx, value),
            FieldCodec::Object(tag) => {
                let codec = ctx.classes.codec_for_tag(tag)?;
                codec.write(ctx, value)
            }
            _ => {
                if !value.is_null() {
                    self.check_kind(value)?;
                }
                if !ctx.refs.write_ref_or_null(ctx.writer, value) {
                    return Ok(());
                }
                self.write_payload(ctx, value)
            }
        }
    }

    fn check_kind(&self, value: &Value) -> Result<()> {
        let matches = matches!(
            (self, value),
            (FieldCodec::Bool, Value::Bool(_))
                | (FieldCodec::Int8, Value::Int8(_))
                | (FieldCodec::Int16, Value::Int16(_))
                | (FieldCodec::Int32, Value::Int32(_))
                | (FieldCodec::Int64, Value::Int64(_))
                | (FieldCodec::Float32, Value::Float32(_))
                | (FieldCodec::Float64, Value::Float64(_))
                | (FieldCodec::String, Value::String(_))
                | (FieldCodec::Binary, Value::Binary(_))
                | (FieldCodec::Array(_), Value::Array(_))
                | (FieldCodec::Map(..), Value::Map(_))
        );
        if matches {
            Ok(())
        } else {
            Err(mismatch(self.name(), value))
        }
    }

    /// Write the payload of a non-null value. The flag is already written.
    pub(crate) fn write_payload(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        match (self, value) {
            (FieldCodec::Bool, Value::Bool(v)) => ctx.writer.u8(u8::from(*v)),
            (FieldCodec::Int8, Value::Int8(v)) => ctx.writer.i8(*v),
            (FieldCodec::Int16, Value::Int16(v)) => ctx.writer.i16(*v),
            (FieldCodec::Int32, Value::Int32(v)) => ctx.writer.i32(*v),
            (FieldCodec::Int64, Value::Int64(v)) => ctx.writer.i64(*v),
            (FieldCodec::Float32, Value::Float32(v)) => ctx.writer.f32(*v),
            (FieldCodec::Float64, Value::Float64(v)) => ctx.writer.f64(*v),
            (FieldCodec::String, Value::String(s)) => ctx.writer.string(s),
            (FieldCodec::Binary, Value::Binary(b)) => {
                ctx.writer.var_uint32(b.len() as u32);
                ctx.writer.bytes(b);
            }
            (FieldCodec::Array(item), Value::Array(items)) => {
                let items = items.borrow();
                ctx.writer.var_uint32(items.len() as u32);
                for v in items.iter() {
                    item.write(ctx, v)?;
                }
            }
            (FieldCodec::Map(key, val), Value::Map(entries)) => {
                let entries = entries.borrow();
                ctx.writer.var_uint32(entries.len() as u32);
                for (k, v) in entries.iter() {
                    key.write(ctx, k)?;
                    val.write(ctx, v)?;
                }
            }
            (expected, found) => return Err(mismatch(expected.name(), found)),
        }
        Ok(())
    }

    /// Read a value of this field type, flag included.
    pub fn read(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Value> {
        match self {
            FieldCodec::Any => any::read_any(ctx),
            FieldCodec::Object(tag) => {
                let codec = ctx.classes.codec_for_tag(tag)?;
                codec.read(ctx)
            }
            _ => match ctx.refs.read_ref_or_null(ctx.reader)? {
                RefRead::Null => Ok(Value::Null),
                RefRead::Ref(value) => Ok(value),
                RefRead::Value { slot } => self.read_payload(ctx, slot),
            },
        }
    }

    /// Read the payload after the flag.
    ///
    /// Containers are recorded in `slot` before their children are read.
    pub(crate) fn read_payload(
        &self,
        ctx: &mut ReadContext<'_, '_>,
        slot: Option<u32>,
    ) -> Result<Value> {
        let value = match self {
            FieldCodec::Bool => Value::Bool(ctx.reader.u8()? != 0),
            FieldCodec::Int8 => Value::Int8(ctx.reader.i8()?),
            FieldCodec::Int16 => Value::Int16(ctx.reader.i16()?),
            FieldCodec::Int32 => Value::Int32(ctx.reader.i32()?),
            FieldCodec::Int64 => Value::Int64(ctx.reader.i64()?),
            FieldCodec::Float32 => Value::Float32(ctx.reader.f32()?),
            FieldCodec::Float64 => Value::Float64(ctx.reader.f64()?),
            FieldCodec::String => Value::String(ctx.read_string()?),
            FieldCodec::Binary => {
                let len = ctx.reader.var_uint32()? as usize;
                Value::Binary(Bytes::copy_from_slice(ctx.reader.bytes(len)?))
            }
            FieldCodec::Array(item) => {
                ctx.enter()?;
                let len = ctx.reader.var_uint32()? as usize;
                let items = Rc::new(RefCell::new(Vec::with_capacity(
                    len.min(ctx.reader.remaining()),
                )));
                let shell = Value::Array(items.clone());
                ctx.refs.fill(slot, &shell);
                for _ in 0..len {
                    let v = item.read(ctx)?;
                    items.borrow_mut().push(v);
                }
                ctx.leave();
                return Ok(shell);
            }
            FieldCodec::Map(key, val) => {
                ctx.enter()?;
                let len = ctx.reader.var_uint32()? as usize;
                let entries = Rc::new(RefCell::new(Vec::with_capacity(
                    len.min(ctx.reader.remaining()),
                )));
                let shell = Value::Map(entries.clone());
                ctx.refs.fill(slot, &shell);
                for _ in 0..len {
                    let k = key.read(ctx)?;
                    let v = val.read(ctx)?;
                    entries.borrow_mut().push((k, v));
                }
                ctx.leave();
                return Ok(shell);
            }
            FieldCodec::Any | FieldCodec::Object(_) => {
                return Err(WireError::codec(format!(
                    "{} payload has no fixed layout",
                    self.name()
                )))
            }
        };
        ctx.refs.fill(slot, &value);
        Ok(value)
    }
}

pub(crate) fn mismatch(expected: &str, found: &Value) -> WireError {
    WireError::codec(format!("expected {expected}, found {}", found.kind()))
}
