//! Codec for registered object types.

use std::cell::RefCell;
use std::rc::Rc;

use super::field::{mismatch, FieldCodec};
use super::{ReadContext, Serializer, WriteContext};
use crate::config::CodecInfo;
use crate::error::{Result, WireError};
use crate::resolver::RefRead;
use crate::types::FieldDescription;
use crate::value::{Object, ObjectRef, Value};

/// Compiled codec for one registered object type.
///
/// Wire layout: `flag, var_uint32 type id, fields...` with fields in
/// name-sorted order. The any-serializer writes the same bytes for a
/// registered object, so each can decode the other's output.
#[derive(Debug)]
pub struct StructSerializer {
    tag: String,
    type_id: u32,
    fields: Vec<(String, FieldCodec)>,
    fixed_size: usize,
}

impl StructSerializer {
    pub fn new(type_id: u32, tag: impl Into<String>, fields: &[FieldDescription]) -> Self {
        let mut fields: Vec<(String, FieldCodec)> = fields
            .iter()
            .map(|f| (f.name.clone(), FieldCodec::compile(&f.ty)))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let fixed_size = 1
            + var_uint32_len(type_id)
            + fields.iter().map(|(_, c)| c.fixed_size()).sum::<usize>();

        Self {
            tag: tag.into(),
            type_id,
            fields,
            fixed_size,
        }
    }

    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[inline]
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    /// Field names in wire order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn info(&self) -> CodecInfo {
        CodecInfo {
            tag: self.tag.clone(),
            type_id: self.type_id,
            fields: self.field_names().map(str::to_string).collect(),
            fixed_size: self.fixed_size,
        }
    }

    /// Write fields only. Missing fields are written as null; fields the
    /// schema does not declare are an error.
    pub(crate) fn write_body(&self, ctx: &mut WriteContext<'_>, object: &ObjectRef) -> Result<()> {
        let object = object.borrow();
        self.check_fields(&object)?;
        for (name, codec) in &self.fields {
            let value = object.fields.get(name).unwrap_or(&Value::Null);
            codec
                .write(ctx, value)
                .map_err(|e| in_field(&self.tag, name, e))?;
        }
        Ok(())
    }

    fn check_fields(&self, object: &Object) -> Result<()> {
        let unknown = object.fields.keys().find(|name| {
            self.fields
                .binary_search_by(|(declared, _)| declared.as_str().cmp(name.as_str()))
                .is_err()
        });
        match unknown {
            Some(name) => Err(WireError::codec(format!(
                "{}: unknown field `{name}`",
                self.tag
            ))),
            None => Ok(()),
        }
    }

    /// Read fields into a fresh object recorded in `slot` before any field.
    pub(crate) fn read_body(&self, ctx: &mut ReadContext<'_, '_>, slot: Option<u32>) -> Result<Value> {
        ctx.enter()?;
        let object = Rc::new(RefCell::new(Object::new(self.tag.clone())));
        let shell = Value::Object(object.clone());
        ctx.refs.fill(slot, &shell);
        for (name, codec) in &self.fields {
            let value = codec.read(ctx).map_err(|e| in_field(&self.tag, name, e))?;
            object.borrow_mut().fields.insert(name.clone(), value);
        }
        ctx.leave();
        Ok(shell)
    }
}

impl Serializer for StructSerializer {
    fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    fn write(&self, ctx: &mut WriteContext<'_>, value: &Value) -> Result<()> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => {
                ctx.refs.write_ref_or_null(ctx.writer, value);
                return Ok(());
            }
            other => return Err(mismatch(&format!("object `{}`", self.tag), other)),
        };
        if object.borrow().tag != self.tag {
            return Err(WireError::codec(format!(
                "expected object `{}`, found object `{}`",
                self.tag,
                object.borrow().tag
            )));
        }
        if !ctx.refs.write_ref_or_null(ctx.writer, value) {
            return Ok(());
        }
        ctx.writer.var_uint32(self.type_id);
        self.write_body(ctx, object)
    }

    fn read(&self, ctx: &mut ReadContext<'_, '_>) -> Result<Value> {
        match ctx.refs.read_ref_or_null(ctx.reader)? {
            RefRead::Null => Ok(Value::Null),
            RefRead::Ref(value) => Ok(value),
            RefRead::Value { slot } => {
                let type_id = ctx.reader.var_uint32()?;
                if type_id != self.type_id {
                    return Err(WireError::codec(format!(
                        "expected type id {} for `{}`, found {type_id}",
                        self.type_id, self.tag
                    )));
                }
                self.read_body(ctx, slot)
            }
        }
    }
}

/// Prefix codec errors with the field path; other kinds pass through.
fn in_field(tag: &str, name: &str, err: WireError) -> WireError {
    match err {
        WireError::Codec(msg) => WireError::Codec(format!("{tag}.{name}: {msg}")),
        other => other,
    }
}

fn var_uint32_len(v: u32) -> usize {
    match v {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}
