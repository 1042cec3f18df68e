//! The engine: framing, per-call state, and registration.

use std::collections::HashMap;
use std::rc::Rc;

use bytes::Bytes;

use crate::buffer::{BinaryReader, BinaryWriter, VolatileBytes};
use crate::codec::{
    compile, definitions, AnySerializer, ReadContext, Serializer, StructSerializer, WriteContext,
};
use crate::config::{Config, AFTER_CODEC_COMPILED};
use crate::error::{Result, WireError};
use crate::protocol::{read_header, write_header, Language};
use crate::resolver::{ClassResolver, ReferenceResolver};
use crate::schema::SchemaBundle;
use crate::types::TypeDescription;
use crate::value::Value;

/// Serialization engine.
///
/// Owns one writer, the reference resolver and the class resolver. Every call
/// resets the per-call state first, so an engine must not be shared between
/// interleaved call sequences.
///
/// # Example
///
/// ```
/// use xlang_wire::{Config, Engine, Value};
///
/// let mut engine = Engine::new(Config::default());
/// let value = Value::array(vec![Value::Int32(1), Value::from("two")]);
///
/// let bytes = engine.serialize(&value).unwrap();
/// assert_eq!(engine.deserialize(&bytes).unwrap(), value);
/// ```
pub struct Engine {
    config: Config,
    writer: BinaryWriter,
    refs: ReferenceResolver,
    classes: ClassResolver,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Self {
            refs: ReferenceResolver::new(config.ref_tracking),
            config,
            writer: BinaryWriter::new(),
            classes: ClassResolver::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Type table of this engine.
    #[inline]
    pub fn classes(&self) -> &ClassResolver {
        &self.classes
    }

    /// Compile and register an object description.
    ///
    /// Inline nested object definitions are registered too, parent first.
    /// Registering a description that is already registered returns the
    /// existing codec.
    ///
    /// # Errors
    ///
    /// - [`WireError::TagConflict`] if any contained tag is registered (or
    ///   defined twice) with a different description. Nothing is registered.
    /// - [`WireError::Codec`] if the description is not a registrable object.
    pub fn register_serializer(&mut self, description: &TypeDescription) -> Result<Registered> {
        description.validate_registrable()?;
        let defs = definitions(description);

        // Check every definition before touching the table
        let mut seen: HashMap<&str, &TypeDescription> = HashMap::new();
        for def in &defs {
            def.validate_registrable()?;
            let tag = def.tag().unwrap_or_default();
            if let Some(previous) = seen.insert(tag, *def) {
                if previous != *def {
                    return Err(WireError::TagConflict(tag.to_string()));
                }
            }
            if let Some(entry) = self.classes.entry_by_tag(tag) {
                if entry.description() != Some(*def) {
                    return Err(WireError::TagConflict(tag.to_string()));
                }
            }
        }

        for def in defs {
            let tag = def.tag().unwrap_or_default();
            if self.classes.entry_by_tag(tag).is_some() {
                tracing::trace!("Type {} already registered", tag);
                continue;
            }
            let codec = Rc::new(compile(self.classes.next_type_id(), def)?);
            let info = codec.info();
            self.classes.register(def.clone(), codec)?;
            tracing::debug!(
                "Registered type {} with id {} (fixed size {})",
                info.tag,
                info.type_id,
                info.fixed_size
            );
            self.config.hooks.fire(AFTER_CODEC_COMPILED, &info);
        }

        let codec = self
            .classes
            .codec_for_tag(description.tag().unwrap_or_default())?;
        Ok(Registered { codec })
    }

    /// Register every description of `bundle`, in order.
    pub fn register_bundle(&mut self, bundle: &SchemaBundle) -> Result<Vec<Registered>> {
        bundle
            .types
            .iter()
            .map(|description| self.register_serializer(description))
            .collect()
    }

    /// Registered descriptions in registration order.
    pub fn schema_bundle(&self) -> SchemaBundle {
        SchemaBundle::new(self.classes.registered_descriptions().cloned().collect())
    }

    /// Serialize with the any-serializer into an owned copy.
    pub fn serialize(&mut self, value: &Value) -> Result<Bytes> {
        self.serialize_with(value, &AnySerializer)
    }

    /// Serialize with `codec` into an owned copy. The writer is reusable
    /// as soon as this returns.
    pub fn serialize_with(&mut self, value: &Value, codec: &dyn Serializer) -> Result<Bytes> {
        self.write_frame(value, codec)?;
        Ok(self.writer.dump())
    }

    /// Serialize with the any-serializer into a zero-copy view.
    pub fn serialize_volatile(&mut self, value: &Value) -> Result<VolatileBytes> {
        self.serialize_volatile_with(value, &AnySerializer)
    }

    /// Serialize with `codec` into a view over the engine's buffer.
    ///
    /// The view must be released (or dropped) before the next write.
    ///
    /// # Errors
    ///
    /// [`WireError::OwnershipViolation`] if a previous view is still alive.
    pub fn serialize_volatile_with(
        &mut self,
        value: &Value,
        codec: &dyn Serializer,
    ) -> Result<VolatileBytes> {
        self.write_frame(value, codec)?;
        self.writer.dump_and_own()
    }

    /// Deserialize a frame written with the any-serializer.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<Value> {
        self.deserialize_with(bytes, &AnySerializer)
    }

    /// Deserialize a frame with `codec`. A null frame yields [`Value::Null`].
    ///
    /// # Errors
    ///
    /// [`WireError::Protocol`] if the header declares an unsupported mode,
    /// otherwise whatever the codec reports.
    pub fn deserialize_with(&mut self, bytes: &[u8], codec: &dyn Serializer) -> Result<Value> {
        self.refs.reset();
        self.classes.reset();
        let mut reader = BinaryReader::new(bytes);

        match read_header(&mut reader) {
            Ok(Some(_)) => {}
            Ok(None) => return Ok(Value::Null),
            Err(e) => {
                if let WireError::Protocol(violation) = &e {
                    tracing::warn!("Rejected frame header: {}", violation);
                }
                return Err(e);
            }
        }

        let mut ctx = ReadContext::new(&mut reader, &mut self.refs, &mut self.classes, &self.config);
        let value = codec.read(&mut ctx)?;
        tracing::trace!("Deserialized frame of {} bytes", reader.cursor());
        Ok(value)
    }

    fn write_frame(&mut self, value: &Value, codec: &dyn Serializer) -> Result<()> {
        if let Err(e) = self.writer.reset() {
            tracing::warn!("Write rejected: volatile view still outstanding");
            return Err(e);
        }
        self.refs.reset();
        self.classes.reset();

        let Some(placeholder) = write_header(&mut self.writer, value.is_null(), Language::Rust)
        else {
            return Ok(());
        };

        self.writer.reserve(codec.fixed_size());
        let mut ctx = WriteContext::new(
            &mut self.writer,
            &mut self.refs,
            &mut self.classes,
            &self.config,
        );
        codec.write(&mut ctx, value)?;

        let end = self.writer.cursor();
        self.writer.set_u32_position(placeholder, end as u32);
        tracing::trace!("Serialized frame of {} bytes", end);
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Handle to a registered codec.
///
/// Bound to the codec, not to the engine: pass the engine that registered it
/// (or a peer that replayed the same registrations).
#[derive(Clone)]
pub struct Registered {
    codec: Rc<StructSerializer>,
}

impl Registered {
    #[inline]
    pub fn type_id(&self) -> u32 {
        self.codec.type_id()
    }

    #[inline]
    pub fn tag(&self) -> &str {
        self.codec.tag()
    }

    #[inline]
    pub fn fixed_size(&self) -> usize {
        self.codec.fixed_size()
    }

    #[inline]
    pub fn serializer(&self) -> &StructSerializer {
        &self.codec
    }

    pub fn serialize(&self, engine: &mut Engine, value: &Value) -> Result<Bytes> {
        engine.serialize_with(value, self.codec.as_ref())
    }

    pub fn serialize_volatile(&self, engine: &mut Engine, value: &Value) -> Result<VolatileBytes> {
        engine.serialize_volatile_with(value, self.codec.as_ref())
    }

    pub fn deserialize(&self, engine: &mut Engine, bytes: &[u8]) -> Result<Value> {
        engine.deserialize_with(bytes, self.codec.as_ref())
    }
}

impl std::fmt::Debug for Registered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registered")
            .field("tag", &self.codec.tag())
            .field("type_id", &self.codec.type_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{flags, HEADER_SIZE};
    use crate::types::{FieldDescription, FIRST_USER_TYPE_ID};
    use std::cell::RefCell;

    fn point() -> TypeDescription {
        TypeDescription::object(
            "geo.point",
            vec![
                FieldDescription::new("x", TypeDescription::Float64),
                FieldDescription::new("y", TypeDescription::Float64),
            ],
        )
    }

    #[test]
    fn test_header_layout() {
        let mut engine = Engine::default();
        let bytes = engine.serialize(&Value::Bool(true)).unwrap();
        assert_eq!(bytes[0], flags::DEFAULT);
        assert_eq!(bytes[1], Language::Rust.as_u8());
        let offset = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        assert_eq!(offset as usize, bytes.len());
        assert_eq!(&bytes[6..10], &[0, 0, 0, 0]);
        assert_eq!(bytes.len(), HEADER_SIZE + 3);
    }

    #[test]
    fn test_null_frame_is_one_byte() {
        let mut engine = Engine::default();
        let bytes = engine.serialize(&Value::Null).unwrap();
        assert_eq!(&bytes[..], &[flags::NULL]);
        assert_eq!(engine.deserialize(&bytes).unwrap(), Value::Null);
    }

    #[test]
    fn test_register_nested_pre_order() {
        let mut engine = Engine::default();
        let line = TypeDescription::object(
            "geo.line",
            vec![
                FieldDescription::new("from", point()),
                FieldDescription::new("to", TypeDescription::object_ref("geo.point")),
            ],
        );
        let registered = engine.register_serializer(&line).unwrap();
        assert_eq!(registered.type_id(), FIRST_USER_TYPE_ID);
        assert_eq!(
            engine.classes().codec_for_tag("geo.point").unwrap().type_id(),
            FIRST_USER_TYPE_ID + 1
        );

        let p = |x: f64| Value::object("geo.point", [("x", Value::Float64(x)), ("y", Value::Float64(0.0))]);
        let value = Value::object("geo.line", [("from", p(1.0)), ("to", p(2.0))]);
        let bytes = registered.serialize(&mut engine, &value).unwrap();
        assert_eq!(registered.deserialize(&mut engine, &bytes).unwrap(), value);
    }

    #[test]
    fn test_register_twice_is_idempotent() {
        let mut engine = Engine::default();
        let a = engine.register_serializer(&point()).unwrap();
        let b = engine.register_serializer(&point()).unwrap();
        assert_eq!(a.type_id(), b.type_id());
        assert_eq!(a.fixed_size(), b.fixed_size());
        assert_eq!(engine.classes().registered_count(), 1);
    }

    #[test]
    fn test_conflict_registers_nothing() {
        let mut engine = Engine::default();
        let conflicting = TypeDescription::object(
            "geo.shape",
            vec![
                FieldDescription::new("a", point()),
                FieldDescription::new(
                    "b",
                    TypeDescription::object(
                        "geo.point",
                        vec![FieldDescription::new("z", TypeDescription::Int8)],
                    ),
                ),
            ],
        );
        assert!(matches!(
            engine.register_serializer(&conflicting),
            Err(WireError::TagConflict(tag)) if tag == "geo.point"
        ));
        assert_eq!(engine.classes().registered_count(), 0);
    }

    #[test]
    fn test_hook_fires_per_compiled_codec() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let config = Config::default().with_hook(AFTER_CODEC_COMPILED, move |info| {
            sink.borrow_mut().push((info.tag.clone(), info.type_id));
        });
        let mut engine = Engine::new(config);
        engine.register_serializer(&point()).unwrap();
        engine.register_serializer(&point()).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![("geo.point".to_string(), FIRST_USER_TYPE_ID)]
        );
    }

    #[test]
    fn test_ownership_violation_keeps_view_intact() {
        let mut engine = Engine::default();
        let view = engine.serialize_volatile(&Value::Int32(7)).unwrap();
        let snapshot = view.to_vec();
        assert!(matches!(
            engine.serialize(&Value::Int32(8)),
            Err(WireError::OwnershipViolation)
        ));
        assert_eq!(&view[..], &snapshot[..]);
        view.release();
        assert!(engine.serialize(&Value::Int32(8)).is_ok());
    }

    #[test]
    fn test_schema_bundle_in_registration_order() {
        let mut engine = Engine::default();
        engine.register_serializer(&point()).unwrap();
        engine
            .register_serializer(&TypeDescription::object("geo.origin", vec![]))
            .unwrap();
        let tags: Vec<_> = engine
            .schema_bundle()
            .types
            .iter()
            .filter_map(|d| d.tag().map(str::to_string))
            .collect();
        assert_eq!(tags, vec!["geo.point", "geo.origin"]);
    }
}
