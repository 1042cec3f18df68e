//! Type table mapping descriptions to on-wire type ids.
//!
//! Two layers:
//! - a persistent, append-only table of built-in and registered types that
//!   lives as long as the engine
//! - a per-call tag scratch, cleared by [`ClassResolver::reset`], that
//!   deduplicates tags of unregistered objects within one pass
//!
//! Registered ids are assigned in registration order starting at
//! [`FIRST_USER_TYPE_ID`]. Peers must register the same types in the same
//! order (see [`SchemaBundle`](crate::schema::SchemaBundle)).

use std::collections::HashMap;
use std::rc::Rc;

use crate::buffer::{BinaryReader, BinaryWriter};
use crate::codec::StructSerializer;
use crate::error::{Result, WireError};
use crate::types::{TypeDescription, TypeId, FIRST_USER_TYPE_ID};

/// What an id in the table stands for.
#[derive(Clone)]
pub enum TypeKind {
    Builtin(TypeId),
    Registered {
        description: TypeDescription,
        codec: Rc<StructSerializer>,
    },
}

/// One row of the type table.
#[derive(Clone)]
pub struct TypeEntry {
    pub id: u32,
    pub name: String,
    pub kind: TypeKind,
}

impl TypeEntry {
    pub fn codec(&self) -> Option<&Rc<StructSerializer>> {
        match &self.kind {
            TypeKind::Registered { codec, .. } => Some(codec),
            TypeKind::Builtin(_) => None,
        }
    }

    pub fn description(&self) -> Option<&TypeDescription> {
        match &self.kind {
            TypeKind::Registered { description, .. } => Some(description),
            TypeKind::Builtin(_) => None,
        }
    }
}

/// Tags seen during one pass.
#[derive(Debug, Default)]
struct TagScratch {
    written: HashMap<String, u32>,
    read: Vec<String>,
}

impl TagScratch {
    fn clear(&mut self) {
        self.written.clear();
        self.read.clear();
    }
}

/// Type table plus per-call tag scratch.
pub struct ClassResolver {
    entries: Vec<TypeEntry>,
    by_id: HashMap<u32, usize>,
    by_tag: HashMap<String, usize>,
    next_user_id: u32,
    scratch: TagScratch,
}

impl ClassResolver {
    /// Create a table seeded with the built-in types.
    pub fn new() -> Self {
        let mut resolver = Self {
            entries: Vec::new(),
            by_id: HashMap::new(),
            by_tag: HashMap::new(),
            next_user_id: FIRST_USER_TYPE_ID,
            scratch: TagScratch::default(),
        };
        for id in TypeId::ALL {
            resolver.push(TypeEntry {
                id: id.as_u32(),
                name: id.name().to_string(),
                kind: TypeKind::Builtin(id),
            });
        }
        resolver
    }

    fn push(&mut self, entry: TypeEntry) -> u32 {
        let id = entry.id;
        self.by_id.insert(id, self.entries.len());
        self.entries.push(entry);
        id
    }

    /// Clear per-call state. The type table is untouched.
    pub fn reset(&mut self) {
        self.scratch.clear();
    }

    /// Id the next registration will receive.
    #[inline]
    pub fn next_type_id(&self) -> u32 {
        self.next_user_id
    }

    /// Add a compiled codec under its tag.
    ///
    /// # Errors
    ///
    /// [`WireError::TagConflict`] if the tag is taken, or a codec error if the
    /// codec was compiled for a different id than [`next_type_id`](Self::next_type_id).
    pub fn register(
        &mut self,
        description: TypeDescription,
        codec: Rc<StructSerializer>,
    ) -> Result<u32> {
        let tag = codec.tag().to_string();
        if self.by_tag.contains_key(&tag) {
            return Err(WireError::TagConflict(tag));
        }
        if codec.type_id() != self.next_user_id {
            return Err(WireError::codec(format!(
                "codec for `{tag}` compiled with id {}, expected {}",
                codec.type_id(),
                self.next_user_id
            )));
        }
        self.next_user_id += 1;
        self.by_tag.insert(tag.clone(), self.entries.len());
        Ok(self.push(TypeEntry {
            id: codec.type_id(),
            name: tag,
            kind: TypeKind::Registered { description, codec },
        }))
    }

    pub fn entry(&self, id: u32) -> Result<&TypeEntry> {
        self.by_id
            .get(&id)
            .map(|&idx| &self.entries[idx])
            .ok_or(WireError::UnknownTypeId(id))
    }

    pub fn entry_by_tag(&self, tag: &str) -> Option<&TypeEntry> {
        self.by_tag.get(tag).map(|&idx| &self.entries[idx])
    }

    /// Codec registered under `tag`, if any.
    pub fn find_codec(&self, tag: &str) -> Option<Rc<StructSerializer>> {
        self.entry_by_tag(tag).and_then(TypeEntry::codec).cloned()
    }

    /// Codec registered under `tag`.
    pub fn codec_for_tag(&self, tag: &str) -> Result<Rc<StructSerializer>> {
        self.find_codec(tag)
            .ok_or_else(|| WireError::UnknownTag(tag.to_string()))
    }

    /// Registered descriptions in registration order.
    pub fn registered_descriptions(&self) -> impl Iterator<Item = &TypeDescription> {
        self.entries.iter().filter_map(TypeEntry::description)
    }

    /// Number of registered (non built-in) types.
    pub fn registered_count(&self) -> usize {
        (self.next_user_id - FIRST_USER_TYPE_ID) as usize
    }

    /// Write a tag, or a back-reference if it was already written this pass.
    ///
    /// `var_uint32(len << 1)` + UTF-8 bytes, or `var_uint32((index << 1) | 1)`.
    pub fn write_tag(&mut self, writer: &mut BinaryWriter, tag: &str) {
        if let Some(&index) = self.scratch.written.get(tag) {
            writer.var_uint32((index << 1) | 1);
            return;
        }
        let index = self.scratch.written.len() as u32;
        self.scratch.written.insert(tag.to_string(), index);
        writer.var_uint32((tag.len() as u32) << 1);
        writer.bytes(tag.as_bytes());
    }

    /// Read a tag written by [`write_tag`](Self::write_tag).
    pub fn read_tag(&mut self, reader: &mut BinaryReader<'_>) -> Result<String> {
        let header = reader.var_uint32()?;
        if header & 1 == 1 {
            let index = header >> 1;
            return self
                .scratch
                .read
                .get(index as usize)
                .cloned()
                .ok_or_else(|| WireError::codec(format!("unknown tag index {index}")));
        }
        let raw = reader.bytes((header >> 1) as usize)?;
        let tag = std::str::from_utf8(raw)
            .map_err(|e| WireError::codec(format!("invalid tag: {e}")))?
            .to_string();
        self.scratch.read.push(tag.clone());
        Ok(tag)
    }
}

impl Default for ClassResolver {
    fn default() -> Self {
        Self::new()
    }
}
