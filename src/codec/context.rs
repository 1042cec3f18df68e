//! Per-call state handed to codecs.

use crate::buffer::{BinaryReader, BinaryWriter};
use crate::config::Config;
use crate::error::{Result, WireError};
use crate::resolver::{ClassResolver, ReferenceResolver};

/// Deepest container/object nesting a frame may declare.
pub const MAX_READ_DEPTH: usize = 128;

/// Everything a codec needs while writing one frame.
pub struct WriteContext<'a> {
    pub writer: &'a mut BinaryWriter,
    pub refs: &'a mut ReferenceResolver,
    pub classes: &'a mut ClassResolver,
    pub config: &'a Config,
}

impl<'a> WriteContext<'a> {
    pub fn new(
        writer: &'a mut BinaryWriter,
        refs: &'a mut ReferenceResolver,
        classes: &'a mut ClassResolver,
        config: &'a Config,
    ) -> Self {
        Self {
            writer,
            refs,
            classes,
            config,
        }
    }
}

/// Everything a codec needs while reading one frame.
pub struct ReadContext<'a, 'de> {
    pub reader: &'a mut BinaryReader<'de>,
    pub refs: &'a mut ReferenceResolver,
    pub classes: &'a mut ClassResolver,
    pub config: &'a Config,
    depth: usize,
}

impl<'a, 'de> ReadContext<'a, 'de> {
    pub fn new(
        reader: &'a mut BinaryReader<'de>,
        refs: &'a mut ReferenceResolver,
        classes: &'a mut ClassResolver,
        config: &'a Config,
    ) -> Self {
        Self {
            reader,
            refs,
            classes,
            config,
            depth: 0,
        }
    }

    /// Read a string honouring `use_slice_string`.
    #[inline]
    pub fn read_string(&mut self) -> Result<String> {
        self.reader.string(self.config.use_slice_string)
    }

    /// Descend into a container or object payload.
    ///
    /// # Errors
    ///
    /// [`WireError::Codec`] once nesting exceeds [`MAX_READ_DEPTH`].
    pub fn enter(&mut self) -> Result<()> {
        if self.depth >= MAX_READ_DEPTH {
            return Err(WireError::codec(format!(
                "nesting deeper than {MAX_READ_DEPTH} levels"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Leave a level entered with [`enter`](Self::enter).
    #[inline]
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }
}
