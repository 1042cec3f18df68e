//! Schema bundles for sharing registrations between peers.
//!
//! Type ids are assigned in registration order, so two processes only agree
//! on ids if they register the same descriptions in the same order. A
//! [`SchemaBundle`] captures that order on one side and replays it on the other.
//!
//! # Example
//!
//! ```
//! use xlang_wire::schema::SchemaBundle;
//! use xlang_wire::types::{FieldDescription, TypeDescription};
//!
//! let bundle = SchemaBundle::new(vec![TypeDescription::object(
//!     "example.point",
//!     vec![FieldDescription::new("x", TypeDescription::Int32)],
//! )]);
//!
//! let json = bundle.to_json().unwrap();
//! assert_eq!(SchemaBundle::from_json(&json).unwrap(), bundle);
//!
//! let packed = bundle.to_msgpack().unwrap();
//! assert_eq!(SchemaBundle::from_msgpack(&packed).unwrap(), bundle);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};
use crate::types::TypeDescription;

/// Current bundle format version.
pub const SCHEMA_VERSION: &str = "1.0";

/// Ordered list of registered descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Bundle format version.
    pub version: String,
    /// Descriptions in registration order.
    pub types: Vec<TypeDescription>,
}

impl SchemaBundle {
    pub fn new(types: Vec<TypeDescription>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            types,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: Self = serde_json::from_str(json)?;
        bundle.check_version()?;
        Ok(bundle)
    }

    /// Encode as MessagePack with named fields, so non-Rust peers see maps.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        let bundle: Self = rmp_serde::from_slice(bytes)?;
        bundle.check_version()?;
        Ok(bundle)
    }

    fn check_version(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(WireError::codec(format!(
                "unsupported schema bundle version {} (expected {SCHEMA_VERSION})",
                self.version
            )));
        }
        Ok(())
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
