//! # xlang-wire
//!
//! Cross-language binary serialization engine.
//!
//! Encodes [`Value`] graphs into a compact, Little Endian wire format that a
//! peer running in another runtime can decode, and decodes such frames back.
//!
//! ## Architecture
//!
//! - **Framing** ([`protocol`]): bitmap + language tag + reserved native-object fields
//! - **Reference tracking** ([`resolver::ReferenceResolver`]): shared instances
//!   are written once, cycles terminate
//! - **Type ids** ([`resolver::ClassResolver`]): built-in ids plus registered
//!   types in registration order
//! - **Buffer ownership** ([`buffer::BinaryWriter`]): copying output, or a
//!   zero-copy view that locks the writer until released
//!
//! ## Example
//!
//! ```
//! use xlang_wire::types::{FieldDescription, TypeDescription};
//! use xlang_wire::{Config, Engine, Value};
//!
//! let mut engine = Engine::new(Config::default().with_ref_tracking(true));
//! let person = engine
//!     .register_serializer(&TypeDescription::object(
//!         "example.person",
//!         vec![
//!             FieldDescription::new("name", TypeDescription::String),
//!             FieldDescription::new("age", TypeDescription::Int32),
//!         ],
//!     ))
//!     .unwrap();
//!
//! let alice = Value::object(
//!     "example.person",
//!     [("name", Value::from("alice")), ("age", Value::Int32(30))],
//! );
//! let bytes = person.serialize(&mut engine, &alice).unwrap();
//! assert_eq!(person.deserialize(&mut engine, &bytes).unwrap(), alice);
//!
//! // Zero-copy output must be released before the next write
//! let view = engine.serialize_volatile(&alice).unwrap();
//! assert!(engine.serialize(&Value::Null).is_err());
//! view.release();
//! assert!(engine.serialize(&Value::Null).is_ok());
//! ```

pub mod buffer;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod resolver;
pub mod schema;
pub mod types;
pub mod value;

mod engine;

pub use config::Config;
pub use engine::{Engine, Registered};
pub use error::{ProtocolViolation, Result, WireError};
pub use value::Value;
