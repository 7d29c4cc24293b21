//! # Schema Definition Layer
//!
//! Immutable, build-once schema objects shared by every message view:
//!
//! - `types`: the closed `FieldType` catalog with per-type wire widths
//! - `field`: `FieldDef`/`GroupDef` arena nodes and the `Schema` owner
//! - `headers`: framing header templates and byte-order-aware control decode
//! - `builder`: `SchemaBuilder`, the collaborator-facing construction API
//!
//! The schema is the only state shared between buffers; once built it is
//! never written again, so unlimited concurrent readers are safe.

pub mod builder;
pub mod field;
pub mod headers;
pub mod types;

pub use builder::SchemaBuilder;
pub use field::{Choice, ConstValue, EnumValue, FieldDef, FieldRef, GroupDef, GroupIdx, Schema};
pub use headers::{ByteOrder, GroupHeaderDef, MessageHeaderDef, VarHeaderDef};
pub use types::FieldType;
