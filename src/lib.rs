//! # flatmsg — Schema-Driven Binary Message Codec
//!
//! A zero-copy codec for flat, length-prefixed binary messages: fixed-width
//! fields at schema-computed offsets, repeating groups and variable-length
//! payloads framed by small headers, and a live message model that reads,
//! writes and structurally mutates encoded bytes in place.
//!
//! ## Wire Format
//!
//! ```text
//! +----------------+---------------+----------------------+-------------------+
//! | MessageHeader  | fixed block   | group blocks...      | raw fields...     |
//! | blockLength    | scalars,      | GroupHeader +        | VarHeader +       |
//! | templateId     | enums, sets,  | occurrence bodies    | payload bytes     |
//! | schemaId       | char arrays,  | (recursively this    |                   |
//! | version        | composites    |  same body layout)   |                   |
//! +----------------+---------------+----------------------+-------------------+
//! ```
//!
//! No padding, no offset tables, no pointers. All variability lives in the
//! framing headers, so the encoded form is position-independent and a single
//! contiguous byte move relocates everything after any mutation point.
//!
//! ## Quick Start
//!
//! ```ignore
//! use flatmsg::{FieldType, Registry, SchemaBuilder};
//!
//! let mut b = SchemaBuilder::new(9, 1);
//! b.add_message(1, "quote")?
//!     .add_field(1, "price", FieldType::U64)?
//!     .begin_group(2, "legs")?
//!     .add_field(3, "qty", FieldType::U32)?
//!     .end_group()?
//!     .add_raw_field(4, "venue")?
//!     .end_message()?;
//! let reg = Registry::new(b.build()?);
//!
//! let mut buf = Vec::new();
//! let mut msg = reg.create(1, &mut buf, 0)?.unwrap();
//! msg.set_u64(msg.field("price")?, 10_250)?;
//! let legs = msg.field("legs")?;
//! let mut rows = msg.group_array_mut(legs)?;
//! let mut leg = rows.add_group()?;
//! leg.set_u32(leg.field("qty")?, 100)?;
//! ```
//!
//! ## Architecture
//!
//! | Module    | Responsibility                                              |
//! |-----------|-------------------------------------------------------------|
//! | `schema`  | immutable definition tree, precomputed fixed layout, builder |
//! | `message` | registry, live views, group row arrays, JSON rendering      |
//! | `error`   | codec error classes raised through `eyre` reports           |
//!
//! Schemas are immutable after construction and shared by every view; buffers
//! belong to the caller. Views are handles, not copies: every offset is
//! resolved on demand from the schema plus the framing headers currently in
//! the buffer, which keeps reads correct across structural mutations.

pub mod error;
pub mod message;
pub mod schema;

pub use error::CodecError;
pub use message::{
    to_json_string, GroupArray, GroupArrayMut, GroupView, GroupViewMut, Registry,
};
pub use schema::{
    ByteOrder, Choice, ConstValue, EnumValue, FieldRef, FieldType, GroupHeaderDef,
    MessageHeaderDef, Schema, SchemaBuilder, VarHeaderDef,
};
