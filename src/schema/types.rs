//! # Field Type Catalog
//!
//! This module provides the closed `FieldType` enum used across schema
//! definitions, message views and rendering.
//!
//! ## Type Categories
//!
//! | Category | Types | Fixed Size |
//! |----------|-------|------------|
//! | **Unsigned** | U8, U16, U32, U64 | 1, 2, 4, 8 bytes |
//! | **Signed** | I8, I16, I32, I64 | 1, 2, 4, 8 bytes |
//! | **Float** | Float, Double | 4, 8 bytes |
//! | **Character** | Char, Byte | 1 byte |
//! | **Variable** | Raw, Group | data-dependent |
//! | **Structural** | Constant, Enum, Set, Composite, Message | computed |
//!
//! ## Discriminant Values
//!
//! Discriminants are grouped by category:
//! - 0-11: Fixed-width primitives
//! - 20-23: Schema-resolved kinds (Raw, Constant, Enum, Set)
//! - 30-32: Nesting kinds (Composite, Group, Message)
//!
//! ## Size Semantics
//!
//! `fixed_size()` returns the encoded byte width of fixed primitives and
//! `None` for everything else: Raw and Group lengths depend on runtime data,
//! an Enum or Set takes the width of its encoding primitive, a Composite takes
//! the fixed sum of its children, and a Constant occupies zero buffer bytes
//! (its value lives in the schema).

/// Canonical wire type enum for all field definitions.
///
/// Uses `#[repr(u8)]` for efficient single-byte storage encoding. Array
/// length, enum encoding and composite membership are stored in `FieldDef`,
/// not in the enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    U8 = 0,
    U16 = 1,
    U32 = 2,
    U64 = 3,
    I8 = 4,
    I16 = 5,
    I32 = 6,
    I64 = 7,
    Char = 8,
    Byte = 9,
    Float = 10,
    Double = 11,

    Raw = 20,
    Constant = 21,
    Enum = 22,
    Set = 23,

    Composite = 30,
    Group = 31,
    Message = 32,
}

impl FieldType {
    /// Encoded byte width for fixed-width primitives, `None` otherwise.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            FieldType::U8 | FieldType::I8 | FieldType::Char | FieldType::Byte => Some(1),
            FieldType::U16 | FieldType::I16 => Some(2),
            FieldType::U32 | FieldType::I32 | FieldType::Float => Some(4),
            FieldType::U64 | FieldType::I64 | FieldType::Double => Some(8),
            FieldType::Raw
            | FieldType::Constant
            | FieldType::Enum
            | FieldType::Set
            | FieldType::Composite
            | FieldType::Group
            | FieldType::Message => None,
        }
    }

    /// True for kinds whose encoded length depends on runtime data.
    pub fn is_variable(self) -> bool {
        matches!(self, FieldType::Raw | FieldType::Group)
    }

    /// True for U8/U16/U32/U64 and Byte (raw octets read as unsigned).
    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 | FieldType::Byte
        )
    }

    /// True for I8/I16/I32/I64.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64
        )
    }

    /// True for the unsigned widths usable as framing header control fields.
    pub fn is_header_control(self) -> bool {
        matches!(
            self,
            FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64
        )
    }

    /// Largest value representable by an unsigned width. Zero for
    /// non-unsigned kinds.
    pub fn unsigned_max(self) -> u64 {
        match self {
            FieldType::U8 | FieldType::Byte => u8::MAX as u64,
            FieldType::U16 => u16::MAX as u64,
            FieldType::U32 => u32::MAX as u64,
            FieldType::U64 => u64::MAX,
            _ => 0,
        }
    }
}
