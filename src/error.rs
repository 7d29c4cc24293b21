//! # Codec Error Taxonomy
//!
//! Distinguishable error classes for message access and mutation. All fallible
//! operations return `eyre::Result`; callers that need to dispatch on the
//! class downcast the report:
//!
//! ```ignore
//! match err.downcast_ref::<CodecError>() {
//!     Some(CodecError::IndexOutOfRange { .. }) => { /* retry with a valid index */ }
//!     _ => return Err(err),
//! }
//! ```
//!
//! A schema mismatch during `Registry::wrap` is *not* an error: it is a
//! routine outcome (dispatch by message type) and is signaled with `Ok(None)`.
//!
//! | Class | Meaning | Checked |
//! |-------|---------|---------|
//! | `UnknownField` | field id/name not in this group's definition | eagerly; handle/view pairing only in safe mode |
//! | `TypeMismatch` | accessor type or width cannot cover the declared field type | safe mode |
//! | `IndexOutOfRange` | group occurrence or array element index invalid | always |
//! | `TruncatedBuffer` | declared lengths exceed buffer capacity | always, before any byte shift |

use core::fmt;

use crate::schema::FieldType;

/// Error classes surfaced by message views, row arrays and the registry.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CodecError {
    /// A field id or name is not part of the group definition being accessed,
    /// or a field handle from another group was applied to this view.
    UnknownField { group: String, field: String },
    /// An accessor was applied to a field whose declared type or width it
    /// cannot cover (e.g. reading a u64 field through `get_u32`).
    TypeMismatch {
        field: String,
        declared: FieldType,
        accessor: &'static str,
    },
    /// A group occurrence or array element index is outside `0..len`.
    IndexOutOfRange { index: usize, len: usize },
    /// Lengths declared by framing headers extend past the buffer. Detected
    /// before any byte is moved so a mutation never partially applies.
    TruncatedBuffer { needed: usize, available: usize },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnknownField { group, field } => {
                write!(f, "field '{field}' is not part of group '{group}'")
            }
            CodecError::TypeMismatch {
                field,
                declared,
                accessor,
            } => write!(
                f,
                "accessor '{accessor}' cannot cover field '{field}' declared as {declared:?}"
            ),
            CodecError::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range (len {len})")
            }
            CodecError::TruncatedBuffer { needed, available } => write!(
                f,
                "declared content needs {needed} bytes but buffer holds {available}"
            ),
        }
    }
}

impl std::error::Error for CodecError {}
