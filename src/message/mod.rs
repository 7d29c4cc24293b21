//! # Message Codec — Live Buffer-Backed Views
//!
//! Runtime half of the codec: given an immutable schema and a byte store,
//! frame, read, write, and structurally mutate encoded messages in place.
//!
//! ## Wire Format
//!
//! ```text
//! | MessageHeader | fixed block | group blocks... | raw fields... |
//!                                 ^ each: GroupHeader + occurrence bodies
//!                                                    ^ each: VarHeader + payload
//! ```
//!
//! The same body layout recurs at every nesting level. There are no offset
//! tables, pointers, or padding; all variability is expressed through the
//! framing headers, which is what makes single-`copy_within` relocation of
//! the trailing region sufficient for any structural mutation.
//!
//! ## Module Map
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | `registry` | schema-bound entry point: wrap existing, create new     |
//! | `view`     | per-level typed field access, read-only and mutable     |
//! | `array`    | repeating-group rows: access, add, delete               |
//! | `layout`   | shared offset/size walker and gap open/close primitives |
//! | `render`   | JSON rendering of a live view                           |

pub mod array;
pub(crate) mod layout;
pub mod registry;
pub mod render;
pub mod view;

pub use array::{GroupArray, GroupArrayMut};
pub use registry::Registry;
pub use render::to_json_string;
pub use view::{GroupView, GroupViewMut};

#[cfg(test)]
mod tests;
