//! # Repeating-Group Row Arrays
//!
//! The only access path to group occurrences. A row array wraps one group
//! header in the buffer; occurrence offsets are resolved on demand by
//! summing the actual encoded sizes of preceding rows, so arrays stay
//! correct across any structural mutation that happened before they were
//! (re-)obtained.
//!
//! Structural mutation lives here: [`GroupArrayMut::add_group`] appends an
//! empty row, [`GroupArrayMut::delete_group`] removes one. Both relocate the
//! whole trailing region of the store in a single contiguous move, so content
//! packed after the mutated message (sibling messages in a packed store)
//! shifts byte-for-byte instead of being overwritten. Everything (occurrence
//! index, count overflow) is validated before the first byte moves, so a
//! failed mutation leaves the buffer untouched.

use eyre::Result;

use crate::error::CodecError;
use crate::message::layout;
use crate::message::registry::Registry;
use crate::message::view::{GroupView, GroupViewMut};
use crate::schema::field::{GroupIdx, Schema};
use crate::schema::headers::{read_uint, write_uint};

fn occurrence_count(schema: &Schema, data: &[u8], header_base: usize) -> Result<usize> {
    let gh = schema.group_header();
    Ok(read_uint(
        data,
        header_base + gh.num_in_group_offset(),
        gh.num_in_group,
        schema.byte_order(),
    )? as usize)
}

/// Base offset of occurrence `n`, walking the actual sizes of rows 0..n.
fn occurrence_offset(
    schema: &Schema,
    def: GroupIdx,
    data: &[u8],
    header_base: usize,
    n: usize,
) -> Result<usize> {
    let mut off = header_base + schema.group_header().encoded_len();
    for _ in 0..n {
        off += layout::content_size(schema, def, data, off)?;
    }
    Ok(off)
}

/// Read-only row array over one encoded repeating group.
#[derive(Debug, Clone, Copy)]
pub struct GroupArray<'a> {
    pub(crate) reg: &'a Registry,
    pub(crate) def: GroupIdx,
    pub(crate) header_base: usize,
    pub(crate) data: &'a [u8],
}

impl<'a> GroupArray<'a> {
    /// Occurrence count currently stored in the group header.
    pub fn num_groups(&self) -> Result<usize> {
        occurrence_count(self.reg.schema(), self.data, self.header_base)
    }

    /// View over occurrence `n`. The index is checked against the stored
    /// count regardless of validation mode.
    pub fn group_at(&self, n: usize) -> Result<GroupView<'a>> {
        let schema = self.reg.schema();
        let count = occurrence_count(schema, self.data, self.header_base)?;
        if n >= count {
            return Err(CodecError::IndexOutOfRange { index: n, len: count }.into());
        }
        let base = occurrence_offset(schema, self.def, self.data, self.header_base, n)?;
        Ok(GroupView {
            reg: self.reg,
            def: self.def,
            data: self.data,
            base,
        })
    }
}

/// Mutable row array: occurrence access plus add/delete.
#[derive(Debug)]
pub struct GroupArrayMut<'a> {
    pub(crate) reg: &'a Registry,
    pub(crate) def: GroupIdx,
    pub(crate) header_base: usize,
    pub(crate) data: &'a mut Vec<u8>,
}

impl<'a> GroupArrayMut<'a> {
    pub fn num_groups(&self) -> Result<usize> {
        occurrence_count(self.reg.schema(), self.data, self.header_base)
    }

    pub fn group_at(&self, n: usize) -> Result<GroupView<'_>> {
        let schema = self.reg.schema();
        let count = occurrence_count(schema, self.data, self.header_base)?;
        if n >= count {
            return Err(CodecError::IndexOutOfRange { index: n, len: count }.into());
        }
        let base = occurrence_offset(schema, self.def, self.data, self.header_base, n)?;
        Ok(GroupView {
            reg: self.reg,
            def: self.def,
            data: self.data.as_slice(),
            base,
        })
    }

    /// Mutable view over occurrence `n`.
    pub fn group_at_mut(&mut self, n: usize) -> Result<GroupViewMut<'_>> {
        let schema = self.reg.schema();
        let count = occurrence_count(schema, self.data, self.header_base)?;
        if n >= count {
            return Err(CodecError::IndexOutOfRange { index: n, len: count }.into());
        }
        let base = occurrence_offset(schema, self.def, self.data, self.header_base, n)?;
        Ok(GroupViewMut {
            reg: self.reg,
            def: self.def,
            data: self.data,
            base,
        })
    }

    /// Appends an empty occurrence after the current last row and returns a
    /// mutable view over it. Every byte of the store after the insertion
    /// point is relocated; the count is validated against the group header's
    /// control width before anything moves.
    ///
    /// The new row reads as all-zero: zero fixed block, nested groups with
    /// zero occurrences, nested raw fields absent.
    pub fn add_group(&mut self) -> Result<GroupViewMut<'_>> {
        let schema = self.reg.schema();
        let gh = *schema.group_header();
        let order = schema.byte_order();
        let count = occurrence_count(schema, self.data, self.header_base)?;
        eyre::ensure!(
            (count as u64) < gh.num_in_group.unsigned_max(),
            "group occurrence count {} exceeds {:?} control field",
            count + 1,
            gh.num_in_group
        );
        let insert_at =
            occurrence_offset(schema, self.def, self.data, self.header_base, count)?;
        let empty_len = layout::empty_content_len(schema, self.def);
        layout::open_gap(self.data, insert_at, empty_len);
        layout::write_empty_content(schema, self.def, self.data, insert_at)?;
        write_uint(
            self.data,
            self.header_base + gh.num_in_group_offset(),
            gh.num_in_group,
            order,
            (count + 1) as u64,
        )?;
        Ok(GroupViewMut {
            reg: self.reg,
            def: self.def,
            data: self.data,
            base: insert_at,
        })
    }

    /// Deletes occurrence `n`, shifting the remaining rows and everything
    /// after them in the store left over it. Validation happens before any
    /// byte moves; a failed delete leaves the buffer untouched.
    pub fn delete_group(&mut self, n: usize) -> Result<()> {
        let schema = self.reg.schema();
        let gh = *schema.group_header();
        let order = schema.byte_order();
        let count = occurrence_count(schema, self.data, self.header_base)?;
        if n >= count {
            return Err(CodecError::IndexOutOfRange { index: n, len: count }.into());
        }
        let base = occurrence_offset(schema, self.def, self.data, self.header_base, n)?;
        let size = layout::content_size(schema, self.def, self.data, base)?;
        layout::close_gap(self.data, base, size);
        write_uint(
            self.data,
            self.header_base + gh.num_in_group_offset(),
            gh.num_in_group,
            order,
            (count - 1) as u64,
        )?;
        Ok(())
    }
}
