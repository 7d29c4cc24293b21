//! # Value Views — Buffer-Backed Field Access
//!
//! `GroupView` reads and `GroupViewMut` reads/writes one nesting level of an
//! encoded message. A view is a lightweight handle {definition index, borrowed
//! buffer, base offset} — never a parsed copy, never cached across structural
//! mutations. Every accessor resolves its byte location on demand from the
//! schema's precomputed fixed layout plus the framing headers currently in
//! the buffer.
//!
//! ## Offset Resolution
//!
//! - Fixed-width fields: base + schema prefix sum, O(1).
//! - Group/raw children: base + fixed block + actual encoded sizes of every
//!   variable sibling preceding them in wire order, each a recursive walk.
//!
//! ## Safe Mode
//!
//! With safe mode on (the default) every accessor validates that the field
//! handle belongs to this view's definition and that the accessor's type and
//! width cover the field's declared type; numeric widening is permitted,
//! narrowing is a `TypeMismatch`. With safe mode off those checks are skipped
//! for throughput and behavior on a wrong field/view pairing is unspecified.
//! Occurrence/element index checks and truncation checks are never skipped.
//!
//! ## Staleness
//!
//! Views are cheap by design: after any structural mutation (row add/delete,
//! raw resize) callers re-navigate from the root rather than reuse offsets
//! computed before the mutation. For mutable views the borrow checker makes
//! reuse of a stale sibling view impossible.

use eyre::Result;

use crate::error::CodecError;
use crate::message::array::{GroupArray, GroupArrayMut};
use crate::message::layout;
use crate::message::registry::Registry;
use crate::schema::field::{ConstValue, FieldDef, FieldRef, GroupDef, GroupIdx, Schema};
use crate::schema::headers::{load_uint, read_uint, store_uint, write_uint};
use crate::schema::types::FieldType;

pub(crate) fn type_mismatch(f: &FieldDef, accessor: &'static str) -> eyre::Report {
    CodecError::TypeMismatch {
        field: f.name().to_string(),
        declared: f.field_type(),
        accessor,
    }
    .into()
}

/// Read-only value view over one group body.
#[derive(Debug, Clone, Copy)]
pub struct GroupView<'a> {
    pub(crate) reg: &'a Registry,
    pub(crate) def: GroupIdx,
    pub(crate) data: &'a [u8],
    pub(crate) base: usize,
}

impl<'a> GroupView<'a> {
    pub(crate) fn schema(&self) -> &'a Schema {
        self.reg.schema()
    }

    /// The group definition this view decodes against.
    pub fn definition(&self) -> &'a GroupDef {
        self.schema().group(self.def)
    }

    /// Base byte offset of this view's content within the buffer.
    pub fn base_offset(&self) -> usize {
        self.base
    }

    /// Field handle by name. Always checked, regardless of safe mode.
    pub fn field(&self, name: &str) -> Result<FieldRef> {
        match self.definition().field_index_by_name(name) {
            Some(index) => Ok(FieldRef {
                group: self.def,
                index,
            }),
            None => Err(CodecError::UnknownField {
                group: self.definition().name().to_string(),
                field: name.to_string(),
            }
            .into()),
        }
    }

    /// Field handle by id. Always checked, regardless of safe mode.
    pub fn field_by_id(&self, id: u32) -> Result<FieldRef> {
        match self.definition().field_index_by_id(id) {
            Some(index) => Ok(FieldRef {
                group: self.def,
                index,
            }),
            None => Err(CodecError::UnknownField {
                group: self.definition().name().to_string(),
                field: format!("id {id}"),
            }
            .into()),
        }
    }

    /// Encoded size of this view's content: fixed block plus every nested
    /// group block and raw payload. Computed on demand, never cached.
    pub fn get_size(&self) -> Result<usize> {
        layout::content_size(self.schema(), self.def, self.data, self.base)
    }

    pub(crate) fn resolve(&self, field: FieldRef) -> Result<&'a FieldDef> {
        if self.reg.safe_mode() && field.group != self.def {
            let foreign = self.schema().group(field.group);
            let name = foreign
                .fields()
                .get(field.index)
                .map(|f| f.name().to_string())
                .unwrap_or_else(|| format!("index {}", field.index));
            return Err(CodecError::UnknownField {
                group: self.definition().name().to_string(),
                field: name,
            }
            .into());
        }
        Ok(&self.schema().group(field.group).fields()[field.index])
    }

    /// Byte offset of element `index` of a fixed-slot field.
    pub(crate) fn fixed_slot_offset(
        &self,
        field: FieldRef,
        f: &FieldDef,
        index: usize,
    ) -> Result<usize> {
        if index >= f.array_len() {
            return Err(CodecError::IndexOutOfRange {
                index,
                len: f.array_len(),
            }
            .into());
        }
        let elem = f.encoded_type().fixed_size().unwrap_or(0);
        Ok(self.base + self.definition().fixed_offset(field.index) + index * elem)
    }

    pub(crate) fn read_unsigned(
        &self,
        field: FieldRef,
        index: usize,
        accessor_width: usize,
        accessor: &'static str,
    ) -> Result<u64> {
        let f = self.resolve(field)?;
        if let Some(c) = f.constant() {
            return match c {
                ConstValue::Unsigned(v) => Ok(*v),
                _ => Err(type_mismatch(f, accessor)),
            };
        }
        let enc = f.encoded_type();
        if self.reg.safe_mode()
            && (!enc.is_unsigned() || enc.fixed_size().unwrap_or(0) > accessor_width)
        {
            return Err(type_mismatch(f, accessor));
        }
        let off = self.fixed_slot_offset(field, f, index)?;
        load_uint(
            self.data,
            off,
            enc.fixed_size().unwrap_or(0),
            self.schema().byte_order(),
        )
    }

    pub(crate) fn read_signed(
        &self,
        field: FieldRef,
        index: usize,
        accessor_width: usize,
        accessor: &'static str,
    ) -> Result<i64> {
        let f = self.resolve(field)?;
        if let Some(c) = f.constant() {
            return match c {
                ConstValue::Signed(v) => Ok(*v),
                _ => Err(type_mismatch(f, accessor)),
            };
        }
        let enc = f.encoded_type();
        if self.reg.safe_mode()
            && (!enc.is_signed() || enc.fixed_size().unwrap_or(0) > accessor_width)
        {
            return Err(type_mismatch(f, accessor));
        }
        let size = enc.fixed_size().unwrap_or(0);
        let off = self.fixed_slot_offset(field, f, index)?;
        let raw = load_uint(self.data, off, size, self.schema().byte_order())?;
        let shift = 64 - size as u32 * 8;
        Ok(((raw << shift) as i64) >> shift)
    }

    fn read_float(
        &self,
        field: FieldRef,
        index: usize,
        accessor_width: usize,
        accessor: &'static str,
    ) -> Result<f64> {
        let f = self.resolve(field)?;
        if let Some(c) = f.constant() {
            return match c {
                ConstValue::Float(v) => Ok(*v),
                _ => Err(type_mismatch(f, accessor)),
            };
        }
        let enc = f.encoded_type();
        if self.reg.safe_mode()
            && (!matches!(enc, FieldType::Float | FieldType::Double)
                || enc.fixed_size().unwrap_or(0) > accessor_width)
        {
            return Err(type_mismatch(f, accessor));
        }
        let off = self.fixed_slot_offset(field, f, index)?;
        match enc.fixed_size().unwrap_or(0) {
            4 => {
                let bits = load_uint(self.data, off, 4, self.schema().byte_order())?;
                Ok(f32::from_bits(bits as u32) as f64)
            }
            8 => {
                let bits = load_uint(self.data, off, 8, self.schema().byte_order())?;
                Ok(f64::from_bits(bits))
            }
            _ => Err(type_mismatch(f, accessor)),
        }
    }

    pub fn get_u8(&self, field: FieldRef) -> Result<u8> {
        self.get_u8_at(field, 0)
    }

    pub fn get_u8_at(&self, field: FieldRef, index: usize) -> Result<u8> {
        Ok(self.read_unsigned(field, index, 1, "u8")? as u8)
    }

    pub fn get_u16(&self, field: FieldRef) -> Result<u16> {
        self.get_u16_at(field, 0)
    }

    pub fn get_u16_at(&self, field: FieldRef, index: usize) -> Result<u16> {
        Ok(self.read_unsigned(field, index, 2, "u16")? as u16)
    }

    pub fn get_u32(&self, field: FieldRef) -> Result<u32> {
        self.get_u32_at(field, 0)
    }

    pub fn get_u32_at(&self, field: FieldRef, index: usize) -> Result<u32> {
        Ok(self.read_unsigned(field, index, 4, "u32")? as u32)
    }

    pub fn get_u64(&self, field: FieldRef) -> Result<u64> {
        self.get_u64_at(field, 0)
    }

    pub fn get_u64_at(&self, field: FieldRef, index: usize) -> Result<u64> {
        self.read_unsigned(field, index, 8, "u64")
    }

    pub fn get_i8(&self, field: FieldRef) -> Result<i8> {
        self.get_i8_at(field, 0)
    }

    pub fn get_i8_at(&self, field: FieldRef, index: usize) -> Result<i8> {
        Ok(self.read_signed(field, index, 1, "i8")? as i8)
    }

    pub fn get_i16(&self, field: FieldRef) -> Result<i16> {
        self.get_i16_at(field, 0)
    }

    pub fn get_i16_at(&self, field: FieldRef, index: usize) -> Result<i16> {
        Ok(self.read_signed(field, index, 2, "i16")? as i16)
    }

    pub fn get_i32(&self, field: FieldRef) -> Result<i32> {
        self.get_i32_at(field, 0)
    }

    pub fn get_i32_at(&self, field: FieldRef, index: usize) -> Result<i32> {
        Ok(self.read_signed(field, index, 4, "i32")? as i32)
    }

    pub fn get_i64(&self, field: FieldRef) -> Result<i64> {
        self.get_i64_at(field, 0)
    }

    pub fn get_i64_at(&self, field: FieldRef, index: usize) -> Result<i64> {
        self.read_signed(field, index, 8, "i64")
    }

    pub fn get_f32(&self, field: FieldRef) -> Result<f32> {
        self.get_f32_at(field, 0)
    }

    pub fn get_f32_at(&self, field: FieldRef, index: usize) -> Result<f32> {
        Ok(self.read_float(field, index, 4, "f32")? as f32)
    }

    pub fn get_f64(&self, field: FieldRef) -> Result<f64> {
        self.get_f64_at(field, 0)
    }

    pub fn get_f64_at(&self, field: FieldRef, index: usize) -> Result<f64> {
        self.read_float(field, index, 8, "f64")
    }

    /// Raw octet accessor (Byte fields; U8 also accepted).
    pub fn get_byte(&self, field: FieldRef) -> Result<u8> {
        self.get_u8(field)
    }

    pub fn get_byte_at(&self, field: FieldRef, index: usize) -> Result<u8> {
        self.get_u8_at(field, index)
    }

    pub fn get_char(&self, field: FieldRef) -> Result<char> {
        self.get_char_at(field, 0)
    }

    pub fn get_char_at(&self, field: FieldRef, index: usize) -> Result<char> {
        let f = self.resolve(field)?;
        if let Some(c) = f.constant() {
            return match c {
                ConstValue::Str(s) if s.len() == 1 => Ok(s.as_bytes()[0] as char),
                _ => Err(type_mismatch(f, "char")),
            };
        }
        if self.reg.safe_mode() && f.encoded_type() != FieldType::Char {
            return Err(type_mismatch(f, "char"));
        }
        let off = self.fixed_slot_offset(field, f, index)?;
        layout::ensure_within(self.data, off + 1)?;
        Ok(self.data[off] as char)
    }

    /// Char-array field as a string slice; trailing NULs are trimmed.
    pub fn get_string(&self, field: FieldRef) -> Result<&'a str> {
        let f = self.resolve(field)?;
        if let Some(c) = f.constant() {
            return match c {
                ConstValue::Str(s) => Ok(s.as_str()),
                _ => Err(type_mismatch(f, "string")),
            };
        }
        if self.reg.safe_mode() && f.encoded_type() != FieldType::Char {
            return Err(type_mismatch(f, "string"));
        }
        let off = self.base + self.definition().fixed_offset(field.index);
        let end = off + f.array_len();
        layout::ensure_within(self.data, end)?;
        let bytes = &self.data[off..end];
        let trimmed = match bytes.iter().rposition(|&b| b != 0) {
            Some(last) => &bytes[..=last],
            None => &bytes[..0],
        };
        std::str::from_utf8(trimmed)
            .map_err(|e| eyre::eyre!("invalid UTF-8 in field '{}': {}", f.name(), e))
    }

    /// Stored payload length of a variable-length field.
    pub fn get_raw_len(&self, field: FieldRef) -> Result<usize> {
        Ok(self.raw_bounds(field)?.1)
    }

    /// Zero-copy slice of a variable-length field's payload.
    pub fn get_raw(&self, field: FieldRef) -> Result<&'a [u8]> {
        let (payload, len) = self.raw_bounds(field)?;
        Ok(&self.data[payload..payload + len])
    }

    /// Copies the payload into `dest`, up to `dest.len()` bytes — fewer if
    /// the stored payload is shorter. Returns the number of bytes copied.
    /// The only accessor with requested-length semantics.
    pub fn get_bytes(&self, field: FieldRef, dest: &mut [u8]) -> Result<usize> {
        let (payload, len) = self.raw_bounds(field)?;
        let n = dest.len().min(len);
        dest[..n].copy_from_slice(&self.data[payload..payload + n]);
        Ok(n)
    }

    /// Payload start offset and stored length of a raw field, bound-checked.
    pub(crate) fn raw_bounds(&self, field: FieldRef) -> Result<(usize, usize)> {
        let f = self.resolve(field)?;
        if f.field_type() != FieldType::Raw {
            return Err(type_mismatch(f, "raw"));
        }
        let schema = self.schema();
        let vh = schema.var_header();
        let header =
            layout::raw_header_offset(schema, self.def, self.data, self.base, field.index)?;
        let len = read_uint(
            self.data,
            header + vh.length_offset(),
            vh.length,
            schema.byte_order(),
        )? as usize;
        let payload = header + vh.encoded_len();
        layout::ensure_within(self.data, payload + len)?;
        Ok((payload, len))
    }

    /// Raw encoded value of an enum field.
    pub fn get_enum_value(&self, field: FieldRef) -> Result<u64> {
        let f = self.resolve(field)?;
        if f.field_type() != FieldType::Enum {
            return Err(type_mismatch(f, "enum"));
        }
        let off = self.fixed_slot_offset(field, f, 0)?;
        load_uint(
            self.data,
            off,
            f.encoded_type().fixed_size().unwrap_or(0),
            self.schema().byte_order(),
        )
    }

    /// Symbolic name of an enum field's current value. An encoded value not
    /// present in the schema's value table yields `None`, which is distinct
    /// from any error.
    pub fn get_enum_name(&self, field: FieldRef) -> Result<Option<&'a str>> {
        let raw = self.get_enum_value(field)?;
        let f = self.resolve(field)?;
        Ok(f.enum_values()
            .iter()
            .find(|v| v.value == raw)
            .map(|v| v.name.as_str()))
    }

    /// Whether a named choice bit of a Set field is set.
    pub fn get_choice(&self, field: FieldRef, choice: &str) -> Result<bool> {
        let f = self.resolve(field)?;
        if f.field_type() != FieldType::Set {
            return Err(type_mismatch(f, "choice"));
        }
        let bit = f
            .choices()
            .iter()
            .find(|c| c.name == choice)
            .map(|c| c.bit)
            .ok_or_else(|| CodecError::UnknownField {
                group: f.name().to_string(),
                field: choice.to_string(),
            })?;
        let off = self.fixed_slot_offset(field, f, 0)?;
        let raw = load_uint(
            self.data,
            off,
            f.encoded_type().fixed_size().unwrap_or(0),
            self.schema().byte_order(),
        )?;
        Ok((raw >> bit) & 1 == 1)
    }

    /// Transparent navigation into a fixed-size composite member list.
    pub fn composite(&self, field: FieldRef) -> Result<GroupView<'a>> {
        let f = self.resolve(field)?;
        if f.field_type() != FieldType::Composite {
            return Err(type_mismatch(f, "composite"));
        }
        Ok(GroupView {
            reg: self.reg,
            def: f.child()?,
            data: self.data,
            base: self.base + self.definition().fixed_offset(field.index),
        })
    }

    /// Row array of a repeating-group field. The only path to occurrences.
    pub fn group_array(&self, field: FieldRef) -> Result<GroupArray<'a>> {
        let f = self.resolve(field)?;
        if f.field_type() != FieldType::Group {
            return Err(type_mismatch(f, "group"));
        }
        let header_base =
            layout::group_header_offset(self.schema(), self.def, self.data, self.base, field.index)?;
        Ok(GroupArray {
            reg: self.reg,
            def: f.child()?,
            header_base,
            data: self.data,
        })
    }
}

/// Mutable value view over one group body: the full read surface plus typed
/// setters and structural navigation. Holds the only borrow of the backing
/// store, so no stale reader can observe a mid-relocation buffer.
#[derive(Debug)]
pub struct GroupViewMut<'a> {
    pub(crate) reg: &'a Registry,
    pub(crate) def: GroupIdx,
    pub(crate) data: &'a mut Vec<u8>,
    pub(crate) base: usize,
}

impl<'a> GroupViewMut<'a> {
    /// Read-only view over the same region.
    pub fn as_view(&self) -> GroupView<'_> {
        GroupView {
            reg: self.reg,
            def: self.def,
            data: self.data.as_slice(),
            base: self.base,
        }
    }

    pub fn definition(&self) -> &'a GroupDef {
        self.reg.schema().group(self.def)
    }

    pub fn base_offset(&self) -> usize {
        self.base
    }

    pub fn field(&self, name: &str) -> Result<FieldRef> {
        self.as_view().field(name)
    }

    pub fn field_by_id(&self, id: u32) -> Result<FieldRef> {
        self.as_view().field_by_id(id)
    }

    pub fn get_size(&self) -> Result<usize> {
        self.as_view().get_size()
    }

    pub fn get_u8(&self, field: FieldRef) -> Result<u8> {
        self.as_view().get_u8(field)
    }

    pub fn get_u8_at(&self, field: FieldRef, index: usize) -> Result<u8> {
        self.as_view().get_u8_at(field, index)
    }

    pub fn get_u16(&self, field: FieldRef) -> Result<u16> {
        self.as_view().get_u16(field)
    }

    pub fn get_u16_at(&self, field: FieldRef, index: usize) -> Result<u16> {
        self.as_view().get_u16_at(field, index)
    }

    pub fn get_u32(&self, field: FieldRef) -> Result<u32> {
        self.as_view().get_u32(field)
    }

    pub fn get_u32_at(&self, field: FieldRef, index: usize) -> Result<u32> {
        self.as_view().get_u32_at(field, index)
    }

    pub fn get_u64(&self, field: FieldRef) -> Result<u64> {
        self.as_view().get_u64(field)
    }

    pub fn get_u64_at(&self, field: FieldRef, index: usize) -> Result<u64> {
        self.as_view().get_u64_at(field, index)
    }

    pub fn get_i8(&self, field: FieldRef) -> Result<i8> {
        self.as_view().get_i8(field)
    }

    pub fn get_i8_at(&self, field: FieldRef, index: usize) -> Result<i8> {
        self.as_view().get_i8_at(field, index)
    }

    pub fn get_i16(&self, field: FieldRef) -> Result<i16> {
        self.as_view().get_i16(field)
    }

    pub fn get_i16_at(&self, field: FieldRef, index: usize) -> Result<i16> {
        self.as_view().get_i16_at(field, index)
    }

    pub fn get_i32(&self, field: FieldRef) -> Result<i32> {
        self.as_view().get_i32(field)
    }

    pub fn get_i32_at(&self, field: FieldRef, index: usize) -> Result<i32> {
        self.as_view().get_i32_at(field, index)
    }

    pub fn get_i64(&self, field: FieldRef) -> Result<i64> {
        self.as_view().get_i64(field)
    }

    pub fn get_i64_at(&self, field: FieldRef, index: usize) -> Result<i64> {
        self.as_view().get_i64_at(field, index)
    }

    pub fn get_f32(&self, field: FieldRef) -> Result<f32> {
        self.as_view().get_f32(field)
    }

    pub fn get_f32_at(&self, field: FieldRef, index: usize) -> Result<f32> {
        self.as_view().get_f32_at(field, index)
    }

    pub fn get_f64(&self, field: FieldRef) -> Result<f64> {
        self.as_view().get_f64(field)
    }

    pub fn get_f64_at(&self, field: FieldRef, index: usize) -> Result<f64> {
        self.as_view().get_f64_at(field, index)
    }

    pub fn get_byte(&self, field: FieldRef) -> Result<u8> {
        self.as_view().get_byte(field)
    }

    pub fn get_char(&self, field: FieldRef) -> Result<char> {
        self.as_view().get_char(field)
    }

    pub fn get_string(&self, field: FieldRef) -> Result<String> {
        Ok(self.as_view().get_string(field)?.to_string())
    }

    pub fn get_raw_len(&self, field: FieldRef) -> Result<usize> {
        self.as_view().get_raw_len(field)
    }

    pub fn get_bytes(&self, field: FieldRef, dest: &mut [u8]) -> Result<usize> {
        self.as_view().get_bytes(field, dest)
    }

    pub fn get_enum_value(&self, field: FieldRef) -> Result<u64> {
        self.as_view().get_enum_value(field)
    }

    pub fn get_enum_name(&self, field: FieldRef) -> Result<Option<&'a str>> {
        // names live in the schema, not the buffer, so the 'a lifetime holds
        let raw = self.as_view().get_enum_value(field)?;
        Ok(self.reg.schema().group(field.group).fields()[field.index]
            .enum_values()
            .iter()
            .find(|v| v.value == raw)
            .map(|v| v.name.as_str()))
    }

    pub fn get_choice(&self, field: FieldRef, choice: &str) -> Result<bool> {
        self.as_view().get_choice(field, choice)
    }

    fn write_unsigned(
        &mut self,
        field: FieldRef,
        index: usize,
        accessor_width: usize,
        accessor: &'static str,
        value: u64,
    ) -> Result<()> {
        let order = self.reg.schema().byte_order();
        let (off, size) = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.constant().is_some() {
                return Err(type_mismatch(f, accessor));
            }
            let enc = f.encoded_type();
            if self.reg.safe_mode() {
                if !enc.is_unsigned() || enc.fixed_size().unwrap_or(0) > accessor_width {
                    return Err(type_mismatch(f, accessor));
                }
                if value > enc.unsigned_max() {
                    return Err(type_mismatch(f, accessor));
                }
            }
            let off = view.fixed_slot_offset(field, f, index)?;
            (off, enc.fixed_size().unwrap_or(0))
        };
        store_uint(self.data, off, size, order, value)
    }

    fn write_signed(
        &mut self,
        field: FieldRef,
        index: usize,
        accessor_width: usize,
        accessor: &'static str,
        value: i64,
    ) -> Result<()> {
        let order = self.reg.schema().byte_order();
        let (off, size) = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.constant().is_some() {
                return Err(type_mismatch(f, accessor));
            }
            let enc = f.encoded_type();
            if self.reg.safe_mode() {
                if !enc.is_signed() || enc.fixed_size().unwrap_or(0) > accessor_width {
                    return Err(type_mismatch(f, accessor));
                }
                let size = enc.fixed_size().unwrap_or(0);
                if size < 8 {
                    let bits = size as u32 * 8;
                    let min = -(1i64 << (bits - 1));
                    let max = (1i64 << (bits - 1)) - 1;
                    if value < min || value > max {
                        return Err(type_mismatch(f, accessor));
                    }
                }
            }
            let off = view.fixed_slot_offset(field, f, index)?;
            (off, enc.fixed_size().unwrap_or(0))
        };
        store_uint(self.data, off, size, order, value as u64)
    }

    fn write_float(
        &mut self,
        field: FieldRef,
        index: usize,
        accessor_width: usize,
        accessor: &'static str,
        value: f64,
    ) -> Result<()> {
        let order = self.reg.schema().byte_order();
        let (off, size) = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.constant().is_some() {
                return Err(type_mismatch(f, accessor));
            }
            let enc = f.encoded_type();
            if self.reg.safe_mode()
                && (!matches!(enc, FieldType::Float | FieldType::Double)
                    || enc.fixed_size().unwrap_or(0) > accessor_width)
            {
                return Err(type_mismatch(f, accessor));
            }
            let size = enc.fixed_size().unwrap_or(0);
            if size != 4 && size != 8 {
                return Err(type_mismatch(f, accessor));
            }
            (view.fixed_slot_offset(field, f, index)?, size)
        };
        let bits = if size == 4 {
            (value as f32).to_bits() as u64
        } else {
            value.to_bits()
        };
        store_uint(self.data, off, size, order, bits)
    }

    pub fn set_u8(&mut self, field: FieldRef, value: u8) -> Result<()> {
        self.set_u8_at(field, 0, value)
    }

    pub fn set_u8_at(&mut self, field: FieldRef, index: usize, value: u8) -> Result<()> {
        self.write_unsigned(field, index, 1, "u8", value as u64)
    }

    pub fn set_u16(&mut self, field: FieldRef, value: u16) -> Result<()> {
        self.set_u16_at(field, 0, value)
    }

    pub fn set_u16_at(&mut self, field: FieldRef, index: usize, value: u16) -> Result<()> {
        self.write_unsigned(field, index, 2, "u16", value as u64)
    }

    pub fn set_u32(&mut self, field: FieldRef, value: u32) -> Result<()> {
        self.set_u32_at(field, 0, value)
    }

    pub fn set_u32_at(&mut self, field: FieldRef, index: usize, value: u32) -> Result<()> {
        self.write_unsigned(field, index, 4, "u32", value as u64)
    }

    pub fn set_u64(&mut self, field: FieldRef, value: u64) -> Result<()> {
        self.set_u64_at(field, 0, value)
    }

    pub fn set_u64_at(&mut self, field: FieldRef, index: usize, value: u64) -> Result<()> {
        self.write_unsigned(field, index, 8, "u64", value)
    }

    pub fn set_i8(&mut self, field: FieldRef, value: i8) -> Result<()> {
        self.set_i8_at(field, 0, value)
    }

    pub fn set_i8_at(&mut self, field: FieldRef, index: usize, value: i8) -> Result<()> {
        self.write_signed(field, index, 1, "i8", value as i64)
    }

    pub fn set_i16(&mut self, field: FieldRef, value: i16) -> Result<()> {
        self.set_i16_at(field, 0, value)
    }

    pub fn set_i16_at(&mut self, field: FieldRef, index: usize, value: i16) -> Result<()> {
        self.write_signed(field, index, 2, "i16", value as i64)
    }

    pub fn set_i32(&mut self, field: FieldRef, value: i32) -> Result<()> {
        self.set_i32_at(field, 0, value)
    }

    pub fn set_i32_at(&mut self, field: FieldRef, index: usize, value: i32) -> Result<()> {
        self.write_signed(field, index, 4, "i32", value as i64)
    }

    pub fn set_i64(&mut self, field: FieldRef, value: i64) -> Result<()> {
        self.set_i64_at(field, 0, value)
    }

    pub fn set_i64_at(&mut self, field: FieldRef, index: usize, value: i64) -> Result<()> {
        self.write_signed(field, index, 8, "i64", value)
    }

    pub fn set_f32(&mut self, field: FieldRef, value: f32) -> Result<()> {
        self.set_f32_at(field, 0, value)
    }

    pub fn set_f32_at(&mut self, field: FieldRef, index: usize, value: f32) -> Result<()> {
        self.write_float(field, index, 4, "f32", value as f64)
    }

    pub fn set_f64(&mut self, field: FieldRef, value: f64) -> Result<()> {
        self.set_f64_at(field, 0, value)
    }

    pub fn set_f64_at(&mut self, field: FieldRef, index: usize, value: f64) -> Result<()> {
        self.write_float(field, index, 8, "f64", value)
    }

    pub fn set_byte(&mut self, field: FieldRef, value: u8) -> Result<()> {
        self.set_u8(field, value)
    }

    pub fn set_char(&mut self, field: FieldRef, value: char) -> Result<()> {
        self.set_char_at(field, 0, value)
    }

    pub fn set_char_at(&mut self, field: FieldRef, index: usize, value: char) -> Result<()> {
        let off = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.constant().is_some()
                || (self.reg.safe_mode() && f.encoded_type() != FieldType::Char)
            {
                return Err(type_mismatch(f, "char"));
            }
            if !value.is_ascii() {
                return Err(type_mismatch(f, "char"));
            }
            view.fixed_slot_offset(field, f, index)?
        };
        layout::ensure_within(self.data, off + 1)?;
        self.data[off] = value as u8;
        Ok(())
    }

    /// Writes a string into a Char-array field, NUL-padding the remainder.
    /// The string must fit the declared array length.
    pub fn set_string(&mut self, field: FieldRef, value: &str) -> Result<()> {
        let (off, cap) = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.constant().is_some()
                || (self.reg.safe_mode() && f.encoded_type() != FieldType::Char)
            {
                return Err(type_mismatch(f, "string"));
            }
            if value.len() > f.array_len() {
                return Err(type_mismatch(f, "string"));
            }
            (
                self.base + self.definition().fixed_offset(field.index),
                f.array_len(),
            )
        };
        layout::ensure_within(self.data, off + cap)?;
        self.data[off..off + value.len()].copy_from_slice(value.as_bytes());
        self.data[off + value.len()..off + cap].fill(0);
        Ok(())
    }

    /// Writes the raw encoded value of an enum field.
    pub fn set_enum_value(&mut self, field: FieldRef, value: u64) -> Result<()> {
        let order = self.reg.schema().byte_order();
        let (off, size) = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.field_type() != FieldType::Enum {
                return Err(type_mismatch(f, "enum"));
            }
            let enc = f.encoded_type();
            if self.reg.safe_mode() && enc.is_unsigned() && value > enc.unsigned_max() {
                return Err(type_mismatch(f, "enum"));
            }
            (
                view.fixed_slot_offset(field, f, 0)?,
                enc.fixed_size().unwrap_or(0),
            )
        };
        store_uint(self.data, off, size, order, value)
    }

    /// Sets or clears a named choice bit of a Set field.
    pub fn set_choice(&mut self, field: FieldRef, choice: &str, on: bool) -> Result<()> {
        let order = self.reg.schema().byte_order();
        let (off, size, bit) = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.field_type() != FieldType::Set {
                return Err(type_mismatch(f, "choice"));
            }
            let bit = f
                .choices()
                .iter()
                .find(|c| c.name == choice)
                .map(|c| c.bit)
                .ok_or_else(|| CodecError::UnknownField {
                    group: f.name().to_string(),
                    field: choice.to_string(),
                })?;
            (
                view.fixed_slot_offset(field, f, 0)?,
                f.encoded_type().fixed_size().unwrap_or(0),
                bit,
            )
        };
        let mut raw = load_uint(self.data, off, size, order)?;
        if on {
            raw |= 1 << bit;
        } else {
            raw &= !(1 << bit);
        }
        store_uint(self.data, off, size, order, raw)
    }

    /// Replaces a variable-length field's payload. A length change relocates
    /// every byte of the store located after the payload; the length is
    /// validated against the length control width before any byte moves.
    pub fn set_raw(&mut self, field: FieldRef, bytes: &[u8]) -> Result<()> {
        let schema = self.reg.schema();
        let vh = *schema.var_header();
        let order = schema.byte_order();
        let header = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.field_type() != FieldType::Raw {
                return Err(type_mismatch(f, "raw"));
            }
            layout::raw_header_offset(schema, self.def, view.data, self.base, field.index)?
        };
        eyre::ensure!(
            bytes.len() as u64 <= vh.length.unsigned_max(),
            "payload length {} exceeds {:?} length control",
            bytes.len(),
            vh.length
        );
        let cur = read_uint(self.data, header + vh.length_offset(), vh.length, order)? as usize;
        let payload = header + vh.encoded_len();
        layout::ensure_within(self.data, payload + cur)?;
        if bytes.len() > cur {
            layout::open_gap(self.data, payload + cur, bytes.len() - cur);
        } else if cur > bytes.len() {
            layout::close_gap(self.data, payload + bytes.len(), cur - bytes.len());
        }
        write_uint(
            self.data,
            header + vh.length_offset(),
            vh.length,
            order,
            bytes.len() as u64,
        )?;
        self.data[payload..payload + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// Convenience for string payloads in variable-length fields.
    pub fn set_raw_str(&mut self, field: FieldRef, value: &str) -> Result<()> {
        self.set_raw(field, value.as_bytes())
    }

    /// Mutable navigation into a composite. Writing members never relocates:
    /// composite size is invariant.
    pub fn composite_mut(&mut self, field: FieldRef) -> Result<GroupViewMut<'_>> {
        let (child, base) = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.field_type() != FieldType::Composite {
                return Err(type_mismatch(f, "composite"));
            }
            (
                f.child()?,
                self.base + self.definition().fixed_offset(field.index),
            )
        };
        Ok(GroupViewMut {
            reg: self.reg,
            def: child,
            data: self.data,
            base,
        })
    }

    pub fn group_array(&self, field: FieldRef) -> Result<GroupArray<'_>> {
        self.as_view().group_array(field)
    }

    /// Mutable row array of a repeating-group field — the only path to
    /// adding and deleting occurrences.
    pub fn group_array_mut(&mut self, field: FieldRef) -> Result<GroupArrayMut<'_>> {
        let (child, header_base) = {
            let view = self.as_view();
            let f = view.resolve(field)?;
            if f.field_type() != FieldType::Group {
                return Err(type_mismatch(f, "group"));
            }
            (
                f.child()?,
                layout::group_header_offset(
                    self.reg.schema(),
                    self.def,
                    view.data,
                    self.base,
                    field.index,
                )?,
            )
        };
        Ok(GroupArrayMut {
            reg: self.reg,
            def: child,
            header_base,
            data: self.data,
        })
    }
}
