//! # SchemaBuilder — Definition Tree Construction
//!
//! Programmatic construction of the immutable [`Schema`]. An external schema
//! loader (XML or otherwise) drives this builder; the core never parses a
//! schema file itself.
//!
//! ## Usage
//!
//! ```ignore
//! let schema = SchemaBuilder::new(1, 0)
//!     .add_message(1, "car")?
//!     .add_field(1, "serial", FieldType::U64)?
//!     .begin_group(2, "fuelFigures")?
//!     .add_field(3, "speed", FieldType::U16)?
//!     .add_field(4, "mpg", FieldType::Float)?
//!     .end_group()?
//!     .add_raw_field(5, "manufacturer")?
//!     .end_message()?
//!     .build()?;
//! ```
//!
//! Declaration order is wire order. Validation happens at add time (nesting
//! rules, type classes) and at seal time (unique sibling ids and names);
//! failures are construction-time errors, not codec error classes — the tree
//! is built once per schema and lives for the process.

use eyre::{bail, ensure, Result};
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::schema::field::{
    Choice, ConstValue, EnumValue, FieldDef, GroupDef, GroupIdx, Schema,
};
use crate::schema::headers::{ByteOrder, GroupHeaderDef, MessageHeaderDef, VarHeaderDef};
use crate::schema::types::FieldType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Message,
    Group,
    Composite,
}

#[derive(Debug)]
struct Frame {
    idx: GroupIdx,
    kind: FrameKind,
}

/// Builder for the immutable schema definition tree.
#[derive(Debug)]
pub struct SchemaBuilder {
    schema_id: u64,
    version: u64,
    byte_order: ByteOrder,
    message_header: MessageHeaderDef,
    group_header: GroupHeaderDef,
    var_header: VarHeaderDef,
    groups: Vec<GroupDef>,
    templates: HashMap<u64, GroupIdx>,
    stack: Vec<Frame>,
}

impl SchemaBuilder {
    pub fn new(schema_id: u64, version: u64) -> Self {
        Self {
            schema_id,
            version,
            byte_order: ByteOrder::default(),
            message_header: MessageHeaderDef::default(),
            group_header: GroupHeaderDef::default(),
            var_header: VarHeaderDef::default(),
            groups: Vec::new(),
            templates: HashMap::new(),
            stack: Vec::new(),
        }
    }

    pub fn byte_order(&mut self, order: ByteOrder) -> &mut Self {
        self.byte_order = order;
        self
    }

    pub fn message_header(&mut self, header: MessageHeaderDef) -> Result<&mut Self> {
        for width in [
            header.block_length,
            header.template_id,
            header.schema_id,
            header.version,
        ] {
            ensure!(
                width.is_header_control(),
                "{:?} is not a valid header control width",
                width
            );
        }
        self.message_header = header;
        Ok(self)
    }

    pub fn group_header(&mut self, header: GroupHeaderDef) -> Result<&mut Self> {
        for width in [header.block_length, header.num_in_group] {
            ensure!(
                width.is_header_control(),
                "{:?} is not a valid header control width",
                width
            );
        }
        self.group_header = header;
        Ok(self)
    }

    pub fn var_header(&mut self, header: VarHeaderDef) -> Result<&mut Self> {
        ensure!(
            header.length.is_header_control(),
            "{:?} is not a valid header control width",
            header.length
        );
        self.var_header = header;
        Ok(self)
    }

    /// Opens a message-level group registered under `template_id`.
    pub fn add_message(&mut self, template_id: u64, name: &str) -> Result<&mut Self> {
        ensure!(
            self.stack.is_empty(),
            "add_message inside an open definition"
        );
        ensure!(
            !self.templates.contains_key(&template_id),
            "template id {} already registered",
            template_id
        );
        let idx = self.new_group(template_id, name, None);
        self.templates.insert(template_id, idx);
        self.stack.push(Frame {
            idx,
            kind: FrameKind::Message,
        });
        Ok(self)
    }

    pub fn end_message(&mut self) -> Result<&mut Self> {
        let frame = self.pop_frame(FrameKind::Message)?;
        self.seal(frame.idx)?;
        Ok(self)
    }

    /// Appends a fixed-width scalar field.
    pub fn add_field(&mut self, id: u32, name: &str, ty: FieldType) -> Result<&mut Self> {
        self.add_array_field(id, name, ty, 1)
    }

    /// Appends a fixed-width field repeated `len` times within the block.
    pub fn add_array_field(
        &mut self,
        id: u32,
        name: &str,
        ty: FieldType,
        len: usize,
    ) -> Result<&mut Self> {
        ensure!(
            ty.fixed_size().is_some(),
            "field '{}': {:?} is not a fixed-width primitive",
            name,
            ty
        );
        ensure!(len >= 1, "field '{}': array length must be >= 1", name);
        self.push_field(FieldDef {
            id,
            name: name.to_string(),
            field_type: ty,
            array_len: len,
            encoding: ty,
            child: None,
            enum_values: Vec::new(),
            choices: Vec::new(),
            constant: None,
        })?;
        Ok(self)
    }

    /// Appends a constant field; the value lives in the schema and occupies
    /// zero buffer bytes.
    pub fn add_constant(&mut self, id: u32, name: &str, value: ConstValue) -> Result<&mut Self> {
        self.push_field(FieldDef {
            id,
            name: name.to_string(),
            field_type: FieldType::Constant,
            array_len: 1,
            encoding: FieldType::Constant,
            child: None,
            enum_values: Vec::new(),
            choices: Vec::new(),
            constant: Some(value),
        })?;
        Ok(self)
    }

    /// Appends an enum field encoded as `encoding`, mapping raw values to
    /// symbolic names.
    pub fn add_enum_field(
        &mut self,
        id: u32,
        name: &str,
        encoding: FieldType,
        values: &[(u64, &str)],
    ) -> Result<&mut Self> {
        ensure!(
            encoding.is_unsigned() || encoding.is_signed() || encoding == FieldType::Char,
            "enum '{}': {:?} is not a valid encoding",
            name,
            encoding
        );
        self.push_field(FieldDef {
            id,
            name: name.to_string(),
            field_type: FieldType::Enum,
            array_len: 1,
            encoding,
            child: None,
            enum_values: values
                .iter()
                .map(|(v, n)| EnumValue {
                    value: *v,
                    name: n.to_string(),
                })
                .collect(),
            choices: Vec::new(),
            constant: None,
        })?;
        Ok(self)
    }

    /// Appends a choice-bitset field encoded as `encoding`, mapping choice
    /// names to bit positions.
    pub fn add_set_field(
        &mut self,
        id: u32,
        name: &str,
        encoding: FieldType,
        choices: &[(&str, u8)],
    ) -> Result<&mut Self> {
        ensure!(
            encoding.is_unsigned(),
            "set '{}': {:?} is not a valid encoding",
            name,
            encoding
        );
        let width_bits = encoding.fixed_size().unwrap_or(0) * 8;
        for (n, bit) in choices {
            ensure!(
                (*bit as usize) < width_bits,
                "set '{}': choice '{}' bit {} exceeds {:?} width",
                name,
                n,
                bit,
                encoding
            );
        }
        self.push_field(FieldDef {
            id,
            name: name.to_string(),
            field_type: FieldType::Set,
            array_len: 1,
            encoding,
            child: None,
            enum_values: Vec::new(),
            choices: choices
                .iter()
                .map(|(n, bit)| Choice {
                    name: n.to_string(),
                    bit: *bit,
                })
                .collect(),
            constant: None,
        })?;
        Ok(self)
    }

    /// Appends a variable-length byte field (length-prefixed payload).
    pub fn add_raw_field(&mut self, id: u32, name: &str) -> Result<&mut Self> {
        ensure!(
            self.current_kind()? != FrameKind::Composite,
            "raw field '{}' not allowed inside a composite",
            name
        );
        self.push_field(FieldDef {
            id,
            name: name.to_string(),
            field_type: FieldType::Raw,
            array_len: 1,
            encoding: FieldType::Raw,
            child: None,
            enum_values: Vec::new(),
            choices: Vec::new(),
            constant: None,
        })?;
        Ok(self)
    }

    /// Opens a fixed-size nested member list addressed transparently like
    /// inline fields.
    pub fn begin_composite(&mut self, id: u32, name: &str) -> Result<&mut Self> {
        let parent = self.current_frame()?.idx;
        let idx = self.new_group(id as u64, name, Some(parent));
        self.push_field(FieldDef {
            id,
            name: name.to_string(),
            field_type: FieldType::Composite,
            array_len: 1,
            encoding: FieldType::Composite,
            child: Some(idx),
            enum_values: Vec::new(),
            choices: Vec::new(),
            constant: None,
        })?;
        self.stack.push(Frame {
            idx,
            kind: FrameKind::Composite,
        });
        Ok(self)
    }

    pub fn end_composite(&mut self) -> Result<&mut Self> {
        let frame = self.pop_frame(FrameKind::Composite)?;
        self.seal(frame.idx)?;
        Ok(self)
    }

    /// Opens a repeating group; the children form the per-occurrence template.
    pub fn begin_group(&mut self, id: u32, name: &str) -> Result<&mut Self> {
        ensure!(
            self.current_kind()? != FrameKind::Composite,
            "group '{}' not allowed inside a composite",
            name
        );
        let parent = self.current_frame()?.idx;
        let idx = self.new_group(id as u64, name, Some(parent));
        self.push_field(FieldDef {
            id,
            name: name.to_string(),
            field_type: FieldType::Group,
            array_len: 1,
            encoding: FieldType::Group,
            child: Some(idx),
            enum_values: Vec::new(),
            choices: Vec::new(),
            constant: None,
        })?;
        self.stack.push(Frame {
            idx,
            kind: FrameKind::Group,
        });
        Ok(self)
    }

    pub fn end_group(&mut self) -> Result<&mut Self> {
        let frame = self.pop_frame(FrameKind::Group)?;
        self.seal(frame.idx)?;
        Ok(self)
    }

    pub fn build(&mut self) -> Result<Schema> {
        ensure!(
            self.stack.is_empty(),
            "build with {} unclosed definition(s)",
            self.stack.len()
        );
        Ok(Schema {
            groups: std::mem::take(&mut self.groups),
            templates: std::mem::take(&mut self.templates),
            byte_order: self.byte_order,
            schema_id: self.schema_id,
            version: self.version,
            message_header: self.message_header,
            group_header: self.group_header,
            var_header: self.var_header,
        })
    }

    fn new_group(&mut self, id: u64, name: &str, parent: Option<GroupIdx>) -> GroupIdx {
        let idx = GroupIdx(self.groups.len() as u32);
        self.groups.push(GroupDef {
            id,
            name: name.to_string(),
            parent,
            fields: Vec::new(),
            fixed_offsets: Vec::new(),
            fixed_size: 0,
            group_fields: SmallVec::new(),
            raw_fields: SmallVec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
        });
        idx
    }

    fn current_frame(&self) -> Result<&Frame> {
        self.stack
            .last()
            .ok_or_else(|| eyre::eyre!("no open message/group/composite definition"))
    }

    fn current_kind(&self) -> Result<FrameKind> {
        Ok(self.current_frame()?.kind)
    }

    fn pop_frame(&mut self, expected: FrameKind) -> Result<Frame> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| eyre::eyre!("no open definition to close"))?;
        if frame.kind != expected {
            bail!(
                "mismatched close: expected {:?}, found {:?}",
                expected,
                frame.kind
            );
        }
        Ok(frame)
    }

    fn push_field(&mut self, field: FieldDef) -> Result<()> {
        let idx = self.current_frame()?.idx;
        self.groups[idx.0 as usize].fields.push(field);
        Ok(())
    }

    /// Computes prefix-sum offsets, block length and variable-child lists;
    /// checks sibling id/name uniqueness. Children are complete at this point
    /// (nested definitions close before their parent).
    fn seal(&mut self, idx: GroupIdx) -> Result<()> {
        let slot_sizes: Vec<usize> = self.groups[idx.0 as usize]
            .fields
            .iter()
            .map(|f| f.slot_size_in(&self.groups))
            .collect();

        let g = &mut self.groups[idx.0 as usize];
        let group_name = g.name.clone();
        let mut offset = 0usize;
        for i in 0..g.fields.len() {
            let field_id = g.fields[i].id;
            let field_name = g.fields[i].name.clone();
            let field_type = g.fields[i].field_type;
            if g.by_id.insert(field_id, i).is_some() {
                bail!("duplicate field id {} in group '{}'", field_id, group_name);
            }
            if g.by_name.insert(field_name.clone(), i).is_some() {
                bail!(
                    "duplicate field name '{}' in group '{}'",
                    field_name,
                    group_name
                );
            }
            g.fixed_offsets.push(offset);
            match field_type {
                FieldType::Group => g.group_fields.push(i),
                FieldType::Raw => g.raw_fields.push(i),
                _ => offset += slot_sizes[i],
            }
        }
        g.fixed_size = offset;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_offsets_are_prefix_sums() {
        let schema = {
            let mut b = SchemaBuilder::new(7, 1);
            b.add_message(1, "m")
                .unwrap()
                .add_field(1, "a", FieldType::U16)
                .unwrap()
                .add_field(2, "b", FieldType::U64)
                .unwrap()
                .add_array_field(3, "c", FieldType::Char, 6)
                .unwrap()
                .end_message()
                .unwrap()
                .build()
                .unwrap()
        };
        let root = schema.template(1).unwrap();
        let g = schema.group(root);
        assert_eq!(g.fixed_offset(0), 0);
        assert_eq!(g.fixed_offset(1), 2);
        assert_eq!(g.fixed_offset(2), 10);
        assert_eq!(g.fixed_size(), 16);
    }

    #[test]
    fn groups_and_raws_contribute_zero_at_schema_time() {
        let mut b = SchemaBuilder::new(7, 1);
        let schema = b
            .add_message(1, "m")
            .unwrap()
            .add_field(1, "a", FieldType::U32)
            .unwrap()
            .begin_group(2, "rows")
            .unwrap()
            .add_field(3, "v", FieldType::U16)
            .unwrap()
            .end_group()
            .unwrap()
            .add_raw_field(4, "blob")
            .unwrap()
            .add_field(5, "z", FieldType::U8)
            .unwrap()
            .end_message()
            .unwrap()
            .build()
            .unwrap();
        let g = schema.group(schema.template(1).unwrap());
        assert_eq!(g.fixed_size(), 5);
        // the fixed field after the group/raw keeps its prefix-sum offset
        assert_eq!(g.fixed_offset(3), 4);
        assert_eq!(g.group_fields.as_slice(), &[1]);
        assert_eq!(g.raw_fields.as_slice(), &[2]);
    }

    #[test]
    fn composite_size_is_fixed_sum_of_children() {
        let mut b = SchemaBuilder::new(7, 1);
        let schema = b
            .add_message(1, "m")
            .unwrap()
            .begin_composite(1, "engine")
            .unwrap()
            .add_field(2, "capacity", FieldType::U16)
            .unwrap()
            .add_field(3, "cylinders", FieldType::U8)
            .unwrap()
            .end_composite()
            .unwrap()
            .add_field(4, "after", FieldType::U32)
            .unwrap()
            .end_message()
            .unwrap()
            .build()
            .unwrap();
        let g = schema.group(schema.template(1).unwrap());
        assert_eq!(g.fixed_size(), 7);
        assert_eq!(g.fixed_offset(1), 3);
    }

    #[test]
    fn duplicate_sibling_ids_rejected() {
        let mut b = SchemaBuilder::new(7, 1);
        b.add_message(1, "m")
            .unwrap()
            .add_field(1, "a", FieldType::U16)
            .unwrap()
            .add_field(1, "b", FieldType::U16)
            .unwrap();
        assert!(b.end_message().is_err());
    }

    #[test]
    fn raw_and_group_rejected_inside_composite() {
        let mut b = SchemaBuilder::new(7, 1);
        b.add_message(1, "m")
            .unwrap()
            .begin_composite(1, "c")
            .unwrap();
        assert!(b.add_raw_field(2, "blob").is_err());
        assert!(b.begin_group(3, "rows").is_err());
    }

    #[test]
    fn constants_occupy_no_space() {
        let mut b = SchemaBuilder::new(7, 1);
        let schema = b
            .add_message(1, "m")
            .unwrap()
            .add_constant(1, "model", ConstValue::Str("G".into()))
            .unwrap()
            .add_field(2, "a", FieldType::U16)
            .unwrap()
            .end_message()
            .unwrap()
            .build()
            .unwrap();
        let g = schema.group(schema.template(1).unwrap());
        assert_eq!(g.fixed_size(), 2);
        assert_eq!(g.fixed_offset(1), 0);
    }
}
