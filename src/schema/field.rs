//! # Schema Definition Tree
//!
//! Immutable field/group definitions, built once per schema and shared by
//! every view over every buffer. Nodes live in an arena (`Vec<GroupDef>`
//! addressed by `GroupIdx`); parents are stored indices, not owning
//! references, so the tree has no cycles to manage.
//!
//! ## Precomputed Layout
//!
//! Each `GroupDef` pre-computes, in the manner of a record schema:
//!
//! - `fixed_offsets`: byte offset of each child within the fixed block
//!   (prefix sums over fixed-size children; Group/Raw children contribute 0)
//! - `fixed_size`: the group's block length (fixed-size children only)
//! - `group_fields` / `raw_fields`: declaration-order index lists of the
//!   variable children, driving the recursive size walk
//!
//! Child order is the wire order and is load-bearing: groups encode after the
//! fixed block, raw fields after all groups, each in declaration order.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::schema::headers::{ByteOrder, GroupHeaderDef, MessageHeaderDef, VarHeaderDef};
use crate::schema::types::FieldType;

/// Arena index of a `GroupDef` (message, repeating-group template, or
/// composite member list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupIdx(pub(crate) u32);

/// Copyable handle to a field within a specific group definition.
///
/// Obtained from `GroupView::field`/`field_by_id`; in safe mode every accessor
/// verifies the handle belongs to the view's definition before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub(crate) group: GroupIdx,
    pub(crate) index: usize,
}

/// Schema-declared literal for Constant fields. The value never occupies
/// buffer bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Str(String),
}

/// One raw-value-to-symbolic-name mapping of an Enum field.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub value: u64,
    pub name: String,
}

/// One named bit position of a Set (choice bitset) field.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub name: String,
    pub bit: u8,
}

/// Immutable schema-time field definition, owned by its parent group.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub(crate) id: u32,
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    /// Element count within one encoded block (not group occurrences).
    pub(crate) array_len: usize,
    /// Underlying primitive for Enum/Set fields; equals `field_type` otherwise.
    pub(crate) encoding: FieldType,
    /// Child definition for Group and Composite fields.
    pub(crate) child: Option<GroupIdx>,
    pub(crate) enum_values: Vec<EnumValue>,
    pub(crate) choices: Vec<Choice>,
    pub(crate) constant: Option<ConstValue>,
}

impl FieldDef {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn array_len(&self) -> usize {
        self.array_len
    }

    pub fn enum_values(&self) -> &[EnumValue] {
        &self.enum_values
    }

    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    pub fn constant(&self) -> Option<&ConstValue> {
        self.constant.as_ref()
    }

    /// Primitive type actually encoded in the buffer for this field.
    pub(crate) fn encoded_type(&self) -> FieldType {
        match self.field_type {
            FieldType::Enum | FieldType::Set => self.encoding,
            t => t,
        }
    }

    pub(crate) fn child(&self) -> eyre::Result<GroupIdx> {
        self.child
            .ok_or_else(|| eyre::eyre!("field '{}' has no child definition", self.name))
    }

    /// Bytes this field occupies in its group's fixed block. Group, Raw and
    /// Constant fields contribute zero at schema time.
    pub(crate) fn slot_size_in(&self, groups: &[GroupDef]) -> usize {
        match self.field_type {
            FieldType::Raw | FieldType::Group | FieldType::Constant | FieldType::Message => 0,
            FieldType::Enum | FieldType::Set => self.encoding.fixed_size().unwrap_or(0),
            FieldType::Composite => self
                .child
                .map(|c| groups[c.0 as usize].fixed_size)
                .unwrap_or(0),
            t => t.fixed_size().unwrap_or(0) * self.array_len,
        }
    }
}

/// Ordered child sequence forming one nesting level: the enclosing message,
/// one repeating-group occurrence template, or a composite's member list.
#[derive(Debug, Clone)]
pub struct GroupDef {
    pub(crate) id: u64,
    pub(crate) name: String,
    pub(crate) parent: Option<GroupIdx>,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) fixed_offsets: Vec<usize>,
    pub(crate) fixed_size: usize,
    pub(crate) group_fields: SmallVec<[usize; 4]>,
    pub(crate) raw_fields: SmallVec<[usize; 4]>,
    pub(crate) by_id: HashMap<u32, usize>,
    pub(crate) by_name: HashMap<String, usize>,
}

impl GroupDef {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<GroupIdx> {
        self.parent
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Block length: sum of the fixed-size children only.
    pub fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    pub fn field_index_by_name(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn field_index_by_id(&self, id: u32) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub(crate) fn fixed_offset(&self, index: usize) -> usize {
        self.fixed_offsets[index]
    }
}

/// Complete immutable schema: the definition arena plus framing configuration.
///
/// Built once via [`SchemaBuilder`](crate::schema::SchemaBuilder) and safe to
/// share across threads (no interior mutability).
#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) groups: Vec<GroupDef>,
    pub(crate) templates: HashMap<u64, GroupIdx>,
    pub(crate) byte_order: ByteOrder,
    pub(crate) schema_id: u64,
    pub(crate) version: u64,
    pub(crate) message_header: MessageHeaderDef,
    pub(crate) group_header: GroupHeaderDef,
    pub(crate) var_header: VarHeaderDef,
}

impl Schema {
    pub fn group(&self, idx: GroupIdx) -> &GroupDef {
        &self.groups[idx.0 as usize]
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn schema_id(&self) -> u64 {
        self.schema_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn message_header(&self) -> &MessageHeaderDef {
        &self.message_header
    }

    pub fn group_header(&self) -> &GroupHeaderDef {
        &self.group_header
    }

    pub fn var_header(&self) -> &VarHeaderDef {
        &self.var_header
    }

    /// Message definition registered under a template id, if any.
    pub fn template(&self, template_id: u64) -> Option<GroupIdx> {
        self.templates.get(&template_id).copied()
    }

    pub fn template_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.templates.keys().copied()
    }
}
