//! # Framing Header Templates
//!
//! Fixed-width control fields placed immediately before the content they
//! frame:
//!
//! ```text
//! MessageHeader: | blockLength | templateId | schemaId | version |
//! GroupHeader:   | blockLength | numInGroup |
//! VarHeader:     | length |
//! ```
//!
//! Every control field width is schema-configured (any unsigned integer
//! width), as is the byte order, so decode goes through width-generic
//! `read_uint`/`write_uint` helpers rather than fixed `#[repr(C)]` layouts.
//! Both helpers bound-check against the buffer and fail with
//! [`CodecError::TruncatedBuffer`] before touching any byte.

use eyre::Result;

use crate::error::CodecError;
use crate::schema::types::FieldType;

/// Byte order applied to every multi-byte value in a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

/// Loads an unsigned value of `size` bytes (1, 2, 4 or 8) at `offset`.
pub(crate) fn load_uint(data: &[u8], offset: usize, size: usize, order: ByteOrder) -> Result<u64> {
    let end = offset.checked_add(size).ok_or(CodecError::TruncatedBuffer {
        needed: usize::MAX,
        available: data.len(),
    })?;
    if end > data.len() {
        return Err(CodecError::TruncatedBuffer {
            needed: end,
            available: data.len(),
        }
        .into());
    }
    let b = &data[offset..end];
    let value = match (size, order) {
        (1, _) => b[0] as u64,
        (2, ByteOrder::LittleEndian) => u16::from_le_bytes([b[0], b[1]]) as u64,
        (2, ByteOrder::BigEndian) => u16::from_be_bytes([b[0], b[1]]) as u64,
        (4, ByteOrder::LittleEndian) => u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as u64,
        (4, ByteOrder::BigEndian) => u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64,
        (8, ByteOrder::LittleEndian) => {
            u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        }
        (8, ByteOrder::BigEndian) => {
            u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        }
        _ => eyre::bail!("unsupported encoded width {}", size),
    };
    Ok(value)
}

/// Stores the `size` low-order bytes of `value` at `offset`. High-order bytes
/// beyond `size` are dropped; callers validate ranges where that matters.
pub(crate) fn store_uint(
    data: &mut [u8],
    offset: usize,
    size: usize,
    order: ByteOrder,
    value: u64,
) -> Result<()> {
    let end = offset + size;
    if end > data.len() {
        return Err(CodecError::TruncatedBuffer {
            needed: end,
            available: data.len(),
        }
        .into());
    }
    match (size, order) {
        (1, _) => data[offset] = value as u8,
        (2, ByteOrder::LittleEndian) => {
            data[offset..end].copy_from_slice(&(value as u16).to_le_bytes())
        }
        (2, ByteOrder::BigEndian) => {
            data[offset..end].copy_from_slice(&(value as u16).to_be_bytes())
        }
        (4, ByteOrder::LittleEndian) => {
            data[offset..end].copy_from_slice(&(value as u32).to_le_bytes())
        }
        (4, ByteOrder::BigEndian) => {
            data[offset..end].copy_from_slice(&(value as u32).to_be_bytes())
        }
        (8, ByteOrder::LittleEndian) => data[offset..end].copy_from_slice(&value.to_le_bytes()),
        (8, ByteOrder::BigEndian) => data[offset..end].copy_from_slice(&value.to_be_bytes()),
        _ => eyre::bail!("unsupported encoded width {}", size),
    }
    Ok(())
}

/// Reads an unsigned header control field at `offset`.
pub(crate) fn read_uint(
    data: &[u8],
    offset: usize,
    width: FieldType,
    order: ByteOrder,
) -> Result<u64> {
    load_uint(data, offset, control_width(width), order)
}

/// Writes an unsigned header control field at `offset`. The value must fit
/// the control width; callers validate ranges before relocation starts.
pub(crate) fn write_uint(
    data: &mut [u8],
    offset: usize,
    width: FieldType,
    order: ByteOrder,
    value: u64,
) -> Result<()> {
    eyre::ensure!(
        value <= width.unsigned_max(),
        "value {} exceeds {:?} control field range",
        value,
        width
    );
    store_uint(data, offset, control_width(width), order, value)
}

fn control_width(width: FieldType) -> usize {
    // Builder validation guarantees header controls are U8/U16/U32/U64.
    width.fixed_size().unwrap_or(0)
}

/// Control field widths of the header preceding every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeaderDef {
    pub block_length: FieldType,
    pub template_id: FieldType,
    pub schema_id: FieldType,
    pub version: FieldType,
}

impl Default for MessageHeaderDef {
    fn default() -> Self {
        Self {
            block_length: FieldType::U16,
            template_id: FieldType::U16,
            schema_id: FieldType::U16,
            version: FieldType::U16,
        }
    }
}

impl MessageHeaderDef {
    pub fn encoded_len(&self) -> usize {
        control_width(self.block_length)
            + control_width(self.template_id)
            + control_width(self.schema_id)
            + control_width(self.version)
    }

    pub fn block_length_offset(&self) -> usize {
        0
    }

    pub fn template_id_offset(&self) -> usize {
        control_width(self.block_length)
    }

    pub fn schema_id_offset(&self) -> usize {
        self.template_id_offset() + control_width(self.template_id)
    }

    pub fn version_offset(&self) -> usize {
        self.schema_id_offset() + control_width(self.schema_id)
    }
}

/// Control field widths of the header preceding each repeating group's
/// occurrence block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupHeaderDef {
    pub block_length: FieldType,
    pub num_in_group: FieldType,
}

impl Default for GroupHeaderDef {
    fn default() -> Self {
        Self {
            block_length: FieldType::U16,
            num_in_group: FieldType::U16,
        }
    }
}

impl GroupHeaderDef {
    pub fn encoded_len(&self) -> usize {
        control_width(self.block_length) + control_width(self.num_in_group)
    }

    pub fn block_length_offset(&self) -> usize {
        0
    }

    pub fn num_in_group_offset(&self) -> usize {
        control_width(self.block_length)
    }
}

/// Control field width of the header preceding each variable-length payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarHeaderDef {
    pub length: FieldType,
}

impl Default for VarHeaderDef {
    fn default() -> Self {
        Self {
            length: FieldType::U16,
        }
    }
}

impl VarHeaderDef {
    pub fn encoded_len(&self) -> usize {
        control_width(self.length)
    }

    pub fn length_offset(&self) -> usize {
        0
    }
}
