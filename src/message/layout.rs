//! # Wire Layout Walker
//!
//! Shared offset and size computation over an encoded message. Nothing here
//! is cached: every walk combines the schema's precomputed fixed layout with
//! the framing headers currently in the buffer, so a walk performed after a
//! structural mutation always sees the mutated truth.
//!
//! Group body layout, recursively at every nesting level:
//!
//! ```text
//! | fixed block | group 0: header + occurrences | group 1: ... | raw 0: header + payload | raw 1: ... |
//! ```
//!
//! All functions bound-check declared lengths against the buffer and fail
//! with `TruncatedBuffer` before any caller moves a byte.

use eyre::Result;

use crate::error::CodecError;
use crate::schema::field::{GroupIdx, Schema};
use crate::schema::headers::{read_uint, write_uint};

pub(crate) fn ensure_within(data: &[u8], end: usize) -> Result<()> {
    if end > data.len() {
        return Err(CodecError::TruncatedBuffer {
            needed: end,
            available: data.len(),
        }
        .into());
    }
    Ok(())
}

/// Encoded size of one group body starting at `base`: fixed block plus all
/// nested group blocks and raw payloads, walked in wire order.
pub(crate) fn content_size(
    schema: &Schema,
    def: GroupIdx,
    data: &[u8],
    base: usize,
) -> Result<usize> {
    let g = schema.group(def);
    let vh = schema.var_header();
    let order = schema.byte_order();
    let mut end = base + g.fixed_size();
    ensure_within(data, end)?;
    for &i in &g.group_fields {
        let child = g.fields[i].child()?;
        end += group_block_size(schema, child, data, end)?;
    }
    for _ in &g.raw_fields {
        let len = read_uint(data, end + vh.length_offset(), vh.length, order)? as usize;
        end += vh.encoded_len() + len;
        ensure_within(data, end)?;
    }
    Ok(end - base)
}

/// Size of one repeating-group block (header plus every occurrence body),
/// with the group header at `header_base`.
pub(crate) fn group_block_size(
    schema: &Schema,
    template: GroupIdx,
    data: &[u8],
    header_base: usize,
) -> Result<usize> {
    let gh = schema.group_header();
    let count = read_uint(
        data,
        header_base + gh.num_in_group_offset(),
        gh.num_in_group,
        schema.byte_order(),
    )?;
    let mut end = header_base + gh.encoded_len();
    for _ in 0..count {
        end += content_size(schema, template, data, end)?;
    }
    Ok(end - header_base)
}

/// Offset of the group header of group child `target` (index into the
/// parent's field list), skipping preceding group blocks.
pub(crate) fn group_header_offset(
    schema: &Schema,
    def: GroupIdx,
    data: &[u8],
    base: usize,
    target: usize,
) -> Result<usize> {
    let g = schema.group(def);
    let mut off = base + g.fixed_size();
    for &i in &g.group_fields {
        if i == target {
            return Ok(off);
        }
        let child = g.fields[i].child()?;
        off += group_block_size(schema, child, data, off)?;
    }
    eyre::bail!(
        "field index {} is not a group child of '{}'",
        target,
        g.name()
    )
}

/// Offset of the var-length header of raw child `target`, skipping every
/// group block and all preceding raw fields.
pub(crate) fn raw_header_offset(
    schema: &Schema,
    def: GroupIdx,
    data: &[u8],
    base: usize,
    target: usize,
) -> Result<usize> {
    let g = schema.group(def);
    let vh = schema.var_header();
    let order = schema.byte_order();
    let mut off = base + g.fixed_size();
    for &i in &g.group_fields {
        let child = g.fields[i].child()?;
        off += group_block_size(schema, child, data, off)?;
    }
    for &i in &g.raw_fields {
        if i == target {
            return Ok(off);
        }
        let len = read_uint(data, off + vh.length_offset(), vh.length, order)? as usize;
        off += vh.encoded_len() + len;
    }
    eyre::bail!("field index {} is not a raw child of '{}'", target, g.name())
}

/// Byte length of an empty group body: zeroed fixed block plus one zeroed
/// framing header per nested group/raw child (nested groups read as zero
/// occurrences, nested raw fields as absent).
pub(crate) fn empty_content_len(schema: &Schema, def: GroupIdx) -> usize {
    let g = schema.group(def);
    g.fixed_size()
        + g.group_fields.len() * schema.group_header().encoded_len()
        + g.raw_fields.len() * schema.var_header().encoded_len()
}

/// Writes an empty group body at `base`: zero fixed block, nested group
/// headers with their template block length and zero count, nested var
/// headers with zero length. Returns the bytes written.
pub(crate) fn write_empty_content(
    schema: &Schema,
    def: GroupIdx,
    data: &mut [u8],
    base: usize,
) -> Result<usize> {
    let g = schema.group(def);
    let gh = schema.group_header();
    let vh = schema.var_header();
    let order = schema.byte_order();
    ensure_within(data, base + empty_content_len(schema, def))?;
    data[base..base + g.fixed_size()].fill(0);
    let mut off = base + g.fixed_size();
    for &i in &g.group_fields {
        let child = g.fields[i].child()?;
        write_uint(
            data,
            off + gh.block_length_offset(),
            gh.block_length,
            order,
            schema.group(child).fixed_size() as u64,
        )?;
        write_uint(
            data,
            off + gh.num_in_group_offset(),
            gh.num_in_group,
            order,
            0,
        )?;
        off += gh.encoded_len();
    }
    for _ in &g.raw_fields {
        write_uint(data, off + vh.length_offset(), vh.length, order, 0)?;
        off += vh.encoded_len();
    }
    Ok(off - base)
}

/// End offset of the whole message's currently valid content (header plus
/// root body), re-derived from the buffer on every call.
pub(crate) fn message_end(
    schema: &Schema,
    root: GroupIdx,
    data: &[u8],
    msg_origin: usize,
) -> Result<usize> {
    let content = msg_origin + schema.message_header().encoded_len();
    Ok(content + content_size(schema, root, data, content)?)
}

/// Inserts `len` zero bytes at `at`, growing the store and shifting every
/// byte from `at` to the end of the store right. The single contiguous move
/// keeps everything after the mutation point intact relative to each other,
/// including content packed after the mutated message.
pub(crate) fn open_gap(data: &mut Vec<u8>, at: usize, len: usize) {
    let old_len = data.len();
    data.resize(old_len + len, 0);
    data.copy_within(at..old_len, at + len);
    data[at..at + len].fill(0);
}

/// Removes the `len` bytes at `at`, shifting everything after them left and
/// shrinking the store. Content packed after the mutated message relocates
/// intact; the store stays gap-free.
pub(crate) fn close_gap(data: &mut Vec<u8>, at: usize, len: usize) {
    let old_len = data.len();
    data.copy_within(at + len..old_len, at);
    data.truncate(old_len - len);
}
