//! # Registry — Codec Entry Point
//!
//! A [`Registry`] binds one immutable [`Schema`] to a validation mode and
//! hands out buffer views. It owns no buffers itself: callers bring their own
//! byte store and the registry frames messages inside it.
//!
//! Two entry operations:
//!
//! - [`Registry::wrap`] / [`Registry::wrap_mut`]: attach to an existing
//!   encoded message. A schema-id or template-id mismatch is an expected
//!   outcome (`Ok(None)`), not an error; a header that does not fit the
//!   buffer is `TruncatedBuffer`.
//! - [`Registry::create`]: frame a fresh empty message at an offset, writing
//!   the message header and an empty body (zero fixed block, nested group
//!   headers with zero occurrences, var headers with zero length) so every
//!   subsequent size walk reads defined bytes.

use eyre::Result;

use crate::message::layout;
use crate::message::view::{GroupView, GroupViewMut};
use crate::schema::field::Schema;
use crate::schema::headers::{read_uint, write_uint};

/// Schema-bound codec handle. Cheap to share by reference; all state is
/// immutable after construction.
#[derive(Debug, Clone)]
pub struct Registry {
    schema: Schema,
    safe_mode: bool,
}

impl Registry {
    /// Registry with safe mode on: accessors validate field/view pairing and
    /// type/width compatibility.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            safe_mode: true,
        }
    }

    /// Explicitly chosen validation mode. With safe mode off, per-access
    /// type checks are skipped; index and truncation checks remain.
    pub fn with_safe_mode(schema: Schema, safe_mode: bool) -> Self {
        Self { schema, safe_mode }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    /// Attaches a read-only view to the message encoded at `offset`.
    ///
    /// Returns `Ok(None)` when the header carries a different schema id or an
    /// unknown template id, so callers can probe heterogeneous stores without
    /// error plumbing.
    pub fn wrap<'a>(&'a self, data: &'a [u8], offset: usize) -> Result<Option<GroupView<'a>>> {
        let mh = self.schema.message_header();
        let order = self.schema.byte_order();
        layout::ensure_within(data, offset + mh.encoded_len())?;
        let schema_id = read_uint(data, offset + mh.schema_id_offset(), mh.schema_id, order)?;
        if schema_id != self.schema.schema_id() {
            return Ok(None);
        }
        let template_id =
            read_uint(data, offset + mh.template_id_offset(), mh.template_id, order)?;
        let Some(root) = self.schema.template(template_id) else {
            return Ok(None);
        };
        Ok(Some(GroupView {
            reg: self,
            def: root,
            data,
            base: offset + mh.encoded_len(),
        }))
    }

    /// Attaches a mutable view to the message encoded at `offset`, with the
    /// same mismatch semantics as [`wrap`](Registry::wrap).
    pub fn wrap_mut<'a>(
        &'a self,
        data: &'a mut Vec<u8>,
        offset: usize,
    ) -> Result<Option<GroupViewMut<'a>>> {
        let mh = self.schema.message_header();
        let order = self.schema.byte_order();
        layout::ensure_within(data, offset + mh.encoded_len())?;
        let schema_id = read_uint(data, offset + mh.schema_id_offset(), mh.schema_id, order)?;
        if schema_id != self.schema.schema_id() {
            return Ok(None);
        }
        let template_id =
            read_uint(data, offset + mh.template_id_offset(), mh.template_id, order)?;
        let Some(root) = self.schema.template(template_id) else {
            return Ok(None);
        };
        Ok(Some(GroupViewMut {
            reg: self,
            def: root,
            data,
            base: offset + mh.encoded_len(),
        }))
    }

    /// Frames a new empty message at `offset`, growing the store as needed,
    /// and returns its root view. An unregistered template id is `Ok(None)`.
    pub fn create<'a>(
        &'a self,
        template_id: u64,
        data: &'a mut Vec<u8>,
        offset: usize,
    ) -> Result<Option<GroupViewMut<'a>>> {
        let Some(root) = self.schema.template(template_id) else {
            return Ok(None);
        };
        let mh = *self.schema.message_header();
        let order = self.schema.byte_order();
        let content = offset + mh.encoded_len();
        let total = content + layout::empty_content_len(&self.schema, root);
        if data.len() < total {
            data.resize(total, 0);
        }
        write_uint(
            data,
            offset + mh.block_length_offset(),
            mh.block_length,
            order,
            self.schema.group(root).fixed_size() as u64,
        )?;
        write_uint(
            data,
            offset + mh.template_id_offset(),
            mh.template_id,
            order,
            template_id,
        )?;
        write_uint(
            data,
            offset + mh.schema_id_offset(),
            mh.schema_id,
            order,
            self.schema.schema_id(),
        )?;
        write_uint(
            data,
            offset + mh.version_offset(),
            mh.version,
            order,
            self.schema.version(),
        )?;
        layout::write_empty_content(&self.schema, root, data, content)?;
        Ok(Some(GroupViewMut {
            reg: self,
            def: root,
            data,
            base: content,
        }))
    }

    /// Total encoded length of the message at `offset` (header plus content),
    /// without constructing a view.
    pub fn encoded_len(&self, data: &[u8], offset: usize) -> Result<usize> {
        let mh = self.schema.message_header();
        let order = self.schema.byte_order();
        layout::ensure_within(data, offset + mh.encoded_len())?;
        let template_id =
            read_uint(data, offset + mh.template_id_offset(), mh.template_id, order)?;
        let root = self.schema.template(template_id).ok_or_else(|| {
            eyre::eyre!("unknown template id {} in message header", template_id)
        })?;
        Ok(layout::message_end(&self.schema, root, data, offset)? - offset)
    }
}
