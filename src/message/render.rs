//! # JSON Rendering
//!
//! Renders a live view into a JSON object for inspection and debugging.
//! Rendering is a read-only walk over the buffer in declaration order; it
//! allocates only the output string.
//!
//! Conventions:
//!
//! - numeric fields render as JSON numbers (arrays of them for array fields)
//! - Char arrays render as strings with trailing NULs trimmed
//! - Raw payloads render as lossy-UTF-8 strings
//! - Enum fields render their symbolic name, or the raw number when the
//!   encoded value has no name in the schema
//! - Set fields render as the array of active choice names
//! - composites render as nested objects
//! - an empty repeating group renders as `null`, a non-empty one as an array
//!   of row objects

use eyre::Result;

use crate::message::view::GroupView;
use crate::schema::field::{ConstValue, FieldRef};
use crate::schema::types::FieldType;

/// Renders one view (message root, occurrence, or composite) as a JSON
/// object string.
pub fn to_json_string(view: &GroupView) -> Result<String> {
    let mut out = String::new();
    write_group(view, &mut out)?;
    Ok(out)
}

fn write_group(view: &GroupView, out: &mut String) -> Result<()> {
    out.push('{');
    let def = view.definition();
    for (index, f) in def.fields().iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        push_escaped(f.name(), out);
        out.push(':');
        let field = FieldRef {
            group: view.def,
            index,
        };
        write_field_value(view, field, out)?;
    }
    out.push('}');
    Ok(())
}

fn write_field_value(view: &GroupView, field: FieldRef, out: &mut String) -> Result<()> {
    let f = &view.definition().fields()[field.index];
    if let Some(c) = f.constant() {
        match c {
            ConstValue::Unsigned(v) => out.push_str(&v.to_string()),
            ConstValue::Signed(v) => out.push_str(&v.to_string()),
            ConstValue::Float(v) => push_float(*v, out),
            ConstValue::Str(s) => push_escaped(s, out),
        }
        return Ok(());
    }
    match f.field_type() {
        FieldType::U8 | FieldType::U16 | FieldType::U32 | FieldType::U64 | FieldType::Byte => {
            write_array(f.array_len(), out, |i, out| {
                out.push_str(&view.get_u64_at(field, i)?.to_string());
                Ok(())
            })
        }
        FieldType::I8 | FieldType::I16 | FieldType::I32 | FieldType::I64 => {
            write_array(f.array_len(), out, |i, out| {
                out.push_str(&view.get_i64_at(field, i)?.to_string());
                Ok(())
            })
        }
        // single-precision values go through the f32 getter so they render
        // at their own precision
        FieldType::Float => write_array(f.array_len(), out, |i, out| {
            let v = view.get_f32_at(field, i)?;
            if v.is_finite() {
                out.push_str(&v.to_string());
            } else {
                out.push_str("null");
            }
            Ok(())
        }),
        FieldType::Double => write_array(f.array_len(), out, |i, out| {
            push_float(view.get_f64_at(field, i)?, out);
            Ok(())
        }),
        FieldType::Char => {
            push_escaped(view.get_string(field)?, out);
            Ok(())
        }
        FieldType::Raw => {
            let payload = view.get_raw(field)?;
            push_escaped(&String::from_utf8_lossy(payload), out);
            Ok(())
        }
        FieldType::Enum => {
            match view.get_enum_name(field)? {
                Some(name) => push_escaped(name, out),
                None => out.push_str(&view.get_enum_value(field)?.to_string()),
            }
            Ok(())
        }
        FieldType::Set => {
            out.push('[');
            let mut first = true;
            for choice in f.choices() {
                if view.get_choice(field, &choice.name)? {
                    if !first {
                        out.push(',');
                    }
                    push_escaped(&choice.name, out);
                    first = false;
                }
            }
            out.push(']');
            Ok(())
        }
        FieldType::Composite => write_group(&view.composite(field)?, out),
        FieldType::Group => {
            let rows = view.group_array(field)?;
            let count = rows.num_groups()?;
            if count == 0 {
                out.push_str("null");
                return Ok(());
            }
            out.push('[');
            for n in 0..count {
                if n > 0 {
                    out.push(',');
                }
                write_group(&rows.group_at(n)?, out)?;
            }
            out.push(']');
            Ok(())
        }
        FieldType::Constant | FieldType::Message => {
            out.push_str("null");
            Ok(())
        }
    }
}

fn write_array(
    len: usize,
    out: &mut String,
    mut elem: impl FnMut(usize, &mut String) -> Result<()>,
) -> Result<()> {
    if len == 1 {
        return elem(0, out);
    }
    out.push('[');
    for i in 0..len {
        if i > 0 {
            out.push(',');
        }
        elem(i, out)?;
    }
    out.push(']');
    Ok(())
}

fn push_float(v: f64, out: &mut String) {
    if v.is_finite() {
        out.push_str(&v.to_string());
    } else {
        out.push_str("null");
    }
}

fn push_escaped(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
