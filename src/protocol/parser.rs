//! Generic unmarshaller
//!
//! The mirror image of the marshal walk: consume bytes per field descriptor
//! and store decoded values into the instance's slots. Dynamic sizes come
//! from the same expression evaluator, resolved against the fields decoded
//! so far and the enclosing parent.

use super::codec;
use super::descriptor::{ClassDescriptor, FieldDescriptor, FieldType, StructKind};
use super::encoder::pad_align_amount;
use super::errors::{WireError, WireResult};
use super::types::{StructInstance, Value};
use super::{ERROR_MARKER, REPLY_MARKER};

/// Decode `data` into the instance's slots. `ctx` is the enclosing parent
/// for `paramref` resolution; `total_len` is the length of the original
/// buffer when `data` is a sub-slice of it, keeping alignment absolute.
/// Returns the number of bytes consumed, never more than `data.len()`.
pub fn unmarshal(
    obj: &mut StructInstance,
    data: &[u8],
    ctx: Option<&StructInstance>,
    total_len: Option<usize>,
) -> WireResult<usize> {
    let class = obj.class().clone();
    let total = total_len.unwrap_or(data.len());
    log::debug!(
        "unmarshalling {}: {} bytes available",
        class.name,
        data.len()
    );

    if class.kind == StructKind::Union {
        return unmarshal_union(&class, obj, data, ctx);
    }

    let mut pos = 0usize;
    match class.kind {
        StructKind::Struct | StructKind::Union => {}
        StructKind::Request { opcode } => {
            need(&class, data, 0, 1)?;
            if data[0] != opcode {
                log::warn!(
                    "request {} carries opcode {}, expected {}",
                    class.name,
                    data[0],
                    opcode
                );
            }
            pos = 1;
        }
        StructKind::Reply => {
            need(&class, data, 0, 1)?;
            if data[0] != REPLY_MARKER {
                log::warn!("reply {} starts with marker {}", class.name, data[0]);
            }
            pos = 1;
        }
        StructKind::Event | StructKind::GenericEvent => {
            need(&class, data, 0, 1)?;
            pos = 1;
        }
        StructKind::Error { code } => {
            need(&class, data, 0, 4)?;
            if data[0] != ERROR_MARKER {
                log::warn!("error {} starts with marker {}", class.name, data[0]);
            }
            if data[1] != code {
                log::warn!(
                    "error {} carries code {}, expected {}",
                    class.name,
                    data[1],
                    code
                );
            }
            let sequence = codec::unpack_card(&data[2..4], obj.byte_order());
            obj.set("sequence", sequence);
            pos = 4;
        }
    }

    for f in class.walked_fields() {
        pos = unmarshal_field(&class, obj, data, pos, ctx, total, f)?;
    }

    if let Some(size_expr) = &class.size {
        let declared = super::expr::eval_size(size_expr, obj, ctx, "size")?;
        if declared < pos {
            return Err(WireError::DeclaredSizeTooSmall {
                class: class.name.to_string(),
                declared,
                parsed: pos,
            });
        }
        if declared > data.len() {
            return Err(WireError::InputTooShort {
                class: class.name.to_string(),
                needed: declared,
                available: data.len(),
            });
        }
        if declared > pos {
            log::debug!(
                "{}: skipping {} unknown trailing bytes",
                class.name,
                declared - pos
            );
        }
        pos = declared;
    }
    Ok(pos)
}

/// Decode one field at `pos`; returns the advanced cursor.
fn unmarshal_field(
    class: &ClassDescriptor,
    obj: &mut StructInstance,
    data: &[u8],
    pos: usize,
    ctx: Option<&StructInstance>,
    total: usize,
    f: &FieldDescriptor,
) -> WireResult<usize> {
    match &f.ty {
        FieldType::Ignore => Ok(pos),
        FieldType::Pad(len) => {
            let n = super::expr::eval_size(len, obj, ctx, f.name)?;
            need(class, data, pos, n)?;
            Ok(pos + n)
        }
        FieldType::PadAlign { align } => {
            // Derive the absolute offset from the original total length so
            // alignment survives being handed a sub-slice.
            let base = total.saturating_sub(data.len() - pos);
            let n = pad_align_amount(class, obj, f, *align, base)?;
            need(class, data, pos, n)?;
            Ok(pos + n)
        }
        FieldType::Switch {
            discriminant,
            cases,
        } => {
            let disc = discriminant.eval(obj, ctx)?;
            let mut p = pos;
            for case in cases {
                if case.cond.matches(disc, obj, ctx)? {
                    for name in &case.fields {
                        let fd =
                            class
                                .field(name)
                                .ok_or_else(|| WireError::UnsupportedType {
                                    tag: format!("switch case field `{name}`"),
                                })?;
                        p = unmarshal_field(class, obj, data, p, ctx, total, fd)?;
                    }
                }
            }
            Ok(p)
        }
        FieldType::List { element, size } => {
            let n = super::expr::eval_size(size, obj, ctx, f.name)?;
            unmarshal_list(class, obj, data, pos, ctx, total, f, element, n)
        }
        FieldType::Struct(child_class) => {
            let mut child = StructInstance::with_order(child_class.clone(), obj.byte_order());
            let consumed = unmarshal(&mut child, &data[pos..], Some(&*obj), Some(total))?;
            obj.set(f.name, child);
            Ok(pos + consumed)
        }
        scalar => {
            let (value, width) = decode_scalar(class, scalar, data, pos, obj)?;
            obj.set(f.name, value);
            Ok(pos + width)
        }
    }
}

fn decode_scalar(
    class: &ClassDescriptor,
    ty: &FieldType,
    data: &[u8],
    pos: usize,
    obj: &StructInstance,
) -> WireResult<(Value, usize)> {
    let width = ty.fixed_width().ok_or_else(|| WireError::UnsupportedType {
        tag: format!("{ty:?}"),
    })?;
    need(class, data, pos, width)?;
    let bytes = &data[pos..pos + width];
    let value = match ty {
        FieldType::U1
        | FieldType::U2
        | FieldType::U4
        | FieldType::U8
        | FieldType::Char
        | FieldType::Void => Value::Int(codec::unpack_card(bytes, obj.byte_order()) as i128),
        FieldType::I1 | FieldType::I2 | FieldType::I4 => {
            Value::Int(codec::unpack_int(bytes, obj.byte_order()))
        }
        FieldType::F32 | FieldType::F64 => {
            let bits = codec::unpack_card(bytes, obj.byte_order());
            Value::Float(codec::decode_float(bits, width)?)
        }
        other => {
            return Err(WireError::UnsupportedType {
                tag: format!("{other:?}"),
            })
        }
    };
    Ok((value, width))
}

#[allow(clippy::too_many_arguments)]
fn unmarshal_list(
    class: &ClassDescriptor,
    obj: &mut StructInstance,
    data: &[u8],
    pos: usize,
    ctx: Option<&StructInstance>,
    total: usize,
    f: &FieldDescriptor,
    element: &FieldType,
    n: usize,
) -> WireResult<usize> {
    match element {
        // A char list is ISO-Latin-1 text; the first 256 code points of
        // Unicode coincide with it, so a byte-to-char cast is the decode.
        FieldType::Char => {
            need(class, data, pos, n)?;
            let text: String = data[pos..pos + n].iter().map(|&b| b as char).collect();
            obj.set(f.name, text);
            Ok(pos + n)
        }
        // Opaque byte runs are kept raw for the caller to re-parse.
        FieldType::Void | FieldType::U1 => {
            need(class, data, pos, n)?;
            obj.set(f.name, data[pos..pos + n].to_vec());
            Ok(pos + n)
        }
        FieldType::Struct(child_class) => {
            let mut items = Vec::with_capacity(n);
            let mut p = pos;
            for _ in 0..n {
                let mut child = StructInstance::with_order(child_class.clone(), obj.byte_order());
                let consumed = unmarshal(&mut child, &data[p..], Some(&*obj), Some(total))?;
                items.push(Value::Struct(child));
                p += consumed;
            }
            obj.set(f.name, items);
            Ok(p)
        }
        scalar => {
            let mut items = Vec::with_capacity(n);
            let mut p = pos;
            for _ in 0..n {
                let (value, width) = decode_scalar(class, scalar, data, p, obj)?;
                items.push(value);
                p += width;
            }
            obj.set(f.name, items);
            Ok(p)
        }
    }
}

/// Every member of a union is decoded from the same window of declared-size
/// bytes; the whole window is consumed.
fn unmarshal_union(
    class: &ClassDescriptor,
    obj: &mut StructInstance,
    data: &[u8],
    ctx: Option<&StructInstance>,
) -> WireResult<usize> {
    let size_expr = class
        .size
        .as_ref()
        .ok_or_else(|| WireError::BadSizeExpression {
            class: class.name.to_string(),
            field: "size".to_string(),
            detail: "union without a declared size".to_string(),
        })?;
    let size = super::expr::eval_size(size_expr, obj, ctx, "size")?;
    need(class, data, 0, size)?;
    let window = &data[..size];
    for f in &class.fields {
        if matches!(f.ty, FieldType::Ignore) {
            continue;
        }
        unmarshal_field(class, obj, window, 0, ctx, size, f)?;
    }
    Ok(size)
}

fn need(class: &ClassDescriptor, data: &[u8], pos: usize, n: usize) -> WireResult<()> {
    if pos.checked_add(n).map_or(true, |end| end > data.len()) {
        return Err(WireError::InputTooShort {
            class: class.name.to_string(),
            needed: n,
            available: data.len().saturating_sub(pos),
        });
    }
    Ok(())
}
