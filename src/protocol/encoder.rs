//! Generic marshaller
//!
//! Walks a struct instance's field descriptors in declaration order and
//! emits the wire bytes, dispatching per type tag. The behavioral
//! refinements (request opcodes, reply and error markers, the 32-byte event
//! floor, union member selection) all live here; concrete message classes
//! are pure data.

use super::codec;
use super::descriptor::{
    ClassDescriptor, EventCodeSource, EventNumber, FieldDescriptor, FieldType, StructKind,
};
use super::errors::{WireError, WireResult};
use super::expr::{eval_size, Expr};
use super::types::{StructInstance, Value};
use super::{ERROR_MARKER, EVENT_LENGTH, GENERIC_EVENT_CODE, REPLY_MARKER};

/// Marshal a struct, request, reply, error or union instance to its wire
/// bytes. Events go through [`marshal_event`] because their code comes from
/// an external lookup.
pub fn marshal(obj: &StructInstance) -> WireResult<Vec<u8>> {
    marshal_with(obj, None)
}

pub(crate) fn marshal_with(
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
) -> WireResult<Vec<u8>> {
    let class = obj.class().clone();
    let mut out = Vec::new();
    match class.kind {
        StructKind::Struct => marshal_fields(&class, obj, ctx, &mut out)?,
        StructKind::Request { opcode } => {
            out.push(opcode);
            marshal_fields(&class, obj, ctx, &mut out)?;
        }
        StructKind::Reply => {
            out.push(REPLY_MARKER);
            marshal_fields(&class, obj, ctx, &mut out)?;
        }
        StructKind::Error { code } => {
            out.push(ERROR_MARKER);
            out.push(code);
            let sequence = obj.slot_int("sequence").unwrap_or(0);
            codec::pack_card(sequence as u64, 2, obj.byte_order(), &mut out);
            marshal_fields(&class, obj, ctx, &mut out)?;
        }
        StructKind::Event | StructKind::GenericEvent => {
            return Err(WireError::MissingField {
                class: class.name.to_string(),
                field: "event number (use marshal_event)".to_string(),
            });
        }
        StructKind::Union => out = marshal_union(&class, obj, ctx)?,
    }
    check_declared_size(&class, obj, ctx, out.len())?;
    Ok(out)
}

/// Marshal an event. The class-to-number lookup is supplied by the
/// connection collaborator; XKB and generic numbers are written into the
/// instance's discriminant slots before serialization. Events always occupy
/// at least 32 bytes on the wire, zero padded.
pub fn marshal_event<S: EventCodeSource + ?Sized>(
    obj: &mut StructInstance,
    source: &S,
    sequence: u16,
) -> WireResult<Vec<u8>> {
    let class = obj.class().clone();
    if !matches!(class.kind, StructKind::Event | StructKind::GenericEvent) {
        return Err(WireError::UnsupportedType {
            tag: format!("{} is not an event class", class.name),
        });
    }
    let number =
        source
            .event_number(class.name)
            .ok_or_else(|| WireError::UnsupportedType {
                tag: format!("event class {}", class.name),
            })?;
    let code = match number {
        EventNumber::Core(code) => code,
        EventNumber::Xkb { code, xkb_type } => {
            obj.set("xkbType", xkb_type);
            code
        }
        EventNumber::Generic { extension, evtype } => {
            obj.set("extension", extension);
            obj.set("evtype", evtype);
            GENERIC_EVENT_CODE
        }
    };
    if class.field("sequence").is_some() {
        obj.set("sequence", sequence);
    }
    let mut out = vec![code];
    marshal_fields(&class, obj, None, &mut out)?;
    if out.len() < EVENT_LENGTH {
        out.resize(EVENT_LENGTH, 0);
    }
    check_declared_size(&class, obj, None, out.len())?;
    Ok(out)
}

fn check_declared_size(
    class: &ClassDescriptor,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
    actual: usize,
) -> WireResult<()> {
    if let Some(expr) = &class.size {
        let declared = eval_size(expr, obj, ctx, "size")?;
        if declared != actual {
            return Err(WireError::SizeMismatch {
                class: class.name.to_string(),
                declared,
                actual,
            });
        }
    }
    Ok(())
}

fn marshal_fields(
    class: &ClassDescriptor,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
    out: &mut Vec<u8>,
) -> WireResult<()> {
    for f in class.walked_fields() {
        marshal_field(class, obj, ctx, f, out, true)?;
    }
    Ok(())
}

/// Emit one field. `required` is false inside switch cases, where an
/// unbound optional slot is simply skipped.
fn marshal_field(
    class: &ClassDescriptor,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
    f: &FieldDescriptor,
    out: &mut Vec<u8>,
    required: bool,
) -> WireResult<()> {
    match &f.ty {
        FieldType::Ignore => Ok(()),
        FieldType::Pad(len) => {
            let n = eval_size(len, obj, ctx, f.name)?;
            out.extend(std::iter::repeat(0u8).take(n));
            Ok(())
        }
        FieldType::PadAlign { align } => {
            let n = pad_align_amount(class, obj, f, *align, out.len())?;
            out.extend(std::iter::repeat(0u8).take(n));
            Ok(())
        }
        FieldType::Switch {
            discriminant,
            cases,
        } => {
            let disc = discriminant.eval(obj, ctx)?;
            for case in cases {
                if case.cond.matches(disc, obj, ctx)? {
                    for name in &case.fields {
                        let fd =
                            class
                                .field(name)
                                .ok_or_else(|| WireError::UnsupportedType {
                                    tag: format!("switch case field `{name}`"),
                                })?;
                        marshal_field(class, obj, ctx, fd, out, false)?;
                    }
                }
            }
            Ok(())
        }
        ty => {
            let value = match obj.slot(f.name).or(f.default.as_ref()) {
                Some(v) => v,
                None if required => {
                    return Err(WireError::MissingField {
                        class: class.name.to_string(),
                        field: f.name.to_string(),
                    })
                }
                None => return Ok(()),
            };
            marshal_value(class, obj, ctx, f, ty, value, out)
        }
    }
}

fn marshal_value(
    class: &ClassDescriptor,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
    f: &FieldDescriptor,
    ty: &FieldType,
    value: &Value,
    out: &mut Vec<u8>,
) -> WireResult<()> {
    match ty {
        FieldType::U1 | FieldType::U2 | FieldType::U4 | FieldType::U8 | FieldType::Void => {
            let v = int_value(class, obj, ctx, f, value)?;
            let width = ty.fixed_width().unwrap_or(1);
            codec::pack_card(v as u64, width, obj.byte_order(), out);
            Ok(())
        }
        FieldType::I1 | FieldType::I2 | FieldType::I4 => {
            let v = int_value(class, obj, ctx, f, value)?;
            let width = ty.fixed_width().unwrap_or(1);
            codec::pack_int(v, width, obj.byte_order(), out);
            Ok(())
        }
        FieldType::Char => match value {
            Value::Int(v) => {
                out.push(*v as u8);
                Ok(())
            }
            Value::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => push_latin1(class, f, c, out),
                    _ => Err(bad_slot(class, f)),
                }
            }
            _ => Err(bad_slot(class, f)),
        },
        FieldType::F32 | FieldType::F64 => {
            let v = float_value(class, obj, ctx, f, value)?;
            let width = ty.fixed_width().unwrap_or(4);
            let bits = codec::encode_float(v, width)?;
            codec::pack_card(bits, width, obj.byte_order(), out);
            Ok(())
        }
        FieldType::List { element, size } => {
            marshal_list(class, obj, ctx, f, element, size, value, out)
        }
        FieldType::Struct(_) => match value {
            Value::Struct(child) => {
                let bytes = marshal_with(child, Some(obj))?;
                out.extend_from_slice(&bytes);
                Ok(())
            }
            _ => Err(bad_slot(class, f)),
        },
        other => Err(WireError::UnsupportedType {
            tag: format!("{other:?}"),
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn marshal_list(
    class: &ClassDescriptor,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
    f: &FieldDescriptor,
    element: &FieldType,
    size: &Expr,
    value: &Value,
    out: &mut Vec<u8>,
) -> WireResult<()> {
    let n = eval_size(size, obj, ctx, f.name)?;
    match value {
        // Byte strings go straight onto the wire when the element is a
        // single opaque byte.
        Value::Bytes(bytes)
            if matches!(
                element,
                FieldType::U1 | FieldType::I1 | FieldType::Char | FieldType::Void
            ) =>
        {
            if bytes.len() != n {
                return Err(list_mismatch(class, f, n, bytes.len()));
            }
            out.extend_from_slice(bytes);
            Ok(())
        }
        Value::Text(s) if matches!(element, FieldType::Char | FieldType::U1) => {
            let count = s.chars().count();
            if count != n {
                return Err(list_mismatch(class, f, n, count));
            }
            for c in s.chars() {
                push_latin1(class, f, c, out)?;
            }
            Ok(())
        }
        Value::List(items) => {
            if items.len() != n {
                return Err(list_mismatch(class, f, n, items.len()));
            }
            for item in items {
                marshal_value(class, obj, ctx, f, element, item, out)?;
            }
            Ok(())
        }
        _ => Err(bad_slot(class, f)),
    }
}

fn marshal_union(
    class: &ClassDescriptor,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
) -> WireResult<Vec<u8>> {
    let size_expr = class.size.as_ref().ok_or_else(|| WireError::BadSizeExpression {
        class: class.name.to_string(),
        field: "size".to_string(),
        detail: "union without a declared size".to_string(),
    })?;
    let size = eval_size(size_expr, obj, ctx, "size")?;
    // Every member is a view of the same bytes; emit the bound member that
    // fills the most of the window, first one winning ties.
    let mut best: Vec<u8> = Vec::new();
    for f in &class.fields {
        if matches!(f.ty, FieldType::Ignore) {
            continue;
        }
        if obj.slot(f.name).is_none() && f.default.is_none() {
            continue;
        }
        let mut buf = Vec::new();
        marshal_field(class, obj, ctx, f, &mut buf, true)?;
        if buf.len() > size {
            return Err(WireError::UnionOverflow {
                class: class.name.to_string(),
                field: f.name.to_string(),
                actual: buf.len(),
                size,
            });
        }
        if buf.len() > best.len() {
            best = buf;
        }
    }
    best.resize(size, 0);
    Ok(best)
}

/// Zero bytes needed to align the wire cursor, honoring a per-instance
/// `(align, correction)` override and the request bias: a request's 2-byte
/// length field is not in the slot list, so its running offset sits 2 bytes
/// ahead of what has been emitted.
pub(crate) fn pad_align_amount(
    class: &ClassDescriptor,
    obj: &StructInstance,
    f: &FieldDescriptor,
    default_align: usize,
    base_offset: usize,
) -> WireResult<usize> {
    let (align, correction) = match obj.slot(f.name).or(f.default.as_ref()) {
        None => (default_align, 0usize),
        Some(Value::Int(a)) => (*a as usize, 0),
        Some(Value::List(pair)) => match pair.as_slice() {
            [Value::Int(a), Value::Int(c)] => (*a as usize, *c as usize),
            _ => return Err(bad_slot(class, f)),
        },
        Some(_) => return Err(bad_slot(class, f)),
    };
    if align == 0 {
        return Err(WireError::BadSizeExpression {
            class: class.name.to_string(),
            field: f.name.to_string(),
            detail: "zero alignment".to_string(),
        });
    }
    let bias = if matches!(class.kind, StructKind::Request { .. }) {
        2
    } else {
        0
    };
    let offset = (base_offset + bias)
        .checked_sub(correction)
        .ok_or_else(|| WireError::BadSizeExpression {
            class: class.name.to_string(),
            field: f.name.to_string(),
            detail: format!("alignment correction {correction} exceeds offset"),
        })?;
    Ok((align - offset % align) % align)
}

fn int_value(
    class: &ClassDescriptor,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
    f: &FieldDescriptor,
    value: &Value,
) -> WireResult<i128> {
    match value {
        Value::Int(v) => Ok(*v),
        Value::Expr(e) => e.eval(obj, ctx),
        _ => Err(bad_slot(class, f)),
    }
}

fn float_value(
    class: &ClassDescriptor,
    obj: &StructInstance,
    ctx: Option<&StructInstance>,
    f: &FieldDescriptor,
    value: &Value,
) -> WireResult<f64> {
    match value {
        Value::Float(v) => Ok(*v),
        Value::Int(v) => Ok(*v as f64),
        Value::Expr(e) => Ok(e.eval(obj, ctx)? as f64),
        _ => Err(bad_slot(class, f)),
    }
}

fn push_latin1(
    class: &ClassDescriptor,
    f: &FieldDescriptor,
    c: char,
    out: &mut Vec<u8>,
) -> WireResult<()> {
    let cp = c as u32;
    if cp > 0xff {
        return Err(bad_slot(class, f));
    }
    out.push(cp as u8);
    Ok(())
}

fn bad_slot(class: &ClassDescriptor, f: &FieldDescriptor) -> WireError {
    WireError::BadSlotValue {
        class: class.name.to_string(),
        field: f.name.to_string(),
    }
}

fn list_mismatch(
    class: &ClassDescriptor,
    f: &FieldDescriptor,
    expected: usize,
    actual: usize,
) -> WireError {
    WireError::ListSizeMismatch {
        class: class.name.to_string(),
        field: f.name.to_string(),
        expected,
        actual,
    }
}
