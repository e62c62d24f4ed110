//! End-to-end marshalling tests against byte-exact wire vectors
//!
//! These drive the public API the way a generated binding would: build
//! instances of the shipped core classes, marshal them, and compare
//! against hand-computed X11 wire bytes.

use x11wire::protocol::codec;
use x11wire::protocol::errors::{error_class, ErrorCode};
use x11wire::protocol::events::{expose, key_press, CoreEventSource};
use x11wire::{
    core_registry, marshal, marshal_event, reply_class_name, unmarshal, ByteOrder,
    ClassDescriptor, Expr, FieldDescriptor, FieldType, StructInstance, StructKind, Value,
    WireError,
};

#[test]
fn test_binary32_scenarios() {
    assert_eq!(codec::binary32_to_f32(0x3f80_0000), 1.0);
    assert_eq!(codec::f32_to_binary32(1.0), 0x3f80_0000);
    let neg_zero = codec::binary32_to_f32(0x8000_0000);
    assert_eq!(neg_zero, 0.0);
    assert!(neg_zero.is_sign_negative());
    assert_eq!(codec::binary32_to_f32(0x7f80_0000), f32::INFINITY);
}

#[test]
fn test_binary64_scenarios() {
    assert_eq!(
        codec::binary64_to_f64(0x3ff0_0000_0000_0001),
        1.000_000_000_000_000_2
    );
    assert_eq!(
        codec::binary64_to_f64(0x0000_0000_0000_0001),
        4.940_656_458_412_465_4e-324
    );
}

#[test]
fn test_signed_unpack_scenarios() {
    assert_eq!(codec::unpack_int(&[0xff, 0xff], ByteOrder::MSBFirst), -1);
    assert_eq!(codec::unpack_int(&[0xff, 0xff], ByteOrder::LSBFirst), -1);
    assert_eq!(codec::unpack_int(&[0x80, 0x00], ByteOrder::MSBFirst), -32768);
}

fn fieldref_list_class() -> std::sync::Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "Chunk",
        StructKind::Struct,
        vec![
            FieldDescriptor::new("len", FieldType::U2),
            FieldDescriptor::new(
                "data",
                FieldType::List {
                    element: Box::new(FieldType::U1),
                    size: Expr::FieldRef("len"),
                },
            ),
        ],
    )
}

#[test]
fn test_fieldref_sized_list_vector() {
    let mut obj = StructInstance::new(fieldref_list_class());
    obj.set("len", 3u16).set("data", vec![0x61u8, 0x62, 0x63]);
    assert_eq!(marshal(&obj).unwrap(), vec![0x03, 0x00, 0x61, 0x62, 0x63]);
}

#[test]
fn test_switch_vector() {
    use x11wire::protocol::descriptor::SwitchCase;
    let class = ClassDescriptor::new(
        "Switched",
        StructKind::Struct,
        vec![
            FieldDescriptor::new("disc", FieldType::U1),
            FieldDescriptor::new(
                "branches",
                FieldType::Switch {
                    discriminant: Expr::FieldRef("disc"),
                    cases: vec![
                        SwitchCase::new(Expr::Lit(1), vec!["a"]),
                        SwitchCase::new(Expr::Lit(2), vec!["b"]),
                        SwitchCase::new(Expr::Lit(4), vec!["c"]),
                    ],
                },
            ),
            FieldDescriptor::new("a", FieldType::U1),
            FieldDescriptor::new("b", FieldType::U1),
            FieldDescriptor::new("c", FieldType::U1),
        ],
    );
    let mut obj = StructInstance::new(class);
    obj.set("disc", 0b0000_0101u8)
        .set("a", 0xaau8)
        .set("c", 0xccu8);
    let wire = marshal(&obj).unwrap();
    assert_eq!(&wire[1..], &[0xaa, 0xcc]);
}

#[test]
fn test_pad_align_vector() {
    let class = ClassDescriptor::new(
        "Aligned",
        StructKind::Struct,
        vec![
            FieldDescriptor::new(
                "content",
                FieldType::List {
                    element: Box::new(FieldType::U1),
                    size: Expr::Lit(5),
                },
            ),
            FieldDescriptor::new("pad0", FieldType::PadAlign { align: 4 }),
        ],
    );
    let mut obj = StructInstance::new(class);
    obj.set("content", vec![1u8, 2, 3, 4, 5]);
    let wire = marshal(&obj).unwrap();
    assert_eq!(wire.len(), 8);
    assert_eq!(&wire[5..], &[0, 0, 0]);
}

#[test]
fn test_error_packet_wire_layout() {
    let class = error_class("ValueError", ErrorCode::Value);
    let mut err = StructInstance::new(class);
    err.set("sequence", 0x0102u16)
        .set("bad_value", 0xdead_beefu32)
        .set("minor_opcode", 0u16)
        .set("major_opcode", 1u8);
    let wire = marshal(&err).unwrap();
    assert_eq!(wire.len(), 32);
    assert_eq!(wire[0], 0);
    assert_eq!(wire[1], ErrorCode::Value as u8);
    assert_eq!(&wire[2..4], &[0x02, 0x01]);
    assert_eq!(&wire[4..8], &[0xef, 0xbe, 0xad, 0xde]);
    assert_eq!(wire[10], 1);
    assert!(wire[11..].iter().all(|&b| b == 0));

    let mut decoded = StructInstance::new(error_class("ValueError", ErrorCode::Value));
    assert_eq!(unmarshal(&mut decoded, &wire, None, None).unwrap(), 32);
    assert_eq!(decoded.slot_int("sequence"), Some(0x0102));
    assert_eq!(decoded.slot_int("bad_value"), Some(0xdead_beef));
}

#[test]
fn test_event_minimum_length_and_zero_tail() {
    let mut ev = StructInstance::new(expose());
    ev.set("window", 1u32)
        .set("x", 0u16)
        .set("y", 0u16)
        .set("width", 1u16)
        .set("height", 1u16)
        .set("count", 0u16);
    let wire = marshal_event(&mut ev, &CoreEventSource, 1).unwrap();
    assert_eq!(wire.len(), 32);
    assert!(wire[18..].iter().all(|&b| b == 0));
}

#[test]
fn test_event_round_trip_both_byte_orders() {
    for order in [ByteOrder::LSBFirst, ByteOrder::MSBFirst] {
        let mut ev = StructInstance::with_order(key_press(), order);
        ev.set("detail", 9u8)
            .set("time", 0x0102_0304u32)
            .set("root", 1u32)
            .set("event", 2u32)
            .set("child", 0u32)
            .set("root_x", -7i16)
            .set("root_y", 7i16)
            .set("event_x", 1i16)
            .set("event_y", 2i16)
            .set("state", 0x8000u16)
            .set("same_screen", 1u8);
        let wire = marshal_event(&mut ev, &CoreEventSource, 513).unwrap();
        let mut decoded = StructInstance::with_order(key_press(), order);
        assert_eq!(unmarshal(&mut decoded, &wire, None, None).unwrap(), 32);
        assert_eq!(decoded, ev);
    }
}

#[test]
fn test_request_reply_round_trip_through_registry() {
    let registry = core_registry();
    let request = registry.get("InternAtom").unwrap();
    let reply = registry.reply_for("InternAtom").unwrap();
    assert_eq!(reply.name, reply_class_name("InternAtom"));

    let mut req = StructInstance::new(request.clone());
    req.set("only_if_exists", 0u8)
        .set("name_len", 8u16)
        .set("name", "WM_CLASS");
    let wire = marshal(&req).unwrap();
    let mut decoded = StructInstance::new(request.clone());
    assert_eq!(unmarshal(&mut decoded, &wire, None, None).unwrap(), wire.len());
    assert_eq!(decoded, req);

    let mut rep = StructInstance::new(reply.clone());
    rep.set("sequence", 12u16).set("length", 0u32).set("atom", 0x143u32);
    let rep_wire = marshal(&rep).unwrap();
    assert_eq!(rep_wire.len(), 32);
    let mut rep_decoded = StructInstance::new(reply.clone());
    assert_eq!(unmarshal(&mut rep_decoded, &rep_wire, None, None).unwrap(), 32);
    assert_eq!(rep_decoded, rep);
}

#[test]
fn test_card64_full_range_round_trip() {
    let class = ClassDescriptor::new(
        "Counter",
        StructKind::Struct,
        vec![FieldDescriptor::new("value", FieldType::U8)],
    );
    let mut obj = StructInstance::new(class.clone());
    obj.set("value", u64::MAX);
    let wire = marshal(&obj).unwrap();
    assert_eq!(wire, vec![0xff; 8]);
    let mut decoded = StructInstance::new(class);
    unmarshal(&mut decoded, &wire, None, None).unwrap();
    assert_eq!(decoded.slot_int("value"), Some(u64::MAX as i128));
}

#[test]
fn test_float_fields_round_trip() {
    let class = ClassDescriptor::new(
        "Gradient",
        StructKind::Struct,
        vec![
            FieldDescriptor::new("x", FieldType::F32),
            FieldDescriptor::new("y", FieldType::F64),
        ],
    );
    let mut obj = StructInstance::with_order(class.clone(), ByteOrder::MSBFirst);
    obj.set("x", 1.5f32).set("y", -0.25f64);
    let wire = marshal(&obj).unwrap();
    assert_eq!(&wire[..4], &[0x3f, 0xc0, 0x00, 0x00]);
    let mut decoded = StructInstance::with_order(class, ByteOrder::MSBFirst);
    assert_eq!(unmarshal(&mut decoded, &wire, None, None).unwrap(), 12);
    assert_eq!(decoded, obj);
}

#[test]
fn test_negative_size_expression_rejected() {
    let class = ClassDescriptor::new(
        "Shrinking",
        StructKind::Struct,
        vec![
            FieldDescriptor::new("n", FieldType::U1),
            FieldDescriptor::new(
                "data",
                FieldType::List {
                    element: Box::new(FieldType::U1),
                    size: Expr::sub(Expr::FieldRef("n"), Expr::Lit(4)),
                },
            ),
        ],
    );
    let mut obj = StructInstance::new(class);
    obj.set("n", 1u8).set("data", Vec::<u8>::new());
    assert!(matches!(
        marshal(&obj),
        Err(WireError::BadSizeExpression { .. })
    ));
}

#[test]
fn test_ignore_slots_stay_off_the_wire() {
    let class = ClassDescriptor::new(
        "Annotated",
        StructKind::Struct,
        vec![
            FieldDescriptor::new("visible", FieldType::U1),
            FieldDescriptor::new("note", FieldType::Ignore),
        ],
    );
    let mut obj = StructInstance::new(class.clone());
    obj.set("visible", 0x5au8).set("note", "kept locally");
    assert_eq!(marshal(&obj).unwrap(), vec![0x5a]);

    let mut decoded = StructInstance::new(class);
    assert_eq!(unmarshal(&mut decoded, &[0x5a], None, None).unwrap(), 1);
    assert!(decoded.slot("note").is_none());
}

#[test]
fn test_declared_size_tolerates_unknown_trailing_bytes() {
    // A newer server may append fields this schema predates; the declared
    // size lets the decoder step over them.
    let class = ClassDescriptor::with_size(
        "Forward",
        StructKind::Struct,
        vec![FieldDescriptor::new("v", FieldType::U2)],
        Expr::Lit(6),
    );
    let mut obj = StructInstance::new(class);
    let wire = [0x22, 0x11, 0xfe, 0xfe, 0xfe, 0xfe, 0x77];
    assert_eq!(unmarshal(&mut obj, &wire, None, None).unwrap(), 6);
    assert_eq!(obj.slot_int("v"), Some(0x1122));
}

#[test]
fn test_expr_valued_slot_dereferenced_at_marshal() {
    // A length slot bound to a deferred reference tracks its sibling.
    let class = ClassDescriptor::new(
        "SelfSizing",
        StructKind::Struct,
        vec![
            FieldDescriptor::new("len", FieldType::U2),
            FieldDescriptor::new("payload", FieldType::Ignore),
        ],
    );
    let mut obj = StructInstance::new(class);
    obj.set("payload", 5i32)
        .set("len", Value::Expr(Expr::mul(Expr::FieldRef("payload"), Expr::Lit(4))));
    assert_eq!(marshal(&obj).unwrap(), vec![20, 0]);
}
