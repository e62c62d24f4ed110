/// X11Wire - schema-driven marshalling for the X11 wire protocol
///
/// This library converts typed protocol objects (requests, replies, events,
/// errors and nested structures) to and from the byte streams defined by
/// the X11 protocol. Message classes are declarative descriptor tables; a
/// single generic engine interprets them, handling endianness, padding,
/// alignment, variable-length lists, discriminated switches and
/// cross-field size references.

pub mod protocol;

pub use protocol::{
    core_registry, marshal, marshal_event, reply_class_name, unmarshal, ByteOrder,
    ClassDescriptor, ClassRegistry, EventCodeSource, EventNumber, Expr, FieldDescriptor,
    FieldType, StructInstance, StructKind, Value, WireError, WireResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version
pub const PROTOCOL_MAJOR: u16 = 11;
pub const PROTOCOL_MINOR: u16 = 0;
