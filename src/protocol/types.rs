//! Runtime value model for schema-driven marshalling
//!
//! A `StructInstance` is a message under construction or decoding: a handle
//! to its class descriptor, a byte-order flag fixed at construction, and a
//! slot table mapping field names to values. The engine never looks at
//! concrete message types; it only walks descriptors and reads these slots.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::descriptor::ClassDescriptor;
use super::expr::Expr;

/// Byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LSBFirst = 0,
    MSBFirst = 1,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LSBFirst
        } else {
            ByteOrder::MSBFirst
        }
    }
}

/// A slot value. Integers are carried as `i128` so CARD64 fields keep their
/// full range and signed adjustment never overflows.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i128),
    Float(f64),
    /// ISO-Latin-1 text, the decoded form of a `char` list
    Text(String),
    /// Opaque bytes, the decoded form of a `void` or `BYTE` list
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Struct(StructInstance),
    /// A deferred reference, resolved against the instance at marshal time
    Expr(Expr),
}

impl Value {
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Value {
                Value::Int(v as i128)
            }
        })*
    };
}

value_from_int!(u8, u16, u32, u64, i8, i16, i32, i64, i128, usize);

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Float(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Value {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Value {
        Value::List(v)
    }
}

impl From<StructInstance> for Value {
    fn from(v: StructInstance) -> Value {
        Value::Struct(v)
    }
}

impl From<Expr> for Value {
    fn from(v: Expr) -> Value {
        Value::Expr(v)
    }
}

/// A message instance: class handle, byte-order flag and slot storage.
///
/// The byte-order flag is captured at construction and cannot change for the
/// lifetime of the instance. Slots are an open table; the engine reads the
/// ones the class declares.
#[derive(Debug, Clone)]
pub struct StructInstance {
    class: Arc<ClassDescriptor>,
    byte_order: ByteOrder,
    slots: HashMap<&'static str, Value>,
}

impl StructInstance {
    /// New instance in the protocol default byte order (LSB first).
    pub fn new(class: Arc<ClassDescriptor>) -> Self {
        Self::with_order(class, ByteOrder::default())
    }

    pub fn with_order(class: Arc<ClassDescriptor>, byte_order: ByteOrder) -> Self {
        StructInstance {
            class,
            byte_order,
            slots: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Arc<ClassDescriptor> {
        &self.class
    }

    pub fn class_name(&self) -> &'static str {
        self.class.name
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Bind a slot. Returns `self` so instances can be populated in one
    /// expression.
    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) -> &mut Self {
        self.slots.insert(name, value.into());
        self
    }

    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }

    pub fn slot_int(&self, name: &str) -> Option<i128> {
        self.slot(name).and_then(Value::as_int)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }
}

impl PartialEq for StructInstance {
    fn eq(&self, other: &Self) -> bool {
        self.class.name == other.class.name
            && self.byte_order == other.byte_order
            && self.slots == other.slots
    }
}

impl fmt::Display for StructInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({} slots)", self.class.name, self.slots.len())
    }
}
