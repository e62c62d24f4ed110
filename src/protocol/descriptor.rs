//! Type descriptors: the vocabulary every message class is declared in
//!
//! Schema generators emit one `ClassDescriptor` per message class. The
//! engine interprets these tables; nothing schema specific lives in the
//! engine itself. Type-tag aliases are resolved here, once, when a
//! descriptor is built.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{WireError, WireResult};
use super::expr::Expr;
use super::types::Value;

/// Field type tags. This is a closed set; anything a schema names must
/// resolve to one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    U1,
    I1,
    U2,
    I2,
    U4,
    I4,
    U8,
    F32,
    F64,
    /// One byte, decoded as ISO-Latin-1 text in list position
    Char,
    /// One opaque byte, decoded as a raw slice in list position
    Void,
    /// Fixed zero padding; the expression gives the byte count
    Pad(Expr),
    /// Align the wire cursor to a multiple of `align`
    PadAlign { align: usize },
    /// Homogeneous variable-length sequence
    List { element: Box<FieldType>, size: Expr },
    /// Discriminated optional fields; must be the last walked field
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    /// Present in the object model, absent from the wire
    Ignore,
    /// Recurse into another class
    Struct(Arc<ClassDescriptor>),
}

impl FieldType {
    /// Resolve a schema type tag, chasing aliases to a concrete tag.
    pub fn resolve(tag: &str) -> WireResult<FieldType> {
        match tag {
            "u1" => Ok(FieldType::U1),
            "i1" => Ok(FieldType::I1),
            "u2" => Ok(FieldType::U2),
            "i2" => Ok(FieldType::I2),
            "u4" => Ok(FieldType::U4),
            "i4" => Ok(FieldType::I4),
            "u8" => Ok(FieldType::U8),
            "f32" => Ok(FieldType::F32),
            "f64" => Ok(FieldType::F64),
            "char" => Ok(FieldType::Char),
            "void" => Ok(FieldType::Void),
            "BYTE" | "BOOL" | "CARD8" => Ok(FieldType::U1),
            "INT8" => Ok(FieldType::I1),
            "CARD16" => Ok(FieldType::U2),
            "INT16" => Ok(FieldType::I2),
            "CARD32" => Ok(FieldType::U4),
            "INT32" | "fd" => Ok(FieldType::I4),
            "CARD64" => Ok(FieldType::U8),
            "float" => Ok(FieldType::F32),
            "double" => Ok(FieldType::F64),
            _ => Err(WireError::UnsupportedType {
                tag: tag.to_string(),
            }),
        }
    }

    /// Wire width of a fixed-size tag.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            FieldType::U1 | FieldType::I1 | FieldType::Char | FieldType::Void => Some(1),
            FieldType::U2 | FieldType::I2 => Some(2),
            FieldType::U4 | FieldType::I4 | FieldType::F32 => Some(4),
            FieldType::U8 | FieldType::F64 => Some(8),
            _ => None,
        }
    }
}

/// One switch case: a condition plus the fields it brings in. The named
/// fields live in the class's descriptor table after the switch and are
/// only reached through a matching case.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub cond: Expr,
    pub fields: Vec<&'static str>,
}

impl SwitchCase {
    pub fn new(cond: Expr, fields: Vec<&'static str>) -> Self {
        SwitchCase { cond, fields }
    }
}

/// A single field declaration. Order of declaration is wire order.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub ty: FieldType,
    /// Literal or deferred default, used when the slot is unbound at
    /// marshal time
    pub default: Option<Value>,
}

impl FieldDescriptor {
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        FieldDescriptor {
            name,
            ty,
            default: None,
        }
    }

    pub fn with_default(name: &'static str, ty: FieldType, default: impl Into<Value>) -> Self {
        FieldDescriptor {
            name,
            ty,
            default: Some(default.into()),
        }
    }
}

/// Behavioral refinement of a class. Concrete message classes do not get
/// their own types; a kind plus a descriptor table is all the engine needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    Struct,
    Request { opcode: u8 },
    Reply,
    Event,
    GenericEvent,
    Error { code: u8 },
    Union,
}

/// A message class: name, kind, ordered fields and an optional declared
/// size expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    pub name: &'static str,
    pub kind: StructKind,
    pub fields: Vec<FieldDescriptor>,
    pub size: Option<Expr>,
}

impl ClassDescriptor {
    /// Build and validate a class. Schema tables are produced by trusted
    /// generators, so structural violations are panics, not runtime errors.
    ///
    /// Panics when field names repeat, when fields other than switch case
    /// targets follow a switch, when a case names an unknown field, or when
    /// a union lacks a declared size.
    pub fn new(name: &'static str, kind: StructKind, fields: Vec<FieldDescriptor>) -> Arc<Self> {
        Self::build(name, kind, fields, None)
    }

    pub fn with_size(
        name: &'static str,
        kind: StructKind,
        fields: Vec<FieldDescriptor>,
        size: Expr,
    ) -> Arc<Self> {
        Self::build(name, kind, fields, Some(size))
    }

    fn build(
        name: &'static str,
        kind: StructKind,
        fields: Vec<FieldDescriptor>,
        size: Option<Expr>,
    ) -> Arc<Self> {
        let class = ClassDescriptor {
            name,
            kind,
            fields,
            size,
        };
        class.validate();
        Arc::new(class)
    }

    fn validate(&self) {
        let mut seen = HashMap::new();
        for f in &self.fields {
            assert!(
                seen.insert(f.name, ()).is_none(),
                "duplicate field `{}` in class {}",
                f.name,
                self.name
            );
        }
        if let Some(pos) = self
            .fields
            .iter()
            .position(|f| matches!(f.ty, FieldType::Switch { .. }))
        {
            let switch = &self.fields[pos];
            let case_fields: Vec<&str> = match &switch.ty {
                FieldType::Switch { cases, .. } => {
                    cases.iter().flat_map(|c| c.fields.iter().copied()).collect()
                }
                _ => unreachable!(),
            };
            for name in &case_fields {
                assert!(
                    seen.contains_key(name),
                    "switch case in class {} names unknown field `{}`",
                    self.name,
                    name
                );
            }
            for trailing in &self.fields[pos + 1..] {
                assert!(
                    case_fields.contains(&trailing.name),
                    "field `{}` of class {} follows the switch but belongs to no case",
                    trailing.name,
                    self.name
                );
                assert!(
                    !matches!(trailing.ty, FieldType::Switch { .. }),
                    "class {} declares more than one switch",
                    self.name
                );
            }
        }
        if self.kind == StructKind::Union {
            assert!(
                self.size.is_some(),
                "union class {} has no declared size",
                self.name
            );
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields up to and including the switch, the ones the main walk visits.
    pub fn walked_fields(&self) -> &[FieldDescriptor] {
        match self
            .fields
            .iter()
            .position(|f| matches!(f.ty, FieldType::Switch { .. }))
        {
            Some(pos) => &self.fields[..=pos],
            None => &self.fields,
        }
    }
}

/// Event number as supplied by the connection collaborator: a plain code
/// for core events, a code plus XKB sub-type for XKB-style events, or an
/// extension id and evtype pair for generic events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventNumber {
    Core(u8),
    Xkb { code: u8, xkb_type: u16 },
    Generic { extension: u16, evtype: u16 },
}

/// Externally supplied event-class-to-number lookup. The engine knows
/// nothing about extension negotiation; whoever owns the connection does.
pub trait EventCodeSource {
    fn event_number(&self, class: &str) -> Option<EventNumber>;
}

/// Reply classes are named after their request by a fixed suffix.
pub fn reply_class_name(request: &str) -> String {
    format!("{request}Reply")
}

/// Name-to-descriptor table for a protocol (core or one extension).
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    classes: HashMap<&'static str, Arc<ClassDescriptor>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: Arc<ClassDescriptor>) {
        self.classes.insert(class.name, class);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ClassDescriptor>> {
        self.classes.get(name)
    }

    /// The reply class paired with a request class, by naming convention.
    pub fn reply_for(&self, request: &str) -> Option<&Arc<ClassDescriptor>> {
        self.classes.get(reply_class_name(request).as_str())
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_resolution() {
        assert_eq!(FieldType::resolve("CARD16").unwrap(), FieldType::U2);
        assert_eq!(FieldType::resolve("BOOL").unwrap(), FieldType::U1);
        assert_eq!(FieldType::resolve("double").unwrap(), FieldType::F64);
        assert_eq!(FieldType::resolve("fd").unwrap(), FieldType::I4);
        assert!(matches!(
            FieldType::resolve("CARD128"),
            Err(WireError::UnsupportedType { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "duplicate field")]
    fn test_duplicate_field_rejected() {
        ClassDescriptor::new(
            "Dup",
            StructKind::Struct,
            vec![
                FieldDescriptor::new("a", FieldType::U1),
                FieldDescriptor::new("a", FieldType::U2),
            ],
        );
    }

    #[test]
    #[should_panic(expected = "no declared size")]
    fn test_union_requires_size() {
        ClassDescriptor::new(
            "U",
            StructKind::Union,
            vec![FieldDescriptor::new("a", FieldType::U4)],
        );
    }

    #[test]
    #[should_panic(expected = "belongs to no case")]
    fn test_fields_after_switch_must_be_case_targets() {
        ClassDescriptor::new(
            "S",
            StructKind::Struct,
            vec![
                FieldDescriptor::new("mask", FieldType::U4),
                FieldDescriptor::new(
                    "sw",
                    FieldType::Switch {
                        discriminant: Expr::FieldRef("mask"),
                        cases: vec![SwitchCase::new(Expr::Lit(1), vec!["a"])],
                    },
                ),
                FieldDescriptor::new("a", FieldType::U1),
                FieldDescriptor::new("stray", FieldType::U1),
            ],
        );
    }

    #[test]
    fn test_walked_fields_stop_at_switch() {
        let class = ClassDescriptor::new(
            "S",
            StructKind::Struct,
            vec![
                FieldDescriptor::new("mask", FieldType::U4),
                FieldDescriptor::new(
                    "sw",
                    FieldType::Switch {
                        discriminant: Expr::FieldRef("mask"),
                        cases: vec![SwitchCase::new(Expr::Lit(1), vec!["a"])],
                    },
                ),
                FieldDescriptor::new("a", FieldType::U1),
            ],
        );
        assert_eq!(class.walked_fields().len(), 2);
    }

    #[test]
    fn test_registry_reply_lookup() {
        let mut reg = ClassRegistry::new();
        reg.register(ClassDescriptor::new(
            "InternAtom",
            StructKind::Request { opcode: 16 },
            vec![],
        ));
        reg.register(ClassDescriptor::with_size(
            "InternAtomReply",
            StructKind::Reply,
            vec![],
            Expr::Lit(32),
        ));
        let reply = reg.reply_for("InternAtom").unwrap();
        assert_eq!(reply.name, "InternAtomReply");
    }
}
