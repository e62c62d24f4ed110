//! Marshalling failure taxonomy and X11 protocol error codes
//!
//! `WireError` is what the engine returns to the caller. `ErrorCode` and the
//! error-packet classes describe the X11 error *messages* that travel on the
//! wire, which are ordinary schema data like any other message class.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::descriptor::{ClassDescriptor, ClassRegistry, FieldDescriptor, FieldType, StructKind};
use super::expr::Expr;

/// Failures surfaced by marshal/unmarshal. Nothing is recovered internally;
/// every variant names the class (and field where one applies) so callers can
/// pin down schema and input problems.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("unrecognized type tag `{tag}`")]
    UnsupportedType { tag: String },

    #[error("{class} marshalled to {actual} bytes but declares a size of {declared}")]
    SizeMismatch {
        class: String,
        declared: usize,
        actual: usize,
    },

    #[error("list `{field}` of {class} holds {actual} elements but its size expression gives {expected}")]
    ListSizeMismatch {
        class: String,
        field: String,
        expected: usize,
        actual: usize,
    },

    #[error("{class} declares a size of {declared} but {parsed} bytes were already parsed")]
    DeclaredSizeTooSmall {
        class: String,
        declared: usize,
        parsed: usize,
    },

    #[error("{class} needs {needed} bytes, only {available} available")]
    InputTooShort {
        class: String,
        needed: usize,
        available: usize,
    },

    #[error("union {class} member `{field}` occupies {actual} bytes, exceeding the union size {size}")]
    UnionOverflow {
        class: String,
        field: String,
        actual: usize,
        size: usize,
    },

    #[error("size expression for `{field}` of {class} is invalid: {detail}")]
    BadSizeExpression {
        class: String,
        field: String,
        detail: String,
    },

    #[error("bit pattern {bits:#x} does not fit a {width}-byte float")]
    BadFloat { bits: u64, width: usize },

    #[error("slot `{field}` of {class} is unbound")]
    MissingField { class: String, field: String },

    #[error("slot `{field}` of {class} holds a value unusable for its declared type")]
    BadSlotValue { class: String, field: String },
}

/// Result type for marshalling operations
pub type WireResult<T> = Result<T, WireError>;

/// X11 error codes as defined in the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Request = 1,
    Value = 2,
    Window = 3,
    Pixmap = 4,
    Atom = 5,
    Cursor = 6,
    Font = 7,
    Match = 8,
    Drawable = 9,
    Access = 10,
    Alloc = 11,
    Colormap = 12,
    GContext = 13,
    IDChoice = 14,
    Name = 15,
    Length = 16,
    Implementation = 17,
}

impl ErrorCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            1 => Some(ErrorCode::Request),
            2 => Some(ErrorCode::Value),
            3 => Some(ErrorCode::Window),
            4 => Some(ErrorCode::Pixmap),
            5 => Some(ErrorCode::Atom),
            6 => Some(ErrorCode::Cursor),
            7 => Some(ErrorCode::Font),
            8 => Some(ErrorCode::Match),
            9 => Some(ErrorCode::Drawable),
            10 => Some(ErrorCode::Access),
            11 => Some(ErrorCode::Alloc),
            12 => Some(ErrorCode::Colormap),
            13 => Some(ErrorCode::GContext),
            14 => Some(ErrorCode::IDChoice),
            15 => Some(ErrorCode::Name),
            16 => Some(ErrorCode::Length),
            17 => Some(ErrorCode::Implementation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Request => "Request: bad request code",
            ErrorCode::Value => "Value: integer parameter out of range",
            ErrorCode::Window => "Window: invalid Window parameter",
            ErrorCode::Pixmap => "Pixmap: invalid Pixmap parameter",
            ErrorCode::Atom => "Atom: invalid Atom parameter",
            ErrorCode::Cursor => "Cursor: invalid Cursor parameter",
            ErrorCode::Font => "Font: invalid Font parameter",
            ErrorCode::Match => "Match: parameter mismatch",
            ErrorCode::Drawable => "Drawable: invalid Drawable parameter",
            ErrorCode::Access => "Access: attempt to access private resource",
            ErrorCode::Alloc => "Alloc: insufficient resources",
            ErrorCode::Colormap => "Colormap: invalid Colormap parameter",
            ErrorCode::GContext => "GContext: invalid GC parameter",
            ErrorCode::IDChoice => "IDChoice: invalid resource ID for this connection",
            ErrorCode::Name => "Name: font or color name doesn't exist",
            ErrorCode::Length => "Length: request length incorrect",
            ErrorCode::Implementation => "Implementation: server implementation error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The standard error classes, in protocol order.
pub const CORE_ERROR_CLASSES: [(&str, ErrorCode); 17] = [
    ("RequestError", ErrorCode::Request),
    ("ValueError", ErrorCode::Value),
    ("WindowError", ErrorCode::Window),
    ("PixmapError", ErrorCode::Pixmap),
    ("AtomError", ErrorCode::Atom),
    ("CursorError", ErrorCode::Cursor),
    ("FontError", ErrorCode::Font),
    ("MatchError", ErrorCode::Match),
    ("DrawableError", ErrorCode::Drawable),
    ("AccessError", ErrorCode::Access),
    ("AllocError", ErrorCode::Alloc),
    ("ColormapError", ErrorCode::Colormap),
    ("GContextError", ErrorCode::GContext),
    ("IDChoiceError", ErrorCode::IDChoice),
    ("NameError", ErrorCode::Name),
    ("LengthError", ErrorCode::Length),
    ("ImplementationError", ErrorCode::Implementation),
];

/// Build the standard 32-byte error packet class. After the marker, code and
/// sequence preamble come the offending value and the request opcodes.
pub fn error_class(name: &'static str, code: ErrorCode) -> Arc<ClassDescriptor> {
    ClassDescriptor::with_size(
        name,
        StructKind::Error { code: code as u8 },
        vec![
            FieldDescriptor::new("bad_value", FieldType::U4),
            FieldDescriptor::new("minor_opcode", FieldType::U2),
            FieldDescriptor::new("major_opcode", FieldType::U1),
            FieldDescriptor::new("pad0", FieldType::Pad(Expr::Lit(21))),
        ],
        Expr::Lit(32),
    )
}

/// Register the standard error classes.
pub fn register_core(registry: &mut ClassRegistry) {
    for (name, code) in CORE_ERROR_CLASSES {
        registry.register(error_class(name, code));
    }
}
