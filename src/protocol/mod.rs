//! X11 wire-format marshalling
//!
//! This module implements the schema-driven marshalling core: primitive
//! codecs, the type descriptor model, the generic struct engine, the
//! expression evaluator and the specialized message kinds.

pub mod codec;
pub mod descriptor;
pub mod encoder;
pub mod errors;
pub mod events;
pub mod expr;
pub mod parser;
pub mod requests;
pub mod types;

pub use descriptor::*;
pub use encoder::{marshal, marshal_event};
pub use errors::{error_class, ErrorCode, WireError, WireResult};
pub use expr::{BinOp, Expr, UnOp};
pub use parser::unmarshal;
pub use types::*;

/// X11 protocol version
pub const PROTOCOL_MAJOR_VERSION: u16 = 11;
pub const PROTOCOL_MINOR_VERSION: u16 = 0;

/// First byte of a reply
pub const REPLY_MARKER: u8 = 1;
/// First byte of an error packet
pub const ERROR_MARKER: u8 = 0;
/// Event code shared by all generic (XGE) events
pub const GENERIC_EVENT_CODE: u8 = 35;
/// Minimum wire length of an event
pub const EVENT_LENGTH: usize = 32;

/// Padding helper - X11 requires data to be padded to 4-byte boundaries
pub fn pad(n: usize) -> usize {
    (4 - (n % 4)) % 4
}

/// Calculate padded length
pub fn padded_len(n: usize) -> usize {
    n + pad(n)
}

/// Registry holding the core protocol schemas shipped with this crate.
pub fn core_registry() -> ClassRegistry {
    let mut registry = ClassRegistry::new();
    requests::register_core(&mut registry);
    events::register_core(&mut registry);
    errors::register_core(&mut registry);
    registry
}
