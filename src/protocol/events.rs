//! Core protocol event schemas
//!
//! Events are sent from the server to clients to notify them of state
//! changes, user input, and other interesting occurrences. Like the request
//! tables, everything here is descriptor data; the event preamble, the
//! 32-byte floor and the number lookup all live in the engine.

use std::sync::Arc;

use super::descriptor::{
    ClassDescriptor, ClassRegistry, EventCodeSource, EventNumber, FieldDescriptor, FieldType,
    StructKind,
};
use super::expr::Expr;

/// Event type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    KeyPress = 2,
    KeyRelease = 3,
    ButtonPress = 4,
    ButtonRelease = 5,
    MotionNotify = 6,
    EnterNotify = 7,
    LeaveNotify = 8,
    FocusIn = 9,
    FocusOut = 10,
    KeymapNotify = 11,
    Expose = 12,
    GraphicsExposure = 13,
    NoExposure = 14,
    VisibilityNotify = 15,
    CreateNotify = 16,
    DestroyNotify = 17,
    UnmapNotify = 18,
    MapNotify = 19,
    MapRequest = 20,
    ReparentNotify = 21,
    ConfigureNotify = 22,
    ConfigureRequest = 23,
    GravityNotify = 24,
    ResizeRequest = 25,
    CirculateNotify = 26,
    CirculateRequest = 27,
    PropertyNotify = 28,
    SelectionClear = 29,
    SelectionRequest = 30,
    SelectionNotify = 31,
    ColormapNotify = 32,
    ClientMessage = 33,
    MappingNotify = 34,
}

fn list(element: FieldType, size: Expr) -> FieldType {
    FieldType::List {
        element: Box::new(element),
        size,
    }
}

/// Key press and release share one 32-byte layout.
fn key_event(name: &'static str) -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        name,
        StructKind::Event,
        vec![
            FieldDescriptor::new("detail", FieldType::U1),
            FieldDescriptor::new("sequence", FieldType::U2),
            FieldDescriptor::new("time", FieldType::U4),
            FieldDescriptor::new("root", FieldType::U4),
            FieldDescriptor::new("event", FieldType::U4),
            FieldDescriptor::new("child", FieldType::U4),
            FieldDescriptor::new("root_x", FieldType::I2),
            FieldDescriptor::new("root_y", FieldType::I2),
            FieldDescriptor::new("event_x", FieldType::I2),
            FieldDescriptor::new("event_y", FieldType::I2),
            FieldDescriptor::new("state", FieldType::U2),
            FieldDescriptor::new("same_screen", FieldType::U1),
            FieldDescriptor::new("pad0", FieldType::Pad(Expr::Lit(1))),
        ],
    )
}

pub fn key_press() -> Arc<ClassDescriptor> {
    key_event("KeyPress")
}

pub fn key_release() -> Arc<ClassDescriptor> {
    key_event("KeyRelease")
}

/// Expose stops after `count`; the engine pads the frame to 32 bytes.
pub fn expose() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "Expose",
        StructKind::Event,
        vec![
            FieldDescriptor::new("pad0", FieldType::Pad(Expr::Lit(1))),
            FieldDescriptor::new("sequence", FieldType::U2),
            FieldDescriptor::new("window", FieldType::U4),
            FieldDescriptor::new("x", FieldType::U2),
            FieldDescriptor::new("y", FieldType::U2),
            FieldDescriptor::new("width", FieldType::U2),
            FieldDescriptor::new("height", FieldType::U2),
            FieldDescriptor::new("count", FieldType::U2),
        ],
    )
}

/// The 20 data bytes of a ClientMessage, viewable as bytes, shorts or
/// longs. Whichever member the sender bound travels; a receiver gets all
/// three views.
pub fn client_message_data() -> Arc<ClassDescriptor> {
    ClassDescriptor::with_size(
        "ClientMessageData",
        StructKind::Union,
        vec![
            FieldDescriptor::new("data8", list(FieldType::U1, Expr::Lit(20))),
            FieldDescriptor::new("data16", list(FieldType::U2, Expr::Lit(10))),
            FieldDescriptor::new("data32", list(FieldType::U4, Expr::Lit(5))),
        ],
        Expr::Lit(20),
    )
}

pub fn client_message() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "ClientMessage",
        StructKind::Event,
        vec![
            FieldDescriptor::new("format", FieldType::U1),
            FieldDescriptor::new("sequence", FieldType::U2),
            FieldDescriptor::new("window", FieldType::U4),
            FieldDescriptor::new("type", FieldType::U4),
            FieldDescriptor::new("data", FieldType::Struct(client_message_data())),
        ],
    )
}

/// The generic (code 35) event frame: extension id and evtype discriminant
/// up front, extension-private payload behind.
pub fn ge_generic() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "GeGeneric",
        StructKind::GenericEvent,
        vec![
            FieldDescriptor::new("extension", FieldType::U2),
            FieldDescriptor::new("evtype", FieldType::U2),
            FieldDescriptor::new("sequence", FieldType::U2),
            FieldDescriptor::new("data", list(FieldType::Void, Expr::Lit(25))),
        ],
    )
}

/// XKB-style event: every XKB event shares one server-assigned code and is
/// discriminated by the leading xkbType byte.
pub fn xkb_state_notify() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "XkbStateNotify",
        StructKind::Event,
        vec![
            FieldDescriptor::new("xkbType", FieldType::U1),
            FieldDescriptor::new("sequence", FieldType::U2),
            FieldDescriptor::new("time", FieldType::U4),
            FieldDescriptor::new("device_id", FieldType::U1),
            FieldDescriptor::new("mods", FieldType::U1),
            FieldDescriptor::new("base_mods", FieldType::U1),
            FieldDescriptor::new("latched_mods", FieldType::U1),
            FieldDescriptor::new("locked_mods", FieldType::U1),
            FieldDescriptor::new("group", FieldType::U1),
        ],
    )
}

/// Number lookup for the core events. Extension and XKB numbers depend on
/// the connection's negotiated state, so those come from whoever owns the
/// connection, not from here.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreEventSource;

impl EventCodeSource for CoreEventSource {
    fn event_number(&self, class: &str) -> Option<EventNumber> {
        let code = match class {
            "KeyPress" => EventType::KeyPress,
            "KeyRelease" => EventType::KeyRelease,
            "Expose" => EventType::Expose,
            "ClientMessage" => EventType::ClientMessage,
            _ => return None,
        };
        Some(EventNumber::Core(code as u8))
    }
}

/// Register the core event classes.
pub fn register_core(registry: &mut ClassRegistry) {
    registry.register(key_press());
    registry.register(key_release());
    registry.register(expose());
    registry.register(client_message_data());
    registry.register(client_message());
    registry.register(ge_generic());
    registry.register(xkb_state_notify());
}
