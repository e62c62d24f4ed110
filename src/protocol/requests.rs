//! Core protocol request and reply schemas
//!
//! These are descriptor tables, the kind of data an XML schema generator
//! emits. The engine owns all wire semantics; everything here is shape.

use std::sync::Arc;

use super::descriptor::{
    ClassDescriptor, ClassRegistry, FieldDescriptor, FieldType, StructKind, SwitchCase,
};
use super::expr::Expr;

/// X11 request opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestOpcode {
    CreateWindow = 1,
    ChangeWindowAttributes = 2,
    GetWindowAttributes = 3,
    DestroyWindow = 4,
    DestroySubwindows = 5,
    ChangeSaveSet = 6,
    ReparentWindow = 7,
    MapWindow = 8,
    MapSubwindows = 9,
    UnmapWindow = 10,
    UnmapSubwindows = 11,
    ConfigureWindow = 12,
    CirculateWindow = 13,
    GetGeometry = 14,
    QueryTree = 15,
    InternAtom = 16,
    GetAtomName = 17,
    ChangeProperty = 18,
    DeleteProperty = 19,
    GetProperty = 20,
    ListProperties = 21,
    SetSelectionOwner = 22,
    GetSelectionOwner = 23,
    ConvertSelection = 24,
    SendEvent = 25,
    GrabPointer = 26,
    UngrabPointer = 27,
    GrabButton = 28,
    UngrabButton = 29,
    ChangeActivePointerGrab = 30,
    GrabKeyboard = 31,
    UngrabKeyboard = 32,
    GrabKey = 33,
    UngrabKey = 34,
    AllowEvents = 35,
    GrabServer = 36,
    UngrabServer = 37,
    QueryPointer = 38,
    GetMotionEvents = 39,
    TranslateCoordinates = 40,
    WarpPointer = 41,
    SetInputFocus = 42,
    GetInputFocus = 43,
    QueryKeymap = 44,
    OpenFont = 45,
    CloseFont = 46,
    QueryFont = 47,
    QueryTextExtents = 48,
    ListFonts = 49,
    ListFontsWithInfo = 50,
    SetFontPath = 51,
    GetFontPath = 52,
    CreatePixmap = 53,
    FreePixmap = 54,
    CreateGC = 55,
    ChangeGC = 56,
    CopyGC = 57,
    SetDashes = 58,
    SetClipRectangles = 59,
    FreeGC = 60,
    ClearArea = 61,
    CopyArea = 62,
    CopyPlane = 63,
    PolyPoint = 64,
    PolyLine = 65,
    PolySegment = 66,
    PolyRectangle = 67,
    PolyArc = 68,
    FillPoly = 69,
    PolyFillRectangle = 70,
    PolyFillArc = 71,
    PutImage = 72,
    GetImage = 73,
    PolyText8 = 74,
    PolyText16 = 75,
    ImageText8 = 76,
    ImageText16 = 77,
    CreateColormap = 78,
    FreeColormap = 79,
    CopyColormapAndFree = 80,
    InstallColormap = 81,
    UninstallColormap = 82,
    ListInstalledColormaps = 83,
    AllocColor = 84,
    AllocNamedColor = 85,
    AllocColorCells = 86,
    AllocColorPlanes = 87,
    FreeColors = 88,
    StoreColors = 89,
    StoreNamedColor = 90,
    QueryColors = 91,
    LookupColor = 92,
    CreateCursor = 93,
    CreateGlyphCursor = 94,
    FreeCursor = 95,
    RecolorCursor = 96,
    QueryBestSize = 97,
    QueryExtension = 98,
    ListExtensions = 99,
    ChangeKeyboardMapping = 100,
    GetKeyboardMapping = 101,
    ChangeKeyboardControl = 102,
    GetKeyboardControl = 103,
    Bell = 104,
    ChangePointerControl = 105,
    GetPointerControl = 106,
    SetScreenSaver = 107,
    GetScreenSaver = 108,
    ChangeHosts = 109,
    ListHosts = 110,
    SetAccessControl = 111,
    SetCloseDownMode = 112,
    KillClient = 113,
    RotateProperties = 114,
    ForceScreenSaver = 115,
    SetPointerMapping = 116,
    GetPointerMapping = 117,
    SetModifierMapping = 118,
    GetModifierMapping = 119,
    NoOperation = 127,
}

/// CreateWindow attribute mask bits for the trailing value list.
pub const CW_BACKGROUND_PIXEL: u32 = 1 << 1;
pub const CW_BORDER_PIXEL: u32 = 1 << 3;
pub const CW_EVENT_MASK: u32 = 1 << 11;

fn list(element: FieldType, size: Expr) -> FieldType {
    FieldType::List {
        element: Box::new(element),
        size,
    }
}

/// A rectangle as it travels inside drawing requests.
pub fn rectangle() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "Rectangle",
        StructKind::Struct,
        vec![
            FieldDescriptor::new("x", FieldType::I2),
            FieldDescriptor::new("y", FieldType::I2),
            FieldDescriptor::new("width", FieldType::U2),
            FieldDescriptor::new("height", FieldType::U2),
        ],
    )
}

pub fn point() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "Point",
        StructKind::Struct,
        vec![
            FieldDescriptor::new("x", FieldType::I2),
            FieldDescriptor::new("y", FieldType::I2),
        ],
    )
}

/// InternAtom: name bytes follow their length, padded out to the 4-byte
/// request granularity.
pub fn intern_atom() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "InternAtom",
        StructKind::Request {
            opcode: RequestOpcode::InternAtom as u8,
        },
        vec![
            FieldDescriptor::new("only_if_exists", FieldType::U1),
            FieldDescriptor::new("name_len", FieldType::U2),
            FieldDescriptor::new("pad0", FieldType::Pad(Expr::Lit(2))),
            FieldDescriptor::new("name", list(FieldType::Char, Expr::FieldRef("name_len"))),
            FieldDescriptor::new("pad1", FieldType::PadAlign { align: 4 }),
        ],
    )
}

pub fn intern_atom_reply() -> Arc<ClassDescriptor> {
    ClassDescriptor::with_size(
        "InternAtomReply",
        StructKind::Reply,
        vec![
            FieldDescriptor::new("pad0", FieldType::Pad(Expr::Lit(1))),
            FieldDescriptor::new("sequence", FieldType::U2),
            FieldDescriptor::new("length", FieldType::U4),
            FieldDescriptor::new("atom", FieldType::U4),
            FieldDescriptor::new("pad1", FieldType::Pad(Expr::Lit(20))),
        ],
        Expr::Lit(32),
    )
}

pub fn get_property() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "GetProperty",
        StructKind::Request {
            opcode: RequestOpcode::GetProperty as u8,
        },
        vec![
            FieldDescriptor::new("delete", FieldType::U1),
            FieldDescriptor::new("window", FieldType::U4),
            FieldDescriptor::new("property", FieldType::U4),
            FieldDescriptor::new("type", FieldType::U4),
            FieldDescriptor::new("long_offset", FieldType::U4),
            FieldDescriptor::new("long_length", FieldType::U4),
        ],
    )
}

/// GetProperty's reply carries `value_len` items of `format` bits each; the
/// reply length field counts the padded value in 4-byte units.
pub fn get_property_reply() -> Arc<ClassDescriptor> {
    ClassDescriptor::with_size(
        "GetPropertyReply",
        StructKind::Reply,
        vec![
            FieldDescriptor::new("format", FieldType::U1),
            FieldDescriptor::new("sequence", FieldType::U2),
            FieldDescriptor::new("length", FieldType::U4),
            FieldDescriptor::new("type", FieldType::U4),
            FieldDescriptor::new("bytes_after", FieldType::U4),
            FieldDescriptor::new("value_len", FieldType::U4),
            FieldDescriptor::new("pad0", FieldType::Pad(Expr::Lit(12))),
            FieldDescriptor::new(
                "value",
                list(
                    FieldType::Void,
                    Expr::mul(
                        Expr::FieldRef("value_len"),
                        Expr::div(Expr::FieldRef("format"), Expr::Lit(8)),
                    ),
                ),
            ),
            FieldDescriptor::new("pad1", FieldType::PadAlign { align: 4 }),
        ],
        Expr::add(Expr::Lit(32), Expr::mul(Expr::Lit(4), Expr::FieldRef("length"))),
    )
}

/// CreateWindow: the fixed header is followed by a value list whose members
/// are selected by bits of `value_mask`.
pub fn create_window() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "CreateWindow",
        StructKind::Request {
            opcode: RequestOpcode::CreateWindow as u8,
        },
        vec![
            FieldDescriptor::new("depth", FieldType::U1),
            FieldDescriptor::new("wid", FieldType::U4),
            FieldDescriptor::new("parent", FieldType::U4),
            FieldDescriptor::new("x", FieldType::I2),
            FieldDescriptor::new("y", FieldType::I2),
            FieldDescriptor::new("width", FieldType::U2),
            FieldDescriptor::new("height", FieldType::U2),
            FieldDescriptor::new("border_width", FieldType::U2),
            FieldDescriptor::new("class", FieldType::U2),
            FieldDescriptor::new("visual", FieldType::U4),
            FieldDescriptor::new("value_mask", FieldType::U4),
            FieldDescriptor::new(
                "values",
                FieldType::Switch {
                    discriminant: Expr::FieldRef("value_mask"),
                    cases: vec![
                        SwitchCase::new(
                            Expr::Lit(CW_BACKGROUND_PIXEL as i128),
                            vec!["background_pixel"],
                        ),
                        SwitchCase::new(Expr::Lit(CW_BORDER_PIXEL as i128), vec!["border_pixel"]),
                        SwitchCase::new(Expr::Lit(CW_EVENT_MASK as i128), vec!["event_mask"]),
                    ],
                },
            ),
            FieldDescriptor::new("background_pixel", FieldType::U4),
            FieldDescriptor::new("border_pixel", FieldType::U4),
            FieldDescriptor::new("event_mask", FieldType::U4),
        ],
    )
}

/// PolyRectangle: the rectangle count is not on the wire (the transport
/// derives it from the request length), so it rides in an ignore slot.
pub fn poly_rectangle() -> Arc<ClassDescriptor> {
    ClassDescriptor::new(
        "PolyRectangle",
        StructKind::Request {
            opcode: RequestOpcode::PolyRectangle as u8,
        },
        vec![
            FieldDescriptor::new("pad0", FieldType::Pad(Expr::Lit(1))),
            FieldDescriptor::new("drawable", FieldType::U4),
            FieldDescriptor::new("gc", FieldType::U4),
            FieldDescriptor::new("rectangles_len", FieldType::Ignore),
            FieldDescriptor::new(
                "rectangles",
                list(
                    FieldType::Struct(rectangle()),
                    Expr::FieldRef("rectangles_len"),
                ),
            ),
        ],
    )
}

/// Register the core request and reply classes.
pub fn register_core(registry: &mut ClassRegistry) {
    registry.register(rectangle());
    registry.register(point());
    registry.register(intern_atom());
    registry.register(intern_atom_reply());
    registry.register(get_property());
    registry.register(get_property_reply());
    registry.register(create_window());
    registry.register(poly_rectangle());
}
