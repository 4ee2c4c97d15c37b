//! Client Flags
//!
//! Bitfield flags for window state, lifecycle and capabilities, plus the
//! per-type capability table.

use bitflags::bitflags;

bitflags! {
    /// Window state that clients and users toggle (mirrors _NET_WM_STATE)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WindowState: u32 {
        const MAXIMIZED_HORZ    = 1 << 0;
        const MAXIMIZED_VERT    = 1 << 1;
        const FULLSCREEN        = 1 << 2;
        const SHADED            = 1 << 3;
        const MINIMIZED         = 1 << 4;
        const STICKY            = 1 << 5;
        const ABOVE             = 1 << 6;
        const BELOW             = 1 << 7;
        const DEMANDS_ATTENTION = 1 << 8;
        const SKIP_TASKBAR      = 1 << 9;
        const SKIP_PAGER        = 1 << 10;
        const MODAL             = 1 << 11;
    }
}

impl WindowState {
    pub const MAXIMIZED: Self = Self::MAXIMIZED_HORZ.union(Self::MAXIMIZED_VERT);

    pub fn is_maximized(&self) -> bool {
        self.contains(Self::MAXIMIZED)
    }

    pub fn is_any_maximized(&self) -> bool {
        self.intersects(Self::MAXIMIZED)
    }
}

bitflags! {
    /// WM-internal lifecycle and bookkeeping flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmFlags: u32 {
        const PLACED                         = 1 << 0;
        const CONSTRUCTING                   = 1 << 1;
        const UNMANAGING                     = 1 << 2;
        const CALC_PLACEMENT                 = 1 << 3;
        const SHOWING_FOR_FIRST_TIME         = 1 << 4;
        const WAS_MINIMIZED                  = 1 << 5;
        const SHAKEN_LOOSE                   = 1 << 6;
        const MAXIMIZE_HORZ_AFTER_PLACEMENT  = 1 << 7;
        const MAXIMIZE_VERT_AFTER_PLACEMENT  = 1 << 8;
        const MINIMIZE_AFTER_PLACEMENT       = 1 << 9;
        const REQUIRE_FULLY_ONSCREEN         = 1 << 10;
        const REQUIRE_ON_SINGLE_MONITOR      = 1 << 11;
        const REQUIRE_TITLEBAR_VISIBLE       = 1 << 12;
        /// Client window is mapped by us
        const MAPPED                         = 1 << 13;
        /// WM_STATE is IconicState
        const ICONIC                         = 1 << 14;
        const HAS_FOCUS                      = 1 << 15;
        const INPUT                          = 1 << 16;
        const TAKE_FOCUS                     = 1 << 17;
        const DELETE_WINDOW                  = 1 << 18;
    }
}

bitflags! {
    /// Operations the window currently allows (_NET_WM_ALLOWED_ACTIONS)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Features: u32 {
        const DECORATED      = 1 << 0;
        const HAS_CLOSE      = 1 << 1;
        const HAS_MINIMIZE   = 1 << 2;
        const HAS_MAXIMIZE   = 1 << 3;
        const HAS_FULLSCREEN = 1 << 4;
        const HAS_MOVE       = 1 << 5;
        const HAS_RESIZE     = 1 << 6;
        const HAS_SHADE      = 1 << 7;
        const ALWAYS_STICKY  = 1 << 8;
        const SKIP_TASKBAR   = 1 << 9;
        const SKIP_PAGER     = 1 << 10;
    }
}

bitflags! {
    /// Deferred idle queues a window can sit in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct QueueKind: u8 {
        const CALC_SHOWING = 1 << 0;
        const MOVE_RESIZE  = 1 << 1;
        const UPDATE_ICON  = 1 << 2;
    }
}

impl QueueKind {
    /// Flush order: geometry before visibility before icons
    pub const FLUSH_ORDER: [QueueKind; 3] =
        [QueueKind::MOVE_RESIZE, QueueKind::CALC_SHOWING, QueueKind::UPDATE_ICON];

    pub fn name(self) -> &'static str {
        if self == Self::CALC_SHOWING {
            "calc_showing"
        } else if self == Self::MOVE_RESIZE {
            "move_resize"
        } else if self == Self::UPDATE_ICON {
            "update_icon"
        } else {
            "mixed"
        }
    }
}

bitflags! {
    /// Semantics of a `move_resize_internal` call
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MoveResizeFlags: u8 {
        /// x/y name the gravity reference point of the outer frame
        const CONFIGURE_REQUEST = 1 << 0;
        /// Update the user rect afterwards
        const USER_ACTION       = 1 << 1;
        const MOVE_ACTION       = 1 << 2;
        const RESIZE_ACTION     = 1 << 3;
        /// Treat x/y like a configure request without being one
        const DO_GRAVITY_ADJUST = 1 << 4;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MaximizeFlags: u8 {
        const HORIZONTAL = 1 << 0;
        const VERTICAL   = 1 << 1;
    }
}

impl MaximizeFlags {
    pub const BOTH: Self = Self::HORIZONTAL.union(Self::VERTICAL);

    pub fn as_state(self) -> WindowState {
        let mut state = WindowState::empty();
        if self.contains(Self::HORIZONTAL) {
            state |= WindowState::MAXIMIZED_HORZ;
        }
        if self.contains(Self::VERTICAL) {
            state |= WindowState::MAXIMIZED_VERT;
        }
        state
    }
}

/// Window type (EWMH _NET_WM_WINDOW_TYPE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowType {
    #[default]
    Normal,
    Desktop,
    Dock,
    Dialog,
    ModalDialog,
    Toolbar,
    Menu,
    Utility,
    Splashscreen,
    Notification,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Combo,
    Dnd,
}

/// Window layer (for stacking)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WindowLayer {
    Desktop = 0,
    Below = 1,
    Normal = 2,
    Above = 3,
    Dock = 4,
    Fullscreen = 5,
}

/// Immutable per-type defaults
///
/// Every `match` on [`WindowType`] that decides capabilities, focus or
/// stacking goes through this record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeCapabilities {
    pub decorated: bool,
    pub closable: bool,
    pub movable: bool,
    pub resizable: bool,
    pub shadeable: bool,
    /// Minimize, maximize and fullscreen are offered to normal windows only
    pub window_ops: bool,
    pub always_sticky: bool,
    pub skip_taskbar: bool,
    /// Skip the taskbar only when transient for a real parent
    pub skip_taskbar_if_transient: bool,
    /// May take focus when first shown
    pub focus_on_map: bool,
    /// May be raised when first shown
    pub raise_on_map: bool,
    /// Desktop and dock windows are exempt from onscreen constraints and
    /// stay visible in show-desktop mode
    pub is_desktop_or_dock: bool,
    pub layer: WindowLayer,
}

const NORMAL_CAPS: TypeCapabilities = TypeCapabilities {
    decorated: true,
    closable: true,
    movable: true,
    resizable: true,
    shadeable: true,
    window_ops: true,
    always_sticky: false,
    skip_taskbar: false,
    skip_taskbar_if_transient: false,
    focus_on_map: true,
    raise_on_map: true,
    is_desktop_or_dock: false,
    layer: WindowLayer::Normal,
};

const DIALOG_CAPS: TypeCapabilities = TypeCapabilities {
    window_ops: false,
    skip_taskbar_if_transient: true,
    ..NORMAL_CAPS
};

const PANEL_CAPS: TypeCapabilities = TypeCapabilities {
    decorated: false,
    closable: false,
    movable: false,
    resizable: false,
    shadeable: false,
    window_ops: false,
    always_sticky: true,
    skip_taskbar: true,
    focus_on_map: false,
    is_desktop_or_dock: true,
    ..NORMAL_CAPS
};

const AUXILIARY_CAPS: TypeCapabilities = TypeCapabilities {
    window_ops: false,
    skip_taskbar: true,
    focus_on_map: false,
    ..NORMAL_CAPS
};

const TABLE: [(WindowType, TypeCapabilities); 15] = [
    (WindowType::Normal, NORMAL_CAPS),
    (WindowType::Desktop, TypeCapabilities { layer: WindowLayer::Desktop, ..PANEL_CAPS }),
    (WindowType::Dock, TypeCapabilities { layer: WindowLayer::Dock, ..PANEL_CAPS }),
    (WindowType::Dialog, DIALOG_CAPS),
    (WindowType::ModalDialog, DIALOG_CAPS),
    (
        WindowType::Toolbar,
        TypeCapabilities { decorated: false, raise_on_map: false, ..AUXILIARY_CAPS },
    ),
    (WindowType::Menu, AUXILIARY_CAPS),
    (WindowType::Utility, TypeCapabilities { raise_on_map: false, ..AUXILIARY_CAPS }),
    (
        WindowType::Splashscreen,
        TypeCapabilities {
            decorated: false,
            closable: false,
            movable: false,
            resizable: false,
            shadeable: false,
            ..AUXILIARY_CAPS
        },
    ),
    (WindowType::Notification, AUXILIARY_CAPS),
    (WindowType::DropdownMenu, AUXILIARY_CAPS),
    (WindowType::PopupMenu, AUXILIARY_CAPS),
    (WindowType::Tooltip, AUXILIARY_CAPS),
    (WindowType::Combo, AUXILIARY_CAPS),
    (WindowType::Dnd, AUXILIARY_CAPS),
];

impl WindowType {
    pub fn capabilities(self) -> &'static TypeCapabilities {
        // The table is indexed in declaration order
        &TABLE[self as usize].1
    }
}
