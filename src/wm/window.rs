//! Managed Window
//!
//! Per-window state: the geometry triad (client, frame, user and saved
//! rects), hints, state flags, derived capabilities, queue membership and
//! the sync handshake.

use crate::shared::{FrameInsets, Rect};
use crate::wm::client_flags::{
    Features, QueueKind, WindowLayer, WindowState, WindowType, WmFlags,
};
use crate::wm::display::WindowInfo;
use crate::wm::hints::{MotifHints, SizeHints, Strut, WmHints};
use crate::wm::sync::SyncState;

/// Window classes treated as terminals by strict focus
const TERMINAL_CLASSES: [&str; 8] = [
    "Gnome-terminal",
    "XTerm",
    "Konsole",
    "URxvt",
    "Eterm",
    "KTerm",
    "Multi-gnome-terminal",
    "mlterm",
];

/// Decoration window wrapped around a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u32,
    /// Outer rect in root coordinates
    pub rect: Rect,
    pub insets: FrameInsets,
    /// Client position inside the frame
    pub child_x: i32,
    pub child_y: i32,
    pub mapped: bool,
}

#[derive(Debug, Clone)]
pub struct ManagedWindow {
    pub id: u32,
    pub title: String,
    pub class: String,
    pub window_type: WindowType,

    /// Client area in root coordinates
    pub rect: Rect,
    pub frame: Option<Frame>,
    /// Last geometry the user asked for
    pub user_rect: Rect,
    /// Geometry to go back to when leaving maximized or fullscreen
    pub saved_rect: Rect,
    /// Border width the client last requested; we always run it at 0
    pub border_width: i32,

    pub size_hints: SizeHints,
    pub wm_hints: WmHints,
    pub motif: MotifHints,
    pub strut: Option<Strut>,
    pub transient_for: Option<u32>,
    /// `_NET_WM_USER_TIME`; `Some(0)` means "do not focus on map"
    pub user_time: Option<u32>,

    pub state: WindowState,
    pub flags: WmFlags,
    pub features: Features,
    pub queued: QueueKind,
    pub sync: SyncState,

    pub workspace: u32,
    /// Unmaps we caused and whose UnmapNotify is still to come
    pub unmaps_pending: u32,
}

impl ManagedWindow {
    pub fn new(id: u32, info: &WindowInfo, workspace: u32) -> Self {
        let mut flags = WmFlags::CONSTRUCTING | WmFlags::SHOWING_FOR_FIRST_TIME;
        if info.take_focus {
            flags |= WmFlags::TAKE_FOCUS;
        }
        if info.delete_window {
            flags |= WmFlags::DELETE_WINDOW;
        }
        let wm_hints = WmHints::from_raw(&info.wm_hints);
        if wm_hints.input {
            flags |= WmFlags::INPUT;
        }

        let mut state = info.initial_state;
        if wm_hints.initial_iconic {
            state |= WindowState::MINIMIZED;
        }

        Self {
            id,
            title: info.title.clone(),
            class: info.class.clone(),
            window_type: info.window_type,
            rect: info.rect,
            frame: None,
            user_rect: info.rect,
            saved_rect: info.rect,
            border_width: info.border_width,
            size_hints: SizeHints::from_raw(&info.normal_hints),
            wm_hints,
            motif: MotifHints::from_raw(&info.motif_hints),
            strut: Strut::from_raw(&info.strut),
            transient_for: info.transient_for,
            user_time: info.user_time,
            state,
            flags,
            features: Features::empty(),
            queued: QueueKind::empty(),
            sync: SyncState { counter: info.sync_counter, ..Default::default() },
            workspace: info.desktop.unwrap_or(workspace),
            unmaps_pending: 0,
        }
    }

    /// `0x<id> (<title>)`, used in every log line about this window
    pub fn desc(&self) -> String {
        let mut title: String = self.title.chars().take(20).collect();
        if self.title.chars().count() > 20 {
            title.push('…');
        }
        format!("0x{:x} ({})", self.id, title)
    }

    pub fn is_fullscreen(&self) -> bool {
        self.state.contains(WindowState::FULLSCREEN)
    }

    pub fn is_maximized(&self) -> bool {
        self.state.is_maximized()
    }

    pub fn is_shaded(&self) -> bool {
        self.state.contains(WindowState::SHADED)
    }

    pub fn is_minimized(&self) -> bool {
        self.state.contains(WindowState::MINIMIZED)
    }

    pub fn is_sticky(&self) -> bool {
        self.state.contains(WindowState::STICKY) || self.features.contains(Features::ALWAYS_STICKY)
    }

    pub fn is_placed(&self) -> bool {
        self.flags.contains(WmFlags::PLACED)
    }

    pub fn is_unmanaging(&self) -> bool {
        self.flags.contains(WmFlags::UNMANAGING)
    }

    pub fn is_desktop_or_dock(&self) -> bool {
        self.window_type.capabilities().is_desktop_or_dock
    }

    pub fn is_terminal(&self) -> bool {
        TERMINAL_CLASSES.contains(&self.class.as_str())
    }

    pub fn insets(&self) -> Option<&FrameInsets> {
        self.frame.as_ref().map(|f| &f.insets)
    }

    /// Frame rect if framed, client rect otherwise
    pub fn outer_rect(&self) -> Rect {
        match &self.frame {
            Some(frame) => frame.rect,
            None => self.rect,
        }
    }

    /// Top-level window used for stacking and input
    pub fn toplevel(&self) -> u32 {
        self.frame.as_ref().map(|f| f.id).unwrap_or(self.id)
    }

    /// Titlebar area of a decorated frame
    pub fn titlebar_rect(&self) -> Option<Rect> {
        let frame = self.frame.as_ref()?;
        Some(Rect::new(frame.rect.x, frame.rect.y, frame.rect.width, frame.insets.top))
    }

    /// Expected frame rect for the current client rect
    pub fn frame_rect_for(rect: &Rect, insets: &FrameInsets, shaded: bool) -> Rect {
        let mut outer = rect.expand_by(insets);
        if shaded {
            outer.height = insets.top;
        }
        outer
    }

    pub fn layer(&self) -> WindowLayer {
        if self.is_fullscreen() {
            return WindowLayer::Fullscreen;
        }
        let base = self.window_type.capabilities().layer;
        if base != WindowLayer::Normal {
            return base;
        }
        if self.state.contains(WindowState::ABOVE) {
            WindowLayer::Above
        } else if self.state.contains(WindowState::BELOW) {
            WindowLayer::Below
        } else {
            WindowLayer::Normal
        }
    }

    /// Derive capabilities from type, hints and state
    ///
    /// `screen` is the whole screen size; a non-resizable window may still go
    /// fullscreen if its minimum size covers it.
    pub fn recalc_features(&mut self, screen: Rect) {
        let caps = self.window_type.capabilities();
        let motif = self.motif;
        let mut f = Features::empty();

        f.set(Features::DECORATED, motif.decorated && caps.decorated);
        f.set(Features::HAS_CLOSE, motif.has_close && caps.closable);
        f.set(Features::HAS_MINIMIZE, motif.has_minimize && caps.window_ops);
        f.set(Features::HAS_MAXIMIZE, motif.has_maximize && caps.window_ops);
        f.set(Features::HAS_FULLSCREEN, caps.window_ops);
        f.set(Features::HAS_MOVE, motif.has_move && caps.movable);
        f.set(
            Features::HAS_RESIZE,
            motif.has_resize && caps.resizable && !self.size_hints.is_fixed_size(),
        );
        f.set(Features::HAS_SHADE, caps.shadeable);
        f.set(Features::ALWAYS_STICKY, caps.always_sticky);

        if !f.contains(Features::HAS_RESIZE) {
            f.remove(Features::HAS_MAXIMIZE);
            let covers_screen = self.size_hints.min_width == screen.width
                && self.size_hints.min_height == screen.height;
            if !covers_screen {
                f.remove(Features::HAS_FULLSCREEN);
            }
        }

        if self.is_fullscreen() {
            f.remove(Features::HAS_SHADE | Features::HAS_MOVE | Features::HAS_RESIZE | Features::HAS_MAXIMIZE);
        }

        if !f.contains(Features::DECORATED) || motif.border_only {
            f.remove(Features::HAS_SHADE);
        }

        let skip_taskbar = caps.skip_taskbar
            || (caps.skip_taskbar_if_transient && self.transient_for.is_some())
            || self.state.contains(WindowState::SKIP_TASKBAR);
        f.set(Features::SKIP_TASKBAR, skip_taskbar);
        f.set(
            Features::SKIP_PAGER,
            caps.skip_taskbar || self.state.contains(WindowState::SKIP_PAGER),
        );

        self.features = f;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::hints::size_flags;

    fn info(rect: Rect) -> WindowInfo {
        WindowInfo { rect, title: "Terminal window title".into(), ..Default::default() }
    }

    fn fixed_hints(width: u32, height: u32) -> Vec<u32> {
        let mut raw = vec![0u32; 18];
        raw[0] = size_flags::P_MIN_SIZE | size_flags::P_MAX_SIZE;
        raw[5] = width;
        raw[6] = height;
        raw[7] = width;
        raw[8] = height;
        raw
    }

    #[test]
    fn description_truncates_long_titles() {
        let win = ManagedWindow::new(0x2a, &info(Rect::new(0, 0, 10, 10)), 0);
        assert_eq!(win.desc(), "0x2a (Terminal window titl…)");
    }

    #[test]
    fn fixed_size_windows_cannot_maximize() {
        let mut i = info(Rect::new(0, 0, 200, 100));
        i.normal_hints = fixed_hints(200, 100);
        let mut win = ManagedWindow::new(1, &i, 0);
        win.recalc_features(Rect::new(0, 0, 1280, 1024));
        assert!(!win.features.contains(Features::HAS_RESIZE));
        assert!(!win.features.contains(Features::HAS_MAXIMIZE));
        assert!(!win.features.contains(Features::HAS_FULLSCREEN));
        assert!(win.features.contains(Features::HAS_MOVE));
    }

    #[test]
    fn fixed_screen_sized_windows_may_go_fullscreen() {
        let mut i = info(Rect::new(0, 0, 1280, 1024));
        i.normal_hints = fixed_hints(1280, 1024);
        let mut win = ManagedWindow::new(1, &i, 0);
        win.recalc_features(Rect::new(0, 0, 1280, 1024));
        assert!(win.features.contains(Features::HAS_FULLSCREEN));
    }

    #[test]
    fn fullscreen_windows_are_pinned() {
        let mut win = ManagedWindow::new(1, &info(Rect::new(0, 0, 200, 100)), 0);
        win.state |= WindowState::FULLSCREEN;
        win.recalc_features(Rect::new(0, 0, 1280, 1024));
        assert!(!win.features.intersects(Features::HAS_MOVE | Features::HAS_RESIZE | Features::HAS_SHADE));
        assert_eq!(win.layer(), WindowLayer::Fullscreen);
    }

    #[test]
    fn transient_dialogs_skip_the_taskbar() {
        let mut i = info(Rect::new(0, 0, 200, 100));
        i.window_type = WindowType::Dialog;
        i.transient_for = Some(7);
        let mut win = ManagedWindow::new(1, &i, 0);
        win.recalc_features(Rect::new(0, 0, 1280, 1024));
        assert!(win.features.contains(Features::SKIP_TASKBAR));
        assert!(!win.features.contains(Features::HAS_MAXIMIZE));
    }

    #[test]
    fn shaded_frame_collapses_to_titlebar() {
        let insets = FrameInsets::new(4, 4, 24, 4);
        let rect = Rect::new(100, 100, 300, 200);
        assert_eq!(ManagedWindow::frame_rect_for(&rect, &insets, false), Rect::new(96, 76, 308, 228));
        assert_eq!(ManagedWindow::frame_rect_for(&rect, &insets, true), Rect::new(96, 76, 308, 24));
    }

    #[test]
    fn terminals_are_recognised_by_class() {
        let mut i = info(Rect::new(0, 0, 10, 10));
        i.class = "XTerm".into();
        assert!(ManagedWindow::new(1, &i, 0).is_terminal());
    }
}
