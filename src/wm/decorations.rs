//! Window decorations for Strata
//!
//! The frame is a single window. Its insets come from the settings and the
//! window's decoration state; the titlebar, its buttons and the resize
//! edges are regions of the frame found by hit-testing.

use tracing::debug;

use crate::shared::{FrameInsets, Rect};
use crate::wm::client_flags::{Features, MaximizeFlags};
use crate::wm::grab::{GrabOp, ResizeDirection};
use crate::wm::window::ManagedWindow;
use crate::wm::WindowManagerCore;

const BUTTON_SIZE: i32 = 16;
const BUTTON_PADDING: i32 = 8;
/// Distance from the frame border that grabs an edge
const EDGE_THRESHOLD: i32 = 5;
/// Two titlebar presses within this many milliseconds toggle maximize
const DOUBLE_CLICK_MS: u32 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonType {
    Close,
    Maximize,
    Minimize,
}

impl ButtonType {
    /// Titlebar order from the right edge
    const ORDER: [Self; 3] = [Self::Close, Self::Maximize, Self::Minimize];

    fn feature(self) -> Features {
        match self {
            Self::Close => Features::HAS_CLOSE,
            Self::Maximize => Features::HAS_MAXIMIZE,
            Self::Minimize => Features::HAS_MINIMIZE,
        }
    }
}

/// Part of the frame under the pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRegion {
    Client,
    Titlebar,
    Button(ButtonType),
    Edge(ResizeDirection),
}

/// A button-1 press on the frame, kept until the release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePress {
    pub window: u32,
    pub region: FrameRegion,
    pub time: u32,
}

/// Insets a frame around `win` should have, `None` when undecorated
pub fn frame_insets(win: &ManagedWindow, decorated: &FrameInsets) -> Option<FrameInsets> {
    if !win.features.contains(Features::DECORATED) {
        return None;
    }
    if win.is_fullscreen() {
        return Some(FrameInsets::default());
    }
    if win.motif.border_only {
        return Some(FrameInsets::new(decorated.left, decorated.right, decorated.left, decorated.bottom));
    }
    Some(*decorated)
}

/// Button rect relative to the frame
pub fn button_rect(frame_width: i32, insets: &FrameInsets, button: ButtonType) -> Rect {
    let slot = ButtonType::ORDER.iter().position(|&b| b == button).unwrap_or(0) as i32;
    Rect::new(
        frame_width - (slot + 1) * (BUTTON_SIZE + BUTTON_PADDING),
        (insets.top - BUTTON_SIZE) / 2,
        BUTTON_SIZE,
        BUTTON_SIZE,
    )
}

/// Region of `win`'s frame at frame-relative `x`,`y`
pub fn hit_test(win: &ManagedWindow, x: i32, y: i32) -> FrameRegion {
    let Some(frame) = &win.frame else {
        return FrameRegion::Client;
    };
    let (width, height) = (frame.rect.width, frame.rect.height);

    if win.features.contains(Features::HAS_RESIZE) && !win.is_shaded() {
        let left = x < EDGE_THRESHOLD;
        let right = x >= width - EDGE_THRESHOLD;
        let top = y < EDGE_THRESHOLD;
        let bottom = y >= height - EDGE_THRESHOLD;
        let dx = i32::from(right) - i32::from(left);
        let dy = i32::from(bottom) - i32::from(top);
        if let Some(direction) = ResizeDirection::from_signs(dx, dy) {
            return FrameRegion::Edge(direction);
        }
    }

    if y < frame.insets.top {
        let button = ButtonType::ORDER.into_iter().find(|&b| {
            win.features.contains(b.feature()) && button_rect(width, &frame.insets, b).contains_point(x, y)
        });
        return match button {
            Some(button) => FrameRegion::Button(button),
            None => FrameRegion::Titlebar,
        };
    }
    FrameRegion::Client
}

impl WindowManagerCore {
    /// Current insets of `window`'s frame, `None` when it has none
    pub fn frame_insets_for(&self, window: u32) -> Option<FrameInsets> {
        let win = self.windows.get(&window)?;
        win.frame.as_ref()?;
        Some(frame_insets(win, &self.settings.insets).unwrap_or_default())
    }

    /// Button press on a frame; `x`,`y` are frame-relative
    pub fn frame_button_press(&mut self, window: u32, x: i32, y: i32, root: (i32, i32), button: u8, time: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let region = hit_test(win, x, y);
        debug!("Button {} on {} frame region {:?}", button, win.desc(), region);

        self.note_user_time(window, time);
        if self.focus.focus != Some(window) {
            self.focus_window(window, time);
        }
        if self.settings.raise_on_click {
            self.raise_window(window);
        }
        if button != 1 {
            return;
        }

        let previous = self.frame_press.take();
        self.frame_press = Some(FramePress { window, region, time });
        let op = match region {
            FrameRegion::Titlebar => {
                let double_click = previous.is_some_and(|p| {
                    p.window == window && p.region == FrameRegion::Titlebar && time.wrapping_sub(p.time) < DOUBLE_CLICK_MS
                });
                if double_click {
                    self.frame_press = None;
                    self.toggle_maximize(window);
                    return;
                }
                GrabOp::Moving
            }
            FrameRegion::Edge(direction) => GrabOp::Resizing(direction),
            FrameRegion::Button(_) | FrameRegion::Client => return,
        };
        if let Err(err) = self.begin_grab(window, op, true, Some(button), time, root) {
            debug!("Frame grab on 0x{:x} not started: {}", window, err);
        }
    }

    /// Button release over a frame outside of a grab
    ///
    /// Titlebar buttons act on release, and only if the pointer is still on
    /// the button that was pressed.
    pub fn frame_button_release(&mut self, window: u32, x: i32, y: i32, button: u8, time: u32) {
        if button != 1 {
            return;
        }
        let Some(FramePress { window: pressed, region: FrameRegion::Button(kind), .. }) = self.frame_press else {
            return;
        };
        self.frame_press = None;
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if pressed != window || hit_test(win, x, y) != FrameRegion::Button(kind) {
            return;
        }
        debug!("{:?} button released on {}", kind, win.desc());
        match kind {
            ButtonType::Close => self.delete_window(window, time),
            ButtonType::Maximize => self.toggle_maximize(window),
            ButtonType::Minimize => self.minimize(window),
        }
    }

    pub fn toggle_maximize(&mut self, window: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if win.is_maximized() {
            self.unmaximize(window, MaximizeFlags::BOTH);
        } else if win.features.contains(Features::HAS_MAXIMIZE) {
            self.maximize(window, MaximizeFlags::BOTH);
        }
    }
}
