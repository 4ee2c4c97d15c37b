//! Compositor Module
//!
//! Notifications the window manager core sends towards the compositing
//! side. Rendering itself lives outside this crate; the binary runs with
//! [`LoggingCompositor`], which traces every notification.

use tracing::{debug, trace};

use crate::shared::Rect;

/// Hooks invoked by the core as window geometry and visibility change
pub trait Compositor {
    /// Suspend (`false`) or resume (`true`) update delivery for a window
    /// while a sync handshake is outstanding
    fn set_updates(&mut self, window: u32, enabled: bool);

    /// The window's outer rect changed
    fn sync_window_geometry(&mut self, window: u32, outer: Rect);

    /// Interactive move in progress, for live redirect updates
    fn update_move(&mut self, window: u32, x: i32, y: i32);

    fn map_window(&mut self, window: u32);
    fn unmap_window(&mut self, window: u32);
    fn minimize_window(&mut self, window: u32);
    fn unminimize_window(&mut self, window: u32);
    fn maximize_window(&mut self, window: u32, outer: Rect);
    fn unmaximize_window(&mut self, window: u32, outer: Rect);

    /// Wireframe or size popup feedback for a grab; `None` when no grab runs
    fn update_resize_feedback(&mut self, window: u32, outer: Option<Rect>);

    fn icon_changed(&mut self, window: u32);
}

/// Compositor that only logs what it is told
#[derive(Debug, Default)]
pub struct LoggingCompositor {
    suspended: Vec<u32>,
}

impl LoggingCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_suspended(&self, window: u32) -> bool {
        self.suspended.contains(&window)
    }
}

impl Compositor for LoggingCompositor {
    fn set_updates(&mut self, window: u32, enabled: bool) {
        if enabled {
            self.suspended.retain(|&w| w != window);
        } else if !self.suspended.contains(&window) {
            self.suspended.push(window);
        }
        debug!("Compositor updates for 0x{:x}: {}", window, if enabled { "on" } else { "off" });
    }

    fn sync_window_geometry(&mut self, window: u32, outer: Rect) {
        trace!("Compositor: 0x{:x} geometry {}", window, outer);
    }

    fn update_move(&mut self, window: u32, x: i32, y: i32) {
        trace!("Compositor: 0x{:x} moving to {},{}", window, x, y);
    }

    fn map_window(&mut self, window: u32) {
        debug!("Compositor: map 0x{:x}", window);
    }

    fn unmap_window(&mut self, window: u32) {
        self.suspended.retain(|&w| w != window);
        debug!("Compositor: unmap 0x{:x}", window);
    }

    fn minimize_window(&mut self, window: u32) {
        debug!("Compositor: minimize 0x{:x}", window);
    }

    fn unminimize_window(&mut self, window: u32) {
        debug!("Compositor: unminimize 0x{:x}", window);
    }

    fn maximize_window(&mut self, window: u32, outer: Rect) {
        debug!("Compositor: maximize 0x{:x} to {}", window, outer);
    }

    fn unmaximize_window(&mut self, window: u32, outer: Rect) {
        debug!("Compositor: unmaximize 0x{:x} to {}", window, outer);
    }

    fn update_resize_feedback(&mut self, window: u32, outer: Option<Rect>) {
        if let Some(outer) = outer {
            trace!("Compositor: feedback for 0x{:x} at {}", window, outer);
        }
    }

    fn icon_changed(&mut self, window: u32) {
        debug!("Compositor: icon of 0x{:x} changed", window);
    }
}
