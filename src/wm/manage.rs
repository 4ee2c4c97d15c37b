//! Manage Module
//!
//! Taking a client under management and letting it go again. Managing
//! reads everything about the client in one go, wraps it in a frame when
//! it is decorated and gives it its first geometry; showing it is left to
//! the calc-showing queue.

use tracing::{debug, info};

use crate::shared::Rect;
use crate::wm::client_flags::{MoveResizeFlags, QueueKind, WindowState, WmFlags};
use crate::wm::decorations::frame_insets;
use crate::wm::display::WindowChanges;
use crate::wm::error::trap;
use crate::wm::window::{Frame, ManagedWindow};
use crate::wm::workspace::ALL_WORKSPACES;
use crate::wm::WindowManagerCore;

impl WindowManagerCore {
    /// Start managing `window`
    ///
    /// `initial` is set for windows that already existed when we became
    /// the window manager; those that were visible keep their position.
    pub fn manage_window(&mut self, window: u32, initial: bool) {
        if self.client_for(window).is_some() {
            debug!("Window 0x{:x} is already managed", window);
            return;
        }
        let Some(mut info) = trap(self.display.read_window_info(window), "read window", window) else {
            debug!("Window 0x{:x} disappeared before it could be managed", window);
            return;
        };
        if info.override_redirect {
            debug!("Window 0x{:x} is override-redirect, not managing it", window);
            return;
        }
        if initial && !info.viewable {
            debug!("Existing window 0x{:x} is not viewable, leaving it alone", window);
            return;
        }
        if !self.settings.sync_enabled {
            info.sync_counter = None;
        }

        let active = self.workspaces.active;
        let mut win = ManagedWindow::new(window, &info, active);

        // Transients live where their parent lives unless they say otherwise
        match info.desktop {
            Some(ALL_WORKSPACES) => {
                win.state.insert(WindowState::STICKY);
                win.workspace = active;
            }
            Some(desktop) if !self.workspaces.contains(desktop) => win.workspace = active,
            Some(_) => {}
            None => {
                if let Some(parent) = win.transient_for.and_then(|p| self.windows.get(&p)) {
                    win.workspace = parent.workspace;
                }
            }
        }

        // Maximization asked for up front waits for placement
        if win.state.contains(WindowState::MAXIMIZED_HORZ) {
            win.flags.insert(WmFlags::MAXIMIZE_HORZ_AFTER_PLACEMENT);
        }
        if win.state.contains(WindowState::MAXIMIZED_VERT) {
            win.flags.insert(WmFlags::MAXIMIZE_VERT_AFTER_PLACEMENT);
        }
        win.state.remove(WindowState::MAXIMIZED);

        // Already on screen before we started, so no placement
        if initial {
            win.flags.insert(WmFlags::PLACED);
        }
        win.recalc_features(self.screen.size);
        info!("Managing {} (type {:?}, workspace {})", win.desc(), win.window_type, win.workspace);

        if win.border_width != 0 {
            let changes = WindowChanges { border_width: Some(0), ..Default::default() };
            trap(self.display.configure_window(window, &changes), "reset border", window);
        }

        if let Some(insets) = frame_insets(&win, &self.settings.insets) {
            let outer = ManagedWindow::frame_rect_for(&info.rect, &insets, win.is_shaded());
            let outer = Rect::new(info.rect.x, info.rect.y, outer.width, outer.height);
            if let Some(frame) = trap(self.display.create_frame(window, outer, insets.left, insets.top), "frame", window) {
                debug!("Framed {} in 0x{:x} at {}", win.desc(), frame, outer);
                win.rect.x = outer.x + insets.left;
                win.rect.y = outer.y + insets.top;
                win.frame = Some(Frame {
                    id: frame,
                    rect: outer,
                    insets,
                    child_x: insets.left,
                    child_y: insets.top,
                    mapped: false,
                });
                self.frames.insert(frame, window);
                trap(self.display.set_frame_extents(window, insets), "frame extents", window);
            }
        }

        let layer = win.layer();
        let gravity = win.size_hints.win_gravity;
        let counter = win.sync.counter;
        self.windows.insert(window, win);
        self.stack.insert(window, layer);
        self.sync_stack();

        // The requested position names the outer frame's reference point
        self.move_resize_internal(
            window,
            MoveResizeFlags::MOVE_ACTION | MoveResizeFlags::RESIZE_ACTION | MoveResizeFlags::DO_GRAVITY_ADJUST,
            gravity,
            info.rect,
        );

        if let Some(counter) = counter {
            let alarm = trap(self.display.create_sync_alarm(window, counter), "sync alarm", window);
            if let Some(win) = self.windows.get_mut(&window) {
                win.sync.alarm = alarm;
            }
        }

        self.publish_desktop(window);
        self.set_net_wm_state(window);
        self.queue_window(window, QueueKind::CALC_SHOWING | QueueKind::UPDATE_ICON);
        if let Some(win) = self.windows.get_mut(&window) {
            win.flags.remove(WmFlags::CONSTRUCTING);
        }
    }

    /// Stop managing `window`
    ///
    /// `destroyed` is set when the client window no longer exists, so
    /// nothing is sent to it.
    pub fn unmanage_window(&mut self, window: u32, destroyed: bool) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        info!("Unmanaging {}{}", win.desc(), if destroyed { " (destroyed)" } else { "" });
        win.flags.insert(WmFlags::UNMANAGING);
        let time = self.display.current_time();

        self.release_grab_for(window, time);
        if self.frame_press.as_ref().is_some_and(|p| p.window == window) {
            self.frame_press = None;
        }
        self.unqueue_window(window, QueueKind::all());
        self.scheduler.remove_timers_for(window);

        if self.focus.focus == Some(window) {
            debug!("Focusing default window since the focus window is going away");
            self.focus_default_window(Some(window), time);
        }
        self.focus.remove(window);

        let Some(win) = self.windows.remove(&window) else {
            return;
        };
        self.stack.remove(window);

        // Hand the next window manager the geometry the user chose
        let mut client_rect = win.rect;
        if win.state.is_any_maximized() || win.is_fullscreen() {
            client_rect = win.saved_rect;
            if !destroyed {
                let mut state = win.state;
                state.remove(WindowState::MAXIMIZED | WindowState::FULLSCREEN);
                trap(self.display.set_net_wm_state(window, state), "_NET_WM_STATE", window);
            }
        }

        if win.sync.alarm.is_some() {
            trap(self.display.destroy_sync_alarm(window), "destroy alarm", window);
        }
        if let Some(frame) = &win.frame {
            self.frames.remove(&frame.id);
            trap(self.display.destroy_frame(frame.id, window, client_rect), "destroy frame", window);
        }
        if !destroyed && win.border_width != 0 {
            let changes = WindowChanges { border_width: Some(win.border_width), ..Default::default() };
            trap(self.display.configure_window(window, &changes), "restore border", window);
        }
        if win.flags.contains(WmFlags::MAPPED) {
            self.compositor.unmap_window(window);
        }
        self.sync_stack();

        if win.strut.is_some() && win.flags.contains(WmFlags::MAPPED) {
            debug!("Unmanaged 0x{:x} with struts, invalidating work areas", window);
            self.invalidate_work_areas();
        }
    }
}
