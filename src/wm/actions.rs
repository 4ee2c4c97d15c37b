//! Window Actions
//!
//! State changes a user or client can ask for: maximize, fullscreen,
//! shade, minimize, stick, above/below, close and the demands-attention
//! hint. Each one updates the window's state, queues whatever geometry or
//! visibility work follows from it and republishes `_NET_WM_STATE`.

use tracing::{debug, info};

use crate::shared::Rect;
use crate::wm::client_flags::{MaximizeFlags, QueueKind, WindowState, WmFlags};
use crate::wm::error::trap;
use crate::wm::moveresize::force_save_user_window_placement;
use crate::wm::workspace::ALL_WORKSPACES;
use crate::wm::WindowManagerCore;

fn describe(directions: MaximizeFlags) -> &'static str {
    if directions == MaximizeFlags::BOTH {
        ""
    } else if directions.contains(MaximizeFlags::HORIZONTAL) {
        " horizontally"
    } else {
        " vertically"
    }
}

impl WindowManagerCore {
    /// Re-derive `window`'s capabilities from its type, hints and state
    pub(crate) fn recalc_features(&mut self, window: u32) {
        let screen = self.screen.size;
        if let Some(win) = self.windows.get_mut(&window) {
            win.recalc_features(screen);
        }
    }

    /// Publish `_NET_WM_STATE` and `_NET_WM_ALLOWED_ACTIONS`
    pub fn set_net_wm_state(&mut self, window: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let (state, features) = (win.state, win.features);
        trap(self.display.set_net_wm_state(window, state), "_NET_WM_STATE", window);
        trap(self.display.set_allowed_actions(window, features), "_NET_WM_ALLOWED_ACTIONS", window);
    }

    /// Remember the geometry of the axes that are not maximized
    fn save_rect(&mut self, window: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.is_maximized() || win.is_fullscreen() {
            return;
        }
        if !win.state.contains(WindowState::MAXIMIZED_HORZ) {
            win.saved_rect.x = win.rect.x;
            win.saved_rect.width = win.rect.width;
        }
        if !win.state.contains(WindowState::MAXIMIZED_VERT) {
            win.saved_rect.y = win.rect.y;
            win.saved_rect.height = win.rect.height;
        }
    }

    pub fn maximize(&mut self, window: u32, directions: MaximizeFlags) {
        debug_assert!(!directions.is_empty());
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        // Only act on directions not yet maximized
        if win.state.contains(directions.as_state()) {
            return;
        }

        if win.is_shaded() && directions.contains(MaximizeFlags::VERTICAL) {
            let time = self.display.current_time();
            self.unshade(window, time);
        }

        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if !win.is_placed() {
            debug!("Maximizing {}{} once it is placed", win.desc(), describe(directions));
            if directions.contains(MaximizeFlags::HORIZONTAL) {
                win.flags.insert(WmFlags::MAXIMIZE_HORZ_AFTER_PLACEMENT);
            }
            if directions.contains(MaximizeFlags::VERTICAL) {
                win.flags.insert(WmFlags::MAXIMIZE_VERT_AFTER_PLACEMENT);
            }
            return;
        }

        self.maximize_internal(window, directions, None);
        self.move_resize_now(window);
        if let Some(win) = self.windows.get(&window) {
            self.compositor.maximize_window(window, win.outer_rect());
        }
    }

    /// Set the maximized bits without moving the window
    ///
    /// `saved` replaces the saved rect; without it the current geometry
    /// of the axes being maximized is saved.
    pub(crate) fn maximize_internal(&mut self, window: u32, directions: MaximizeFlags, saved: Option<Rect>) {
        debug_assert!(!directions.is_empty());
        match saved {
            Some(rect) => {
                if let Some(win) = self.windows.get_mut(&window) {
                    win.saved_rect = rect;
                }
            }
            None => self.save_rect(window),
        }
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        info!("Maximizing {}{}", win.desc(), describe(directions));
        win.state.insert(directions.as_state());
        self.recalc_features(window);
        self.set_net_wm_state(window);
    }

    pub fn unmaximize(&mut self, window: u32, directions: MaximizeFlags) {
        debug_assert!(!directions.is_empty());
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if !win.state.intersects(directions.as_state()) {
            return;
        }
        info!("Unmaximizing {}{}", win.desc(), describe(directions));
        win.state.remove(directions.as_state());

        let mut target = win.rect;
        if directions.contains(MaximizeFlags::HORIZONTAL) {
            target.x = win.saved_rect.x;
            target.width = win.saved_rect.width;
        }
        if directions.contains(MaximizeFlags::VERTICAL) {
            target.y = win.saved_rect.y;
            target.height = win.saved_rect.height;
        }
        // Size hints may have changed while maximized
        win.size_hints.ensure_satisfied(&mut target);

        // A drag continuing after the unmaximize measures from the new rect
        if let Some(grab) = self.grab.as_mut().filter(|g| g.window == window && g.op.is_moving()) {
            grab.anchor_rect = target;
        }

        self.move_resize_window(window, false, target.x, target.y, target.width, target.height);
        // The restored rect is where later constraint passes snap back to
        if let Some(win) = self.windows.get_mut(&window) {
            force_save_user_window_placement(win);
        }
        self.move_resize_now(window);
        if let Some(win) = self.windows.get(&window) {
            self.compositor.unmaximize_window(window, win.outer_rect());
        }
        self.recalc_features(window);
        self.set_net_wm_state(window);
    }

    pub fn make_fullscreen(&mut self, window: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if win.is_fullscreen() {
            return;
        }
        info!("Fullscreening {}", win.desc());
        if win.is_shaded() {
            let time = self.display.current_time();
            self.unshade(window, time);
        }
        self.save_rect(window);
        if let Some(win) = self.windows.get_mut(&window) {
            win.state.insert(WindowState::FULLSCREEN);
        }
        self.update_layer(window);
        self.raise_window(window);
        self.recalc_features(window);
        self.set_net_wm_state(window);
        self.queue_window(window, QueueKind::MOVE_RESIZE);
    }

    pub fn unmake_fullscreen(&mut self, window: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if !win.is_fullscreen() {
            return;
        }
        info!("Unfullscreening {}", win.desc());
        win.state.remove(WindowState::FULLSCREEN);
        let mut target = win.saved_rect;
        win.size_hints.ensure_satisfied(&mut target);

        self.move_resize_window(window, false, target.x, target.y, target.width, target.height);
        if let Some(win) = self.windows.get_mut(&window) {
            force_save_user_window_placement(win);
        }
        self.update_layer(window);
        self.recalc_features(window);
        self.set_net_wm_state(window);
    }

    pub fn shade(&mut self, window: u32, time: u32) {
        self.set_shaded(window, true, time);
    }

    pub fn unshade(&mut self, window: u32, time: u32) {
        self.set_shaded(window, false, time);
    }

    fn set_shaded(&mut self, window: u32, shaded: bool, time: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.is_shaded() == shaded {
            return;
        }
        debug!("{} {}", if shaded { "Shading" } else { "Unshading" }, win.desc());
        win.state.set(WindowState::SHADED, shaded);
        self.queue_window(window, QueueKind::MOVE_RESIZE | QueueKind::CALC_SHOWING);
        // Focusing flushes the calc-showing, so the frame or client gets it
        self.focus_window(window, time);
        self.set_net_wm_state(window);
    }

    pub fn minimize(&mut self, window: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.is_minimized() {
            return;
        }
        debug!(
            "Minimizing {}{}",
            win.desc(),
            if win.flags.contains(WmFlags::HAS_FOCUS) { ", which has the focus" } else { "" }
        );
        win.state.insert(WindowState::MINIMIZED);
        self.queue_calc_showing_family(window);
    }

    pub fn unminimize(&mut self, window: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if !win.is_minimized() {
            return;
        }
        debug!("Unminimizing {}", win.desc());
        win.state.remove(WindowState::MINIMIZED);
        win.flags.insert(WmFlags::WAS_MINIMIZED);
        self.queue_calc_showing_family(window);
    }

    /// Put `window` and its transients on every workspace
    pub fn stick(&mut self, window: u32) {
        for w in self.with_transients(window) {
            let Some(win) = self.windows.get_mut(&w) else {
                continue;
            };
            if win.state.contains(WindowState::STICKY) {
                continue;
            }
            debug!("Sticking {}", win.desc());
            win.state.insert(WindowState::STICKY);
            self.publish_desktop(w);
            self.set_net_wm_state(w);
            self.queue_window(w, QueueKind::CALC_SHOWING);
        }
    }

    /// Pin `window` and its transients back to a single workspace
    ///
    /// A window stuck while another workspace was active lands on the
    /// active one rather than vanishing.
    pub fn unstick(&mut self, window: u32) {
        let active = self.workspaces.active;
        for w in self.with_transients(window) {
            let Some(win) = self.windows.get_mut(&w) else {
                continue;
            };
            if !win.state.contains(WindowState::STICKY) {
                continue;
            }
            debug!("Unsticking {}", win.desc());
            win.state.remove(WindowState::STICKY);
            win.workspace = active;
            self.publish_desktop(w);
            self.set_net_wm_state(w);
            self.queue_window(w, QueueKind::CALC_SHOWING);
        }
    }

    /// Write `_NET_WM_DESKTOP` for `window`
    pub(crate) fn publish_desktop(&mut self, window: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let desktop = if win.is_sticky() { ALL_WORKSPACES } else { win.workspace };
        trap(self.display.set_window_desktop(window, Some(desktop)), "_NET_WM_DESKTOP", window);
    }

    pub fn make_above(&mut self, window: u32) {
        self.set_layer_state(window, WindowState::ABOVE, true);
    }

    pub fn unmake_above(&mut self, window: u32) {
        self.set_layer_state(window, WindowState::ABOVE, false);
    }

    pub fn make_below(&mut self, window: u32) {
        self.set_layer_state(window, WindowState::BELOW, true);
    }

    pub fn unmake_below(&mut self, window: u32) {
        self.set_layer_state(window, WindowState::BELOW, false);
    }

    fn set_layer_state(&mut self, window: u32, flag: WindowState, on: bool) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.state.contains(flag) == on {
            return;
        }
        win.state.set(flag, on);
        self.update_layer(window);
        if flag == WindowState::ABOVE {
            self.raise_window(window);
        }
        self.set_net_wm_state(window);
    }

    /// Ask the client to close, or disconnect it if it cannot be asked
    pub fn delete_window(&mut self, window: u32, time: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if win.flags.contains(WmFlags::DELETE_WINDOW) {
            debug!("Deleting {} with WM_DELETE_WINDOW", win.desc());
            trap(self.display.send_delete(window, time), "WM_DELETE_WINDOW", window);
        } else {
            info!("{} does not support WM_DELETE_WINDOW, killing it", win.desc());
            trap(self.display.kill_client(window), "kill client", window);
        }
    }

    /// Flag `window` as demanding attention if something covers it
    ///
    /// Windows in full view do not need the hint.
    pub fn set_demands_attention(&mut self, window: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let active = self.workspaces.active;
        let obscured = !self.located_on_workspace(win, active)
            || win.is_minimized()
            || {
                let outer = win.outer_rect();
                self.stack
                    .top_to_bottom()
                    .take_while(|&w| w != window)
                    .filter_map(|w| self.windows.get(&w))
                    .any(|other| {
                        (other.is_sticky() || win.is_sticky() || other.workspace == win.workspace)
                            && other.outer_rect().overlaps(&outer)
                    })
            };
        if !obscured {
            debug!("Not marking {} as needing attention, it is in full view", win.desc());
            return;
        }
        debug!("Marking {} as needing attention", win.desc());
        if let Some(win) = self.windows.get_mut(&window) {
            win.state.insert(WindowState::DEMANDS_ATTENTION);
        }
        self.set_net_wm_state(window);
    }

    pub fn unset_demands_attention(&mut self, window: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        debug!("Marking {} as not needing attention", win.desc());
        win.state.remove(WindowState::DEMANDS_ATTENTION);
        self.set_net_wm_state(window);
    }

    /// `window` followed by every window transient for it
    pub(crate) fn with_transients(&self, window: u32) -> Vec<u32> {
        let mut family = vec![window];
        family.extend(
            self.windows
                .values()
                .filter(|w| w.id != window && self.is_ancestor(window, w.id))
                .map(|w| w.id),
        );
        family
    }
}
