//! Showing Module
//!
//! Whether a window should be mapped, and the map/unmap side effects. The
//! decision is a pure function of minimized state, ancestors, show-desktop
//! mode and workspace; applying it is idempotent so a repeated calc-showing
//! produces no protocol traffic.

use tracing::{debug, trace};

use crate::wm::client_flags::{QueueKind, WindowState, WmFlags};
use crate::wm::error::trap;
use crate::wm::scheduler::TimerKind;
use crate::wm::settings::FocusMode;
use crate::wm::window::ManagedWindow;
use crate::wm::WindowManagerCore;

/// Longest transient chain followed when looking for minimized ancestors
const MAX_ANCESTORS: usize = 32;

impl WindowManagerCore {
    /// Showing, ignoring which workspace is active
    pub fn showing_on_its_workspace(&self, win: &ManagedWindow) -> bool {
        if win.is_minimized() {
            return false;
        }
        if self.workspaces.showing_desktop && !self.is_desktop_or_dock_family(win) {
            trace!("Showing the desktop, {} is hidden", win.desc());
            return false;
        }
        !self.ancestor_is_minimized(win)
    }

    /// Desktop or dock, or transient for one
    fn is_desktop_or_dock_family(&self, win: &ManagedWindow) -> bool {
        let mut current = Some(win);
        for _ in 0..MAX_ANCESTORS {
            match current {
                Some(w) if w.is_desktop_or_dock() => return true,
                Some(w) => current = w.transient_for.and_then(|p| self.windows.get(&p)),
                None => return false,
            }
        }
        false
    }

    fn ancestor_is_minimized(&self, win: &ManagedWindow) -> bool {
        let mut parent = win.transient_for;
        for _ in 0..MAX_ANCESTORS {
            let Some(ancestor) = parent.and_then(|p| self.windows.get(&p)) else {
                return false;
            };
            if ancestor.is_minimized() {
                return true;
            }
            parent = ancestor.transient_for;
        }
        false
    }

    pub fn should_be_showing(&self, window: u32) -> bool {
        self.windows.get(&window).is_some_and(|win| {
            self.located_on_workspace(win, self.workspaces.active) && self.showing_on_its_workspace(win)
        })
    }

    pub fn calc_showing(&mut self, window: u32) {
        let showing = self.should_be_showing(window);
        self.implement_showing(window, showing);
    }

    pub(crate) fn implement_showing(&mut self, window: u32, showing: bool) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        trace!("Implement showing = {} for {}", showing, win.desc());
        if showing {
            self.show(window);
            return;
        }

        let animate = self.located_on_workspace(win, self.workspaces.active)
            && win.is_minimized()
            && win.flags.contains(WmFlags::MAPPED)
            && self.settings.animate_minimize
            && !self.settings.reduced_resources;
        if !animate {
            self.finish_minimize(window);
            return;
        }
        if self.scheduler.has_timeout(TimerKind::FinishMinimize(window)) {
            return;
        }
        debug!("Animating minimize of {}", win.desc());
        self.compositor.minimize_window(window);
        let deadline = self.clock.now() + self.settings.minimize_animation;
        self.scheduler.add_timeout(deadline, TimerKind::FinishMinimize(window));
    }

    /// Hide the window, then move focus away from it if it had it
    pub(crate) fn finish_minimize(&mut self, window: u32) {
        // Shown again while the animation ran
        if self.should_be_showing(window) {
            return;
        }
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let on_active = self.located_on_workspace(win, self.workspaces.active);
        let had_focus = self.focus.focus == Some(window);
        self.hide(window);
        if had_focus {
            let time = self.display.current_time();
            self.focus_default_window(on_active.then_some(window), time);
        }
    }

    fn show(&mut self, window: u32) {
        let time = self.display.current_time();
        let (mut takes_focus, places_on_top) = self.window_state_on_map(window);
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        debug!(
            "Showing {}, shaded: {} placed: {} focus on map: {} on top: {}",
            win.desc(),
            win.is_shaded(),
            win.is_placed(),
            takes_focus,
            places_on_top
        );

        let first_time = win.flags.contains(WmFlags::SHOWING_FOR_FIRST_TIME);
        let focus = self.focus.focus.filter(|&f| f != window && self.windows.contains_key(&f));
        let mut needs_stacking_adjustment = false;
        if let Some(focus) = focus {
            if first_time && ((!places_on_top && !takes_focus) || self.window_would_be_covered(window)) {
                if self.is_ancestor(focus, window) {
                    // An alert for the focused window stays on top; its parent loses focus
                    debug!("Focus window 0x{:x} is an ancestor of {}, unfocusing it", focus, win.desc());
                    trap(self.display.set_input_focus(None, time), "unset focus", focus);
                    self.focus.remove(focus);
                    self.focus.mru.push_front(focus);
                } else {
                    needs_stacking_adjustment = true;
                }
            }
        }

        if !win.is_placed() {
            if let Some(win) = self.windows.get_mut(&window) {
                win.flags.insert(WmFlags::CALC_PLACEMENT);
            }
            self.move_resize_now(window);
            if let Some(win) = self.windows.get_mut(&window) {
                win.flags.remove(WmFlags::CALC_PLACEMENT);
                win.flags.insert(WmFlags::PLACED);
            }
        }

        if let (true, Some(focus)) = (needs_stacking_adjustment, focus) {
            takes_focus = false;
            let overlap = match (self.windows.get(&window), self.windows.get(&focus)) {
                (Some(a), Some(b)) => a.outer_rect().overlaps(&b.outer_rect()),
                _ => false,
            };
            // Alt-tab should reach the window that was denied focus
            self.focus.mru.retain(|&w| w != window);
            let after = self.focus.mru.iter().position(|&w| w == focus).map_or(0, |i| i + 1);
            self.focus.mru.insert(after, window);

            let click_raise = self.settings.focus_mode == FocusMode::Click && self.settings.raise_on_click;
            if overlap || click_raise {
                self.stack_just_below(window, focus);
            }
            if overlap {
                if let Some(win) = self.windows.get_mut(&window) {
                    win.state.insert(WindowState::DEMANDS_ATTENTION);
                }
            }
        }

        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        let mut did_show = false;
        let mut map_frame = None;
        if let Some(frame) = win.frame.as_mut() {
            if !frame.mapped {
                frame.mapped = true;
                map_frame = Some(frame.id);
                did_show = true;
            }
        }
        if let Some(frame) = map_frame {
            trap(self.display.map_window(frame), "map frame", window);
        }

        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.is_shaded() {
            // Shaded: the frame is mapped but the client is not
            let unmap = win.flags.contains(WmFlags::MAPPED);
            if unmap {
                win.flags.remove(WmFlags::MAPPED);
                win.unmaps_pending += 1;
            }
            let set_iconic = !win.flags.contains(WmFlags::ICONIC);
            win.flags.insert(WmFlags::ICONIC);
            if unmap {
                trap(self.display.unmap_window(window), "unmap client", window);
            }
            if set_iconic {
                trap(self.display.set_wm_state(window, true), "WM_STATE", window);
            }
        } else {
            let map = !win.flags.contains(WmFlags::MAPPED);
            if map {
                win.flags.insert(WmFlags::MAPPED);
                did_show = true;
            }
            let was_minimized = win.flags.contains(WmFlags::WAS_MINIMIZED);
            if did_show {
                win.flags.remove(WmFlags::WAS_MINIMIZED);
            }
            let clear_iconic = win.flags.contains(WmFlags::ICONIC);
            win.flags.remove(WmFlags::ICONIC);

            if map {
                trap(self.display.map_window(window), "map client", window);
            }
            if did_show && was_minimized {
                self.compositor.unminimize_window(window);
            } else {
                self.compositor.map_window(window);
            }
            if clear_iconic {
                trap(self.display.set_wm_state(window, false), "WM_STATE", window);
            }
        }

        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if first_time {
            win.flags.remove(WmFlags::SHOWING_FOR_FIRST_TIME);
            if takes_focus {
                self.focus_window(window, time);
            }
        }
        self.set_net_wm_state(window);

        if did_show && self.windows.get(&window).is_some_and(|w| w.strut.is_some()) {
            debug!("Mapped 0x{:x} with struts, invalidating work areas", window);
            self.invalidate_work_areas();
        }
    }

    fn hide(&mut self, window: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        debug!("Hiding {}", win.desc());
        let mut did_hide = false;
        let mut unmap_frame = None;
        if let Some(frame) = win.frame.as_mut() {
            if frame.mapped {
                frame.mapped = false;
                unmap_frame = Some(frame.id);
                did_hide = true;
            }
        }
        let unmap_client = win.flags.contains(WmFlags::MAPPED);
        if unmap_client {
            win.flags.remove(WmFlags::MAPPED);
            win.unmaps_pending += 1;
            did_hide = true;
        }
        let set_iconic = !win.flags.contains(WmFlags::ICONIC);
        win.flags.insert(WmFlags::ICONIC);
        let has_strut = win.strut.is_some();

        if did_hide {
            self.compositor.unmap_window(window);
        }
        if let Some(frame) = unmap_frame {
            trap(self.display.unmap_window(frame), "unmap frame", window);
        }
        if unmap_client {
            trap(self.display.unmap_window(window), "unmap client", window);
        }
        if set_iconic {
            trap(self.display.set_wm_state(window, true), "WM_STATE", window);
        }
        self.set_net_wm_state(window);

        if did_hide && has_strut {
            debug!("Unmapped 0x{:x} with struts, invalidating work areas", window);
            self.invalidate_work_areas();
        }
    }

    /// Queue calc-showing for `window` and everything transient for it
    pub(crate) fn queue_calc_showing_family(&mut self, window: u32) {
        for w in self.with_transients(window) {
            self.queue_window(w, QueueKind::CALC_SHOWING);
        }
    }
}
