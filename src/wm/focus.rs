//! Focus Module
//!
//! Input focus, the most-recently-used list, user-time bookkeeping and the
//! focus-stealing policy applied when windows are first shown or activated.

use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::wm::client_flags::{WindowState, WmFlags};
use crate::wm::error::trap;
use crate::wm::settings::FocusNewWindows;
use crate::wm::WindowManagerCore;

/// Longest transient chain we follow before assuming a loop
const MAX_TRANSIENT_DEPTH: usize = 32;

/// Focus bookkeeping
#[derive(Debug, Clone, Default)]
pub struct FocusState {
    /// Window we last gave focus to
    pub focus: Option<u32>,
    /// Most recently focused first
    pub mru: VecDeque<u32>,
    /// Latest user-interaction timestamp seen on any window
    pub last_user_time: u32,
}

impl FocusState {
    /// Forget `window`; returns whether it had focus
    pub fn remove(&mut self, window: u32) -> bool {
        self.mru.retain(|&w| w != window);
        if self.focus == Some(window) {
            self.focus = None;
            true
        } else {
            false
        }
    }

    fn push_mru(&mut self, window: u32) {
        self.mru.retain(|&w| w != window);
        self.mru.push_front(window);
    }
}

/// Server-time comparison with 32-bit wraparound
///
/// A zero timestamp is before every other time.
pub fn xserver_time_is_before(a: u32, b: u32) -> bool {
    const HALF: u32 = u32::MAX / 2;
    if a == 0 {
        return true;
    }
    if b == 0 {
        return false;
    }
    (a < b && b - a < HALF) || (a > b && a - b > HALF)
}

impl WindowManagerCore {
    /// Replace a zero timestamp with the current server time
    pub(crate) fn resolve_time(&self, time: u32, what: &str) -> u32 {
        if time == 0 {
            let now = self.display.current_time();
            warn!("Got a {} request with timestamp 0, using current time {}", what, now);
            now
        } else {
            time
        }
    }

    /// Record a user interaction with `window`
    pub fn note_user_time(&mut self, window: u32, time: u32) {
        if time == 0 {
            return;
        }
        if let Some(win) = self.windows.get_mut(&window) {
            win.user_time = Some(time);
        }
        if xserver_time_is_before(self.focus.last_user_time, time) {
            self.focus.last_user_time = time;
        }
    }

    /// Give input focus to `window`
    pub fn focus_window(&mut self, window: u32, time: u32) {
        // Shading and unshading change what takes the focus
        self.flush_calc_showing_for(window);
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if win.is_unmanaging() {
            return;
        }
        // Keyboard grabs own the focus until they end
        if self.grab.as_ref().is_some_and(|g| g.window != window && g.have_keyboard) {
            debug!("Not focusing {} during a keyboard grab", win.desc());
            return;
        }
        debug!("Focusing {} with time {}", win.desc(), time);

        // A shaded client is unmapped; its frame takes the focus
        let target = match &win.frame {
            Some(frame) if win.is_shaded() => frame.id,
            _ => window,
        };
        let input = win.flags.contains(WmFlags::INPUT) || target != window;
        let take_focus = win.flags.contains(WmFlags::TAKE_FOCUS);
        if input {
            trap(self.display.set_input_focus(Some(target), time), "set focus", window);
        }
        if take_focus {
            trap(self.display.send_take_focus(window, time), "take focus", window);
        }
        if !input && !take_focus {
            debug!("{} accepts neither input nor WM_TAKE_FOCUS", win.desc());
            return;
        }
        self.set_focus_state(Some(window));

        let attention = self
            .windows
            .get(&window)
            .is_some_and(|w| w.state.contains(WindowState::DEMANDS_ATTENTION));
        if attention {
            self.unset_demands_attention(window);
        }
    }

    fn set_focus_state(&mut self, window: Option<u32>) {
        if let Some(old) = self.focus.focus.filter(|&old| Some(old) != window) {
            if let Some(win) = self.windows.get_mut(&old) {
                win.flags.remove(WmFlags::HAS_FOCUS);
            }
        }
        self.focus.focus = window;
        if let Some(window) = window {
            if let Some(win) = self.windows.get_mut(&window) {
                win.flags.insert(WmFlags::HAS_FOCUS);
            }
            self.focus.push_mru(window);
        }
        trap(self.display.set_active_window(window), "active window", window.unwrap_or(0));
    }

    /// Focus the best remaining window, never `not_this_one`
    ///
    /// The transient parent of `not_this_one` wins when it is showing;
    /// otherwise the most recently used window on the active workspace.
    pub fn focus_default_window(&mut self, not_this_one: Option<u32>, time: u32) {
        let parent = not_this_one
            .and_then(|w| self.windows.get(&w))
            .and_then(|w| w.transient_for)
            .filter(|&p| self.can_take_default_focus(p));

        let candidate = parent.or_else(|| {
            self.focus
                .mru
                .iter()
                .copied()
                .filter(|&w| Some(w) != not_this_one)
                .find(|&w| self.can_take_default_focus(w))
        });

        match candidate {
            Some(window) => {
                debug!("Focusing default window 0x{:x}", window);
                self.focus_window(window, time);
            }
            None => {
                debug!("No default window to focus");
                trap(self.display.set_input_focus(None, time), "unset focus", 0);
                self.set_focus_state(None);
            }
        }
    }

    fn can_take_default_focus(&self, window: u32) -> bool {
        self.windows.get(&window).is_some_and(|w| {
            !w.is_unmanaging()
                && !w.is_minimized()
                && !w.is_desktop_or_dock()
                && w.flags.intersects(WmFlags::INPUT | WmFlags::TAKE_FOCUS)
                && self.located_on_workspace(w, self.workspaces.active)
                && self.showing_on_its_workspace(w)
        })
    }

    /// The user did something elsewhere after `window` was launched
    pub fn intervening_user_event_occurred(&self, window: u32) -> bool {
        let Some(win) = self.windows.get(&window) else {
            return false;
        };
        match win.user_time {
            // Explicit request not to be focused
            Some(0) => true,
            None => false,
            Some(time) => {
                let compare = self
                    .focus
                    .focus
                    .and_then(|f| self.windows.get(&f))
                    .and_then(|f| f.user_time)
                    .unwrap_or(0);
                compare != 0 && xserver_time_is_before(time, compare)
            }
        }
    }

    /// Whether `window` takes focus, and goes on top, when first shown
    pub fn window_state_on_map(&self, window: u32) -> (bool, bool) {
        let Some(win) = self.windows.get(&window) else {
            return (false, false);
        };
        let caps = win.window_type.capabilities();
        let mut takes_focus = !self.intervening_user_event_occurred(window);
        let mut places_on_top = takes_focus;

        if !win.flags.intersects(WmFlags::INPUT | WmFlags::TAKE_FOCUS) {
            return (false, places_on_top);
        }
        if !caps.focus_on_map {
            takes_focus = false;
        }
        if !caps.raise_on_map {
            places_on_top = false;
        }

        if takes_focus && self.settings.focus_new_windows == FocusNewWindows::Strict {
            let focused_terminal = self
                .focus
                .focus
                .filter(|&f| f != window)
                .and_then(|f| self.windows.get(&f))
                .filter(|f| f.is_terminal());
            if let Some(terminal) = focused_terminal {
                if !self.is_ancestor(terminal.id, window) {
                    debug!("Strict focus: {} does not get focus from terminal {}", win.desc(), terminal.desc());
                    takes_focus = false;
                }
            }
        }
        (takes_focus, places_on_top)
    }

    /// Some window in a higher layer, or kept above, overlaps `window`
    pub fn window_would_be_covered(&self, window: u32) -> bool {
        let Some(win) = self.windows.get(&window) else {
            return false;
        };
        let outer = win.outer_rect();
        let layer = win.layer();
        let workspace = self.workspaces.active;
        self.windows.values().any(|other| {
            other.id != window
                && (other.state.contains(WindowState::ABOVE) || other.layer() > layer)
                && !other.is_desktop_or_dock()
                && self.located_on_workspace(other, workspace)
                && self.showing_on_its_workspace(other)
                && other.outer_rect().overlaps(&outer)
        })
    }

    /// `ancestor` is reachable from `window` through transient parents
    pub fn is_ancestor(&self, ancestor: u32, window: u32) -> bool {
        let mut current = self.windows.get(&window).and_then(|w| w.transient_for);
        for _ in 0..MAX_TRANSIENT_DEPTH {
            match current {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => current = self.windows.get(&parent).and_then(|w| w.transient_for),
                None => return false,
            }
        }
        false
    }

    /// Same window group, or one is a transient of the other
    pub fn same_application(&self, a: u32, b: u32) -> bool {
        let group = |w: u32| self.windows.get(&w).and_then(|w| w.wm_hints.window_group);
        match (group(a), group(b)) {
            (Some(ga), Some(gb)) if ga == gb => true,
            _ => self.is_ancestor(a, b) || self.is_ancestor(b, a),
        }
    }

    /// `_NET_ACTIVE_WINDOW` or an equivalent user request
    ///
    /// Requests older than the last user interaction only flag the window
    /// as demanding attention.
    pub fn activate_window(&mut self, window: u32, time: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if time != 0 && self.focus.last_user_time != 0 && xserver_time_is_before(time, self.focus.last_user_time) {
            debug!(
                "Activation of {} at {} predates last user time {}, demanding attention instead",
                win.desc(),
                time,
                self.focus.last_user_time
            );
            self.set_demands_attention(window);
            return;
        }
        let time = self.resolve_time(time, "activation");

        let active = self.workspaces.active;
        if !self.located_on_workspace(win, active) {
            if win.transient_for.is_none() {
                debug!("{} is on workspace {}, demanding attention", win.desc(), win.workspace);
                self.set_demands_attention(window);
                return;
            }
            self.change_workspace(window, active);
        }

        self.note_user_time(window, time);
        if self.windows.get(&window).is_some_and(|w| w.is_shaded()) {
            self.unshade(window, time);
        }
        self.unminimize_with_ancestors(window);
        self.raise_window(window);
        self.focus_window(window, time);
    }

    fn unminimize_with_ancestors(&mut self, window: u32) {
        let mut chain = vec![window];
        let mut current = self.windows.get(&window).and_then(|w| w.transient_for);
        while let Some(parent) = current.filter(|_| chain.len() < MAX_TRANSIENT_DEPTH) {
            chain.push(parent);
            current = self.windows.get(&parent).and_then(|w| w.transient_for);
        }
        for w in chain {
            if self.windows.get(&w).is_some_and(|w| w.is_minimized()) {
                self.unminimize(w);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Rect;
    use crate::wm::settings::WmSettings;
    use crate::wm::testing::{Harness, Request};

    #[test]
    fn server_time_wraps() {
        assert!(xserver_time_is_before(10, 20));
        assert!(!xserver_time_is_before(20, 10));
        assert!(xserver_time_is_before(u32::MAX - 5, 3));
        assert!(xserver_time_is_before(0, 5));
        assert!(!xserver_time_is_before(5, 0));
    }

    #[test]
    fn new_windows_take_focus() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(100, 100, 300, 200));
        assert_eq!(h.core.focus.focus, Some(a));
        let b = h.manage_mapped(Rect::new(500, 100, 300, 200));
        assert_eq!(h.core.focus.focus, Some(b));
        assert_eq!(h.core.focus.mru, VecDeque::from(vec![b, a]));
        assert!(h.core.windows[&b].flags.contains(WmFlags::HAS_FOCUS));
        assert!(!h.core.windows[&a].flags.contains(WmFlags::HAS_FOCUS));
    }

    #[test]
    fn zero_user_time_declines_focus() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let mut info = h.info(Rect::new(600, 100, 300, 200));
        info.user_time = Some(0);
        let b = h.manage(info);
        h.core.run_idle();
        assert_eq!(h.core.focus.focus, Some(a));
        assert!(h.core.intervening_user_event_occurred(b));
    }

    #[test]
    fn older_windows_do_not_steal_focus() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.note_user_time(a, 5000);
        let mut info = h.info(Rect::new(600, 100, 300, 200));
        info.user_time = Some(4000);
        let b = h.manage(info);
        assert_eq!(h.core.window_state_on_map(b), (false, false));
    }

    #[test]
    fn strict_mode_protects_terminals() {
        let settings = WmSettings { focus_new_windows: FocusNewWindows::Strict, ..WmSettings::default() };
        let mut h = Harness::with_settings(settings);
        let mut info = h.info(Rect::new(0, 0, 300, 200));
        info.class = "XTerm".into();
        let term = h.manage(info);
        h.core.run_idle();
        assert_eq!(h.core.focus.focus, Some(term));

        let other = h.manage(h.info(Rect::new(400, 0, 300, 200)));
        assert!(!h.core.window_state_on_map(other).0);

        let mut info = h.info(Rect::new(400, 300, 300, 200));
        info.transient_for = Some(term);
        let dialog = h.manage(info);
        assert!(h.core.window_state_on_map(dialog).0);
    }

    #[test]
    fn default_focus_prefers_the_transient_parent() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(0, 0, 300, 200));
        let b = h.manage_mapped(Rect::new(400, 0, 300, 200));
        let mut info = h.info(Rect::new(100, 300, 200, 100));
        info.transient_for = Some(a);
        let dialog = h.manage(info);
        h.core.run_idle();
        assert_eq!(h.core.focus.focus, Some(dialog));

        h.core.focus_default_window(Some(dialog), 2000);
        assert_eq!(h.core.focus.focus, Some(a));

        h.core.focus_default_window(Some(a), 2000);
        assert_eq!(h.core.focus.focus, Some(dialog));
        let _ = b;
    }

    #[test]
    fn no_candidate_clears_focus() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(0, 0, 300, 200));
        h.clear_log();
        h.core.focus_default_window(Some(a), 2000);
        assert_eq!(h.core.focus.focus, None);
        assert!(h.requests().contains(&Request::Focus { window: None, time: 2000 }));
        assert!(h.requests().contains(&Request::ActiveWindow(None)));
    }

    #[test]
    fn stale_activation_demands_attention() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(0, 0, 300, 200));
        let b = h.manage_mapped(Rect::new(400, 0, 300, 200));
        h.core.note_user_time(b, 9000);

        h.core.activate_window(a, 8000);
        assert_eq!(h.core.focus.focus, Some(b));
        assert!(h.core.windows[&a].state.contains(WindowState::DEMANDS_ATTENTION));

        h.core.activate_window(a, 9500);
        assert_eq!(h.core.focus.focus, Some(a));
        assert!(!h.core.windows[&a].state.contains(WindowState::DEMANDS_ATTENTION));
    }

    #[test]
    fn activation_unminimizes() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(0, 0, 300, 200));
        h.core.minimize(a);
        h.core.run_idle();
        assert!(h.core.windows[&a].is_minimized());

        h.core.activate_window(a, 0);
        h.core.run_idle();
        assert!(!h.core.windows[&a].is_minimized());
        assert_eq!(h.core.focus.focus, Some(a));
    }

    #[test]
    fn ancestry_follows_transient_chain() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(0, 0, 300, 200));
        let mut info = h.info(Rect::new(10, 10, 100, 100));
        info.transient_for = Some(a);
        let b = h.manage(info);
        let mut info = h.info(Rect::new(20, 20, 50, 50));
        info.transient_for = Some(b);
        let c = h.manage(info);
        assert!(h.core.is_ancestor(a, c));
        assert!(!h.core.is_ancestor(c, a));
        assert!(h.core.same_application(a, c));
    }
}
