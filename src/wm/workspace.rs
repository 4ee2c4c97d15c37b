//! Workspace Module
//!
//! Virtual desktops, sticky windows and show-desktop mode. A window
//! belongs to exactly one workspace unless it is sticky; switching
//! workspaces only queues calc-showing, the showing code does the
//! mapping.

use tracing::{debug, info, warn};

use crate::wm::client_flags::{QueueKind, WindowState};
use crate::wm::error::trap;
use crate::wm::window::ManagedWindow;
use crate::wm::WindowManagerCore;

/// `_NET_WM_DESKTOP` value for windows on every workspace
pub const ALL_WORKSPACES: u32 = 0xFFFFFFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspaces {
    /// Current workspace index (0-based)
    pub active: u32,
    pub count: u32,
    /// Every window except desktops and docks is hidden
    pub showing_desktop: bool,
}

impl Workspaces {
    pub fn new(count: u32) -> Self {
        Self { active: 0, count: count.max(1), showing_desktop: false }
    }

    pub fn contains(&self, workspace: u32) -> bool {
        workspace < self.count
    }
}

impl WindowManagerCore {
    pub fn located_on_workspace(&self, win: &ManagedWindow, workspace: u32) -> bool {
        win.is_sticky() || win.workspace == workspace
    }

    /// Move `window` with its transients and ancestors to `workspace`
    pub fn change_workspace(&mut self, window: u32, workspace: u32) {
        if !self.workspaces.contains(workspace) {
            warn!("Invalid workspace index: {} (count: {})", workspace, self.workspaces.count);
            return;
        }
        let mut family = self.with_transients(window);
        let mut parent = self.windows.get(&window).and_then(|w| w.transient_for);
        while let Some(p) = parent.filter(|p| !family.contains(p)) {
            family.push(p);
            parent = self.windows.get(&p).and_then(|w| w.transient_for);
        }
        for w in family {
            self.change_workspace_without_transients(w, workspace);
        }
    }

    fn change_workspace_without_transients(&mut self, window: u32, workspace: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        let was_sticky = win.state.contains(WindowState::STICKY);
        if !was_sticky && win.workspace == workspace {
            return;
        }
        debug!("Changing {} from workspace {} to {}", win.desc(), win.workspace, workspace);
        win.state.remove(WindowState::STICKY);
        win.workspace = workspace;
        self.publish_desktop(window);
        if was_sticky {
            self.set_net_wm_state(window);
        }
        self.queue_window(window, QueueKind::CALC_SHOWING);
    }

    /// Switch to `workspace`
    ///
    /// A window being dragged comes along so the drag is never interrupted
    /// by an unmap.
    pub fn activate_workspace(&mut self, workspace: u32, time: u32) {
        if !self.workspaces.contains(workspace) {
            warn!("Invalid workspace index: {} (count: {})", workspace, self.workspaces.count);
            return;
        }
        let old = self.workspaces.active;
        if old == workspace {
            debug!("Already on workspace {}", workspace);
            return;
        }
        info!("Switching from workspace {} to {}", old, workspace);
        self.workspaces.active = workspace;
        let count = self.workspaces.count;
        trap(self.display.set_current_desktop(workspace, count), "current desktop", 0);

        let dragged = self.grab.as_ref().filter(|g| g.op.is_moving()).map(|g| g.window);
        if let Some(window) = dragged {
            let located = self.windows.get(&window).is_some_and(|w| self.located_on_workspace(w, workspace));
            if !located {
                self.change_workspace(window, workspace);
            }
        }

        self.queue_all(QueueKind::CALC_SHOWING);
        if self.workspaces.showing_desktop {
            self.unshow_desktop();
        }
        self.focus_default_window(None, time);
    }

    /// Hide everything but desktops and docks
    pub fn show_desktop(&mut self, time: u32) {
        if self.workspaces.showing_desktop {
            return;
        }
        info!("Showing the desktop");
        self.workspaces.showing_desktop = true;
        self.queue_all(QueueKind::CALC_SHOWING);
        trap(self.display.set_showing_desktop(true), "showing desktop", 0);
        self.focus_default_window(None, time);
    }

    pub fn unshow_desktop(&mut self) {
        if !self.workspaces.showing_desktop {
            return;
        }
        info!("No longer showing the desktop");
        self.workspaces.showing_desktop = false;
        self.queue_all(QueueKind::CALC_SHOWING);
        trap(self.display.set_showing_desktop(false), "showing desktop", 0);
    }

    fn queue_all(&mut self, kinds: QueueKind) {
        let windows: Vec<u32> = self.windows.keys().copied().collect();
        for window in windows {
            self.queue_window(window, kinds);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Rect;
    use crate::wm::client_flags::WmFlags;
    use crate::wm::grab::GrabOp;
    use crate::wm::settings::WmSettings;
    use crate::wm::testing::{Harness, Request};

    fn no_animation() -> WmSettings {
        WmSettings { animate_minimize: false, ..WmSettings::default() }
    }

    #[test]
    fn switching_hides_other_workspaces() {
        let mut h = Harness::with_settings(no_animation());
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.activate_workspace(1, 2000);
        h.core.run_idle();
        assert!(!h.core.windows[&id].flags.contains(WmFlags::MAPPED));
        assert!(h.requests().contains(&Request::CurrentDesktop(1)));
        assert_eq!(h.core.focus.focus, None);

        h.core.activate_workspace(0, 3000);
        h.core.run_idle();
        assert!(h.core.windows[&id].flags.contains(WmFlags::MAPPED));
    }

    #[test]
    fn sticky_windows_survive_a_switch() {
        let mut h = Harness::with_settings(no_animation());
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.stick(id);
        h.core.activate_workspace(2, 2000);
        h.core.run_idle();
        assert!(h.core.windows[&id].flags.contains(WmFlags::MAPPED));
    }

    #[test]
    fn invalid_workspaces_are_ignored() {
        let mut h = Harness::new();
        h.core.activate_workspace(17, 2000);
        assert_eq!(h.core.workspaces.active, 0);
    }

    #[test]
    fn dragged_window_follows_the_switch() {
        let mut h = Harness::with_settings(no_animation());
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.begin_grab(id, GrabOp::Moving, true, Some(1), 1500, (200, 110)).ok();
        h.core.activate_workspace(1, 2000);
        h.core.run_idle();
        let win = &h.core.windows[&id];
        assert_eq!(win.workspace, 1);
        assert!(win.flags.contains(WmFlags::MAPPED));
    }

    #[test]
    fn transients_move_with_their_parent() {
        let mut h = Harness::new();
        let parent = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let mut info = h.info(Rect::new(150, 150, 100, 100));
        info.transient_for = Some(parent);
        let dialog = h.manage(info);
        h.core.run_idle();

        h.core.change_workspace(dialog, 3);
        assert_eq!(h.core.windows[&parent].workspace, 3);
        assert_eq!(h.core.windows[&dialog].workspace, 3);
        assert!(h.requests().contains(&Request::Desktop { window: parent, desktop: Some(3) }));
    }

    #[test]
    fn switching_workspace_leaves_show_desktop() {
        let mut h = Harness::with_settings(no_animation());
        h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.show_desktop(2000);
        assert!(h.core.workspaces.showing_desktop);
        h.core.activate_workspace(1, 2100);
        assert!(!h.core.workspaces.showing_desktop);
        assert!(h.requests().contains(&Request::ShowingDesktop(false)));
    }
}
