//! Events Module
//!
//! Translates X11 events into calls on the core. [`EventRouter`] owns the
//! x11rb side: it decodes atoms and keycodes, tracks the latest server
//! timestamp and filters the duplicate notifies that reparenting produces.
//! The handlers it ends up in live on [`WindowManagerCore`] and take plain
//! values, so they can be driven without a server.

use anyhow::{Context, Result};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::shared::Rect;
use crate::wm::client_flags::{Features, MaximizeFlags, QueueKind, WindowState};
use crate::wm::display::WindowChanges;
use crate::wm::error::trap;
use crate::wm::ewmh::Atoms;
use crate::wm::grab::GrabOp;
use crate::wm::keyboard::GrabKey;
use crate::wm::moveresize::{ConfigureRequest, StackMode};
use crate::wm::settings::FocusMode;
use crate::wm::workspace::ALL_WORKSPACES;
use crate::wm::WindowManagerCore;

/// `_NET_WM_STATE` client message action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Remove),
            1 => Some(Self::Add),
            2 => Some(Self::Toggle),
            _ => None,
        }
    }

    fn wants(self, currently: bool) -> bool {
        match self {
            Self::Remove => false,
            Self::Add => true,
            Self::Toggle => !currently,
        }
    }
}

/// A decoded client message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientRequest {
    /// `_NET_WM_MOVERESIZE`; `op` is `None` for cancel
    MoveResize { op: Option<GrabOp>, root: (i32, i32), button: u8 },
    /// `_NET_MOVERESIZE_WINDOW`
    MoveResizeWindow(ConfigureRequest),
    Activate { time: u32 },
    State { action: StateAction, state: WindowState },
    Desktop(u32),
    Close { time: u32 },
    /// `WM_CHANGE_STATE` to IconicState
    Iconify,
    CurrentDesktop { desktop: u32, time: u32 },
    ShowingDesktop(bool),
}

/// Client property changes the core reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyChange {
    Icon,
    UserTime(u32),
}

impl WindowManagerCore {
    /// A client asked to be mapped
    pub fn handle_map_request(&mut self, window: u32) {
        let Some(win) = self.windows.get(&window) else {
            self.manage_window(window, false);
            return;
        };
        debug!("Map request for managed {}", win.desc());
        if win.is_minimized() {
            self.unminimize(window);
        }
    }

    /// UnmapNotify for a client, as seen by its parent
    ///
    /// Unmaps we caused ourselves are counted off; any other means the
    /// client withdrew the window.
    pub fn handle_unmap_notify(&mut self, window: u32) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.unmaps_pending > 0 {
            win.unmaps_pending -= 1;
            trace!("Expected unmap of {}, {} more pending", win.desc(), win.unmaps_pending);
            return;
        }
        debug!("{} withdrew itself", win.desc());
        self.unmanage_window(window, false);
    }

    pub fn handle_destroy_notify(&mut self, window: u32) {
        if self.windows.contains_key(&window) {
            self.unmanage_window(window, true);
        }
    }

    /// Pointer entered a window in a focus-follows-mouse mode
    pub fn handle_enter(&mut self, window: u32, time: u32) {
        if self.settings.focus_mode == FocusMode::Click || self.grab.is_some() {
            return;
        }
        let Some(client) = self.client_for(window) else {
            return;
        };
        let takes_focus = self.windows.get(&client).is_some_and(|w| !w.is_desktop_or_dock() && !w.is_unmanaging());
        if takes_focus && self.focus.focus != Some(client) {
            debug!("Focusing 0x{:x} on enter", client);
            self.focus_window(client, time);
        }
    }

    pub fn handle_property_change(&mut self, window: u32, change: PropertyChange) {
        if !self.windows.contains_key(&window) {
            return;
        }
        match change {
            PropertyChange::Icon => self.queue_window(window, QueueKind::UPDATE_ICON),
            PropertyChange::UserTime(time) => self.note_user_time(window, time),
        }
    }

    pub fn handle_client_request(&mut self, window: u32, request: ClientRequest) {
        match request {
            ClientRequest::CurrentDesktop { desktop, time } => {
                let time = self.resolve_time(time, "_NET_CURRENT_DESKTOP");
                self.activate_workspace(desktop, time);
                return;
            }
            ClientRequest::ShowingDesktop(showing) => {
                if showing {
                    let time = self.display.current_time();
                    self.show_desktop(time);
                } else {
                    self.unshow_desktop();
                }
                return;
            }
            _ => {}
        }

        let Some(win) = self.windows.get(&window) else {
            debug!("Client message {:?} for unmanaged window 0x{:x}", request, window);
            return;
        };
        trace!("Client request {:?} for {}", request, win.desc());
        match request {
            ClientRequest::MoveResize { op, root, button } => self.client_moveresize(window, op, root, button),
            ClientRequest::MoveResizeWindow(configure) => self.configure_request(window, &configure),
            ClientRequest::Activate { time } => self.activate_window(window, time),
            ClientRequest::State { action, state } => {
                let time = self.display.current_time();
                self.apply_state_request(window, action, state, time);
            }
            ClientRequest::Desktop(ALL_WORKSPACES) => self.stick(window),
            ClientRequest::Desktop(desktop) => self.change_workspace(window, desktop),
            ClientRequest::Close { time } => {
                let time = self.resolve_time(time, "_NET_CLOSE_WINDOW");
                self.delete_window(window, time);
            }
            ClientRequest::Iconify => {
                if win.features.contains(Features::HAS_MINIMIZE) {
                    self.minimize(window);
                }
            }
            ClientRequest::CurrentDesktop { .. } | ClientRequest::ShowingDesktop(_) => {}
        }
    }

    fn client_moveresize(&mut self, window: u32, op: Option<GrabOp>, root: (i32, i32), button: u8) {
        let time = self.display.current_time();
        let Some(op) = op else {
            if self.grab.as_ref().is_some_and(|g| g.window == window) {
                debug!("Client cancelled the grab on 0x{:x}", window);
                self.end_grab(time);
            }
            return;
        };
        let button = (button != 0).then_some(button);
        if let Err(err) = self.begin_grab(window, op, false, button, time, root) {
            debug!("Client grab on 0x{:x} not started: {}", window, err);
        }
    }

    /// Add, remove or toggle the `_NET_WM_STATE` flags in `state`
    pub fn apply_state_request(&mut self, window: u32, action: StateAction, state: WindowState, time: u32) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let (current, features) = (win.state, win.features);

        let maximized = state & WindowState::MAXIMIZED;
        if !maximized.is_empty() {
            let mut directions = MaximizeFlags::empty();
            directions.set(MaximizeFlags::HORIZONTAL, maximized.contains(WindowState::MAXIMIZED_HORZ));
            directions.set(MaximizeFlags::VERTICAL, maximized.contains(WindowState::MAXIMIZED_VERT));
            if action.wants(current.intersects(maximized)) {
                if features.contains(Features::HAS_MAXIMIZE) {
                    self.maximize(window, directions);
                }
            } else {
                self.unmaximize(window, directions);
            }
        }

        if state.contains(WindowState::FULLSCREEN) {
            if action.wants(current.contains(WindowState::FULLSCREEN)) {
                if features.contains(Features::HAS_FULLSCREEN) {
                    self.make_fullscreen(window);
                }
            } else {
                self.unmake_fullscreen(window);
            }
        }

        if state.contains(WindowState::SHADED) {
            if action.wants(current.contains(WindowState::SHADED)) {
                if features.contains(Features::HAS_SHADE) {
                    self.shade(window, time);
                }
            } else {
                self.unshade(window, time);
            }
        }

        if state.contains(WindowState::ABOVE) {
            if action.wants(current.contains(WindowState::ABOVE)) {
                self.make_above(window);
            } else {
                self.unmake_above(window);
            }
        }

        if state.contains(WindowState::BELOW) {
            if action.wants(current.contains(WindowState::BELOW)) {
                self.make_below(window);
            } else {
                self.unmake_below(window);
            }
        }

        if state.contains(WindowState::STICKY) {
            if action.wants(current.contains(WindowState::STICKY)) {
                self.stick(window);
            } else {
                self.unstick(window);
            }
        }

        if state.contains(WindowState::DEMANDS_ATTENTION) {
            if action.wants(current.contains(WindowState::DEMANDS_ATTENTION)) {
                self.set_demands_attention(window);
            } else {
                self.unset_demands_attention(window);
            }
        }

        let skip = state & (WindowState::SKIP_TASKBAR | WindowState::SKIP_PAGER);
        if !skip.is_empty() {
            if let Some(win) = self.windows.get_mut(&window) {
                for flag in skip.iter() {
                    let on = action.wants(current.contains(flag));
                    win.state.set(flag, on);
                }
            }
            self.recalc_features(window);
            self.set_net_wm_state(window);
        }
    }
}

/// Keycode to keysym table, first column only
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    min_keycode: u8,
    per_keycode: u8,
    keysyms: Vec<u32>,
}

impl KeyMap {
    pub fn load(conn: &RustConnection) -> Result<Self> {
        let setup = conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let reply = conn
            .get_keyboard_mapping(min, max - min + 1)?
            .reply()
            .context("Failed to read keyboard mapping")?;
        debug!("Loaded keyboard mapping for keycodes {}..={}", min, max);
        Ok(Self { min_keycode: min, per_keycode: reply.keysyms_per_keycode, keysyms: reply.keysyms })
    }

    pub fn keysym(&self, keycode: u8) -> u32 {
        let Some(offset) = keycode.checked_sub(self.min_keycode) else {
            return 0;
        };
        let index = usize::from(offset) * usize::from(self.per_keycode);
        self.keysyms.get(index).copied().unwrap_or(0)
    }
}

/// Routes x11rb events to the core
pub struct EventRouter {
    conn: Arc<RustConnection>,
    atoms: Arc<Atoms>,
    root: u32,
    /// Latest server timestamp, shared with the backend
    time: Rc<Cell<u32>>,
    keymap: KeyMap,
}

impl EventRouter {
    pub fn new(conn: Arc<RustConnection>, atoms: Arc<Atoms>, root: u32, time: Rc<Cell<u32>>) -> Result<Self> {
        let keymap = KeyMap::load(&conn)?;
        Ok(Self { conn, atoms, root, time, keymap })
    }

    /// Select the client events we need, then manage the window
    pub fn manage(&self, core: &mut WindowManagerCore, window: u32, initial: bool) {
        let aux = xproto::ChangeWindowAttributesAux::new().event_mask(
            xproto::EventMask::PROPERTY_CHANGE
                | xproto::EventMask::STRUCTURE_NOTIFY
                | xproto::EventMask::FOCUS_CHANGE
                | xproto::EventMask::ENTER_WINDOW,
        );
        let selected = self.conn.change_window_attributes(window, &aux).map(|_| ());
        trap(selected.map_err(Into::into), "select client events", window);
        core.manage_window(window, initial);
    }

    fn note_time(&self, time: u32) {
        if time != x11rb::CURRENT_TIME {
            self.time.set(time);
        }
    }

    /// Dispatch one event
    pub fn route_event(&mut self, core: &mut WindowManagerCore, event: Event) {
        match event {
            Event::MapRequest(e) => {
                debug!("MapRequest: window 0x{:x}", e.window);
                self.manage_or_map(core, e.window);
            }
            // Parents report every unmap/destroy of their children; the
            // copies sent to the client itself are ignored
            Event::UnmapNotify(e) if e.event != e.window => core.handle_unmap_notify(e.window),
            Event::DestroyNotify(e) if e.event != e.window => core.handle_destroy_notify(e.window),
            Event::ConfigureRequest(e) => self.configure_request(core, &e),
            Event::ButtonPress(e) => {
                self.note_time(e.time);
                if core.grab.is_some() {
                    return;
                }
                if let Some(client) = core.frames.get(&e.event).copied() {
                    let root = (i32::from(e.root_x), i32::from(e.root_y));
                    core.frame_button_press(client, i32::from(e.event_x), i32::from(e.event_y), root, e.detail, e.time);
                }
            }
            Event::ButtonRelease(e) => {
                self.note_time(e.time);
                let (x, y) = (i32::from(e.root_x), i32::from(e.root_y));
                if core.grab.as_ref().is_some_and(|g| g.button == Some(e.detail) || g.button.is_none()) {
                    core.handle_grab_button_release(x, y, e.time);
                } else if let Some(client) = core.frames.get(&e.event).copied() {
                    core.frame_button_release(client, i32::from(e.event_x), i32::from(e.event_y), e.detail, e.time);
                }
            }
            Event::MotionNotify(e) => {
                self.note_time(e.time);
                if core.grab.is_some() {
                    let snap = e.state.contains(xproto::KeyButMask::SHIFT);
                    core.handle_grab_motion(i32::from(e.root_x), i32::from(e.root_y), snap);
                }
            }
            Event::KeyPress(e) => {
                self.note_time(e.time);
                if core.grab.is_some() {
                    let key = GrabKey::from_keysym(self.keymap.keysym(e.detail));
                    let fine = e.state.contains(xproto::KeyButMask::CONTROL);
                    core.handle_grab_key(key, fine, e.time);
                }
            }
            Event::EnterNotify(e) => {
                self.note_time(e.time);
                if e.mode == xproto::NotifyMode::NORMAL && e.detail != xproto::NotifyDetail::INFERIOR {
                    core.handle_enter(e.event, e.time);
                }
            }
            Event::PropertyNotify(e) => {
                self.note_time(e.time);
                self.property_notify(core, &e);
            }
            Event::ClientMessage(e) => {
                if let Some(request) = self.decode_client_message(&e) {
                    core.handle_client_request(e.window, request);
                }
            }
            Event::MappingNotify(e) if e.request == xproto::Mapping::KEYBOARD => match KeyMap::load(&self.conn) {
                Ok(keymap) => self.keymap = keymap,
                Err(err) => warn!("Failed to reload keyboard mapping: {:#}", err),
            },
            Event::SyncAlarmNotify(e) => core.handle_sync_alarm(e.alarm),
            Event::RandrScreenChangeNotify(e) => {
                let size = Rect::new(0, 0, i32::from(e.width), i32::from(e.height));
                let monitors = core.display.monitors();
                core.monitors_changed(size, monitors);
            }
            Event::Error(e) => debug!("X11 error {:?} on request {}", e.error_kind, e.major_opcode),
            other => trace!("Ignoring event {:?}", other),
        }
    }

    fn manage_or_map(&self, core: &mut WindowManagerCore, window: u32) {
        if core.windows.contains_key(&window) {
            core.handle_map_request(window);
        } else {
            self.manage(core, window, false);
        }
    }

    /// Managed windows go through the constraints; anything else gets
    /// exactly what it asked for
    fn configure_request(&self, core: &mut WindowManagerCore, e: &xproto::ConfigureRequestEvent) {
        if !core.windows.contains_key(&e.window) {
            trace!("Passing through configure request of unmanaged 0x{:x}", e.window);
            let aux = xproto::ConfigureWindowAux::from_configure_request(e);
            let sent = self.conn.configure_window(e.window, &aux).map(|_| ());
            trap(sent.map_err(Into::into), "configure unmanaged", e.window);
            return;
        }
        let mask = e.value_mask;
        let has = |flag: xproto::ConfigWindow| mask.contains(flag);
        let request = ConfigureRequest {
            changes: WindowChanges {
                x: has(xproto::ConfigWindow::X).then_some(i32::from(e.x)),
                y: has(xproto::ConfigWindow::Y).then_some(i32::from(e.y)),
                width: has(xproto::ConfigWindow::WIDTH).then_some(i32::from(e.width)),
                height: has(xproto::ConfigWindow::HEIGHT).then_some(i32::from(e.height)),
                border_width: has(xproto::ConfigWindow::BORDER_WIDTH).then_some(i32::from(e.border_width)),
            },
            stack_mode: if has(xproto::ConfigWindow::STACK_MODE) {
                StackMode::from_wire(u32::from(e.stack_mode))
            } else {
                None
            },
        };
        core.configure_request(e.window, &request);
    }

    fn property_notify(&self, core: &mut WindowManagerCore, e: &xproto::PropertyNotifyEvent) {
        if e.state != xproto::Property::NEW_VALUE {
            return;
        }
        let atoms = &self.atoms;
        if e.atom == atoms.net_wm_icon || e.atom == u32::from(xproto::AtomEnum::WM_HINTS) {
            core.handle_property_change(e.window, PropertyChange::Icon);
        } else if e.atom == atoms.net_wm_user_time {
            let reply = self
                .conn
                .get_property(false, e.window, atoms.net_wm_user_time, xproto::AtomEnum::CARDINAL, 0, 1)
                .map_err(anyhow::Error::from)
                .and_then(|cookie| cookie.reply().map_err(Into::into));
            let time = trap(reply, "_NET_WM_USER_TIME", e.window).and_then(|r| r.value32().and_then(|mut v| v.next()));
            if let Some(time) = time {
                core.handle_property_change(e.window, PropertyChange::UserTime(time));
            }
        }
    }

    fn decode_client_message(&self, e: &xproto::ClientMessageEvent) -> Option<ClientRequest> {
        if e.format != 32 {
            return None;
        }
        let data = e.data.as_data32();
        let atoms = &self.atoms;
        let kind = e.type_;

        let request = if kind == atoms.net_wm_moveresize {
            ClientRequest::MoveResize {
                op: GrabOp::from_net_wm_moveresize(data[2]),
                root: (data[0] as i32, data[1] as i32),
                button: data[3] as u8,
            }
        } else if kind == atoms.net_moveresize_window {
            let flags = data[0];
            let field = |bit: u32, value: u32| (flags & (1 << bit) != 0).then_some(value as i32);
            ClientRequest::MoveResizeWindow(ConfigureRequest {
                changes: WindowChanges {
                    x: field(8, data[1]),
                    y: field(9, data[2]),
                    width: field(10, data[3]),
                    height: field(11, data[4]),
                    border_width: None,
                },
                stack_mode: None,
            })
        } else if kind == atoms.net_active_window {
            ClientRequest::Activate { time: data[1] }
        } else if kind == atoms.net_wm_state {
            let action = StateAction::from_wire(data[0])?;
            let state = [data[1], data[2]]
                .into_iter()
                .filter_map(|atom| atoms.state_from_atom(atom))
                .fold(WindowState::empty(), |acc, s| acc | s);
            ClientRequest::State { action, state }
        } else if kind == atoms.net_wm_desktop {
            ClientRequest::Desktop(data[0])
        } else if kind == atoms.net_close_window {
            ClientRequest::Close { time: data[0] }
        } else if kind == atoms.wm_change_state {
            // ICCCM IconicState
            (data[0] == 3).then_some(ClientRequest::Iconify)?
        } else if kind == atoms.net_current_desktop && e.window == self.root {
            ClientRequest::CurrentDesktop { desktop: data[0], time: data[1] }
        } else if kind == atoms.net_showing_desktop && e.window == self.root {
            ClientRequest::ShowingDesktop(data[0] != 0)
        } else {
            trace!("Unhandled client message type {} on 0x{:x}", kind, e.window);
            return None;
        };
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::settings::WmSettings;
    use crate::wm::testing::{Harness, Request};
    use crate::wm::client_flags::WmFlags;

    #[test]
    fn state_actions_decode() {
        assert_eq!(StateAction::from_wire(0), Some(StateAction::Remove));
        assert_eq!(StateAction::from_wire(2), Some(StateAction::Toggle));
        assert_eq!(StateAction::from_wire(3), None);
        assert!(StateAction::Toggle.wants(false));
        assert!(!StateAction::Toggle.wants(true));
    }

    #[test]
    fn keymap_uses_the_first_column() {
        let keymap = KeyMap { min_keycode: 8, per_keycode: 2, keysyms: vec![0x61, 0x41, 0xff51, 0] };
        assert_eq!(keymap.keysym(9), 0xff51);
        assert_eq!(keymap.keysym(7), 0);
        assert_eq!(keymap.keysym(40), 0);
    }

    #[test]
    fn map_request_manages_new_windows() {
        let mut h = Harness::new();
        let info = h.info(Rect::new(100, 100, 300, 200));
        let id = h.manage(info);
        h.core.unmanage_window(id, false);
        h.core.handle_map_request(id);
        assert!(h.core.window(id).is_some());
    }

    #[test]
    fn expected_unmaps_do_not_unmanage() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        if let Some(win) = h.core.windows.get_mut(&id) {
            win.unmaps_pending = 1;
        }
        h.core.handle_unmap_notify(id);
        assert!(h.core.window(id).is_some());
        assert_eq!(h.core.windows[&id].unmaps_pending, 0);

        h.core.handle_unmap_notify(id);
        assert!(h.core.window(id).is_none());
    }

    #[test]
    fn minimized_windows_come_back_on_map_request() {
        let mut h = Harness::with_settings(WmSettings { animate_minimize: false, ..WmSettings::default() });
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.minimize(id);
        h.core.run_idle();
        h.core.handle_map_request(id);
        h.core.run_idle();
        assert!(!h.core.windows[&id].is_minimized());
        assert!(h.core.windows[&id].flags.contains(WmFlags::MAPPED));
    }

    #[test]
    fn destroy_of_a_frame_is_not_a_client_destroy() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let frame = h.frame_of(id);
        h.core.handle_destroy_notify(frame);
        assert!(h.core.window(id).is_some());
        h.core.handle_destroy_notify(id);
        assert!(h.core.window(id).is_none());
    }

    #[test]
    fn state_requests_maximize_and_toggle() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let request = ClientRequest::State { action: StateAction::Add, state: WindowState::MAXIMIZED };
        h.core.handle_client_request(id, request);
        assert!(h.core.windows[&id].is_maximized());

        let toggle = ClientRequest::State { action: StateAction::Toggle, state: WindowState::MAXIMIZED };
        h.core.handle_client_request(id, toggle);
        assert!(!h.core.windows[&id].state.is_any_maximized());

        let above = ClientRequest::State { action: StateAction::Add, state: WindowState::ABOVE };
        h.core.handle_client_request(id, above);
        assert!(h.core.windows[&id].state.contains(WindowState::ABOVE));
    }

    #[test]
    fn skip_taskbar_request_updates_features() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let request = ClientRequest::State { action: StateAction::Add, state: WindowState::SKIP_TASKBAR };
        h.core.handle_client_request(id, request);
        assert!(h.core.windows[&id].features.contains(Features::SKIP_TASKBAR));
    }

    #[test]
    fn moveresize_message_starts_and_cancels_a_grab() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let start = ClientRequest::MoveResize { op: Some(GrabOp::Moving), root: (200, 110), button: 1 };
        h.core.handle_client_request(id, start);
        assert_eq!(h.core.grab.as_ref().map(|g| (g.window, g.op, g.button)), Some((id, GrabOp::Moving, Some(1))));

        let cancel = ClientRequest::MoveResize { op: None, root: (0, 0), button: 0 };
        h.core.handle_client_request(id, cancel);
        assert!(h.core.grab.is_none());
    }

    #[test]
    fn desktop_requests_move_or_stick() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.handle_client_request(id, ClientRequest::Desktop(2));
        assert_eq!(h.core.windows[&id].workspace, 2);
        h.core.handle_client_request(id, ClientRequest::Desktop(ALL_WORKSPACES));
        assert!(h.core.windows[&id].is_sticky());

        h.core.handle_client_request(0, ClientRequest::CurrentDesktop { desktop: 3, time: 2000 });
        assert_eq!(h.core.workspaces.active, 3);
    }

    #[test]
    fn close_request_deletes_politely() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.handle_client_request(id, ClientRequest::Close { time: 2000 });
        assert!(h.requests().contains(&Request::Delete(id)));
    }

    #[test]
    fn enter_focuses_only_outside_click_mode() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let b = h.manage_mapped(Rect::new(500, 100, 300, 200));
        let frame = h.frame_of(a);
        h.core.handle_enter(frame, 2000);
        assert_eq!(h.core.focus.focus, Some(b));

        h.core.settings.focus_mode = FocusMode::Sloppy;
        h.core.handle_enter(frame, 2001);
        assert_eq!(h.core.focus.focus, Some(a));
    }

    #[test]
    fn icon_changes_are_coalesced() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.clear_log();
        h.core.handle_property_change(id, PropertyChange::Icon);
        h.core.handle_property_change(id, PropertyChange::Icon);
        h.core.run_idle();
        let icons = h
            .notifications()
            .iter()
            .filter(|n| matches!(n, crate::wm::testing::Notification::Icon(w) if *w == id))
            .count();
        assert_eq!(icons, 1);
    }
}
