//! Display Module
//!
//! The [`DisplayServer`] seam between the window-management core and the X
//! server, and [`X11Backend`], its x11rb implementation. The backend also
//! performs the ICCCM dance that makes us the window manager.

use anyhow::{Context, Result};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::sync::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _, *};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::shared::{FrameInsets, Gravity, Rect};
use crate::wm::client_flags::{Features, WindowState, WindowType};
use crate::wm::ewmh::Atoms;

/// One combined geometry request; unset fields are left alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub border_width: Option<i32>,
}

impl WindowChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Everything the core reads from a client when it starts managing it
#[derive(Debug, Clone, Default)]
pub struct WindowInfo {
    /// Client rect in root coordinates
    pub rect: Rect,
    pub border_width: i32,
    pub override_redirect: bool,
    pub viewable: bool,
    pub title: String,
    /// res_class of WM_CLASS
    pub class: String,
    pub window_type: WindowType,
    pub normal_hints: Vec<u32>,
    pub wm_hints: Vec<u32>,
    pub motif_hints: Vec<u32>,
    pub strut: Vec<u32>,
    pub transient_for: Option<u32>,
    pub take_focus: bool,
    pub delete_window: bool,
    pub sync_counter: Option<u32>,
    pub user_time: Option<u32>,
    /// Initial _NET_WM_STATE
    pub initial_state: WindowState,
    pub desktop: Option<u32>,
}

/// Requests the core makes of the display server
///
/// Every call may fail because the client destroyed its window behind our
/// back; callers trap those errors.
pub trait DisplayServer {
    /// Whole screen in root coordinates
    fn screen_rect(&self) -> Rect;
    fn monitors(&self) -> Vec<Rect>;
    /// Timestamp of the most recent event, for requests that need one
    fn current_time(&self) -> u32;
    fn query_pointer(&self) -> Result<(i32, i32)>;

    fn read_window_info(&self, window: u32) -> Result<WindowInfo>;

    /// Create a frame and reparent `client` into it
    fn create_frame(&mut self, client: u32, rect: Rect, child_x: i32, child_y: i32) -> Result<u32>;
    /// Reparent `client` back to the root at `client_rect` and destroy the frame
    fn destroy_frame(&mut self, frame: u32, client: u32, client_rect: Rect) -> Result<()>;

    fn configure_window(&mut self, window: u32, changes: &WindowChanges) -> Result<()>;
    fn send_configure_notify(&mut self, window: u32, rect: Rect, border_width: i32) -> Result<()>;
    fn set_win_gravity(&mut self, window: u32, gravity: Gravity) -> Result<()>;

    fn create_sync_alarm(&mut self, window: u32, counter: u32) -> Result<u32>;
    fn destroy_sync_alarm(&mut self, window: u32) -> Result<()>;
    fn send_sync_request(&mut self, window: u32, serial: u64, time: u32) -> Result<()>;

    fn map_window(&mut self, window: u32) -> Result<()>;
    fn unmap_window(&mut self, window: u32) -> Result<()>;

    fn set_wm_state(&mut self, window: u32, iconic: bool) -> Result<()>;
    fn set_net_wm_state(&mut self, window: u32, state: WindowState) -> Result<()>;
    fn set_allowed_actions(&mut self, window: u32, features: Features) -> Result<()>;
    fn set_frame_extents(&mut self, window: u32, insets: FrameInsets) -> Result<()>;
    fn set_window_desktop(&mut self, window: u32, desktop: Option<u32>) -> Result<()>;

    fn set_input_focus(&mut self, window: Option<u32>, time: u32) -> Result<()>;
    fn send_take_focus(&mut self, window: u32, time: u32) -> Result<()>;
    fn send_delete(&mut self, window: u32, time: u32) -> Result<()>;
    /// Disconnect the client owning `window`
    fn kill_client(&mut self, window: u32) -> Result<()>;

    /// Returns false if the server refused the grab
    fn grab_pointer(&mut self, time: u32) -> Result<bool>;
    fn ungrab_pointer(&mut self, time: u32) -> Result<()>;
    fn grab_keyboard(&mut self, time: u32) -> Result<bool>;
    fn ungrab_keyboard(&mut self, time: u32) -> Result<()>;
    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()>;

    /// Restack top-level windows, bottom to top
    fn restack(&mut self, bottom_to_top: &[u32]) -> Result<()>;
    fn set_client_list(&mut self, clients: &[u32], stacking: &[u32]) -> Result<()>;
    fn set_active_window(&mut self, window: Option<u32>) -> Result<()>;
    fn set_workarea(&mut self, area: Rect, desktops: u32) -> Result<()>;
    fn set_current_desktop(&mut self, desktop: u32, count: u32) -> Result<()>;
    fn set_showing_desktop(&mut self, showing: bool) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// X11 implementation of [`DisplayServer`]
pub struct X11Backend {
    conn: Arc<RustConnection>,
    screen_num: usize,
    root: u32,
    atoms: Arc<Atoms>,
    /// Owns the WM_S<n> selection and carries _NET_SUPPORTING_WM_CHECK
    owner_window: u32,
    last_time: Rc<Cell<u32>>,
    have_sync: bool,
    have_randr: bool,
    alarms: HashMap<u32, u32>,
}

impl X11Backend {
    /// Become the window manager of `screen_num`
    ///
    /// With `replace`, an existing window manager is asked to leave by
    /// taking its selection and waiting for its owner window to go away.
    pub fn connect(conn: Arc<RustConnection>, screen_num: usize, replace: bool) -> Result<Self> {
        info!("Initializing window manager (replace={})", replace);
        let screen = conn.setup().roots[screen_num].clone();
        let root = screen.root;

        let wm_selection_name = format!("WM_S{}", screen_num);
        let wm_selection_atom = conn
            .intern_atom(false, wm_selection_name.as_bytes())?
            .reply()
            .context("Failed to intern WM selection atom")?
            .atom;

        let current_wm_owner = conn
            .get_selection_owner(wm_selection_atom)?
            .reply()
            .context("Failed to get current WM selection owner")?
            .owner;

        if current_wm_owner != x11rb::NONE {
            if !replace {
                anyhow::bail!(
                    "Another window manager is already running (window 0x{:x}). \
                    Use --replace to attempt to replace it.",
                    current_wm_owner
                );
            }
            info!("Existing WM detected (window 0x{:x}), attempting replace...", current_wm_owner);
            let _ = conn.change_window_attributes(
                current_wm_owner,
                &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
            );
        }

        let owner_window = conn.generate_id()?;
        conn.create_window(
            screen.root_depth,
            owner_window,
            root,
            -100,
            -100,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &CreateWindowAux::new()
                .override_redirect(1)
                .event_mask(EventMask::STRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE),
        )?;
        conn.map_window(owner_window)?;

        conn.set_selection_owner(owner_window, wm_selection_atom, x11rb::CURRENT_TIME)?
            .check()
            .context("Failed to set WM selection owner")?;
        let owner_after = conn
            .get_selection_owner(wm_selection_atom)?
            .reply()
            .context("Failed to verify WM selection ownership")?
            .owner;
        if owner_after != owner_window {
            anyhow::bail!(
                "Failed to acquire WM selection ownership (expected 0x{:x}, got 0x{:x})",
                owner_window,
                owner_after
            );
        }

        if current_wm_owner != x11rb::NONE {
            Self::wait_for_exit(&conn, current_wm_owner)?;
        }

        let required_mask = EventMask::SUBSTRUCTURE_REDIRECT
            | EventMask::SUBSTRUCTURE_NOTIFY
            | EventMask::BUTTON_PRESS
            | EventMask::PROPERTY_CHANGE
            | EventMask::FOCUS_CHANGE
            | EventMask::STRUCTURE_NOTIFY;
        conn.change_window_attributes(root, &ChangeWindowAttributesAux::new().event_mask(required_mask))?
            .check()
            .context("Failed to select events on root window - is another WM running?")?;

        let atoms = Atoms::new(conn.as_ref())?;
        conn.change_property32(PropMode::REPLACE, root, atoms.net_supported, AtomEnum::ATOM, &atoms.supported())?;
        conn.change_property32(
            PropMode::REPLACE,
            root,
            atoms.net_supporting_wm_check,
            AtomEnum::WINDOW,
            &[owner_window],
        )?;
        conn.change_property32(
            PropMode::REPLACE,
            owner_window,
            atoms.net_supporting_wm_check,
            AtomEnum::WINDOW,
            &[owner_window],
        )?;
        conn.change_property8(PropMode::REPLACE, owner_window, atoms.net_wm_name, atoms.utf8_string, b"strata")?;

        let have_sync = match conn.sync_initialize(3, 1) {
            Ok(cookie) => cookie.reply().is_ok(),
            Err(_) => false,
        };
        let have_randr = match conn.randr_query_version(1, 5) {
            Ok(cookie) => cookie.reply().is_ok(),
            Err(_) => false,
        };
        if have_randr {
            let _ = conn.randr_select_input(root, x11rb::protocol::randr::NotifyMask::SCREEN_CHANGE);
        }
        info!("X11 extensions: sync={}, randr={}", have_sync, have_randr);

        conn.flush()?;
        info!("Successfully became window manager on screen {}", screen_num);

        Ok(Self {
            conn,
            screen_num,
            root,
            atoms: Arc::new(atoms),
            owner_window,
            last_time: Rc::new(Cell::new(x11rb::CURRENT_TIME)),
            have_sync,
            have_randr,
            alarms: HashMap::new(),
        })
    }

    fn wait_for_exit(conn: &RustConnection, previous: u32) -> Result<()> {
        info!("Waiting for previous WM to exit...");
        let timeout = Duration::from_secs(15);
        let start = Instant::now();
        while start.elapsed() < timeout {
            if conn.get_window_attributes(previous)?.reply().is_err() {
                info!("Previous WM exited successfully");
                return Ok(());
            }
            conn.flush()?;
            std::thread::sleep(Duration::from_millis(100));
        }
        warn!("Timeout waiting for previous WM to exit, proceeding anyway");
        Ok(())
    }

    pub fn root(&self) -> u32 {
        self.root
    }

    pub fn atoms(&self) -> Arc<Atoms> {
        self.atoms.clone()
    }

    /// Handle the event router stamps with every event timestamp it sees
    pub fn time_tracker(&self) -> Rc<Cell<u32>> {
        self.last_time.clone()
    }

    /// Top-level windows that exist before we start, bottom to top
    pub fn existing_windows(&self) -> Result<Vec<u32>> {
        let tree = self.conn.query_tree(self.root)?.reply().context("Failed to query root tree")?;
        Ok(tree.children.into_iter().filter(|&w| w != self.owner_window).collect())
    }

    fn property32(&self, window: u32, property: Atom, kind: impl Into<Atom>, length: u32) -> Result<Vec<u32>> {
        let reply = self.conn.get_property(false, window, property, kind, 0, length)?.reply()?;
        Ok(reply.value32().map(|values| values.collect()).unwrap_or_default())
    }

    fn read_title(&self, window: u32) -> Result<String> {
        let reply = self
            .conn
            .get_property(false, window, self.atoms.net_wm_name, self.atoms.utf8_string, 0, 256)?
            .reply()?;
        if !reply.value.is_empty() {
            return Ok(String::from_utf8_lossy(&reply.value).into_owned());
        }
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_NAME, AtomEnum::STRING, 0, 256)?
            .reply()?;
        Ok(String::from_utf8_lossy(&reply.value).into_owned())
    }

    fn read_class(&self, window: u32) -> Result<String> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 256)?
            .reply()?;
        // WM_CLASS is "res_name\0res_class\0"
        let text = String::from_utf8_lossy(&reply.value).into_owned();
        Ok(text.split('\0').nth(1).unwrap_or_default().to_string())
    }
}

impl DisplayServer for X11Backend {
    fn screen_rect(&self) -> Rect {
        let screen = &self.conn.setup().roots[self.screen_num];
        Rect::new(0, 0, i32::from(screen.width_in_pixels), i32::from(screen.height_in_pixels))
    }

    fn monitors(&self) -> Vec<Rect> {
        if !self.have_randr {
            return Vec::new();
        }
        let reply = match self.conn.randr_get_monitors(self.root, true) {
            Ok(cookie) => cookie.reply(),
            Err(err) => {
                warn!("RandR monitor query failed: {}", err);
                return Vec::new();
            }
        };
        match reply {
            Ok(reply) => reply
                .monitors
                .iter()
                .map(|m| Rect::new(i32::from(m.x), i32::from(m.y), i32::from(m.width), i32::from(m.height)))
                .collect(),
            Err(err) => {
                warn!("RandR monitor query failed: {}", err);
                Vec::new()
            }
        }
    }

    fn current_time(&self) -> u32 {
        self.last_time.get()
    }

    fn query_pointer(&self) -> Result<(i32, i32)> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok((i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn read_window_info(&self, window: u32) -> Result<WindowInfo> {
        let attrs = self.conn.get_window_attributes(window)?.reply().context("get_window_attributes")?;
        let geometry = self.conn.get_geometry(window)?.reply().context("get_geometry")?;
        let origin = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)?
            .reply()
            .context("translate_coordinates")?;

        let protocols = self.property32(window, self.atoms.wm_protocols, AtomEnum::ATOM, 32)?;
        let transient_for = self
            .property32(window, AtomEnum::WM_TRANSIENT_FOR.into(), AtomEnum::WINDOW, 1)?
            .first()
            .copied()
            .filter(|&w| w != x11rb::NONE && w != window);
        let state_atoms = self.property32(window, self.atoms.net_wm_state, AtomEnum::ATOM, 32)?;
        let initial_state = self.atoms.state_from_atoms(&state_atoms);
        let types = self.property32(window, self.atoms.net_wm_window_type, AtomEnum::ATOM, 32)?;

        let mut strut = self.property32(window, self.atoms.net_wm_strut_partial, AtomEnum::CARDINAL, 12)?;
        if strut.is_empty() {
            strut = self.property32(window, self.atoms.net_wm_strut, AtomEnum::CARDINAL, 4)?;
        }

        Ok(WindowInfo {
            rect: Rect::new(
                i32::from(origin.dst_x),
                i32::from(origin.dst_y),
                i32::from(geometry.width),
                i32::from(geometry.height),
            ),
            border_width: i32::from(geometry.border_width),
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
            title: self.read_title(window)?,
            class: self.read_class(window)?,
            window_type: self.atoms.window_type(
                &types,
                transient_for.is_some(),
                initial_state.contains(WindowState::MODAL),
            ),
            normal_hints: self.property32(window, AtomEnum::WM_NORMAL_HINTS.into(), AtomEnum::WM_SIZE_HINTS, 18)?,
            wm_hints: self.property32(window, AtomEnum::WM_HINTS.into(), AtomEnum::WM_HINTS, 9)?,
            motif_hints: self.property32(window, self.atoms.motif_wm_hints, self.atoms.motif_wm_hints, 5)?,
            strut,
            transient_for,
            take_focus: protocols.contains(&self.atoms.wm_take_focus),
            delete_window: protocols.contains(&self.atoms.wm_delete_window),
            sync_counter: if protocols.contains(&self.atoms.net_wm_sync_request) {
                self.property32(window, self.atoms.net_wm_sync_request_counter, AtomEnum::CARDINAL, 1)?
                    .first()
                    .copied()
                    .filter(|&c| c != x11rb::NONE)
            } else {
                None
            },
            user_time: self.property32(window, self.atoms.net_wm_user_time, AtomEnum::CARDINAL, 1)?.first().copied(),
            initial_state,
            desktop: self
                .property32(window, self.atoms.net_wm_desktop, AtomEnum::CARDINAL, 1)?
                .first()
                .copied()
                .filter(|&d| d != u32::MAX),
        })
    }

    fn create_frame(&mut self, client: u32, rect: Rect, child_x: i32, child_y: i32) -> Result<u32> {
        let frame = self.conn.generate_id()?;
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            frame,
            self.root,
            rect.x as i16,
            rect.y as i16,
            rect.width.max(1) as u16,
            rect.height.max(1) as u16,
            0,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(0x0030_3030)
                .override_redirect(1)
                .event_mask(
                    EventMask::SUBSTRUCTURE_REDIRECT
                        | EventMask::SUBSTRUCTURE_NOTIFY
                        | EventMask::BUTTON_PRESS
                        | EventMask::BUTTON_RELEASE
                        | EventMask::POINTER_MOTION
                        | EventMask::ENTER_WINDOW
                        | EventMask::EXPOSURE,
                ),
        )?;
        self.conn.change_save_set(SetMode::INSERT, client)?;
        self.conn.change_window_attributes(
            client,
            &ChangeWindowAttributesAux::new()
                .event_mask(EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY | EventMask::FOCUS_CHANGE),
        )?;
        self.conn.reparent_window(client, frame, child_x as i16, child_y as i16)?;
        debug!("Created frame 0x{:x} for 0x{:x} at {}", frame, client, rect);
        Ok(frame)
    }

    fn destroy_frame(&mut self, frame: u32, client: u32, client_rect: Rect) -> Result<()> {
        // The client may already be gone; the frame must go regardless
        let _ = self
            .conn
            .reparent_window(client, self.root, client_rect.x as i16, client_rect.y as i16);
        let _ = self.conn.change_save_set(SetMode::DELETE, client);
        self.conn.destroy_window(frame)?;
        Ok(())
    }

    fn configure_window(&mut self, window: u32, changes: &WindowChanges) -> Result<()> {
        let mut aux = ConfigureWindowAux::new();
        if let Some(x) = changes.x {
            aux = aux.x(x);
        }
        if let Some(y) = changes.y {
            aux = aux.y(y);
        }
        if let Some(width) = changes.width {
            aux = aux.width(width.max(1) as u32);
        }
        if let Some(height) = changes.height {
            aux = aux.height(height.max(1) as u32);
        }
        if let Some(border_width) = changes.border_width {
            aux = aux.border_width(border_width.max(0) as u32);
        }
        self.conn.configure_window(window, &aux)?;
        Ok(())
    }

    fn send_configure_notify(&mut self, window: u32, rect: Rect, border_width: i32) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: rect.x as i16,
            y: rect.y as i16,
            width: rect.width.max(1) as u16,
            height: rect.height.max(1) as u16,
            border_width: border_width.max(0) as u16,
            override_redirect: false,
        };
        self.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn set_win_gravity(&mut self, window: u32, gravity: Gravity) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().win_gravity(xproto::Gravity::from(gravity.to_wire())),
        )?;
        Ok(())
    }

    fn create_sync_alarm(&mut self, window: u32, counter: u32) -> Result<u32> {
        anyhow::ensure!(self.have_sync, "XSync extension not available");
        let current = self.conn.sync_query_counter(counter)?.reply()?.counter_value;
        let alarm = self.conn.generate_id()?;
        self.conn.sync_create_alarm(
            alarm,
            &sync::CreateAlarmAux::new()
                .counter(counter)
                .value_type(sync::VALUETYPE::ABSOLUTE)
                .value(current)
                .test_type(sync::TESTTYPE::POSITIVE_COMPARISON)
                .delta(sync::Int64 { hi: 0, lo: 1 })
                .events(1),
        )?;
        self.alarms.insert(window, alarm);
        debug!("Created sync alarm 0x{:x} on counter 0x{:x} for 0x{:x}", alarm, counter, window);
        Ok(alarm)
    }

    fn destroy_sync_alarm(&mut self, window: u32) -> Result<()> {
        if let Some(alarm) = self.alarms.remove(&window) {
            self.conn.sync_destroy_alarm(alarm)?;
        }
        Ok(())
    }

    fn send_sync_request(&mut self, window: u32, serial: u64, time: u32) -> Result<()> {
        let (low, high) = crate::wm::sync::split_serial(serial);
        if let Some(&alarm) = self.alarms.get(&window) {
            // Fire once the counter reaches the serial we hand out
            self.conn.sync_change_alarm(
                alarm,
                &sync::ChangeAlarmAux::new().value(sync::Int64 { hi: high as i32, lo: low }),
            )?;
        }
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.wm_protocols,
            [self.atoms.net_wm_sync_request, time, low, high, 0],
        );
        self.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn map_window(&mut self, window: u32) -> Result<()> {
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap_window(&mut self, window: u32) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn set_wm_state(&mut self, window: u32, iconic: bool) -> Result<()> {
        // ICCCM NormalState = 1, IconicState = 3
        let state = if iconic { 3 } else { 1 };
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[state, x11rb::NONE],
        )?;
        Ok(())
    }

    fn set_net_wm_state(&mut self, window: u32, state: WindowState) -> Result<()> {
        let atoms = self.atoms.state_atoms(state);
        self.conn
            .change_property32(PropMode::REPLACE, window, self.atoms.net_wm_state, AtomEnum::ATOM, &atoms)?;
        Ok(())
    }

    fn set_allowed_actions(&mut self, window: u32, features: Features) -> Result<()> {
        let atoms = self.atoms.allowed_action_atoms(features);
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_wm_allowed_actions,
            AtomEnum::ATOM,
            &atoms,
        )?;
        Ok(())
    }

    fn set_frame_extents(&mut self, window: u32, insets: FrameInsets) -> Result<()> {
        let data = [insets.left, insets.right, insets.top, insets.bottom].map(|v| v.max(0) as u32);
        self.conn
            .change_property32(PropMode::REPLACE, window, self.atoms.net_frame_extents, AtomEnum::CARDINAL, &data)?;
        Ok(())
    }

    fn set_window_desktop(&mut self, window: u32, desktop: Option<u32>) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.net_wm_desktop,
            AtomEnum::CARDINAL,
            &[desktop.unwrap_or(u32::MAX)],
        )?;
        Ok(())
    }

    fn set_input_focus(&mut self, window: Option<u32>, time: u32) -> Result<()> {
        let target = window.unwrap_or(self.owner_window);
        self.conn.set_input_focus(InputFocus::POINTER_ROOT, target, time)?;
        Ok(())
    }

    fn send_take_focus(&mut self, window: u32, time: u32) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.wm_protocols,
            [self.atoms.wm_take_focus, time, 0, 0, 0],
        );
        self.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn send_delete(&mut self, window: u32, time: u32) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.atoms.wm_protocols,
            [self.atoms.wm_delete_window, time, 0, 0, 0],
        );
        self.conn.send_event(false, window, EventMask::NO_EVENT, event)?;
        Ok(())
    }

    fn kill_client(&mut self, window: u32) -> Result<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn grab_pointer(&mut self, time: u32) -> Result<bool> {
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root,
                EventMask::POINTER_MOTION | EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                time,
            )?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&mut self, time: u32) -> Result<()> {
        self.conn.ungrab_pointer(time)?;
        Ok(())
    }

    fn grab_keyboard(&mut self, time: u32) -> Result<bool> {
        let reply = self
            .conn
            .grab_keyboard(false, self.root, time, GrabMode::ASYNC, GrabMode::ASYNC)?
            .reply()?;
        Ok(reply.status == GrabStatus::SUCCESS)
    }

    fn ungrab_keyboard(&mut self, time: u32) -> Result<()> {
        self.conn.ungrab_keyboard(time)?;
        Ok(())
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.conn.warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, x as i16, y as i16)?;
        Ok(())
    }

    fn restack(&mut self, bottom_to_top: &[u32]) -> Result<()> {
        for pair in bottom_to_top.windows(2) {
            self.conn.configure_window(
                pair[1],
                &ConfigureWindowAux::new().sibling(pair[0]).stack_mode(StackMode::ABOVE),
            )?;
        }
        Ok(())
    }

    fn set_client_list(&mut self, clients: &[u32], stacking: &[u32]) -> Result<()> {
        self.conn
            .change_property32(PropMode::REPLACE, self.root, self.atoms.net_client_list, AtomEnum::WINDOW, clients)?;
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_client_list_stacking,
            AtomEnum::WINDOW,
            stacking,
        )?;
        Ok(())
    }

    fn set_active_window(&mut self, window: Option<u32>) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_active_window,
            AtomEnum::WINDOW,
            &[window.unwrap_or(x11rb::NONE)],
        )?;
        Ok(())
    }

    fn set_workarea(&mut self, area: Rect, desktops: u32) -> Result<()> {
        let one = [area.x as u32, area.y as u32, area.width as u32, area.height as u32];
        let data: Vec<u32> = (0..desktops).flat_map(|_| one).collect();
        self.conn
            .change_property32(PropMode::REPLACE, self.root, self.atoms.net_workarea, AtomEnum::CARDINAL, &data)?;
        Ok(())
    }

    fn set_current_desktop(&mut self, desktop: u32, count: u32) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_number_of_desktops,
            AtomEnum::CARDINAL,
            &[count],
        )?;
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_current_desktop,
            AtomEnum::CARDINAL,
            &[desktop],
        )?;
        Ok(())
    }

    fn set_showing_desktop(&mut self, showing: bool) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            self.root,
            self.atoms.net_showing_desktop,
            AtomEnum::CARDINAL,
            &[u32::from(showing)],
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}
