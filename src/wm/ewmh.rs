//! EWMH (Extended Window Manager Hints) and ICCCM atoms
//!
//! Interned atoms plus the conversions between wire atoms and the core's
//! typed state. Property writes live in the X11 backend.

use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, ConnectionExt as _};

use crate::wm::client_flags::{Features, WindowState, WindowType};

/// Holds all interned atoms
#[derive(Debug, Clone)]
pub struct Atoms {
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_client_list: Atom,
    pub net_client_list_stacking: Atom,
    pub net_number_of_desktops: Atom,
    pub net_current_desktop: Atom,
    pub net_active_window: Atom,
    pub net_close_window: Atom,
    pub net_workarea: Atom,
    pub net_showing_desktop: Atom,
    pub net_wm_name: Atom,
    pub net_wm_desktop: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_desktop: Atom,
    pub net_wm_window_type_dock: Atom,
    pub net_wm_window_type_normal: Atom,
    pub net_wm_window_type_dialog: Atom,
    pub net_wm_window_type_utility: Atom,
    pub net_wm_window_type_toolbar: Atom,
    pub net_wm_window_type_splash: Atom,
    pub net_wm_window_type_menu: Atom,
    pub net_wm_window_type_dropdown_menu: Atom,
    pub net_wm_window_type_popup_menu: Atom,
    pub net_wm_window_type_tooltip: Atom,
    pub net_wm_window_type_notification: Atom,
    pub net_wm_window_type_combo: Atom,
    pub net_wm_window_type_dnd: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_fullscreen: Atom,
    pub net_wm_state_maximized_vert: Atom,
    pub net_wm_state_maximized_horz: Atom,
    pub net_wm_state_hidden: Atom,
    pub net_wm_state_shaded: Atom,
    pub net_wm_state_sticky: Atom,
    pub net_wm_state_modal: Atom,
    pub net_wm_state_skip_pager: Atom,
    pub net_wm_state_skip_taskbar: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_state_below: Atom,
    pub net_wm_state_demands_attention: Atom,
    pub net_frame_extents: Atom,
    pub net_moveresize_window: Atom,
    pub net_wm_moveresize: Atom,
    pub net_wm_allowed_actions: Atom,
    pub net_wm_action_move: Atom,
    pub net_wm_action_resize: Atom,
    pub net_wm_action_minimize: Atom,
    pub net_wm_action_shade: Atom,
    pub net_wm_action_stick: Atom,
    pub net_wm_action_maximize_horz: Atom,
    pub net_wm_action_maximize_vert: Atom,
    pub net_wm_action_fullscreen: Atom,
    pub net_wm_action_change_desktop: Atom,
    pub net_wm_action_close: Atom,
    pub net_wm_strut: Atom,
    pub net_wm_strut_partial: Atom,
    pub net_wm_icon: Atom,
    pub net_wm_user_time: Atom,
    pub net_wm_sync_request: Atom,
    pub net_wm_sync_request_counter: Atom,
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub wm_state: Atom,
    pub wm_change_state: Atom,
    pub utf8_string: Atom,
    pub motif_wm_hints: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn.intern_atom(false, name.as_bytes())?.reply()?.atom)
        };

        Ok(Self {
            net_supported: intern("_NET_SUPPORTED")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_client_list: intern("_NET_CLIENT_LIST")?,
            net_client_list_stacking: intern("_NET_CLIENT_LIST_STACKING")?,
            net_number_of_desktops: intern("_NET_NUMBER_OF_DESKTOPS")?,
            net_current_desktop: intern("_NET_CURRENT_DESKTOP")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_close_window: intern("_NET_CLOSE_WINDOW")?,
            net_workarea: intern("_NET_WORKAREA")?,
            net_showing_desktop: intern("_NET_SHOWING_DESKTOP")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            net_wm_desktop: intern("_NET_WM_DESKTOP")?,
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_desktop: intern("_NET_WM_WINDOW_TYPE_DESKTOP")?,
            net_wm_window_type_dock: intern("_NET_WM_WINDOW_TYPE_DOCK")?,
            net_wm_window_type_normal: intern("_NET_WM_WINDOW_TYPE_NORMAL")?,
            net_wm_window_type_dialog: intern("_NET_WM_WINDOW_TYPE_DIALOG")?,
            net_wm_window_type_utility: intern("_NET_WM_WINDOW_TYPE_UTILITY")?,
            net_wm_window_type_toolbar: intern("_NET_WM_WINDOW_TYPE_TOOLBAR")?,
            net_wm_window_type_splash: intern("_NET_WM_WINDOW_TYPE_SPLASH")?,
            net_wm_window_type_menu: intern("_NET_WM_WINDOW_TYPE_MENU")?,
            net_wm_window_type_dropdown_menu: intern("_NET_WM_WINDOW_TYPE_DROPDOWN_MENU")?,
            net_wm_window_type_popup_menu: intern("_NET_WM_WINDOW_TYPE_POPUP_MENU")?,
            net_wm_window_type_tooltip: intern("_NET_WM_WINDOW_TYPE_TOOLTIP")?,
            net_wm_window_type_notification: intern("_NET_WM_WINDOW_TYPE_NOTIFICATION")?,
            net_wm_window_type_combo: intern("_NET_WM_WINDOW_TYPE_COMBO")?,
            net_wm_window_type_dnd: intern("_NET_WM_WINDOW_TYPE_DND")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_fullscreen: intern("_NET_WM_STATE_FULLSCREEN")?,
            net_wm_state_maximized_vert: intern("_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_maximized_horz: intern("_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_state_hidden: intern("_NET_WM_STATE_HIDDEN")?,
            net_wm_state_shaded: intern("_NET_WM_STATE_SHADED")?,
            net_wm_state_sticky: intern("_NET_WM_STATE_STICKY")?,
            net_wm_state_modal: intern("_NET_WM_STATE_MODAL")?,
            net_wm_state_skip_pager: intern("_NET_WM_STATE_SKIP_PAGER")?,
            net_wm_state_skip_taskbar: intern("_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_state_above: intern("_NET_WM_STATE_ABOVE")?,
            net_wm_state_below: intern("_NET_WM_STATE_BELOW")?,
            net_wm_state_demands_attention: intern("_NET_WM_STATE_DEMANDS_ATTENTION")?,
            net_frame_extents: intern("_NET_FRAME_EXTENTS")?,
            net_moveresize_window: intern("_NET_MOVERESIZE_WINDOW")?,
            net_wm_moveresize: intern("_NET_WM_MOVERESIZE")?,
            net_wm_allowed_actions: intern("_NET_WM_ALLOWED_ACTIONS")?,
            net_wm_action_move: intern("_NET_WM_ACTION_MOVE")?,
            net_wm_action_resize: intern("_NET_WM_ACTION_RESIZE")?,
            net_wm_action_minimize: intern("_NET_WM_ACTION_MINIMIZE")?,
            net_wm_action_shade: intern("_NET_WM_ACTION_SHADE")?,
            net_wm_action_stick: intern("_NET_WM_ACTION_STICK")?,
            net_wm_action_maximize_horz: intern("_NET_WM_ACTION_MAXIMIZE_HORZ")?,
            net_wm_action_maximize_vert: intern("_NET_WM_ACTION_MAXIMIZE_VERT")?,
            net_wm_action_fullscreen: intern("_NET_WM_ACTION_FULLSCREEN")?,
            net_wm_action_change_desktop: intern("_NET_WM_ACTION_CHANGE_DESKTOP")?,
            net_wm_action_close: intern("_NET_WM_ACTION_CLOSE")?,
            net_wm_strut: intern("_NET_WM_STRUT")?,
            net_wm_strut_partial: intern("_NET_WM_STRUT_PARTIAL")?,
            net_wm_icon: intern("_NET_WM_ICON")?,
            net_wm_user_time: intern("_NET_WM_USER_TIME")?,
            net_wm_sync_request: intern("_NET_WM_SYNC_REQUEST")?,
            net_wm_sync_request_counter: intern("_NET_WM_SYNC_REQUEST_COUNTER")?,
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            wm_state: intern("WM_STATE")?,
            wm_change_state: intern("WM_CHANGE_STATE")?,
            utf8_string: intern("UTF8_STRING")?,
            motif_wm_hints: intern("_MOTIF_WM_HINTS")?,
        })
    }

    /// Atoms advertised in _NET_SUPPORTED
    pub fn supported(&self) -> Vec<Atom> {
        vec![
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_client_list,
            self.net_client_list_stacking,
            self.net_number_of_desktops,
            self.net_current_desktop,
            self.net_active_window,
            self.net_close_window,
            self.net_workarea,
            self.net_showing_desktop,
            self.net_wm_name,
            self.net_wm_desktop,
            self.net_wm_window_type,
            self.net_wm_state,
            self.net_wm_state_fullscreen,
            self.net_wm_state_maximized_vert,
            self.net_wm_state_maximized_horz,
            self.net_wm_state_hidden,
            self.net_wm_state_shaded,
            self.net_wm_state_sticky,
            self.net_wm_state_modal,
            self.net_wm_state_skip_pager,
            self.net_wm_state_skip_taskbar,
            self.net_wm_state_above,
            self.net_wm_state_below,
            self.net_wm_state_demands_attention,
            self.net_frame_extents,
            self.net_moveresize_window,
            self.net_wm_moveresize,
            self.net_wm_allowed_actions,
            self.net_wm_strut,
            self.net_wm_strut_partial,
            self.net_wm_user_time,
            self.net_wm_sync_request,
            self.net_wm_sync_request_counter,
        ]
    }

    /// First recognised type in _NET_WM_WINDOW_TYPE wins
    ///
    /// Without the property a transient window is a dialog.
    pub fn window_type(&self, types: &[Atom], transient: bool, modal: bool) -> WindowType {
        let table = [
            (self.net_wm_window_type_desktop, WindowType::Desktop),
            (self.net_wm_window_type_dock, WindowType::Dock),
            (self.net_wm_window_type_toolbar, WindowType::Toolbar),
            (self.net_wm_window_type_menu, WindowType::Menu),
            (self.net_wm_window_type_utility, WindowType::Utility),
            (self.net_wm_window_type_splash, WindowType::Splashscreen),
            (self.net_wm_window_type_dialog, WindowType::Dialog),
            (self.net_wm_window_type_normal, WindowType::Normal),
            (self.net_wm_window_type_dropdown_menu, WindowType::DropdownMenu),
            (self.net_wm_window_type_popup_menu, WindowType::PopupMenu),
            (self.net_wm_window_type_tooltip, WindowType::Tooltip),
            (self.net_wm_window_type_notification, WindowType::Notification),
            (self.net_wm_window_type_combo, WindowType::Combo),
            (self.net_wm_window_type_dnd, WindowType::Dnd),
        ];
        let kind = types
            .iter()
            .find_map(|atom| table.iter().find(|(a, _)| a == atom).map(|(_, t)| *t))
            .unwrap_or(if transient { WindowType::Dialog } else { WindowType::Normal });

        if kind == WindowType::Dialog && modal {
            WindowType::ModalDialog
        } else {
            kind
        }
    }

    fn state_table(&self) -> [(Atom, WindowState); 12] {
        [
            (self.net_wm_state_maximized_horz, WindowState::MAXIMIZED_HORZ),
            (self.net_wm_state_maximized_vert, WindowState::MAXIMIZED_VERT),
            (self.net_wm_state_fullscreen, WindowState::FULLSCREEN),
            (self.net_wm_state_shaded, WindowState::SHADED),
            (self.net_wm_state_hidden, WindowState::MINIMIZED),
            (self.net_wm_state_sticky, WindowState::STICKY),
            (self.net_wm_state_above, WindowState::ABOVE),
            (self.net_wm_state_below, WindowState::BELOW),
            (self.net_wm_state_demands_attention, WindowState::DEMANDS_ATTENTION),
            (self.net_wm_state_skip_taskbar, WindowState::SKIP_TASKBAR),
            (self.net_wm_state_skip_pager, WindowState::SKIP_PAGER),
            (self.net_wm_state_modal, WindowState::MODAL),
        ]
    }

    pub fn state_from_atom(&self, atom: Atom) -> Option<WindowState> {
        self.state_table().into_iter().find(|(a, _)| *a == atom).map(|(_, s)| s)
    }

    pub fn state_from_atoms(&self, atoms: &[Atom]) -> WindowState {
        atoms
            .iter()
            .filter_map(|&atom| self.state_from_atom(atom))
            .fold(WindowState::empty(), |acc, s| acc | s)
    }

    pub fn state_atoms(&self, state: WindowState) -> Vec<Atom> {
        self.state_table()
            .into_iter()
            .filter(|(_, s)| state.contains(*s))
            .map(|(a, _)| a)
            .collect()
    }

    pub fn allowed_action_atoms(&self, features: Features) -> Vec<Atom> {
        let table = [
            (Features::HAS_MOVE, self.net_wm_action_move),
            (Features::HAS_RESIZE, self.net_wm_action_resize),
            (Features::HAS_MINIMIZE, self.net_wm_action_minimize),
            (Features::HAS_SHADE, self.net_wm_action_shade),
            (Features::HAS_MAXIMIZE, self.net_wm_action_maximize_horz),
            (Features::HAS_MAXIMIZE, self.net_wm_action_maximize_vert),
            (Features::HAS_FULLSCREEN, self.net_wm_action_fullscreen),
            (Features::HAS_CLOSE, self.net_wm_action_close),
        ];
        let mut atoms: Vec<Atom> = table
            .into_iter()
            .filter(|(feature, _)| features.contains(*feature))
            .map(|(_, atom)| atom)
            .collect();
        if !features.contains(Features::ALWAYS_STICKY) {
            atoms.push(self.net_wm_action_stick);
            atoms.push(self.net_wm_action_change_desktop);
        }
        atoms
    }
}
