//! MoveResize Module
//!
//! The one place geometry changes are applied. Every move, resize,
//! configure request, maximize and fullscreen toggle ends up in
//! [`WindowManagerCore::move_resize_internal`], which constrains the
//! request, keeps the client and frame rects consistent and sends at most
//! one configure per window to the server.

use tracing::{debug, trace};

use crate::shared::geometry::{adjust_for_gravity, gravity_reference_point, resize_with_gravity};
use crate::shared::{Gravity, Rect};
use crate::wm::client_flags::{MaximizeFlags, MoveResizeFlags, QueueKind, WindowState, WmFlags};
use crate::wm::constraints::{constrain, onscreen_requirements, ConstrainRequest};
use crate::wm::display::WindowChanges;
use crate::wm::error::trap;
use crate::wm::focus::xserver_time_is_before;
use crate::wm::window::ManagedWindow;
use crate::wm::WindowManagerCore;

const ONSCREEN_REQUIREMENTS: WmFlags = WmFlags::REQUIRE_FULLY_ONSCREEN
    .union(WmFlags::REQUIRE_ON_SINGLE_MONITOR)
    .union(WmFlags::REQUIRE_TITLEBAR_VISIBLE);

/// Stacking part of a ConfigureRequest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackMode {
    Above,
    Below,
    TopIf,
    BottomIf,
    Opposite,
}

impl StackMode {
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Above),
            1 => Some(Self::Below),
            2 => Some(Self::TopIf),
            3 => Some(Self::BottomIf),
            4 => Some(Self::Opposite),
            _ => None,
        }
    }
}

/// A client's ConfigureRequest; fields it did not set are `None`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigureRequest {
    pub changes: WindowChanges,
    pub stack_mode: Option<StackMode>,
}

fn user_flag(user_op: bool) -> MoveResizeFlags {
    if user_op {
        MoveResizeFlags::USER_ACTION
    } else {
        MoveResizeFlags::empty()
    }
}

impl WindowManagerCore {
    /// Move the client to `x`,`y` (client root coordinates)
    pub fn move_window(&mut self, window: u32, user_op: bool, x: i32, y: i32) {
        let Some(rect) = self.windows.get(&window).map(|w| w.rect) else {
            return;
        };
        self.move_resize_internal(
            window,
            user_flag(user_op) | MoveResizeFlags::MOVE_ACTION,
            Gravity::NorthWest,
            Rect::new(x, y, rect.width, rect.height),
        );
    }

    pub fn resize_window(&mut self, window: u32, user_op: bool, width: i32, height: i32) {
        self.resize_window_with_gravity(window, user_op, width, height, Gravity::NorthWest);
    }

    /// Resize keeping the point named by `gravity` fixed
    pub fn resize_window_with_gravity(&mut self, window: u32, user_op: bool, width: i32, height: i32, gravity: Gravity) {
        let Some(rect) = self.windows.get(&window).map(|w| w.rect) else {
            return;
        };
        self.move_resize_internal(
            window,
            user_flag(user_op) | MoveResizeFlags::RESIZE_ACTION,
            gravity,
            Rect::new(rect.x, rect.y, width, height),
        );
    }

    pub fn move_resize_window(&mut self, window: u32, user_op: bool, x: i32, y: i32, width: i32, height: i32) {
        self.move_resize_internal(
            window,
            user_flag(user_op) | MoveResizeFlags::MOVE_ACTION | MoveResizeFlags::RESIZE_ACTION,
            Gravity::NorthWest,
            Rect::new(x, y, width, height),
        );
    }

    /// Re-apply constraints, snapping back to where the user last put it
    pub fn move_resize_now(&mut self, window: u32) {
        let Some(user_rect) = self.windows.get(&window).map(|w| w.user_rect) else {
            return;
        };
        self.move_resize_window(window, false, user_rect.x, user_rect.y, user_rect.width, user_rect.height);
    }

    /// Apply one geometry change
    ///
    /// The meaning of `rect` depends on `flags`: a resize without a move
    /// keeps `gravity`'s reference point and ignores the position; a
    /// configure request or gravity adjustment gives the position of the
    /// outer frame's reference point; anything else gives the client's
    /// top-left corner in root coordinates.
    pub(crate) fn move_resize_internal(&mut self, window: u32, flags: MoveResizeFlags, gravity: Gravity, rect: Rect) {
        debug_assert!(flags.intersects(MoveResizeFlags::MOVE_ACTION | MoveResizeFlags::RESIZE_ACTION));
        match self.windows.get(&window) {
            None => return,
            Some(win) if win.is_unmanaging() => {
                trace!("Ignoring move/resize of {} while unmanaging", win.desc());
                return;
            }
            Some(_) => {}
        }
        self.unqueue_window(window, QueueKind::MOVE_RESIZE);

        let configure_request = flags.contains(MoveResizeFlags::CONFIGURE_REQUEST);
        let user_action = flags.contains(MoveResizeFlags::USER_ACTION);
        let insets = self.frame_insets_for(window);
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let old = win.rect;
        debug!(
            "Move/resize {} to {}{}{} from {}",
            win.desc(),
            rect,
            if configure_request { " (configure request)" } else { "" },
            if user_action { " (user move/resize)" } else { "" },
            old
        );

        let mut new = rect;
        if flags & (MoveResizeFlags::MOVE_ACTION | MoveResizeFlags::RESIZE_ACTION) == MoveResizeFlags::RESIZE_ACTION {
            new = resize_with_gravity(&old, gravity, rect.width, rect.height);
            trace!("Compensated for gravity in resize action; new pos {},{}", new.x, new.y);
        } else if configure_request || flags.contains(MoveResizeFlags::DO_GRAVITY_ADJUST) {
            // Configure request coordinates assume the border still exists
            let border_width = if configure_request { win.border_width } else { 0 };
            new = adjust_for_gravity(rect, insets.as_ref(), border_width, gravity);
            trace!("Compensated for gravity {:?}; new pos {},{}", gravity, new.x, new.y);
        }

        let was_placed = win.is_placed();
        let needs_placement = win.flags.contains(WmFlags::CALC_PLACEMENT)
            && !was_placed
            && !win.state.is_any_maximized()
            && !win.is_minimized()
            && !win.is_fullscreen();
        if needs_placement {
            new = self.place_if_needed(window, new);
        }
        if was_placed || needs_placement {
            self.apply_placement_state(window, &mut new);
        }

        let insets = self.frame_insets_for(window);
        let frame_action = self.grab.as_ref().is_some_and(|g| g.window == window && g.frame_action);
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let request = ConstrainRequest { flags, gravity, old, new, frame_action };
        let new = constrain(win, &self.screen, insets.as_ref(), &request);
        let requirements = onscreen_requirements(win, &self.screen, &new, insets.as_ref());

        let static_gravity_works = self.static_gravity_works;
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if let Some(requirements) = requirements {
            win.flags = (win.flags - ONSCREEN_REQUIREMENTS) | requirements;
        }

        let need_resize_client = !new.size_eq(&old);
        let mut need_move_client = false;
        let mut need_move_frame = false;
        let mut need_resize_frame = false;
        let mut use_static_gravity = false;
        let mut extents_changed = false;
        let mut client_move = (new.x, new.y);
        let mut frame_changes = WindowChanges::default();
        let mut frame_id = None;
        let mut outer = new;

        match (win.frame.as_mut(), insets) {
            (Some(frame), Some(insets)) => {
                outer = ManagedWindow::frame_rect_for(&new, &insets, win.state.contains(WindowState::SHADED));
                let frame_dx = outer.x - frame.rect.x;
                let frame_dy = outer.y - frame.rect.y;
                need_move_frame = frame_dx != 0 || frame_dy != 0;
                need_resize_frame = !outer.size_eq(&frame.rect);

                if need_move_frame && need_resize_frame && static_gravity_works {
                    // StaticGravity leaves the client where it was on the
                    // root while the frame moves, so move it by the frame delta
                    client_move = (insets.left + frame_dx, insets.top + frame_dy);
                    need_move_client = true;
                    use_static_gravity = true;
                } else {
                    client_move = (insets.left, insets.top);
                    need_move_client = client_move != (frame.child_x, frame.child_y);
                }

                if need_move_frame {
                    frame_changes.x = Some(outer.x);
                    frame_changes.y = Some(outer.y);
                }
                if need_resize_frame {
                    frame_changes.width = Some(outer.width);
                    frame_changes.height = Some(outer.height);
                }
                extents_changed = frame.insets != insets;
                frame.rect = outer;
                frame.insets = insets;
                frame.child_x = insets.left;
                frame.child_y = insets.top;
                frame_id = Some(frame.id);
            }
            _ => {
                need_move_client = !new.position_eq(&old);
            }
        }
        win.rect = new;

        let moved = need_move_client || need_move_frame;
        let resized = need_resize_client || need_resize_frame;
        let need_configure_notify = (configure_request && !moved && !resized && win.border_width == 0)
            // A pure move may not reach the client as a real event
            || (moved && !resized)
            || (win.flags.contains(WmFlags::CONSTRUCTING) && win.frame.is_some() && win.size_hints.has_position());

        let mut client_changes = WindowChanges::default();
        if configure_request && win.border_width != 0 {
            client_changes.border_width = Some(0);
        }
        if need_move_client {
            client_changes.x = Some(client_move.0);
            client_changes.y = Some(client_move.1);
        }
        if need_resize_client {
            client_changes.width = Some(new.width);
            client_changes.height = Some(new.height);
        }
        let border_width = win.border_width;

        if !win.is_placed() {
            win.user_rect = new;
        } else if user_action {
            save_user_window_placement(win);
        }
        let desc = win.desc();
        let user_rect = win.user_rect;

        // Grow the frame before the client, shrink the client before the frame
        let size_delta = (new.width - old.width) + (new.height - old.height);
        let frame_first = size_delta >= 0;

        if use_static_gravity {
            trap(self.display.set_win_gravity(window, Gravity::Static), "static gravity", window);
        }
        if frame_first {
            self.configure_frame(frame_id, &frame_changes, window);
        }
        if !client_changes.is_empty() {
            trace!(
                "Syncing client geometry {} (border: {}, pos: {}, size: {})",
                new,
                client_changes.border_width.is_some(),
                need_move_client,
                need_resize_client
            );
            // Any client configure can need a redraw, moves included
            if self.should_sync(window) {
                self.compositor.set_updates(window, false);
                self.send_sync_request(window);
            }
            trap(self.display.configure_window(window, &client_changes), "configure client", window);
        }
        if !frame_first {
            self.configure_frame(frame_id, &frame_changes, window);
        }
        if use_static_gravity {
            trap(self.display.set_win_gravity(window, Gravity::NorthWest), "restore gravity", window);
        }
        if extents_changed {
            if let Some(insets) = insets {
                trap(self.display.set_frame_extents(window, insets), "frame extents", window);
            }
        }

        if need_configure_notify {
            let notify = Rect::new(new.x - border_width, new.y - border_width, new.width, new.height);
            trace!("Sending synthetic configure notify to {} at {}", desc, notify);
            trap(self.display.send_configure_notify(window, notify, border_width), "configure notify", window);
        }

        if moved || resized {
            debug!("New size/position of {} is {} (user {})", desc, new, user_rect);
            self.compositor.sync_window_geometry(window, outer);
        } else {
            trace!("Size/position of {} not modified", desc);
        }
        if self.grab.as_ref().is_some_and(|g| g.window == window) {
            self.compositor.update_resize_feedback(window, Some(outer));
        }
    }

    fn configure_frame(&mut self, frame: Option<u32>, changes: &WindowChanges, window: u32) {
        if let Some(frame) = frame {
            if !changes.is_empty() {
                trap(self.display.configure_window(frame, changes), "configure frame", window);
            }
        }
    }

    /// Maximize or minimize requested before the window had a position
    fn apply_placement_state(&mut self, window: u32, rect: &mut Rect) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let horizontal = win.flags.contains(WmFlags::MAXIMIZE_HORZ_AFTER_PLACEMENT);
        let vertical = win.flags.contains(WmFlags::MAXIMIZE_VERT_AFTER_PLACEMENT);
        let minimize = win.flags.contains(WmFlags::MINIMIZE_AFTER_PLACEMENT);

        if horizontal || vertical {
            let area = self.screen.monitor_work_area(self.screen.monitor_for_rect(rect));
            // Give unmaximize something smaller than the work area to go back to
            if rect.width >= area.width {
                rect.width = (0.75 * f64::from(area.width)) as i32;
                rect.x = area.x + (0.125 * f64::from(area.width)) as i32;
            }
            if rect.height >= area.height {
                rect.height = (0.75 * f64::from(area.height)) as i32;
                rect.y = area.y + (0.083 * f64::from(area.height)) as i32;
            }
            let mut directions = MaximizeFlags::empty();
            directions.set(MaximizeFlags::HORIZONTAL, horizontal);
            directions.set(MaximizeFlags::VERTICAL, vertical);
            self.maximize_internal(window, directions, Some(*rect));
            if let Some(win) = self.windows.get_mut(&window) {
                win.flags.remove(WmFlags::MAXIMIZE_HORZ_AFTER_PLACEMENT | WmFlags::MAXIMIZE_VERT_AFTER_PLACEMENT);
            }
        }
        if minimize {
            if let Some(win) = self.windows.get_mut(&window) {
                win.flags.remove(WmFlags::MINIMIZE_AFTER_PLACEMENT);
            }
            self.minimize(window);
        }
    }

    /// Handle a client's ConfigureRequest
    ///
    /// Position and size are honoured subject to the constraints; while the
    /// user drags the window they are replaced by the current geometry, but
    /// the client still gets its ConfigureNotify.
    pub fn configure_request(&mut self, window: u32, request: &ConfigureRequest) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        // Border widths are always denied but remembered for the notify
        if let Some(border_width) = request.changes.border_width {
            win.border_width = border_width;
        }
        let gravity = win.size_hints.win_gravity;
        self.move_resize_request(window, &request.changes, gravity);

        if let Some(mode) = request.stack_mode {
            self.configure_request_stacking(window, mode);
        }
    }

    fn move_resize_request(&mut self, window: u32, changes: &WindowChanges, gravity: Gravity) {
        let in_grab_op = self
            .grab
            .as_ref()
            .is_some_and(|g| g.window == window && !g.op.is_keyboard());
        let insets = self.frame_insets_for(window);
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };

        // Start from the current reference point so fields the client left
        // out do not drift
        let (mut x, mut y) = gravity_reference_point(win.rect, insets.as_ref(), win.border_width, gravity);
        let position_requested = changes.x.is_some() || changes.y.is_some();
        if in_grab_op {
            debug!("Not allowing position change for {} during a grab", win.desc());
        } else {
            x = changes.x.unwrap_or(x);
            y = changes.y.unwrap_or(y);
            if position_requested {
                // A positioned window is never placed by us
                win.flags.insert(WmFlags::PLACED);
            }
        }

        let mut width = win.rect.width;
        let mut height = win.rect.height;
        if !in_grab_op {
            width = changes.width.unwrap_or(width);
            height = changes.height.unwrap_or(height);
        }

        // Not a user action: configure requests stay fully constrained
        let mut flags = MoveResizeFlags::CONFIGURE_REQUEST;
        if position_requested {
            flags |= MoveResizeFlags::MOVE_ACTION;
        }
        if changes.width.is_some() || changes.height.is_some() {
            flags |= MoveResizeFlags::RESIZE_ACTION;
        }
        if flags.intersects(MoveResizeFlags::MOVE_ACTION | MoveResizeFlags::RESIZE_ACTION) {
            self.move_resize_internal(window, flags, gravity, Rect::new(x, y, width, height));
        }

        // Snap back here, not to some older spot, if a strut comes and goes
        if let Some(win) = self.windows.get_mut(&window) {
            save_user_window_placement(win);
        }
    }

    /// Only raise and lower are honoured, and only without a sibling
    fn configure_request_stacking(&mut self, window: u32, mode: StackMode) {
        let Some(win) = self.windows.get(&window) else {
            return;
        };
        if !self.settings.raise_on_click {
            debug!("{} sent a stacking request, ignoring it", win.desc());
            return;
        }
        let active = self.focus.focus.filter(|&a| a != window).and_then(|a| self.windows.get(&a));
        if let Some(active) = active {
            let older = xserver_time_is_before(win.user_time.unwrap_or(0), active.user_time.unwrap_or(0));
            if !self.same_application(window, active.id) && older {
                debug!(
                    "Ignoring stacking request from {} (user time {:?}), {} is active (user time {:?})",
                    win.desc(),
                    win.user_time,
                    active.desc(),
                    active.user_time
                );
                if mode == StackMode::Above {
                    self.set_demands_attention(window);
                }
                return;
            }
        }
        match mode {
            StackMode::Above => self.raise_window(window),
            StackMode::Below => self.lower_window(window),
            StackMode::TopIf | StackMode::BottomIf | StackMode::Opposite => {}
        }
    }
}

/// Remember the current geometry as where the user wants the window, for
/// the axes that are not maximized
pub(crate) fn save_user_window_placement(win: &mut ManagedWindow) {
    if win.is_maximized() || win.is_fullscreen() {
        return;
    }
    force_save_user_window_placement(win);
}

/// Same as [`save_user_window_placement`] for geometry the core chose
/// itself, such as the rect restored when leaving maximized or fullscreen
pub(crate) fn force_save_user_window_placement(win: &mut ManagedWindow) {
    if win.is_fullscreen() {
        return;
    }
    if !win.state.contains(WindowState::MAXIMIZED_HORZ) {
        win.user_rect.x = win.rect.x;
        win.user_rect.width = win.rect.width;
    }
    if !win.state.contains(WindowState::MAXIMIZED_VERT) {
        win.user_rect.y = win.rect.y;
        win.user_rect.height = win.rect.height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::settings::WmSettings;
    use crate::wm::testing::{Harness, Notification, Request};

    fn client_configures(h: &Harness, window: u32) -> Vec<WindowChanges> {
        h.configures_of(window)
    }

    #[test]
    fn resize_keeps_north_west_corner() {
        let mut h = Harness::new();
        let id = h.manage_undecorated(Rect::new(100, 100, 300, 200));
        assert_eq!(h.rect(id), Rect::new(100, 100, 300, 200));

        h.core.resize_window_with_gravity(id, false, 400, 250, Gravity::NorthWest);
        assert_eq!(h.rect(id), Rect::new(100, 100, 400, 250));
    }

    #[test]
    fn resize_with_south_east_gravity_moves_the_top_left() {
        let mut h = Harness::new();
        let id = h.manage_undecorated(Rect::new(100, 100, 300, 200));
        h.clear_log();

        h.core.resize_window_with_gravity(id, false, 400, 250, Gravity::SouthEast);
        assert_eq!(h.rect(id), Rect::new(0, 50, 400, 250));
        let configures = client_configures(&h, id);
        assert_eq!(configures.len(), 1);
        assert_eq!(configures[0].x, Some(0));
        assert_eq!(configures[0].width, Some(400));
    }

    #[test]
    fn configure_request_positions_the_outer_corner() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.clear_log();

        let request = ConfigureRequest {
            changes: WindowChanges { x: Some(50), y: Some(50), ..Default::default() },
            stack_mode: None,
        };
        h.core.configure_request(id, &request);
        assert_eq!(h.rect(id), Rect::new(54, 74, 300, 200));
        assert_eq!(h.core.windows[&id].outer_rect(), Rect::new(50, 50, 308, 228));

        // A pure move is announced with a synthetic ConfigureNotify
        assert!(h.requests().contains(&Request::ConfigureNotify {
            window: id,
            rect: Rect::new(54, 74, 300, 200),
            border_width: 0
        }));
        // The client sits still inside its frame
        assert!(client_configures(&h, id).is_empty());
    }

    #[test]
    fn no_op_configure_request_is_still_acknowledged() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let rect = h.rect(id);
        h.clear_log();

        let request = ConfigureRequest {
            changes: WindowChanges { width: Some(rect.width), ..Default::default() },
            stack_mode: None,
        };
        h.core.configure_request(id, &request);
        assert_eq!(h.rect(id), rect);
        assert_eq!(h.count(|r| matches!(r, Request::ConfigureNotify { .. })), 1);
        assert_eq!(h.count(|r| matches!(r, Request::Configure { .. })), 0);
    }

    #[test]
    fn requested_border_width_is_reset_to_zero() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.clear_log();

        let request = ConfigureRequest {
            changes: WindowChanges { width: Some(320), border_width: Some(2), ..Default::default() },
            stack_mode: None,
        };
        h.core.configure_request(id, &request);
        let configures = client_configures(&h, id);
        assert_eq!(configures.len(), 1);
        assert_eq!(configures[0].border_width, Some(0));
        assert_eq!(configures[0].width, Some(320));
        assert_eq!(h.core.windows[&id].border_width, 2);
    }

    #[test]
    fn configure_request_size_is_ignored_while_dragging() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let rect = h.rect(id);
        h.core.begin_grab(id, crate::wm::grab::GrabOp::Moving, true, Some(1), 10, (200, 110)).ok();

        let request = ConfigureRequest {
            changes: WindowChanges { x: Some(0), y: Some(0), width: Some(600), height: Some(500), border_width: None },
            stack_mode: None,
        };
        h.core.configure_request(id, &request);
        assert_eq!(h.rect(id), rect);
    }

    #[test]
    fn unmaximize_restores_the_saved_rect() {
        let mut h = Harness::new();
        let id = h.manage_undecorated(Rect::new(10, 10, 200, 150));
        h.core.maximize(id, MaximizeFlags::BOTH);
        assert_eq!(h.core.windows[&id].saved_rect, Rect::new(10, 10, 200, 150));
        assert_eq!(h.rect(id), Rect::new(0, 0, 1280, 1024));

        h.core.unmaximize(id, MaximizeFlags::BOTH);
        assert_eq!(h.rect(id), Rect::new(10, 10, 200, 150));
    }

    #[test]
    fn resize_of_a_sync_client_sends_one_request() {
        let mut h = Harness::new();
        let mut info = h.info(Rect::new(100, 100, 300, 200));
        info.sync_counter = Some(0x77);
        let id = h.manage(info);
        h.core.run_idle();
        let alarm = h.core.windows[&id].sync.alarm.unwrap_or_default();
        h.core.handle_sync_alarm(alarm);
        let serial = h.core.windows[&id].sync.serial;
        h.clear_log();

        h.core.resize_window(id, false, 400, 300);
        let requests = h.requests();
        let syncs: Vec<_> = requests.iter().filter(|r| matches!(r, Request::SyncRequest { .. })).collect();
        assert_eq!(syncs.len(), 1);
        assert!(matches!(syncs[0], Request::SyncRequest { serial: s, .. } if *s == serial + 1));
        assert!(h.notifications().contains(&Notification::Updates { window: id, enabled: false }));

        // Outstanding: the next resize does not send another
        h.core.resize_window(id, false, 420, 300);
        assert_eq!(h.count(|r| matches!(r, Request::SyncRequest { .. })), 1);

        // No answer within a second disables the handshake for good
        h.clock.advance(1000);
        h.core.run_timers();
        let win = &h.core.windows[&id];
        assert!(win.sync.disabled);
        assert!(!win.sync.is_outstanding());
        assert!(h.notifications().contains(&Notification::Updates { window: id, enabled: true }));
    }

    #[test]
    fn moving_an_undecorated_sync_client_asks_for_a_redraw() {
        let mut h = Harness::new();
        let mut info = h.info(Rect::new(100, 100, 300, 200));
        info.sync_counter = Some(0x77);
        info.motif_hints = vec![1 << 1, 0, 0, 0, 0];
        let id = h.manage(info);
        h.core.run_idle();
        let alarm = h.core.windows[&id].sync.alarm.unwrap_or_default();
        h.core.handle_sync_alarm(alarm);
        h.clear_log();

        h.core.move_window(id, false, 200, 150);
        assert_eq!(h.rect(id), Rect::new(200, 150, 300, 200));
        assert_eq!(h.count(|r| matches!(r, Request::SyncRequest { window, .. } if *window == id)), 1);
        assert!(h.core.windows[&id].sync.is_outstanding());
    }

    #[test]
    fn growing_configures_the_frame_first() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let frame = h.frame_of(id);
        h.clear_log();

        h.core.resize_window(id, false, 400, 300);
        let order: Vec<u32> = h
            .requests()
            .iter()
            .filter_map(|r| match r {
                Request::Configure { window, .. } => Some(*window),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![frame, id]);

        h.clear_log();
        h.core.resize_window(id, false, 200, 100);
        let order: Vec<u32> = h
            .requests()
            .iter()
            .filter_map(|r| match r {
                Request::Configure { window, .. } => Some(*window),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![id, frame]);
    }

    #[test]
    fn static_gravity_moves_the_client_by_the_frame_delta() {
        let settings = WmSettings { use_static_gravity: true, ..WmSettings::default() };
        let mut h = Harness::with_settings(settings);
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.clear_log();

        // Frame moves by (-10, -20) and grows
        let rect = h.rect(id);
        h.core.move_resize_window(id, false, rect.x - 10, rect.y - 20, 400, 300);
        let requests = h.requests();
        let gravities: Vec<Gravity> = requests
            .iter()
            .filter_map(|r| match r {
                Request::WinGravity { gravity, .. } => Some(*gravity),
                _ => None,
            })
            .collect();
        assert_eq!(gravities, vec![Gravity::Static, Gravity::NorthWest]);

        let client = client_configures(&h, id);
        assert_eq!(client.len(), 1);
        assert_eq!((client[0].x, client[0].y), (Some(4 - 10), Some(24 - 20)));
    }

    #[test]
    fn without_static_gravity_the_client_stays_in_its_frame() {
        let settings = WmSettings { use_static_gravity: false, ..WmSettings::default() };
        let mut h = Harness::with_settings(settings);
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.clear_log();

        let rect = h.rect(id);
        h.core.move_resize_window(id, false, rect.x - 10, rect.y - 20, 400, 300);
        assert_eq!(h.count(|r| matches!(r, Request::WinGravity { .. })), 0);
        let client = client_configures(&h, id);
        assert_eq!(client.len(), 1);
        assert_eq!((client[0].x, client[0].y), (None, None));
        assert_eq!(client[0].width, Some(400));
    }

    #[test]
    fn user_moves_update_the_user_rect() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.move_window(id, false, 300, 300);
        assert_ne!(h.core.windows[&id].user_rect, h.rect(id));
        h.core.move_window(id, true, 320, 320);
        assert_eq!(h.core.windows[&id].user_rect, Rect::new(320, 320, 300, 200));
    }

    #[test]
    fn frame_always_wraps_the_client() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.move_resize_window(id, true, 200, 150, 500, 400);
        let win = &h.core.windows[&id];
        let insets = win.insets().copied().unwrap_or_default();
        assert_eq!(win.outer_rect(), win.rect.expand_by(&insets));
    }
}
