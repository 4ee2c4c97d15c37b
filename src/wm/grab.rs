//! Grab Module
//!
//! Interactive move and resize driven by pointer motion or the keyboard.
//! Only one grab exists at a time. Resizes are throttled: with the sync
//! handshake a new resize waits for the client's acknowledgment, without it
//! resizes are spaced by the configured interval. Motion that arrives too
//! early is replayed by a one-shot timer so the last position always lands.

use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

use crate::shared::{Gravity, Rect};
use crate::shared::geometry::resize_with_gravity;
use crate::wm::client_flags::{Features, MaximizeFlags, WindowState, WmFlags};
use crate::wm::clock::elapsed_ms;
use crate::wm::error::{trap, WmError, WmResult};
use crate::wm::scheduler::{SourceId, TimerKind};
use crate::wm::WindowManagerCore;

/// Pointer travel before a click counts as a drag
const CLICK_THRESHOLD: i32 = 8;

/// Edge or corner being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeDirection {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeDirection {
    /// The point that stays fixed while this edge moves
    pub fn gravity(self) -> Gravity {
        match self {
            Self::TopLeft => Gravity::SouthEast,
            Self::Top => Gravity::South,
            Self::TopRight => Gravity::SouthWest,
            Self::Right => Gravity::West,
            Self::BottomRight => Gravity::NorthWest,
            Self::Bottom => Gravity::North,
            Self::BottomLeft => Gravity::NorthEast,
            Self::Left => Gravity::East,
        }
    }

    /// Horizontal and vertical sign of the dragged edges
    pub fn signs(self) -> (i32, i32) {
        match self {
            Self::TopLeft => (-1, -1),
            Self::Top => (0, -1),
            Self::TopRight => (1, -1),
            Self::Right => (1, 0),
            Self::BottomRight => (1, 1),
            Self::Bottom => (0, 1),
            Self::BottomLeft => (-1, 1),
            Self::Left => (-1, 0),
        }
    }

    /// Direction whose edges have the given signs
    pub fn from_signs(dx: i32, dy: i32) -> Option<Self> {
        match (dx.signum(), dy.signum()) {
            (-1, -1) => Some(Self::TopLeft),
            (0, -1) => Some(Self::Top),
            (1, -1) => Some(Self::TopRight),
            (1, 0) => Some(Self::Right),
            (1, 1) => Some(Self::BottomRight),
            (0, 1) => Some(Self::Bottom),
            (-1, 1) => Some(Self::BottomLeft),
            (-1, 0) => Some(Self::Left),
            _ => None,
        }
    }
}

/// Kind of interactive operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrabOp {
    Moving,
    Resizing(ResizeDirection),
    KeyboardMoving,
    KeyboardResizing(ResizeDirection),
    /// Keyboard resize whose edge is picked by the first arrow key
    KeyboardResizingUnknown,
}

impl GrabOp {
    pub fn is_moving(self) -> bool {
        matches!(self, Self::Moving | Self::KeyboardMoving)
    }

    pub fn is_resizing(self) -> bool {
        !self.is_moving()
    }

    pub fn is_keyboard(self) -> bool {
        matches!(self, Self::KeyboardMoving | Self::KeyboardResizing(_) | Self::KeyboardResizingUnknown)
    }

    pub fn direction(self) -> Option<ResizeDirection> {
        match self {
            Self::Resizing(direction) | Self::KeyboardResizing(direction) => Some(direction),
            _ => None,
        }
    }

    /// Gravity of the client during the operation
    pub fn gravity(self) -> Gravity {
        self.direction().map(ResizeDirection::gravity).unwrap_or(Gravity::NorthWest)
    }

    /// Decode a `_NET_WM_MOVERESIZE` direction; 11 (cancel) yields `None`
    pub fn from_net_wm_moveresize(direction: u32) -> Option<Self> {
        let op = match direction {
            0 => Self::Resizing(ResizeDirection::TopLeft),
            1 => Self::Resizing(ResizeDirection::Top),
            2 => Self::Resizing(ResizeDirection::TopRight),
            3 => Self::Resizing(ResizeDirection::Right),
            4 => Self::Resizing(ResizeDirection::BottomRight),
            5 => Self::Resizing(ResizeDirection::Bottom),
            6 => Self::Resizing(ResizeDirection::BottomLeft),
            7 => Self::Resizing(ResizeDirection::Left),
            8 => Self::Moving,
            9 => Self::KeyboardResizingUnknown,
            10 => Self::KeyboardMoving,
            _ => return None,
        };
        Some(op)
    }
}

/// The one interactive operation in progress
#[derive(Debug, Clone)]
pub struct GrabState {
    pub window: u32,
    pub op: GrabOp,
    /// Started from the window frame rather than a client request
    pub frame_action: bool,
    pub button: Option<u8>,
    /// Pointer position the deltas are measured from
    pub anchor: (i32, i32),
    /// Client rect at the anchor
    pub anchor_rect: Rect,
    /// Client rect when the grab began; restored on cancel
    pub initial_rect: Rect,
    pub initial_pointer: (i32, i32),
    pub latest: (i32, i32),
    pub last_moveresize_time: Option<Instant>,
    /// Pending replay of throttled motion
    pub resize_timeout: Option<SourceId>,
    pub last_user_action_was_snap: bool,
    pub threshold_reached: bool,
    pub have_keyboard: bool,
}

impl WindowManagerCore {
    /// Start an interactive operation on `window`
    ///
    /// Returns `Ok(false)` when the server refused the grab.
    pub fn begin_grab(
        &mut self,
        window: u32,
        op: GrabOp,
        frame_action: bool,
        button: Option<u8>,
        time: u32,
        pointer: (i32, i32),
    ) -> WmResult<bool> {
        if let Some(grab) = &self.grab {
            warn!("Grab {:?} on 0x{:x} refused, {:?} on 0x{:x} in effect", op, window, grab.op, grab.window);
            return Err(WmError::GrabAlreadyActive(grab.window));
        }
        let win = self.windows.get(&window).ok_or(WmError::UnknownWindow(window))?;
        if win.is_unmanaging() {
            return Err(WmError::Unmanaging(window));
        }
        if op.is_moving() && !win.features.contains(Features::HAS_MOVE) {
            return Err(WmError::NotMovable(window));
        }
        if op.is_resizing() && !win.features.contains(Features::HAS_RESIZE) {
            return Err(WmError::NotResizable(window));
        }
        let rect = win.rect;
        let desc = win.desc();
        let time = self.resolve_time(time, "grab");

        if self.settings.raise_on_click {
            self.raise_window(window);
        }

        let have_pointer = trap(self.display.grab_pointer(time), "grab pointer", window).unwrap_or(false);
        if !have_pointer && !op.is_keyboard() {
            debug!("Pointer grab for {} failed", desc);
            return Ok(false);
        }
        let have_keyboard = trap(self.display.grab_keyboard(time), "grab keyboard", window).unwrap_or(false);
        if !have_keyboard {
            debug!("Keyboard grab for {} failed, dropping the pointer grab", desc);
            if have_pointer {
                trap(self.display.ungrab_pointer(time), "ungrab pointer", window);
            }
            return Ok(false);
        }

        info!("Beginning {:?} on {}", op, desc);
        self.grab = Some(GrabState {
            window,
            op,
            frame_action,
            button,
            anchor: pointer,
            anchor_rect: rect,
            initial_rect: rect,
            initial_pointer: pointer,
            latest: pointer,
            last_moveresize_time: None,
            resize_timeout: None,
            last_user_action_was_snap: false,
            threshold_reached: false,
            have_keyboard,
        });

        if op.is_keyboard() {
            self.warp_grab_pointer();
        }
        let outer = self.windows.get(&window).map(|w| w.outer_rect());
        self.compositor.update_resize_feedback(window, outer);
        Ok(true)
    }

    /// Finish the grab, keeping the window where it is
    pub fn end_grab(&mut self, time: u32) {
        let Some(grab) = self.grab.take() else {
            return;
        };
        let window = grab.window;
        debug!("Ending {:?} on 0x{:x}", grab.op, window);

        if let Some(source) = grab.resize_timeout {
            self.scheduler.remove(source);
        }
        // A plain click without raise-on-click still raises
        if !self.settings.raise_on_click && !grab.threshold_reached && self.windows.contains_key(&window) {
            self.raise_window(window);
        }
        trap(self.display.ungrab_pointer(time), "ungrab pointer", window);
        if grab.have_keyboard {
            trap(self.display.ungrab_keyboard(time), "ungrab keyboard", window);
        }
        if self.windows.contains_key(&window) {
            self.compositor.set_updates(window, true);
            self.compositor.update_resize_feedback(window, None);
        }
    }

    /// Abort the grab and put the window back where it started
    pub fn cancel_grab(&mut self, time: u32) -> WmResult<()> {
        let grab = self.grab.as_ref().ok_or(WmError::NoGrab)?;
        let (window, initial) = (grab.window, grab.initial_rect);
        debug!("Cancelling grab on 0x{:x}, restoring {}", window, initial);

        if self.windows.contains_key(&window) {
            self.move_resize_window(window, true, initial.x, initial.y, initial.width, initial.height);
        }
        self.end_grab(time);
        Ok(())
    }

    /// The grabbed window is going away; release without touching it
    pub(crate) fn release_grab_for(&mut self, window: u32, time: u32) {
        if self.grab.as_ref().is_some_and(|g| g.window == window) {
            debug!("Grab window 0x{:x} is going away", window);
            if let Some(grab) = self.grab.as_mut() {
                grab.threshold_reached = true;
            }
            self.end_grab(time);
        }
    }

    fn check_threshold_reached(&mut self, x: i32, y: i32) {
        let raise_on_click = self.settings.raise_on_click;
        if let Some(grab) = self.grab.as_mut() {
            if raise_on_click || grab.threshold_reached {
                return;
            }
            let (ix, iy) = grab.initial_pointer;
            if (ix - x).abs() >= CLICK_THRESHOLD || (iy - y).abs() >= CLICK_THRESHOLD {
                grab.threshold_reached = true;
            }
        }
    }

    /// Pointer motion during a grab
    pub fn handle_grab_motion(&mut self, x: i32, y: i32, snap: bool) {
        let Some(grab) = self.grab.as_mut() else {
            return;
        };
        grab.last_user_action_was_snap = snap;
        let (window, op) = (grab.window, grab.op);
        self.check_threshold_reached(x, y);
        if op.is_moving() {
            self.update_move(window, x, y);
        } else {
            self.update_resize(window, x, y, false);
        }
    }

    /// Button release ends a pointer grab
    pub fn handle_grab_button_release(&mut self, x: i32, y: i32, time: u32) {
        let Some(grab) = self.grab.as_ref() else {
            return;
        };
        let (window, op, snap) = (grab.window, grab.op, grab.last_user_action_was_snap);
        self.check_threshold_reached(x, y);

        // The user may have let go of the snap modifier before the button
        if !snap {
            if op.is_moving() {
                self.update_move(window, x, y);
            } else {
                self.update_resize(window, x, y, true);
                self.compositor.set_updates(window, true);
            }
        }
        let time = self.resolve_time(time, "button release");
        self.end_grab(time);
    }

    /// May a resize be applied now? `None` if so, otherwise how long to wait
    pub(crate) fn check_moveresize_frequency(&mut self, window: u32) -> Option<Duration> {
        let now = self.clock.now();
        let sync_timeout = self.settings.sync_timeout;
        let interval = self.settings.resize_interval;
        let last = self.grab.as_ref().and_then(|g| g.last_moveresize_time);
        let win = self.windows.get_mut(&window)?;

        if self.settings.sync_enabled && win.sync.is_active() {
            let Some(requested) = win.sync.request_time else {
                return None;
            };
            let elapsed = elapsed_ms(requested, now);
            let limit = sync_timeout.as_millis() as i64;
            if elapsed < limit {
                // Retry just after the circuit breaker would trip
                return Some(Duration::from_millis((limit - elapsed + 100).max(0) as u64));
            }
            warn!("{} waited {} ms for a sync reply, disabling sync", win.desc(), elapsed);
            win.sync.disabled = true;
            return None;
        }

        let last = last?;
        let elapsed = elapsed_ms(last, now);
        let limit = interval.as_millis() as i64;
        if (0..limit).contains(&elapsed) {
            trace!("Delaying resize of {}, {} of {} ms elapsed", win.desc(), elapsed, limit);
            return Some(Duration::from_millis((limit - elapsed) as u64));
        }
        None
    }

    /// Apply pointer motion to a move grab
    pub(crate) fn update_move(&mut self, window: u32, x: i32, y: i32) {
        let shake_threshold = self.settings.shake_threshold();
        let Some(grab) = self.grab.as_mut() else {
            return;
        };
        grab.latest = (x, y);
        let dx = x - grab.anchor.0;
        let dy = y - grab.anchor.1;
        let snap = grab.last_user_action_was_snap;
        let mut new_x = grab.anchor_rect.x + dx;
        let mut new_y = grab.anchor_rect.y + dy;
        let initial = grab.initial_rect;

        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let maximized = win.is_maximized();

        if maximized && dy.abs() >= shake_threshold {
            // Keep the pointer at the same relative spot on the smaller window
            let prop = f64::from(x - initial.x) / f64::from(initial.width.max(1));
            let mut loose = initial;
            loose.x = x - (f64::from(win.saved_rect.width) * prop) as i32;
            loose.y = y;
            if let Some(frame) = &win.frame {
                loose.y += frame.child_y / 2;
            }
            info!("Shaking {} loose", win.desc());

            if let Some(win) = self.windows.get_mut(&window) {
                win.flags.insert(WmFlags::SHAKEN_LOOSE);
                win.saved_rect.x = loose.x;
                win.saved_rect.y = loose.y;
            }
            if let Some(grab) = self.grab.as_mut() {
                grab.initial_rect = loose;
                grab.anchor = (x, y);
            }
            self.unmaximize(window, MaximizeFlags::BOTH);
            return;
        }

        if win.flags.contains(WmFlags::SHAKEN_LOOSE) || maximized {
            let current_monitor = self.screen.monitor_for_rect(&win.rect);
            let child_offset = win.frame.as_ref().map(|f| (f.child_x, f.child_y));
            let areas: Vec<Rect> = self.screen.monitor_work_areas().to_vec();
            for (monitor, area) in areas.into_iter().enumerate() {
                let near_top = x >= area.x && x < area.right() && y >= area.y && y < area.y + shake_threshold;
                if !near_top {
                    continue;
                }
                if monitor != current_monitor {
                    // Unmaximizing later should land on the new monitor
                    let (ox, oy) = child_offset.unwrap_or((0, 0));
                    if let Some(win) = self.windows.get_mut(&window) {
                        win.saved_rect.x = area.x + ox;
                        win.saved_rect.y = area.y + oy;
                        win.user_rect.x = win.saved_rect.x;
                        win.user_rect.y = win.saved_rect.y;
                    }
                    self.unmaximize(window, MaximizeFlags::BOTH);
                }
                if let Some(grab) = self.grab.as_mut() {
                    grab.initial_rect = area;
                    grab.anchor = (x, y);
                }
                if let Some(win) = self.windows.get_mut(&window) {
                    win.flags.remove(WmFlags::SHAKEN_LOOSE);
                }
                self.maximize(window, MaximizeFlags::BOTH);
                return;
            }
        }

        let Some(win) = self.windows.get(&window) else {
            return;
        };
        let old = win.rect;
        if win.state.contains(WindowState::MAXIMIZED_HORZ) {
            new_x = old.x;
        }
        if win.state.contains(WindowState::MAXIMIZED_VERT) {
            new_y = old.y;
        }

        let snapped = self.apply_edge_resistance_move(window, Rect::new(new_x, new_y, old.width, old.height), snap);
        (new_x, new_y) = (snapped.x, snapped.y);
        if (new_x, new_y) == (old.x, old.y) {
            return;
        }

        if let Some(grab) = self.grab.as_ref() {
            let root_x = new_x - grab.anchor_rect.x + grab.anchor.0;
            let root_y = new_y - grab.anchor_rect.y + grab.anchor.1;
            self.compositor.update_move(window, root_x, root_y);
        }
        self.move_window(window, true, new_x, new_y);
    }

    /// Apply pointer motion to a resize grab
    ///
    /// Unless `force` is set the resize is subject to the frequency check;
    /// skipped motion is replayed by a single timeout.
    pub(crate) fn update_resize(&mut self, window: u32, x: i32, y: i32, force: bool) {
        let Some(grab) = self.grab.as_mut() else {
            return;
        };
        grab.latest = (x, y);
        let dx = x - grab.anchor.0;
        let dy = y - grab.anchor.1;
        let snap = grab.last_user_action_was_snap;
        let mut new_w = grab.anchor_rect.width;
        let mut new_h = grab.anchor_rect.height;

        if grab.op == GrabOp::KeyboardResizingUnknown {
            if let Some(direction) = ResizeDirection::from_signs(dx, dy) {
                grab.op = GrabOp::KeyboardResizing(direction);
                debug!("Keyboard resize of 0x{:x} picked {:?}", window, direction);
                self.update_keyboard_resize();
            }
        }
        let Some(op) = self.grab.as_ref().map(|g| g.op) else {
            return;
        };
        let Some(direction) = op.direction() else {
            return;
        };

        let (sx, sy) = direction.signs();
        new_w += sx * dx;
        new_h += sy * dy;

        if let Some(remaining) = self.check_moveresize_frequency(window) {
            if !force {
                let now = self.clock.now();
                let pending = self.grab.as_ref().and_then(|g| g.resize_timeout);
                if pending.is_none() {
                    let source = self.scheduler.add_timeout(now + remaining, TimerKind::ResizeThrottle);
                    if let Some(grab) = self.grab.as_mut() {
                        grab.resize_timeout = Some(source);
                    }
                }
                return;
            }
        }

        // The client has caught up with the last resize
        self.compositor.set_updates(window, true);
        if let Some(source) = self.grab.as_mut().and_then(|g| g.resize_timeout.take()) {
            self.scheduler.remove(source);
        }

        let Some(old) = self.windows.get(&window).map(|w| w.rect) else {
            return;
        };
        // One-sided resizes stay one-sided
        if !op.is_keyboard() {
            if sx == 0 {
                new_w = old.width;
            }
            if sy == 0 {
                new_h = old.height;
            }
        }

        let gravity = direction.gravity();
        let proposed = resize_with_gravity(&old, gravity, new_w, new_h);
        let snapped = self.apply_edge_resistance_resize(window, proposed, gravity, snap);
        (new_w, new_h) = (snapped.width, snapped.height);

        if old.width != new_w || old.height != new_h {
            self.resize_window_with_gravity(window, true, new_w, new_h, gravity);
        }

        let resized = self.windows.get(&window).is_some_and(|w| w.rect.width != old.width || w.rect.height != old.height);
        if resized {
            let now = self.clock.now();
            if let Some(grab) = self.grab.as_mut() {
                grab.last_moveresize_time = Some(now);
            }
        }
    }

    /// The throttle timer fired: replay the latest motion
    pub(crate) fn resize_throttle_fired(&mut self, source: SourceId) {
        let Some(grab) = self.grab.as_mut() else {
            return;
        };
        if grab.resize_timeout != Some(source) {
            return;
        }
        grab.resize_timeout = None;
        let (window, (x, y)) = (grab.window, grab.latest);
        trace!("Replaying throttled resize of 0x{:x} to {},{}", window, x, y);
        self.update_resize(window, x, y, true);
    }

    /// Warp the pointer to the grabbed edge and re-anchor there
    pub(crate) fn warp_grab_pointer(&mut self) -> Option<(i32, i32)> {
        let grab = self.grab.as_ref()?;
        let win = self.windows.get(&grab.window)?;
        let outer = win.outer_rect();
        let (w, h) = (outer.width, outer.height);

        let (x, y) = match grab.op {
            GrabOp::KeyboardMoving | GrabOp::Moving | GrabOp::KeyboardResizingUnknown => (w / 2, h / 2),
            GrabOp::Resizing(direction) | GrabOp::KeyboardResizing(direction) => match direction {
                ResizeDirection::Top => (w / 2, 0),
                ResizeDirection::Bottom => (w / 2, h - 1),
                ResizeDirection::Left => (0, h / 2),
                ResizeDirection::Right => (w - 1, h / 2),
                ResizeDirection::TopLeft => (0, 0),
                ResizeDirection::TopRight => (w - 1, 0),
                ResizeDirection::BottomLeft => (0, h - 1),
                ResizeDirection::BottomRight => (w - 1, h - 1),
            },
        };
        // Never warp past the screen edge
        let screen = self.screen.size;
        let x = (outer.x + x).clamp(screen.x, screen.right() - 1);
        let y = (outer.y + y).clamp(screen.y, screen.bottom() - 1);
        let rect = win.rect;
        let window = win.id;

        trap(self.display.warp_pointer(x, y), "warp pointer", window);
        if let Some(grab) = self.grab.as_mut() {
            grab.anchor = (x, y);
            grab.latest = (x, y);
            grab.anchor_rect = rect;
        }
        Some((x, y))
    }

    /// Keyboard resize changed edge
    pub(crate) fn update_keyboard_resize(&mut self) {
        self.warp_grab_pointer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::settings::WmSettings;
    use crate::wm::testing::{Harness, Notification, Request};

    #[test]
    fn gravity_is_the_opposite_edge() {
        assert_eq!(ResizeDirection::Right.gravity(), Gravity::West);
        assert_eq!(ResizeDirection::TopLeft.gravity(), Gravity::SouthEast);
        assert_eq!(GrabOp::Moving.gravity(), Gravity::NorthWest);
        assert_eq!(ResizeDirection::from_signs(3, -2), Some(ResizeDirection::TopRight));
        assert_eq!(ResizeDirection::from_signs(0, 0), None);
    }

    #[test]
    fn moveresize_directions_decode() {
        assert_eq!(GrabOp::from_net_wm_moveresize(4), Some(GrabOp::Resizing(ResizeDirection::BottomRight)));
        assert_eq!(GrabOp::from_net_wm_moveresize(8), Some(GrabOp::Moving));
        assert_eq!(GrabOp::from_net_wm_moveresize(10), Some(GrabOp::KeyboardMoving));
        assert_eq!(GrabOp::from_net_wm_moveresize(11), None);
    }

    #[test]
    fn second_grab_is_rejected() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let b = h.manage_mapped(Rect::new(500, 100, 300, 200));
        assert_eq!(h.core.begin_grab(a, GrabOp::Moving, true, Some(1), 10, (150, 110)), Ok(true));
        assert_eq!(
            h.core.begin_grab(b, GrabOp::Moving, true, Some(1), 11, (550, 110)),
            Err(WmError::GrabAlreadyActive(a))
        );
        assert_eq!(h.core.grab.as_ref().map(|g| g.window), Some(a));
    }

    #[test]
    fn refused_pointer_grab_leaves_no_grab() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.refuse_grabs();
        assert_eq!(h.core.begin_grab(a, GrabOp::Moving, true, Some(1), 10, (150, 110)), Ok(false));
        assert!(h.core.grab.is_none());
    }

    #[test]
    fn drag_moves_the_frame() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let before = h.rect(id);
        h.core.begin_grab(id, GrabOp::Moving, true, Some(1), 10, (200, 110)).ok();
        h.core.handle_grab_motion(260, 150, false);
        assert_eq!(h.rect(id), Rect::new(before.x + 60, before.y + 40, 300, 200));
        assert!(h.notifications().iter().any(|n| matches!(n, Notification::Move { window, .. } if *window == id)));

        h.core.handle_grab_button_release(260, 150, 20);
        assert!(h.core.grab.is_none());
        assert_eq!(h.core.windows[&id].user_rect, h.rect(id));
        assert!(h.requests().contains(&Request::UngrabPointer));
    }

    #[test]
    fn resizes_are_throttled_without_sync() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let right_edge = Rect::new(100, 100, 300, 200).right();
        h.core
            .begin_grab(id, GrabOp::Resizing(ResizeDirection::Right), true, Some(1), 10, (right_edge, 200))
            .ok();

        h.core.handle_grab_motion(right_edge + 20, 200, false);
        assert_eq!(h.rect(id).width, 320);

        // 10 ms later: too soon, a single replay is scheduled
        h.clock.advance(10);
        h.core.handle_grab_motion(right_edge + 30, 200, false);
        h.core.handle_grab_motion(right_edge + 40, 200, false);
        assert_eq!(h.rect(id).width, 320);
        assert!(h.core.grab.as_ref().is_some_and(|g| g.resize_timeout.is_some()));

        h.clock.advance(40);
        h.core.run_timers();
        assert_eq!(h.rect(id).width, 340);
        assert!(h.core.grab.as_ref().is_some_and(|g| g.resize_timeout.is_none()));
    }

    #[test]
    fn dragging_back_to_the_start_puts_the_window_back() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let start = h.rect(id);
        h.core.begin_grab(id, GrabOp::Moving, true, Some(1), 10, (200, 110)).ok();
        h.core.handle_grab_motion(260, 150, false);
        assert_ne!(h.rect(id), start);

        h.core.handle_grab_motion(200, 110, false);
        assert_eq!(h.rect(id), start);
        h.core.handle_grab_button_release(200, 110, 20);
        assert_eq!(h.rect(id), start);
    }

    #[test]
    fn resizing_back_to_the_anchor_restores_the_size() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let start = h.rect(id);
        let right_edge = Rect::new(100, 100, 300, 200).right();
        h.core
            .begin_grab(id, GrabOp::Resizing(ResizeDirection::Right), true, Some(1), 10, (right_edge, 200))
            .ok();
        h.core.handle_grab_motion(right_edge + 30, 200, false);
        assert_eq!(h.rect(id).width, 330);

        h.clock.advance(100);
        h.core.handle_grab_motion(right_edge, 200, false);
        assert_eq!(h.rect(id), start);
    }

    #[test]
    fn snap_modifier_pulls_to_the_nearest_edge() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.begin_grab(id, GrabOp::Moving, true, Some(1), 10, (200, 110)).ok();

        // Far from every edge: plain motion is left alone
        h.core.handle_grab_motion(260, 150, false);
        assert_eq!(h.core.windows[&id].outer_rect(), Rect::new(160, 140, 308, 228));

        h.core.handle_grab_motion(260, 150, true);
        assert_eq!(h.core.windows[&id].outer_rect(), Rect::new(0, 0, 308, 228));
        assert_eq!(h.rect(id), Rect::new(4, 24, 300, 200));
    }

    #[test]
    fn release_applies_the_last_position_despite_the_throttle() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let right_edge = Rect::new(100, 100, 300, 200).right();
        h.core
            .begin_grab(id, GrabOp::Resizing(ResizeDirection::Right), true, Some(1), 10, (right_edge, 200))
            .ok();
        h.core.handle_grab_motion(right_edge + 20, 200, false);
        h.clock.advance(10);
        h.core.handle_grab_motion(right_edge + 40, 200, false);
        assert_eq!(h.rect(id).width, 320);
        assert!(h.core.grab.as_ref().is_some_and(|g| g.resize_timeout.is_some()));

        h.core.handle_grab_button_release(right_edge + 50, 200, 20);
        assert!(h.core.grab.is_none());
        assert_eq!(h.rect(id).width, 350);
        assert!(h.core.next_deadline().is_none());
    }

    #[test]
    fn sync_ack_resumes_updates_and_replays_the_pending_resize() {
        let mut h = Harness::new();
        let mut info = h.info(Rect::new(100, 100, 300, 200));
        info.sync_counter = Some(0x55);
        let id = h.manage(info);
        h.core.run_idle();
        let alarm = h.core.windows[&id].sync.alarm.unwrap_or_default();
        // Acknowledge anything the first map asked for
        h.core.handle_sync_alarm(alarm);
        h.clear_log();

        let right_edge = Rect::new(100, 100, 300, 200).right();
        h.core
            .begin_grab(id, GrabOp::Resizing(ResizeDirection::Right), true, Some(1), 10, (right_edge, 200))
            .ok();
        h.core.handle_grab_motion(right_edge + 20, 200, false);
        assert_eq!(h.rect(id).width, 320);
        assert!(h.core.windows[&id].sync.is_outstanding());
        assert!(h.notifications().contains(&Notification::Updates { window: id, enabled: false }));

        // Waiting for the client: motion is held back
        h.core.handle_grab_motion(right_edge + 40, 200, false);
        assert_eq!(h.rect(id).width, 320);

        h.core.handle_sync_alarm(alarm);
        assert!(h.notifications().contains(&Notification::Updates { window: id, enabled: true }));
        assert_eq!(h.rect(id).width, 340);
        assert_eq!(h.count(|r| matches!(r, Request::SyncRequest { window, .. } if *window == id)), 2);
    }

    #[test]
    fn snapping_to_the_top_of_another_monitor_maximizes_there() {
        let monitors = vec![Rect::new(0, 0, 1280, 1024), Rect::new(1280, 0, 1280, 1024)];
        let mut h = Harness::with_layout(Rect::new(0, 0, 2560, 1024), monitors, WmSettings::default());
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.maximize(id, MaximizeFlags::BOTH);
        assert_eq!(h.core.windows[&id].outer_rect(), Rect::new(0, 0, 1280, 1024));

        h.core.begin_grab(id, GrabOp::Moving, true, Some(1), 10, (640, 10)).ok();
        h.core.handle_grab_motion(1900, 10, false);
        let win = &h.core.windows[&id];
        assert!(win.is_maximized());
        assert_eq!(win.outer_rect(), Rect::new(1280, 0, 1280, 1024));
        assert_eq!((win.saved_rect.x, win.saved_rect.y), (1284, 24));
    }

    #[test]
    fn keyboard_resize_picks_edge_from_first_motion() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.begin_grab(id, GrabOp::KeyboardResizingUnknown, false, None, 10, (0, 0)).ok();
        let anchor = h.core.grab.as_ref().map(|g| g.anchor).unwrap_or_default();
        h.core.update_resize(id, anchor.0 - 10, anchor.1, true);
        assert_eq!(h.core.grab.as_ref().map(|g| g.op), Some(GrabOp::KeyboardResizing(ResizeDirection::Left)));
    }

    #[test]
    fn cancel_restores_the_start_rect() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let start = h.rect(id);
        h.core.begin_grab(id, GrabOp::Moving, true, Some(1), 10, (200, 110)).ok();
        h.core.handle_grab_motion(400, 300, false);
        assert_ne!(h.rect(id), start);
        assert_eq!(h.core.cancel_grab(30), Ok(()));
        assert_eq!(h.rect(id), start);
        assert_eq!(h.core.cancel_grab(31), Err(WmError::NoGrab));
    }

    #[test]
    fn vertical_drag_shakes_a_maximized_window_loose() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.maximize(id, MaximizeFlags::BOTH);
        assert!(h.core.windows[&id].state.contains(WindowState::MAXIMIZED));

        h.core.begin_grab(id, GrabOp::Moving, true, Some(1), 10, (640, 10)).ok();
        let threshold = h.core.settings.shake_threshold();
        h.core.handle_grab_motion(640, 10 + threshold + 5, false);
        let win = &h.core.windows[&id];
        assert!(!win.state.is_any_maximized());
        assert!(win.flags.contains(WmFlags::SHAKEN_LOOSE));
        assert_eq!(win.rect.width, 300);
    }
}
