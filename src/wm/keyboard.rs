//! Keyboard Module
//!
//! Key handling while a keyboard move or resize holds the grab. The event
//! loop translates keycodes to keysyms and hands them over as [`GrabKey`].

use tracing::{debug, trace};

use crate::shared::geometry::resize_with_gravity;
use crate::wm::grab::{GrabOp, ResizeDirection};
use crate::wm::WindowManagerCore;

/// Keysyms we care about during a grab
mod keysym {
    pub const RETURN: u32 = 0xff0d;
    pub const ESCAPE: u32 = 0xff1b;
    pub const LEFT: u32 = 0xff51;
    pub const UP: u32 = 0xff52;
    pub const RIGHT: u32 = 0xff53;
    pub const DOWN: u32 = 0xff54;
    pub const KP_ENTER: u32 = 0xff8d;
    pub const KP_LEFT: u32 = 0xff96;
    pub const KP_UP: u32 = 0xff97;
    pub const KP_RIGHT: u32 = 0xff98;
    pub const KP_DOWN: u32 = 0xff99;
    pub const SHIFT_L: u32 = 0xffe1;
    pub const HYPER_R: u32 = 0xffee;
}

/// A key pressed during a grab
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabKey {
    Left,
    Right,
    Up,
    Down,
    Return,
    Escape,
    /// Shift, Control and friends; never end the grab
    Modifier,
    Other,
}

impl GrabKey {
    pub fn from_keysym(sym: u32) -> Self {
        match sym {
            keysym::LEFT | keysym::KP_LEFT => Self::Left,
            keysym::RIGHT | keysym::KP_RIGHT => Self::Right,
            keysym::UP | keysym::KP_UP => Self::Up,
            keysym::DOWN | keysym::KP_DOWN => Self::Down,
            keysym::RETURN | keysym::KP_ENTER => Self::Return,
            keysym::ESCAPE => Self::Escape,
            keysym::SHIFT_L..=keysym::HYPER_R => Self::Modifier,
            _ => Self::Other,
        }
    }

    /// Unit vector of an arrow key
    fn delta(self) -> Option<(i32, i32)> {
        match self {
            Self::Left => Some((-1, 0)),
            Self::Right => Some((1, 0)),
            Self::Up => Some((0, -1)),
            Self::Down => Some((0, 1)),
            _ => None,
        }
    }

    /// Edge an arrow key picks for an undecided resize
    fn edge(self) -> Option<ResizeDirection> {
        match self {
            Self::Left => Some(ResizeDirection::Left),
            Self::Right => Some(ResizeDirection::Right),
            Self::Up => Some(ResizeDirection::Top),
            Self::Down => Some(ResizeDirection::Bottom),
            _ => None,
        }
    }
}

impl WindowManagerCore {
    /// Key press while a grab is active
    ///
    /// Returns whether the key was consumed by the grab. Keys a keyboard
    /// grab does not understand end it; pointer grabs only react to Escape.
    pub fn handle_grab_key(&mut self, key: GrabKey, fine: bool, time: u32) -> bool {
        let Some(grab) = self.grab.as_ref() else {
            return false;
        };
        let (window, op) = (grab.window, grab.op);
        trace!("Key {:?} during {:?} on 0x{:x}", key, op, window);

        match key {
            GrabKey::Escape => {
                self.cancel_grab(time).ok();
                return true;
            }
            GrabKey::Modifier => return true,
            _ if !op.is_keyboard() => return false,
            GrabKey::Return => {
                self.end_grab(time);
                return true;
            }
            _ => {}
        }

        let Some((dx, dy)) = key.delta() else {
            debug!("Key {:?} ends the keyboard grab on 0x{:x}", key, window);
            self.end_grab(time);
            return true;
        };
        let step = if fine { self.settings.keyboard_fine_step } else { self.settings.keyboard_step };

        match op {
            GrabOp::KeyboardMoving => self.keyboard_move(window, dx * step, dy * step),
            GrabOp::KeyboardResizingUnknown => {
                if let (Some(edge), Some(grab)) = (key.edge(), self.grab.as_mut()) {
                    debug!("Keyboard resize of 0x{:x} picked {:?}", window, edge);
                    grab.op = GrabOp::KeyboardResizing(edge);
                }
                self.update_keyboard_resize();
            }
            GrabOp::KeyboardResizing(direction) => self.keyboard_resize(window, direction, key, step),
            GrabOp::Moving | GrabOp::Resizing(_) => {}
        }
        true
    }

    fn keyboard_move(&mut self, window: u32, dx: i32, dy: i32) {
        let Some(rect) = self.windows.get(&window).map(|w| w.rect) else {
            return;
        };
        self.move_resize_window(window, true, rect.x + dx, rect.y + dy, rect.width, rect.height);
        self.warp_grab_pointer();
    }

    /// Grow or shrink along the grabbed edge; an arrow across the edge
    /// switches to the edge it points at
    fn keyboard_resize(&mut self, window: u32, direction: ResizeDirection, key: GrabKey, step: i32) {
        let Some((kx, ky)) = key.delta() else {
            return;
        };
        let (sx, sy) = direction.signs();
        if (kx != 0 && sx == 0) || (ky != 0 && sy == 0) {
            let switched = ResizeDirection::from_signs(if kx != 0 { kx } else { sx }, if ky != 0 { ky } else { sy });
            if let (Some(switched), Some(grab)) = (switched, self.grab.as_mut()) {
                debug!("Keyboard resize of 0x{:x} switched to {:?}", window, switched);
                grab.op = GrabOp::KeyboardResizing(switched);
            }
            self.update_keyboard_resize();
            return;
        }

        let Some(rect) = self.windows.get(&window).map(|w| w.rect) else {
            return;
        };
        let width = (rect.width + sx * kx * step).max(1);
        let height = (rect.height + sy * ky * step).max(1);
        let new = resize_with_gravity(&rect, direction.gravity(), width, height);
        trace!("Keyboard resize of 0x{:x} to {}", window, new);
        self.move_resize_window(window, true, new.x, new.y, new.width, new.height);
        self.warp_grab_pointer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Rect;
    use crate::wm::testing::{Harness, Request};

    fn keyboard_grab(h: &mut Harness, op: GrabOp) -> u32 {
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        assert_eq!(h.core.begin_grab(id, op, false, None, 1500, (0, 0)), Ok(true));
        id
    }

    #[test]
    fn keysyms_map_to_grab_keys() {
        assert_eq!(GrabKey::from_keysym(0xff51), GrabKey::Left);
        assert_eq!(GrabKey::from_keysym(0xff99), GrabKey::Down);
        assert_eq!(GrabKey::from_keysym(0xff8d), GrabKey::Return);
        assert_eq!(GrabKey::from_keysym(0xffe3), GrabKey::Modifier);
        assert_eq!(GrabKey::from_keysym(u32::from(b'a')), GrabKey::Other);
    }

    #[test]
    fn arrows_move_by_step_and_control_by_one() {
        let mut h = Harness::new();
        let id = keyboard_grab(&mut h, GrabOp::KeyboardMoving);
        let start = h.rect(id);

        assert!(h.core.handle_grab_key(GrabKey::Right, false, 1600));
        assert!(h.core.handle_grab_key(GrabKey::Down, true, 1601));
        assert_eq!(h.rect(id), Rect::new(start.x + 10, start.y + 1, 300, 200));
        assert!(h.core.grab.is_some());

        h.core.handle_grab_key(GrabKey::Return, false, 1602);
        assert!(h.core.grab.is_none());
        assert_eq!(h.rect(id), Rect::new(start.x + 10, start.y + 1, 300, 200));
    }

    #[test]
    fn escape_restores_the_start_rect() {
        let mut h = Harness::new();
        let id = keyboard_grab(&mut h, GrabOp::KeyboardMoving);
        let start = h.rect(id);
        h.core.handle_grab_key(GrabKey::Left, false, 1600);
        h.core.handle_grab_key(GrabKey::Left, false, 1601);
        assert_ne!(h.rect(id), start);

        h.core.handle_grab_key(GrabKey::Escape, false, 1602);
        assert!(h.core.grab.is_none());
        assert_eq!(h.rect(id), start);
        assert!(h.requests().contains(&Request::UngrabKeyboard));
    }

    #[test]
    fn first_arrow_picks_the_resize_edge() {
        let mut h = Harness::new();
        let id = keyboard_grab(&mut h, GrabOp::KeyboardResizingUnknown);
        let start = h.rect(id);

        h.core.handle_grab_key(GrabKey::Right, false, 1600);
        assert_eq!(h.core.grab.as_ref().map(|g| g.op), Some(GrabOp::KeyboardResizing(ResizeDirection::Right)));
        assert_eq!(h.rect(id), start);
        let outer = h.core.windows[&id].outer_rect();
        assert!(h.requests().contains(&Request::Warp { x: outer.right() - 1, y: outer.y + outer.height / 2 }));

        h.core.handle_grab_key(GrabKey::Right, false, 1601);
        assert_eq!(h.rect(id), Rect::new(start.x, start.y, 310, 200));
        h.core.handle_grab_key(GrabKey::Left, false, 1602);
        h.core.handle_grab_key(GrabKey::Left, false, 1603);
        assert_eq!(h.rect(id), Rect::new(start.x, start.y, 290, 200));
    }

    #[test]
    fn crossing_arrow_switches_edge() {
        let mut h = Harness::new();
        let id = keyboard_grab(&mut h, GrabOp::KeyboardResizing(ResizeDirection::Right));
        let start = h.rect(id);
        h.core.handle_grab_key(GrabKey::Up, false, 1600);
        assert_eq!(h.core.grab.as_ref().map(|g| g.op), Some(GrabOp::KeyboardResizing(ResizeDirection::TopRight)));
        assert_eq!(h.rect(id), start);

        h.core.handle_grab_key(GrabKey::Up, false, 1601);
        assert_eq!(h.rect(id), Rect::new(start.x, start.y - 10, 300, 210));
    }

    #[test]
    fn other_keys_end_a_keyboard_grab_but_not_a_pointer_grab() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.begin_grab(id, GrabOp::Moving, true, Some(1), 1500, (200, 110)).ok();
        assert!(!h.core.handle_grab_key(GrabKey::Left, false, 1600));
        assert!(h.core.grab.is_some());
        h.core.end_grab(1601);

        h.core.begin_grab(id, GrabOp::KeyboardMoving, false, None, 1700, (0, 0)).ok();
        assert!(h.core.handle_grab_key(GrabKey::Modifier, false, 1701));
        assert!(h.core.grab.is_some());
        assert!(h.core.handle_grab_key(GrabKey::Other, false, 1702));
        assert!(h.core.grab.is_none());
    }
}
