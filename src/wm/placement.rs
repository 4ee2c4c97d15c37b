//! Placement Module
//!
//! Initial position for windows that have never been placed: first-fit
//! beside existing windows, centring, under the pointer, or leaving the
//! client's own position alone. Works on outer (frame) rects.

use tracing::debug;

use crate::shared::{FrameInsets, Rect};
use crate::wm::client_flags::{Features, WindowType, WmFlags};
use crate::wm::settings::PlacementPolicy;
use crate::wm::window::ManagedWindow;
use crate::wm::WindowManagerCore;

/// Windows closer than this to a cascade point count as cascaded
const CASCADE_FUZZ: i32 = 15;
/// Horizontal gap between successive cascades
const CASCADE_INTERVAL: i32 = 50;

/// Another window placement should avoid
#[derive(Debug, Clone, Copy)]
pub struct Obstacle {
    pub outer: Rect,
    /// Client top-left, where a cascaded window's frame goes
    pub client_origin: (i32, i32),
    pub window_type: WindowType,
}

impl Obstacle {
    /// Docks, dialogs and transient popups do not block placement
    fn blocks(&self) -> bool {
        matches!(
            self.window_type,
            WindowType::Normal | WindowType::Utility | WindowType::Toolbar | WindowType::Menu
        )
    }
}

/// Everything placement looks at besides the window itself
#[derive(Debug, Clone)]
pub struct PlacementContext {
    pub policy: PlacementPolicy,
    /// Monitor the pointer is on
    pub monitor: Rect,
    pub work_area: Rect,
    pub pointer: Option<(i32, i32)>,
    /// Outer rect of the transient parent
    pub parent: Option<Rect>,
    pub others: Vec<Obstacle>,
}

/// Where the frame should go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    /// Too large for the work area; maximize once placed
    pub maximize: bool,
}

/// Choose the frame origin for `window` whose outer rect is `outer`
pub fn place_window(
    window: &ManagedWindow,
    outer: &Rect,
    insets: Option<&FrameInsets>,
    ctx: &PlacementContext,
) -> Placement {
    let keep = Placement { x: outer.x, y: outer.y, maximize: false };

    match window.window_type {
        WindowType::Normal | WindowType::Dialog | WindowType::ModalDialog | WindowType::Splashscreen => {}
        _ => {
            debug!("Not placing {} of type {:?}", window.desc(), window.window_type);
            return keep;
        }
    }

    if window.size_hints.has_position() {
        debug!("Keeping requested position {},{} for {}", outer.x, outer.y, window.desc());
        return keep;
    }

    if matches!(window.window_type, WindowType::Dialog | WindowType::ModalDialog) {
        if let Some(parent) = ctx.parent {
            // Twice as much room below as above
            let x = parent.x + parent.width / 2 - outer.width / 2;
            let y = parent.y + (parent.height - outer.height) / 3;
            debug!("Centred {} over its transient parent", window.desc());
            return Placement { x, y, maximize: false };
        }
    }

    let centred = matches!(
        window.window_type,
        WindowType::Dialog | WindowType::ModalDialog | WindowType::Splashscreen
    ) || matches!(ctx.policy, PlacementPolicy::Center | PlacementPolicy::RespectPosition);
    if centred {
        let x = ctx.monitor.x + (ctx.monitor.width - outer.width) / 2;
        let y = ctx.monitor.y + (ctx.monitor.height - outer.height) / 2;
        debug!("Centred {} on monitor {}", window.desc(), ctx.monitor);
        return Placement { x, y, maximize: false };
    }

    if ctx.policy == PlacementPolicy::Mouse {
        if let Some((px, py)) = ctx.pointer {
            let wa = ctx.work_area;
            let x = (px - outer.width / 2).clamp(wa.x, (wa.right() - outer.width).max(wa.x));
            let y = (py - outer.height / 2).clamp(wa.y, (wa.bottom() - outer.height).max(wa.y));
            debug!("Placed {} under the pointer at {},{}", window.desc(), px, py);
            return Placement { x, y, maximize: false };
        }
    }

    if let Some((x, y)) = find_first_fit(outer, &ctx.work_area, &ctx.others) {
        debug!("First fit for {} at {},{}", window.desc(), x, y);
        return Placement { x, y, maximize: false };
    }

    // Only decorated windows are assumed to want maximizing
    let maximize = window.features.contains(Features::HAS_MAXIMIZE)
        && window.features.contains(Features::DECORATED)
        && !window.is_fullscreen()
        && outer.width >= ctx.work_area.width
        && outer.height >= ctx.work_area.height;

    let thresholds = insets
        .map(|i| (i.left.max(CASCADE_FUZZ), i.top.max(CASCADE_FUZZ)))
        .unwrap_or((CASCADE_FUZZ, CASCADE_FUZZ));
    let (x, y) = find_next_cascade(outer, &ctx.work_area, &ctx.others, thresholds);
    debug!("Cascaded {} to {},{}{}", window.desc(), x, y, if maximize { ", maximizing" } else { "" });
    Placement { x, y, maximize }
}

fn overlaps_some_window(rect: &Rect, others: &[Obstacle]) -> bool {
    others.iter().filter(|o| o.blocks()).any(|o| o.outer.overlaps(rect))
}

/// Centre a tile so spare space is shared on both sides
fn center_tile_in_area(rect: &mut Rect, work_area: &Rect) {
    rect.x = work_area.x + (work_area.width % (rect.width + 1)) / 2;
    rect.y = work_area.y + (work_area.height % (rect.height + 1)) / 3;
}

/// Try the centred tile, then below each window, then right of each window
fn find_first_fit(outer: &Rect, work_area: &Rect, others: &[Obstacle]) -> Option<(i32, i32)> {
    let mut rect = *outer;
    center_tile_in_area(&mut rect, work_area);
    if work_area.contains_rect(&rect) && !overlaps_some_window(&rect, others) {
        return Some((rect.x, rect.y));
    }

    let mut below: Vec<&Obstacle> = others.iter().collect();
    below.sort_by_key(|o| (o.outer.y, o.outer.x));
    for other in &below {
        rect.x = other.outer.x;
        rect.y = other.outer.bottom();
        if work_area.contains_rect(&rect) && !overlaps_some_window(&rect, others) {
            return Some((rect.x, rect.y));
        }
    }

    let mut right: Vec<&Obstacle> = others.iter().collect();
    right.sort_by_key(|o| (o.outer.x, o.outer.y));
    for other in &right {
        rect.x = other.outer.right();
        rect.y = other.outer.y;
        if work_area.contains_rect(&rect) && !overlaps_some_window(&rect, others) {
            return Some((rect.x, rect.y));
        }
    }
    None
}

/// Fuzzy cascade: step past every window already near the cascade diagonal
fn find_next_cascade(
    outer: &Rect,
    work_area: &Rect,
    others: &[Obstacle],
    thresholds: (i32, i32),
) -> (i32, i32) {
    let mut sorted: Vec<&Obstacle> = others.iter().collect();
    sorted.sort_by_key(|o| {
        let (x, y) = (f64::from(o.outer.x), f64::from(o.outer.y));
        (x * x + y * y).sqrt() as i64
    });

    let origin = (work_area.x.max(0), work_area.y.max(0));
    let (mut cascade_x, mut cascade_y) = origin;
    let mut stage = 0;
    let mut index = 0;
    while let Some(other) = sorted.get(index) {
        let (wx, wy) = (other.outer.x, other.outer.y);
        if (wx - cascade_x).abs() < thresholds.0 && (wy - cascade_y).abs() < thresholds.1 {
            (cascade_x, cascade_y) = other.client_origin;

            if cascade_x + outer.width > work_area.right() || cascade_y + outer.height > work_area.bottom() {
                stage += 1;
                (cascade_x, cascade_y) = (origin.0 + CASCADE_INTERVAL * stage, origin.1);
                if cascade_x + outer.width < work_area.right() {
                    index = 0;
                    continue;
                }
                cascade_x = origin.0;
                break;
            }
        }
        index += 1;
    }
    (cascade_x, cascade_y)
}

impl WindowManagerCore {
    /// Gather the placement inputs for `window` from the current state
    pub(crate) fn placement_context(&self, window: &ManagedWindow) -> PlacementContext {
        let pointer = self.display.query_pointer().ok();
        let monitor = pointer
            .and_then(|(x, y)| self.screen.monitor_at_point(x, y))
            .unwrap_or(0);
        let parent = window
            .transient_for
            .and_then(|p| self.windows.get(&p))
            .map(ManagedWindow::outer_rect);

        let others = self
            .windows
            .values()
            .filter(|w| w.id != window.id)
            .filter(|w| w.flags.contains(WmFlags::PLACED))
            .filter(|w| self.showing_on_its_workspace(w) && self.located_on_workspace(w, window.workspace))
            .map(|w| Obstacle {
                outer: match &w.frame {
                    // Shaded windows count at full size
                    Some(frame) => w.rect.expand_by(&frame.insets),
                    None => w.rect,
                },
                client_origin: (w.rect.x, w.rect.y),
                window_type: w.window_type,
            })
            .collect();

        PlacementContext {
            policy: self.settings.placement,
            monitor: self.screen.monitor(monitor),
            work_area: self.screen.monitor_work_area(monitor),
            pointer,
            parent,
            others,
        }
    }

    /// Place an unplaced window inside a move/resize and return its new
    /// client rect, flagging deferred maximization when it does not fit
    pub(crate) fn place_if_needed(&mut self, window: u32, rect: Rect) -> Rect {
        let Some(win) = self.windows.get(&window) else {
            return rect;
        };
        let insets = win.frame.as_ref().map(|f| f.insets);
        let outer = match &insets {
            Some(insets) => rect.expand_by(insets),
            None => rect,
        };
        let ctx = self.placement_context(win);
        let placement = place_window(win, &outer, insets.as_ref(), &ctx);

        let mut placed = rect;
        placed.x = placement.x + insets.map(|i| i.left).unwrap_or(0);
        placed.y = placement.y + insets.map(|i| i.top).unwrap_or(0);
        if placement.maximize {
            if let Some(win) = self.windows.get_mut(&window) {
                win.flags |= WmFlags::MAXIMIZE_HORZ_AFTER_PLACEMENT | WmFlags::MAXIMIZE_VERT_AFTER_PLACEMENT;
            }
        }
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::display::WindowInfo;
    use crate::wm::hints::size_flags;

    const SCREEN: Rect = Rect::new(0, 0, 1280, 1024);

    fn window(kind: WindowType, rect: Rect) -> ManagedWindow {
        let info = WindowInfo { rect, window_type: kind, ..Default::default() };
        let mut win = ManagedWindow::new(7, &info, 0);
        win.recalc_features(SCREEN);
        win
    }

    fn ctx(policy: PlacementPolicy, others: Vec<Obstacle>) -> PlacementContext {
        PlacementContext {
            policy,
            monitor: SCREEN,
            work_area: SCREEN,
            pointer: Some((640, 512)),
            parent: None,
            others,
        }
    }

    fn obstacle(outer: Rect) -> Obstacle {
        Obstacle { outer, client_origin: (outer.x + 4, outer.y + 24), window_type: WindowType::Normal }
    }

    #[test]
    fn positioned_windows_are_left_alone() {
        let mut raw = vec![0u32; 18];
        raw[0] = size_flags::US_POSITION;
        let info = WindowInfo { rect: Rect::new(300, 200, 100, 100), normal_hints: raw, ..Default::default() };
        let win = ManagedWindow::new(7, &info, 0);
        let outer = Rect::new(300, 200, 100, 100);
        let placed = place_window(&win, &outer, None, &ctx(PlacementPolicy::Smart, Vec::new()));
        assert_eq!((placed.x, placed.y), (300, 200));
    }

    #[test]
    fn dialogs_centre_over_their_parent() {
        let win = window(WindowType::Dialog, Rect::new(0, 0, 200, 100));
        let mut c = ctx(PlacementPolicy::Smart, Vec::new());
        c.parent = Some(Rect::new(100, 100, 600, 400));
        let placed = place_window(&win, &Rect::new(0, 0, 200, 100), None, &c);
        assert_eq!((placed.x, placed.y), (300, 200));
    }

    #[test]
    fn first_fit_goes_beside_existing_windows() {
        let win = window(WindowType::Normal, Rect::new(0, 0, 600, 1000));
        let others = vec![obstacle(Rect::new(0, 0, 600, 1000))];
        let placed = place_window(&win, &Rect::new(0, 0, 600, 1000), None, &ctx(PlacementPolicy::Smart, others));
        assert_eq!((placed.x, placed.y), (600, 0));
        assert!(!placed.maximize);
    }

    #[test]
    fn oversized_windows_cascade_and_maximize() {
        let win = window(WindowType::Normal, Rect::new(0, 0, 1400, 1100));
        let others = vec![obstacle(Rect::new(0, 0, 300, 300))];
        let placed = place_window(&win, &Rect::new(0, 0, 1400, 1100), None, &ctx(PlacementPolicy::Smart, others));
        assert!(placed.maximize);
    }

    #[test]
    fn cascade_steps_past_windows_on_the_diagonal() {
        let outer = Rect::new(0, 0, 400, 300);
        let others = vec![obstacle(Rect::new(0, 0, 400, 300)), obstacle(Rect::new(4, 24, 400, 300))];
        let (x, y) = find_next_cascade(&outer, &SCREEN, &others, (CASCADE_FUZZ, 24));
        assert_eq!((x, y), (8, 48));
    }

    #[test]
    fn mouse_placement_stays_in_the_work_area() {
        let win = window(WindowType::Normal, Rect::new(0, 0, 400, 300));
        let mut c = ctx(PlacementPolicy::Mouse, Vec::new());
        c.pointer = Some((1270, 10));
        let placed = place_window(&win, &Rect::new(0, 0, 400, 300), None, &c);
        assert_eq!((placed.x, placed.y), (880, 0));
    }

    #[test]
    fn docks_keep_their_position() {
        let win = window(WindowType::Dock, Rect::new(0, 994, 1280, 30));
        let placed = place_window(&win, &Rect::new(0, 994, 1280, 30), None, &ctx(PlacementPolicy::Center, Vec::new()));
        assert_eq!((placed.x, placed.y), (0, 994));
    }
}
