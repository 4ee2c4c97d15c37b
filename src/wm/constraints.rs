//! Constraints Module
//!
//! Corrects a proposed client rect so that it honours maximization,
//! fullscreen, the size hints and the onscreen requirements. Constraints
//! carry a priority; when they cannot all hold at once the solver gives up
//! on the least important ones first.
//!
//! Rects passed in and out are client rects. The size constraints work on
//! the client rect, the region constraints on the outer (framed) rect.

use tracing::{debug, trace};

use crate::shared::geometry::resize_with_gravity;
use crate::shared::{FrameInsets, Gravity, Rect};
use crate::wm::client_flags::{Features, MoveResizeFlags, WindowState, WmFlags};
use crate::wm::screen::ScreenLayout;
use crate::wm::window::ManagedWindow;

const PRIORITY_MINIMUM: u8 = 0;
const PRIORITY_MAXIMUM: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Move,
    Resize,
    MoveAndResize,
}

/// Axes a user drag did not touch; region fixes leave them alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Fixed {
    x: bool,
    y: bool,
}

/// What the solver knows about one request
struct ConstraintInfo<'a> {
    window: &'a ManagedWindow,
    orig: Rect,
    current: Rect,
    insets: FrameInsets,
    action: Action,
    user_action: bool,
    /// The grab was started from the frame, so titlebar rules apply
    frame_action: bool,
    gravity: Gravity,
    fixed: Fixed,
    work_area_monitor: Rect,
    entire_monitor: Rect,
    usable_screen_region: Vec<Rect>,
    usable_monitor_region: Vec<Rect>,
    monitor_count: usize,
}

/// One constraint request
#[derive(Debug, Clone, Copy)]
pub struct ConstrainRequest {
    pub flags: MoveResizeFlags,
    pub gravity: Gravity,
    pub old: Rect,
    pub new: Rect,
    /// User grab initiated on the window frame
    pub frame_action: bool,
}

type ConstraintFn = fn(&mut ConstraintInfo<'_>, u8, bool) -> bool;

const CONSTRAINTS: [(&str, ConstraintFn); 9] = [
    ("maximization", constrain_maximization),
    ("fullscreen", constrain_fullscreen),
    ("size_increments", constrain_size_increments),
    ("size_limits", constrain_size_limits),
    ("aspect_ratio", constrain_aspect_ratio),
    ("single_monitor", constrain_to_single_monitor),
    ("fully_onscreen", constrain_fully_onscreen),
    ("titlebar_visible", constrain_titlebar_visible),
    ("partially_onscreen", constrain_partially_onscreen),
];

/// Constraint priorities; lower numbers are dropped first
mod priority {
    pub const ASPECT_RATIO: u8 = 0;
    pub const SINGLE_MONITOR: u8 = 0;
    pub const FULLY_ONSCREEN: u8 = 1;
    pub const SIZE_INCREMENTS: u8 = 1;
    pub const MAXIMIZATION: u8 = 2;
    pub const FULLSCREEN: u8 = 2;
    pub const SIZE_LIMITS: u8 = 3;
    pub const TITLEBAR_VISIBLE: u8 = 4;
    pub const PARTIALLY_ONSCREEN: u8 = 4;
}

/// Correct `request.new` for `window`
///
/// Reads the window but never changes it. `insets` are the frame insets the
/// window will have afterwards, `None` when unframed.
pub fn constrain(
    window: &ManagedWindow,
    screen: &ScreenLayout,
    insets: Option<&FrameInsets>,
    request: &ConstrainRequest,
) -> Rect {
    let mut info = setup_constraint_info(window, screen, insets, request);
    trace!(
        "Constraining {} from {} to {} ({:?}, user={}, gravity={:?}, fixed={:?})",
        window.desc(),
        info.orig,
        info.current,
        info.action,
        info.user_action,
        info.gravity,
        info.fixed
    );

    let mut priority = PRIORITY_MINIMUM;
    let mut satisfied = false;
    while !satisfied && priority <= PRIORITY_MAXIMUM {
        do_all_constraints(&mut info, priority, false);
        satisfied = do_all_constraints(&mut info, priority, true);
        priority += 1;
    }
    if !satisfied {
        debug!("Constraints for {} could not all be satisfied", window.desc());
    }
    info.current
}

fn do_all_constraints(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    for (name, constraint) in CONSTRAINTS {
        let satisfied = constraint(info, priority, check_only);
        if check_only && !satisfied {
            trace!("Constraint {} not satisfied", name);
            return false;
        }
        if !check_only {
            trace!("Current is {} after {}", info.current, name);
        }
    }
    true
}

fn setup_constraint_info<'a>(
    window: &'a ManagedWindow,
    screen: &ScreenLayout,
    insets: Option<&FrameInsets>,
    request: &ConstrainRequest,
) -> ConstraintInfo<'a> {
    let flags = request.flags;
    let action = if flags.contains(MoveResizeFlags::MOVE_ACTION | MoveResizeFlags::RESIZE_ACTION) {
        Action::MoveAndResize
    } else if flags.contains(MoveResizeFlags::RESIZE_ACTION) {
        Action::Resize
    } else {
        Action::Move
    };
    let user_action = flags.contains(MoveResizeFlags::USER_ACTION);

    let (orig, new) = (request.old, request.new);
    let mut fixed = Fixed::default();
    // Only one axis changed
    if user_action {
        fixed.x = orig.x == new.x && orig.right() == new.right() && (orig.y != new.y || orig.bottom() != new.bottom());
        fixed.y = orig.y == new.y && orig.bottom() == new.bottom() && (orig.x != new.x || orig.right() != new.right());
        if fixed.y {
            fixed.x = false;
        }
    }

    let monitor = screen.monitor_for_rect(&new);
    let insets = match insets {
        Some(insets) if !window.is_fullscreen() => *insets,
        _ => FrameInsets::default(),
    };

    ConstraintInfo {
        window,
        orig,
        current: new,
        insets,
        action,
        user_action,
        frame_action: request.frame_action,
        gravity: request.gravity,
        fixed,
        work_area_monitor: screen.monitor_work_area(monitor),
        entire_monitor: screen.monitor(monitor),
        usable_screen_region: screen.onscreen_region(),
        usable_monitor_region: vec![screen.monitor_work_area(monitor)],
        monitor_count: screen.monitor_count(),
    }
}

/// Which onscreen requirements the window meets at `client`
///
/// Returns `None` for windows whose requirements are never tracked.
pub fn onscreen_requirements(
    window: &ManagedWindow,
    screen: &ScreenLayout,
    client: &Rect,
    insets: Option<&FrameInsets>,
) -> Option<WmFlags> {
    if window.is_desktop_or_dock() || window.is_fullscreen() {
        return None;
    }
    let outer = match insets {
        Some(insets) => client.expand_by(insets),
        None => *client,
    };
    let monitor = screen.monitor_for_rect(client);
    let screen_region = screen.onscreen_region();

    let mut flags = window.flags
        & (WmFlags::REQUIRE_FULLY_ONSCREEN | WmFlags::REQUIRE_ON_SINGLE_MONITOR | WmFlags::REQUIRE_TITLEBAR_VISIBLE);
    flags.set(WmFlags::REQUIRE_FULLY_ONSCREEN, contained_in_region(&screen_region, &outer));
    flags.set(
        WmFlags::REQUIRE_ON_SINGLE_MONITOR,
        screen.monitor_work_area(monitor).contains_rect(&outer),
    );
    if let Some(insets) = insets {
        if window.features.contains(Features::DECORATED) {
            let titlebar = Rect::new(outer.x, outer.y, outer.width, insets.top);
            flags.set(
                WmFlags::REQUIRE_TITLEBAR_VISIBLE,
                screen_region.iter().any(|r| r.overlaps(&titlebar)),
            );
        }
    }
    Some(flags)
}

fn size_limits(window: &ManagedWindow, insets: Option<&FrameInsets>) -> ((i32, i32), (i32, i32)) {
    let hints = &window.size_hints;
    let (fw, fh) = insets.map(|i| (i.horizontal(), i.vertical())).unwrap_or((0, 0));
    (
        (hints.min_width + fw, hints.min_height + fh),
        (hints.max_width.saturating_add(fw), hints.max_height.saturating_add(fh)),
    )
}

/// Rect to resize from: the proposal for move+resize, the old rect otherwise
fn start_rect(info: &ConstraintInfo<'_>) -> Rect {
    if info.action == Action::MoveAndResize {
        info.current
    } else {
        info.orig
    }
}

fn constrain_maximization(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::MAXIMIZATION {
        return true;
    }
    let horz = info.window.state.contains(WindowState::MAXIMIZED_HORZ);
    let vert = info.window.state.contains(WindowState::MAXIMIZED_VERT);
    if !horz && !vert {
        return true;
    }

    let work_area = info.work_area_monitor;
    let mut target = info.current.expand_by(&info.insets);
    if horz {
        target.x = work_area.x;
        target.width = work_area.width;
    }
    if vert {
        target.y = work_area.y;
        target.height = work_area.height;
    }
    let target = target.shrink_by(&info.insets);

    // Max size is ignored for maximized windows, min size is not
    let ((min_w, min_h), _) = size_limits(info.window, None);
    if (horz && target.width < min_w) || (vert && target.height < min_h) {
        return true;
    }

    let horiz_equal = target.x == info.current.x && target.width == info.current.width;
    let vert_equal = target.y == info.current.y && target.height == info.current.height;
    let satisfied = (horiz_equal || !horz) && (vert_equal || !vert);
    if check_only || satisfied {
        return satisfied;
    }

    if horz {
        info.current.x = target.x;
        info.current.width = target.width;
    }
    if vert {
        info.current.y = target.y;
        info.current.height = target.height;
    }
    true
}

fn constrain_fullscreen(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::FULLSCREEN || !info.window.is_fullscreen() {
        return true;
    }
    let monitor = info.entire_monitor;
    let ((min_w, min_h), (max_w, max_h)) = size_limits(info.window, None);
    let too_big = monitor.width < min_w || monitor.height < min_h;
    let too_small = max_w < monitor.width || max_h < monitor.height;
    if too_big || too_small {
        return true;
    }

    let satisfied = info.current == monitor;
    if check_only || satisfied {
        return satisfied;
    }
    info.current = monitor;
    true
}

fn constrain_size_increments(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::SIZE_INCREMENTS {
        return true;
    }
    let window = info.window;
    if window.is_maximized() || window.is_fullscreen() || info.action == Action::Move {
        return true;
    }

    let hints = &window.size_hints;
    let (wi, hi) = (hints.width_inc, hints.height_inc);
    let mut extra_width = (info.current.width - hints.base_width) % wi;
    let mut extra_height = (info.current.height - hints.base_height) % hi;
    if window.state.contains(WindowState::MAXIMIZED_HORZ) {
        extra_width = 0;
    }
    if window.state.contains(WindowState::MAXIMIZED_VERT) {
        extra_height = 0;
    }
    let satisfied = extra_width == 0 && extra_height == 0;
    if check_only || satisfied {
        return satisfied;
    }

    let mut new_width = info.current.width - extra_width;
    let mut new_height = info.current.height - extra_height;
    // Rounding down may undershoot the minimum
    if new_width < hints.min_width {
        new_width += ((hints.min_width - new_width) / wi + 1) * wi;
    }
    if new_height < hints.min_height {
        new_height += ((hints.min_height - new_height) / hi + 1) * hi;
    }

    info.current = resize_with_gravity(&start_rect(info), info.gravity, new_width, new_height);
    true
}

fn constrain_size_limits(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::SIZE_LIMITS || info.action == Action::Move {
        return true;
    }
    let window = info.window;
    let ((min_w, min_h), (mut max_w, mut max_h)) = size_limits(window, None);
    if window.state.contains(WindowState::MAXIMIZED_HORZ) {
        max_w = max_w.max(info.current.width);
    }
    if window.state.contains(WindowState::MAXIMIZED_VERT) {
        max_h = max_h.max(info.current.height);
    }
    let too_small = info.current.width < min_w || info.current.height < min_h;
    let too_big = info.current.width > max_w || info.current.height > max_h;
    let satisfied = !too_small && !too_big;
    if check_only || satisfied {
        return satisfied;
    }

    let new_width = info.current.width.clamp(min_w, max_w);
    let new_height = info.current.height.clamp(min_h, max_h);
    info.current = resize_with_gravity(&start_rect(info), info.gravity, new_width, new_height);
    true
}

/// Point on the segment through (x1,y1) and (x2,y2) closest to (px,py)
fn closest_point_on_line(x1: f64, y1: f64, x2: f64, y2: f64, px: f64, py: f64) -> (f64, f64) {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let den = dx * dx + dy * dy;
    if den == 0.0 {
        return (x1, y1);
    }
    let x = (py * dx * dy + px * dx * dx + y2 * x1 * dy - y1 * x2 * dy) / den;
    let y = (px * dx * dy + py * dy * dy + x2 * y1 * dx - x1 * y2 * dx) / den;
    (x, y)
}

/// `clamp` that tolerates inverted bounds the way the MIN/MAX macro pair does
fn clamp_f(value: f64, low: f64, high: f64) -> f64 {
    if value > high {
        high
    } else if value < low {
        low
    } else {
        value
    }
}

fn constrain_aspect_ratio(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::ASPECT_RATIO {
        return true;
    }
    let window = info.window;
    let minr = window.size_hints.min_aspect.ratio();
    let maxr = window.size_hints.max_aspect.ratio();
    if minr > maxr || window.is_maximized() || window.is_fullscreen() || info.action == Action::Move {
        return true;
    }

    // One-sided resizes move in increments of two
    let fudge = match info.gravity {
        Gravity::West | Gravity::North | Gravity::South | Gravity::East => 2.0,
        _ => 1.0,
    };
    let width = f64::from(info.current.width);
    let height = f64::from(info.current.height);
    let satisfied = width - height * minr > -minr * fudge && width - height * maxr < maxr * fudge;
    if check_only || satisfied {
        return satisfied;
    }

    let (new_width, new_height) = match info.gravity {
        Gravity::West | Gravity::East => (width, clamp_f(height, width / maxr, width / minr)),
        Gravity::North | Gravity::South => (clamp_f(width, height * minr, height * maxr), height),
        _ => {
            let alt_width = clamp_f(width, height * minr, height * maxr);
            let alt_height = clamp_f(height, width / maxr, width / minr);
            closest_point_on_line(alt_width, height, width, alt_height, width, height)
        }
    };

    info.current = resize_with_gravity(&start_rect(info), info.gravity, new_width as i32, new_height as i32);
    true
}

pub(crate) fn contained_in_region(region: &[Rect], rect: &Rect) -> bool {
    region.iter().any(|r| r.contains_rect(rect))
}

fn could_fit_in_region(region: &[Rect], rect: &Rect) -> bool {
    region.iter().any(|r| r.could_fit(rect))
}

/// The candidate rect may not satisfy a fixed axis
fn violates_fixed(fixed: Fixed, candidate: &Rect, rect: &Rect) -> bool {
    (fixed.x && (candidate.x > rect.x || candidate.right() < rect.right()))
        || (fixed.y && (candidate.y > rect.y || candidate.bottom() < rect.bottom()))
}

fn clamp_to_fit_into_region(region: &[Rect], fixed: Fixed, rect: &mut Rect, min_size: (i32, i32)) {
    let best = region
        .iter()
        .filter(|r| !violates_fixed(fixed, r, rect))
        .filter(|r| r.width >= min_size.0 && r.height >= min_size.1)
        .map(|r| (r, i64::from(rect.width.min(r.width)) * i64::from(rect.height.min(r.height))))
        .filter(|(_, overlap)| *overlap > 0)
        .fold(None::<(&Rect, i64)>, |best, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        });

    match best {
        Some((best, _)) => {
            rect.width = rect.width.min(best.width);
            rect.height = rect.height.min(best.height);
        }
        None => {
            debug!("No rect whose size to clamp to found");
            if !fixed.x {
                rect.width = min_size.0;
            }
            if !fixed.y {
                rect.height = min_size.1;
            }
        }
    }
}

fn clip_to_region(region: &[Rect], fixed: Fixed, rect: &mut Rect) {
    let best = region
        .iter()
        .filter(|r| !violates_fixed(fixed, r, rect))
        .filter_map(|r| r.intersect(rect).map(|o| (r, o.area())))
        .filter(|(_, overlap)| *overlap > 0)
        .fold(None::<(&Rect, i64)>, |best, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        });

    let Some((best, _)) = best else {
        debug!("No rect to clip to found");
        return;
    };
    if !fixed.x {
        let new_x = rect.x.max(best.x);
        rect.width = (rect.right() - new_x).min(best.right() - new_x);
        rect.x = new_x;
    }
    if !fixed.y {
        let new_y = rect.y.max(best.y);
        rect.height = (rect.bottom() - new_y).min(best.bottom() - new_y);
        rect.y = new_y;
    }
}

fn shove_into_region(region: &[Rect], fixed: Fixed, rect: &mut Rect) {
    let mut best: Option<(&Rect, i64, i32)> = None;
    for candidate in region.iter().filter(|r| !violates_fixed(fixed, r, rect)) {
        let overlap = i64::from(rect.width.min(candidate.width)) * i64::from(rect.height.min(candidate.height));
        let mut distance = 0;
        if candidate.x > rect.x {
            distance += candidate.x - rect.x;
        }
        if candidate.right() < rect.right() {
            distance += rect.right() - candidate.right();
        }
        if candidate.y > rect.y {
            distance += candidate.y - rect.y;
        }
        if candidate.bottom() < rect.bottom() {
            distance += rect.bottom() - candidate.bottom();
        }
        let better = match best {
            None => overlap > 0,
            Some((_, best_overlap, best_distance)) => {
                overlap > best_overlap || (overlap == best_overlap && distance < best_distance)
            }
        };
        if better {
            best = Some((candidate, overlap, distance));
        }
    }

    let Some((best, _, _)) = best else {
        debug!("No rect to shove into found");
        return;
    };
    if !fixed.x {
        if best.x > rect.x {
            rect.x = best.x;
        }
        if best.right() < rect.right() {
            rect.x = best.right() - rect.width;
        }
    }
    if !fixed.y {
        if best.y > rect.y {
            rect.y = best.y;
        }
        if best.bottom() < rect.bottom() {
            rect.y = best.bottom() - rect.height;
        }
    }
}

/// Grow every region rect that is at least `min_x` wide / `min_y` tall
fn expand_region_conditionally(
    region: &[Rect],
    left: i32,
    right: i32,
    top: i32,
    bottom: i32,
    min_x: i32,
    min_y: i32,
) -> Vec<Rect> {
    region
        .iter()
        .map(|r| {
            let mut r = *r;
            if r.width >= min_x {
                r.x -= left;
                r.width += left + right;
            }
            if r.height >= min_y {
                r.y -= top;
                r.height += top + bottom;
            }
            r
        })
        .collect()
}

/// Keep the outer rect inside `region`: clamp, then clip or shove
fn constrain_to_region(info: &mut ConstraintInfo<'_>, region: &[Rect], check_only: bool) -> bool {
    let (min_size, _) = size_limits(info.window, Some(&info.insets));
    let mut outer = info.current.expand_by(&info.insets);

    let mut smushed = outer;
    if info.action != Action::Move {
        if !info.fixed.x {
            smushed.width = min_size.0;
        }
        if !info.fixed.y {
            smushed.height = min_size.1;
        }
    }
    let exit_early = !could_fit_in_region(region, &smushed);

    let satisfied = contained_in_region(region, &outer);
    if exit_early || satisfied || check_only {
        return satisfied;
    }

    if info.action != Action::Move {
        clamp_to_fit_into_region(region, info.fixed, &mut outer, min_size);
    }
    if info.user_action && info.action == Action::Resize {
        clip_to_region(region, info.fixed, &mut outer);
    } else {
        shove_into_region(region, info.fixed, &mut outer);
    }

    info.current = outer.shrink_by(&info.insets);
    true
}

fn constrain_to_single_monitor(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::SINGLE_MONITOR {
        return true;
    }
    let window = info.window;
    // Frameless windows such as media players must be able to cross monitors
    if window.is_desktop_or_dock()
        || info.monitor_count == 1
        || !window.flags.contains(WmFlags::REQUIRE_ON_SINGLE_MONITOR)
        || window.frame.is_none()
        || info.user_action
    {
        return true;
    }
    let region = info.usable_monitor_region.clone();
    constrain_to_region(info, &region, check_only)
}

fn constrain_fully_onscreen(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::FULLY_ONSCREEN {
        return true;
    }
    let window = info.window;
    if window.is_desktop_or_dock()
        || window.is_fullscreen()
        || !window.flags.contains(WmFlags::REQUIRE_FULLY_ONSCREEN)
        || info.user_action
    {
        return true;
    }
    let region = info.usable_screen_region.clone();
    constrain_to_region(info, &region, check_only)
}

/// How much of a dimension must stay visible, and how much may leave
fn onscreen_amounts(size: i32) -> (i32, i32) {
    let onscreen = (size / 4).clamp(10, 75);
    (onscreen, (size - onscreen).max(0))
}

fn constrain_titlebar_visible(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::TITLEBAR_VISIBLE {
        return true;
    }
    let window = info.window;
    let unconstrained_user_action = info.user_action && !info.frame_action;
    if window.is_desktop_or_dock()
        || window.is_fullscreen()
        || !window.flags.contains(WmFlags::REQUIRE_TITLEBAR_VISIBLE)
        || !window.features.contains(Features::DECORATED)
        || unconstrained_user_action
    {
        return true;
    }

    let (horiz_on, horiz_off) = onscreen_amounts(info.current.width);
    let (mut vert_on, vert_off) = onscreen_amounts(info.current.height);
    let bottom = if window.frame.is_some() {
        vert_on = info.insets.top;
        info.current.height + info.insets.bottom
    } else {
        vert_off
    };

    // The titlebar may touch the bottom but never leave through the top
    let region =
        expand_region_conditionally(&info.usable_screen_region, horiz_off, horiz_off, 0, bottom, horiz_on, vert_on);
    constrain_to_region(info, &region, check_only)
}

fn constrain_partially_onscreen(info: &mut ConstraintInfo<'_>, priority: u8, check_only: bool) -> bool {
    if priority > priority::PARTIALLY_ONSCREEN || info.window.is_desktop_or_dock() {
        return true;
    }

    let (horiz_on, horiz_off) = onscreen_amounts(info.current.width);
    let (mut vert_on, vert_off) = onscreen_amounts(info.current.height);
    let top = vert_off;
    let bottom = if info.window.frame.is_some() {
        vert_on = info.insets.top;
        info.current.height + info.insets.bottom
    } else {
        vert_off
    };

    let region =
        expand_region_conditionally(&info.usable_screen_region, horiz_off, horiz_off, top, bottom, horiz_on, vert_on);
    constrain_to_region(info, &region, check_only)
}
