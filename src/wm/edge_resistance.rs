//! Edge Resistance Module
//!
//! Snapping during interactive move and resize. Outer edges within the
//! snap distance of a work-area edge, or of another window's edge, are
//! pulled onto it. With the snap modifier held the nearest edge wins at
//! any distance, whatever the snapping settings say.

use tracing::trace;

use crate::shared::{Gravity, Rect};
use crate::wm::WindowManagerCore;

/// Edges a moving window may snap to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapEdges {
    /// Vertical lines (x coordinates)
    pub vertical: Vec<i32>,
    /// Horizontal lines (y coordinates)
    pub horizontal: Vec<i32>,
}

impl SnapEdges {
    pub fn add_rect(&mut self, rect: &Rect) {
        self.vertical.extend([rect.x, rect.right()]);
        self.horizontal.extend([rect.y, rect.bottom()]);
    }

    pub fn is_empty(&self) -> bool {
        self.vertical.is_empty() && self.horizontal.is_empty()
    }
}

/// Closest edge to `value` within `distance`
fn nearest(edges: &[i32], value: i32, distance: i32) -> Option<i32> {
    edges
        .iter()
        .copied()
        .filter(|edge| (edge - value).abs() < distance)
        .min_by_key(|edge| (edge - value).abs())
}

/// Snap a moved outer rect; only its position changes
pub fn snap_move(outer: &Rect, edges: &SnapEdges, distance: i32) -> (i32, i32) {
    let mut x = outer.x;
    let mut y = outer.y;

    let left = nearest(&edges.vertical, outer.x, distance).map(|e| (e, (e - outer.x).abs()));
    let right = nearest(&edges.vertical, outer.right(), distance).map(|e| (e - outer.width, (e - outer.right()).abs()));
    match (left, right) {
        (Some((l, dl)), Some((r, dr))) => x = if dl <= dr { l } else { r },
        (Some((l, _)), None) => x = l,
        (None, Some((r, _))) => x = r,
        (None, None) => {}
    }

    let top = nearest(&edges.horizontal, outer.y, distance).map(|e| (e, (e - outer.y).abs()));
    let bottom =
        nearest(&edges.horizontal, outer.bottom(), distance).map(|e| (e - outer.height, (e - outer.bottom()).abs()));
    match (top, bottom) {
        (Some((t, dt)), Some((b, db))) => y = if dt <= db { t } else { b },
        (Some((t, _)), None) => y = t,
        (None, Some((b, _))) => y = b,
        (None, None) => {}
    }
    (x, y)
}

/// Snap the edges a resize moves; the edges on the gravity side stay put
pub fn snap_resize(outer: &Rect, gravity: Gravity, edges: &SnapEdges, distance: i32) -> Rect {
    let mut rect = *outer;
    let (moves_left, moves_right) = match gravity {
        Gravity::East | Gravity::NorthEast | Gravity::SouthEast => (true, false),
        Gravity::West | Gravity::NorthWest | Gravity::SouthWest => (false, true),
        _ => (false, false),
    };
    let (moves_top, moves_bottom) = match gravity {
        Gravity::South | Gravity::SouthEast | Gravity::SouthWest => (true, false),
        Gravity::North | Gravity::NorthEast | Gravity::NorthWest => (false, true),
        _ => (false, false),
    };

    if moves_left {
        if let Some(edge) = nearest(&edges.vertical, rect.x, distance) {
            rect.width += rect.x - edge;
            rect.x = edge;
        }
    }
    if moves_right {
        if let Some(edge) = nearest(&edges.vertical, rect.right(), distance) {
            rect.width = edge - rect.x;
        }
    }
    if moves_top {
        if let Some(edge) = nearest(&edges.horizontal, rect.y, distance) {
            rect.height += rect.y - edge;
            rect.y = edge;
        }
    }
    if moves_bottom {
        if let Some(edge) = nearest(&edges.horizontal, rect.bottom(), distance) {
            rect.height = edge - rect.y;
        }
    }
    rect.width = rect.width.max(1);
    rect.height = rect.height.max(1);
    rect
}

impl WindowManagerCore {
    /// Edges `window` may snap to, per the snapping settings unless `snap`
    fn snap_edges_for(&self, window: u32, snap: bool) -> SnapEdges {
        let mut edges = SnapEdges::default();
        if snap || self.settings.snap_to_edges {
            for area in self.screen.monitor_work_areas() {
                edges.add_rect(area);
            }
            edges.add_rect(&self.screen.work_area());
        }
        if snap || self.settings.snap_to_windows {
            let active = self.workspaces.active;
            for other in self.windows.values() {
                if other.id == window || !self.located_on_workspace(other, active) {
                    continue;
                }
                if self.showing_on_its_workspace(other) && !other.is_desktop_or_dock() {
                    edges.add_rect(&other.outer_rect());
                }
            }
        }
        edges
    }

    /// Snap distance in effect, `None` when snapping is off
    fn snap_distance(&self, snap: bool) -> Option<i32> {
        match (snap, self.settings.snap_distance) {
            (true, _) => Some(i32::MAX),
            (false, distance) if distance > 0 => Some(distance),
            _ => None,
        }
    }

    /// Snap an interactive move; `client` is the proposed client rect
    pub(crate) fn apply_edge_resistance_move(&self, window: u32, client: Rect, snap: bool) -> Rect {
        let Some(win) = self.windows.get(&window) else {
            return client;
        };
        let Some(distance) = self.snap_distance(snap) else {
            return client;
        };
        let edges = self.snap_edges_for(window, snap);
        if edges.is_empty() {
            return client;
        }
        let outer = match win.insets() {
            Some(insets) => client.expand_by(insets),
            None => client,
        };
        let (x, y) = snap_move(&outer, &edges, distance);
        if (x, y) != (outer.x, outer.y) {
            trace!("Snapped {} to {},{}", win.desc(), x, y);
        }
        Rect::new(client.x + x - outer.x, client.y + y - outer.y, client.width, client.height)
    }

    /// Snap an interactive resize anchored at `gravity`
    pub(crate) fn apply_edge_resistance_resize(&self, window: u32, client: Rect, gravity: Gravity, snap: bool) -> Rect {
        let Some(win) = self.windows.get(&window) else {
            return client;
        };
        let Some(distance) = self.snap_distance(snap) else {
            return client;
        };
        let edges = self.snap_edges_for(window, snap);
        if edges.is_empty() {
            return client;
        }
        match win.insets() {
            Some(insets) => snap_resize(&client.expand_by(insets), gravity, &edges, distance).shrink_by(insets),
            None => snap_resize(&client, gravity, &edges, distance),
        }
    }
}
