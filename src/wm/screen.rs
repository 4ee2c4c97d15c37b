//! Screen Module
//!
//! Monitor layout and work areas. Struts of showing windows shrink the
//! screen work area; each monitor's work area is the monitor clipped to it.

use tracing::{debug, info};

use crate::shared::Rect;
use crate::wm::client_flags::{QueueKind, WmFlags};
use crate::wm::error::trap;
use crate::wm::hints::Strut;
use crate::wm::WindowManagerCore;

#[derive(Debug, Clone)]
pub struct ScreenLayout {
    /// Whole root window
    pub size: Rect,
    pub monitors: Vec<Rect>,
    work_area: Rect,
    monitor_work_areas: Vec<Rect>,
}

impl ScreenLayout {
    /// An empty monitor list means a single monitor covering the screen
    pub fn new(size: Rect, monitors: Vec<Rect>) -> Self {
        let monitors = if monitors.is_empty() { vec![size] } else { monitors };
        let mut layout = Self {
            size,
            monitor_work_areas: monitors.clone(),
            monitors,
            work_area: size,
        };
        layout.recompute(std::iter::empty());
        layout
    }

    pub fn set_monitors(&mut self, size: Rect, monitors: Vec<Rect>) {
        self.size = size;
        self.monitors = if monitors.is_empty() { vec![size] } else { monitors };
    }

    /// Shrink the work areas by every strut
    pub fn recompute(&mut self, struts: impl Iterator<Item = Strut>) {
        let (mut left, mut right, mut top, mut bottom) = (0, 0, 0, 0);
        for strut in struts {
            left = left.max(strut.left);
            right = right.max(strut.right);
            top = top.max(strut.top);
            bottom = bottom.max(strut.bottom);
        }
        self.work_area = Rect::new(
            self.size.x + left,
            self.size.y + top,
            (self.size.width - left - right).max(1),
            (self.size.height - top - bottom).max(1),
        );
        self.monitor_work_areas = self
            .monitors
            .iter()
            .map(|m| m.intersect(&self.work_area).unwrap_or(*m))
            .collect();
        debug!("Work area now {}", self.work_area);
    }

    pub fn work_area(&self) -> Rect {
        self.work_area
    }

    pub fn monitor_work_area(&self, monitor: usize) -> Rect {
        self.monitor_work_areas.get(monitor).copied().unwrap_or(self.work_area)
    }

    pub fn monitor_work_areas(&self) -> &[Rect] {
        &self.monitor_work_areas
    }

    pub fn monitor(&self, monitor: usize) -> Rect {
        self.monitors.get(monitor).copied().unwrap_or(self.size)
    }

    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Monitor with the largest overlap, or the one nearest the centre
    pub fn monitor_for_rect(&self, rect: &Rect) -> usize {
        let best = self
            .monitors
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.intersect(rect).map(|r| (i, r.area())))
            .max_by_key(|(i, area)| (*area, std::cmp::Reverse(*i)));
        if let Some((index, _)) = best {
            return index;
        }
        let (cx, cy) = rect.center();
        self.monitors
            .iter()
            .enumerate()
            .min_by_key(|(_, m)| {
                let (mx, my) = m.center();
                i64::from(mx - cx).pow(2) + i64::from(my - cy).pow(2)
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    pub fn monitor_at_point(&self, x: i32, y: i32) -> Option<usize> {
        self.monitors.iter().position(|m| m.contains_point(x, y))
    }

    /// Rects a window may occupy without leaving the usable screen
    ///
    /// When the monitors tile the screen the whole work area is one more
    /// candidate, so windows may straddle monitors.
    pub fn onscreen_region(&self) -> Vec<Rect> {
        let mut region = self.monitor_work_areas.clone();
        let covered: i64 = self.monitors.iter().map(Rect::area).sum();
        if self.monitors.len() > 1 && covered == self.size.area() {
            region.insert(0, self.work_area);
        }
        region
    }
}

impl WindowManagerCore {
    /// Struts changed: recompute work areas and re-constrain every window
    pub fn invalidate_work_areas(&mut self) {
        let struts: Vec<Strut> = self
            .windows
            .values()
            .filter(|w| w.flags.contains(WmFlags::MAPPED))
            .filter_map(|w| w.strut)
            .collect();
        self.screen.recompute(struts.into_iter());
        info!("Work areas invalidated, screen work area {}", self.screen.work_area());
        trap(
            self.display.set_workarea(self.screen.work_area(), self.settings.workspace_count),
            "workarea",
            0,
        );

        let windows: Vec<u32> = self.windows.keys().copied().collect();
        for window in windows {
            self.queue_window(window, QueueKind::MOVE_RESIZE);
        }
    }

    /// RandR reported a new monitor layout
    pub fn monitors_changed(&mut self, size: Rect, monitors: Vec<Rect>) {
        info!("Screen is now {} with {} monitors", size, monitors.len().max(1));
        self.screen.set_monitors(size, monitors);
        self.invalidate_work_areas();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struts_shrink_work_areas() {
        let mut layout = ScreenLayout::new(
            Rect::new(0, 0, 2560, 1024),
            vec![Rect::new(0, 0, 1280, 1024), Rect::new(1280, 0, 1280, 1024)],
        );
        let panel = Strut { top: 30, ..Default::default() };
        layout.recompute([panel].into_iter());
        assert_eq!(layout.work_area(), Rect::new(0, 30, 2560, 994));
        assert_eq!(layout.monitor_work_area(1), Rect::new(1280, 30, 1280, 994));
    }

    #[test]
    fn rect_belongs_to_monitor_with_most_overlap() {
        let layout = ScreenLayout::new(
            Rect::new(0, 0, 2560, 1024),
            vec![Rect::new(0, 0, 1280, 1024), Rect::new(1280, 0, 1280, 1024)],
        );
        assert_eq!(layout.monitor_for_rect(&Rect::new(1200, 0, 300, 200)), 1);
        assert_eq!(layout.monitor_for_rect(&Rect::new(3000, 0, 100, 100)), 1);
        assert_eq!(layout.monitor_at_point(10, 10), Some(0));
        assert_eq!(layout.monitor_at_point(-5, 10), None);
    }

    #[test]
    fn tiled_monitors_add_the_spanning_work_area() {
        let tiled = ScreenLayout::new(
            Rect::new(0, 0, 2560, 1024),
            vec![Rect::new(0, 0, 1280, 1024), Rect::new(1280, 0, 1280, 1024)],
        );
        assert_eq!(tiled.onscreen_region().len(), 3);
        assert_eq!(tiled.onscreen_region()[0], Rect::new(0, 0, 2560, 1024));

        let gap = ScreenLayout::new(
            Rect::new(0, 0, 2560, 1024),
            vec![Rect::new(0, 0, 1280, 1024), Rect::new(1280, 0, 1280, 768)],
        );
        assert_eq!(gap.onscreen_region().len(), 2);
    }

    #[test]
    fn no_monitors_means_whole_screen() {
        let layout = ScreenLayout::new(Rect::new(0, 0, 800, 600), Vec::new());
        assert_eq!(layout.monitor_count(), 1);
        assert_eq!(layout.monitor_work_area(0), Rect::new(0, 0, 800, 600));
    }
}
