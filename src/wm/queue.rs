//! Deferred Queues
//!
//! Move/resize, calc-showing and icon updates are batched per window and
//! flushed from an idle source. Each queue is double-buffered: a flush
//! swaps the pending buffer out before touching any window, so a window
//! queued while the flush runs lands in the fresh buffer and is handled by
//! the next flush, exactly once.

use tracing::{debug, trace};

use crate::wm::client_flags::{QueueKind, WmFlags};
use crate::wm::scheduler::SourceId;
use crate::wm::WindowManagerCore;

/// Ordered, deduplicated set of windows waiting for one idle flush
#[derive(Debug)]
pub struct DeferredQueue {
    kind: QueueKind,
    pending: Vec<u32>,
    /// Spare buffer handed out by `begin_flush`
    draining: Vec<u32>,
    source: Option<SourceId>,
}

impl DeferredQueue {
    pub fn new(kind: QueueKind) -> Self {
        Self { kind, pending: Vec::new(), draining: Vec::new(), source: None }
    }

    pub fn kind(&self) -> QueueKind {
        self.kind
    }

    pub fn source(&self) -> Option<SourceId> {
        self.source
    }

    pub fn set_source(&mut self, source: SourceId) {
        self.source = Some(source);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn contains(&self, window: u32) -> bool {
        self.pending.contains(&window)
    }

    /// Newest entries go first, like the list the flush walks
    pub fn push_front(&mut self, window: u32) {
        debug_assert!(!self.pending.contains(&window));
        self.pending.insert(0, window);
    }

    /// Remove `window`; returns the idle source to cancel if the queue drained
    pub fn remove(&mut self, window: u32) -> Option<SourceId> {
        self.pending.retain(|&w| w != window);
        if self.pending.is_empty() {
            self.source.take()
        } else {
            None
        }
    }

    /// Swap the buffers and detach the idle source
    pub fn begin_flush(&mut self) -> Vec<u32> {
        self.source = None;
        let spare = std::mem::take(&mut self.draining);
        std::mem::replace(&mut self.pending, spare)
    }

    /// Hand the drained buffer back for reuse
    pub fn end_flush(&mut self, mut batch: Vec<u32>) {
        batch.clear();
        if self.draining.capacity() < batch.capacity() {
            self.draining = batch;
        }
    }
}

impl WindowManagerCore {
    fn queue_mut(&mut self, kind: QueueKind) -> &mut DeferredQueue {
        if kind == QueueKind::MOVE_RESIZE {
            &mut self.move_resize_queue
        } else if kind == QueueKind::CALC_SHOWING {
            &mut self.calc_showing_queue
        } else {
            &mut self.update_icon_queue
        }
    }

    /// Add `window` to each queue named in `kinds`
    pub fn queue_window(&mut self, window: u32, kinds: QueueKind) {
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.flags.contains(WmFlags::UNMANAGING) {
            return;
        }
        let mut added = QueueKind::empty();
        for kind in QueueKind::FLUSH_ORDER {
            if kinds.contains(kind) && !win.queued.contains(kind) {
                win.queued |= kind;
                added |= kind;
            }
        }
        for kind in QueueKind::FLUSH_ORDER {
            if !added.contains(kind) {
                continue;
            }
            trace!("Queueing 0x{:x} for {}", window, kind.name());
            self.queue_mut(kind).push_front(window);
            if self.queue_mut(kind).source().is_none() {
                let source = self.scheduler.add_idle(kind);
                self.queue_mut(kind).set_source(source);
            }
        }
    }

    /// Drop `window` from each queue named in `kinds`
    pub fn unqueue_window(&mut self, window: u32, kinds: QueueKind) {
        for kind in QueueKind::FLUSH_ORDER {
            if !kinds.contains(kind) {
                continue;
            }
            let queued = self
                .windows
                .get_mut(&window)
                .map(|w| {
                    let was = w.queued.contains(kind);
                    w.queued.remove(kind);
                    was
                })
                .unwrap_or(true);
            if !queued {
                continue;
            }
            if let Some(source) = self.queue_mut(kind).remove(window) {
                self.scheduler.remove(source);
            }
        }
    }

    /// Run every idle source that exists right now
    ///
    /// Sources added while flushing wait for the next call.
    pub fn run_idle(&mut self) {
        for (source, kind) in self.scheduler.idle_snapshot() {
            if !self.scheduler.remove(source) {
                continue;
            }
            self.flush_queue(kind);
        }
    }

    pub fn has_pending_idle(&self) -> bool {
        self.scheduler.has_idle()
    }

    fn flush_queue(&mut self, kind: QueueKind) {
        let batch = self.queue_mut(kind).begin_flush();
        debug!("Flushing {} queue ({} windows)", kind.name(), batch.len());

        // Clear the flags first so that re-queues during the flush are kept
        for &window in &batch {
            if let Some(win) = self.windows.get_mut(&window) {
                win.queued.remove(kind);
            }
        }

        if kind == QueueKind::MOVE_RESIZE {
            self.flush_move_resize(&batch);
        } else if kind == QueueKind::CALC_SHOWING {
            self.flush_calc_showing(&batch);
        } else {
            self.flush_update_icon(&batch);
        }

        self.queue_mut(kind).end_flush(batch);
    }

    /// Whether `window` from the current batch should be handled now
    ///
    /// Windows unmanaged earlier in the flush are gone. Windows queued again
    /// wait in the fresh buffer and run next flush instead.
    fn runs_in_this_flush(&self, window: u32, kind: QueueKind) -> bool {
        self.windows.get(&window).is_some_and(|w| !w.queued.contains(kind))
    }

    fn flush_move_resize(&mut self, batch: &[u32]) {
        for &window in batch {
            if self.runs_in_this_flush(window, QueueKind::MOVE_RESIZE) {
                self.move_resize_now(window);
            }
        }
    }

    fn flush_calc_showing(&mut self, batch: &[u32]) {
        let mut unplaced = Vec::new();
        let mut should_show = Vec::new();
        let mut should_hide = Vec::new();

        for &window in batch {
            let Some(win) = self.windows.get(&window) else {
                continue;
            };
            if !win.flags.contains(WmFlags::PLACED) {
                unplaced.push(window);
            } else if self.should_be_showing(window) {
                should_show.push(window);
            } else {
                should_hide.push(window);
            }
        }

        // Unplaced windows map bottom to top so placement sees the ones below;
        // otherwise map top to bottom and unmap bottom to top
        unplaced.sort_by(|a, b| self.stack.windows_cmp(*a, *b));
        should_hide.sort_by(|a, b| self.stack.windows_cmp(*a, *b));
        should_show.sort_by(|a, b| self.stack.windows_cmp(*b, *a));

        for window in unplaced {
            if self.runs_in_this_flush(window, QueueKind::CALC_SHOWING) {
                self.calc_showing(window);
            }
        }
        for window in should_show {
            if self.runs_in_this_flush(window, QueueKind::CALC_SHOWING) {
                self.implement_showing(window, true);
            }
        }
        for window in should_hide {
            if self.runs_in_this_flush(window, QueueKind::CALC_SHOWING) {
                self.implement_showing(window, false);
            }
        }
    }

    fn flush_update_icon(&mut self, batch: &[u32]) {
        for &window in batch {
            if self.runs_in_this_flush(window, QueueKind::UPDATE_ICON) {
                self.compositor.icon_changed(window);
            }
        }
    }

    /// Apply a pending calc-showing for `window` right away
    pub fn flush_calc_showing_for(&mut self, window: u32) {
        let queued = self
            .windows
            .get(&window)
            .is_some_and(|w| w.queued.contains(QueueKind::CALC_SHOWING));
        if queued {
            self.unqueue_window(window, QueueKind::CALC_SHOWING);
            self.calc_showing(window);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Rect;
    use crate::wm::testing::{Harness, Request};

    #[test]
    fn buffers_swap_on_flush() {
        let mut queue = DeferredQueue::new(QueueKind::MOVE_RESIZE);
        queue.push_front(1);
        queue.push_front(2);
        let batch = queue.begin_flush();
        assert_eq!(batch, vec![2, 1]);
        assert!(queue.is_empty());
        queue.push_front(3);
        queue.end_flush(batch);
        assert!(queue.contains(3));
    }

    #[test]
    fn removing_last_entry_returns_source() {
        let mut queue = DeferredQueue::new(QueueKind::CALC_SHOWING);
        let mut scheduler = crate::wm::scheduler::Scheduler::new();
        let source = scheduler.add_idle(QueueKind::CALC_SHOWING);
        queue.set_source(source);
        queue.push_front(1);
        queue.push_front(2);
        assert_eq!(queue.remove(1), None);
        assert_eq!(queue.remove(2), Some(source));
        assert_eq!(queue.source(), None);
    }

    #[test]
    fn repeated_enqueue_configures_once() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        if let Some(w) = h.core.windows.get_mut(&id) {
            w.user_rect = Rect::new(124, 154, 300, 200);
        }
        let frame = h.frame_of(id);
        h.clear_log();

        for _ in 0..5 {
            h.core.queue_window(id, QueueKind::MOVE_RESIZE);
        }
        assert_eq!(h.core.move_resize_queue.len(), 1);
        h.core.run_idle();

        let configures = h.count(|r| matches!(r, Request::Configure { window, .. } if *window == frame));
        assert_eq!(configures, 1);
        assert!(!h.core.has_pending_idle());
    }

    #[test]
    fn requeue_during_flush_waits_for_next_flush() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(100, 100, 300, 200));
        h.core.queue_window(id, QueueKind::MOVE_RESIZE);

        let batch = h.core.move_resize_queue.begin_flush();
        for &w in &batch {
            if let Some(win) = h.core.windows.get_mut(&w) {
                win.queued.remove(QueueKind::MOVE_RESIZE);
            }
        }
        // Something queues the window again mid-flush
        h.core.queue_window(id, QueueKind::MOVE_RESIZE);
        assert_eq!(batch, vec![id]);
        assert!(h.core.move_resize_queue.contains(id));
        assert!(h.core.move_resize_queue.source().is_some());
        h.core.move_resize_queue.end_flush(batch);
    }

    #[test]
    fn window_queued_again_mid_flush_is_configured_once() {
        let mut h = Harness::new();
        let a = h.manage_mapped(Rect::new(100, 100, 300, 200));
        let b = h.manage_mapped(Rect::new(500, 100, 300, 200));
        h.core.run_idle();
        for (id, x) in [(a, 124), (b, 524)] {
            if let Some(w) = h.core.windows.get_mut(&id) {
                w.user_rect = Rect::new(x, 154, 300, 200);
            }
        }
        let (frame_a, frame_b) = (h.frame_of(a), h.frame_of(b));
        h.clear_log();

        h.core.queue_window(a, QueueKind::MOVE_RESIZE);
        h.core.queue_window(b, QueueKind::MOVE_RESIZE);
        let batch = h.core.move_resize_queue.begin_flush();
        for &w in &batch {
            if let Some(win) = h.core.windows.get_mut(&w) {
                win.queued.remove(QueueKind::MOVE_RESIZE);
            }
        }
        h.core.queue_window(b, QueueKind::MOVE_RESIZE);
        h.core.flush_move_resize(&batch);
        h.core.move_resize_queue.end_flush(batch);

        assert_eq!(h.configures_of(frame_a).len(), 1);
        assert!(h.configures_of(frame_b).is_empty());

        h.core.run_idle();
        assert_eq!(h.configures_of(frame_b).len(), 1);
        assert!(h.core.move_resize_queue.is_empty());
    }

    #[test]
    fn unqueue_cancels_idle_when_empty() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(0, 0, 100, 100));
        h.core.run_idle();
        h.core.queue_window(id, QueueKind::CALC_SHOWING);
        assert!(h.core.has_pending_idle());
        h.core.unqueue_window(id, QueueKind::CALC_SHOWING);
        assert!(!h.core.has_pending_idle());
    }

    #[test]
    fn unmanaging_windows_are_not_queued() {
        let mut h = Harness::new();
        let id = h.manage_mapped(Rect::new(0, 0, 100, 100));
        h.core.run_idle();
        if let Some(w) = h.core.windows.get_mut(&id) {
            w.flags.insert(WmFlags::UNMANAGING);
        }
        h.core.queue_window(id, QueueKind::MOVE_RESIZE);
        assert!(h.core.move_resize_queue.is_empty());
    }
}
