//! Scheduler Module
//!
//! Idle and timeout sources for the single-threaded event loop. The loop
//! runs idle sources whenever no X events are pending, and fires timeouts
//! once their deadline passes. Sources are identified by [`SourceId`] so
//! they can be cancelled before they run.

use std::time::Instant;
use tracing::trace;

use crate::wm::client_flags::QueueKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

/// What a timeout does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Re-apply the latest pointer position of a throttled resize
    ResizeThrottle,
    /// Give up waiting for a `_NET_WM_SYNC_REQUEST` acknowledgement
    SyncTimeout { window: u32, serial: u64 },
    /// Minimize animation finished, unmap the window
    FinishMinimize(u32),
}

impl TimerKind {
    fn window(&self) -> Option<u32> {
        match *self {
            Self::ResizeThrottle => None,
            Self::SyncTimeout { window, .. } | Self::FinishMinimize(window) => Some(window),
        }
    }
}

#[derive(Debug)]
struct Timeout {
    id: SourceId,
    deadline: Instant,
    kind: TimerKind,
}

/// Pending idle and timeout sources
#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    idles: Vec<(SourceId, QueueKind)>,
    timeouts: Vec<Timeout>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> SourceId {
        self.next_id += 1;
        SourceId(self.next_id)
    }

    /// Schedule the flush of one deferred queue
    pub fn add_idle(&mut self, kind: QueueKind) -> SourceId {
        let id = self.allocate();
        trace!("Adding idle {:?} for {} queue", id, kind.name());
        self.idles.push((id, kind));
        id
    }

    pub fn add_timeout(&mut self, deadline: Instant, kind: TimerKind) -> SourceId {
        let id = self.allocate();
        trace!("Adding timeout {:?} ({:?})", id, kind);
        self.timeouts.push(Timeout { id, deadline, kind });
        id
    }

    /// Cancel a source; returns false if it already ran or was removed
    pub fn remove(&mut self, id: SourceId) -> bool {
        let before = self.idles.len() + self.timeouts.len();
        self.idles.retain(|(idle, _)| *idle != id);
        self.timeouts.retain(|timeout| timeout.id != id);
        before != self.idles.len() + self.timeouts.len()
    }

    pub fn contains(&self, id: SourceId) -> bool {
        self.idles.iter().any(|(idle, _)| *idle == id) || self.timeouts.iter().any(|t| t.id == id)
    }

    pub fn has_idle(&self) -> bool {
        !self.idles.is_empty()
    }

    /// Idle sources present right now, in flush priority order
    pub fn idle_snapshot(&self) -> Vec<(SourceId, QueueKind)> {
        let mut snapshot = self.idles.clone();
        snapshot.sort_by_key(|(id, kind)| {
            let rank = QueueKind::FLUSH_ORDER.iter().position(|k| k == kind).unwrap_or(usize::MAX);
            (rank, *id)
        });
        snapshot
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timeouts.iter().map(|t| t.deadline).min()
    }

    /// Remove and return every timeout due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<(SourceId, TimerKind)> {
        let mut due: Vec<Timeout> = Vec::new();
        let mut index = 0;
        while index < self.timeouts.len() {
            if self.timeouts[index].deadline <= now {
                due.push(self.timeouts.swap_remove(index));
            } else {
                index += 1;
            }
        }
        due.sort_by_key(|t| (t.deadline, t.id));
        due.into_iter().map(|t| (t.id, t.kind)).collect()
    }

    pub fn has_timeout(&self, kind: TimerKind) -> bool {
        self.timeouts.iter().any(|t| t.kind == kind)
    }

    /// Drop every timeout that refers to `window`
    pub fn remove_timers_for(&mut self, window: u32) {
        self.timeouts.retain(|t| t.kind.window() != Some(window));
    }
}
