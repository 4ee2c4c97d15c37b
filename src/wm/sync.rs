//! Sync Module
//!
//! `_NET_WM_SYNC_REQUEST` handshake. Before reconfiguring a client that
//! advertises a sync counter we send it a request carrying a 64-bit serial;
//! the client bumps its XSync counter to that value once it has redrawn at
//! the new geometry, which arrives as an alarm notification. Compositor updates
//! for the window are suspended in between. A client that does not answer
//! within the timeout loses the handshake for the rest of its life.

use std::time::Instant;
use tracing::{debug, warn};

use crate::wm::clock::elapsed_ms;
use crate::wm::error::trap;
use crate::wm::grab::GrabOp;
use crate::wm::scheduler::TimerKind;
use crate::wm::WindowManagerCore;

/// Per-window handshake state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    /// The client's XSync counter, if it advertises one
    pub counter: Option<u32>,
    /// Alarm we created on that counter
    pub alarm: Option<u32>,
    /// Serial of the last request sent
    pub serial: u64,
    /// Time of the outstanding request; `None` when nothing is outstanding
    pub request_time: Option<Instant>,
    /// Set for good once a request timed out
    pub disabled: bool,
}

impl SyncState {
    /// Handshake usable at all
    pub fn is_active(&self) -> bool {
        self.counter.is_some() && !self.disabled
    }

    pub fn is_outstanding(&self) -> bool {
        self.request_time.is_some()
    }

    /// A request can be sent now
    pub fn can_request(&self) -> bool {
        self.is_active() && !self.is_outstanding()
    }
}

/// The 64-bit serial split into the two CARD32 halves of the client message
pub fn split_serial(serial: u64) -> (u32, u32) {
    ((serial & 0xffff_ffff) as u32, (serial >> 32) as u32)
}

impl WindowManagerCore {
    /// Send a sync request ahead of a geometry change
    pub(crate) fn send_sync_request(&mut self, window: u32) {
        let now = self.clock.now();
        let timeout = self.settings.sync_timeout;
        let time = self.display.current_time();
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.sync.counter.is_none() {
            return;
        }

        win.sync.serial += 1;
        win.sync.request_time = Some(now);
        let serial = win.sync.serial;
        debug!("Sending sync request {} to {}", serial, win.desc());

        trap(self.display.send_sync_request(window, serial, time), "sync request", window);
        self.scheduler.add_timeout(now + timeout, TimerKind::SyncTimeout { window, serial });
    }

    /// Look up the window owning a sync alarm
    pub fn window_for_alarm(&self, alarm: u32) -> Option<u32> {
        self.windows
            .values()
            .find(|w| w.sync.alarm == Some(alarm))
            .map(|w| w.id)
    }

    /// The client acknowledged a sync request
    pub fn handle_sync_alarm(&mut self, alarm: u32) {
        let Some(window) = self.window_for_alarm(alarm) else {
            debug!("Alarm 0x{:x} does not belong to a managed window", alarm);
            return;
        };
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        if win.sync.request_time.take().is_none() {
            return;
        }
        debug!("Sync request {} acknowledged by {}", win.sync.serial, win.desc());
        self.compositor.set_updates(window, true);

        let resizing = self
            .grab
            .as_ref()
            .is_some_and(|grab| grab.window == window && grab.op.is_resizing());
        if resizing {
            if let Some((x, y)) = self.grab.as_ref().map(|g| g.latest) {
                self.update_resize(window, x, y, true);
            }
        }
    }

    /// The sync request went unanswered
    pub(crate) fn sync_timed_out(&mut self, window: u32, serial: u64) {
        let now = self.clock.now();
        let Some(win) = self.windows.get_mut(&window) else {
            return;
        };
        // Stale timer for an already acknowledged or superseded request
        if win.sync.serial != serial || !win.sync.is_outstanding() {
            return;
        }
        let waited = win.sync.request_time.map(|t| elapsed_ms(t, now)).unwrap_or_default();
        warn!(
            "{} did not answer sync request {} within {} ms, disabling sync",
            win.desc(),
            serial,
            waited
        );
        win.sync.disabled = true;
        win.sync.request_time = None;
        self.compositor.set_updates(window, true);

        if let Some(grab) = self.grab.as_ref() {
            if grab.window == window && grab.op.is_resizing() {
                let (x, y) = grab.latest;
                self.update_resize(window, x, y, true);
            }
        }
    }

    /// Whether a geometry change should go through the handshake
    pub(crate) fn should_sync(&self, window: u32) -> bool {
        self.settings.sync_enabled
            && self.windows.get(&window).is_some_and(|w| w.sync.can_request())
    }

    /// Current grab op on `window`, if any
    pub(crate) fn grab_op_on(&self, window: u32) -> Option<GrabOp> {
        self.grab.as_ref().filter(|g| g.window == window).map(|g| g.op)
    }
}
