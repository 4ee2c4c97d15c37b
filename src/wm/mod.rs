//! Window Manager Module
//!
//! The window-geometry and state engine. [`WindowManagerCore`] owns every
//! managed window, the deferred queues, the grab and the scheduler, and
//! talks to the outside world only through [`DisplayServer`] and
//! [`Compositor`].

pub mod actions;
pub mod client_flags;
pub mod clock;
pub mod constraints;
pub mod decorations;
pub mod display;
pub mod edge_resistance;
pub mod error;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod grab;
pub mod hints;
pub mod keyboard;
pub mod manage;
pub mod moveresize;
pub mod placement;
pub mod queue;
pub mod scheduler;
pub mod screen;
pub mod settings;
pub mod showing;
pub mod stacking;
pub mod sync;
pub mod window;
pub mod workspace;

#[cfg(test)]
pub mod testing;

use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::compositor::Compositor;
use crate::wm::client_flags::QueueKind;
use crate::wm::clock::Clock;
use crate::wm::decorations::FramePress;
use crate::wm::display::DisplayServer;
use crate::wm::error::trap;
use crate::wm::focus::FocusState;
use crate::wm::grab::GrabState;
use crate::wm::queue::DeferredQueue;
use crate::wm::scheduler::{Scheduler, TimerKind};
use crate::wm::screen::ScreenLayout;
use crate::wm::settings::WmSettings;
use crate::wm::stacking::StackingOrder;
use crate::wm::window::ManagedWindow;
use crate::wm::workspace::Workspaces;

/// All window-manager state, passed explicitly instead of living in globals
pub struct WindowManagerCore {
    pub display: Box<dyn DisplayServer>,
    pub compositor: Box<dyn Compositor>,
    pub clock: Box<dyn Clock>,
    pub settings: WmSettings,

    /// Managed windows by client id
    pub windows: HashMap<u32, ManagedWindow>,
    /// Frame id to client id
    pub frames: HashMap<u32, u32>,

    pub screen: ScreenLayout,
    pub workspaces: Workspaces,
    pub stack: StackingOrder,
    pub focus: FocusState,

    pub move_resize_queue: DeferredQueue,
    pub calc_showing_queue: DeferredQueue,
    pub update_icon_queue: DeferredQueue,
    pub scheduler: Scheduler,

    /// The single interactive move/resize, if one is running
    pub grab: Option<GrabState>,
    /// Last button-1 press on a frame, for buttons and double-clicks
    pub frame_press: Option<FramePress>,

    /// The server keeps a StaticGravity client fixed while its frame moves
    pub static_gravity_works: bool,
}

impl WindowManagerCore {
    pub fn new(
        display: Box<dyn DisplayServer>,
        compositor: Box<dyn Compositor>,
        clock: Box<dyn Clock>,
        settings: WmSettings,
    ) -> Self {
        let screen = ScreenLayout::new(display.screen_rect(), display.monitors());
        info!(
            "Window manager core on {} with {} monitor(s), static gravity {}",
            screen.size,
            screen.monitor_count(),
            if settings.use_static_gravity { "on" } else { "off" }
        );

        let mut core = Self {
            display,
            compositor,
            clock,
            static_gravity_works: settings.use_static_gravity,
            workspaces: Workspaces::new(settings.workspace_count),
            settings,
            windows: HashMap::new(),
            frames: HashMap::new(),
            screen,
            stack: StackingOrder::new(),
            focus: FocusState::default(),
            move_resize_queue: DeferredQueue::new(QueueKind::MOVE_RESIZE),
            calc_showing_queue: DeferredQueue::new(QueueKind::CALC_SHOWING),
            update_icon_queue: DeferredQueue::new(QueueKind::UPDATE_ICON),
            scheduler: Scheduler::new(),
            grab: None,
            frame_press: None,
        };

        let (active, count) = (core.workspaces.active, core.workspaces.count);
        trap(core.display.set_current_desktop(active, count), "current desktop", 0);
        trap(core.display.set_showing_desktop(false), "showing desktop", 0);
        core.invalidate_work_areas();
        core
    }

    pub fn window(&self, window: u32) -> Option<&ManagedWindow> {
        self.windows.get(&window)
    }

    /// Client owning `window`, which may be the client itself or its frame
    pub fn client_for(&self, window: u32) -> Option<u32> {
        if self.windows.contains_key(&window) {
            Some(window)
        } else {
            self.frames.get(&window).copied()
        }
    }

    /// Earliest timer deadline, for the event loop's sleep
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Fire every timeout whose deadline has passed
    pub fn run_timers(&mut self) {
        let now = self.clock.now();
        for (source, kind) in self.scheduler.take_due(now) {
            trace!("Timer {:?} fired", kind);
            match kind {
                TimerKind::ResizeThrottle => self.resize_throttle_fired(source),
                TimerKind::SyncTimeout { window, serial } => self.sync_timed_out(window, serial),
                TimerKind::FinishMinimize(window) => self.finish_minimize(window),
            }
        }
    }

    /// One turn of housekeeping: due timers, then idle flushes
    pub fn dispatch_pending(&mut self) {
        self.run_timers();
        while self.has_pending_idle() {
            self.run_idle();
        }
        trap(self.display.flush(), "flush", 0);
    }

    /// Unmanage everything before exiting
    pub fn shutdown(&mut self) {
        debug!("Shutting down, releasing {} windows", self.windows.len());
        if self.grab.is_some() {
            self.end_grab(self.display.current_time());
        }
        let mut windows: Vec<u32> = self.stack.bottom_to_top().collect();
        windows.extend(self.windows.keys().copied().filter(|w| self.stack.position(*w).is_none()));
        for window in windows {
            self.unmanage_window(window, false);
        }
        trap(self.display.flush(), "flush", 0);
    }
}
