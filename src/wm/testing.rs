//! Test doubles for the core: a display server and compositor that record
//! every request, and a clock that only moves when told to.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::compositor::Compositor;
use crate::shared::{FrameInsets, Gravity, Rect};
use crate::wm::client_flags::{Features, WindowState, WindowType};
use crate::wm::clock::Clock;
use crate::wm::display::{DisplayServer, WindowChanges, WindowInfo};
use crate::wm::hints::size_flags;
use crate::wm::settings::WmSettings;
use crate::wm::WindowManagerCore;

/// Display-server traffic seen by [`RecordingDisplay`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Configure { window: u32, changes: WindowChanges },
    ConfigureNotify { window: u32, rect: Rect, border_width: i32 },
    WinGravity { window: u32, gravity: Gravity },
    SyncRequest { window: u32, serial: u64, time: u32 },
    CreateAlarm { window: u32, counter: u32 },
    CreateFrame { client: u32, frame: u32, rect: Rect },
    DestroyFrame { frame: u32, client: u32 },
    Map(u32),
    Unmap(u32),
    WmState { window: u32, iconic: bool },
    NetWmState { window: u32, state: WindowState },
    FrameExtents { window: u32, insets: FrameInsets },
    Desktop { window: u32, desktop: Option<u32> },
    Focus { window: Option<u32>, time: u32 },
    TakeFocus { window: u32, time: u32 },
    Delete(u32),
    Kill(u32),
    GrabPointer,
    UngrabPointer,
    GrabKeyboard,
    UngrabKeyboard,
    Warp { x: i32, y: i32 },
    Restack(Vec<u32>),
    ActiveWindow(Option<u32>),
    Workarea(Rect),
    CurrentDesktop(u32),
    ShowingDesktop(bool),
}

/// Compositor notifications seen by [`RecordingCompositor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Updates { window: u32, enabled: bool },
    Geometry { window: u32, outer: Rect },
    Move { window: u32, x: i32, y: i32 },
    Map(u32),
    Unmap(u32),
    Minimize(u32),
    Unminimize(u32),
    Maximize(u32),
    Unmaximize(u32),
    Feedback(u32),
    Icon(u32),
}

#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self { now: Rc::new(Cell::new(Instant::now())) }
    }

    pub fn advance(&self, millis: u64) {
        self.now.set(self.now.get() + Duration::from_millis(millis));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// State shared between a [`RecordingDisplay`] and the test holding it
#[derive(Debug, Default)]
pub struct DisplayState {
    pub log: Vec<Request>,
    pub infos: HashMap<u32, WindowInfo>,
    pub pointer: (i32, i32),
    pub time: u32,
    pub refuse_grabs: bool,
    next_id: u32,
}

pub struct RecordingDisplay {
    screen: Rect,
    monitors: Vec<Rect>,
    state: Rc<RefCell<DisplayState>>,
}

impl RecordingDisplay {
    fn record(&self, request: Request) -> Result<()> {
        self.state.borrow_mut().log.push(request);
        Ok(())
    }
}

impl DisplayServer for RecordingDisplay {
    fn screen_rect(&self) -> Rect {
        self.screen
    }

    fn monitors(&self) -> Vec<Rect> {
        self.monitors.clone()
    }

    fn current_time(&self) -> u32 {
        self.state.borrow().time
    }

    fn query_pointer(&self) -> Result<(i32, i32)> {
        Ok(self.state.borrow().pointer)
    }

    fn read_window_info(&self, window: u32) -> Result<WindowInfo> {
        self.state
            .borrow()
            .infos
            .get(&window)
            .cloned()
            .ok_or_else(|| anyhow!("BadWindow 0x{:x}", window))
    }

    fn create_frame(&mut self, client: u32, rect: Rect, _child_x: i32, _child_y: i32) -> Result<u32> {
        let frame = {
            let mut state = self.state.borrow_mut();
            state.next_id += 1;
            0x10_0000 + state.next_id
        };
        self.record(Request::CreateFrame { client, frame, rect })?;
        Ok(frame)
    }

    fn destroy_frame(&mut self, frame: u32, client: u32, _client_rect: Rect) -> Result<()> {
        self.record(Request::DestroyFrame { frame, client })
    }

    fn configure_window(&mut self, window: u32, changes: &WindowChanges) -> Result<()> {
        self.record(Request::Configure { window, changes: *changes })
    }

    fn send_configure_notify(&mut self, window: u32, rect: Rect, border_width: i32) -> Result<()> {
        self.record(Request::ConfigureNotify { window, rect, border_width })
    }

    fn set_win_gravity(&mut self, window: u32, gravity: Gravity) -> Result<()> {
        self.record(Request::WinGravity { window, gravity })
    }

    fn create_sync_alarm(&mut self, window: u32, counter: u32) -> Result<u32> {
        self.record(Request::CreateAlarm { window, counter })?;
        Ok(0x20_0000 + window)
    }

    fn destroy_sync_alarm(&mut self, _window: u32) -> Result<()> {
        Ok(())
    }

    fn send_sync_request(&mut self, window: u32, serial: u64, time: u32) -> Result<()> {
        self.record(Request::SyncRequest { window, serial, time })
    }

    fn map_window(&mut self, window: u32) -> Result<()> {
        self.record(Request::Map(window))
    }

    fn unmap_window(&mut self, window: u32) -> Result<()> {
        self.record(Request::Unmap(window))
    }

    fn set_wm_state(&mut self, window: u32, iconic: bool) -> Result<()> {
        self.record(Request::WmState { window, iconic })
    }

    fn set_net_wm_state(&mut self, window: u32, state: WindowState) -> Result<()> {
        self.record(Request::NetWmState { window, state })
    }

    fn set_allowed_actions(&mut self, _window: u32, _features: Features) -> Result<()> {
        Ok(())
    }

    fn set_frame_extents(&mut self, window: u32, insets: FrameInsets) -> Result<()> {
        self.record(Request::FrameExtents { window, insets })
    }

    fn set_window_desktop(&mut self, window: u32, desktop: Option<u32>) -> Result<()> {
        self.record(Request::Desktop { window, desktop })
    }

    fn set_input_focus(&mut self, window: Option<u32>, time: u32) -> Result<()> {
        self.record(Request::Focus { window, time })
    }

    fn send_take_focus(&mut self, window: u32, time: u32) -> Result<()> {
        self.record(Request::TakeFocus { window, time })
    }

    fn send_delete(&mut self, window: u32, _time: u32) -> Result<()> {
        self.record(Request::Delete(window))
    }

    fn kill_client(&mut self, window: u32) -> Result<()> {
        self.record(Request::Kill(window))
    }

    fn grab_pointer(&mut self, _time: u32) -> Result<bool> {
        self.record(Request::GrabPointer)?;
        Ok(!self.state.borrow().refuse_grabs)
    }

    fn ungrab_pointer(&mut self, _time: u32) -> Result<()> {
        self.record(Request::UngrabPointer)
    }

    fn grab_keyboard(&mut self, _time: u32) -> Result<bool> {
        self.record(Request::GrabKeyboard)?;
        Ok(!self.state.borrow().refuse_grabs)
    }

    fn ungrab_keyboard(&mut self, _time: u32) -> Result<()> {
        self.record(Request::UngrabKeyboard)
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.state.borrow_mut().pointer = (x, y);
        self.record(Request::Warp { x, y })
    }

    fn restack(&mut self, bottom_to_top: &[u32]) -> Result<()> {
        self.record(Request::Restack(bottom_to_top.to_vec()))
    }

    fn set_client_list(&mut self, _clients: &[u32], _stacking: &[u32]) -> Result<()> {
        Ok(())
    }

    fn set_active_window(&mut self, window: Option<u32>) -> Result<()> {
        self.record(Request::ActiveWindow(window))
    }

    fn set_workarea(&mut self, area: Rect, _desktops: u32) -> Result<()> {
        self.record(Request::Workarea(area))
    }

    fn set_current_desktop(&mut self, desktop: u32, _count: u32) -> Result<()> {
        self.record(Request::CurrentDesktop(desktop))
    }

    fn set_showing_desktop(&mut self, showing: bool) -> Result<()> {
        self.record(Request::ShowingDesktop(showing))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct RecordingCompositor {
    log: Rc<RefCell<Vec<Notification>>>,
}

impl Compositor for RecordingCompositor {
    fn set_updates(&mut self, window: u32, enabled: bool) {
        self.log.borrow_mut().push(Notification::Updates { window, enabled });
    }

    fn sync_window_geometry(&mut self, window: u32, outer: Rect) {
        self.log.borrow_mut().push(Notification::Geometry { window, outer });
    }

    fn update_move(&mut self, window: u32, x: i32, y: i32) {
        self.log.borrow_mut().push(Notification::Move { window, x, y });
    }

    fn map_window(&mut self, window: u32) {
        self.log.borrow_mut().push(Notification::Map(window));
    }

    fn unmap_window(&mut self, window: u32) {
        self.log.borrow_mut().push(Notification::Unmap(window));
    }

    fn minimize_window(&mut self, window: u32) {
        self.log.borrow_mut().push(Notification::Minimize(window));
    }

    fn unminimize_window(&mut self, window: u32) {
        self.log.borrow_mut().push(Notification::Unminimize(window));
    }

    fn maximize_window(&mut self, window: u32, _outer: Rect) {
        self.log.borrow_mut().push(Notification::Maximize(window));
    }

    fn unmaximize_window(&mut self, window: u32, _outer: Rect) {
        self.log.borrow_mut().push(Notification::Unmaximize(window));
    }

    fn update_resize_feedback(&mut self, window: u32, outer: Option<Rect>) {
        if outer.is_some() {
            self.log.borrow_mut().push(Notification::Feedback(window));
        }
    }

    fn icon_changed(&mut self, window: u32) {
        self.log.borrow_mut().push(Notification::Icon(window));
    }
}

/// A core wired to recording doubles
pub struct Harness {
    pub core: WindowManagerCore,
    pub clock: ManualClock,
    display: Rc<RefCell<DisplayState>>,
    notifications: Rc<RefCell<Vec<Notification>>>,
    next_window: u32,
}

impl Harness {
    /// 1280x1024 single monitor with default settings
    pub fn new() -> Self {
        Self::with_layout(Rect::new(0, 0, 1280, 1024), Vec::new(), WmSettings::default())
    }

    pub fn with_settings(settings: WmSettings) -> Self {
        Self::with_layout(Rect::new(0, 0, 1280, 1024), Vec::new(), settings)
    }

    pub fn with_layout(screen: Rect, monitors: Vec<Rect>, settings: WmSettings) -> Self {
        let display = Rc::new(RefCell::new(DisplayState { time: 1000, ..Default::default() }));
        let notifications = Rc::new(RefCell::new(Vec::new()));
        let clock = ManualClock::new();
        let core = WindowManagerCore::new(
            Box::new(RecordingDisplay { screen, monitors, state: display.clone() }),
            Box::new(RecordingCompositor { log: notifications.clone() }),
            Box::new(clock.clone()),
            settings,
        );
        Self { core, clock, display, notifications, next_window: 0x400 }
    }

    /// Normal window asking for `rect` with a user-specified position
    pub fn info(&self, rect: Rect) -> WindowInfo {
        let mut normal_hints = vec![0u32; 18];
        normal_hints[0] = size_flags::US_POSITION | size_flags::US_SIZE;
        WindowInfo {
            rect,
            title: "test window".into(),
            class: "Test".into(),
            window_type: WindowType::Normal,
            normal_hints,
            // WM_HINTS with InputHint set and input true
            wm_hints: vec![1, 1, 0, 0, 0, 0, 0, 0, 0],
            delete_window: true,
            ..Default::default()
        }
    }

    /// Register a client window with the fake server and manage it
    pub fn manage(&mut self, info: WindowInfo) -> u32 {
        self.next_window += 1;
        let id = self.next_window;
        self.display.borrow_mut().infos.insert(id, info);
        self.core.manage_window(id, false);
        id
    }

    /// Manage a decorated window and run the idle queues so it is placed
    /// and showing. Its frame's outer corner lands on `rect.x/y`.
    pub fn manage_mapped(&mut self, rect: Rect) -> u32 {
        let info = self.info(rect);
        let id = self.manage(info);
        self.core.run_idle();
        id
    }

    /// Like [`Harness::manage_mapped`] without decorations, so the client
    /// rect is `rect` itself
    pub fn manage_undecorated(&mut self, rect: Rect) -> u32 {
        let mut info = self.info(rect);
        info.motif_hints = vec![1 << 1, 0, 0, 0, 0];
        let id = self.manage(info);
        self.core.run_idle();
        id
    }

    pub fn frame_of(&self, window: u32) -> u32 {
        self.core.windows[&window].toplevel()
    }

    pub fn rect(&self, window: u32) -> Rect {
        self.core.windows[&window].rect
    }

    pub fn set_time(&self, time: u32) {
        self.display.borrow_mut().time = time;
    }

    pub fn set_pointer(&self, x: i32, y: i32) {
        self.display.borrow_mut().pointer = (x, y);
    }

    pub fn refuse_grabs(&self) {
        self.display.borrow_mut().refuse_grabs = true;
    }

    /// Forget the client so further requests about it fail like BadWindow
    pub fn destroy_client(&self, window: u32) {
        self.display.borrow_mut().infos.remove(&window);
    }

    pub fn clear_log(&self) {
        self.display.borrow_mut().log.clear();
        self.notifications.borrow_mut().clear();
    }

    pub fn requests(&self) -> Vec<Request> {
        self.display.borrow().log.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.borrow().clone()
    }

    pub fn count(&self, pred: impl Fn(&Request) -> bool) -> usize {
        self.display.borrow().log.iter().filter(|r| pred(r)).count()
    }

    pub fn configures_of(&self, window: u32) -> Vec<WindowChanges> {
        self.display
            .borrow()
            .log
            .iter()
            .filter_map(|r| match r {
                Request::Configure { window: w, changes } if *w == window => Some(*changes),
                _ => None,
            })
            .collect()
    }
}
