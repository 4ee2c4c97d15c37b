//! Settings Module
//!
//! Runtime settings of the core, resolved once from [`Config`]. String
//! choices from the config file become enums here; unknown values fall back
//! to the default with a warning.

use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::shared::FrameInsets;

/// Focus policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    Click,
    Sloppy,
    Mouse,
}

/// How new windows compete for focus with the focused one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusNewWindows {
    Smart,
    /// Never steal focus from a terminal the new window is unrelated to
    Strict,
}

/// Placement policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPolicy {
    /// First free spot, scanning left to right, top to bottom
    Smart,
    Center,
    /// Centred under the pointer
    Mouse,
    /// Trust the position the client asked for, centre otherwise
    RespectPosition,
}

#[derive(Debug, Clone)]
pub struct WmSettings {
    /// Insets of a decorated frame
    pub insets: FrameInsets,
    pub focus_mode: FocusMode,
    pub focus_new_windows: FocusNewWindows,
    pub raise_on_click: bool,
    pub reduced_resources: bool,
    pub animate_minimize: bool,
    pub minimize_animation: Duration,
    pub drag_threshold: i32,
    pub placement: PlacementPolicy,
    pub snap_to_edges: bool,
    pub snap_to_windows: bool,
    pub snap_distance: i32,
    pub sync_enabled: bool,
    pub sync_timeout: Duration,
    /// Minimum spacing between applied resizes without sync
    pub resize_interval: Duration,
    pub workspace_count: u32,
    pub use_static_gravity: bool,
    /// Keyboard move/resize step, and the fine step with Control held
    pub keyboard_step: i32,
    pub keyboard_fine_step: i32,
}

impl WmSettings {
    pub fn from_config(config: &Config) -> Self {
        let border = config.decorations.border_width as i32;
        let titlebar = config.decorations.titlebar_height as i32;
        let per_second = config.sync.max_resizes_per_second.max(1);

        Self {
            insets: FrameInsets::new(border, border, titlebar, border),
            focus_mode: parse_focus_mode(&config.behavior.focus_mode),
            focus_new_windows: parse_focus_new(&config.behavior.focus_new_windows),
            raise_on_click: config.behavior.raise_on_click,
            reduced_resources: config.behavior.reduced_resources,
            animate_minimize: config.behavior.animate_minimize,
            minimize_animation: Duration::from_millis(config.behavior.minimize_animation_ms),
            drag_threshold: config.behavior.drag_threshold.max(1),
            placement: parse_placement(&config.behavior.placement),
            snap_to_edges: config.snapping.snap_to_edges,
            snap_to_windows: config.snapping.snap_to_windows,
            snap_distance: config.snapping.snap_distance.max(0),
            sync_enabled: config.sync.enabled,
            sync_timeout: Duration::from_millis(config.sync.timeout_ms),
            resize_interval: Duration::from_millis(1000 / u64::from(per_second)),
            workspace_count: config.workspaces.count.max(1),
            use_static_gravity: config.server.use_static_gravity,
            keyboard_step: 10,
            keyboard_fine_step: 1,
        }
    }

    /// Vertical drag that shakes a maximized window loose
    pub fn shake_threshold(&self) -> i32 {
        self.drag_threshold * 6
    }
}

impl Default for WmSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn parse_focus_mode(value: &str) -> FocusMode {
    match value {
        "click" => FocusMode::Click,
        "sloppy" => FocusMode::Sloppy,
        "mouse" => FocusMode::Mouse,
        other => {
            warn!("Unknown focus_mode {:?}, using click", other);
            FocusMode::Click
        }
    }
}

fn parse_focus_new(value: &str) -> FocusNewWindows {
    match value {
        "smart" => FocusNewWindows::Smart,
        "strict" => FocusNewWindows::Strict,
        other => {
            warn!("Unknown focus_new_windows {:?}, using smart", other);
            FocusNewWindows::Smart
        }
    }
}

fn parse_placement(value: &str) -> PlacementPolicy {
    match value {
        "smart" => PlacementPolicy::Smart,
        "center" => PlacementPolicy::Center,
        "mouse" => PlacementPolicy::Mouse,
        "respect" => PlacementPolicy::RespectPosition,
        other => {
            warn!("Unknown placement {:?}, using smart", other);
            PlacementPolicy::Smart
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_timings() {
        let settings = WmSettings::default();
        assert_eq!(settings.sync_timeout, Duration::from_millis(1000));
        assert_eq!(settings.resize_interval, Duration::from_millis(40));
        assert_eq!(settings.insets, FrameInsets::new(4, 4, 24, 4));
        assert_eq!(settings.shake_threshold(), 48);
    }

    #[test]
    fn unknown_strings_fall_back() {
        let mut config = Config::default();
        config.behavior.placement = "random".to_string();
        config.behavior.focus_mode = "sloppy".to_string();
        let settings = WmSettings::from_config(&config);
        assert_eq!(settings.placement, PlacementPolicy::Smart);
        assert_eq!(settings.focus_mode, FocusMode::Sloppy);
    }
}
