//! Shared value types used by the window manager core and the backends.

pub mod geometry;

pub use geometry::{FrameInsets, Gravity, Rect};
