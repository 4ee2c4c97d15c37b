//! Error types for the window manager core
//!
//! Display-server failures are never surfaced through these: they are
//! trapped where the request is issued (see [`trap`]) and bookkeeping goes
//! on optimistically. `WmError` covers misuse of the core itself.

use thiserror::Error;
use tracing::debug;

/// Precondition violations reported by core operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WmError {
    #[error("a grab is already active on window 0x{0:x}")]
    GrabAlreadyActive(u32),

    #[error("window 0x{0:x} is not managed")]
    UnknownWindow(u32),

    #[error("window 0x{0:x} is being unmanaged")]
    Unmanaging(u32),

    #[error("window 0x{0:x} cannot be resized")]
    NotResizable(u32),

    #[error("window 0x{0:x} cannot be moved")]
    NotMovable(u32),

    #[error("no grab is active")]
    NoGrab,
}

pub type WmResult<T> = std::result::Result<T, WmError>;

/// Swallow a display-server error
///
/// The window may have been destroyed by its client at any time, so a failed
/// request is logged and ignored. Real disappearance is handled when the
/// DestroyNotify/UnmapNotify arrives.
pub fn trap<T>(result: anyhow::Result<T>, what: &str, window: u32) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("Ignoring X error during {} on 0x{:x}: {:#}", what, window, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trap_discards_errors() {
        assert_eq!(trap(Ok::<_, anyhow::Error>(3), "noop", 1), Some(3));
        assert_eq!(trap::<()>(Err(anyhow::anyhow!("BadWindow")), "configure", 1), None);
    }

    #[test]
    fn messages_name_the_window() {
        assert_eq!(
            WmError::GrabAlreadyActive(0x2a).to_string(),
            "a grab is already active on window 0x2a"
        );
    }
}
