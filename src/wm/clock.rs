//! Monotonic time source
//!
//! Throttling and sync timeouts read the time through [`Clock`] so that
//! tests can drive them with a manual clock.

use std::time::Instant;

pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock used by the real event loop
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Milliseconds elapsed from `earlier` to `later`, negative if the clock
/// went backwards relative to `earlier`
pub fn elapsed_ms(earlier: Instant, later: Instant) -> i64 {
    if later >= earlier {
        i64::try_from(later.duration_since(earlier).as_millis()).unwrap_or(i64::MAX)
    } else {
        -i64::try_from(earlier.duration_since(later).as_millis()).unwrap_or(i64::MAX)
    }
}
