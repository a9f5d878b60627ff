//! Progress lines on stderr, printed only when the run was started with `-v`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static ON: AtomicBool = AtomicBool::new(false);

pub fn set(on: bool) {
    ON.store(on, Ordering::Relaxed);
}

pub fn enabled() -> bool {
    ON.load(Ordering::Relaxed)
}

/// Elapsed seconds, formatted by callers as `{:.3}s`.
pub fn secs(t0: Instant) -> f64 {
    t0.elapsed().as_secs_f64()
}

/// `eprintln!` gated on [`enabled`]. Picked up by the rest of the library
/// through the `#[macro_use]` on its declaration in lib.rs.
macro_rules! vprintln {
    ($($arg:tt)*) => {
        if $crate::verbose::enabled() {
            eprintln!($($arg)*);
        }
    };
}
