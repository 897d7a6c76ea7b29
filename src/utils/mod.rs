//! Ambient utility library
//!
//! Small, self-contained helpers the original ships as standalone
//! `core`/`net` libraries (`Random`, `Checksum`, `compression.h`) and
//! that the Lua host table and gateway both depend on.

pub mod checksum;
pub mod compress;
pub mod random;
pub mod strings;

use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic-ish tick counter matching `qsf_tickcount`'s unit
/// (hundred-microsecond ticks, i.e. `getNowTickCount() / 100_000`).
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn tickcount() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (now.as_nanos() / 100_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickcount_is_nonzero_and_monotonic_enough() {
        let first = tickcount();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let second = tickcount();
        assert!(first > 0);
        assert!(second >= first);
    }
}
