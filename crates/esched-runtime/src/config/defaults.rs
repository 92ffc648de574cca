//! Compile-time defaults for [`super::PrioSchedConfig`].

/// Work units dispatched between housekeeping passes (`has_to_stop` /
/// `check_events`).
pub const EVENT_FREQ: u32 = 50;

/// Nanoseconds to sleep when a drain pass finds no work, before the next
/// housekeeping check. `0` disables the sleep.
pub const SLEEP_NS: u64 = 100;
