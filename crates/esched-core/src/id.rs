//! Work-unit and execution-stream identifiers

use core::fmt;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque handle to a work unit held inside a pool.
///
/// A `Unit` is produced by a `UnitAdapters` implementation (esched-runtime)
/// and is meaningful only to that pool; pools and schedulers otherwise treat
/// it as an opaque token to push, pop, and hand off to a host for
/// execution.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Unit(u64);

impl Unit {
    /// Sentinel value indicating no unit (an empty pop, or "no unit" arg)
    pub const NULL: Unit = Unit(u64::MAX);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Unit(raw)
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl From<u64> for Unit {
    #[inline]
    fn from(raw: u64) -> Self {
        Unit(raw)
    }
}

impl From<Unit> for u64 {
    #[inline]
    fn from(u: Unit) -> Self {
        u.0
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Unit(NULL)")
        } else {
            write!(f, "Unit({})", self.0)
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::NULL
    }
}

static NEXT_ES_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT_ES_ID: Cell<u64> = const { Cell::new(0) };
}

/// Identity of the execution stream (the OS thread) driving pool and
/// scheduler calls on the current thread.
///
/// Pools use this to memoize which ES is currently bound as reader or
/// writer (§4.2). It is assigned lazily, on first use, and is stable for
/// the lifetime of the thread.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct EsId(u64);

impl EsId {
    /// Identity of the calling thread, assigning one on first call.
    #[inline]
    pub fn current() -> EsId {
        CURRENT_ES_ID.with(|cell| {
            let existing = cell.get();
            if existing != 0 {
                return EsId(existing);
            }
            let assigned = NEXT_ES_ID.fetch_add(1, Ordering::Relaxed);
            cell.set(assigned);
            EsId(assigned)
        })
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EsId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_basics() {
        let u = Unit::new(42);
        assert_eq!(u.as_u64(), 42);
        assert!(!u.is_null());
    }

    #[test]
    fn test_unit_null() {
        let n = Unit::NULL;
        assert!(n.is_null());
        assert_eq!(Unit::default(), Unit::NULL);
    }

    #[test]
    fn test_unit_conversions() {
        let u: Unit = 7u64.into();
        let raw: u64 = u.into();
        assert_eq!(raw, 7);
    }

    #[test]
    fn test_es_id_stable_per_thread() {
        let a = EsId::current();
        let b = EsId::current();
        assert_eq!(a, b);
    }

    #[test]
    fn test_es_id_distinct_across_threads() {
        let main_id = EsId::current();
        let other_id = std::thread::spawn(EsId::current).join().unwrap();
        assert_ne!(main_id, other_id);
    }
}
