//! # esched - work-unit pool and priority scheduler core
//!
//! A pool is a polymorphic, ref-countable container of work units with a
//! concurrency contract (its [`AccessMode`]); a priority scheduler drains a
//! fixed, ordered list of pools by strict priority. Both are usable
//! standalone with the built-in FIFO pool, or a caller can plug in its own
//! container via [`PoolOps`] and its own ULT/task creation via
//! [`UnitAdapters`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use esched::{AccessMode, PoolHandle, PoolKind, PrioSchedConfig, SchedHandle, SchedKind};
//!
//! let pool = PoolHandle::create_basic(PoolKind::Fifo, AccessMode::Prw)?;
//! pool.push(unit)?;
//!
//! let config = PrioSchedConfig::from_env();
//! let sched = SchedHandle::new(vec![pool], SchedKind::Task, &config)?;
//! sched.run(&host)?;
//! ```

// Re-export core types
pub use esched_core::{AccessMode, CoreError, CoreResult, EsId, Unit, UnitKind};

// Re-export kprint macros for debug logging
pub use esched_core::{kdebug, kerror, kinfo, kprint, kprintln, ktrace, kwarn};
pub use esched_core::kprint::{
    init as init_logging, set_flush_enabled, set_log_level, set_time_enabled, LogLevel,
};

// Re-export env utilities
pub use esched_core::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set};

// Re-export runtime types
pub use esched_runtime::{
    PoolHandle, PoolKind, PoolOps, PrioSchedConfig, SchedHandle, SchedHost, SchedKind,
    UnitAdapters, UnitBody,
};
