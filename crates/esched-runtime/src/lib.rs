//! # esched-runtime
//!
//! Work-unit pool and priority scheduler engine: the access-mode-gated
//! pool container, its built-in FIFO implementation, the pool↔scheduler
//! association protocol, and the strict-priority drain loop.

#![allow(dead_code)]

pub mod config;
pub mod fifo;
pub mod pool;
pub mod scheduler;

pub use config::PrioSchedConfig;
pub use fifo::FifoQueue;
pub use pool::{PoolHandle, PoolKind, PoolOps, UnitAdapters, UnitBody};
pub use scheduler::{SchedHandle, SchedHost, SchedKind};
