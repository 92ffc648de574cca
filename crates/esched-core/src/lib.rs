//! # esched-core
//!
//! Platform-agnostic types shared by the pool and scheduler engine: handles,
//! access modes, errors, logging, and environment-variable configuration
//! helpers.
//!
//! ## Modules
//!
//! - `id` - `Unit` and `EsId` handle types
//! - `unit` - work-unit kind
//! - `access` - pool access-mode enum
//! - `error` - error types
//! - `spinlock` - internal spinlock primitive
//! - `kprint` - kernel-style debug printing macros
//! - `env` - environment variable utilities

#![allow(dead_code)]

pub mod access;
pub mod env;
pub mod error;
pub mod id;
pub mod kprint;
pub mod spinlock;
pub mod unit;

pub use access::AccessMode;
pub use env::{env_get, env_get_bool, env_get_opt, env_get_str, env_is_set};
pub use error::{CoreError, CoreResult};
pub use id::{EsId, Unit};
pub use spinlock::SpinLock;
pub use unit::UnitKind;
