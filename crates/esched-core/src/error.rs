//! Error types for pool and scheduler operations

use core::fmt;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in pool and scheduler operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Memory allocation failed
    Memory,

    /// Pool handle is invalid or refers to a freed pool
    InvalidPool,

    /// Requested pool kind is not supported by `create_basic`
    InvalidPoolKind,

    /// Operation is not permitted under the pool's access mode
    InvalidPoolAccess,

    /// Generic pool-level failure (vtable callback returned an error)
    Pool,

    /// Scheduler handle is invalid, or a scheduler-level operation failed
    Sched,

    /// Unit handle is invalid or does not belong to the pool it was given to
    Unit,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Memory => write!(f, "memory allocation failed"),
            CoreError::InvalidPool => write!(f, "invalid pool handle"),
            CoreError::InvalidPoolKind => write!(f, "invalid or unsupported pool kind"),
            CoreError::InvalidPoolAccess => write!(f, "operation not permitted by pool access mode"),
            CoreError::Pool => write!(f, "pool operation failed"),
            CoreError::Sched => write!(f, "scheduler operation failed"),
            CoreError::Unit => write!(f, "invalid work unit"),
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(format!("{}", CoreError::InvalidPoolAccess), "operation not permitted by pool access mode");
        assert_eq!(format!("{}", CoreError::Memory), "memory allocation failed");
    }

    #[test]
    fn test_error_is_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&CoreError::Pool);
    }
}
