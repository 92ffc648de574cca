//! Pool access mode

use core::fmt;

/// Concurrency contract a pool's container promises to its callers.
///
/// The first letter names the reader discipline (who may `pop`/`remove`),
/// the second the writer discipline (who may `push`): `PR`/`SR` for
/// private/shared reader, `PW`/`SW` for private/shared writer. `PRW` is
/// shorthand for a single ES acting as both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    /// Single ES reads and writes.
    Prw,
    /// Single reader ES, single writer ES (may differ).
    PrPw,
    /// Single reader ES, any number of writer ESs.
    PrSw,
    /// Any number of reader ESs, single writer ES.
    SrPw,
    /// Any number of reader and writer ESs.
    SrSw,
}

impl AccessMode {
    /// Whether this mode binds a single ES as reader.
    #[inline]
    pub const fn has_private_reader(self) -> bool {
        matches!(self, AccessMode::Prw | AccessMode::PrPw | AccessMode::PrSw)
    }

    /// Whether this mode binds a single ES as writer.
    #[inline]
    pub const fn has_private_writer(self) -> bool {
        matches!(self, AccessMode::Prw | AccessMode::PrPw | AccessMode::SrPw)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessMode::Prw => "PRW",
            AccessMode::PrPw => "PR_PW",
            AccessMode::PrSw => "PR_SW",
            AccessMode::SrPw => "SR_PW",
            AccessMode::SrSw => "SR_SW",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_reader_modes() {
        assert!(AccessMode::Prw.has_private_reader());
        assert!(AccessMode::PrPw.has_private_reader());
        assert!(AccessMode::PrSw.has_private_reader());
        assert!(!AccessMode::SrPw.has_private_reader());
        assert!(!AccessMode::SrSw.has_private_reader());
    }

    #[test]
    fn test_private_writer_modes() {
        assert!(AccessMode::Prw.has_private_writer());
        assert!(AccessMode::PrPw.has_private_writer());
        assert!(AccessMode::SrPw.has_private_writer());
        assert!(!AccessMode::PrSw.has_private_writer());
        assert!(!AccessMode::SrSw.has_private_writer());
    }

    #[test]
    fn test_display() {
        assert_eq!(AccessMode::Prw.to_string(), "PRW");
        assert_eq!(AccessMode::SrSw.to_string(), "SR_SW");
    }
}
