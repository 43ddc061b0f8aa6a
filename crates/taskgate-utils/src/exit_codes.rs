//! Exit code constants for taskgate.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed; for `check`, the dependency is met |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `DEPENDENCY_NOT_MET` | `check` evaluated the dependency as not met |
//! | 4 | `LOOKUP_FAILED` | Run or backfill lookup failed |
//! | 65 | `INPUT_INVALID` | Input or state file could not be parsed |

/// Process exit code.
///
/// The numeric values are part of the public API.
///
/// ```rust
/// use taskgate_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::DEPENDENCY_NOT_MET.as_i32(), 3);
/// assert_eq!(ExitCode::SUCCESS, ExitCode::from_i32(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// The evaluated dependency is not met
    pub const DEPENDENCY_NOT_MET: ExitCode = ExitCode(3);

    /// A run, backfill or task instance lookup failed
    pub const LOOKUP_FAILED: ExitCode = ExitCode(4);

    /// Malformed input data (EX_DATAERR)
    pub const INPUT_INVALID: ExitCode = ExitCode(65);

    /// Use this with `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::DEPENDENCY_NOT_MET.as_i32(), 3);
        assert_eq!(ExitCode::LOOKUP_FAILED.as_i32(), 4);
        assert_eq!(ExitCode::INPUT_INVALID.as_i32(), 65);
    }

    #[test]
    fn test_conversions() {
        let code: ExitCode = 3.into();
        assert_eq!(code, ExitCode::DEPENDENCY_NOT_MET);
        assert_eq!(i32::from(ExitCode::LOOKUP_FAILED), 4);
    }
}
