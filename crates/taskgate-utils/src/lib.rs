pub mod canonicalization;
pub mod error;
pub mod exit_codes;
pub mod logging;

pub use canonicalization::emit_jcs;
pub use error::{ConfigError, ErrorCategory, LookupError, TaskgateError, UserFriendlyError};
pub use exit_codes::ExitCode;
pub use logging::{LOG_LEVELS, LogFormat, dep_span, init_tracing};
