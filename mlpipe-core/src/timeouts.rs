//! Shared timeout defaults

use std::time::Duration;

/// Default execution limit for a single component invocation
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default upper bound for waiting on a whole pipeline job
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(2 * 60 * 60);
