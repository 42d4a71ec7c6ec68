// Pipeline constants (no magic values)
use std::time::Duration;

/// How long a cancelled probe gets between SIGTERM and SIGKILL (2s)
pub const CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Maximum stderr lines attached to a NonZeroExit error
pub const STDERR_TAIL_LINES: usize = 20;
