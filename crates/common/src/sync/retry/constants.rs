// Constants for retry module
use std::time::Duration;

/// Base delay of the fast-retry preset
pub const FAST_RETRY_BASE_DELAY: Duration = Duration::from_secs(10);

/// Delay cap of the fast-retry preset (15 minutes)
pub const FAST_RETRY_MAX_DELAY: Duration = Duration::from_secs(15 * 60);

/// Base delay of the conservative preset
pub const CONSERVATIVE_BASE_DELAY: Duration = Duration::from_secs(30);

/// Delay cap of the conservative preset (6 hours)
pub const CONSERVATIVE_MAX_DELAY: Duration = Duration::from_secs(6 * 60 * 60);

/// Attempt ceiling of the conservative preset
pub const CONSERVATIVE_MAX_ATTEMPTS: u32 = 8;

/// Maximum exponent for exponential backoff calculation to prevent overflow
pub const MAX_BACKOFF_EXPONENT: u32 = 30;

/// Minimum allowed max_attempts value
pub const MIN_MAX_ATTEMPTS: u32 = 1;
