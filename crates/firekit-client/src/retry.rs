//! Retry policy: exponential backoff with jitter.
//!
//! Delay for a 1-based attempt is `min(base * 2^(attempt-1), 60s)` plus a
//! uniform jitter in `[0, 0.1 * delay]`. The jitter source is subsecond clock
//! noise, which keeps the crate free of a `rand` dependency.

use std::time::Duration;

/// Hard cap on any single backoff delay.
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let base_delay_ms: u64 = std::env::var("FIREKIT_RETRY_BASE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1000);

        let max_retries: u32 = std::env::var("FIREKIT_MAX_RETRIES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
        }
    }
}

/// Compute the delay before the given retry attempt (1-based).
///
/// Never returns a zero duration for attempt ≥ 1 and a positive base.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    let exp_delay = base.saturating_mul(2u32.saturating_pow(exponent));
    let capped = exp_delay.min(MAX_DELAY);

    capped + jitter(capped)
}

/// Uniform jitter in `[0, 0.1 * delay]` from subsecond clock noise.
fn jitter(delay: Duration) -> Duration {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let random_factor = (nanos % 1000) as f64 / 1000.0;
    delay.mul_f64(0.1 * random_factor)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_grows_exponentially_within_bounds() {
        let base = Duration::from_secs(1);
        for attempt in 1..=6u32 {
            let expected = Duration::from_secs(1u64 << (attempt - 1)).min(MAX_DELAY);
            let delay = backoff_delay(attempt, base);
            assert!(delay >= expected, "attempt {}: {:?} < {:?}", attempt, delay, expected);
            assert!(
                delay <= expected.mul_f64(1.1),
                "attempt {}: {:?} exceeds jitter bound",
                attempt,
                delay
            );
        }
    }

    #[test]
    fn test_backoff_never_zero() {
        assert!(backoff_delay(1, Duration::from_millis(1)) > Duration::ZERO);
        assert!(backoff_delay(1, Duration::from_secs(1)) > Duration::ZERO);
    }

    #[test]
    fn test_backoff_caps_at_max_delay() {
        let delay = backoff_delay(30, Duration::from_secs(5));
        assert!(delay <= MAX_DELAY.mul_f64(1.1));
        assert!(delay >= MAX_DELAY);
    }

    #[test]
    fn test_backoff_with_subsecond_base() {
        let delay = backoff_delay(3, Duration::from_millis(250));
        assert!(delay >= Duration::from_secs(1));
        assert!(delay <= Duration::from_secs(1).mul_f64(1.1));
    }
}
