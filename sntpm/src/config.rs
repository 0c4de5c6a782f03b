//! Defaults and constructor configuration
use std::time::Duration;

/// Reply timeout used when none (or an invalid one) is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Longest reply timeout, larger values are capped
pub const MAX_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);
/// Minimum interval between two requests to the same server, in seconds
pub const MIN_POLL_INTERVAL: f64 = 15.0;
/// Largest poll exponent honored from a server, 2^17 s is about 36 hours
pub const MAX_POLL_EXPONENT: i8 = 17;
pub const DEFAULT_NTP_PORT: u16 = 123;
/// Public servers added by [`Manager::add_well_known_servers`](crate::Manager::add_well_known_servers)
pub const WELL_KNOWN_SERVERS: [&str; 3] = [
    "time.apple.com",
    "time.euro.apple.com",
    "time.asia.apple.com",
];

/// Replaces zero, negative or non-finite timeouts with [`DEFAULT_TIMEOUT`]
/// and caps the rest at [`MAX_TIMEOUT`]
#[must_use]
pub fn sanitize_timeout_secs(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs)
            .map_or(MAX_TIMEOUT, sanitize_timeout)
    } else {
        DEFAULT_TIMEOUT
    }
}

#[must_use]
pub fn sanitize_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        DEFAULT_TIMEOUT
    } else {
        timeout.min(MAX_TIMEOUT)
    }
}

/// Per-client settings
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Settings applied to every client a manager creates
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    pub client_timeout: Duration,
    /// Port used by [`Manager::add_well_known_servers`](crate::Manager::add_well_known_servers)
    pub port: u16,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            client_timeout: DEFAULT_TIMEOUT,
            port: DEFAULT_NTP_PORT,
        }
    }
}

impl ManagerConfig {
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: self.client_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_sanitizing() {
        assert_eq!(sanitize_timeout_secs(2.0), Duration::from_secs(2));
        assert_eq!(sanitize_timeout_secs(0.0), DEFAULT_TIMEOUT);
        assert_eq!(sanitize_timeout_secs(-1.0), DEFAULT_TIMEOUT);
        assert_eq!(sanitize_timeout_secs(f64::NAN), DEFAULT_TIMEOUT);
        assert_eq!(sanitize_timeout_secs(f64::INFINITY), DEFAULT_TIMEOUT);
        assert_eq!(sanitize_timeout(Duration::ZERO), DEFAULT_TIMEOUT);
        assert_eq!(
            sanitize_timeout(Duration::from_millis(1)),
            Duration::from_millis(1)
        );
        assert_eq!(sanitize_timeout(Duration::MAX), MAX_TIMEOUT);
        assert_eq!(sanitize_timeout_secs(1e19), MAX_TIMEOUT);
        assert_eq!(sanitize_timeout_secs(f64::MAX), MAX_TIMEOUT);
    }
}
