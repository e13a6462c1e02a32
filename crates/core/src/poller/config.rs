//! Poller configuration.

use std::time::Duration;

/// Configuration for the job poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// How often to fetch the job record.
    pub poll_interval: Duration,

    /// Wall-clock cap on the whole wait, measured from poll start.
    /// Firing abandons local observation only; the remote job keeps going.
    pub max_wait: Duration,

    /// Completed jobs older than this are assumed garbage-collected; the
    /// poller skips the download and surfaces a manual-retrieval path.
    pub max_artifact_age: chrono::Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_wait: Duration::from_secs(15 * 60),
            max_artifact_age: chrono::Duration::hours(24),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PollerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.max_wait, Duration::from_secs(900));
        assert_eq!(config.max_artifact_age, chrono::Duration::hours(24));
    }
}
