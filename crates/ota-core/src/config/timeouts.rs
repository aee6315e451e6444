use std::time::Duration;

use serde::Deserialize;

use super::ConfigError;

/// Per-stage receive windows, in milliseconds.
///
/// Every window applies to a single receive and restarts after each accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageTimeouts {
    pub discovery_ms: u64,
    pub validation_ms: u64,
    pub update_ms: u64,
    /// Pause between subscribing to a controller and querying its versions.
    pub subscribe_delay_ms: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            discovery_ms: 5_000,
            validation_ms: 10_000,
            update_ms: 300_000,
            subscribe_delay_ms: 200,
        }
    }
}

impl StageTimeouts {
    #[inline]
    pub fn discovery(&self) -> Duration {
        Duration::from_millis(self.discovery_ms)
    }

    #[inline]
    pub fn validation(&self) -> Duration {
        Duration::from_millis(self.validation_ms)
    }

    #[inline]
    pub fn update(&self) -> Duration {
        Duration::from_millis(self.update_ms)
    }

    #[inline]
    pub fn subscribe_delay(&self) -> Duration {
        Duration::from_millis(self.subscribe_delay_ms)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery_ms == 0 {
            return Err(ConfigError::InvalidTimeout("discovery_ms"));
        }
        if self.validation_ms == 0 {
            return Err(ConfigError::InvalidTimeout("validation_ms"));
        }
        if self.update_ms == 0 {
            return Err(ConfigError::InvalidTimeout("update_ms"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_other_defaults() {
        let t: StageTimeouts = serde_yaml::from_str("update_ms: 1000").unwrap();
        assert_eq!(t.update(), Duration::from_secs(1));
        assert_eq!(t.discovery(), Duration::from_secs(5));
        assert_eq!(t.subscribe_delay(), Duration::from_millis(200));
    }

    #[test]
    fn zero_window_is_rejected() {
        let t = StageTimeouts {
            validation_ms: 0,
            ..StageTimeouts::default()
        };
        assert!(matches!(
            t.validate(),
            Err(ConfigError::InvalidTimeout("validation_ms"))
        ));
    }
}
