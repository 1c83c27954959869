use std::time::Duration;

use crate::config::DeliverySettings;

/// Timing and attempt limits of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Insert attempts on the primary path
    pub local_attempts: u32,
    /// Pause between two primary attempts
    pub local_backoff: Duration,
    /// Pause before the single retry-path attempt
    pub retry_delay: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::from(&DeliverySettings::default())
    }
}

impl From<&DeliverySettings> for DeliveryPolicy {
    fn from(settings: &DeliverySettings) -> Self {
        Self {
            local_attempts: settings.local_attempts.max(1),
            local_backoff: Duration::from_millis(settings.local_backoff_ms),
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
        }
    }
}
