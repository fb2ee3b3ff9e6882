use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Empirically tuned constants for the synchronization loop.
///
/// Every field has a default, so a settings file only needs to name the values it
/// overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncTuning {
    /// Moves of this many lines or fewer are ignored (deadband)
    pub hysteresis_lines: usize,
    /// How long inbound notifications are discarded after a synthetic move
    pub cooldown_ms: u64,
    /// Re-check period for surfaces without change notification
    pub poll_interval_ms: u64,
    /// Minimum gap between two applications in the same direction
    pub min_apply_interval_ms: u64,
    /// How far past the cursor a heading's source line is searched for
    pub heading_search_window: usize,
    /// Prefix length used when the full heading text is not found verbatim
    pub heading_prefix_chars: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            hysteresis_lines: 3,
            cooldown_ms: 150,
            poll_interval_ms: 150,
            min_apply_interval_ms: 50,
            heading_search_window: 64,
            heading_prefix_chars: 20,
        }
    }
}

impl SyncTuning {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero interval would spin the host's timer loop
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn min_apply_interval(&self) -> Duration {
        Duration::from_millis(self.min_apply_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_keep_defaults() {
        let tuning: SyncTuning = toml::from_str("hysteresis_lines = 5").unwrap();

        assert_eq!(tuning.hysteresis_lines, 5);
        assert_eq!(tuning.cooldown_ms, SyncTuning::default().cooldown_ms);
        assert_eq!(tuning.heading_search_window, 64);
    }

    #[test]
    fn test_zero_poll_interval_is_raised() {
        let tuning = SyncTuning {
            poll_interval_ms: 0,
            ..SyncTuning::default()
        };
        assert_eq!(tuning.poll_interval(), Duration::from_millis(1));
    }
}
