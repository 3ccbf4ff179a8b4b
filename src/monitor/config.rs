use std::path::Path;

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::storage::entities::INITIAL_FOCUS_SCORE;

/// Tunables for the monitor. Every field has a default so a config file only needs to name
/// what it overrides. Durations are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    pub idle_threshold_s: u32,
    pub idle_check_interval_s: u32,
    pub accumulation_interval_s: u32,
    pub switch_timeframe_s: u32,
    pub switch_threshold: u32,
    pub distraction_cooldown_s: u32,
    pub focus_penalty: u32,
    /// Score every day starts with. Streak penalties never take it below zero.
    pub initial_focus_score: u32,
    pub recent_switch_debounce_s: u32,
    pub recent_switch_reset_s: u32,
    pub notification_throttle_s: u32,
    pub persistence_max_age_s: u32,
    /// Appended to the built-in default-exempt identities.
    pub extra_exempt: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            idle_threshold_s: 60,
            idle_check_interval_s: 10,
            accumulation_interval_s: 60,
            switch_timeframe_s: 30,
            switch_threshold: 3,
            distraction_cooldown_s: 180,
            focus_penalty: 5,
            initial_focus_score: INITIAL_FOCUS_SCORE,
            recent_switch_debounce_s: 2,
            recent_switch_reset_s: 5 * 60,
            notification_throttle_s: 2,
            persistence_max_age_s: 24 * 60 * 60,
            extra_exempt: vec![],
        }
    }
}

fn seconds(value: u32) -> Duration {
    Duration::seconds(value.into())
}

fn std_seconds(value: u32) -> std::time::Duration {
    // Zero cadences would spin the event loop.
    std::time::Duration::from_secs(value.max(1).into())
}

impl MonitorConfig {
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn idle_threshold(&self) -> Duration {
        seconds(self.idle_threshold_s)
    }

    pub fn switch_timeframe(&self) -> Duration {
        seconds(self.switch_timeframe_s)
    }

    pub fn distraction_cooldown(&self) -> Duration {
        seconds(self.distraction_cooldown_s)
    }

    pub fn recent_switch_debounce(&self) -> Duration {
        seconds(self.recent_switch_debounce_s)
    }

    pub fn notification_throttle(&self) -> Duration {
        seconds(self.notification_throttle_s)
    }

    pub fn persistence_max_age(&self) -> Duration {
        seconds(self.persistence_max_age_s)
    }

    pub fn idle_check_interval(&self) -> std::time::Duration {
        std_seconds(self.idle_check_interval_s)
    }

    pub fn accumulation_interval(&self) -> std::time::Duration {
        std_seconds(self.accumulation_interval_s)
    }

    pub fn recent_switch_reset_interval(&self) -> std::time::Duration {
        std_seconds(self.recent_switch_reset_s)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use tempfile::NamedTempFile;

    use super::MonitorConfig;

    #[tokio::test]
    async fn test_partial_config_file() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(br#"{"idleThresholdS": 120, "extraExempt": ["Obsidian"]}"#)?;

        let config = MonitorConfig::from_file(file.path()).await?;

        assert_eq!(config.idle_threshold_s, 120);
        assert_eq!(config.extra_exempt, vec!["Obsidian".to_string()]);
        assert_eq!(config.switch_threshold, 3);
        assert_eq!(config.distraction_cooldown_s, 180);
        assert_eq!(config.initial_focus_score, 100);
        Ok(())
    }

    #[test]
    fn test_zero_cadence_is_clamped() {
        let config = MonitorConfig {
            idle_check_interval_s: 0,
            ..Default::default()
        };
        assert_eq!(config.idle_check_interval(), std::time::Duration::from_secs(1));
    }
}
