use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::classifier::AppCategory;

pub const INITIAL_FOCUS_SCORE: u32 = 100;

/// Accumulated usage of one application for the current day.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub identity: String,
    pub cumulative_time_ms: u64,
    #[serde(default)]
    pub category: AppCategory,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_active_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(identity: String, category: AppCategory, moment: DateTime<Utc>) -> Self {
        Self {
            identity,
            cumulative_time_ms: 0,
            category,
            last_active_at: moment,
        }
    }
}

/// Focus mode policy. `whitelist` always contains the default-exempt identities once it has
/// passed through the guard or the persistence gateway.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FocusPolicy {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub whitelist: BTreeSet<String>,
    #[serde(default = "default_dim", deserialize_with = "lenient_dim::deserialize")]
    pub dim_not_block: bool,
}

impl Default for FocusPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            whitelist: BTreeSet::new(),
            dim_not_block: true,
        }
    }
}

fn default_dim() -> bool {
    true
}

/// Anything that isn't a boolean means dim.
mod lenient_dim {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_bool().unwrap_or(true))
    }
}

/// The persisted unit. One blob per user id.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub screen_time_today_ms: u64,
    #[serde(default)]
    pub usage: Vec<UsageRecord>,
    #[serde(default)]
    pub focus_policy: FocusPolicy,
    /// Focus score, 100 meaning no distraction streaks today.
    #[serde(rename = "distractionScore", default = "initial_focus_score")]
    pub focus_score: u32,
    #[serde(default)]
    pub distraction_count: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub saved_at: DateTime<Utc>,
}

fn initial_focus_score() -> u32 {
    INITIAL_FOCUS_SCORE
}

impl UserState {
    pub fn fresh(user_id: impl Into<String>, moment: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            screen_time_today_ms: 0,
            usage: vec![],
            focus_policy: FocusPolicy::default(),
            focus_score: INITIAL_FOCUS_SCORE,
            distraction_count: 0,
            saved_at: moment,
        }
    }

    /// Drops the day's counters. The focus policy carries over.
    pub fn start_new_day(&mut self, focus_score: u32) {
        self.screen_time_today_ms = 0;
        self.usage.clear();
        self.focus_score = focus_score;
        self.distraction_count = 0;
    }
}
