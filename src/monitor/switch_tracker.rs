use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::config::MonitorConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveWindow {
    NoWindow,
    Active(String),
}

/// A genuine change of the active window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchEvent {
    pub previous: Option<String>,
    pub current: String,
    /// Set when this switch completed a distraction streak.
    pub distraction_streak: bool,
}

/// Diagnostic view of the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySession {
    pub active_identity: Option<String>,
    pub switch_count: u32,
    pub window_started_at: DateTime<Utc>,
    pub recent_switches: u32,
}

#[derive(Debug, Clone)]
pub struct SwitchTrackerSettings {
    pub timeframe: Duration,
    pub threshold: u32,
    pub cooldown: Duration,
    pub recent_debounce: Duration,
}

impl From<&MonitorConfig> for SwitchTrackerSettings {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            timeframe: config.switch_timeframe(),
            threshold: config.switch_threshold.max(1),
            cooldown: config.distraction_cooldown(),
            recent_debounce: config.recent_switch_debounce(),
        }
    }
}

/// Detects window changes and bursts of rapid switching.
///
/// Two independent counters live here. The streak counter restarts once the timeframe passes
/// without a switch and raises a distraction streak when it reaches the threshold, at most once
/// per cooldown. The recent-switch counter is a looser diagnostic: debounced, and zeroed
/// externally on its own cadence.
pub struct WindowSwitchTracker {
    settings: SwitchTrackerSettings,
    window: ActiveWindow,
    switch_count: u32,
    window_started_at: DateTime<Utc>,
    window_expires_at: Option<DateTime<Utc>>,
    last_streak_at: Option<DateTime<Utc>>,
    recent_switches: u32,
    last_recent_switch_at: Option<DateTime<Utc>>,
}

impl WindowSwitchTracker {
    pub fn new(settings: SwitchTrackerSettings, moment: DateTime<Utc>) -> Self {
        Self {
            settings,
            window: ActiveWindow::NoWindow,
            switch_count: 0,
            window_started_at: moment,
            window_expires_at: None,
            last_streak_at: None,
            recent_switches: 0,
            last_recent_switch_at: None,
        }
    }

    pub fn current(&self) -> Option<&str> {
        match &self.window {
            ActiveWindow::NoWindow => None,
            ActiveWindow::Active(identity) => Some(identity),
        }
    }

    /// Feeds a normalized identity. Returns `None` unless the active window actually changed.
    /// The first window after [ActiveWindow::NoWindow] is a transition but not a switch, so it
    /// doesn't count towards a streak.
    pub fn register(&mut self, identity: &str, moment: DateTime<Utc>) -> Option<SwitchEvent> {
        if identity.is_empty() || self.current() == Some(identity) {
            return None;
        }

        let next = ActiveWindow::Active(identity.into());
        let previous = match std::mem::replace(&mut self.window, next) {
            ActiveWindow::NoWindow => None,
            ActiveWindow::Active(previous) => Some(previous),
        };

        let Some(previous) = previous else {
            return Some(SwitchEvent {
                previous: None,
                current: identity.into(),
                distraction_streak: false,
            });
        };

        self.count_recent_switch(moment);
        let distraction_streak = self.count_streak_switch(moment);
        debug!(
            "Switched {previous} -> {identity}, {} switches in window",
            self.switch_count
        );

        Some(SwitchEvent {
            previous: Some(previous),
            current: identity.into(),
            distraction_streak,
        })
    }

    fn count_streak_switch(&mut self, moment: DateTime<Utc>) -> bool {
        self.expire_window(moment);
        if self.switch_count == 0 {
            self.window_started_at = moment;
        }
        self.switch_count += 1;
        self.window_expires_at = Some(moment + self.settings.timeframe);

        if self.switch_count < self.settings.threshold {
            return false;
        }
        let cooled_down = self
            .last_streak_at
            .map_or(true, |last| moment - last >= self.settings.cooldown);
        if !cooled_down {
            return false;
        }

        info!("Distraction streak after {} switches", self.switch_count);
        self.last_streak_at = Some(moment);
        self.switch_count = 0;
        self.window_expires_at = None;
        true
    }

    fn count_recent_switch(&mut self, moment: DateTime<Utc>) {
        let debounced = self
            .last_recent_switch_at
            .is_some_and(|last| moment - last < self.settings.recent_debounce);
        if !debounced {
            self.recent_switches += 1;
            self.last_recent_switch_at = Some(moment);
        }
    }

    /// Zeroes the streak counter if the timeframe has run out. Returns whether it did.
    pub fn expire_window(&mut self, moment: DateTime<Utc>) -> bool {
        match self.window_expires_at {
            Some(deadline) if moment >= deadline => {
                self.switch_count = 0;
                self.window_expires_at = None;
                true
            }
            _ => false,
        }
    }

    pub fn reset_recent_switches(&mut self) {
        self.recent_switches = 0;
    }

    pub fn recent_switches(&self) -> u32 {
        self.recent_switches
    }

    #[cfg(test)]
    pub fn switch_count(&self) -> u32 {
        self.switch_count
    }

    /// Forgets everything, including the streak cooldown.
    pub fn reset(&mut self, moment: DateTime<Utc>) {
        *self = Self::new(self.settings.clone(), moment);
    }

    pub fn session(&self) -> ActivitySession {
        ActivitySession {
            active_identity: self.current().map(str::to_string),
            switch_count: self.switch_count,
            window_started_at: self.window_started_at,
            recent_switches: self.recent_switches,
        }
    }
}
