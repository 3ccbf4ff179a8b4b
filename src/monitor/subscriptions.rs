//! Listener lists per signal kind. Subscribing replays the latest value synchronously, so a new
//! listener never has to wait for the next tick. Unsubscribing uses the token handed out on
//! subscribe.

use serde::Serialize;

use crate::storage::entities::UsageRecord;

use super::focus_guard::FocusViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

pub type Callback<T> = Box<dyn FnMut(&T) + Send>;

/// Alerts raised by the monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MonitorAlert {
    FocusViolation(FocusViolation),
    #[serde(rename_all = "camelCase")]
    DistractionStreak {
        message: String,
        focus_score: u32,
        distraction_count: u32,
    },
}

struct Signal<T> {
    subscribers: Vec<(SubscriptionToken, Callback<T>)>,
    latest: Option<T>,
}

impl<T> Signal<T> {
    fn new() -> Self {
        Self {
            subscribers: vec![],
            latest: None,
        }
    }

    fn subscribe(&mut self, token: SubscriptionToken, mut callback: Callback<T>) {
        if let Some(latest) = &self.latest {
            callback(latest);
        }
        self.subscribers.push((token, callback));
    }

    fn unsubscribe(&mut self, token: SubscriptionToken) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(t, _)| *t != token);
        before != self.subscribers.len()
    }

    fn publish(&mut self, value: T) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(&value);
        }
        self.latest = Some(value);
    }
}

pub struct SubscriptionRegistry {
    next_token: u64,
    screen_time: Signal<u64>,
    usage: Signal<Vec<UsageRecord>>,
    focus_mode: Signal<bool>,
    alerts: Signal<MonitorAlert>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            next_token: 0,
            screen_time: Signal::new(),
            usage: Signal::new(),
            focus_mode: Signal::new(),
            alerts: Signal::new(),
        }
    }

    fn token(&mut self) -> SubscriptionToken {
        self.next_token += 1;
        SubscriptionToken(self.next_token)
    }

    pub fn subscribe_screen_time(&mut self, callback: Callback<u64>) -> SubscriptionToken {
        let token = self.token();
        self.screen_time.subscribe(token, callback);
        token
    }

    pub fn subscribe_usage(&mut self, callback: Callback<Vec<UsageRecord>>) -> SubscriptionToken {
        let token = self.token();
        self.usage.subscribe(token, callback);
        token
    }

    pub fn subscribe_focus_mode(&mut self, callback: Callback<bool>) -> SubscriptionToken {
        let token = self.token();
        self.focus_mode.subscribe(token, callback);
        token
    }

    /// Replays the most recent alert, if there was one.
    pub fn subscribe_alerts(&mut self, callback: Callback<MonitorAlert>) -> SubscriptionToken {
        let token = self.token();
        self.alerts.subscribe(token, callback);
        token
    }

    pub fn unsubscribe_screen_time(&mut self, token: SubscriptionToken) -> bool {
        self.screen_time.unsubscribe(token)
    }

    pub fn unsubscribe_usage(&mut self, token: SubscriptionToken) -> bool {
        self.usage.unsubscribe(token)
    }

    pub fn unsubscribe_focus_mode(&mut self, token: SubscriptionToken) -> bool {
        self.focus_mode.unsubscribe(token)
    }

    pub fn unsubscribe_alerts(&mut self, token: SubscriptionToken) -> bool {
        self.alerts.unsubscribe(token)
    }

    pub fn publish_screen_time(&mut self, screen_time_ms: u64) {
        self.screen_time.publish(screen_time_ms);
    }

    pub fn publish_usage(&mut self, usage: Vec<UsageRecord>) {
        self.usage.publish(usage);
    }

    pub fn publish_focus_mode(&mut self, enabled: bool) {
        self.focus_mode.publish(enabled);
    }

    pub fn publish_alert(&mut self, alert: MonitorAlert) {
        self.alerts.publish(alert);
    }

    /// Forgets the replay value for alerts, so a new user doesn't see the previous user's.
    pub fn clear_alerts(&mut self) {
        self.alerts.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{Callback, SubscriptionRegistry};

    fn recorder<T: Clone + Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Callback<T>) {
        let values = Arc::new(Mutex::new(vec![]));
        let sink = values.clone();
        (values, Box::new(move |v: &T| sink.lock().unwrap().push(v.clone())))
    }

    #[test]
    fn test_subscribe_replays_latest() {
        let mut registry = SubscriptionRegistry::new();
        registry.publish_screen_time(10);
        registry.publish_screen_time(20);

        let (values, callback) = recorder();
        registry.subscribe_screen_time(callback);

        assert_eq!(*values.lock().unwrap(), vec![20]);
    }

    #[test]
    fn test_no_replay_without_value() {
        let mut registry = SubscriptionRegistry::new();

        let (values, callback) = recorder();
        registry.subscribe_alerts(callback);

        assert!(values.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_by_token() {
        let mut registry = SubscriptionRegistry::new();
        let (first, first_callback) = recorder();
        let (second, second_callback) = recorder();
        let first_token = registry.subscribe_focus_mode(first_callback);
        registry.subscribe_focus_mode(second_callback);

        assert!(registry.unsubscribe_focus_mode(first_token));
        assert!(!registry.unsubscribe_focus_mode(first_token));
        registry.publish_focus_mode(true);

        assert!(first.lock().unwrap().is_empty());
        assert_eq!(*second.lock().unwrap(), vec![true]);
    }

    #[test]
    fn test_tokens_are_scoped_to_signal() {
        let mut registry = SubscriptionRegistry::new();
        let (_, callback) = recorder::<u64>();
        let token = registry.subscribe_screen_time(callback);

        assert!(!registry.unsubscribe_usage(token));
        assert!(registry.unsubscribe_screen_time(token));
    }
}
