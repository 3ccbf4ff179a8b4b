use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Rate limits outbound alerts per key and suppresses repeats of the same notification id
/// within a session.
///
/// `last_sent` is a short throttle window keyed by cause, `session_seen` is a one-shot
/// dedupe that holds until explicitly cleared.
pub struct NotificationThrottler {
    window: Duration,
    last_sent: HashMap<String, DateTime<Utc>>,
    session_seen: HashSet<String>,
}

impl NotificationThrottler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: HashMap::new(),
            session_seen: HashSet::new(),
        }
    }

    /// Returns false if `key` fired less than the throttle window ago. Otherwise records
    /// `moment` and returns true.
    pub fn should_send(&mut self, key: &str, moment: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_sent.get(key) {
            if moment - *last < self.window {
                debug!("Throttled {key}");
                return false;
            }
        }
        self.last_sent.insert(key.to_string(), moment);
        true
    }

    pub fn seen_in_session(&self, notification_id: &str) -> bool {
        self.session_seen.contains(notification_id)
    }

    /// Combined gate: the notification id must be new for this session and the key must be
    /// outside its throttle window. Both are recorded when the alert is admitted.
    pub fn admit(&mut self, key: &str, notification_id: &str, moment: DateTime<Utc>) -> bool {
        if self.seen_in_session(notification_id) {
            debug!("Already shown {notification_id} this session");
            return false;
        }
        if !self.should_send(key, moment) {
            return false;
        }
        self.session_seen.insert(notification_id.to_string());
        true
    }

    /// Seeds the session dedupe, e.g. when the host reports the user dismissed it.
    pub fn mark_seen(&mut self, notification_id: &str) {
        self.session_seen.insert(notification_id.to_string());
    }

    /// Lets previously shown notifications resurface. Throttle timestamps are kept.
    pub fn clear_session(&mut self) {
        self.session_seen.clear();
    }

    pub fn reset(&mut self) {
        self.last_sent.clear();
        self.session_seen.clear();
    }
}
