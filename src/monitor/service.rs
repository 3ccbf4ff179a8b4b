use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    host::{
        events::ActivityEvent,
        notification::{NotificationRequest, NotificationSink},
    },
    storage::{
        entities::{FocusPolicy, UsageRecord, UserState},
        gateway::PersistenceGateway,
        store::KeyValueStore,
    },
    utils::{clock::Clock, time::is_before_today},
};

use super::{
    accumulator::ScreenTimeAccumulator,
    activity_clock::ActivityClock,
    config::MonitorConfig,
    focus_guard::{FocusModeGuard, FocusVerdict, FocusViolation},
    ledger::AppUsageLedger,
    normalizer::normalize_identity,
    scheduler::DailyResetScheduler,
    subscriptions::{Callback, MonitorAlert, SubscriptionRegistry, SubscriptionToken},
    switch_tracker::{ActivitySession, SwitchEvent, WindowSwitchTracker},
    throttler::NotificationThrottler,
    whitelist::DEFAULT_EXEMPT,
};

const FOCUS_NOTIFICATION_TITLE: &str = "Focus mode";
const DISTRACTION_NOTIFICATION_TITLE: &str = "Distraction alert";
const DISTRACTION_NOTIFICATION_ID: &str = "distraction-streak";
const DISTRACTION_THROTTLE_KEY: &str = "distraction-streak";

fn violation_throttle_key(identity: &str) -> String {
    format!("violation:{identity}")
}

fn violation_notification_id(identity: &str) -> String {
    format!("focus-violation-{identity}")
}

/// Per-user aggregate. Swapped wholesale when the active user changes.
struct UserSession {
    user_id: String,
    screen_time_today_ms: u64,
    ledger: AppUsageLedger,
    guard: FocusModeGuard,
    focus_score: u32,
    distraction_count: u32,
}

impl UserSession {
    fn from_state(state: UserState, default_exempt: Vec<String>, max_score: u32) -> Self {
        Self {
            user_id: state.user_id,
            screen_time_today_ms: state.screen_time_today_ms,
            ledger: AppUsageLedger::from_records(state.usage),
            guard: FocusModeGuard::new(state.focus_policy, default_exempt),
            focus_score: state.focus_score.min(max_score),
            distraction_count: state.distraction_count,
        }
    }

    fn capture(&self, moment: DateTime<Utc>) -> UserState {
        UserState {
            user_id: self.user_id.clone(),
            screen_time_today_ms: self.screen_time_today_ms,
            usage: self.ledger.snapshot(),
            focus_policy: self.guard.policy().clone(),
            focus_score: self.focus_score,
            distraction_count: self.distraction_count,
            saved_at: moment,
        }
    }
}

/// Point in time view of everything the monitor knows about the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSnapshot {
    pub user_id: String,
    pub screen_time_today_ms: u64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity_at: DateTime<Utc>,
    pub usage: Vec<UsageRecord>,
    pub focus_policy: FocusPolicy,
    pub focus_score: u32,
    pub distraction_count: u32,
    pub session: ActivitySession,
    pub idle: bool,
}

/// The single authority over one user's monitoring state. Every mutation goes through here,
/// timers included, so nothing can interleave a partial update.
pub struct MonitoringService<S: KeyValueStore> {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    gateway: PersistenceGateway<S>,
    sink: Box<dyn NotificationSink>,
    default_exempt: Vec<String>,
    session: UserSession,
    tracker: WindowSwitchTracker,
    activity: ActivityClock,
    accumulator: ScreenTimeAccumulator,
    throttler: NotificationThrottler,
    scheduler: DailyResetScheduler,
    subscriptions: SubscriptionRegistry,
}

impl<S: KeyValueStore> MonitoringService<S> {
    /// Builds the service and restores `user_id`'s state if a fresh copy exists.
    pub async fn create(
        config: MonitorConfig,
        clock: Arc<dyn Clock>,
        store: S,
        sink: Box<dyn NotificationSink>,
        user_id: &str,
    ) -> Self {
        let default_exempt = DEFAULT_EXEMPT
            .iter()
            .map(|v| v.to_string())
            .chain(config.extra_exempt.iter().cloned())
            .collect::<Vec<_>>();
        let gateway = PersistenceGateway::new(
            store,
            config.persistence_max_age(),
            default_exempt.clone(),
        );
        let now = clock.time();
        let state = Self::restore(&gateway, &config, clock.as_ref(), user_id).await;

        let mut service = Self {
            session: UserSession::from_state(
                state,
                default_exempt.clone(),
                config.initial_focus_score,
            ),
            tracker: WindowSwitchTracker::new((&config).into(), now),
            activity: ActivityClock::new(config.idle_threshold(), now),
            accumulator: ScreenTimeAccumulator::new(now),
            throttler: NotificationThrottler::new(config.notification_throttle()),
            scheduler: DailyResetScheduler::new(clock.local_time()),
            subscriptions: SubscriptionRegistry::new(),
            default_exempt,
            gateway,
            sink,
            clock,
            config,
        };
        service.publish_state();
        info!("Monitoring {}", service.session.user_id);
        service
    }

    /// Loads `user_id`'s state. State saved before today's local midnight keeps only its
    /// focus policy, the midnight reset it missed is applied here.
    async fn restore(
        gateway: &PersistenceGateway<S>,
        config: &MonitorConfig,
        clock: &dyn Clock,
        user_id: &str,
    ) -> UserState {
        let now = clock.time();
        match gateway.load(user_id, now).await {
            Some(mut state) => {
                if is_before_today(state.saved_at, clock.local_time()) {
                    info!(
                        "State for {user_id} is from {}, starting a new day",
                        state.saved_at
                    );
                    state.start_new_day(config.initial_focus_score);
                } else {
                    info!("Restored state for {user_id}");
                }
                state
            }
            None => {
                debug!("Starting fresh state for {user_id}");
                let mut state = UserState::fresh(user_id, now);
                state.focus_score = config.initial_focus_score;
                state
            }
        }
    }

    /// Final best-effort save. Consumes the service, so no timer can touch it afterwards.
    pub async fn shutdown(mut self) {
        info!("Shutting down monitor for {}", self.session.user_id);
        self.save().await;
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    /// Swaps in `user_id`'s state. The previous user's state is saved, never merged. Returns
    /// whether the user actually changed.
    pub async fn set_current_user(&mut self, user_id: &str) -> bool {
        if user_id.is_empty() || user_id == self.session.user_id {
            return false;
        }
        let span = info_span!("Switching user", from = %self.session.user_id, to = %user_id);
        self.swap_user(user_id).instrument(span).await;
        true
    }

    async fn swap_user(&mut self, user_id: &str) {
        self.save().await;

        let now = self.clock.time();
        let state =
            Self::restore(&self.gateway, &self.config, self.clock.as_ref(), user_id).await;
        self.session = UserSession::from_state(
            state,
            self.default_exempt.clone(),
            self.config.initial_focus_score,
        );
        self.tracker.reset(now);
        self.activity = ActivityClock::new(self.config.idle_threshold(), now);
        self.accumulator.restart(now);
        self.throttler.reset();
        self.scheduler.reschedule(self.clock.local_time());
        self.subscriptions.clear_alerts();
        self.publish_state();
    }

    /// Entry point for the host's activity events.
    pub fn report_activity(&mut self, event: &ActivityEvent) {
        let now = self.clock.time();
        self.activity.record(now);

        let identity = normalize_identity(event.app_name());
        if identity.is_empty() {
            debug!("Activity without a window");
            return;
        }

        let Some(switch) = self.tracker.register(&identity, now) else {
            return;
        };
        self.session.ledger.touch(&identity, now);

        if switch.distraction_streak {
            self.on_distraction_streak(now);
        }
        self.enforce_focus(&switch, now);
        self.subscriptions.publish_usage(self.session.ledger.snapshot());
    }

    fn on_distraction_streak(&mut self, now: DateTime<Utc>) {
        self.session.focus_score = self
            .session
            .focus_score
            .saturating_sub(self.config.focus_penalty);
        self.session.distraction_count += 1;
        info!(
            "Focus score {} after {} distraction streaks",
            self.session.focus_score, self.session.distraction_count
        );

        let message = format!(
            "You've been switching windows rapidly. Focus score is now {}.",
            self.session.focus_score
        );
        self.subscriptions.publish_alert(MonitorAlert::DistractionStreak {
            message: message.clone(),
            focus_score: self.session.focus_score,
            distraction_count: self.session.distraction_count,
        });

        if self.throttler.should_send(DISTRACTION_THROTTLE_KEY, now) {
            self.dispatch(NotificationRequest {
                title: DISTRACTION_NOTIFICATION_TITLE.into(),
                body: message,
                notification_id: DISTRACTION_NOTIFICATION_ID.into(),
                dedupe_key: None,
            });
        }
    }

    fn enforce_focus(&mut self, switch: &SwitchEvent, now: DateTime<Utc>) {
        match self.session.guard.evaluate(&switch.current) {
            FocusVerdict::Inactive => {}
            FocusVerdict::Compliant => {
                // Leaving the whitelist again later should alert again.
                self.throttler.clear_session();
            }
            FocusVerdict::Violation(violation) => self.on_violation(violation, now),
        }
    }

    fn on_violation(&mut self, violation: FocusViolation, now: DateTime<Utc>) {
        let notification_id = violation_notification_id(&violation.identity);
        let key = violation_throttle_key(&violation.identity);
        if !self.throttler.admit(&key, &notification_id, now) {
            return;
        }
        info!("Focus violation: {}", violation.identity);

        self.dispatch(NotificationRequest {
            title: FOCUS_NOTIFICATION_TITLE.into(),
            body: violation.message.clone(),
            notification_id,
            dedupe_key: Some(violation.identity.clone()),
        });
        self.subscriptions
            .publish_alert(MonitorAlert::FocusViolation(violation));
    }

    /// Failures are logged only. The alert still counts as sent so a broken host doesn't get
    /// a retry storm.
    fn dispatch(&mut self, request: NotificationRequest) {
        if let Err(e) = self.sink.notify(&request) {
            warn!("Failed to dispatch {}: {e:?}", request.notification_id);
        }
    }

    /// The idle-check cadence. Also lets the switch window lapse.
    pub fn check_idle(&mut self) -> bool {
        let now = self.clock.time();
        if self.tracker.expire_window(now) {
            debug!("Switch window expired");
        }
        self.activity.evaluate(now)
    }

    /// The accumulation cadence. Credits wall time since the previous tick unless the user was
    /// idle at any point in between.
    pub fn accumulate(&mut self) {
        self.reset_if_midnight_passed();

        let now = self.clock.time();
        let idle = self.activity.take_tick_idle(now);
        let Some(delta) = self.accumulator.tick(now, idle) else {
            return;
        };
        self.credit(delta, now);
    }

    fn credit(&mut self, delta: Duration, now: DateTime<Utc>) {
        let delta_ms = u64::try_from(delta.num_milliseconds()).unwrap_or_default();
        self.session.screen_time_today_ms = self.session.screen_time_today_ms.saturating_add(delta_ms);
        if let Some(identity) = self.tracker.current() {
            self.session.ledger.accrue(identity, delta, now);
        }
        debug!(
            "Screen time today {}ms",
            self.session.screen_time_today_ms
        );
        self.subscriptions
            .publish_screen_time(self.session.screen_time_today_ms);
        self.subscriptions.publish_usage(self.session.ledger.snapshot());
    }

    /// The 5 minute cadence for the diagnostic switch counter.
    pub fn reset_recent_switches(&mut self) {
        self.tracker.reset_recent_switches();
    }

    /// Catches up on a midnight that passed while the process was asleep.
    pub fn reset_if_midnight_passed(&mut self) -> bool {
        if self.scheduler.is_due(self.clock.time()) {
            self.daily_reset();
            true
        } else {
            false
        }
    }

    /// Zeroes the day's counters, notifies subscribers and schedules the next midnight.
    pub fn daily_reset(&mut self) {
        info!("Daily reset for {}", self.session.user_id);
        self.session.screen_time_today_ms = 0;
        self.session.ledger.clear();
        self.session.focus_score = self.config.initial_focus_score;
        self.session.distraction_count = 0;
        self.scheduler.reschedule(self.clock.local_time());

        self.subscriptions
            .publish_screen_time(self.session.screen_time_today_ms);
        self.subscriptions.publish_usage(self.session.ledger.snapshot());
    }

    /// Time until the next scheduled daily reset.
    pub fn until_daily_reset(&self) -> Duration {
        self.scheduler.until_next(self.clock.time())
    }

    /// Best-effort save of the current user's state.
    pub async fn save(&mut self) {
        let now = self.clock.time();
        let mut state = self.session.capture(now);
        if let Err(e) = self.gateway.save(&mut state, now).await {
            warn!("Failed to save state for {}: {e:?}", state.user_id);
        }
    }

    pub fn get_screen_time(&self) -> u64 {
        self.session.screen_time_today_ms
    }

    pub fn get_usage_snapshot(&self) -> Vec<UsageRecord> {
        self.session.ledger.snapshot()
    }

    pub fn get_focus_score(&self) -> u32 {
        self.session.focus_score
    }

    pub fn get_distraction_count(&self) -> u32 {
        self.session.distraction_count
    }

    pub fn get_recent_switches(&self) -> u32 {
        self.tracker.recent_switches()
    }

    pub fn is_idle(&self) -> bool {
        self.activity.is_idle()
    }

    pub fn set_focus_mode(&mut self, enabled: bool) {
        if !self.session.guard.set_enabled(enabled) {
            return;
        }
        if enabled {
            self.throttler.reset();
        }
        self.subscriptions.publish_focus_mode(enabled);
    }

    pub fn get_focus_mode(&self) -> bool {
        self.session.guard.is_enabled()
    }

    /// Replaces the whitelist. The default-exempt identities are always kept.
    pub fn set_whitelist(&mut self, whitelist: Vec<String>) {
        self.session.guard.set_whitelist(whitelist);
        self.throttler.reset();
    }

    pub fn get_whitelist(&self) -> Vec<String> {
        self.session.guard.whitelist()
    }

    /// `true` dims the offending window, `false` blocks it.
    pub fn set_dim_option(&mut self, dim: bool) {
        self.session.guard.set_dim(dim);
    }

    pub fn get_dim_option(&self) -> bool {
        self.session.guard.policy().dim_not_block
    }

    pub fn reset_notification_state(&mut self) {
        self.throttler.reset();
    }

    /// The host reported the user dismissed a notification. Don't show it again this session.
    pub fn notification_dismissed(&mut self, notification_id: &str) {
        self.throttler.mark_seen(notification_id);
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        MonitorSnapshot {
            user_id: self.session.user_id.clone(),
            screen_time_today_ms: self.session.screen_time_today_ms,
            last_activity_at: self.activity.last_activity_at(),
            usage: self.session.ledger.snapshot(),
            focus_policy: self.session.guard.policy().clone(),
            focus_score: self.session.focus_score,
            distraction_count: self.session.distraction_count,
            session: self.tracker.session(),
            idle: self.activity.is_idle(),
        }
    }

    fn publish_state(&mut self) {
        self.subscriptions
            .publish_screen_time(self.session.screen_time_today_ms);
        self.subscriptions.publish_usage(self.session.ledger.snapshot());
        self.subscriptions
            .publish_focus_mode(self.session.guard.is_enabled());
    }

    pub fn subscribe_screen_time(&mut self, callback: Callback<u64>) -> SubscriptionToken {
        self.subscriptions.subscribe_screen_time(callback)
    }

    pub fn unsubscribe_screen_time(&mut self, token: SubscriptionToken) -> bool {
        self.subscriptions.unsubscribe_screen_time(token)
    }

    pub fn subscribe_usage(&mut self, callback: Callback<Vec<UsageRecord>>) -> SubscriptionToken {
        self.subscriptions.subscribe_usage(callback)
    }

    pub fn unsubscribe_usage(&mut self, token: SubscriptionToken) -> bool {
        self.subscriptions.unsubscribe_usage(token)
    }

    pub fn subscribe_focus_mode(&mut self, callback: Callback<bool>) -> SubscriptionToken {
        self.subscriptions.subscribe_focus_mode(callback)
    }

    pub fn unsubscribe_focus_mode(&mut self, token: SubscriptionToken) -> bool {
        self.subscriptions.unsubscribe_focus_mode(token)
    }

    pub fn subscribe_alerts(&mut self, callback: Callback<MonitorAlert>) -> SubscriptionToken {
        self.subscriptions.subscribe_alerts(callback)
    }

    pub fn unsubscribe_alerts(&mut self, token: SubscriptionToken) -> bool {
        self.subscriptions.unsubscribe_alerts(token)
    }
}
