use anyhow::Result;
use tokio::{
    select,
    sync::{mpsc, oneshot},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use crate::{
    host::events::HostEvent,
    storage::store::KeyValueStore,
    utils::time::to_std_duration,
};

use super::service::{MonitorSnapshot, MonitoringService};

/// Everything the event loop can be asked to do from the outside.
#[derive(Debug)]
pub enum MonitorCommand {
    Host(HostEvent),
    Query(oneshot::Sender<MonitorSnapshot>),
}

/// Next firing point of each periodic job.
struct Deadlines {
    idle_check: Instant,
    accumulation: Instant,
    recent_reset: Instant,
    midnight: Instant,
}

impl Deadlines {
    fn arm<S: KeyValueStore>(service: &MonitoringService<S>, now: Instant) -> Self {
        let config = service.config();
        Self {
            idle_check: now + config.idle_check_interval(),
            accumulation: now + config.accumulation_interval(),
            recent_reset: now + config.recent_switch_reset_interval(),
            midnight: now + to_std_duration(service.until_daily_reset()),
        }
    }
}

/// Executes the monitor event loop. Host commands and timers are handled one at a time, so the
/// service never sees two mutations interleave. Stops on cancellation or once every command
/// sender is gone, and saves the state on the way out.
pub async fn run_monitor<S: KeyValueStore>(
    mut service: MonitoringService<S>,
    mut commands: mpsc::Receiver<MonitorCommand>,
    shutdown: CancellationToken,
) -> Result<()> {
    let clock = service.clock();
    let mut deadlines = Deadlines::arm(&service, clock.instant());

    loop {
        select! {
            _ = shutdown.cancelled() => {
                info!("Monitor cancelled");
                break;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    info!("Host disconnected");
                    break;
                };
                if handle_command(&mut service, command).await {
                    deadlines = Deadlines::arm(&service, clock.instant());
                }
            }
            _ = clock.sleep_until(deadlines.idle_check) => {
                service.check_idle();
                deadlines.idle_check += service.config().idle_check_interval();
            }
            _ = clock.sleep_until(deadlines.accumulation) => {
                service.accumulate();
                service.save().await;
                deadlines.accumulation += service.config().accumulation_interval();
            }
            _ = clock.sleep_until(deadlines.recent_reset) => {
                service.reset_recent_switches();
                deadlines.recent_reset += service.config().recent_switch_reset_interval();
            }
            _ = clock.sleep_until(deadlines.midnight) => {
                service.reset_if_midnight_passed();
                deadlines.midnight = clock.instant() + to_std_duration(service.until_daily_reset());
            }
        }
    }

    service.shutdown().await;
    Ok(())
}

/// Returns whether the active user changed, in which case every timer starts over.
async fn handle_command<S: KeyValueStore>(
    service: &mut MonitoringService<S>,
    command: MonitorCommand,
) -> bool {
    let event = match command {
        MonitorCommand::Query(reply) => {
            if reply.send(service.snapshot()).is_err() {
                debug!("Snapshot requester went away");
            }
            return false;
        }
        MonitorCommand::Host(event) => event,
    };

    debug!("Handling {event:?}");
    match event {
        HostEvent::ActivityChanged(activity) => service.report_activity(&activity),
        HostEvent::SetUser { user_id } => {
            let span = info_span!("Host requested user", user = %user_id);
            return service.set_current_user(&user_id).instrument(span).await;
        }
        HostEvent::SetFocusMode { enabled } => service.set_focus_mode(enabled),
        HostEvent::SetWhitelist { whitelist } => service.set_whitelist(whitelist),
        HostEvent::SetDimOption { dim } => service.set_dim_option(dim),
        HostEvent::ResetNotifications => service.reset_notification_state(),
        HostEvent::NotificationDismissed { notification_id } => {
            service.notification_dismissed(&notification_id)
        }
        HostEvent::Suspend => {
            info!("Host suspended, saving state");
            service.save().await;
        }
        // Answered by whoever owns the output, through a query.
        HostEvent::Snapshot => {}
    }
    false
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tokio::sync::{mpsc, oneshot};
    use tokio_util::sync::CancellationToken;

    use crate::{
        host::{
            events::{ActivityEvent, HostEvent},
            notification::MockNotificationSink,
        },
        monitor::{
            config::MonitorConfig,
            service::{MonitorSnapshot, MonitoringService},
        },
        storage::{
            entities::UserState,
            gateway::storage_key,
            store::{KeyValueStore, MemoryStore},
        },
        utils::{
            clock::test_clock::{TestClock, TEST_START_DATE},
            logging::TEST_LOGGING,
        },
    };

    use super::{run_monitor, MonitorCommand};

    async fn create_service(store: MemoryStore) -> MonitoringService<MemoryStore> {
        let mut sink = MockNotificationSink::new();
        sink.expect_notify().never();
        MonitoringService::create(
            MonitorConfig::default(),
            Arc::new(TestClock::new()),
            store,
            Box::new(sink),
            "alice",
        )
        .await
    }

    fn activity(title: &str) -> MonitorCommand {
        MonitorCommand::Host(HostEvent::ActivityChanged(ActivityEvent::new(title)))
    }

    async fn send(sender: &mpsc::Sender<MonitorCommand>, command: MonitorCommand) {
        sender.send(command).await.expect("monitor stopped early");
    }

    async fn query(sender: &mpsc::Sender<MonitorCommand>) -> Result<MonitorSnapshot> {
        let (reply, response) = oneshot::channel();
        sender.send(MonitorCommand::Query(reply)).await?;
        Ok(response.await?)
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_accumulates_and_saves() -> Result<()> {
        *TEST_LOGGING;
        let store = MemoryStore::new();
        let service = create_service(store.clone()).await;
        let (sender, receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();

        let (result, snapshot) = tokio::join!(run_monitor(service, receiver, shutdown.clone()), async {
            for _ in 0..4 {
                send(&sender, activity("Visual Studio Code")).await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
            let snapshot = query(&sender).await;
            shutdown.cancel();
            snapshot
        });
        result?;
        let snapshot = snapshot?;

        assert_eq!(snapshot.screen_time_today_ms, 120_000);
        assert_eq!(snapshot.usage[0].identity, "Visual Studio Code");
        assert!(!snapshot.idle);
        assert!(store.get(&storage_key("alice")).await?.is_some());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_saves_before_first_tick() -> Result<()> {
        *TEST_LOGGING;
        let store = MemoryStore::new();
        let service = create_service(store.clone()).await;
        let (sender, receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();

        let (result, saved) = tokio::join!(run_monitor(service, receiver, shutdown.clone()), async {
            send(&sender, activity("Visual Studio Code")).await;
            tokio::time::sleep(Duration::from_secs(20)).await;
            send(&sender, MonitorCommand::Host(HostEvent::Suspend)).await;
            // Round trip so the suspend has been handled.
            let snapshot = query(&sender).await;
            let saved = store.get(&storage_key("alice")).await;
            shutdown.cancel();
            snapshot.and(saved)
        });
        result?;

        let state: UserState = serde_json::from_str(&saved?.expect("state was saved"))?;
        assert_eq!(
            state.saved_at,
            Utc.from_utc_datetime(&TEST_START_DATE) + chrono::Duration::seconds(20)
        );
        assert_eq!(state.screen_time_today_ms, 0);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_user_gets_no_screen_time() -> Result<()> {
        *TEST_LOGGING;
        let service = create_service(MemoryStore::new()).await;
        let (sender, receiver) = mpsc::channel(10);
        let shutdown = CancellationToken::new();

        let (result, snapshot) = tokio::join!(run_monitor(service, receiver, shutdown.clone()), async {
            send(&sender, activity("Visual Studio Code")).await;
            tokio::time::sleep(Duration::from_secs(185)).await;
            let snapshot = query(&sender).await;
            shutdown.cancel();
            snapshot
        });
        result?;
        let snapshot = snapshot?;

        // Only the first minute counts, the user went quiet right after.
        assert_eq!(snapshot.screen_time_today_ms, 60_000);
        assert!(snapshot.idle);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_switch_through_host() -> Result<()> {
        *TEST_LOGGING;
        let store = MemoryStore::new();
        let service = create_service(store.clone()).await;
        let (sender, receiver) = mpsc::channel(10);

        let (result, snapshot) = tokio::join!(
            run_monitor(service, receiver, CancellationToken::new()),
            async move {
                send(&sender, activity("Figma")).await;
                let user = HostEvent::SetUser {
                    user_id: "bob".into(),
                };
                send(&sender, MonitorCommand::Host(user)).await;
                query(&sender).await
                // Dropping the sender stops the loop.
            }
        );
        result?;
        let snapshot = snapshot?;

        assert_eq!(snapshot.user_id, "bob");
        assert!(snapshot.usage.is_empty());
        assert!(store.get(&storage_key("alice")).await?.is_some());
        assert!(store.get(&storage_key("bob")).await?.is_some());
        Ok(())
    }
}
