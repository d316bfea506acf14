//! Minute-resolution notification scheduling.
//!
//! A single loop wakes on every wall-clock minute boundary, asks the registry
//! who is due at that `HH:MM` and fans the deliveries out onto their own tasks.
mod clock;
mod notifier;

use crate::domain::{NotificationTime, UserId};
use crate::errors::error_chain_fmt;
use crate::registry::SubscriberRegistry;
pub use clock::{until_next_minute, SchedulerClock};
use futures::future::join_all;
pub use notifier::{DeliveryOutcome, Notifier, Trigger};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

pub struct NotificationScheduler {
    registry: Arc<dyn SubscriberRegistry>,
    notifier: Notifier,
    clock: SchedulerClock,
    state: Mutex<SchedulerState>,
}

enum SchedulerState {
    Stopped,
    Running {
        shutdown: watch::Sender<bool>,
        handle: JoinHandle<()>,
    },
}

/// Counts for one evaluated minute.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub delivered: usize,
    pub unavailable: usize,
    pub failed: usize,
}

#[derive(thiserror::Error)]
pub enum TestNotificationError {
    #[error("User {0} is not registered.")]
    UnknownSubscriber(UserId),
    #[error("User {0} has no city set.")]
    NoCity(UserId),
}

impl std::fmt::Debug for TestNotificationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl NotificationScheduler {
    pub fn new(
        registry: Arc<dyn SubscriberRegistry>,
        notifier: Notifier,
        clock: SchedulerClock,
    ) -> Self {
        Self {
            registry,
            notifier,
            clock,
            state: Mutex::new(SchedulerState::Stopped),
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn clock(&self) -> SchedulerClock {
        self.clock
    }

    /// Starts the minute loop. Returns `false` when it was already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        let mut state = self.state.lock().await;
        if let SchedulerState::Running { .. } = *state {
            tracing::warn!("The notification scheduler is already running");
            return false;
        }
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::clone(self).run_loop(shutdown_rx));
        *state = SchedulerState::Running { shutdown, handle };
        tracing::info!(clock = ?self.clock, "Notification scheduler started");
        true
    }

    /// Stops the loop and waits for it to exit. Deliveries already started run
    /// to completion on their own. Returns `false` when it was not running.
    pub async fn stop(&self) -> bool {
        let previous = std::mem::replace(&mut *self.state.lock().await, SchedulerState::Stopped);
        match previous {
            SchedulerState::Stopped => false,
            SchedulerState::Running { shutdown, handle } => {
                // The loop may already be gone, in which case there is no one to tell.
                let _ = shutdown.send(true);
                if let Err(e) = handle.await {
                    tracing::error!(error.cause_chain = ?e, "The scheduler loop ended abnormally");
                }
                tracing::info!("Notification scheduler stopped");
                true
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, SchedulerState::Running { .. })
    }

    async fn run_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut last_evaluated: Option<NotificationTime> = None;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.clock.until_next_minute()) => {}
                _ = shutdown.changed() => break,
            }
            let now = self.clock.now_hhmm();
            if last_evaluated.as_ref() == Some(&now) {
                continue;
            }
            last_evaluated = Some(now.clone());

            let scheduler = Arc::clone(&self);
            tokio::spawn(async move {
                scheduler.run_tick(&now).await;
            });
        }
    }

    /// Delivers to everyone due at `now`, one task per subscriber.
    #[tracing::instrument(name = "Running notification tick", skip(self, now), fields(now = %now))]
    pub async fn run_tick(&self, now: &NotificationTime) -> TickSummary {
        let mut seen = HashSet::new();
        let due: Vec<_> = self
            .registry
            .list_due_subscribers(now)
            .await
            .into_iter()
            .filter(|subscriber| seen.insert(subscriber.user_id))
            .collect();

        let mut summary = TickSummary {
            due: due.len(),
            ..TickSummary::default()
        };
        if due.is_empty() {
            return summary;
        }

        let deliveries = due.into_iter().map(|subscriber| {
            let notifier = self.notifier.clone();
            tokio::spawn(async move { notifier.deliver(&subscriber, Trigger::Scheduled).await })
        });
        for result in join_all(deliveries).await {
            match result {
                Ok(DeliveryOutcome::Delivered { .. }) => summary.delivered += 1,
                Ok(DeliveryOutcome::WeatherUnavailable) => summary.unavailable += 1,
                Ok(DeliveryOutcome::SendFailed) | Ok(DeliveryOutcome::NoCity) => {
                    summary.failed += 1
                }
                Err(e) => {
                    tracing::error!(error.cause_chain = ?e, "A delivery task panicked");
                    summary.failed += 1;
                }
            }
        }
        tracing::info!(
            due = summary.due,
            delivered = summary.delivered,
            unavailable = summary.unavailable,
            failed = summary.failed,
            "Notification tick finished"
        );
        summary
    }

    /// Sends one subscriber their weather right now, ignoring the schedule.
    #[tracing::instrument(name = "Sending a test notification", skip(self))]
    pub async fn send_test_notification(
        &self,
        user_id: UserId,
    ) -> Result<DeliveryOutcome, TestNotificationError> {
        let subscriber = self
            .registry
            .get_subscriber(user_id)
            .await
            .ok_or(TestNotificationError::UnknownSubscriber(user_id))?;
        if subscriber.city.is_none() {
            return Err(TestNotificationError::NoCity(user_id));
        }
        Ok(self.notifier.deliver(&subscriber, Trigger::Test).await)
    }
}
