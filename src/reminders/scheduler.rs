use crate::error::{ReminderError, StoreError};
use crate::ports::{self, DeliveryResult};
use crate::reminders::slot_time::{DailyTrigger, resolve_timezone, to_daily_trigger};
use crate::reminders::table::ScheduleTable;
use crate::types::reminders::{MealSlot, NotificationAssets, ReminderPayload, Subscription};

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

const REMINDER_TITLE: &str = "Meal Reminder";

type FireFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub reminders_enabled: bool,
    pub jobs: usize,
    pub skipped_slots: usize,
    pub skipped_subscriptions: usize,
}

/// Rebuilds the schedule table from storage and delivers reminders when timers fire.
pub(crate) struct ReminderScheduler<T, S, R> {
    time: T,
    sender: S,
    store: Arc<R>,
    table: Arc<ScheduleTable>,
    assets: NotificationAssets,
    rebuild_lock: tokio::sync::Mutex<()>,
}

impl<T, S, R> ReminderScheduler<T, S, R>
where
    T: ports::TimeProvider,
    S: ports::PushSender,
    R: ports::ReminderStore,
{
    pub(crate) fn new(
        time: T,
        sender: S,
        store: Arc<R>,
        table: Arc<ScheduleTable>,
        assets: NotificationAssets,
    ) -> Self {
        Self {
            time,
            sender,
            store,
            table,
            assets,
            rebuild_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub(crate) fn table(&self) -> Arc<ScheduleTable> {
        Arc::clone(&self.table)
    }

    /// Replaces every armed job with one per (enabled subscription, slot).
    ///
    /// All reads happen before the table is touched: a storage error leaves the
    /// previous schedule running.
    pub(crate) async fn rebuild(&self) -> Result<RebuildSummary, ReminderError> {
        let _guard = self.rebuild_lock.lock().await;

        let store = Arc::clone(&self.store);
        let (reminders_enabled, subscriptions, slots) =
            tokio::task::spawn_blocking(move || read_reminder_state(store.as_ref())).await??;

        self.table.clear();
        let mut summary = RebuildSummary {
            reminders_enabled,
            ..RebuildSummary::default()
        };
        if !reminders_enabled {
            info!("reminders disabled; schedule cleared");
            return Ok(summary);
        }

        let triggers: Vec<(MealSlot, DailyTrigger)> = slots
            .into_iter()
            .filter_map(|slot| match to_daily_trigger(slot.slot_key, &slot.time_24h) {
                Ok(trigger) => Some((slot, trigger)),
                Err(err) => {
                    warn!(slot = %slot.slot_key, error = %err, "skipping meal slot");
                    summary.skipped_slots += 1;
                    None
                }
            })
            .collect();

        for subscription in subscriptions {
            let Some(timezone) = resolve_timezone(&subscription.tz) else {
                warn!(
                    endpoint = %subscription.endpoint,
                    tz = %subscription.tz,
                    "skipping subscription with unknown timezone"
                );
                summary.skipped_subscriptions += 1;
                continue;
            };
            let subscription = Arc::new(subscription);
            for (slot, trigger) in &triggers {
                self.table.add(
                    self.time.clone(),
                    &subscription.endpoint,
                    slot.slot_key,
                    *trigger,
                    timezone,
                    self.on_fire(Arc::clone(&subscription), &slot.name),
                );
            }
        }

        summary.jobs = self.table.size();
        Ok(summary)
    }

    fn on_fire(
        &self,
        subscription: Arc<Subscription>,
        slot_name: &str,
    ) -> impl Fn() -> FireFuture + Send + Sync + 'static + use<T, S, R> {
        let sender = self.sender.clone();
        let store = Arc::clone(&self.store);
        let table = Arc::downgrade(&self.table);
        let payload = Arc::new(reminder_payload(slot_name, &self.assets));
        move || {
            let sender = sender.clone();
            let store = Arc::clone(&store);
            let table = table.clone();
            let subscription = Arc::clone(&subscription);
            let payload = Arc::clone(&payload);
            Box::pin(async move {
                deliver(&sender, &store, &table, &subscription, &payload).await;
            })
        }
    }
}

type ReminderState = (bool, Vec<Subscription>, Vec<MealSlot>);

fn read_reminder_state<R: ports::ReminderStore>(store: &R) -> Result<ReminderState, StoreError> {
    if !store.reminders_enabled()? {
        return Ok((false, Vec::new(), Vec::new()));
    }
    Ok((
        true,
        store.list_enabled_subscriptions()?,
        store.list_meal_slots()?,
    ))
}

pub(crate) fn reminder_payload(slot_name: &str, assets: &NotificationAssets) -> ReminderPayload {
    ReminderPayload {
        title: REMINDER_TITLE.to_string(),
        body: format!("Time for {slot_name}"),
        icon: assets.icon.clone(),
        badge: assets.badge.clone(),
    }
}

/// One firing: send once, and forget the subscription if the push service says it is gone.
pub(crate) async fn deliver<S, R>(
    sender: &S,
    store: &Arc<R>,
    table: &Weak<ScheduleTable>,
    subscription: &Subscription,
    payload: &ReminderPayload,
) -> DeliveryResult
where
    S: ports::PushSender,
    R: ports::ReminderStore,
{
    let endpoint = subscription.endpoint.as_str();
    let result = sender.send(subscription, payload).await;
    match &result {
        DeliveryResult::Delivered => {
            debug!(endpoint, body = %payload.body, "meal reminder delivered");
        }
        DeliveryResult::TransientFailure(reason) => {
            warn!(endpoint, reason = %reason, "meal reminder not delivered");
        }
        DeliveryResult::SubscriptionGone => {
            info!(endpoint, "subscription expired or invalid; removing");
            let deleted = {
                let store = Arc::clone(store);
                let endpoint = endpoint.to_string();
                tokio::task::spawn_blocking(move || store.delete_subscription(&endpoint)).await
            };
            match deleted {
                Ok(Ok(_)) => {
                    if let Some(table) = table.upgrade() {
                        let evicted = table.remove_endpoint(endpoint);
                        debug!(endpoint, evicted, "evicted reminder jobs");
                    }
                }
                Ok(Err(err)) => {
                    error!(endpoint, error = %err, "failed to delete expired subscription");
                }
                Err(err) => {
                    error!(endpoint, error = %err, "subscription delete task failed");
                }
            }
        }
    }
    result
}
