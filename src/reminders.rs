use crate::adapters::{TokioTimeProvider, WebPushSender};
use crate::config;
use crate::ports;

mod scheduler;
pub mod slot_time;
mod table;
#[cfg(test)]
pub(crate) mod test_support;
pub mod vapid;

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use scheduler::ReminderScheduler;
pub use scheduler::RebuildSummary;
pub use table::{JobSummary, ScheduleTable};
pub use vapid::{VapidConfigStatus, generate_vapid_credentials, load_vapid_config};

/// Handle route handlers use to ask for a schedule rebuild without waiting for it.
///
/// Requests are coalesced: while one rebuild is pending, further requests fold into it.
/// A request made during a running rebuild queues exactly one more.
#[derive(Clone)]
pub struct RebuildTrigger {
    tx: Option<mpsc::Sender<()>>,
}

impl RebuildTrigger {
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Trigger wired to a bare channel, for observing requests in route tests.
    #[cfg(test)]
    pub(crate) fn channel() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx: Some(tx) }, rx)
    }

    pub fn request(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(()) {
            Ok(()) => debug!("reminder rebuild requested"),
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("reminder rebuild already pending; request coalesced");
            }
            Err(mpsc::error::TrySendError::Closed(())) => {
                warn!("reminder scheduler stopped; rebuild request dropped");
            }
        }
    }
}

/// Running reminder subsystem: the rebuild worker plus the table it maintains.
pub struct ReminderService {
    trigger: RebuildTrigger,
    table: Arc<ScheduleTable>,
    completed: watch::Receiver<u64>,
    worker: Option<JoinHandle<()>>,
}

impl ReminderService {
    /// No VAPID credentials: nothing is ever armed and rebuild requests are ignored.
    pub fn disabled() -> Self {
        let (_, completed) = watch::channel(0);
        Self {
            trigger: RebuildTrigger::disabled(),
            table: Arc::new(ScheduleTable::new()),
            completed,
            worker: None,
        }
    }

    pub fn trigger(&self) -> RebuildTrigger {
        self.trigger.clone()
    }

    pub fn table(&self) -> Arc<ScheduleTable> {
        Arc::clone(&self.table)
    }

    /// Counter of finished rebuilds, successful or not.
    pub fn completed_rebuilds(&self) -> watch::Receiver<u64> {
        self.completed.clone()
    }

    /// Stops the rebuild worker and cancels every armed timer. Safe to call twice.
    pub async fn shutdown(&mut self) {
        self.trigger = RebuildTrigger::disabled();
        if let Some(worker) = self.worker.take() {
            worker.abort();
            if let Err(err) = worker.await
                && !err.is_cancelled()
            {
                error!(error = %err, "reminder worker ended abnormally");
            }
        }
        self.table.clear();
        info!("reminder scheduler stopped");
    }
}

/// Builds the push client from the VAPID settings and starts the rebuild worker with an
/// initial rebuild queued. Missing or partial VAPID settings leave reminders off.
pub fn start<R: ports::ReminderStore>(
    config: &config::AppConfig,
    store: Arc<R>,
) -> ReminderService {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            warn!("meal reminders disabled: incomplete VAPID configuration");
            return ReminderService::disabled();
        }
        VapidConfigStatus::Missing => {
            info!("meal reminders disabled: no VAPID configuration");
            return ReminderService::disabled();
        }
    };

    let sender = match WebPushSender::new(vapid, config.push_timeout) {
        Ok(sender) => sender,
        Err(err) => {
            error!(error = %err, "meal reminders disabled: failed to init web-push");
            return ReminderService::disabled();
        }
    };

    let scheduler = ReminderScheduler::new(
        TokioTimeProvider,
        sender,
        store,
        Arc::new(ScheduleTable::new()),
        config.notification_assets(),
    );
    spawn_worker(scheduler)
}

fn spawn_worker<T, S, R>(scheduler: ReminderScheduler<T, S, R>) -> ReminderService
where
    T: ports::TimeProvider,
    S: ports::PushSender,
    R: ports::ReminderStore,
{
    let (tx, mut rx) = mpsc::channel(1);
    let (completed_tx, completed) = watch::channel(0u64);
    let table = scheduler.table();

    let worker = tokio::spawn(async move {
        while rx.recv().await.is_some() {
            match scheduler.rebuild().await {
                Ok(summary) => info!(
                    enabled = summary.reminders_enabled,
                    jobs = summary.jobs,
                    skipped_slots = summary.skipped_slots,
                    skipped_subscriptions = summary.skipped_subscriptions,
                    "reminder schedule rebuilt"
                ),
                Err(err) => {
                    error!(error = %err, "reminder rebuild failed; keeping previous schedule");
                }
            }
            completed_tx.send_modify(|count| *count += 1);
        }
    });

    let trigger = RebuildTrigger { tx: Some(tx) };
    trigger.request();

    ReminderService {
        trigger,
        table,
        completed,
        worker: Some(worker),
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::reminders::test_support::{TestSender, TestStore, TestTime, at};
    use crate::types::reminders::{NotificationAssets, SlotKey};

    const SLOTS: [(SlotKey, &str); 3] = [
        (SlotKey::Breakfast, "08:00"),
        (SlotKey::Lunch, "12:00"),
        (SlotKey::Dinner, "18:00"),
    ];

    fn service(store: Arc<TestStore>) -> ReminderService {
        spawn_worker(ReminderScheduler::new(
            TestTime::new(at("2025-01-12T09:30:00Z")),
            TestSender::default(),
            store,
            Arc::new(ScheduleTable::new()),
            NotificationAssets::default(),
        ))
    }

    async fn wait_for_rebuilds(service: &ReminderService, count: u64) {
        let mut completed = service.completed_rebuilds();
        completed
            .wait_for(|done| *done >= count)
            .await
            .expect("worker alive");
    }

    #[tokio::test]
    async fn start__should_stay_disabled_without_vapid_configuration() {
        // Given
        let store = Arc::new(TestStore::with(2, &SLOTS));

        // When
        let mut service = start(&config::AppConfig::default(), store);
        service.trigger().request();

        // Then
        assert_eq!(service.table().size(), 0);
        service.shutdown().await;
    }

    #[tokio::test]
    async fn spawn_worker__should_run_initial_rebuild() {
        // Given
        let store = Arc::new(TestStore::with(2, &SLOTS));

        // When
        let service = service(store);
        wait_for_rebuilds(&service, 1).await;

        // Then
        assert_eq!(service.table().size(), 6);
    }

    #[tokio::test]
    async fn trigger__should_reflect_last_write_after_rapid_toggles() {
        // Given
        let store = Arc::new(TestStore::with(2, &SLOTS));
        let service = service(Arc::clone(&store));
        wait_for_rebuilds(&service, 1).await;
        let trigger = service.trigger();

        // When reminders are switched off and on again before the worker runs
        store.set_enabled(false);
        trigger.request();
        store.set_enabled(true);
        trigger.request();
        wait_for_rebuilds(&service, 2).await;

        // Then
        assert_eq!(service.table().size(), 6);
        assert_eq!(*service.completed_rebuilds().borrow(), 2);
    }

    #[tokio::test]
    async fn trigger__should_overwrite_completed_clear_with_last_write() {
        // Given
        let store = Arc::new(TestStore::with(2, &SLOTS));
        let service = service(Arc::clone(&store));
        wait_for_rebuilds(&service, 1).await;
        let trigger = service.trigger();

        // When the worker finishes a disabled rebuild before reminders come back on
        store.set_enabled(false);
        trigger.request();
        wait_for_rebuilds(&service, 2).await;
        let cleared = service.table().size();
        store.set_enabled(true);
        trigger.request();
        wait_for_rebuilds(&service, 3).await;

        // Then
        assert_eq!(cleared, 0);
        assert_eq!(service.table().size(), 6);
    }

    #[tokio::test]
    async fn trigger__should_clear_table_when_last_write_disables_reminders() {
        // Given
        let store = Arc::new(TestStore::with(2, &SLOTS));
        let service = service(Arc::clone(&store));
        wait_for_rebuilds(&service, 1).await;
        let trigger = service.trigger();

        // When
        trigger.request();
        store.set_enabled(false);
        trigger.request();
        wait_for_rebuilds(&service, 2).await;

        // Then
        assert_eq!(service.table().size(), 0);
    }

    #[tokio::test]
    async fn trigger__should_keep_schedule_when_rebuild_read_fails() {
        // Given
        let store = Arc::new(TestStore::with(2, &SLOTS));
        let service = service(Arc::clone(&store));
        wait_for_rebuilds(&service, 1).await;

        // When
        store.set_fail_reads(true);
        service.trigger().request();
        wait_for_rebuilds(&service, 2).await;

        // Then
        assert_eq!(service.table().size(), 6);
    }

    #[tokio::test]
    async fn shutdown__should_cancel_all_timers_and_be_repeatable() {
        // Given
        let store = Arc::new(TestStore::with(2, &SLOTS));
        let mut service = service(store);
        wait_for_rebuilds(&service, 1).await;
        let trigger = service.trigger();

        // When
        service.shutdown().await;
        service.shutdown().await;
        trigger.request();

        // Then
        assert_eq!(service.table().size(), 0);
    }

    #[test]
    fn disabled_trigger__should_ignore_requests() {
        RebuildTrigger::disabled().request();
    }
}
