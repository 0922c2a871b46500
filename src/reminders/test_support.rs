use crate::error::StoreError;
use crate::ports;
use crate::ports::DeliveryResult;
use crate::types::reminders::{MealSlot, ReminderPayload, SlotKey, Subscription};

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::oneshot;

pub(crate) fn at(value: &str) -> OffsetDateTime {
    OffsetDateTime::parse(value, &Rfc3339).expect("parse instant")
}

/// Yields to spawned tasks until `condition` holds, then falls back to short real sleeps
/// so work on the blocking pool can finish.
pub(crate) async fn eventually(condition: impl Fn() -> bool) {
    for attempt in 0..2000 {
        if condition() {
            return;
        }
        if attempt < 100 {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
    panic!("condition not reached");
}

/// Manual clock: sleeps park until `release_all`, which also moves the clock forward.
#[derive(Clone)]
pub(crate) struct TestTime {
    now: Arc<Mutex<OffsetDateTime>>,
    sleeps: Arc<Mutex<Vec<(Duration, oneshot::Sender<()>)>>>,
    durations: Arc<Mutex<Vec<Duration>>>,
}

impl TestTime {
    pub(crate) fn new(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
            sleeps: Arc::new(Mutex::new(Vec::new())),
            durations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn sleep_durations(&self) -> Vec<Duration> {
        self.durations.lock().expect("durations lock").clone()
    }

    pub(crate) fn pending_sleeps(&self) -> usize {
        self.sleeps.lock().expect("sleeps lock").len()
    }

    pub(crate) fn release_all(&self) {
        let pending: Vec<_> = self.sleeps.lock().expect("sleeps lock").drain(..).collect();
        if let Some(longest) = pending.iter().map(|(duration, _)| *duration).max() {
            let mut now = self.now.lock().expect("now lock");
            *now += longest;
        }
        for (_, sender) in pending {
            let _ = sender.send(());
        }
    }
}

pub(crate) struct ManualSleep {
    receiver: oneshot::Receiver<()>,
}

impl Future for ManualSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(_) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl ports::TimeProvider for TestTime {
    type Sleep<'a>
        = ManualSleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("now lock")
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        let (sender, receiver) = oneshot::channel();
        self.durations
            .lock()
            .expect("durations lock")
            .push(duration);
        self.sleeps
            .lock()
            .expect("sleeps lock")
            .push((duration, sender));
        ManualSleep { receiver }
    }
}

/// Records every send and answers with `outcome`.
#[derive(Clone)]
pub(crate) struct TestSender {
    pub(crate) sent: Arc<Mutex<Vec<(String, ReminderPayload)>>>,
    outcome: Arc<Mutex<DeliveryResult>>,
}

impl TestSender {
    pub(crate) fn answering(outcome: DeliveryResult) -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            outcome: Arc::new(Mutex::new(outcome)),
        }
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().expect("sent lock").len()
    }
}

impl Default for TestSender {
    fn default() -> Self {
        Self::answering(DeliveryResult::Delivered)
    }
}

impl ports::PushSender for TestSender {
    type Fut<'a>
        = std::future::Ready<DeliveryResult>
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a Subscription,
        payload: &'a ReminderPayload,
    ) -> Self::Fut<'a> {
        self.sent
            .lock()
            .expect("sent lock")
            .push((subscription.endpoint.clone(), payload.clone()));
        std::future::ready(self.outcome.lock().expect("outcome lock").clone())
    }
}

#[derive(Default)]
pub(crate) struct TestStoreState {
    pub(crate) reminders_enabled: bool,
    pub(crate) subscriptions: Vec<Subscription>,
    pub(crate) slots: Vec<MealSlot>,
    pub(crate) fail_reads: bool,
    pub(crate) deleted: Vec<String>,
}

#[derive(Default)]
pub(crate) struct TestStore {
    pub(crate) state: Mutex<TestStoreState>,
}

impl TestStore {
    pub(crate) fn with(subscriptions: usize, slots: &[(SlotKey, &str)]) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().expect("state lock");
            state.reminders_enabled = true;
            state.subscriptions = (0..subscriptions).map(subscription).collect();
            state.slots = slots
                .iter()
                .enumerate()
                .map(|(index, (slot_key, time_24h))| meal_slot(index, *slot_key, time_24h))
                .collect();
        }
        store
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.state.lock().expect("state lock").reminders_enabled = enabled;
    }

    pub(crate) fn set_fail_reads(&self, fail: bool) {
        self.state.lock().expect("state lock").fail_reads = fail;
    }

    pub(crate) fn deleted(&self) -> Vec<String> {
        self.state.lock().expect("state lock").deleted.clone()
    }

    fn read_guard(&self) -> Result<std::sync::MutexGuard<'_, TestStoreState>, StoreError> {
        let state = self.state.lock().expect("state lock");
        if state.fail_reads {
            return Err(StoreError::Lock("simulated read failure".to_string()));
        }
        Ok(state)
    }
}

impl ports::ReminderStore for TestStore {
    fn reminders_enabled(&self) -> Result<bool, StoreError> {
        Ok(self.read_guard()?.reminders_enabled)
    }

    fn list_enabled_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self.read_guard()?.subscriptions.clone())
    }

    fn list_meal_slots(&self) -> Result<Vec<MealSlot>, StoreError> {
        Ok(self.read_guard()?.slots.clone())
    }

    fn delete_subscription(&self, endpoint: &str) -> Result<bool, StoreError> {
        let mut state = self.state.lock().expect("state lock");
        let before = state.subscriptions.len();
        state.subscriptions.retain(|sub| sub.endpoint != endpoint);
        state.deleted.push(endpoint.to_string());
        Ok(state.subscriptions.len() != before)
    }
}

pub(crate) fn subscription(index: usize) -> Subscription {
    Subscription {
        endpoint: format!("https://push.example/{index}"),
        p256dh: "p256".to_string(),
        auth: "auth".to_string(),
        tz: "America/New_York".to_string(),
    }
}

pub(crate) fn meal_slot(index: usize, slot_key: SlotKey, time_24h: &str) -> MealSlot {
    MealSlot {
        slot_key,
        order_index: index as i64,
        time_24h: time_24h.to_string(),
        name: slot_key.as_str().to_lowercase(),
        notes: None,
    }
}
