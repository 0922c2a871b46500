use crate::types::reminders::{ReminderPayload, Subscription};

/// Outcome of one push attempt, as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered,
    /// The push service answered 404/410; the endpoint will never accept messages again.
    SubscriptionGone,
    TransientFailure(String),
}

pub trait PushSender: Clone + Send + Sync + 'static {
    type Fut<'a>: Future<Output = DeliveryResult> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a Subscription,
        payload: &'a ReminderPayload,
    ) -> Self::Fut<'a>;
}
