use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

use crate::ports::{self, DeliveryResult};
use crate::types::reminders::{ReminderPayload, Subscription, VapidConfig};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

/// Web Push delivery signed with the server's VAPID key. Every send is capped by
/// `timeout` so one unresponsive push service cannot hold a timer task.
#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
    timeout: Duration,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig, timeout: Duration) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
            timeout,
        })
    }

    fn build_message(
        &self,
        subscription: &Subscription,
        body: &[u8],
    ) -> Result<web_push::WebPushMessage, web_push::WebPushError> {
        let subscription_info = web_push::SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.p256dh.clone(),
            subscription.auth.clone(),
        );
        let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
        builder.set_payload(web_push::ContentEncoding::Aes128Gcm, body);
        let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
            &self.vapid.private_key,
            web_push::URL_SAFE_NO_PAD,
            &subscription_info,
        )?;
        signature_builder.add_claim("sub", self.vapid.subject.as_str());
        builder.set_vapid_signature(signature_builder.build()?);
        builder.build()
    }
}

impl ports::PushSender for WebPushSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = DeliveryResult> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(
        &'a self,
        subscription: &'a Subscription,
        payload: &'a ReminderPayload,
    ) -> Self::Fut<'a> {
        Box::pin(async move {
            let body = match serde_json::to_vec(payload) {
                Ok(body) => body,
                Err(err) => {
                    return DeliveryResult::TransientFailure(format!(
                        "failed to encode payload: {err}"
                    ));
                }
            };
            let message = match self.build_message(subscription, &body) {
                Ok(message) => message,
                Err(err) => return classify_error(err),
            };
            match tokio::time::timeout(self.timeout, self.client.send(message)).await {
                Ok(Ok(())) => DeliveryResult::Delivered,
                Ok(Err(err)) => classify_error(err),
                Err(_) => DeliveryResult::TransientFailure(format!(
                    "push service did not answer within {}s",
                    self.timeout.as_secs()
                )),
            }
        })
    }
}

/// 404 and 410 from the push service mean the subscription is permanently dead.
pub(crate) fn classify_error(err: web_push::WebPushError) -> DeliveryResult {
    match err {
        web_push::WebPushError::EndpointNotValid { .. }
        | web_push::WebPushError::EndpointNotFound { .. } => DeliveryResult::SubscriptionGone,
        other => DeliveryResult::TransientFailure(other.to_string()),
    }
}
