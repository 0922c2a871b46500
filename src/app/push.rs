use crate::error::ApiError;
use crate::ports::ReminderStore;
use crate::reminders::slot_time::resolve_timezone;
use crate::reminders::{self, JobSummary};
use crate::state;
use crate::store::UpsertOutcome;
use crate::types::reminders::Subscription;

use axum::Json;
use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: &'static str,
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    match reminders::load_vapid_config(&state.config) {
        reminders::VapidConfigStatus::Ready(vapid) => Ok(Json(PublicKeyResponse {
            public_key: vapid.public_key,
        })),
        reminders::VapidConfigStatus::Incomplete | reminders::VapidConfigStatus::Missing => {
            Err(ApiError::PushUnavailable)
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscriptionKeys {
    pub(crate) p256dh: String,
    pub(crate) auth: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeRequest {
    pub(crate) endpoint: String,
    pub(crate) keys: SubscriptionKeys,
    pub(crate) tz: String,
}

pub(crate) async fn push_subscribe(
    State(state): State<state::AppState>,
    headers: HeaderMap,
    Json(request): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    if request.endpoint.trim().is_empty()
        || request.keys.p256dh.trim().is_empty()
        || request.keys.auth.trim().is_empty()
    {
        return Err(ApiError::BadRequest(
            "endpoint, keys.p256dh, and keys.auth are required.".to_string(),
        ));
    }
    if resolve_timezone(&request.tz).is_none() {
        return Err(ApiError::BadRequest(format!(
            "Unknown timezone '{}'.",
            request.tz
        )));
    }

    let subscription = Subscription {
        endpoint: request.endpoint,
        p256dh: request.keys.p256dh,
        auth: request.keys.auth,
        tz: request.tz,
    };
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok());
    let outcome = state.store.upsert_subscription(&subscription, user_agent)?;
    state.reminders.request();

    Ok(match outcome {
        UpsertOutcome::Created => (
            StatusCode::CREATED,
            Json(MessageResponse {
                message: "Subscription created",
            }),
        ),
        UpsertOutcome::Updated => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "Subscription updated",
            }),
        ),
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct EndpointRequest {
    pub(crate) endpoint: String,
}

pub(crate) async fn push_unsubscribe(
    State(state): State<state::AppState>,
    Json(request): Json<EndpointRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete_subscription(&request.endpoint)?;
    state.reminders.request();
    Ok(Json(MessageResponse {
        message: "Subscription deleted",
    }))
}

/// Keeps `last_seen_at` fresh. Does not touch the schedule.
pub(crate) async fn push_heartbeat(
    State(state): State<state::AppState>,
    Json(request): Json<EndpointRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.record_heartbeat(&request.endpoint)?;
    Ok(Json(MessageResponse {
        message: "Heartbeat recorded",
    }))
}

#[derive(Serialize)]
pub(crate) struct ReminderScheduleDebugResponse {
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) server_time: OffsetDateTime,
    pub(crate) scheduled: Vec<JobSummary>,
}

pub(crate) async fn reminder_schedule_debug(
    State(state): State<state::AppState>,
) -> Json<ReminderScheduleDebugResponse> {
    Json(ReminderScheduleDebugResponse {
        server_time: OffsetDateTime::now_utc(),
        scheduled: state.schedule.snapshot(),
    })
}
