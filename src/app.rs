use crate::state;

use axum::Router;
use axum::routing::{get, post};

mod meal_plan;
mod push;
mod settings;

pub fn app(state: state::AppState) -> Router {
    Router::new()
        .route("/api/push/public-key", get(push::push_public_key))
        .route("/api/push/subscribe", post(push::push_subscribe))
        .route("/api/push/unsubscribe", post(push::push_unsubscribe))
        .route("/api/push/heartbeat", post(push::push_heartbeat))
        .route(
            "/api/settings",
            get(settings::settings_get).put(settings::settings_update),
        )
        .route(
            "/api/meal-plan",
            get(meal_plan::meal_plan_get).put(meal_plan::meal_plan_update),
        )
        .route(
            "/api/debug/reminders/schedule",
            get(push::reminder_schedule_debug),
        )
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
