use crate::error::ApiError;
use crate::state;
use crate::types::reminders::Settings;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct OkResponse {
    pub(crate) ok: bool,
}

pub(crate) async fn settings_get(
    State(state): State<state::AppState>,
) -> Result<Json<Settings>, ApiError> {
    Ok(Json(state.store.settings()?))
}

pub(crate) async fn settings_update(
    State(state): State<state::AppState>,
    Json(settings): Json<Settings>,
) -> Result<Json<OkResponse>, ApiError> {
    state.store.update_settings(settings)?;
    state.reminders.request();
    Ok(Json(OkResponse { ok: true }))
}
