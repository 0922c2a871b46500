use crate::app::settings::OkResponse;
use crate::error::ApiError;
use crate::ports::ReminderStore;
use crate::reminders::slot_time::to_daily_trigger;
use crate::state;
use crate::types::reminders::{MealSlot, SlotKey};

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const MAX_NAME_CHARS: usize = 50;
const MAX_NOTES_CHARS: usize = 200;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MealPlan {
    pub(crate) slots: Vec<MealSlot>,
}

pub(crate) async fn meal_plan_get(
    State(state): State<state::AppState>,
) -> Result<Json<MealPlan>, ApiError> {
    let slots = state.store.list_meal_slots()?;
    Ok(Json(MealPlan { slots }))
}

pub(crate) async fn meal_plan_update(
    State(state): State<state::AppState>,
    Json(plan): Json<MealPlan>,
) -> Result<Json<OkResponse>, ApiError> {
    let slots = validate_meal_plan(plan.slots).map_err(ApiError::BadRequest)?;
    state.store.update_meal_slots(&slots)?;
    state.reminders.request();
    Ok(Json(OkResponse { ok: true }))
}

/// A plan must name every slot exactly once with a parseable time. Names are trimmed and
/// blank notes are stored as absent.
pub(crate) fn validate_meal_plan(slots: Vec<MealSlot>) -> Result<Vec<MealSlot>, String> {
    if slots.len() != SlotKey::ALL.len() {
        return Err(format!(
            "Expected {} meal slots, got {}.",
            SlotKey::ALL.len(),
            slots.len()
        ));
    }

    let mut seen = HashSet::new();
    let mut validated = Vec::with_capacity(slots.len());
    for mut slot in slots {
        if !seen.insert(slot.slot_key) {
            return Err(format!("Duplicate meal slot {}.", slot.slot_key));
        }
        if slot.order_index < 0 {
            return Err(format!(
                "order_index for {} must not be negative.",
                slot.slot_key
            ));
        }
        to_daily_trigger(slot.slot_key, &slot.time_24h).map_err(|err| err.to_string())?;

        let name = slot.name.trim();
        let name_chars = name.chars().count();
        if name_chars == 0 || name_chars > MAX_NAME_CHARS {
            return Err(format!(
                "Name for {} must be 1 to {MAX_NAME_CHARS} characters.",
                slot.slot_key
            ));
        }
        slot.name = name.to_string();

        slot.notes = slot
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        if let Some(notes) = &slot.notes
            && notes.chars().count() > MAX_NOTES_CHARS
        {
            return Err(format!(
                "Notes for {} must be at most {MAX_NOTES_CHARS} characters.",
                slot.slot_key
            ));
        }
        validated.push(slot);
    }
    Ok(validated)
}
