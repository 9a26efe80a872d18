use axum::{Json, extract::State, response::IntoResponse};

use bloodbridge_types::api::InventoryView;
use bloodbridge_types::models::InventoryEntry;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

pub async fn get_inventory(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let entries = run_db(&state, |db| db.get_inventory()).await?;
    Ok(Json(views(entries)))
}

pub(crate) fn views(entries: Vec<InventoryEntry>) -> Vec<InventoryView> {
    entries
        .into_iter()
        .map(|e| InventoryView {
            level: e.level(),
            blood_group: e.blood_group,
            units: e.units,
            last_updated: e.last_updated,
        })
        .collect()
}
