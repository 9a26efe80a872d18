use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use bloodbridge_db::models::CampRegistration;
use bloodbridge_notify::messages;
use bloodbridge_types::api::{CampView, Claims, Flash};

use crate::activity;
use crate::error::ApiError;
use crate::requests::load_user;
use crate::state::{AppState, run_db};

pub async fn list_camps(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let (camps, registered) = run_db(&state, move |db| {
        Ok((db.get_camps()?, db.get_registered_camp_ids(user_id)?))
    })
    .await?;

    let registered: HashSet<Uuid> = registered.into_iter().collect();
    let views: Vec<CampView> = camps
        .into_iter()
        .map(|camp| CampView {
            is_registered: registered.contains(&camp.id),
            camp,
        })
        .collect();
    Ok(Json(views))
}

pub async fn register_camp(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(camp_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let outcome = run_db(&state, move |db| db.register_for_camp(camp_id, user_id, Utc::now())).await?;

    match outcome {
        CampRegistration::Registered => {}
        CampRegistration::NotFound => return Err(ApiError::NotFound("Camp not found.".into())),
        CampRegistration::AlreadyRegistered => {
            return Err(ApiError::Conflict("Already registered.".into()));
        }
        CampRegistration::Full => return Err(ApiError::Conflict("Camp is full.".into())),
    }

    let camp = run_db(&state, move |db| db.get_camp(camp_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Camp not found.".into()))?;
    let user = load_user(&state, user_id).await?;
    info!("User {} registered for camp {}", user_id, camp.id);

    activity::record(
        &state,
        user.id,
        "camp",
        format!("{} registered for {}", user.full_name, camp.name),
        "🏕️",
    )
    .await;
    let date = camp.date.format("%Y-%m-%d").to_string();
    state
        .notifier
        .notify(&user.phone, &messages::camp_registered(&camp.name, &date, &camp.location))
        .await;

    Ok(Json(Flash::new(
        format!("Registered for {}!", camp.name),
        CampView { camp, is_registered: true },
    )))
}
