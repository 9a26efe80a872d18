use axum::{Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use rand::seq::IndexedRandom;
use serde_json::json;

use bloodbridge_types::BloodGroup;
use bloodbridge_types::api::{
    ActivityView, CompatibilityEntry, PendingSummary, RealtimeData, RealtimeStats,
};
use bloodbridge_types::models::{AlertStatus, RequestStatus};

use crate::error::ApiError;
use crate::inventory;
use crate::state::{AppState, run_db};

/// Activities younger than this are flagged `is_new`.
const NEW_ACTIVITY_WINDOW: Duration = Duration::seconds(60);
const FEED_SIZE: u32 = 10;

pub const BLOOD_FACTS: [&str; 10] = [
    "One donation can save up to 3 lives!",
    "Blood cannot be manufactured. It can only come from donors.",
    "Type O- is the universal donor blood type.",
    "Only 7% of people have O- blood type.",
    "Red blood cells can be stored for up to 42 days.",
    "A single car accident victim may need up to 100 units of blood.",
    "Blood donation takes only about 10 minutes.",
    "Every 2 seconds, someone needs blood.",
    "AB+ is the universal recipient blood type.",
    "Donated blood is tested for HIV, Hepatitis B & C, and other diseases.",
];

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Polled by the live dashboard.
pub async fn realtime_data(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .unwrap_or(now);

    let (active_requests, critical_alerts, donations_today, inventory, activities, pending) =
        run_db(&state, move |db| {
            Ok((
                db.count_requests_with_status(RequestStatus::Pending)?,
                db.count_alerts_with_status(AlertStatus::Active)?,
                db.count_donations_since(midnight)?,
                db.get_inventory()?,
                db.get_recent_activities(FEED_SIZE)?,
                db.get_pending_requests()?,
            ))
        })
        .await?;

    Ok(Json(RealtimeData {
        stats: RealtimeStats {
            active_requests,
            online_donors: state.presence.online_count(now).await,
            critical_alerts,
            donations_today,
        },
        inventory: inventory::views(inventory),
        activities: activities
            .into_iter()
            .map(|a| ActivityView {
                is_new: now - a.created_at < NEW_ACTIVITY_WINDOW,
                icon: a.icon,
                message: a.message,
                timestamp: a.created_at,
            })
            .collect(),
        requests: pending
            .into_iter()
            .map(|row| PendingSummary {
                request_id: row.request.id,
                blood_group: row.request.blood_group,
                location: row.request.location,
                urgency: row.request.urgency,
            })
            .collect(),
        timestamp: now,
    }))
}

pub async fn blood_facts() -> impl IntoResponse {
    let fact = BLOOD_FACTS.choose(&mut rand::rng()).copied().unwrap_or(BLOOD_FACTS[0]);
    Json(json!({ "fact": fact }))
}

pub async fn compatibility() -> impl IntoResponse {
    let table: Vec<CompatibilityEntry> = BloodGroup::ALL
        .into_iter()
        .map(|group| CompatibilityEntry {
            blood_group: group,
            can_donate_to: group.compatible_recipients().to_vec(),
            can_receive_from: group.compatible_donors(),
        })
        .collect();
    Json(table)
}
