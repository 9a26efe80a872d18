use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use bloodbridge_notify::messages;
use bloodbridge_types::api::{AlertView, Claims, Flash, SosRequest};
use bloodbridge_types::badges::Badge;
use bloodbridge_types::models::{AlertStatus, EmergencyAlert};
use bloodbridge_types::{BloodGroup, phone};

use crate::activity;
use crate::error::ApiError;
use crate::extract::Input;
use crate::requests::load_user;
use crate::state::{AppState, run_db};

const DEFAULT_LOCATION: &str = "Emergency Location";
const DEFAULT_HOSPITAL: &str = "Nearest Hospital";
const DEFAULT_DETAILS: &str = "SOS EMERGENCY - Immediate blood needed!";

/// One-tap SOS. Every field falls back to the sender's profile or a stock
/// value, so an empty body is a valid alert.
pub async fn create_sos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Input(sos): Input<SosRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = load_user(&state, claims.sub).await?;

    let blood_group = match given(sos.blood_group) {
        Some(raw) => raw
            .parse::<BloodGroup>()
            .map_err(|_| ApiError::invalid("Please select a valid blood group."))?,
        None => user.blood_group,
    };
    let contact_phone = match given(sos.contact_phone) {
        Some(p) if !phone::is_valid(&p) => {
            return Err(ApiError::invalid("Please enter a valid contact phone number."));
        }
        Some(p) => p,
        None => user.phone.clone(),
    };

    let alert = EmergencyAlert {
        id: Uuid::new_v4(),
        requester_id: user.id,
        requester_name: user.full_name.clone(),
        requester_phone: user.phone.clone(),
        blood_group,
        location: given(sos.location).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        hospital: given(sos.hospital).unwrap_or_else(|| DEFAULT_HOSPITAL.to_string()),
        contact_phone,
        details: given(sos.details).unwrap_or_else(|| DEFAULT_DETAILS.to_string()),
        status: AlertStatus::Active,
        created_at: Utc::now(),
        responders: Vec::new(),
    };

    let row = alert.clone();
    run_db(&state, move |db| db.insert_alert(&row)).await?;
    info!("SOS alert {} raised by {} for {}", alert.id, user.id, alert.blood_group);

    activity::record(
        &state,
        user.id,
        "sos",
        format!("🆘 SOS ALERT from {}!", user.full_name),
        "🆘",
    )
    .await;

    // Broadcast
    let groups = alert.blood_group.compatible_donors();
    match run_db(&state, move |db| db.get_users_in_groups(&groups)).await {
        Ok(donors) => {
            let phones: Vec<String> = donors
                .into_iter()
                .filter(|d| d.id != user.id && !d.phone.is_empty())
                .map(|d| d.phone)
                .collect();
            let message = messages::emergency(
                alert.blood_group,
                &alert.hospital,
                &alert.location,
                &alert.contact_phone,
            );
            state.notifier.notify_many(&phones, &message).await;
        }
        Err(e) => warn!("Could not load donors for SOS {}: {}", alert.id, e),
    }
    let (subject, body) =
        messages::emergency_broadcast(alert.blood_group, &alert.location, &user.full_name);
    state.notifier.broadcast_emergency(&subject, &body).await;

    Ok((
        StatusCode::CREATED,
        Json(Flash::new(
            "🆘 SOS Alert sent! All compatible donors have been notified via SMS!",
            alert_view(alert, claims.blood_group),
        )),
    ))
}

pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = run_db(&state, |db| db.get_active_alerts()).await?;
    let views: Vec<AlertView> = alerts
        .into_iter()
        .map(|a| alert_view(a, claims.blood_group))
        .collect();
    Ok(Json(views))
}

pub async fn respond_alert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(alert_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut alert = run_db(&state, move |db| db.get_alert(alert_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Alert not found.".into()))?;

    let already = || ApiError::Conflict("Already responded.".into());
    if alert.responders.contains(&claims.sub) {
        return Err(already());
    }
    if alert.requester_id == claims.sub {
        return Err(ApiError::Forbidden(
            "You cannot respond to your own emergency.".into(),
        ));
    }

    let responder = claims.sub;
    if !run_db(&state, move |db| db.add_responder(alert_id, responder, Utc::now())).await? {
        return Err(already());
    }
    alert.responders.push(responder);
    info!("User {} responded to alert {}", responder, alert.id);

    let donor = load_user(&state, responder).await?;
    activity::award_badges(&state, &donor, vec![Badge::EmergencyResponder]).await;
    activity::record(
        &state,
        donor.id,
        "emergency_response",
        format!("{} responded to emergency!", donor.full_name),
        "🦸",
    )
    .await;

    if !alert.contact_phone.is_empty() {
        let message = messages::emergency_response(&donor.full_name, donor.blood_group, &donor.phone);
        state.notifier.notify(&alert.contact_phone, &message).await;
    }

    Ok(Json(Flash::new(
        "Thank you! The requester has been notified via SMS.",
        alert_view(alert, claims.blood_group),
    )))
}

fn alert_view(alert: EmergencyAlert, viewer_group: BloodGroup) -> AlertView {
    AlertView {
        can_help: viewer_group.can_donate_to(alert.blood_group),
        responder_count: alert.responders.len(),
        alert,
    }
}

/// Treat blank form fields as absent.
fn given(field: Option<String>) -> Option<String> {
    field
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
