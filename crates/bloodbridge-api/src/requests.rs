use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use bloodbridge_db::models::RequestRow;
use bloodbridge_notify::messages;
use bloodbridge_types::api::{Claims, CreateBloodRequest, DashboardResponse, Flash, RequestView};
use bloodbridge_types::badges::donation_badges;
use bloodbridge_types::blood::matching_requests;
use bloodbridge_types::models::{BloodRequest, RequestStatus, Urgency, User};
use bloodbridge_types::{BloodGroup, phone};

use crate::activity;
use crate::error::ApiError;
use crate::extract::Input;
use crate::state::{AppState, run_db};

pub const MIN_QUANTITY: i64 = 1;
pub const MAX_QUANTITY: i64 = 10;

const NOT_FOUND: &str = "Blood request not found.";

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let (pending, my_requests, my_donations) = run_db(&state, move |db| {
        Ok((
            db.get_pending_requests()?,
            db.get_requests_by_requester(user_id)?,
            db.get_requests_by_donor(user_id)?,
        ))
    })
    .await?;

    let mut contacts: HashMap<Uuid, (Option<String>, Option<String>)> = HashMap::new();
    let mut requests = Vec::with_capacity(pending.len());
    for row in pending {
        contacts.insert(row.request.id, (row.requester_name, row.requester_phone));
        requests.push(row.request);
    }

    let mut matching: Vec<RequestView> = matching_requests(claims.blood_group, &requests)
        .into_iter()
        .map(|req| {
            let (name, phone) = contacts.remove(&req.id).unwrap_or_default();
            view(req.clone(), name, phone)
        })
        .collect();
    // Stable sort: equal urgencies keep oldest-first order.
    matching.sort_by_key(|v| v.request.urgency.priority());

    Ok(Json(DashboardResponse {
        user_blood_group: claims.blood_group,
        matching_requests: matching,
        my_requests,
        my_donations,
    }))
}

pub async fn list_requests(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.get_all_requests()).await?;
    let views: Vec<RequestView> = rows.into_iter().map(row_view).collect();
    Ok(Json(views))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = run_db(&state, move |db| db.get_request_row(request_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.into()))?;
    Ok(Json(row_view(row)))
}

pub async fn create_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Input(req): Input<CreateBloodRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let location = req.location.trim().to_string();
    let contact_phone = req.contact_phone.trim().to_string();

    let mut errors = Vec::new();
    if location.is_empty() {
        errors.push("Location is required.");
    }
    let blood_group = req.blood_group.parse::<BloodGroup>().ok();
    if blood_group.is_none() {
        errors.push("Please select a valid blood group.");
    }
    let quantity = req.quantity.value();
    match quantity {
        None => errors.push("Quantity must be a number."),
        Some(q) if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&q) => {
            errors.push("Quantity must be between 1 and 10.")
        }
        Some(_) => {}
    }
    let urgency = req.urgency.trim().parse::<Urgency>().ok();
    if urgency.is_none() {
        errors.push("Please select urgency level.");
    }
    if !contact_phone.is_empty() && !phone::is_valid(&contact_phone) {
        errors.push("Please enter a valid contact phone number.");
    }

    let (Some(blood_group), Some(quantity), Some(urgency), true) =
        (blood_group, quantity, urgency, errors.is_empty())
    else {
        return Err(ApiError::Validation(errors.into_iter().map(String::from).collect()));
    };

    let requester = load_user(&state, claims.sub).await?;
    let contact_phone = if contact_phone.is_empty() {
        requester.phone.clone()
    } else {
        contact_phone
    };

    let request = BloodRequest {
        id: Uuid::new_v4(),
        requester_id: requester.id,
        blood_group,
        location,
        quantity: quantity as u32,
        urgency,
        contact_phone,
        notes: req.notes.trim().to_string(),
        status: RequestStatus::Pending,
        donor_id: None,
        created_at: Utc::now(),
        accepted_at: None,
        donated_at: None,
    };

    let row = request.clone();
    run_db(&state, move |db| db.insert_request(&row)).await?;
    info!(
        "Blood request {} created: {} x{} at {} ({})",
        request.id, request.blood_group, request.quantity, request.location, request.urgency
    );

    activity::record(
        &state,
        requester.id,
        "request",
        format!("{} needs {} blood at {}", requester.full_name, blood_group, request.location),
        "🩸",
    )
    .await;

    notify_compatible_donors(&state, &request, &requester).await;

    Ok((
        StatusCode::CREATED,
        Json(Flash::new(
            "Blood request created successfully! Compatible donors have been notified.",
            request,
        )),
    ))
}

pub async fn respond(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut request = load_request(&state, request_id).await?;
    request.respond(claims.sub, Utc::now())?;
    persist(&state, &request, RequestStatus::Pending).await?;
    info!("Donor {} accepted request {}", claims.sub, request.id);

    let (donor_id, requester_id) = (claims.sub, request.requester_id);
    let (donor, requester) = run_db(&state, move |db| {
        Ok((db.get_user_by_id(donor_id)?, db.get_user_by_id(requester_id)?))
    })
    .await?;

    if let Some(donor) = &donor {
        activity::record(
            &state,
            donor.id,
            "donation_offer",
            format!("{} offered to donate {} blood!", donor.full_name, request.blood_group),
            "💉",
        )
        .await;

        if let Some(requester) = &requester {
            let message = messages::donor_found(&donor.full_name, donor.blood_group, &donor.phone);
            state.notifier.notify(&requester.phone, &message).await;
        }
    }

    Ok(Json(Flash::new(
        "Thank you for offering to donate! The requester has been notified.",
        request,
    )))
}

pub async fn confirm(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut request = load_request(&state, request_id).await?;
    request.confirm(claims.sub, Utc::now())?;

    // Status change and inventory credit commit together.
    let row = request.clone();
    if !run_db(&state, move |db| db.record_donation(&row)).await? {
        return Err(ApiError::Conflict(
            "This request was updated by someone else. Please refresh.".into(),
        ));
    }
    info!(
        "Donation confirmed for request {}: +{} units {}",
        request.id, request.quantity, request.blood_group
    );

    if let Some(donor_id) = request.donor_id {
        let (donor, total) = run_db(&state, move |db| {
            Ok((db.get_user_by_id(donor_id)?, db.count_donations_by(donor_id)?))
        })
        .await?;

        match donor {
            Some(donor) => {
                activity::award_badges(&state, &donor, donation_badges(total, Some(donor.blood_group)))
                    .await;
                activity::record(
                    &state,
                    donor.id,
                    "donation_complete",
                    format!("{} completed a blood donation! 🎉", donor.full_name),
                    "✅",
                )
                .await;
                state
                    .notifier
                    .notify(&donor.phone, &messages::donation_confirmed(&donor.full_name))
                    .await;
            }
            None => warn!("Donor {} of request {} no longer exists", donor_id, request.id),
        }
    }

    Ok(Json(Flash::new("Donation confirmed! Thank you!", request)))
}

pub async fn cancel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut request = load_request(&state, request_id).await?;
    let previous = request.status;
    request.cancel(claims.sub)?;
    persist(&state, &request, previous).await?;
    info!("Request {} cancelled by requester", request.id);

    Ok(Json(Flash::new("Request cancelled.", request)))
}

/// SMS every compatible donor except the requester, and post to the alerts
/// topic.
async fn notify_compatible_donors(state: &AppState, request: &BloodRequest, requester: &User) {
    let groups = request.blood_group.compatible_donors();
    let donors = match run_db(state, move |db| db.get_users_in_groups(&groups)).await {
        Ok(donors) => donors,
        Err(e) => {
            warn!("Could not load compatible donors for {}: {}", request.id, e);
            return;
        }
    };

    let phones: Vec<String> = donors
        .into_iter()
        .filter(|u| u.id != requester.id && !u.phone.is_empty())
        .map(|u| u.phone)
        .collect();

    let message = messages::blood_request(
        request.blood_group,
        &request.location,
        request.urgency,
        &requester.full_name,
    );
    state.notifier.notify_many(&phones, &message).await;
    state
        .notifier
        .alert(&format!("🩸 {} Blood Needed", request.blood_group), &message)
        .await;
}

async fn load_request(state: &AppState, request_id: Uuid) -> Result<BloodRequest, ApiError> {
    run_db(state, move |db| db.get_request(request_id))
        .await?
        .ok_or_else(|| ApiError::NotFound(NOT_FOUND.into()))
}

pub(crate) async fn load_user(state: &AppState, user_id: Uuid) -> Result<User, ApiError> {
    run_db(state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(crate::middleware::LOGIN_REQUIRED.into()))
}

/// Write a transition guarded on `from`. Losing the race is a conflict.
async fn persist(state: &AppState, request: &BloodRequest, from: RequestStatus) -> Result<(), ApiError> {
    let row = request.clone();
    if run_db(state, move |db| db.apply_transition(&row, from)).await? {
        Ok(())
    } else {
        Err(ApiError::Conflict("This request is no longer available.".into()))
    }
}

fn view(request: BloodRequest, name: Option<String>, phone: Option<String>) -> RequestView {
    RequestView {
        request,
        requester_name: name.unwrap_or_else(|| "Unknown".to_string()),
        requester_phone: phone.unwrap_or_else(|| "N/A".to_string()),
    }
}

fn row_view(row: RequestRow) -> RequestView {
    view(row.request, row.requester_name, row.requester_phone)
}
