use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::badges::{Badge, BadgeInfo};
use crate::blood::BloodGroup;
use crate::models::{BloodCamp, BloodRequest, EmergencyAlert, InventoryLevel, Urgency, User};

// -- JWT Claims --

/// Bearer token claims. `sid` ties the token to a session row so that logout
/// can revoke it before `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub sid: Uuid,
    pub name: String,
    pub blood_group: BloodGroup,
    pub exp: usize,
}

// -- Flash --

/// A successful mutation: the user-facing message plus the payload.
#[derive(Debug, Serialize)]
pub struct Flash<T> {
    pub message: String,
    pub data: T,
}

impl<T> Flash<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self { message: message.into(), data }
    }
}

// -- Auth --

/// Registration form. Every field defaults to empty so that missing fields
/// surface as validation messages rather than decode errors.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub blood_group: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

// -- Requests --

/// Quantity as typed into a form (`"2"`) or sent as a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(i64),
    Text(String),
}

impl NumberInput {
    pub fn value(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Default for NumberInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBloodRequest {
    pub location: String,
    pub blood_group: String,
    pub quantity: NumberInput,
    pub urgency: String,
    pub contact_phone: String,
    pub notes: String,
}

/// A request enriched with the requester's name and phone.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: BloodRequest,
    pub requester_name: String,
    pub requester_phone: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user_blood_group: BloodGroup,
    pub matching_requests: Vec<RequestView>,
    pub my_requests: Vec<BloodRequest>,
    pub my_donations: Vec<BloodRequest>,
}

// -- Inventory --

#[derive(Debug, Clone, Serialize)]
pub struct InventoryView {
    pub blood_group: BloodGroup,
    pub units: i64,
    pub level: InventoryLevel,
    pub last_updated: DateTime<Utc>,
}

// -- Emergencies --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SosRequest {
    pub blood_group: Option<String>,
    pub location: Option<String>,
    pub hospital: Option<String>,
    pub contact_phone: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: EmergencyAlert,
    pub can_help: bool,
    pub responder_count: usize,
}

// -- Camps --

#[derive(Debug, Clone, Serialize)]
pub struct CampView {
    #[serde(flatten)]
    pub camp: BloodCamp,
    pub is_registered: bool,
}

// -- Profile / leaderboard --

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub donations: u32,
    pub requests: u32,
    pub lives_saved: u32,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: User,
    pub stats: UserStats,
    pub badges: Vec<BadgeInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: Uuid,
    pub name: String,
    pub blood_group: BloodGroup,
    pub donations: u32,
    pub lives_saved: u32,
    pub badges: u32,
}

// -- Realtime --

#[derive(Debug, Serialize)]
pub struct RealtimeStats {
    pub active_requests: u32,
    pub online_donors: usize,
    pub critical_alerts: u32,
    pub donations_today: u32,
}

#[derive(Debug, Serialize)]
pub struct ActivityView {
    pub icon: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct PendingSummary {
    pub request_id: Uuid,
    pub blood_group: BloodGroup,
    pub location: String,
    pub urgency: Urgency,
}

#[derive(Debug, Serialize)]
pub struct RealtimeData {
    pub stats: RealtimeStats,
    pub inventory: Vec<InventoryView>,
    pub activities: Vec<ActivityView>,
    pub requests: Vec<PendingSummary>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CompatibilityEntry {
    pub blood_group: BloodGroup,
    pub can_donate_to: Vec<BloodGroup>,
    pub can_receive_from: Vec<BloodGroup>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_from_form_or_json() {
        let form: CreateBloodRequest = serde_json::from_str(r#"{"quantity":"3"}"#).unwrap();
        assert_eq!(form.quantity.value(), Some(3));

        let json: CreateBloodRequest = serde_json::from_str(r#"{"quantity":4}"#).unwrap();
        assert_eq!(json.quantity.value(), Some(4));

        let junk: CreateBloodRequest = serde_json::from_str(r#"{"quantity":"lots"}"#).unwrap();
        assert_eq!(junk.quantity.value(), None);

        let missing: CreateBloodRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.quantity.value(), None);
        assert!(missing.location.is_empty());
    }
}
