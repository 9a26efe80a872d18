//! Query-specific row types that have no counterpart in bloodbridge-types.
use bloodbridge_types::BloodGroup;
use bloodbridge_types::models::BloodRequest;
use uuid::Uuid;

/// A request joined with its requester. `None` fields mean the requester row
/// is gone.
pub struct RequestRow {
    pub request: BloodRequest,
    pub requester_name: Option<String>,
    pub requester_phone: Option<String>,
}

pub struct LeaderboardRow {
    pub user_id: Uuid,
    pub full_name: String,
    pub blood_group: BloodGroup,
    pub donations: u32,
    pub badges: u32,
}

/// Outcome of a camp registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampRegistration {
    Registered,
    AlreadyRegistered,
    Full,
    NotFound,
}
