use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blood::BloodGroup;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub phone: String,
    pub blood_group: BloodGroup,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Donated,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Donated => "donated",
            Self::Cancelled => "cancelled",
        }
    }

    /// Position in the forward-only lifecycle. Cancelled is terminal.
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Accepted => 1,
            Self::Donated | Self::Cancelled => 2,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "donated" => Ok(Self::Donated),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseEnumError { kind: "request status", value: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub const ALL: [Urgency; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Sort key for dashboards: critical first.
    pub fn priority(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// High and critical requests are flagged as urgent in notifications.
    pub fn is_urgent(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Low => "Within a week",
            Self::Medium => "Within 3 days",
            Self::High => "Within 24 hours",
            Self::Critical => "Immediate",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == s)
            .ok_or_else(|| ParseEnumError { kind: "urgency", value: s.to_string() })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub blood_group: BloodGroup,
    pub location: String,
    pub quantity: u32,
    pub urgency: Urgency,
    pub contact_phone: String,
    pub notes: String,
    pub status: RequestStatus,
    pub donor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub donated_at: Option<DateTime<Utc>>,
}

/// Stock level derived from the unit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryLevel {
    Critical,
    Low,
    Moderate,
    Sufficient,
}

impl InventoryLevel {
    pub fn for_units(units: i64) -> Self {
        match units {
            ..=5 => Self::Critical,
            6..=15 => Self::Low,
            16..=25 => Self::Moderate,
            _ => Self::Sufficient,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub blood_group: BloodGroup,
    pub units: i64,
    pub last_updated: DateTime<Utc>,
}

impl InventoryEntry {
    pub fn level(&self) -> InventoryLevel {
        InventoryLevel::for_units(self.units)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
        }
    }
}

impl FromStr for AlertStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "resolved" => Ok(Self::Resolved),
            _ => Err(ParseEnumError { kind: "alert status", value: s.to_string() }),
        }
    }
}

/// An SOS broadcast. Responders are tracked by user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requester_name: String,
    pub requester_phone: String,
    pub blood_group: BloodGroup,
    pub location: String,
    pub hospital: String,
    pub contact_phone: String,
    pub details: String,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub responders: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub message: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodCamp {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub date: chrono::NaiveDate,
    pub time: String,
    pub organizer: String,
    pub contact: String,
    pub registered: u32,
    pub capacity: u32,
}

impl BloodCamp {
    pub fn is_full(&self) -> bool {
        self.registered >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_levels() {
        assert_eq!(InventoryLevel::for_units(0), InventoryLevel::Critical);
        assert_eq!(InventoryLevel::for_units(5), InventoryLevel::Critical);
        assert_eq!(InventoryLevel::for_units(6), InventoryLevel::Low);
        assert_eq!(InventoryLevel::for_units(15), InventoryLevel::Low);
        assert_eq!(InventoryLevel::for_units(25), InventoryLevel::Moderate);
        assert_eq!(InventoryLevel::for_units(26), InventoryLevel::Sufficient);
    }

    #[test]
    fn urgency_priority_puts_critical_first() {
        let mut all = Urgency::ALL.to_vec();
        all.sort_by_key(|u| u.priority());
        assert_eq!(all, vec![Urgency::Critical, Urgency::High, Urgency::Medium, Urgency::Low]);
    }

    #[test]
    fn status_strings_round_trip_through_from_str() {
        for s in ["pending", "accepted", "donated", "cancelled"] {
            assert_eq!(s.parse::<RequestStatus>().unwrap().as_str(), s);
        }
        assert!("Pending".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            full_name: "John Smith".into(),
            email: "john@demo.com".into(),
            password_hash: "$argon2id$secret".into(),
            phone: "+91-98765-43210".into(),
            blood_group: BloodGroup::OPos,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["blood_group"], "O+");
    }
}
