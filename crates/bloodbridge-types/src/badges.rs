use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::blood::BloodGroup;
use crate::models::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstBlood,
    #[serde(rename = "lifesaver_3")]
    Lifesaver3,
    Hero,
    EmergencyResponder,
    RareDonor,
}

impl Badge {
    pub const ALL: [Badge; 5] = [
        Self::FirstBlood,
        Self::Lifesaver3,
        Self::Hero,
        Self::EmergencyResponder,
        Self::RareDonor,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::FirstBlood => "first_blood",
            Self::Lifesaver3 => "lifesaver_3",
            Self::Hero => "hero",
            Self::EmergencyResponder => "emergency_responder",
            Self::RareDonor => "rare_donor",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FirstBlood => "First Blood",
            Self::Lifesaver3 => "Lifesaver",
            Self::Hero => "Hero",
            Self::EmergencyResponder => "Emergency Responder",
            Self::RareDonor => "Rare Donor",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::FirstBlood => "🩸",
            Self::Lifesaver3 => "💖",
            Self::Hero => "🦸",
            Self::EmergencyResponder => "🚨",
            Self::RareDonor => "💎",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::FirstBlood => "Made your first donation",
            Self::Lifesaver3 => "Saved 3 lives (1 donation = 3 lives)",
            Self::Hero => "Made 5+ donations",
            Self::EmergencyResponder => "Responded to an emergency",
            Self::RareDonor => "Donated rare blood type (AB-, B-, O-)",
        }
    }

    pub fn info(self) -> BadgeInfo {
        BadgeInfo {
            key: self,
            name: self.name(),
            icon: self.icon(),
            description: self.description(),
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Badge {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.key() == s)
            .ok_or_else(|| ParseEnumError { kind: "badge", value: s.to_string() })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BadgeInfo {
    pub key: Badge,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
}

/// Badges a donor qualifies for after a confirmed donation.
/// `total_donations` includes the donation just confirmed.
pub fn donation_badges(total_donations: u32, donor_group: Option<BloodGroup>) -> Vec<Badge> {
    let mut earned = Vec::new();
    if total_donations >= 1 {
        earned.push(Badge::FirstBlood);
    }
    if total_donations >= 3 {
        earned.push(Badge::Lifesaver3);
    }
    if total_donations >= 5 {
        earned.push(Badge::Hero);
    }
    if donor_group.is_some_and(BloodGroup::is_rare) {
        earned.push(Badge::RareDonor);
    }
    earned
}

/// One donation is counted as three lives.
pub fn lives_saved(donations: u32) -> u32 {
    donations * 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds() {
        assert_eq!(donation_badges(1, Some(BloodGroup::APos)), vec![Badge::FirstBlood]);
        assert_eq!(
            donation_badges(3, Some(BloodGroup::APos)),
            vec![Badge::FirstBlood, Badge::Lifesaver3]
        );
        assert_eq!(
            donation_badges(5, Some(BloodGroup::ONeg)),
            vec![Badge::FirstBlood, Badge::Lifesaver3, Badge::Hero, Badge::RareDonor]
        );
        assert_eq!(donation_badges(1, None), vec![Badge::FirstBlood]);
    }

    #[test]
    fn keys_parse_back() {
        for badge in Badge::ALL {
            assert_eq!(badge.key().parse::<Badge>().unwrap(), badge);
            assert_eq!(
                serde_json::to_value(badge).unwrap(),
                serde_json::Value::String(badge.key().to_string())
            );
        }
    }
}
