use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{BloodRequest, RequestStatus};

/// ABO/Rh blood group. Serialized as the conventional label (`"AB-"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

use BloodGroup::*;

impl BloodGroup {
    /// Every group, in display order.
    pub const ALL: [BloodGroup; 8] = [APos, ANeg, BPos, BNeg, AbPos, AbNeg, OPos, ONeg];

    pub fn as_str(self) -> &'static str {
        match self {
            APos => "A+",
            ANeg => "A-",
            BPos => "B+",
            BNeg => "B-",
            AbPos => "AB+",
            AbNeg => "AB-",
            OPos => "O+",
            ONeg => "O-",
        }
    }

    /// Groups this donor may give blood to.
    pub fn compatible_recipients(self) -> &'static [BloodGroup] {
        match self {
            ONeg => &[APos, ANeg, BPos, BNeg, AbPos, AbNeg, OPos, ONeg],
            OPos => &[APos, BPos, AbPos, OPos],
            ANeg => &[APos, ANeg, AbPos, AbNeg],
            APos => &[APos, AbPos],
            BNeg => &[BPos, BNeg, AbPos, AbNeg],
            BPos => &[BPos, AbPos],
            AbNeg => &[AbPos, AbNeg],
            AbPos => &[AbPos],
        }
    }

    pub fn can_donate_to(self, recipient: BloodGroup) -> bool {
        self.compatible_recipients().contains(&recipient)
    }

    /// Groups this recipient may receive from (the inverse of the table above).
    pub fn compatible_donors(self) -> Vec<BloodGroup> {
        Self::ALL
            .into_iter()
            .filter(|donor| donor.can_donate_to(self))
            .collect()
    }

    /// AB-, B- and O- are rare enough to earn the rare donor badge.
    pub fn is_rare(self) -> bool {
        matches!(self, AbNeg | BNeg | ONeg)
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown blood group: {0:?}")]
pub struct ParseBloodGroupError(pub String);

impl FromStr for BloodGroup {
    type Err = ParseBloodGroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseBloodGroupError(s.to_string()))
    }
}

/// Pending requests a donor of `donor` group can fulfil, in input order.
pub fn matching_requests<'a, I>(donor: BloodGroup, requests: I) -> Vec<&'a BloodRequest>
where
    I: IntoIterator<Item = &'a BloodRequest>,
{
    let recipients = donor.compatible_recipients();
    requests
        .into_iter()
        .filter(|r| r.status == RequestStatus::Pending && recipients.contains(&r.blood_group))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::Urgency;

    fn request(group: BloodGroup, status: RequestStatus) -> BloodRequest {
        BloodRequest {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            blood_group: group,
            location: "City Hospital".into(),
            quantity: 1,
            urgency: Urgency::Medium,
            contact_phone: "+919876543210".into(),
            notes: String::new(),
            status,
            donor_id: None,
            created_at: Utc::now(),
            accepted_at: None,
            donated_at: None,
        }
    }

    #[test]
    fn table_matches_abo_rh_rules() {
        // A donor can give to a recipient iff the recipient carries every
        // antigen the donor carries (A, B, Rh D).
        fn antigens(g: BloodGroup) -> (bool, bool, bool) {
            match g {
                APos => (true, false, true),
                ANeg => (true, false, false),
                BPos => (false, true, true),
                BNeg => (false, true, false),
                AbPos => (true, true, true),
                AbNeg => (true, true, false),
                OPos => (false, false, true),
                ONeg => (false, false, false),
            }
        }

        for donor in BloodGroup::ALL {
            for recipient in BloodGroup::ALL {
                let (da, db, dd) = antigens(donor);
                let (ra, rb, rd) = antigens(recipient);
                let expected = (!da || ra) && (!db || rb) && (!dd || rd);
                assert_eq!(
                    donor.can_donate_to(recipient),
                    expected,
                    "{donor} -> {recipient}"
                );
            }
        }
    }

    #[test]
    fn universal_donor_and_recipient() {
        assert_eq!(ONeg.compatible_recipients().len(), 8);
        assert_eq!(AbPos.compatible_recipients(), &[AbPos]);
        assert_eq!(AbPos.compatible_donors().len(), 8);
        assert_eq!(ONeg.compatible_donors(), vec![ONeg]);
    }

    #[test]
    fn o_positive_row() {
        let mut got = OPos.compatible_recipients().to_vec();
        got.sort();
        let mut want = vec![APos, BPos, AbPos, OPos];
        want.sort();
        assert_eq!(got, want);
    }

    #[test]
    fn parse_and_display() {
        for g in BloodGroup::ALL {
            assert_eq!(g.to_string().parse::<BloodGroup>().unwrap(), g);
        }
        assert_eq!("ab-".parse::<BloodGroup>().unwrap(), AbNeg);
        assert!("C+".parse::<BloodGroup>().is_err());
        assert!("".parse::<BloodGroup>().is_err());
    }

    #[test]
    fn serde_uses_labels() {
        assert_eq!(serde_json::to_string(&AbNeg).unwrap(), "\"AB-\"");
        let g: BloodGroup = serde_json::from_str("\"O+\"").unwrap();
        assert_eq!(g, OPos);
    }

    #[test]
    fn rare_groups() {
        let rare: Vec<_> = BloodGroup::ALL.into_iter().filter(|g| g.is_rare()).collect();
        assert_eq!(rare, vec![BNeg, AbNeg, ONeg]);
    }

    #[test]
    fn matching_skips_incompatible_and_non_pending() {
        let requests = vec![
            request(APos, RequestStatus::Pending),
            request(ANeg, RequestStatus::Pending),
            request(BPos, RequestStatus::Accepted),
            request(AbPos, RequestStatus::Pending),
            request(OPos, RequestStatus::Donated),
        ];

        let matched = matching_requests(OPos, &requests);
        let groups: Vec<_> = matched.iter().map(|r| r.blood_group).collect();
        assert_eq!(groups, vec![APos, AbPos]);

        assert_eq!(matching_requests(ONeg, &requests).len(), 3);
        assert!(matching_requests(AbPos, &requests[..2]).is_empty());
    }
}
