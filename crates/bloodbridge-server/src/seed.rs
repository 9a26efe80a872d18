//! Demo data for a fresh database.

use anyhow::Result;
use chrono::{Duration, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::info;
use uuid::Uuid;

use bloodbridge_api::auth::hash_password;
use bloodbridge_db::Database;
use bloodbridge_types::BloodGroup;
use bloodbridge_types::models::{
    Activity, AlertStatus, BloodCamp, BloodRequest, EmergencyAlert, RequestStatus, Urgency, User,
};

pub const DEMO_PASSWORD: &str = "demo123";

const DEMO_USERS: [(&str, &str, &str, BloodGroup); 6] = [
    ("John Smith", "john@demo.com", "+91-98765-43210", BloodGroup::OPos),
    ("Sarah Johnson", "sarah@demo.com", "+91-98765-43211", BloodGroup::APos),
    ("Mike Wilson", "mike@demo.com", "+91-98765-43212", BloodGroup::BPos),
    ("Emily Davis", "emily@demo.com", "+91-98765-43213", BloodGroup::AbPos),
    ("David Brown", "david@demo.com", "+91-98765-43214", BloodGroup::ONeg),
    ("Lisa Garcia", "lisa@demo.com", "+91-98765-43215", BloodGroup::ANeg),
];

const LOCATIONS: [&str; 4] = [
    "City Hospital",
    "General Medical Center",
    "St. Mary Hospital",
    "Apollo Hospital",
];

/// Seed users, requests, activities, one emergency and two camps.
/// Does nothing (and returns false) once any user exists.
pub fn seed_demo(db: &Database) -> Result<bool> {
    if db.count_users()? > 0 {
        return Ok(false);
    }

    let mut rng = rand::rng();
    let now = Utc::now();

    let mut users = Vec::with_capacity(DEMO_USERS.len());
    for (name, email, phone, group) in DEMO_USERS {
        let user = User {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(DEMO_PASSWORD)?,
            phone: phone.to_string(),
            blood_group: group,
            created_at: now,
        };
        db.create_user(&user)?;
        users.push(user);
    }

    for i in 0..6 {
        let requester = &users[i % users.len()];
        let request = BloodRequest {
            id: Uuid::new_v4(),
            requester_id: requester.id,
            blood_group: *BloodGroup::ALL.choose(&mut rng).unwrap_or(&BloodGroup::OPos),
            location: LOCATIONS.choose(&mut rng).unwrap_or(&LOCATIONS[0]).to_string(),
            quantity: rng.random_range(1..=4),
            urgency: *Urgency::ALL.choose(&mut rng).unwrap_or(&Urgency::Medium),
            contact_phone: requester.phone.clone(),
            notes: String::new(),
            status: RequestStatus::Pending,
            donor_id: None,
            created_at: now - Duration::hours(rng.random_range(1..=48)),
            accepted_at: None,
            donated_at: None,
        };
        db.insert_request(&request)?;
    }

    let john = &users[0];
    let activities = [
        ("donation_complete", "💉 John Smith donated O+ blood", "✅"),
        ("emergency", "🚨 EMERGENCY: AB- needed at General Medical!", "🚨"),
        ("registration", "New donor Emily Davis joined!", "🎉"),
        ("request", "Sarah Johnson needs A+ blood at City Hospital", "🩸"),
    ];
    for (kind, message, icon) in activities {
        db.add_activity(&Activity {
            id: Uuid::new_v4(),
            user_id: john.id,
            kind: kind.to_string(),
            message: message.to_string(),
            icon: icon.to_string(),
            created_at: now - Duration::minutes(rng.random_range(1..=120)),
        })?;
    }

    db.insert_alert(&EmergencyAlert {
        id: Uuid::new_v4(),
        requester_id: john.id,
        requester_name: john.full_name.clone(),
        requester_phone: john.phone.clone(),
        blood_group: BloodGroup::ONeg,
        location: "Downtown Emergency Center".into(),
        hospital: "City General Hospital".into(),
        contact_phone: john.phone.clone(),
        details: "Accident victim needs immediate transfusion".into(),
        status: AlertStatus::Active,
        created_at: now,
        responders: Vec::new(),
    })?;

    let today = now.date_naive();
    let camps = [
        BloodCamp {
            id: Uuid::new_v4(),
            name: "City Hospital Blood Drive".into(),
            location: "City Hospital, Main Street".into(),
            date: today + Duration::days(3),
            time: "09:00 AM - 05:00 PM".into(),
            organizer: "City Hospital".into(),
            contact: "+1-555-0100".into(),
            registered: 45,
            capacity: 100,
        },
        BloodCamp {
            id: Uuid::new_v4(),
            name: "University Blood Donation Camp".into(),
            location: "University Auditorium".into(),
            date: today + Duration::days(7),
            time: "10:00 AM - 04:00 PM".into(),
            organizer: "University Health Club".into(),
            contact: "+1-555-0200".into(),
            registered: 78,
            capacity: 150,
        },
    ];
    for camp in &camps {
        db.insert_camp(camp)?;
    }

    info!("Seeded demo data. Login: {} / {}", DEMO_USERS[0].1, DEMO_PASSWORD);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_once() {
        let db = Database::open_in_memory().unwrap();
        assert!(seed_demo(&db).unwrap());
        assert!(!seed_demo(&db).unwrap());

        assert_eq!(db.count_users().unwrap(), 6);
        assert_eq!(db.get_pending_requests().unwrap().len(), 6);
        assert_eq!(db.get_active_alerts().unwrap().len(), 1);
        assert_eq!(db.get_camps().unwrap().len(), 2);
        assert_eq!(db.get_recent_activities(10).unwrap().len(), 4);

        let john = db.get_user_by_email("john@demo.com").unwrap().unwrap();
        assert!(bloodbridge_api::auth::verify_password(&john.password_hash, DEMO_PASSWORD));
    }

    #[test]
    fn skips_populated_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("seed.db")).unwrap();
        db.create_user(&User {
            id: Uuid::new_v4(),
            full_name: "Existing".into(),
            email: "existing@example.com".into(),
            password_hash: String::new(),
            phone: "9876543210".into(),
            blood_group: BloodGroup::BNeg,
            created_at: Utc::now(),
        })
        .unwrap();

        assert!(!seed_demo(&db).unwrap());
        assert_eq!(db.count_users().unwrap(), 1);
    }
}
