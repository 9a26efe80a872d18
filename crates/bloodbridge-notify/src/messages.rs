//! SMS and topic message bodies.

use bloodbridge_types::BloodGroup;
use bloodbridge_types::models::Urgency;

pub fn welcome(name: &str) -> String {
    format!("Welcome to BloodBridge, {name}! 🩸 You're now part of a lifesaving community. Every drop counts!")
}

pub fn blood_request(group: BloodGroup, location: &str, urgency: Urgency, contact: &str) -> String {
    let urgent = if urgency.is_urgent() { "URGENT! " } else { "" };
    format!("🩸 {urgent}{group} blood needed at {location}. Contact: {contact}. Open BloodBridge to respond.")
}

pub fn donor_found(donor_name: &str, donor_group: BloodGroup, donor_phone: &str) -> String {
    format!("🎉 DONOR FOUND! {donor_name} ({donor_group}) will donate. Contact: {donor_phone}. BloodBridge")
}

pub fn donation_confirmed(donor_name: &str) -> String {
    format!("❤️ Thank you {donor_name}! Your donation confirmed. You've helped save up to 3 lives! - BloodBridge")
}

pub fn emergency(group: BloodGroup, hospital: &str, location: &str, contact: &str) -> String {
    format!(
        "🆘 EMERGENCY: {group} blood needed URGENTLY at {hospital}! Location: {location}. Contact: {contact}. Please help if you can!"
    )
}

/// Subject and body for the emergency topic.
pub fn emergency_broadcast(group: BloodGroup, location: &str, requester: &str) -> (String, String) {
    (
        format!("🆘 EMERGENCY: {group} Blood Needed"),
        format!(
            "EMERGENCY ALERT!\n\nBlood Type: {group}\nLocation: {location}\nUrgency: CRITICAL\nRequester: {requester}\n\nOpen BloodBridge now to help save a life!"
        ),
    )
}

pub fn emergency_response(donor_name: &str, donor_group: BloodGroup, donor_phone: &str) -> String {
    format!(
        "🦸 HELP IS COMING! {donor_name} ({donor_group}) is responding to your emergency. Contact: {donor_phone}"
    )
}

pub fn camp_registered(camp: &str, date: &str, location: &str) -> String {
    format!("🏕️ You're registered for {camp} on {date} at {location}. See you there! - BloodBridge")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgent_prefix_only_for_high_and_critical() {
        let low = blood_request(BloodGroup::APos, "City Hospital", Urgency::Low, "+91-98765-43211");
        assert!(!low.contains("URGENT"));
        assert!(low.contains("A+ blood needed at City Hospital"));

        let critical = blood_request(BloodGroup::ONeg, "Apollo", Urgency::Critical, "x");
        assert!(critical.starts_with("🩸 URGENT! O-"));
    }

    #[test]
    fn broadcast_subject_names_group() {
        let (subject, body) = emergency_broadcast(BloodGroup::AbNeg, "Downtown", "John");
        assert!(subject.contains("AB-"));
        assert!(body.contains("Requester: John"));
    }
}
