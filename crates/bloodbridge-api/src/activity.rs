use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use bloodbridge_types::badges::Badge;
use bloodbridge_types::models::{Activity, User};

use crate::state::{AppState, run_db};

/// Append to the activity feed. The feed is secondary to the action that
/// produced it, so failures are only logged.
pub async fn record(state: &AppState, user_id: Uuid, kind: &str, message: String, icon: &str) {
    let activity = Activity {
        id: Uuid::new_v4(),
        user_id,
        kind: kind.to_string(),
        message,
        icon: icon.to_string(),
        created_at: Utc::now(),
    };

    if let Err(e) = run_db(state, move |db| db.add_activity(&activity)).await {
        warn!("Failed to record activity: {}", e);
    }
}

/// Award each badge the user does not already hold and announce the new ones.
pub async fn award_badges(state: &AppState, user: &User, badges: Vec<Badge>) {
    for badge in badges {
        let user_id = user.id;
        match run_db(state, move |db| db.award_badge(user_id, badge, Utc::now())).await {
            Ok(true) => {
                info!("{} earned badge {}", user.id, badge.key());
                record(
                    state,
                    user.id,
                    "badge",
                    format!("{} earned {}!", user.full_name, badge.name()),
                    badge.icon(),
                )
                .await;
            }
            Ok(false) => {}
            Err(e) => warn!("Failed to award badge {}: {}", badge.key(), e),
        }
    }
}
