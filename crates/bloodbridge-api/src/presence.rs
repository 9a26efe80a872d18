use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Window in which a user counts as online.
pub const ONLINE_WINDOW: Duration = Duration::minutes(5);

/// Last-seen time per user, updated on every authenticated request.
#[derive(Default)]
pub struct Presence {
    last_seen: RwLock<HashMap<Uuid, DateTime<Utc>>>,
}

impl Presence {
    pub async fn touch(&self, user_id: Uuid) {
        self.touch_at(user_id, Utc::now()).await;
    }

    pub async fn touch_at(&self, user_id: Uuid, at: DateTime<Utc>) {
        self.last_seen.write().await.insert(user_id, at);
    }

    /// Users seen within [`ONLINE_WINDOW`] of `now`. Stale entries are dropped.
    pub async fn online_count(&self, now: DateTime<Utc>) -> usize {
        let mut last_seen = self.last_seen.write().await;
        last_seen.retain(|_, seen| now - *seen < ONLINE_WINDOW);
        last_seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_recent_users_are_online() {
        let presence = Presence::default();
        let now = Utc::now();
        presence.touch_at(Uuid::new_v4(), now - Duration::minutes(1)).await;
        presence.touch_at(Uuid::new_v4(), now - Duration::minutes(10)).await;

        let user = Uuid::new_v4();
        presence.touch_at(user, now - Duration::minutes(6)).await;
        presence.touch_at(user, now).await;

        assert_eq!(presence.online_count(now).await, 2);
    }
}
