use axum::{Extension, Json, extract::State, response::IntoResponse};

use bloodbridge_types::api::{Claims, LeaderboardEntry, ProfileResponse, UserStats};
use bloodbridge_types::badges::lives_saved;

use crate::error::ApiError;
use crate::requests::load_user;
use crate::state::{AppState, run_db};

pub const LEADERBOARD_SIZE: u32 = 20;

pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = load_user(&state, claims.sub).await?;

    let user_id = user.id;
    let (donations, requests, badges) = run_db(&state, move |db| {
        Ok((
            db.count_donations_by(user_id)?,
            db.count_requests_by(user_id)?,
            db.get_badges(user_id)?,
        ))
    })
    .await?;

    Ok(Json(ProfileResponse {
        user,
        badges: badges.iter().map(|b| b.info()).collect(),
        stats: UserStats {
            donations,
            requests,
            lives_saved: lives_saved(donations),
            badges,
        },
    }))
}

pub async fn leaderboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.get_leaderboard(LEADERBOARD_SIZE)).await?;

    let entries: Vec<LeaderboardEntry> = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i + 1,
            user_id: row.user_id,
            name: row.full_name,
            blood_group: row.blood_group,
            donations: row.donations,
            lives_saved: lives_saved(row.donations),
            badges: row.badges,
        })
        .collect();
    Ok(Json(entries))
}
