use axum::{
    RequestExt,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode};

use bloodbridge_types::api::Claims;

use crate::error::ApiError;
use crate::state::{AppState, run_db};

pub const LOGIN_REQUIRED: &str = "Please login to access this page.";

/// Extract and validate the bearer token, then check its session is still live.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = req
        .extract_parts::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| ApiError::Unauthorized(LOGIN_REQUIRED.into()))?;

    let claims = decode_token(&state.jwt_secret, bearer.token())?;

    let (sid, sub) = (claims.sid, claims.sub);
    let active = run_db(&state, move |db| db.session_is_active(sid, sub, Utc::now())).await?;
    if !active {
        return Err(ApiError::Unauthorized(
            "Your session has ended. Please login again.".into(),
        ));
    }

    state.presence.touch(claims.sub).await;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized(LOGIN_REQUIRED.into()))
}
