use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use bloodbridge_db::is_constraint_violation;
use bloodbridge_notify::messages;
use bloodbridge_types::api::{Claims, Flash, LoginRequest, LoginResponse, RegisterRequest};
use bloodbridge_types::models::User;
use bloodbridge_types::{BloodGroup, phone};

use crate::activity;
use crate::error::ApiError;
use crate::extract::Input;
use crate::state::{AppState, run_db};

pub const MIN_PASSWORD_LEN: usize = 6;

pub async fn register(
    State(state): State<AppState>,
    Input(req): Input<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = req.full_name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    let phone_number = req.phone.trim().to_string();

    let mut errors = Vec::new();
    if full_name.is_empty() {
        errors.push("Full name is required.");
    }
    if email.is_empty() || !email.contains('@') {
        errors.push("Valid email is required.");
    }
    if phone_number.is_empty() {
        errors.push("Phone number is required.");
    } else if !phone::is_valid(&phone_number) {
        errors.push("Please enter a valid phone number (10-15 digits).");
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        errors.push("Password must be at least 6 characters.");
    }
    if req.password != req.confirm_password {
        errors.push("Passwords do not match.");
    }
    let blood_group = req.blood_group.parse::<BloodGroup>();
    if blood_group.is_err() {
        errors.push("Please select a valid blood group.");
    }

    let blood_group = match blood_group {
        Ok(group) if errors.is_empty() => group,
        _ => return Err(ApiError::Validation(errors.into_iter().map(String::from).collect())),
    };

    // Check duplicates
    let (lookup_email, lookup_phone) = (email.clone(), phone_number.clone());
    let (email_taken, phone_taken) = run_db(&state, move |db| {
        Ok((
            db.get_user_by_email(&lookup_email)?.is_some(),
            db.get_user_by_phone(&lookup_phone)?.is_some(),
        ))
    })
    .await?;
    if email_taken {
        return Err(ApiError::Conflict("Email already registered.".into()));
    }
    if phone_taken {
        return Err(ApiError::Conflict("Phone number already registered.".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        full_name,
        email,
        password_hash: hash_password(&req.password)?,
        phone: phone_number,
        blood_group,
        created_at: Utc::now(),
    };

    // The UNIQUE indexes catch a concurrent registration that slipped past
    // the lookup above.
    let row = user.clone();
    let created = run_db(&state, move |db| match db.create_user(&row) {
        Ok(()) => Ok(true),
        Err(e) if is_constraint_violation(&e) => Ok(false),
        Err(e) => Err(e),
    })
    .await?;
    if !created {
        return Err(ApiError::Conflict("Email already registered.".into()));
    }

    info!("User registered: {} ({})", user.email, user.blood_group);

    activity::record(
        &state,
        user.id,
        "registration",
        format!("🎉 {} joined BloodBridge!", user.full_name),
        "🎉",
    )
    .await;
    state.notifier.notify(&user.phone, &messages::welcome(&user.full_name)).await;

    Ok((
        StatusCode::CREATED,
        Json(Flash::new("Registration successful! Please login.", user)),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Input(req): Input<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid email or password.".into());

    let email = req.email.trim().to_lowercase();
    let user = run_db(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&user.password_hash, &req.password) {
        return Err(invalid());
    }

    let now = Utc::now();
    let expires_at = now + state.session_ttl;
    let sid = Uuid::new_v4();
    let user_id = user.id;
    run_db(&state, move |db| db.create_session(sid, user_id, now, expires_at)).await?;

    let claims = Claims {
        sub: user.id,
        sid,
        name: user.full_name.clone(),
        blood_group: user.blood_group,
        exp: expires_at.timestamp() as usize,
    };
    let token = create_token(&state.jwt_secret, &claims)?;

    state.presence.touch(user.id).await;
    info!("User logged in: {}", user.email);

    Ok(Json(Flash::new(
        format!("Welcome back, {}!", user.full_name),
        LoginResponse { token, user },
    )))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let sid = claims.sid;
    run_db(&state, move |db| db.revoke_session(sid, Utc::now())).await?;
    info!("User logged out: {}", claims.sub);

    Ok(Json(Flash::new("You have been logged out.", ())))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let user = run_db(&state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(crate::middleware::LOGIN_REQUIRED.into()))?;

    Ok(Json(user))
}

/// Argon2id PHC string for `password`.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn create_token(secret: &str, claims: &Claims) -> anyhow::Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::decode_token;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("demo123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&hash, "demo123"));
        assert!(!verify_password(&hash, "demo124"));
        assert!(!verify_password("not-a-hash", "demo123"));
    }

    #[test]
    fn token_carries_session() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            sid: Uuid::new_v4(),
            name: "Rahul Sharma".into(),
            blood_group: BloodGroup::OPos,
            exp: (Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
        };
        let token = create_token("secret", &claims).unwrap();

        let decoded = decode_token("secret", &token).unwrap();
        assert_eq!(decoded.sid, claims.sid);
        assert_eq!(decoded.blood_group, BloodGroup::OPos);

        assert!(decode_token("other-secret", &token).is_err());
    }
}
