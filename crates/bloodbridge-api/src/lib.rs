pub mod activity;
pub mod auth;
pub mod camps;
pub mod emergencies;
pub mod error;
pub mod extract;
pub mod inventory;
pub mod middleware;
pub mod presence;
pub mod profile;
pub mod realtime;
pub mod requests;
pub mod state;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All HTTP routes. Protected routes require a bearer token with a live session.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(realtime::health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/compatibility", get(realtime::compatibility))
        .route("/api/realtime-data", get(realtime::realtime_data))
        .route("/api/blood-facts", get(realtime::blood_facts))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/dashboard", get(requests::dashboard))
        .route(
            "/requests",
            get(requests::list_requests).post(requests::create_request),
        )
        .route("/requests/{id}", get(requests::get_request))
        .route("/requests/{id}/respond", post(requests::respond))
        .route("/requests/{id}/confirm", post(requests::confirm))
        .route("/requests/{id}/cancel", post(requests::cancel))
        .route("/inventory", get(inventory::get_inventory))
        .route(
            "/emergencies",
            get(emergencies::list_alerts).post(emergencies::create_sos),
        )
        .route("/emergencies/{id}/respond", post(emergencies::respond_alert))
        .route("/camps", get(camps::list_camps))
        .route("/camps/{id}/register", post(camps::register_camp))
        .route("/profile", get(profile::profile))
        .route("/leaderboard", get(profile::leaderboard))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
