use crate::{AppState, handlers::user};
use axum::{Router, routing::post};

/// Public Router Module
///
/// The only endpoints reachable without a token. Both create or verify credentials,
/// and neither returns anything about other users.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /user/register
        // Creates a teacher or student account together with its role extension record.
        .route("/user/register", post(user::register_user))
        // POST /user/login
        // Verifies credentials, returns a signed token and sets it as the auth cookie.
        .route("/user/login", post(user::login_user))
}
