use axum::extract::{Path, State};
use axum_extra::extract::{
    CookieJar, WithRejection,
    cookie::{Cookie, SameSite},
};
use uuid::Uuid;

use super::ValidatedJson;
use crate::{
    AppState,
    auth::AuthUser,
    config::{AppConfig, Env},
    error::AppError,
    payload::{
        ApiResponse, LoginUserRequest, LoginUserResponse, LogoutUserResponse, RegisterUserRequest,
        RegisterUserResponse, UserResponse,
    },
};

/// Builds the auth cookie carrying `token`, scoped to the configured domain.
fn auth_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((config.auth_cookie_name(), token))
        .path("/")
        .domain(config.cookie_domain.clone())
        .http_only(true)
        .secure(config.env == Env::Production)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::days(config.token_ttl_days))
        .build()
}

/// register_user
///
/// [Public Route] Creates an account with the teacher or student role, plus its role
/// extension record, in one transaction.
#[utoipa::path(
    post,
    path = "/api/v1/user/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "User registered", body = RegisterUserResponse),
        (status = 400, description = "Invalid body, invalid role or email already exists")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterUserRequest>,
) -> Result<ApiResponse<RegisterUserResponse>, AppError> {
    let user = state.users.register(payload).await?;
    Ok(ApiResponse::ok(user))
}

/// login_user
///
/// [Public Route] Verifies credentials and issues a signed access token. The token is
/// returned in the body and also set as the environment's auth cookie.
#[utoipa::path(
    post,
    path = "/api/v1/user/login",
    request_body = LoginUserRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginUserResponse),
        (status = 400, description = "Invalid password"),
        (status = 404, description = "Unknown email")
    )
)]
pub async fn login_user(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(payload): ValidatedJson<LoginUserRequest>,
) -> Result<(CookieJar, ApiResponse<LoginUserResponse>), AppError> {
    let login = state.users.login(payload).await?;
    let jar = jar.add(auth_cookie(&state.config, login.token.clone()));
    Ok((jar, ApiResponse::ok(login)))
}

/// logout_user
///
/// [Authenticated Route] Records the logout and clears the auth cookie. Tokens are
/// stateless, so an already-copied token stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/v1/user/logout",
    responses(
        (status = 200, description = "Logged out", body = LogoutUserResponse),
        (status = 401, description = "Invalid token")
    )
)]
pub async fn logout_user(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ApiResponse<LogoutUserResponse>), AppError> {
    let logout = state.users.logout(id).await?;
    let removal = Cookie::build((state.config.auth_cookie_name(), ""))
        .path("/")
        .domain(state.config.cookie_domain.clone());
    Ok((jar.remove(removal), ApiResponse::ok(logout)))
}

/// get_me
///
/// [Authenticated Route] The caller's own profile, including role extension fields.
#[utoipa::path(
    get,
    path = "/api/v1/user/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Invalid token")
    )
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state.users.get_user(id).await?;
    Ok(ApiResponse::ok(user))
}

/// get_user
///
/// [Authenticated Route] Any active user's profile by id.
#[utoipa::path(
    get,
    path = "/api/v1/user/{id}",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    _auth: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> Result<ApiResponse<UserResponse>, AppError> {
    let user = state.users.get_user(id).await?;
    Ok(ApiResponse::ok(user))
}
