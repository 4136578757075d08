use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{Role, User},
};

/// Claims
///
/// The payload signed into every access token. Verification decodes the raw claim map
/// first and only then converts it into this struct, so a token with a missing or
/// mistyped field is rejected rather than partially trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID.
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Issued At (iat), seconds since the epoch.
    pub iat: i64,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: i64,
    /// Issuer (iss): the configured application name.
    pub iss: String,
}

impl Claims {
    pub fn for_user(user: &User, issuer: &str, ttl: chrono::Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.id(),
            email: user.email.clone(),
            name: user.full_name(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: issuer.to_string(),
        }
    }
}

/// AuthError
///
/// Why a request failed authentication. Only logged: clients always see the same
/// 401 "invalid token" envelope.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no token in the authorization header or the '{0}' cookie")]
    MissingToken(String),
    #[error("authorization header is not of the form '<scheme> <token>'")]
    MalformedHeader,
    #[error("token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("token claims are missing or mistyped: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Signs `claims` with HS256.
pub fn issue_token(claims: &Claims, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| AppError::internal(format!("failed to sign token: {err}")))
}

/// verify_token
///
/// Checks the signature with the shared secret (HS256 only, so a token signed with any
/// other algorithm is refused), the expiry, and the presence of `sub`, `exp` and `iat`.
/// The verified claim map is then converted field by field into `Claims`.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["sub", "exp", "iat"]);
    validation.validate_exp = true;

    let data = decode::<serde_json::Value>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    Ok(serde_json::from_value::<Claims>(data.claims)?)
}

/// Splits a "<scheme> <token>" header value. Anything with fewer than two parts is refused.
fn token_from_header(value: &str) -> Result<String, AuthError> {
    let parts: Vec<&str> = value.split(' ').collect();
    if parts.len() < 2 || parts[1].is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(parts[1].to_string())
}

/// extract_token
///
/// Looks at the `Authorization` header first. Without one, falls back to the auth cookie
/// and runs its value through the same header parser as "Bearer <value>".
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Result<String, AuthError> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty());

    match from_header {
        Some(value) => token_from_header(value),
        None => {
            let jar = CookieJar::from_headers(headers);
            let cookie = jar
                .get(cookie_name)
                .ok_or_else(|| AuthError::MissingToken(cookie_name.to_string()))?;
            token_from_header(&format!("Bearer {}", cookie.value()))
        }
    }
}

/// Full pipeline from raw headers to verified claims.
pub fn authenticate_headers(headers: &HeaderMap, config: &AppConfig) -> Result<Claims, AuthError> {
    let token = extract_token(headers, &config.auth_cookie_name())?;
    verify_token(&token, &config.jwt_secret)
}

fn rejection() -> AppError {
    AppError::unauthorized("invalid token")
}

/// require_auth
///
/// Route layer for every protected route. Verifies the token and stores the typed
/// `Claims` in the request extensions for the handler's `AuthUser` extractor. Nothing is
/// cached between requests and no database lookup happens here.
pub async fn require_auth(State(config): State<AppConfig>, mut request: Request, next: Next) -> Response {
    match authenticate_headers(request.headers(), &config) {
        Ok(claims) => {
            tracing::debug!(user_id = %claims.sub, role = %claims.role, "request authenticated");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            tracing::warn!(error = %err, "authentication failed");
            rejection().into_response()
        }
    }
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Handlers pass `id` to the
/// services as the acting user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Reads the claims left by `require_auth`. When the extractor runs without the
/// middleware in front of it, it verifies the request's token itself, so it never
/// yields an identity that did not come from a valid signature.
///
/// Rejection: 401 envelope with message "invalid token".
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AuthUser::from(claims));
        }

        let config = AppConfig::from_ref(state);
        let claims = authenticate_headers(&parts.headers, &config).map_err(|err| {
            tracing::warn!(error = %err, "authentication failed");
            rejection()
        })?;
        let user = AuthUser::from(&claims);
        parts.extensions.insert(claims);
        Ok(user)
    }
}
