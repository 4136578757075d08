use async_trait::async_trait;
use chrono::{Datelike, Utc};
use uuid::Uuid;

use super::UserService;
use crate::{
    auth::{Claims, issue_token},
    config::AppConfig,
    error::AppError,
    gateway::Gateway,
    models::{Audit, Role, Student, Teacher, User},
    payload::{
        LoginUserRequest, LoginUserResponse, LogoutUserResponse, RegisterUserRequest,
        RegisterUserResponse, RoleDetails, UserResponse,
    },
    repository::Stores,
};

/// Hashes on the blocking pool; bcrypt is deliberately slow.
pub async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|err| AppError::internal(format!("password hashing task failed: {err}")))?
        .map_err(|err| AppError::internal(format!("failed to hash password: {err}")))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| AppError::internal(format!("password check task failed: {err}")))?
        .map_err(|err| AppError::internal(format!("failed to verify password: {err}")))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Enrolment numbers look like `S2025-1A2B3C4D`: the year plus eight hex digits.
fn generate_student_number(year: i32) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("S{year}-{}", suffix.to_uppercase())
}

/// UserManager
///
/// `UserService` over any gateway. Bcrypt work never runs inside a unit of work: register
/// hashes before opening one, and login verifies between a read and the write that
/// records the login.
pub struct UserManager<G: Gateway> {
    gateway: G,
    stores: Stores<G::Tx>,
    config: AppConfig,
}

impl<G: Gateway> UserManager<G> {
    pub fn new(gateway: G, stores: Stores<G::Tx>, config: AppConfig) -> Self {
        Self { gateway, stores, config }
    }
}

#[async_trait]
impl<G: Gateway> UserService for UserManager<G> {
    async fn register(&self, request: RegisterUserRequest) -> Result<RegisterUserResponse, AppError> {
        let role: Role = request.role.parse().map_err(|err| {
            tracing::warn!(error = %err, "registration with unknown role");
            AppError::InvalidRole
        })?;
        let password_hash = hash_password(request.password.clone(), self.config.bcrypt_cost).await?;
        let stores = self.stores.clone();

        self.gateway
            .run(move |tx| Box::pin(register(stores, tx, request, role, password_hash)))
            .await
    }

    async fn login(&self, request: LoginUserRequest) -> Result<LoginUserResponse, AppError> {
        let email = normalize_email(&request.email);
        let stores = self.stores.clone();
        let user = self
            .gateway
            .run(move |tx| Box::pin(async move { stores.users.get_user_by_email(tx, &email).await }))
            .await?;

        // The hash lives on the row, so it is read first and checked with no transaction open.
        if !verify_password(request.password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id(), "login with invalid password");
            return Err(AppError::bad_request("invalid password"));
        }

        let stores = self.stores.clone();
        let config = self.config.clone();
        let id = user.id();

        self.gateway
            .run(move |tx| Box::pin(record_login(stores, tx, id, config)))
            .await
    }

    async fn logout(&self, actor: Uuid) -> Result<LogoutUserResponse, AppError> {
        let stores = self.stores.clone();

        self.gateway
            .run(move |tx| Box::pin(logout(stores, tx, actor)))
            .await
    }

    async fn get_user(&self, id: Uuid) -> Result<UserResponse, AppError> {
        let stores = self.stores.clone();

        self.gateway
            .run(move |tx| Box::pin(get_user(stores, tx, id)))
            .await
    }
}

// --- Units of work ---

async fn register<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    request: RegisterUserRequest,
    role: Role,
    password_hash: String,
) -> Result<RegisterUserResponse, AppError> {
    let email = normalize_email(&request.email);

    match stores.users.get_user_by_email(tx, &email).await {
        Ok(_) => {
            tracing::warn!(%email, "registration with an email already in use");
            return Err(AppError::conflict("email already exists"));
        }
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err),
    }

    let id = Uuid::new_v4();
    let user = stores
        .users
        .create_user(
            tx,
            User {
                audit: Audit::with_id(id, id),
                email,
                password_hash,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                role,
                last_login: None,
                is_active: true,
            },
        )
        .await?;

    match user.role {
        Role::Teacher => {
            stores
                .users
                .create_teacher(
                    tx,
                    Teacher {
                        user_id: user.id(),
                        department: String::new(),
                        title: String::new(),
                    },
                )
                .await?;
        }
        Role::Student => {
            let year = Utc::now().year();
            stores
                .users
                .create_student(
                    tx,
                    Student {
                        user_id: user.id(),
                        student_id: generate_student_number(year),
                        enrollment_year: year,
                        program: request.program.trim().to_string(),
                    },
                )
                .await?;
        }
        // Admins are provisioned out of band; the user row above is rolled back.
        Role::Admin => {
            tracing::warn!(user_id = %user.id(), "self-registration as admin refused");
            return Err(AppError::InvalidRole);
        }
    }

    tracing::info!(user_id = %user.id(), role = %user.role, "user registered");
    Ok(RegisterUserResponse::from(&user))
}

async fn record_login<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    id: Uuid,
    config: AppConfig,
) -> Result<LoginUserResponse, AppError> {
    let mut user = stores.users.get_user_by_id(tx, id).await?;

    let claims = Claims::for_user(&user, &config.app_name, config.token_ttl());
    let token = issue_token(&claims, &config.jwt_secret)?;
    let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now);

    user.last_login = Some(Utc::now());
    user.audit.touch(id);
    stores.users.update_user(tx, user).await?;

    tracing::info!(user_id = %id, "user logged in");
    Ok(LoginUserResponse { token, expires_at })
}

async fn logout<Tx: Send>(stores: Stores<Tx>, tx: &mut Tx, actor: Uuid) -> Result<LogoutUserResponse, AppError> {
    let mut user = stores.users.get_user_by_id(tx, actor).await?;

    // No revocation: the token stays valid until it expires.
    user.last_login = Some(Utc::now());
    user.audit.touch(actor);
    let user = stores.users.update_user(tx, user).await?;

    tracing::info!(user_id = %actor, "user logged out");
    Ok(LogoutUserResponse { id: user.id() })
}

async fn get_user<Tx: Send>(stores: Stores<Tx>, tx: &mut Tx, id: Uuid) -> Result<UserResponse, AppError> {
    let user = stores.users.get_user_by_id(tx, id).await?;

    let role = match user.role {
        Role::Admin => RoleDetails::admin(),
        Role::Teacher => RoleDetails::teacher(&stores.users.get_teacher_by_user_id(tx, id).await?),
        Role::Student => RoleDetails::student(&stores.users.get_student_by_user_id(tx, id).await?),
    };

    Ok(UserResponse::new(&user, role))
}
