use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};
use sqlx::PgPool;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod payload;
pub mod repository;
pub mod services;

// Module for routing segregation (Public, Authenticated).
pub mod routes;
use routes::{API_PREFIX, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use gateway::{Gateway, PgGateway};
pub use repository::{MemoryGateway, MemoryRepository, PostgresRepository, Stores};
pub use services::{LmsManager, LmsServiceState, UserManager, UserServiceState};

/// ApiDoc
///
/// Auto-generates the OpenAPI document from the `#[utoipa::path]` handlers and the
/// `ToSchema` payloads. Served at `/api-docs/openapi.json`, browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::user::register_user, handlers::user::login_user, handlers::user::logout_user,
        handlers::user::get_me, handlers::user::get_user,
        handlers::lms::create_course, handlers::lms::list_courses, handlers::lms::get_course,
        handlers::lms::get_course_by_code, handlers::lms::update_course, handlers::lms::delete_course,
        handlers::lms::list_course_assignments, handlers::lms::create_assignment,
        handlers::lms::get_assignment, handlers::lms::update_assignment,
        handlers::lms::create_submission, handlers::lms::get_submission,
        handlers::lms::update_submission, handlers::lms::list_assignment_submissions,
        handlers::lms::list_user_submissions, handlers::lms::list_course_submissions
    ),
    components(
        schemas(
            models::Role,
            payload::RegisterUserRequest, payload::RegisterUserResponse, payload::LoginUserRequest,
            payload::LoginUserResponse, payload::LogoutUserResponse, payload::RoleDetails,
            payload::UserResponse, payload::CreateCourseRequest, payload::UpdateCourseRequest,
            payload::CourseResponse, payload::CourseListResponse, payload::CreateAssignmentRequest,
            payload::UpdateAssignmentRequest, payload::AssignmentResponse,
            payload::AssignmentListResponse, payload::CreateSubmissionRequest,
            payload::UpdateSubmissionRequest, payload::SubmissionResponse,
            payload::SubmissionListResponse, payload::AssignmentSubmissions,
            payload::CourseSubmissionsResponse,
        )
    ),
    tags(
        (name = "classroom-lms", description = "Courses, assignments and submissions API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single container shared by every request: the two services behind trait
/// objects, and the immutable configuration.
#[derive(Clone)]
pub struct AppState {
    /// Account use cases (register, login, logout, profile).
    pub users: UserServiceState,
    /// Course, assignment and submission use cases.
    pub lms: LmsServiceState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wires both services to one gateway and one set of stores.
    pub fn new<G>(gateway: G, stores: Stores<G::Tx>, config: AppConfig) -> Self
    where
        G: Gateway + Clone,
    {
        Self {
            users: std::sync::Arc::new(UserManager::new(gateway.clone(), stores.clone(), config.clone())),
            lms: std::sync::Arc::new(LmsManager::new(gateway, stores)),
            config,
        }
    }

    /// Production wiring over PostgreSQL.
    pub fn postgres(pool: PgPool, config: AppConfig) -> Self {
        Self::new(
            PgGateway::new(pool),
            Stores::from_repository(PostgresRepository::new()),
            config,
        )
    }

    /// In-process wiring. The gateway is returned too so callers can inspect what
    /// was committed.
    pub fn in_memory(config: AppConfig) -> (Self, MemoryGateway) {
        let gateway = MemoryGateway::new();
        let state = Self::new(
            gateway.clone(),
            Stores::from_repository(MemoryRepository::new()),
            config,
        );
        (state, gateway)
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API routes: the authenticated set gets the token check as a route layer.
    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_auth)),
        );

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health
        // Unauthenticated liveness probe for monitors and load balancers.
        .route("/health", get(|| async { "ok" }))
        .nest(API_PREFIX, api)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: wraps the request/response lifecycle in a span carrying the id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echoes x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the `http_request` span for `TraceLayer`, tagging it with the method, URI
/// and `x-request-id` so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
