use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    payload::{
        AssignmentListResponse, AssignmentResponse, CourseListResponse, CourseResponse,
        CourseSubmissionsResponse, CreateAssignmentRequest, CreateCourseRequest,
        CreateSubmissionRequest, LoginUserRequest, LoginUserResponse, LogoutUserResponse,
        RegisterUserRequest, RegisterUserResponse, SubmissionListResponse, SubmissionResponse,
        UpdateAssignmentRequest, UpdateCourseRequest, UpdateSubmissionRequest, UserResponse,
    },
};

mod lms;
mod user;

pub use lms::LmsManager;
pub use user::{UserManager, hash_password, verify_password};

/// UserService
///
/// Account use cases. Each method is one unit of work: it either fully commits or
/// leaves storage untouched.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn register(&self, request: RegisterUserRequest) -> Result<RegisterUserResponse, AppError>;
    async fn login(&self, request: LoginUserRequest) -> Result<LoginUserResponse, AppError>;
    async fn logout(&self, actor: Uuid) -> Result<LogoutUserResponse, AppError>;
    async fn get_user(&self, id: Uuid) -> Result<UserResponse, AppError>;
}

/// LmsService
///
/// Course, assignment and submission use cases. `actor` is always the id from the
/// verified token; it is resolved to a live user before anything else happens, and its
/// role decides what the call may do.
#[async_trait]
pub trait LmsService: Send + Sync {
    // --- Courses ---
    async fn create_course(&self, actor: Uuid, request: CreateCourseRequest) -> Result<CourseResponse, AppError>;
    async fn get_course(&self, actor: Uuid, id: Uuid) -> Result<CourseResponse, AppError>;
    async fn get_course_by_code(&self, actor: Uuid, code: String) -> Result<CourseResponse, AppError>;
    async fn list_courses(&self, actor: Uuid) -> Result<CourseListResponse, AppError>;
    async fn update_course(&self, actor: Uuid, id: Uuid, request: UpdateCourseRequest) -> Result<CourseResponse, AppError>;
    async fn delete_course(&self, actor: Uuid, id: Uuid) -> Result<CourseResponse, AppError>;

    // --- Assignments ---
    async fn create_assignment(&self, actor: Uuid, request: CreateAssignmentRequest) -> Result<AssignmentResponse, AppError>;
    async fn get_assignment(&self, actor: Uuid, id: Uuid) -> Result<AssignmentResponse, AppError>;
    async fn list_assignments_by_course(&self, actor: Uuid, course_id: Uuid) -> Result<AssignmentListResponse, AppError>;
    async fn update_assignment(&self, actor: Uuid, id: Uuid, request: UpdateAssignmentRequest) -> Result<AssignmentResponse, AppError>;

    // --- Submissions ---
    async fn create_submission(&self, actor: Uuid, request: CreateSubmissionRequest) -> Result<SubmissionResponse, AppError>;
    async fn get_submission(&self, actor: Uuid, id: Uuid) -> Result<SubmissionResponse, AppError>;
    async fn update_submission(&self, actor: Uuid, id: Uuid, request: UpdateSubmissionRequest) -> Result<SubmissionResponse, AppError>;
    async fn list_submissions_by_assignment(&self, actor: Uuid, assignment_id: Uuid) -> Result<SubmissionListResponse, AppError>;
    async fn list_submissions_by_user(&self, actor: Uuid, user_id: Uuid) -> Result<SubmissionListResponse, AppError>;
    async fn list_submissions_by_course(&self, actor: Uuid, course_id: Uuid) -> Result<CourseSubmissionsResponse, AppError>;
}

/// The concrete types used to share the services across the application state.
pub type UserServiceState = Arc<dyn UserService>;
pub type LmsServiceState = Arc<dyn LmsService>;
