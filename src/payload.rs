use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Assignment, Course, Role, Student, Submission, Teacher, User};

// --- Response Envelope ---

/// ApiResponse
///
/// The envelope wrapping every response body, success or failure:
/// `{ "status": 200, "message": "success", "data": ..., "error": ... }`.
/// `error` is omitted on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self::with_status(StatusCode::OK, data)
    }

    pub fn with_status(status: StatusCode, data: T) -> Self {
        Self {
            status: status.as_u16(),
            message: "success".to_string(),
            data,
            error: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

// --- Validation ---

/// Validate
///
/// Field-level checks run by the `ValidatedJson` extractor after deserialization.
/// Returns one human-readable message per failed rule; empty means valid.
pub trait Validate {
    fn validate(&self) -> Vec<String>;
}

fn require(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    }
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.'),
        None => false,
    }
}

pub const MIN_PASSWORD_LEN: usize = 8;

// --- Request Payloads (Input Schemas) ---

/// RegisterUserRequest
///
/// Input payload for the public registration endpoint (POST /user/register).
/// `role` is kept as free text so an unknown role answers "invalid role" instead of a
/// deserialization error. `program` is only meaningful for students.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterUserRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[schema(example = "student")]
    pub role: String,
    #[serde(default)]
    pub program: String,
}

impl Validate for RegisterUserRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "email", &self.email);
        if !self.email.trim().is_empty() && !looks_like_email(&self.email) {
            errors.push("email must be a valid email address".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(format!("password must be at least {MIN_PASSWORD_LEN} characters"));
        }
        require(&mut errors, "first_name", &self.first_name);
        require(&mut errors, "last_name", &self.last_name);
        require(&mut errors, "role", &self.role);
        errors
    }
}

/// LoginUserRequest
///
/// Input payload for POST /user/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginUserRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginUserRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "email", &self.email);
        require(&mut errors, "password", &self.password);
        errors
    }
}

/// CreateCourseRequest
///
/// Input payload for POST /lms/courses. Course codes are unique among live courses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateCourseRequest {
    #[schema(example = "CS101")]
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[ts(type = "string")]
    pub start_date: NaiveDate,
    #[ts(type = "string")]
    pub end_date: NaiveDate,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl Validate for CreateCourseRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "code", &self.code);
        require(&mut errors, "name", &self.name);
        if self.end_date < self.start_date {
            errors.push("end_date must not be before start_date".to_string());
        }
        errors
    }
}

/// UpdateCourseRequest
///
/// Partial update payload for PUT /lms/courses/{id}. Absent fields keep their value;
/// the course code is immutable.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl Validate for UpdateCourseRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            require(&mut errors, "name", name);
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                errors.push("end_date must not be before start_date".to_string());
            }
        }
        errors
    }
}

/// CreateAssignmentRequest
///
/// Input payload for POST /lms/assignments. The owning teacher is always the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateAssignmentRequest {
    pub course_id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub content: String,
    #[ts(type = "string")]
    pub due_date: DateTime<Utc>,
    #[schema(example = 100.0)]
    pub total_points: f64,
}

impl Validate for CreateAssignmentRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "title", &self.title);
        require(&mut errors, "description", &self.description);
        if !self.total_points.is_finite() || self.total_points <= 0.0 {
            errors.push("total_points must be greater than zero".to_string());
        }
        errors
    }
}

/// UpdateAssignmentRequest
///
/// Partial update payload for PUT /lms/assignments/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAssignmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_points: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

impl Validate for UpdateAssignmentRequest {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(title) = &self.title {
            require(&mut errors, "title", title);
        }
        if let Some(points) = self.total_points {
            if !points.is_finite() || points <= 0.0 {
                errors.push("total_points must be greater than zero".to_string());
            }
        }
        errors
    }
}

/// CreateSubmissionRequest
///
/// Input payload for POST /lms/submissions. At least one of `content` or `file_url`
/// must carry the answer.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateSubmissionRequest {
    pub assignment_id: Uuid,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file_url: String,
}

impl Validate for CreateSubmissionRequest {
    fn validate(&self) -> Vec<String> {
        if self.content.trim().is_empty() && self.file_url.trim().is_empty() {
            vec!["content or file_url is required".to_string()]
        } else {
            Vec::new()
        }
    }
}

/// UpdateSubmissionRequest
///
/// Shared payload for PUT /lms/submissions/{id}. Which fields apply depends on the
/// caller: students may change `content`/`file_url`, teachers `grade`/`feedback`.
/// Fields outside the caller's partition are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateSubmissionRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Validate for UpdateSubmissionRequest {
    fn validate(&self) -> Vec<String> {
        match self.grade {
            Some(grade) if !grade.is_finite() => vec!["grade must be a number".to_string()],
            _ => Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

// --- Response Payloads (Output Schemas) ---

/// RegisterUserResponse
///
/// Output of POST /user/register.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl From<&User> for RegisterUserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
        }
    }
}

/// LoginUserResponse
///
/// Output of POST /user/login. The same token is also set as the auth cookie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginUserResponse {
    pub token: String,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LogoutUserResponse {
    pub id: Uuid,
}

/// RoleDetails
///
/// The role plus whichever extension fields apply to it. Absent fields are omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleDetails {
    pub name: Role,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[ts(optional)]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[ts(optional)]
    pub enrollment_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[ts(optional)]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[ts(optional)]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[ts(optional)]
    pub title: Option<String>,
}

impl RoleDetails {
    pub fn admin() -> Self {
        Self::bare(Role::Admin)
    }

    pub fn teacher(teacher: &Teacher) -> Self {
        Self {
            department: Some(teacher.department.clone()),
            title: Some(teacher.title.clone()),
            ..Self::bare(Role::Teacher)
        }
    }

    pub fn student(student: &Student) -> Self {
        Self {
            student_id: Some(student.student_id.clone()),
            enrollment_year: Some(student.enrollment_year),
            program: Some(student.program.clone()),
            ..Self::bare(Role::Student)
        }
    }

    fn bare(name: Role) -> Self {
        Self {
            name,
            student_id: None,
            enrollment_year: None,
            program: None,
            department: None,
            title: None,
        }
    }
}

/// UserResponse
///
/// Output schema for GET /user/me and GET /user/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: RoleDetails,
    pub is_active: bool,
    #[ts(type = "string | null")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserResponse {
    pub fn new(user: &User, role: RoleDetails) -> Self {
        Self {
            id: user.id(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.audit.created_at,
            updated_at: user.audit.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CourseResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub description: String,
    #[ts(type = "string")]
    pub start_date: NaiveDate,
    #[ts(type = "string")]
    pub end_date: NaiveDate,
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Course> for CourseResponse {
    fn from(course: Course) -> Self {
        Self {
            id: course.audit.id,
            code: course.code,
            name: course.name,
            description: course.description,
            start_date: course.start_date,
            end_date: course.end_date,
            is_active: course.is_active,
            created_at: course.audit.created_at,
            updated_at: course.audit.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CourseListResponse {
    pub courses: Vec<CourseResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub course_id: Uuid,
    pub teacher_id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    #[ts(type = "string")]
    pub due_date: DateTime<Utc>,
    pub total_points: f64,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.audit.id,
            course_id: assignment.course_id,
            teacher_id: assignment.teacher_id,
            title: assignment.title,
            description: assignment.description,
            content: assignment.content,
            due_date: assignment.due_date,
            total_points: assignment.total_points,
            is_published: assignment.is_published,
            created_at: assignment.audit.created_at,
            updated_at: assignment.audit.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignmentListResponse {
    pub assignments: Vec<AssignmentResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    #[ts(type = "string")]
    pub submitted_at: DateTime<Utc>,
    pub content: String,
    pub file_url: String,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    #[ts(type = "string | null")]
    pub graded_at: Option<DateTime<Utc>>,
    pub graded_by: Option<Uuid>,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        Self {
            id: submission.audit.id,
            assignment_id: submission.assignment_id,
            student_id: submission.student_id,
            submitted_at: submission.submitted_at,
            content: submission.content,
            file_url: submission.file_url,
            grade: submission.grade,
            feedback: submission.feedback,
            graded_at: submission.graded_at,
            graded_by: submission.graded_by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SubmissionListResponse {
    pub submissions: Vec<SubmissionResponse>,
}

/// AssignmentSubmissions
///
/// One assignment of a course together with the submissions visible to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AssignmentSubmissions {
    pub assignment: AssignmentResponse,
    pub submissions: Vec<SubmissionResponse>,
}

/// CourseSubmissionsResponse
///
/// Output of GET /lms/submissions/courses/{id}: course → assignments → submissions.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CourseSubmissionsResponse {
    pub course: CourseResponse,
    pub assignments: Vec<AssignmentSubmissions>,
}
