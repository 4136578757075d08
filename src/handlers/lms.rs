use axum::extract::{Path, State};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::ValidatedJson;
use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    payload::{
        ApiResponse, AssignmentListResponse, AssignmentResponse, CourseListResponse,
        CourseResponse, CourseSubmissionsResponse, CreateAssignmentRequest, CreateCourseRequest,
        CreateSubmissionRequest, SubmissionListResponse, SubmissionResponse,
        UpdateAssignmentRequest, UpdateCourseRequest, UpdateSubmissionRequest,
    },
};

/// Path id extractor whose rejection is rendered as the standard envelope.
type IdPath = WithRejection<Path<Uuid>, AppError>;

// --- Courses ---

/// create_course
///
/// [Authenticated Route] Admins and teachers open a new course. Codes are unique.
#[utoipa::path(
    post,
    path = "/api/v1/lms/courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 200, description = "Course created", body = CourseResponse),
        (status = 400, description = "Invalid body, invalid role or duplicate code")
    )
)]
pub async fn create_course(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCourseRequest>,
) -> Result<ApiResponse<CourseResponse>, AppError> {
    let course = state.lms.create_course(id, payload).await?;
    Ok(ApiResponse::ok(course))
}

/// list_courses
///
/// [Authenticated Route] All live courses, ordered by name.
#[utoipa::path(
    get,
    path = "/api/v1/lms/courses",
    responses((status = 200, description = "Courses", body = CourseListResponse))
)]
pub async fn list_courses(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<ApiResponse<CourseListResponse>, AppError> {
    let courses = state.lms.list_courses(id).await?;
    Ok(ApiResponse::ok(courses))
}

#[utoipa::path(
    get,
    path = "/api/v1/lms/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course", body = CourseResponse),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<ApiResponse<CourseResponse>, AppError> {
    let course = state.lms.get_course(actor, id).await?;
    Ok(ApiResponse::ok(course))
}

#[utoipa::path(
    get,
    path = "/api/v1/lms/courses/code/{code}",
    params(("code" = String, Path, description = "Course code")),
    responses(
        (status = 200, description = "Course", body = CourseResponse),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course_by_code(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(code), _): WithRejection<Path<String>, AppError>,
) -> Result<ApiResponse<CourseResponse>, AppError> {
    let course = state.lms.get_course_by_code(id, code).await?;
    Ok(ApiResponse::ok(course))
}

/// update_course
///
/// [Authenticated Route] Partial update by admins and teachers; the code is fixed.
#[utoipa::path(
    put,
    path = "/api/v1/lms/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Course updated", body = CourseResponse),
        (status = 400, description = "Invalid body or invalid role"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn update_course(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
    ValidatedJson(payload): ValidatedJson<UpdateCourseRequest>,
) -> Result<ApiResponse<CourseResponse>, AppError> {
    let course = state.lms.update_course(actor, id, payload).await?;
    Ok(ApiResponse::ok(course))
}

/// delete_course
///
/// [Authenticated Route] Admin only. Soft delete: the row stays, reads stop seeing it.
#[utoipa::path(
    delete,
    path = "/api/v1/lms/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted", body = CourseResponse),
        (status = 400, description = "Invalid role"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn delete_course(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<ApiResponse<CourseResponse>, AppError> {
    let course = state.lms.delete_course(actor, id).await?;
    Ok(ApiResponse::ok(course))
}

/// list_course_assignments
///
/// [Authenticated Route] Assignments of one course by due date. Students only see
/// published ones.
#[utoipa::path(
    get,
    path = "/api/v1/lms/courses/{id}/assignments",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Assignments", body = AssignmentListResponse),
        (status = 404, description = "Course not found")
    )
)]
pub async fn list_course_assignments(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<ApiResponse<AssignmentListResponse>, AppError> {
    let assignments = state.lms.list_assignments_by_course(actor, id).await?;
    Ok(ApiResponse::ok(assignments))
}

// --- Assignments ---

/// create_assignment
///
/// [Authenticated Route] Admins and teachers set work on an existing course. The
/// caller becomes the owning teacher; new assignments are published.
#[utoipa::path(
    post,
    path = "/api/v1/lms/assignments",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 200, description = "Assignment created", body = AssignmentResponse),
        (status = 400, description = "Invalid body or invalid role"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn create_assignment(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateAssignmentRequest>,
) -> Result<ApiResponse<AssignmentResponse>, AppError> {
    let assignment = state.lms.create_assignment(id, payload).await?;
    Ok(ApiResponse::ok(assignment))
}

#[utoipa::path(
    get,
    path = "/api/v1/lms/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment", body = AssignmentResponse),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn get_assignment(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<ApiResponse<AssignmentResponse>, AppError> {
    let assignment = state.lms.get_assignment(actor, id).await?;
    Ok(ApiResponse::ok(assignment))
}

#[utoipa::path(
    put,
    path = "/api/v1/lms/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment id")),
    request_body = UpdateAssignmentRequest,
    responses(
        (status = 200, description = "Assignment updated", body = AssignmentResponse),
        (status = 400, description = "Invalid body, invalid role or invalid teacher id"),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn update_assignment(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
    ValidatedJson(payload): ValidatedJson<UpdateAssignmentRequest>,
) -> Result<ApiResponse<AssignmentResponse>, AppError> {
    let assignment = state.lms.update_assignment(actor, id, payload).await?;
    Ok(ApiResponse::ok(assignment))
}

// --- Submissions ---

/// create_submission
///
/// [Authenticated Route] Students hand in work for a published assignment.
#[utoipa::path(
    post,
    path = "/api/v1/lms/submissions",
    request_body = CreateSubmissionRequest,
    responses(
        (status = 200, description = "Submission created", body = SubmissionResponse),
        (status = 400, description = "Invalid body or invalid role"),
        (status = 404, description = "Assignment not found")
    )
)]
pub async fn create_submission(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateSubmissionRequest>,
) -> Result<ApiResponse<SubmissionResponse>, AppError> {
    let submission = state.lms.create_submission(id, payload).await?;
    Ok(ApiResponse::ok(submission))
}

#[utoipa::path(
    get,
    path = "/api/v1/lms/submissions/{id}",
    params(("id" = Uuid, Path, description = "Submission id")),
    responses(
        (status = 200, description = "Submission", body = SubmissionResponse),
        (status = 404, description = "Submission not found")
    )
)]
pub async fn get_submission(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<ApiResponse<SubmissionResponse>, AppError> {
    let submission = state.lms.get_submission(actor, id).await?;
    Ok(ApiResponse::ok(submission))
}

/// update_submission
///
/// [Authenticated Route] Teachers grade (`grade` required, `feedback` optional and kept
/// when omitted); students revise their own submission (`content`, `file_url`). Admins
/// are refused.
#[utoipa::path(
    put,
    path = "/api/v1/lms/submissions/{id}",
    params(("id" = Uuid, Path, description = "Submission id")),
    request_body = UpdateSubmissionRequest,
    responses(
        (status = 200, description = "Submission updated", body = SubmissionResponse),
        (status = 400, description = "Invalid body, invalid role, or a teacher update without a grade or with a grade outside 0..=total_points"),
        (status = 404, description = "Submission not found")
    )
)]
pub async fn update_submission(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
    ValidatedJson(payload): ValidatedJson<UpdateSubmissionRequest>,
) -> Result<ApiResponse<SubmissionResponse>, AppError> {
    let submission = state.lms.update_submission(actor, id, payload).await?;
    Ok(ApiResponse::ok(submission))
}

#[utoipa::path(
    get,
    path = "/api/v1/lms/submissions/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Submissions", body = SubmissionListResponse),
        (status = 400, description = "Invalid role")
    )
)]
pub async fn list_assignment_submissions(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<ApiResponse<SubmissionListResponse>, AppError> {
    let submissions = state.lms.list_submissions_by_assignment(actor, id).await?;
    Ok(ApiResponse::ok(submissions))
}

/// list_user_submissions
///
/// [Authenticated Route] For a teacher, every submission to their assignments; for a
/// student, their own. The path id must be the caller's.
#[utoipa::path(
    get,
    path = "/api/v1/lms/submissions/users/{id}",
    params(("id" = Uuid, Path, description = "User id, must equal the caller")),
    responses(
        (status = 200, description = "Submissions", body = SubmissionListResponse),
        (status = 400, description = "Invalid role or foreign user id")
    )
)]
pub async fn list_user_submissions(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<ApiResponse<SubmissionListResponse>, AppError> {
    let submissions = state.lms.list_submissions_by_user(actor, id).await?;
    Ok(ApiResponse::ok(submissions))
}

#[utoipa::path(
    get,
    path = "/api/v1/lms/submissions/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Submissions grouped by assignment", body = CourseSubmissionsResponse),
        (status = 400, description = "Invalid role"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn list_course_submissions(
    AuthUser { id: actor, .. }: AuthUser,
    State(state): State<AppState>,
    WithRejection(Path(id), _): IdPath,
) -> Result<ApiResponse<CourseSubmissionsResponse>, AppError> {
    let submissions = state.lms.list_submissions_by_course(actor, id).await?;
    Ok(ApiResponse::ok(submissions))
}
