use crate::{
    AppState,
    handlers::{lms, user},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here runs behind `auth::require_auth`, which is attached by
/// `create_router` as a route layer. Handlers receive the caller through the `AuthUser`
/// extractor; what each role may do is decided in the services.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Account ---
        // POST /user/logout
        // Records the logout and clears the auth cookie.
        .route("/user/logout", post(user::logout_user))
        // GET /user/me
        // The caller's own profile with role details.
        .route("/user/me", get(user::get_me))
        // GET /user/{id}
        .route("/user/{id}", get(user::get_user))
        // --- Courses ---
        // POST creates (admin, teacher); GET lists live courses by name.
        .route(
            "/lms/courses",
            post(lms::create_course).get(lms::list_courses),
        )
        // GET/PUT/DELETE /lms/courses/{id}
        // Delete is admin only and soft: the row is tombstoned, not removed.
        .route(
            "/lms/courses/{id}",
            get(lms::get_course)
                .put(lms::update_course)
                .delete(lms::delete_course),
        )
        .route("/lms/courses/code/{code}", get(lms::get_course_by_code))
        .route(
            "/lms/courses/{id}/assignments",
            get(lms::list_course_assignments),
        )
        // --- Assignments ---
        .route("/lms/assignments", post(lms::create_assignment))
        .route(
            "/lms/assignments/{id}",
            get(lms::get_assignment).put(lms::update_assignment),
        )
        // --- Submissions ---
        // POST by students only. PUT is shared: teachers grade, students revise.
        .route("/lms/submissions", post(lms::create_submission))
        .route(
            "/lms/submissions/{id}",
            get(lms::get_submission).put(lms::update_submission),
        )
        // GET /lms/submissions/assignments/{id}
        // Teacher view of every submission to one assignment.
        .route(
            "/lms/submissions/assignments/{id}",
            get(lms::list_assignment_submissions),
        )
        // GET /lms/submissions/users/{id}
        // The caller's submissions (student) or submissions to their assignments (teacher).
        .route(
            "/lms/submissions/users/{id}",
            get(lms::list_user_submissions),
        )
        // GET /lms/submissions/courses/{id}
        // Course, its assignments, and the submissions the caller may see.
        .route(
            "/lms/submissions/courses/{id}",
            get(lms::list_course_submissions),
        )
}
