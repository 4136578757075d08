mod common;

use std::marker::PhantomData;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::{CookieJar, WithRejection};
use classroom_lms::{
    AppState,
    auth::AuthUser,
    handlers::{self, ValidatedJson},
    models::Role,
    payload::{CreateSubmissionRequest, LoginUserRequest, UpdateSubmissionRequest},
    repository::USER_NOT_FOUND,
};
use common::*;
use tokio::test;
use uuid::Uuid;

// --- Helpers ---

fn as_user(id: Uuid, role: Role) -> AuthUser {
    AuthUser {
        id,
        email: format!("{id}@example.com"),
        role,
    }
}

fn id_path(id: Uuid) -> WithRejection<Path<Uuid>, classroom_lms::AppError> {
    WithRejection(Path(id), PhantomData)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Users ---

#[test]
async fn test_register_then_get_user() {
    let (state, _) = memory_state();

    let registered = handlers::user::register_user(
        State(state.clone()),
        ValidatedJson(register_request("new@example.com", "student")),
    )
    .await
    .unwrap();
    assert_eq!(registered.status, 200);
    assert_eq!(registered.message, "success");
    let id = registered.data.id;

    let viewer = register(&state, "viewer@example.com", "teacher").await;
    let profile = handlers::user::get_user(as_user(viewer.id, Role::Teacher), State(state.clone()), id_path(id))
        .await
        .unwrap();

    assert_eq!(profile.data.id, id);
    assert_eq!(profile.data.email, "new@example.com");
    assert_eq!(profile.data.role.name, Role::Student);
}

#[test]
async fn test_get_user_not_found_envelope() {
    let (state, _) = memory_state();
    let viewer = register(&state, "viewer@example.com", "teacher").await;

    let err = handlers::user::get_user(
        as_user(viewer.id, Role::Teacher),
        State(state.clone()),
        id_path(Uuid::new_v4()),
    )
    .await
    .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["message"], "user not found");
    assert_eq!(body["error"]["code"], USER_NOT_FOUND);
    assert!(body["data"].is_null());
}

#[test]
async fn test_login_sets_environment_cookie() {
    let (state, _) = memory_state();
    register(&state, "cookie@example.com", "student").await;

    let (jar, response) = handlers::user::login_user(
        State(state.clone()),
        CookieJar::new(),
        ValidatedJson(LoginUserRequest {
            email: "cookie@example.com".to_string(),
            password: PASSWORD.to_string(),
        }),
    )
    .await
    .unwrap();

    let cookie = jar.get(&state.config.auth_cookie_name()).expect("auth cookie set");
    assert_eq!(cookie.value(), response.data.token);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
}

#[test]
async fn test_logout_clears_cookie() {
    let (state, _) = memory_state();
    let user = register(&state, "leaving@example.com", "teacher").await;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        format!("{}=token", state.config.auth_cookie_name()).parse().unwrap(),
    );
    let jar = CookieJar::from_headers(&headers);
    let (jar, response) = handlers::user::logout_user(as_user(user.id, Role::Teacher), State(state.clone()), jar)
        .await
        .unwrap();
    assert_eq!(response.data.id, user.id);

    let response = (jar, response).into_response();
    let set_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect::<Vec<_>>();
    assert!(
        set_cookie
            .iter()
            .any(|value| value.starts_with(&format!("{}=;", state.config.auth_cookie_name()))),
        "expected a removal cookie, got {set_cookie:?}"
    );
}

// --- Courses & assignments ---

#[test]
async fn test_non_teacher_cannot_create_assignment() {
    let (state, gateway) = memory_state();
    let teacher = register(&state, "t@example.com", "teacher").await;
    let student = register(&state, "s@example.com", "student").await;
    let course = create_course(&state, teacher.id, "CS101").await;

    let err = handlers::lms::create_assignment(
        as_user(student.id, Role::Student),
        State(state.clone()),
        ValidatedJson(assignment_request(course.id, "Nope", 10.0)),
    )
    .await
    .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], "invalid role");
    assert_eq!(body["error"]["code"], "INVALID_ROLE");

    // Nothing was written for the rejected request.
    assert!(gateway.snapshot().await.assignments.is_empty());
}

#[test]
async fn test_course_handlers_round_trip() {
    let (state, gateway) = memory_state();
    let teacher = register(&state, "t@example.com", "teacher").await;
    let admin = seed_admin(&gateway).await;

    let created = handlers::lms::create_course(
        as_user(teacher.id, Role::Teacher),
        State(state.clone()),
        ValidatedJson(course_request("ART1")),
    )
    .await
    .unwrap();

    let fetched = handlers::lms::get_course_by_code(
        as_user(teacher.id, Role::Teacher),
        State(state.clone()),
        WithRejection(Path("ART1".to_string()), PhantomData),
    )
    .await
    .unwrap();
    assert_eq!(fetched.data.id, created.data.id);

    handlers::lms::delete_course(as_user(admin, Role::Admin), State(state.clone()), id_path(created.data.id))
        .await
        .unwrap();

    let listed = handlers::lms::list_courses(as_user(teacher.id, Role::Teacher), State(state.clone()))
        .await
        .unwrap();
    assert!(listed.data.courses.is_empty());
}

// --- Submissions ---

async fn graded_scenario(state: &AppState) -> (Uuid, Uuid, Uuid) {
    let teacher = register(state, "t@example.com", "teacher").await;
    let student = register(state, "s@example.com", "student").await;
    let course = create_course(state, teacher.id, "CS101").await;
    let assignment = create_assignment(state, teacher.id, course.id, "Essay").await;

    let submission = handlers::lms::create_submission(
        as_user(student.id, Role::Student),
        State(state.clone()),
        ValidatedJson(CreateSubmissionRequest {
            assignment_id: assignment.id,
            content: String::new(),
            file_url: "https://files.example.com/essay.pdf".to_string(),
        }),
    )
    .await
    .unwrap();

    (teacher.id, student.id, submission.data.id)
}

#[test]
async fn test_teacher_grades_submission_through_handler() {
    let (state, _) = memory_state();
    let (teacher, student, submission) = graded_scenario(&state).await;

    let graded = handlers::lms::update_submission(
        as_user(teacher, Role::Teacher),
        State(state.clone()),
        id_path(submission),
        ValidatedJson(UpdateSubmissionRequest {
            grade: Some(42.0),
            feedback: Some("Needs sources".to_string()),
            ..Default::default()
        }),
    )
    .await
    .unwrap();
    assert_eq!(graded.data.grade, Some(42.0));

    let seen = handlers::lms::get_submission(as_user(student, Role::Student), State(state.clone()), id_path(submission))
        .await
        .unwrap();
    assert_eq!(seen.data.feedback.as_deref(), Some("Needs sources"));
    assert_eq!(seen.data.file_url, "https://files.example.com/essay.pdf");
}

#[test]
async fn test_user_submissions_path_must_match_caller() {
    let (state, _) = memory_state();
    let (teacher, student, _) = graded_scenario(&state).await;

    let own = handlers::lms::list_user_submissions(as_user(student, Role::Student), State(state.clone()), id_path(student))
        .await
        .unwrap();
    assert_eq!(own.data.submissions.len(), 1);

    let err = handlers::lms::list_user_submissions(as_user(student, Role::Student), State(state.clone()), id_path(teacher))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_course_submissions_are_nested() {
    let (state, _) = memory_state();
    let (teacher, _, submission) = graded_scenario(&state).await;

    let courses = handlers::lms::list_courses(as_user(teacher, Role::Teacher), State(state.clone()))
        .await
        .unwrap();
    let course_id = courses.data.courses[0].id;

    let overview = handlers::lms::list_course_submissions(as_user(teacher, Role::Teacher), State(state.clone()), id_path(course_id))
        .await
        .unwrap();
    assert_eq!(overview.data.assignments.len(), 1);
    assert_eq!(overview.data.assignments[0].submissions[0].id, submission);
}
