#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use classroom_lms::{
    AppConfig, AppState, Gateway, MemoryGateway,
    error::AppError,
    models::{Audit, Role, User},
    payload::{
        AssignmentResponse, CourseResponse, CreateAssignmentRequest, CreateCourseRequest,
        CreateSubmissionRequest, RegisterUserRequest, RegisterUserResponse, SubmissionResponse,
    },
    services::hash_password,
};
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

/// Default config with the cheapest bcrypt cost.
pub fn test_config() -> AppConfig {
    AppConfig::default()
}

pub fn memory_state() -> (AppState, MemoryGateway) {
    AppState::in_memory(test_config())
}

pub fn register_request(email: &str, role: &str) -> RegisterUserRequest {
    RegisterUserRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        role: role.to_string(),
        program: "Computer Science".to_string(),
    }
}

pub async fn register(state: &AppState, email: &str, role: &str) -> RegisterUserResponse {
    state
        .users
        .register(register_request(email, role))
        .await
        .expect("registration should succeed")
}

/// Admins cannot self-register, so the row is written straight into the committed tables.
pub async fn seed_admin(gateway: &MemoryGateway) -> Uuid {
    let id = Uuid::new_v4();
    let password_hash = hash_password(PASSWORD.to_string(), 4).await.unwrap();
    let admin = User {
        audit: Audit::with_id(id, id),
        email: format!("admin-{id}@example.com"),
        password_hash,
        first_name: "Root".to_string(),
        last_name: "Admin".to_string(),
        role: Role::Admin,
        last_login: None,
        is_active: true,
    };

    gateway
        .run(move |tx| {
            Box::pin(async move {
                tx.users.insert(id, admin);
                Ok::<(), AppError>(())
            })
        })
        .await
        .unwrap();
    id
}

pub fn course_request(code: &str) -> CreateCourseRequest {
    CreateCourseRequest {
        code: code.to_string(),
        name: format!("Course {code}"),
        description: "An introductory course".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        is_active: true,
    }
}

pub async fn create_course(state: &AppState, actor: Uuid, code: &str) -> CourseResponse {
    state
        .lms
        .create_course(actor, course_request(code))
        .await
        .expect("course creation should succeed")
}

pub fn assignment_request(course_id: Uuid, title: &str, total_points: f64) -> CreateAssignmentRequest {
    CreateAssignmentRequest {
        course_id,
        title: title.to_string(),
        description: "Answer every question".to_string(),
        content: "1. What is a borrow?".to_string(),
        due_date: Utc::now() + Duration::days(7),
        total_points,
    }
}

pub async fn create_assignment(state: &AppState, actor: Uuid, course_id: Uuid, title: &str) -> AssignmentResponse {
    state
        .lms
        .create_assignment(actor, assignment_request(course_id, title, 100.0))
        .await
        .expect("assignment creation should succeed")
}

pub async fn submit(state: &AppState, actor: Uuid, assignment_id: Uuid, content: &str) -> SubmissionResponse {
    state
        .lms
        .create_submission(
            actor,
            CreateSubmissionRequest {
                assignment_id,
                content: content.to_string(),
                file_url: String::new(),
            },
        )
        .await
        .expect("submission should succeed")
}
