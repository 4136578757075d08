//! Store tests against a real PostgreSQL instance. They need `DATABASE_URL` and are
//! ignored by default: `cargo test -- --ignored`.

use chrono::{Duration, NaiveDate, Utc};
use classroom_lms::{
    Gateway, PgGateway,
    error::AppError,
    models::{Assignment, Audit, Course, Role, Student, Submission, Teacher, User},
    repository::{
        ASSIGNMENT_NOT_FOUND, AssignmentStore, COURSE_NOT_FOUND, CourseStore, PostgresRepository,
        SUBMISSION_NOT_FOUND, SubmissionStore, USER_NOT_FOUND, UserStore,
    },
};
use sqlx::{PgConnection, PgPool};
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

/// A simple structure to hold the database pool for testing
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        PgGateway::new(pool.clone())
            .migrate()
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }
}

// --- Test Data Helpers ---

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..8])
}

fn new_user(role: Role) -> User {
    let id = Uuid::new_v4();
    User {
        audit: Audit::with_id(id, id),
        email: format!("{}@test.com", unique("user")),
        password_hash: "$2b$04$not-a-real-hash".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        role,
        last_login: None,
        is_active: true,
    }
}

fn new_course(actor: Uuid) -> Course {
    Course {
        audit: Audit::new(actor),
        code: unique("CS"),
        name: "Databases".to_string(),
        description: String::new(),
        start_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        is_active: true,
    }
}

async fn seed_teacher(repo: &PostgresRepository, tx: &mut PgConnection) -> User {
    let user = repo.create_user(&mut *tx, new_user(Role::Teacher)).await.unwrap();
    repo.create_teacher(
        &mut *tx,
        Teacher {
            user_id: user.id(),
            department: "CS".to_string(),
            title: "Dr".to_string(),
        },
    )
    .await
    .unwrap();
    user
}

// --- Tests ---

#[test]
#[ignore]
async fn test_user_round_trip_and_soft_delete() {
    let ctx = DbTestContext::setup().await;
    let repo = PostgresRepository::new();
    let mut tx = ctx.pool.begin().await.unwrap();

    let user = repo.create_user(&mut *tx, new_user(Role::Student)).await.unwrap();
    let fetched = repo.get_user_by_email(&mut *tx, &user.email).await.unwrap();
    assert_eq!(fetched.id(), user.id());
    assert_eq!(fetched.role, Role::Student);

    let student = repo
        .create_student(
            &mut *tx,
            Student {
                user_id: user.id(),
                student_id: unique("S2025"),
                enrollment_year: 2025,
                program: "Maths".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(repo.get_student_by_user_id(&mut *tx, user.id()).await.unwrap(), student);

    repo.soft_delete_user(&mut *tx, user.id(), user.id()).await.unwrap();
    let err = repo.get_user_by_id(&mut *tx, user.id()).await.unwrap_err();
    assert_eq!(err.code(), USER_NOT_FOUND);

    tx.rollback().await.unwrap();
}

#[test]
#[ignore]
async fn test_duplicate_live_email_is_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = PostgresRepository::new();
    let mut tx = ctx.pool.begin().await.unwrap();

    let first = repo.create_user(&mut *tx, new_user(Role::Teacher)).await.unwrap();
    let mut clash = new_user(Role::Student);
    clash.email = first.email.clone();

    let err = repo.create_user(&mut *tx, clash).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    tx.rollback().await.unwrap();
}

#[test]
#[ignore]
async fn test_course_soft_delete_keeps_row_for_admin_lookup() {
    let ctx = DbTestContext::setup().await;
    let repo = PostgresRepository::new();
    let mut tx = ctx.pool.begin().await.unwrap();

    let teacher = seed_teacher(&repo, &mut *tx).await;
    let course = repo.create_course(&mut *tx, new_course(teacher.id())).await.unwrap();

    repo.soft_delete_course(&mut *tx, course.audit.id, teacher.id()).await.unwrap();

    let err = repo.get_course_by_id(&mut *tx, course.audit.id).await.unwrap_err();
    assert_eq!(err.code(), COURSE_NOT_FOUND);

    let tombstoned = repo
        .get_course_including_deleted(&mut *tx, course.audit.id)
        .await
        .unwrap();
    assert!(tombstoned.audit.is_deleted());
    assert_eq!(tombstoned.audit.deleted_by, Some(teacher.id()));

    // The code can be reused once the holder is gone.
    let mut again = new_course(teacher.id());
    again.code = course.code.clone();
    repo.create_course(&mut *tx, again).await.unwrap();

    tx.rollback().await.unwrap();
}

#[test]
#[ignore]
async fn test_teacher_submission_listing_joins_assignments() {
    let ctx = DbTestContext::setup().await;
    let repo = PostgresRepository::new();
    let mut tx = ctx.pool.begin().await.unwrap();

    let teacher = seed_teacher(&repo, &mut *tx).await;
    let other_teacher = seed_teacher(&repo, &mut *tx).await;
    let student = repo.create_user(&mut *tx, new_user(Role::Student)).await.unwrap();
    let course = repo.create_course(&mut *tx, new_course(teacher.id())).await.unwrap();

    let mut assignment_ids = Vec::new();
    for owner in [&teacher, &other_teacher] {
        let assignment = repo
            .create_assignment(
                &mut *tx,
                Assignment {
                    audit: Audit::new(owner.id()),
                    course_id: course.audit.id,
                    teacher_id: owner.id(),
                    title: "Normalization".to_string(),
                    description: "3NF".to_string(),
                    content: String::new(),
                    due_date: Utc::now() + Duration::days(3),
                    total_points: 20.0,
                    is_published: true,
                },
            )
            .await
            .unwrap();
        assignment_ids.push(assignment.audit.id);
    }

    for assignment_id in &assignment_ids {
        repo.create_submission(
            &mut *tx,
            Submission {
                audit: Audit::new(student.id()),
                assignment_id: *assignment_id,
                student_id: student.id(),
                submitted_at: Utc::now(),
                content: "answer".to_string(),
                file_url: String::new(),
                grade: None,
                feedback: None,
                graded_at: None,
                graded_by: None,
            },
        )
        .await
        .unwrap();
    }

    let mine = repo.list_submissions_by_teacher(&mut *tx, teacher.id()).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].assignment_id, assignment_ids[0]);

    let by_student = repo.list_submissions_by_student(&mut *tx, student.id()).await.unwrap();
    assert_eq!(by_student.len(), 2);

    let by_course = repo.list_assignments_by_course(&mut *tx, course.audit.id).await.unwrap();
    assert_eq!(by_course.len(), 2);

    tx.rollback().await.unwrap();
}

#[test]
#[ignore]
async fn test_gateway_rolls_back_failed_unit_of_work() {
    let ctx = DbTestContext::setup().await;
    let gateway = PgGateway::new(ctx.pool.clone());
    let user = new_user(Role::Teacher);
    let id = user.id();

    let result = gateway
        .run(move |tx| {
            Box::pin(async move {
                PostgresRepository::new().create_user(tx, user).await?;
                Err::<(), AppError>(AppError::InvalidRole)
            })
        })
        .await;
    assert!(matches!(result, Err(AppError::InvalidRole)));

    let mut conn = ctx.pool.acquire().await.unwrap();
    let err = PostgresRepository::new().get_user_by_id(&mut *conn, id).await.unwrap_err();
    assert_eq!(err.code(), USER_NOT_FOUND);
}

#[test]
#[ignore]
async fn test_role_extension_updates_round_trip() {
    let ctx = DbTestContext::setup().await;
    let repo = PostgresRepository::new();
    let mut tx = ctx.pool.begin().await.unwrap();

    let teacher = seed_teacher(&repo, &mut *tx).await;
    let updated = repo
        .update_teacher(
            &mut *tx,
            Teacher {
                user_id: teacher.id(),
                department: "Mathematics".to_string(),
                title: "Professor".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(repo.get_teacher_by_user_id(&mut *tx, teacher.id()).await.unwrap(), updated);

    let user = repo.create_user(&mut *tx, new_user(Role::Student)).await.unwrap();
    let student = repo
        .create_student(
            &mut *tx,
            Student {
                user_id: user.id(),
                student_id: unique("S2025"),
                enrollment_year: 2025,
                program: "Maths".to_string(),
            },
        )
        .await
        .unwrap();
    let moved = repo
        .update_student(
            &mut *tx,
            Student {
                program: "Physics".to_string(),
                enrollment_year: 2026,
                ..student
            },
        )
        .await
        .unwrap();
    let stored = repo.get_student_by_user_id(&mut *tx, user.id()).await.unwrap();
    assert_eq!(stored, moved);
    assert_eq!(stored.program, "Physics");

    tx.rollback().await.unwrap();
}

#[test]
#[ignore]
async fn test_soft_deleted_assignment_and_submission_leave_reads() {
    let ctx = DbTestContext::setup().await;
    let repo = PostgresRepository::new();
    let mut tx = ctx.pool.begin().await.unwrap();

    let teacher = seed_teacher(&repo, &mut *tx).await;
    let student = repo.create_user(&mut *tx, new_user(Role::Student)).await.unwrap();
    let course = repo.create_course(&mut *tx, new_course(teacher.id())).await.unwrap();

    let mut ids = Vec::new();
    for days in [5, 1] {
        let assignment = repo
            .create_assignment(
                &mut *tx,
                Assignment {
                    audit: Audit::new(teacher.id()),
                    course_id: course.audit.id,
                    teacher_id: teacher.id(),
                    title: format!("Due in {days}"),
                    description: String::new(),
                    content: String::new(),
                    due_date: Utc::now() + Duration::days(days),
                    total_points: 10.0,
                    is_published: true,
                },
            )
            .await
            .unwrap();
        ids.push(assignment.audit.id);
    }

    let listed = repo.list_assignments_by_teacher(&mut *tx, teacher.id()).await.unwrap();
    let listed_titles: Vec<&str> = listed.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(listed_titles, ["Due in 1", "Due in 5"]);

    let submission = repo
        .create_submission(
            &mut *tx,
            Submission {
                audit: Audit::new(student.id()),
                assignment_id: ids[0],
                student_id: student.id(),
                submitted_at: Utc::now(),
                content: "answer".to_string(),
                file_url: String::new(),
                grade: None,
                feedback: None,
                graded_at: None,
                graded_by: None,
            },
        )
        .await
        .unwrap();

    let deleted = repo
        .soft_delete_submission(&mut *tx, submission.audit.id, teacher.id())
        .await
        .unwrap();
    assert_eq!(deleted.audit.deleted_by, Some(teacher.id()));
    let err = repo.get_submission_by_id(&mut *tx, submission.audit.id).await.unwrap_err();
    assert_eq!(err.code(), SUBMISSION_NOT_FOUND);
    assert!(repo.list_submissions_by_assignment(&mut *tx, ids[0]).await.unwrap().is_empty());
    assert!(repo.list_submissions_by_student(&mut *tx, student.id()).await.unwrap().is_empty());

    let deleted = repo.soft_delete_assignment(&mut *tx, ids[0], teacher.id()).await.unwrap();
    assert_eq!(deleted.audit.deleted_by, Some(teacher.id()));
    let err = repo.get_assignment_by_id(&mut *tx, ids[0]).await.unwrap_err();
    assert_eq!(err.code(), ASSIGNMENT_NOT_FOUND);

    let remaining = repo.list_assignments_by_course(&mut *tx, course.audit.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].audit.id, ids[1]);
    assert_eq!(repo.list_assignments_by_teacher(&mut *tx, teacher.id()).await.unwrap().len(), 1);

    tx.rollback().await.unwrap();
}
