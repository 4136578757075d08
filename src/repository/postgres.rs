use async_trait::async_trait;
use sqlx::PgConnection;
use uuid::Uuid;

use super::{
    ASSIGNMENT_NOT_FOUND, AssignmentStore, COURSE_NOT_FOUND, CourseStore, STUDENT_NOT_FOUND,
    SUBMISSION_NOT_FOUND, SubmissionStore, TEACHER_NOT_FOUND, USER_NOT_FOUND, UserStore,
};
use crate::{
    error::AppError,
    models::{Assignment, Course, Student, Submission, Teacher, User},
};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, last_login, is_active, \
     created_by, created_at, updated_by, updated_at, deleted_by, deleted_at";
const COURSE_COLUMNS: &str = "id, code, name, description, start_date, end_date, is_active, \
     created_by, created_at, updated_by, updated_at, deleted_by, deleted_at";
const ASSIGNMENT_COLUMNS: &str = "id, course_id, teacher_id, title, description, content, due_date, total_points, is_published, \
     created_by, created_at, updated_by, updated_at, deleted_by, deleted_at";
const SUBMISSION_COLUMNS: &str = "id, assignment_id, student_id, submitted_at, content, file_url, grade, feedback, graded_at, graded_by, \
     created_by, created_at, updated_by, updated_at, deleted_by, deleted_at";

/// Maps "no rows" to the entity's own not-found code and leaves every other driver
/// error to the generic `From<sqlx::Error>` translation.
fn not_found_as(code: &'static str, message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |err| match err {
        sqlx::Error::RowNotFound => AppError::not_found(code, message),
        other => AppError::from(other),
    }
}

/// PostgresRepository
///
/// Implements every store trait against PostgreSQL. It holds no pool of its own: each
/// call runs on the connection of the transaction opened by `PgGateway`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresRepository;

impl PostgresRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UserStore<PgConnection> for PostgresRepository {
    async fn create_user(&self, tx: &mut PgConnection, user: User) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.audit.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.role)
            .bind(user.last_login)
            .bind(user.is_active)
            .bind(user.audit.created_by)
            .bind(user.audit.created_at)
            .bind(user.audit.updated_by)
            .bind(user.audit.updated_at)
            .bind(user.audit.deleted_by)
            .bind(user.audit.deleted_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn get_user_by_id(&self, tx: &mut PgConnection, id: Uuid) -> Result<User, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE id = $1 AND is_active = TRUE AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(USER_NOT_FOUND, "user not found"))
    }

    async fn get_user_by_email(&self, tx: &mut PgConnection, email: &str) -> Result<User, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE email = $1 AND is_active = TRUE AND deleted_at IS NULL"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(USER_NOT_FOUND, "user not found"))
    }

    async fn update_user(&self, tx: &mut PgConnection, user: User) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET email = $2, password_hash = $3, first_name = $4, last_name = $5, \
                 role = $6, last_login = $7, is_active = $8, updated_by = $9, updated_at = $10 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.audit.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(user.role)
            .bind(user.last_login)
            .bind(user.is_active)
            .bind(user.audit.updated_by)
            .bind(user.audit.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(USER_NOT_FOUND, "user not found"))
    }

    async fn soft_delete_user(&self, tx: &mut PgConnection, id: Uuid, actor: Uuid) -> Result<User, AppError> {
        let sql = format!(
            "UPDATE users SET deleted_by = $2, deleted_at = NOW(), updated_by = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(USER_NOT_FOUND, "user not found"))
    }

    async fn create_teacher(&self, tx: &mut PgConnection, teacher: Teacher) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>(
            "INSERT INTO teachers (user_id, department, title) VALUES ($1, $2, $3) \
             RETURNING user_id, department, title",
        )
        .bind(teacher.user_id)
        .bind(&teacher.department)
        .bind(&teacher.title)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)
    }

    async fn get_teacher_by_user_id(&self, tx: &mut PgConnection, user_id: Uuid) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>("SELECT user_id, department, title FROM teachers WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(TEACHER_NOT_FOUND, "teacher not found"))
    }

    async fn update_teacher(&self, tx: &mut PgConnection, teacher: Teacher) -> Result<Teacher, AppError> {
        sqlx::query_as::<_, Teacher>(
            "UPDATE teachers SET department = $2, title = $3 WHERE user_id = $1 \
             RETURNING user_id, department, title",
        )
        .bind(teacher.user_id)
        .bind(&teacher.department)
        .bind(&teacher.title)
        .fetch_one(&mut *tx)
        .await
        .map_err(not_found_as(TEACHER_NOT_FOUND, "teacher not found"))
    }

    async fn create_student(&self, tx: &mut PgConnection, student: Student) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(
            "INSERT INTO students (user_id, student_id, enrollment_year, program) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, student_id, enrollment_year, program",
        )
        .bind(student.user_id)
        .bind(&student.student_id)
        .bind(student.enrollment_year)
        .bind(&student.program)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)
    }

    async fn get_student_by_user_id(&self, tx: &mut PgConnection, user_id: Uuid) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(
            "SELECT user_id, student_id, enrollment_year, program FROM students WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(not_found_as(STUDENT_NOT_FOUND, "student not found"))
    }

    async fn update_student(&self, tx: &mut PgConnection, student: Student) -> Result<Student, AppError> {
        sqlx::query_as::<_, Student>(
            "UPDATE students SET student_id = $2, enrollment_year = $3, program = $4 WHERE user_id = $1 \
             RETURNING user_id, student_id, enrollment_year, program",
        )
        .bind(student.user_id)
        .bind(&student.student_id)
        .bind(student.enrollment_year)
        .bind(&student.program)
        .fetch_one(&mut *tx)
        .await
        .map_err(not_found_as(STUDENT_NOT_FOUND, "student not found"))
    }
}

#[async_trait]
impl CourseStore<PgConnection> for PostgresRepository {
    async fn create_course(&self, tx: &mut PgConnection, course: Course) -> Result<Course, AppError> {
        let sql = format!(
            "INSERT INTO courses ({COURSE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(course.audit.id)
            .bind(&course.code)
            .bind(&course.name)
            .bind(&course.description)
            .bind(course.start_date)
            .bind(course.end_date)
            .bind(course.is_active)
            .bind(course.audit.created_by)
            .bind(course.audit.created_at)
            .bind(course.audit.updated_by)
            .bind(course.audit.updated_at)
            .bind(course.audit.deleted_by)
            .bind(course.audit.deleted_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn get_course_by_id(&self, tx: &mut PgConnection, id: Uuid) -> Result<Course, AppError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(COURSE_NOT_FOUND, "course not found"))
    }

    async fn get_course_by_code(&self, tx: &mut PgConnection, code: &str) -> Result<Course, AppError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE code = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Course>(&sql)
            .bind(code)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(COURSE_NOT_FOUND, "course not found"))
    }

    async fn get_course_including_deleted(&self, tx: &mut PgConnection, id: Uuid) -> Result<Course, AppError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1");
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(COURSE_NOT_FOUND, "course not found"))
    }

    async fn list_courses(&self, tx: &mut PgConnection) -> Result<Vec<Course>, AppError> {
        let sql = format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE deleted_at IS NULL ORDER BY name ASC, code ASC"
        );
        sqlx::query_as::<_, Course>(&sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn update_course(&self, tx: &mut PgConnection, course: Course) -> Result<Course, AppError> {
        let sql = format!(
            "UPDATE courses SET code = $2, name = $3, description = $4, start_date = $5, end_date = $6, \
                 is_active = $7, updated_by = $8, updated_at = $9 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(course.audit.id)
            .bind(&course.code)
            .bind(&course.name)
            .bind(&course.description)
            .bind(course.start_date)
            .bind(course.end_date)
            .bind(course.is_active)
            .bind(course.audit.updated_by)
            .bind(course.audit.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(COURSE_NOT_FOUND, "course not found"))
    }

    async fn soft_delete_course(&self, tx: &mut PgConnection, id: Uuid, actor: Uuid) -> Result<Course, AppError> {
        let sql = format!(
            "UPDATE courses SET deleted_by = $2, deleted_at = NOW(), updated_by = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, Course>(&sql)
            .bind(id)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(COURSE_NOT_FOUND, "course not found"))
    }
}

#[async_trait]
impl AssignmentStore<PgConnection> for PostgresRepository {
    async fn create_assignment(&self, tx: &mut PgConnection, assignment: Assignment) -> Result<Assignment, AppError> {
        let sql = format!(
            "INSERT INTO assignments ({ASSIGNMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Assignment>(&sql)
            .bind(assignment.audit.id)
            .bind(assignment.course_id)
            .bind(assignment.teacher_id)
            .bind(&assignment.title)
            .bind(&assignment.description)
            .bind(&assignment.content)
            .bind(assignment.due_date)
            .bind(assignment.total_points)
            .bind(assignment.is_published)
            .bind(assignment.audit.created_by)
            .bind(assignment.audit.created_at)
            .bind(assignment.audit.updated_by)
            .bind(assignment.audit.updated_at)
            .bind(assignment.audit.deleted_by)
            .bind(assignment.audit.deleted_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn get_assignment_by_id(&self, tx: &mut PgConnection, id: Uuid) -> Result<Assignment, AppError> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Assignment>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(ASSIGNMENT_NOT_FOUND, "assignment not found"))
    }

    async fn list_assignments_by_course(&self, tx: &mut PgConnection, course_id: Uuid) -> Result<Vec<Assignment>, AppError> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments \
             WHERE course_id = $1 AND deleted_at IS NULL \
             ORDER BY due_date ASC, created_at ASC"
        );
        sqlx::query_as::<_, Assignment>(&sql)
            .bind(course_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn list_assignments_by_teacher(&self, tx: &mut PgConnection, teacher_id: Uuid) -> Result<Vec<Assignment>, AppError> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments \
             WHERE teacher_id = $1 AND deleted_at IS NULL \
             ORDER BY due_date ASC, created_at ASC"
        );
        sqlx::query_as::<_, Assignment>(&sql)
            .bind(teacher_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn update_assignment(&self, tx: &mut PgConnection, assignment: Assignment) -> Result<Assignment, AppError> {
        let sql = format!(
            "UPDATE assignments SET course_id = $2, teacher_id = $3, title = $4, description = $5, content = $6, \
                 due_date = $7, total_points = $8, is_published = $9, updated_by = $10, updated_at = $11 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Assignment>(&sql)
            .bind(assignment.audit.id)
            .bind(assignment.course_id)
            .bind(assignment.teacher_id)
            .bind(&assignment.title)
            .bind(&assignment.description)
            .bind(&assignment.content)
            .bind(assignment.due_date)
            .bind(assignment.total_points)
            .bind(assignment.is_published)
            .bind(assignment.audit.updated_by)
            .bind(assignment.audit.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(ASSIGNMENT_NOT_FOUND, "assignment not found"))
    }

    async fn soft_delete_assignment(&self, tx: &mut PgConnection, id: Uuid, actor: Uuid) -> Result<Assignment, AppError> {
        let sql = format!(
            "UPDATE assignments SET deleted_by = $2, deleted_at = NOW(), updated_by = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {ASSIGNMENT_COLUMNS}"
        );
        sqlx::query_as::<_, Assignment>(&sql)
            .bind(id)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(ASSIGNMENT_NOT_FOUND, "assignment not found"))
    }
}

#[async_trait]
impl SubmissionStore<PgConnection> for PostgresRepository {
    async fn create_submission(&self, tx: &mut PgConnection, submission: Submission) -> Result<Submission, AppError> {
        let sql = format!(
            "INSERT INTO submissions ({SUBMISSION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {SUBMISSION_COLUMNS}"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(submission.audit.id)
            .bind(submission.assignment_id)
            .bind(submission.student_id)
            .bind(submission.submitted_at)
            .bind(&submission.content)
            .bind(&submission.file_url)
            .bind(submission.grade)
            .bind(&submission.feedback)
            .bind(submission.graded_at)
            .bind(submission.graded_by)
            .bind(submission.audit.created_by)
            .bind(submission.audit.created_at)
            .bind(submission.audit.updated_by)
            .bind(submission.audit.updated_at)
            .bind(submission.audit.deleted_by)
            .bind(submission.audit.deleted_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn get_submission_by_id(&self, tx: &mut PgConnection, id: Uuid) -> Result<Submission, AppError> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(SUBMISSION_NOT_FOUND, "submission not found"))
    }

    async fn list_submissions_by_assignment(&self, tx: &mut PgConnection, assignment_id: Uuid) -> Result<Vec<Submission>, AppError> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions \
             WHERE assignment_id = $1 AND deleted_at IS NULL \
             ORDER BY submitted_at ASC, id ASC"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(assignment_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn list_submissions_by_student(&self, tx: &mut PgConnection, student_id: Uuid) -> Result<Vec<Submission>, AppError> {
        let sql = format!(
            "SELECT {SUBMISSION_COLUMNS} FROM submissions \
             WHERE student_id = $1 AND deleted_at IS NULL \
             ORDER BY submitted_at ASC, id ASC"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(student_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn list_submissions_by_teacher(&self, tx: &mut PgConnection, teacher_id: Uuid) -> Result<Vec<Submission>, AppError> {
        // Qualified columns: both tables carry the audit block.
        let columns = SUBMISSION_COLUMNS
            .split(',')
            .map(|column| format!("s.{}", column.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM submissions s \
             JOIN assignments a ON a.id = s.assignment_id \
             WHERE a.teacher_id = $1 AND a.deleted_at IS NULL AND s.deleted_at IS NULL \
             ORDER BY s.submitted_at ASC, s.id ASC"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(teacher_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(AppError::from)
    }

    async fn update_submission(&self, tx: &mut PgConnection, submission: Submission) -> Result<Submission, AppError> {
        let sql = format!(
            "UPDATE submissions SET content = $2, file_url = $3, grade = $4, feedback = $5, graded_at = $6, \
                 graded_by = $7, updated_by = $8, updated_at = $9 \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {SUBMISSION_COLUMNS}"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(submission.audit.id)
            .bind(&submission.content)
            .bind(&submission.file_url)
            .bind(submission.grade)
            .bind(&submission.feedback)
            .bind(submission.graded_at)
            .bind(submission.graded_by)
            .bind(submission.audit.updated_by)
            .bind(submission.audit.updated_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(SUBMISSION_NOT_FOUND, "submission not found"))
    }

    async fn soft_delete_submission(&self, tx: &mut PgConnection, id: Uuid, actor: Uuid) -> Result<Submission, AppError> {
        let sql = format!(
            "UPDATE submissions SET deleted_by = $2, deleted_at = NOW(), updated_by = $2, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING {SUBMISSION_COLUMNS}"
        );
        sqlx::query_as::<_, Submission>(&sql)
            .bind(id)
            .bind(actor)
            .fetch_one(&mut *tx)
            .await
            .map_err(not_found_as(SUBMISSION_NOT_FOUND, "submission not found"))
    }
}
