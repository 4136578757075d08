use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Assignment, Course, Student, Submission, Teacher, User},
};

mod memory;
mod postgres;

pub use memory::{MemoryGateway, MemoryRepository, MemoryTables};
pub use postgres::PostgresRepository;

// Entity-specific not-found codes carried in the error envelope.
pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
pub const TEACHER_NOT_FOUND: &str = "TEACHER_NOT_FOUND";
pub const STUDENT_NOT_FOUND: &str = "STUDENT_NOT_FOUND";
pub const COURSE_NOT_FOUND: &str = "COURSE_NOT_FOUND";
pub const ASSIGNMENT_NOT_FOUND: &str = "ASSIGNMENT_NOT_FOUND";
pub const SUBMISSION_NOT_FOUND: &str = "SUBMISSION_NOT_FOUND";

/// UserStore
///
/// Persistence contract for users and their role extension rows. Every method takes the
/// live transaction handle of the current unit of work, so a service can chain several
/// calls and have them commit or roll back together.
///
/// Reads only see active, non-deleted users. Updates write the whole entity by id; the
/// caller stamps `updated_by`/`updated_at` beforehand.
#[async_trait]
pub trait UserStore<Tx: Send>: Send + Sync {
    async fn create_user(&self, tx: &mut Tx, user: User) -> Result<User, AppError>;
    async fn get_user_by_id(&self, tx: &mut Tx, id: Uuid) -> Result<User, AppError>;
    async fn get_user_by_email(&self, tx: &mut Tx, email: &str) -> Result<User, AppError>;
    async fn update_user(&self, tx: &mut Tx, user: User) -> Result<User, AppError>;
    async fn soft_delete_user(&self, tx: &mut Tx, id: Uuid, actor: Uuid) -> Result<User, AppError>;

    // --- Role extensions ---
    async fn create_teacher(&self, tx: &mut Tx, teacher: Teacher) -> Result<Teacher, AppError>;
    async fn get_teacher_by_user_id(&self, tx: &mut Tx, user_id: Uuid) -> Result<Teacher, AppError>;
    async fn update_teacher(&self, tx: &mut Tx, teacher: Teacher) -> Result<Teacher, AppError>;
    async fn create_student(&self, tx: &mut Tx, student: Student) -> Result<Student, AppError>;
    async fn get_student_by_user_id(&self, tx: &mut Tx, user_id: Uuid) -> Result<Student, AppError>;
    async fn update_student(&self, tx: &mut Tx, student: Student) -> Result<Student, AppError>;
}

/// CourseStore
///
/// Courses are listed by name. `get_course_including_deleted` is the one read that
/// ignores the tombstone, for administrative lookups.
#[async_trait]
pub trait CourseStore<Tx: Send>: Send + Sync {
    async fn create_course(&self, tx: &mut Tx, course: Course) -> Result<Course, AppError>;
    async fn get_course_by_id(&self, tx: &mut Tx, id: Uuid) -> Result<Course, AppError>;
    async fn get_course_by_code(&self, tx: &mut Tx, code: &str) -> Result<Course, AppError>;
    async fn get_course_including_deleted(&self, tx: &mut Tx, id: Uuid) -> Result<Course, AppError>;
    async fn list_courses(&self, tx: &mut Tx) -> Result<Vec<Course>, AppError>;
    async fn update_course(&self, tx: &mut Tx, course: Course) -> Result<Course, AppError>;
    async fn soft_delete_course(&self, tx: &mut Tx, id: Uuid, actor: Uuid) -> Result<Course, AppError>;
}

/// AssignmentStore
///
/// Lists are ordered by due date, then creation time.
#[async_trait]
pub trait AssignmentStore<Tx: Send>: Send + Sync {
    async fn create_assignment(&self, tx: &mut Tx, assignment: Assignment) -> Result<Assignment, AppError>;
    async fn get_assignment_by_id(&self, tx: &mut Tx, id: Uuid) -> Result<Assignment, AppError>;
    async fn list_assignments_by_course(&self, tx: &mut Tx, course_id: Uuid) -> Result<Vec<Assignment>, AppError>;
    async fn list_assignments_by_teacher(&self, tx: &mut Tx, teacher_id: Uuid) -> Result<Vec<Assignment>, AppError>;
    async fn update_assignment(&self, tx: &mut Tx, assignment: Assignment) -> Result<Assignment, AppError>;
    async fn soft_delete_assignment(&self, tx: &mut Tx, id: Uuid, actor: Uuid) -> Result<Assignment, AppError>;
}

/// SubmissionStore
///
/// Lists are ordered by submission time. `list_submissions_by_teacher` returns the
/// submissions made to assignments owned by that teacher.
#[async_trait]
pub trait SubmissionStore<Tx: Send>: Send + Sync {
    async fn create_submission(&self, tx: &mut Tx, submission: Submission) -> Result<Submission, AppError>;
    async fn get_submission_by_id(&self, tx: &mut Tx, id: Uuid) -> Result<Submission, AppError>;
    async fn list_submissions_by_assignment(&self, tx: &mut Tx, assignment_id: Uuid) -> Result<Vec<Submission>, AppError>;
    async fn list_submissions_by_student(&self, tx: &mut Tx, student_id: Uuid) -> Result<Vec<Submission>, AppError>;
    async fn list_submissions_by_teacher(&self, tx: &mut Tx, teacher_id: Uuid) -> Result<Vec<Submission>, AppError>;
    async fn update_submission(&self, tx: &mut Tx, submission: Submission) -> Result<Submission, AppError>;
    async fn soft_delete_submission(&self, tx: &mut Tx, id: Uuid, actor: Uuid) -> Result<Submission, AppError>;
}

/// Stores
///
/// The capability set a service is constructed with. Each field is a trait object so
/// tests can swap a single entity family for a mock.
pub struct Stores<Tx: Send> {
    pub users: Arc<dyn UserStore<Tx>>,
    pub courses: Arc<dyn CourseStore<Tx>>,
    pub assignments: Arc<dyn AssignmentStore<Tx>>,
    pub submissions: Arc<dyn SubmissionStore<Tx>>,
}

impl<Tx: Send> Clone for Stores<Tx> {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
            courses: Arc::clone(&self.courses),
            assignments: Arc::clone(&self.assignments),
            submissions: Arc::clone(&self.submissions),
        }
    }
}

impl<Tx: Send + 'static> Stores<Tx> {
    /// Uses one repository value for every entity family.
    pub fn from_repository<R>(repository: R) -> Self
    where
        R: UserStore<Tx> + CourseStore<Tx> + AssignmentStore<Tx> + SubmissionStore<Tx> + 'static,
    {
        let repository = Arc::new(repository);
        Self {
            users: repository.clone(),
            courses: repository.clone(),
            assignments: repository.clone(),
            submissions: repository,
        }
    }
}
