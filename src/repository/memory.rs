use std::{collections::BTreeMap, panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use futures::{FutureExt, future::BoxFuture};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    ASSIGNMENT_NOT_FOUND, AssignmentStore, COURSE_NOT_FOUND, CourseStore, STUDENT_NOT_FOUND,
    SUBMISSION_NOT_FOUND, SubmissionStore, TEACHER_NOT_FOUND, USER_NOT_FOUND, UserStore,
};
use crate::{
    error::AppError,
    gateway::{Gateway, panic_message},
    models::{Assignment, Audit, Course, Student, Submission, Teacher, User},
};

/// MemoryTables
///
/// The whole data set of the in-process backend. It doubles as the transaction handle
/// of `MemoryGateway`: a unit of work mutates a private copy that is published only when
/// the work succeeds.
#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    pub users: BTreeMap<Uuid, User>,
    pub teachers: BTreeMap<Uuid, Teacher>,
    pub students: BTreeMap<Uuid, Student>,
    pub courses: BTreeMap<Uuid, Course>,
    pub assignments: BTreeMap<Uuid, Assignment>,
    pub submissions: BTreeMap<Uuid, Submission>,
}

impl MemoryTables {
    fn live_user(&self, id: Uuid) -> Option<&User> {
        self.users
            .get(&id)
            .filter(|user| user.is_active && !user.audit.is_deleted())
    }
}

/// MemoryGateway
///
/// Snapshot-and-swap gateway over `MemoryTables`, with the same commit, rollback and
/// panic contract as `PgGateway`. Units of work are serialised by the table lock.
#[derive(Clone, Default)]
pub struct MemoryGateway {
    tables: Arc<Mutex<MemoryTables>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the committed state.
    pub async fn snapshot(&self) -> MemoryTables {
        self.tables.lock().await.clone()
    }
}

impl Gateway for MemoryGateway {
    type Tx = MemoryTables;

    fn run<'a, T, F>(&'a self, work: F) -> BoxFuture<'a, Result<T, AppError>>
    where
        T: Send + 'a,
        F: for<'c> FnOnce(&'c mut MemoryTables) -> BoxFuture<'c, Result<T, AppError>> + Send + 'a,
    {
        Box::pin(async move {
            let mut committed = self.tables.lock().await;
            let mut working = committed.clone();

            match AssertUnwindSafe(work(&mut working)).catch_unwind().await {
                Ok(Ok(value)) => {
                    *committed = working;
                    Ok(value)
                }
                Ok(Err(err)) => {
                    tracing::debug!(error = %err, "unit of work failed, changes discarded");
                    Err(err)
                }
                Err(payload) => {
                    let message = panic_message(payload);
                    tracing::error!(panic = %message, "unit of work panicked, changes discarded");
                    Err(AppError::Internal(message))
                }
            }
        })
    }
}

/// MemoryRepository
///
/// Store implementation over `MemoryTables`, mirroring the SQL layer: the same
/// soft-delete filters, orderings, not-found codes and unique keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryRepository;

impl MemoryRepository {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UserStore<MemoryTables> for MemoryRepository {
    async fn create_user(&self, tx: &mut MemoryTables, user: User) -> Result<User, AppError> {
        let taken = tx
            .users
            .values()
            .any(|existing| !existing.audit.is_deleted() && existing.email == user.email);
        if taken || tx.users.contains_key(&user.audit.id) {
            return Err(AppError::conflict("duplicate value: users"));
        }
        tx.users.insert(user.audit.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, tx: &mut MemoryTables, id: Uuid) -> Result<User, AppError> {
        tx.live_user(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND, "user not found"))
    }

    async fn get_user_by_email(&self, tx: &mut MemoryTables, email: &str) -> Result<User, AppError> {
        tx.users
            .values()
            .find(|user| user.email == email && user.is_active && !user.audit.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found(USER_NOT_FOUND, "user not found"))
    }

    async fn update_user(&self, tx: &mut MemoryTables, user: User) -> Result<User, AppError> {
        match tx.users.get_mut(&user.audit.id) {
            Some(stored) if !stored.audit.is_deleted() => {
                let audit = stored.audit.clone();
                *stored = User {
                    audit: Audit {
                        updated_by: user.audit.updated_by,
                        updated_at: user.audit.updated_at,
                        ..audit
                    },
                    ..user
                };
                Ok(stored.clone())
            }
            _ => Err(AppError::not_found(USER_NOT_FOUND, "user not found")),
        }
    }

    async fn soft_delete_user(&self, tx: &mut MemoryTables, id: Uuid, actor: Uuid) -> Result<User, AppError> {
        match tx.users.get_mut(&id) {
            Some(stored) if !stored.audit.is_deleted() => {
                stored.audit.tombstone(actor);
                Ok(stored.clone())
            }
            _ => Err(AppError::not_found(USER_NOT_FOUND, "user not found")),
        }
    }

    async fn create_teacher(&self, tx: &mut MemoryTables, teacher: Teacher) -> Result<Teacher, AppError> {
        if !tx.users.contains_key(&teacher.user_id) {
            return Err(AppError::Database(format!("teachers.user_id {} has no user", teacher.user_id)));
        }
        if tx.teachers.contains_key(&teacher.user_id) {
            return Err(AppError::conflict("duplicate value: teachers"));
        }
        tx.teachers.insert(teacher.user_id, teacher.clone());
        Ok(teacher)
    }

    async fn get_teacher_by_user_id(&self, tx: &mut MemoryTables, user_id: Uuid) -> Result<Teacher, AppError> {
        tx.teachers
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(TEACHER_NOT_FOUND, "teacher not found"))
    }

    async fn update_teacher(&self, tx: &mut MemoryTables, teacher: Teacher) -> Result<Teacher, AppError> {
        match tx.teachers.get_mut(&teacher.user_id) {
            Some(stored) => {
                *stored = teacher.clone();
                Ok(teacher)
            }
            None => Err(AppError::not_found(TEACHER_NOT_FOUND, "teacher not found")),
        }
    }

    async fn create_student(&self, tx: &mut MemoryTables, student: Student) -> Result<Student, AppError> {
        if !tx.users.contains_key(&student.user_id) {
            return Err(AppError::Database(format!("students.user_id {} has no user", student.user_id)));
        }
        let taken = tx
            .students
            .values()
            .any(|existing| existing.student_id == student.student_id);
        if taken || tx.students.contains_key(&student.user_id) {
            return Err(AppError::conflict("duplicate value: students"));
        }
        tx.students.insert(student.user_id, student.clone());
        Ok(student)
    }

    async fn get_student_by_user_id(&self, tx: &mut MemoryTables, user_id: Uuid) -> Result<Student, AppError> {
        tx.students
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(STUDENT_NOT_FOUND, "student not found"))
    }

    async fn update_student(&self, tx: &mut MemoryTables, student: Student) -> Result<Student, AppError> {
        match tx.students.get_mut(&student.user_id) {
            Some(stored) => {
                *stored = student.clone();
                Ok(student)
            }
            None => Err(AppError::not_found(STUDENT_NOT_FOUND, "student not found")),
        }
    }
}

#[async_trait]
impl CourseStore<MemoryTables> for MemoryRepository {
    async fn create_course(&self, tx: &mut MemoryTables, course: Course) -> Result<Course, AppError> {
        let taken = tx
            .courses
            .values()
            .any(|existing| !existing.audit.is_deleted() && existing.code == course.code);
        if taken || tx.courses.contains_key(&course.audit.id) {
            return Err(AppError::conflict("duplicate value: courses"));
        }
        tx.courses.insert(course.audit.id, course.clone());
        Ok(course)
    }

    async fn get_course_by_id(&self, tx: &mut MemoryTables, id: Uuid) -> Result<Course, AppError> {
        tx.courses
            .get(&id)
            .filter(|course| !course.audit.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found(COURSE_NOT_FOUND, "course not found"))
    }

    async fn get_course_by_code(&self, tx: &mut MemoryTables, code: &str) -> Result<Course, AppError> {
        tx.courses
            .values()
            .find(|course| course.code == code && !course.audit.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found(COURSE_NOT_FOUND, "course not found"))
    }

    async fn get_course_including_deleted(&self, tx: &mut MemoryTables, id: Uuid) -> Result<Course, AppError> {
        tx.courses
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(COURSE_NOT_FOUND, "course not found"))
    }

    async fn list_courses(&self, tx: &mut MemoryTables) -> Result<Vec<Course>, AppError> {
        let mut courses: Vec<Course> = tx
            .courses
            .values()
            .filter(|course| !course.audit.is_deleted())
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.code.cmp(&b.code)));
        Ok(courses)
    }

    async fn update_course(&self, tx: &mut MemoryTables, course: Course) -> Result<Course, AppError> {
        let clash = tx.courses.values().any(|existing| {
            existing.audit.id != course.audit.id && !existing.audit.is_deleted() && existing.code == course.code
        });
        if clash {
            return Err(AppError::conflict("duplicate value: courses"));
        }
        match tx.courses.get_mut(&course.audit.id) {
            Some(stored) if !stored.audit.is_deleted() => {
                let audit = stored.audit.clone();
                *stored = Course {
                    audit: Audit {
                        updated_by: course.audit.updated_by,
                        updated_at: course.audit.updated_at,
                        ..audit
                    },
                    ..course
                };
                Ok(stored.clone())
            }
            _ => Err(AppError::not_found(COURSE_NOT_FOUND, "course not found")),
        }
    }

    async fn soft_delete_course(&self, tx: &mut MemoryTables, id: Uuid, actor: Uuid) -> Result<Course, AppError> {
        match tx.courses.get_mut(&id) {
            Some(stored) if !stored.audit.is_deleted() => {
                stored.audit.tombstone(actor);
                Ok(stored.clone())
            }
            _ => Err(AppError::not_found(COURSE_NOT_FOUND, "course not found")),
        }
    }
}

#[async_trait]
impl AssignmentStore<MemoryTables> for MemoryRepository {
    async fn create_assignment(&self, tx: &mut MemoryTables, assignment: Assignment) -> Result<Assignment, AppError> {
        if !tx.courses.contains_key(&assignment.course_id) {
            return Err(AppError::Database(format!(
                "assignments.course_id {} has no course",
                assignment.course_id
            )));
        }
        if tx.assignments.contains_key(&assignment.audit.id) {
            return Err(AppError::conflict("duplicate value: assignments"));
        }
        tx.assignments.insert(assignment.audit.id, assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment_by_id(&self, tx: &mut MemoryTables, id: Uuid) -> Result<Assignment, AppError> {
        tx.assignments
            .get(&id)
            .filter(|assignment| !assignment.audit.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found(ASSIGNMENT_NOT_FOUND, "assignment not found"))
    }

    async fn list_assignments_by_course(&self, tx: &mut MemoryTables, course_id: Uuid) -> Result<Vec<Assignment>, AppError> {
        Ok(sorted_assignments(tx, |assignment| assignment.course_id == course_id))
    }

    async fn list_assignments_by_teacher(&self, tx: &mut MemoryTables, teacher_id: Uuid) -> Result<Vec<Assignment>, AppError> {
        Ok(sorted_assignments(tx, |assignment| assignment.teacher_id == teacher_id))
    }

    async fn update_assignment(&self, tx: &mut MemoryTables, assignment: Assignment) -> Result<Assignment, AppError> {
        match tx.assignments.get_mut(&assignment.audit.id) {
            Some(stored) if !stored.audit.is_deleted() => {
                let audit = stored.audit.clone();
                *stored = Assignment {
                    audit: Audit {
                        updated_by: assignment.audit.updated_by,
                        updated_at: assignment.audit.updated_at,
                        ..audit
                    },
                    ..assignment
                };
                Ok(stored.clone())
            }
            _ => Err(AppError::not_found(ASSIGNMENT_NOT_FOUND, "assignment not found")),
        }
    }

    async fn soft_delete_assignment(&self, tx: &mut MemoryTables, id: Uuid, actor: Uuid) -> Result<Assignment, AppError> {
        match tx.assignments.get_mut(&id) {
            Some(stored) if !stored.audit.is_deleted() => {
                stored.audit.tombstone(actor);
                Ok(stored.clone())
            }
            _ => Err(AppError::not_found(ASSIGNMENT_NOT_FOUND, "assignment not found")),
        }
    }
}

fn sorted_assignments(tx: &MemoryTables, keep: impl Fn(&Assignment) -> bool) -> Vec<Assignment> {
    let mut assignments: Vec<Assignment> = tx
        .assignments
        .values()
        .filter(|assignment| !assignment.audit.is_deleted() && keep(assignment))
        .cloned()
        .collect();
    assignments.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.audit.created_at.cmp(&b.audit.created_at))
    });
    assignments
}

fn sorted_submissions(tx: &MemoryTables, keep: impl Fn(&Submission) -> bool) -> Vec<Submission> {
    let mut submissions: Vec<Submission> = tx
        .submissions
        .values()
        .filter(|submission| !submission.audit.is_deleted() && keep(submission))
        .cloned()
        .collect();
    submissions.sort_by(|a, b| {
        a.submitted_at
            .cmp(&b.submitted_at)
            .then_with(|| a.audit.id.cmp(&b.audit.id))
    });
    submissions
}

#[async_trait]
impl SubmissionStore<MemoryTables> for MemoryRepository {
    async fn create_submission(&self, tx: &mut MemoryTables, submission: Submission) -> Result<Submission, AppError> {
        if !tx.assignments.contains_key(&submission.assignment_id) {
            return Err(AppError::Database(format!(
                "submissions.assignment_id {} has no assignment",
                submission.assignment_id
            )));
        }
        if !tx.users.contains_key(&submission.student_id) {
            return Err(AppError::Database(format!(
                "submissions.student_id {} has no user",
                submission.student_id
            )));
        }
        if tx.submissions.contains_key(&submission.audit.id) {
            return Err(AppError::conflict("duplicate value: submissions"));
        }
        tx.submissions.insert(submission.audit.id, submission.clone());
        Ok(submission)
    }

    async fn get_submission_by_id(&self, tx: &mut MemoryTables, id: Uuid) -> Result<Submission, AppError> {
        tx.submissions
            .get(&id)
            .filter(|submission| !submission.audit.is_deleted())
            .cloned()
            .ok_or_else(|| AppError::not_found(SUBMISSION_NOT_FOUND, "submission not found"))
    }

    async fn list_submissions_by_assignment(&self, tx: &mut MemoryTables, assignment_id: Uuid) -> Result<Vec<Submission>, AppError> {
        Ok(sorted_submissions(tx, |submission| submission.assignment_id == assignment_id))
    }

    async fn list_submissions_by_student(&self, tx: &mut MemoryTables, student_id: Uuid) -> Result<Vec<Submission>, AppError> {
        Ok(sorted_submissions(tx, |submission| submission.student_id == student_id))
    }

    async fn list_submissions_by_teacher(&self, tx: &mut MemoryTables, teacher_id: Uuid) -> Result<Vec<Submission>, AppError> {
        let owned: Vec<Uuid> = tx
            .assignments
            .values()
            .filter(|assignment| assignment.teacher_id == teacher_id && !assignment.audit.is_deleted())
            .map(|assignment| assignment.audit.id)
            .collect();
        Ok(sorted_submissions(tx, |submission| owned.contains(&submission.assignment_id)))
    }

    async fn update_submission(&self, tx: &mut MemoryTables, submission: Submission) -> Result<Submission, AppError> {
        match tx.submissions.get_mut(&submission.audit.id) {
            Some(stored) if !stored.audit.is_deleted() => {
                let audit = stored.audit.clone();
                // Ownership and timestamps are fixed at creation.
                *stored = Submission {
                    audit: Audit {
                        updated_by: submission.audit.updated_by,
                        updated_at: submission.audit.updated_at,
                        ..audit
                    },
                    assignment_id: stored.assignment_id,
                    student_id: stored.student_id,
                    submitted_at: stored.submitted_at,
                    ..submission
                };
                Ok(stored.clone())
            }
            _ => Err(AppError::not_found(SUBMISSION_NOT_FOUND, "submission not found")),
        }
    }

    async fn soft_delete_submission(&self, tx: &mut MemoryTables, id: Uuid, actor: Uuid) -> Result<Submission, AppError> {
        match tx.submissions.get_mut(&id) {
            Some(stored) if !stored.audit.is_deleted() => {
                stored.audit.tombstone(actor);
                Ok(stored.clone())
            }
            _ => Err(AppError::not_found(SUBMISSION_NOT_FOUND, "submission not found")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::models::Role;

    fn user(email: &str) -> User {
        let id = Uuid::new_v4();
        User {
            audit: Audit::with_id(id, id),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            role: Role::Teacher,
            last_login: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn failed_unit_of_work_leaves_tables_untouched() {
        let gateway = MemoryGateway::new();
        let repo = MemoryRepository::new();

        let result: Result<(), AppError> = gateway
            .run(move |tx| {
                Box::pin(async move {
                    repo.create_user(tx, user("grace@example.com")).await?;
                    Err::<(), AppError>(AppError::InvalidRole)
                })
            })
            .await;

        assert!(matches!(result, Err(AppError::InvalidRole)));
        assert!(gateway.snapshot().await.users.is_empty());
    }

    #[tokio::test]
    async fn panicking_unit_of_work_becomes_internal_error() {
        let gateway = MemoryGateway::new();
        let repo = MemoryRepository::new();

        let result: Result<(), AppError> = gateway
            .run(move |tx| {
                Box::pin(async move {
                    repo.create_user(tx, user("panic@example.com")).await?;
                    if !tx.users.is_empty() {
                        panic!("boom");
                    }
                    Ok::<(), AppError>(())
                })
            })
            .await;

        match result {
            Err(AppError::Internal(message)) => assert!(message.contains("boom")),
            other => panic!("expected internal error, got {other:?}"),
        }
        assert!(gateway.snapshot().await.users.is_empty());
    }

    #[tokio::test]
    async fn soft_deleted_course_is_hidden_but_retrievable_administratively() {
        let gateway = MemoryGateway::new();
        let repo = MemoryRepository::new();
        let actor = Uuid::new_v4();
        let course = Course {
            audit: Audit::new(actor),
            code: "CS101".to_string(),
            name: "Intro".to_string(),
            description: String::new(),
            start_date: Utc::now().date_naive(),
            end_date: Utc::now().date_naive(),
            is_active: true,
        };
        let id = course.audit.id;

        gateway
            .run(move |tx| {
                Box::pin(async move {
                    repo.create_course(tx, course).await?;
                    repo.soft_delete_course(tx, id, actor).await?;
                    Ok::<(), AppError>(())
                })
            })
            .await
            .expect("setup commits");

        let (hidden, raw) = gateway
            .run(move |tx| {
                Box::pin(async move {
                    let hidden = repo.get_course_by_id(tx, id).await;
                    let raw = repo.get_course_including_deleted(tx, id).await?;
                    Ok::<_, AppError>((hidden, raw))
                })
            })
            .await
            .expect("read commits");

        assert!(matches!(hidden, Err(AppError::NotFound { code: COURSE_NOT_FOUND, .. })));
        assert!(raw.audit.is_deleted());
        assert_eq!(raw.audit.deleted_by, Some(actor));
    }

    fn course(actor: Uuid) -> Course {
        Course {
            audit: Audit::new(actor),
            code: "DB1".to_string(),
            name: "Databases".to_string(),
            description: String::new(),
            start_date: Utc::now().date_naive(),
            end_date: Utc::now().date_naive(),
            is_active: true,
        }
    }

    fn assignment(course_id: Uuid, teacher_id: Uuid, due_in_days: i64) -> Assignment {
        Assignment {
            audit: Audit::new(teacher_id),
            course_id,
            teacher_id,
            title: format!("Due in {due_in_days}"),
            description: String::new(),
            content: String::new(),
            due_date: Utc::now() + chrono::Duration::days(due_in_days),
            total_points: 10.0,
            is_published: true,
        }
    }

    fn submission(assignment_id: Uuid, student_id: Uuid) -> Submission {
        Submission {
            audit: Audit::new(student_id),
            assignment_id,
            student_id,
            submitted_at: Utc::now(),
            content: "answer".to_string(),
            file_url: String::new(),
            grade: None,
            feedback: None,
            graded_at: None,
            graded_by: None,
        }
    }

    #[tokio::test]
    async fn role_extensions_update_in_place() {
        let gateway = MemoryGateway::new();
        let repo = MemoryRepository::new();

        let (teacher, student) = gateway
            .run(move |tx| {
                Box::pin(async move {
                    let teacher_user = repo.create_user(tx, user("grace@example.com")).await?;
                    let student_user = repo.create_user(tx, user("alan@example.com")).await?;
                    repo.create_teacher(
                        tx,
                        Teacher {
                            user_id: teacher_user.id(),
                            department: String::new(),
                            title: String::new(),
                        },
                    )
                    .await?;
                    repo.create_student(
                        tx,
                        Student {
                            user_id: student_user.id(),
                            student_id: "S2025-0000ABCD".to_string(),
                            enrollment_year: 2025,
                            program: "Maths".to_string(),
                        },
                    )
                    .await?;

                    let teacher = repo
                        .update_teacher(
                            tx,
                            Teacher {
                                user_id: teacher_user.id(),
                                department: "Computing".to_string(),
                                title: "Professor".to_string(),
                            },
                        )
                        .await?;
                    let student = repo
                        .update_student(
                            tx,
                            Student {
                                user_id: student_user.id(),
                                student_id: "S2025-0000ABCD".to_string(),
                                enrollment_year: 2026,
                                program: "Physics".to_string(),
                            },
                        )
                        .await?;
                    Ok::<_, AppError>((teacher, student))
                })
            })
            .await
            .expect("updates commit");

        let tables = gateway.snapshot().await;
        assert_eq!(tables.teachers[&teacher.user_id], teacher);
        assert_eq!(tables.teachers[&teacher.user_id].department, "Computing");
        assert_eq!(tables.students[&student.user_id], student);
        assert_eq!(tables.students[&student.user_id].program, "Physics");

        let missing = gateway
            .run(move |tx| {
                Box::pin(async move {
                    let err = repo
                        .update_teacher(
                            tx,
                            Teacher {
                                user_id: Uuid::new_v4(),
                                department: "Nowhere".to_string(),
                                title: String::new(),
                            },
                        )
                        .await
                        .unwrap_err();
                    Ok::<_, AppError>(err)
                })
            })
            .await
            .expect("read commits");
        assert!(matches!(missing, AppError::NotFound { code: TEACHER_NOT_FOUND, .. }));
    }

    #[tokio::test]
    async fn teacher_assignments_are_ordered_by_due_date() {
        let gateway = MemoryGateway::new();
        let repo = MemoryRepository::new();
        let teacher = Uuid::new_v4();
        let other = Uuid::new_v4();
        let course = course(teacher);
        let course_id = course.audit.id;

        let listed = gateway
            .run(move |tx| {
                Box::pin(async move {
                    repo.create_course(tx, course).await?;
                    repo.create_assignment(tx, assignment(course_id, teacher, 7)).await?;
                    repo.create_assignment(tx, assignment(course_id, other, 3)).await?;
                    repo.create_assignment(tx, assignment(course_id, teacher, 1)).await?;
                    repo.list_assignments_by_teacher(tx, teacher).await
                })
            })
            .await
            .expect("setup commits");

        let titles: Vec<&str> = listed.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, ["Due in 1", "Due in 7"]);
    }

    #[tokio::test]
    async fn soft_deleted_assignment_and_submission_drop_out_of_reads() {
        let gateway = MemoryGateway::new();
        let repo = MemoryRepository::new();
        let teacher = Uuid::new_v4();
        let student = user("alan@example.com");
        let student_id = student.id();
        let course = course(teacher);
        let course_id = course.audit.id;
        let assignment = assignment(course_id, teacher, 2);
        let assignment_id = assignment.audit.id;
        let submission = submission(assignment_id, student_id);
        let submission_id = submission.audit.id;

        gateway
            .run(move |tx| {
                Box::pin(async move {
                    repo.create_user(tx, student).await?;
                    repo.create_course(tx, course).await?;
                    repo.create_assignment(tx, assignment).await?;
                    repo.create_submission(tx, submission).await?;
                    Ok::<(), AppError>(())
                })
            })
            .await
            .expect("setup commits");

        // Submission first: it must vanish from every read while its assignment is live.
        gateway
            .run(move |tx| {
                Box::pin(async move {
                    let deleted = repo.soft_delete_submission(tx, submission_id, teacher).await?;
                    assert_eq!(deleted.audit.deleted_by, Some(teacher));

                    let err = repo.get_submission_by_id(tx, submission_id).await.unwrap_err();
                    assert!(matches!(err, AppError::NotFound { code: SUBMISSION_NOT_FOUND, .. }));
                    assert!(repo.list_submissions_by_assignment(tx, assignment_id).await?.is_empty());
                    assert!(repo.list_submissions_by_student(tx, student_id).await?.is_empty());
                    assert!(repo.list_submissions_by_teacher(tx, teacher).await?.is_empty());

                    let again = repo.soft_delete_submission(tx, submission_id, teacher).await.unwrap_err();
                    assert!(again.is_not_found());
                    Ok::<(), AppError>(())
                })
            })
            .await
            .expect("submission delete commits");

        gateway
            .run(move |tx| {
                Box::pin(async move {
                    let deleted = repo.soft_delete_assignment(tx, assignment_id, teacher).await?;
                    assert_eq!(deleted.audit.deleted_by, Some(teacher));

                    let err = repo.get_assignment_by_id(tx, assignment_id).await.unwrap_err();
                    assert!(matches!(err, AppError::NotFound { code: ASSIGNMENT_NOT_FOUND, .. }));
                    assert!(repo.list_assignments_by_course(tx, course_id).await?.is_empty());
                    assert!(repo.list_assignments_by_teacher(tx, teacher).await?.is_empty());
                    Ok::<(), AppError>(())
                })
            })
            .await
            .expect("assignment delete commits");

        let tables = gateway.snapshot().await;
        assert_eq!(tables.assignments[&assignment_id].audit.deleted_by, Some(teacher));
        assert_eq!(tables.submissions[&submission_id].audit.deleted_by, Some(teacher));
        assert!(tables.submissions[&submission_id].audit.deleted_at.is_some());
    }
}
