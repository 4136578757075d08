use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::LmsService;
use crate::{
    error::AppError,
    gateway::Gateway,
    models::{Assignment, Audit, Course, Role, Submission, User},
    payload::{
        AssignmentListResponse, AssignmentResponse, AssignmentSubmissions, CourseListResponse,
        CourseResponse, CourseSubmissionsResponse, CreateAssignmentRequest, CreateCourseRequest,
        CreateSubmissionRequest, SubmissionListResponse, SubmissionResponse,
        UpdateAssignmentRequest, UpdateCourseRequest, UpdateSubmissionRequest,
    },
    repository::{ASSIGNMENT_NOT_FOUND, SUBMISSION_NOT_FOUND, Stores},
};

/// LmsManager
///
/// `LmsService` over any gateway. Every public method clones the store handles into a
/// unit-of-work function below and runs it in one transaction.
pub struct LmsManager<G: Gateway> {
    gateway: G,
    stores: Stores<G::Tx>,
}

impl<G: Gateway> LmsManager<G> {
    pub fn new(gateway: G, stores: Stores<G::Tx>) -> Self {
        Self { gateway, stores }
    }
}

#[async_trait]
impl<G: Gateway> LmsService for LmsManager<G> {
    async fn create_course(&self, actor: Uuid, request: CreateCourseRequest) -> Result<CourseResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(create_course(stores, tx, actor, request)))
            .await
    }

    async fn get_course(&self, actor: Uuid, id: Uuid) -> Result<CourseResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(get_course(stores, tx, actor, id)))
            .await
    }

    async fn get_course_by_code(&self, actor: Uuid, code: String) -> Result<CourseResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(get_course_by_code(stores, tx, actor, code)))
            .await
    }

    async fn list_courses(&self, actor: Uuid) -> Result<CourseListResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(list_courses(stores, tx, actor)))
            .await
    }

    async fn update_course(&self, actor: Uuid, id: Uuid, request: UpdateCourseRequest) -> Result<CourseResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(update_course(stores, tx, actor, id, request)))
            .await
    }

    async fn delete_course(&self, actor: Uuid, id: Uuid) -> Result<CourseResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(delete_course(stores, tx, actor, id)))
            .await
    }

    async fn create_assignment(&self, actor: Uuid, request: CreateAssignmentRequest) -> Result<AssignmentResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(create_assignment(stores, tx, actor, request)))
            .await
    }

    async fn get_assignment(&self, actor: Uuid, id: Uuid) -> Result<AssignmentResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(get_assignment(stores, tx, actor, id)))
            .await
    }

    async fn list_assignments_by_course(&self, actor: Uuid, course_id: Uuid) -> Result<AssignmentListResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(list_assignments_by_course(stores, tx, actor, course_id)))
            .await
    }

    async fn update_assignment(&self, actor: Uuid, id: Uuid, request: UpdateAssignmentRequest) -> Result<AssignmentResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(update_assignment(stores, tx, actor, id, request)))
            .await
    }

    async fn create_submission(&self, actor: Uuid, request: CreateSubmissionRequest) -> Result<SubmissionResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(create_submission(stores, tx, actor, request)))
            .await
    }

    async fn get_submission(&self, actor: Uuid, id: Uuid) -> Result<SubmissionResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(get_submission(stores, tx, actor, id)))
            .await
    }

    async fn update_submission(&self, actor: Uuid, id: Uuid, request: UpdateSubmissionRequest) -> Result<SubmissionResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(update_submission(stores, tx, actor, id, request)))
            .await
    }

    async fn list_submissions_by_assignment(&self, actor: Uuid, assignment_id: Uuid) -> Result<SubmissionListResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(list_submissions_by_assignment(stores, tx, actor, assignment_id)))
            .await
    }

    async fn list_submissions_by_user(&self, actor: Uuid, user_id: Uuid) -> Result<SubmissionListResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(list_submissions_by_user(stores, tx, actor, user_id)))
            .await
    }

    async fn list_submissions_by_course(&self, actor: Uuid, course_id: Uuid) -> Result<CourseSubmissionsResponse, AppError> {
        let stores = self.stores.clone();
        self.gateway
            .run(move |tx| Box::pin(list_submissions_by_course(stores, tx, actor, course_id)))
            .await
    }
}

// --- Shared steps ---

async fn resolve_actor<Tx: Send>(stores: &Stores<Tx>, tx: &mut Tx, actor: Uuid) -> Result<User, AppError> {
    stores
        .users
        .get_user_by_id(tx, actor)
        .await
        .inspect_err(|err| tracing::warn!(%actor, error = %err, "acting user could not be resolved"))
}

fn denied(user: &User, action: &str) -> AppError {
    tracing::warn!(user_id = %user.id(), role = %user.role, action, "role not allowed");
    AppError::InvalidRole
}

/// Admins pass as they are; teachers must also have their extension row.
async fn ensure_staff<Tx: Send>(stores: &Stores<Tx>, tx: &mut Tx, user: &User, action: &str) -> Result<(), AppError> {
    match user.role {
        Role::Admin => Ok(()),
        Role::Teacher => stores.users.get_teacher_by_user_id(tx, user.id()).await.map(|_| ()),
        Role::Student => Err(denied(user, action)),
    }
}

fn assignment_not_found() -> AppError {
    AppError::not_found(ASSIGNMENT_NOT_FOUND, "assignment not found")
}

fn submission_not_found() -> AppError {
    AppError::not_found(SUBMISSION_NOT_FOUND, "submission not found")
}

// --- Courses ---

async fn create_course<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    request: CreateCourseRequest,
) -> Result<CourseResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    ensure_staff(&stores, tx, &user, "create course").await?;

    let code = request.code.trim().to_string();
    match stores.courses.get_course_by_code(tx, &code).await {
        Ok(_) => return Err(AppError::conflict("course code already exists")),
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err),
    }

    let course = stores
        .courses
        .create_course(
            tx,
            Course {
                audit: Audit::new(actor),
                code,
                name: request.name.trim().to_string(),
                description: request.description,
                start_date: request.start_date,
                end_date: request.end_date,
                is_active: request.is_active,
            },
        )
        .await?;

    tracing::info!(course_id = %course.audit.id, code = %course.code, %actor, "course created");
    Ok(course.into())
}

async fn get_course<Tx: Send>(stores: Stores<Tx>, tx: &mut Tx, actor: Uuid, id: Uuid) -> Result<CourseResponse, AppError> {
    resolve_actor(&stores, tx, actor).await?;
    Ok(stores.courses.get_course_by_id(tx, id).await?.into())
}

async fn get_course_by_code<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    code: String,
) -> Result<CourseResponse, AppError> {
    resolve_actor(&stores, tx, actor).await?;
    Ok(stores.courses.get_course_by_code(tx, code.trim()).await?.into())
}

async fn list_courses<Tx: Send>(stores: Stores<Tx>, tx: &mut Tx, actor: Uuid) -> Result<CourseListResponse, AppError> {
    resolve_actor(&stores, tx, actor).await?;
    let courses = stores.courses.list_courses(tx).await?;
    Ok(CourseListResponse {
        courses: courses.into_iter().map(CourseResponse::from).collect(),
    })
}

async fn update_course<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    id: Uuid,
    request: UpdateCourseRequest,
) -> Result<CourseResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    ensure_staff(&stores, tx, &user, "update course").await?;

    let mut course = stores.courses.get_course_by_id(tx, id).await?;
    if let Some(name) = request.name {
        course.name = name.trim().to_string();
    }
    if let Some(description) = request.description {
        course.description = description;
    }
    if let Some(start_date) = request.start_date {
        course.start_date = start_date;
    }
    if let Some(end_date) = request.end_date {
        course.end_date = end_date;
    }
    if let Some(is_active) = request.is_active {
        course.is_active = is_active;
    }
    if course.end_date < course.start_date {
        return Err(AppError::bad_request("end_date must not be before start_date"));
    }
    course.audit.touch(actor);

    let course = stores.courses.update_course(tx, course).await?;
    tracing::info!(course_id = %id, %actor, "course updated");
    Ok(course.into())
}

async fn delete_course<Tx: Send>(stores: Stores<Tx>, tx: &mut Tx, actor: Uuid, id: Uuid) -> Result<CourseResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    match user.role {
        Role::Admin => {}
        Role::Teacher | Role::Student => return Err(denied(&user, "delete course")),
    }

    let course = stores.courses.soft_delete_course(tx, id, actor).await?;
    tracing::info!(course_id = %id, %actor, "course deleted");
    Ok(course.into())
}

// --- Assignments ---

async fn create_assignment<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    request: CreateAssignmentRequest,
) -> Result<AssignmentResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    ensure_staff(&stores, tx, &user, "create assignment").await?;

    let course = stores.courses.get_course_by_id(tx, request.course_id).await?;

    let assignment = stores
        .assignments
        .create_assignment(
            tx,
            Assignment {
                audit: Audit::new(actor),
                course_id: course.audit.id,
                teacher_id: actor,
                title: request.title.trim().to_string(),
                description: request.description,
                content: request.content,
                due_date: request.due_date,
                total_points: request.total_points,
                is_published: true,
            },
        )
        .await?;

    tracing::info!(assignment_id = %assignment.audit.id, course_id = %course.audit.id, %actor, "assignment created");
    Ok(assignment.into())
}

async fn get_assignment<Tx: Send>(stores: Stores<Tx>, tx: &mut Tx, actor: Uuid, id: Uuid) -> Result<AssignmentResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    let assignment = stores.assignments.get_assignment_by_id(tx, id).await?;

    match user.role {
        Role::Admin | Role::Teacher => Ok(assignment.into()),
        Role::Student if assignment.is_published => Ok(assignment.into()),
        Role::Student => Err(assignment_not_found()),
    }
}

async fn list_assignments_by_course<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    course_id: Uuid,
) -> Result<AssignmentListResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    stores.courses.get_course_by_id(tx, course_id).await?;

    let assignments = stores.assignments.list_assignments_by_course(tx, course_id).await?;
    let visible = assignments.into_iter().filter(|assignment| match user.role {
        Role::Admin | Role::Teacher => true,
        Role::Student => assignment.is_published,
    });

    Ok(AssignmentListResponse {
        assignments: visible.map(AssignmentResponse::from).collect(),
    })
}

async fn update_assignment<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    id: Uuid,
    request: UpdateAssignmentRequest,
) -> Result<AssignmentResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    ensure_staff(&stores, tx, &user, "update assignment").await?;

    let mut assignment = stores.assignments.get_assignment_by_id(tx, id).await?;
    if assignment.teacher_id.is_nil() {
        return Err(AppError::bad_request("invalid teacher id"));
    }

    if let Some(title) = request.title {
        assignment.title = title.trim().to_string();
    }
    if let Some(description) = request.description {
        assignment.description = description;
    }
    if let Some(content) = request.content {
        assignment.content = content;
    }
    if let Some(due_date) = request.due_date {
        assignment.due_date = due_date;
    }
    if let Some(total_points) = request.total_points {
        assignment.total_points = total_points;
    }
    if let Some(is_published) = request.is_published {
        assignment.is_published = is_published;
    }
    assignment.audit.touch(actor);

    let assignment = stores.assignments.update_assignment(tx, assignment).await?;
    tracing::info!(assignment_id = %id, %actor, "assignment updated");
    Ok(assignment.into())
}

// --- Submissions ---

async fn create_submission<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    request: CreateSubmissionRequest,
) -> Result<SubmissionResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    let student = match user.role {
        Role::Student => stores.users.get_student_by_user_id(tx, actor).await?,
        Role::Admin | Role::Teacher => return Err(denied(&user, "create submission")),
    };

    let assignment = stores.assignments.get_assignment_by_id(tx, request.assignment_id).await?;
    if !assignment.is_published {
        return Err(assignment_not_found());
    }

    let submission = stores
        .submissions
        .create_submission(
            tx,
            Submission {
                audit: Audit::new(actor),
                assignment_id: assignment.audit.id,
                student_id: student.user_id,
                submitted_at: Utc::now(),
                content: request.content,
                file_url: request.file_url.trim().to_string(),
                grade: None,
                feedback: None,
                graded_at: None,
                graded_by: None,
            },
        )
        .await?;

    tracing::info!(submission_id = %submission.audit.id, assignment_id = %assignment.audit.id, %actor, "submission created");
    Ok(submission.into())
}

async fn get_submission<Tx: Send>(stores: Stores<Tx>, tx: &mut Tx, actor: Uuid, id: Uuid) -> Result<SubmissionResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    let submission = stores.submissions.get_submission_by_id(tx, id).await?;

    match user.role {
        Role::Admin | Role::Teacher => Ok(submission.into()),
        Role::Student if submission.student_id == actor => Ok(submission.into()),
        // Other students' work is reported as absent.
        Role::Student => Err(submission_not_found()),
    }
}

/// Teachers grade; students revise their own content. The two field sets never mix:
/// whatever the payload carries outside the caller's set is ignored. A teacher update
/// is a grading action, so it always carries a grade; feedback left out keeps its
/// previous value.
async fn update_submission<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    id: Uuid,
    request: UpdateSubmissionRequest,
) -> Result<SubmissionResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    let mut submission = stores.submissions.get_submission_by_id(tx, id).await?;

    match user.role {
        Role::Teacher => {
            stores.users.get_teacher_by_user_id(tx, actor).await?;
            let grade = request
                .grade
                .ok_or_else(|| AppError::bad_request("grade is required"))?;
            let assignment = stores.assignments.get_assignment_by_id(tx, submission.assignment_id).await?;
            if !(0.0..=assignment.total_points).contains(&grade) {
                return Err(AppError::bad_request(format!(
                    "grade must be between 0 and {}",
                    assignment.total_points
                )));
            }

            submission.grade = Some(grade);
            if request.feedback.is_some() {
                submission.feedback = request.feedback;
            }
            submission.graded_at = Some(Utc::now());
            submission.graded_by = Some(actor);
        }
        Role::Student => {
            stores.users.get_student_by_user_id(tx, actor).await?;
            if submission.student_id != actor {
                return Err(submission_not_found());
            }

            if let Some(content) = request.content {
                submission.content = content;
            }
            if let Some(file_url) = request.file_url.filter(|url| !url.trim().is_empty()) {
                submission.file_url = file_url.trim().to_string();
            }
        }
        Role::Admin => return Err(denied(&user, "update submission")),
    }
    submission.audit.touch(actor);

    let submission = stores.submissions.update_submission(tx, submission).await?;
    tracing::info!(submission_id = %id, %actor, role = %user.role, "submission updated");
    Ok(submission.into())
}

async fn list_submissions_by_assignment<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    assignment_id: Uuid,
) -> Result<SubmissionListResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    match user.role {
        Role::Teacher => {
            stores.users.get_teacher_by_user_id(tx, actor).await?;
        }
        Role::Admin | Role::Student => return Err(denied(&user, "list submissions by assignment")),
    }

    stores.assignments.get_assignment_by_id(tx, assignment_id).await?;
    let submissions = stores.submissions.list_submissions_by_assignment(tx, assignment_id).await?;

    Ok(SubmissionListResponse {
        submissions: submissions.into_iter().map(SubmissionResponse::from).collect(),
    })
}

async fn list_submissions_by_user<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    user_id: Uuid,
) -> Result<SubmissionListResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    if user_id != actor {
        return Err(AppError::bad_request("user id must match the authenticated user"));
    }

    let submissions = match user.role {
        Role::Teacher => {
            stores.users.get_teacher_by_user_id(tx, actor).await?;
            stores.submissions.list_submissions_by_teacher(tx, actor).await?
        }
        Role::Student => {
            stores.users.get_student_by_user_id(tx, actor).await?;
            stores.submissions.list_submissions_by_student(tx, actor).await?
        }
        Role::Admin => return Err(denied(&user, "list submissions by user")),
    };

    Ok(SubmissionListResponse {
        submissions: submissions.into_iter().map(SubmissionResponse::from).collect(),
    })
}

async fn list_submissions_by_course<Tx: Send>(
    stores: Stores<Tx>,
    tx: &mut Tx,
    actor: Uuid,
    course_id: Uuid,
) -> Result<CourseSubmissionsResponse, AppError> {
    let user = resolve_actor(&stores, tx, actor).await?;
    match user.role {
        Role::Teacher => {
            stores.users.get_teacher_by_user_id(tx, actor).await?;
        }
        Role::Student => {
            stores.users.get_student_by_user_id(tx, actor).await?;
        }
        Role::Admin => return Err(denied(&user, "list submissions by course")),
    }

    let course = stores.courses.get_course_by_id(tx, course_id).await?;
    let assignments = stores.assignments.list_assignments_by_course(tx, course_id).await?;

    let mut grouped = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let submissions = stores
            .submissions
            .list_submissions_by_assignment(tx, assignment.audit.id)
            .await?;
        let submissions: Vec<SubmissionResponse> = match user.role {
            Role::Student if !assignment.is_published => continue,
            Role::Student => submissions
                .into_iter()
                .filter(|submission| submission.student_id == actor)
                .map(SubmissionResponse::from)
                .collect(),
            Role::Teacher | Role::Admin => submissions.into_iter().map(SubmissionResponse::from).collect(),
        };
        grouped.push(AssignmentSubmissions {
            assignment: assignment.into(),
            submissions,
        });
    }

    Ok(CourseSubmissionsResponse {
        course: course.into(),
        assignments: grouped,
    })
}
