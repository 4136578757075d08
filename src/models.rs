use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    FromRow, Postgres,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Roles ---

/// Role
///
/// The closed set of account roles. Stored as lowercase TEXT in the `users.role` column
/// and serialized the same way on the wire, so `"student"` round-trips through both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            _ => Err(UnknownRole(raw.to_string())),
        }
    }
}

// The role column is plain TEXT, so the codec delegates to `str`.
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> PgTypeInfo {
        <str as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <str as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, Postgres> for Role {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as sqlx::Decode<'r, Postgres>>::decode(value)?;
        Ok(raw.parse::<Role>()?)
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <&str as sqlx::Encode<'q, Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// Audit
///
/// The bookkeeping columns shared by every soft-deletable table. A row is "deleted"
/// once `deleted_at` is set; default reads never return such rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Audit {
    pub id: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Audit {
    /// Fresh audit block with a new v4 id.
    pub fn new(created_by: Uuid) -> Self {
        Self::with_id(Uuid::new_v4(), created_by)
    }

    /// Audit block for a pre-assigned id. Self-registered users are their own creator.
    pub fn with_id(id: Uuid, created_by: Uuid) -> Self {
        Self {
            id,
            created_by,
            created_at: Utc::now(),
            updated_by: None,
            updated_at: None,
            deleted_by: None,
            deleted_at: None,
        }
    }

    pub fn touch(&mut self, actor: Uuid) {
        self.updated_by = Some(actor);
        self.updated_at = Some(Utc::now());
    }

    pub fn tombstone(&mut self, actor: Uuid) {
        let now = Utc::now();
        self.deleted_by = Some(actor);
        self.deleted_at = Some(now);
        self.updated_by = Some(actor);
        self.updated_at = Some(now);
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// User
///
/// The canonical account record in the `users` table. The bcrypt hash never leaves the
/// server: it is skipped on serialization and only read by the login flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl User {
    pub fn id(&self) -> Uuid {
        self.audit.id
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Teacher
///
/// Role extension row, present iff the owning user is a teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Teacher {
    pub user_id: Uuid,
    pub department: String,
    pub title: String,
}

/// Student
///
/// Role extension row, present iff the owning user is a student. `student_id` is the
/// externally visible enrolment number, distinct from the user's UUID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub user_id: Uuid,
    pub student_id: String,
    pub enrollment_year: i32,
    pub program: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Course {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub code: String,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// Assignment
///
/// Work set on a course. `teacher_id` references the user who owns it (a teacher, or
/// the admin who created it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub course_id: Uuid,
    pub teacher_id: Uuid,
    pub title: String,
    pub description: String,
    pub content: String,
    pub due_date: DateTime<Utc>,
    pub total_points: f64,
    pub is_published: bool,
}

/// Submission
///
/// A student's answer to an assignment. Content fields belong to the student; the
/// grading fields (`grade`, `feedback`, `graded_at`, `graded_by`) belong to the teacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Submission {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: Audit,
    pub assignment_id: Uuid,
    // The submitting student's user id.
    pub student_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub content: String,
    pub file_url: String,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    pub graded_by: Option<Uuid>,
}
