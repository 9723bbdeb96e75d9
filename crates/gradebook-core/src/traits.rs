//! Collaborator traits.
//!
//! The core never talks to a backend directly. These async traits are
//! implemented by `gradebook-client` (REST and in-memory) and by test doubles.
//! Implementations report failures as `anyhow::Error`, ideally wrapping a
//! [`CollaboratorError`](crate::error::CollaboratorError) so callers can
//! classify them.

use async_trait::async_trait;

use crate::grading::{Exam, GradeRecord, GradeUpsert, ReportPeriod, SchoolClass, Student};
use crate::quiz::Quiz;

// ---------------------------------------------------------------------------
// Grading side
// ---------------------------------------------------------------------------

/// Source of class rosters.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    /// Students enrolled in `class_id`, in the provider's display order.
    async fn list_students(&self, class_id: &str) -> anyhow::Result<Vec<Student>>;
}

/// Reads and writes persisted grades.
#[async_trait]
pub trait GradeRecordProvider: Send + Sync {
    /// Grades already recorded for an exam in a class.
    async fn list_grades(&self, exam_id: &str, class_id: &str) -> anyhow::Result<Vec<GradeRecord>>;

    /// Insert or update every grade in one request.
    ///
    /// Succeeds or fails as a unit. Returns the saved records, which may be
    /// empty when the backend does not echo them.
    async fn bulk_upsert(&self, grades: &[GradeUpsert]) -> anyhow::Result<Vec<GradeRecord>>;
}

/// Lists used to populate the class / period / exam pickers.
#[async_trait]
pub trait ReferenceProvider: Send + Sync {
    async fn list_classes(&self) -> anyhow::Result<Vec<SchoolClass>>;

    async fn list_report_periods(&self) -> anyhow::Result<Vec<ReportPeriod>>;

    async fn list_exams(
        &self,
        class_id: &str,
        report_period_id: Option<&str>,
    ) -> anyhow::Result<Vec<Exam>>;
}

// ---------------------------------------------------------------------------
// Authoring side
// ---------------------------------------------------------------------------

/// Persists whole quizzes.
#[async_trait]
pub trait QuizStore: Send + Sync {
    /// Store a new quiz and return its identifier.
    async fn create_quiz(&self, quiz: &Quiz) -> anyhow::Result<String>;

    /// Replace the quiz stored under `id` and return its identifier.
    async fn update_quiz(&self, id: &str, quiz: &Quiz) -> anyhow::Result<String>;
}
