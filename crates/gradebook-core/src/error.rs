//! Error types for gradebook.
//!
//! `CollaboratorError` is defined here rather than in the client crate so the
//! workflows and their callers can downcast a failed fetch or save and decide
//! whether offering a retry makes sense, without string matching.

use thiserror::Error;

/// Errors raised by a backend collaborator (roster, grades, quiz store).
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The backend refused the credentials (401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend answered with an error status.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a body we could not decode.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl CollaboratorError {
    /// Returns `true` if re-issuing the same operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::Timeout(_) | CollaboratorError::Network(_) => true,
            CollaboratorError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// A single problem found while validating a quiz.
///
/// Variants are listed in the order `QuizAssembly::validate` reports them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizIssue {
    #[error("title must not be empty")]
    MissingTitle,

    #[error("a class must be selected")]
    MissingClass,

    #[error("the quiz needs at least one question")]
    NoQuestions,

    #[error("question {} has an empty prompt", .position + 1)]
    EmptyPrompt { question_id: String, position: usize },

    #[error("question {} must have exactly one correct option (found {correct})", .position + 1)]
    ExclusiveAnswer {
        question_id: String,
        position: usize,
        correct: usize,
    },

    #[error("question {} needs at least one correct option", .position + 1)]
    NoCorrectOption { question_id: String, position: usize },
}

impl QuizIssue {
    /// Field path the issue belongs to, for attaching messages to form inputs.
    pub fn field(&self) -> String {
        match self {
            QuizIssue::MissingTitle => "title".to_string(),
            QuizIssue::MissingClass => "classRef".to_string(),
            QuizIssue::NoQuestions => "questions".to_string(),
            QuizIssue::EmptyPrompt { position, .. } => format!("questions[{position}].prompt"),
            QuizIssue::ExclusiveAnswer { position, .. }
            | QuizIssue::NoCorrectOption { position, .. } => {
                format!("questions[{position}].options")
            }
        }
    }

    /// Id of the offending question, if the issue is question-level.
    pub fn question_id(&self) -> Option<&str> {
        match self {
            QuizIssue::EmptyPrompt { question_id, .. }
            | QuizIssue::ExclusiveAnswer { question_id, .. }
            | QuizIssue::NoCorrectOption { question_id, .. } => Some(question_id),
            _ => None,
        }
    }
}

/// Failure to persist a quiz.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Validation failed; nothing was sent to the store.
    #[error("quiz has {} validation problem(s)", .0.len())]
    Invalid(Vec<QuizIssue>),

    /// The quiz store rejected the submission.
    #[error(transparent)]
    Store(anyhow::Error),
}

/// Failure to load a reconciled roster.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Class, report period or exam has not been chosen yet.
    #[error("select a class, report period and exam before loading the roster")]
    IncompleteSelection,

    /// The roster or grade-record fetch failed.
    #[error(transparent)]
    Fetch(anyhow::Error),
}

/// Failure to commit edited grades.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The selected exam has no subject; this is a configuration problem.
    #[error("exam '{exam_id}' has no subject configured; grades cannot be saved")]
    MissingSubject { exam_id: String },

    /// A staged value is not a number.
    #[error("value '{value}' for student '{student_id}' is not a number")]
    InvalidValue { student_id: String, value: String },

    /// A commit is already outstanding.
    #[error("a save is already in progress")]
    InProgress,

    /// No roster is loaded, so there is nothing to commit against.
    #[error("no roster is loaded")]
    NoRoster,

    /// The grade-record collaborator rejected the batch.
    #[error(transparent)]
    Rejected(anyhow::Error),
}

impl SaveError {
    /// Precondition failures are raised before any request is issued.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SaveError::MissingSubject { .. } | SaveError::InvalidValue { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(CollaboratorError::Timeout(30).is_retryable());
        assert!(CollaboratorError::Network("reset".into()).is_retryable());
        assert!(CollaboratorError::Rejected {
            status: 503,
            message: "unavailable".into()
        }
        .is_retryable());
        assert!(!CollaboratorError::Rejected {
            status: 422,
            message: "bad".into()
        }
        .is_retryable());
        assert!(!CollaboratorError::Unauthorized("expired".into()).is_retryable());
    }

    #[test]
    fn issue_fields_and_messages() {
        let issue = QuizIssue::EmptyPrompt {
            question_id: "q1".into(),
            position: 2,
        };
        assert_eq!(issue.field(), "questions[2].prompt");
        assert_eq!(issue.to_string(), "question 3 has an empty prompt");
        assert_eq!(issue.question_id(), Some("q1"));
        assert_eq!(QuizIssue::MissingClass.field(), "classRef");
        assert_eq!(QuizIssue::MissingTitle.question_id(), None);
    }

    #[test]
    fn transparent_errors_keep_the_collaborator_message() {
        let err = SaveError::Rejected(CollaboratorError::Timeout(10).into());
        assert_eq!(err.to_string(), "request timed out after 10s");
        assert!(!err.is_precondition());
        assert!(SaveError::MissingSubject {
            exam_id: "e1".into()
        }
        .is_precondition());
    }
}
