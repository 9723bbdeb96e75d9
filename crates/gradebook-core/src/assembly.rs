//! Quiz assembly: editing, validation and persistence of a whole quiz.

use crate::error::{PersistError, QuizIssue};
use crate::question::{Question, QuestionBody, QuestionKind};
use crate::quiz::{Quiz, QuizSettings};
use crate::traits::QuizStore;

/// Where the authoring workflow currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthoringState {
    /// Nothing edited yet.
    Idle,
    /// Unsaved changes.
    Editing,
    /// The last persist attempt was refused by validation.
    Invalid(Vec<QuizIssue>),
    /// Persisted under the given id with no edits since.
    Persisted(String),
}

/// Owns a quiz while it is being authored.
///
/// Every mutation goes through this type so the active-question pointer and
/// the authoring state stay consistent with the question list.
#[derive(Debug, Clone)]
pub struct QuizAssembly {
    quiz: Quiz,
    active: Option<String>,
    state: AuthoringState,
}

impl Default for QuizAssembly {
    fn default() -> Self {
        Self::new()
    }
}

impl QuizAssembly {
    pub fn new() -> Self {
        Self::from_quiz(Quiz::default())
    }

    /// Start editing an existing quiz (e.g. one loaded from a file).
    pub fn from_quiz(quiz: Quiz) -> Self {
        Self {
            quiz,
            active: None,
            state: AuthoringState::Idle,
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn into_quiz(self) -> Quiz {
        self.quiz
    }

    pub fn state(&self) -> &AuthoringState {
        &self.state
    }

    /// The question currently being edited.
    pub fn active(&self) -> Option<&Question> {
        self.active.as_deref().and_then(|id| self.quiz.question(id))
    }

    /// Make `id` the active question. Returns `false` for unknown ids.
    pub fn select(&mut self, id: &str) -> bool {
        if self.quiz.question(id).is_some() {
            self.active = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Append a new question of `kind` and make it active.
    pub fn add_question(&mut self, kind: QuestionKind) -> &mut Question {
        let question = Question::new(kind);
        self.active = Some(question.id().to_string());
        self.touch();
        self.quiz.questions.push(question);
        let last = self.quiz.questions.len() - 1;
        &mut self.quiz.questions[last]
    }

    /// Remove a question; clears the active pointer if it pointed at it.
    pub fn remove_question(&mut self, id: &str) -> bool {
        let Some(position) = self.quiz.position(id) else {
            return false;
        };
        self.quiz.questions.remove(position);
        if self.active.as_deref() == Some(id) {
            self.active = None;
        }
        self.touch();
        true
    }

    /// Mutable access to one question for field edits.
    pub fn question_mut(&mut self, id: &str) -> Option<&mut Question> {
        let position = self.quiz.position(id)?;
        self.touch();
        Some(&mut self.quiz.questions[position])
    }

    /// Move a question to `index` (clamped to the end of the list).
    pub fn move_question(&mut self, id: &str, index: usize) -> bool {
        let Some(from) = self.quiz.position(id) else {
            return false;
        };
        let question = self.quiz.questions.remove(from);
        let to = index.min(self.quiz.questions.len());
        self.quiz.questions.insert(to, question);
        self.touch();
        true
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.quiz.title = title.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.quiz.description = description.into();
        self.touch();
    }

    pub fn set_class(&mut self, class_ref: Option<String>) {
        self.quiz.class_ref = class_ref;
        self.touch();
    }

    pub fn set_subject(&mut self, subject_ref: Option<String>) {
        self.quiz.subject_ref = subject_ref;
        self.touch();
    }

    pub fn settings_mut(&mut self) -> &mut QuizSettings {
        self.touch();
        &mut self.quiz.settings
    }

    /// Duration in minutes from raw input, see [`QuizSettings::set_duration`].
    pub fn set_duration(&mut self, raw: &str) {
        self.settings_mut().set_duration(raw);
    }

    /// Pass threshold from raw input, clamped to 0..=100.
    pub fn set_pass_threshold(&mut self, raw: &str) {
        self.settings_mut().set_pass_threshold(raw);
    }

    /// Sum of all question points, recomputed on every call.
    pub fn total_points(&self) -> u32 {
        self.quiz.total_points()
    }

    /// Every problem that blocks persistence, see [`validate_quiz`].
    pub fn validate(&self) -> Vec<QuizIssue> {
        validate_quiz(&self.quiz)
    }

    /// Validate and, if clean, submit the whole quiz to the store.
    ///
    /// The first successful persist creates the quiz; later ones update it
    /// under the returned id. With any validation problem the store is not
    /// called at all.
    #[tracing::instrument(skip(self, store), fields(quiz_id = ?self.quiz.id))]
    pub async fn persist(&mut self, store: &dyn QuizStore) -> Result<String, PersistError> {
        let issues = self.validate();
        if !issues.is_empty() {
            tracing::debug!(count = issues.len(), "quiz failed validation");
            self.state = AuthoringState::Invalid(issues.clone());
            return Err(PersistError::Invalid(issues));
        }

        let result = match self.quiz.id.clone() {
            Some(id) => store.update_quiz(&id, &self.quiz).await,
            None => store.create_quiz(&self.quiz).await,
        };

        match result {
            Ok(id) => {
                tracing::info!(
                    quiz_id = %id,
                    questions = self.quiz.questions.len(),
                    total_points = self.quiz.total_points(),
                    "quiz persisted"
                );
                self.quiz.id = Some(id.clone());
                self.state = AuthoringState::Persisted(id.clone());
                Ok(id)
            }
            Err(e) => {
                self.state = AuthoringState::Editing;
                Err(PersistError::Store(e))
            }
        }
    }

    fn touch(&mut self) {
        self.state = AuthoringState::Editing;
    }
}

/// Check a quiz for everything that blocks persistence.
///
/// All checks run; issues come back grouped in this order: title, class,
/// question count, prompts, single-answer correctness, multi-answer
/// correctness.
pub fn validate_quiz(quiz: &Quiz) -> Vec<QuizIssue> {
    let mut issues = Vec::new();

    if quiz.title.trim().is_empty() {
        issues.push(QuizIssue::MissingTitle);
    }

    if quiz
        .class_ref
        .as_deref()
        .is_none_or(|c| c.trim().is_empty())
    {
        issues.push(QuizIssue::MissingClass);
    }

    if quiz.questions.is_empty() {
        issues.push(QuizIssue::NoQuestions);
    }

    for (position, question) in quiz.questions.iter().enumerate() {
        if question.prompt().trim().is_empty() {
            issues.push(QuizIssue::EmptyPrompt {
                question_id: question.id().to_string(),
                position,
            });
        }
    }

    for (position, question) in quiz.questions.iter().enumerate() {
        match question.body() {
            QuestionBody::SingleChoice { .. } | QuestionBody::Boolean { .. } => {
                let correct = question.correct_count();
                if correct != 1 {
                    issues.push(QuizIssue::ExclusiveAnswer {
                        question_id: question.id().to_string(),
                        position,
                        correct,
                    });
                }
            }
            QuestionBody::MultiChoice { .. }
            | QuestionBody::ShortAnswer { .. }
            | QuestionBody::Essay => {}
        }
    }

    for (position, question) in quiz.questions.iter().enumerate() {
        match question.body() {
            QuestionBody::MultiChoice { .. } => {
                if question.correct_count() == 0 {
                    issues.push(QuizIssue::NoCorrectOption {
                        question_id: question.id().to_string(),
                        position,
                    });
                }
            }
            QuestionBody::SingleChoice { .. }
            | QuestionBody::Boolean { .. }
            | QuestionBody::ShortAnswer { .. }
            | QuestionBody::Essay => {}
        }
    }

    issues
}
