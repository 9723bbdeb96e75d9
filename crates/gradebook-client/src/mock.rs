//! In-memory backend for tests and offline use.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use gradebook_core::error::CollaboratorError;
use gradebook_core::grading::{Exam, GradeRecord, GradeUpsert, ReportPeriod, SchoolClass, Student};
use gradebook_core::quiz::Quiz;
use gradebook_core::traits::{GradeRecordProvider, QuizStore, ReferenceProvider, RosterProvider};

#[derive(Debug, Clone)]
struct StoredGrade {
    exam_id: String,
    class_id: String,
    record: GradeRecord,
}

#[derive(Debug, Default)]
struct State {
    rosters: HashMap<String, Vec<Student>>,
    grades: Vec<StoredGrade>,
    classes: Vec<SchoolClass>,
    periods: Vec<ReportPeriod>,
    exams: Vec<Exam>,
    quizzes: HashMap<String, Quiz>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }
}

/// A backend that keeps everything in memory.
///
/// Counts every call and can be switched offline to exercise failure paths.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
    offline: AtomicBool,
    roster_calls: AtomicU32,
    grade_calls: AtomicU32,
    upsert_calls: AtomicU32,
    quiz_calls: AtomicU32,
    last_batch: Mutex<Option<Vec<GradeUpsert>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_students(self, class_id: &str, students: Vec<Student>) -> Self {
        self.lock()
            .rosters
            .insert(class_id.to_string(), students);
        self
    }

    pub fn with_grades(self, exam_id: &str, class_id: &str, records: Vec<GradeRecord>) -> Self {
        self.lock().grades.extend(records.into_iter().map(|record| StoredGrade {
            exam_id: exam_id.to_string(),
            class_id: class_id.to_string(),
            record,
        }));
        self
    }

    pub fn with_classes(self, classes: Vec<SchoolClass>) -> Self {
        self.lock().classes = classes;
        self
    }

    pub fn with_report_periods(self, periods: Vec<ReportPeriod>) -> Self {
        self.lock().periods = periods;
        self
    }

    pub fn with_exams(self, exams: Vec<Exam>) -> Self {
        self.lock().exams = exams;
        self
    }

    /// Make every following call fail with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    pub fn roster_calls(&self) -> u32 {
        self.roster_calls.load(Ordering::Relaxed)
    }

    pub fn grade_calls(&self) -> u32 {
        self.grade_calls.load(Ordering::Relaxed)
    }

    pub fn upsert_calls(&self) -> u32 {
        self.upsert_calls.load(Ordering::Relaxed)
    }

    pub fn quiz_calls(&self) -> u32 {
        self.quiz_calls.load(Ordering::Relaxed)
    }

    /// The last batch passed to `bulk_upsert`.
    pub fn last_batch(&self) -> Option<Vec<GradeUpsert>> {
        self.last_batch
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn quiz(&self, id: &str) -> Option<Quiz> {
        self.lock().quizzes.get(id).cloned()
    }

    /// Stored grades for an exam in a class.
    pub fn stored_grades(&self, exam_id: &str, class_id: &str) -> Vec<GradeRecord> {
        self.lock()
            .grades
            .iter()
            .filter(|g| g.exam_id == exam_id && g.class_id == class_id)
            .map(|g| g.record.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_online(&self) -> Result<(), CollaboratorError> {
        if self.offline.load(Ordering::Relaxed) {
            Err(CollaboratorError::Network("in-memory backend is offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RosterProvider for InMemoryBackend {
    async fn list_students(&self, class_id: &str) -> anyhow::Result<Vec<Student>> {
        self.roster_calls.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        Ok(self.lock().rosters.get(class_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl GradeRecordProvider for InMemoryBackend {
    async fn list_grades(&self, exam_id: &str, class_id: &str) -> anyhow::Result<Vec<GradeRecord>> {
        self.grade_calls.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        Ok(self.stored_grades(exam_id, class_id))
    }

    async fn bulk_upsert(&self, grades: &[GradeUpsert]) -> anyhow::Result<Vec<GradeRecord>> {
        self.upsert_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_batch.lock().unwrap_or_else(|e| e.into_inner()) = Some(grades.to_vec());
        self.check_online()?;

        let mut state = self.lock();
        if let Some(unknown) = grades.iter().find_map(|g| {
            g.id.as_ref()
                .filter(|id| !state.grades.iter().any(|s| s.record.id.as_ref() == Some(*id)))
        }) {
            return Err(CollaboratorError::NotFound(format!("grade record {unknown}")).into());
        }

        let mut saved = Vec::with_capacity(grades.len());
        for grade in grades {
            let record = GradeRecord {
                id: None,
                student_id: grade.student_id.clone(),
                value: Some(grade.value),
                max_value: Some(grade.max_value),
                notes: Some(grade.notes.clone()),
            };
            let id = match &grade.id {
                Some(id) => id.clone(),
                None => state.next_id("grade"),
            };
            let record = GradeRecord {
                id: Some(id.clone()),
                ..record
            };

            match state
                .grades
                .iter_mut()
                .find(|s| s.record.id.as_deref() == Some(id.as_str()))
            {
                Some(existing) => existing.record = record.clone(),
                None => state.grades.push(StoredGrade {
                    exam_id: grade.exam_id.clone(),
                    class_id: grade.class_id.clone(),
                    record: record.clone(),
                }),
            }
            saved.push(record);
        }
        Ok(saved)
    }
}

#[async_trait]
impl ReferenceProvider for InMemoryBackend {
    async fn list_classes(&self) -> anyhow::Result<Vec<SchoolClass>> {
        self.check_online()?;
        Ok(self.lock().classes.clone())
    }

    async fn list_report_periods(&self) -> anyhow::Result<Vec<ReportPeriod>> {
        self.check_online()?;
        Ok(self.lock().periods.clone())
    }

    async fn list_exams(
        &self,
        class_id: &str,
        report_period_id: Option<&str>,
    ) -> anyhow::Result<Vec<Exam>> {
        self.check_online()?;
        Ok(self
            .lock()
            .exams
            .iter()
            .filter(|e| e.class_id.as_deref().is_none_or(|c| c == class_id))
            .filter(|e| match (report_period_id, e.report_period_id.as_deref()) {
                (Some(wanted), Some(actual)) => wanted == actual,
                _ => true,
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QuizStore for InMemoryBackend {
    async fn create_quiz(&self, quiz: &Quiz) -> anyhow::Result<String> {
        self.quiz_calls.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        let mut state = self.lock();
        let id = state.next_id("quiz");
        let mut stored = quiz.clone();
        stored.id = Some(id.clone());
        state.quizzes.insert(id.clone(), stored);
        Ok(id)
    }

    async fn update_quiz(&self, id: &str, quiz: &Quiz) -> anyhow::Result<String> {
        self.quiz_calls.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        let mut state = self.lock();
        let Some(stored) = state.quizzes.get_mut(id) else {
            return Err(CollaboratorError::NotFound(format!("quiz {id}")).into());
        };
        *stored = quiz.clone();
        stored.id = Some(id.to_string());
        Ok(id.to_string())
    }
}
