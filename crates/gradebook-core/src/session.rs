//! Grading session: selection, roster loading and saving as one state machine.
//!
//! [`GradingSession`] is plain owned state with synchronous transitions.
//! Every change of selection and every load bumps a generation counter; a
//! load result is applied only if it carries the current generation, so a
//! slow response for an old selection can never overwrite a newer one.
//! [`GradingController`] drives a shared session against the collaborators
//! and releases the lock while requests are in flight.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ReconcileError, SaveError};
use crate::grading::{Exam, GradeRecord, GradeUpsert, RosterRow, RowField, Selection};
use crate::reconcile::RosterReconciler;
use crate::saver::{GradeBulkSaver, GradeSheet, SaveOutcome, SaveReceipt};

/// Where the grading workflow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradingPhase {
    Unselected,
    ClassChosen,
    ExamChosen,
    Loading,
    Editing,
    Saving,
    Saved,
    Failed,
}

impl fmt::Display for GradingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GradingPhase::Unselected => "unselected",
            GradingPhase::ClassChosen => "class chosen",
            GradingPhase::ExamChosen => "exam chosen",
            GradingPhase::Loading => "loading",
            GradingPhase::Editing => "editing",
            GradingPhase::Saving => "saving",
            GradingPhase::Saved => "saved",
            GradingPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Proof that a load was started, tagged with the generation it belongs to.
#[derive(Debug, Clone)]
pub struct LoadTicket {
    generation: u64,
    selection: Selection,
    exam: Exam,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }
}

/// What happened to a finished load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// The selection changed while loading; the result was discarded.
    Stale,
}

/// An outstanding save and the batch it sends.
#[derive(Debug, Clone)]
pub struct SaveTicket {
    generation: u64,
    batch: Vec<GradeUpsert>,
}

impl SaveTicket {
    pub fn batch(&self) -> &[GradeUpsert] {
        &self.batch
    }
}

/// Result of starting a save.
#[derive(Debug, Clone)]
pub enum SavePlan {
    NothingToSave,
    Submit(SaveTicket),
}

#[derive(Debug, Default)]
pub struct GradingSession {
    generation: u64,
    class_id: Option<String>,
    report_period_id: Option<String>,
    exam: Option<Exam>,
    loading: bool,
    saving: bool,
    /// A row changed after the outstanding batch was built.
    edited_while_saving: bool,
    sheet: Option<GradeSheet>,
    last_save: Option<Result<SaveReceipt, String>>,
}

impl GradingSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> GradingPhase {
        if self.saving {
            return GradingPhase::Saving;
        }
        if self.loading {
            return GradingPhase::Loading;
        }
        if self.sheet.is_some() {
            return match self.last_save {
                Some(Ok(_)) => GradingPhase::Saved,
                Some(Err(_)) => GradingPhase::Failed,
                None => GradingPhase::Editing,
            };
        }
        match (&self.class_id, self.selection()) {
            (_, Some(_)) => GradingPhase::ExamChosen,
            (Some(_), None) => GradingPhase::ClassChosen,
            (None, None) => GradingPhase::Unselected,
        }
    }

    /// Class, period and exam, once all three are chosen.
    pub fn selection(&self) -> Option<Selection> {
        Some(Selection {
            class_id: self.class_id.clone()?,
            report_period_id: self.report_period_id.clone()?,
            exam_id: self.exam.as_ref()?.id.clone(),
        })
    }

    pub fn exam(&self) -> Option<&Exam> {
        self.exam.as_ref()
    }

    pub fn sheet(&self) -> Option<&GradeSheet> {
        self.sheet.as_ref()
    }

    pub fn rows(&self) -> &[RosterRow] {
        self.sheet.as_ref().map(|s| s.rows()).unwrap_or_default()
    }

    /// Message of the last failed save, if the sheet is in the failed phase.
    pub fn last_error(&self) -> Option<&str> {
        match &self.last_save {
            Some(Err(message)) => Some(message),
            _ => None,
        }
    }

    /// Choose a class. Exams are per class, so the exam and rows are cleared.
    pub fn select_class(&mut self, class_id: impl Into<String>) {
        self.class_id = Some(class_id.into());
        self.exam = None;
        self.invalidate();
    }

    /// Choose a report period. Clears the exam and rows.
    pub fn select_period(&mut self, report_period_id: impl Into<String>) {
        self.report_period_id = Some(report_period_id.into());
        self.exam = None;
        self.invalidate();
    }

    /// Choose the exam grades are recorded against. Clears the rows.
    pub fn select_exam(&mut self, exam: Exam) {
        self.exam = Some(exam);
        self.invalidate();
    }

    /// Start loading rows for the current selection.
    ///
    /// Supersedes any load still in flight.
    pub fn begin_load(&mut self) -> Result<LoadTicket, ReconcileError> {
        let selection = self.selection().ok_or(ReconcileError::IncompleteSelection)?;
        let exam = self
            .exam
            .clone()
            .ok_or(ReconcileError::IncompleteSelection)?;

        self.generation += 1;
        self.loading = true;
        debug!(generation = self.generation, %selection, "roster load started");
        Ok(LoadTicket {
            generation: self.generation,
            selection,
            exam,
        })
    }

    /// Apply a finished load if it still belongs to the current generation.
    ///
    /// Stale results are dropped whether they succeeded or not. A current
    /// failure leaves no rows and is returned to the caller.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<RosterRow>, ReconcileError>,
    ) -> Result<LoadOutcome, ReconcileError> {
        if ticket.generation != self.generation {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale roster"
            );
            return Ok(LoadOutcome::Stale);
        }

        self.loading = false;
        self.last_save = None;
        match result {
            Ok(rows) => {
                self.sheet = Some(GradeSheet::new(ticket.selection, ticket.exam, rows));
                Ok(LoadOutcome::Applied)
            }
            Err(e) => {
                self.sheet = None;
                Err(e)
            }
        }
    }

    /// Edit a loaded row. Returns `false` without rows or for unknown students.
    pub fn stage_edit(&mut self, student_id: &str, field: RowField, value: &str) -> bool {
        let Some(sheet) = self.sheet.as_mut() else {
            return false;
        };
        let changed = sheet.stage_edit(student_id, field, value);
        if changed {
            if self.saving {
                self.edited_while_saving = true;
            } else {
                self.last_save = None;
            }
        }
        changed
    }

    /// Start a save. Refused while another save is outstanding.
    pub fn begin_save(&mut self) -> Result<SavePlan, SaveError> {
        if self.saving {
            return Err(SaveError::InProgress);
        }
        let sheet = self.sheet.as_ref().ok_or(SaveError::NoRoster)?;
        let batch = sheet.build_batch()?;
        if batch.is_empty() {
            return Ok(SavePlan::NothingToSave);
        }

        self.saving = true;
        self.edited_while_saving = false;
        Ok(SavePlan::Submit(SaveTicket {
            generation: self.generation,
            batch,
        }))
    }

    /// Record the collaborator's answer for an outstanding save.
    ///
    /// Returned ids are applied only if the rows still belong to the
    /// selection the batch was built from. Edits staged while the batch was
    /// in flight keep the session in the editing phase.
    pub fn finish_save(
        &mut self,
        ticket: SaveTicket,
        result: Result<Vec<GradeRecord>, SaveError>,
    ) -> Result<SaveOutcome, SaveError> {
        self.saving = false;
        let current = ticket.generation == self.generation;
        let edited = std::mem::take(&mut self.edited_while_saving);

        match result {
            Ok(saved) => {
                let receipt = SaveReceipt::for_batch(&ticket.batch);
                if current {
                    if let Some(sheet) = self.sheet.as_mut() {
                        sheet.apply_saved(&saved);
                    }
                    self.last_save = if edited {
                        debug!("rows changed during save, edits still pending");
                        None
                    } else {
                        Some(Ok(receipt.clone()))
                    };
                }
                Ok(SaveOutcome::Saved(receipt))
            }
            Err(e) => {
                if current {
                    self.last_save = Some(Err(e.to_string()));
                }
                Err(e)
            }
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.loading = false;
        self.edited_while_saving = false;
        self.sheet = None;
        self.last_save = None;
    }
}

/// Runs a shared [`GradingSession`] against the roster and grade collaborators.
#[derive(Clone)]
pub struct GradingController {
    session: Arc<Mutex<GradingSession>>,
    reconciler: RosterReconciler,
    saver: GradeBulkSaver,
}

impl GradingController {
    pub fn new(reconciler: RosterReconciler, saver: GradeBulkSaver) -> Self {
        Self {
            session: Arc::new(Mutex::new(GradingSession::new())),
            reconciler,
            saver,
        }
    }

    pub async fn select_class(&self, class_id: &str) {
        self.session.lock().await.select_class(class_id);
    }

    pub async fn select_period(&self, report_period_id: &str) {
        self.session.lock().await.select_period(report_period_id);
    }

    pub async fn select_exam(&self, exam: Exam) {
        self.session.lock().await.select_exam(exam);
    }

    /// Choose class, period and exam in one step.
    pub async fn select(&self, class_id: &str, report_period_id: &str, exam: Exam) {
        let mut session = self.session.lock().await;
        session.select_class(class_id);
        session.select_period(report_period_id);
        session.select_exam(exam);
    }

    /// Load rows for the current selection.
    pub async fn load(&self) -> Result<LoadOutcome, ReconcileError> {
        let ticket = self.session.lock().await.begin_load()?;
        let result = self
            .reconciler
            .reconcile(ticket.selection(), ticket.exam())
            .await;
        self.session.lock().await.apply_load(ticket, result)
    }

    pub async fn stage_edit(&self, student_id: &str, field: RowField, value: &str) -> bool {
        self.session
            .lock()
            .await
            .stage_edit(student_id, field, value)
    }

    /// Commit graded rows. A second call while one is outstanding fails
    /// with [`SaveError::InProgress`] and sends nothing.
    pub async fn commit(&self) -> Result<SaveOutcome, SaveError> {
        let plan = self.session.lock().await.begin_save()?;
        let ticket = match plan {
            SavePlan::NothingToSave => return Ok(SaveOutcome::NothingToSave),
            SavePlan::Submit(ticket) => ticket,
        };
        let result = self.saver.submit(ticket.batch()).await;
        self.session.lock().await.finish_save(ticket, result)
    }

    pub async fn phase(&self) -> GradingPhase {
        self.session.lock().await.phase()
    }

    /// Copy of the current rows.
    pub async fn rows(&self) -> Vec<RosterRow> {
        self.session.lock().await.rows().to_vec()
    }
}
