//! Grade sheet editing and bulk save.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::SaveError;
use crate::grading::{Exam, GradeRecord, GradeUpsert, RosterRow, RowField, Selection};
use crate::traits::GradeRecordProvider;

/// Editable rows bound to the selection they were loaded for.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeSheet {
    selection: Selection,
    exam: Exam,
    rows: Vec<RosterRow>,
}

impl GradeSheet {
    pub fn new(selection: Selection, exam: Exam, rows: Vec<RosterRow>) -> Self {
        Self {
            selection,
            exam,
            rows,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    pub fn rows(&self) -> &[RosterRow] {
        &self.rows
    }

    pub fn row(&self, student_id: &str) -> Option<&RosterRow> {
        self.rows.iter().find(|r| r.student_id == student_id)
    }

    /// Rows with a non-blank value.
    pub fn graded_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_graded()).count()
    }

    /// Overwrite one field of a student's row as typed.
    ///
    /// No validation happens here. Returns `false` for unknown students.
    pub fn stage_edit(&mut self, student_id: &str, field: RowField, value: &str) -> bool {
        let Some(row) = self.rows.iter_mut().find(|r| r.student_id == student_id) else {
            return false;
        };
        match field {
            RowField::Value => row.value = value.to_string(),
            RowField::Notes => row.notes = value.to_string(),
        }
        true
    }

    /// Build the upsert batch for every graded row.
    ///
    /// Fails before anything is sent when the exam has no subject or a value
    /// is not a finite number. An empty batch means there is nothing to save.
    pub fn build_batch(&self) -> Result<Vec<GradeUpsert>, SaveError> {
        let graded: Vec<&RosterRow> = self.rows.iter().filter(|r| r.is_graded()).collect();
        if graded.is_empty() {
            return Ok(Vec::new());
        }

        let subject_id = self
            .exam
            .subject()
            .ok_or_else(|| SaveError::MissingSubject {
                exam_id: self.exam.id.clone(),
            })?
            .to_string();

        graded
            .into_iter()
            .map(|row| {
                let raw = row.value.trim();
                let value = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| SaveError::InvalidValue {
                        student_id: row.student_id.clone(),
                        value: raw.to_string(),
                    })?;

                Ok(GradeUpsert {
                    id: row.grade_record_id.clone(),
                    student_id: row.student_id.clone(),
                    exam_id: self.selection.exam_id.clone(),
                    class_id: self.selection.class_id.clone(),
                    report_period_id: self.selection.report_period_id.clone(),
                    subject_id: subject_id.clone(),
                    value,
                    max_value: row.max_value,
                    notes: row.notes.clone(),
                })
            })
            .collect()
    }

    /// Record ids assigned by the backend so later saves update in place.
    ///
    /// Returns how many rows received a new id.
    pub fn apply_saved(&mut self, saved: &[GradeRecord]) -> usize {
        let ids: HashMap<&str, &str> = saved
            .iter()
            .filter_map(|r| r.id.as_deref().map(|id| (r.student_id.as_str(), id)))
            .collect();

        let mut assigned = 0;
        for row in &mut self.rows {
            if let Some(id) = ids.get(row.student_id.as_str()) {
                if row.grade_record_id.as_deref() != Some(*id) {
                    row.grade_record_id = Some((*id).to_string());
                    assigned += 1;
                }
            }
        }
        assigned
    }
}

/// Summary of a successful bulk save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub created: usize,
    pub updated: usize,
    pub saved_at: DateTime<Utc>,
}

impl SaveReceipt {
    pub fn total(&self) -> usize {
        self.created + self.updated
    }

    /// Receipt for a batch that the backend accepted.
    pub fn for_batch(batch: &[GradeUpsert]) -> Self {
        let created = batch.iter().filter(|g| g.id.is_none()).count();
        Self {
            created,
            updated: batch.len() - created,
            saved_at: Utc::now(),
        }
    }
}

/// Result of a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// No row had a value; no request was made.
    NothingToSave,
    Saved(SaveReceipt),
}

/// Commits grade sheets through the grade-record collaborator.
#[derive(Clone)]
pub struct GradeBulkSaver {
    grades: Arc<dyn GradeRecordProvider>,
}

impl GradeBulkSaver {
    pub fn new(grades: Arc<dyn GradeRecordProvider>) -> Self {
        Self { grades }
    }

    /// Send a prepared batch in one request.
    pub async fn submit(&self, batch: &[GradeUpsert]) -> Result<Vec<GradeRecord>, SaveError> {
        debug!(grades = batch.len(), "submitting grade batch");
        self.grades
            .bulk_upsert(batch)
            .await
            .map_err(SaveError::Rejected)
    }

    /// Validate, submit and write returned ids back into the sheet.
    ///
    /// On any failure the sheet is left exactly as it was.
    #[instrument(skip(self, sheet), fields(selection = %sheet.selection()))]
    pub async fn commit(&self, sheet: &mut GradeSheet) -> Result<SaveOutcome, SaveError> {
        let batch = sheet.build_batch()?;
        if batch.is_empty() {
            debug!(selection = %sheet.selection(), "nothing to save");
            return Ok(SaveOutcome::NothingToSave);
        }

        let saved = self.submit(&batch).await?;
        sheet.apply_saved(&saved);

        let receipt = SaveReceipt::for_batch(&batch);
        info!(
            selection = %sheet.selection(),
            created = receipt.created,
            updated = receipt.updated,
            "grades saved"
        );
        Ok(SaveOutcome::Saved(receipt))
    }
}
