//! Roster reconciliation: merge a class roster with persisted grades.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::ReconcileError;
use crate::grading::{
    format_value, Exam, GradeRecord, RosterRow, Selection, Student, FALLBACK_MAX_VALUE,
};
use crate::traits::{GradeRecordProvider, RosterProvider};

/// Merge a roster with grade records into one row per student.
///
/// Rows follow roster order. A student listed twice gets a single row, and
/// when several records share a student the first one wins. Records for
/// students missing from the roster are dropped (and logged).
/// `default_max_value` applies to rows whose record carries no maximum.
pub fn merge_roster(
    students: &[Student],
    records: &[GradeRecord],
    default_max_value: f64,
) -> Vec<RosterRow> {
    let mut by_student: HashMap<&str, &GradeRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if by_student.contains_key(record.student_id.as_str()) {
            warn!(
                student_id = %record.student_id,
                record_id = ?record.id,
                "ignoring duplicate grade record"
            );
            continue;
        }
        by_student.insert(record.student_id.as_str(), record);
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(students.len());
    let mut rows = Vec::with_capacity(students.len());

    for student in students {
        if !seen.insert(student.id.as_str()) {
            warn!(student_id = %student.id, "ignoring duplicate roster entry");
            continue;
        }

        let row = match by_student.get(student.id.as_str()) {
            Some(record) => RosterRow {
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                grade_record_id: record.id.clone(),
                value: record.value.map(format_value).unwrap_or_default(),
                max_value: record
                    .max_value
                    .filter(|m| m.is_finite() && *m > 0.0)
                    .unwrap_or(default_max_value),
                notes: record.notes.clone().unwrap_or_default(),
            },
            None => RosterRow {
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                grade_record_id: None,
                value: String::new(),
                max_value: default_max_value,
                notes: String::new(),
            },
        };
        rows.push(row);
    }

    let orphans: Vec<&str> = records
        .iter()
        .map(|r| r.student_id.as_str())
        .filter(|id| !seen.contains(id))
        .collect();
    if !orphans.is_empty() {
        warn!(
            count = orphans.len(),
            student_ids = ?orphans,
            "dropping grade records for students not on the roster"
        );
    }

    rows
}

/// Loads the roster and existing grades for a selection and merges them.
#[derive(Clone)]
pub struct RosterReconciler {
    roster: Arc<dyn RosterProvider>,
    grades: Arc<dyn GradeRecordProvider>,
    default_max_value: f64,
}

impl RosterReconciler {
    pub fn new(roster: Arc<dyn RosterProvider>, grades: Arc<dyn GradeRecordProvider>) -> Self {
        Self {
            roster,
            grades,
            default_max_value: FALLBACK_MAX_VALUE,
        }
    }

    /// Override the maximum used when neither record nor exam has one.
    pub fn with_default_max_value(mut self, max_value: f64) -> Self {
        if max_value.is_finite() && max_value > 0.0 {
            self.default_max_value = max_value;
        }
        self
    }

    /// Fetch roster and grade records concurrently, then merge them.
    ///
    /// If either fetch fails no rows are produced.
    #[instrument(skip(self, selection, exam), fields(selection = %selection))]
    pub async fn reconcile(
        &self,
        selection: &Selection,
        exam: &Exam,
    ) -> Result<Vec<RosterRow>, ReconcileError> {
        let (students, records) = tokio::try_join!(
            self.roster.list_students(&selection.class_id),
            self.grades
                .list_grades(&selection.exam_id, &selection.class_id),
        )
        .map_err(ReconcileError::Fetch)?;

        let max_value = exam
            .total_marks
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(self.default_max_value);

        debug!(
            %selection,
            students = students.len(),
            records = records.len(),
            "merging roster"
        );
        Ok(merge_roster(&students, &records, max_value))
    }
}
