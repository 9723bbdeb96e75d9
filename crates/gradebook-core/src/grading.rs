//! Grading data model: reference records, persisted grades and editable rows.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum mark used when neither the grade record nor the exam has one.
pub const FALLBACK_MAX_VALUE: f64 = 20.0;

/// A student as returned by the roster provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A class (teaching group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolClass {
    pub id: String,
    pub name: String,
}

/// A reporting period (term, semester).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub id: String,
    pub name: String,
}

/// An exam that grades are recorded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub total_marks: Option<f64>,
    #[serde(default)]
    pub class_id: Option<String>,
    #[serde(default)]
    pub report_period_id: Option<String>,
}

impl Exam {
    /// Maximum mark for new rows: the exam's total, or 20 when unset.
    pub fn max_value(&self) -> f64 {
        self.total_marks
            .filter(|m| m.is_finite() && *m > 0.0)
            .unwrap_or(FALLBACK_MAX_VALUE)
    }

    /// Subject id, ignoring blank values.
    pub fn subject(&self) -> Option<&str> {
        self.subject_id.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// The class / period / exam a grade sheet is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub class_id: String,
    pub report_period_id: String,
    pub exam_id: String,
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "class {} / period {} / exam {}",
            self.class_id, self.report_period_id, self.exam_id
        )
    }
}

/// A persisted grade as read back from the grade-record provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub student_id: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One grade in an upsert batch. `id` is omitted for new records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeUpsert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub student_id: String,
    pub exam_id: String,
    pub class_id: String,
    pub report_period_id: String,
    pub subject_id: String,
    pub value: f64,
    pub max_value: f64,
    pub notes: String,
}

/// One editable line of a grade sheet, exactly one per roster student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub student_id: String,
    pub student_name: String,
    pub grade_record_id: Option<String>,
    /// Raw value as typed; empty means ungraded.
    pub value: String,
    pub max_value: f64,
    pub notes: String,
}

impl RosterRow {
    pub fn is_graded(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

/// Which part of a row an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Value,
    Notes,
}

/// Render a stored numeric value the way a user would type it.
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
