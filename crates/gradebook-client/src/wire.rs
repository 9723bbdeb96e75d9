//! JSON shapes exchanged with the REST backend.
//!
//! The backend is loose about types: ids come back as strings or numbers,
//! decimals sometimes as strings, and list responses are either bare arrays
//! or wrapped in `{ "data": ... }`. Everything is normalized here so the core
//! types stay strict.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use gradebook_core::grading::{Exam, GradeRecord, GradeUpsert, ReportPeriod, SchoolClass, Student};
use gradebook_core::question::{AnswerOption, Question, QuestionKind};
use gradebook_core::quiz::{Quiz, QuizSettings};

/// A response body, bare or wrapped in `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

/// Body of a bulk upsert answer. Backends that do not echo the saved
/// records fall through to `Other`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BulkResponse {
    Data { data: Vec<WireGrade> },
    Grades { grades: Vec<WireGrade> },
    Bare(Vec<WireGrade>),
    Other(serde_json::Value),
}

impl BulkResponse {
    pub(crate) fn into_records(self) -> Vec<GradeRecord> {
        let grades = match self {
            BulkResponse::Data { data } => data,
            BulkResponse::Grades { grades } => grades,
            BulkResponse::Bare(grades) => grades,
            BulkResponse::Other(_) => Vec::new(),
        };
        grades.into_iter().map(GradeRecord::from).collect()
    }
}

/// Identifier sent as either a string or a number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WireId(pub String);

impl<'de> Deserialize<'de> for WireId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct Vis;
        impl<'de> Visitor<'de> for Vis {
            type Value = WireId;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("string or integer id")
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<WireId, E> {
                Ok(WireId(v.to_string()))
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<WireId, E> {
                Ok(WireId(v.to_string()))
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<WireId, E> {
                Ok(WireId(v.to_string()))
            }
            fn visit_string<E: de::Error>(self, v: String) -> Result<WireId, E> {
                Ok(WireId(v))
            }
        }
        d.deserialize_any(Vis)
    }
}

/// Decimal sent as either a number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WireNumber(pub f64);

impl<'de> Deserialize<'de> for WireNumber {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct Vis;
        impl<'de> Visitor<'de> for Vis {
            type Value = WireNumber;
            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("number or numeric string")
            }
            fn visit_i64<E: de::Error>(self, v: i64) -> Result<WireNumber, E> {
                Ok(WireNumber(v as f64))
            }
            fn visit_u64<E: de::Error>(self, v: u64) -> Result<WireNumber, E> {
                Ok(WireNumber(v as f64))
            }
            fn visit_f64<E: de::Error>(self, v: f64) -> Result<WireNumber, E> {
                Ok(WireNumber(v))
            }
            fn visit_str<E: de::Error>(self, v: &str) -> Result<WireNumber, E> {
                v.trim().parse().map(WireNumber).map_err(E::custom)
            }
        }
        d.deserialize_any(Vis)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireStudent {
    id: WireId,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl From<WireStudent> for Student {
    fn from(w: WireStudent) -> Self {
        let name = w
            .full_name
            .or(w.name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| w.id.0.clone());
        Student {
            id: w.id.0,
            name,
            email: w.email,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireGrade {
    #[serde(default)]
    id: Option<WireId>,
    student_id: WireId,
    #[serde(default)]
    value: Option<WireNumber>,
    #[serde(default)]
    max_value: Option<WireNumber>,
    #[serde(default)]
    notes: Option<String>,
}

impl From<WireGrade> for GradeRecord {
    fn from(w: WireGrade) -> Self {
        GradeRecord {
            id: w.id.map(|id| id.0),
            student_id: w.student_id.0,
            value: w.value.map(|v| v.0),
            max_value: w.max_value.map(|v| v.0),
            notes: w.notes,
        }
    }
}

/// A named reference record (class, report period).
#[derive(Debug, Deserialize)]
pub(crate) struct WireNamed {
    id: WireId,
    #[serde(default)]
    name: Option<String>,
}

impl WireNamed {
    fn into_parts(self) -> (String, String) {
        let name = self.name.unwrap_or_else(|| self.id.0.clone());
        (self.id.0, name)
    }
}

impl From<WireNamed> for SchoolClass {
    fn from(w: WireNamed) -> Self {
        let (id, name) = w.into_parts();
        SchoolClass { id, name }
    }
}

impl From<WireNamed> for ReportPeriod {
    fn from(w: WireNamed) -> Self {
        let (id, name) = w.into_parts();
        ReportPeriod { id, name }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireExam {
    id: WireId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    subject_id: Option<WireId>,
    #[serde(default)]
    total_marks: Option<WireNumber>,
    #[serde(default)]
    class_id: Option<WireId>,
    #[serde(default)]
    report_period_id: Option<WireId>,
}

impl From<WireExam> for Exam {
    fn from(w: WireExam) -> Self {
        let name = w.name.or(w.title).unwrap_or_else(|| w.id.0.clone());
        Exam {
            id: w.id.0,
            name,
            subject_id: w.subject_id.map(|s| s.0),
            total_marks: w.total_marks.map(|m| m.0),
            class_id: w.class_id.map(|c| c.0),
            report_period_id: w.report_period_id.map(|p| p.0),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCreated {
    pub id: WireId,
}

#[derive(Debug, Serialize)]
pub(crate) struct BulkRequest<'a> {
    pub grades: &'a [GradeUpsert],
}

/// Quiz as submitted to the store: every question carries an `options`
/// array and the derived total is included for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QuizPayload<'a> {
    title: &'a str,
    description: &'a str,
    class_id: Option<&'a str>,
    subject_id: Option<&'a str>,
    #[serde(flatten)]
    settings: &'a QuizSettings,
    total_points: u32,
    questions: Vec<QuestionPayload<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload<'a> {
    id: &'a str,
    kind: QuestionKind,
    prompt: &'a str,
    points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<&'a str>,
    options: &'a [AnswerOption],
    #[serde(skip_serializing_if = "Option::is_none")]
    correct_answer_text: Option<&'a str>,
}

impl<'a> From<&'a Question> for QuestionPayload<'a> {
    fn from(q: &'a Question) -> Self {
        QuestionPayload {
            id: q.id(),
            kind: q.kind(),
            prompt: q.prompt(),
            points: q.points(),
            explanation: q.explanation(),
            options: q.options(),
            correct_answer_text: q.correct_answer(),
        }
    }
}

impl<'a> From<&'a Quiz> for QuizPayload<'a> {
    fn from(quiz: &'a Quiz) -> Self {
        QuizPayload {
            title: &quiz.title,
            description: &quiz.description,
            class_id: quiz.class_ref.as_deref(),
            subject_id: quiz.subject_ref.as_deref(),
            settings: &quiz.settings,
            total_points: quiz.total_points(),
            questions: quiz.questions.iter().map(QuestionPayload::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_accept_strings_and_numbers() {
        let grades: Vec<WireGrade> = serde_json::from_value(json!([
            { "id": 7, "studentId": "s1", "value": 12 },
            { "id": "g-8", "studentId": 42, "value": "13.5", "maxValue": "20", "notes": null }
        ]))
        .unwrap();
        let records: Vec<GradeRecord> = grades.into_iter().map(Into::into).collect();
        assert_eq!(records[0].id.as_deref(), Some("7"));
        assert_eq!(records[0].value, Some(12.0));
        assert_eq!(records[1].student_id, "42");
        assert_eq!(records[1].value, Some(13.5));
        assert_eq!(records[1].max_value, Some(20.0));
        assert_eq!(records[1].notes, None);
    }

    #[test]
    fn envelope_is_optional() {
        let wrapped: Envelope<Vec<WireNamed>> =
            serde_json::from_value(json!({ "data": [{ "id": 1, "name": "7B" }] })).unwrap();
        let bare: Envelope<Vec<WireNamed>> =
            serde_json::from_value(json!([{ "id": 1, "name": "7B" }])).unwrap();
        let a: Vec<SchoolClass> = wrapped.into_inner().into_iter().map(Into::into).collect();
        let b: Vec<SchoolClass> = bare.into_inner().into_iter().map(Into::into).collect();
        assert_eq!(a, b);
        assert_eq!(a[0].id, "1");
    }

    #[test]
    fn student_name_prefers_full_name() {
        let s: Student = serde_json::from_value::<WireStudent>(
            json!({ "id": "u1", "fullName": "Ada Lovelace", "name": "ada" }),
        )
        .unwrap()
        .into();
        assert_eq!(s.name, "Ada Lovelace");

        let s: Student = serde_json::from_value::<WireStudent>(json!({ "id": 5, "name": "Bo" }))
            .unwrap()
            .into();
        assert_eq!((s.id.as_str(), s.name.as_str()), ("5", "Bo"));
    }

    #[test]
    fn bulk_response_shapes() {
        let echoed: BulkResponse =
            serde_json::from_value(json!({ "data": [{ "id": 1, "studentId": "s1" }] })).unwrap();
        assert_eq!(echoed.into_records().len(), 1);

        let keyed: BulkResponse =
            serde_json::from_value(json!({ "grades": [{ "id": 1, "studentId": "s1" }] })).unwrap();
        assert_eq!(keyed.into_records()[0].id.as_deref(), Some("1"));

        let silent: BulkResponse = serde_json::from_value(json!({ "success": true })).unwrap();
        assert!(silent.into_records().is_empty());
    }

    #[test]
    fn quiz_payload_always_has_options_and_total() {
        let mut quiz = Quiz::new("Mixed");
        quiz.class_ref = Some("c1".into());
        let mut essay = Question::new(QuestionKind::Essay);
        essay.set_points("4");
        quiz.questions.push(essay);
        quiz.questions.push(Question::new(QuestionKind::Boolean));

        let json = serde_json::to_value(QuizPayload::from(&quiz)).unwrap();
        assert_eq!(json["totalPoints"], 5);
        assert_eq!(json["classId"], "c1");
        assert_eq!(json["durationMinutes"], 30);
        assert_eq!(json["questions"][0]["kind"], "essay");
        assert_eq!(json["questions"][0]["options"], json!([]));
        assert_eq!(json["questions"][1]["options"][0]["text"], "True");
        assert_eq!(json["questions"][1]["options"][0]["isCorrect"], false);
    }
}
