//! TOML file formats.
//!
//! Quiz definitions are built through the same question operations an
//! interactive editor uses, so a file is normalized exactly like typed input.
//! Grade-edit files list raw values to stage on a loaded sheet.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::assembly::QuizAssembly;
use crate::grading::format_value;
use crate::question::{Question, QuestionKind};
use crate::quiz::Quiz;

/// Quiz file written by `gradebook init`.
pub const EXAMPLE_QUIZ_TOML: &str = r#"[quiz]
title = "Fractions warm-up"
description = "Five minutes at the start of class"
class = "class-7b"
subject = "math"
duration_minutes = 10
pass_threshold = 60

[[questions]]
kind = "single-choice"
prompt = "Which fraction equals 0.5?"
points = 2
explanation = "One half is five tenths."

[[questions.options]]
text = "1/2"
correct = true

[[questions.options]]
text = "1/3"

[[questions.options]]
text = "2/3"

[[questions]]
kind = "multi-choice"
prompt = "Which of these are greater than 1/4?"
points = 2

[[questions.options]]
text = "1/2"
correct = true

[[questions.options]]
text = "1/8"

[[questions.options]]
text = "3/4"
correct = true

[[questions]]
kind = "boolean"
prompt = "2/4 and 1/2 are equivalent."
answer = true

[[questions]]
kind = "short-answer"
prompt = "Write 3/4 as a decimal."
correct_answer = "0.75"

[[questions]]
kind = "essay"
prompt = "Explain how you compare two fractions."
points = 5
"#;

#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    duration_minutes: Option<toml::Value>,
    #[serde(default)]
    pass_threshold: Option<toml::Value>,
    #[serde(default)]
    shuffle_questions: Option<bool>,
    #[serde(default)]
    show_results_immediately: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    kind: String,
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    points: Option<toml::Value>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    options: Vec<TomlOption>,
    #[serde(default)]
    answer: Option<bool>,
    #[serde(default)]
    correct_answer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    text: String,
    #[serde(default)]
    correct: bool,
}

/// Parse a quiz definition file.
pub fn parse_quiz(path: &Path) -> Result<Quiz> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse a quiz definition from a string.
///
/// Only structural problems fail here (unknown kinds, option lists that do
/// not fit the kind). Incomplete quizzes parse fine and are reported by
/// validation.
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<Quiz> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let header = parsed.quiz;
    let mut assembly = QuizAssembly::new();
    assembly.set_title(header.title);
    assembly.set_description(header.description);
    assembly.set_class(header.class.filter(|c| !c.trim().is_empty()));
    assembly.set_subject(header.subject.filter(|s| !s.trim().is_empty()));

    let settings = assembly.settings_mut();
    if let Some(raw) = &header.duration_minutes {
        settings.set_duration(&raw_text(raw));
    }
    if let Some(raw) = &header.pass_threshold {
        settings.set_pass_threshold(&raw_text(raw));
    }
    if let Some(shuffle) = header.shuffle_questions {
        settings.shuffle_questions = shuffle;
    }
    if let Some(show) = header.show_results_immediately {
        settings.show_results_immediately = show;
    }

    for (index, q) in parsed.questions.into_iter().enumerate() {
        let kind: QuestionKind = q
            .kind
            .parse()
            .map_err(|e: String| anyhow::anyhow!("question {}: {e}", index + 1))?;
        let question = assembly.add_question(kind);
        fill_question(question, q).with_context(|| format!("question {}", index + 1))?;
    }

    let mut quiz = assembly.into_quiz();
    quiz.id = header.id.filter(|id| !id.trim().is_empty());
    Ok(quiz)
}

fn fill_question(question: &mut Question, q: TomlQuestion) -> Result<()> {
    question.set_prompt(q.prompt);
    if let Some(points) = &q.points {
        question.set_points(&raw_text(points));
    }
    if let Some(explanation) = &q.explanation {
        question.set_explanation(explanation);
    }

    match question.kind() {
        QuestionKind::SingleChoice | QuestionKind::MultiChoice => {
            if q.options.len() < 2 {
                bail!("choice questions need at least two options");
            }
            if question.kind() == QuestionKind::SingleChoice
                && q.options.iter().filter(|o| o.correct).count() > 1
            {
                bail!("single-choice questions allow only one correct option");
            }
            while question.options().len() < q.options.len() {
                question.add_option();
            }
            while question.options().len() > q.options.len() {
                let last = question.options()[question.options().len() - 1].id.clone();
                question.remove_option(&last);
            }

            let ids: Vec<String> = question.options().iter().map(|o| o.id.clone()).collect();
            for (id, option) in ids.iter().zip(&q.options) {
                question.update_option(id, option.text.as_str());
                if option.correct {
                    question.set_correctness(id);
                }
            }
        }
        QuestionKind::Boolean => {
            if !q.options.is_empty() {
                bail!("boolean questions have fixed options; use `answer = true|false`");
            }
            if let Some(answer) = q.answer {
                let index = if answer { 0 } else { 1 };
                let id = question.options()[index].id.clone();
                question.set_correctness(&id);
            }
        }
        QuestionKind::ShortAnswer | QuestionKind::Essay => {
            if !q.options.is_empty() {
                bail!("{} questions take no options", question.kind());
            }
            if let Some(answer) = &q.correct_answer {
                question.set_correct_answer(answer);
            }
        }
    }

    Ok(())
}

/// One staged change from a grade-edit file.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeEdit {
    pub student_id: String,
    /// Raw value to stage; `None` leaves the value untouched.
    pub value: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlGradeFile {
    #[serde(default)]
    grades: Vec<TomlGradeEdit>,
}

#[derive(Debug, Deserialize)]
struct TomlGradeEdit {
    student: String,
    #[serde(default)]
    value: Option<toml::Value>,
    #[serde(default)]
    notes: Option<String>,
}

/// Parse a grade-edit file.
pub fn parse_grade_edits(path: &Path) -> Result<Vec<GradeEdit>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read grade edits: {}", path.display()))?;

    parse_grade_edits_str(&content, path)
}

/// Parse grade edits from a string. Values may be numbers or strings.
pub fn parse_grade_edits_str(content: &str, source_path: &Path) -> Result<Vec<GradeEdit>> {
    let parsed: TomlGradeFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    parsed
        .grades
        .into_iter()
        .map(|g| {
            if g.student.trim().is_empty() {
                bail!("grade edit without a student id");
            }
            Ok(GradeEdit {
                student_id: g.student,
                value: g.value.as_ref().map(raw_text),
                notes: g.notes,
            })
        })
        .collect()
}

/// Text of a scalar value as a user would have typed it.
fn raw_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => format_value(*f),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::assembly::validate_quiz;
    use crate::error::QuizIssue;

    fn parse(content: &str) -> Result<Quiz> {
        parse_quiz_str(content, &PathBuf::from("quiz.toml"))
    }

    #[test]
    fn example_quiz_is_valid() {
        let quiz = parse(EXAMPLE_QUIZ_TOML).unwrap();
        assert_eq!(quiz.title, "Fractions warm-up");
        assert_eq!(quiz.class_ref.as_deref(), Some("class-7b"));
        assert_eq!(quiz.settings.duration_minutes, 10);
        assert_eq!(quiz.settings.pass_threshold_percent, 60);
        assert_eq!(quiz.questions.len(), 5);
        assert_eq!(quiz.total_points(), 11);
        assert!(validate_quiz(&quiz).is_empty());

        let single = &quiz.questions[0];
        assert_eq!(single.options().len(), 3);
        assert_eq!(single.correct_count(), 1);
        assert_eq!(single.options()[0].text, "1/2");

        let multi = &quiz.questions[1];
        let correct: Vec<bool> = multi.options().iter().map(|o| o.is_correct).collect();
        assert_eq!(correct, vec![true, false, true]);

        let boolean = &quiz.questions[2];
        assert!(boolean.options()[0].is_correct);
        assert_eq!(quiz.questions[3].correct_answer(), Some("0.75"));
    }

    #[test]
    fn points_and_settings_are_normalized() {
        let quiz = parse(
            r#"
[quiz]
title = "Odd input"
duration_minutes = "0"
pass_threshold = 140

[[questions]]
kind = "essay"
prompt = "Anything"
points = -4

[[questions]]
kind = "essay"
prompt = "More"
points = "2.9"
"#,
        )
        .unwrap();
        assert_eq!(quiz.settings.duration_minutes, 30);
        assert_eq!(quiz.settings.pass_threshold_percent, 100);
        assert_eq!(quiz.questions[0].points(), 1);
        assert_eq!(quiz.questions[1].points(), 2);
    }

    #[test]
    fn incomplete_quiz_parses_and_fails_validation() {
        let quiz = parse(
            r#"
[quiz]
title = ""

[[questions]]
kind = "boolean"
prompt = "Water boils at 100C at sea level"
"#,
        )
        .unwrap();
        let issues = validate_quiz(&quiz);
        assert_eq!(issues[0], QuizIssue::MissingTitle);
        assert_eq!(issues[1], QuizIssue::MissingClass);
        assert!(matches!(
            issues[2],
            QuizIssue::ExclusiveAnswer { correct: 0, .. }
        ));
    }

    #[test]
    fn structural_errors_are_reported() {
        let unknown = parse("[quiz]\ntitle = \"x\"\n[[questions]]\nkind = \"matching\"\n");
        assert!(format!("{:#}", unknown.unwrap_err()).contains("unknown question kind"));

        let one_option = parse(
            "[quiz]\n[[questions]]\nkind = \"single\"\n[[questions.options]]\ntext = \"a\"\n",
        );
        assert!(format!("{:#}", one_option.unwrap_err()).contains("at least two options"));

        let two_correct = parse(
            r#"
[quiz]
[[questions]]
kind = "single-choice"
[[questions.options]]
text = "a"
correct = true
[[questions.options]]
text = "b"
correct = true
"#,
        );
        assert!(format!("{:#}", two_correct.unwrap_err()).contains("only one correct"));

        assert!(parse("this is not [valid toml }{").is_err());
    }

    #[test]
    fn quiz_id_is_kept_for_updates() {
        let quiz = parse("[quiz]\nid = \"quiz-9\"\ntitle = \"t\"\n").unwrap();
        assert_eq!(quiz.id.as_deref(), Some("quiz-9"));
    }

    #[test]
    fn grade_edits_accept_numbers_and_strings() {
        let edits = parse_grade_edits_str(
            r#"
[[grades]]
student = "s1"
value = 15

[[grades]]
student = "s2"
value = "12.5"
notes = "late"

[[grades]]
student = "s3"
value = 18.0

[[grades]]
student = "s4"
notes = "absent"
"#,
            &PathBuf::from("edits.toml"),
        )
        .unwrap();

        assert_eq!(edits.len(), 4);
        assert_eq!(edits[0].value.as_deref(), Some("15"));
        assert_eq!(edits[1].value.as_deref(), Some("12.5"));
        assert_eq!(edits[1].notes.as_deref(), Some("late"));
        assert_eq!(edits[2].value.as_deref(), Some("18"));
        assert_eq!(edits[3].value, None);
    }

    #[test]
    fn grade_edit_without_student_fails() {
        let result = parse_grade_edits_str(
            "[[grades]]\nstudent = \" \"\nvalue = 1\n",
            &PathBuf::from("edits.toml"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let quiz_path = dir.path().join("quiz.toml");
        std::fs::write(&quiz_path, EXAMPLE_QUIZ_TOML).unwrap();
        assert_eq!(parse_quiz(&quiz_path).unwrap().questions.len(), 5);

        let missing = parse_quiz(&dir.path().join("nope.toml"));
        assert!(format!("{:#}", missing.unwrap_err()).contains("failed to read quiz file"));
    }
}
