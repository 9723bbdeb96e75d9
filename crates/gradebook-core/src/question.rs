//! Question model and per-kind correctness rules.
//!
//! A question is a tagged union: the common fields live on [`Question`] and
//! everything that depends on the kind lives in [`QuestionBody`]. All
//! operations normalize their input instead of failing, so an authoring UI
//! can forward raw keystrokes without pre-checking them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Number of blank options a new choice question starts with.
pub const DEFAULT_CHOICE_OPTIONS: usize = 4;

/// Choice questions never drop below this many options.
pub const MIN_CHOICE_OPTIONS: usize = 2;

const TRUE_LABEL: &str = "True";
const FALSE_LABEL: &str = "False";

/// The kind of a question, which decides its option shape and correctness rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    SingleChoice,
    MultiChoice,
    Boolean,
    ShortAnswer,
    Essay,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 5] = [
        QuestionKind::SingleChoice,
        QuestionKind::MultiChoice,
        QuestionKind::Boolean,
        QuestionKind::ShortAnswer,
        QuestionKind::Essay,
    ];

    /// Kinds where exactly one option may be correct.
    pub fn is_exclusive(self) -> bool {
        matches!(self, QuestionKind::SingleChoice | QuestionKind::Boolean)
    }

    /// Kinds without options.
    pub fn is_text(self) -> bool {
        matches!(self, QuestionKind::ShortAnswer | QuestionKind::Essay)
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::SingleChoice => write!(f, "single-choice"),
            QuestionKind::MultiChoice => write!(f, "multi-choice"),
            QuestionKind::Boolean => write!(f, "boolean"),
            QuestionKind::ShortAnswer => write!(f, "short-answer"),
            QuestionKind::Essay => write!(f, "essay"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "single-choice" | "single" => Ok(QuestionKind::SingleChoice),
            "multi-choice" | "multiple-choice" | "multi" => Ok(QuestionKind::MultiChoice),
            "boolean" | "bool" | "true-false" => Ok(QuestionKind::Boolean),
            "short-answer" | "short" => Ok(QuestionKind::ShortAnswer),
            "essay" => Ok(QuestionKind::Essay),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// One selectable answer of a choice or boolean question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl AnswerOption {
    fn blank() -> Self {
        Self::with_text("")
    }

    fn with_text(text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            is_correct: false,
        }
    }
}

/// Kind-specific part of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum QuestionBody {
    SingleChoice {
        options: Vec<AnswerOption>,
    },
    MultiChoice {
        options: Vec<AnswerOption>,
    },
    Boolean {
        options: [AnswerOption; 2],
    },
    ShortAnswer {
        #[serde(
            rename = "correctAnswerText",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        correct_answer: Option<String>,
    },
    Essay,
}

impl QuestionBody {
    /// Kind-appropriate skeleton for a new question.
    pub fn skeleton(kind: QuestionKind) -> Self {
        match kind {
            QuestionKind::SingleChoice => QuestionBody::SingleChoice {
                options: blank_options(DEFAULT_CHOICE_OPTIONS),
            },
            QuestionKind::MultiChoice => QuestionBody::MultiChoice {
                options: blank_options(DEFAULT_CHOICE_OPTIONS),
            },
            QuestionKind::Boolean => QuestionBody::Boolean {
                options: [
                    AnswerOption::with_text(TRUE_LABEL),
                    AnswerOption::with_text(FALSE_LABEL),
                ],
            },
            QuestionKind::ShortAnswer => QuestionBody::ShortAnswer {
                correct_answer: None,
            },
            QuestionKind::Essay => QuestionBody::Essay,
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionBody::SingleChoice { .. } => QuestionKind::SingleChoice,
            QuestionBody::MultiChoice { .. } => QuestionKind::MultiChoice,
            QuestionBody::Boolean { .. } => QuestionKind::Boolean,
            QuestionBody::ShortAnswer { .. } => QuestionKind::ShortAnswer,
            QuestionBody::Essay => QuestionKind::Essay,
        }
    }

    pub fn options(&self) -> &[AnswerOption] {
        match self {
            QuestionBody::SingleChoice { options } | QuestionBody::MultiChoice { options } => {
                options.as_slice()
            }
            QuestionBody::Boolean { options } => &options[..],
            QuestionBody::ShortAnswer { .. } | QuestionBody::Essay => &[],
        }
    }

    fn options_mut(&mut self) -> &mut [AnswerOption] {
        match self {
            QuestionBody::SingleChoice { options } | QuestionBody::MultiChoice { options } => {
                options.as_mut_slice()
            }
            QuestionBody::Boolean { options } => &mut options[..],
            QuestionBody::ShortAnswer { .. } | QuestionBody::Essay => &mut [],
        }
    }
}

fn blank_options(count: usize) -> Vec<AnswerOption> {
    (0..count).map(|_| AnswerOption::blank()).collect()
}

/// A single question inside a quiz.
///
/// Deserialized questions go through the same rules the operations keep:
/// boolean labels are fixed, exclusive kinds carry at most one correct
/// option and choice kinds keep at least [`MIN_CHOICE_OPTIONS`] options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawQuestion")]
pub struct Question {
    id: String,
    prompt: String,
    points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
    #[serde(flatten)]
    body: QuestionBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    id: String,
    #[serde(default)]
    prompt: String,
    #[serde(default = "default_points", deserialize_with = "deserialize_points")]
    points: u32,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(flatten)]
    body: QuestionBody,
}

impl TryFrom<RawQuestion> for Question {
    type Error = String;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        let RawQuestion {
            id,
            prompt,
            points,
            explanation,
            mut body,
        } = raw;
        let id = if id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            id
        };
        let kind = body.kind();

        if let QuestionBody::Boolean { options } = &mut body {
            options[0].text = TRUE_LABEL.to_string();
            options[1].text = FALSE_LABEL.to_string();
        }
        if let QuestionBody::SingleChoice { options } | QuestionBody::MultiChoice { options } =
            &body
        {
            if options.len() < MIN_CHOICE_OPTIONS {
                return Err(format!(
                    "{kind} question {id} needs at least {MIN_CHOICE_OPTIONS} options"
                ));
            }
        }
        let correct = body.options().iter().filter(|o| o.is_correct).count();
        if kind.is_exclusive() && correct > 1 {
            return Err(format!(
                "{kind} question {id} has {correct} correct options, expected at most one"
            ));
        }

        Ok(Self {
            id,
            prompt,
            points: points.max(1),
            explanation: explanation.filter(|e| !e.trim().is_empty()),
            body,
        })
    }
}

fn default_points() -> u32 {
    1
}

/// Accept points as a number or a numeric string and coerce them like user input.
fn deserialize_points<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    struct Vis;
    impl<'de> serde::de::Visitor<'de> for Vis {
        type Value = u32;
        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("number or numeric string")
        }
        fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<u32, E> {
            Ok(coerce_points(&v.to_string()))
        }
        fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<u32, E> {
            Ok(coerce_points(&v.to_string()))
        }
        fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<u32, E> {
            Ok(coerce_points(&v.to_string()))
        }
        fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<u32, E> {
            Ok(coerce_points(v))
        }
    }
    d.deserialize_any(Vis)
}

/// Coerce raw points input to an integer of at least 1.
///
/// Integers are taken as-is, finite decimals are truncated toward zero,
/// and anything else (including results below 1) becomes 1.
pub fn coerce_points(raw: &str) -> u32 {
    let raw = raw.trim();
    let parsed = match raw.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.trunc() as i64),
    };

    match parsed {
        Some(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
        _ => 1,
    }
}

impl Question {
    /// Create a question of `kind` with its option skeleton and 1 point.
    pub fn new(kind: QuestionKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            prompt: String::new(),
            points: 1,
            explanation: None,
            body: QuestionBody::skeleton(kind),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> QuestionKind {
        self.body.kind()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    pub fn body(&self) -> &QuestionBody {
        &self.body
    }

    /// Options in display order; empty for text kinds.
    pub fn options(&self) -> &[AnswerOption] {
        self.body.options()
    }

    /// Expected answer of a short-answer question.
    pub fn correct_answer(&self) -> Option<&str> {
        match &self.body {
            QuestionBody::ShortAnswer { correct_answer } => correct_answer.as_deref(),
            _ => None,
        }
    }

    /// Number of options currently marked correct.
    pub fn correct_count(&self) -> usize {
        self.options().iter().filter(|o| o.is_correct).count()
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Set the explanation; blank text clears it.
    pub fn set_explanation(&mut self, text: &str) {
        self.explanation = if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        };
    }

    /// Set points from raw input, see [`coerce_points`].
    pub fn set_points(&mut self, raw: &str) {
        self.points = coerce_points(raw);
    }

    /// Mark an option correct.
    ///
    /// Single-choice and boolean questions keep exactly one correct option;
    /// multi-choice questions toggle only the targeted option. Unknown ids and
    /// text kinds are ignored.
    pub fn set_correctness(&mut self, option_id: &str) {
        let exclusive = self.kind().is_exclusive();
        let options = self.body.options_mut();
        if !options.iter().any(|o| o.id == option_id) {
            return;
        }

        if exclusive {
            for option in options.iter_mut() {
                option.is_correct = option.id == option_id;
            }
        } else if let Some(option) = options.iter_mut().find(|o| o.id == option_id) {
            option.is_correct = !option.is_correct;
        }
    }

    /// Replace an option's text without touching its correctness.
    ///
    /// Boolean options keep their fixed labels.
    pub fn update_option(&mut self, option_id: &str, text: impl Into<String>) {
        if self.kind() == QuestionKind::Boolean {
            return;
        }
        if let Some(option) = self
            .body
            .options_mut()
            .iter_mut()
            .find(|o| o.id == option_id)
        {
            option.text = text.into();
        }
    }

    /// Set the expected answer of a short-answer question; blank clears it.
    pub fn set_correct_answer(&mut self, text: &str) {
        if let QuestionBody::ShortAnswer { correct_answer } = &mut self.body {
            *correct_answer = if text.trim().is_empty() {
                None
            } else {
                Some(text.to_string())
            };
        }
    }

    /// Append a blank option to a choice question, returning its id.
    pub fn add_option(&mut self) -> Option<String> {
        match &mut self.body {
            QuestionBody::SingleChoice { options } | QuestionBody::MultiChoice { options } => {
                let option = AnswerOption::blank();
                let id = option.id.clone();
                options.push(option);
                Some(id)
            }
            _ => None,
        }
    }

    /// Remove an option from a choice question.
    ///
    /// Returns `false` when the option is unknown, the kind has fixed options,
    /// or removal would leave fewer than [`MIN_CHOICE_OPTIONS`].
    pub fn remove_option(&mut self, option_id: &str) -> bool {
        match &mut self.body {
            QuestionBody::SingleChoice { options } | QuestionBody::MultiChoice { options } => {
                if options.len() <= MIN_CHOICE_OPTIONS {
                    return false;
                }
                let before = options.len();
                options.retain(|o| o.id != option_id);
                options.len() != before
            }
            _ => false,
        }
    }

    /// Switch to another kind, keeping id, prompt, points and explanation.
    ///
    /// Option texts carry over between single- and multi-choice. Going from
    /// multi to single keeps only the first correct option marked.
    pub fn change_kind(&mut self, kind: QuestionKind) {
        if self.kind() == kind {
            return;
        }

        let previous = std::mem::replace(&mut self.body, QuestionBody::Essay);
        self.body = match (previous, kind) {
            (QuestionBody::SingleChoice { options }, QuestionKind::MultiChoice) => {
                QuestionBody::MultiChoice { options }
            }
            (QuestionBody::MultiChoice { mut options }, QuestionKind::SingleChoice) => {
                let mut seen_correct = false;
                for option in &mut options {
                    if option.is_correct && seen_correct {
                        option.is_correct = false;
                    }
                    seen_correct |= option.is_correct;
                }
                QuestionBody::SingleChoice { options }
            }
            (_, kind) => QuestionBody::skeleton(kind),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_ids(q: &Question) -> Vec<String> {
        q.options().iter().map(|o| o.id.clone()).collect()
    }

    #[test]
    fn skeletons_per_kind() {
        let single = Question::new(QuestionKind::SingleChoice);
        assert_eq!(single.options().len(), 4);
        assert!(single.options().iter().all(|o| o.text.is_empty() && !o.is_correct));

        let multi = Question::new(QuestionKind::MultiChoice);
        assert_eq!(multi.options().len(), 4);

        let boolean = Question::new(QuestionKind::Boolean);
        let labels: Vec<_> = boolean.options().iter().map(|o| o.text.as_str()).collect();
        assert_eq!(labels, vec!["True", "False"]);

        for kind in [QuestionKind::ShortAnswer, QuestionKind::Essay] {
            let q = Question::new(kind);
            assert!(q.options().is_empty());
            assert_eq!(q.points(), 1);
        }
    }

    #[test]
    fn exclusive_kinds_keep_exactly_one_correct() {
        for kind in [QuestionKind::SingleChoice, QuestionKind::Boolean] {
            let mut q = Question::new(kind);
            let ids = option_ids(&q);
            let sequence = [0, 1, 1, 0, ids.len() - 1, 0];
            for idx in sequence {
                q.set_correctness(&ids[idx]);
                assert_eq!(q.correct_count(), 1, "{kind} after selecting {idx}");
                assert!(q.options()[idx].is_correct);
            }
        }
    }

    #[test]
    fn multi_choice_toggle_is_independent() {
        let mut q = Question::new(QuestionKind::MultiChoice);
        let ids = option_ids(&q);

        q.set_correctness(&ids[0]);
        q.set_correctness(&ids[2]);
        q.set_correctness(&ids[0]);

        let flags: Vec<bool> = q.options().iter().map(|o| o.is_correct).collect();
        assert_eq!(flags, vec![false, false, true, false]);
    }

    #[test]
    fn unknown_option_and_text_kinds_are_ignored() {
        let mut q = Question::new(QuestionKind::SingleChoice);
        let ids = option_ids(&q);
        q.set_correctness(&ids[1]);
        q.set_correctness("missing");
        assert!(q.options()[1].is_correct);
        assert_eq!(q.correct_count(), 1);

        let mut essay = Question::new(QuestionKind::Essay);
        essay.set_correctness("anything");
        essay.update_option("anything", "text");
        assert!(essay.options().is_empty());
    }

    #[test]
    fn update_option_keeps_correctness() {
        let mut q = Question::new(QuestionKind::SingleChoice);
        let ids = option_ids(&q);
        q.set_correctness(&ids[3]);
        q.update_option(&ids[3], "Paris");
        assert_eq!(q.options()[3].text, "Paris");
        assert!(q.options()[3].is_correct);
    }

    #[test]
    fn boolean_labels_are_immutable() {
        let mut q = Question::new(QuestionKind::Boolean);
        let ids = option_ids(&q);
        q.update_option(&ids[0], "Yes");
        assert_eq!(q.options()[0].text, "True");
        assert!(!q.remove_option(&ids[0]));
        assert_eq!(q.add_option(), None);
    }

    #[test]
    fn points_coercion() {
        assert_eq!(coerce_points("3"), 3);
        assert_eq!(coerce_points(" 12 "), 12);
        assert_eq!(coerce_points("2.9"), 2);
        assert_eq!(coerce_points("0"), 1);
        assert_eq!(coerce_points("-4"), 1);
        assert_eq!(coerce_points("abc"), 1);
        assert_eq!(coerce_points(""), 1);
        assert_eq!(coerce_points("NaN"), 1);
        assert_eq!(coerce_points("99999999999"), u32::MAX);

        let mut q = Question::new(QuestionKind::Essay);
        q.set_points("5");
        assert_eq!(q.points(), 5);
        q.set_points("oops");
        assert_eq!(q.points(), 1);
    }

    #[test]
    fn add_and_remove_options() {
        let mut q = Question::new(QuestionKind::MultiChoice);
        let added = q.add_option().unwrap();
        assert_eq!(q.options().len(), 5);
        assert!(q.remove_option(&added));
        assert!(!q.remove_option("missing"));

        let ids = option_ids(&q);
        assert!(q.remove_option(&ids[0]));
        assert!(q.remove_option(&ids[1]));
        assert_eq!(q.options().len(), MIN_CHOICE_OPTIONS);
        assert!(!q.remove_option(&ids[2]));
    }

    #[test]
    fn change_kind_carries_choice_options() {
        let mut q = Question::new(QuestionKind::MultiChoice);
        q.set_prompt("Pick primes");
        q.set_points("3");
        let ids = option_ids(&q);
        q.update_option(&ids[0], "2");
        q.set_correctness(&ids[1]);
        q.set_correctness(&ids[3]);

        q.change_kind(QuestionKind::SingleChoice);
        assert_eq!(q.kind(), QuestionKind::SingleChoice);
        assert_eq!(q.prompt(), "Pick primes");
        assert_eq!(q.points(), 3);
        assert_eq!(q.options()[0].text, "2");
        assert_eq!(q.correct_count(), 1);
        assert!(q.options()[1].is_correct);

        q.change_kind(QuestionKind::ShortAnswer);
        assert!(q.options().is_empty());
        q.set_correct_answer("seven");
        assert_eq!(q.correct_answer(), Some("seven"));

        q.change_kind(QuestionKind::Boolean);
        assert_eq!(q.options().len(), 2);
        assert_eq!(q.correct_answer(), None);
    }

    #[test]
    fn kind_parse_and_display() {
        for kind in QuestionKind::ALL {
            assert_eq!(kind.to_string().parse::<QuestionKind>().unwrap(), kind);
        }
        assert_eq!(
            "multiple_choice".parse::<QuestionKind>().unwrap(),
            QuestionKind::MultiChoice
        );
        assert_eq!(
            "true-false".parse::<QuestionKind>().unwrap(),
            QuestionKind::Boolean
        );
        assert!("matching".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn serde_uses_kind_tag() {
        let mut q = Question::new(QuestionKind::ShortAnswer);
        q.set_prompt("Capital of France?");
        q.set_correct_answer("Paris");

        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["kind"], "short-answer");
        assert_eq!(json["correctAnswerText"], "Paris");

        let parsed: Question = serde_json::from_value(serde_json::json!({
            "id": "q1",
            "kind": "boolean",
            "prompt": "Water is wet",
            "points": "0",
            "options": [
                {"id": "t", "text": "True", "isCorrect": true},
                {"id": "f", "text": "False"}
            ]
        }))
        .unwrap();
        assert_eq!(parsed.kind(), QuestionKind::Boolean);
        assert_eq!(parsed.points(), 1);
        assert_eq!(parsed.correct_count(), 1);
    }

    #[test]
    fn deserialize_keeps_kind_rules() {
        let relabeled: Question = serde_json::from_value(serde_json::json!({
            "id": "q1",
            "kind": "boolean",
            "options": [
                {"id": "t", "text": "Yes"},
                {"id": "f", "text": "No", "isCorrect": true}
            ]
        }))
        .unwrap();
        let texts: Vec<&str> = relabeled.options().iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["True", "False"]);
        assert!(relabeled.options()[1].is_correct);

        let two_correct = serde_json::from_value::<Question>(serde_json::json!({
            "id": "q2",
            "kind": "single-choice",
            "options": [
                {"id": "a", "text": "1", "isCorrect": true},
                {"id": "b", "text": "2", "isCorrect": true}
            ]
        }));
        let err = two_correct.unwrap_err().to_string();
        assert!(err.contains("2 correct options"), "{err}");

        let both_true = serde_json::from_value::<Question>(serde_json::json!({
            "id": "q3",
            "kind": "boolean",
            "options": [
                {"id": "t", "text": "True", "isCorrect": true},
                {"id": "f", "text": "False", "isCorrect": true}
            ]
        }));
        assert!(both_true.is_err());

        let single_option = serde_json::from_value::<Question>(serde_json::json!({
            "id": "q4",
            "kind": "multi-choice",
            "options": [{"id": "a", "text": "only"}]
        }));
        assert!(single_option.is_err());

        let multi: Question = serde_json::from_value(serde_json::json!({
            "kind": "multi-choice",
            "options": [
                {"id": "a", "text": "1", "isCorrect": true},
                {"id": "b", "text": "2", "isCorrect": true}
            ]
        }))
        .unwrap();
        assert_eq!(multi.correct_count(), 2);
        assert!(!multi.id().is_empty());
    }
}
