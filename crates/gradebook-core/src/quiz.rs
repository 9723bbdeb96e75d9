//! Quiz aggregate and its settings.

use serde::{Deserialize, Serialize};

use crate::question::Question;

/// Duration used when a quiz has none or an invalid one.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Pass threshold used when a quiz has none or an invalid one.
pub const DEFAULT_PASS_THRESHOLD: u8 = 50;

/// Quiz-level settings shown on the authoring form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSettings {
    #[serde(default = "default_duration")]
    pub duration_minutes: u32,
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold_percent: u8,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default = "default_true")]
    pub show_results_immediately: bool,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

fn default_pass_threshold() -> u8 {
    DEFAULT_PASS_THRESHOLD
}

fn default_true() -> bool {
    true
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            duration_minutes: DEFAULT_DURATION_MINUTES,
            pass_threshold_percent: DEFAULT_PASS_THRESHOLD,
            shuffle_questions: false,
            show_results_immediately: true,
        }
    }
}

impl QuizSettings {
    /// Set the duration from raw input; anything below one minute or
    /// unparseable falls back to the default.
    pub fn set_duration(&mut self, raw: &str) {
        self.duration_minutes = match raw.trim().parse::<i64>() {
            Ok(n) if n >= 1 => u32::try_from(n).unwrap_or(u32::MAX),
            _ => DEFAULT_DURATION_MINUTES,
        };
    }

    /// Set the pass threshold from raw input, clamped to 0..=100.
    pub fn set_pass_threshold(&mut self, raw: &str) {
        self.pass_threshold_percent = match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => n.clamp(0.0, 100.0).round() as u8,
            _ => DEFAULT_PASS_THRESHOLD,
        };
    }
}

/// An ordered set of questions plus authoring settings.
///
/// The total score is always derived from the question list; there is no
/// stored total to drift out of sync.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    /// Store-assigned identifier, `None` until first persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub class_ref: Option<String>,
    #[serde(default)]
    pub subject_ref: Option<String>,
    #[serde(flatten)]
    pub settings: QuizSettings,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Sum of all question points.
    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |acc, q| acc.saturating_add(q.points()))
    }

    /// Points needed to pass, rounded up.
    pub fn passing_points(&self) -> u32 {
        let total = u64::from(self.total_points());
        let threshold = u64::from(self.settings.pass_threshold_percent);
        ((total * threshold).div_ceil(100)) as u32
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.questions.iter().position(|q| q.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::QuestionKind;

    #[test]
    fn settings_normalize_input() {
        let mut settings = QuizSettings::default();
        settings.set_duration("45");
        assert_eq!(settings.duration_minutes, 45);
        settings.set_duration("0");
        assert_eq!(settings.duration_minutes, DEFAULT_DURATION_MINUTES);
        settings.set_duration("soon");
        assert_eq!(settings.duration_minutes, DEFAULT_DURATION_MINUTES);

        settings.set_pass_threshold("75");
        assert_eq!(settings.pass_threshold_percent, 75);
        settings.set_pass_threshold("150");
        assert_eq!(settings.pass_threshold_percent, 100);
        settings.set_pass_threshold("-3");
        assert_eq!(settings.pass_threshold_percent, 0);
        settings.set_pass_threshold("");
        assert_eq!(settings.pass_threshold_percent, DEFAULT_PASS_THRESHOLD);
    }

    #[test]
    fn total_and_passing_points() {
        let mut quiz = Quiz::new("Fractions");
        assert_eq!(quiz.total_points(), 0);

        for points in ["2", "3", "2"] {
            let mut q = Question::new(QuestionKind::Essay);
            q.set_points(points);
            quiz.questions.push(q);
        }
        assert_eq!(quiz.total_points(), 7);

        quiz.settings.pass_threshold_percent = 50;
        assert_eq!(quiz.passing_points(), 4);
    }

    #[test]
    fn settings_flatten_in_json() {
        let quiz = Quiz::new("Algebra");
        let json = serde_json::to_value(&quiz).unwrap();
        assert_eq!(json["durationMinutes"], 30);
        assert_eq!(json["showResultsImmediately"], true);
        assert!(json.get("id").is_none());
        assert!(json.get("totalPoints").is_none());
    }
}
