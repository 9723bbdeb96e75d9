//! REST backend implementing every collaborator trait.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use gradebook_core::error::CollaboratorError;
use gradebook_core::grading::{Exam, GradeRecord, GradeUpsert, ReportPeriod, SchoolClass, Student};
use gradebook_core::quiz::Quiz;
use gradebook_core::traits::{GradeRecordProvider, QuizStore, ReferenceProvider, RosterProvider};

use crate::wire::{
    BulkRequest, BulkResponse, Envelope, QuizPayload, WireCreated, WireExam, WireGrade, WireNamed,
    WireStudent,
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Talks to the school-management REST API.
///
/// Every call is a single request with a fixed timeout; failures are
/// classified into [`CollaboratorError`] and never retried here.
pub struct HttpBackend {
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            timeout_secs,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, CollaboratorError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| CollaboratorError::Network(format!("invalid URL {path}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the raw body of a successful response.
    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<String, CollaboratorError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::Timeout(self.timeout_secs)
            } else {
                CollaboratorError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorError::Timeout(self.timeout_secs)
            } else {
                CollaboratorError::Network(e.to_string())
            }
        })?;
        debug!(status = status.as_u16(), bytes = body.len(), "{what}");

        let code = status.as_u16();
        if code == 401 || code == 403 {
            return Err(CollaboratorError::Unauthorized(error_message(&body, status)));
        }
        if code == 404 {
            return Err(CollaboratorError::NotFound(what.to_string()));
        }
        if code >= 400 {
            return Err(CollaboratorError::Rejected {
                status: code,
                message: error_message(&body, status),
            });
        }
        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, CollaboratorError> {
        let body = self.send(builder, what).await?;
        serde_json::from_str::<Envelope<T>>(&body)
            .map(Envelope::into_inner)
            .map_err(|e| CollaboratorError::InvalidResponse(format!("{what}: {e}")))
    }
}

/// Message for an error response: a JSON `message` or `error` field, the raw
/// body, or the status reason, in that order.
fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl RosterProvider for HttpBackend {
    #[instrument(skip(self))]
    async fn list_students(&self, class_id: &str) -> anyhow::Result<Vec<Student>> {
        let url = self.url("/users", &[("role", "student"), ("classId", class_id)])?;
        let students: Vec<WireStudent> = self
            .fetch(self.request(Method::GET, url), "list students")
            .await?;
        Ok(students.into_iter().map(Student::from).collect())
    }
}

#[async_trait]
impl GradeRecordProvider for HttpBackend {
    #[instrument(skip(self))]
    async fn list_grades(&self, exam_id: &str, class_id: &str) -> anyhow::Result<Vec<GradeRecord>> {
        let url = self.url("/grades", &[("examId", exam_id), ("classId", class_id)])?;
        let grades: Vec<WireGrade> = self
            .fetch(self.request(Method::GET, url), "list grades")
            .await?;
        Ok(grades.into_iter().map(GradeRecord::from).collect())
    }

    #[instrument(skip(self, grades), fields(count = grades.len()))]
    async fn bulk_upsert(&self, grades: &[GradeUpsert]) -> anyhow::Result<Vec<GradeRecord>> {
        let url = self.url("/grades/bulk", &[])?;
        let body = self
            .send(
                self.request(Method::POST, url).json(&BulkRequest { grades }),
                "bulk upsert grades",
            )
            .await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let response: BulkResponse = serde_json::from_str(&body)
            .map_err(|e| CollaboratorError::InvalidResponse(format!("bulk upsert grades: {e}")))?;
        Ok(response.into_records())
    }
}

#[async_trait]
impl ReferenceProvider for HttpBackend {
    #[instrument(skip(self))]
    async fn list_classes(&self) -> anyhow::Result<Vec<SchoolClass>> {
        let url = self.url("/classes", &[])?;
        let classes: Vec<WireNamed> = self
            .fetch(self.request(Method::GET, url), "list classes")
            .await?;
        Ok(classes.into_iter().map(SchoolClass::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_report_periods(&self) -> anyhow::Result<Vec<ReportPeriod>> {
        let url = self.url("/report-periods", &[])?;
        let periods: Vec<WireNamed> = self
            .fetch(self.request(Method::GET, url), "list report periods")
            .await?;
        Ok(periods.into_iter().map(ReportPeriod::from).collect())
    }

    #[instrument(skip(self))]
    async fn list_exams(
        &self,
        class_id: &str,
        report_period_id: Option<&str>,
    ) -> anyhow::Result<Vec<Exam>> {
        let mut query = vec![("classId", class_id)];
        if let Some(period) = report_period_id {
            query.push(("reportPeriodId", period));
        }
        let url = self.url("/exams", &query)?;
        let exams: Vec<WireExam> = self
            .fetch(self.request(Method::GET, url), "list exams")
            .await?;
        Ok(exams.into_iter().map(Exam::from).collect())
    }
}

#[async_trait]
impl QuizStore for HttpBackend {
    #[instrument(skip(self, quiz), fields(questions = quiz.questions.len()))]
    async fn create_quiz(&self, quiz: &Quiz) -> anyhow::Result<String> {
        let url = self.url("/quizzes", &[])?;
        let created: WireCreated = self
            .fetch(
                self.request(Method::POST, url).json(&QuizPayload::from(quiz)),
                "create quiz",
            )
            .await?;
        Ok(created.id.0)
    }

    #[instrument(skip(self, quiz), fields(questions = quiz.questions.len()))]
    async fn update_quiz(&self, id: &str, quiz: &Quiz) -> anyhow::Result<String> {
        let mut url = self.url("/quizzes", &[])?;
        url.path_segments_mut()
            .map_err(|()| CollaboratorError::Network(format!("invalid URL {}", self.base_url)))?
            .push(id);
        let body = self
            .send(
                self.request(Method::PUT, url).json(&QuizPayload::from(quiz)),
                "update quiz",
            )
            .await?;
        // Some backends answer an update with an empty body.
        match serde_json::from_str::<Envelope<WireCreated>>(&body) {
            Ok(created) => Ok(created.into_inner().id.0),
            Err(_) => Ok(id.to_string()),
        }
    }
}
