//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use gradebook_client::{create_backend, load_config_from, GradebookConfig, HttpBackend};
use gradebook_core::grading::Exam;
use gradebook_core::traits::ReferenceProvider;

pub mod exams;
pub mod grades;
pub mod init;
pub mod publish;
pub mod roster;
pub mod validate;

/// Load configuration and build the REST backend.
fn connect(config_path: Option<&Path>) -> Result<(GradebookConfig, Arc<HttpBackend>)> {
    let config = load_config_from(config_path)?;
    let backend = create_backend(&config)?;
    Ok((config, Arc::new(backend)))
}

/// Look up an exam of a class so its subject and total marks are known.
async fn find_exam(
    backend: &HttpBackend,
    class_id: &str,
    report_period_id: &str,
    exam_id: &str,
) -> Result<Exam> {
    let exams = backend
        .list_exams(class_id, Some(report_period_id))
        .await
        .context("failed to list exams")?;
    exams
        .into_iter()
        .find(|e| e.id == exam_id)
        .with_context(|| {
            format!("exam {exam_id} not found for class {class_id} in period {report_period_id}")
        })
}
