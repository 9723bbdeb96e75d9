//! The `gradebook roster` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use gradebook_client::{GradebookConfig, HttpBackend};
use gradebook_core::grading::{format_value, RosterRow};
use gradebook_core::reconcile::RosterReconciler;
use gradebook_core::saver::GradeBulkSaver;
use gradebook_core::session::GradingController;

use super::{connect, find_exam};

pub async fn execute(
    class_id: String,
    report_period_id: String,
    exam_id: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, backend) = connect(config_path.as_deref())?;
    let controller = load_sheet(&config, backend, &class_id, &report_period_id, &exam_id).await?;

    let rows = controller.rows().await;
    print_rows(&rows);
    let graded = rows.iter().filter(|r| r.is_graded()).count();
    println!("{graded}/{} students graded.", rows.len());
    Ok(())
}

/// Select class, period and exam, then load the reconciled rows.
pub(crate) async fn load_sheet(
    config: &GradebookConfig,
    backend: Arc<HttpBackend>,
    class_id: &str,
    report_period_id: &str,
    exam_id: &str,
) -> Result<GradingController> {
    let exam = find_exam(&backend, class_id, report_period_id, exam_id).await?;

    let reconciler = RosterReconciler::new(backend.clone(), backend.clone())
        .with_default_max_value(config.grading.default_max_value);
    let controller = GradingController::new(reconciler, GradeBulkSaver::new(backend));

    controller.select(class_id, report_period_id, exam).await;
    controller.load().await.context("failed to load roster")?;
    Ok(controller)
}

pub(crate) fn print_rows(rows: &[RosterRow]) {
    let mut table = Table::new();
    table.set_header(vec!["Student", "Name", "Value", "Max", "Notes", "Record"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.student_id),
            Cell::new(&row.student_name),
            Cell::new(if row.is_graded() { row.value.as_str() } else { "-" }),
            Cell::new(format_value(row.max_value)),
            Cell::new(&row.notes),
            Cell::new(row.grade_record_id.as_deref().unwrap_or("new")),
        ]);
    }
    println!("{table}");
}
