//! The `gradebook exams` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use gradebook_core::grading::format_value;
use gradebook_core::traits::ReferenceProvider;

use super::connect;

pub async fn execute(
    class_id: String,
    report_period_id: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (_, backend) = connect(config_path.as_deref())?;
    let exams = backend
        .list_exams(&class_id, report_period_id.as_deref())
        .await
        .context("failed to list exams")?;

    if exams.is_empty() {
        println!("No exams found for class {class_id}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Subject", "Max"]);
    for exam in &exams {
        table.add_row(vec![
            Cell::new(&exam.id),
            Cell::new(&exam.name),
            Cell::new(exam.subject().unwrap_or("-")),
            Cell::new(format_value(exam.max_value())),
        ]);
    }

    println!("{table}");
    Ok(())
}
