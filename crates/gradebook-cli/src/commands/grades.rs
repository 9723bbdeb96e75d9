//! The `gradebook grades` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use gradebook_core::grading::RowField;
use gradebook_core::parser::parse_grade_edits;
use gradebook_core::saver::SaveOutcome;

use super::connect;
use super::roster::{load_sheet, print_rows};

pub async fn execute(
    class_id: String,
    report_period_id: String,
    exam_id: String,
    edits_path: PathBuf,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let edits = parse_grade_edits(&edits_path)?;
    let (config, backend) = connect(config_path.as_deref())?;
    let controller = load_sheet(&config, backend, &class_id, &report_period_id, &exam_id).await?;

    let mut skipped = 0;
    for edit in &edits {
        let mut known = true;
        if let Some(value) = &edit.value {
            known &= controller
                .stage_edit(&edit.student_id, RowField::Value, value)
                .await;
        }
        if let Some(notes) = &edit.notes {
            known &= controller
                .stage_edit(&edit.student_id, RowField::Notes, notes)
                .await;
        }
        if !known {
            eprintln!("  WARNING: student {} is not on the roster, skipped", edit.student_id);
            skipped += 1;
        }
    }

    let outcome = controller.commit().await.context("failed to save grades")?;
    match outcome {
        SaveOutcome::NothingToSave => println!("Nothing to save."),
        SaveOutcome::Saved(receipt) => {
            print_rows(&controller.rows().await);
            println!(
                "Saved {} grade(s): {} created, {} updated at {}.",
                receipt.total(),
                receipt.created,
                receipt.updated,
                receipt
                    .saved_at
                    .with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
            );
        }
    }
    if skipped > 0 {
        println!("{skipped} edit(s) skipped.");
    }
    Ok(())
}
