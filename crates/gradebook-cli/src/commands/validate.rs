//! The `gradebook validate` command.

use std::path::PathBuf;

use anyhow::Result;

use gradebook_core::assembly::validate_quiz;
use gradebook_core::parser::parse_quiz;

pub fn execute(quiz_path: PathBuf) -> Result<()> {
    let quiz = parse_quiz(&quiz_path)?;
    println!(
        "Quiz: {} ({} questions, {} points)",
        if quiz.title.trim().is_empty() {
            "<untitled>"
        } else {
            quiz.title.as_str()
        },
        quiz.questions.len(),
        quiz.total_points()
    );

    let issues = validate_quiz(&quiz);
    for issue in &issues {
        println!("  [{}] {issue}", issue.field());
    }

    if !issues.is_empty() {
        anyhow::bail!("{} problem(s) found in {}", issues.len(), quiz_path.display());
    }

    println!("Quiz is valid.");
    Ok(())
}
