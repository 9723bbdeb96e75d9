//! The `gradebook publish` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use gradebook_core::assembly::QuizAssembly;
use gradebook_core::error::PersistError;
use gradebook_core::parser::parse_quiz;

use super::connect;

pub async fn execute(quiz_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let quiz = parse_quiz(&quiz_path)?;
    let updating = quiz.id.is_some();
    let (_, backend) = connect(config_path.as_deref())?;

    let mut assembly = QuizAssembly::from_quiz(quiz);
    match assembly.persist(backend.as_ref()).await {
        Ok(id) => {
            let quiz = assembly.quiz();
            println!(
                "{} quiz {id}: {} ({} questions, {} points)",
                if updating { "Updated" } else { "Published" },
                quiz.title,
                quiz.questions.len(),
                quiz.total_points()
            );
            Ok(())
        }
        Err(PersistError::Invalid(issues)) => {
            for issue in &issues {
                println!("  [{}] {issue}", issue.field());
            }
            anyhow::bail!(
                "{} problem(s) found; nothing was published",
                issues.len()
            )
        }
        Err(e) => Err(anyhow::Error::new(e)).context("failed to publish quiz"),
    }
}
