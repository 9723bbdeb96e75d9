//! The `gradebook init` command.

use anyhow::Result;

use gradebook_core::parser::EXAMPLE_QUIZ_TOML;

pub fn execute() -> Result<()> {
    if std::path::Path::new("gradebook.toml").exists() {
        println!("gradebook.toml already exists, skipping.");
    } else {
        std::fs::write("gradebook.toml", SAMPLE_CONFIG)?;
        println!("Created gradebook.toml");
    }

    std::fs::create_dir_all("quizzes")?;
    let example_path = std::path::Path::new("quizzes/example.toml");
    if example_path.exists() {
        println!("quizzes/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_QUIZ_TOML)?;
        println!("Created quizzes/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit gradebook.toml with your API URL and token");
    println!("  2. Run: gradebook validate --quiz quizzes/example.toml");
    println!("  3. Run: gradebook publish --quiz quizzes/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradebook configuration

[api]
base_url = "http://localhost:3000/api"
token = "${GRADEBOOK_TOKEN}"
timeout_secs = 30

[grading]
# Maximum mark when neither the grade record nor the exam defines one.
default_max_value = 20
"#;
