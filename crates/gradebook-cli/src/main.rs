//! gradebook CLI — author quizzes and record grades from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "gradebook",
    version,
    about = "Quiz authoring and grade entry for the school console"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a quiz file and list every problem
    Validate {
        /// Path to a .toml quiz file
        #[arg(long)]
        quiz: PathBuf,
    },

    /// Validate a quiz file and submit it to the quiz store
    Publish {
        /// Path to a .toml quiz file
        #[arg(long)]
        quiz: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List the exams of a class
    Exams {
        /// Class id
        #[arg(long = "class")]
        class_id: String,

        /// Report period id
        #[arg(long = "period")]
        period_id: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show the roster of a class merged with recorded grades
    Roster {
        /// Class id
        #[arg(long = "class")]
        class_id: String,

        /// Report period id
        #[arg(long = "period")]
        period_id: String,

        /// Exam id
        #[arg(long = "exam")]
        exam_id: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Apply grade edits from a file and save them in one batch
    Grades {
        /// Class id
        #[arg(long = "class")]
        class_id: String,

        /// Report period id
        #[arg(long = "period")]
        period_id: String,

        /// Exam id
        #[arg(long = "exam")]
        exam_id: String,

        /// TOML file with [[grades]] entries
        #[arg(long)]
        edits: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config and an example quiz
    Init,
}

#[tokio::main]
async fn main() {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "gradebook=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { quiz } => commands::validate::execute(quiz),
        Commands::Publish { quiz, config } => commands::publish::execute(quiz, config).await,
        Commands::Exams {
            class_id,
            period_id,
            config,
        } => commands::exams::execute(class_id, period_id, config).await,
        Commands::Roster {
            class_id,
            period_id,
            exam_id,
            config,
        } => commands::roster::execute(class_id, period_id, exam_id, config).await,
        Commands::Grades {
            class_id,
            period_id,
            exam_id,
            edits,
            config,
        } => commands::grades::execute(class_id, period_id, exam_id, edits, config).await,
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
