//! gradebook-core — Quiz authoring and grade reconciliation.
//!
//! This crate holds the data model for quizzes and grade sheets, the
//! collaborator traits the backend implements, and the workflows that sit
//! between them: quiz assembly and validation, roster reconciliation, and
//! bulk grade saving with a stale-response guard.

pub mod assembly;
pub mod error;
pub mod grading;
pub mod parser;
pub mod question;
pub mod quiz;
pub mod reconcile;
pub mod saver;
pub mod session;
pub mod traits;
