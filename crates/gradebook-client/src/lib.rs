//! gradebook-client — Backend implementations of the gradebook collaborators.
//!
//! `HttpBackend` talks to the school-management REST API; `InMemoryBackend`
//! keeps everything in process for tests and offline runs. Both implement
//! every trait in `gradebook_core::traits`.

pub mod config;
pub mod http;
pub mod mock;
mod wire;

pub use config::{create_backend, load_config, load_config_from, GradebookConfig};
pub use http::HttpBackend;
pub use mock::InMemoryBackend;
