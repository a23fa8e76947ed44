//! HTTP service for parsing templates and generating presentations

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod server;
pub mod state;
pub mod storage;

pub use auth::{AuthUser, StaticTokens, TokenVerifier};
pub use catalog::{TemplateCatalog, TemplateEntry};
pub use config::Config;
pub use error::{ApiError, Error, Result};
pub use fetch::{TemplateSource, UrlFetcher};
pub use server::{build_router, run_server};
pub use state::{AppState, SharedState};
pub use storage::{LocalStorage, ObjectStorage};
