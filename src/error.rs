//! Error taxonomy for the git access layer and its HTTP response mapping.
//!
//! `GitError` covers every failure the layer reports:
//! - process launch failures and timeouts from the execution engine
//! - family-specific exit codes (see `git::exit::CommandFamily`)
//! - the generic non-zero exit fallback carrying stderr/stdout text
//! - stale entity access after an object was removed from its registry
//!
//! Error mappings for the JSON API:
//! - `RepoNotFound`, `NotFound`, `ConfigParameterDoesNotExist` → 404
//! - `InvalidArgument`, `InvalidSectionOrKey`, `NoSectionProvided` → 400
//! - `Deleted` → 410
//! - everything else → 500

use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    #[error("Invalid config file: {target}")]
    InvalidConfigFile { target: String },

    #[error("Cannot write config file: {target}")]
    CannotWriteConfigFile { target: String },

    #[error("No section provided: {target}")]
    NoSectionProvided { target: String },

    #[error("Invalid section or key: {target}")]
    InvalidSectionOrKey { target: String },

    #[error("Config parameter does not exist: {target}")]
    ConfigParameterDoesNotExist { target: String },

    #[error("git exited with code {exit_code}: {message}")]
    Failed { exit_code: i32, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} '{key}' has been deleted")]
    Deleted { kind: &'static str, key: String },

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("git {found} is older than the required {required}")]
    UnsupportedVersion { found: String, required: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GitError {
    pub(crate) fn lock_poisoned() -> Self {
        GitError::Internal("Lock poisoned".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            GitError::RepoNotFound(_)
            | GitError::NotFound(_)
            | GitError::ConfigParameterDoesNotExist { .. } => StatusCode::NOT_FOUND,
            GitError::InvalidArgument(_)
            | GitError::InvalidSectionOrKey { .. }
            | GitError::NoSectionProvided { .. } => StatusCode::BAD_REQUEST,
            GitError::Deleted { .. } => StatusCode::GONE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GitError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GitError>;
