//! API route handlers - maps HTTP endpoints to repository operations.
//!
//! Each submodule defines routes for a feature area:
//! - `repository`: Repo summary and submodules (GET /api/v1/repository)
//! - `config`: Read and edit repository configuration
//! - `refs`: Tags and remotes
//! - `commits`: Revision history
//! - `diff`: Revision and working tree diffs
//!
//! Every repository call spawns git and blocks, so handlers run it on the
//! blocking pool via `blocking`.

pub mod commits;
pub mod config;
pub mod diff;
pub mod refs;
pub mod repository;

use axum::Router;

use crate::error::{GitError, Result};
use crate::git::{GitRepository, SharedRepo};

pub fn create_router(repo: SharedRepo) -> Router {
    Router::new()
        .merge(repository::routes(repo.clone()))
        .merge(config::routes(repo.clone()))
        .merge(refs::routes(repo.clone()))
        .merge(commits::routes(repo.clone()))
        .merge(diff::routes(repo))
}

pub(crate) async fn blocking<T, F>(repo: SharedRepo, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&GitRepository) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&*repo))
        .await
        .map_err(|e| GitError::Internal(format!("Blocking task failed: {}", e)))?
}
