use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use serde::Deserialize;

use super::blocking;
use crate::error::{GitError, Result};
use crate::git::SharedRepo;
use crate::git::history::DEFAULT_LOG_LIMIT;
use crate::models::CommitDetail;

pub fn routes(repo: SharedRepo) -> Router {
    Router::new()
        .route("/api/v1/commits", get(get_commits))
        .route("/api/v1/commits/{revision}", get(get_commit))
        .with_state(repo)
}

#[derive(Debug, Deserialize)]
struct CommitsQuery {
    #[serde(default = "default_revision")]
    rev: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_revision() -> String {
    "HEAD".to_string()
}

fn default_limit() -> usize {
    DEFAULT_LOG_LIMIT
}

async fn get_commits(
    State(repo): State<SharedRepo>,
    Query(query): Query<CommitsQuery>,
) -> Result<Json<Vec<CommitDetail>>> {
    let commits = blocking(repo, move |repo| {
        repo.get_revisions(&query.rev, query.limit)?
            .iter()
            .map(|r| r.detail())
            .collect()
    })
    .await?;
    Ok(Json(commits))
}

async fn get_commit(
    State(repo): State<SharedRepo>,
    Path(revision): Path<String>,
) -> Result<Json<CommitDetail>> {
    let commit = blocking(repo, move |repo| match repo.get_revision(&revision)? {
        Some(found) => found.detail(),
        None => Err(GitError::NotFound(format!("revision {}", revision))),
    })
    .await?;
    Ok(Json(commit))
}
