use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use super::blocking;
use crate::error::Result;
use crate::git::SharedRepo;
use crate::models::Diff;

pub fn routes(repo: SharedRepo) -> Router {
    Router::new()
        .route("/api/v1/diff", get(get_diff))
        .with_state(repo)
}

/// Without `to`, the working tree is diffed against the index, or the index
/// against HEAD when `staged`.
#[derive(Debug, Deserialize)]
struct DiffQuery {
    from: Option<String>,
    to: Option<String>,
    path: Option<String>,
    #[serde(default)]
    staged: bool,
}

async fn get_diff(
    State(repo): State<SharedRepo>,
    Query(query): Query<DiffQuery>,
) -> Result<Json<Diff>> {
    let diff = blocking(repo, move |repo| match query.to.as_deref() {
        Some(to) => repo.get_diff(query.from.as_deref(), to, query.path.as_deref()),
        None => repo.get_working_tree_diff(query.staged, query.path.as_deref()),
    })
    .await?;
    Ok(Json(diff))
}
