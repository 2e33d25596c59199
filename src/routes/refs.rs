use axum::{Json, Router, extract::State, routing::get};

use super::blocking;
use crate::error::Result;
use crate::git::SharedRepo;
use crate::models::{RemoteData, TagData};

pub fn routes(repo: SharedRepo) -> Router {
    Router::new()
        .route("/api/v1/tags", get(get_tags))
        .route("/api/v1/remotes", get(get_remotes))
        .with_state(repo)
}

async fn get_tags(State(repo): State<SharedRepo>) -> Result<Json<Vec<TagData>>> {
    let tags = blocking(repo, |repo| repo.tags()?.iter().map(|t| t.data()).collect()).await?;
    Ok(Json(tags))
}

async fn get_remotes(State(repo): State<SharedRepo>) -> Result<Json<Vec<RemoteData>>> {
    let remotes = blocking(repo, |repo| {
        repo.remotes()?.iter().map(|r| r.data()).collect()
    })
    .await?;
    Ok(Json(remotes))
}
