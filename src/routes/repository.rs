use axum::{Json, Router, extract::State, routing::get};

use super::blocking;
use crate::error::Result;
use crate::git::SharedRepo;
use crate::models::{RepositoryInfo, SubmoduleData};

pub fn routes(repo: SharedRepo) -> Router {
    Router::new()
        .route("/api/v1/repository", get(get_repository_info))
        .route("/api/v1/submodules", get(get_submodules))
        .with_state(repo)
}

async fn get_repository_info(State(repo): State<SharedRepo>) -> Result<Json<RepositoryInfo>> {
    let info = blocking(repo, |repo| repo.info()).await?;
    Ok(Json(info))
}

async fn get_submodules(State(repo): State<SharedRepo>) -> Result<Json<Vec<SubmoduleData>>> {
    let submodules = blocking(repo, |repo| {
        repo.submodules()?.iter().map(|s| s.data()).collect()
    })
    .await?;
    Ok(Json(submodules))
}
