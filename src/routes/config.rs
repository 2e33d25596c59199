use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use super::blocking;
use crate::error::{GitError, Result};
use crate::git::SharedRepo;
use crate::models::ConfigParameterData;

pub fn routes(repo: SharedRepo) -> Router {
    Router::new()
        .route("/api/v1/config", get(list_config))
        .route(
            "/api/v1/config/{name}",
            get(get_parameter).put(set_parameter).delete(unset_parameter),
        )
        .with_state(repo)
}

#[derive(Debug, Deserialize)]
struct SetValue {
    value: String,
}

async fn list_config(State(repo): State<SharedRepo>) -> Result<Json<Vec<ConfigParameterData>>> {
    let parameters = blocking(repo, |repo| {
        repo.config()?.iter().map(|p| p.data()).collect()
    })
    .await?;
    Ok(Json(parameters))
}

async fn get_parameter(
    State(repo): State<SharedRepo>,
    Path(name): Path<String>,
) -> Result<Json<ConfigParameterData>> {
    let parameter = blocking(repo, move |repo| match repo.config_parameter(&name)? {
        Some(parameter) => parameter.data(),
        None => Err(GitError::NotFound(format!("config parameter {}", name))),
    })
    .await?;
    Ok(Json(parameter))
}

async fn set_parameter(
    State(repo): State<SharedRepo>,
    Path(name): Path<String>,
    Json(body): Json<SetValue>,
) -> Result<Json<ConfigParameterData>> {
    let parameter = blocking(repo, move |repo| {
        repo.set_config(&name, &body.value)?.data()
    })
    .await?;
    Ok(Json(parameter))
}

async fn unset_parameter(
    State(repo): State<SharedRepo>,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    blocking(repo, move |repo| repo.unset_config(&name)).await?;
    Ok(StatusCode::NO_CONTENT)
}
