use serde::Serialize;

use super::CommitDetail;
use crate::git::cache::RegistryStats;

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub path: String,
    pub head_branch: Option<String>,
    pub head_commit: Option<CommitDetail>,
    pub is_bare: bool,
    pub git_version: Option<String>,
    pub objects: RegistryStats,
}
