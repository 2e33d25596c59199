//! Revision (commit) records and entities.
//!
//! - `RevisionData`: one record of `git log -z --format=...`
//! - `Revision`: the registry entity keyed by full object hash. A revision
//!   can exist unloaded (only its hash is known, e.g. as a tag target) until a
//!   log record fills in its details.
//! - `CommitDetail` / `AuthorInfo`: serializable snapshots for the JSON API

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::git::cache::{Entity, Lifecycle, ObjectData, ObjectMaps};
use crate::git::repository::format_relative_time;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionData {
    pub hash: String,
    pub parents: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: i64,
    pub subject: String,
}

/// Loaded commit metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    pub author_name: String,
    pub author_email: String,
    pub timestamp: i64,
    pub subject: String,
}

#[derive(Debug)]
pub struct Revision {
    hash: String,
    info: RwLock<Option<RevisionInfo>>,
    parents: RwLock<Vec<Arc<Revision>>>,
    lifecycle: Lifecycle,
}

impl Revision {
    pub(crate) fn new(hash: String) -> Self {
        Self {
            hash,
            info: RwLock::new(None),
            parents: RwLock::new(Vec::new()),
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn is_loaded(&self) -> bool {
        self.info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn info(&self) -> Result<Option<RevisionInfo>> {
        self.ensure_live()?;
        Ok(self
            .info
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    pub fn parents(&self) -> Result<Vec<Arc<Revision>>> {
        self.ensure_live()?;
        Ok(self
            .parents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    /// Snapshot for API responses. Unloaded revisions report empty metadata.
    pub fn detail(&self) -> Result<CommitDetail> {
        let info = self.info()?;
        let parents: Vec<String> = self
            .parents()?
            .iter()
            .map(|p| p.hash().to_string())
            .collect();
        let (author, timestamp, relative_time, subject) = match info {
            Some(info) => (
                AuthorInfo {
                    name: info.author_name,
                    email: info.author_email,
                },
                info.timestamp,
                format_relative_time(info.timestamp),
                info.subject,
            ),
            None => (AuthorInfo::default(), 0, String::new(), String::new()),
        };
        Ok(CommitDetail {
            oid: self.hash.clone(),
            message: subject,
            author,
            timestamp,
            relative_time,
            parent_count: parents.len(),
            parents,
        })
    }

    fn load(&self, data: &RevisionData, maps: &mut ObjectMaps) {
        let parents = data.parents.iter().map(|p| maps.revision(p)).collect();
        *self.parents.write().unwrap_or_else(PoisonError::into_inner) = parents;
        *self.info.write().unwrap_or_else(PoisonError::into_inner) = Some(RevisionInfo {
            author_name: data.author_name.clone(),
            author_email: data.author_email.clone(),
            timestamp: data.timestamp,
            subject: data.subject.clone(),
        });
    }
}

impl Entity for Revision {
    const KIND: &'static str = "revision";

    fn key(&self) -> &str {
        &self.hash
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn slot(maps: &mut ObjectMaps) -> &mut std::collections::HashMap<String, Arc<Self>> {
        &mut maps.revisions
    }
}

impl ObjectData for RevisionData {
    type Entity = Revision;

    fn key(&self) -> &str {
        &self.hash
    }

    fn build(&self, maps: &mut ObjectMaps) -> Arc<Revision> {
        let revision = Arc::new(Revision::new(self.hash.clone()));
        revision.load(self, maps);
        revision
    }

    fn apply(&self, revision: &Revision, maps: &mut ObjectMaps) {
        revision.load(self, maps);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub oid: String,
    pub message: String,
    pub author: AuthorInfo,
    pub timestamp: i64,
    pub relative_time: String,
    pub parent_count: usize,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::ObjectRegistry;

    const HASH: &str = "cccccccccccccccccccccccccccccccccccccccc";

    #[test]
    fn unloaded_revision_has_no_relative_time() {
        let registry = ObjectRegistry::new();
        let detail = registry.revision(HASH).unwrap().detail().unwrap();
        assert_eq!(detail.oid, HASH);
        assert_eq!(detail.timestamp, 0);
        assert!(detail.relative_time.is_empty());
        assert!(detail.message.is_empty());
    }

    #[test]
    fn loaded_revision_reports_relative_time() {
        let registry = ObjectRegistry::new();
        let revision = registry
            .reconcile(&RevisionData {
                hash: HASH.to_string(),
                parents: Vec::new(),
                author_name: "Ann".to_string(),
                author_email: "ann@example.com".to_string(),
                timestamp: chrono::Utc::now().timestamp() - 120,
                subject: "Fix it".to_string(),
            })
            .unwrap();
        let detail = revision.detail().unwrap();
        assert_eq!(detail.message, "Fix it");
        assert!(!detail.relative_time.is_empty());
    }
}
