//! Revision history via `git log -z`.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::git::command;
use crate::git::exit::CommandFamily;
use crate::git::executor::CommandExecutor;
use crate::git::parser::{GitParser, is_object_hash};
use crate::git::repository::GitRepository;
use crate::models::{Revision, RevisionData};

pub const DEFAULT_LOG_LIMIT: usize = 50;

pub fn query_revisions<E: CommandExecutor + ?Sized>(
    executor: &E,
    revision: &str,
    limit: usize,
) -> Result<Vec<RevisionData>> {
    let output = executor.exec(&command::log::revisions(revision, limit)?)?;
    CommandFamily::Generic.check(&output)?;
    Ok(parse_revisions(&output.stdout))
}

/// Parse NUL-separated log records in `command::log::RECORD_FORMAT` order.
/// Records without a full object hash are skipped.
pub fn parse_revisions(text: &str) -> Vec<RevisionData> {
    let mut parser = GitParser::new(text);
    let mut revisions = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.is_at_end() {
            break;
        }

        let hash = parser.read_line().trim();
        let parents = parser.read_line();
        let author_name = parser.read_line();
        let author_email = parser.read_line();
        let timestamp = parser.read_line();
        let subject = parser.read_until_nul();

        if !is_object_hash(hash) {
            debug!("Skipping log record with invalid hash: {:?}", hash);
            continue;
        }
        revisions.push(RevisionData {
            hash: hash.to_ascii_lowercase(),
            parents: parents
                .split_whitespace()
                .filter(|p| is_object_hash(p))
                .map(str::to_ascii_lowercase)
                .collect(),
            author_name: author_name.to_string(),
            author_email: author_email.to_string(),
            timestamp: timestamp.trim().parse().unwrap_or(0),
            subject: subject.to_string(),
        });
    }
    revisions
}

impl GitRepository {
    /// Up to `limit` revisions reachable from `revision`, newest first.
    /// Parents are resolved to registry revisions, loaded or not.
    pub fn get_revisions(&self, revision: &str, limit: usize) -> Result<Vec<Arc<Revision>>> {
        let records = query_revisions(self.executor(), revision, limit)?;
        self.objects().reconcile_all(&records)
    }

    /// Resolve a single revision expression. `None` when it names nothing,
    /// including `HEAD` of an empty repository.
    pub fn get_revision(&self, revision: &str) -> Result<Option<Arc<Revision>>> {
        let output = self.exec(&command::log::revisions(revision, 1)?)?;
        if !output.is_success() {
            debug!("Revision {} not resolved: {}", revision, output.message());
            return Ok(None);
        }
        match parse_revisions(&output.stdout).first() {
            Some(record) => Ok(Some(self.objects().reconcile(record)?)),
            None => Ok(None),
        }
    }

    /// The registry revision for a full hash, loading its details on first use.
    pub fn revision_by_hash(&self, hash: &str) -> Result<Arc<Revision>> {
        let revision = self.objects().revision(hash)?;
        if !revision.is_loaded() {
            self.get_revision(revision.hash())?;
        }
        Ok(revision)
    }
}
