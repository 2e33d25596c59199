//! Tag listing via `git show-ref --tags --dereference`.
//!
//! Output lines are `<hash> refs/tags/<name>`; annotated tags add a second
//! line `<hash> refs/tags/<name>^{}` with the peeled commit.

use std::sync::Arc;

use tracing::info;

use crate::error::{GitError, Result};
use crate::git::command;
use crate::git::exit::{CommandFamily, Outcome};
use crate::git::executor::CommandExecutor;
use crate::git::parser::GitParser;
use crate::git::repository::GitRepository;
use crate::models::{Tag, TagData, TagType};

const TAG_PREFIX: &str = "refs/tags/";
const PEELED_SUFFIX: &str = "^{}";

pub fn query_tags<E: CommandExecutor + ?Sized>(executor: &E) -> Result<Vec<TagData>> {
    let output = executor.exec(&command::refs::list_tags()?)?;
    match CommandFamily::ShowRef.check(&output)? {
        Outcome::Empty => Ok(Vec::new()),
        Outcome::Success => Ok(parse_tags(&output.stdout)),
    }
}

/// Malformed lines (short hash, foreign ref) are skipped.
pub fn parse_tags(text: &str) -> Vec<TagData> {
    let mut parser = GitParser::new(text);
    let mut tags: Vec<TagData> = Vec::new();

    while !parser.is_at_end() {
        let line = parser.read_line();
        let mut fields = GitParser::new(line);
        let hash = fields.read_field(' ');
        let Some(name) = fields.remaining().strip_prefix(TAG_PREFIX) else {
            continue;
        };

        if let Some(name) = name.strip_suffix(PEELED_SUFFIX) {
            if let Some(tag) = tags.iter_mut().rev().find(|t| t.name == name) {
                if let Ok(peeled) = TagData::new(name, hash, TagType::Annotated) {
                    *tag = peeled;
                }
            }
            continue;
        }

        if let Ok(tag) = TagData::new(name, hash, TagType::Lightweight) {
            tags.push(tag);
        }
    }
    tags
}

impl GitRepository {
    /// All tags, reconciled into the registry; deleted tags are invalidated.
    pub fn tags(&self) -> Result<Vec<Arc<Tag>>> {
        let records = query_tags(self.executor())?;
        let tags = self.objects().refresh(&records)?;
        info!("Tags refreshed: {}", tags.len());
        Ok(tags)
    }

    pub fn tag(&self, name: &str) -> Result<Arc<Tag>> {
        self.tags()?
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| GitError::NotFound(format!("tag {}", name)))
    }
}
