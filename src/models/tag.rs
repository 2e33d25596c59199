//! Tag records and entities.
//!
//! `TagData` comes from `git show-ref --tags --dereference`. Annotated tags
//! are reported twice by git (the tag object and the peeled `^{}` commit);
//! the parser folds both into one record pointing at the commit.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{GitError, Result};
use crate::git::cache::{Entity, Lifecycle, ObjectData, ObjectMaps};
use crate::git::parser::is_object_hash;
use crate::models::Revision;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagType {
    Lightweight,
    Annotated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagData {
    pub name: String,
    /// Commit the tag resolves to.
    pub hash: String,
    pub tag_type: TagType,
}

impl TagData {
    pub fn new(name: &str, hash: &str, tag_type: TagType) -> Result<Self> {
        if name.is_empty() {
            return Err(GitError::InvalidArgument("tag name must not be empty".to_string()));
        }
        if !is_object_hash(hash) {
            return Err(GitError::InvalidArgument(format!(
                "tag {} has invalid target hash: {}",
                name, hash
            )));
        }
        Ok(Self {
            name: name.to_string(),
            hash: hash.to_ascii_lowercase(),
            tag_type,
        })
    }
}

#[derive(Debug)]
pub struct Tag {
    name: String,
    target: RwLock<Arc<Revision>>,
    tag_type: RwLock<TagType>,
    lifecycle: Lifecycle,
}

impl Tag {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Result<Arc<Revision>> {
        self.ensure_live()?;
        Ok(self
            .target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    pub fn tag_type(&self) -> Result<TagType> {
        self.ensure_live()?;
        Ok(*self.tag_type.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Current state as a record.
    pub fn data(&self) -> Result<TagData> {
        Ok(TagData {
            name: self.name.clone(),
            hash: self.target()?.hash().to_string(),
            tag_type: self.tag_type()?,
        })
    }
}

impl Entity for Tag {
    const KIND: &'static str = "tag";

    fn key(&self) -> &str {
        &self.name
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn slot(maps: &mut ObjectMaps) -> &mut HashMap<String, Arc<Self>> {
        &mut maps.tags
    }
}

impl ObjectData for TagData {
    type Entity = Tag;

    fn key(&self) -> &str {
        &self.name
    }

    fn build(&self, maps: &mut ObjectMaps) -> Arc<Tag> {
        Arc::new(Tag {
            name: self.name.clone(),
            target: RwLock::new(maps.revision(&self.hash)),
            tag_type: RwLock::new(self.tag_type),
            lifecycle: Lifecycle::default(),
        })
    }

    fn apply(&self, tag: &Tag, maps: &mut ObjectMaps) {
        {
            let mut target = tag.target.write().unwrap_or_else(PoisonError::into_inner);
            if target.hash() != self.hash {
                *target = maps.revision(&self.hash);
            }
        }
        *tag.tag_type.write().unwrap_or_else(PoisonError::into_inner) = self.tag_type;
    }
}
