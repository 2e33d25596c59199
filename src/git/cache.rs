//! Repository-scoped object registry.
//!
//! Holds the live domain entities of one repository, keyed by identity
//! (object hash for revisions, name for everything else). Parsed records are
//! reconciled into it: an existing entity is updated in place, a missing one
//! is built and registered. Callers therefore always observe the same `Arc`
//! for the same key, which keeps long-lived references and subscriptions
//! valid across refreshes.
//!
//! All mutation happens under one mutex per registry. The lock is only held
//! for the map operation itself; running git and parsing its output happen
//! before `reconcile` is called.
//!
//! Entity lifecycle: Unregistered → Registered → Deleted. Removing an entity
//! marks it deleted so stale holders fail fast with `GitError::Deleted`.
//!
//! Used by: `GitRepository` listing operations in config.rs, refs.rs,
//! remotes.rs, submodules.rs, history.rs

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

use crate::error::{GitError, Result};
use crate::git::parser::is_object_hash;
use crate::models::{ConfigParameter, Remote, Revision, Submodule, Tag};

/// Deleted flag shared by every entity type.
#[derive(Debug, Default)]
pub struct Lifecycle {
    deleted: AtomicBool,
}

impl Lifecycle {
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }
}

/// A long-lived, identity-stable domain object.
pub trait Entity: Send + Sync + 'static {
    const KIND: &'static str;

    fn key(&self) -> &str;

    fn lifecycle(&self) -> &Lifecycle;

    /// The registry map holding entities of this type.
    fn slot(maps: &mut ObjectMaps) -> &mut HashMap<String, Arc<Self>>;

    fn is_deleted(&self) -> bool {
        self.lifecycle().is_deleted()
    }

    /// Fail fast when called through a stale reference.
    fn ensure_live(&self) -> Result<()> {
        if self.is_deleted() {
            return Err(GitError::Deleted {
                kind: Self::KIND,
                key: self.key().to_string(),
            });
        }
        Ok(())
    }
}

/// A parsed record that can create or update its entity.
pub trait ObjectData {
    type Entity: Entity;

    fn key(&self) -> &str;

    /// Construct a brand-new entity. May resolve related entities through
    /// `maps` (a tag resolves its target revision).
    fn build(&self, maps: &mut ObjectMaps) -> Arc<Self::Entity>;

    /// Update an existing entity of the same identity in place.
    fn apply(&self, entity: &Self::Entity, maps: &mut ObjectMaps);
}

/// The per-type maps guarded by the registry lock.
#[derive(Default)]
pub struct ObjectMaps {
    pub(crate) revisions: HashMap<String, Arc<Revision>>,
    pub(crate) tags: HashMap<String, Arc<Tag>>,
    pub(crate) config: HashMap<String, Arc<ConfigParameter>>,
    pub(crate) submodules: HashMap<String, Arc<Submodule>>,
    pub(crate) remotes: HashMap<String, Arc<Remote>>,
}

impl ObjectMaps {
    /// Get or create the revision for `hash`. Hashes are normalized to
    /// lowercase so both spellings resolve to one entity.
    pub fn revision(&mut self, hash: &str) -> Arc<Revision> {
        let hash = hash.to_ascii_lowercase();
        self.revisions
            .entry(hash)
            .or_insert_with_key(|hash| Arc::new(Revision::new(hash.clone())))
            .clone()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub revisions: usize,
    pub tags: usize,
    pub config: usize,
    pub submodules: usize,
    pub remotes: usize,
}

#[derive(Default)]
pub struct ObjectRegistry {
    maps: Mutex<ObjectMaps>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ObjectMaps>> {
        self.maps.lock().map_err(|_| GitError::lock_poisoned())
    }

    pub fn get<E: Entity>(&self, key: &str) -> Result<Option<Arc<E>>> {
        let mut maps = self.lock()?;
        Ok(E::slot(&mut maps).get(key).cloned())
    }

    /// Return the registered entity for the record's key, building it from
    /// the record only when none exists. An existing entity is not updated.
    pub fn get_or_create<D: ObjectData>(&self, data: &D) -> Result<Arc<D::Entity>> {
        let mut maps = self.lock()?;
        Ok(get_or_create_locked(&mut maps, data))
    }

    /// Construct-or-update: the returned entity reflects `data` either way.
    pub fn reconcile<D: ObjectData>(&self, data: &D) -> Result<Arc<D::Entity>> {
        let mut maps = self.lock()?;
        Ok(reconcile_locked(&mut maps, data))
    }

    pub fn reconcile_all<D: ObjectData>(&self, records: &[D]) -> Result<Vec<Arc<D::Entity>>> {
        let mut maps = self.lock()?;
        Ok(records
            .iter()
            .map(|data| reconcile_locked(&mut maps, data))
            .collect())
    }

    /// Reconcile a complete listing: entities missing from `records` are
    /// removed and marked deleted. Returns entities in record order.
    pub fn refresh<D: ObjectData>(&self, records: &[D]) -> Result<Vec<Arc<D::Entity>>> {
        let mut maps = self.lock()?;
        let entities: Vec<_> = records
            .iter()
            .map(|data| reconcile_locked(&mut maps, data))
            .collect();

        let present: HashSet<&str> = records.iter().map(|d| d.key()).collect();
        let slot = <D::Entity as Entity>::slot(&mut maps);
        let stale: Vec<String> = slot
            .keys()
            .filter(|key| !present.contains(key.as_str()))
            .cloned()
            .collect();
        for key in &stale {
            if let Some(entity) = slot.remove(key) {
                entity.lifecycle().mark_deleted();
            }
        }
        if !stale.is_empty() {
            debug!("Removed {} stale {} entities", stale.len(), <D::Entity as Entity>::KIND);
        }
        Ok(entities)
    }

    /// Unregister an entity and mark it deleted.
    pub fn remove<E: Entity>(&self, key: &str) -> Result<Option<Arc<E>>> {
        let mut maps = self.lock()?;
        let removed = E::slot(&mut maps).remove(key);
        if let Some(entity) = &removed {
            entity.lifecycle().mark_deleted();
        }
        Ok(removed)
    }

    /// Get or create the revision for a full object hash.
    pub fn revision(&self, hash: &str) -> Result<Arc<Revision>> {
        if !is_object_hash(hash) {
            return Err(GitError::InvalidArgument(format!(
                "not a full object hash: {}",
                hash
            )));
        }
        let mut maps = self.lock()?;
        Ok(maps.revision(hash))
    }

    pub fn len<E: Entity>(&self) -> Result<usize> {
        let mut maps = self.lock()?;
        Ok(E::slot(&mut maps).len())
    }

    /// Teardown: every entity is unregistered and marked deleted.
    pub fn clear(&self) -> Result<()> {
        let mut maps = self.lock()?;
        let old = std::mem::take(&mut *maps);
        old.revisions.values().for_each(|e| e.lifecycle().mark_deleted());
        old.tags.values().for_each(|e| e.lifecycle().mark_deleted());
        old.config.values().for_each(|e| e.lifecycle().mark_deleted());
        old.submodules.values().for_each(|e| e.lifecycle().mark_deleted());
        old.remotes.values().for_each(|e| e.lifecycle().mark_deleted());
        Ok(())
    }

    pub fn stats(&self) -> Result<RegistryStats> {
        let maps = self.lock()?;
        Ok(RegistryStats {
            revisions: maps.revisions.len(),
            tags: maps.tags.len(),
            config: maps.config.len(),
            submodules: maps.submodules.len(),
            remotes: maps.remotes.len(),
        })
    }
}

fn get_or_create_locked<D: ObjectData>(maps: &mut ObjectMaps, data: &D) -> Arc<D::Entity> {
    if let Some(existing) = <D::Entity as Entity>::slot(maps).get(data.key()) {
        return existing.clone();
    }
    let entity = data.build(maps);
    <D::Entity as Entity>::slot(maps).insert(data.key().to_string(), entity.clone());
    entity
}

fn reconcile_locked<D: ObjectData>(maps: &mut ObjectMaps, data: &D) -> Arc<D::Entity> {
    let existing = <D::Entity as Entity>::slot(maps).get(data.key()).cloned();
    match existing {
        Some(entity) => {
            data.apply(&entity, maps);
            entity
        }
        None => {
            let entity = data.build(maps);
            <D::Entity as Entity>::slot(maps).insert(data.key().to_string(), entity.clone());
            entity
        }
    }
}
