use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::git::cache::{Entity, Lifecycle, ObjectData, ObjectMaps};

/// A remote as reported by `git remote -v`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteData {
    pub name: String,
    pub fetch_url: Option<String>,
    pub push_url: Option<String>,
}

#[derive(Debug)]
pub struct Remote {
    name: String,
    urls: RwLock<(Option<String>, Option<String>)>,
    lifecycle: Lifecycle,
}

impl Remote {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fetch_url(&self) -> Result<Option<String>> {
        self.ensure_live()?;
        Ok(self.urls.read().unwrap_or_else(PoisonError::into_inner).0.clone())
    }

    pub fn push_url(&self) -> Result<Option<String>> {
        self.ensure_live()?;
        Ok(self.urls.read().unwrap_or_else(PoisonError::into_inner).1.clone())
    }

    pub fn data(&self) -> Result<RemoteData> {
        Ok(RemoteData {
            name: self.name.clone(),
            fetch_url: self.fetch_url()?,
            push_url: self.push_url()?,
        })
    }
}

impl Entity for Remote {
    const KIND: &'static str = "remote";

    fn key(&self) -> &str {
        &self.name
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn slot(maps: &mut ObjectMaps) -> &mut HashMap<String, Arc<Self>> {
        &mut maps.remotes
    }
}

impl ObjectData for RemoteData {
    type Entity = Remote;

    fn key(&self) -> &str {
        &self.name
    }

    fn build(&self, _: &mut ObjectMaps) -> Arc<Remote> {
        Arc::new(Remote {
            name: self.name.clone(),
            urls: RwLock::new((self.fetch_url.clone(), self.push_url.clone())),
            lifecycle: Lifecycle::default(),
        })
    }

    fn apply(&self, remote: &Remote, _: &mut ObjectMaps) {
        *remote.urls.write().unwrap_or_else(PoisonError::into_inner) =
            (self.fetch_url.clone(), self.push_url.clone());
    }
}
