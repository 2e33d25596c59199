use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::git::cache::{Entity, Lifecycle, ObjectData, ObjectMaps};

/// One `[submodule "<name>"]` section of `.gitmodules`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmoduleData {
    pub name: String,
    pub path: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SubmoduleInfo {
    path: Option<String>,
    url: Option<String>,
}

#[derive(Debug)]
pub struct Submodule {
    name: String,
    info: RwLock<SubmoduleInfo>,
    lifecycle: Lifecycle,
}

impl Submodule {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Result<Option<String>> {
        self.ensure_live()?;
        Ok(self.info.read().unwrap_or_else(PoisonError::into_inner).path.clone())
    }

    pub fn url(&self) -> Result<Option<String>> {
        self.ensure_live()?;
        Ok(self.info.read().unwrap_or_else(PoisonError::into_inner).url.clone())
    }

    pub fn data(&self) -> Result<SubmoduleData> {
        self.ensure_live()?;
        let info = self.info.read().unwrap_or_else(PoisonError::into_inner);
        Ok(SubmoduleData {
            name: self.name.clone(),
            path: info.path.clone(),
            url: info.url.clone(),
        })
    }
}

impl Entity for Submodule {
    const KIND: &'static str = "submodule";

    fn key(&self) -> &str {
        &self.name
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn slot(maps: &mut ObjectMaps) -> &mut HashMap<String, Arc<Self>> {
        &mut maps.submodules
    }
}

impl ObjectData for SubmoduleData {
    type Entity = Submodule;

    fn key(&self) -> &str {
        &self.name
    }

    fn build(&self, _: &mut ObjectMaps) -> Arc<Submodule> {
        Arc::new(Submodule {
            name: self.name.clone(),
            info: RwLock::new(SubmoduleInfo {
                path: self.path.clone(),
                url: self.url.clone(),
            }),
            lifecycle: Lifecycle::default(),
        })
    }

    fn apply(&self, submodule: &Submodule, _: &mut ObjectMaps) {
        *submodule.info.write().unwrap_or_else(PoisonError::into_inner) = SubmoduleInfo {
            path: self.path.clone(),
            url: self.url.clone(),
        };
    }
}
