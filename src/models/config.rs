//! Configuration parameter records and entities.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{GitError, Result};
use crate::git::cache::{Entity, Lifecycle, ObjectData, ObjectMaps};

/// Which configuration file a command reads or writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "scope", content = "path")]
pub enum ConfigFile {
    /// Effective configuration of the repository (no file switch).
    Repository,
    /// `--global`
    User,
    /// `--system`
    System,
    /// `--file <path>`
    Other(String),
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFile::Repository => f.write_str("repository"),
            ConfigFile::User => f.write_str("global"),
            ConfigFile::System => f.write_str("system"),
            ConfigFile::Other(path) => write!(f, "file {}", path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigParameterData {
    pub name: String,
    pub value: String,
    pub config_file: ConfigFile,
}

impl ConfigParameterData {
    pub fn new(name: &str, value: &str, config_file: ConfigFile) -> Result<Self> {
        if name.is_empty() {
            return Err(GitError::InvalidArgument(
                "config parameter name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            value: value.to_string(),
            config_file,
        })
    }
}

#[derive(Debug)]
pub struct ConfigParameter {
    name: String,
    config_file: ConfigFile,
    value: RwLock<String>,
    lifecycle: Lifecycle,
}

impl ConfigParameter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config_file(&self) -> &ConfigFile {
        &self.config_file
    }

    pub fn value(&self) -> Result<String> {
        self.ensure_live()?;
        Ok(self
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    pub fn data(&self) -> Result<ConfigParameterData> {
        Ok(ConfigParameterData {
            name: self.name.clone(),
            value: self.value()?,
            config_file: self.config_file.clone(),
        })
    }
}

impl Entity for ConfigParameter {
    const KIND: &'static str = "config parameter";

    fn key(&self) -> &str {
        &self.name
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn slot(maps: &mut ObjectMaps) -> &mut HashMap<String, Arc<Self>> {
        &mut maps.config
    }
}

impl ObjectData for ConfigParameterData {
    type Entity = ConfigParameter;

    fn key(&self) -> &str {
        &self.name
    }

    fn build(&self, _: &mut ObjectMaps) -> Arc<ConfigParameter> {
        Arc::new(ConfigParameter {
            name: self.name.clone(),
            config_file: self.config_file.clone(),
            value: RwLock::new(self.value.clone()),
            lifecycle: Lifecycle::default(),
        })
    }

    fn apply(&self, parameter: &ConfigParameter, _: &mut ObjectMaps) {
        *parameter.value.write().unwrap_or_else(PoisonError::into_inner) = self.value.clone();
    }
}
