//! Submodules declared in `.gitmodules`, read through `git config --file`.

use std::sync::Arc;

use crate::error::Result;
use crate::git::config::query_config;
use crate::git::repository::GitRepository;
use crate::models::{ConfigFile, ConfigParameterData, Submodule, SubmoduleData};

pub const GITMODULES: &str = ".gitmodules";

/// Group `submodule.<name>.<key>` parameters by submodule name. Names may
/// themselves contain dots. Order of first appearance is kept.
pub fn submodules_from_config(parameters: &[ConfigParameterData]) -> Vec<SubmoduleData> {
    let mut submodules: Vec<SubmoduleData> = Vec::new();

    for parameter in parameters {
        let Some(rest) = parameter.name.strip_prefix("submodule.") else {
            continue;
        };
        let Some((name, key)) = rest.rsplit_once('.') else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let index = match submodules.iter().position(|s| s.name == name) {
            Some(index) => index,
            None => {
                submodules.push(SubmoduleData {
                    name: name.to_string(),
                    ..SubmoduleData::default()
                });
                submodules.len() - 1
            }
        };
        match key {
            "path" => submodules[index].path = Some(parameter.value.clone()),
            "url" => submodules[index].url = Some(parameter.value.clone()),
            _ => {}
        }
    }
    submodules
}

impl GitRepository {
    pub fn submodules(&self) -> Result<Vec<Arc<Submodule>>> {
        let records = if self.path().join(GITMODULES).is_file() {
            let parameters =
                query_config(self.executor(), &ConfigFile::Other(GITMODULES.to_string()))?;
            submodules_from_config(&parameters)
        } else {
            Vec::new()
        };
        self.objects().refresh(&records)
    }
}
