//! Owned access-layer configuration and the cached git version.
//!
//! Nothing here is process-global: a `GitContext` is created by the caller
//! (the CLI, a test) and shared by every repository opened through it.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use crate::error::{GitError, Result};
use crate::git::command;
use crate::git::executor::{CommandExecutor, GlobalCommandExecutor};
use crate::git::parser::GitParser;
use crate::git::process::{GitProcess, TextEncoding};

/// Oldest git release whose CLI contract this layer relies on.
pub const MINIMUM_GIT_VERSION: GitVersion = GitVersion::new(1, 7, 0, 2);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Binary to spawn; resolved through `PATH` when relative.
    pub git_path: PathBuf,
    pub default_encoding: TextEncoding,
    /// Upper bound for synchronous execution. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Variables set on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Log every invocation at info level instead of debug.
    pub log_cli_calls: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            git_path: PathBuf::from("git"),
            default_encoding: TextEncoding::Utf8,
            timeout: Some(DEFAULT_TIMEOUT),
            env: vec![
                ("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()),
                ("LC_ALL".to_string(), "C".to_string()),
            ],
            log_cli_calls: false,
        }
    }
}

/// `major.minor.build.revision`, compared component-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl GitVersion {
    pub const fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    /// Parse `git --version` output, e.g. `git version 2.39.2.windows.1`.
    /// Non-numeric components end the version.
    pub fn parse(output: &str) -> Option<Self> {
        let mut parser = GitParser::new(output.trim());
        parser.skip_prefix("git version ");
        let text = parser.read_line().trim();

        let mut parts = [0u32; 4];
        let mut count = 0;
        for component in text.split('.').take(4) {
            match component.parse::<u32>() {
                Ok(n) => {
                    parts[count] = n;
                    count += 1;
                }
                Err(_) => break,
            }
        }
        if count == 0 {
            return None;
        }
        Some(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

impl fmt::Display for GitVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)?;
        if self.revision != 0 {
            write!(f, ".{}", self.revision)?;
        }
        Ok(())
    }
}

/// Shared state for one access-layer instance.
pub struct GitContext {
    config: Arc<AccessConfig>,
    version: OnceLock<GitVersion>,
}

impl GitContext {
    pub fn new(config: AccessConfig) -> Arc<Self> {
        Arc::new(Self {
            config: Arc::new(config),
            version: OnceLock::new(),
        })
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn process(&self) -> GitProcess {
        GitProcess::new(self.config.clone())
    }

    /// Executor for commands that need no repository.
    pub fn global_executor(&self) -> GlobalCommandExecutor {
        GlobalCommandExecutor::new(self.process())
    }

    /// Installed git version, queried once and cached for this context.
    pub fn version(&self) -> Result<GitVersion> {
        if let Some(version) = self.version.get() {
            return Ok(*version);
        }
        let output = self.global_executor().exec(&command::version()?)?;
        output.check()?;
        let version = GitVersion::parse(&output.stdout).ok_or_else(|| {
            GitError::Internal(format!("Unrecognized version string: {}", output.stdout.trim()))
        })?;
        info!("Detected git {}", version);
        Ok(*self.version.get_or_init(|| version))
    }

    /// Fails with `UnsupportedVersion` when git is older than `MINIMUM_GIT_VERSION`.
    pub fn ensure_supported(&self) -> Result<GitVersion> {
        let version = self.version()?;
        if version < MINIMUM_GIT_VERSION {
            return Err(GitError::UnsupportedVersion {
                found: version.to_string(),
                required: MINIMUM_GIT_VERSION.to_string(),
            });
        }
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_and_vendor_versions() {
        assert_eq!(
            GitVersion::parse("git version 2.39.2\n"),
            Some(GitVersion::new(2, 39, 2, 0))
        );
        assert_eq!(
            GitVersion::parse("git version 2.42.0.windows.2"),
            Some(GitVersion::new(2, 42, 0, 0))
        );
        assert_eq!(
            GitVersion::parse("git version 1.7.0.2.msysgit.0"),
            Some(GitVersion::new(1, 7, 0, 2))
        );
        assert_eq!(GitVersion::parse("not git"), None);
    }

    #[test]
    fn versions_order_component_wise() {
        assert!(GitVersion::new(1, 7, 0, 1) < MINIMUM_GIT_VERSION);
        assert!(GitVersion::new(1, 7, 10, 0) > MINIMUM_GIT_VERSION);
        assert_eq!(MINIMUM_GIT_VERSION.to_string(), "1.7.0.2");
        assert_eq!(GitVersion::new(2, 39, 2, 0).to_string(), "2.39.2");
    }
}
