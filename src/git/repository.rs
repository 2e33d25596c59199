use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{GitError, Result};
use crate::git::cache::ObjectRegistry;
use crate::git::command::{self, Command};
use crate::git::context::GitContext;
use crate::git::executor::{CommandExecutor, RepositoryCommandExecutor};
use crate::git::process::{AsyncHandle, ExecObserver, ExecOutput};
use crate::models::RepositoryInfo;

/// One opened repository: its executor plus its object registry.
///
/// The registry lives exactly as long as the repository; `close` tears it
/// down and invalidates every entity handed out.
pub struct GitRepository {
    path: PathBuf,
    context: Arc<GitContext>,
    executor: RepositoryCommandExecutor,
    objects: ObjectRegistry,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P, context: Arc<GitContext>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let path_str = path.to_string_lossy().to_string();
        if !path.is_dir() {
            return Err(GitError::RepoNotFound(path_str));
        }

        let executor = RepositoryCommandExecutor::new(&path, context.process());
        let output = executor.exec(&command::rev_parse::git_dir()?)?;
        if !output.is_success() {
            return Err(GitError::RepoNotFound(path_str));
        }

        Ok(Self {
            path,
            context,
            executor,
            objects: ObjectRegistry::new(),
        })
    }

    /// Whether `path` is inside a git working tree or git directory.
    pub fn is_valid(path: &Path, context: &GitContext) -> bool {
        if !path.is_dir() {
            return false;
        }
        let executor = RepositoryCommandExecutor::new(path, context.process());
        command::rev_parse::git_dir()
            .and_then(|cmd| executor.exec(&cmd))
            .map(|output| output.is_success())
            .unwrap_or(false)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn context(&self) -> &GitContext {
        &self.context
    }

    pub fn executor(&self) -> &RepositoryCommandExecutor {
        &self.executor
    }

    pub fn objects(&self) -> &ObjectRegistry {
        &self.objects
    }

    /// Run an arbitrary command in this repository.
    pub fn exec(&self, command: &Command) -> Result<ExecOutput> {
        self.executor.exec(command)
    }

    pub fn exec_async(
        &self,
        command: &Command,
        observer: Arc<dyn ExecObserver>,
    ) -> Result<AsyncHandle> {
        self.executor.exec_async(command, observer)
    }

    pub fn info(&self) -> Result<RepositoryInfo> {
        let name = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone())
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let branch = self.exec(&command::rev_parse::current_branch()?)?;
        let head_branch = branch
            .is_success()
            .then(|| branch.stdout.trim().to_string())
            .filter(|b| !b.is_empty());

        let head_commit = match self.get_revision("HEAD") {
            Ok(Some(revision)) => Some(revision.detail()?),
            _ => None,
        };

        let bare = self.exec(&command::rev_parse::is_bare()?)?;
        let is_bare = bare.is_success() && bare.stdout.trim() == "true";

        Ok(RepositoryInfo {
            name,
            path: self.path.to_string_lossy().to_string(),
            head_branch,
            head_commit,
            is_bare,
            git_version: self.context.version().ok().map(|v| v.to_string()),
            objects: self.objects.stats()?,
        })
    }

    /// Teardown: unregister and invalidate every entity.
    pub fn close(&self) -> Result<()> {
        self.objects.clear()
    }
}

pub fn format_relative_time(timestamp: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let diff = now - timestamp;

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        let mins = diff / 60;
        format!("{} minute{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if diff < 86400 {
        let hours = diff / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if diff < 2592000 {
        let days = diff / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else if diff < 31536000 {
        let months = diff / 2592000;
        format!("{} month{} ago", months, if months == 1 { "" } else { "s" })
    } else {
        let years = diff / 31536000;
        format!("{} year{} ago", years, if years == 1 { "" } else { "s" })
    }
}

pub type SharedRepo = Arc<GitRepository>;
