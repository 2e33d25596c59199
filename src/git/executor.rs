//! Command executors: bind a `GitProcess` to a working directory.
//!
//! Domain operations (config, tags, ...) take `&impl CommandExecutor` so they
//! can run against a repository, against no repository at all, or against a
//! scripted executor in tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::Result;
use crate::git::command::Command;
use crate::git::process::{
    AsyncHandle, ExecInput, ExecObserver, ExecOutput, GitProcess, TextEncoding,
};

pub trait CommandExecutor: Send + Sync {
    fn exec_with_encoding(&self, command: &Command, encoding: TextEncoding) -> Result<ExecOutput>;

    fn exec_async_with_encoding(
        &self,
        command: &Command,
        encoding: TextEncoding,
        observer: Arc<dyn ExecObserver>,
    ) -> Result<AsyncHandle>;

    fn default_encoding(&self) -> TextEncoding {
        TextEncoding::default()
    }

    fn exec(&self, command: &Command) -> Result<ExecOutput> {
        self.exec_with_encoding(command, self.default_encoding())
    }

    fn exec_async(
        &self,
        command: &Command,
        observer: Arc<dyn ExecObserver>,
    ) -> Result<AsyncHandle> {
        self.exec_async_with_encoding(command, self.default_encoding(), observer)
    }
}

/// Runs every command inside one repository's working directory.
#[derive(Debug, Clone)]
pub struct RepositoryCommandExecutor {
    working_dir: PathBuf,
    process: GitProcess,
}

impl RepositoryCommandExecutor {
    pub fn new(working_dir: impl Into<PathBuf>, process: GitProcess) -> Self {
        Self {
            working_dir: working_dir.into(),
            process,
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

impl CommandExecutor for RepositoryCommandExecutor {
    fn exec_with_encoding(&self, command: &Command, encoding: TextEncoding) -> Result<ExecOutput> {
        self.process
            .exec(&ExecInput::new(&self.working_dir, command.clone(), encoding))
    }

    fn exec_async_with_encoding(
        &self,
        command: &Command,
        encoding: TextEncoding,
        observer: Arc<dyn ExecObserver>,
    ) -> Result<AsyncHandle> {
        self.process.exec_async(
            &ExecInput::new(&self.working_dir, command.clone(), encoding),
            observer,
        )
    }

    fn default_encoding(&self) -> TextEncoding {
        self.process.config().default_encoding
    }
}

/// Runs repository-less commands (`--version`, `config --global`).
#[derive(Debug, Clone)]
pub struct GlobalCommandExecutor {
    process: GitProcess,
}

impl GlobalCommandExecutor {
    pub fn new(process: GitProcess) -> Self {
        Self { process }
    }
}

impl CommandExecutor for GlobalCommandExecutor {
    fn exec_with_encoding(&self, command: &Command, encoding: TextEncoding) -> Result<ExecOutput> {
        self.process
            .exec(&ExecInput::new(PathBuf::new(), command.clone(), encoding))
    }

    fn exec_async_with_encoding(
        &self,
        command: &Command,
        encoding: TextEncoding,
        observer: Arc<dyn ExecObserver>,
    ) -> Result<AsyncHandle> {
        self.process.exec_async(
            &ExecInput::new(PathBuf::new(), command.clone(), encoding),
            observer,
        )
    }

    fn default_encoding(&self) -> TextEncoding {
        self.process.config().default_encoding
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Executor returning canned outputs and recording the commands it saw.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::error::GitError;

    #[derive(Default)]
    pub struct ScriptedExecutor {
        outputs: Mutex<VecDeque<ExecOutput>>,
        pub seen: Mutex<Vec<String>>,
    }

    impl ScriptedExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push(&self, exit_code: i32, stdout: &str, stderr: &str) -> &Self {
            self.outputs.lock().unwrap().push_back(ExecOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            });
            self
        }

        pub fn commands(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl CommandExecutor for ScriptedExecutor {
        fn exec_with_encoding(&self, command: &Command, _: TextEncoding) -> Result<ExecOutput> {
            self.seen.lock().unwrap().push(command.to_string());
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| GitError::Internal(format!("unexpected command: {}", command)))
        }

        fn exec_async_with_encoding(
            &self,
            command: &Command,
            _: TextEncoding,
            _: Arc<dyn ExecObserver>,
        ) -> Result<AsyncHandle> {
            Err(GitError::Internal(format!(
                "async not scripted: {}",
                command
            )))
        }
    }
}
