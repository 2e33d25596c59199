//! Git CLI access layer.
//!
//! - `command`, `process`, `executor`: build and run git invocations
//! - `parser`, `exit`: read their output and classify their exit codes
//! - `cache`: the per-repository object registry
//! - `config`, `refs`, `remotes`, `submodules`, `history`, `diff`: domain
//!   operations, each extending `GitRepository`

pub mod cache;
pub mod command;
pub mod config;
pub mod context;
pub mod diff;
pub mod executor;
pub mod exit;
pub mod history;
pub mod parser;
pub mod process;
pub mod refs;
pub mod remotes;
pub mod repository;
pub mod submodules;

pub use cache::{ObjectRegistry, RegistryStats};
pub use command::{Command, CommandArgument};
pub use context::{AccessConfig, GitContext, GitVersion, MINIMUM_GIT_VERSION};
pub use executor::{CommandExecutor, GlobalCommandExecutor, RepositoryCommandExecutor};
pub use exit::{CommandFamily, Outcome};
pub use parser::GitParser;
pub use process::{
    AsyncHandle, ChannelObserver, ExecEvent, ExecInput, ExecObserver, ExecOutput, GitProcess,
    NullObserver, StreamKind, TextEncoding,
};
pub use repository::{GitRepository, SharedRepo};
