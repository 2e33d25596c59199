//! Data transfer records and the domain entities they reconcile into.
//!
//! Records are plain serializable values parsed from one command's output.
//! Entities are the long-lived, registry-owned objects (see `git::cache`).
//! - `config`: ConfigFile, ConfigParameterData, ConfigParameter
//! - `tag`: TagData, TagType, Tag
//! - `revision`: RevisionData, Revision, CommitDetail, AuthorInfo
//! - `submodule`: SubmoduleData, Submodule
//! - `remote`: RemoteData, Remote
//! - `diff`: Diff, DiffFile, DiffHunk, DiffLine (records only)
//! - `repository`: RepositoryInfo

pub mod config;
pub mod diff;
pub mod remote;
pub mod repository;
pub mod revision;
pub mod submodule;
pub mod tag;

pub use config::*;
pub use diff::*;
pub use remote::*;
pub use repository::*;
pub use revision::*;
pub use submodule::*;
pub use tag::*;
