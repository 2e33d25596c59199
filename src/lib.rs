//! Access layer over the git command-line client.
//!
//! Commands are modelled as values, run through a synchronous or streaming
//! process engine, and their output is parsed into records that reconcile
//! into identity-stable entities owned by each opened repository.

pub mod error;
pub mod git;
pub mod models;
pub mod routes;

pub use error::{GitError, Result};
pub use git::{AccessConfig, GitContext, GitRepository, SharedRepo};
