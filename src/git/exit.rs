//! Exit-code classification per command family.
//!
//! The same numeric code means different things for different subcommands,
//! so each family carries its own table. Codes a family does not recognize
//! fall through to `GitError::Failed` with stderr (or stdout) as the message.

use crate::error::{GitError, Result};
use crate::git::process::ExecOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// The command ran fine but matched nothing (e.g. `show-ref` with no refs).
    Empty,
}

#[derive(Debug, Clone, Copy)]
pub enum CommandFamily<'a> {
    /// `git config`; the argument names the parameter or section concerned.
    Config(&'a str),
    /// `git show-ref`: 1 means no matching refs.
    ShowRef,
    Generic,
}

impl CommandFamily<'_> {
    pub fn check(self, output: &ExecOutput) -> Result<Outcome> {
        if output.exit_code == 0 {
            return Ok(Outcome::Success);
        }
        match (self, output.exit_code) {
            (CommandFamily::Config(target), code @ 1..=5) => Err(config_error(code, target)),
            (CommandFamily::ShowRef, 1) => Ok(Outcome::Empty),
            _ => Err(output.failure()),
        }
    }
}

fn config_error(code: i32, target: &str) -> GitError {
    let target = target.to_string();
    match code {
        1 => GitError::InvalidConfigFile { target },
        2 => GitError::CannotWriteConfigFile { target },
        3 => GitError::NoSectionProvided { target },
        4 => GitError::InvalidSectionOrKey { target },
        _ => GitError::ConfigParameterDoesNotExist { target },
    }
}
