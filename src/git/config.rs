//! `git config` operations.
//!
//! The free functions run against any `CommandExecutor` (repository-less
//! executors work for `--global`/`--system`). `GitRepository` wraps them and
//! reconciles results into its registry.
//!
//! Listing output comes in two layouts, detected per buffer:
//! - git's `--null --list`: `name\nvalue\0` per entry, `name\0` for
//!   valueless keys; the buffer ends with NUL
//! - line records `name\0value\n`; the buffer ends with a newline

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::git::command::{self, CommandArgument};
use crate::git::exit::CommandFamily;
use crate::git::executor::CommandExecutor;
use crate::git::parser::GitParser;
use crate::git::repository::GitRepository;
use crate::models::{ConfigFile, ConfigParameter, ConfigParameterData};

fn file_args(file: &ConfigFile) -> Vec<CommandArgument> {
    match file {
        ConfigFile::Repository => Vec::new(),
        ConfigFile::User => vec![command::config::global()],
        ConfigFile::System => vec![command::config::system()],
        ConfigFile::Other(path) => command::config::file(path),
    }
}

/// Query a single parameter. `None` when it is not set.
pub fn query_parameter<E: CommandExecutor + ?Sized>(
    executor: &E,
    file: &ConfigFile,
    name: &str,
) -> Result<Option<ConfigParameterData>> {
    let mut args = file_args(file);
    args.push(command::config::get());
    args.push(CommandArgument::operand(name, "config parameter name")?);

    let output = executor.exec(&command::config::command(args)?)?;
    match output.exit_code {
        0 => {
            let value = output.stdout.trim_end_matches('\n');
            Ok(Some(ConfigParameterData::new(name, value, file.clone())?))
        }
        1 => Ok(None),
        _ => {
            CommandFamily::Config(name).check(&output)?;
            Ok(None)
        }
    }
}

/// List every parameter of one configuration scope.
///
/// A failing listing of a standard scope (missing `~/.gitconfig`, no system
/// file) yields an empty list; for an explicit file it is an error.
pub fn query_config<E: CommandExecutor + ?Sized>(
    executor: &E,
    file: &ConfigFile,
) -> Result<Vec<ConfigParameterData>> {
    let mut args = vec![command::config::null_terminate(), command::config::list()];
    args.extend(file_args(file));

    let output = executor.exec(&command::config::command(args)?)?;
    if !output.is_success() && !matches!(file, ConfigFile::Other(_)) {
        return Ok(Vec::new());
    }
    CommandFamily::Config(&file.to_string()).check(&output)?;

    Ok(parse_config_list(&output.stdout, file))
}

pub fn add_value<E: CommandExecutor + ?Sized>(
    executor: &E,
    file: &ConfigFile,
    name: &str,
    value: &str,
) -> Result<()> {
    let mut args = file_args(file);
    args.push(command::config::add());
    args.push(CommandArgument::operand(name, "config parameter name")?);
    args.push(CommandArgument::new(value));

    let output = executor.exec(&command::config::command(args)?)?;
    CommandFamily::Config(name).check(&output)?;
    Ok(())
}

pub fn set_value<E: CommandExecutor + ?Sized>(
    executor: &E,
    file: &ConfigFile,
    name: &str,
    value: &str,
) -> Result<()> {
    let mut args = file_args(file);
    args.push(CommandArgument::operand(name, "config parameter name")?);
    args.push(CommandArgument::new(value));

    let output = executor.exec(&command::config::command(args)?)?;
    CommandFamily::Config(name).check(&output)?;
    Ok(())
}

pub fn unset_value<E: CommandExecutor + ?Sized>(
    executor: &E,
    file: &ConfigFile,
    name: &str,
) -> Result<()> {
    let mut args = file_args(file);
    args.push(command::config::unset());
    args.push(CommandArgument::operand(name, "config parameter name")?);

    let output = executor.exec(&command::config::command(args)?)?;
    CommandFamily::Config(name).check(&output)?;
    Ok(())
}

pub fn rename_section<E: CommandExecutor + ?Sized>(
    executor: &E,
    file: &ConfigFile,
    old_name: &str,
    new_name: &str,
) -> Result<()> {
    CommandArgument::operand(old_name, "section name")?;
    CommandArgument::operand(new_name, "section name")?;
    let mut args = file_args(file);
    args.extend(command::config::rename_section(old_name, new_name));

    let output = executor.exec(&command::config::command(args)?)?;
    CommandFamily::Config(old_name).check(&output)?;
    Ok(())
}

pub fn remove_section<E: CommandExecutor + ?Sized>(
    executor: &E,
    file: &ConfigFile,
    name: &str,
) -> Result<()> {
    CommandArgument::operand(name, "section name")?;
    let mut args = file_args(file);
    args.extend(command::config::remove_section(name));

    let output = executor.exec(&command::config::command(args)?)?;
    CommandFamily::Config(name).check(&output)?;
    Ok(())
}

/// Parse a config listing in either layout. Names are trimmed; records with
/// an empty name are skipped.
pub fn parse_config_list(text: &str, file: &ConfigFile) -> Vec<ConfigParameterData> {
    let nul_terminated = text
        .trim_end_matches(|c: char| c.is_whitespace())
        .ends_with('\0');

    let mut parser = GitParser::new(text);
    let mut parameters = Vec::new();
    loop {
        parser.skip_whitespace();
        if parser.is_at_end() {
            break;
        }

        let (name, value) = if nul_terminated {
            match parser.next_delimiter(&['\n', '\0']) {
                Some('\n') => {
                    let name = parser.read_line();
                    (name, parser.read_until_nul())
                }
                // Valueless key, e.g. `[core] bare` without `= value`.
                _ => (parser.read_until_nul(), ""),
            }
        } else {
            let name = parser.read_until_nul();
            (name, parser.read_line())
        };

        let name = name.trim();
        if let Ok(parameter) = ConfigParameterData::new(name, value, file.clone()) {
            parameters.push(parameter);
        }
    }
    parameters
}

impl GitRepository {
    /// Effective configuration of this repository, reconciled into the
    /// registry. Parameters no longer present are deleted. For multi-valued
    /// keys the last value wins, as in git.
    pub fn config(&self) -> Result<Vec<Arc<ConfigParameter>>> {
        let records = query_config(self.executor(), &ConfigFile::Repository)?;
        let parameters = self.objects().refresh(&records)?;
        info!("Config refreshed: {} parameters", parameters.len());
        Ok(parameters)
    }

    pub fn config_parameter(&self, name: &str) -> Result<Option<Arc<ConfigParameter>>> {
        match query_parameter(self.executor(), &ConfigFile::Repository, name)? {
            Some(record) => Ok(Some(self.objects().reconcile(&record)?)),
            None => {
                self.objects().remove::<ConfigParameter>(name)?;
                Ok(None)
            }
        }
    }

    /// Set a value in the repository's own config file.
    pub fn set_config(&self, name: &str, value: &str) -> Result<Arc<ConfigParameter>> {
        set_value(self.executor(), &ConfigFile::Repository, name, value)?;
        let record = ConfigParameterData::new(name, value, ConfigFile::Repository)?;
        self.objects().reconcile(&record)
    }

    pub fn add_config(&self, name: &str, value: &str) -> Result<Arc<ConfigParameter>> {
        add_value(self.executor(), &ConfigFile::Repository, name, value)?;
        let record = ConfigParameterData::new(name, value, ConfigFile::Repository)?;
        self.objects().reconcile(&record)
    }

    pub fn unset_config(&self, name: &str) -> Result<()> {
        unset_value(self.executor(), &ConfigFile::Repository, name)?;
        self.objects().remove::<ConfigParameter>(name)?;
        Ok(())
    }

    pub fn rename_config_section(&self, old_name: &str, new_name: &str) -> Result<()> {
        rename_section(self.executor(), &ConfigFile::Repository, old_name, new_name)?;
        self.config()?;
        Ok(())
    }

    pub fn remove_config_section(&self, name: &str) -> Result<()> {
        remove_section(self.executor(), &ConfigFile::Repository, name)?;
        self.config()?;
        Ok(())
    }
}
