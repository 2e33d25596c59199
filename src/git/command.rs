//! Command model: a git subcommand plus its ordered arguments, optionally
//! preceded by `-c key=value` overrides.
//!
//! Arguments are passed to the process as an argv vector, so no quoting is
//! applied on the way in. The `Display` projection quotes each token the way a
//! POSIX shell would need it, which makes logged commands copy-pasteable and
//! lets `split_command_line` recover the exact argv.
//!
//! Specialized argument sets live in the factory submodules (`config`,
//! `refs`, `remote`, `log`, `diff`, `rev_parse`) so call sites never assemble
//! raw strings.

use std::borrow::Cow;
use std::fmt;

use crate::error::{GitError, Result};

/// Characters that force a token to be quoted in the display form.
const SHELL_SPECIAL: &[char] = &[
    '"', '\'', '\\', '$', '`', '&', '|', ';', '<', '>', '(', ')', '*', '?', '[', ']', '#', '~',
    '!', '{', '}',
];

/// Characters escaped with a backslash inside double quotes.
const ESCAPED_IN_QUOTES: &[char] = &['"', '\\', '$', '`'];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandArgument(String);

impl CommandArgument {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Argument whose value must not be empty; `what` names it in the error.
    pub fn required(value: impl Into<String>, what: &str) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(GitError::InvalidArgument(format!("{} must not be empty", what)));
        }
        Ok(Self(value))
    }

    /// Positional value (revision, parameter or section name). Rejects empty
    /// values and values git would read as an option.
    pub fn operand(value: impl Into<String>, what: &str) -> Result<Self> {
        let value = value.into();
        if value.starts_with('-') {
            return Err(GitError::InvalidArgument(format!(
                "{} must not start with '-': {}",
                what, value
            )));
        }
        Self::required(value, what)
    }

    /// `--name`
    pub fn flag(name: &str) -> Self {
        Self(format!("--{}", name))
    }

    /// `--name=value`
    pub fn option(name: &str, value: impl fmt::Display) -> Self {
        Self(format!("--{}={}", name, value))
    }

    /// `--` separating revisions from paths.
    pub fn no_more_options() -> Self {
        Self("--".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shell-safe rendering of this token.
    pub fn quoted(&self) -> Cow<'_, str> {
        quote(&self.0)
    }
}

impl fmt::Display for CommandArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

impl From<&str> for CommandArgument {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CommandArgument {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A git subcommand with its arguments. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// `-c key=value` pairs placed before the subcommand.
    overrides: Vec<CommandArgument>,
    name: String,
    args: Vec<CommandArgument>,
}

impl Command {
    pub fn new(name: &str, args: Vec<CommandArgument>) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(GitError::InvalidArgument(
                "command name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            overrides: Vec::new(),
            name: name.to_string(),
            args,
        })
    }

    /// Same command run with `git -c key=value`.
    pub fn with_override(mut self, key: &str, value: &str) -> Self {
        self.overrides.push(CommandArgument::new("-c"));
        self.overrides
            .push(CommandArgument::new(format!("{}={}", key, value)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[CommandArgument] {
        &self.args
    }

    /// The exact argv tail handed to the process: overrides, subcommand,
    /// arguments.
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        self.overrides
            .iter()
            .map(|a| a.as_str())
            .chain(std::iter::once(self.name.as_str()))
            .chain(self.args.iter().map(|a| a.as_str()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for arg in &self.overrides {
            write!(f, "{} ", arg)?;
        }
        f.write_str(&quote(&self.name))?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

fn quote(value: &str) -> Cow<'_, str> {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || SHELL_SPECIAL.contains(&c));
    if !needs_quotes {
        return Cow::Borrowed(value);
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if ESCAPED_IN_QUOTES.contains(&c) {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

/// Split a command line into tokens following POSIX shell quoting rules
/// (no expansion). Inverse of the `Display` form of `Command`.
pub fn split_command_line(line: &str) -> Result<Vec<String>> {
    #[derive(PartialEq)]
    enum State {
        Between,
        Bare,
        Single,
        Double,
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = State::Between;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Between | State::Bare => match c {
                c if c.is_whitespace() => {
                    if state == State::Bare {
                        tokens.push(std::mem::take(&mut current));
                        state = State::Between;
                    }
                }
                '\'' => state = State::Single,
                '"' => state = State::Double,
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                    state = State::Bare;
                }
                c => {
                    current.push(c);
                    state = State::Bare;
                }
            },
            State::Single => match c {
                '\'' => state = State::Bare,
                c => current.push(c),
            },
            State::Double => match c {
                '"' => state = State::Bare,
                '\\' => match chars.peek() {
                    Some(&next) if ESCAPED_IN_QUOTES.contains(&next) || next == '\n' => {
                        chars.next();
                        current.push(next);
                    }
                    _ => current.push('\\'),
                },
                c => current.push(c),
            },
        }
    }

    match state {
        State::Single | State::Double => Err(GitError::InvalidArgument(format!(
            "unterminated quote in: {}",
            line
        ))),
        State::Bare => {
            tokens.push(current);
            Ok(tokens)
        }
        State::Between => Ok(tokens),
    }
}

/// Arguments for `git config`.
pub mod config {
    use super::{Command, CommandArgument};
    use crate::error::Result;

    pub fn command(args: Vec<CommandArgument>) -> Result<Command> {
        Command::new("config", args)
    }

    pub fn file(path: &str) -> Vec<CommandArgument> {
        vec![CommandArgument::flag("file"), CommandArgument::new(path)]
    }

    pub fn global() -> CommandArgument {
        CommandArgument::flag("global")
    }

    pub fn system() -> CommandArgument {
        CommandArgument::flag("system")
    }

    pub fn null_terminate() -> CommandArgument {
        CommandArgument::flag("null")
    }

    pub fn list() -> CommandArgument {
        CommandArgument::flag("list")
    }

    pub fn get() -> CommandArgument {
        CommandArgument::flag("get")
    }

    pub fn add() -> CommandArgument {
        CommandArgument::flag("add")
    }

    pub fn unset() -> CommandArgument {
        CommandArgument::flag("unset")
    }

    pub fn rename_section(old_name: &str, new_name: &str) -> Vec<CommandArgument> {
        vec![
            CommandArgument::flag("rename-section"),
            CommandArgument::new(old_name),
            CommandArgument::new(new_name),
        ]
    }

    pub fn remove_section(name: &str) -> Vec<CommandArgument> {
        vec![
            CommandArgument::flag("remove-section"),
            CommandArgument::new(name),
        ]
    }
}

/// Arguments for `git show-ref`.
pub mod refs {
    use super::{Command, CommandArgument};
    use crate::error::Result;

    /// `git show-ref --tags --dereference`
    pub fn list_tags() -> Result<Command> {
        Command::new(
            "show-ref",
            vec![
                CommandArgument::flag("tags"),
                CommandArgument::flag("dereference"),
            ],
        )
    }
}

/// Arguments for `git remote`.
pub mod remote {
    use super::{Command, CommandArgument};
    use crate::error::Result;

    /// `git remote -v`
    pub fn list_verbose() -> Result<Command> {
        Command::new("remote", vec![CommandArgument::new("-v")])
    }
}

/// Arguments for `git log`.
pub mod log {
    use super::{Command, CommandArgument};
    use crate::error::Result;

    /// Newline-separated fields, NUL-separated records (with `-z`).
    pub const RECORD_FORMAT: &str = "%H%n%P%n%an%n%ae%n%at%n%s";

    pub fn revisions(revision: &str, limit: usize) -> Result<Command> {
        Command::new(
            "log",
            vec![
                CommandArgument::new("-z"),
                CommandArgument::option("format", RECORD_FORMAT),
                CommandArgument::option("max-count", limit),
                CommandArgument::operand(revision, "revision")?,
                CommandArgument::no_more_options(),
            ],
        )
    }
}

/// Arguments for `git diff`.
pub mod diff {
    use super::{Command, CommandArgument};
    use crate::error::Result;

    fn base_args() -> Vec<CommandArgument> {
        vec![
            CommandArgument::flag("no-color"),
            CommandArgument::flag("no-ext-diff"),
            CommandArgument::new("-M"),
        ]
    }

    /// Diff between two revisions, or `to` against its first parent when
    /// `from` is absent.
    pub fn revisions(from: Option<&str>, to: &str, path: Option<&str>) -> Result<Command> {
        let to = CommandArgument::operand(to, "to revision")?;
        let mut args = base_args();
        match from {
            Some(from) => {
                args.push(CommandArgument::operand(from, "from revision")?);
                args.push(to);
            }
            None => args.push(CommandArgument::new(format!("{}^!", to.as_str()))),
        }
        push_path(&mut args, path);
        command(args)
    }

    /// Working tree against the index, or the index against HEAD when `cached`.
    pub fn working_tree(cached: bool, path: Option<&str>) -> Result<Command> {
        let mut args = base_args();
        if cached {
            args.push(CommandArgument::flag("cached"));
        }
        push_path(&mut args, path);
        command(args)
    }

    /// Paths come back unescaped unless they contain quotes or control
    /// characters.
    fn command(args: Vec<CommandArgument>) -> Result<Command> {
        Ok(Command::new("diff", args)?.with_override("core.quotepath", "false"))
    }

    fn push_path(args: &mut Vec<CommandArgument>, path: Option<&str>) {
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            args.push(CommandArgument::no_more_options());
            args.push(CommandArgument::new(path));
        }
    }
}

/// Arguments for `git rev-parse` and `git symbolic-ref`.
pub mod rev_parse {
    use super::{Command, CommandArgument};
    use crate::error::Result;

    pub fn git_dir() -> Result<Command> {
        Command::new("rev-parse", vec![CommandArgument::flag("git-dir")])
    }

    pub fn is_bare() -> Result<Command> {
        Command::new(
            "rev-parse",
            vec![CommandArgument::flag("is-bare-repository")],
        )
    }

    pub fn current_branch() -> Result<Command> {
        Command::new(
            "symbolic-ref",
            vec![
                CommandArgument::flag("short"),
                CommandArgument::new("-q"),
                CommandArgument::new("HEAD"),
            ],
        )
    }
}

/// `git --version`, run as a repository-less command.
pub fn version() -> Result<Command> {
    Command::new("--version", Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_argv_for_plain_tokens() {
        let cmd = Command::new("config", vec![config::null_terminate(), config::list()]).unwrap();
        assert_eq!(cmd.to_string(), "config --null --list");
        assert_eq!(
            cmd.argv().collect::<Vec<_>>(),
            vec!["config", "--null", "--list"]
        );
    }

    #[test]
    fn whitespace_and_quotes_are_quoted() {
        let arg = CommandArgument::new("John \"JD\" Doe");
        assert_eq!(arg.to_string(), r#""John \"JD\" Doe""#);
        assert_eq!(CommandArgument::new("").to_string(), "\"\"");
        assert_eq!(CommandArgument::new("a$b").to_string(), r#""a\$b""#);
    }

    #[test]
    fn split_recovers_quoted_command() {
        let cmd = Command::new(
            "config",
            vec![
                CommandArgument::new("user.name"),
                CommandArgument::new("John Doe"),
                CommandArgument::new(""),
            ],
        )
        .unwrap();
        let tokens = split_command_line(&cmd.to_string()).unwrap();
        assert_eq!(tokens, vec!["config", "user.name", "John Doe", ""]);
    }

    #[test]
    fn split_handles_single_quotes_and_escapes() {
        let tokens = split_command_line(r#"log 'a b' c\ d "e\"f""#).unwrap();
        assert_eq!(tokens, vec!["log", "a b", "c d", "e\"f"]);
        assert!(split_command_line("log 'open").is_err());
    }

    #[test]
    fn empty_required_values_are_rejected() {
        assert!(Command::new("  ", Vec::new()).is_err());
        assert!(CommandArgument::required("", "parameter name").is_err());
        assert!(log::revisions("", 10).is_err());
    }

    #[test]
    fn diff_against_parent_uses_caret_bang() {
        let cmd = diff::revisions(None, "HEAD", Some("src/a b.rs")).unwrap();
        assert_eq!(
            cmd.to_string(),
            r#"-c core.quotepath=false diff --no-color --no-ext-diff -M "HEAD^!" -- "src/a b.rs""#
        );
        assert_eq!(
            cmd.argv().take(3).collect::<Vec<_>>(),
            vec!["-c", "core.quotepath=false", "diff"]
        );
    }

    #[test]
    fn option_like_revisions_are_rejected() {
        for bad in ["--output=/tmp/x", "-p"] {
            assert!(matches!(
                log::revisions(bad, 5),
                Err(GitError::InvalidArgument(_))
            ));
            assert!(matches!(
                diff::revisions(None, bad, None),
                Err(GitError::InvalidArgument(_))
            ));
            assert!(matches!(
                diff::revisions(Some(bad), "HEAD", None),
                Err(GitError::InvalidArgument(_))
            ));
        }
        assert!(diff::revisions(Some("main"), "HEAD~1", Some("-weird-path")).is_ok());
        assert!(log::revisions("HEAD@{-1}", 1).is_ok());
    }
}
