//! Remote listing via `git remote -v`.

use std::sync::Arc;

use crate::error::Result;
use crate::git::command;
use crate::git::exit::CommandFamily;
use crate::git::executor::CommandExecutor;
use crate::git::parser::GitParser;
use crate::git::repository::GitRepository;
use crate::models::{Remote, RemoteData};

pub fn query_remotes<E: CommandExecutor + ?Sized>(executor: &E) -> Result<Vec<RemoteData>> {
    let output = executor.exec(&command::remote::list_verbose()?)?;
    CommandFamily::Generic.check(&output)?;
    Ok(parse_remotes(&output.stdout))
}

/// Lines are `<name>\t<url> (fetch|push)`, one per direction.
pub fn parse_remotes(text: &str) -> Vec<RemoteData> {
    let mut parser = GitParser::new(text);
    let mut remotes: Vec<RemoteData> = Vec::new();

    while !parser.is_at_end() {
        let line = parser.read_line();
        let mut fields = GitParser::new(line);
        let name = fields.read_field('\t').trim();
        if name.is_empty() {
            continue;
        }
        let rest = fields.remaining().trim_end();

        let index = match remotes.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => {
                remotes.push(RemoteData {
                    name: name.to_string(),
                    ..RemoteData::default()
                });
                remotes.len() - 1
            }
        };
        let remote = &mut remotes[index];

        if let Some(url) = rest.strip_suffix(" (push)") {
            remote.push_url = Some(url.to_string());
        } else {
            let url = rest.strip_suffix(" (fetch)").unwrap_or(rest);
            if !url.is_empty() {
                remote.fetch_url = Some(url.to_string());
            }
        }
    }
    remotes
}

impl GitRepository {
    pub fn remotes(&self) -> Result<Vec<Arc<Remote>>> {
        let records = query_remotes(self.executor())?;
        self.objects().refresh(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_fetch_and_push_lines() {
        let text = "origin\thttps://example.com/a.git (fetch)\n\
                    origin\tgit@example.com:a.git (push)\n\
                    mirror\t/srv/mirror with space.git (fetch)\n";
        let remotes = parse_remotes(text);
        assert_eq!(remotes.len(), 2);
        assert_eq!(remotes[0].name, "origin");
        assert_eq!(
            remotes[0].fetch_url.as_deref(),
            Some("https://example.com/a.git")
        );
        assert_eq!(remotes[0].push_url.as_deref(), Some("git@example.com:a.git"));
        assert_eq!(
            remotes[1].fetch_url.as_deref(),
            Some("/srv/mirror with space.git")
        );
        assert_eq!(remotes[1].push_url, None);
    }
}
