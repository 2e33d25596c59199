//! Unified diff output of `git diff`, parsed into `Diff` records.

use tracing::debug;

use crate::error::Result;
use crate::git::command;
use crate::git::exit::CommandFamily;
use crate::git::executor::CommandExecutor;
use crate::git::parser::GitParser;
use crate::git::repository::GitRepository;
use crate::models::{Diff, DiffFile, DiffHunk, DiffLine, DiffStatus, DiffType, LineType};

const DEV_NULL: &str = "/dev/null";

/// A file section being assembled.
struct FileBuilder {
    file: DiffFile,
    mode_changed: bool,
    hunk: Option<HunkBuilder>,
}

struct HunkBuilder {
    hunk: DiffHunk,
    old_line: u32,
    new_line: u32,
    old_remaining: u32,
    new_remaining: u32,
}

impl FileBuilder {
    fn new(header: &str) -> Self {
        let (source, target) = parse_git_header(header);
        Self {
            file: DiffFile {
                source_file: source,
                target_file: target,
                status: DiffStatus::Modified,
                hunks: Vec::new(),
                is_binary: false,
            },
            mode_changed: false,
            hunk: None,
        }
    }

    fn close_hunk(&mut self) {
        if let Some(builder) = self.hunk.take() {
            self.file.hunks.push(builder.hunk);
        }
    }

    fn finish(mut self) -> DiffFile {
        self.close_hunk();
        if self.mode_changed
            && self.file.status == DiffStatus::Modified
            && self.file.hunks.is_empty()
        {
            self.file.status = DiffStatus::ModeChanged;
        }
        self.file
    }

    /// Extended header lines between `diff --git` and the first hunk.
    fn header_line(&mut self, line: &str) {
        if line.starts_with("new file mode") {
            self.file.status = DiffStatus::Added;
            self.file.source_file = None;
        } else if line.starts_with("deleted file mode") {
            self.file.status = DiffStatus::Deleted;
            self.file.target_file = None;
        } else if line.starts_with("old mode") || line.starts_with("new mode") {
            self.mode_changed = true;
        } else if let Some(path) = line.strip_prefix("rename from ") {
            self.file.status = DiffStatus::Renamed;
            self.file.source_file = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("rename to ") {
            self.file.status = DiffStatus::Renamed;
            self.file.target_file = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("copy from ") {
            self.file.status = DiffStatus::Copied;
            self.file.source_file = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("copy to ") {
            self.file.status = DiffStatus::Copied;
            self.file.target_file = Some(unquote(path));
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            self.file.is_binary = true;
        } else if let Some(path) = line.strip_prefix("--- ") {
            self.file.source_file = side_path(path, "a/");
        } else if let Some(path) = line.strip_prefix("+++ ") {
            self.file.target_file = side_path(path, "b/");
        }
    }
}

impl HunkBuilder {
    fn new(line: &str) -> Option<Self> {
        let rest = line.strip_prefix("@@ -")?;
        let (ranges, header) = rest.split_once(" @@")?;
        let (old, new) = ranges.split_once(" +")?;
        let (old_start, old_lines) = parse_range(old)?;
        let (new_start, new_lines) = parse_range(new)?;
        Some(Self {
            hunk: DiffHunk {
                old_start,
                old_lines,
                new_start,
                new_lines,
                header: header.trim().to_string(),
                lines: Vec::new(),
            },
            old_line: old_start,
            new_line: new_start,
            old_remaining: old_lines,
            new_remaining: new_lines,
        })
    }

    fn is_complete(&self) -> bool {
        self.old_remaining == 0 && self.new_remaining == 0
    }

    /// Returns false when the line does not belong to the hunk body.
    fn push(&mut self, line: &str) -> bool {
        let (line_type, content) = match line.chars().next() {
            Some('+') => (LineType::Addition, &line[1..]),
            Some('-') => (LineType::Deletion, &line[1..]),
            Some(' ') => (LineType::Context, &line[1..]),
            // Some tools strip the lone space of empty context lines.
            None if !self.is_complete() => (LineType::Context, ""),
            _ => return false,
        };

        let (old_lineno, new_lineno) = match line_type {
            LineType::Addition => {
                self.new_remaining = self.new_remaining.saturating_sub(1);
                (None, Some(advance(&mut self.new_line)))
            }
            LineType::Deletion => {
                self.old_remaining = self.old_remaining.saturating_sub(1);
                (Some(advance(&mut self.old_line)), None)
            }
            LineType::Context => {
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
                (Some(advance(&mut self.old_line)), Some(advance(&mut self.new_line)))
            }
        };
        self.hunk.lines.push(DiffLine {
            line_type,
            old_lineno,
            new_lineno,
            content: content.to_string(),
        });
        true
    }
}

/// Current line number, advancing the counter.
fn advance(line: &mut u32) -> u32 {
    let current = *line;
    *line = current.saturating_add(1);
    current
}

/// `start[,count]`; a missing count means one line.
fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((range.parse().ok()?, 1)),
    }
}

/// Path as git prints it: C-quoted paths have their escapes (`\t`, `\n`,
/// `\"`, `\\`, octal bytes) decoded, anything else is taken as is.
fn unquote(path: &str) -> String {
    let path = path.trim_end_matches('\t');
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut rest = inner.as_bytes();
    while let Some((&byte, tail)) = rest.split_first() {
        rest = tail;
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        let Some((&escape, tail)) = rest.split_first() else {
            bytes.push(byte);
            break;
        };
        rest = tail;
        match escape {
            b'a' => bytes.push(0x07),
            b'b' => bytes.push(0x08),
            b't' => bytes.push(b'\t'),
            b'n' => bytes.push(b'\n'),
            b'v' => bytes.push(0x0b),
            b'f' => bytes.push(0x0c),
            b'r' => bytes.push(b'\r'),
            b'0'..=b'7' => {
                let mut value = u32::from(escape - b'0');
                for _ in 0..2 {
                    match rest.split_first() {
                        Some((&digit @ b'0'..=b'7', tail)) => {
                            value = value * 8 + u32::from(digit - b'0');
                            rest = tail;
                        }
                        _ => break,
                    }
                }
                bytes.push((value & 0xff) as u8);
            }
            other => bytes.push(other),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Byte offset of the first unescaped `"` in the body of a quoted path.
fn closing_quote(quoted: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in quoted.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(idx),
            _ => {}
        }
    }
    None
}

fn side_path(path: &str, prefix: &str) -> Option<String> {
    let path = unquote(path);
    if path == DEV_NULL {
        return None;
    }
    Some(path.strip_prefix(prefix).map(str::to_string).unwrap_or(path))
}

/// Paths from `diff --git a/<old> b/<new>`.
fn parse_git_header(header: &str) -> (Option<String>, Option<String>) {
    let header = header.trim_start_matches("diff --git ");
    if let Some(rest) = header.strip_prefix('"') {
        if let Some(end) = closing_quote(rest) {
            let old = unquote(&header[..end + 2]);
            let new = unquote(rest[end + 1..].trim());
            return (
                Some(old.trim_start_matches("a/").to_string()),
                Some(new.trim_start_matches("b/").to_string()),
            );
        }
    }
    match header.find(" b/").or_else(|| header.find(" \"b/")) {
        Some(idx) => (
            Some(header[..idx].trim_start_matches("a/").to_string()),
            Some(unquote(&header[idx + 1..]).trim_start_matches("b/").to_string()),
        ),
        None => (None, None),
    }
}

/// Parse `git diff` output. Lines outside any file section are ignored.
pub fn parse_diff(text: &str, diff_type: DiffType) -> Diff {
    let mut diff = Diff::new(diff_type);
    let mut parser = GitParser::new(text);
    let mut current: Option<FileBuilder> = None;

    while !parser.is_at_end() {
        let line = parser.read_line();

        if line.starts_with("diff --git ") {
            if let Some(builder) = current.take() {
                diff.files.push(builder.finish());
            }
            current = Some(FileBuilder::new(line));
            continue;
        }
        let Some(builder) = current.as_mut() else {
            continue;
        };

        if line.starts_with("@@ ") {
            builder.close_hunk();
            builder.hunk = HunkBuilder::new(line);
            if builder.hunk.is_none() {
                debug!("Malformed hunk header: {}", line);
            }
            continue;
        }
        if line.starts_with('\\') {
            // "\ No newline at end of file"
            continue;
        }

        let consumed = match builder.hunk.as_mut() {
            Some(hunk) => hunk.push(line),
            None => false,
        };
        if !consumed {
            builder.close_hunk();
            builder.header_line(line);
        }
    }
    if let Some(builder) = current {
        diff.files.push(builder.finish());
    }
    diff
}

pub fn query_diff<E: CommandExecutor + ?Sized>(
    executor: &E,
    command: &command::Command,
    diff_type: DiffType,
) -> Result<Diff> {
    let output = executor.exec(command)?;
    CommandFamily::Generic.check(&output)?;
    Ok(parse_diff(&output.stdout, diff_type))
}

impl GitRepository {
    /// Diff between two revisions; without `from`, `to` against its parent.
    pub fn get_diff(&self, from: Option<&str>, to: &str, path: Option<&str>) -> Result<Diff> {
        let command = command::diff::revisions(from, to, path)?;
        query_diff(self.executor(), &command, DiffType::Revisions)
    }

    /// Unstaged changes, or staged ones when `cached`.
    pub fn get_working_tree_diff(&self, cached: bool, path: Option<&str>) -> Result<Diff> {
        let command = command::diff::working_tree(cached, path)?;
        let diff_type = if cached {
            DiffType::Staged
        } else {
            DiffType::WorkingTree
        };
        query_diff(self.executor(), &command, diff_type)
    }
}
