//! Diff-related records.
//!
//! - `Diff`: ordered per-file patches parsed from one `git diff` run
//! - `DiffFile`: single file's changes with hunks
//! - `DiffHunk`: contiguous block of changes with context
//! - `DiffLine`: single line (addition, deletion, or context)
//!
//! Diffs are plain records; they are not reconciled into the registry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffType {
    /// Between two revisions, or a revision and its parent.
    Revisions,
    /// Working tree against the index.
    WorkingTree,
    /// Index against HEAD.
    Staged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff {
    pub diff_type: DiffType,
    pub files: Vec<DiffFile>,
}

impl Diff {
    pub fn new(diff_type: DiffType) -> Self {
        Self {
            diff_type,
            files: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Look up a file by path: deleted files by their source path, all
    /// others by their target path.
    pub fn file(&self, path: &str) -> Option<&DiffFile> {
        self.files.iter().find(|f| f.path() == Some(path))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiffFile> {
        self.files.iter()
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats::default();
        for file in &self.files {
            let file_stats = file.stats();
            stats.files_changed += 1;
            stats.insertions += file_stats.insertions;
            stats.deletions += file_stats.deletions;
        }
        stats
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = &'a DiffFile;
    type IntoIter = std::slice::Iter<'a, DiffFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFile {
    pub source_file: Option<String>,
    pub target_file: Option<String>,
    pub status: DiffStatus,
    pub hunks: Vec<DiffHunk>,
    pub is_binary: bool,
}

impl DiffFile {
    pub fn path(&self) -> Option<&str> {
        match self.status {
            DiffStatus::Deleted => self.source_file.as_deref(),
            _ => self.target_file.as_deref(),
        }
    }

    pub fn stats(&self) -> DiffStats {
        let mut stats = DiffStats {
            files_changed: 1,
            ..DiffStats::default()
        };
        for line in self.hunks.iter().flat_map(|h| &h.lines) {
            match line.line_type {
                LineType::Addition => stats.insertions += 1,
                LineType::Deletion => stats.deletions += 1,
                LineType::Context => {}
            }
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    ModeChanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    pub header: String,
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub line_type: LineType,
    pub old_lineno: Option<u32>,
    pub new_lineno: Option<u32>,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Context,
    Addition,
    Deletion,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}
