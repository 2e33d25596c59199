//! Forward-only cursor over decoded git output.
//!
//! Every read consumes up to and including its delimiter. A missing delimiter
//! is not an error: the rest of the buffer becomes the field, so truncated
//! output still yields a final record.

pub struct GitParser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> GitParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Read up to the next `\n` (or end). A trailing `\r` is dropped.
    pub fn read_line(&mut self) -> &'a str {
        let line = self.read_field('\n');
        line.strip_suffix('\r').unwrap_or(line)
    }

    /// Read up to the next NUL (or end).
    pub fn read_until_nul(&mut self) -> &'a str {
        self.read_field('\0')
    }

    pub fn read_field(&mut self, delimiter: char) -> &'a str {
        let rest = self.remaining();
        match rest.find(delimiter) {
            Some(idx) => {
                self.pos += idx + delimiter.len_utf8();
                &rest[..idx]
            }
            None => {
                self.pos = self.text.len();
                rest
            }
        }
    }

    /// Which of `delimiters` occurs first in the unread text.
    pub fn next_delimiter(&self, delimiters: &[char]) -> Option<char> {
        self.remaining().chars().find(|c| delimiters.contains(c))
    }

    /// Consume `prefix` if the unread text starts with it.
    pub fn skip_prefix(&mut self, prefix: &str) -> bool {
        if self.remaining().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    /// Skip blank lines and stray separators between records.
    pub fn skip_whitespace(&mut self) {
        let rest = self.remaining();
        let trimmed = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '\0');
        self.pos += rest.len() - trimmed.len();
    }
}

/// Full-length lowercase or uppercase hex object name (SHA-1 or SHA-256).
pub fn is_object_hash(value: &str) -> bool {
    matches!(value.len(), 40 | 64) && value.bytes().all(|b| b.is_ascii_hexdigit())
}
