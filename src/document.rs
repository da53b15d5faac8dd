//! Commented YAML draft output.
//!
//! The draft is written piece by piece so that `#` comment lines can be
//! placed between YAML sections. A failed write is logged and remembered,
//! and writing carries on with the next piece: a partial draft is still
//! more useful to a human reviewer than none.

use serde_yaml::{Mapping, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::types::*;

/// Comment marker of the output format.
pub const COMMENT_MARKER: char = '#';

/// One block of the draft: YAML entries preceded by guidance comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub entries: Mapping,
    pub comments: Vec<String>,
}

impl Section {
    /// A section holding a single `key: value` entry.
    pub fn entry<K: Into<Value>, V: Into<Value>>(key: K, value: V) -> Self {
        let mut entries = Mapping::new();
        entries.insert(key.into(), value.into());
        Section {
            entries,
            comments: Vec::new(),
        }
    }

    pub fn with_comments(mut self, comments: &[&str]) -> Self {
        self.comments = comments.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// Prefixes non-blank lines with `# ` unless they already are comments.
pub fn format_comment(line: &str) -> String {
    if !line.trim().is_empty() && !line.starts_with(COMMENT_MARKER) {
        format!("{} {}", COMMENT_MARKER, line)
    } else {
        line.to_string()
    }
}

/// Append-only writer for a draft file.
#[derive(Debug)]
pub struct DraftDocument {
    path: PathBuf,
    failures: Vec<Diagnostic>,
}

impl DraftDocument {
    /// Starts a draft at `path`, discarding any previous content.
    pub fn create<P: AsRef<Path>>(path: P) -> Self {
        let mut doc = DraftDocument {
            path: path.as_ref().to_path_buf(),
            failures: Vec::new(),
        };
        doc.write_text("", true);
        doc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write failures recorded so far.
    pub fn failures(&self) -> &[Diagnostic] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<Diagnostic> {
        self.failures
    }

    fn write_text(&mut self, text: &str, truncate: bool) {
        let result = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(truncate)
            .append(!truncate)
            .open(&self.path)
            .and_then(|mut file| file.write_all(text.as_bytes()));
        if let Err(e) = result {
            warn!("failed writing {}: {}", self.path.display(), e);
            self.failures.push(Diagnostic::WriteFailed {
                path: self.path.clone(),
                message: e.to_string(),
            });
        }
    }

    /// Appends comment lines, one per entry.
    pub fn write_comments<S: AsRef<str>>(&mut self, lines: &[S]) {
        let text: String = lines
            .iter()
            .map(|line| format_comment(line.as_ref()) + "\n")
            .collect();
        self.write_text(&text, false);
    }

    /// Appends a mapping as block-style YAML.
    pub fn append_yaml(&mut self, entries: &Mapping) {
        match serde_yaml::to_string(entries) {
            Ok(text) => self.write_text(&text, false),
            Err(e) => {
                warn!("failed serializing section for {}: {}", self.path.display(), e);
                self.failures.push(Diagnostic::WriteFailed {
                    path: self.path.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    /// Appends a section: two blank spacer lines, its comments, its entries.
    pub fn write_section(&mut self, section: &Section) {
        let mut comments = vec![String::new(), String::new()];
        comments.extend(section.comments.iter().cloned());
        self.write_comments(&comments);
        self.append_yaml(&section.entries);
    }
}
