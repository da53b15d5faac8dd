//! Task and epoch inference from session filenames.
//!
//! Every session file carries an epoch and a label (`02` and `r1` in
//! `20200101_rat_02_r1.rec`). The label encodes a task code and an ordinal.
//! Scanning all files of a session yields the sorted set of
//! `(epoch, task, ordinal)` entries and the distinct tasks in the order they
//! first appear.

use glob::Pattern;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use tracing::{debug, warn};

use crate::filename::{FilenameTemplate, ParsedFilename};
use crate::files;
use crate::types::*;

/// Ordered table of task codes and their display names.
///
/// Lookups scan codes in insertion order and the first code found inside a
/// label wins, so put longer codes before codes they contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCodes {
    codes: Vec<(String, String)>,
}

impl Default for TaskCodes {
    /// `r` for run, `s` for sleep.
    fn default() -> Self {
        TaskCodes::new(&[("r", "run"), ("s", "sleep")])
    }
}

impl TaskCodes {
    pub fn new(codes: &[(&str, &str)]) -> Self {
        TaskCodes {
            codes: codes
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.codes.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    /// Display name of a task code.
    pub fn name(&self, code: &str) -> Option<&str> {
        self.iter().find(|(c, _)| *c == code).map(|(_, n)| n)
    }

    /// Splits a label into `(task_code, ordinal)`.
    ///
    /// `"r1"` gives `("r", "1")`. A label that contains no known code is
    /// returned whole with an empty ordinal: `"x9"` gives `("x9", "")`.
    pub fn split_label(&self, label: &str) -> (String, String) {
        for (code, _) in self.iter() {
            if label.contains(code) {
                return (code.to_string(), label.replacen(code, "", 1));
            }
        }
        (label.to_string(), String::new())
    }

    /// Spells out the task code of a label: `"r1"` becomes `"run 1"`.
    pub fn unpack_label(&self, label: &str) -> String {
        for (code, name) in self.iter() {
            if label.contains(code) {
                return label.replacen(code, &format!("{} ", name), 1);
            }
        }
        label.to_string()
    }
}

/// Tasks and epochs of one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskInference {
    entries: Vec<EpochLabelEntry>,
    detected_tasks: Vec<String>,
}

impl TaskInference {
    /// Builds the inference from `(epoch, label)` pairs.
    ///
    /// Duplicate entries collapse; entries are sorted by epoch, then task
    /// code, then ordinal.
    pub fn from_pairs<'a, I>(pairs: I, codes: &TaskCodes) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let set: BTreeSet<EpochLabelEntry> = pairs
            .into_iter()
            .map(|(epoch, label)| {
                let (task_code, ordinal) = codes.split_label(label);
                EpochLabelEntry {
                    epoch: epoch.to_string(),
                    task_code,
                    ordinal,
                }
            })
            .collect();
        let entries: Vec<EpochLabelEntry> = set.into_iter().collect();

        let mut detected_tasks: Vec<String> = Vec::new();
        for entry in &entries {
            if !detected_tasks.contains(&entry.task_code) {
                detected_tasks.push(entry.task_code.clone());
            }
        }

        TaskInference {
            entries,
            detected_tasks,
        }
    }

    /// Sorted `(epoch, task, ordinal)` entries.
    pub fn entries(&self) -> &[EpochLabelEntry] {
        &self.entries
    }

    /// Distinct task codes in first-appearance order.
    pub fn detected_tasks(&self) -> &[String] {
        &self.detected_tasks
    }

    /// Position of a task code among the detected tasks.
    pub fn task_index(&self, task_code: &str) -> Option<usize> {
        self.detected_tasks.iter().position(|t| t == task_code)
    }

    /// Epochs recorded for a task, in sorted entry order.
    pub fn task_epochs(&self, task_code: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.task_code == task_code)
            .map(|e| e.epoch.as_str())
            .collect()
    }
}

/// Who a session belongs to, as expected in its filenames.
#[derive(Debug, Clone, Copy)]
pub struct SessionIdentity<'a> {
    /// Session date, e.g. "20200101"
    pub date: &'a str,
    /// Canonical animal name (used for folder naming)
    pub animal_name: &'a str,
    /// Animal name used in filenames, often the same as `animal_name`
    pub nickname: &'a str,
}

/// Result of scanning one session directory.
#[derive(Debug, Clone, Default)]
pub struct SessionScan {
    pub inference: TaskInference,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scans `rec_path` for files named `{date}_{nickname}_*.*` and infers the
/// session's tasks.
///
/// Files that do not fit the template are skipped. Filenames whose date or
/// animal disagree with `identity` are reported but do not stop the scan.
pub fn scan_session<P: AsRef<Path>>(
    rec_path: P,
    identity: SessionIdentity,
    template: &FilenameTemplate,
    codes: &TaskCodes,
) -> Result<SessionScan> {
    let pattern = format!(
        "{}_{}_*.*",
        Pattern::escape(identity.date),
        Pattern::escape(identity.nickname)
    );
    let paths = files::find_files_matching(rec_path.as_ref(), &pattern)?;
    debug!("scanning {} session files matching {}", paths.len(), pattern);

    let mut diagnostics = Vec::new();
    let mut parsed: Vec<ParsedFilename> = Vec::new();
    for path in paths {
        match template.decompose_path(&path) {
            Ok(p) => parsed.push(p),
            Err(_) => {
                warn!("skipping {}: does not match {}", path.display(), template.as_str());
                diagnostics.push(Diagnostic::UnparsedFilename { path });
            }
        }
    }

    diagnostics.extend(check_identity(&parsed, identity));

    let pairs = parsed
        .iter()
        .filter_map(|p| Some((p.get("epoch")?, p.get("label")?)));
    let inference = TaskInference::from_pairs(pairs, codes);

    Ok(SessionScan {
        inference,
        diagnostics,
    })
}

fn unique_values(parsed: &[ParsedFilename], field: &str) -> Vec<String> {
    let set: HashSet<&str> = parsed.iter().filter_map(|p| p.get(field)).collect();
    let mut values: Vec<String> = set.into_iter().map(String::from).collect();
    values.sort();
    values
}

/// Compares the dates and animal names found in filenames with the expected
/// session identity.
pub fn check_identity(parsed: &[ParsedFilename], identity: SessionIdentity) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let dates = unique_values(parsed, "date");
    if dates != [identity.date] {
        warn!("date mismatch: expected {}, found {:?}", identity.date, dates);
        diagnostics.push(Diagnostic::NamingMismatch {
            field: "date".to_string(),
            expected: vec![identity.date.to_string()],
            found: dates,
        });
    }

    let animals = unique_values(parsed, "animal");
    if animals != [identity.animal_name] && animals != [identity.nickname] {
        warn!(
            "animal name mismatch: expected {} or {}, found {:?}",
            identity.animal_name, identity.nickname, animals
        );
        let mut expected = vec![identity.animal_name.to_string()];
        if identity.nickname != identity.animal_name {
            expected.push(identity.nickname.to_string());
        }
        diagnostics.push(Diagnostic::NamingMismatch {
            field: "animal".to_string(),
            expected,
            found: animals,
        });
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filename::DEFAULT_FILENAME_FORMAT;
    use std::fs;

    #[test]
    fn splits_labels() {
        let codes = TaskCodes::default();
        assert_eq!(codes.split_label("r1"), ("r".to_string(), "1".to_string()));
        assert_eq!(codes.split_label("s2"), ("s".to_string(), "2".to_string()));
        assert_eq!(codes.split_label("x9"), ("x9".to_string(), String::new()));
    }

    #[test]
    fn split_removes_first_occurrence_only() {
        let codes = TaskCodes::default();
        assert_eq!(codes.split_label("r1r"), ("r".to_string(), "1r".to_string()));
    }

    #[test]
    fn first_listed_code_wins() {
        let codes = TaskCodes::new(&[("s", "sleep"), ("r", "run")]);
        // "rs1" contains both codes; "s" is listed first
        assert_eq!(codes.split_label("rs1"), ("s".to_string(), "r1".to_string()));
    }

    #[test]
    fn unpacks_labels() {
        let codes = TaskCodes::default();
        assert_eq!(codes.unpack_label("r1"), "run 1");
        assert_eq!(codes.unpack_label("s12"), "sleep 12");
        assert_eq!(codes.unpack_label("x9"), "x9");
    }

    #[test]
    fn detected_tasks_keep_first_appearance_order() {
        let codes = TaskCodes::default();
        let inference =
            TaskInference::from_pairs([("01", "r1"), ("02", "s1"), ("03", "r2")], &codes);
        assert_eq!(inference.detected_tasks(), ["r", "s"]);

        let inference =
            TaskInference::from_pairs([("01", "s1"), ("02", "r1"), ("03", "s2")], &codes);
        assert_eq!(inference.detected_tasks(), ["s", "r"]);
    }

    #[test]
    fn entries_are_deduplicated_and_sorted() {
        let codes = TaskCodes::default();
        let inference = TaskInference::from_pairs(
            [("03", "r2"), ("01", "s1"), ("03", "r2"), ("02", "r1"), ("01", "s1")],
            &codes,
        );
        assert_eq!(
            inference.entries(),
            [
                EpochLabelEntry::new("01", "s", "1"),
                EpochLabelEntry::new("02", "r", "1"),
                EpochLabelEntry::new("03", "r", "2"),
            ]
        );
        assert_eq!(inference.task_epochs("r"), ["02", "03"]);
        assert_eq!(inference.task_epochs("s"), ["01"]);
        assert_eq!(inference.task_index("r"), Some(1));
    }

    #[test]
    fn unknown_labels_become_their_own_task() {
        let codes = TaskCodes::default();
        let inference = TaskInference::from_pairs([("01", "x9"), ("02", "r1")], &codes);
        assert_eq!(inference.detected_tasks(), ["x9", "r"]);
        assert_eq!(inference.entries()[0], EpochLabelEntry::new("01", "x9", ""));
    }

    #[test]
    fn scan_skips_unparsable_names() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "20200101_rat_01_s1.rec",
            "20200101_rat_02_r1.rec",
            "20200101_rat_02_r1.1.h264",
            "20200101_rat_notes.txt",
            "unrelated.txt",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let template = FilenameTemplate::compile(DEFAULT_FILENAME_FORMAT).unwrap();
        let identity = SessionIdentity {
            date: "20200101",
            animal_name: "Rat",
            nickname: "rat",
        };
        let scan = scan_session(dir.path(), identity, &template, &TaskCodes::default()).unwrap();

        assert_eq!(scan.inference.detected_tasks(), ["s", "r"]);
        assert_eq!(scan.inference.entries().len(), 2);
        // nickname matches, so no animal mismatch; the notes file is skipped
        assert_eq!(
            scan.diagnostics,
            [Diagnostic::UnparsedFilename {
                path: dir.path().join("20200101_rat_notes.txt")
            }]
        );
    }

    #[test]
    fn foreign_animal_name_is_reported() {
        let template = FilenameTemplate::compile(DEFAULT_FILENAME_FORMAT).unwrap();
        let identity = SessionIdentity {
            date: "20200101",
            animal_name: "Rat",
            nickname: "rat",
        };

        let parsed = [template.decompose("20200101_mouse_01_r1.rec").unwrap()];
        assert_eq!(
            check_identity(&parsed, identity),
            [Diagnostic::NamingMismatch {
                field: "animal".to_string(),
                expected: vec!["Rat".to_string(), "rat".to_string()],
                found: vec!["mouse".to_string()],
            }]
        );

        // the canonical name is accepted even when a nickname is set
        let parsed = [template.decompose("20200101_Rat_01_r1.rec").unwrap()];
        assert!(check_identity(&parsed, identity).is_empty());
    }

    #[test]
    fn empty_session_is_a_date_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let template = FilenameTemplate::compile(DEFAULT_FILENAME_FORMAT).unwrap();
        let identity = SessionIdentity {
            date: "20200101",
            animal_name: "rat",
            nickname: "rat",
        };
        let scan = scan_session(dir.path(), identity, &template, &TaskCodes::default()).unwrap();
        assert!(scan.inference.detected_tasks().is_empty());
        assert!(scan
            .diagnostics
            .iter()
            .any(|d| matches!(d, Diagnostic::NamingMismatch { field, .. } if field == "date")));
    }
}
