use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::edit::{EditRecord, EditSession};
use crate::write::AtomicWriter;

/// Outcome of one batch write-back. Read-only skips are counted, not
/// fatal; hard per-file failures are counted separately so the caller
/// can exit non-zero while the other groups still land.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub files_committed: usize,
    pub files_skipped_readonly: usize,
    pub files_failed: usize,
    pub lines_replaced: usize,
    pub lines_deleted: usize,
    pub dry_run: bool,
}

impl CommitReport {
    pub fn success(&self) -> bool {
        self.files_failed == 0
    }

    pub fn changed_lines(&self) -> usize {
        self.lines_replaced + self.lines_deleted
    }
}

enum GroupError {
    ReadOnly,
    Failed(String),
}

struct GroupOutcome {
    replaced: usize,
    deleted: usize,
}

/// Apply every record of the session back to its file. Records are
/// grouped per file in first-seen order and applied in ascending
/// original line-number order; a running `shift` accounts for the lines
/// already deleted above the current target, so later line numbers stay
/// correct without ever rewriting the records themselves.
///
/// With `persist` off the whole pass still runs — files are read,
/// targets bounds-checked, the new content assembled — but nothing is
/// written. That is the dry-run confirmation path.
pub fn commit(session: &EditSession, persist: bool, durable: bool, verbose: u8) -> Result<CommitReport> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&EditRecord>> = HashMap::new();
    for record in &session.records {
        groups
            .entry(record.file.as_str())
            .or_insert_with(|| {
                order.push(record.file.as_str());
                Vec::new()
            })
            .push(record);
    }

    let mut report = CommitReport {
        dry_run: !persist,
        ..CommitReport::default()
    };

    for file in order {
        let mut group = groups.remove(file).unwrap_or_default();
        // buffer build emits ascending order already; the stable sort
        // keeps the shift arithmetic correct even if the user reordered
        // lines by hand
        group.sort_by_key(|r| r.line_number);

        match apply_group(file, &group, persist, durable) {
            Ok(outcome) => {
                report.files_committed += 1;
                report.lines_replaced += outcome.replaced;
                report.lines_deleted += outcome.deleted;
                if verbose > 0 {
                    eprintln!(
                        "{}: {} replaced, {} deleted{}",
                        file,
                        outcome.replaced,
                        outcome.deleted,
                        if persist { "" } else { " (dry-run)" }
                    );
                }
            }
            Err(GroupError::ReadOnly) => {
                report.files_skipped_readonly += 1;
                if verbose > 0 {
                    eprintln!("{}: skipped (read-only)", file);
                }
            }
            Err(GroupError::Failed(reason)) => {
                report.files_failed += 1;
                eprintln!("error: {}: {}", file, reason);
            }
        }
    }

    Ok(report)
}

fn apply_group(
    file: &str,
    group: &[&EditRecord],
    persist: bool,
    durable: bool,
) -> std::result::Result<GroupOutcome, GroupError> {
    let path = Path::new(file);

    let meta = fs::metadata(path)
        .map_err(|e| GroupError::Failed(format!("no longer accessible: {}", e)))?;
    if meta.permissions().readonly() {
        return Err(GroupError::ReadOnly);
    }

    // always the current on-disk content, never the projection the
    // buffer was built from
    let content = fs::read_to_string(path)
        .map_err(|e| GroupError::Failed(format!("cannot read: {}", e)))?;
    let mut lines = split_keep_endings(&content);

    let mut shift: u64 = 0;
    let mut outcome = GroupOutcome {
        replaced: 0,
        deleted: 0,
    };

    for record in group {
        let target = record
            .line_number
            .checked_sub(shift)
            .filter(|t| *t >= 1 && *t <= lines.len() as u64)
            .ok_or_else(|| {
                GroupError::Failed(format!(
                    "line {} out of range (file has {} lines)",
                    record.line_number,
                    lines.len()
                ))
            })?;
        let idx = (target - 1) as usize;

        if record.deleted {
            lines.remove(idx);
            shift += 1;
            outcome.deleted += 1;
        } else if lines[idx].0 != record.body {
            lines[idx].0 = record.body.clone();
            outcome.replaced += 1;
        }
    }

    let new_content: String = lines
        .into_iter()
        .map(|(text, ending)| text + &ending)
        .collect();

    if persist && new_content != content {
        AtomicWriter::new(durable)
            .write_str(path, &new_content)
            .map_err(|e| GroupError::Failed(format!("write failed: {:#}", e)))?;
    }

    Ok(outcome)
}

/// Decompose into (text, terminator) pairs so that replacements keep each
/// line's own ending and deletions take the ending with them. Preserves
/// CRLF, LF, mixed endings, and a missing final newline byte-for-byte.
fn split_keep_endings(content: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        match rest.find('\n') {
            Some(i) => {
                let (text, ending) = if i > 0 && rest.as_bytes()[i - 1] == b'\r' {
                    (&rest[..i - 1], "\r\n")
                } else {
                    (&rest[..i], "\n")
                };
                out.push((text.to_string(), ending.to_string()));
                rest = &rest[i + 1..];
            }
            None => {
                out.push((rest.to_string(), String::new()));
                rest = "";
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditMode;
    use tempfile::TempDir;

    fn record(file: &str, number: u64, body: &str, deleted: bool) -> EditRecord {
        EditRecord {
            file: file.into(),
            line_number: number,
            body: body.into(),
            deleted,
        }
    }

    fn session(records: Vec<EditRecord>) -> EditSession {
        EditSession {
            mode: EditMode::Multi,
            query: "q".into(),
            records,
        }
    }

    #[test]
    fn replaces_bodies_in_place() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "one\ntwo\nthree\n").unwrap();
        let path = file.to_str().unwrap();

        let report = commit(
            &session(vec![record(path, 2, "TWO", false)]),
            true,
            false,
            0,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "one\nTWO\nthree\n");
        assert_eq!(report.files_committed, 1);
        assert_eq!(report.lines_replaced, 1);
        assert!(report.success());
    }

    #[test]
    fn deletions_shift_later_targets() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("five.txt");
        fs::write(&file, "l1\nl2\nl3\nl4\nl5\n").unwrap();
        let path = file.to_str().unwrap();

        let report = commit(
            &session(vec![
                record(path, 2, "l2", true),
                record(path, 4, "l4", true),
            ]),
            true,
            false,
            0,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "l1\nl3\nl5\n");
        assert_eq!(report.lines_deleted, 2);
    }

    #[test]
    fn delete_and_replace_mix_in_one_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("mix.txt");
        fs::write(&file, "a\nb\nc\nd\n").unwrap();
        let path = file.to_str().unwrap();

        let report = commit(
            &session(vec![
                record(path, 1, "A", false),
                record(path, 2, "b", true),
                record(path, 4, "D", false),
            ]),
            true,
            false,
            0,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "A\nc\nD\n");
        assert_eq!(report.lines_replaced, 2);
        assert_eq!(report.lines_deleted, 1);
    }

    #[test]
    fn noop_commit_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("same.txt");
        let original = "alpha\r\nbeta\nno-final-newline";
        fs::write(&file, original).unwrap();
        let path = file.to_str().unwrap();

        let before_mtime = fs::metadata(&file).unwrap().modified().unwrap();
        let report = commit(
            &session(vec![
                record(path, 1, "alpha", false),
                record(path, 2, "beta", false),
                record(path, 3, "no-final-newline", false),
            ]),
            true,
            false,
            0,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), original);
        assert_eq!(report.changed_lines(), 0);
        // unchanged content is never rewritten
        assert_eq!(fs::metadata(&file).unwrap().modified().unwrap(), before_mtime);
    }

    #[test]
    fn line_endings_are_preserved_per_line() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("crlf.txt");
        fs::write(&file, "a\r\nb\r\nc").unwrap();
        let path = file.to_str().unwrap();

        commit(
            &session(vec![
                record(path, 2, "B", false),
                record(path, 3, "C", false),
            ]),
            true,
            false,
            0,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "a\r\nB\r\nC");
    }

    #[test]
    fn deleting_a_line_takes_its_terminator() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("del.txt");
        fs::write(&file, "a\r\nb\r\nc\r\n").unwrap();
        let path = file.to_str().unwrap();

        commit(&session(vec![record(path, 2, "b", true)]), true, false, 0).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "a\r\nc\r\n");
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("dry.txt");
        fs::write(&file, "one\ntwo\n").unwrap();
        let path = file.to_str().unwrap();

        let report = commit(
            &session(vec![record(path, 1, "ONE", false), record(path, 2, "two", true)]),
            false,
            false,
            0,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "one\ntwo\n");
        assert!(report.dry_run);
        assert_eq!(report.files_committed, 1);
        assert_eq!(report.lines_replaced, 1);
        assert_eq!(report.lines_deleted, 1);
    }

    #[cfg(unix)]
    #[test]
    fn readonly_group_is_skipped_whole_while_others_commit() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let locked = tmp.path().join("locked.txt");
        let open = tmp.path().join("open.txt");
        fs::write(&locked, "x\ny\n").unwrap();
        fs::write(&open, "x\ny\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o444)).unwrap();

        let report = commit(
            &session(vec![
                record(locked.to_str().unwrap(), 1, "X", false),
                record(locked.to_str().unwrap(), 2, "y", true),
                record(open.to_str().unwrap(), 1, "X", false),
            ]),
            true,
            false,
            0,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&locked).unwrap(), "x\ny\n");
        assert_eq!(fs::read_to_string(&open).unwrap(), "X\ny\n");
        assert_eq!(report.files_skipped_readonly, 1);
        assert_eq!(report.files_committed, 1);
        assert!(report.success());

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
    }

    #[test]
    fn missing_file_fails_its_group_only() {
        let tmp = TempDir::new().unwrap();
        let exists = tmp.path().join("here.txt");
        fs::write(&exists, "a\n").unwrap();
        let gone = tmp.path().join("gone.txt");

        let report = commit(
            &session(vec![
                record(gone.to_str().unwrap(), 1, "x", false),
                record(exists.to_str().unwrap(), 1, "A", false),
            ]),
            true,
            false,
            0,
        )
        .unwrap();

        assert_eq!(report.files_failed, 1);
        assert_eq!(report.files_committed, 1);
        assert!(!report.success());
        assert_eq!(fs::read_to_string(&exists).unwrap(), "A\n");
    }

    #[test]
    fn out_of_range_target_fails_the_group() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("short.txt");
        fs::write(&file, "only\n").unwrap();

        let report = commit(
            &session(vec![record(file.to_str().unwrap(), 9, "nope", false)]),
            true,
            false,
            0,
        )
        .unwrap();

        assert_eq!(report.files_failed, 1);
        assert_eq!(fs::read_to_string(&file).unwrap(), "only\n");
    }

    #[test]
    fn split_keep_endings_round_trips() {
        for content in ["a\nb\n", "a\r\nb", "", "one", "a\n\nb\n", "mixed\r\nlf\nend"] {
            let joined: String = split_keep_endings(content)
                .into_iter()
                .map(|(t, e)| t + &e)
                .collect();
            assert_eq!(joined, content);
        }
    }
}
