use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use xxhash_rust::xxh3::xxh3_64;

use crate::parse::PresentationMode;
use crate::session::ResultSet;

/// One pending line edit, gathered from the buffer at commit time. The
/// deletion mark is a boolean here; rendering it is the buffer's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    pub file: String,
    pub line_number: u64,
    pub body: String,
    pub deleted: bool,
}

/// Buffer addressing shape. Vimgrep result sets collapse to `Multi`: the
/// column was discarded at parse time and plays no role in addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditMode {
    Single { target: String },
    Multi,
}

/// An editable projection of a result set. Lives as a plain text file
/// between `rge edit` and `rge commit`, so the user can edit bodies with
/// whatever editor they like.
#[derive(Debug, Clone)]
pub struct EditSession {
    pub mode: EditMode,
    pub query: String,
    pub records: Vec<EditRecord>,
}

/// A buffer read back from disk: the session plus whether its payload
/// still matches the hash stamped at creation.
#[derive(Debug)]
pub struct EditBuffer {
    pub session: EditSession,
    pub modified: bool,
}

const HEADER_VERSION: &str = "# rge edit v1";

lazy_static! {
    // leading '-' marks a line for deletion, diff-style
    static ref EDIT_MULTI_RE: Regex =
        Regex::new(r"^(-?)([^:]+):(\d+):(.*)$").expect("valid multi edit regex");
    static ref EDIT_SINGLE_RE: Regex =
        Regex::new(r"^(-?)(\d+):(.*)$").expect("valid single edit regex");
}

impl EditSession {
    /// Build the projection from a result set, optionally restricted to
    /// a marked subset of line indices.
    pub fn from_results(set: &ResultSet, marked: Option<&[usize]>) -> Self {
        let mode = match &set.session.mode {
            PresentationMode::SingleTarget { file } => EditMode::Single {
                target: file.clone(),
            },
            _ => EditMode::Multi,
        };

        let records = set
            .lines
            .iter()
            .enumerate()
            .filter(|(i, _)| marked.map_or(true, |m| m.contains(i)))
            .map(|(_, line)| EditRecord {
                file: line.file.clone(),
                line_number: line.line_number,
                body: line.body.clone(),
                deleted: false,
            })
            .collect();

        EditSession {
            mode,
            query: set.session.patterns.raw.clone(),
            records,
        }
    }

    /// Toggle the deletion mark on one record. Returns the new state.
    pub fn mark_deleted(&mut self, index: usize) -> Option<bool> {
        let record = self.records.get_mut(index)?;
        record.deleted = !record.deleted;
        Some(record.deleted)
    }

    fn payload(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            if record.deleted {
                out.push('-');
            }
            match &self.mode {
                EditMode::Single { .. } => {
                    out.push_str(&format!("{}:{}\n", record.line_number, record.body));
                }
                EditMode::Multi => {
                    out.push_str(&format!(
                        "{}:{}:{}\n",
                        record.file, record.line_number, record.body
                    ));
                }
            }
        }
        out
    }

    /// Full buffer document: header plus payload. The payload hash lets
    /// `abort` tell an untouched buffer from one with pending edits.
    pub fn render(&self) -> String {
        let payload = self.payload();
        let mut out = String::new();
        out.push_str(HEADER_VERSION);
        out.push('\n');
        match &self.mode {
            EditMode::Single { target } => {
                out.push_str("# mode: single\n");
                out.push_str(&format!("# target: {}\n", target));
            }
            EditMode::Multi => out.push_str("# mode: multi\n"),
        }
        out.push_str(&format!("# query: {}\n", self.query));
        out.push_str(&format!("# hash: {:016x}\n", xxh3_64(payload.as_bytes())));
        out.push_str(
            "# Edit the text after the line-number prefix; the prefix itself must stay intact.\n",
        );
        out.push_str("# Prefix a whole line with '-' to delete that line from the file.\n");
        out.push_str(&payload);
        out
    }
}

/// Parse a buffer document back. Lines that do not match the active line
/// pattern are ignored, same as the result parser drops tool noise.
pub fn parse(text: &str) -> Result<EditBuffer> {
    let mut lines = text.lines();

    match lines.next() {
        Some(first) if first == HEADER_VERSION => {}
        _ => bail!("not an rge edit buffer (missing '{}' header)", HEADER_VERSION),
    }

    let mut mode_name = None;
    let mut target = None;
    let mut query = String::new();
    let mut stored_hash = None;
    let mut payload = String::new();
    let mut in_header = true;

    for line in lines {
        if in_header && line.starts_with('#') {
            if let Some(value) = line.strip_prefix("# mode:") {
                mode_name = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("# target:") {
                target = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("# query:") {
                query = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("# hash:") {
                stored_hash = u64::from_str_radix(value.trim(), 16).ok();
            }
            continue;
        }
        in_header = false;
        payload.push_str(line);
        payload.push('\n');
    }

    let mode = match mode_name.as_deref() {
        Some("single") => EditMode::Single {
            target: target.context("single-target buffer is missing '# target:'")?,
        },
        Some("multi") => EditMode::Multi,
        other => bail!("unsupported buffer mode: {:?}", other),
    };

    let mut records = Vec::new();
    for line in payload.lines() {
        let record = match &mode {
            EditMode::Single { target } => EDIT_SINGLE_RE.captures(line).map(|caps| EditRecord {
                file: target.clone(),
                line_number: caps[2].parse().unwrap_or(0),
                body: caps[3].to_string(),
                deleted: !caps[1].is_empty(),
            }),
            EditMode::Multi => EDIT_MULTI_RE.captures(line).map(|caps| EditRecord {
                file: caps[2].to_string(),
                line_number: caps[3].parse().unwrap_or(0),
                body: caps[4].to_string(),
                deleted: !caps[1].is_empty(),
            }),
        };
        if let Some(record) = record {
            if record.line_number > 0 {
                records.push(record);
            }
        }
    }

    let current_hash = xxh3_64(payload.as_bytes());
    let modified = stored_hash.map_or(true, |stored| stored != current_hash);

    Ok(EditBuffer {
        session: EditSession {
            mode,
            query,
            records,
        },
        modified,
    })
}
