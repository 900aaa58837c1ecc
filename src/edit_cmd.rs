use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::edit::{self, EditSession};
use crate::error::SearchError;
use crate::session::{self, SearchOptions};

/// Search, then materialize the matches into an editable buffer file.
pub fn run(
    query: &str,
    targets: &[String],
    opts: &SearchOptions,
    out: &Path,
    verbose: u8,
) -> Result<()> {
    let config = Config::load()?;

    if out.exists() {
        bail!(
            "buffer {} already exists; commit or abort it first",
            out.display()
        );
    }

    let set = match session::search(query, targets, opts, &config, verbose) {
        Ok(set) => set,
        Err(err) => {
            if let Some(SearchError::NoResults { query }) = err.downcast_ref::<SearchError>() {
                println!("0 for '{}'; nothing to edit", query);
                return Ok(());
            }
            return Err(err);
        }
    };

    let session = EditSession::from_results(&set, None);
    let files = session
        .records
        .iter()
        .map(|r| r.file.as_str())
        .collect::<std::collections::HashSet<_>>()
        .len();

    fs::write(out, session.render())
        .with_context(|| format!("failed to write buffer {}", out.display()))?;

    println!(
        "{}{} lines from {}F -> {}",
        if config.display.emoji { "✏️ " } else { "" },
        session.records.len(),
        files,
        out.display()
    );
    println!(
        "edit the bodies, then: rge commit {}  (or: rge abort {})",
        out.display(),
        out.display()
    );
    Ok(())
}

/// Discard a buffer. One with pending edits (payload hash no longer
/// matches the header) needs --force; that is the CLI's stand-in for the
/// interactive "really discard unsaved state?" prompt.
pub fn run_abort(buffer: &Path, force: bool, verbose: u8) -> Result<()> {
    let config = Config::load()?;
    let text = fs::read_to_string(buffer)
        .with_context(|| format!("failed to read buffer {}", buffer.display()))?;
    let parsed = edit::parse(&text)
        .with_context(|| format!("{} is not an rge edit buffer", buffer.display()))?;

    if parsed.modified && !force {
        bail!(
            "{} has pending edits; re-run with --force to discard them",
            buffer.display()
        );
    }

    if verbose > 0 {
        eprintln!(
            "discarding {} ({} records)",
            buffer.display(),
            parsed.session.records.len()
        );
    }
    fs::remove_file(buffer)
        .with_context(|| format!("failed to remove {}", buffer.display()))?;
    println!(
        "{}discarded {}",
        if config.display.emoji { "🗑️ " } else { "" },
        buffer.display()
    );
    Ok(())
}
