use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::commit;
use crate::config::Config;
use crate::edit;

/// Apply an edited buffer back to its files and report the outcome.
/// Read-only skips are surfaced but not fatal; hard per-file failures
/// make the whole command exit non-zero after the other groups landed.
/// On a clean, fully persisted commit the buffer file is removed — the
/// edit session is over.
pub fn run(buffer: &Path, dry_run: bool, verbose: u8) -> Result<()> {
    let config = Config::load()?;

    let text = fs::read_to_string(buffer)
        .with_context(|| format!("failed to read buffer {}", buffer.display()))?;
    let parsed = edit::parse(&text)
        .with_context(|| format!("{} is not an rge edit buffer", buffer.display()))?;

    if parsed.session.records.is_empty() {
        bail!("buffer {} has no edit lines", buffer.display());
    }

    let persist = !dry_run && config.commit.persist;
    if !dry_run && !config.commit.persist && verbose > 0 {
        eprintln!("commit.persist is disabled in config; validating only");
    }

    let report = commit::commit(&parsed.session, persist, config.commit.durable, verbose)?;

    let check = if config.display.emoji { "✅ " } else { "" };
    let warn = if config.display.emoji { "⚠️ " } else { "" };
    if report.dry_run {
        println!(
            "dry-run: {}F would change ({} replaced, {} deleted)",
            report.files_committed, report.lines_replaced, report.lines_deleted
        );
    } else if report.changed_lines() == 0 {
        println!("{}no changes ({}F checked)", check, report.files_committed);
    } else {
        println!(
            "{}{}F committed ({} replaced, {} deleted)",
            check, report.files_committed, report.lines_replaced, report.lines_deleted
        );
    }

    if report.files_skipped_readonly > 0 {
        println!(
            "{}{}F skipped (read-only)",
            warn, report.files_skipped_readonly
        );
    }

    if !report.success() {
        bail!("{}F failed to commit", report.files_failed);
    }

    let clean = !report.dry_run && report.files_skipped_readonly == 0;
    if clean {
        fs::remove_file(buffer)
            .with_context(|| format!("committed, but failed to remove {}", buffer.display()))?;
        if verbose > 0 {
            eprintln!("removed {}", buffer.display());
        }
    }

    Ok(())
}
