use anyhow::{Context, Result};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomic whole-file replacement: write a sibling temp file, carry over
/// the target's permissions, rename into place. Durable mode adds the
/// fsync pair (temp data + parent dir).
pub struct AtomicWriter {
    durable: bool,
}

impl AtomicWriter {
    pub fn new(durable: bool) -> Self {
        Self { durable }
    }

    pub fn write_str(&self, path: &Path, content: &str) -> Result<()> {
        let parent = path.parent().with_context(|| {
            format!(
                "cannot write to {}: path has no parent directory",
                path.display()
            )
        })?;
        // Relative paths like "notes.txt" yield parent=""; normalize to
        // "." so the temp file lands somewhere real.
        let parent: &Path = if parent.as_os_str().is_empty() {
            Path::new(".")
        } else {
            parent
        };

        let existing_meta = match fs::metadata(path) {
            Ok(meta) => Some(meta),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                return Err(err).with_context(|| format!("failed to stat {}", path.display()));
            }
        };

        let mut temp_file = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;

        {
            let mut writer = BufWriter::new(temp_file.as_file_mut());
            writer
                .write_all(content.as_bytes())
                .with_context(|| format!("failed to write temp file for {}", path.display()))?;
            writer.flush().context("failed to flush temp file")?;
        }

        if let Some(meta) = existing_meta.as_ref() {
            fs::set_permissions(temp_file.path(), meta.permissions()).with_context(|| {
                format!("failed to preserve permissions for {}", path.display())
            })?;
        }

        if self.durable {
            temp_file
                .as_file()
                .sync_data()
                .with_context(|| format!("failed to sync temp data for {}", path.display()))?;
        }

        temp_file.persist(path).map_err(|e| {
            anyhow::Error::new(e.error)
                .context(format!("failed to atomically replace {}", path.display()))
        })?;

        if self.durable {
            fsync_parent_dir(parent)
                .with_context(|| format!("failed to sync parent dir {}", parent.display()))?;
        }

        Ok(())
    }
}

#[cfg(unix)]
fn fsync_parent_dir(parent: &Path) -> Result<()> {
    let dir = fs::File::open(parent)
        .with_context(|| format!("failed to open parent dir {}", parent.display()))?;
    dir.sync_all()
        .with_context(|| format!("failed to fsync parent dir {}", parent.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn fsync_parent_dir(_parent: &Path) -> Result<()> {
    Ok(())
}
