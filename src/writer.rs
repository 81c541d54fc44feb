//! File-safety writer
//!
//! Replaces a file's contents while keeping exactly one generation of backup next to
//! it (`<target>~` by default). With verification enabled the new content must be
//! byte-identical to the previous version; on any difference the new content is moved
//! aside to `<target>.new` and the previous version is put back, leaving the target as
//! it was before the run.

use similar::TextDiff;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterOptions {
    pub backup_suffix: String,
    pub new_suffix: String,
    /// Bytes of context reported on each side of the first difference
    pub context_bytes: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            backup_suffix: "~".to_string(),
            new_suffix: ".new".to_string(),
            context_bytes: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub target: PathBuf,
    /// Where the previous version now lives, if there was one
    pub backup: Option<PathBuf>,
    /// Whether the new content was compared against the previous version
    pub verified: bool,
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot create parent of {}: {} exists but is not a directory", .target.display(), .component.display())]
    NotADirectory { target: PathBuf, component: PathBuf },
    #[error(
        "unexpected change in {} at byte {offset}: expected {expected:?}, found {actual:?} (new content saved to {})",
        .target.display(),
        .new_path.display()
    )]
    ChangeDetected {
        target: PathBuf,
        new_path: PathBuf,
        offset: usize,
        expected: String,
        actual: String,
    },
    #[error("expected backup file {} is missing", .0.display())]
    MissingBackup(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> WriteError + '_ {
    move |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `path` with `suffix` appended to its file name.
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Create every missing ancestor directory of `target`.
pub fn ensure_parent_dirs(target: &Path) -> Result<(), WriteError> {
    let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    for ancestor in parent.ancestors() {
        if ancestor.exists() && !ancestor.is_dir() {
            return Err(WriteError::NotADirectory {
                target: target.to_path_buf(),
                component: ancestor.to_path_buf(),
            });
        }
    }
    if !parent.exists() {
        info!(dir = %parent.display(), "creating directory");
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    Ok(())
}

/// Write `text` to `target`, rotating the previous version into the backup path.
pub fn write_with_backup(
    target: &Path,
    text: &str,
    verify: bool,
    options: &WriterOptions,
) -> Result<WriteOutcome, WriteError> {
    ensure_parent_dirs(target)?;

    let backup = sibling_path(target, &options.backup_suffix);
    let had_previous = target.exists();
    if backup.exists() {
        info!(backup = %backup.display(), "deleting existing backup file");
        fs::remove_file(&backup).map_err(io_error(&backup))?;
    }
    if had_previous {
        info!(from = %target.display(), to = %backup.display(), "renaming file");
        fs::rename(target, &backup).map_err(io_error(target))?;
    }

    info!(target = %target.display(), "writing regenerated file");
    fs::write(target, text).map_err(io_error(target))?;

    let mut outcome = WriteOutcome {
        target: target.to_path_buf(),
        backup: had_previous.then(|| backup.clone()),
        verified: false,
    };
    if !verify {
        return Ok(outcome);
    }
    if !had_previous {
        info!(target = %target.display(), "no previous version, nothing to verify");
        return Ok(outcome);
    }

    let previous = fs::read(&backup).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => WriteError::MissingBackup(backup.clone()),
        _ => WriteError::Io {
            path: backup.clone(),
            source,
        },
    })?;
    let new_path = sibling_path(target, &options.new_suffix);
    let Some(offset) = first_difference(&previous, text.as_bytes()) else {
        if new_path.exists() {
            info!(stale = %new_path.display(), "removing side file from an earlier run");
            fs::remove_file(&new_path).map_err(io_error(&new_path))?;
        }
        outcome.verified = true;
        return Ok(outcome);
    };

    warn!(target = %target.display(), offset, "regenerated output differs from previous version");
    let previous_text = String::from_utf8_lossy(&previous);
    let diff = TextDiff::from_lines(&*previous_text, text);
    debug!("{}", diff.unified_diff().header("previous", "regenerated"));

    if new_path.exists() {
        fs::remove_file(&new_path).map_err(io_error(&new_path))?;
    }
    fs::rename(target, &new_path).map_err(io_error(target))?;
    fs::rename(&backup, target).map_err(io_error(&backup))?;
    info!(target = %target.display(), new = %new_path.display(), "restored previous version");

    Err(WriteError::ChangeDetected {
        target: target.to_path_buf(),
        new_path,
        offset,
        expected: context(&previous, offset, options.context_bytes),
        actual: context(text.as_bytes(), offset, options.context_bytes),
    })
}

/// Offset of the first differing byte, or `None` when identical.
pub fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    let common = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    (common < a.len() || common < b.len()).then_some(common)
}

fn context(bytes: &[u8], offset: usize, width: usize) -> String {
    let start = offset.saturating_sub(width).min(bytes.len());
    let end = offset.saturating_add(width).min(bytes.len());
    String::from_utf8_lossy(&bytes[start..end]).into_owned()
}
