//! Regeneration entry points
//!
//! One regeneration is strictly sequential: parse the whole document, run every queued
//! script in document order, render, then hand the text to the file-safety writer.
//! Nothing is written unless parsing and every script succeed.

use crate::document::{Document, ParseError};
use crate::render::RenderMode;
use crate::script::{ExecutionError, ScriptExecutor};
use crate::shapes::ShapeRegistry;
use crate::writer::{write_with_backup, WriteError, WriterOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Any fatal failure while regenerating one document.
#[derive(Debug, Error)]
pub enum RegenerateError {
    #[error("{}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("{}: {source}", .path.display())]
    Execution {
        path: PathBuf,
        #[source]
        source: ExecutionError,
    },
    #[error("{}: published output strips directives and cannot replace its source", .0.display())]
    PublishedInPlace(PathBuf),
    #[error(transparent)]
    Write(#[from] WriteError),
}

impl RegenerateError {
    /// Whether the failure was a detected change that left the target untouched
    pub fn is_change_detected(&self) -> bool {
        matches!(self, RegenerateError::Write(WriteError::ChangeDetected { .. }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegenerateOptions {
    pub mode: RenderMode,
    pub writer: WriterOptions,
}

/// What a successful regeneration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationReport {
    pub source: PathBuf,
    pub target: PathBuf,
    pub backup: Option<PathBuf>,
    pub components: usize,
    pub scripts: usize,
    pub verified: bool,
}

/// Regenerates documents with one shape registry and script executor.
#[derive(Debug)]
pub struct Regenerator<'r, E> {
    shapes: &'r ShapeRegistry,
    executor: E,
    options: RegenerateOptions,
}

impl<'r, E: ScriptExecutor> Regenerator<'r, E> {
    pub fn new(shapes: &'r ShapeRegistry, executor: E, options: RegenerateOptions) -> Self {
        Self {
            shapes,
            executor,
            options,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Regenerate `path` and overwrite it, keeping the previous version as a backup.
    pub fn regenerate_in_place(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<RegenerationReport, RegenerateError> {
        let path = path.as_ref();
        self.regenerate_to_output(path, path, false)
    }

    /// Regenerate `source` into `output`. With `verify_no_change` any difference from
    /// the previous `output` is reported and rolled back. Published rendering is refused
    /// when `output` is the source itself.
    pub fn regenerate_to_output(
        &mut self,
        source: impl AsRef<Path>,
        output: impl AsRef<Path>,
        verify_no_change: bool,
    ) -> Result<RegenerationReport, RegenerateError> {
        let mut document = Document::open(source.as_ref(), self.shapes)?;
        let source_path = document.source_path().to_path_buf();
        if self.options.mode == RenderMode::Published
            && std::path::absolute(output.as_ref()).is_ok_and(|output| output == source_path)
        {
            return Err(RegenerateError::PublishedInPlace(source_path));
        }

        info!(path = %source_path.display(), scripts = document.scripts().len(), "executing scripts");
        document
            .execute_scripts(&mut self.executor)
            .map_err(|source| RegenerateError::Execution {
                path: source_path.clone(),
                source,
            })?;

        let text = document.render(self.options.mode);
        let outcome = write_with_backup(
            output.as_ref(),
            &text,
            verify_no_change,
            &self.options.writer,
        )?;
        info!(target = %outcome.target.display(), "finished writing");

        Ok(RegenerationReport {
            source: source_path,
            target: outcome.target,
            backup: outcome.backup,
            components: document.components().len(),
            scripts: document.scripts().len(),
            verified: outcome.verified,
        })
    }
}
