//! Document Parser
//!
//! Drives the component lifecycle over a document's lines. Lines are consumed one at
//! a time; each is either plain text, which accumulates into the open component, or a
//! directive, which opens or closes a component.
//!
//! # State machine
//!
//! ```text
//! NoComponentOpen    --plain-->      PlainTextOpen       (open implicit plain text)
//! PlainTextOpen      --plain-->      PlainTextOpen
//! PlainTextOpen      --directive-->  NoComponentOpen     (close plain text, re-dispatch)
//! NoComponentOpen    --open-->       NamedComponentOpen  (self-closing: NoComponentOpen)
//! NoComponentOpen    --close-->      error: nothing open
//! NamedComponentOpen --plain-->      NamedComponentOpen  (body line)
//! NamedComponentOpen --open-->       error: nested open
//! NamedComponentOpen --close-->      NoComponentOpen     (names must match)
//! ```
//!
//! At end of input open plain text is closed; an open named component is an error.
//!
//! The currently open component is always the last one in the sequence.

use crate::component::Component;
use crate::directive::{recognize, DirectiveLine, GrammarError};
use crate::page_state::{PageState, SlotError};
use crate::regenerate::RegenerateError;
use crate::render::{render_document, RenderMode};
use crate::script::{ExecutionError, ScriptExecutor};
use crate::shapes::ShapeRegistry;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Component lifecycle violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("unexpected section start {0:?} inside component, nested open not permitted")]
    NestedOpen(String),
    #[error("unexpected section end {0:?}, nothing open")]
    UnexpectedClose(String),
    #[error("name {close:?} in end comment doesn't match name {open:?} in start comment")]
    NameMismatch { open: String, close: String },
    #[error("unterminated component {name:?} (opened at line {start_line}) at end of document")]
    Unterminated { name: String, start_line: usize },
    #[error("end comment for rendered slot {0:?} does not have a comment start")]
    RenderedCloseWithoutCommentStart(String),
    #[error("end comment for comment-only slot {0:?} has an unexpected comment start")]
    CommentCloseWithCommentStart(String),
    #[error("unknown page shape {0:?}")]
    UnknownShape(String),
    #[error(transparent)]
    Slot(SlotError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    State(#[from] StateError),
}

/// A fatal parse failure, with the line that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line_number: usize,
    /// Offending line; absent when the error is detected at end of input
    pub line: Option<String>,
    pub kind: ParseErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.line {
            Some(line) => write!(
                f,
                "error parsing line {} {:?}: {}",
                self.line_number, line, self.kind
            ),
            None => write!(f, "error at end of document: {}", self.kind),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// A script collected at parse time, executed after parsing completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedScript {
    /// Line number of the first body line
    pub line_number: usize,
    pub source: String,
}

/// Page-scoped state that component close hooks act on.
#[derive(Debug)]
pub struct PageContext<'r> {
    pub state: PageState,
    pub scripts: Vec<QueuedScript>,
    pub shapes: &'r ShapeRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    NoComponentOpen,
    PlainTextOpen,
    NamedComponentOpen,
}

/// A parsed document: its component sequence and page state.
#[derive(Debug)]
pub struct Document<'r> {
    source_path: PathBuf,
    components: Vec<Component>,
    context: PageContext<'r>,
}

impl<'r> Document<'r> {
    /// Read and parse the file at `path`.
    pub fn open(path: impl AsRef<Path>, shapes: &'r ShapeRegistry) -> Result<Self, RegenerateError> {
        let path = path.as_ref();
        let read_err = |source| RegenerateError::Read {
            path: path.to_path_buf(),
            source,
        };
        let source_path = std::path::absolute(path).map_err(read_err)?;
        info!(path = %source_path.display(), "opening document");
        let source = fs::read_to_string(&source_path).map_err(read_err)?;
        Self::parse_str(&source, &source_path, shapes).map_err(|source| RegenerateError::Parse {
            path: source_path.clone(),
            source,
        })
    }

    /// Parse document text. `source_path` seeds the built-in page-state slots.
    pub fn parse_str(
        source: &str,
        source_path: impl AsRef<Path>,
        shapes: &'r ShapeRegistry,
    ) -> Result<Self, ParseError> {
        let mut parser = DocumentParser::new(source_path.as_ref(), shapes);
        for (index, line) in source.lines().enumerate() {
            parser.process_line(line, index + 1)?;
        }
        parser.finish(source.lines().count())
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Scripts in document order, not yet executed
    pub fn scripts(&self) -> &[QueuedScript] {
        &self.context.scripts
    }

    pub fn state(&self) -> &PageState {
        &self.context.state
    }

    pub fn state_mut(&mut self) -> &mut PageState {
        &mut self.context.state
    }

    /// Run every queued script, in document order, against the page state. The first
    /// failure aborts the run.
    pub fn execute_scripts<E>(&mut self, executor: &mut E) -> Result<(), ExecutionError>
    where
        E: ScriptExecutor + ?Sized,
    {
        for script in &self.context.scripts {
            debug!(line = script.line_number, "executing script");
            executor
                .execute(&script.source, script.line_number, &mut self.context.state)
                .map_err(|source| ExecutionError {
                    line_number: script.line_number,
                    source,
                })?;
        }
        Ok(())
    }

    pub fn render(&self, mode: RenderMode) -> String {
        render_document(&self.components, &self.context.state, mode)
    }
}

struct DocumentParser<'r> {
    source_path: PathBuf,
    components: Vec<Component>,
    context: PageContext<'r>,
    state: ParserState,
}

impl<'r> DocumentParser<'r> {
    fn new(source_path: &Path, shapes: &'r ShapeRegistry) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            components: Vec::new(),
            context: PageContext {
                state: PageState::new(shapes.default_shape(), source_path),
                scripts: Vec::new(),
                shapes,
            },
            state: ParserState::NoComponentOpen,
        }
    }

    fn process_line(&mut self, line: &str, line_number: usize) -> Result<(), ParseError> {
        let error = |kind: ParseErrorKind| ParseError {
            line_number,
            line: Some(line.to_string()),
            kind,
        };
        match recognize(line).map_err(|e| error(e.into()))? {
            Some(directive) => self
                .process_directive(&directive, line_number)
                .map_err(|e| error(e.into())),
            None => {
                self.process_text_line(line, line_number);
                Ok(())
            }
        }
    }

    fn process_text_line(&mut self, line: &str, line_number: usize) {
        if self.state == ParserState::NoComponentOpen {
            self.components.push(Component::plain_text(line_number));
            self.state = ParserState::PlainTextOpen;
        }
        if let Some(current) = self.components.last_mut() {
            current.push_line(line);
        }
    }

    fn process_directive(
        &mut self,
        directive: &DirectiveLine,
        line_number: usize,
    ) -> Result<(), StateError> {
        if self.state == ParserState::PlainTextOpen {
            self.finish_current()?;
        }

        if self.state == ParserState::NamedComponentOpen {
            if directive.has_section_open {
                return Err(StateError::NestedOpen(directive.to_string()));
            }
            if let Some(current) = self.components.last_mut() {
                current.close(directive, &mut self.context)?;
            }
            self.state = ParserState::NoComponentOpen;
            return Ok(());
        }

        if !directive.has_section_open {
            return Err(StateError::UnexpectedClose(directive.to_string()));
        }
        self.components.push(Component::open(directive, line_number));
        self.state = ParserState::NamedComponentOpen;
        if directive.is_self_closing() {
            self.finish_current()?;
        }
        Ok(())
    }

    fn finish_current(&mut self) -> Result<(), StateError> {
        if let Some(current) = self.components.last_mut() {
            current.finish(&mut self.context)?;
        }
        self.state = ParserState::NoComponentOpen;
        Ok(())
    }

    fn finish(mut self, line_count: usize) -> Result<Document<'r>, ParseError> {
        match self.state {
            ParserState::NoComponentOpen => {}
            ParserState::PlainTextOpen => {
                self.finish_current().map_err(|e| ParseError {
                    line_number: line_count,
                    line: None,
                    kind: e.into(),
                })?;
            }
            ParserState::NamedComponentOpen => {
                let (name, start_line) = self
                    .components
                    .last()
                    .map(|c| (c.name().unwrap_or_default().to_string(), c.start_line()))
                    .unwrap_or_default();
                return Err(ParseError {
                    line_number: line_count,
                    line: None,
                    kind: StateError::Unterminated { name, start_line }.into(),
                });
            }
        }
        debug!(
            components = self.components.len(),
            scripts = self.context.scripts.len(),
            "parsed document"
        );
        Ok(Document {
            source_path: self.source_path,
            components: self.components,
            context: self.context,
        })
    }
}
