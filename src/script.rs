//! Script execution boundary
//!
//! The engine never interprets script blocks itself. It hands each queued script, in
//! document order, to a [`ScriptExecutor`] together with the script's first body line
//! number and mutable access to the page state.
//!
//! Two executors ship with the crate: [`NoScripts`], which refuses to run anything, and
//! [`ProcessExecutor`], which pipes each script into an external interpreter.

use crate::page_state::PageState;
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;
use tracing::debug;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Outcome of running one script.
pub type ScriptResult = Result<(), BoxError>;

/// A script block failed when run against the page state.
#[derive(Debug, Error)]
#[error("script at line {line_number} failed: {source}")]
pub struct ExecutionError {
    pub line_number: usize,
    #[source]
    pub source: BoxError,
}

/// Runs script source text against a page state.
pub trait ScriptExecutor {
    fn execute(&mut self, source: &str, line_number: usize, state: &mut PageState)
        -> ScriptResult;
}

impl<F> ScriptExecutor for F
where
    F: FnMut(&str, usize, &mut PageState) -> ScriptResult,
{
    fn execute(&mut self, source: &str, line_number: usize, state: &mut PageState) -> ScriptResult {
        self(source, line_number, state)
    }
}

/// Executor for documents that must not contain scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScripts;

impl ScriptExecutor for NoScripts {
    fn execute(&mut self, _source: &str, _line_number: usize, _state: &mut PageState) -> ScriptResult {
        Err("no script interpreter is configured".into())
    }
}

/// Environment variable holding the page state as a JSON object.
pub const DEFAULT_STATE_ENV: &str = "REGENERATE_PAGE_STATE";
/// Environment variable holding the script's first body line number.
pub const LINE_ENV: &str = "REGENERATE_SCRIPT_LINE";

/// Runs each script through an external interpreter.
///
/// The script body is written to the interpreter's stdin, the current page state is
/// passed as a JSON object in an environment variable, and the working directory is
/// the document's directory. The interpreter may print a JSON object of slot updates
/// on stdout: string values set a slot, `null` clears it. Empty output changes
/// nothing; a non-zero exit status fails the script.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    pub program: String,
    pub args: Vec<String>,
    pub state_env: String,
    pub working_dir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            state_env: DEFAULT_STATE_ENV.to_string(),
            working_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_state_env(mut self, name: impl Into<String>) -> Self {
        self.state_env = name.into();
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl ScriptExecutor for ProcessExecutor {
    fn execute(&mut self, source: &str, line_number: usize, state: &mut PageState) -> ScriptResult {
        let state_json = serde_json::to_string(&slot_map(state))?;
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(&self.state_env, state_json)
            .env(LINE_ENV, line_number.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let dir = self
            .working_dir
            .clone()
            .or_else(|| state.get(crate::page_state::SOURCE_DIR_SLOT).map(PathBuf::from));
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }

        debug!(program = %self.program, line = line_number, "spawning script interpreter");
        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();
        // Feed the body while `wait_with_output` drains stdout and stderr.
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || -> io::Result<()> {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(source.as_bytes())?;
                    stdin.write_all(b"\n")?;
                }
                Ok(())
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = format!("{} exited with {}: {}", self.program, output.status, stderr.trim());
            return Err(message.into());
        }
        match written {
            Ok(Ok(())) => {}
            // The interpreter stopped reading early and still exited cleanly
            Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err("script input writer panicked".into()),
        }

        let stdout = String::from_utf8(output.stdout)?;
        if stdout.trim().is_empty() {
            return Ok(());
        }
        apply_updates(&stdout, state)
    }
}

fn slot_map(state: &PageState) -> Map<String, Value> {
    state
        .iter()
        .map(|(slot, value)| (slot.to_string(), Value::String(value.to_string())))
        .collect()
}

/// Apply a JSON object of slot updates to `state`.
pub fn apply_updates(json: &str, state: &mut PageState) -> ScriptResult {
    let updates: Map<String, Value> = serde_json::from_str(json)?;
    for (slot, value) in updates {
        match value {
            Value::Null => state.clear(&slot)?,
            Value::String(text) => state.set(&slot, text)?,
            other => {
                return Err(format!("slot {slot:?} must be a string or null, got {other}").into())
            }
        }
    }
    Ok(())
}
