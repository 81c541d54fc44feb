//! Shared configuration loader for regenerate.
//!
//! `defaults/regenerate.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer the project file found by
//! [`find_project_config`], explicit files and CLI overrides on top of those defaults
//! via [`Loader`] before deserializing into [`RegenerateConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use regenerate::writer::WriterOptions;
use regenerate::{PageShape, ProcessExecutor, RenderMode, ShapeRegistry};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_TOML: &str = include_str!("../defaults/regenerate.default.toml");

/// Name of the per-project configuration file.
pub const PROJECT_CONFIG_FILE: &str = ".regenerate.toml";

/// Top-level configuration consumed by regenerate applications.
#[derive(Debug, Clone, Deserialize)]
pub struct RegenerateConfig {
    pub output: OutputConfig,
    pub verify: VerifyConfig,
    pub scripts: ScriptsConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub shapes: Vec<ShapeConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub mode: RenderMode,
    pub backup_suffix: String,
    pub new_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyConfig {
    pub enabled: bool,
    pub context_bytes: usize,
}

/// How script blocks are executed.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsConfig {
    pub enabled: bool,
    pub interpreter: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub state_env: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// A page-state shape selectable with `<!-- [class Name] -->`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShapeConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub defaults: Vec<SlotDefault>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotDefault {
    pub slot: String,
    pub value: String,
}

impl RegenerateConfig {
    /// Built-in shapes plus the configured ones.
    pub fn shape_registry(&self) -> ShapeRegistry {
        ShapeRegistry::with_shapes(self.shapes.iter().map(|shape| {
            shape.defaults.iter().fold(
                PageShape::new(&shape.name).with_description(&shape.description),
                |acc, default| acc.with_default(&default.slot, &default.value),
            )
        }))
    }

    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            backup_suffix: self.output.backup_suffix.clone(),
            new_suffix: self.output.new_suffix.clone(),
            context_bytes: self.verify.context_bytes,
        }
    }

    /// The configured interpreter, or `None` when scripts are disabled.
    pub fn process_executor(&self) -> Option<ProcessExecutor> {
        self.scripts.enabled.then(|| {
            ProcessExecutor::new(&self.scripts.interpreter)
                .with_args(self.scripts.args.iter().cloned())
                .with_state_env(&self.scripts.state_env)
        })
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer the project file governing `document`, if there is one.
    pub fn with_project_file_for(self, document: impl AsRef<Path>) -> Self {
        match find_project_config(document) {
            Some(path) => self.with_file(path),
            None => self,
        }
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<RegenerateConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<RegenerateConfig, ConfigError> {
    Loader::new().build()
}

/// Look for [`PROJECT_CONFIG_FILE`] in `path` (when it is a directory) and each of its
/// parent directories, nearest first.
pub fn find_project_config(path: impl AsRef<Path>) -> Option<PathBuf> {
    path.as_ref()
        .ancestors()
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}
