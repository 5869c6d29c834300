//! Locating model documents
//!
//! A run names its model either by a short name, looked up in the model
//! library directory, or by an explicit file path.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PbpkError, Result};
use crate::models::ModelDocument;

/// Environment variable overriding the library directory
pub const MODEL_DIR_ENV: &str = "PBPK_MODEL_DIR";

/// File extension of library documents
pub const MODEL_EXTENSION: &str = "json";

/// Where a model document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Looked up as `<library>/<name>.json`
    Named(String),
    /// Read directly
    Path(PathBuf),
}

impl ModelSource {
    pub fn named(name: impl Into<String>) -> Self {
        ModelSource::Named(name.into())
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        ModelSource::Path(path.into())
    }

    /// Interpret a command-line argument
    ///
    /// Anything carrying a path separator or a file extension is a path;
    /// everything else is a library name.
    pub fn parse(value: &str) -> Self {
        let candidate = Path::new(value);
        if candidate.components().count() > 1 || candidate.extension().is_some() {
            ModelSource::Path(candidate.to_path_buf())
        } else {
            ModelSource::Named(value.to_string())
        }
    }

    /// Resolve and read the document
    pub fn load(&self, library: &ModelLibrary) -> Result<ModelDocument> {
        let path = match self {
            ModelSource::Named(name) => library.resolve(name)?,
            ModelSource::Path(path) => {
                if !path.is_file() {
                    return Err(PbpkError::ModelNotFound(path.display().to_string()));
                }
                path.clone()
            }
        };
        log::debug!("Loading model {} from {}", self, path.display());
        ModelDocument::read(&path)
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Named(name) => write!(f, "'{name}'"),
            ModelSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Directory of bundled model documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelLibrary {
    root: PathBuf,
}

impl ModelLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The `models/` directory shipped with the crate
    pub fn bundled() -> Self {
        Self::new(concat!(env!("CARGO_MANIFEST_DIR"), "/models"))
    }

    /// `$PBPK_MODEL_DIR` when set, the bundled directory otherwise
    pub fn from_env() -> Self {
        match std::env::var_os(MODEL_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(dir),
            _ => Self::bundled(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document called `name`
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let path = self.root.join(format!("{name}.{MODEL_EXTENSION}"));
        if path.is_file() {
            Ok(path)
        } else {
            Err(PbpkError::ModelNotFound(format!(
                "'{name}' (looked in {})",
                self.root.display()
            )))
        }
    }

    /// Names of every document in the library, sorted
    pub fn available(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|source| PbpkError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == MODEL_EXTENSION))
            .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        Ok(names)
    }
}

impl Default for ModelLibrary {
    fn default() -> Self {
        Self::from_env()
    }
}
