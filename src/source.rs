//! Source retrieval.
//!
//! The analyzer never reads code on its own; it asks a [`SourceResolver`] for
//! the text that defines a function. A resolver that cannot produce text makes
//! the run stop with [`Outcome::SourceUnavailable`](crate::analysis::Outcome).
//!
//! Provided resolvers:
//!
//! - [`SourceMap`]: in-memory text keyed by function name,
//! - [`SourceDir`]: one `<name>.fn` file per function in a directory,
//! - any `Fn(&FunctionHandle) -> Option<String>` closure.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::parser::{parse_source, ParseError};

/// Names the function under analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionHandle(String);

impl FunctionHandle {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionHandle(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FunctionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FunctionHandle {
    fn from(name: &str) -> Self {
        FunctionHandle::new(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no source available for `{0}`")]
    NotFound(String),
    #[error("source for `{0}` is empty")]
    Empty(String),
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Looks up the defining text of a function.
pub trait SourceResolver {
    fn resolve(&self, handle: &FunctionHandle) -> Result<String, SourceError>;
}

impl<F> SourceResolver for F
where
    F: Fn(&FunctionHandle) -> Option<String>,
{
    fn resolve(&self, handle: &FunctionHandle) -> Result<String, SourceError> {
        (self)(handle).ok_or_else(|| SourceError::NotFound(handle.name().to_string()))
    }
}

fn non_empty(handle: &FunctionHandle, text: String) -> Result<String, SourceError> {
    if text.trim().is_empty() {
        Err(SourceError::Empty(handle.name().to_string()))
    } else {
        Ok(text)
    }
}

/// In-memory sources keyed by function name.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    entries: HashMap<String, String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.entries.insert(name.into(), source.into());
    }

    pub fn with(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(name, source);
        self
    }

    /// Registers `text` under the name of every top-level function it defines.
    ///
    /// Returns the names in definition order.
    pub fn insert_unit(&mut self, text: &str) -> Result<Vec<String>, ParseError> {
        let unit = parse_source(text)?;
        let names: Vec<String> = unit.names().map(str::to_string).collect();
        for name in &names {
            self.entries.insert(name.clone(), text.to_string());
        }
        Ok(names)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SourceResolver for SourceMap {
    fn resolve(&self, handle: &FunctionHandle) -> Result<String, SourceError> {
        match self.entries.get(handle.name()) {
            Some(text) => non_empty(handle, text.clone()),
            None => Err(SourceError::NotFound(handle.name().to_string())),
        }
    }
}

/// Reads `<root>/<name>.fn`.
#[derive(Debug, Clone)]
pub struct SourceDir {
    root: PathBuf,
}

impl SourceDir {
    pub const EXTENSION: &'static str = "fn";

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, handle: &FunctionHandle) -> PathBuf {
        self.root.join(handle.name()).with_extension(Self::EXTENSION)
    }
}

impl SourceResolver for SourceDir {
    fn resolve(&self, handle: &FunctionHandle) -> Result<String, SourceError> {
        let path = self.path_for(handle);
        debug!("reading source for {} from {}", handle, path.display());
        read_source_file(&path)
    }
}

/// Reads a whole source file.
///
/// A missing file is [`SourceError::NotFound`], blank content is [`SourceError::Empty`].
pub fn read_source_file(path: &Path) -> Result<String, SourceError> {
    let label = || path.display().to_string();
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Err(SourceError::Empty(label())),
        Ok(text) => Ok(text),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SourceError::NotFound(label())),
        Err(source) => Err(SourceError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
