//! Source providers
//!
//! Schemas and documents are read, and encoded documents written, through the
//! [`SourceProvider`] trait so the engines never touch files directly.

use crate::error::{Error, Result};
use crate::limits::Limits;
use std::fs;
use std::path::{Path, PathBuf};

/// Line-oriented text source and sink
pub trait SourceProvider {
    /// Read the whole source as lines, without terminators
    fn read_lines(&self) -> Result<Vec<String>>;

    /// Persist produced text
    fn persist(&mut self, text: &str) -> Result<()>;
}

/// File-backed source provider
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    limits: Limits,
}

impl FileSource {
    /// Create a provider for a file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            limits: Limits::default(),
        }
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceProvider for FileSource {
    fn read_lines(&self) -> Result<Vec<String>> {
        let metadata = fs::metadata(&self.path).map_err(|e| {
            Error::Resource(format!("Failed to read file '{}': {}", self.path.display(), e))
        })?;
        self.limits
            .check_source_size(usize::try_from(metadata.len()).unwrap_or(usize::MAX))?;

        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::Resource(format!("Failed to read file '{}': {}", self.path.display(), e))
        })?;
        Ok(content.lines().map(str::to_string).collect())
    }

    fn persist(&mut self, text: &str) -> Result<()> {
        fs::write(&self.path, text).map_err(|e| {
            Error::Resource(format!("Failed to write file '{}': {}", self.path.display(), e))
        })
    }
}

/// In-memory source provider; persisted text is kept for inspection
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    lines: Vec<String>,
    persisted: Vec<String>,
}

impl MemorySource {
    /// Create a provider over text
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            persisted: Vec::new(),
        }
    }

    /// Create a provider over lines
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            persisted: Vec::new(),
        }
    }

    /// Texts persisted so far, oldest first
    pub fn persisted(&self) -> &[String] {
        &self.persisted
    }

    /// The most recently persisted text
    pub fn last_persisted(&self) -> Option<&str> {
        self.persisted.last().map(String::as_str)
    }
}

impl SourceProvider for MemorySource {
    fn read_lines(&self) -> Result<Vec<String>> {
        Ok(self.lines.clone())
    }

    fn persist(&mut self, text: &str) -> Result<()> {
        self.persisted.push(text.to_string());
        Ok(())
    }
}
