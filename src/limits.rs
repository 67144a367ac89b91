//! Limits and constraints for schema and document processing
//!
//! This module bounds the fixpoint resolution of divided schemas, the nesting
//! depth of every recursive engine, and the amount of text accepted from a
//! source provider.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of fixpoint rounds granted to divided schema resolution.
///
/// Chosen as a fixed retry budget, not derived from the schema.
pub const DEFAULT_RESOLUTION_ROUNDS: usize = 10;

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum number of retry rounds when resolving divided definitions
    pub max_resolution_rounds: usize,

    /// Maximum element nesting depth for parse, encode, decode and validate
    pub max_depth: usize,

    /// Maximum source text size in bytes
    pub max_source_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_resolution_rounds: DEFAULT_RESOLUTION_ROUNDS,
            max_depth: 1000,
            max_source_size: 100 * 1024 * 1024, // 100 MB
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_resolution_rounds: DEFAULT_RESOLUTION_ROUNDS,
            max_depth: 100,
            max_source_size: 10 * 1024 * 1024, // 10 MB
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_resolution_rounds: 100,
            max_depth: 10000,
            max_source_size: 1024 * 1024 * 1024, // 1 GB
        }
    }

    /// Set the fixpoint round budget
    pub fn with_resolution_rounds(mut self, rounds: usize) -> Self {
        self.max_resolution_rounds = rounds;
        self
    }

    /// Set the maximum nesting depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Check if nesting depth is within limits
    pub fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_depth {
            Err(Error::LimitExceeded(format!(
                "nesting depth {} exceeds maximum {}",
                depth, self.max_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if source size is within limits
    pub fn check_source_size(&self, size: usize) -> Result<()> {
        if size > self.max_source_size {
            Err(Error::LimitExceeded(format!(
                "source size {} bytes exceeds maximum {} bytes",
                size, self.max_source_size
            )))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.max_resolution_rounds, 10);
        assert!(limits.check_depth(500).is_ok());
        assert!(limits.check_depth(1500).is_err());
    }

    #[test]
    fn test_strict_limits() {
        let limits = Limits::strict();
        assert!(limits.max_depth < Limits::default().max_depth);
        assert!(limits.check_depth(150).is_err());
    }

    #[test]
    fn test_permissive_limits() {
        let limits = Limits::permissive();
        assert!(limits.max_depth > Limits::default().max_depth);
        assert!(limits.check_depth(5000).is_ok());
    }

    #[test]
    fn test_check_source_size() {
        let limits = Limits::default();
        assert!(limits.check_source_size(1024).is_ok());
        assert!(limits.check_source_size(200 * 1024 * 1024).is_err());
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let limits: Limits = serde_json::from_str(r#"{"max_depth": 7}"#).unwrap();
        assert_eq!(limits.max_depth, 7);
        assert_eq!(limits.max_resolution_rounds, DEFAULT_RESOLUTION_ROUNDS);
    }
}
