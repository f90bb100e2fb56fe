//! Source location information for YAML nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a YAML element in the file it was read from.
///
/// Lines and columns are 1-based. The file name is whatever the caller
/// passed to [`crate::parse_file`]; configuration loaders pass a path
/// relative to the configuration directory so messages stay short.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Filename or source identifier
    pub file: Option<String>,

    /// Byte offset from start of source (0-based)
    pub offset: usize,

    /// Line number (1-based)
    pub line: usize,

    /// Column number (1-based, in characters not bytes)
    pub col: usize,

    /// Length in bytes
    pub len: usize,
}

impl SourceInfo {
    pub fn new(file: Option<String>, offset: usize, line: usize, col: usize, len: usize) -> Self {
        Self {
            file,
            offset,
            line,
            col,
            len,
        }
    }

    /// Create a SourceInfo from a yaml-rust2 marker.
    ///
    /// yaml-rust2 lines are already 1-based; its columns are 0-based.
    pub fn from_marker(marker: &yaml_rust2::scanner::Marker, len: usize) -> Self {
        Self {
            file: None,
            offset: marker.index(),
            line: marker.line(),
            col: marker.col() + 1,
            len,
        }
    }

    /// Set the filename for this source location.
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// End offset (exclusive) of this location.
    pub fn end_offset(&self) -> usize {
        self.offset + self.len
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self {
            file: None,
            offset: 0,
            line: 1,
            col: 1,
            len: 0,
        }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}, line {}", file, self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}
