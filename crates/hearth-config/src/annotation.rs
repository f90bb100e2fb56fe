//! Source annotations for paths into a document.

use crate::path::PathSegment;
use crate::types::ConfigValue;
use hearth_yaml::SourceInfo;
use serde::Serialize;
use std::fmt;

/// The file and line a document node was written at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub file: String,
    pub line: usize,
}

impl Annotation {
    /// Only locations that name a file count as annotations.
    pub fn from_source_info(info: Option<&SourceInfo>) -> Option<Self> {
        let info = info?;
        Some(Self {
            file: info.file.clone()?,
            line: info.line,
        })
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, line {}", self.file, self.line)
    }
}

/// Find the nearest known source location for `path` in `document`.
///
/// The key that leads to a node is preferred over the node's own location,
/// since that is the line an operator edits. When the addressed node is
/// missing or carries no location the search moves to the enclosing node,
/// until the path is exhausted. Never mutates `document`.
pub fn find_annotation(document: &ConfigValue, path: &[PathSegment]) -> Option<Annotation> {
    find_annotation_rec(document, path, None)
}

fn key_annotation(container: Option<&ConfigValue>, key: &PathSegment) -> Option<Annotation> {
    let PathSegment::Key(key) = key else {
        return None;
    };
    Annotation::from_source_info(container?.key_source(key))
}

fn find_annotation_rec(
    document: &ConfigValue,
    path: &[PathSegment],
    tail: Option<&PathSegment>,
) -> Option<Annotation> {
    let item = document.get_path(path);

    if let (Some(item), Some(tail)) = (item, tail) {
        if item.is_map() {
            if let Some(annotation) = key_annotation(Some(item), tail) {
                return Some(annotation);
            }
        }
    }

    if let (Some(item), Some((last, parent))) = (item, path.split_last()) {
        if item.is_map() || item.is_array() {
            if let Some(annotation) = key_annotation(document.get_path(parent), last) {
                return Some(annotation);
            }
        }
    }

    if let Some(annotation) = item.and_then(|i| Annotation::from_source_info(i.source_info.as_ref())) {
        return Some(annotation);
    }

    let (last, parent) = path.split_last()?;
    find_annotation_rec(document, parent, Some(last))
}
