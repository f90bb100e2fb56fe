//! Paths into a configuration document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of a path: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(idx) => write!(f, "{}", idx),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(idx: usize) -> Self {
        PathSegment::Index(idx)
    }
}

/// An ordered sequence of keys and indices locating a node.
///
/// Displays joined with `->`, the form used in operator-facing messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigPath(Vec<PathSegment>);

impl ConfigPath {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(|k| PathSegment::Key(k.into())).collect())
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn push(&mut self, segment: impl Into<PathSegment>) {
        self.0.push(segment.into());
    }

    /// Copy of this path extended by one segment.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut path = self.clone();
        path.push(segment);
        path
    }

    /// Copy of `prefix` followed by this path.
    pub fn prefixed(&self, prefix: &ConfigPath) -> Self {
        let mut segments = prefix.0.clone();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathSegment> {
        self.0.iter()
    }
}

impl From<Vec<PathSegment>> for ConfigPath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("->")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_arrow_joined() {
        let mut path = ConfigPath::from_keys(["light", "platform"]);
        path.push(2);
        assert_eq!(path.to_string(), "light->platform->2");
    }

    #[test]
    fn test_prefixed() {
        let inner = ConfigPath::from_keys(["pool", "sensor"]);
        let outer = inner.prefixed(&ConfigPath::from_keys(["core", "packages"]));
        assert_eq!(outer.to_string(), "core->packages->pool->sensor");
    }
}
