//! YAML value with source location tracking.

use crate::SourceInfo;
use yaml_rust2::Yaml;

/// A YAML value with source location information.
///
/// Wraps an owned `yaml-rust2::Yaml` value with a parallel `Children`
/// structure that carries the location of every element. Mapping children
/// are kept as [`YamlHashEntry`] values so the key's location survives
/// alongside the value's.
///
/// ```rust
/// use hearth_yaml::parse_file;
///
/// let yaml = parse_file("light:\n  - platform: hue\n", "configuration.yaml").unwrap();
/// let entry = yaml.get_hash_entry("light").unwrap();
/// assert_eq!(entry.key_span.line, 1);
/// assert_eq!(entry.value.as_array().unwrap().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct YamlWithSourceInfo {
    /// The complete yaml-rust2::Yaml value (owned).
    pub yaml: Yaml,

    /// Source location for this node.
    pub source_info: SourceInfo,

    /// Local tag on this node (e.g. `secret` for `!secret`) and the
    /// location of the tagged node.
    pub tag: Option<(String, SourceInfo)>,

    children: Children,
}

/// Source-tracked children of a YAML node.
#[derive(Debug, Clone)]
enum Children {
    /// No children (for scalars, Null, BadValue)
    None,

    /// Array elements with source tracking
    Array(Vec<YamlWithSourceInfo>),

    /// Hash entries with source tracking
    Hash(Vec<YamlHashEntry>),
}

/// A key-value pair in a YAML mapping with source tracking.
#[derive(Debug, Clone)]
pub struct YamlHashEntry {
    pub key: YamlWithSourceInfo,
    pub value: YamlWithSourceInfo,

    /// Source location of just the key
    pub key_span: SourceInfo,

    /// Source location of the entire entry (key + value)
    pub entry_span: SourceInfo,
}

impl YamlWithSourceInfo {
    /// Create a new YamlWithSourceInfo for a scalar or leaf node.
    pub fn new_scalar(yaml: Yaml, source_info: SourceInfo) -> Self {
        Self {
            yaml,
            source_info,
            tag: None,
            children: Children::None,
        }
    }

    /// Create a new YamlWithSourceInfo for an array/sequence.
    pub fn new_array(yaml: Yaml, source_info: SourceInfo, children: Vec<YamlWithSourceInfo>) -> Self {
        Self {
            yaml,
            source_info,
            tag: None,
            children: Children::Array(children),
        }
    }

    /// Create a new YamlWithSourceInfo for a hash/mapping.
    pub fn new_hash(yaml: Yaml, source_info: SourceInfo, entries: Vec<YamlHashEntry>) -> Self {
        Self {
            yaml,
            source_info,
            tag: None,
            children: Children::Hash(entries),
        }
    }

    /// Attach a local tag to this node.
    pub fn with_tag(mut self, tag: Option<(String, SourceInfo)>) -> Self {
        self.tag = tag;
        self
    }

    /// The tag suffix, if the node was written with a local tag.
    pub fn tag_name(&self) -> Option<&str> {
        self.tag.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.children, Children::None)
    }

    pub fn is_array(&self) -> bool {
        matches!(self.children, Children::Array(_))
    }

    pub fn is_hash(&self) -> bool {
        matches!(self.children, Children::Hash(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.yaml, Yaml::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.yaml.as_str()
    }

    /// Get array children if this is an array.
    pub fn as_array(&self) -> Option<&[YamlWithSourceInfo]> {
        match &self.children {
            Children::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get hash entries if this is a hash.
    pub fn as_hash(&self) -> Option<&[YamlHashEntry]> {
        match &self.children {
            Children::Hash(entries) => Some(entries),
            _ => None,
        }
    }

    /// Find a mapping entry by key (string comparison).
    pub fn get_hash_entry(&self, key: &str) -> Option<&YamlHashEntry> {
        self.as_hash()?
            .iter()
            .find(|entry| entry.key.yaml.as_str() == Some(key))
    }

    /// Get a value from a hash by key (string comparison).
    pub fn get_hash_value(&self, key: &str) -> Option<&YamlWithSourceInfo> {
        self.get_hash_entry(key).map(|entry| &entry.value)
    }

    /// Get an array element by index.
    pub fn get_array_item(&self, index: usize) -> Option<&YamlWithSourceInfo> {
        self.as_array()?.get(index)
    }

    /// Number of children (array length or hash entry count).
    pub fn len(&self) -> usize {
        match &self.children {
            Children::None => 0,
            Children::Array(items) => items.len(),
            Children::Hash(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume self and return array children if this is an array.
    pub fn into_array(self) -> Option<(Vec<YamlWithSourceInfo>, SourceInfo)> {
        match self.children {
            Children::Array(items) => Some((items, self.source_info)),
            _ => None,
        }
    }

    /// Consume self and return hash entries if this is a hash.
    pub fn into_hash(self) -> Option<(Vec<YamlHashEntry>, SourceInfo)> {
        match self.children {
            Children::Hash(entries) => Some((entries, self.source_info)),
            _ => None,
        }
    }
}

impl YamlHashEntry {
    pub fn new(
        key: YamlWithSourceInfo,
        value: YamlWithSourceInfo,
        key_span: SourceInfo,
        entry_span: SourceInfo,
    ) -> Self {
        Self {
            key,
            value,
            key_span,
            entry_span,
        }
    }
}
