//! Core type definitions for configuration documents.

use crate::path::PathSegment;
use hearth_yaml::SourceInfo;
use indexmap::IndexMap;
use std::fmt;
use yaml_rust2::Yaml;

/// A configuration value with optional source location.
///
/// Values read from a file carry the location they were written at. Values
/// synthesized during merging or validation (defaults, newly created
/// mappings) have `source_info: None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValue {
    pub value: ConfigValueKind,

    pub source_info: Option<SourceInfo>,

    /// Local YAML tag the value was written with, until resolved by the loader.
    pub tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValueKind {
    /// Atomic values (String, Integer, Real, Boolean, Null).
    Scalar(Yaml),

    Array(Vec<ConfigValue>),

    /// Insertion-ordered mapping. Keys are always strings.
    Map(IndexMap<String, ConfigMapEntry>),
}

/// A mapping value together with the location of its key.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigMapEntry {
    pub key_source: Option<SourceInfo>,
    pub value: ConfigValue,
}

impl ConfigMapEntry {
    pub fn new(value: ConfigValue) -> Self {
        Self {
            key_source: None,
            value,
        }
    }

    pub fn with_key_source(mut self, key_source: Option<SourceInfo>) -> Self {
        self.key_source = key_source;
        self
    }
}

impl Default for ConfigValue {
    fn default() -> Self {
        Self::null()
    }
}

impl ConfigValue {
    pub fn new_scalar(yaml: Yaml) -> Self {
        Self {
            value: ConfigValueKind::Scalar(yaml),
            source_info: None,
            tag: None,
        }
    }

    pub fn new_array(items: Vec<ConfigValue>) -> Self {
        Self {
            value: ConfigValueKind::Array(items),
            source_info: None,
            tag: None,
        }
    }

    pub fn new_map(entries: IndexMap<String, ConfigMapEntry>) -> Self {
        Self {
            value: ConfigValueKind::Map(entries),
            source_info: None,
            tag: None,
        }
    }

    /// An empty mapping without source location.
    pub fn empty_map() -> Self {
        Self::new_map(IndexMap::new())
    }

    pub fn null() -> Self {
        Self::new_scalar(Yaml::Null)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new_scalar(Yaml::String(s.into()))
    }

    pub fn integer(i: i64) -> Self {
        Self::new_scalar(Yaml::Integer(i))
    }

    pub fn boolean(b: bool) -> Self {
        Self::new_scalar(Yaml::Boolean(b))
    }

    /// Build a mapping from key/value pairs, without key locations.
    pub fn map_from<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, ConfigValue)>,
        K: Into<String>,
    {
        Self::new_map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), ConfigMapEntry::new(v)))
                .collect(),
        )
    }

    pub fn with_source_info(mut self, source_info: Option<SourceInfo>) -> Self {
        self.source_info = source_info;
        self
    }

    /// Deep copy with every value and key location removed.
    pub fn without_source_info(&self) -> Self {
        let value = match &self.value {
            ConfigValueKind::Scalar(yaml) => ConfigValueKind::Scalar(yaml.clone()),
            ConfigValueKind::Array(items) => {
                ConfigValueKind::Array(items.iter().map(ConfigValue::without_source_info).collect())
            }
            ConfigValueKind::Map(entries) => ConfigValueKind::Map(
                entries
                    .iter()
                    .map(|(k, entry)| (k.clone(), ConfigMapEntry::new(entry.value.without_source_info())))
                    .collect(),
            ),
        };
        Self {
            value,
            source_info: None,
            tag: self.tag.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value, ConfigValueKind::Scalar(Yaml::Null))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.value, ConfigValueKind::Scalar(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.value, ConfigValueKind::Array(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.value, ConfigValueKind::Map(_))
    }

    pub fn as_yaml(&self) -> Option<&Yaml> {
        match &self.value {
            ConfigValueKind::Scalar(yaml) => Some(yaml),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_yaml().and_then(Yaml::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_yaml().and_then(Yaml::as_bool)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_yaml().and_then(Yaml::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.as_yaml()? {
            Yaml::Integer(i) => Some(*i as f64),
            Yaml::Real(r) => r.parse().ok(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ConfigValue]> {
        match &self.value {
            ConfigValueKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ConfigMapEntry>> {
        match &self.value {
            ConfigValueKind::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, ConfigMapEntry>> {
        match &mut self.value {
            ConfigValueKind::Map(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<ConfigValue>> {
        match self.value {
            ConfigValueKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_map(self) -> Option<IndexMap<String, ConfigMapEntry>> {
        match self.value {
            ConfigValueKind::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a mapping value by key.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_map()?.get(key).map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigValue> {
        self.as_map_mut()?.get_mut(key).map(|entry| &mut entry.value)
    }

    /// Location of `key` inside this mapping.
    pub fn key_source(&self, key: &str) -> Option<&SourceInfo> {
        self.as_map()?.get(key)?.key_source.as_ref()
    }

    /// Walk `path` from this node. Keys only address mappings and indices
    /// only address sequences.
    pub fn get_path(&self, path: &[PathSegment]) -> Option<&ConfigValue> {
        path.iter().try_fold(self, |node, segment| match segment {
            PathSegment::Key(key) => node.get(key),
            PathSegment::Index(idx) => node.as_array()?.get(*idx),
        })
    }

    /// Insert or replace `key`, keeping the key's recorded location when
    /// the key already exists. Returns `false` if this is not a mapping.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) -> bool {
        let Some(entries) = self.as_map_mut() else {
            return false;
        };
        let key = key.into();
        match entries.get_mut(&key) {
            Some(entry) => entry.value = value,
            None => {
                entries.insert(key, ConfigMapEntry::new(value));
            }
        }
        true
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<ConfigMapEntry> {
        self.as_map_mut()?.shift_remove(key)
    }

    /// Truthiness used when dropping entries from merged lists: null,
    /// `false`, zero, empty strings and empty collections are falsy.
    pub fn is_falsy(&self) -> bool {
        match &self.value {
            ConfigValueKind::Scalar(yaml) => match yaml {
                Yaml::Null | Yaml::BadValue => true,
                Yaml::Boolean(b) => !b,
                Yaml::Integer(i) => *i == 0,
                Yaml::Real(r) => r.parse::<f64>().map(|f| f == 0.0).unwrap_or(false),
                Yaml::String(s) => s.is_empty(),
                _ => false,
            },
            ConfigValueKind::Array(items) => items.is_empty(),
            ConfigValueKind::Map(entries) => entries.is_empty(),
        }
    }

    /// Short type name used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match &self.value {
            ConfigValueKind::Scalar(yaml) => match yaml {
                Yaml::String(_) => "str",
                Yaml::Integer(_) => "int",
                Yaml::Real(_) => "float",
                Yaml::Boolean(_) => "bool",
                Yaml::Null => "null",
                _ => "value",
            },
            ConfigValueKind::Array(_) => "list",
            ConfigValueKind::Map(_) => "dictionary",
        }
    }

    /// Convert to JSON, dropping source locations.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match &self.value {
            ConfigValueKind::Scalar(yaml) => match yaml {
                Yaml::String(s) => Value::String(s.clone()),
                Yaml::Integer(i) => Value::from(*i),
                Yaml::Real(r) => r
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map_or_else(|| Value::String(r.clone()), Value::Number),
                Yaml::Boolean(b) => Value::Bool(*b),
                _ => Value::Null,
            },
            ConfigValueKind::Array(items) => {
                Value::Array(items.iter().map(ConfigValue::to_json).collect())
            }
            ConfigValueKind::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, entry)| (k.clone(), entry.value.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Compact flow-style rendering used when quoting an offending value.
impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            ConfigValueKind::Scalar(yaml) => match yaml {
                Yaml::String(s) => write!(f, "'{}'", s),
                Yaml::Integer(i) => write!(f, "{}", i),
                Yaml::Real(r) => write!(f, "{}", r),
                Yaml::Boolean(b) => write!(f, "{}", b),
                _ => write!(f, "null"),
            },
            ConfigValueKind::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            ConfigValueKind::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, entry)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}': {}", key, entry.value)?;
                }
                f.write_str("}")
            }
        }
    }
}
