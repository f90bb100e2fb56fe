//! Schema type definitions
//!
//! Each struct holds the constraints for one kind of schema. Composite
//! kinds (`arrayOf`, `anyOf`, ...) live directly on the [`Schema`] enum.

use hearth_config::ConfigValue;
use indexmap::IndexMap;
use regex::Regex;

use super::Schema;

/// Integer or number constraints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberSchema {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

/// Well-known string formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// Absolute http(s) URL
    Url,
    /// Lowercase word characters only, see [`super::slugify`]
    Slug,
}

/// String constraints
#[derive(Debug, Clone, Default)]
pub struct StringSchema {
    pub pattern: Option<Regex>,
    pub format: Option<StringFormat>,
}

impl PartialEq for StringSchema {
    fn eq(&self, other: &Self) -> bool {
        self.pattern.as_ref().map(Regex::as_str) == other.pattern.as_ref().map(Regex::as_str)
            && self.format == other.format
    }
}

/// One named property of an object schema
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub schema: Schema,
    pub required: bool,

    /// Inserted when the property is absent. Defaults never carry a
    /// source location.
    pub default: Option<ConfigValue>,
}

impl Property {
    pub fn optional(schema: Schema) -> Self {
        Self {
            schema,
            required: false,
            default: None,
        }
    }

    pub fn required(schema: Schema) -> Self {
        Self {
            schema,
            required: true,
            default: None,
        }
    }

    pub fn with_default(mut self, default: ConfigValue) -> Self {
        self.default = Some(default.without_source_info());
        self
    }
}

/// Mapping constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    pub properties: IndexMap<String, Property>,

    /// Reject keys that are neither properties nor matched by `additional`
    pub closed: bool,

    /// Schema for keys that are not listed in `properties`
    pub additional: Option<Box<Schema>>,

    /// Keys that are accepted and silently dropped from the output
    pub remove: Vec<String>,
}

impl Default for ObjectSchema {
    fn default() -> Self {
        Self {
            properties: IndexMap::new(),
            closed: true,
            additional: None,
            remove: Vec::new(),
        }
    }
}

impl ObjectSchema {
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }
}
