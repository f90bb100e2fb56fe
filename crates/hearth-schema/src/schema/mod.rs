//! Schema representation and the [`ConfigSchema`] seam.

mod helpers;
mod parser;
mod types;

pub use types::{NumberSchema, ObjectSchema, Property, StringFormat, StringSchema};

use crate::error::SchemaFailure;
use hearth_config::{ConfigValue, ConfigValueKind, MergePolicy};
use yaml_rust2::Yaml;

/// A configuration schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Accepts anything unchanged
    Any,
    Null,
    Boolean,
    Integer(NumberSchema),
    Number(NumberSchema),
    String(StringSchema),

    /// One of a fixed set of scalars
    Enum(Vec<Yaml>),

    /// Sequence whose items all match the inner schema
    Array(Box<Schema>),

    /// Like `Array`, but null becomes `[]` and a single value is wrapped
    EnsureList(Box<Schema>),

    Object(ObjectSchema),

    /// Mapping with slug keys and values matching the inner schema
    SlugMap(Box<Schema>),

    /// First alternative that accepts the value wins
    AnyOf(Vec<Schema>),

    /// Every schema in turn, each fed the previous one's output
    AllOf(Vec<Schema>),
}

/// Anything that can validate and normalize a configuration value.
///
/// [`Schema`] is the declarative implementation. Integrations with
/// hand-written rules implement this directly.
pub trait ConfigSchema: Send + Sync {
    /// Validate `config`, returning the normalized value.
    fn validate(&self, config: &ConfigValue) -> Result<ConfigValue, SchemaFailure>;

    /// How `domain`'s configuration should accumulate across packages, if
    /// the schema can tell.
    fn merge_policy(&self, _domain: &str) -> Option<MergePolicy> {
        None
    }
}

impl ConfigSchema for Schema {
    fn validate(&self, config: &ConfigValue) -> Result<ConfigValue, SchemaFailure> {
        crate::validator::validate(config, self).map_err(SchemaFailure::from)
    }

    fn merge_policy(&self, domain: &str) -> Option<MergePolicy> {
        self.probe_merge_policy(domain)
    }
}

impl Schema {
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Property)>,
        K: Into<String>,
    {
        Schema::Object(ObjectSchema {
            properties: properties.into_iter().map(|(k, p)| (k.into(), p)).collect(),
            ..ObjectSchema::default()
        })
    }

    pub fn integer() -> Self {
        Schema::Integer(NumberSchema::default())
    }

    pub fn string() -> Self {
        Schema::String(StringSchema::default())
    }

    /// Inspect a domain-level schema to decide between dict and list
    /// accumulation for `domain`.
    ///
    /// The schema must be an object (or an `allOf` containing one; the first
    /// object member is used) that lists `domain` as a property. A default for that property is run
    /// through the whole schema and the shape of the result decides.
    /// Otherwise the property's schema shape does.
    pub fn probe_merge_policy(&self, domain: &str) -> Option<MergePolicy> {
        let object = match self {
            Schema::Object(object) => object,
            Schema::AllOf(schemas) => schemas.iter().find_map(|schema| match schema {
                Schema::Object(object) => Some(object),
                _ => None,
            })?,
            _ => return None,
        };
        let property = object.property(domain)?;

        if let Some(default) = &property.default {
            let probe = ConfigValue::map_from([(domain, default.clone())]);
            if let Ok(validated) = crate::validator::validate(&probe, self) {
                match validated.get(domain).map(|v| &v.value) {
                    Some(ConfigValueKind::Map(_)) => return Some(MergePolicy::Dict),
                    Some(ConfigValueKind::Array(_)) => return Some(MergePolicy::List),
                    _ => {}
                }
            }
        }

        property.schema.shape_policy()
    }

    fn shape_policy(&self) -> Option<MergePolicy> {
        match self {
            Schema::Object(_) | Schema::SlugMap(_) => Some(MergePolicy::Dict),
            Schema::Array(_) | Schema::EnsureList(_) => Some(MergePolicy::List),
            Schema::AllOf(schemas) => match schemas.first() {
                Some(Schema::EnsureList(_)) => Some(MergePolicy::List),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Lowercase `text` and replace every run of non-alphanumeric characters
/// with a single `_`, trimming leading and trailing underscores.
///
/// ```
/// assert_eq!(hearth_schema::slugify("Living Room!"), "living_room");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Schema {
        Schema::from_yaml(&hearth_yaml::parse(src).unwrap()).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("porch_light"), "porch_light");
        assert_eq!(slugify("  Porch -- Light  "), "porch_light");
        assert_eq!(slugify("__x__"), "x");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_probe_from_default() {
        let schema = parse(
            r#"
object:
  closed: false
  properties:
    history:
      schema:
        object:
          properties:
            keep_days: integer
      default: {}
"#,
        );
        assert_eq!(schema.probe_merge_policy("history"), Some(MergePolicy::Dict));
    }

    #[test]
    fn test_probe_from_shape() {
        let list = parse("object:\n  closed: false\n  properties:\n    notify:\n      ensureList: any\n");
        assert_eq!(list.probe_merge_policy("notify"), Some(MergePolicy::List));

        let all_of = parse(
            "object:\n  closed: false\n  properties:\n    notify:\n      allOf:\n        - ensureList: any\n        - arrayOf: any\n",
        );
        assert_eq!(all_of.probe_merge_policy("notify"), Some(MergePolicy::List));

        let slugs = parse("object:\n  closed: false\n  properties:\n    script:\n      slugMap: any\n");
        assert_eq!(slugs.probe_merge_policy("script"), Some(MergePolicy::Dict));
    }

    #[test]
    fn test_probe_all_of_uses_first_object_member() {
        let schema = parse(
            r#"
allOf:
  - any
  - object:
      closed: false
      properties:
        notify:
          ensureList: any
  - object:
      closed: false
      properties:
        notify:
          slugMap: any
"#,
        );
        assert_eq!(schema.probe_merge_policy("notify"), Some(MergePolicy::List));

        let no_object = parse("allOf:\n  - any\n  - string\n");
        assert_eq!(no_object.probe_merge_policy("notify"), None);
    }

    #[test]
    fn test_probe_undecided() {
        let scalar = parse("object:\n  closed: false\n  properties:\n    mode: string\n");
        assert_eq!(scalar.probe_merge_policy("mode"), None);
        assert_eq!(scalar.probe_merge_policy("other"), None);
        assert_eq!(Schema::Any.probe_merge_policy("mode"), None);
    }

    #[test]
    fn test_config_schema_trait_object() {
        let schema: Box<dyn ConfigSchema> = Box::new(Schema::integer());
        assert!(schema.validate(&ConfigValue::integer(3)).is_ok());
        assert!(matches!(
            schema.validate(&ConfigValue::string("x")),
            Err(SchemaFailure::Invalid(_))
        ));
        assert_eq!(schema.merge_policy("x"), None);
    }
}
