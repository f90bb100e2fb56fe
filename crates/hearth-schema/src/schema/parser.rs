//! Reading schemas from YAML
//!
//! Shorthand strings name primitive schemas (`string`, `integer`, ...). An
//! inline sequence is an enum. Everything else is a single-key mapping whose
//! key names the schema kind:
//!
//! ```yaml
//! object:
//!   closed: false
//!   properties:
//!     host: string
//!     port:
//!       schema: {integer: {minimum: 1, maximum: 65535}}
//!       default: 80
//!     tags:
//!       ensureList: string
//!   required: [host]
//!   remove: [legacy_option]
//! ```

use super::helpers::{get_hash_bool, get_hash_number, get_hash_string, get_hash_string_array, single_key};
use super::{NumberSchema, ObjectSchema, Property, Schema, StringFormat, StringSchema};
use crate::error::{SchemaError, SchemaResult};
use hearth_config::config_value_from_yaml;
use hearth_yaml::YamlWithSourceInfo;
use indexmap::IndexMap;
use regex::Regex;

impl Schema {
    /// Build a schema from its YAML definition.
    pub fn from_yaml(yaml: &YamlWithSourceInfo) -> SchemaResult<Schema> {
        if let Some(name) = yaml.as_str() {
            return parse_shorthand(name);
        }
        if yaml.is_null() {
            return Ok(Schema::Null);
        }
        if yaml.is_array() {
            return parse_enum_schema(yaml);
        }
        if !yaml.is_hash() {
            return Err(SchemaError::InvalidStructure {
                message: "Expected a schema name, an enum or a mapping".to_string(),
                location: yaml.source_info.clone(),
            });
        }

        let (kind, body) = single_key(yaml)?;
        match kind {
            "enum" => parse_enum_schema(body),
            "integer" => Ok(Schema::Integer(parse_number_schema(body)?)),
            "number" => Ok(Schema::Number(parse_number_schema(body)?)),
            "string" => parse_string_schema(body),
            "arrayOf" => Ok(Schema::Array(Box::new(Schema::from_yaml(body)?))),
            "ensureList" => Ok(Schema::EnsureList(Box::new(Schema::from_yaml(body)?))),
            "slugMap" => Ok(Schema::SlugMap(Box::new(Schema::from_yaml(body)?))),
            "anyOf" => Ok(Schema::AnyOf(parse_schema_list(kind, body)?)),
            "allOf" => Ok(Schema::AllOf(parse_schema_list(kind, body)?)),
            "object" => parse_object_schema(body),
            other => Err(SchemaError::InvalidType(other.to_string())),
        }
    }
}

fn parse_shorthand(name: &str) -> SchemaResult<Schema> {
    match name {
        "any" => Ok(Schema::Any),
        "null" => Ok(Schema::Null),
        "boolean" => Ok(Schema::Boolean),
        "integer" => Ok(Schema::integer()),
        "number" => Ok(Schema::Number(NumberSchema::default())),
        "string" => Ok(Schema::string()),
        "url" => Ok(Schema::String(StringSchema {
            pattern: None,
            format: Some(StringFormat::Url),
        })),
        "slug" => Ok(Schema::String(StringSchema {
            pattern: None,
            format: Some(StringFormat::Slug),
        })),
        other => Err(SchemaError::InvalidType(other.to_string())),
    }
}

fn parse_enum_schema(yaml: &YamlWithSourceInfo) -> SchemaResult<Schema> {
    let items = yaml.as_array().ok_or_else(|| SchemaError::InvalidStructure {
        message: "Expected array for enum".to_string(),
        location: yaml.source_info.clone(),
    })?;
    let values = items
        .iter()
        .map(|item| {
            if item.is_scalar() {
                Ok(item.yaml.clone())
            } else {
                Err(SchemaError::InvalidStructure {
                    message: "Enum values must be scalars".to_string(),
                    location: item.source_info.clone(),
                })
            }
        })
        .collect::<SchemaResult<Vec<_>>>()?;
    Ok(Schema::Enum(values))
}

fn parse_number_schema(yaml: &YamlWithSourceInfo) -> SchemaResult<NumberSchema> {
    if yaml.is_null() {
        return Ok(NumberSchema::default());
    }
    Ok(NumberSchema {
        minimum: get_hash_number(yaml, "minimum")?,
        maximum: get_hash_number(yaml, "maximum")?,
    })
}

fn parse_string_schema(yaml: &YamlWithSourceInfo) -> SchemaResult<Schema> {
    if yaml.is_null() {
        return Ok(Schema::string());
    }
    let pattern = match get_hash_string(yaml, "pattern")? {
        Some(pattern) => Some(Regex::new(pattern).map_err(|e| SchemaError::InvalidStructure {
            message: format!("Invalid regex pattern '{}': {}", pattern, e),
            location: yaml.source_info.clone(),
        })?),
        None => None,
    };
    let format = match get_hash_string(yaml, "format")? {
        Some("url") => Some(StringFormat::Url),
        Some("slug") => Some(StringFormat::Slug),
        Some(other) => {
            return Err(SchemaError::InvalidStructure {
                message: format!("Unknown string format '{}'", other),
                location: yaml.source_info.clone(),
            });
        }
        None => None,
    };
    Ok(Schema::String(StringSchema { pattern, format }))
}

fn parse_schema_list(kind: &str, yaml: &YamlWithSourceInfo) -> SchemaResult<Vec<Schema>> {
    let items = yaml.as_array().ok_or_else(|| SchemaError::InvalidStructure {
        message: format!("{} expects an array of schemas", kind),
        location: yaml.source_info.clone(),
    })?;
    items.iter().map(Schema::from_yaml).collect()
}

fn parse_object_schema(yaml: &YamlWithSourceInfo) -> SchemaResult<Schema> {
    if yaml.is_null() {
        return Ok(Schema::Object(ObjectSchema::default()));
    }

    let mut properties = IndexMap::new();
    if let Some(props) = yaml.get_hash_value("properties") {
        let entries = props.as_hash().ok_or_else(|| SchemaError::InvalidStructure {
            message: "properties must be a mapping".to_string(),
            location: props.source_info.clone(),
        })?;
        for entry in entries {
            let name = entry.key.as_str().ok_or_else(|| SchemaError::InvalidStructure {
                message: "Property names must be strings".to_string(),
                location: entry.key_span.clone(),
            })?;
            properties.insert(name.to_string(), parse_property(&entry.value)?);
        }
    }

    for name in get_hash_string_array(yaml, "required")? {
        match properties.get_mut(&name) {
            Some(property) => property.required = true,
            None => {
                properties.insert(name, Property::required(Schema::Any));
            }
        }
    }

    let additional = match yaml.get_hash_value("additionalProperties") {
        Some(schema) => Some(Box::new(Schema::from_yaml(schema)?)),
        None => None,
    };

    Ok(Schema::Object(ObjectSchema {
        properties,
        closed: get_hash_bool(yaml, "closed")?.unwrap_or(true),
        additional,
        remove: get_hash_string_array(yaml, "remove")?,
    }))
}

/// A property is either a bare schema or `{schema, required, default}`.
fn parse_property(yaml: &YamlWithSourceInfo) -> SchemaResult<Property> {
    let Some(schema_yaml) = yaml.get_hash_value("schema") else {
        return Ok(Property::optional(Schema::from_yaml(yaml)?));
    };

    let mut property = Property::optional(Schema::from_yaml(schema_yaml)?);
    property.required = get_hash_bool(yaml, "required")?.unwrap_or(false);
    if let Some(default) = yaml.get_hash_value("default") {
        let mut diagnostics = Vec::new();
        let value = config_value_from_yaml(default.clone(), &mut diagnostics);
        if let Some(diagnostic) = diagnostics.first() {
            return Err(SchemaError::InvalidStructure {
                message: diagnostic.title.clone(),
                location: default.source_info.clone(),
            });
        }
        property = property.with_default(value);
    }
    Ok(property)
}
