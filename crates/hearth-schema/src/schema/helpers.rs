//! Helper functions for reading schema definitions

use crate::error::{SchemaError, SchemaResult};
use hearth_yaml::YamlWithSourceInfo;
use yaml_rust2::Yaml;

/// Get a number value from a hash by key
pub(super) fn get_hash_number(yaml: &YamlWithSourceInfo, key: &str) -> SchemaResult<Option<f64>> {
    if let Some(value) = yaml.get_hash_value(key) {
        match &value.yaml {
            Yaml::Integer(i) => return Ok(Some(*i as f64)),
            Yaml::Real(r) => {
                if let Ok(f) = r.parse::<f64>() {
                    return Ok(Some(f));
                }
            }
            _ => {}
        }
        return Err(SchemaError::InvalidStructure {
            message: format!("Field '{}' must be a number", key),
            location: value.source_info.clone(),
        });
    }
    Ok(None)
}

/// Get a boolean value from a hash by key
pub(super) fn get_hash_bool(yaml: &YamlWithSourceInfo, key: &str) -> SchemaResult<Option<bool>> {
    if let Some(value) = yaml.get_hash_value(key) {
        if let Some(b) = value.yaml.as_bool() {
            return Ok(Some(b));
        }
        return Err(SchemaError::InvalidStructure {
            message: format!("Field '{}' must be a boolean", key),
            location: value.source_info.clone(),
        });
    }
    Ok(None)
}

/// Get a string value from a hash by key
pub(super) fn get_hash_string<'a>(
    yaml: &'a YamlWithSourceInfo,
    key: &str,
) -> SchemaResult<Option<&'a str>> {
    if let Some(value) = yaml.get_hash_value(key) {
        if let Some(s) = value.as_str() {
            return Ok(Some(s));
        }
        return Err(SchemaError::InvalidStructure {
            message: format!("Field '{}' must be a string", key),
            location: value.source_info.clone(),
        });
    }
    Ok(None)
}

/// Get an array of strings from a hash by key
pub(super) fn get_hash_string_array(
    yaml: &YamlWithSourceInfo,
    key: &str,
) -> SchemaResult<Vec<String>> {
    let Some(value) = yaml.get_hash_value(key) else {
        return Ok(Vec::new());
    };
    let items = value.as_array().ok_or_else(|| SchemaError::InvalidStructure {
        message: format!("Field '{}' must be an array", key),
        location: value.source_info.clone(),
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| SchemaError::InvalidStructure {
                    message: format!("Items of '{}' must be strings", key),
                    location: item.source_info.clone(),
                })
        })
        .collect()
}

/// The key of a single-entry mapping, e.g. `arrayOf` in `arrayOf: string`.
pub(super) fn single_key(yaml: &YamlWithSourceInfo) -> SchemaResult<(&str, &YamlWithSourceInfo)> {
    match yaml.as_hash() {
        Some([entry]) => match entry.key.as_str() {
            Some(key) => Ok((key, &entry.value)),
            None => Err(SchemaError::InvalidStructure {
                message: "Schema type must be a string".to_string(),
                location: entry.key_span.clone(),
            }),
        },
        _ => Err(SchemaError::InvalidStructure {
            message: "Schema object must have exactly one key".to_string(),
            location: yaml.source_info.clone(),
        }),
    }
}
