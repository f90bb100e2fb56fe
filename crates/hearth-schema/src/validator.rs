// Configuration validation engine

use crate::error::{Invalid, ValidationError, ValidationErrorKind};
use crate::schema::{NumberSchema, ObjectSchema, Schema, StringFormat, StringSchema, slugify};
use hearth_config::{ConfigMapEntry, ConfigPath, ConfigValue, PathSegment};
use indexmap::IndexMap;
use url::Url;
use yaml_rust2::Yaml;

/// Set on errors raised directly on a mapping value, as opposed to
/// somewhere below it.
const DICTIONARY_VALUE: &str = "dictionary value";

/// Validates a value against a schema, returning the normalized value.
///
/// All errors found are reported, not just the first one: sibling keys and
/// sequence items are validated independently.
pub fn validate(value: &ConfigValue, schema: &Schema) -> Result<ConfigValue, Invalid> {
    let mut context = ValidationContext::new();
    match validate_generic(value, schema, &mut context) {
        Some(validated) if !context.has_errors() => Ok(validated),
        _ => {
            let mut errors = context.into_errors();
            if errors.is_empty() {
                errors.push(ValidationError::invalid("not a valid value"));
            }
            Err(Invalid::new(errors))
        }
    }
}

/// Validation context tracks state during validation
#[derive(Debug, Default)]
pub struct ValidationContext {
    /// Current instance path (e.g., ["light", 0, "platform"])
    instance_path: ConfigPath,
    /// Collected validation errors
    errors: Vec<ValidationError>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error at the current instance path
    pub fn add_error(&mut self, kind: ValidationErrorKind) {
        self.errors
            .push(ValidationError::new(kind, self.instance_path.clone()));
    }

    /// Execute a function with a new instance path segment
    pub fn with_instance_path<F, R>(&mut self, segment: impl Into<PathSegment>, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let saved = self.instance_path.clone();
        self.instance_path.push(segment);
        let result = f(self);
        self.instance_path = saved;
        result
    }

    pub fn instance_path(&self) -> &ConfigPath {
        &self.instance_path
    }

    /// Get the collected errors
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Check if validation failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    /// A fresh context at the same position, for trying alternatives.
    fn fork(&self) -> Self {
        Self {
            instance_path: self.instance_path.clone(),
            errors: Vec::new(),
        }
    }

    fn fail<T>(&mut self, kind: ValidationErrorKind) -> Option<T> {
        self.add_error(kind);
        None
    }

    fn type_mismatch<T>(&mut self, expected: &str) -> Option<T> {
        self.fail(ValidationErrorKind::TypeMismatch {
            expected: expected.to_string(),
        })
    }

    fn invalid_value<T>(&mut self, message: impl Into<String>) -> Option<T> {
        self.fail(ValidationErrorKind::InvalidValue {
            message: message.into(),
        })
    }
}

/// Main validation dispatcher. `None` means errors were recorded.
fn validate_generic(
    value: &ConfigValue,
    schema: &Schema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    match schema {
        Schema::Any => Some(value.clone()),
        Schema::Null => validate_null(value, context),
        Schema::Boolean => validate_boolean(value, context),
        Schema::Integer(s) => validate_integer(value, s, context),
        Schema::Number(s) => validate_number(value, s, context),
        Schema::String(s) => validate_string(value, s, context),
        Schema::Enum(values) => validate_enum(value, values, context),
        Schema::Array(items) => match value.as_array() {
            Some(list) => validate_items(value, list, items, context),
            None => context.type_mismatch("a list"),
        },
        Schema::EnsureList(items) => {
            if value.is_null() {
                Some(ConfigValue::new_array(Vec::new()).with_source_info(value.source_info.clone()))
            } else if let Some(list) = value.as_array() {
                validate_items(value, list, items, context)
            } else {
                validate_items(value, std::slice::from_ref(value), items, context)
            }
        }
        Schema::Object(s) => validate_object(value, s, context),
        Schema::SlugMap(s) => validate_slug_map(value, s, context),
        Schema::AnyOf(schemas) => validate_any_of(value, schemas, context),
        Schema::AllOf(schemas) => {
            let mut current = value.clone();
            for subschema in schemas {
                current = validate_generic(&current, subschema, context)?;
            }
            Some(current)
        }
    }
}

fn validate_null(value: &ConfigValue, context: &mut ValidationContext) -> Option<ConfigValue> {
    if value.is_null() {
        Some(value.clone())
    } else {
        context.type_mismatch("null")
    }
}

/// Accepts booleans, the usual on/off words and 0/1.
fn validate_boolean(value: &ConfigValue, context: &mut ValidationContext) -> Option<ConfigValue> {
    let b = match value.as_yaml() {
        Some(Yaml::Boolean(b)) => *b,
        Some(Yaml::Integer(1)) => true,
        Some(Yaml::Integer(0)) => false,
        Some(Yaml::String(s)) => match s.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "enable" => true,
            "0" | "false" | "no" | "off" | "disable" => false,
            _ => return context.type_mismatch("bool"),
        },
        _ => return context.type_mismatch("bool"),
    };
    Some(ConfigValue::boolean(b).with_source_info(value.source_info.clone()))
}

fn validate_integer(
    value: &ConfigValue,
    schema: &NumberSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let n = match value.as_yaml() {
        Some(Yaml::Integer(i)) => Some(*i),
        Some(Yaml::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Yaml::Real(r)) => r
            .parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64),
        _ => None,
    };
    let Some(n) = n else {
        return context.type_mismatch("int");
    };
    check_range(n as f64, schema, context)?;
    Some(ConfigValue::integer(n).with_source_info(value.source_info.clone()))
}

fn validate_number(
    value: &ConfigValue,
    schema: &NumberSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let (n, yaml) = match value.as_yaml() {
        Some(Yaml::Integer(i)) => (*i as f64, Yaml::Integer(*i)),
        Some(Yaml::Real(r)) => match r.parse::<f64>() {
            Ok(f) => (f, Yaml::Real(r.clone())),
            Err(_) => return context.type_mismatch("float"),
        },
        Some(Yaml::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) => (f, Yaml::Real(s.trim().to_string())),
            Err(_) => return context.type_mismatch("float"),
        },
        _ => return context.type_mismatch("float"),
    };
    check_range(n, schema, context)?;
    Some(ConfigValue::new_scalar(yaml).with_source_info(value.source_info.clone()))
}

fn check_range(n: f64, schema: &NumberSchema, context: &mut ValidationContext) -> Option<()> {
    if let Some(min) = schema.minimum
        && n < min
    {
        return context.invalid_value(format!("value must be at least {}", format_bound(min)));
    }
    if let Some(max) = schema.maximum
        && n > max
    {
        return context.invalid_value(format!("value must be at most {}", format_bound(max)));
    }
    Some(())
}

fn format_bound(bound: f64) -> String {
    if bound.fract() == 0.0 && bound.abs() < 1e15 {
        format!("{}", bound as i64)
    } else {
        bound.to_string()
    }
}

/// Numbers are accepted and rendered as strings.
fn validate_string(
    value: &ConfigValue,
    schema: &StringSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let s = match value.as_yaml() {
        Some(Yaml::String(s)) => s.clone(),
        Some(Yaml::Integer(i)) => i.to_string(),
        Some(Yaml::Real(r)) => r.clone(),
        _ => return context.type_mismatch("str"),
    };

    if let Some(pattern) = &schema.pattern
        && !pattern.is_match(&s)
    {
        return context.invalid_value(format!(
            "does not match regular expression {}",
            pattern.as_str()
        ));
    }

    match schema.format {
        Some(StringFormat::Url) if !is_url(&s) => return context.invalid_value("invalid url"),
        Some(StringFormat::Slug) => {
            let slug = slugify(&s);
            if slug != s {
                return context.invalid_value(format!("invalid slug {} (try {})", s, slug));
            }
        }
        _ => {}
    }

    Some(ConfigValue::string(s).with_source_info(value.source_info.clone()))
}

/// An absolute http or https URL with a host.
fn is_url(s: &str) -> bool {
    Url::parse(s)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

fn validate_enum(
    value: &ConfigValue,
    allowed: &[Yaml],
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    if let Some(yaml) = value.as_yaml()
        && allowed.contains(yaml)
    {
        return Some(value.clone());
    }
    let listed: Vec<String> = allowed
        .iter()
        .map(|v| ConfigValue::new_scalar(v.clone()).to_string())
        .collect();
    context.invalid_value(format!("value must be one of [{}]", listed.join(", ")))
}

fn validate_items(
    value: &ConfigValue,
    list: &[ConfigValue],
    schema: &Schema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let mut output = Vec::with_capacity(list.len());
    let mut ok = true;
    for (idx, item) in list.iter().enumerate() {
        match context.with_instance_path(idx, |ctx| validate_generic(item, schema, ctx)) {
            Some(validated) => output.push(validated),
            None => ok = false,
        }
    }
    ok.then(|| ConfigValue::new_array(output).with_source_info(value.source_info.clone()))
}

/// Validate a mapping value, marking errors raised on the value itself.
fn validate_mapping_value(
    value: &ConfigValue,
    schema: &Schema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let before = context.errors.len();
    let depth = context.instance_path.len();
    let result = validate_generic(value, schema, context);
    for error in &mut context.errors[before..] {
        if error.path.len() == depth && error.error_type.is_none() {
            error.error_type = Some(DICTIONARY_VALUE.to_string());
        }
    }
    result
}

fn validate_object(
    value: &ConfigValue,
    schema: &ObjectSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let Some(entries) = value.as_map() else {
        return context.type_mismatch("a dictionary");
    };

    let mut output = IndexMap::with_capacity(entries.len());
    let mut ok = true;

    for (key, entry) in entries {
        if schema.remove.iter().any(|removed| removed == key) {
            continue;
        }
        let validated = match (schema.property(key), &schema.additional) {
            (Some(property), _) => context.with_instance_path(key.as_str(), |ctx| {
                validate_mapping_value(&entry.value, &property.schema, ctx)
            }),
            (None, Some(additional)) => context.with_instance_path(key.as_str(), |ctx| {
                validate_mapping_value(&entry.value, additional, ctx)
            }),
            (None, None) if schema.closed => context
                .with_instance_path(key.as_str(), |ctx| ctx.fail(ValidationErrorKind::ExtraKey)),
            (None, None) => Some(entry.value.clone()),
        };
        match validated {
            Some(validated) => {
                output.insert(
                    key.clone(),
                    ConfigMapEntry::new(validated).with_key_source(entry.key_source.clone()),
                );
            }
            None => ok = false,
        }
    }

    for (key, property) in &schema.properties {
        if entries.contains_key(key) {
            continue;
        }
        if let Some(default) = &property.default {
            match context.with_instance_path(key.as_str(), |ctx| {
                validate_mapping_value(default, &property.schema, ctx)
            }) {
                Some(validated) => {
                    output.insert(key.clone(), ConfigMapEntry::new(validated));
                }
                None => ok = false,
            }
        } else if property.required {
            context.with_instance_path(key.as_str(), |ctx| {
                ctx.add_error(ValidationErrorKind::MissingRequiredKey)
            });
            ok = false;
        }
    }

    ok.then(|| ConfigValue::new_map(output).with_source_info(value.source_info.clone()))
}

fn validate_slug_map(
    value: &ConfigValue,
    schema: &Schema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let Some(entries) = value.as_map() else {
        return context.type_mismatch("a dictionary");
    };

    let mut output = IndexMap::with_capacity(entries.len());
    let mut ok = true;
    for (key, entry) in entries {
        let validated = context.with_instance_path(key.as_str(), |ctx| {
            let slug = slugify(key);
            if &slug != key {
                return ctx.invalid_value(format!("invalid slug {} (try {})", key, slug));
            }
            validate_mapping_value(&entry.value, schema, ctx)
        });
        match validated {
            Some(validated) => {
                output.insert(
                    key.clone(),
                    ConfigMapEntry::new(validated).with_key_source(entry.key_source.clone()),
                );
            }
            None => ok = false,
        }
    }
    ok.then(|| ConfigValue::new_map(output).with_source_info(value.source_info.clone()))
}

/// Reports the errors of the alternative that got deepest into the value.
fn validate_any_of(
    value: &ConfigValue,
    schemas: &[Schema],
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let mut best: Option<(usize, Vec<ValidationError>)> = None;

    for subschema in schemas {
        let mut sub_context = context.fork();
        if let Some(validated) = validate_generic(value, subschema, &mut sub_context)
            && !sub_context.has_errors()
        {
            return Some(validated);
        }
        let errors = sub_context.into_errors();
        let depth = errors.iter().map(|e| e.path.len()).max().unwrap_or(0);
        if best.as_ref().is_none_or(|(best_depth, _)| depth > *best_depth) {
            best = Some((depth, errors));
        }
    }

    match best {
        Some((_, errors)) if !errors.is_empty() => {
            context.errors.extend(errors);
            None
        }
        _ => context.invalid_value("no valid value"),
    }
}
