//! YAML parser that builds YamlWithSourceInfo trees.

use crate::{Error, Result, SourceInfo, YamlHashEntry, YamlWithSourceInfo};
use std::collections::HashMap;
use yaml_rust2::Yaml;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

/// Parse YAML from a string, producing a YamlWithSourceInfo tree.
///
/// Only the first document of a multi-document stream is parsed. An empty
/// stream yields a `Null` node.
pub fn parse(content: &str) -> Result<YamlWithSourceInfo> {
    parse_impl(content, None)
}

/// Parse YAML from a string with an associated filename.
///
/// The filename is stored in every node's [`SourceInfo`] and in parse errors.
///
/// ```rust
/// use hearth_yaml::parse_file;
///
/// let yaml = parse_file("name: Home", "configuration.yaml").unwrap();
/// assert_eq!(yaml.source_info.file.as_deref(), Some("configuration.yaml"));
/// ```
pub fn parse_file(content: &str, filename: &str) -> Result<YamlWithSourceInfo> {
    parse_impl(content, Some(filename))
}

fn parse_impl(content: &str, filename: Option<&str>) -> Result<YamlWithSourceInfo> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = YamlBuilder::new(filename);

    parser
        .load(&mut builder, false)
        .map_err(|err| Error::from_scan(&err, filename))?;

    builder.result()
}

/// Receives marked events and assembles the source-tracked tree.
struct YamlBuilder {
    filename: Option<String>,

    /// Stack of collections being constructed
    stack: Vec<BuildNode>,

    /// Completed nodes that carried an anchor, by anchor id
    anchors: HashMap<usize, YamlWithSourceInfo>,

    root: Option<YamlWithSourceInfo>,

    /// First structural problem seen; on_event cannot return errors
    error: Option<Error>,
}

enum BuildNode {
    Sequence {
        start_marker: Marker,
        anchor_id: usize,
        tag: Option<String>,
        items: Vec<YamlWithSourceInfo>,
    },
    Mapping {
        start_marker: Marker,
        anchor_id: usize,
        tag: Option<String>,
        entries: Vec<(YamlWithSourceInfo, Option<YamlWithSourceInfo>)>,
    },
}

impl YamlBuilder {
    fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(str::to_string),
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            error: None,
        }
    }

    fn result(self) -> Result<YamlWithSourceInfo> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let empty = self.source_info_at(None, 0);
        Ok(self
            .root
            .unwrap_or_else(|| YamlWithSourceInfo::new_scalar(Yaml::Null, empty)))
    }

    fn source_info_at(&self, marker: Option<&Marker>, len: usize) -> SourceInfo {
        let info = match marker {
            Some(marker) => SourceInfo::from_marker(marker, len),
            None => SourceInfo::default(),
        };
        match &self.filename {
            Some(filename) => info.with_file(filename.clone()),
            None => info,
        }
    }

    fn fail(&mut self, message: &str, marker: &Marker) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidStructure {
                message: message.to_string(),
                location: Some(self.source_info_at(Some(marker), 0)),
            });
        }
    }

    fn tagged(&self, tag: Option<String>, node: YamlWithSourceInfo) -> YamlWithSourceInfo {
        match tag {
            Some(name) => {
                let at = node.source_info.clone();
                node.with_tag(Some((name, at)))
            }
            None => node,
        }
    }

    fn complete(&mut self, node: YamlWithSourceInfo, anchor_id: usize) {
        if anchor_id > 0 {
            self.anchors.insert(anchor_id, node.clone());
        }

        match self.stack.last_mut() {
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
            Some(BuildNode::Sequence { items, .. }) => items.push(node),
            Some(BuildNode::Mapping { entries, .. }) => match entries.last_mut() {
                Some((_, value @ None)) => *value = Some(node),
                _ => entries.push((node, None)),
            },
        }
    }

    fn finish_mapping(
        &self,
        start_marker: &Marker,
        end_marker: &Marker,
        entries: Vec<(YamlWithSourceInfo, Option<YamlWithSourceInfo>)>,
    ) -> YamlWithSourceInfo {
        let len = end_marker.index().saturating_sub(start_marker.index());
        let source_info = self.source_info_at(Some(start_marker), len);

        let mut hash_entries = Vec::with_capacity(entries.len());
        let mut yaml_pairs = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            // A key without a value only happens on truncated input.
            let value = value.unwrap_or_else(|| {
                YamlWithSourceInfo::new_scalar(Yaml::Null, key.source_info.clone())
            });
            let key_span = key.source_info.clone();
            let entry_len = value.source_info.end_offset().saturating_sub(key_span.offset);
            let entry_span = SourceInfo::new(
                self.filename.clone(),
                key_span.offset,
                key_span.line,
                key_span.col,
                entry_len,
            );
            yaml_pairs.push((key.yaml.clone(), value.yaml.clone()));
            hash_entries.push(YamlHashEntry::new(key, value, key_span, entry_span));
        }

        let yaml = Yaml::Hash(yaml_pairs.into_iter().collect());
        YamlWithSourceInfo::new_hash(yaml, source_info, hash_entries)
    }
}

impl MarkedEventReceiver for YamlBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }

        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, anchor_id, tag) => {
                let source_info = self.source_info_at(Some(&marker), value.len());
                let (yaml, local_tag) = match tag {
                    Some(t) if is_core_handle(&t.handle) => (core_tagged_value(&t.suffix, value), None),
                    Some(t) => (Yaml::String(value), Some(t.suffix)),
                    None if style != TScalarStyle::Plain => (Yaml::String(value), None),
                    None => (parse_scalar_value(&value), None),
                };
                let node = self.tagged(local_tag, YamlWithSourceInfo::new_scalar(yaml, source_info));
                self.complete(node, anchor_id);
            }

            Event::SequenceStart(anchor_id, tag) => {
                self.stack.push(BuildNode::Sequence {
                    start_marker: marker,
                    anchor_id,
                    tag: tag.filter(|t| !is_core_handle(&t.handle)).map(|t| t.suffix),
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => match self.stack.pop() {
                Some(BuildNode::Sequence {
                    start_marker,
                    anchor_id,
                    tag,
                    items,
                }) => {
                    let len = marker.index().saturating_sub(start_marker.index());
                    let source_info = self.source_info_at(Some(&start_marker), len);
                    let yaml = Yaml::Array(items.iter().map(|n| n.yaml.clone()).collect());
                    let node = self.tagged(tag, YamlWithSourceInfo::new_array(yaml, source_info, items));
                    self.complete(node, anchor_id);
                }
                _ => self.fail("sequence end without matching start", &marker),
            },

            Event::MappingStart(anchor_id, tag) => {
                self.stack.push(BuildNode::Mapping {
                    start_marker: marker,
                    anchor_id,
                    tag: tag.filter(|t| !is_core_handle(&t.handle)).map(|t| t.suffix),
                    entries: Vec::new(),
                });
            }

            Event::MappingEnd => match self.stack.pop() {
                Some(BuildNode::Mapping {
                    start_marker,
                    anchor_id,
                    tag,
                    entries,
                }) => {
                    let node = self.finish_mapping(&start_marker, &marker, entries);
                    let node = self.tagged(tag, node);
                    self.complete(node, anchor_id);
                }
                _ => self.fail("mapping end without matching start", &marker),
            },

            Event::Alias(anchor_id) => match self.anchors.get(&anchor_id).cloned() {
                Some(node) => self.complete(node, 0),
                None => self.fail("alias refers to an unknown anchor", &marker),
            },
        }
    }
}

/// `!!` resolves to the core schema prefix; older scanners keep it verbatim.
fn is_core_handle(handle: &str) -> bool {
    handle == "!!" || handle == "tag:yaml.org,2002:"
}

/// Resolve a scalar written with a core schema tag such as `!!str`.
fn core_tagged_value(suffix: &str, value: String) -> Yaml {
    match suffix {
        "str" => Yaml::String(value),
        "null" => Yaml::Null,
        "bool" | "int" | "float" => parse_scalar_value(&value),
        _ => Yaml::String(value),
    }
}

/// Infer the type of a plain scalar: integer, float, boolean, null or string.
fn parse_scalar_value(value: &str) -> Yaml {
    if let Ok(i) = value.parse::<i64>() {
        return Yaml::Integer(i);
    }

    if value.parse::<f64>().is_ok() && value.chars().any(|c| c.is_ascii_digit()) {
        return Yaml::Real(value.to_string());
    }

    match value {
        "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => Yaml::Boolean(true),
        "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => {
            Yaml::Boolean(false)
        }
        "null" | "Null" | "NULL" | "~" | "" => Yaml::Null,
        _ => Yaml::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse("42").unwrap().yaml.as_i64(), Some(42));
        assert_eq!(parse("on").unwrap().yaml.as_bool(), Some(true));
        assert!(parse("~").unwrap().is_null());
        assert_eq!(parse("hello").unwrap().as_str(), Some("hello"));
    }

    #[test]
    fn test_quoted_scalars_stay_strings() {
        let yaml = parse("zip: \"01234\"\nflag: 'yes'").unwrap();
        assert_eq!(yaml.get_hash_value("zip").unwrap().as_str(), Some("01234"));
        assert_eq!(yaml.get_hash_value("flag").unwrap().as_str(), Some("yes"));
    }

    #[test]
    fn test_words_that_parse_as_floats_stay_strings() {
        let yaml = parse("a: inf\nb: NaN").unwrap();
        assert_eq!(yaml.get_hash_value("a").unwrap().as_str(), Some("inf"));
        assert_eq!(yaml.get_hash_value("b").unwrap().as_str(), Some("NaN"));
    }

    #[test]
    fn test_empty_document_is_null() {
        let yaml = parse_file("", "configuration.yaml").unwrap();
        assert!(yaml.is_null());
        assert_eq!(yaml.source_info.file.as_deref(), Some("configuration.yaml"));
    }

    #[test]
    fn test_key_lines() {
        let yaml = parse_file(
            "core:\n  name: Home\n\nlight:\n  - platform: hue\n",
            "configuration.yaml",
        )
        .unwrap();
        let entries = yaml.as_hash().unwrap();
        assert_eq!(entries[0].key_span.line, 1);
        assert_eq!(entries[1].key_span.line, 4);
        let light = &entries[1].value;
        assert!(light.is_array());
        assert_eq!(light.get_array_item(0).unwrap().source_info.line, 5);
    }

    #[test]
    fn test_local_tag_is_recorded() {
        let yaml = parse("password: !secret db_password").unwrap();
        let value = yaml.get_hash_value("password").unwrap();
        assert_eq!(value.tag_name(), Some("secret"));
        assert_eq!(value.as_str(), Some("db_password"));
    }

    #[test]
    fn test_core_str_tag() {
        let yaml = parse("version: !!str 1.0").unwrap();
        let value = yaml.get_hash_value("version").unwrap();
        assert_eq!(value.as_str(), Some("1.0"));
        assert_eq!(value.tag_name(), None);
    }

    #[test]
    fn test_aliases_are_expanded() {
        let yaml = parse("base: &b\n  x: 1\ncopy: *b\n").unwrap();
        let copy = yaml.get_hash_value("copy").unwrap();
        assert_eq!(copy.get_hash_value("x").unwrap().yaml.as_i64(), Some(1));
    }

    #[test]
    fn test_syntax_error_carries_file() {
        let err = parse_file("a: [1, 2", "configuration.yaml").unwrap_err();
        let location = err.location().unwrap();
        assert_eq!(location.file.as_deref(), Some("configuration.yaml"));
    }
}
