//! Accumulation primitives for folding package fragments into a document.
//!
//! Two policies exist. `List` domains collect entries: both sides are
//! normalized to sequences, concatenated existing-then-incoming, and falsy
//! entries are dropped. `Dict` domains are unioned key by key with
//! [`recursive_merge`]; a leaf already set in the target is a conflict and is
//! never overwritten. Sequences nested anywhere in a dict merge are always
//! concatenated.

use crate::types::{ConfigMapEntry, ConfigValue, ConfigValueKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a domain's configuration accumulates across packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    Dict,
    List,
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::Dict => f.write_str("dict"),
            MergePolicy::List => f.write_str("list"),
        }
    }
}

/// Normalize a value to a sequence: absent and null become empty, a
/// sequence is unpacked, anything else becomes a singleton.
pub fn ensure_list(value: Option<ConfigValue>) -> Vec<ConfigValue> {
    match value {
        None => Vec::new(),
        Some(v) if v.is_null() => Vec::new(),
        Some(v) => match v.value {
            ConfigValueKind::Array(items) => items,
            _ => vec![v],
        },
    }
}

/// Drop falsy entries, keeping the order of the rest.
pub fn drop_falsy(items: Vec<ConfigValue>) -> Vec<ConfigValue> {
    items.into_iter().filter(|item| !item.is_falsy()).collect()
}

/// `drop_falsy(ensure_list(existing) + ensure_list(incoming))`.
///
/// The result keeps the location of the existing value when there was one.
pub fn concat_lists(existing: Option<ConfigValue>, incoming: ConfigValue) -> ConfigValue {
    let source_info = existing
        .as_ref()
        .and_then(|v| v.source_info.clone())
        .or_else(|| incoming.source_info.clone());
    let mut items = ensure_list(existing);
    items.extend(ensure_list(Some(incoming)));
    ConfigValue::new_array(drop_falsy(items)).with_source_info(source_info)
}

/// Union `fragment` into `target`.
///
/// Returns the keys whose fragment value could not be applied because the
/// target already held a value there. Merging continues past a collision,
/// so every colliding key is reported.
pub fn recursive_merge(
    target: &mut IndexMap<String, ConfigMapEntry>,
    fragment: IndexMap<String, ConfigMapEntry>,
) -> Vec<String> {
    let mut duplicates = Vec::new();

    for (key, incoming) in fragment {
        let ConfigMapEntry {
            key_source,
            value: incoming,
        } = incoming;

        match incoming.value {
            ConfigValueKind::Map(entries) => {
                if entries.is_empty() {
                    continue;
                }
                let slot = target.entry(key.clone()).or_insert_with(|| {
                    ConfigMapEntry::new(ConfigValue::empty_map()).with_key_source(key_source.clone())
                });
                if slot.value.is_null() {
                    slot.value = ConfigValue::empty_map().with_source_info(incoming.source_info);
                }
                match slot.value.as_map_mut() {
                    Some(nested) => duplicates.extend(recursive_merge(nested, entries)),
                    None => duplicates.push(key),
                }
            }
            ConfigValueKind::Array(_) => {
                let slot = target
                    .entry(key)
                    .or_insert_with(|| ConfigMapEntry::new(ConfigValue::null()).with_key_source(key_source));
                let existing = std::mem::replace(&mut slot.value, ConfigValue::null());
                slot.value = concat_lists(Some(existing), incoming);
            }
            ConfigValueKind::Scalar(_) => match target.get_mut(&key) {
                Some(slot) if !slot.value.is_null() => duplicates.push(key),
                Some(slot) => slot.value = incoming,
                None => {
                    target.insert(key, ConfigMapEntry::new(incoming).with_key_source(key_source));
                }
            },
        }
    }

    duplicates
}
