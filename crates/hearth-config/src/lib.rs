//! Configuration documents with source tracking.
//!
//! This crate holds the document model shared by the rest of hearth:
//!
//! - [`ConfigValue`]: a scalar, ordered mapping or sequence. Mapping entries
//!   remember where their key was written, values remember where they were
//!   written. Values created programmatically carry no location.
//! - [`ConfigPath`]: a sequence of mapping keys and sequence indices.
//! - [`find_annotation`]: nearest known source location for a path.
//! - [`merge`]: the list/dict accumulation primitives used when packages are
//!   folded into the main document.
//!
//! # Example
//!
//! ```rust
//! use hearth_config::{ConfigPath, config_value_from_yaml, find_annotation};
//!
//! let yaml = hearth_yaml::parse_file("sensor:\n  threshold: 1\n", "configuration.yaml").unwrap();
//! let mut diagnostics = Vec::new();
//! let document = config_value_from_yaml(yaml, &mut diagnostics);
//!
//! let path = ConfigPath::from_keys(["sensor", "threshold"]);
//! let annotation = find_annotation(&document, path.segments()).unwrap();
//! assert_eq!(annotation.to_string(), "configuration.yaml, line 2");
//! ```

mod annotation;
mod convert;
pub mod merge;
mod path;
mod types;

pub use annotation::{Annotation, find_annotation};
pub use convert::config_value_from_yaml;
pub use merge::{MergePolicy, drop_falsy, ensure_list, recursive_merge};
pub use path::{ConfigPath, PathSegment};
pub use types::{ConfigMapEntry, ConfigValue, ConfigValueKind};

pub use hearth_yaml::SourceInfo;
pub use yaml_rust2::Yaml;
