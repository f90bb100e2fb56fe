//! # hearth-yaml
//!
//! YAML parsing with source location tracking.
//!
//! This crate provides `YamlWithSourceInfo`, which wraps `yaml-rust2::Yaml` with
//! source location information for every node in the YAML tree. Mapping entries
//! keep the location of their key separately from the value, so diagnostics can
//! point at the line where a key was written.
//!
//! Local tags such as `!secret db_password` are recorded on the node they
//! annotate; resolving them is up to the caller.
//!
//! ## Example
//!
//! ```rust
//! use hearth_yaml::parse_file;
//!
//! let content = r#"
//! core:
//!   name: Home
//! "#;
//!
//! let yaml = parse_file(content, "configuration.yaml").unwrap();
//! let core = yaml.get_hash_value("core").unwrap();
//! assert_eq!(core.source_info.line, 3);
//! ```

mod error;
mod parser;
mod source_info;
mod yaml_with_source_info;

pub use error::{Error, Result};
pub use parser::{parse, parse_file};
pub use source_info::SourceInfo;
pub use yaml_with_source_info::{YamlHashEntry, YamlWithSourceInfo};

// Re-export yaml-rust2 for convenience
pub use yaml_rust2::Yaml;
