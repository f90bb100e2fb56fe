//! Error reporting and diagnostic messages for hearth.
//!
//! Diagnostics follow the tidyverse message structure: a short title, a
//! problem statement, bulleted details and hints that end with `?`. Every
//! diagnostic may carry an error code (`H-<subsystem>-<n>`) that maps to an
//! entry of the embedded [`catalog`], and a source location.
//!
//! ```
//! use hearth_error_reporting::DiagnosticMessageBuilder;
//!
//! let msg = DiagnosticMessageBuilder::error("Invalid config")
//!     .with_code("H-3-3")
//!     .problem("required key 'host' not provided")
//!     .add_hint("Add a `host` entry to the sensor block?")
//!     .build();
//! assert!(msg.to_text().starts_with("Error [H-3-3]: Invalid config"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_docs_url, get_error_info, get_subsystem};
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
