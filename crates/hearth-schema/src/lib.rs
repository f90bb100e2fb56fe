//! Schema validation for hearth configuration documents.
//!
//! A [`Schema`] validates a [`ConfigValue`](hearth_config::ConfigValue) and
//! returns the normalized value: defaults filled in, scalars coerced, single
//! values wrapped by `ensureList`. Failures are reported as an [`Invalid`]
//! list of structured [`ValidationError`]s, each carrying the path of the
//! offending node.
//!
//! Code that only consumes schemas should depend on the [`ConfigSchema`]
//! trait, which is also how integrations supply hand-written validators.
//!
//! ```
//! use hearth_schema::{ConfigSchema, Schema};
//!
//! let schema = Schema::from_yaml(&hearth_yaml::parse(r#"
//! object:
//!   properties:
//!     host: string
//!     port:
//!       schema: integer
//!       default: 80
//!   required: [host]
//! "#).unwrap()).unwrap();
//!
//! let config = hearth_config::ConfigValue::map_from([("host", hearth_config::ConfigValue::string("nas"))]);
//! let validated = schema.validate(&config).unwrap();
//! assert_eq!(validated.get("port").and_then(|v| v.as_i64()), Some(80));
//! ```

pub mod error;
pub mod schema;
pub mod validator;

pub use error::{Invalid, SchemaError, SchemaFailure, SchemaResult, ValidationError, ValidationErrorKind};
pub use schema::{
    ConfigSchema, NumberSchema, ObjectSchema, Property, Schema, StringFormat, StringSchema, slugify,
};
pub use validator::ValidationContext;
